use crate::cache::{PaletteCache, ResolutionEntry};
use crate::color::{distance, Color};
use crate::dither::{paint, DitherPair, BLEND_WEIGHTS};
use crate::downsample::{output_dimensions, representative_color};
use crate::error::PalettizeError;

use image::{ImageBuffer, RgbImage};
use indicatif::ProgressBar;

/// Maps every output pixel of `img` onto the cached palette.
///
/// Decisions for colors not seen before are added to `cache`.
pub fn palettize(
    img: &RgbImage,
    cache: &mut PaletteCache,
    pairs: &[DitherPair],
    pb: &ProgressBar,
) -> Result<RgbImage, PalettizeError> {
    if cache.palette.is_empty() {
        return Err(PalettizeError::EmptyPalette);
    }

    let block_factor = cache.settings.block_factor;
    let (width, height) = output_dimensions(img.width(), img.height(), block_factor);
    if width == 0 || height == 0 {
        return Err(PalettizeError::InvalidSettings(format!(
            "block factor {} is larger than the {}x{} image",
            block_factor,
            img.width(),
            img.height()
        )));
    }
    let mut output: RgbImage = ImageBuffer::new(width, height);
    let known = cache.memo_len();

    pb.set_length(height as u64);
    pb.set_message("Mapping colors");

    for y in 0..height {
        for x in 0..width {
            let color = representative_color(img, block_factor, x, y);
            let entry = resolve(color, pairs, cache);
            let painted = paint(entry, &cache.palette, pairs, x, y);
            output.put_pixel(x, y, painted.into());
        }
        pb.inc(1);
    }

    let misses = cache.memo_len() - known;
    tracing::debug!(
        pixels = width as u64 * height as u64,
        new_colors = misses,
        memo = cache.memo_len(),
        "Color mapping done"
    );
    pb.finish_with_message("Mapping complete");

    Ok(output)
}

/// Returns the memoized decision for `color`, computing and recording it on a miss.
pub fn resolve(color: Color, pairs: &[DitherPair], cache: &mut PaletteCache) -> ResolutionEntry {
    if let Some(entry) = cache.lookup(color) {
        return entry;
    }

    let entry = find_closest(color, pairs, cache);
    cache.record_decision(color, entry);
    entry
}

/// Nearest candidate: palette first, then each pair's blends in weight order.
/// Only a strictly smaller distance replaces the current best.
fn find_closest(color: Color, pairs: &[DitherPair], cache: &PaletteCache) -> ResolutionEntry {
    let metric = cache.settings.metric;
    let target = color.to_blend();

    let mut best = ResolutionEntry::Solid { index: 0 };
    let mut best_distance = f64::INFINITY;

    for (index, candidate) in cache.palette.iter().enumerate() {
        let d = distance(target, candidate.to_blend(), metric);
        if d < best_distance {
            best_distance = d;
            best = ResolutionEntry::Solid { index };
        }
    }

    if cache.settings.dither {
        for (pair, candidate) in pairs.iter().enumerate() {
            for (blend, (_, tier)) in candidate.blends.iter().zip(BLEND_WEIGHTS) {
                let d = distance(target, *blend, metric);
                if d < best_distance {
                    best_distance = d;
                    best = ResolutionEntry::Pair { pair, tier };
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::color_distance;
    use crate::dither::{build_dither_pairs, Tier};
    use crate::types::{Metric, Settings};
    use image::Rgb;

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    fn cache_for(palette: Vec<Color>, settings: Settings) -> (PaletteCache, Vec<DitherPair>) {
        let pairs = build_dither_pairs(
            &palette,
            settings.metric,
            settings.lower_threshold,
            settings.upper_threshold,
        );
        (PaletteCache::new(palette, settings), pairs)
    }

    #[test]
    fn without_dither_picks_argmin_with_lowest_index() {
        let palette = vec![
            Color::new(0, 0, 0),
            Color::new(10, 10, 10),
            Color::new(20, 20, 20),
            Color::new(0, 10, 20),
            Color::new(200, 100, 50),
        ];
        let settings = Settings {
            dither: false,
            ..Settings::default()
        };
        let (mut cache, pairs) = cache_for(palette.clone(), settings);

        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(51) {
                let color = Color::new(r as u8, g as u8, (r / 2) as u8);
                let mut expected = 0;
                for i in 1..palette.len() {
                    if color_distance(color, palette[i], Metric::Taxicab)
                        < color_distance(color, palette[expected], Metric::Taxicab)
                    {
                        expected = i;
                    }
                }
                assert_eq!(
                    resolve(color, &pairs, &mut cache),
                    ResolutionEntry::Solid { index: expected }
                );
            }
        }
    }

    #[test]
    fn ties_go_to_the_first_palette_entry() {
        let settings = Settings {
            dither: false,
            ..Settings::default()
        };
        let palette = vec![Color::new(0, 0, 0), Color::new(20, 0, 0)];
        let (mut cache, pairs) = cache_for(palette, settings);
        assert_eq!(
            resolve(Color::new(10, 0, 0), &pairs, &mut cache),
            ResolutionEntry::Solid { index: 0 }
        );
    }

    #[test]
    fn repeated_resolution_is_stable_and_memoized() {
        let (mut cache, pairs) = cache_for(vec![RED, BLUE], Settings::default());
        let color = Color::new(90, 40, 200);

        let first = resolve(color, &pairs, &mut cache);
        assert_eq!(cache.memo_len(), 1);
        let second = resolve(color, &pairs, &mut cache);
        assert_eq!(first, second);
        assert_eq!(cache.memo_len(), 1);
    }

    #[test]
    fn memo_hit_is_returned_without_searching() {
        let (mut cache, pairs) = cache_for(vec![RED, BLUE], Settings::default());
        cache.record_decision(RED, ResolutionEntry::Solid { index: 1 });
        assert_eq!(
            resolve(RED, &pairs, &mut cache),
            ResolutionEntry::Solid { index: 1 }
        );
    }

    #[test]
    fn blend_tiers_are_matched_by_weight() {
        let settings = Settings {
            upper_threshold: 1.0,
            ..Settings::default()
        };
        let palette = vec![Color::new(200, 0, 0), Color::new(0, 0, 200)];
        let (mut cache, pairs) = cache_for(palette, settings);
        assert_eq!(pairs.len(), 1);

        let cases = [
            (Color::new(100, 0, 100), Tier::TwoTone),
            (Color::new(150, 0, 50), Tier::FourToneFavorFirst),
            (Color::new(50, 0, 150), Tier::FourToneFavorSecond),
        ];
        for (color, tier) in cases {
            assert_eq!(
                resolve(color, &pairs, &mut cache),
                ResolutionEntry::Pair { pair: 0, tier }
            );
        }
    }

    #[test]
    fn dither_disabled_ignores_pairs() {
        let settings = Settings {
            dither: false,
            upper_threshold: 1.0,
            ..Settings::default()
        };
        let palette = vec![Color::new(200, 0, 0), Color::new(0, 0, 200)];
        let (mut cache, pairs) = cache_for(palette, settings);
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            resolve(Color::new(100, 0, 100), &pairs, &mut cache),
            ResolutionEntry::Solid { index: 0 }
        );
    }

    #[test]
    fn empty_palette_is_rejected_before_mapping() {
        let mut cache = PaletteCache::new(Vec::new(), Settings::default());
        let img = RgbImage::new(2, 2);
        assert!(matches!(
            palettize(&img, &mut cache, &[], &ProgressBar::hidden()),
            Err(PalettizeError::EmptyPalette)
        ));
    }

    #[test]
    fn purple_pixel_ties_to_red_with_default_window() {
        // red/blue are 510 apart, outside 0.5 * 765, so only solids compete.
        // Both are 255 away; the lowest index wins the tie.
        let (mut cache, pairs) = cache_for(vec![RED, BLUE], Settings::default());
        assert!(pairs.is_empty());

        let img = RgbImage::from_pixel(1, 1, Rgb([128, 0, 128]));
        let out = palettize(&img, &mut cache, &pairs, &ProgressBar::hidden()).unwrap();

        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(
            cache.lookup(Color::new(128, 0, 128)),
            Some(ResolutionEntry::Solid { index: 0 })
        );
    }

    #[test]
    fn metric_changes_the_nearest_color() {
        // from black: (100, 0, 0) is 100 either way, (60, 60, 0) is 120 taxicab
        // but about 84.9 euclidean
        let palette = vec![Color::new(100, 0, 0), Color::new(60, 60, 0)];
        let black = Color::new(0, 0, 0);

        let taxicab = Settings {
            dither: false,
            ..Settings::default()
        };
        let (mut cache, pairs) = cache_for(palette.clone(), taxicab);
        assert_eq!(
            resolve(black, &pairs, &mut cache),
            ResolutionEntry::Solid { index: 0 }
        );

        let euclidean = Settings {
            dither: false,
            metric: Metric::Euclidean,
            ..Settings::default()
        };
        let (mut cache, pairs) = cache_for(palette, euclidean);
        assert_eq!(
            resolve(black, &pairs, &mut cache),
            ResolutionEntry::Solid { index: 1 }
        );
    }

    #[test]
    fn block_factor_larger_than_image_is_rejected() {
        let settings = Settings {
            block_factor: 4,
            ..Settings::default()
        };
        let (mut cache, pairs) = cache_for(vec![RED, BLUE], settings);
        let img = RgbImage::from_pixel(3, 5, Rgb([10, 0, 0]));
        assert!(matches!(
            palettize(&img, &mut cache, &pairs, &ProgressBar::hidden()),
            Err(PalettizeError::InvalidSettings(_))
        ));
        assert_eq!(cache.memo_len(), 0);
    }

    #[test]
    fn purple_pixel_dithers_with_wide_window() {
        // the half blend (127.5, 0, 127.5) is 1 away; (0, 0) paints the secondary
        let settings = Settings {
            upper_threshold: 1.0,
            ..Settings::default()
        };
        let (mut cache, pairs) = cache_for(vec![RED, BLUE], settings);

        let img = RgbImage::from_pixel(2, 1, Rgb([128, 0, 128]));
        let out = palettize(&img, &mut cache, &pairs, &ProgressBar::hidden()).unwrap();

        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(1, 0), Rgb([255, 0, 0]));
        assert_eq!(
            cache.lookup(Color::new(128, 0, 128)),
            Some(ResolutionEntry::Pair {
                pair: 0,
                tier: Tier::TwoTone
            })
        );
        assert_eq!(cache.memo_len(), 1);
    }

    #[test]
    fn block_factor_two_averages_uniform_image() {
        let settings = Settings {
            block_factor: 2,
            dither: false,
            ..Settings::default()
        };
        let uniform = Color::new(37, 180, 99);
        let (mut cache, pairs) = cache_for(vec![uniform, RED, BLUE], settings);

        let img = RgbImage::from_pixel(2, 2, Rgb([37, 180, 99]));
        let out = palettize(&img, &mut cache, &pairs, &ProgressBar::hidden()).unwrap();

        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(*out.get_pixel(0, 0), Rgb([37, 180, 99]));
        assert_eq!(cache.lookup(uniform), Some(ResolutionEntry::Solid { index: 0 }));
    }

    #[test]
    fn block_factor_drops_remainder() {
        let settings = Settings {
            block_factor: 2,
            ..Settings::default()
        };
        let (mut cache, pairs) = cache_for(vec![RED, BLUE], settings);
        let img = RgbImage::from_pixel(5, 3, Rgb([10, 0, 0]));
        let out = palettize(&img, &mut cache, &pairs, &ProgressBar::hidden()).unwrap();
        assert_eq!(out.dimensions(), (2, 1));
    }
}
