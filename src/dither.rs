use crate::cache::ResolutionEntry;
use crate::color::{color_distance, mix, BlendColor, Color};
use crate::types::Metric;

use serde_derive::{Deserialize, Serialize};

/// Thresholds are fractions of this distance, whatever the metric.
pub const REFERENCE_DISTANCE: f64 = 255.0 * 3.0;

/// Mixing weights of the first color, in search order.
pub const BLEND_WEIGHTS: [(f64, Tier); 3] = [
    (0.5, Tier::TwoTone),
    (0.75, Tier::FourToneFavorFirst),
    (0.25, Tier::FourToneFavorSecond),
];

/// Which ratio of a pair was chosen for a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Half and half.
    TwoTone,
    /// Three quarters first color.
    FourToneFavorFirst,
    /// Three quarters second color.
    FourToneFavorSecond,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DitherPair {
    pub first: Color,
    pub second: Color,
    /// Blend colors in the same order as [`BLEND_WEIGHTS`].
    pub blends: [BlendColor; 3],
}

impl DitherPair {
    pub fn new(first: Color, second: Color) -> Self {
        DitherPair {
            first,
            second,
            blends: BLEND_WEIGHTS.map(|(weight, _)| mix(first, second, weight)),
        }
    }
}

/// Enumerates every pair `i < j` of the palette whose distance lies strictly
/// inside the threshold window.
pub fn build_dither_pairs(
    palette: &[Color],
    metric: Metric,
    lower_threshold: f64,
    upper_threshold: f64,
) -> Vec<DitherPair> {
    let lower = lower_threshold * REFERENCE_DISTANCE;
    let upper = upper_threshold * REFERENCE_DISTANCE;

    let mut pairs = Vec::new();
    for (i, &first) in palette.iter().enumerate() {
        for &second in &palette[i + 1..] {
            let d = color_distance(first, second, metric);
            if lower < d && d < upper {
                pairs.push(DitherPair::new(first, second));
            }
        }
    }

    tracing::debug!(
        palette = palette.len(),
        pairs = pairs.len(),
        lower,
        upper,
        "Built dither pairs"
    );

    pairs
}

/// Picks the color actually painted at output coordinate `(x, y)`.
///
/// Two-tone paints the secondary color wherever `(x + y) % 2 == 0`; the
/// four-tone tiers paint it wherever `(x + 2y) % 4 == 0`, i.e. one position in
/// four. Favoring the second color swaps the roles of the pair.
pub fn paint(
    entry: ResolutionEntry,
    palette: &[Color],
    pairs: &[DitherPair],
    x: u32,
    y: u32,
) -> Color {
    let (pair, tier) = match entry {
        ResolutionEntry::Solid { index } => return palette[index],
        ResolutionEntry::Pair { pair, tier } => (&pairs[pair], tier),
    };

    let (x, y) = (x as u64, y as u64);
    let (main, secondary, hit) = match tier {
        Tier::TwoTone => (pair.first, pair.second, (x + y) % 2 == 0),
        Tier::FourToneFavorFirst => (pair.first, pair.second, (x + y * 2) % 4 == 0),
        Tier::FourToneFavorSecond => (pair.second, pair.first, (x + y * 2) % 4 == 0),
    };

    if hit {
        secondary
    } else {
        main
    }
}
