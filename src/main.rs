mod cache;
mod color;
mod config;
mod constants;
mod dither;
mod downsample;
mod error;
mod palettize;
mod types;

use crate::cache::PaletteCache;
use crate::config::init;
use crate::dither::build_dither_pairs;
use crate::error::PalettizeError;
use crate::palettize::palettize;
use crate::types::AppConfig;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palettize=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = init()?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta}) {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
    );

    run(&config, &pb)
}

/// Loads or creates the palette, writes the output image and, for a palette
/// that did not exist before this run, saves it with every decision made.
fn run(config: &AppConfig, pb: &ProgressBar) -> Result<()> {
    let loaded = match &config.palette_path {
        Some(path) => PaletteCache::load(path)?,
        None => None,
    };
    let is_new = loaded.is_none();

    let mut cache = match loaded {
        Some(cache) => {
            if !config.colors.is_empty() {
                tracing::warn!(
                    ignored = config.colors.len(),
                    "Using saved palette, colors and settings from this invocation are ignored"
                );
            }
            cache
        }
        None => PaletteCache::new(config.colors.clone(), config.settings),
    };

    if cache.palette.is_empty() {
        return Err(PalettizeError::EmptyPalette.into());
    }

    let settings = cache.settings;
    let pairs = build_dither_pairs(
        &cache.palette,
        settings.metric,
        settings.lower_threshold,
        settings.upper_threshold,
    );
    if let Err(reason) = cache.check_pairs(pairs.len()) {
        return Err(PalettizeError::Load {
            path: config.palette_path.clone().unwrap_or_default(),
            reason,
        }
        .into());
    }

    tracing::info!(
        input = %config.input_path.display(),
        colors = cache.palette.len(),
        pairs = pairs.len(),
        dither = settings.dither,
        block_factor = settings.block_factor,
        metric = %settings.metric,
        "Palettizing"
    );

    let img = image::open(&config.input_path)
        .with_context(|| format!("Failed to open {}", config.input_path.display()))?
        .to_rgb8();

    let output = palettize(&img, &mut cache, &pairs, pb)?;
    output
        .save(&config.output_path)
        .with_context(|| format!("Failed to save {}", config.output_path.display()))?;
    tracing::info!(output = %config.output_path.display(), "Saved image");

    if let Some(path) = config.palette_path.as_deref().filter(|_| is_new) {
        if let Err(e) = cache.save(path) {
            tracing::error!(error = %e, "Image was written but the palette could not be saved");
            return Err(e.into());
        }
    }

    Ok(())
}
