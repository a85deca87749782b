use crate::color::Color;
use crate::constants::{OUTPUT_SUFFIX, VERSION};
use crate::types::{AppConfig, Metric, Settings};

use anyhow::{Context, Result};
use clap::{Arg, Command};
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use serde_derive::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct SerializedAppConfig {
    dither: bool,
    block_factor: u32,
    metric: String,
    lower_threshold: f64,
    upper_threshold: f64,
}

fn load_config(config_path: Option<&str>) -> Result<SerializedAppConfig, config::ConfigError> {
    let defaults = Settings::default();
    let mut builder = ConfigBuilder::default();

    builder = builder
        .set_default("dither", defaults.dither)?
        .set_default("block_factor", defaults.block_factor as i64)?
        .set_default("metric", defaults.metric.to_string())?
        .set_default("lower_threshold", defaults.lower_threshold)?
        .set_default("upper_threshold", defaults.upper_threshold)?;

    let default_config_path = config_dir().join("config.toml");

    if default_config_path.exists() {
        builder = ConfigBuilder::<DefaultState>::add_source(
            builder,
            File::from(default_config_path).required(false),
        );
    }

    if let Some(path) = config_path {
        builder = builder.add_source(File::with_name(path).required(true));
    }

    let config = builder.build()?;

    config.try_deserialize()
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from(""))
        .join(".config/palettize")
}

/// A name ending in `.toml` is used as a path; anything else lives in the
/// palettes directory.
pub fn palette_path(name: &str, config_dir: &Path) -> PathBuf {
    if name.ends_with(".toml") {
        PathBuf::from(name)
    } else {
        config_dir.join("palettes").join(format!("{}.toml", name))
    }
}

/// `photo.png` becomes `photo-palettize.png`.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    input.with_file_name(name)
}

/// Collects colors from hex arguments and `.txt` files, uppercased and
/// deduplicated in first-seen order. Invalid codes are skipped with a warning.
pub fn gather_colors<'a>(args: impl IntoIterator<Item = &'a str>) -> Result<Vec<Color>> {
    let mut colors: Vec<Color> = Vec::new();
    let mut push = |word: &str| match word.parse::<Color>() {
        Ok(color) if !colors.contains(&color) => colors.push(color),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Dropping color"),
    };

    for arg in args {
        if arg.ends_with(".txt") {
            let path = Path::new(arg);
            if !path.is_file() {
                tracing::warn!(path = %path.display(), "Color file not found, skipping");
                continue;
            }
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read color file {}", path.display()))?;
            for word in contents.split_whitespace() {
                push(word);
            }
        } else {
            push(arg);
        }
    }

    Ok(colors)
}

pub fn init() -> Result<AppConfig> {
    let matches = Command::new("palettize")
        .version(VERSION)
        .about("Reduces images to a fixed palette with ordered dithering")
        .after_help("Colors are 6-digit hex codes (an optional leading '#' is accepted) or .txt files containing them.\n\nWhen --palette names a file that already exists, its colors and settings are used and any colors or settings given on the command line are ignored. When it does not exist yet, it is created at the end of the run together with every color decision made, so later runs against the same palette skip the search.")
        .arg(
            Arg::new("Block Factor")
                .short('b')
                .long("block-factor")
                .value_name("FACTOR")
                .help("[1-] Averages FACTORxFACTOR blocks into one output pixel")
                .takes_value(true),
        )
        .arg(
            Arg::new("Metric")
                .short('m')
                .long("metric")
                .value_name("METRIC")
                .help("Color distance used for matching")
                .possible_values(["taxicab", "euclidean"])
                .takes_value(true),
        )
        .arg(
            Arg::new("No Dither")
                .long("no-dither")
                .help("Only paint solid palette colors"),
        )
        .arg(
            Arg::new("Lower Threshold")
                .long("lower-threshold")
                .value_name("FRACTION")
                .help("[0.0-1.0] Pairs closer than this are not blended")
                .takes_value(true),
        )
        .arg(
            Arg::new("Upper Threshold")
                .long("upper-threshold")
                .value_name("FRACTION")
                .help("[0.0-1.0] Pairs further apart than this are not blended")
                .takes_value(true),
        )
        .arg(
            Arg::new("Palette")
                .short('p')
                .long("palette")
                .value_name("NAME")
                .help("Saved palette to load, or to create if it does not exist")
                .takes_value(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("/path/to/config.toml")
                .help("Sets a custom config file")
                .takes_value(true),
        )
        .arg(
            Arg::new("Image Path")
                .help("Path to the image you'd like to palettize")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("Colors")
                .help("Hex color codes or .txt files of them")
                .multiple_values(true)
                .index(2),
        )
        .get_matches();

    let config = load_config(matches.value_of("config")).context("Failed to load config")?;
    let input_path = PathBuf::from(matches.value_of("Image Path").unwrap_or_default());

    let block_factor: u32 = match matches.value_of("Block Factor") {
        Some(value) => value
            .parse()
            .with_context(|| format!("Failed to parse block factor '{}'", value))?,
        None => config.block_factor,
    };

    let metric: Metric = matches
        .value_of("Metric")
        .unwrap_or(&config.metric)
        .parse()?;

    let lower_threshold: f64 = match matches.value_of("Lower Threshold") {
        Some(value) => value
            .parse()
            .with_context(|| format!("Failed to parse lower threshold '{}'", value))?,
        None => config.lower_threshold,
    };

    let upper_threshold: f64 = match matches.value_of("Upper Threshold") {
        Some(value) => value
            .parse()
            .with_context(|| format!("Failed to parse upper threshold '{}'", value))?,
        None => config.upper_threshold,
    };

    let settings = Settings {
        dither: config.dither && !matches.is_present("No Dither"),
        block_factor,
        metric,
        lower_threshold,
        upper_threshold,
    };
    settings.validate()?;

    let colors = gather_colors(matches.values_of("Colors").into_iter().flatten())?;
    let palette_path = matches
        .value_of("Palette")
        .map(|name| palette_path(name, &config_dir()));

    Ok(AppConfig {
        output_path: output_path(&input_path),
        input_path,
        colors,
        settings,
        palette_path,
    })
}
