use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PalettizeError {
    #[error("no colors provided and no saved palette to load")]
    EmptyPalette,

    #[error("failed to load palette file {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("failed to save palette file {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    #[error("invalid color code '{0}'")]
    InvalidColor(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
