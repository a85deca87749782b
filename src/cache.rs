//! Saved palettes and the per-color decisions made against them.
//!
//! A palette file is a TOML document holding the ordered palette, the settings
//! it was built with and every color already resolved against it:
//!
//! ```toml
//! palette = ["FF0000", "0000FF"]
//!
//! [settings]
//! dither = true
//! block_factor = 1
//! metric = "taxicab"
//!
//! [memo.800080]
//! kind = "pair"
//! pair = 0
//! tier = "two-tone"
//! ```

use crate::color::Color;
use crate::dither::Tier;
use crate::error::PalettizeError;
use crate::types::Settings;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

/// The decision made for one representative color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolutionEntry {
    /// Paint `palette[index]`.
    Solid { index: usize },
    /// Dither `pairs[pair]` at the given ratio.
    Pair { pair: usize, tier: Tier },
}

#[derive(Debug, Serialize, Deserialize)]
struct PaletteFile {
    palette: Vec<String>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    memo: BTreeMap<String, ResolutionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteCache {
    pub palette: Vec<Color>,
    pub settings: Settings,
    memo: HashMap<Color, ResolutionEntry>,
}

impl PaletteCache {
    pub fn new(palette: Vec<Color>, settings: Settings) -> Self {
        PaletteCache {
            palette,
            settings,
            memo: HashMap::new(),
        }
    }

    /// Reads a saved palette. `Ok(None)` means no file exists at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>, PalettizeError> {
        if !path.exists() {
            return Ok(None);
        }

        let load_err = |reason: String| PalettizeError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let file: PaletteFile = toml::from_str(&contents).map_err(|e| load_err(e.to_string()))?;

        file.settings
            .validate()
            .map_err(|e| load_err(e.to_string()))?;

        let palette = file
            .palette
            .iter()
            .map(|hex| hex.parse::<Color>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| load_err(e.to_string()))?;

        let mut memo = HashMap::with_capacity(file.memo.len());
        for (hex, entry) in file.memo {
            let color = hex.parse::<Color>().map_err(|e| load_err(e.to_string()))?;
            if let ResolutionEntry::Solid { index } = entry {
                if index >= palette.len() {
                    return Err(load_err(format!(
                        "memo entry {} refers to palette index {} of {}",
                        hex,
                        index,
                        palette.len()
                    )));
                }
            }
            memo.insert(color, entry);
        }

        tracing::info!(
            path = %path.display(),
            colors = palette.len(),
            memo = memo.len(),
            "Loaded saved palette"
        );

        Ok(Some(PaletteCache {
            palette,
            settings: file.settings,
            memo,
        }))
    }

    /// Writes the whole cache to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), PalettizeError> {
        let save_err = |reason: String| PalettizeError::Save {
            path: path.to_path_buf(),
            reason,
        };

        let file = PaletteFile {
            palette: self.palette.iter().map(|c| c.to_hex()).collect(),
            settings: self.settings,
            memo: self
                .memo
                .iter()
                .map(|(color, entry)| (color.to_hex(), *entry))
                .collect(),
        };
        let contents = toml::to_string_pretty(&file).map_err(|e| save_err(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
        }
        fs::write(path, contents).map_err(|e| save_err(e.to_string()))?;

        tracing::info!(path = %path.display(), memo = self.memo.len(), "Saved palette");
        Ok(())
    }

    /// Checks that every pair decision points into a pair table of `pair_count`.
    pub fn check_pairs(&self, pair_count: usize) -> Result<(), String> {
        for (color, entry) in &self.memo {
            if let ResolutionEntry::Pair { pair, .. } = entry {
                if *pair >= pair_count {
                    return Err(format!(
                        "memo entry {} refers to dither pair {} of {}",
                        color.to_hex(),
                        pair,
                        pair_count
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn lookup(&self, color: Color) -> Option<ResolutionEntry> {
        self.memo.get(&color).copied()
    }

    /// Entries are only ever added; an existing decision is kept.
    pub fn record_decision(&mut self, color: Color, entry: ResolutionEntry) {
        self.memo.entry(color).or_insert(entry);
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}
