//! # Editor Configuration
//!
//! Optional YAML file with editor defaults. Every key may be omitted:
//!
//! ```yaml
//! history-depth: 100
//! defaults:
//!   title: Untitled Riff
//!   artist: Me
//!   bpm: 90
//!   time-signature: 3
//!   tuning: [E4, B3, G3, D3, A2, D2]
//!   show-measure-numbers: true
//! import:
//!   fallback-title: Clipboard Import
//!   fallback-artist: Unknown
//! storage:
//!   dir: ~/tabs
//! ```
//!
//! The file is read into raw optional fields first and then sanitised into
//! an [`EditorConfig`], so out-of-range numbers are clamped rather than
//! rejected.

use crate::decoder::{DecodeOptions, DEFAULT_FALLBACK_ARTIST, DEFAULT_FALLBACK_TITLE};
use crate::error::StratumError;
use crate::history::DEFAULT_HISTORY_DEPTH;
use crate::model::{
    clamp_bpm, clamp_time_signature, retune, standard_tuning, SheetConfig, TabSheet, DEFAULT_ARTIST,
    DEFAULT_BPM, DEFAULT_TIME_SIGNATURE, DEFAULT_TITLE, STRING_COUNT,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    history_depth: Option<usize>,
    #[serde(default)]
    defaults: RawDefaults,
    #[serde(default)]
    import: RawImport,
    #[serde(default)]
    storage: RawStorage,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawDefaults {
    title: Option<String>,
    artist: Option<String>,
    bpm: Option<u32>,
    time_signature: Option<u32>,
    tuning: Option<Vec<String>>,
    show_measure_numbers: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawImport {
    fallback_title: Option<String>,
    fallback_artist: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawStorage {
    dir: Option<PathBuf>,
}

/// Values for freshly created sheets
#[derive(Debug, Clone, PartialEq)]
pub struct SheetDefaults {
    pub title: String,
    pub artist: String,
    pub bpm: u16,
    pub time_signature: u8,
    pub tuning: [String; STRING_COUNT],
    pub show_measure_numbers: bool,
}

impl Default for SheetDefaults {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            artist: DEFAULT_ARTIST.to_string(),
            bpm: DEFAULT_BPM,
            time_signature: DEFAULT_TIME_SIGNATURE,
            tuning: standard_tuning(),
            show_measure_numbers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub history_depth: usize,
    pub defaults: SheetDefaults,
    pub import: DecodeOptions,
    /// Project directory for the file store, if any
    pub storage_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            defaults: SheetDefaults::default(),
            import: DecodeOptions::default(),
            storage_dir: None,
        }
    }
}

impl EditorConfig {
    /// Parse and sanitise YAML text. An empty document is the default config.
    ///
    /// # Example
    /// ```
    /// use stratum::EditorConfig;
    ///
    /// let config = EditorConfig::from_yaml("defaults:\n  bpm: 900\n")?;
    /// assert_eq!(config.defaults.bpm, 400);
    /// assert_eq!(config.history_depth, 50);
    /// # Ok::<(), stratum::StratumError>(())
    /// ```
    pub fn from_yaml(text: &str) -> Result<Self, StratumError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    pub fn load(path: &Path) -> Result<Self, StratumError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        log::debug!(target: "config", "loaded {}", path.display());
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it is missing or bad.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    target: "config",
                    "ignoring config {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn from_raw(raw: RawConfig) -> Self {
        let base = SheetDefaults::default();
        let d = raw.defaults;

        let mut tuning = base.tuning.clone();
        if let Some(entries) = d.tuning {
            if entries.len() != STRING_COUNT {
                log::warn!(
                    target: "config",
                    "tuning needs {} entries, got {}; keeping standard tuning",
                    STRING_COUNT,
                    entries.len()
                );
            } else {
                for (slot, pitch) in tuning.iter_mut().zip(&entries) {
                    match retune(slot, pitch) {
                        Some(tuned) => *slot = tuned,
                        None => log::warn!(target: "config", "ignoring tuning entry '{}'", pitch),
                    }
                }
            }
        }

        Self {
            history_depth: raw.history_depth.unwrap_or(DEFAULT_HISTORY_DEPTH).max(1),
            defaults: SheetDefaults {
                title: d.title.unwrap_or(base.title),
                artist: d.artist.unwrap_or(base.artist),
                bpm: d.bpm.filter(|b| *b > 0).map_or(base.bpm, clamp_bpm),
                time_signature: d
                    .time_signature
                    .filter(|t| *t > 0)
                    .map_or(base.time_signature, clamp_time_signature),
                tuning,
                show_measure_numbers: d.show_measure_numbers.unwrap_or(false),
            },
            import: DecodeOptions {
                fallback_title: raw
                    .import
                    .fallback_title
                    .unwrap_or_else(|| DEFAULT_FALLBACK_TITLE.to_string()),
                fallback_artist: raw
                    .import
                    .fallback_artist
                    .unwrap_or_else(|| DEFAULT_FALLBACK_ARTIST.to_string()),
            },
            storage_dir: raw.storage.dir,
        }
    }

    /// A blank sheet carrying the configured defaults.
    pub fn create_sheet(&self) -> TabSheet {
        let d = &self.defaults;
        TabSheet {
            title: d.title.clone(),
            artist: d.artist.clone(),
            bpm: d.bpm,
            time_signature: d.time_signature,
            tuning: d.tuning.clone(),
            config: SheetConfig {
                show_measure_numbers: d.show_measure_numbers,
            },
            ..TabSheet::blank()
        }
    }

    pub fn decode_options(&self) -> &DecodeOptions {
        &self.import
    }
}
