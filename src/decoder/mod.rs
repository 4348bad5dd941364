//! # ASCII Tab Decoder
//!
//! Turns plain-text tablature back into grid rows. Decoding never fails: the
//! worst outcome is a [`DecodedTab`] with no rows, and callers decide whether
//! that counts as a failed import (see [`crate::import_tab`]).
//!
//! ## Two-Stage Dispatch
//! 1. **Protocol** - text carrying [`PROTOCOL_SENTINEL`] is read by the strict
//!    scanner, which inverts the encoder's layout exactly (title, tempo, meter,
//!    tuning letters, column overrides, cells).
//! 2. **Wash** - anything else goes through the universal wash, a lossy
//!    proportional quantizer for hand-typed or foreign tabs. Only cells survive;
//!    metadata comes from [`DecodeOptions`] and the model defaults.
//!
//! ## Example
//! ```rust
//! use stratum::{decode, SourceFormat};
//!
//! let decoded = decode("e|---7---7---|\nB|---8---8---|");
//! assert_eq!(decoded.format, SourceFormat::Wash);
//! assert!(decoded.rows.is_empty()); // two strings are not a staff
//! ```

mod scanner;
mod wash;

use crate::encoder::PROTOCOL_SENTINEL;
use crate::model::{
    standard_tuning, SheetConfig, TabRow, TabSheet, DEFAULT_BPM, DEFAULT_TIME_SIGNATURE,
    STRING_COUNT,
};
use serde::Serialize;

pub use wash::wash_rows;

pub const DEFAULT_FALLBACK_TITLE: &str = "Washed Import";
pub const DEFAULT_FALLBACK_ARTIST: &str = "Universal Salvage";

/// Labels applied when the text itself carries no metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub fallback_title: String,
    pub fallback_artist: String,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            fallback_title: DEFAULT_FALLBACK_TITLE.to_string(),
            fallback_artist: DEFAULT_FALLBACK_ARTIST.to_string(),
        }
    }
}

/// Which decoder stage produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Protocol,
    Wash,
}

/// Everything recovered from a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTab {
    pub title: String,
    pub artist: String,
    pub bpm: u16,
    pub time_signature: u8,
    /// Present when the staff gutters named the strings
    pub tuning: Option<[String; STRING_COUNT]>,
    pub rows: Vec<TabRow>,
    pub format: SourceFormat,
}

impl DecodedTab {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Assemble a fresh, unsaved sheet from the decoded parts.
    pub fn into_sheet(self) -> TabSheet {
        TabSheet {
            id: None,
            title: self.title,
            artist: self.artist,
            tuning: self.tuning.unwrap_or_else(standard_tuning),
            bpm: self.bpm,
            time_signature: self.time_signature,
            rows: self.rows,
            config: SheetConfig::default(),
        }
    }
}

/// Decode with the default fallback labels.
pub fn decode(text: &str) -> DecodedTab {
    decode_with(text, &DecodeOptions::default())
}

pub fn decode_with(text: &str, options: &DecodeOptions) -> DecodedTab {
    if text.contains(PROTOCOL_SENTINEL) {
        log::debug!(target: "decoder", "protocol sentinel found, using strict scanner");
        return scanner::scan(text);
    }

    log::debug!(target: "decoder", "no protocol sentinel, falling back to universal wash");
    DecodedTab {
        title: options.fallback_title.clone(),
        artist: options.fallback_artist.clone(),
        bpm: DEFAULT_BPM,
        time_signature: DEFAULT_TIME_SIGNATURE,
        tuning: None,
        rows: wash_rows(text),
        format: SourceFormat::Wash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_dispatch() {
        let text = "# STRATUM_PROTOCOL_V1\nTest - Artist\nTempo: 120 BPM\n\nStaff 1\nE |---0---|";
        let decoded = decode(text);
        assert_eq!(decoded.format, SourceFormat::Protocol);
        assert_eq!(decoded.title, "Test");
        assert_eq!(decoded.artist, "Artist");
    }

    #[test]
    fn test_wash_dispatch_uses_fallback_labels() {
        let decoded = decode("e|---7---7---|\nB|---8---8---|");
        assert_eq!(decoded.format, SourceFormat::Wash);
        assert_eq!(decoded.title, "Washed Import");
        assert_eq!(decoded.artist, "Universal Salvage");
    }

    #[test]
    fn test_custom_fallback_labels() {
        let options = DecodeOptions {
            fallback_title: "riff.txt".to_string(),
            fallback_artist: "Clipboard".to_string(),
        };
        let decoded = decode_with("nothing here", &options);
        assert_eq!(decoded.title, "riff.txt");
        assert_eq!(decoded.artist, "Clipboard");
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let decoded = decode("");
        assert!(decoded.is_empty());
        assert_eq!(decoded.bpm, DEFAULT_BPM);
        let sheet = decoded.into_sheet();
        assert!(sheet.rows.is_empty());
        assert_eq!(sheet.tuning, standard_tuning());
    }

    #[test]
    fn test_truncated_protocol_text() {
        let text = "# STRATUM_PROTOCOL_V1\nT - A\nTempo: 100 BPM | Meter: 4/4\n\nStaff 1\n\nE |0--|\nB |--";
        let decoded = decode(text);
        assert!(decoded.rows.is_empty());
        assert_eq!(decoded.bpm, 100);
    }
}
