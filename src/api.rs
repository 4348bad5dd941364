//! # Public API
//!
//! One-call entry points for moving tabs between text and the grid model.
//!
//! ## Functions
//! - [`import_tab()`] - decode text, failing when nothing was recognised
//! - [`import_tab_with()`] - same, with custom fallback labels
//! - [`export_tab()`] - encode a sheet to canonical text
//! - [`normalize_tab()`] - decode then re-encode (canonicalise foreign tabs)
//!
//! ## Typical Usage
//!
//! ```rust
//! use stratum::{export_tab, import_tab};
//!
//! let tab = "\
//! e|-------0-------|
//! B|-----1---1-----|
//! G|---2-------2---|
//! D|-2-----------2-|
//! A|---------------|
//! E|---------------|";
//!
//! let sheet = import_tab(tab)?;
//! assert_eq!(sheet.title, "Washed Import");
//!
//! let canonical = export_tab(&sheet);
//! assert!(canonical.starts_with("# STRATUM_PROTOCOL_V1"));
//! # Ok::<(), stratum::StratumError>(())
//! ```

use crate::decoder::{decode_with, DecodeOptions};
use crate::encoder::encode;
use crate::error::StratumError;
use crate::model::TabSheet;

/// Decode text into a fresh, unsaved sheet.
///
/// # Errors
/// Returns [`StratumError::EmptyImport`] when no staff could be recovered.
pub fn import_tab(text: &str) -> Result<TabSheet, StratumError> {
    import_tab_with(text, &DecodeOptions::default())
}

pub fn import_tab_with(text: &str, options: &DecodeOptions) -> Result<TabSheet, StratumError> {
    let decoded = decode_with(text, options);
    if decoded.is_empty() {
        return Err(StratumError::EmptyImport);
    }
    Ok(decoded.into_sheet())
}

/// Encode a sheet to canonical ASCII tab.
pub fn export_tab(sheet: &TabSheet) -> String {
    encode(sheet)
}

/// Canonicalise any tab text.
///
/// Canonical input comes back unchanged; foreign input comes back in the
/// canonical layout with whatever the wash recovered.
pub fn normalize_tab(text: &str, options: &DecodeOptions) -> Result<String, StratumError> {
    import_tab_with(text, options).map(|sheet| encode(&sheet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellOp;
    use crate::model::CursorPosition;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_import_empty_text_fails() {
        assert!(matches!(import_tab(""), Err(StratumError::EmptyImport)));
        assert!(matches!(
            import_tab("# STRATUM_PROTOCOL_V1\nOnly - Header\n"),
            Err(StratumError::EmptyImport)
        ));
    }

    #[test]
    fn test_normalize_is_stable_on_canonical_text() {
        let sheet = TabSheet::blank()
            .set_note_at(CursorPosition::new(0, 3, 2), CellOp::Digit('9'))
            .unwrap();
        let text = export_tab(&sheet);
        assert_eq!(normalize_tab(&text, &DecodeOptions::default()).unwrap(), text);
    }

    #[test]
    fn test_import_with_custom_labels() {
        let options = DecodeOptions {
            fallback_title: "Pasted".to_string(),
            fallback_artist: "Anon".to_string(),
        };
        let tab = "e|--0--------------|\nB|-----------------|\nG|-----------------|\n\
                   D|-----------------|\nA|-----------------|\nE|-----------------|";
        let sheet = import_tab_with(tab, &options).unwrap();
        assert_eq!(sheet.title, "Pasted");
        assert_eq!(sheet.artist, "Anon");
        assert!(sheet.id.is_none());
    }
}
