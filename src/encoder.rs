//! # ASCII Tab Encoder
//!
//! Renders a [`TabSheet`] as canonical plain-text tablature.
//!
//! ## Output Layout
//! ```text
//! # STRATUM_PROTOCOL_V1
//! {title} - {artist}
//! Tempo: {bpm} BPM | Meter: {time_signature}/4
//!
//! Staff 1
//!    [BPM:140]
//! E |0--------3--|-----...|
//! B |------------|-----...|
//! ...
//! ```
//!
//! The header fields are escaped (see [`TITLE_SEPARATOR`]) so any title and
//! artist, including empty ones, come back intact from the decoder.
//!
//! ## Column Widths
//! Each column is as wide as its widest cell plus one dash, never narrower than
//! [`MIN_COLUMN_WIDTH`]. A column carrying an override annotation is also wide
//! enough to hold the annotation plus a space, so annotations on neighbouring
//! columns never collide. All six strings of a column share its width.
//!
//! ## Annotation Line
//! The line above the strings uses the same coordinates as the string lines:
//! a [`GUTTER_WIDTH`] margin, then one character per string-line character,
//! with a space wherever the string lines carry a bar. The decoder relies on
//! this to map annotations back to columns.
//!
//! ## Bar Lines
//! A `|` is inserted every `meter * 4` columns (four grid columns per beat).
//! The meter is the sheet's time signature until a column overrides it; a
//! meter change also opens a new measure.

use crate::model::{tuning_label, TabColumn, TabRow, TabSheet};

/// First line of every canonical export.
pub const PROTOCOL_SENTINEL: &str = "# STRATUM_PROTOCOL_V1";

/// Narrowest column the encoder emits, and the decoder's blank-column step.
pub const MIN_COLUMN_WIDTH: usize = 3;

/// Tuning letter (2 chars) plus the opening bar.
pub const GUTTER_WIDTH: usize = 3;

/// Between title and artist on the header line.
pub const TITLE_SEPARATOR: &str = " - ";

/// Encode a sheet to canonical ASCII tab.
///
/// # Example
/// ```
/// use stratum::{encode, CellOp, CursorPosition, TabSheet};
///
/// let sheet = TabSheet::blank()
///     .set_note_at(CursorPosition::new(0, 0, 0), CellOp::Digit('0'))?;
/// let text = encode(&sheet);
/// assert!(text.contains("\nE |0--"));
/// # Ok::<(), stratum::StratumError>(())
/// ```
pub fn encode(sheet: &TabSheet) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", PROTOCOL_SENTINEL));
    out.push_str(&format!(
        "{}{}{}\n",
        header_field(&sheet.title),
        TITLE_SEPARATOR,
        header_field(&sheet.artist)
    ));
    out.push_str(&format!(
        "Tempo: {} BPM | Meter: {}/4\n",
        sheet.bpm, sheet.time_signature
    ));
    out.push('\n');

    let gutters: Vec<String> = sheet.tuning.iter().map(|p| gutter(p)).collect();
    let mut meter = sheet.time_signature.max(1);

    for (index, row) in sheet.rows.iter().enumerate() {
        out.push_str(&format!("Staff {}\n", index + 1));
        encode_row(&mut out, row, &gutters, &mut meter);
        out.push('\n');
    }

    out
}

fn encode_row(out: &mut String, row: &TabRow, gutters: &[String], meter: &mut u8) {
    let mut annotation_line = " ".repeat(GUTTER_WIDTH);
    let mut strings: Vec<String> = gutters.to_vec();
    let mut since_bar = 0usize;

    for (c, column) in row.columns.iter().enumerate() {
        let measure_full = since_bar >= *meter as usize * 4;
        let meter_change = column.time_signature.is_some() && since_bar > 0;
        if c > 0 && (measure_full || meter_change) {
            for line in strings.iter_mut() {
                line.push('|');
            }
            annotation_line.push(' ');
            since_bar = 0;
        }
        if let Some(ts) = column.time_signature {
            *meter = ts.max(1);
        }

        let annotation = format_annotation(column);
        let width = column_width(column, annotation.as_deref());

        match &annotation {
            Some(text) => annotation_line.push_str(&format!("{:<width$}", text, width = width)),
            None => annotation_line.push_str(&" ".repeat(width)),
        }
        for (line, cell) in strings.iter_mut().zip(column.notes.iter()) {
            line.push_str(&format!("{:-<width$}", cell.to_string(), width = width));
        }
        since_bar += 1;
    }

    out.push_str(annotation_line.trim_end());
    out.push('\n');
    for line in strings {
        out.push_str(&format!("{}|\n", line));
    }
}

/// Display width of a column: widest cell + 1, annotation + 1, at least 3.
pub fn column_width(column: &TabColumn, annotation: Option<&str>) -> usize {
    let longest_cell = column.notes.iter().map(|c| c.width()).max().unwrap_or(0);
    let annotation_width = annotation.map_or(0, |a| a.chars().count() + 1);
    MIN_COLUMN_WIDTH.max(longest_cell + 1).max(annotation_width)
}

/// The `[BPM:n TS:n]` marker for a column with overrides.
pub fn format_annotation(column: &TabColumn) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(bpm) = column.bpm {
        parts.push(format!("BPM:{}", bpm));
    }
    if let Some(ts) = column.time_signature {
        parts.push(format!("TS:{}", ts));
    }
    (!parts.is_empty()).then(|| format!("[{}]", parts.join(" ")))
}

fn gutter(pitch: &str) -> String {
    let label: String = tuning_label(pitch).chars().take(2).collect();
    format!("{:<2}|", label)
}

/// One header field on a single line. A backslash, or a dash that follows a
/// space, is escaped with a backslash so the first bare [`TITLE_SEPARATOR`]
/// always ends the title.
fn header_field(text: &str) -> String {
    let mut field = String::with_capacity(text.len());
    let mut previous = None;
    for c in text.chars() {
        let c = if matches!(c, '\r' | '\n') { ' ' } else { c };
        match c {
            '\\' => field.push_str("\\\\"),
            '-' if previous == Some(' ') => field.push_str("\\-"),
            _ => field.push(c),
        }
        previous = Some(c);
    }
    field
}
