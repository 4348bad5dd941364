//! # Grid Model
//!
//! The authoritative tab document and its structural mutations.
//!
//! ## Type Hierarchy
//! ```text
//! TabSheet
//!   ├── title, artist, bpm, time_signature
//!   ├── tuning: [String; 6]        (index 0 = highest string, "E4")
//!   ├── config: SheetConfig
//!   └── Vec<TabRow>
//!         └── [TabColumn; COLS_PER_ROW]
//!               ├── notes: [Cell; 6]
//!               ├── bpm: Option<u16>            (tempo change from here on)
//!               └── time_signature: Option<u8>  (meter change from here on)
//! ```
//!
//! ## Mutation Model
//! Every mutation takes `&self` and returns a new sheet, so the history manager
//! can hold earlier snapshots untouched. Coordinates outside the grid are caller
//! bugs and fail with [`StratumError::OutOfRange`]; rejected values (a bad
//! tuning letter, a fret above 24) leave the sheet unchanged.

use crate::cell::{Cell, CellOp};
use crate::error::StratumError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Columns in every row.
pub const COLS_PER_ROW: usize = 32;
/// Strings per column.
pub const STRING_COUNT: usize = 6;

pub const DEFAULT_BPM: u16 = 120;
pub const MIN_BPM: u16 = 1;
pub const MAX_BPM: u16 = 400;
pub const DEFAULT_TIME_SIGNATURE: u8 = 4;
pub const MAX_TIME_SIGNATURE: u8 = 16;

pub const DEFAULT_TITLE: &str = "New Tab";
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Standard EADGBE, highest string first.
pub const STANDARD_TUNING: [&str; STRING_COUNT] = ["E4", "B3", "G3", "D3", "A2", "E2"];

pub fn standard_tuning() -> [String; STRING_COUNT] {
    STANDARD_TUNING.map(String::from)
}

/// Per-sheet display options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetConfig {
    #[serde(default)]
    pub show_measure_numbers: bool,
}

/// One rhythmic time-slice across all strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabColumn {
    pub id: Uuid,
    pub notes: [Cell; STRING_COUNT],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<u8>,
}

impl TabColumn {
    pub fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            notes: Default::default(),
            bpm: None,
            time_signature: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.notes.iter().all(Cell::is_empty)
    }

    pub fn has_override(&self) -> bool {
        self.bpm.is_some() || self.time_signature.is_some()
    }
}

/// A fixed-width staff of [`COLS_PER_ROW`] columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRow")]
pub struct TabRow {
    pub id: Uuid,
    pub columns: Vec<TabColumn>,
}

/// Row shape as found in storage; older records carry 16 or 24 columns.
#[derive(Deserialize)]
struct StoredRow {
    id: Uuid,
    columns: Vec<TabColumn>,
}

impl From<StoredRow> for TabRow {
    fn from(stored: StoredRow) -> Self {
        let mut columns = stored.columns;
        if columns.len() != COLS_PER_ROW {
            log::debug!(
                target: "storage",
                "normalising stored row {} from {} to {} columns",
                stored.id,
                columns.len(),
                COLS_PER_ROW
            );
        }
        columns.truncate(COLS_PER_ROW);
        columns.resize_with(COLS_PER_ROW, TabColumn::blank);
        TabRow {
            id: stored.id,
            columns,
        }
    }
}

impl TabRow {
    pub fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            columns: (0..COLS_PER_ROW).map(|_| TabColumn::blank()).collect(),
        }
    }

    /// Build a row from decoded columns, padding or truncating to the fixed width.
    pub fn from_columns(mut columns: Vec<TabColumn>) -> Self {
        columns.truncate(COLS_PER_ROW);
        columns.resize_with(COLS_PER_ROW, TabColumn::blank);
        Self {
            id: Uuid::new_v4(),
            columns,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.columns.iter().all(TabColumn::is_blank)
    }
}

/// Pointer into the grid, owned by the editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPosition {
    pub row_index: usize,
    pub column_index: usize,
    pub string_index: usize,
}

impl CursorPosition {
    pub fn new(row_index: usize, column_index: usize, string_index: usize) -> Self {
        Self {
            row_index,
            column_index,
            string_index,
        }
    }

    /// Clamp into the bounds of `sheet`.
    pub fn clamped(self, sheet: &TabSheet) -> Self {
        Self {
            row_index: self.row_index.min(sheet.rows.len().saturating_sub(1)),
            column_index: self.column_index.min(COLS_PER_ROW - 1),
            string_index: self.string_index.min(STRING_COUNT - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    /// Insert a blank column, evicting the row's last column
    Right,
    /// Remove a column, appending a blank one at the end
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Title,
    Artist,
    Bpm,
    TimeSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideField {
    Bpm,
    TimeSignature,
}

/// The root tab document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSheet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub title: String,
    pub artist: String,
    pub tuning: [String; STRING_COUNT],
    pub bpm: u16,
    pub time_signature: u8,
    pub rows: Vec<TabRow>,
    #[serde(default)]
    pub config: SheetConfig,
}

impl Default for TabSheet {
    fn default() -> Self {
        Self::blank()
    }
}

impl TabSheet {
    /// A fresh sheet: one blank row, standard tuning, 120 BPM, 4/4.
    ///
    /// # Example
    /// ```
    /// use stratum::{TabSheet, COLS_PER_ROW};
    ///
    /// let sheet = TabSheet::blank();
    /// assert_eq!(sheet.rows.len(), 1);
    /// assert_eq!(sheet.rows[0].columns.len(), COLS_PER_ROW);
    /// assert_eq!(sheet.tuning[0], "E4");
    /// ```
    pub fn blank() -> Self {
        Self {
            id: None,
            title: DEFAULT_TITLE.to_string(),
            artist: DEFAULT_ARTIST.to_string(),
            tuning: standard_tuning(),
            bpm: DEFAULT_BPM,
            time_signature: DEFAULT_TIME_SIGNATURE,
            rows: vec![TabRow::blank()],
            config: SheetConfig::default(),
        }
    }

    pub fn cell_at(&self, pos: CursorPosition) -> Result<&Cell, StratumError> {
        self.rows
            .get(pos.row_index)
            .and_then(|row| row.columns.get(pos.column_index))
            .and_then(|col| col.notes.get(pos.string_index))
            .ok_or(out_of_range(pos))
    }

    pub fn column_at(&self, row: usize, column: usize) -> Result<&TabColumn, StratumError> {
        self.rows
            .get(row)
            .and_then(|r| r.columns.get(column))
            .ok_or(out_of_range(CursorPosition::new(row, column, 0)))
    }

    /// Apply a cell operation at `pos`.
    ///
    /// # Example
    /// ```
    /// use stratum::{CellOp, CursorPosition, TabSheet};
    ///
    /// let sheet = TabSheet::blank()
    ///     .set_note_at(CursorPosition::new(0, 0, 0), CellOp::Digit('1'))?
    ///     .set_note_at(CursorPosition::new(0, 0, 0), CellOp::Digit('2'))?;
    /// assert_eq!(sheet.rows[0].columns[0].notes[0].to_string(), "12");
    /// # Ok::<(), stratum::StratumError>(())
    /// ```
    pub fn set_note_at(&self, pos: CursorPosition, op: CellOp) -> Result<TabSheet, StratumError> {
        let current = self.cell_at(pos)?;
        let updated = op.apply(current);
        let mut next = self.clone();
        next.rows[pos.row_index].columns[pos.column_index].notes[pos.string_index] = updated;
        Ok(next)
    }

    pub fn append_row(&self) -> TabSheet {
        let mut next = self.clone();
        next.rows.push(TabRow::blank());
        next
    }

    /// Shift the notes of one row around `column`, keeping the row width fixed.
    pub fn shift_notes(
        &self,
        row: usize,
        column: usize,
        direction: ShiftDirection,
    ) -> Result<TabSheet, StratumError> {
        self.column_at(row, column)?;
        let mut next = self.clone();
        let columns = &mut next.rows[row].columns;
        match direction {
            ShiftDirection::Right => {
                columns.insert(column, TabColumn::blank());
                columns.pop();
            }
            ShiftDirection::Left => {
                columns.remove(column);
                columns.push(TabColumn::blank());
            }
        }
        Ok(next)
    }

    /// Set or clear a per-column override. `None` or zero clears.
    pub fn set_column_override(
        &self,
        row: usize,
        column: usize,
        field: OverrideField,
        value: Option<u16>,
    ) -> Result<TabSheet, StratumError> {
        self.column_at(row, column)?;
        let value = value.filter(|v| *v > 0);
        let mut next = self.clone();
        let target = &mut next.rows[row].columns[column];
        match field {
            OverrideField::Bpm => target.bpm = value.map(|v| clamp_bpm(v as u32)),
            OverrideField::TimeSignature => {
                target.time_signature = value.map(|v| clamp_time_signature(v as u32))
            }
        }
        Ok(next)
    }

    /// Retune one string.
    ///
    /// The existing octave is kept unless `pitch` carries its own octave digit.
    /// Input that is not a pitch letter leaves the sheet unchanged.
    pub fn set_tuning(&self, string_index: usize, pitch: &str) -> Result<TabSheet, StratumError> {
        let existing = self
            .tuning
            .get(string_index)
            .ok_or(out_of_range(CursorPosition::new(0, 0, string_index)))?;
        let mut next = self.clone();
        match retune(existing, pitch) {
            Some(tuned) => next.tuning[string_index] = tuned,
            None => log::debug!(target: "session", "rejected tuning '{}'", pitch),
        }
        Ok(next)
    }

    /// Update a metadata field from raw user input.
    pub fn set_metadata(&self, field: MetadataField, value: &str) -> TabSheet {
        let mut next = self.clone();
        match field {
            MetadataField::Title => next.title = value.to_string(),
            MetadataField::Artist => next.artist = value.to_string(),
            MetadataField::Bpm => next.bpm = parse_bpm(value),
            MetadataField::TimeSignature => next.time_signature = parse_time_signature(value),
        }
        next
    }

    pub fn with_id(&self, id: Uuid) -> TabSheet {
        let mut next = self.clone();
        next.id = Some(id);
        next
    }
}

fn out_of_range(pos: CursorPosition) -> StratumError {
    StratumError::OutOfRange {
        row: pos.row_index,
        column: pos.column_index,
        string: pos.string_index,
    }
}

pub fn clamp_bpm(bpm: u32) -> u16 {
    bpm.clamp(MIN_BPM as u32, MAX_BPM as u32) as u16
}

pub fn clamp_time_signature(beats: u32) -> u8 {
    beats.clamp(1, MAX_TIME_SIGNATURE as u32) as u8
}

fn parse_positive(value: &str) -> Option<u32> {
    let digits = value.trim().trim_start_matches('0');
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Anything too long for u32 is far above every cap.
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}

/// Sanitise raw bpm input: non-numeric or zero becomes [`DEFAULT_BPM`].
pub fn parse_bpm(value: &str) -> u16 {
    parse_positive(value).map_or(DEFAULT_BPM, clamp_bpm)
}

/// Sanitise raw meter input: non-numeric or zero becomes [`DEFAULT_TIME_SIGNATURE`].
pub fn parse_time_signature(value: &str) -> u8 {
    parse_positive(value).map_or(DEFAULT_TIME_SIGNATURE, clamp_time_signature)
}

/// Pitch letter with accidental and octave digit split apart.
pub(crate) struct PitchParts<'a> {
    pub letter: char,
    pub accidental: &'a str,
    pub octave: Option<char>,
}

pub(crate) fn split_pitch(pitch: &str) -> Option<PitchParts<'_>> {
    let pitch = pitch.trim();
    let letter = pitch.chars().next()?;
    if !matches!(letter.to_ascii_uppercase(), 'A'..='G') {
        return None;
    }
    let rest = &pitch[letter.len_utf8()..];
    let (accidental, rest) = match rest.chars().next() {
        Some('#') | Some('b') => (&rest[..1], &rest[1..]),
        _ => ("", rest),
    };
    let octave = match rest.len() {
        0 => None,
        1 if rest.as_bytes()[0].is_ascii_digit() => rest.chars().next(),
        _ => return None,
    };
    Some(PitchParts {
        letter: letter.to_ascii_uppercase(),
        accidental,
        octave,
    })
}

/// Combine a new pitch letter with an existing tuning entry.
///
/// Returns `None` when `pitch` is not a valid pitch name.
pub fn retune(existing: &str, pitch: &str) -> Option<String> {
    let parts = split_pitch(pitch)?;
    let octave = parts
        .octave
        .or_else(|| existing.chars().find(|c| c.is_ascii_digit()));
    let mut tuned = format!("{}{}", parts.letter, parts.accidental);
    if let Some(o) = octave {
        tuned.push(o);
    }
    Some(tuned)
}

/// The gutter label for a tuning entry: octave digits stripped.
pub fn tuning_label(pitch: &str) -> String {
    pitch.chars().filter(|c| !c.is_ascii_digit()).collect()
}
