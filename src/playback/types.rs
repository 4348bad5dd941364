//! Playback timeline type definitions
//!
//! Everything here is plain data for the audio collaborator: it schedules the
//! notes and moves the cursor on each step, but never mutates the sheet.

use serde::Serialize;

/// How a note should be voiced
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Articulation {
    /// Plain picked note (quarter length)
    Normal,
    /// Muted strike at a fixed low pitch
    DeadNote,
    /// Shortened, quieter note
    PalmMute,
    /// Second fret of a hammer-on / pull-off / slide chain
    Legato,
}

/// One scheduled sound.
///
/// # Fields
/// - `midi_note`: pitch to trigger (tuning + fret, +12 for harmonics)
/// - `start_time`: seconds from the playback start
/// - `duration`: seconds the note rings
/// - `velocity`: 0.0..=1.0
/// - `row_index`, `column_index`, `string_index`: grid origin of the note
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackNote {
    pub midi_note: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: f32,
    pub articulation: Articulation,
    pub harmonic: bool,
    pub vibrato: bool,
    pub row_index: usize,
    pub column_index: usize,
    pub string_index: usize,
}

/// A column boundary, used to move the cursor in sync with the audio.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStep {
    pub row_index: usize,
    pub column_index: usize,
    pub start_time: f64,
    /// Running tempo at this column
    pub bpm: u16,
}

/// The flattened timeline of a sheet
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackData {
    /// Tempo at the first scheduled column
    pub bpm: u16,
    pub steps: Vec<PlaybackStep>,
    pub notes: Vec<PlaybackNote>,
    /// Seconds from the first step to the end of the last column
    pub total_duration: f64,
}

impl PlaybackData {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
