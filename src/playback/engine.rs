//! Timeline generation engine
//!
//! Walks the grid row by row, tracking the running tempo, and turns every
//! non-empty cell into one or two [`PlaybackNote`]s.

use super::types::{Articulation, PlaybackData, PlaybackNote, PlaybackStep};
use crate::cell::{Cell, Technique};
use crate::model::{
    retune, split_pitch, CursorPosition, TabSheet, COLS_PER_ROW, STANDARD_TUNING,
};

/// Pitch of a dead note strike (E1).
const DEAD_NOTE_MIDI: u8 = 28;
const HARMONIC_OFFSET: u16 = 12;
const MAX_MIDI: u16 = 127;

const DEFAULT_VELOCITY: f32 = 0.7;
const LEGATO_VELOCITY: f32 = 0.5;
const DEAD_NOTE_VELOCITY: f32 = 0.3;
const PALM_MUTE_VELOCITY: f32 = 0.4;

/// Seconds per column (a sixteenth note) at `bpm`.
fn column_seconds(bpm: u16) -> f64 {
    60.0 / bpm.max(1) as f64 / 4.0
}

/// MIDI number of a pitch name with an octave digit.
///
/// Returns `None` for malformed names and for names without an octave.
///
/// # Example
/// ```
/// use stratum::playback::pitch_to_midi;
///
/// assert_eq!(pitch_to_midi("E4"), Some(64));
/// assert_eq!(pitch_to_midi("A2"), Some(45));
/// assert_eq!(pitch_to_midi("F#3"), Some(54));
/// assert_eq!(pitch_to_midi("E"), None);
/// ```
pub fn pitch_to_midi(pitch: &str) -> Option<u8> {
    let parts = split_pitch(pitch)?;
    let octave = parts.octave?.to_digit(10)? as i32;
    let semitone = match parts.letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match parts.accidental {
        "#" => 1,
        "b" => -1,
        _ => 0,
    };
    let midi = (octave + 1) * 12 + semitone + accidental;
    u8::try_from(midi.clamp(0, MAX_MIDI as i32)).ok()
}

/// Open-string MIDI pitch of `string_index` in `tuning`.
///
/// A tuning entry without an octave borrows the standard octave of its string.
pub fn string_midi(tuning: &[String], string_index: usize) -> Option<u8> {
    let pitch = tuning.get(string_index)?;
    pitch_to_midi(pitch).or_else(|| {
        let standard = STANDARD_TUNING.get(string_index)?;
        pitch_to_midi(&retune(standard, pitch)?)
    })
}

fn fretted(open: u8, fret: u8, harmonic: bool) -> u8 {
    let offset = if harmonic { HARMONIC_OFFSET } else { 0 };
    (open as u16 + fret as u16 + offset).min(MAX_MIDI) as u8
}

/// Where a cell sits and when its column starts
struct Origin {
    row_index: usize,
    column_index: usize,
    string_index: usize,
    time: f64,
    bpm: u16,
}

fn cell_notes(cell: &Cell, open: u8, origin: &Origin) -> Vec<PlaybackNote> {
    let beat = 60.0 / origin.bpm.max(1) as f64;
    let note = |midi_note, start_time, duration, velocity, articulation, harmonic, vibrato| {
        PlaybackNote {
            midi_note,
            start_time,
            duration,
            velocity,
            articulation,
            harmonic,
            vibrato,
            row_index: origin.row_index,
            column_index: origin.column_index,
            string_index: origin.string_index,
        }
    };

    let (sequence, harmonic) = match cell {
        Cell::Empty => return Vec::new(),
        Cell::DeadNote => {
            return vec![note(
                DEAD_NOTE_MIDI,
                origin.time,
                beat / 8.0,
                DEAD_NOTE_VELOCITY,
                Articulation::DeadNote,
                false,
                false,
            )];
        }
        Cell::Sequence(s) => (s, false),
        Cell::Harmonic(s) => (s, true),
    };

    let muted = sequence.has_technique(Technique::PalmMute);
    let vibrato = sequence.has_technique(Technique::Vibrato);
    let (duration, velocity, articulation) = if muted {
        (beat / 16.0, PALM_MUTE_VELOCITY, Articulation::PalmMute)
    } else {
        (beat, DEFAULT_VELOCITY, Articulation::Normal)
    };

    let mut frets = sequence.frets();
    let mut notes = Vec::new();
    if let Some(first) = frets.next() {
        notes.push(note(
            fretted(open, first, harmonic),
            origin.time,
            duration,
            velocity,
            articulation,
            harmonic,
            vibrato,
        ));
    }
    if let Some(second) = frets.next() {
        let (velocity, articulation) = if muted {
            (PALM_MUTE_VELOCITY, Articulation::PalmMute)
        } else {
            (LEGATO_VELOCITY, Articulation::Legato)
        };
        notes.push(note(
            fretted(open, second, harmonic),
            origin.time + column_seconds(origin.bpm),
            duration,
            velocity,
            articulation,
            harmonic,
            vibrato,
        ));
    }
    notes
}

/// Build the playback timeline, optionally starting at a cursor.
///
/// With `start = None` playback begins at the first column of the first row.
/// Otherwise it begins at the cursor's column (the string is ignored) and all
/// times are rebased so that column plays at zero. A start outside the grid
/// yields an empty timeline.
pub fn build_timeline(sheet: &TabSheet, start: Option<CursorPosition>) -> PlaybackData {
    let first_index = start.map_or(0, |p| {
        if p.column_index >= COLS_PER_ROW {
            usize::MAX
        } else {
            p.row_index.saturating_mul(COLS_PER_ROW).saturating_add(p.column_index)
        }
    });

    let open: Vec<Option<u8>> = (0..sheet.tuning.len())
        .map(|s| string_midi(&sheet.tuning, s))
        .collect();

    let mut steps = Vec::new();
    let mut notes = Vec::new();
    let mut running_bpm = sheet.bpm.max(1);
    let mut elapsed = 0.0;
    let mut offset = None;

    for (row_index, row) in sheet.rows.iter().enumerate() {
        for (column_index, column) in row.columns.iter().enumerate() {
            if let Some(bpm) = column.bpm {
                running_bpm = bpm.max(1);
            }
            let global = row_index * COLS_PER_ROW + column_index;
            if global >= first_index {
                let base = *offset.get_or_insert(elapsed);
                let origin_time = elapsed - base;
                steps.push(PlaybackStep {
                    row_index,
                    column_index,
                    start_time: origin_time,
                    bpm: running_bpm,
                });
                for (string_index, cell) in column.notes.iter().enumerate() {
                    let Some(Some(open_midi)) = open.get(string_index) else {
                        log::debug!(
                            target: "playback",
                            "no pitch for string {} ('{}')",
                            string_index,
                            sheet.tuning[string_index]
                        );
                        continue;
                    };
                    let origin = Origin {
                        row_index,
                        column_index,
                        string_index,
                        time: origin_time,
                        bpm: running_bpm,
                    };
                    notes.extend(cell_notes(cell, *open_midi, &origin));
                }
            }
            elapsed += column_seconds(running_bpm);
        }
    }

    let total_duration = offset.map_or(0.0, |base| elapsed - base);
    let bpm = steps.first().map_or(sheet.bpm, |s| s.bpm);
    log::debug!(
        target: "playback",
        "timeline: {} steps, {} notes, {:.3}s",
        steps.len(),
        notes.len(),
        total_duration
    );

    PlaybackData {
        bpm,
        steps,
        notes,
        total_duration,
    }
}
