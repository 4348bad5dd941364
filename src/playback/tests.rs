use super::*;
use crate::cell::{CellOp, Technique};
use crate::model::{CursorPosition, OverrideField, TabSheet, COLS_PER_ROW};

fn pos(r: usize, c: usize, s: usize) -> CursorPosition {
    CursorPosition::new(r, c, s)
}

fn with_ops(sheet: TabSheet, at: CursorPosition, ops: &[CellOp]) -> TabSheet {
    ops.iter()
        .fold(sheet, |s, op| s.set_note_at(at, *op).unwrap())
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_pitch_to_midi() {
    assert_eq!(pitch_to_midi("E4"), Some(64));
    assert_eq!(pitch_to_midi("E2"), Some(40));
    assert_eq!(pitch_to_midi("C4"), Some(60));
    assert_eq!(pitch_to_midi("Bb3"), Some(58));
    assert_eq!(pitch_to_midi("e4"), Some(64));
    assert_eq!(pitch_to_midi("H4"), None);
    assert_eq!(pitch_to_midi("D"), None);
}

#[test]
fn test_string_midi_borrows_standard_octave() {
    let mut tuning = crate::model::standard_tuning();
    tuning[5] = "D".to_string();
    assert_eq!(string_midi(&tuning, 5), Some(38)); // D2
    assert_eq!(string_midi(&tuning, 0), Some(64));
    assert_eq!(string_midi(&tuning, 6), None);
}

#[test]
fn test_blank_sheet_timing() {
    let data = build_timeline(&TabSheet::blank(), None);
    assert!(data.notes.is_empty());
    assert_eq!(data.steps.len(), COLS_PER_ROW);
    assert_eq!(data.bpm, 120);
    assert!(approx(data.steps[1].start_time, 0.125));
    assert!(approx(data.total_duration, 0.125 * COLS_PER_ROW as f64));
}

#[test]
fn test_fretted_note() {
    let sheet = with_ops(TabSheet::blank(), pos(0, 2, 5), &[CellOp::Digit('3')]);
    let data = build_timeline(&sheet, None);
    assert_eq!(data.notes.len(), 1);
    let note = &data.notes[0];
    assert_eq!(note.midi_note, 43); // G2
    assert_eq!(note.articulation, Articulation::Normal);
    assert!(approx(note.start_time, 0.25));
    assert!(approx(note.duration, 0.5));
    assert_eq!(note.velocity, 0.7);
    assert_eq!((note.row_index, note.column_index, note.string_index), (0, 2, 5));
}

#[test]
fn test_harmonic_adds_octave() {
    let sheet = with_ops(
        TabSheet::blank(),
        pos(0, 0, 0),
        &[CellOp::Digit('1'), CellOp::Digit('2'), CellOp::ToggleHarmonic],
    );
    let data = build_timeline(&sheet, None);
    assert_eq!(data.notes[0].midi_note, 64 + 12 + 12);
    assert!(data.notes[0].harmonic);
}

#[test]
fn test_dead_note() {
    let sheet = with_ops(TabSheet::blank(), pos(0, 0, 2), &[CellOp::DeadNote]);
    let data = build_timeline(&sheet, None);
    let note = &data.notes[0];
    assert_eq!(note.midi_note, 28);
    assert_eq!(note.articulation, Articulation::DeadNote);
    assert!(approx(note.duration, 0.5 / 8.0));
    assert_eq!(note.velocity, 0.3);
}

#[test]
fn test_palm_mute() {
    let sheet = with_ops(
        TabSheet::blank(),
        pos(0, 0, 4),
        &[CellOp::Digit('5'), CellOp::Technique(Technique::PalmMute)],
    );
    let data = build_timeline(&sheet, None);
    let note = &data.notes[0];
    assert_eq!(note.midi_note, 50);
    assert_eq!(note.articulation, Articulation::PalmMute);
    assert!(approx(note.duration, 0.5 / 16.0));
    assert_eq!(note.velocity, 0.4);
}

#[test]
fn test_legato_second_fret_delayed() {
    let sheet = with_ops(
        TabSheet::blank(),
        pos(0, 1, 0),
        &[
            CellOp::Digit('7'),
            CellOp::Technique(Technique::HammerOn),
            CellOp::Digit('9'),
        ],
    );
    let data = build_timeline(&sheet, None);
    assert_eq!(data.notes.len(), 2);
    assert_eq!(data.notes[0].midi_note, 71);
    assert_eq!(data.notes[1].midi_note, 73);
    assert_eq!(data.notes[1].articulation, Articulation::Legato);
    assert_eq!(data.notes[1].velocity, 0.5);
    assert!(approx(data.notes[1].start_time - data.notes[0].start_time, 0.125));
}

#[test]
fn test_vibrato_flag() {
    let sheet = with_ops(
        TabSheet::blank(),
        pos(0, 0, 1),
        &[CellOp::Digit('5'), CellOp::Technique(Technique::Vibrato)],
    );
    let data = build_timeline(&sheet, None);
    assert!(data.notes[0].vibrato);
    assert_eq!(data.notes[0].articulation, Articulation::Normal);
}

#[test]
fn test_bpm_override_carries_across_rows() {
    let sheet = TabSheet::blank()
        .append_row()
        .set_column_override(0, 16, OverrideField::Bpm, Some(60))
        .unwrap();
    let data = build_timeline(&sheet, None);
    assert_eq!(data.steps[15].bpm, 120);
    assert_eq!(data.steps[16].bpm, 60);
    assert_eq!(data.steps[COLS_PER_ROW].bpm, 60);
    // 16 columns at 120 then 16 at 60
    let row_two = 16.0 * 0.125 + 16.0 * 0.25;
    assert!(approx(data.steps[COLS_PER_ROW].start_time, row_two));
}

#[test]
fn test_start_at_cursor_rebases() {
    let sheet = with_ops(
        TabSheet::blank().append_row(),
        pos(1, 3, 0),
        &[CellOp::Digit('0')],
    );
    let data = build_timeline(&sheet, Some(pos(1, 2, 4)));
    assert_eq!(data.steps.len(), COLS_PER_ROW - 2);
    assert_eq!((data.steps[0].row_index, data.steps[0].column_index), (1, 2));
    assert_eq!(data.steps[0].start_time, 0.0);
    assert!(approx(data.notes[0].start_time, 0.125));
}

#[test]
fn test_start_uses_running_bpm_before_cursor() {
    let sheet = TabSheet::blank()
        .set_column_override(0, 0, OverrideField::Bpm, Some(90))
        .unwrap();
    let data = build_timeline(&sheet, Some(pos(0, 10, 0)));
    assert_eq!(data.bpm, 90);
}

#[test]
fn test_out_of_range_start_is_empty() {
    let sheet = with_ops(TabSheet::blank(), pos(0, 0, 0), &[CellOp::Digit('1')]);
    assert!(build_timeline(&sheet, Some(pos(5, 0, 0))).is_empty());
    assert!(build_timeline(&sheet, Some(pos(0, 40, 0))).notes.is_empty());
}

#[test]
fn test_timeline_serializes_camel_case() {
    let sheet = with_ops(TabSheet::blank(), pos(0, 0, 0), &[CellOp::Digit('0')]);
    let json = serde_json::to_value(build_timeline(&sheet, None)).unwrap();
    assert_eq!(json["notes"][0]["midiNote"], 64);
    assert_eq!(json["notes"][0]["articulation"], "normal");
    assert!(json["totalDuration"].is_number());
}
