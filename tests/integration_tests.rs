//! Integration tests for the stratum tab engine
//!
//! Exercises the full pipeline: grid edits, canonical encoding, decoding back
//! through both decoder stages, sessions and persistence.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use stratum::playback::build_timeline;
use stratum::storage::{FileStore, ProjectCatalog};
use stratum::{
    decode, encode, import_tab, Cell, CellOp, CursorMove, CursorPosition, EditorSession,
    MetadataField, OverrideField, ShiftDirection, SourceFormat, StratumError, TabSheet, Technique,
    COLS_PER_ROW,
};

fn pos(r: usize, c: usize, s: usize) -> CursorPosition {
    CursorPosition::new(r, c, s)
}

/// Non-empty cells per column, as text
fn cell_map(sheet: &TabSheet) -> Vec<Vec<Vec<(usize, String)>>> {
    sheet
        .rows
        .iter()
        .map(|row| {
            row.columns
                .iter()
                .map(|col| {
                    col.notes
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| !c.is_empty())
                        .map(|(s, c)| (s, c.to_string()))
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn overrides(sheet: &TabSheet) -> Vec<(usize, usize, Option<u16>, Option<u8>)> {
    sheet
        .rows
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.columns
                .iter()
                .enumerate()
                .filter(|(_, col)| col.has_override())
                .map(move |(c, col)| (r, c, col.bpm, col.time_signature))
        })
        .collect()
}

#[test]
fn test_concrete_encoding_scenario() {
    let sheet = TabSheet::blank()
        .set_metadata(MetadataField::Title, "Test")
        .set_metadata(MetadataField::Artist, "Artist")
        .set_note_at(pos(0, 0, 0), CellOp::Digit('0'))
        .unwrap();
    let text = encode(&sheet);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "Test - Artist");
    let first_string = lines
        .iter()
        .find(|l| l.starts_with("E |"))
        .unwrap();
    assert!(first_string.starts_with("E |0--"));

    let decoded = decode(&text);
    assert_eq!(decoded.format, SourceFormat::Protocol);
    assert_eq!(decoded.title, "Test");
    assert_eq!(decoded.artist, "Artist");
    assert_eq!(decoded.rows[0].columns[0].notes[0], Cell::fret(0).unwrap());
}

#[test]
fn test_awkward_titles_round_trip() {
    let cases = [
        ("", ""),
        ("A - B", "C"),
        ("Solo", ""),
        ("", "Band"),
        ("  spaced  ", " - "),
        ("Tempo: 999 BPM | Meter: 9/4", "Staff 1"),
        ("back\\slash -", "- dash"),
    ];
    for (title, artist) in cases {
        let sheet = TabSheet::blank()
            .set_metadata(MetadataField::Title, title)
            .set_metadata(MetadataField::Artist, artist);
        let decoded = decode(&encode(&sheet));
        assert_eq!((decoded.title.as_str(), decoded.artist.as_str()), (title, artist));
        assert_eq!(decoded.bpm, 120);
        assert_eq!(decoded.time_signature, 4);
    }
}

#[test]
fn test_hammer_on_scenario() {
    let cell = Cell::fret(7)
        .unwrap()
        .apply_technique(Technique::HammerOn)
        .apply_digit('9');
    assert_eq!(cell.to_string(), "7h9");
}

#[test]
fn test_harmonic_widens_column() {
    let sheet = TabSheet::blank()
        .set_note_at(pos(0, 0, 3), CellOp::Digit('1'))
        .unwrap()
        .set_note_at(pos(0, 0, 3), CellOp::Digit('2'))
        .unwrap()
        .set_note_at(pos(0, 0, 3), CellOp::ToggleHarmonic)
        .unwrap();
    let text = encode(&sheet);
    let d_line = text.lines().find(|l| l.starts_with("D |")).unwrap();
    assert!(d_line.starts_with("D |<12>-"));
    let e_line = text.lines().find(|l| l.starts_with("E |")).unwrap();
    assert!(e_line.starts_with("E |-----"));
}

#[test]
fn test_wide_cells_keep_columns_aligned() {
    let sheet = TabSheet::blank()
        .set_note_at(pos(0, 0, 0), CellOp::Digit('7'))
        .unwrap()
        .set_note_at(pos(0, 0, 0), CellOp::Technique(Technique::HammerOn))
        .unwrap()
        .set_note_at(pos(0, 0, 0), CellOp::Digit('9'))
        .unwrap()
        .set_note_at(pos(0, 1, 0), CellOp::Digit('5'))
        .unwrap()
        .set_note_at(pos(0, 1, 1), CellOp::Digit('3'))
        .unwrap();
    let decoded = decode(&encode(&sheet));
    assert_eq!(cell_map(&decoded.into_sheet()), cell_map(&sheet));
}

#[test]
fn test_overrides_and_tuning_survive_round_trip() {
    let sheet = TabSheet::blank()
        .append_row()
        .set_column_override(0, 5, OverrideField::Bpm, Some(140))
        .unwrap()
        .set_column_override(0, 6, OverrideField::Bpm, Some(90))
        .unwrap()
        .set_column_override(1, 10, OverrideField::TimeSignature, Some(3))
        .unwrap()
        .set_column_override(1, 10, OverrideField::Bpm, Some(200))
        .unwrap()
        .set_tuning(5, "D")
        .unwrap()
        .set_note_at(pos(1, 11, 5), CellOp::Digit('0'))
        .unwrap();
    let restored = decode(&encode(&sheet)).into_sheet();
    assert_eq!(overrides(&restored), overrides(&sheet));
    assert_eq!(restored.tuning, sheet.tuning);
    assert_eq!(cell_map(&restored), cell_map(&sheet));
}

#[test]
fn test_foreign_tab_import() {
    let tab = "\
Smoke on the Water (intro)

e|-----------------|-----------------|
B|-----------------|-----------------|
G|--0--3--5-----0--|--3--6--5--------|
D|--0--3--5-----0--|--3--6--5--------|
A|-----------------|-----------------|
E|-----------------|-----------------|
";
    let sheet = import_tab(tab).unwrap();
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.title, "Washed Import");
    let g_frets: Vec<String> = sheet.rows[0]
        .columns
        .iter()
        .map(|c| c.notes[2].to_string())
        .filter(|s| !s.is_empty())
        .collect();
    assert_eq!(g_frets, vec!["0", "3", "5", "0", "3", "6", "5"]);
}

#[test]
fn test_prose_is_empty_import() {
    assert!(matches!(
        import_tab("Play it loud.\nThen play it louder."),
        Err(StratumError::EmptyImport)
    ));
}

#[test]
fn test_shift_round_trip_on_blank_row() {
    let sheet = TabSheet::blank();
    let shifted = sheet
        .shift_notes(0, 7, ShiftDirection::Right)
        .unwrap()
        .shift_notes(0, 7, ShiftDirection::Left)
        .unwrap();
    assert_eq!(cell_map(&shifted), cell_map(&sheet));
    assert_eq!(shifted.rows[0].columns.len(), COLS_PER_ROW);
}

#[test]
fn test_session_edit_save_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = ProjectCatalog::new(FileStore::new(dir.path()));

    let mut session = EditorSession::default();
    session.set_metadata(MetadataField::Title, "Etude");
    for digit in ['3', '5', '7'] {
        session.type_digit(digit).unwrap();
        session.move_cursor(CursorMove::Advance);
    }
    let meta = session.save(&mut catalog).unwrap();

    let mut other = EditorSession::default();
    assert!(other.load(&catalog, meta.id));
    assert_eq!(other.sheet().title, "Etude");
    assert_eq!(other.export_text(), session.export_text());

    let timeline = build_timeline(other.sheet(), None);
    let midi: Vec<u8> = timeline.notes.iter().map(|n| n.midi_note).collect();
    assert_eq!(midi, vec![67, 69, 71]);
}

fn arb_op() -> impl Strategy<Value = CellOp> {
    prop_oneof![
        4 => (0u8..10).prop_map(|d| CellOp::Digit((b'0' + d) as char)),
        2 => prop::sample::select(Technique::ALL.to_vec()).prop_map(CellOp::Technique),
        1 => Just(CellOp::DeadNote),
        1 => Just(CellOp::ToggleHarmonic),
        1 => Just(CellOp::Clear),
    ]
}

#[derive(Debug, Clone)]
enum Edit {
    Cell(usize, usize, usize, CellOp),
    AppendRow,
    Bpm(usize, usize, u16),
    Meter(usize, usize, u16),
    Shift(usize, usize, bool),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        10 => (0usize..3, 0..COLS_PER_ROW, 0usize..6, arb_op())
            .prop_map(|(r, c, s, op)| Edit::Cell(r, c, s, op)),
        1 => Just(Edit::AppendRow),
        1 => (0usize..3, 0..COLS_PER_ROW, 1u16..400).prop_map(|(r, c, b)| Edit::Bpm(r, c, b)),
        1 => (0usize..3, 0..COLS_PER_ROW, 1u16..16).prop_map(|(r, c, t)| Edit::Meter(r, c, t)),
        1 => (0usize..3, 0..COLS_PER_ROW, any::<bool>())
            .prop_map(|(r, c, right)| Edit::Shift(r, c, right)),
    ]
}

fn apply_edit(sheet: TabSheet, edit: &Edit) -> TabSheet {
    let rows = sheet.rows.len();
    match *edit {
        Edit::Cell(r, c, s, op) => sheet.set_note_at(pos(r % rows, c, s), op).unwrap(),
        Edit::AppendRow if rows < 3 => sheet.append_row(),
        Edit::AppendRow => sheet,
        Edit::Bpm(r, c, bpm) => sheet
            .set_column_override(r % rows, c, OverrideField::Bpm, Some(bpm))
            .unwrap(),
        Edit::Meter(r, c, ts) => sheet
            .set_column_override(r % rows, c, OverrideField::TimeSignature, Some(ts))
            .unwrap(),
        Edit::Shift(r, c, right) => {
            let direction = if right {
                ShiftDirection::Right
            } else {
                ShiftDirection::Left
            };
            sheet.shift_notes(r % rows, c, direction).unwrap()
        }
    }
}

proptest! {
    #[test]
    fn encode_decode_round_trip(
        edits in proptest::collection::vec(arb_edit(), 0..60),
        title in "[^\\r\\n]{0,20}",
        artist in "[^\\r\\n]{0,20}",
        bpm in 1u16..=400,
        meter in 1u8..=16,
    ) {
        let base = TabSheet::blank()
            .set_metadata(MetadataField::Title, &title)
            .set_metadata(MetadataField::Artist, &artist)
            .set_metadata(MetadataField::Bpm, &bpm.to_string())
            .set_metadata(MetadataField::TimeSignature, &meter.to_string());
        let sheet = edits.iter().fold(base, apply_edit);

        let decoded = decode(&encode(&sheet));
        prop_assert_eq!(decoded.format, SourceFormat::Protocol);
        prop_assert_eq!(&decoded.title, &sheet.title);
        prop_assert_eq!(&decoded.artist, &sheet.artist);
        prop_assert_eq!(decoded.bpm, sheet.bpm);
        prop_assert_eq!(decoded.time_signature, sheet.time_signature);

        let restored = decoded.into_sheet();
        prop_assert_eq!(restored.rows.len(), sheet.rows.len());
        prop_assert_eq!(cell_map(&restored), cell_map(&sheet));
        prop_assert_eq!(overrides(&restored), overrides(&sheet));
    }

    #[test]
    fn decoder_never_panics(text in "\\PC{0,400}") {
        let decoded = decode(&text);
        for row in &decoded.rows {
            prop_assert_eq!(row.columns.len(), COLS_PER_ROW);
        }
    }

    #[test]
    fn decoder_survives_tab_like_noise(
        lines in proptest::collection::vec("[eBGDAE]?\\|?[-0-9hpx/\\\\~<>| ]{0,40}", 0..20)
    ) {
        let text = lines.join("\n");
        let decoded = decode(&text);
        prop_assert!(decoded.rows.iter().all(|r| r.columns.len() == COLS_PER_ROW));
    }

    #[test]
    fn truncated_canonical_text_decodes(
        edits in proptest::collection::vec(arb_edit(), 0..20),
        cut in 0usize..2000,
    ) {
        let sheet = edits.iter().fold(TabSheet::blank(), apply_edit);
        let text = encode(&sheet);
        let end = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .find(|i| *i >= cut.min(text.len()))
            .unwrap_or(text.len());
        let decoded = decode(&text[..end]);
        prop_assert!(decoded.rows.len() <= sheet.rows.len());
    }
}
