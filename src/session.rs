//! # Editing Session
//!
//! The single owner of the live document. An [`EditorSession`] keeps the
//! undo history of whole-sheet snapshots, the cursor, and the configuration,
//! and exposes the commands a keyboard dispatcher or UI binding calls.
//!
//! ## Commit Rules
//! - Every edit that changes the sheet commits exactly one history entry.
//! - Edits that leave the sheet unchanged (a rejected tuning letter, a
//!   technique on an empty cell) do not touch the history.
//! - New, load and import replace the document and clear the history.
//! - The catalog id of the open project lives beside the history, so undo
//!   and redo never lose it.
//! - The cursor is clamped after every operation that can shrink the grid.

use crate::cell::{CellOp, Technique};
use crate::config::EditorConfig;
use crate::decoder::{decode_with, SourceFormat};
use crate::encoder::encode;
use crate::error::StratumError;
use crate::history::History;
use crate::model::{
    CursorPosition, MetadataField, OverrideField, ShiftDirection, TabSheet, COLS_PER_ROW,
    STRING_COUNT,
};
use crate::playback::{build_timeline, PlaybackData};
use crate::storage::{ProjectCatalog, ProjectMeta, StoragePort};
use uuid::Uuid;

/// Columns per measure-snap step.
pub const MEASURE_STEP: usize = 4;

/// Cursor movement commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// Toward the highest string (index 0)
    StringUp,
    StringDown,
    ColumnLeft,
    ColumnRight,
    /// Four columns left, stopping at the row start
    MeasureLeft,
    MeasureRight,
    RowUp,
    RowDown,
    /// Next column, wrapping to the next row from the last column
    Advance,
    /// Jump to a string by index
    SelectString(usize),
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    history: History<TabSheet>,
    cursor: CursorPosition,
    config: EditorConfig,
    project_id: Option<Uuid>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    /// A session on a blank sheet built from the config defaults.
    pub fn new(config: EditorConfig) -> Self {
        let sheet = config.create_sheet();
        Self::with_sheet(config, sheet)
    }

    pub fn with_sheet(config: EditorConfig, sheet: TabSheet) -> Self {
        Self {
            project_id: sheet.id,
            history: History::with_depth(sheet, config.history_depth),
            cursor: CursorPosition::default(),
            config,
        }
    }

    pub fn sheet(&self) -> &TabSheet {
        self.history.current()
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Catalog id of the open project, once it has been saved or loaded.
    pub fn project_id(&self) -> Option<Uuid> {
        self.project_id
    }

    pub fn set_cursor(&mut self, position: CursorPosition) {
        self.cursor = position.clamped(self.sheet());
    }

    /// Move the cursor; every move is clamped to the grid.
    ///
    /// # Example
    /// ```
    /// use stratum::session::{CursorMove, EditorSession};
    ///
    /// let mut session = EditorSession::default();
    /// session.move_cursor(CursorMove::MeasureRight);
    /// session.move_cursor(CursorMove::StringDown);
    /// assert_eq!(session.cursor().column_index, 4);
    /// assert_eq!(session.cursor().string_index, 1);
    /// ```
    pub fn move_cursor(&mut self, movement: CursorMove) {
        let last_row = self.sheet().rows.len().saturating_sub(1);
        let last_column = COLS_PER_ROW - 1;
        let c = &mut self.cursor;
        match movement {
            CursorMove::StringUp => c.string_index = c.string_index.saturating_sub(1),
            CursorMove::StringDown => c.string_index = (c.string_index + 1).min(STRING_COUNT - 1),
            CursorMove::ColumnLeft => c.column_index = c.column_index.saturating_sub(1),
            CursorMove::ColumnRight => c.column_index = (c.column_index + 1).min(last_column),
            CursorMove::MeasureLeft => {
                c.column_index = c.column_index.saturating_sub(MEASURE_STEP)
            }
            CursorMove::MeasureRight => {
                c.column_index = (c.column_index + MEASURE_STEP).min(last_column)
            }
            CursorMove::RowUp => c.row_index = c.row_index.saturating_sub(1),
            CursorMove::RowDown => c.row_index = (c.row_index + 1).min(last_row),
            CursorMove::Advance => {
                if c.column_index < last_column {
                    c.column_index += 1;
                } else if c.row_index < last_row {
                    c.row_index += 1;
                    c.column_index = 0;
                }
            }
            CursorMove::SelectString(index) => c.string_index = index.min(STRING_COUNT - 1),
        }
    }

    /// Commit `next` if it differs from the current sheet.
    fn commit(&mut self, next: TabSheet) -> bool {
        if next == *self.sheet() {
            return false;
        }
        self.history.commit(next);
        log::trace!(target: "session", "commit (undo depth {})", self.history.undo_depth());
        true
    }

    /// Apply a cell command at the cursor. Returns whether the sheet changed.
    pub fn apply(&mut self, op: CellOp) -> Result<bool, StratumError> {
        let next = self.sheet().set_note_at(self.cursor, op)?;
        Ok(self.commit(next))
    }

    pub fn type_digit(&mut self, digit: char) -> Result<bool, StratumError> {
        self.apply(CellOp::Digit(digit))
    }

    pub fn toggle_technique(&mut self, technique: Technique) -> Result<bool, StratumError> {
        self.apply(CellOp::Technique(technique))
    }

    pub fn dead_note(&mut self) -> Result<bool, StratumError> {
        self.apply(CellOp::DeadNote)
    }

    pub fn toggle_harmonic(&mut self) -> Result<bool, StratumError> {
        self.apply(CellOp::ToggleHarmonic)
    }

    pub fn clear_cell(&mut self) -> Result<bool, StratumError> {
        self.apply(CellOp::Clear)
    }

    pub fn append_row(&mut self) {
        let next = self.sheet().append_row();
        self.commit(next);
    }

    /// Shift the cursor row's columns at the cursor column.
    pub fn shift(&mut self, direction: ShiftDirection) -> Result<bool, StratumError> {
        let next =
            self.sheet()
                .shift_notes(self.cursor.row_index, self.cursor.column_index, direction)?;
        Ok(self.commit(next))
    }

    pub fn set_tuning(&mut self, string_index: usize, pitch: &str) -> Result<bool, StratumError> {
        let next = self.sheet().set_tuning(string_index, pitch)?;
        Ok(self.commit(next))
    }

    pub fn set_metadata(&mut self, field: MetadataField, value: &str) -> bool {
        let next = self.sheet().set_metadata(field, value);
        self.commit(next)
    }

    /// Set or clear an override on the cursor column.
    pub fn set_column_override(
        &mut self,
        field: OverrideField,
        value: Option<u16>,
    ) -> Result<bool, StratumError> {
        let next = self.sheet().set_column_override(
            self.cursor.row_index,
            self.cursor.column_index,
            field,
            value,
        )?;
        Ok(self.commit(next))
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo();
        self.cursor = self.cursor.clamped(self.history.current());
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo();
        self.cursor = self.cursor.clamped(self.history.current());
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Swap in a different document, forgetting history.
    fn replace_document(&mut self, sheet: TabSheet) {
        self.project_id = sheet.id;
        self.history.reset(sheet);
        self.cursor = CursorPosition::default();
    }

    pub fn new_project(&mut self) {
        log::info!(target: "session", "new project");
        let sheet = self.config.create_sheet();
        self.replace_document(sheet);
    }

    /// Replace the document with decoded text.
    ///
    /// Text without any recognisable staff fails with
    /// [`StratumError::EmptyImport`] and leaves the session untouched.
    pub fn import_text(&mut self, text: &str) -> Result<SourceFormat, StratumError> {
        let decoded = decode_with(text, self.config.decode_options());
        if decoded.is_empty() {
            log::warn!(target: "session", "import found no staves, keeping current sheet");
            return Err(StratumError::EmptyImport);
        }
        let format = decoded.format;
        log::info!(
            target: "session",
            "imported {} rows ({:?})",
            decoded.rows.len(),
            format
        );
        self.replace_document(decoded.into_sheet());
        Ok(format)
    }

    pub fn export_text(&self) -> String {
        encode(self.sheet())
    }

    /// Playback timeline from the cursor, or from the top.
    pub fn timeline(&self, from_cursor: bool) -> PlaybackData {
        let start = from_cursor.then_some(self.cursor);
        build_timeline(self.sheet(), start)
    }

    /// Save to a catalog under the session's project id, assigning one on
    /// the first save. The id is also written into the live sheet without
    /// creating an undo step.
    pub fn save<S: StoragePort>(&mut self, catalog: &mut ProjectCatalog<S>) -> Option<ProjectMeta> {
        let meta = match self.project_id {
            Some(id) if self.sheet().id != Some(id) => catalog.save(&self.sheet().with_id(id))?,
            _ => catalog.save(self.sheet())?,
        };
        self.project_id = Some(meta.id);
        if self.sheet().id != Some(meta.id) {
            let stamped = self.sheet().with_id(meta.id);
            self.history.replace_without_history(stamped);
        }
        Some(meta)
    }

    /// Load a project by id. Returns false (and keeps the current document)
    /// when the catalog cannot produce it.
    pub fn load<S: StoragePort>(&mut self, catalog: &ProjectCatalog<S>, id: Uuid) -> bool {
        match catalog.load(id) {
            Some(sheet) => {
                self.replace_document(sheet);
                true
            }
            None => false,
        }
    }
}
