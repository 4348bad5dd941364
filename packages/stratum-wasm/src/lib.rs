use serde::Serialize;
use stratum::{
    CursorMove, CursorPosition, EditorConfig, EditorSession, MetadataField, OverrideField,
    ShiftDirection, StratumError, TabSheet, Technique,
};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct EditorError {
    kind: &'static str,
    message: String,
}

fn to_js_error(e: StratumError) -> JsValue {
    let kind = match &e {
        StratumError::OutOfRange { .. } => "outOfRange",
        StratumError::InvalidCell { .. } => "invalidCell",
        StratumError::EmptyImport => "emptyImport",
        StratumError::Storage(_) | StratumError::Io(_) => "storage",
        StratumError::Config(_) => "config",
    };
    let error = EditorError {
        kind,
        message: e.to_string(),
    };
    JsValue::from_str(&serde_json::to_string(&error).unwrap_or_else(|_| error.message.clone()))
}

fn json_error(e: serde_json::Error) -> JsValue {
    to_js_error(StratumError::from(e))
}

fn parse_move(name: &str) -> Option<CursorMove> {
    let movement = match name {
        "stringUp" => CursorMove::StringUp,
        "stringDown" => CursorMove::StringDown,
        "left" => CursorMove::ColumnLeft,
        "right" => CursorMove::ColumnRight,
        "measureLeft" => CursorMove::MeasureLeft,
        "measureRight" => CursorMove::MeasureRight,
        "rowUp" => CursorMove::RowUp,
        "rowDown" => CursorMove::RowDown,
        "advance" => CursorMove::Advance,
        _ => return None,
    };
    Some(movement)
}

fn parse_field(name: &str) -> Option<MetadataField> {
    match name {
        "title" => Some(MetadataField::Title),
        "artist" => Some(MetadataField::Artist),
        "bpm" => Some(MetadataField::Bpm),
        "timeSignature" => Some(MetadataField::TimeSignature),
        _ => None,
    }
}

/// Browser-side editing session. Every command returns whether the sheet
/// changed so the UI knows when to re-render and autosave.
#[wasm_bindgen]
pub struct Editor {
    session: EditorSession,
}

#[wasm_bindgen]
impl Editor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Editor {
        Editor {
            session: EditorSession::default(),
        }
    }

    /// Start a session with a YAML editor config.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(yaml: &str) -> Result<Editor, JsValue> {
        let config = EditorConfig::from_yaml(yaml).map_err(to_js_error)?;
        Ok(Editor {
            session: EditorSession::new(config),
        })
    }

    /// Current sheet as persisted JSON
    #[wasm_bindgen(js_name = sheetJson)]
    pub fn sheet_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.sheet()).map_err(json_error)
    }

    /// Replace the document with a stored sheet (clears history).
    #[wasm_bindgen(js_name = loadSheetJson)]
    pub fn load_sheet_json(&mut self, json: &str) -> Result<(), JsValue> {
        let sheet: TabSheet = serde_json::from_str(json).map_err(json_error)?;
        self.session = EditorSession::with_sheet(self.session.config().clone(), sheet);
        Ok(())
    }

    pub fn cursor(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.cursor()).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = setCursor)]
    pub fn set_cursor(&mut self, row: usize, column: usize, string: usize) {
        self.session
            .set_cursor(CursorPosition::new(row, column, string));
    }

    /// Named cursor move (`left`, `measureRight`, `advance`, ...).
    #[wasm_bindgen(js_name = moveCursor)]
    pub fn move_cursor(&mut self, name: &str) -> bool {
        match parse_move(name) {
            Some(movement) => {
                self.session.move_cursor(movement);
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(js_name = selectString)]
    pub fn select_string(&mut self, index: usize) {
        self.session.move_cursor(CursorMove::SelectString(index));
    }

    /// Route one typed key to the matching cell command.
    ///
    /// Digits type frets, `h p / ~ m` toggle techniques, `x` is a dead note,
    /// `*` toggles a harmonic. Other keys are ignored.
    #[wasm_bindgen(js_name = typeKey)]
    pub fn type_key(&mut self, key: char) -> Result<bool, JsValue> {
        let result = match key.to_ascii_lowercase() {
            d if d.is_ascii_digit() => self.session.type_digit(d),
            'x' => self.session.dead_note(),
            '*' => self.session.toggle_harmonic(),
            c => match Technique::from_symbol(c) {
                Some(t) => self.session.toggle_technique(t),
                None => return Ok(false),
            },
        };
        result.map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = clearCell)]
    pub fn clear_cell(&mut self) -> Result<bool, JsValue> {
        self.session.clear_cell().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = appendRow)]
    pub fn append_row(&mut self) {
        self.session.append_row();
    }

    pub fn shift(&mut self, right: bool) -> Result<bool, JsValue> {
        let direction = if right {
            ShiftDirection::Right
        } else {
            ShiftDirection::Left
        };
        self.session.shift(direction).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = setTuning)]
    pub fn set_tuning(&mut self, string: usize, pitch: &str) -> Result<bool, JsValue> {
        self.session.set_tuning(string, pitch).map_err(to_js_error)
    }

    /// `field` is `title`, `artist`, `bpm` or `timeSignature`.
    #[wasm_bindgen(js_name = setMetadata)]
    pub fn set_metadata(&mut self, field: &str, value: &str) -> bool {
        parse_field(field).is_some_and(|f| self.session.set_metadata(f, value))
    }

    /// Set (or clear with `undefined`/0) the tempo change on the cursor column.
    #[wasm_bindgen(js_name = setColumnBpm)]
    pub fn set_column_bpm(&mut self, bpm: Option<u16>) -> Result<bool, JsValue> {
        self.session
            .set_column_override(OverrideField::Bpm, bpm)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = setColumnTimeSignature)]
    pub fn set_column_time_signature(&mut self, beats: Option<u16>) -> Result<bool, JsValue> {
        self.session
            .set_column_override(OverrideField::TimeSignature, beats)
            .map_err(to_js_error)
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    #[wasm_bindgen(js_name = newProject)]
    pub fn new_project(&mut self) {
        self.session.new_project();
    }

    /// Replace the document with pasted tab text; returns `protocol` or `wash`.
    #[wasm_bindgen(js_name = importText)]
    pub fn import_text(&mut self, text: &str) -> Result<String, JsValue> {
        let format = self.session.import_text(text).map_err(to_js_error)?;
        serde_json::to_value(format)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| JsValue::from_str("unknown source format"))
    }

    #[wasm_bindgen(js_name = exportText)]
    pub fn export_text(&self) -> String {
        self.session.export_text()
    }

    /// Playback timeline JSON, from the cursor or from the top.
    pub fn timeline(&self, from_cursor: bool) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.timeline(from_cursor)).map_err(json_error)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a sheet (persisted JSON) to canonical ASCII tab
#[wasm_bindgen]
pub fn encode_tab(json: &str) -> Result<String, JsValue> {
    let sheet: TabSheet = serde_json::from_str(json).map_err(json_error)?;
    Ok(stratum::encode(&sheet))
}

/// Decode ASCII tab into sheet JSON
#[wasm_bindgen]
pub fn decode_tab(text: &str) -> Result<String, JsValue> {
    let sheet = stratum::import_tab(text).map_err(to_js_error)?;
    serde_json::to_string(&sheet).map_err(json_error)
}
