pub mod api;
pub mod cell;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod history;
pub mod model;
pub mod playback;
pub mod session;
pub mod storage;

pub use api::{export_tab, import_tab, import_tab_with, normalize_tab};
pub use cell::{Cell, CellOp, Sequence, Step, Technique, MAX_FRET};
pub use config::EditorConfig;
pub use decoder::{decode, decode_with, DecodeOptions, DecodedTab, SourceFormat};
pub use encoder::{encode, PROTOCOL_SENTINEL};
pub use error::*;
pub use history::History;
pub use model::*;
pub use session::{CursorMove, EditorSession};
