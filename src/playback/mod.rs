//! # Playback Module
//!
//! Flatten a [`TabSheet`](crate::TabSheet) into timed note events for an
//! external audio scheduler.
//!
//! ## Purpose
//! The core never plays audio. It hands the scheduler a snapshot timeline that
//! serves two consumers:
//! 1. **Audio** - MIDI pitch, start time, length and velocity per note
//! 2. **Cursor sync** - one [`PlaybackStep`] per column so the editor cursor can
//!    follow the music
//!
//! ## Sub-modules
//! - `types` - PlaybackData, PlaybackNote, PlaybackStep, Articulation
//! - `engine` - timeline generation and pitch math
//!
//! ## Timing
//! Every column is a sixteenth note: `60 / bpm / 4` seconds at the running
//! tempo. A column with a `bpm` override changes the tempo from that column on,
//! and the change carries into later rows.
//!
//! ## Example
//! ```rust
//! use stratum::playback::build_timeline;
//! use stratum::{CellOp, CursorPosition, TabSheet};
//!
//! let sheet = TabSheet::blank()
//!     .set_note_at(CursorPosition::new(0, 4, 0), CellOp::Digit('0'))?;
//! let data = build_timeline(&sheet, None);
//!
//! assert_eq!(data.notes.len(), 1);
//! assert_eq!(data.notes[0].midi_note, 64); // open high E
//! assert_eq!(data.notes[0].start_time, 0.5); // four sixteenths at 120 BPM
//! # Ok::<(), stratum::StratumError>(())
//! ```

mod engine;
mod types;

#[cfg(test)]
mod tests;

pub use engine::{build_timeline, pitch_to_midi, string_midi};
pub use types::{Articulation, PlaybackData, PlaybackNote, PlaybackStep};
