//! # Cell Grammar
//!
//! One string's value at one rhythmic position. On the wire a cell is a tiny
//! string language; in memory it is the tagged [`Cell`] variant, so the fret cap
//! and technique adjacency rules hold by construction.
//!
//! ```text
//! cell        := "" | "x" | harmonic | sequence
//! harmonic    := "<" sequence ">"
//! sequence    := fret (technique fret?)*
//! fret        := digit{1,2}                    ; 0..=24
//! technique   := "h" | "p" | "/" | "~" | "m"
//! ```
//!
//! A sequence may end on a technique (`7h` is the state between typing `h` and
//! the target fret) but never holds two adjacent frets; those merge into one
//! numeral when typed.
//!
//! ## Editing Operations
//! - [`Cell::apply_digit`] - extend or replace the trailing numeral
//! - [`Cell::apply_technique`] - toggle a trailing technique symbol
//! - [`Cell::apply_dead_note`] - set the cell to `x`
//! - [`Cell::toggle_harmonic`] - wrap/unwrap `<...>`
//! - [`Cell::clear`]
//!
//! Invalid input never errors: a rejected edit returns the cell unchanged.

use crate::error::StratumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest fret a cell may hold.
pub const MAX_FRET: u8 = 24;

/// Articulation symbols that join or decorate frets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    HammerOn, // h
    PullOff,  // p
    Slide,    // /
    Vibrato,  // ~
    PalmMute, // m
}

impl Technique {
    pub const ALL: [Technique; 5] = [
        Technique::HammerOn,
        Technique::PullOff,
        Technique::Slide,
        Technique::Vibrato,
        Technique::PalmMute,
    ];

    pub fn symbol(self) -> char {
        match self {
            Technique::HammerOn => 'h',
            Technique::PullOff => 'p',
            Technique::Slide => '/',
            Technique::Vibrato => '~',
            Technique::PalmMute => 'm',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            'h' => Some(Technique::HammerOn),
            'p' => Some(Technique::PullOff),
            '/' => Some(Technique::Slide),
            '~' => Some(Technique::Vibrato),
            'm' => Some(Technique::PalmMute),
            _ => None,
        }
    }
}

/// One element of a legato chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fret(u8),
    Technique(Technique),
}

/// A fret followed by any number of technique/fret steps.
///
/// Always starts with a fret and never contains two adjacent frets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    /// A sequence holding a single fret, or `None` above [`MAX_FRET`].
    pub fn fret(fret: u8) -> Option<Self> {
        (fret <= MAX_FRET).then(|| Self {
            steps: vec![Step::Fret(fret)],
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Fret numbers in playing order.
    pub fn frets(&self) -> impl Iterator<Item = u8> + '_ {
        self.steps.iter().filter_map(|s| match s {
            Step::Fret(f) => Some(*f),
            Step::Technique(_) => None,
        })
    }

    pub fn has_technique(&self, technique: Technique) -> bool {
        self.steps.contains(&Step::Technique(technique))
    }

    fn with_digit(&self, digit: u8) -> Self {
        let mut steps = self.steps.clone();
        match steps.last_mut() {
            Some(Step::Fret(current)) => {
                let extended = *current * 10 + digit;
                *current = if *current < 10 && extended <= MAX_FRET {
                    extended
                } else {
                    digit
                };
            }
            _ => steps.push(Step::Fret(digit)),
        }
        Self { steps }
    }

    fn with_technique_toggled(&self, technique: Technique) -> Self {
        let mut steps = self.steps.clone();
        if steps.last() == Some(&Step::Technique(technique)) {
            steps.pop();
        } else {
            steps.push(Step::Technique(technique));
        }
        Self { steps }
    }

    fn parse_strict(s: &str) -> Result<Self, String> {
        let mut steps = Vec::new();
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            if let Some(d) = c.to_digit(10) {
                let mut digits = 1;
                let mut value = d;
                while let Some(next) = chars.peek().and_then(|n| n.to_digit(10)) {
                    chars.next();
                    digits += 1;
                    value = value * 10 + next;
                    if digits > 2 {
                        return Err("fret numerals have at most two digits".to_string());
                    }
                }
                if value > MAX_FRET as u32 {
                    return Err(format!("fret {} exceeds {}", value, MAX_FRET));
                }
                steps.push(Step::Fret(value as u8));
            } else if let Some(t) = Technique::from_symbol(c) {
                if steps.is_empty() {
                    return Err(format!("technique '{}' needs a preceding fret", c));
                }
                steps.push(Step::Technique(t));
            } else {
                return Err(format!("unexpected character '{}'", c));
            }
        }

        if steps.is_empty() {
            return Err("empty sequence".to_string());
        }
        Ok(Self { steps })
    }

    /// Best-effort reading of a foreign token body.
    fn salvage(s: &str) -> Option<Self> {
        let mut steps: Vec<Step> = Vec::new();
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_ascii_digit() {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let run: String = chars[start..i].iter().collect();
                if matches!(steps.last(), Some(Step::Fret(_))) {
                    log::trace!(target: "decoder", "dropping adjacent numeral '{}' in '{}'", run, s);
                    continue;
                }
                steps.push(Step::Fret(longest_fret_prefix(&run)));
                continue;
            }

            let technique = if c == '\\' {
                Some(Technique::Slide)
            } else {
                Technique::from_symbol(c)
            };
            match technique {
                Some(t) if !steps.is_empty() => steps.push(Step::Technique(t)),
                _ => log::trace!(target: "decoder", "dropping '{}' in '{}'", c, s),
            }
            i += 1;
        }

        (!steps.is_empty()).then_some(Self { steps })
    }
}

/// Leading one- or two-digit prefix of a digit run that fits under the fret cap.
fn longest_fret_prefix(run: &str) -> u8 {
    let bytes = run.as_bytes();
    let first = bytes[0] - b'0';
    if bytes.len() >= 2 {
        let two = first * 10 + (bytes[1] - b'0');
        if two <= MAX_FRET {
            return two;
        }
    }
    first
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                Step::Fret(n) => write!(f, "{}", n)?,
                Step::Technique(t) => write!(f, "{}", t.symbol())?,
            }
        }
        Ok(())
    }
}

/// The value of one string at one column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Cell {
    /// Silence
    #[default]
    Empty,
    /// A muted, struck-but-fretless note (`x`)
    DeadNote,
    Sequence(Sequence),
    /// A harmonic wrapping a whole sequence (`<12>`)
    Harmonic(Sequence),
}

impl Cell {
    /// A plain fretted note.
    pub fn fret(fret: u8) -> Option<Self> {
        Sequence::fret(fret).map(Cell::Sequence)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Rendered width in characters.
    pub fn width(&self) -> usize {
        self.to_string().chars().count()
    }

    /// The sequence inside a fretted or harmonic cell.
    pub fn sequence(&self) -> Option<&Sequence> {
        match self {
            Cell::Sequence(s) | Cell::Harmonic(s) => Some(s),
            Cell::Empty | Cell::DeadNote => None,
        }
    }

    /// Type a digit into the cell.
    ///
    /// After a technique the digit starts a new fret. A single-digit trailing
    /// numeral is extended to two digits when the result stays within
    /// [`MAX_FRET`]; otherwise the trailing numeral is replaced by the digit.
    /// Harmonic brackets are preserved. Non-digit characters are ignored.
    ///
    /// # Example
    /// ```
    /// # use stratum::Cell;
    /// let cell = Cell::Empty.apply_digit('2').apply_digit('5');
    /// assert_eq!(cell.to_string(), "5");
    ///
    /// let cell = Cell::Empty.apply_digit('1').apply_digit('2');
    /// assert_eq!(cell.to_string(), "12");
    /// ```
    pub fn apply_digit(&self, digit: char) -> Cell {
        let Some(d) = digit.to_digit(10).map(|d| d as u8) else {
            return self.clone();
        };
        match self {
            Cell::Empty | Cell::DeadNote => Cell::Sequence(Sequence {
                steps: vec![Step::Fret(d)],
            }),
            Cell::Sequence(s) => Cell::Sequence(s.with_digit(d)),
            Cell::Harmonic(s) => Cell::Harmonic(s.with_digit(d)),
        }
    }

    /// Toggle a technique at the end of the cell.
    ///
    /// Empty and dead-note cells reject techniques.
    ///
    /// # Example
    /// ```
    /// # use stratum::{Cell, Technique};
    /// let cell = Cell::fret(7).unwrap()
    ///     .apply_technique(Technique::HammerOn)
    ///     .apply_digit('9');
    /// assert_eq!(cell.to_string(), "7h9");
    /// ```
    pub fn apply_technique(&self, technique: Technique) -> Cell {
        match self {
            Cell::Empty | Cell::DeadNote => self.clone(),
            Cell::Sequence(s) => Cell::Sequence(s.with_technique_toggled(technique)),
            Cell::Harmonic(s) => Cell::Harmonic(s.with_technique_toggled(technique)),
        }
    }

    pub fn apply_dead_note(&self) -> Cell {
        Cell::DeadNote
    }

    /// Wrap the sequence in harmonic brackets, or strip them.
    pub fn toggle_harmonic(&self) -> Cell {
        match self {
            Cell::Sequence(s) => Cell::Harmonic(s.clone()),
            Cell::Harmonic(s) => Cell::Sequence(s.clone()),
            Cell::Empty | Cell::DeadNote => self.clone(),
        }
    }

    pub fn clear(&self) -> Cell {
        Cell::Empty
    }

    /// Read a token captured from foreign text.
    ///
    /// Grammar-conforming tokens parse exactly. Anything else is coerced into the
    /// grammar: `\` reads as a slide, unknown characters and leading techniques
    /// are dropped, oversized numerals keep their longest in-range prefix. A token
    /// with nothing recoverable becomes silence.
    pub fn salvage(token: &str) -> Cell {
        let token = token.trim();
        if token.is_empty() {
            return Cell::Empty;
        }
        if let Ok(cell) = token.parse::<Cell>() {
            return cell;
        }
        if token.chars().all(|c| c == 'x' || c == 'X') {
            return Cell::DeadNote;
        }

        let salvaged = match token.strip_prefix('<') {
            Some(rest) => Sequence::salvage(rest.trim_end_matches('>')).map(Cell::Harmonic),
            None => Sequence::salvage(token).map(Cell::Sequence),
        };
        let cell = salvaged.unwrap_or_else(|| {
            if token.contains(['x', 'X']) {
                Cell::DeadNote
            } else {
                Cell::Empty
            }
        });
        log::debug!(target: "decoder", "salvaged foreign token '{}' as '{}'", token, cell);
        cell
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::DeadNote => write!(f, "x"),
            Cell::Sequence(s) => write!(f, "{}", s),
            Cell::Harmonic(s) => write!(f, "<{}>", s),
        }
    }
}

impl FromStr for Cell {
    type Err = StratumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| StratumError::InvalidCell {
            value: s.to_string(),
            message,
        };

        match s {
            "" => Ok(Cell::Empty),
            "x" => Ok(Cell::DeadNote),
            _ => {
                if let Some(inner) = s.strip_prefix('<') {
                    let inner = inner
                        .strip_suffix('>')
                        .ok_or_else(|| invalid("unterminated harmonic bracket".to_string()))?;
                    Sequence::parse_strict(inner)
                        .map(Cell::Harmonic)
                        .map_err(invalid)
                } else {
                    Sequence::parse_strict(s).map(Cell::Sequence).map_err(invalid)
                }
            }
        }
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        cell.to_string()
    }
}

impl TryFrom<String> for Cell {
    type Error = StratumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single editing command applied to one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOp {
    Digit(char),
    Technique(Technique),
    DeadNote,
    ToggleHarmonic,
    Clear,
}

impl CellOp {
    pub fn apply(self, cell: &Cell) -> Cell {
        match self {
            CellOp::Digit(d) => cell.apply_digit(d),
            CellOp::Technique(t) => cell.apply_technique(t),
            CellOp::DeadNote => cell.apply_dead_note(),
            CellOp::ToggleHarmonic => cell.toggle_harmonic(),
            CellOp::Clear => cell.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cell(s: &str) -> Cell {
        s.parse().unwrap()
    }

    #[test]
    fn test_digit_on_empty() {
        assert_eq!(Cell::Empty.apply_digit('7').to_string(), "7");
    }

    #[test]
    fn test_two_digit_extension() {
        let c = Cell::Empty.apply_digit('1').apply_digit('2');
        assert_eq!(c.to_string(), "12");
    }

    #[test]
    fn test_extension_over_cap_replaces() {
        let c = Cell::Empty.apply_digit('2').apply_digit('5');
        assert_eq!(c.to_string(), "5");
        let c = Cell::Empty.apply_digit('2').apply_digit('4');
        assert_eq!(c.to_string(), "24");
    }

    #[test]
    fn test_two_digit_numeral_is_replaced() {
        assert_eq!(cell("12").apply_digit('3').to_string(), "3");
    }

    #[test]
    fn test_digit_after_technique_starts_new_fret() {
        assert_eq!(cell("3p").apply_digit('1').to_string(), "3p1");
        assert_eq!(cell("7h").apply_digit('9').to_string(), "7h9");
    }

    #[test]
    fn test_digit_extends_trailing_numeral_in_chain() {
        assert_eq!(cell("3p1").apply_digit('2').to_string(), "3p12");
        assert_eq!(cell("7h9").apply_digit('1').to_string(), "7h1");
    }

    #[test]
    fn test_digit_inside_harmonic() {
        assert_eq!(cell("<1>").apply_digit('2').to_string(), "<12>");
        assert_eq!(cell("<7>").apply_digit('5').to_string(), "<5>");
    }

    #[test]
    fn test_digit_replaces_dead_note() {
        assert_eq!(Cell::DeadNote.apply_digit('3').to_string(), "3");
    }

    #[test]
    fn test_non_digit_ignored() {
        assert_eq!(cell("5").apply_digit('q'), cell("5"));
    }

    #[test]
    fn test_technique_toggle() {
        let c = cell("5").apply_technique(Technique::HammerOn);
        assert_eq!(c.to_string(), "5h");
        assert_eq!(c.apply_technique(Technique::HammerOn), cell("5"));
    }

    #[test]
    fn test_technique_different_symbol_appends() {
        let c = cell("5h").apply_technique(Technique::Vibrato);
        assert_eq!(c.to_string(), "5h~");
    }

    #[test]
    fn test_technique_rejected_on_empty_and_dead() {
        assert_eq!(Cell::Empty.apply_technique(Technique::Slide), Cell::Empty);
        assert_eq!(Cell::DeadNote.apply_technique(Technique::Slide), Cell::DeadNote);
    }

    #[test]
    fn test_technique_inside_harmonic() {
        let c = cell("<7>").apply_technique(Technique::Vibrato);
        assert_eq!(c.to_string(), "<7~>");
    }

    #[test]
    fn test_dead_note_overrides() {
        assert_eq!(cell("<12h14>").apply_dead_note(), Cell::DeadNote);
        assert_eq!(Cell::DeadNote.to_string(), "x");
    }

    #[test]
    fn test_harmonic_toggle() {
        let c = cell("12").toggle_harmonic();
        assert_eq!(c.to_string(), "<12>");
        assert_eq!(c.width(), 4);
        assert_eq!(c.toggle_harmonic().to_string(), "12");
        assert_eq!(Cell::Empty.toggle_harmonic(), Cell::Empty);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!("25".parse::<Cell>().is_err());
        assert!("123".parse::<Cell>().is_err());
        assert!("h5".parse::<Cell>().is_err());
        assert!("<5".parse::<Cell>().is_err());
        assert!("5b7".parse::<Cell>().is_err());
        assert!("<>".parse::<Cell>().is_err());
    }

    #[test]
    fn test_parse_accepts_grammar() {
        for s in ["", "x", "0", "24", "7h9", "5/7", "3p1", "<12>", "12~", "5m", "7h9p7"] {
            assert_eq!(cell(s).to_string(), s);
        }
    }

    #[test]
    fn test_salvage_foreign_tokens() {
        assert_eq!(Cell::salvage("X"), Cell::DeadNote);
        assert_eq!(Cell::salvage("5\\3").to_string(), "5/3");
        assert_eq!(Cell::salvage("30").to_string(), "3");
        assert_eq!(Cell::salvage("h7").to_string(), "7");
        assert_eq!(Cell::salvage("<7").to_string(), "<7>");
        assert_eq!(Cell::salvage("12t").to_string(), "12");
        assert_eq!(Cell::salvage("7b9").to_string(), "7");
        assert_eq!(Cell::salvage("..."), Cell::Empty);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&cell("<7h9>")).unwrap();
        assert_eq!(json, "\"<7h9>\"");
        let back: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell("<7h9>"));
        assert!(serde_json::from_str::<Cell>("\"99\"").is_err());
    }

    fn arb_op() -> impl Strategy<Value = CellOp> {
        prop_oneof![
            (0u8..10).prop_map(|d| CellOp::Digit((b'0' + d) as char)),
            prop::sample::select(Technique::ALL.to_vec()).prop_map(CellOp::Technique),
            Just(CellOp::DeadNote),
            Just(CellOp::ToggleHarmonic),
            Just(CellOp::Clear),
        ]
    }

    proptest! {
        #[test]
        fn frets_never_exceed_cap(ops in proptest::collection::vec(arb_op(), 0..40)) {
            let cell = ops.iter().fold(Cell::Empty, |c, op| op.apply(&c));
            if let Some(seq) = cell.sequence() {
                for fret in seq.frets() {
                    prop_assert!(fret <= MAX_FRET);
                }
            }
        }

        #[test]
        fn edited_cells_reparse(ops in proptest::collection::vec(arb_op(), 0..40)) {
            let cell = ops.iter().fold(Cell::Empty, |c, op| op.apply(&c));
            prop_assert_eq!(cell.to_string().parse::<Cell>().unwrap(), cell);
        }

        #[test]
        fn harmonic_toggle_is_involution(ops in proptest::collection::vec(arb_op(), 1..40)) {
            let cell = ops.iter().fold(Cell::Empty, |c, op| op.apply(&c));
            prop_assert_eq!(cell.toggle_harmonic().toggle_harmonic(), cell);
        }
    }
}
