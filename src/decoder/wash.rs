//! Universal wash: best-effort quantizer for arbitrary monospace tabs.
//!
//! Hand-written tabs rarely keep consistent spacing, so instead of stepping a
//! shared cursor the wash maps each token's character offset proportionally
//! onto the 32-column grid. Strings are assumed to come in blocks of six.

use crate::cell::Cell;
use crate::model::{TabColumn, TabRow, COLS_PER_ROW, STRING_COUNT};
use lazy_static::lazy_static;
use regex::Regex;

/// Layers shorter than this are not treated as music.
const MIN_LAYER_LEN: usize = 10;

/// Line prefixes of palm-mute / pinch-harmonic legends.
const MARKER_PREFIXES: [&str; 2] = ["PM", "PH"];

lazy_static! {
    static ref RHYTHM_GUIDE: Regex = Regex::new(r"^[0-9\s|]+$").unwrap();
    static ref STRING_LINE: Regex =
        Regex::new(r"^(?:[a-gA-G][#b]?)?\s*\|?[-0-9\s|/\\hpmxX<>()~t.]{10,}").unwrap();
}

fn is_token_start(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '<' | 'x' | 'X' | 'h' | 'p' | 'm' | '/' | '~' | 't')
}

fn is_token_body(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, 'h' | 'p' | 'm' | '/' | '\\' | '~' | 't' | '.' | 'x' | 'X')
}

/// Lines worth looking at: non-blank, not a count guide, not a legend.
fn keep_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || RHYTHM_GUIDE.is_match(trimmed) {
        return false;
    }
    !MARKER_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Runs of consecutive string lines, cut into six-line blocks.
fn staff_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut runs: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines().map(str::trim_end).filter(|l| keep_line(l)) {
        if STRING_LINE.is_match(line) {
            if let Some(run) = runs.last_mut() {
                run.push(line);
            }
        } else if runs.last().is_some_and(|r| !r.is_empty()) {
            runs.push(Vec::new());
        }
    }

    let mut blocks = Vec::new();
    for run in runs {
        let complete = run.chunks_exact(STRING_COUNT);
        if !complete.remainder().is_empty() {
            log::debug!(
                target: "wash",
                "dropping {} stray string lines",
                complete.remainder().len()
            );
        }
        blocks.extend(complete.map(<[&str]>::to_vec));
    }
    blocks
}

/// Strip the tuning prefix through the first separator, and a closing bar.
fn normalize_layer(line: &str) -> Vec<char> {
    let chars: Vec<char> = line.chars().collect();
    let start = chars
        .iter()
        .position(|&c| c == '|' || c == '-')
        .map_or(0, |p| p + 1);
    let mut content = chars[start..].to_vec();
    if content.last() == Some(&'|') {
        content.pop();
    }
    content
}

fn capture_token(layer: &[char], x: usize) -> (String, usize) {
    let mut end = x + 1;
    if layer[x] == '<' {
        while end < layer.len() && layer[end] != '>' {
            end += 1;
        }
        end = (end + 1).min(layer.len());
    } else {
        while end < layer.len() && is_token_body(layer[end]) {
            end += 1;
        }
    }
    (layer[x..end].iter().collect(), end)
}

fn quantize_block(block: &[&str]) -> Option<TabRow> {
    let layers: Vec<Vec<char>> = block.iter().map(|l| normalize_layer(l)).collect();
    let max_len = layers.iter().map(Vec::len).max().unwrap_or(0);
    if max_len < MIN_LAYER_LEN {
        return None;
    }

    let mut columns: Vec<TabColumn> = (0..COLS_PER_ROW).map(|_| TabColumn::blank()).collect();
    for (s, layer) in layers.iter().enumerate() {
        let mut x = 0;
        while x < layer.len() {
            if !is_token_start(layer[x]) {
                x += 1;
                continue;
            }
            let slot = (x * COLS_PER_ROW / max_len).min(COLS_PER_ROW - 1);
            let (token, next) = capture_token(layer, x);
            let cell = Cell::salvage(&token);
            if !cell.is_empty() {
                columns[slot].notes[s] = cell;
            }
            x = next;
        }
    }

    Some(TabRow::from_columns(columns))
}

/// Quantize every recognisable six-string block into a row.
///
/// # Example
/// ```
/// use stratum::decoder::wash_rows;
///
/// let tab = "\
/// e|-------0-------|
/// B|-----1---1-----|
/// G|---2-------2---|
/// D|-2-----------2-|
/// A|---------------|
/// E|---------------|";
/// let rows = wash_rows(tab);
/// assert_eq!(rows.len(), 1);
/// ```
pub fn wash_rows(text: &str) -> Vec<TabRow> {
    let rows: Vec<TabRow> = staff_blocks(text)
        .iter()
        .filter_map(|block| quantize_block(block))
        .collect();
    log::debug!(target: "wash", "washed {} staves", rows.len());
    rows
}
