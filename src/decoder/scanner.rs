//! Strict scanner for canonical (sentinel-tagged) tab text.
//!
//! All six string layers of a staff are walked with one shared cursor, so a
//! wide cell on one string keeps the other strings in step. Column widths are
//! recovered with the encoder's own rule (widest token + 1, annotation + 1,
//! minimum 3), which makes the scan an exact inverse for self-produced text
//! while still resynchronising one character at a time on anything else.

use super::{DecodedTab, SourceFormat};
use crate::cell::Cell;
use crate::encoder::{MIN_COLUMN_WIDTH, PROTOCOL_SENTINEL, TITLE_SEPARATOR};
use crate::model::{
    clamp_bpm, clamp_time_signature, retune, TabColumn, TabRow, COLS_PER_ROW, DEFAULT_ARTIST,
    DEFAULT_BPM, DEFAULT_TIME_SIGNATURE, DEFAULT_TITLE, STANDARD_TUNING, STRING_COUNT,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    static ref STRING_LINE: Regex = Regex::new(r"^\s*([A-Ga-g][#b]?)\s*\|").unwrap();
    static ref TEMPO: Regex = Regex::new(r"Tempo:\s*(\d+)").unwrap();
    static ref METER: Regex = Regex::new(r"Meter:\s*(\d+)").unwrap();
    static ref ANNOTATION: Regex = Regex::new(r"\[([^\]\[]*)\]").unwrap();
}

/// Override values parsed from one `[...]` marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Annotation {
    bpm: Option<u16>,
    time_signature: Option<u8>,
    text_len: usize,
}

impl Annotation {
    fn apply(&self, column: &mut TabColumn) {
        if column.bpm.is_none() {
            column.bpm = self.bpm;
        }
        if column.time_signature.is_none() {
            column.time_signature = self.time_signature;
        }
    }
}

pub(crate) fn scan(text: &str) -> DecodedTab {
    let raw: Vec<&str> = text.lines().collect();
    let lines: Vec<&str> = raw.iter().map(|l| l.trim_end()).collect();

    let (title, artist, after_header) = parse_header(&raw);
    let (bpm, time_signature) = parse_tempo(&lines[after_header..]);

    let mut rows = Vec::new();
    let mut tuning = None;
    let mut i = 0;
    while i < lines.len() {
        match staff_at(&lines, i) {
            Some(letters) => {
                if tuning.is_none() {
                    tuning = Some(tuning_from_letters(&letters));
                }
                let annotation_line = if i > 0 { lines[i - 1] } else { "" };
                rows.push(scan_staff(annotation_line, &lines[i..i + STRING_COUNT]));
                i += STRING_COUNT;
            }
            None => i += 1,
        }
    }

    log::debug!(target: "decoder", "strict scan recovered {} staves", rows.len());

    DecodedTab {
        title,
        artist,
        bpm,
        time_signature,
        tuning,
        rows,
        format: SourceFormat::Protocol,
    }
}

/// Title, artist, and the index of the first line after the header.
///
/// The header is the first non-blank line after the sentinel. Lines are taken
/// untrimmed, since an empty artist ends the line with the separator's space.
fn parse_header(lines: &[&str]) -> (String, String, usize) {
    let start = lines
        .iter()
        .position(|l| l.contains(PROTOCOL_SENTINEL))
        .map_or(0, |p| p + 1);
    let Some(index) = (start..lines.len()).find(|&i| !lines[i].trim().is_empty()) else {
        return (DEFAULT_TITLE.to_string(), DEFAULT_ARTIST.to_string(), start);
    };
    let line = lines[index];

    if let Some((title, artist)) = split_header(line) {
        return (title, artist, index + 1);
    }
    if is_tempo_line(line) || STRING_LINE.is_match(line) || line.starts_with("Staff") {
        return (DEFAULT_TITLE.to_string(), DEFAULT_ARTIST.to_string(), index);
    }

    // hand-edited text may have lost the separator's trailing space
    let trimmed = line.trim_end();
    let bare_artist = if trimmed == "-" {
        Some("")
    } else {
        trimmed.strip_suffix(" -")
    };
    match bare_artist {
        Some(title) => (unescape(title), String::new(), index + 1),
        None => (unescape(trimmed.trim_start()), DEFAULT_ARTIST.to_string(), index + 1),
    }
}

/// Split at the first separator that is not escaped, undoing the escapes.
fn split_header(line: &str) -> Option<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let separator: Vec<char> = TITLE_SEPARATOR.chars().collect();
    let mut title = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            title.push(chars[i + 1]);
            i += 2;
        } else if chars[i..].starts_with(&separator) {
            let artist: String = chars[i + separator.len()..].iter().collect();
            return Some((title, unescape(&artist)));
        } else {
            title.push(chars[i]);
            i += 1;
        }
    }
    None
}

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next().unwrap_or('\\')),
            _ => out.push(c),
        }
    }
    out
}

fn is_tempo_line(line: &str) -> bool {
    line.trim_start().starts_with("Tempo:")
}

/// Tempo and meter from the first tempo line in `lines`.
fn parse_tempo(lines: &[&str]) -> (u16, u8) {
    let Some(line) = lines.iter().find(|l| is_tempo_line(l)) else {
        return (DEFAULT_BPM, DEFAULT_TIME_SIGNATURE);
    };
    let number = |re: &Regex| {
        re.captures(line)
            .and_then(|c| c[1].parse::<u32>().ok())
            .filter(|n| *n > 0)
    };
    let bpm = number(&TEMPO).map_or(DEFAULT_BPM, clamp_bpm);
    let meter = number(&METER).map_or(DEFAULT_TIME_SIGNATURE, clamp_time_signature);
    (bpm, meter)
}

/// Gutter letters when six string lines start at `i`.
fn staff_at(lines: &[&str], i: usize) -> Option<Vec<String>> {
    let block = lines.get(i..i + STRING_COUNT)?;
    block
        .iter()
        .map(|l| STRING_LINE.captures(l).map(|c| c[1].to_string()))
        .collect()
}

fn tuning_from_letters(letters: &[String]) -> [String; STRING_COUNT] {
    let mut tuning = STANDARD_TUNING.map(String::from);
    for (slot, letter) in tuning.iter_mut().zip(letters) {
        if let Some(tuned) = retune(slot, letter) {
            *slot = tuned;
        }
    }
    tuning
}

/// Content after the gutter bar, without the closing bar.
fn layer_of(line: &str) -> (usize, Vec<char>) {
    let chars: Vec<char> = line.chars().collect();
    let start = chars.iter().position(|&c| c == '|').map_or(0, |p| p + 1);
    let mut content = chars[start..].to_vec();
    if content.last() == Some(&'|') {
        content.pop();
    }
    (start, content)
}

fn is_content(c: Option<&char>) -> bool {
    matches!(c, Some(c) if !matches!(c, '-' | ' ' | '|'))
}

struct Layers {
    layers: Vec<Vec<char>>,
    len: usize,
}

impl Layers {
    fn has_content(&self, x: usize) -> bool {
        self.layers.iter().any(|l| is_content(l.get(x)))
    }

    /// Every layer holds padding at `x` (missing characters count as padding).
    fn blank_at(&self, x: usize) -> bool {
        x < self.len
            && self
                .layers
                .iter()
                .all(|l| l.get(x).map_or(true, |c| matches!(c, '-' | ' ')))
    }

    fn blank_run(&self, x: usize, limit: usize) -> usize {
        (0..limit).take_while(|k| self.blank_at(x + k)).count()
    }
}

/// A harmonic through its closing bracket, or a run of non-separators.
fn take_token(layer: &[char], x: usize) -> String {
    if layer[x] == '<' {
        let end = layer[x..]
            .iter()
            .position(|&c| c == '>')
            .map_or(layer.len(), |p| x + p + 1);
        return layer[x..end].iter().collect();
    }
    layer[x..]
        .iter()
        .take_while(|c| !matches!(c, '-' | ' ' | '|'))
        .collect()
}

fn parse_annotations(line: &str, gutter: usize) -> BTreeMap<usize, Annotation> {
    let mut annotations = BTreeMap::new();
    for m in ANNOTATION.captures_iter(line) {
        let Some(whole) = m.get(0) else { continue };
        let mut annotation = Annotation {
            bpm: None,
            time_signature: None,
            text_len: whole.as_str().chars().count(),
        };
        for part in m[1].split_whitespace() {
            let Some((key, value)) = part.split_once(':') else { continue };
            let Ok(n) = value.parse::<u32>() else { continue };
            if n == 0 {
                continue;
            }
            match key.to_ascii_uppercase().as_str() {
                "BPM" => annotation.bpm = Some(clamp_bpm(n)),
                "TS" => annotation.time_signature = Some(clamp_time_signature(n)),
                _ => {}
            }
        }
        if annotation.bpm.is_none() && annotation.time_signature.is_none() {
            continue;
        }
        let position = line[..whole.start()].chars().count();
        annotations.insert(position.saturating_sub(gutter), annotation);
    }
    annotations
}

fn scan_staff(annotation_line: &str, block: &[&str]) -> TabRow {
    let mut gutter = 0;
    let mut layers = Vec::with_capacity(STRING_COUNT);
    for (s, line) in block.iter().enumerate() {
        let (start, layer) = layer_of(line);
        if s == 0 {
            gutter = start;
        }
        layers.push(layer);
    }
    let len = layers.iter().map(Vec::len).max().unwrap_or(0);
    let layers = Layers { layers, len };
    let mut annotations = parse_annotations(annotation_line, gutter);

    let mut columns: Vec<TabColumn> = Vec::with_capacity(COLS_PER_ROW);
    let mut starts: Vec<usize> = Vec::with_capacity(COLS_PER_ROW);
    let mut x = 0;

    while x < len && columns.len() < COLS_PER_ROW {
        let annotation = annotations.remove(&x);
        let annotation_width = annotation.map_or(0, |a| a.text_len + 1);

        if layers.has_content(x) {
            let mut column = TabColumn::blank();
            let mut widest = 0;
            for (s, layer) in layers.layers.iter().enumerate() {
                if is_content(layer.get(x)) {
                    let token = take_token(layer, x);
                    widest = widest.max(token.chars().count());
                    column.notes[s] = Cell::salvage(&token);
                }
            }
            let width = MIN_COLUMN_WIDTH.max(widest + 1).max(annotation_width);
            let advance = widest + layers.blank_run(x + widest, width - widest);
            if let Some(a) = annotation {
                a.apply(&mut column);
            }
            starts.push(x);
            columns.push(column);
            x += advance;
            continue;
        }

        let width = MIN_COLUMN_WIDTH.max(annotation_width);
        let run = layers.blank_run(x, width);
        if run >= MIN_COLUMN_WIDTH {
            let mut column = TabColumn::blank();
            if let Some(a) = annotation {
                a.apply(&mut column);
            }
            starts.push(x);
            columns.push(column);
            x += run;
        } else {
            if let Some(a) = annotation {
                // not a column start: let the fallback below place it
                annotations.insert(x, a);
            }
            x += 1;
        }
    }

    for (position, annotation) in annotations {
        if let Some(index) = starts.iter().rposition(|s| *s <= position) {
            log::debug!(
                target: "decoder",
                "annotation at offset {} placed on nearest column {}",
                position,
                index
            );
            annotation.apply(&mut columns[index]);
        }
    }

    TabRow::from_columns(columns)
}
