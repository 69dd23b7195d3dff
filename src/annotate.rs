//! Source annotation: overlays coverage markup onto original source text.
//!
//! [`InsertionText`] buffers markup insertions against one line's original
//! character offsets and resolves them at read time, so later insertions
//! never disturb earlier-recorded offsets. The [`annotate`] driver runs
//! the four passes (lines, branches, functions, statements) in that fixed
//! order; statements span whole lines and must come last or their spans
//! would swallow the narrower markers and produce crossing tags.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::model::{DiffRange, FileCoverage};

/// Private placeholders protecting inserted markup from HTML escaping.
const LT: char = '\u{1}';
const GT: char = '\u{2}';

/// A text buffer over one source line that supports inserting markup at
/// original-coordinate offsets.
pub struct InsertionText {
    chars: Vec<char>,
    consume_blanks: bool,
    start_pos: i64,
    end_pos: i64,
    insertions: Vec<Insertion>,
}

struct Insertion {
    pos: usize,
    markup: String,
    prepend: bool,
}

impl InsertionText {
    #[must_use]
    pub fn new(text: &str, consume_blanks: bool) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let start_pos = chars
            .iter()
            .position(|c| !c.is_whitespace())
            .map_or(-1, |p| p as i64);
        let end_pos = chars
            .iter()
            .rposition(|c| !c.is_whitespace())
            .map_or(-1, |p| p as i64);
        Self {
            chars,
            consume_blanks,
            start_pos,
            end_pos,
            insertions: Vec::new(),
        }
    }

    /// Length of the original text in characters; all insertion offsets
    /// are clamped to `0..=original_length()`.
    #[must_use]
    pub fn original_length(&self) -> usize {
        self.chars.len()
    }

    /// Record `markup` at original offset `col`. With `prepend` the markup
    /// lands before anything previously recorded at that offset, otherwise
    /// after it.
    pub fn insert_at(&mut self, col: i64, markup: &str, prepend: bool) {
        self.insert_at_with(col, markup, prepend, self.consume_blanks);
    }

    pub fn insert_at_with(&mut self, col: i64, markup: &str, prepend: bool, consume_blanks: bool) {
        let mut col = col.clamp(0, self.original_length() as i64);
        if consume_blanks {
            if col <= self.start_pos {
                col = self.start_pos.max(0);
            }
            if col > self.end_pos {
                col = self.end_pos + 1;
            }
        }
        self.insertions.push(Insertion {
            pos: col.max(0) as usize,
            markup: markup.replace('<', &LT.to_string()).replace('>', &GT.to_string()),
            prepend,
        });
    }

    /// Record an open/close marker pair. Pairs recorded later must fully
    /// contain or be fully contained by earlier pairs; the fixed pass
    /// order in [`annotate`] guarantees this.
    pub fn wrap(&mut self, start: i64, open: &str, end: i64, close: &str) {
        self.insert_at(start, open, true);
        self.insert_at(end, close, false);
    }

    /// Apply all recorded insertions and HTML-escape the original
    /// characters, leaving the inserted markup's own tags intact.
    #[must_use]
    pub fn resolve(&self) -> String {
        let mut pending: BTreeMap<usize, VecDeque<&str>> = BTreeMap::new();
        for ins in &self.insertions {
            let queue = pending.entry(ins.pos).or_default();
            if ins.prepend {
                queue.push_front(&ins.markup);
            } else {
                queue.push_back(&ins.markup);
            }
        }

        let mut out = String::with_capacity(self.chars.len());
        for pos in 0..=self.chars.len() {
            if let Some(queue) = pending.get(&pos) {
                for markup in queue {
                    out.push_str(markup);
                }
            }
            if let Some(c) = self.chars.get(pos) {
                out.push(*c);
            }
        }
        escape(&out)
    }
}

/// Escape the assembled text, then translate the placeholder characters
/// back so inserted markup renders as real tags. Escaping before
/// insertion, or skipping the placeholders, corrupts the output.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace(LT, "<")
        .replace(GT, ">")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Covered {
    Yes,
    No,
    Neutral,
}

/// One annotated source line, ready for the HTML template layer.
#[derive(Debug, Serialize)]
pub struct AnnotatedLine {
    pub line: u32,
    pub covered: Covered,
    pub text: String,
    pub incremental: bool,
}

struct LineBuf {
    covered: Option<Covered>,
    text: InsertionText,
    incremental: bool,
}

/// Annotate a file's source with its coverage record.
///
/// `diff_ranges` is the incremental window for this file: lines outside
/// it are dimmed. `None` means the file has no window at all, so every
/// line is dimmed.
#[must_use]
pub fn annotate(
    fc: &FileCoverage,
    source: &str,
    diff_ranges: Option<&[DiffRange]>,
) -> Vec<AnnotatedLine> {
    let code = split_lines(source);

    // Index 0 is a sentinel so coverage line numbers index directly.
    let mut structured: Vec<LineBuf> = Vec::with_capacity(code.len() + 1);
    structured.push(LineBuf {
        covered: None,
        text: InsertionText::new("", false),
        incremental: false,
    });
    for (i, line) in code.iter().enumerate() {
        let line_number = (i + 1) as u32;
        let incremental =
            diff_ranges.is_some_and(|ranges| ranges.iter().any(|r| r.contains(line_number)));
        structured.push(LineBuf {
            covered: None,
            text: InsertionText::new(line, true),
            incremental,
        });
    }

    annotate_lines(fc, &mut structured);
    annotate_branches(fc, &mut structured);
    annotate_functions(fc, &mut structured);
    annotate_statements(fc, &mut structured);

    structured
        .into_iter()
        .skip(1)
        .enumerate()
        .map(|(i, buf)| AnnotatedLine {
            line: (i + 1) as u32,
            covered: buf.covered.unwrap_or(Covered::Neutral),
            text: buf.text.resolve(),
            incremental: buf.incremental,
        })
        .collect()
}

fn annotate_lines(fc: &FileCoverage, structured: &mut [LineBuf]) {
    for (line, count) in &fc.l {
        if let Some(item) = structured.get_mut(*line as usize) {
            item.covered = Some(if *count > 0 { Covered::Yes } else { Covered::No });
        }
    }
    for item in structured.iter_mut() {
        if item.covered.is_none() {
            item.covered = Some(Covered::Neutral);
        }
        if !item.incremental {
            let len = item.text.original_length() as i64;
            item.text.wrap(0, "<span class=\"disabled\">", len, "</span>");
        }
    }
}

fn annotate_branches(fc: &FileCoverage, structured: &mut [LineBuf]) {
    for (id, arms) in &fc.b {
        let Some(meta) = fc.branch_map.get(id) else {
            continue;
        };
        // Only flag the missing outcome of a branch that was otherwise
        // exercised; fully-dead branches stay unmarked.
        let total: u64 = arms.iter().sum();
        if total == 0 {
            continue;
        }
        for (i, count) in arms.iter().enumerate() {
            if *count != 0 {
                continue;
            }
            let Some(loc) = meta.locations.get(i) else {
                continue;
            };
            let Some(buf) = structured.get_mut(loc.start.line as usize) else {
                continue;
            };
            let start_col = loc.start.column as i64;
            let mut end_col = loc.end.column as i64 + 1;
            if loc.end.line != loc.start.line {
                end_col = buf.text.original_length() as i64;
            }
            // Skip may be flagged on the branch itself or on a location.
            let skip = meta.skip || loc.skip;
            if meta.kind == "if" {
                // The implicit else-path may have no source span, so mark
                // with a zero-width glyph instead of wrapping a range.
                let class = if skip {
                    "skip-if-branch"
                } else {
                    "missing-if-branch"
                };
                let (word, glyph) = if i == 0 { ("if", 'I') } else { ("else", 'E') };
                let snippet = format!(
                    "<span class=\"{class}\" title=\"{word} path not taken\" >{glyph}</span>"
                );
                buf.text.insert_at_with(start_col, &snippet, true, false);
            } else {
                let class = if skip { "cbranch-skip" } else { "cbranch-no" };
                let open =
                    format!("<span class=\"branch-{i} {class}\" title=\"branch not covered\" >");
                buf.text.wrap(start_col, &open, end_col, "</span>");
            }
        }
    }
}

fn annotate_functions(fc: &FileCoverage, structured: &mut [LineBuf]) {
    for (id, count) in &fc.f {
        let Some(meta) = fc.fn_map.get(id) else {
            continue;
        };
        if *count > 0 {
            continue;
        }
        let loc = meta.loc;
        let Some(buf) = structured.get_mut(loc.start.line as usize) else {
            continue;
        };
        let start_col = loc.start.column as i64;
        let mut end_col = loc.end.column as i64 + 1;
        if loc.end.line != loc.start.line {
            end_col = buf.text.original_length() as i64;
        }
        let class = if meta.skip { "fstat-skip" } else { "fstat-no" };
        let open = format!("<span class=\"{class}\" title=\"function not covered\" >");
        buf.text.wrap(start_col, &open, end_col, "</span>");
    }
}

fn annotate_statements(fc: &FileCoverage, structured: &mut [LineBuf]) {
    for (id, count) in &fc.s {
        let Some(meta) = fc.statement_map.get(id) else {
            continue;
        };
        if *count > 0 {
            continue;
        }
        let Some(buf) = structured.get_mut(meta.start.line as usize) else {
            continue;
        };
        let start_col = meta.start.column as i64;
        let mut end_col = meta.end.column as i64 + 1;
        if meta.end.line != meta.start.line {
            // Per-line column math is not tracked across line boundaries;
            // collapse to the start line and extend to its end.
            end_col = buf.text.original_length() as i64;
        }
        let class = if meta.skip { "cstat-skip" } else { "cstat-no" };
        let open = format!("<span class=\"{class}\" title=\"statement not covered\" >");
        buf.text.wrap(start_col, &open, end_col, "</span>");
    }
}

/// Split source text on `\r\n`, `\n` or lone `\r`, keeping a trailing
/// empty segment when the text ends with a terminator.
fn split_lines(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                out.push(&source[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                out.push(&source[start..i]);
                i += 1;
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    out.push(&source[start..]);
    out
}
