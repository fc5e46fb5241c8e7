//! Text splicing with source maps.
//!
//! `EditBuffer` collects non-overlapping edits against an original text and
//! renders both the edited text and a v3 source map for it. Unchanged chunks
//! are mapped 1:1 with one segment per generated line; inserted text gets no
//! segments; replacement text maps its first column to the start of the
//! range it replaced.

use serde::{Deserialize, Serialize};

use crate::error::Result;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE MAP
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sources_content: Vec<Option<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[derive(Default)]
struct MappingsBuilder {
    out: String,
    line_has_segment: bool,
    prev_gen_col: i64,
    prev_src_line: i64,
    prev_src_col: i64,
}

impl MappingsBuilder {
    fn segment(&mut self, gen_col: u32, src_line: u32, src_col: u32) {
        if self.line_has_segment {
            self.out.push(',');
        }
        encode_vlq(&mut self.out, gen_col as i64 - self.prev_gen_col);
        encode_vlq(&mut self.out, 0);
        encode_vlq(&mut self.out, src_line as i64 - self.prev_src_line);
        encode_vlq(&mut self.out, src_col as i64 - self.prev_src_col);
        self.prev_gen_col = gen_col as i64;
        self.prev_src_line = src_line as i64;
        self.prev_src_col = src_col as i64;
        self.line_has_segment = true;
    }

    fn newline(&mut self) {
        self.out.push(';');
        self.prev_gen_col = 0;
        self.line_has_segment = false;
    }
}

/// Line and UTF-16 column, the units source map consumers count in.
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    line: u32,
    col: u32,
}

impl Position {
    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += c.len_utf16() as u32;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EDIT BUFFER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Debug, Clone)]
pub struct EditBuffer<'s> {
    original: &'s str,
    edits: Vec<Edit>,
}

impl<'s> EditBuffer<'s> {
    pub fn new(original: &'s str) -> Self {
        Self {
            original,
            edits: Vec::new(),
        }
    }

    /// Inserts `text` before the byte at `at`. Inserts at one offset keep call order.
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.push(Edit {
            start: at,
            end: at,
            text: text.into(),
        });
    }

    /// Replaces `start..end`, which must not overlap another edit.
    pub fn overwrite(&mut self, start: usize, end: usize, text: impl Into<String>) {
        debug_assert!(start <= end && end <= self.original.len());
        self.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    /// Keeps edits ordered by range; an insert at an overwrite's start goes before it.
    fn push(&mut self, edit: Edit) {
        let key = (edit.start, edit.end);
        let at = self.edits.partition_point(|e| (e.start, e.end) <= key);
        self.edits.insert(at, edit);
    }

    pub fn has_changed(&self) -> bool {
        self.edits
            .iter()
            .any(|e| e.start != e.end || !e.text.is_empty())
    }

    fn chunks(&self) -> impl Iterator<Item = (&str, Option<&Edit>)> {
        let mut cursor = 0;
        let mut out = Vec::with_capacity(self.edits.len() * 2 + 1);
        for edit in &self.edits {
            out.push((&self.original[cursor..edit.start], Some(edit)));
            cursor = edit.end;
        }
        out.push((&self.original[cursor..], None));
        out.into_iter()
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.original.len() + self.edits.iter().map(|e| e.text.len()).sum::<usize>(),
        );
        for (unchanged, edit) in self.chunks() {
            out.push_str(unchanged);
            if let Some(edit) = edit {
                out.push_str(&edit.text);
            }
        }
        out
    }

    pub fn generate_map(&self, source: &str, include_content: bool) -> SourceMap {
        let mut builder = MappingsBuilder::default();
        let mut generated = Position::default();
        let mut original = Position::default();

        for (unchanged, edit) in self.chunks() {
            let mut at_line_start = true;
            for c in unchanged.chars() {
                if at_line_start {
                    builder.segment(generated.col, original.line, original.col);
                    at_line_start = false;
                }
                if c == '\n' {
                    builder.newline();
                    at_line_start = true;
                }
                generated.advance(c);
                original.advance(c);
            }

            let Some(edit) = edit else { continue };
            if edit.start != edit.end && !edit.text.is_empty() {
                builder.segment(generated.col, original.line, original.col);
            }
            for c in edit.text.chars() {
                if c == '\n' {
                    builder.newline();
                }
                generated.advance(c);
            }
            for c in self.original[edit.start..edit.end].chars() {
                original.advance(c);
            }
        }

        SourceMap {
            version: 3,
            file: None,
            sources: vec![source.to_string()],
            sources_content: if include_content {
                vec![Some(self.original.to_string())]
            } else {
                vec![]
            },
            names: vec![],
            mappings: builder.out,
        }
    }
}
