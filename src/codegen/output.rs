use crate::form::Location;

use super::source_map::Mapping;

/// Text sink for the emitter. Tracks the generated line and column so that
/// fragments carrying a location can be recorded as source map entries.
#[derive(Debug)]
pub struct OutputBuffer {
    code: String,
    indent_level: usize,
    indent_width: usize,
    line: u32,
    column: u32,
    mappings: Vec<Mapping>,
    track_mappings: bool,
}

impl OutputBuffer {
    pub fn new(indent_width: usize, track_mappings: bool) -> Self {
        Self {
            code: String::new(),
            indent_level: 0,
            indent_width,
            line: 0,
            column: 0,
            mappings: Vec::new(),
            track_mappings,
        }
    }

    /// Writes `text`, indenting first when at the start of a line. `text`
    /// must not contain a newline.
    pub fn emit_str(&mut self, text: &str, loc: Option<&Location>) {
        debug_assert!(!text.contains('\n'), "emit_str called with a newline");
        if text.is_empty() {
            return;
        }
        if self.column == 0 && self.indent_level > 0 {
            let indent = " ".repeat(self.indent_level * self.indent_width);
            self.push(&indent);
        }
        if let (true, Some(loc)) = (self.track_mappings, loc) {
            self.mappings.push(Mapping {
                generated_line: self.line,
                generated_column: self.column,
                original_line: loc.start.line.saturating_sub(1),
                original_column: loc.start.column,
            });
        }
        self.push(text);
    }

    /// Writes `text` and ends the line.
    pub fn emit_line(&mut self, text: &str, loc: Option<&Location>) {
        self.emit_str(text, loc);
        self.newline();
    }

    pub fn newline(&mut self) {
        self.code.push('\n');
        self.line += 1;
        self.column = 0;
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        assert!(self.indent_level > 0, "unbalanced dedent");
        self.indent_level -= 1;
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn into_parts(self) -> (String, Vec<Mapping>) {
        (self.code, self.mappings)
    }

    fn push(&mut self, text: &str) {
        self.code.push_str(text);
        self.column += text.chars().count() as u32;
    }
}
