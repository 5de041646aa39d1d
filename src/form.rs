use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

//===----------------------------------------------------------------------===//
// Location
//===----------------------------------------------------------------------===//

/// A line/column pair. Lines are 1-based, columns are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source span of a form, as attached by the reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Arc<str>,
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, start: Position, end: Position) -> Self {
        Self { file: file.into(), start, end }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.column + 1)
    }
}

//===----------------------------------------------------------------------===//
// Symbol & Keyword
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub ns: Option<Arc<str>>,
    pub name: Arc<str>,
}

impl Symbol {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { ns: None, name: name.into() }
    }

    pub fn qualified(ns: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self { ns: Some(ns.into()), name: name.into() }
    }

    /// Splits `ns/name` at the first slash. A lone `/` or a leading slash
    /// stays unqualified.
    pub fn parse(text: &str) -> Self {
        match text.find('/') {
            Some(i) if i > 0 && i + 1 < text.len() => {
                Self::qualified(&text[..i], &text[i + 1..])
            }
            _ => Self::new(text),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// Drops the namespace part, keeping the name.
    pub fn unqualified(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyword {
    pub ns: Option<Arc<str>>,
    pub name: Arc<str>,
}

impl Keyword {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { ns: None, name: name.into() }
    }

    pub fn parse(text: &str) -> Self {
        let sym = Symbol::parse(text.trim_start_matches(':'));
        Self { ns: sym.ns, name: sym.name }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, ":{}/{}", ns, self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

//===----------------------------------------------------------------------===//
// Form
//===----------------------------------------------------------------------===//

/// Parsed, un-analyzed source data. Every variant carries the location it
/// was read from, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Nil { loc: Option<Location> },
    Bool { loc: Option<Location>, value: bool },
    Int { loc: Option<Location>, value: i64 },
    Float { loc: Option<Location>, value: f64 },
    Str { loc: Option<Location>, value: Arc<str> },
    Keyword { loc: Option<Location>, value: Keyword },
    Symbol { loc: Option<Location>, value: Symbol },
    List { loc: Option<Location>, items: Vec<Form> },
    Vector { loc: Option<Location>, items: Vec<Form> },
    Array { loc: Option<Location>, items: Vec<Form> },
    Map { loc: Option<Location>, entries: Vec<(Form, Form)> },
    Set { loc: Option<Location>, items: Vec<Form> },
}

impl Form {
    pub fn nil() -> Self {
        Form::Nil { loc: None }
    }

    pub fn bool(value: bool) -> Self {
        Form::Bool { loc: None, value }
    }

    pub fn int(value: i64) -> Self {
        Form::Int { loc: None, value }
    }

    pub fn float(value: f64) -> Self {
        Form::Float { loc: None, value }
    }

    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Form::Str { loc: None, value: value.into() }
    }

    pub fn keyword(text: &str) -> Self {
        Form::Keyword { loc: None, value: Keyword::parse(text) }
    }

    pub fn symbol(text: &str) -> Self {
        Form::Symbol { loc: None, value: Symbol::parse(text) }
    }

    pub fn from_symbol(value: Symbol) -> Self {
        Form::Symbol { loc: None, value }
    }

    pub fn list(items: Vec<Form>) -> Self {
        Form::List { loc: None, items }
    }

    pub fn vector(items: Vec<Form>) -> Self {
        Form::Vector { loc: None, items }
    }

    pub fn array(items: Vec<Form>) -> Self {
        Form::Array { loc: None, items }
    }

    pub fn map(entries: Vec<(Form, Form)>) -> Self {
        Form::Map { loc: None, entries }
    }

    pub fn set(items: Vec<Form>) -> Self {
        Form::Set { loc: None, items }
    }

    pub fn loc(&self) -> Option<&Location> {
        match self {
            Form::Nil { loc }
            | Form::Bool { loc, .. }
            | Form::Int { loc, .. }
            | Form::Float { loc, .. }
            | Form::Str { loc, .. }
            | Form::Keyword { loc, .. }
            | Form::Symbol { loc, .. }
            | Form::List { loc, .. }
            | Form::Vector { loc, .. }
            | Form::Array { loc, .. }
            | Form::Map { loc, .. }
            | Form::Set { loc, .. } => loc.as_ref(),
        }
    }

    fn loc_mut(&mut self) -> &mut Option<Location> {
        match self {
            Form::Nil { loc }
            | Form::Bool { loc, .. }
            | Form::Int { loc, .. }
            | Form::Float { loc, .. }
            | Form::Str { loc, .. }
            | Form::Keyword { loc, .. }
            | Form::Symbol { loc, .. }
            | Form::List { loc, .. }
            | Form::Vector { loc, .. }
            | Form::Array { loc, .. }
            | Form::Map { loc, .. }
            | Form::Set { loc, .. } => loc,
        }
    }

    pub fn with_loc(mut self, loc: Option<Location>) -> Self {
        *self.loc_mut() = loc;
        self
    }

    /// Fills in `loc` on this form and its children wherever no location
    /// was recorded. Used to attribute macro output to the macro call.
    pub fn with_default_location(mut self, default: &Location) -> Self {
        if self.loc().is_none() {
            *self.loc_mut() = Some(default.clone());
        }
        match self {
            Form::List { loc, items } => Form::List { loc, items: fill_all(items, default) },
            Form::Vector { loc, items } => Form::Vector { loc, items: fill_all(items, default) },
            Form::Array { loc, items } => Form::Array { loc, items: fill_all(items, default) },
            Form::Set { loc, items } => Form::Set { loc, items: fill_all(items, default) },
            Form::Map { loc, entries } => Form::Map {
                loc,
                entries: entries
                    .into_iter()
                    .map(|(k, v)| (k.with_default_location(default), v.with_default_location(default)))
                    .collect(),
            },
            other => other,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Form::Symbol { value, .. } => Some(value),
            _ => None,
        }
    }

    /// True for an unqualified symbol named `name`.
    pub fn is_symbol_named(&self, name: &str) -> bool {
        matches!(self, Form::Symbol { value, .. } if value.ns.is_none() && &*value.name == name)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Form::Nil { .. } => "nil",
            Form::Bool { .. } => "boolean",
            Form::Int { .. } => "integer",
            Form::Float { .. } => "float",
            Form::Str { .. } => "string",
            Form::Keyword { .. } => "keyword",
            Form::Symbol { .. } => "symbol",
            Form::List { .. } => "list",
            Form::Vector { .. } => "vector",
            Form::Array { .. } => "array",
            Form::Map { .. } => "map",
            Form::Set { .. } => "set",
        }
    }
}

fn fill_all(items: Vec<Form>, default: &Location) -> Vec<Form> {
    items.into_iter().map(|f| f.with_default_location(default)).collect()
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Form::Nil { .. } => write!(f, "nil"),
            Form::Bool { value, .. } => write!(f, "{}", value),
            Form::Int { value, .. } => write!(f, "{}", value),
            Form::Float { value, .. } => write!(f, "{:?}", value),
            Form::Str { value, .. } => write!(f, "\"{}\"", escape_string(value)),
            Form::Keyword { value, .. } => write!(f, "{}", value),
            Form::Symbol { value, .. } => write!(f, "{}", value),
            Form::List { items, .. } => write!(f, "({})", items.iter().join(" ")),
            Form::Vector { items, .. } => write!(f, "[{}]", items.iter().join(" ")),
            Form::Array { items, .. } => write!(f, "@[{}]", items.iter().join(" ")),
            Form::Map { entries, .. } => {
                write!(f, "{{{}}}", entries.iter().map(|(k, v)| format!("{} {}", k, v)).join(" "))
            }
            Form::Set { items, .. } => write!(f, "#{{{}}}", items.iter().join(" ")),
        }
    }
}
