use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use logos::Logos;

use crate::error::{error_at, Diagnostic, SpannedResult, SyntaxError};
use crate::form::{Form, Keyword, Location, Position, Symbol};

//===----------------------------------------------------------------------===//
// Utils
//===----------------------------------------------------------------------===//

/// Unescapes the body of a string literal. Unknown escapes keep their
/// backslash.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('$') => result.push('$'),
            Some('0') => result.push('\0'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

//===----------------------------------------------------------------------===//
// Token
//===----------------------------------------------------------------------===//

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n,]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("#{")]
    SetOpen,
    #[token("@[")]
    ArrayOpen,
    #[token("'")]
    Quote,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let slice = lex.slice();
        unescape_string(&slice[1..slice.len() - 1])
    })]
    Str(String),

    // Runs to end of input without a closing quote.
    #[regex(r#""([^"\\]|\\.)*"#, priority = 0)]
    UnterminatedStr,

    #[regex(r"-?[0-9]+", priority = 5, callback = |lex| lex.slice().to_owned())]
    Int(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?", priority = 4, callback = |lex| lex.slice().to_owned())]
    Float(String),

    #[regex(r#":[^ \t\r\n,;()\[\]{}"`~^]+"#, priority = 3, callback = |lex| lex.slice().to_owned())]
    Keyword(String),

    #[regex(r#"[^ \t\r\n,;()\[\]{}'"`@~^:#][^ \t\r\n,;()\[\]{}"`~^]*"#, priority = 1, callback = |lex| lex.slice().to_owned())]
    Symbol(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::SetOpen => write!(f, "#{{"),
            Token::ArrayOpen => write!(f, "@["),
            Token::Quote => write!(f, "'"),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::UnterminatedStr => write!(f, "\""),
            Token::Int(s) | Token::Float(s) | Token::Keyword(s) | Token::Symbol(s) => write!(f, "{}", s),
        }
    }
}

//===----------------------------------------------------------------------===//
// Reader
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq)]
struct SpannedToken {
    token: Token,
    span: Range<usize>,
}

struct Reader<'a> {
    source: &'a str,
    file: Arc<str>,
    tokens: Vec<SpannedToken>,
    position: usize,
    line_starts: Vec<usize>,
}

impl<'a> Reader<'a> {
    fn new(source: &'a str, file: &str) -> SpannedResult<Self> {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let mut reader =
            Self { source, file: Arc::from(file), tokens: Vec::new(), position: 0, line_starts };

        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            let span = lexer.span();
            match token {
                Ok(Token::UnterminatedStr) => {
                    return Err(error_at(Some(&reader.location(&span)), SyntaxError::UnterminatedString));
                }
                Ok(token) => reader.tokens.push(SpannedToken { token, span }),
                Err(()) => {
                    return Err(error_at(
                        Some(&reader.location(&span)),
                        SyntaxError::UnexpectedToken {
                            found: lexer.slice().to_string(),
                            expected: "form".to_string(),
                        },
                    ));
                }
            }
        }
        Ok(reader)
    }

    fn position_at(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = self.source[self.line_starts[line]..offset].chars().count();
        Position::new(line as u32 + 1, column as u32)
    }

    fn location(&self, span: &Range<usize>) -> Location {
        Location::new(self.file.clone(), self.position_at(span.start), self.position_at(span.end))
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn eof_error(&self, expected: Option<&str>) -> Diagnostic {
        let end = self.source.len();
        error_at(
            Some(&self.location(&(end..end))),
            SyntaxError::UnexpectedEOF { expected: expected.map(str::to_string) },
        )
    }

    fn read_form(&mut self) -> SpannedResult<Form> {
        let Some(SpannedToken { token, span }) = self.next() else {
            return Err(self.eof_error(Some("form")));
        };
        let loc = Some(self.location(&span));

        match token {
            Token::LParen => self.read_sequence(span, ')').map(|(items, loc)| Form::List { loc, items }),
            Token::LBracket => self.read_sequence(span, ']').map(|(items, loc)| Form::Vector { loc, items }),
            Token::ArrayOpen => self.read_sequence(span, ']').map(|(items, loc)| Form::Array { loc, items }),
            Token::SetOpen => self.read_sequence(span, '}').map(|(items, loc)| Form::Set { loc, items }),
            Token::LBrace => {
                let (items, loc) = self.read_sequence(span, '}')?;
                if items.len() % 2 != 0 {
                    return Err(error_at(
                        loc.as_ref(),
                        SyntaxError::InvalidMap { reason: "a map needs an even number of forms".to_string() },
                    ));
                }
                let mut items = items.into_iter();
                let mut entries = Vec::new();
                while let (Some(k), Some(v)) = (items.next(), items.next()) {
                    entries.push((k, v));
                }
                Ok(Form::Map { loc, entries })
            }
            Token::Quote => {
                let quoted = self.read_form()?;
                Ok(Form::List { loc, items: vec![Form::symbol("quote"), quoted] })
            }
            Token::RParen | Token::RBracket | Token::RBrace => Err(error_at(
                loc.as_ref(),
                SyntaxError::UnexpectedToken { found: token.to_string(), expected: "form".to_string() },
            )),
            Token::Str(value) => Ok(Form::Str { loc, value: Arc::from(value) }),
            Token::Int(text) => match text.parse::<i64>() {
                Ok(value) => Ok(Form::Int { loc, value }),
                Err(_) => Err(error_at(loc.as_ref(), SyntaxError::InvalidNumber { value: text })),
            },
            Token::Float(text) => match text.parse::<f64>() {
                Ok(value) => Ok(Form::Float { loc, value }),
                Err(_) => Err(error_at(loc.as_ref(), SyntaxError::InvalidNumber { value: text })),
            },
            Token::Keyword(text) => Ok(Form::Keyword { loc, value: Keyword::parse(&text) }),
            Token::Symbol(text) => Ok(match text.as_str() {
                "nil" => Form::Nil { loc },
                "true" => Form::Bool { loc, value: true },
                "false" => Form::Bool { loc, value: false },
                _ => Form::Symbol { loc, value: Symbol::parse(&text) },
            }),
            Token::UnterminatedStr => Err(error_at(loc.as_ref(), SyntaxError::UnterminatedString)),
        }
    }

    /// Reads forms up to the `close` delimiter. The returned location spans
    /// from the opening token to the closing one.
    fn read_sequence(&mut self, open: Range<usize>, close: char) -> SpannedResult<(Vec<Form>, Option<Location>)> {
        let mut items = Vec::new();
        loop {
            let Some(next) = self.peek() else {
                return Err(error_at(
                    Some(&self.location(&open)),
                    SyntaxError::UnbalancedDelimiter { delimiter: close },
                ));
            };
            let closes = matches!(
                (&next.token, close),
                (Token::RParen, ')') | (Token::RBracket, ']') | (Token::RBrace, '}')
            );
            if closes {
                let end = next.span.end;
                self.position += 1;
                return Ok((items, Some(self.location(&(open.start..end)))));
            }
            items.push(self.read_form()?);
        }
    }
}

/// Reads every top-level form in `source`. `file` names the source in
/// locations.
pub fn read_all(source: &str, file: &str) -> SpannedResult<Vec<Form>> {
    let mut reader = Reader::new(source, file)?;
    let mut forms = Vec::new();
    while reader.peek().is_some() {
        forms.push(reader.read_form()?);
    }
    Ok(forms)
}

/// Reads a single form, ignoring anything after it.
pub fn read(source: &str) -> SpannedResult<Form> {
    let mut reader = Reader::new(source, "string")?;
    reader.read_form()
}
