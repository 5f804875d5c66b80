//! Parser for the textual literals stored in the structured dataset columns.
//!
//! The exporter that produced the dataset wrote `category_percentages` and
//! `cleanup_message` as Python literal reprs, e.g.
//! `{'Science': 80.0, 'History': 10}` and `['Needs citations', "It's short"]`.
//! JSON text is a subset of what is accepted here, so JSON-encoded cells load
//! too.
//!
//! Supported grammar:
//! - strings in single or double quotes with `\\ \' \" \n \t \r \xHH \uXXXX` escapes
//! - integers and floats (sign, fraction, exponent)
//! - lists `[...]`, tuples `(...)`, dicts `{...}`, trailing commas allowed
//!
//! Non-finite floats (`nan`, `inf`) are not literals and fail the parse.

use thiserror::Error;

use super::CategoryWeights;

#[derive(Debug, Error, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {found:?} at offset {pos}")]
    Unexpected { pos: usize, found: char },
    #[error("invalid number {text:?} at offset {pos}")]
    InvalidNumber { pos: usize, text: String },
    #[error("invalid escape sequence at offset {pos}")]
    InvalidEscape { pos: usize },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    List(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    fn kind(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Num(_) => "number",
            Literal::List(_) => "list",
            Literal::Dict(_) => "dict",
        }
    }
}

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse(input: &str) -> Result<Literal, LiteralError> {
    let mut p = Parser {
        src: input,
        pos: 0,
    };
    let value = p.value()?;
    p.skip_ws();
    match p.peek() {
        None => Ok(value),
        Some(c) => Err(LiteralError::Unexpected { pos: p.pos, found: c }),
    }
}

/// Parse a `{category: weight}` dict literal.
pub fn parse_weights(input: &str) -> Result<CategoryWeights, LiteralError> {
    match parse(input)? {
        Literal::Dict(entries) => {
            let mut weights = CategoryWeights::default();
            for (k, v) in entries {
                let key = match k {
                    Literal::Str(s) => s,
                    other => {
                        return Err(LiteralError::TypeMismatch {
                            expected: "string key",
                            found: other.kind(),
                        })
                    }
                };
                let weight = match v {
                    Literal::Num(n) => n,
                    other => {
                        return Err(LiteralError::TypeMismatch {
                            expected: "number",
                            found: other.kind(),
                        })
                    }
                };
                weights.insert(key, weight);
            }
            Ok(weights)
        }
        other => Err(LiteralError::TypeMismatch {
            expected: "dict",
            found: other.kind(),
        }),
    }
}

/// Parse a list (or tuple) of strings.
pub fn parse_messages(input: &str) -> Result<Vec<String>, LiteralError> {
    match parse(input)? {
        Literal::List(items) => items
            .into_iter()
            .map(|it| match it {
                Literal::Str(s) => Ok(s),
                other => Err(LiteralError::TypeMismatch {
                    expected: "string",
                    found: other.kind(),
                }),
            })
            .collect(),
        other => Err(LiteralError::TypeMismatch {
            expected: "list",
            found: other.kind(),
        }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn expect_any(&mut self) -> Result<char, LiteralError> {
        self.bump().ok_or(LiteralError::UnexpectedEnd)
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('\'') | Some('"') => self.string().map(Literal::Str),
            Some('[') => self.sequence(']').map(Literal::List),
            Some('(') => self.sequence(')').map(Literal::List),
            Some('{') => self.dict().map(Literal::Dict),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.number().map(Literal::Num)
            }
            Some(c) => Err(LiteralError::Unexpected { pos: self.pos, found: c }),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Vec<Literal>, LiteralError> {
        self.bump(); // opening bracket
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.expect_any()? {
                ',' => continue,
                c if c == close => return Ok(items),
                c => {
                    return Err(LiteralError::Unexpected {
                        pos: self.pos - c.len_utf8(),
                        found: c,
                    })
                }
            }
        }
    }

    fn dict(&mut self) -> Result<Vec<(Literal, Literal)>, LiteralError> {
        self.bump(); // '{'
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(entries);
            }
            let key = self.value()?;
            self.skip_ws();
            match self.expect_any()? {
                ':' => {}
                c => {
                    return Err(LiteralError::Unexpected {
                        pos: self.pos - c.len_utf8(),
                        found: c,
                    })
                }
            }
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.expect_any()? {
                ',' => continue,
                '}' => return Ok(entries),
                c => {
                    return Err(LiteralError::Unexpected {
                        pos: self.pos - c.len_utf8(),
                        found: c,
                    })
                }
            }
        }
    }

    fn number(&mut self) -> Result<f64, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        // Python allows `1_000`; Rust's float parser does not.
        text.replace('_', "")
            .parse::<f64>()
            .map_err(|_| LiteralError::InvalidNumber {
                pos: start,
                text: text.to_string(),
            })
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.expect_any()?;
        let mut out = String::new();
        loop {
            let at = self.pos;
            match self.expect_any()? {
                c if c == quote => return Ok(out),
                '\\' => {
                    let esc = self.expect_any()?;
                    match esc {
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'x' => out.push(self.hex_escape(2, at)?),
                        'u' => out.push(self.hex_escape(4, at)?),
                        'U' => out.push(self.hex_escape(8, at)?),
                        _ => return Err(LiteralError::InvalidEscape { pos: at }),
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, at: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or(LiteralError::InvalidEscape { pos: at })?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LiteralError::InvalidEscape { pos: at });
        }
        let code =
            u32::from_str_radix(hex, 16).map_err(|_| LiteralError::InvalidEscape { pos: at })?;
        self.pos = end;
        char::from_u32(code).ok_or(LiteralError::InvalidEscape { pos: at })
    }
}
