//! Part 21 parser: builds flat records from tokens.
//!
//! The parser constructs records without interpreting their semantics. Each
//! record has an ID, a keyword, and a list of parameters. Parameters can be
//! nested (lists within lists).
//!
//! Parsing is best-effort. The input is cut into `;`-terminated statements and
//! every statement is parsed on its own, so a statement that cannot be
//! tokenized or parsed is reported in [`StepFile::malformed`] and the rest of
//! the file is still read.

use std::collections::VecDeque;

use crate::error::StepError;
use crate::lexer::{Lexer, SpannedToken, Token};

/// A single parameter value in a STEP record.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Entity reference (e.g., `#123`).
    Reference(u64),
    /// String literal.
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (e.g., `.T.`).
    Enum(String),
    /// List of values (nested in parentheses).
    List(Vec<Param>),
    /// Derived/computed value (`*`).
    Derived,
    /// Null/unset value (`$`).
    Null,
    /// Typed value `KEYWORD(params)`, also used for the partial entities of
    /// a complex instance.
    Typed {
        /// The type keyword.
        keyword: String,
        /// Parameters.
        params: Vec<Param>,
    },
}

impl Param {
    /// Try to get as an entity reference.
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            Param::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get as a number (reals and integers both qualify).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Param::Real(v) => Some(*v),
            Param::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Param::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an enum.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Param::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a list.
    pub fn as_list(&self) -> Option<&[Param]> {
        match self {
            Param::List(v) => Some(v),
            _ => None,
        }
    }
}

/// A parsed STEP record `#id = KEYWORD(params);`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Instance ID (from `#123`); 0 for header records.
    pub id: u64,
    /// Entity keyword (e.g., `CARTESIAN_POINT`). Empty for complex instances,
    /// whose partial entities are stored as [`Param::Typed`] parameters.
    pub keyword: String,
    /// Parameters to the entity constructor.
    pub params: Vec<Param>,
    /// Line where the record starts (1-indexed).
    pub line: usize,
}


/// The complete parsed content of a STEP file.
#[derive(Debug, Default)]
pub struct StepFile {
    /// Header section records (`FILE_DESCRIPTION`, `FILE_NAME`, `FILE_SCHEMA`).
    pub header: Vec<Record>,
    /// Data section records in file order.
    pub records: Vec<Record>,
    /// One [`StepError::MalformedRecord`] per statement that was skipped.
    pub malformed: Vec<StepError>,
}

impl StepFile {
    /// Schema names declared by `FILE_SCHEMA`, e.g. `AUTOMOTIVE_DESIGN`.
    pub fn schemas(&self) -> Vec<String> {
        self.header
            .iter()
            .filter(|r| r.keyword == "FILE_SCHEMA")
            .filter_map(|r| r.params.first().and_then(Param::as_list))
            .flat_map(|list| list.iter().filter_map(Param::as_string))
            .map(str::to_owned)
            .collect()
    }
}

const SECTION_MARKERS: &[&str] = &["ISO-10303-21", "HEADER", "DATA", "ENDSEC", "END-ISO-10303-21"];

/// One `;`-terminated chunk of source text.
struct Statement<'a> {
    line: usize,
    text: &'a [u8],
}

enum Parsed {
    Section(String),
    Header(Record),
    Data(Record),
}

/// Parser for Part 21 STEP files.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    line: usize,
}

impl Parser {
    /// Parse a STEP file from bytes.
    ///
    /// Never fails: statements that cannot be parsed are collected in
    /// [`StepFile::malformed`].
    pub fn parse(input: &[u8]) -> StepFile {
        let mut file = StepFile::default();
        let mut in_data = false;

        let mut queue: VecDeque<Statement<'_>> = split_statements(input, 1).into();
        while let Some(stmt) = queue.pop_front() {
            match Parser::parse_statement(&stmt) {
                Ok(None) => {}
                Ok(Some(Parsed::Section(name))) => match name.as_str() {
                    "DATA" => in_data = true,
                    "ENDSEC" => in_data = false,
                    _ => {}
                },
                Ok(Some(Parsed::Header(record))) if !in_data => file.header.push(record),
                Ok(Some(Parsed::Header(record))) => {
                    file.malformed.push(StepError::malformed(
                        record.line,
                        format!("{} in DATA section has no instance id", record.keyword),
                    ));
                }
                Ok(Some(Parsed::Data(record))) => file.records.push(record),
                Err(err) => {
                    tracing::debug!(line = stmt.line, error = %err, "skipping malformed statement");
                    file.malformed.push(err);
                    // A missing `;`, a stray quote or an open comment swallows
                    // the records after it. Split again from the next `#id =`
                    // line so each of them is parsed on its own.
                    if let Some(rest) = resync(&stmt) {
                        for recovered in split_statements(rest.text, rest.line).into_iter().rev() {
                            queue.push_front(recovered);
                        }
                    }
                }
            }
        }

        file
    }

    fn parse_statement(stmt: &Statement<'_>) -> Result<Option<Parsed>, StepError> {
        let tokens = Lexer::new(stmt.text)
            .starting_at_line(stmt.line)
            .tokenize()
            .map_err(|err| StepError::malformed(stmt.line, err.to_string()))?;
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            line: stmt.line,
        };
        let parsed = parser.parse_tokens()?;
        if !parser.is_at_end() {
            let tok = parser.peek().map(|t| t.token.clone());
            return Err(parser.error(format!("unexpected trailing token {tok:?}")));
        }
        Ok(Some(parsed))
    }

    fn parse_tokens(&mut self) -> Result<Parsed, StepError> {
        match self.peek().map(|t| t.token.clone()) {
            Some(Token::Keyword(keyword)) => {
                self.advance();
                if SECTION_MARKERS.contains(&keyword.as_str()) && self.is_at_end() {
                    return Ok(Parsed::Section(keyword));
                }
                let params = self.parse_params()?;
                Ok(Parsed::Header(Record {
                    id: 0,
                    keyword,
                    params,
                    line: self.line,
                }))
            }
            Some(Token::EntityRef(id)) => {
                self.advance();
                self.expect_token(&Token::Equals)?;
                let (keyword, params) = match self.peek().map(|t| t.token.clone()) {
                    Some(Token::Keyword(name)) => {
                        self.advance();
                        (name, self.parse_params()?)
                    }
                    Some(Token::LParen) => (String::new(), self.parse_complex()?),
                    other => {
                        return Err(self.error(format!("#{id}: expected type name, got {other:?}")));
                    }
                };
                Ok(Parsed::Data(Record {
                    id,
                    keyword,
                    params,
                    line: self.line,
                }))
            }
            other => Err(self.error(format!("expected entity instance, got {other:?}"))),
        }
    }

    /// `( A(...) B(...) )` as a list of typed partial entities.
    fn parse_complex(&mut self) -> Result<Vec<Param>, StepError> {
        self.expect_token(&Token::LParen)?;
        let mut partials = Vec::new();
        while let Some(Token::Keyword(keyword)) = self.peek().map(|t| t.token.clone()) {
            self.advance();
            let params = self.parse_params()?;
            partials.push(Param::Typed { keyword, params });
        }
        self.expect_token(&Token::RParen)?;
        if partials.is_empty() {
            return Err(self.error("complex instance without partial entities"));
        }
        Ok(partials)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, StepError> {
        self.expect_token(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.check_token(&Token::RParen) {
            params.push(self.parse_value()?);
            while self.check_token(&Token::Comma) {
                self.advance();
                params.push(self.parse_value()?);
            }
        }
        self.expect_token(&Token::RParen)?;
        Ok(params)
    }

    fn parse_value(&mut self) -> Result<Param, StepError> {
        let tok = self.peek().map(|t| t.token.clone());
        let value = match tok {
            Some(Token::EntityRef(id)) => Param::Reference(id),
            Some(Token::String(s)) => Param::String(s),
            Some(Token::Real(v)) => Param::Real(v),
            Some(Token::Integer(v)) => Param::Integer(v),
            Some(Token::Enum(s)) => Param::Enum(s),
            Some(Token::Asterisk) => Param::Derived,
            Some(Token::Dollar) => Param::Null,
            Some(Token::LParen) => return Ok(Param::List(self.parse_params()?)),
            Some(Token::Keyword(keyword)) => {
                // Typed value: KEYWORD(params)
                self.advance();
                let params = self.parse_params()?;
                return Ok(Param::Typed { keyword, params });
            }
            other => return Err(self.error(format!("unexpected value: {other:?}"))),
        };
        self.advance();
        Ok(value)
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check_token(&self, expected: &Token) -> bool {
        self.peek().is_some_and(|t| &t.token == expected)
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), StepError> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            let actual = self.peek().map(|t| t.token.clone());
            Err(self.error(format!("expected {expected:?}, got {actual:?}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> StepError {
        let line = self.peek().map(|t| t.pos.line).unwrap_or(self.line);
        StepError::malformed(line, message)
    }
}

/// Cut the input into `;`-terminated statements, ignoring `;` inside strings
/// and comments. `first_line` is the line number of `input[0]`.
fn split_statements(input: &[u8], first_line: usize) -> Vec<Statement<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut start_line = first_line;
    let mut line = first_line;
    let mut in_string = false;
    let mut in_comment = false;

    let mut i = 0;
    while i < input.len() {
        let ch = input[i];
        if ch == b'\n' {
            line += 1;
        }
        if in_comment {
            if ch == b'*' && input.get(i + 1) == Some(&b'/') {
                in_comment = false;
                i += 2;
                continue;
            }
        } else if in_string {
            // `''` closes and immediately reopens, which is what we want.
            if ch == b'\'' {
                in_string = false;
            }
        } else {
            match ch {
                b'\'' => in_string = true,
                b'/' if input.get(i + 1) == Some(&b'*') => {
                    in_comment = true;
                    i += 2;
                    continue;
                }
                b';' => {
                    out.push(statement(&input[start..i], start_line));
                    start = i + 1;
                    start_line = line;
                }
                _ => {}
            }
        }
        i += 1;
    }

    if input[start..].iter().any(|c| !c.is_ascii_whitespace()) {
        out.push(statement(&input[start..], start_line));
    }
    out
}

fn statement(text: &[u8], mut line: usize) -> Statement<'_> {
    let mut skip = 0;
    for &c in text {
        if !c.is_ascii_whitespace() {
            break;
        }
        if c == b'\n' {
            line += 1;
        }
        skip += 1;
    }
    Statement {
        line,
        text: &text[skip..],
    }
}

/// Find the next line inside a failed statement that starts a new `#id =`
/// instance, and return the rest of the statement from there.
fn resync<'a>(stmt: &Statement<'a>) -> Option<Statement<'a>> {
    let text = stmt.text;
    let mut line = stmt.line;
    for (i, &c) in text.iter().enumerate() {
        if c != b'\n' {
            continue;
        }
        line += 1;
        let rest = statement(&text[i + 1..], line);
        if starts_instance(rest.text) {
            return Some(rest);
        }
    }
    None
}

fn starts_instance(text: &[u8]) -> bool {
    let Some(rest) = text.strip_prefix(b"#") else {
        return false;
    };
    let digits = rest.iter().take_while(|c| c.is_ascii_digit()).count();
    digits > 0
        && rest[digits..]
            .iter()
            .find(|c| !c.is_ascii_whitespace())
            .is_some_and(|&c| c == b'=')
}
