//! Tokenizer for one Part 21 statement.
//!
//! Reals follow the exchange-structure grammar, so `2.`, `1.E-6` and `-.5` are
//! all accepted. Keywords and enumeration names are uppercased.

use crate::error::StepError;

/// Lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Entity or section keyword, uppercased. May contain `-`.
    Keyword(String),
    /// `#id`.
    EntityRef(u64),
    /// Quoted string with `''` unescaped.
    String(String),
    /// Real literal.
    Real(f64),
    /// Integer literal.
    Integer(i64),
    /// `.NAME.`, stored without dots.
    Enum(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `*`, a derived attribute.
    Asterisk,
    /// `$`, an unset attribute.
    Dollar,
}

/// 1-based line and column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Line.
    pub line: usize,
    /// Column.
    pub col: usize,
}

/// Token plus where it started.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    /// Token.
    pub token: Token,
    /// Start position.
    pub pos: Position,
}

/// Byte-oriented lexer over a statement.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Lexer starting at line 1, column 1.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Start line numbering at `line`, for statements cut out of a file.
    pub fn starting_at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Lex everything that is left.
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, StepError> {
        std::iter::from_fn(|| self.next_token().transpose()).collect()
    }

    /// Next token, or `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<SpannedToken>, StepError> {
        self.skip_blanks()?;

        let pos = self.position();
        let Some(ch) = self.current() else {
            return Ok(None);
        };
        let next = self.lookahead(1);

        let token = match ch {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Equals),
            b'*' => self.single(Token::Asterisk),
            b'$' => self.single(Token::Dollar),
            b'#' => self.entity_ref()?,
            b'\'' => self.string()?,
            b'.' if next.is_some_and(|c| c.is_ascii_digit()) => self.number()?,
            b'.' => self.enumeration()?,
            b'-' | b'+' if next.is_some_and(|c| c.is_ascii_digit() || c == b'.') => {
                self.number()?
            }
            b'0'..=b'9' => self.number()?,
            c if c.is_ascii_alphabetic() || c == b'_' => self.keyword(),
            c => return Err(self.error(pos, format!("unexpected character: '{}'", c as char))),
        };

        Ok(Some(SpannedToken { token, pos }))
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, at: Position, message: impl Into<String>) -> StepError {
        StepError::lexer(at.line, at.col, message)
    }

    fn current(&self) -> Option<u8> {
        self.lookahead(0)
    }

    fn lookahead(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    /// Append bytes to `buf` while `accept` holds.
    fn take_while(&mut self, buf: &mut String, accept: impl Fn(u8) -> bool) {
        while let Some(ch) = self.current().filter(|&c| accept(c)) {
            buf.push(ch as char);
            self.bump();
        }
    }

    fn at_comment_end(&self) -> bool {
        self.current() == Some(b'*') && self.lookahead(1) == Some(b'/')
    }

    fn skip_blanks(&mut self) -> Result<(), StepError> {
        loop {
            while self.current().is_some_and(|c| c.is_ascii_whitespace()) {
                self.bump();
            }
            if self.current() != Some(b'/') || self.lookahead(1) != Some(b'*') {
                return Ok(());
            }
            let start = self.position();
            self.bump();
            self.bump();
            while !self.at_comment_end() {
                if self.bump().is_none() {
                    return Err(self.error(start, "comment is never closed"));
                }
            }
            self.bump();
            self.bump();
        }
    }

    fn entity_ref(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        self.bump();
        let mut digits = String::new();
        self.take_while(&mut digits, |c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.error(start, "'#' not followed by an instance number"));
        }
        digits
            .parse()
            .map(Token::EntityRef)
            .map_err(|_| self.error(start, format!("instance number out of range: #{digits}")))
    }

    fn string(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        self.bump();
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "string literal is never closed")),
                Some(b'\'') if self.current() == Some(b'\'') => {
                    self.bump();
                    bytes.push(b'\'');
                }
                Some(b'\'') => break,
                Some(ch) => bytes.push(ch),
            }
        }
        Ok(Token::String(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn enumeration(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        self.bump();
        let mut name = String::new();
        self.take_while(&mut name, |c| c.is_ascii_alphanumeric() || c == b'_');
        if self.bump() != Some(b'.') {
            return Err(self.error(start, format!("enumeration .{name} is not closed by '.'")));
        }
        if name.is_empty() {
            return Err(self.error(start, "empty enumeration"));
        }
        Ok(Token::Enum(name.to_ascii_uppercase()))
    }

    fn number(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        let mut text = String::new();
        if let Some(sign @ (b'-' | b'+')) = self.current() {
            text.push(sign as char);
            self.bump();
        }
        self.take_while(&mut text, |c| c.is_ascii_digit());

        let mut real = false;
        if self.current() == Some(b'.') {
            real = true;
            text.push('.');
            self.bump();
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }
        if matches!(self.current(), Some(b'E' | b'e')) {
            real = true;
            text.push('E');
            self.bump();
            if let Some(sign @ (b'-' | b'+')) = self.current() {
                text.push(sign as char);
                self.bump();
            }
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }

        let token = if real {
            text.parse().ok().map(Token::Real)
        } else {
            text.parse().ok().map(Token::Integer)
        };
        token.ok_or_else(|| self.error(start, format!("malformed number: {text}")))
    }

    fn keyword(&mut self) -> Token {
        let mut name = String::new();
        self.take_while(&mut name, |c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-');
        Token::Keyword(name.to_ascii_uppercase())
    }
}
