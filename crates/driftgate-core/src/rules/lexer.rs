//! Token stream over the restricted rule grammar.
//!
//! Byte-wise scanner. Anything outside the whitelist is rejected here with
//! a [`RuleError::Disallowed`] naming the construct, so forbidden syntax
//! never reaches the parser.

use super::RuleError;

/// Token kinds of the closed grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    And,
    Or,
    Not,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Eof,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn next_token(&mut self) -> Result<Tok, RuleError> {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
        let Some(ch) = self.peek() else {
            return Ok(Tok::Eof);
        };

        match ch {
            b'0'..=b'9' => self.lex_number(),
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.lex_number(),
            b'\'' | b'"' => self.lex_string(ch),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Ok(self.lex_ident()),
            b'+' => {
                self.pos += 1;
                Ok(Tok::Plus)
            }
            b'-' => {
                self.pos += 1;
                Ok(Tok::Minus)
            }
            b'*' => {
                if self.peek_at(1) == Some(b'*') {
                    return Err(RuleError::Disallowed("power operator".into()));
                }
                self.pos += 1;
                Ok(Tok::Star)
            }
            b'/' => {
                if self.peek_at(1) == Some(b'/') {
                    return Err(RuleError::Disallowed("floor division".into()));
                }
                self.pos += 1;
                Ok(Tok::Slash)
            }
            b'%' => {
                self.pos += 1;
                Ok(Tok::Percent)
            }
            b'(' => {
                self.pos += 1;
                Ok(Tok::LParen)
            }
            b')' => {
                self.pos += 1;
                Ok(Tok::RParen)
            }
            b'=' => {
                if self.peek_at(1) == Some(b'=') {
                    self.pos += 2;
                    Ok(Tok::EqEq)
                } else {
                    Err(RuleError::Disallowed("assignment".into()))
                }
            }
            b'!' => {
                if self.peek_at(1) == Some(b'=') {
                    self.pos += 2;
                    Ok(Tok::Ne)
                } else {
                    Err(RuleError::Disallowed("operator '!'".into()))
                }
            }
            b'<' => {
                if self.peek_at(1) == Some(b'=') {
                    self.pos += 2;
                    Ok(Tok::Le)
                } else {
                    self.pos += 1;
                    Ok(Tok::Lt)
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'=') {
                    self.pos += 2;
                    Ok(Tok::Ge)
                } else {
                    self.pos += 1;
                    Ok(Tok::Gt)
                }
            }
            b'.' => Err(RuleError::Disallowed("attribute access".into())),
            b'[' | b']' => Err(RuleError::Disallowed("subscript".into())),
            b',' => Err(RuleError::Disallowed("argument list".into())),
            other => Err(RuleError::Disallowed(format!(
                "character {:?}",
                other as char
            ))),
        }
    }

    fn lex_number(&mut self) -> Result<Tok, RuleError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9') | None) {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                ahead = 2;
            }
            if matches!(self.peek_at(ahead), Some(b'0'..=b'9')) {
                self.pos += ahead;
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
        text.parse::<f64>()
            .map(Tok::Num)
            .map_err(|_| RuleError::Parse(format!("invalid number {text:?}")))
    }

    fn lex_string(&mut self, quote: u8) -> Result<Tok, RuleError> {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                self.pos += 1;
                return Ok(Tok::Str(text));
            }
            self.pos += 1;
        }
        Err(RuleError::Parse("unterminated string literal".into()))
    }

    fn lex_ident(&mut self) -> Tok {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
        ) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        match text.as_str() {
            "and" => Tok::And,
            "or" => Tok::Or,
            "not" => Tok::Not,
            _ => Tok::Ident(text),
        }
    }
}

/// Tokenize an expression, rejecting disallowed constructs outright.
pub fn tokenize(source: &str) -> Result<Vec<Tok>, RuleError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let is_eof = tok == Tok::Eof;
        tokens.push(tok);
        if is_eof {
            return Ok(tokens);
        }
    }
}
