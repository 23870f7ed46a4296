use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{SyntaxError, SyntaxErrorKind};

/// Token kinds of the filter language
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(i64),
    Eq,
    Contains,
    In,
    And,
    Or,
    Not,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier '{}'", name),
            Self::Str(_) => f.write_str("string literal"),
            Self::Number(n) => write!(f, "number {}", n),
            Self::Eq => f.write_str("'eq'"),
            Self::Contains => f.write_str("'contains'"),
            Self::In => f.write_str("'in'"),
            Self::And => f.write_str("'and'"),
            Self::Or => f.write_str("'or'"),
            Self::Not => f.write_str("'not'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Comma => f.write_str("','"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub position: usize,
}

/// On-demand tokenizer; the parser pulls one token at a time
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn error(&self, kind: SyntaxErrorKind, position: usize) -> SyntaxError {
        SyntaxError::new(kind, self.source, position)
    }

    /// Produce the next token, or `Eof` once the input is exhausted
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((position, c)) = self.chars.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position: self.source.len(),
            });
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '"' => self.string(position)?,
            '-' | '+' | '0'..='9' => self.number(position, c)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.word(position),
            other => return Err(self.error(SyntaxErrorKind::InvalidCharacter(other), position)),
        };

        Ok(Token { kind, position })
    }

    fn string(&mut self, start: usize) -> Result<TokenKind, SyntaxError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(TokenKind::Str(value)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                Some((_, c)) => value.push(c),
                None => break,
            }
        }
        Err(self.error(SyntaxErrorKind::UnterminatedString, start))
    }

    fn number(&mut self, start: usize, first: char) -> Result<TokenKind, SyntaxError> {
        let mut end = start + first.len_utf8();
        while let Some((i, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
            end = i + c.len_utf8();
        }

        let text = &self.source[start..end];
        // A bare sign fails here as well as an overflowing literal
        text.parse::<i64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(SyntaxErrorKind::InvalidNumber(text.to_string()), start))
    }

    fn word(&mut self, start: usize) -> TokenKind {
        let mut end = start + 1;
        while let Some((i, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        {
            end = i + c.len_utf8();
        }

        match &self.source[start..end] {
            "eq" => TokenKind::Eq,
            "contains" => TokenKind::Contains,
            "in" => TokenKind::In,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            name => TokenKind::Ident(name.to_string()),
        }
    }
}
