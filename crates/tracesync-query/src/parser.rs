//! Recursive-descent parser for filter expressions
//!
//! The grammar is LL(1): every decision is made on the current token alone, tokens
//! are pulled from the lexer as they are consumed, and the first error aborts.
//!
//! ```text
//! filter     := or_expr or_expr*
//! or_expr    := and_expr ( "or" and_expr )*
//! and_expr   := unary ( "and" unary )*
//! unary      := "not" unary | comparison | "(" or_expr ")"
//! comparison := IDENT "eq" literal | IDENT "contains" STRING | IDENT "in" list
//! ```
//!
//! Consecutive top-level expressions are conjoined, binding looser than `or`.
//! Trees taller than [`MAX_DEPTH`] are rejected so the recursive walks over
//! them stay within the stack.

use crate::ast::{Expr, Identifier, ListLiteral, Literal};
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};

/// Deepest expression tree or `not`/parenthesis nesting a filter may have
pub const MAX_DEPTH: usize = 256;

/// Parse filter text into an expression tree
pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    Parser::new(source)?.filter()
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,

    /// Open `not` operators and parentheses around the current token
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            source,
            lexer,
            current,
            nesting: 0,
        })
    }

    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &'static str) -> SyntaxError {
        let kind = match &self.current.kind {
            TokenKind::Eof => SyntaxErrorKind::UnexpectedEnd { expected },
            found => SyntaxErrorKind::UnexpectedToken {
                found: found.to_string(),
                expected,
            },
        };
        SyntaxError::new(kind, self.source, self.current.position)
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), SyntaxError> {
        if self.current.kind != kind {
            return Err(self.unexpected(expected));
        }
        self.advance()
    }

    fn starts_unary(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Ident(_) | TokenKind::Not | TokenKind::LParen
        )
    }

    /// Reject trees taller than [`MAX_DEPTH`]
    fn bounded(&self, height: usize) -> Result<usize, SyntaxError> {
        if height > MAX_DEPTH {
            return Err(SyntaxError::new(
                SyntaxErrorKind::TooDeep { limit: MAX_DEPTH },
                self.source,
                self.current.position,
            ));
        }
        Ok(height)
    }

    /// Count one more `not` or `(` before recursing into it
    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.nesting = self.bounded(self.nesting + 1)?;
        Ok(())
    }

    fn filter(&mut self) -> Result<Expr, SyntaxError> {
        let (mut expr, mut height) = self.or_expr()?;
        while self.starts_unary() {
            let (next, next_height) = self.or_expr()?;
            height = self.bounded(height.max(next_height) + 1)?;
            expr = Expr::and(expr, next);
        }

        if self.current.kind != TokenKind::Eof {
            return Err(self.unexpected("'and', 'or' or end of input"));
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<(Expr, usize), SyntaxError> {
        let (mut left, mut height) = self.and_expr()?;
        while self.current.kind == TokenKind::Or {
            self.advance()?;
            let (right, right_height) = self.and_expr()?;
            height = self.bounded(height.max(right_height) + 1)?;
            left = Expr::or(left, right);
        }
        Ok((left, height))
    }

    fn and_expr(&mut self) -> Result<(Expr, usize), SyntaxError> {
        let (mut left, mut height) = self.unary()?;
        while self.current.kind == TokenKind::And {
            self.advance()?;
            let (right, right_height) = self.unary()?;
            height = self.bounded(height.max(right_height) + 1)?;
            left = Expr::and(left, right);
        }
        Ok((left, height))
    }

    fn unary(&mut self) -> Result<(Expr, usize), SyntaxError> {
        match self.current.kind {
            TokenKind::Not => {
                self.enter()?;
                self.advance()?;
                let (operand, height) = self.unary()?;
                self.nesting -= 1;
                Ok((Expr::not(operand), self.bounded(height + 1)?))
            }
            TokenKind::LParen => {
                self.enter()?;
                self.advance()?;
                let inner = self.or_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                self.nesting -= 1;
                Ok(inner)
            }
            TokenKind::Ident(_) => Ok((self.comparison()?, 1)),
            _ => Err(self.unexpected("an identifier, 'not' or '('")),
        }
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let ident = self.identifier()?;
        match self.current.kind {
            TokenKind::Eq => {
                self.advance()?;
                Ok(Expr::Eq(ident, self.literal()?))
            }
            TokenKind::Contains => {
                self.advance()?;
                Ok(Expr::Contains(ident, self.string("a string literal")?))
            }
            TokenKind::In => {
                self.advance()?;
                Ok(Expr::In(ident, self.list()?))
            }
            _ => Err(self.unexpected("'eq', 'contains' or 'in'")),
        }
    }

    fn identifier(&mut self) -> Result<Identifier, SyntaxError> {
        let TokenKind::Ident(name) = &self.current.kind else {
            return Err(self.unexpected("an identifier"));
        };
        let ident = Identifier(name.clone());
        self.advance()?;
        Ok(ident)
    }

    fn string(&mut self, expected: &'static str) -> Result<String, SyntaxError> {
        let TokenKind::Str(value) = &self.current.kind else {
            return Err(self.unexpected(expected));
        };
        let value = value.clone();
        self.advance()?;
        Ok(value)
    }

    fn number(&mut self, expected: &'static str) -> Result<i64, SyntaxError> {
        let TokenKind::Number(value) = self.current.kind else {
            return Err(self.unexpected(expected));
        };
        self.advance()?;
        Ok(value)
    }

    fn literal(&mut self) -> Result<Literal, SyntaxError> {
        match self.current.kind {
            TokenKind::Str(_) => Ok(Literal::String(self.string("a string literal")?)),
            TokenKind::Number(_) => Ok(Literal::Number(self.number("a number literal")?)),
            _ => Err(self.unexpected("a string or number literal")),
        }
    }

    fn list(&mut self) -> Result<ListLiteral, SyntaxError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let list = match self.current.kind {
            TokenKind::RBracket => ListLiteral::Strings(Vec::new()),
            TokenKind::Str(_) => {
                let mut items = vec![self.string("a string literal")?];
                while self.list_continues()? {
                    if matches!(self.current.kind, TokenKind::Number(_)) {
                        return Err(self.mixed_list());
                    }
                    items.push(self.string("a string literal")?);
                }
                ListLiteral::Strings(items)
            }
            TokenKind::Number(_) => {
                let mut items = vec![self.number("a number literal")?];
                while self.list_continues()? {
                    if matches!(self.current.kind, TokenKind::Str(_)) {
                        return Err(self.mixed_list());
                    }
                    items.push(self.number("a number literal")?);
                }
                ListLiteral::Numbers(items)
            }
            _ => return Err(self.unexpected("a literal or ']'")),
        };
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(list)
    }

    /// Consume a separating comma; `false` when the list is about to close
    fn list_continues(&mut self) -> Result<bool, SyntaxError> {
        match self.current.kind {
            TokenKind::Comma => {
                self.advance()?;
                Ok(true)
            }
            TokenKind::RBracket => Ok(false),
            _ => Err(self.unexpected("',' or ']'")),
        }
    }

    fn mixed_list(&self) -> SyntaxError {
        SyntaxError::new(SyntaxErrorKind::MixedList, self.source, self.current.position)
    }
}
