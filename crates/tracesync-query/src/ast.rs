//! Typed syntax tree for filter expressions
//!
//! Comparisons always take an identifier on the left and the literal kind the
//! operator expects on the right; the parser cannot build anything else.

use std::fmt;

/// Name of a record field referenced by a filter
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar literal on the right of `eq`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    String(String),
    Number(i64),
}

/// Homogeneous list on the right of `in`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListLiteral {
    Strings(Vec<String>),
    Numbers(Vec<i64>),
}

/// A parsed filter expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Eq(Identifier, Literal),
    Contains(Identifier, String),
    In(Identifier, ListLiteral),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn not(operand: Expr) -> Self {
        Self::Not(Box::new(operand))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Binding strength, used to decide where the printer needs parentheses
    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            Self::Not(_) | Self::Eq(..) | Self::Contains(..) | Self::In(..) => 3,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        let grouped = self.precedence() < min_precedence;
        if grouped {
            f.write_str("(")?;
        }
        match self {
            Self::Eq(ident, Literal::String(s)) => {
                write!(f, "{} eq ", ident)?;
                write_string(f, s)?;
            }
            Self::Eq(ident, Literal::Number(n)) => write!(f, "{} eq {}", ident, n)?,
            Self::Contains(ident, needle) => {
                write!(f, "{} contains ", ident)?;
                write_string(f, needle)?;
            }
            Self::In(ident, list) => {
                write!(f, "{} in [", ident)?;
                match list {
                    ListLiteral::Strings(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write_string(f, item)?;
                        }
                    }
                    ListLiteral::Numbers(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", item)?;
                        }
                    }
                }
                f.write_str("]")?;
            }
            Self::Not(operand) => {
                f.write_str("not ")?;
                operand.write(f, 3)?;
            }
            // Left-associative: only the right operand needs a tighter bound
            Self::And(left, right) => {
                left.write(f, 2)?;
                f.write_str(" and ")?;
                right.write(f, 3)?;
            }
            Self::Or(left, right) => {
                left.write(f, 1)?;
                f.write_str(" or ")?;
                right.write(f, 2)?;
            }
        }
        if grouped {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}
