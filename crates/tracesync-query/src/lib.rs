//! Filter query language for tracesync
//!
//! This crate turns filter text such as
//! `not (module eq "net") and task_id in ["2", "3"]` into a typed expression tree,
//! binds it against a record schema, and evaluates it against records.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::{Expr, Identifier, ListLiteral, Literal};
pub use error::{EvalError, FilterError, SyntaxError, SyntaxErrorKind};
pub use eval::{bind, evaluate};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse;

// Re-export types used in our public API
pub use tracesync_types::{FieldKind, FieldSchema, FieldSource, Value};
