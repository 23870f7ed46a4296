use thiserror::Error;
use tracesync_types::FieldKind;

/// Characters of input shown on each side of an error position
const CONTEXT_SPAN: usize = 40;

/// What went wrong while tokenizing or parsing a filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("list mixes strings and numbers")]
    MixedList,

    #[error("expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// A filter that could not be parsed
///
/// Carries the byte offset of the offending input and a two-line context: the
/// surrounding slice of the filter and a caret under the error position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at column {column}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub position: usize,
    pub column: usize,
    context: String,
}

impl SyntaxError {
    pub(crate) fn new(kind: SyntaxErrorKind, source: &str, position: usize) -> Self {
        let position = position.min(source.len());
        let before: Vec<char> = source[..position].chars().collect();
        let column = before.len() + 1;

        let start = before.len().saturating_sub(CONTEXT_SPAN);
        let prefix: String = before[start..].iter().collect();
        let suffix: String = source[position..]
            .chars()
            .take_while(|c| *c != '\n')
            .take(CONTEXT_SPAN)
            .collect();
        let prefix = match prefix.rfind('\n') {
            Some(newline) => prefix[newline + 1..].to_string(),
            None => prefix,
        };
        let caret = " ".repeat(prefix.chars().count());
        let context = format!("{}{}\n{}^", prefix, suffix, caret);

        Self {
            kind,
            position,
            column,
            context,
        }
    }

    /// Input slice around the error with a caret line underneath
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Errors raised while evaluating or binding a parsed filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unknown identifier {0}")]
    UnknownIdentifier(String),

    #[error("Type mismatch for {identifier}: expected {expected}, found {found}")]
    TypeMismatch {
        identifier: String,
        expected: FieldKind,
        found: FieldKind,
    },
}

/// Any failure while turning filter text into a bound expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_has_caret_under_position() {
        let source = "module eq";
        let err = SyntaxError::new(
            SyntaxErrorKind::UnexpectedEnd {
                expected: "a literal",
            },
            source,
            source.len(),
        );
        assert_eq!(err.column, 10);
        assert_eq!(err.context(), "module eq\n         ^");
    }

    #[test]
    fn test_context_is_clipped() {
        let source = format!("{}$", "a".repeat(100));
        let err = SyntaxError::new(SyntaxErrorKind::InvalidCharacter('$'), &source, 100);
        let lines: Vec<&str> = err.context().lines().collect();
        assert_eq!(lines[0], format!("{}$", "a".repeat(40)));
        assert_eq!(lines[1], format!("{}^", " ".repeat(40)));
    }
}
