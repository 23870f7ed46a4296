//! Predicate evaluation against record fields
//!
//! `eq` and `in` compare type and value; a string literal never equals an integer
//! field, and that comparison is simply false. `contains` requires a string field
//! and fails otherwise. `and`/`or` short-circuit left to right, so when both sides
//! would fail, which error is reported is unspecified.

use tracesync_types::{FieldKind, FieldSchema, FieldSource, Value};

use crate::ast::{Expr, Identifier, ListLiteral, Literal};
use crate::error::EvalError;

/// Evaluate an expression against a record
pub fn evaluate<S>(expr: &Expr, record: &S) -> Result<bool, EvalError>
where
    S: FieldSource + ?Sized,
{
    match expr {
        Expr::Eq(ident, literal) => Ok(literal_matches(resolve(ident, record)?, literal)),
        Expr::Contains(ident, needle) => match resolve(ident, record)? {
            Value::String(haystack) => Ok(haystack.contains(needle.as_str())),
            other => Err(type_mismatch(ident, FieldKind::String, other.kind())),
        },
        Expr::In(ident, list) => {
            let value = resolve(ident, record)?;
            Ok(match (value, list) {
                (Value::String(s), ListLiteral::Strings(items)) => items.iter().any(|i| i == s),
                (Value::Integer(n), ListLiteral::Numbers(items)) => items.contains(&n),
                _ => false,
            })
        }
        Expr::Not(operand) => Ok(!evaluate(operand, record)?),
        Expr::And(left, right) => Ok(evaluate(left, record)? && evaluate(right, record)?),
        Expr::Or(left, right) => Ok(evaluate(left, record)? || evaluate(right, record)?),
    }
}

/// Check every identifier against a record schema without evaluating anything
///
/// Catches errors that short-circuiting could hide from a single sample record.
pub fn bind<S: FieldSchema>(expr: &Expr) -> Result<(), EvalError> {
    match expr {
        Expr::Eq(ident, _) | Expr::In(ident, _) => kind_of::<S>(ident).map(|_| ()),
        Expr::Contains(ident, _) => match kind_of::<S>(ident)? {
            FieldKind::String => Ok(()),
            found => Err(type_mismatch(ident, FieldKind::String, found)),
        },
        Expr::Not(operand) => bind::<S>(operand),
        Expr::And(left, right) | Expr::Or(left, right) => {
            bind::<S>(left)?;
            bind::<S>(right)
        }
    }
}

fn resolve<'r, S>(ident: &Identifier, record: &'r S) -> Result<Value<'r>, EvalError>
where
    S: FieldSource + ?Sized,
{
    record
        .field(ident.as_str())
        .ok_or_else(|| EvalError::UnknownIdentifier(ident.to_string()))
}

fn kind_of<S: FieldSchema>(ident: &Identifier) -> Result<FieldKind, EvalError> {
    S::field_kind(ident.as_str()).ok_or_else(|| EvalError::UnknownIdentifier(ident.to_string()))
}

fn literal_matches(value: Value<'_>, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::String(s), Literal::String(expected)) => s == expected,
        (Value::Integer(n), Literal::Number(expected)) => n == *expected,
        _ => false,
    }
}

fn type_mismatch(ident: &Identifier, expected: FieldKind, found: FieldKind) -> EvalError {
    EvalError::TypeMismatch {
        identifier: ident.to_string(),
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use tracesync_types::Record;

    fn eval(source: &str, record: &Record) -> Result<bool, EvalError> {
        evaluate(&parse(source).unwrap(), record)
    }

    fn record() -> Record {
        Record::new("3", "1", 1, "a foo b")
    }

    #[test]
    fn test_eq_type_mismatch_is_false() {
        assert_eq!(eval("module eq 1", &record()), Ok(false));
        assert_eq!(eval(r#"module eq "1""#, &record()), Ok(true));
        assert_eq!(eval("timestamp eq 1", &record()), Ok(true));
        assert_eq!(eval(r#"timestamp eq "1""#, &record()), Ok(false));
    }

    #[test]
    fn test_contains() {
        assert_eq!(eval(r#"message contains "foo""#, &record()), Ok(true));
        let bar = Record::new("3", "1", 1, "bar");
        assert_eq!(eval(r#"message contains "foo""#, &bar), Ok(false));
    }

    #[test]
    fn test_contains_on_integer_fails() {
        assert_eq!(
            eval(r#"timestamp contains "1""#, &record()),
            Err(EvalError::TypeMismatch {
                identifier: "timestamp".to_string(),
                expected: FieldKind::String,
                found: FieldKind::Integer,
            })
        );
    }

    #[test]
    fn test_in() {
        assert_eq!(eval(r#"task_id in ["2", "3"]"#, &record()), Ok(true));
        let nine = Record::new("9", "1", 1, "");
        assert_eq!(eval(r#"task_id in ["2", "3"]"#, &nine), Ok(false));
        assert_eq!(eval("task_id in [3]", &record()), Ok(false));
        assert_eq!(eval("timestamp in [0, 1]", &record()), Ok(true));
        assert_eq!(eval("timestamp in []", &record()), Ok(false));
    }

    #[test]
    fn test_logic() {
        let r = record();
        assert_eq!(eval(r#"not (module eq "x") and task_id in ["3"]"#, &r), Ok(true));
        assert_eq!(eval(r#"not module eq "1""#, &r), Ok(false));
        assert_eq!(eval(r#"module eq "x" or timestamp eq 1"#, &r), Ok(true));
        assert_eq!(eval(r#"module eq "1" timestamp eq 2"#, &r), Ok(false));
    }

    #[test]
    fn test_unknown_identifier() {
        assert_eq!(
            eval("bogus eq 1", &record()),
            Err(EvalError::UnknownIdentifier("bogus".to_string()))
        );
        assert_eq!(
            eval("not bogus in [1]", &record()),
            Err(EvalError::UnknownIdentifier("bogus".to_string()))
        );
    }

    #[test]
    fn test_short_circuit_hides_errors_from_evaluate_but_not_bind() {
        let expr = parse(r#"module eq "1" or timestamp contains "x""#).unwrap();
        assert_eq!(evaluate(&expr, &record()), Ok(true));
        assert!(matches!(
            bind::<Record>(&expr),
            Err(EvalError::TypeMismatch { .. })
        ));

        let expr = parse(r#"module eq "2" and nope eq 1"#).unwrap();
        assert_eq!(evaluate(&expr, &record()), Ok(false));
        assert_eq!(
            bind::<Record>(&expr),
            Err(EvalError::UnknownIdentifier("nope".to_string()))
        );
    }

    #[test]
    fn test_map_source() {
        use std::collections::HashMap;

        let mut fields: HashMap<&str, Value<'_>> = HashMap::new();
        fields.insert("level", Value::String("warn"));
        fields.insert("line", Value::Integer(12));
        let expr = parse(r#"level in ["warn", "error"] and line eq 12"#).unwrap();
        assert_eq!(evaluate(&expr, &fields), Ok(true));
    }
}
