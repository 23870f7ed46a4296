use std::sync::Arc;

use tracesync_query::{EvalError, Expr, FilterError, bind, evaluate, parse};
use tracesync_types::Record;

/// Filter expression parsed and bound against the record schema
#[derive(Clone)]
pub struct CompiledFilter {
    /// Parsed expression tree
    expr: Arc<Expr>,

    /// Original filter text
    source: String,
}

impl CompiledFilter {
    /// Parse `source` and check its identifiers and operand kinds
    pub fn compile(source: &str) -> Result<Self, FilterError> {
        let expr = parse(source)?;
        bind::<Record>(&expr)?;
        Ok(Self {
            expr: Arc::new(expr),
            source: source.to_string(),
        })
    }

    /// Check if a record passes this filter
    pub fn matches(&self, record: &Record) -> Result<bool, EvalError> {
        evaluate(&self.expr, record)
    }

    /// Evaluate once against a sample record, discarding the outcome
    pub fn validate(&self, sample: &Record) -> Result<(), EvalError> {
        self.matches(sample).map(|_| ())
    }

    /// Get the original filter text
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("source", &self.source)
            .field("expr", &self.expr.to_string())
            .finish()
    }
}
