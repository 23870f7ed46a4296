use thiserror::Error;
use tracesync_query::{EvalError, FilterError, SyntaxError};

/// Misuse of the store or the time index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Index {index} out of range for {len} rows")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No records to search")]
    EmptyStore,

    #[error("Trace store has been dropped")]
    Closed,
}

/// Why a filter was not installed on a view
///
/// The previously active filter stays in place whenever this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterInstallError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("No records yet to validate the filter against")]
    NoSampleRecord,
}

impl From<FilterError> for FilterInstallError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Syntax(e) => Self::Syntax(e),
            FilterError::Eval(e) => Self::Eval(e),
        }
    }
}
