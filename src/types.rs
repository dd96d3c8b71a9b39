use std::time::Duration;

use crate::{row_map::RowRef, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub decltype: Option<String>,
}

/// Outcome of one statement within a submitted batch.
#[derive(Clone, Debug, PartialEq)]
pub struct StatementResult {
    pub rows: Vec<Vec<Value>>,
    pub columns: Vec<Column>,
    /// Affected-row summary on success, backend error text on failure.
    pub status: String,
    pub elapsed: Duration,
    pub is_error: bool,
}

impl StatementResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            columns: Vec::new(),
            status: message.into(),
            elapsed: Duration::ZERO,
            is_error: true,
        }
    }

    /// Borrowed view of the first row, if any.
    pub fn first_row(&self) -> Option<RowRef<'_>> {
        self.rows.first().map(|values| RowRef {
            cols: &self.columns,
            values,
        })
    }
}

/// Returns the first errored result in a batch.
pub(crate) fn first_error(results: &[StatementResult]) -> Option<&StatementResult> {
    results.iter().find(|result| result.is_error)
}
