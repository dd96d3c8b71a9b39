//! Row access helpers over a [`StatementResult`](crate::StatementResult).

use crate::{Column, Value};

/// Lightweight row view for name- and position-based access.
#[derive(Debug)]
pub struct RowRef<'a> {
    /// Result columns aligned with `values`.
    pub cols: &'a [Column],
    /// Row values aligned with `cols`.
    pub values: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Returns a value by case-insensitive column name.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let idx = self
            .cols
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(name))?;
        self.values.get(idx)
    }

    /// Returns a text value by column position.
    pub fn text_at(&self, index: usize) -> Option<&'a str> {
        self.values.get(index)?.as_text()
    }

    /// Returns a text value by column name.
    pub fn get_text(&self, name: &str) -> Option<&'a str> {
        self.get(name)?.as_text()
    }
}
