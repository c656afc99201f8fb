/// A per-cell decoding failure.
///
/// Result-set decoding is best-effort: a cell whose bytes were read but
/// could not be turned into a [`Value`](crate::Value) is delivered as NULL,
/// and the failure is recorded on the cursor instead of ending the fetch.
#[derive(Clone, Debug)]
pub struct DecodeError {
    row: usize,
    column: usize,
    column_name: String,
    reason: String,
}

impl DecodeError {
    pub(crate) fn new(row: usize, column: usize, column_name: String, reason: String) -> Self {
        Self {
            row,
            column,
            column_name,
            reason,
        }
    }

    /// Zero-based row number, counted over the whole cursor.
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Zero-based column number.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Display name of the affected column.
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Why the cell could not be decoded.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "cell ({}, {}) of column {} could not be decoded: {}",
            self.row, self.column, self.column_name, self.reason
        )
    }
}
