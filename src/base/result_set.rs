use crate::base::{DecodeError, Row, RsState};
use crate::conn::SessionRef;
use crate::protocol::parts::ResultSetMetadata;
use crate::ScnpResult;
use std::sync::Arc;

/// A cursor over the rows of a query.
///
/// Rows the server has not yet delivered are fetched on demand in chunks
/// of the connection's fetch size. Dropping (or closing) the cursor closes
/// the server-side cursor if one is still open.
#[derive(Debug)]
pub struct ResultSet {
    state: RsState,
    session: SessionRef,
}

impl ResultSet {
    pub(crate) fn new(session: SessionRef, state: RsState) -> Self {
        Self { state, session }
    }

    /// The field metadata of the cursor.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ResultSetMetadata> {
        self.state.metadata()
    }

    /// Returns the next row, fetching from the server when the buffered
    /// rows are exhausted; None at the end of the result set.
    pub fn next_row(&mut self) -> ScnpResult<Option<Row>> {
        loop {
            if let Some(row) = self.state.pop_row() {
                return Ok(Some(row));
            }
            if self.state.is_complete() {
                return Ok(None);
            }
            self.state.fetch_next(&self.session)?;
            if !self.state.has_buffered_rows() && self.state.is_complete() {
                return Ok(None);
            }
        }
    }

    /// The decode errors accumulated so far (best-effort cell decoding).
    #[must_use]
    pub fn decode_errors(&self) -> &[DecodeError] {
        self.state.decode_errors()
    }

    /// The server-side id of this result set; 0 after the cursor was
    /// closed.
    #[must_use]
    pub fn resultset_id(&self) -> u64 {
        self.state.resultset_id().unwrap_or(0)
    }

    /// Closes the cursor. Closing is idempotent and best-effort: errors
    /// while closing the server-side cursor are logged, not returned.
    pub fn close(mut self) -> ScnpResult<()> {
        self.state.close();
        Ok(())
    }

    /// Convenience: materializes the remaining rows.
    pub fn into_rows(mut self) -> ScnpResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Convenience for single-value results, e.g. `select count(*)`.
    pub fn into_single_value(mut self) -> ScnpResult<crate::Value<'static>> {
        let mut row = self
            .next_row()?
            .ok_or_else(|| crate::ScnpError::InvalidArgument("result set is empty".to_string()))?;
        row.next_value().ok_or_else(|| {
            crate::ScnpError::InvalidArgument("result set has no columns".to_string())
        })
    }

}

impl Iterator for ResultSet {
    type Item = ScnpResult<Row>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
