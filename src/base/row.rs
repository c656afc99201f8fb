use crate::protocol::parts::{ResultSetMetadata, Value};
use crate::{ScnpError, ScnpResult};
use std::sync::Arc;

/// One row of a result set.
#[derive(Debug)]
pub struct Row {
    metadata: Arc<ResultSetMetadata>,
    values: Vec<Value<'static>>,
}

impl Row {
    pub(crate) fn new(metadata: Arc<ResultSetMetadata>, values: Vec<Value<'static>>) -> Self {
        Self { metadata, values }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The field metadata of the row's result set.
    #[must_use]
    pub fn metadata(&self) -> &ResultSetMetadata {
        &self.metadata
    }

    /// Borrows the cell at the given position.
    pub fn value(&self, index: usize) -> ScnpResult<&Value<'static>> {
        self.values.get(index).ok_or_else(|| {
            ScnpError::InvalidArgument(format!("row has no column with index {index}"))
        })
    }

    /// Removes and returns the next cell, front to back.
    pub fn next_value(&mut self) -> Option<Value<'static>> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.remove(0))
        }
    }

    /// Consumes the row into its cells.
    #[must_use]
    pub fn into_values(self) -> Vec<Value<'static>> {
        self.values
    }
}

impl IntoIterator for Row {
    type Item = Value<'static>;
    type IntoIter = std::vec::IntoIter<Value<'static>>;
    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for value in &self.values {
            write!(f, "{value}, ")?;
        }
        Ok(())
    }
}
