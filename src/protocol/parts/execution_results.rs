use crate::protocol::parts::ServerError;
use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt};

/// Outcome of one executed statement or one row of a DML batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Number of rows affected by a successful execution.
    RowsAffected(usize),
    /// Successful execution without a determinable row count (-2).
    SuccessNoInfo,
    /// Execution failed (-3); the linked server error, if the reply
    /// carried one for this row.
    Failure(Option<ServerError>),
}

impl ExecutionResult {
    pub(crate) fn parse(count: usize, rdr: &mut dyn std::io::Read) -> ScnpResult<Vec<Self>> {
        let mut vec = Vec::with_capacity(count);
        for _ in 0..count {
            vec.push(match rdr.read_i32::<LittleEndian>()? {
                -2 => Self::SuccessNoInfo,
                -3 => Self::Failure(None),
                #[allow(clippy::cast_sign_loss)]
                i => Self::RowsAffected(i.max(0) as usize),
            });
        }
        Ok(vec)
    }

    /// True if this is a `Failure`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Total of the affected-rows counts, treating `SuccessNoInfo` as 0.
    #[must_use]
    pub fn count(results: &[Self]) -> usize {
        results
            .iter()
            .map(|r| match r {
                Self::RowsAffected(n) => *n,
                _ => 0,
            })
            .sum()
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Self::RowsAffected(count) => writeln!(f, "number of affected rows: {count}"),
            Self::SuccessNoInfo => {
                writeln!(f, "successfully executed, but affected rows cannot be determined")
            }
            Self::Failure(Some(ref server_error)) => {
                writeln!(f, "execution failed with {server_error}")
            }
            Self::Failure(None) => writeln!(f, "execution failed"),
        }
    }
}
