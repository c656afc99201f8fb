use crate::protocol::parts::{ExecutionResult, ServerError};
use thiserror::Error;

/// The error categories that operations of this crate can produce.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScnpError {
    /// The connection is broken and was permanently retired.
    ///
    /// Every I/O failure, every protocol inconsistency detected while
    /// decoding a reply, and every operation after a cancellation ends up
    /// here. The connection must not be used any further.
    #[error("connection is broken")]
    BadConnection {
        /// The causing error, if one was captured.
        source: Option<Box<ScnpError>>,
    },

    /// The operation was interrupted through its `Canceller`.
    #[error("operation was cancelled")]
    Cancelled,

    /// The server rejected the authentication attempt.
    #[error("authentication with method {method} failed")]
    AuthFailed {
        /// Wire name of the method that the server had selected.
        method: String,
        /// The causing error.
        source: Box<ScnpError>,
    },

    /// The requested transaction isolation level is not supported.
    #[error("unsupported transaction isolation level")]
    UnsupportedIsolationLevel,

    /// `begin` was called while a transaction is already open.
    #[error("nested transactions are not supported")]
    NestedTransaction,

    /// A statement was issued while a query result set is still open
    /// on the same connection.
    #[error("connection is busy with an open query")]
    NestedQuery,

    /// The server reported an SQL error.
    #[error("server responded with an error")]
    Server {
        /// The server-reported error.
        #[from]
        source: ServerError,
    },

    /// At least one row of a DML batch failed; each failure is linked to
    /// the server error that was reported for it.
    #[error("server responded with at least one error:\n{0}")]
    Execution(ExecutionResults),

    /// Misuse of the caller-facing API (wrong argument count, wrong
    /// argument type for a parameter, ...). The connection stays valid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server sent bytes that are not valid CESU-8 and the configured
    /// text handling is strict.
    #[error("text field contains invalid CESU-8")]
    Cesu8,

    /// A reply could not be decoded consistently.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The DECIMAL wire representation carried a reserved bit pattern
    /// (NaN or infinity), which this crate does not support.
    #[error("decimal format not supported")]
    DecimalFormat,

    /// A lock was poisoned by a panicking thread.
    #[error("thread synchronization failed")]
    Poison,

    /// TLS setup failed because the server name was not valid.
    #[error("TLS setup failed because the server name was not valid")]
    TlsInvalidDnsName {
        #[from]
        source: rustls::pki_types::InvalidDnsNameError,
    },

    /// TLS protocol error after the TCP connection was established.
    #[error("TLS handshake failed; is the server prepared for TLS?")]
    TlsProtocol {
        #[from]
        source: rustls::Error,
    },

    /// Communication with the server failed.
    #[error(transparent)]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Abbreviation of `Result<T, ScnpError>`.
pub type ScnpResult<T> = std::result::Result<T, ScnpError>;

/// The execution results of a DML batch, with failed rows linked to their
/// server errors by position.
#[derive(Debug)]
pub struct ExecutionResults(pub Vec<ExecutionResult>);

impl std::fmt::Display for ExecutionResults {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for execution_result in &self.0 {
            write!(f, "{execution_result}")?;
        }
        Ok(())
    }
}

impl ScnpError {
    /// Returns the contained `ServerError`, if any.
    ///
    /// Gives programmatic access to the error code, e.g. for branching on
    /// code 259 (invalid table name).
    #[must_use]
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Self::Server { source } => Some(source),
            _ => None,
        }
    }

    /// True if the connection was retired by this error.
    #[must_use]
    pub fn is_bad_connection(&self) -> bool {
        matches!(self, Self::BadConnection { .. })
    }

    pub(crate) fn bad_connection(source: ScnpError) -> Self {
        Self::BadConnection {
            source: Some(Box::new(source)),
        }
    }
}

impl<G> From<std::sync::PoisonError<G>> for ScnpError {
    fn from(_error: std::sync::PoisonError<G>) -> Self {
        Self::Poison
    }
}

// Protocol inconsistencies are frequent construction sites; the macro keeps
// the call sites as terse as in format!().
macro_rules! prot_err {
    ($($arg:tt)*) => {
        $crate::ScnpError::Protocol(format!($($arg)*))
    };
}
pub(crate) use prot_err;
