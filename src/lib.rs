//! Client-side core of SAP HANA's SQL Command Network Protocol.
//!
//! The crate speaks the wire protocol over TCP (optionally TLS): message
//! framing, the authentication handshake, the prepared-statement
//! lifecycle, result-set paging, chunked LOB transport, and the
//! per-connection locking discipline that lets a shared connection be
//! driven by multiple cancellable callers.
//!
//! ```no_run
//! use scnp::{connect, ConnectConfiguration, Credentials, Value};
//!
//! # fn main() -> scnp::ScnpResult<()> {
//! let config = ConnectConfiguration::new(
//!     "hana.example.com",
//!     39013,
//!     Credentials::with_password("ADMIN", "secret"),
//! );
//! let connection = connect(&config)?;
//! connection.execute_direct("create table T (id integer, field double)")?;
//! let statement = connection.prepare("insert into T values (?, ?)")?;
//! statement.execute_batch(vec![
//!     vec![Value::Int(0), Value::Double(0.0)],
//!     vec![Value::Int(1), Value::Double(1.0)],
//! ])?;
//! let count = connection.query_single_value("select count(*) from T")?;
//! assert_eq!(count.try_into_i64()?, 2);
//! # Ok(())
//! # }
//! ```
//!
//! Configuration parsing and pooling live outside of this crate: the
//! entry point consumes a fully-resolved [`ConnectConfiguration`].

#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod base;
mod conn;
mod prepared_statement;
mod protocol;
pub mod rs_cache;
mod scnp_error;
pub mod stats;
mod types;

pub use crate::base::{DecodeError, ResultSet, Row};
pub use crate::conn::{
    connect, Canceller, ClientCertificate, ConnectConfiguration, Connection, CredentialRefresh,
    Credentials, DbConnectAddress, HanaVersion, Isolation, Tls, Transaction,
};
pub use crate::prepared_statement::{CallResult, PreparedStatement};
pub use crate::protocol::parts::{
    ExecutionResult, FieldMetadata, OutputParameters, ParameterBinding, ParameterDescriptor,
    ParameterDescriptors, ParameterDirection, ResultSetMetadata, ServerError, Severity, TypeId,
    Value,
};
pub use crate::protocol::util::Cesu8Handling;
pub use crate::scnp_error::{ExecutionResults, ScnpError, ScnpResult};
pub use crate::stats::{Histogram, Metric, Statistics};
pub use crate::types::{Blob, Clob, DayDate, LongDate, NClob, SecondDate, SecondTime};
