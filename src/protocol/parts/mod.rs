//! The typed payload units that compose a segment.

mod auth_fields;
mod client_context;
mod client_info;
mod connect_options;
mod db_connect_info;
mod execution_results;
mod field_metadata;
pub(crate) mod length_indicator;
mod lob_flags;
pub(crate) mod option_part;
pub(crate) mod option_value;
mod output_parameters;
mod parameter_descriptor;
mod parameter_rows;
mod read_lob_reply;
mod read_lob_request;
pub(crate) mod resultset;
mod server_error;
mod statement_context;
mod transaction_flags;
mod type_id;
mod value;
mod write_lob_reply;
mod write_lob_request;

pub(crate) use self::auth_fields::AuthFields;
pub(crate) use self::client_context::ClientContext;
pub(crate) use self::client_info::ClientInfo;
pub(crate) use self::connect_options::{
    ConnOptId, ConnectOptions, ConnectOptionsPart, REQUESTED_DATA_FORMAT_VERSION,
};
pub(crate) use self::db_connect_info::DbConnectInfo;
pub(crate) use self::lob_flags::LobFlags;
pub(crate) use self::parameter_rows::ParameterRows;
pub(crate) use self::read_lob_reply::ReadLobReply;
pub(crate) use self::read_lob_request::ReadLobRequest;
pub(crate) use self::server_error::CODE_AUTHENTICATION_FAILED;
pub(crate) use self::statement_context::StatementContext;
pub(crate) use self::transaction_flags::TransactionFlags;
pub(crate) use self::write_lob_reply::WriteLobReply;
pub(crate) use self::write_lob_request::WriteLobRequest;

pub use self::execution_results::ExecutionResult;
pub use self::field_metadata::{FieldMetadata, ResultSetMetadata};
pub use self::output_parameters::OutputParameters;
pub use self::parameter_descriptor::{
    ParameterBinding, ParameterDescriptor, ParameterDescriptors, ParameterDirection,
};
pub use self::server_error::{ServerError, Severity};
pub use self::type_id::TypeId;
pub use self::value::Value;
