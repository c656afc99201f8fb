//! Connection handling: transport, session state, authentication, and
//! the public connection surface.

pub(crate) mod authentication;
mod configuration;
mod connection;
mod initial_request;
mod keep_alive;
mod session_core;
pub(crate) mod session_ref;
mod tcp_client;
mod version;

pub use self::configuration::{
    ClientCertificate, ConnectConfiguration, CredentialRefresh, Credentials, Tls,
};
pub use self::connection::{connect, Connection, DbConnectAddress, Isolation, Transaction};
pub use self::session_ref::Canceller;
pub use self::version::HanaVersion;

pub(crate) use self::session_core::SessionCore;
pub(crate) use self::session_ref::SessionRef;
pub(crate) use self::tcp_client::TcpClient;
