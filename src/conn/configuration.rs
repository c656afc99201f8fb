//! The fully-resolved connection configuration.
//!
//! This crate does not parse DSNs or URLs; the caller hands over a ready
//! `ConnectConfiguration` value.

use crate::protocol::util::Cesu8Handling;
use debug_ignore::DebugIgnore;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use secstr::SecUtf8;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DEFAULT_FETCH_SIZE: u32 = 100_000;
pub(crate) const DEFAULT_LOB_READ_LENGTH: u32 = 200_000;
pub(crate) const DEFAULT_LOB_WRITE_LENGTH: usize = 200_000;

/// Whether and how TLS is used for the connection.
#[derive(Clone, Debug, Default)]
pub enum Tls {
    /// Plain TCP.
    #[default]
    Off,
    /// TLS with server validation against the Mozilla root store.
    Secure,
    /// TLS with server validation against the given root certificates
    /// (DER).
    SecureWithRoots(Vec<Vec<u8>>),
    /// TLS without server validation. Dangerous, test setups only.
    Insecure,
}

/// Client certificate and key for the X509 authentication method (DER).
#[derive(Clone)]
pub struct ClientCertificate {
    /// The certificate chain, leaf first.
    pub chain: Vec<CertificateDer<'static>>,
    /// The private key matching the leaf certificate.
    pub key: Arc<PrivateKeyDer<'static>>,
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ClientCertificate {{ {} certificate(s) }}", self.chain.len())
    }
}

/// The credentials the connection may authenticate with.
///
/// Every credential that is present is offered to the server, in the
/// fixed priority order session cookie, X.509, JWT, SCRAM-PBKDF2-SHA256,
/// SCRAM-SHA256; the server picks one.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    /// The database user to log on as. May stay empty for X.509 and JWT,
    /// where the server derives the user.
    pub database_user: String,
    /// Password for the SCRAM methods.
    pub password: Option<DebugIgnore<SecUtf8>>,
    /// Token for the JWT method.
    pub jwt_token: Option<DebugIgnore<String>>,
    /// An opaque session cookie obtained from an earlier connection.
    pub session_cookie: Option<DebugIgnore<Vec<u8>>>,
    /// Client certificate for the X509 method.
    pub client_certificate: Option<ClientCertificate>,
}

impl Credentials {
    /// Credentials for password logon.
    #[must_use]
    pub fn with_password(database_user: &str, password: &str) -> Self {
        Self {
            database_user: database_user.to_string(),
            password: Some(DebugIgnore(SecUtf8::from(password))),
            ..Self::default()
        }
    }
}

/// Replacements for expired credentials.
///
/// When authentication fails, the matching callback (if any) is invoked
/// and the connect is retried once with the refreshed credential. A
/// single-flight discipline guarantees that concurrent failing connects
/// trigger at most one refresh; the other attempts reuse the result.
#[derive(Clone, Default)]
pub struct CredentialRefresh {
    /// Provides a new password.
    pub password: Option<Arc<dyn Fn() -> Option<String> + Send + Sync>>,
    /// Provides a new JWT token.
    pub token: Option<Arc<dyn Fn() -> Option<String> + Send + Sync>>,
    /// Provides a new client certificate.
    pub certificate: Option<Arc<dyn Fn() -> Option<ClientCertificate> + Send + Sync>>,
}

impl std::fmt::Debug for CredentialRefresh {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "CredentialRefresh {{ password: {}, token: {}, certificate: {} }}",
            self.password.is_some(),
            self.token.is_some(),
            self.certificate.is_some()
        )
    }
}

/// Everything needed to open a connection.
#[derive(Clone, Debug)]
pub struct ConnectConfiguration {
    /// Host name or address of the server.
    pub host: String,
    /// Port of the SQL interface.
    pub port: u16,
    /// TLS mode.
    pub tls: Tls,
    /// The credentials to offer.
    pub credentials: Credentials,
    /// Credential refresh callbacks.
    pub credential_refresh: CredentialRefresh,
    /// Client locale reported to the server, e.g. `en_US`.
    pub client_locale: Option<String>,
    /// Application name reported in the client context.
    pub application_name: String,
    /// Rows per server-side fetch.
    pub fetch_size: u32,
    /// Bytes (characters for NCLOB) per LOB read chunk.
    pub lob_read_length: u32,
    /// Bytes per LOB write chunk.
    pub lob_write_length: usize,
    /// Deadline applied to every socket read and write.
    pub io_timeout: Option<Duration>,
    /// Interval of the background keep-alive pinger; None disables it.
    pub keep_alive_interval: Option<Duration>,
    /// Handling of malformed CESU-8 coming from the server.
    pub cesu8_handling: Cesu8Handling,
    /// Surface stored-procedure table outputs as cached references
    /// instead of inline cursors (legacy mode).
    pub legacy_table_output: bool,
}

impl ConnectConfiguration {
    /// A configuration with the given endpoint and credentials, and
    /// defaults everywhere else.
    #[must_use]
    pub fn new(host: &str, port: u16, credentials: Credentials) -> Self {
        Self {
            host: host.to_string(),
            port,
            tls: Tls::Off,
            credentials,
            credential_refresh: CredentialRefresh::default(),
            client_locale: None,
            application_name: default_application_name(),
            fetch_size: DEFAULT_FETCH_SIZE,
            lob_read_length: DEFAULT_LOB_READ_LENGTH,
            lob_write_length: DEFAULT_LOB_WRITE_LENGTH,
            io_timeout: None,
            keep_alive_interval: None,
            cesu8_handling: Cesu8Handling::default(),
            legacy_table_output: false,
        }
    }

    pub(crate) fn addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn default_application_name() -> String {
    std::env::args_os()
        .next()
        .map(std::path::PathBuf::from)
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default()
}
