//! The multi-method authentication handshake.

mod authenticate;
mod authenticator;
pub(crate) mod credential_refresh;
mod crypto_util;
mod jwt;
mod scram_pbkdf2_sha256;
mod scram_sha256;
mod session_cookie;
mod x509;

pub(crate) use self::authenticate::authenticate;
pub(crate) use self::authenticator::Authenticator;
pub(crate) use self::jwt::Jwt;
pub(crate) use self::scram_pbkdf2_sha256::ScramPbkdf2Sha256;
pub(crate) use self::scram_sha256::ScramSha256;
pub(crate) use self::session_cookie::SessionCookie;
pub(crate) use self::x509::X509;

// Identifies this client process to the server, e.g. in session-cookie
// proofs and the ClientId part of the connect request.
pub(crate) fn client_id() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    format!("{}@{}", std::process::id(), host)
}
