use crate::conn::authentication::{client_id, Authenticator};
use crate::conn::Credentials;
use crate::{ScnpError, ScnpResult};

// Re-authentication with an opaque cookie obtained from an earlier
// connection. The offering and the proof both carry the cookie followed
// by the client id; the server's challenge is empty.
pub(crate) struct SessionCookie;

impl SessionCookie {
    pub fn boxed() -> Box<dyn Authenticator> {
        Box::new(Self)
    }
}

fn cookie_and_client_id(credentials: &Credentials) -> ScnpResult<Vec<u8>> {
    let cookie = credentials
        .session_cookie
        .as_ref()
        .ok_or_else(|| ScnpError::InvalidArgument("no session cookie provided".to_string()))?;
    let mut bytes = cookie.0.clone();
    bytes.extend_from_slice(client_id().as_bytes());
    Ok(bytes)
}

impl Authenticator for SessionCookie {
    fn name(&self) -> &'static str {
        "SessionCookie"
    }

    fn initial_data(&self, credentials: &Credentials) -> ScnpResult<Vec<u8>> {
        cookie_and_client_id(credentials)
    }

    fn client_proof(
        &mut self,
        _server_challenge: &[u8],
        credentials: &Credentials,
    ) -> ScnpResult<Vec<u8>> {
        cookie_and_client_id(credentials)
    }

    fn evaluate_final_data(&mut self, _final_data: &[u8]) -> ScnpResult<()> {
        Ok(())
    }
}
