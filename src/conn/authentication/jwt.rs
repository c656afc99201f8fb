use crate::conn::authentication::Authenticator;
use crate::conn::Credentials;
use crate::protocol::util;
use crate::{ScnpError, ScnpResult};

// Token logon. The unchanged token is the offering's parameter; the
// server's challenge is the database user it mapped the token to, and no
// further proof is expected.
pub(crate) struct Jwt {
    mapped_user: Option<String>,
}

impl Jwt {
    pub fn boxed() -> Box<dyn Authenticator> {
        Box::new(Self { mapped_user: None })
    }
}

impl Authenticator for Jwt {
    fn name(&self) -> &'static str {
        "JWT"
    }

    fn initial_data(&self, credentials: &Credentials) -> ScnpResult<Vec<u8>> {
        credentials
            .jwt_token
            .as_ref()
            .map(|token| token.0.as_bytes().to_vec())
            .ok_or_else(|| ScnpError::InvalidArgument("no JWT token provided".to_string()))
    }

    fn client_proof(
        &mut self,
        server_challenge: &[u8],
        _credentials: &Credentials,
    ) -> ScnpResult<Vec<u8>> {
        self.mapped_user = Some(util::lossy_string_from_cesu8(server_challenge));
        debug!("JWT maps to database user {:?}", self.mapped_user);
        Ok(Vec::new())
    }

    fn evaluate_final_data(&mut self, final_data: &[u8]) -> ScnpResult<()> {
        // may carry a session cookie for later re-connects
        trace!("JWT final data: {} bytes", final_data.len());
        Ok(())
    }
}
