use crate::conn::authentication::{crypto_util, Authenticator};
use crate::conn::Credentials;
use crate::protocol::parts::AuthFields;
use crate::scnp_error::prot_err;
use crate::{ScnpError, ScnpResult};
use byteorder::{LittleEndian, WriteBytesExt};
use rand::{thread_rng, RngCore};
use std::io::Write;

const CLIENT_PROOF_SIZE: u8 = 32;

pub(crate) struct ScramSha256 {
    client_challenge: Vec<u8>,
    expected_server_proof: Option<Vec<u8>>,
}

impl ScramSha256 {
    pub fn boxed() -> Box<dyn Authenticator> {
        let mut client_challenge = [0_u8; 64];
        thread_rng().fill_bytes(&mut client_challenge);
        Box::new(Self {
            client_challenge: client_challenge.to_vec(),
            expected_server_proof: None,
        })
    }
}

impl Authenticator for ScramSha256 {
    fn name(&self) -> &'static str {
        "SCRAMSHA256"
    }

    fn initial_data(&self, _credentials: &Credentials) -> ScnpResult<Vec<u8>> {
        Ok(self.client_challenge.clone())
    }

    fn client_proof(
        &mut self,
        server_challenge: &[u8],
        credentials: &Credentials,
    ) -> ScnpResult<Vec<u8>> {
        let (salt, server_nonce) = parse_challenge(server_challenge)?;
        let password = credentials
            .password
            .as_ref()
            .ok_or_else(|| ScnpError::InvalidArgument("no password provided".to_string()))?;

        let (client_proof, server_proof) = crypto_util::scram_sha256(
            &salt,
            &server_nonce,
            &self.client_challenge,
            password,
        )
        .map_err(|_| prot_err!("SCRAM proof calculation failed"))?;

        self.client_challenge.clear();
        self.expected_server_proof = Some(server_proof);

        // one sub-field: the 32-byte proof
        let mut buf = Vec::with_capacity(3 + CLIENT_PROOF_SIZE as usize);
        buf.write_u16::<LittleEndian>(1)?;
        buf.write_u8(CLIENT_PROOF_SIZE)?;
        buf.write_all(&client_proof)?;
        Ok(buf)
    }

    fn evaluate_final_data(&mut self, final_data: &[u8]) -> ScnpResult<()> {
        let server_proof = AuthFields::parse(&mut std::io::Cursor::new(final_data.to_vec()))?
            .pop()
            .ok_or_else(|| prot_err!("expected a non-empty list of auth fields"))?;
        match self.expected_server_proof.take() {
            Some(expected) if expected == server_proof => Ok(()),
            _ => {
                let msg = "server proof verification failed, the server's identity is doubtful";
                warn!("{msg}");
                Err(prot_err!("{msg}"))
            }
        }
    }
}

// The challenge is an AuthFields with salt and server nonce.
fn parse_challenge(server_challenge: &[u8]) -> ScnpResult<(Vec<u8>, Vec<u8>)> {
    let mut auth_fields =
        AuthFields::parse(&mut std::io::Cursor::new(server_challenge.to_vec()))?;
    match (auth_fields.pop(), auth_fields.pop(), auth_fields.pop()) {
        (Some(server_nonce), Some(salt), None) => Ok((salt, server_nonce)),
        _ => Err(prot_err!("expected 2 auth fields in the SCRAM challenge")),
    }
}
