use crate::conn::authentication::Authenticator;
use crate::conn::Credentials;
use crate::protocol::parts::AuthFields;
use crate::scnp_error::prot_err;
use crate::{ScnpError, ScnpResult};

// Certificate logon. The server sends a nonce; the proof is the client's
// certificate chain plus a signature over the nonce, made with the key
// that belongs to the leaf certificate.
pub(crate) struct X509;

impl X509 {
    pub fn boxed() -> Box<dyn Authenticator> {
        Box::new(Self)
    }
}

impl Authenticator for X509 {
    fn name(&self) -> &'static str {
        "X509"
    }

    fn initial_data(&self, _credentials: &Credentials) -> ScnpResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn client_proof(
        &mut self,
        server_challenge: &[u8],
        credentials: &Credentials,
    ) -> ScnpResult<Vec<u8>> {
        let client_certificate = credentials.client_certificate.as_ref().ok_or_else(|| {
            ScnpError::InvalidArgument("no client certificate provided".to_string())
        })?;
        if server_challenge.is_empty() {
            return Err(prot_err!("X509 challenge carries no server nonce"));
        }

        let signature = sign(server_challenge, client_certificate)?;

        // chain (leaf first) and signature, as nested auth fields
        let mut fields = AuthFields::with_capacity(client_certificate.chain.len() + 1);
        for certificate in &client_certificate.chain {
            fields.push(certificate.as_ref().to_vec());
        }
        fields.push(signature);
        let mut buf = Vec::new();
        fields.emit(&mut buf)?;
        Ok(buf)
    }

    fn evaluate_final_data(&mut self, final_data: &[u8]) -> ScnpResult<()> {
        // the database user the certificate was mapped to
        trace!("X509 final data: {} bytes", final_data.len());
        Ok(())
    }
}

// The signature scheme is negotiated from what the key supports.
fn sign(
    message: &[u8],
    client_certificate: &crate::conn::ClientCertificate,
) -> ScnpResult<Vec<u8>> {
    use rustls::sign::SigningKey;

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&client_certificate.key)
        .map_err(|e| ScnpError::InvalidArgument(format!("unusable client key: {e}")))?;
    let signer = signing_key
        .choose_scheme(&[
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
        ])
        .ok_or_else(|| {
            ScnpError::InvalidArgument("client key supports no usable signature scheme".to_string())
        })?;
    signer
        .sign(message)
        .map_err(|e| prot_err!("signing the server nonce failed: {e}"))
}
