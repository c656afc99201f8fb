use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use secstr::SecUtf8;
use sha2::{Digest, Sha256};

// The salted-challenge proof calculations of the two SCRAM variants.
// Both return (client_proof, expected_server_proof).

pub(crate) fn scram_sha256(
    salt: &[u8],
    server_nonce: &[u8],
    client_challenge: &[u8],
    password: &SecUtf8,
) -> Result<(Vec<u8>, Vec<u8>), crypto_common::InvalidLength> {
    let salted_password = hmac(password.unsecure().as_bytes(), salt)?;

    let mut salt_nonce_challenge =
        Vec::with_capacity(salt.len() + server_nonce.len() + client_challenge.len());
    salt_nonce_challenge.extend_from_slice(salt);
    salt_nonce_challenge.extend_from_slice(server_nonce);
    salt_nonce_challenge.extend_from_slice(client_challenge);

    let client_key = sha256(&salted_password);
    let signature = hmac(&sha256(&client_key), &salt_nonce_challenge)?;
    let client_proof = xor(&signature, &client_key);

    let mut key_salt_nonce =
        Vec::with_capacity(client_key.len() + salt.len() + server_nonce.len());
    key_salt_nonce.extend_from_slice(&client_key);
    key_salt_nonce.extend_from_slice(salt);
    key_salt_nonce.extend_from_slice(server_nonce);

    let server_verifier = hmac(&salted_password, salt)?;
    let server_proof = hmac(&server_verifier, &key_salt_nonce)?;

    Ok((client_proof, server_proof))
}

pub(crate) fn scram_pbkdf2_sha256(
    salt: &[u8],
    server_nonce: &[u8],
    client_challenge: &[u8],
    password: &SecUtf8,
    iterations: u32,
) -> Result<(Vec<u8>, Vec<u8>), crypto_common::InvalidLength> {
    let mut salted_password = [0_u8; 32];
    pbkdf2::<Hmac<Sha256>>(
        password.unsecure().as_bytes(),
        salt,
        iterations,
        &mut salted_password,
    )
    .expect("HMAC accepts keys of any length");

    let client_key = sha256(&salted_password);
    let client_verifier = sha256(&client_key);

    let mut salt_nonce_challenge =
        Vec::with_capacity(salt.len() + server_nonce.len() + client_challenge.len());
    salt_nonce_challenge.extend_from_slice(salt);
    salt_nonce_challenge.extend_from_slice(server_nonce);
    salt_nonce_challenge.extend_from_slice(client_challenge);
    let shared_key = hmac(&client_verifier, &salt_nonce_challenge)?;
    let client_proof = xor(&shared_key, &client_key);

    let mut challenge_salt_nonce =
        Vec::with_capacity(client_challenge.len() + salt.len() + server_nonce.len());
    challenge_salt_nonce.extend_from_slice(client_challenge);
    challenge_salt_nonce.extend_from_slice(salt);
    challenge_salt_nonce.extend_from_slice(server_nonce);

    let server_verifier = hmac(&salted_password, salt)?;
    let server_proof = hmac(&server_verifier, &challenge_salt_nonce)?;

    Ok((client_proof, server_proof))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, crypto_common::InvalidLength> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn sha256(input: &[u8]) -> Vec<u8> {
    let mut sha = Sha256::new();
    sha.update(input);
    sha.finalize().to_vec()
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len(), "xor needs equally long inputs");
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both sides of the handshake are computed here, so the pairing of
    // client and server proof must at least be self-consistent and
    // deterministic.
    #[test]
    fn proofs_are_deterministic() {
        let password = SecUtf8::from("secret");
        let salt = [1_u8; 16];
        let server_nonce = [2_u8; 48];
        let client_challenge = [3_u8; 64];

        let (cp1, sp1) = scram_sha256(&salt, &server_nonce, &client_challenge, &password).unwrap();
        let (cp2, sp2) = scram_sha256(&salt, &server_nonce, &client_challenge, &password).unwrap();
        assert_eq!(cp1, cp2);
        assert_eq!(sp1, sp2);
        assert_eq!(cp1.len(), 32);

        let (cp3, _) =
            scram_pbkdf2_sha256(&salt, &server_nonce, &client_challenge, &password, 15_000)
                .unwrap();
        assert_eq!(cp3.len(), 32);
        assert_ne!(cp1, cp3);
    }
}
