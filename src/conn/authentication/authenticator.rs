use crate::conn::Credentials;
use crate::ScnpResult;

// One authentication method. The handshake is the same for all methods:
// the method is offered with some initial data, the server answers with a
// method-specific challenge, the client replies with a proof, and the
// server's final data is verified.
pub(crate) trait Authenticator: Send + Sync {
    // The wire name of the method.
    fn name(&self) -> &'static str;

    fn name_as_bytes(&self) -> Vec<u8> {
        self.name().as_bytes().to_vec()
    }

    // The method-specific data sent with the offering.
    fn initial_data(&self, credentials: &Credentials) -> ScnpResult<Vec<u8>>;

    // Computes the proof for the server's challenge.
    fn client_proof(&mut self, server_challenge: &[u8], credentials: &Credentials)
        -> ScnpResult<Vec<u8>>;

    // Verifies the method-specific data of the final server reply.
    fn evaluate_final_data(&mut self, final_data: &[u8]) -> ScnpResult<()>;
}
