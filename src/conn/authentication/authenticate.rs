use crate::conn::authentication::{
    client_id, Authenticator, Jwt, ScramPbkdf2Sha256, ScramSha256, SessionCookie, X509,
};
use crate::conn::{ConnectConfiguration, SessionCore};
use crate::protocol::parts::{AuthFields, ClientContext, CODE_AUTHENTICATION_FAILED};
use crate::protocol::{MessageType, Part, Reply, ReplyType, Request, COMMAND_OPTIONS_NONE};
use crate::scnp_error::prot_err;
use crate::{ScnpError, ScnpResult};

// Runs the two-step authentication handshake on a fresh session.
//
// Every method a credential is available for is offered, in the fixed
// priority order session cookie, X.509, JWT, SCRAM-PBKDF2-SHA256,
// SCRAM-SHA256; the server selects exactly one of them.
pub(crate) fn authenticate(
    core: &mut SessionCore,
    config: &ConnectConfiguration,
) -> ScnpResult<()> {
    trace!("authenticate()");
    let credentials = &config.credentials;

    let mut authenticators: Vec<Box<dyn Authenticator>> = Vec::new();
    if credentials.session_cookie.is_some() {
        authenticators.push(SessionCookie::boxed());
    }
    if credentials.client_certificate.is_some() {
        authenticators.push(X509::boxed());
    }
    if credentials.jwt_token.is_some() {
        authenticators.push(Jwt::boxed());
    }
    if credentials.password.is_some() {
        authenticators.push(ScramPbkdf2Sha256::boxed());
        authenticators.push(ScramSha256::boxed());
    }
    if authenticators.is_empty() {
        return Err(ScnpError::InvalidArgument(
            "no credentials available for any authentication method".to_string(),
        ));
    }

    let (selected_name, server_challenge) =
        first_auth_request(core, config, &authenticators)?;

    // a method this client did not offer must not be selected
    let mut authenticator = authenticators
        .into_iter()
        .find(|authenticator| authenticator.name() == selected_name)
        .ok_or_else(|| {
            prot_err!("server selected authentication method {selected_name}, which was not offered")
        })?;
    debug!("server selected authentication method {selected_name}");

    // only the server's dedicated rejection code means "wrong credentials"
    second_auth_request(core, config, &mut *authenticator, &server_challenge)
        .map_err(|e| match e {
            ScnpError::Server { source } if source.code() == CODE_AUTHENTICATION_FAILED => {
                ScnpError::AuthFailed {
                    method: selected_name.clone(),
                    source: Box::new(ScnpError::Server { source }),
                }
            }
            e => e,
        })?;

    core.set_authenticated();
    trace!("session id: {}", core.session_id());
    Ok(())
}

fn first_auth_request(
    core: &mut SessionCore,
    config: &ConnectConfiguration,
    authenticators: &[Box<dyn Authenticator>],
) -> ScnpResult<(String, Vec<u8>)> {
    let credentials = &config.credentials;
    let mut request = Request::new(MessageType::Authenticate, COMMAND_OPTIONS_NONE);
    request.push(Part::ClientContext(ClientContext::for_connect(
        &config.application_name,
    )));

    let mut auth_fields = AuthFields::with_capacity(1 + 2 * authenticators.len());
    auth_fields.push_string(&credentials.database_user);
    for authenticator in authenticators {
        debug!("offering authentication method {}", authenticator.name());
        auth_fields.push(authenticator.name_as_bytes());
        auth_fields.push(authenticator.initial_data(credentials)?);
    }
    request.push(Part::Auth(auth_fields));

    // the default reply error handling stays off during authentication
    let reply = core.roundtrip(&request, None, None, None, &mut None)?;
    evaluate_first_reply(reply)
}

fn evaluate_first_reply(reply: Reply) -> ScnpResult<(String, Vec<u8>)> {
    reply.assert_expected_reply_type(ReplyType::Nil)?;
    let mut result = None;
    for part in reply.parts {
        match part {
            Part::Auth(mut auth_fields) => {
                match (auth_fields.pop(), auth_fields.pop(), auth_fields.pop()) {
                    (Some(server_challenge), Some(raw_name), None) => {
                        let selected_name = String::from_utf8_lossy(&raw_name).to_string();
                        result = Some((selected_name, server_challenge));
                    }
                    _ => return Err(prot_err!("expected 2 auth fields in the method selection")),
                }
            }
            Part::Error(mut server_errors) => {
                if server_errors.is_empty() {
                    return Err(prot_err!("empty error part in the authentication reply"));
                }
                return Err(ScnpError::from(server_errors.remove(0)));
            }
            part => warn!("ignoring unexpected part {:?} in the authentication reply", part.kind()),
        }
    }
    result.ok_or_else(|| prot_err!("authentication reply carried no method selection"))
}

fn second_auth_request(
    core: &mut SessionCore,
    config: &ConnectConfiguration,
    authenticator: &mut dyn Authenticator,
    server_challenge: &[u8],
) -> ScnpResult<()> {
    let credentials = &config.credentials;
    let mut request = Request::new(MessageType::Connect, COMMAND_OPTIONS_NONE);
    let mut auth_fields = AuthFields::with_capacity(3);
    auth_fields.push_string(&credentials.database_user);
    auth_fields.push(authenticator.name_as_bytes());
    auth_fields.push(authenticator.client_proof(server_challenge, credentials)?);
    request.push(Part::Auth(auth_fields));
    request.push(Part::ClientId(client_id()));
    request.push(Part::ConnectOptions(core.connect_options().for_server()));

    let reply = core.roundtrip(&request, None, None, None, &mut None)?;
    evaluate_second_reply(reply, authenticator, core)
}

fn evaluate_second_reply(
    reply: Reply,
    authenticator: &mut dyn Authenticator,
    core: &mut SessionCore,
) -> ScnpResult<()> {
    reply.assert_expected_reply_type(ReplyType::Nil)?;

    // the session id is assigned with this reply's message header; a
    // non-positive id means the logon was not accepted
    let session_id = reply.session_id();

    for part in reply.parts {
        match part {
            Part::ConnectOptions(received) => {
                core.connect_options_mut().digest_server_options(received)?;
            }
            Part::Auth(mut auth_fields) => {
                match (auth_fields.pop(), auth_fields.pop(), auth_fields.pop()) {
                    (Some(final_data), Some(_method), None) => {
                        authenticator.evaluate_final_data(&final_data)?;
                    }
                    _ => return Err(prot_err!("expected 2 auth fields in the connect reply")),
                }
            }
            part => warn!("ignoring unexpected part {:?} in the connect reply", part.kind()),
        }
    }

    if session_id <= 0 {
        return Err(ScnpError::AuthFailed {
            method: authenticator.name().to_string(),
            source: Box::new(prot_err!("server assigned no session id")),
        });
    }
    core.set_session_id(session_id);
    Ok(())
}
