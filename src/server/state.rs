use rand::{CryptoRng, Rng};
use ring::constant_time::verify_slices_are_equal;
use tracing::warn;
use zeroize::Zeroizing;

use crate::directory::CredentialDirectory;
use crate::error::{Error, Field, Kind};
use crate::message::{Attribute, ChallengeResponse};
use crate::utils::{auth_message, find_proofs, generate_nonce};
use super::context::SessionContext;
use super::ScramServer;

/// The phases of a server side SCRAM exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the client's first message, or about to answer it.
    Initial,
    /// The challenge was sent; waiting for the client's proof.
    Validation,
    /// The client proved knowledge of the password.
    Completed,
    /// The exchange was aborted. Terminal.
    Failed,
}

impl Phase {
    /// The name used in logs and sequencing errors.
    pub fn name(self) -> &'static str {
        match self {
            Phase::Initial => "Initial",
            Phase::Validation => "Validation",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
        }
    }

    /// Whether no further client message is accepted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// The current state. Terminal states keep the final server message until it is sent.
#[derive(Debug)]
pub(crate) enum State {
    Initial,
    Validation,
    Completed { server_final: Option<ChallengeResponse> },
    Failed { server_final: Option<ChallengeResponse> },
}

impl State {
    pub(crate) fn phase(&self) -> Phase {
        match *self {
            State::Initial => Phase::Initial,
            State::Validation => Phase::Validation,
            State::Completed { .. } => Phase::Completed,
            State::Failed { .. } => Phase::Failed,
        }
    }

    pub(crate) fn take_server_final(&mut self) -> Option<ChallengeResponse> {
        match *self {
            State::Completed { ref mut server_final } | State::Failed { ref mut server_final } => {
                server_final.take()
            }
            _ => None,
        }
    }
}

/// Undoes the `=2C` and `=3D` escaping of SCRAM user names.
fn unescape_name(name: &str, field: Field) -> Result<String, Error> {
    let mut unescaped = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(index) = rest.find('=') {
        unescaped.push_str(&rest[..index]);
        match rest.get(index + 1..index + 3) {
            Some("2C") => unescaped.push(','),
            Some("3D") => unescaped.push('='),
            _ => return Err(Error::Protocol(Kind::InvalidField(field))),
        }
        rest = &rest[index + 3..];
    }
    unescaped.push_str(rest);
    Ok(unescaped)
}

/// Splits the client's first message into the gs2 header, the optional authzid and the bare
/// message. Gives an error if the header was malformed in any way.
fn parse_gs2_header(data: &str) -> Result<(&str, Option<&str>, &str), Error> {
    let mut parts = data.splitn(3, ',');

    // Channel binding
    if let Some(part) = parts.next() {
        if let Some(cb) = part.chars().next() {
            if cb == 'p' {
                return Err(Error::UnsupportedExtension);
            }
            if (cb != 'n' && cb != 'y') || part.len() > 1 {
                return Err(Error::Protocol(Kind::InvalidField(Field::ChannelBinding)));
            }
        } else {
            return Err(Error::Protocol(Kind::ExpectedField(Field::ChannelBinding)));
        }
    } else {
        return Err(Error::Protocol(Kind::ExpectedField(Field::ChannelBinding)));
    }

    // Authzid
    let authzid = if let Some(part) = parts.next() {
        if part.is_empty() {
            None
        } else if part.len() < 2 {
            return Err(Error::Protocol(Kind::ExpectedField(Field::Authzid)));
        } else if &part.as_bytes()[..2] == b"a=" {
            Some(&part[2..])
        } else {
            return Err(Error::Protocol(Kind::ExpectedField(Field::Authzid)));
        }
    } else {
        return Err(Error::Protocol(Kind::ExpectedField(Field::Authzid)));
    };

    let bare = parts.next().ok_or(Error::Protocol(Kind::ExpectedField(Field::Authcid)))?;
    let header = &data[..data.len() - bare.len()];
    Ok((header, authzid, bare))
}

/// Requires `message` to consist of exactly `expected`, in that order.
fn expect_attributes(message: &ChallengeResponse, expected: &[Attribute]) -> Result<(), Error> {
    for attribute in expected {
        message.require(*attribute)?;
    }
    let mut found = message.attributes();
    for attribute in expected {
        match found.next() {
            Some(a) if a == *attribute => {}
            _ => return Err(Error::Protocol(Kind::InvalidField(attribute.field()))),
        }
    }
    match found.next() {
        Some(extra) => Err(Error::Protocol(Kind::InvalidField(extra.field()))),
        None => Ok(()),
    }
}

/// Initial state: processes the client's first message.
///
/// The credential is looked up here, but the transition happens when the challenge is
/// produced.
pub(crate) fn handle_client_first<D: CredentialDirectory>(context: &mut SessionContext,
                                                          server: &ScramServer<D>,
                                                          client_first: &str)
                                                          -> Result<(), Error> {
    if client_first.is_empty() {
        return Ok(());
    }
    if context.received_client_message() || client_first.starts_with("c=") {
        return Err(Error::ProtocolSequence(Phase::Initial.name()));
    }

    let (gs2_header, authzid, bare) = parse_gs2_header(client_first)?;
    let message = ChallengeResponse::parse(bare)?;
    expect_attributes(&message, &[Attribute::Username, Attribute::Nonce])?;
    let username = unescape_name(message.require(Attribute::Username)?, Field::Authcid)?;
    let authzid = match authzid {
        Some(authzid) => Some(unescape_name(authzid, Field::Authzid)?),
        None => None,
    };
    let client_nonce = message.require(Attribute::Nonce)?;

    let (credential, known_user) = server.stored_credential(&username)?;
    context.record_client_first(username, authzid, gs2_header, bare, client_nonce);
    context.set_credential(credential, known_user);
    Ok(())
}

/// Initial state: answers the client's first message with nonce, salt and iteration count,
/// then moves to validation. Without a client message there is nothing to answer yet.
pub(crate) fn server_first<R: Rng + CryptoRng>(context: &mut SessionContext,
                                               nonce_length: usize,
                                               rng: &mut R)
                                               -> Option<ChallengeResponse> {
    if !context.received_client_message() {
        return None;
    }
    let server_nonce = generate_nonce(rng, nonce_length.max(1));
    let combined_nonce = format!("{}{}", context.client_nonce(), server_nonce);

    let mut challenge = ChallengeResponse::new();
    challenge.put(Attribute::Nonce, combined_nonce.as_str())
        .put(Attribute::Salt, base64::encode(context.salt()))
        .put(Attribute::IterationCount, context.iterations().to_string());

    context.record_server_first(server_nonce, combined_nonce, challenge.to_string());
    context.transition(State::Validation);
    Some(challenge)
}

/// Validation state: checks channel binding, nonce and proof of the client's final message.
/// On success the session completes; the caller fails it on any error.
pub(crate) fn handle_client_final<D: CredentialDirectory>(context: &mut SessionContext,
                                                          directory: &D,
                                                          client_final: &str)
                                                          -> Result<(), Error> {
    // Anything but a client-final, e.g. a repeated client-first, is out of sequence here.
    if !client_final.starts_with("c=") {
        return Err(Error::ProtocolSequence(Phase::Validation.name()));
    }
    let message = ChallengeResponse::parse(client_final)?;
    expect_attributes(&message,
                      &[Attribute::ChannelBinding, Attribute::Nonce, Attribute::Proof])?;
    let channel_binding = message.require(Attribute::ChannelBinding)?;
    let nonce = message.require(Attribute::Nonce)?;
    let proof = message.require(Attribute::Proof)?;

    if channel_binding != base64::encode(context.gs2_header().as_bytes()) {
        return Err(Error::Protocol(Kind::InvalidField(Field::ChannelBinding)));
    }
    if nonce != context.combined_nonce() {
        return Err(Error::Protocol(Kind::InvalidNonce));
    }
    let proof = Zeroizing::new(base64::decode(proof.as_bytes())
        .map_err(|_| Error::Protocol(Kind::InvalidField(Field::Proof)))?);

    let credential = context.credential()
        .ok_or(Error::ProtocolSequence(Phase::Validation.name()))?;
    let client_final_without_proof = format!("c={},r={}", channel_binding, nonce);
    let auth_message = auth_message(context.client_first_bare(),
                                    context.server_first(),
                                    &client_final_without_proof);
    let (client_proof, server_signature) = find_proofs(credential.digest(), &auth_message)?;

    let proof_matches = verify_slices_are_equal(&client_proof[..], &proof).is_ok();
    let username = context.username().unwrap_or_default().to_string();
    if !proof_matches || !context.known_user() {
        warn!(username = username.as_str(), "SCRAM proof verification failed");
        return Err(Error::Authentication);
    }
    if let Some(authzid) = context.authzid() {
        if !directory.authorize(&username, authzid) {
            warn!(username = username.as_str(), authzid, "SCRAM authorization refused");
            return Err(Error::Authorization {
                authcid: username,
                authzid: authzid.to_string(),
            });
        }
    }

    let mut server_final = ChallengeResponse::new();
    server_final.put(Attribute::Verifier, base64::encode(&server_signature[..]));
    context.transition(State::Completed { server_final: Some(server_final) });
    Ok(())
}

/// The `e=` value reported to the client for `error`. Unknown users and wrong passwords get
/// the same answer.
pub(crate) fn server_error(error: &Error) -> &'static str {
    match *error {
        Error::Authentication | Error::NoSuchUser(_) => "invalid-proof",
        Error::UnsupportedExtension => "channel-binding-not-supported",
        Error::Protocol(Kind::InvalidField(Field::ChannelBinding)) => "channel-bindings-dont-match",
        Error::Protocol(Kind::InvalidField(Field::Authcid)) => "invalid-username-encoding",
        Error::Protocol(_) => "invalid-encoding",
        _ => "other-error",
    }
}

#[cfg(test)]
mod tests {
    use super::{expect_attributes, parse_gs2_header, server_error, unescape_name, State};
    use crate::error::{Error, Field, Kind};
    use crate::message::{Attribute, ChallengeResponse};

    #[test]
    fn test_parse_gs2_header_success() {
        let (header, authzid, bare) = parse_gs2_header("n,,n=user,r=abcdefghijk").unwrap();
        assert_eq!(header, "n,,");
        assert!(authzid.is_none());
        assert_eq!(bare, "n=user,r=abcdefghijk");

        let (header, authzid, bare) = parse_gs2_header("y,a=other user,n=user,r=abcdef=hijk").unwrap();
        assert_eq!(header, "y,a=other user,");
        assert_eq!(authzid, Some("other user"));
        assert_eq!(bare, "n=user,r=abcdef=hijk");

        let (header, authzid, bare) = parse_gs2_header("n,,").unwrap();
        assert_eq!(header, "n,,");
        assert!(authzid.is_none());
        assert_eq!(bare, "");
    }

    #[test]
    fn test_parse_gs2_header_missing_fields() {
        assert_eq!(parse_gs2_header("n,n=user,r=abc").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::Authzid)));
        assert_eq!(parse_gs2_header("n,a,n=user").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::Authzid)));
        assert_eq!(parse_gs2_header("n").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::Authzid)));
        assert_eq!(parse_gs2_header("n,").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::Authcid)));
        assert_eq!(parse_gs2_header(",,n=user,r=abc").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::ChannelBinding)));
        assert_eq!(parse_gs2_header("").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::ChannelBinding)));
        assert_eq!(parse_gs2_header(",,,").unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::ChannelBinding)));
    }

    #[test]
    fn test_parse_gs2_header_invalid_data() {
        assert_eq!(parse_gs2_header("a,,n=user,r=abc").unwrap_err(), Error::Protocol(Kind::InvalidField(Field::ChannelBinding)));
        assert_eq!(parse_gs2_header("p=tls-unique,,n=user,r=abc").unwrap_err(), Error::UnsupportedExtension);
        assert_eq!(parse_gs2_header("nn,,n=user,r=abc").unwrap_err(), Error::Protocol(Kind::InvalidField(Field::ChannelBinding)));
    }

    #[test]
    fn test_unescape_name() {
        assert_eq!(unescape_name("plain", Field::Authcid).unwrap(), "plain");
        assert_eq!(unescape_name("a=2Cb=3Dc", Field::Authcid).unwrap(), "a,b=c");
        assert_eq!(unescape_name("", Field::Authcid).unwrap(), "");
        assert_eq!(unescape_name("bad=", Field::Authcid).unwrap_err(), Error::Protocol(Kind::InvalidField(Field::Authcid)));
        assert_eq!(unescape_name("bad=2D", Field::Authzid).unwrap_err(), Error::Protocol(Kind::InvalidField(Field::Authzid)));
    }

    #[test]
    fn test_expect_attributes() {
        let expected = [Attribute::ChannelBinding, Attribute::Nonce, Attribute::Proof];
        let ok: ChallengeResponse = "c=biws,r=abc,p=xyz".parse().unwrap();
        assert!(expect_attributes(&ok, &expected).is_ok());

        let missing: ChallengeResponse = "c=biws,r=abc".parse().unwrap();
        assert_eq!(expect_attributes(&missing, &expected).unwrap_err(), Error::Protocol(Kind::ExpectedField(Field::Proof)));

        let reordered: ChallengeResponse = "r=abc,c=biws,p=xyz".parse().unwrap();
        assert_eq!(expect_attributes(&reordered, &expected).unwrap_err(), Error::Protocol(Kind::InvalidField(Field::ChannelBinding)));

        let extra: ChallengeResponse = "c=biws,r=abc,p=xyz,s=c2FsdA==".parse().unwrap();
        assert_eq!(expect_attributes(&extra, &expected).unwrap_err(), Error::Protocol(Kind::InvalidField(Field::Salt)));
    }

    #[test]
    fn test_terminal_states_hand_out_final_message_once() {
        let mut message = ChallengeResponse::new();
        message.put(Attribute::Error, "invalid-proof");
        let mut state = State::Failed { server_final: Some(message) };
        assert_eq!(state.take_server_final().unwrap().to_string(), "e=invalid-proof");
        assert!(state.take_server_final().is_none());
        assert!(State::Validation.take_server_final().is_none());
        assert!(state.phase().is_terminal());
        assert!(!State::Initial.phase().is_terminal());
    }

    #[test]
    fn test_server_error_hides_unknown_users() {
        assert_eq!(server_error(&Error::NoSuchUser("ghost".into())), server_error(&Error::Authentication));
        assert_eq!(server_error(&Error::ProtocolSequence("Completed")), "other-error");
        assert_eq!(server_error(&Error::Protocol(Kind::InvalidNonce)), "invalid-encoding");
    }
}
