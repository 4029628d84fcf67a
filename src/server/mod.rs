//! The server side of the SCRAM exchange, backed by stored password hashes.
//!
//! A [`ScramServer`] holds what all sessions share: the verifier, the credential directory and
//! the configuration. Every authentication attempt gets its own [`ServerSession`], which walks
//! through the phases `Initial`, `Validation` and one of `Completed` or `Failed`.

mod context;
mod state;

use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use ring::hmac;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::directory::{CredentialDirectory, Lookup};
use crate::error::Error;
use crate::message::{Attribute, ChallengeResponse};
use crate::scheme::registry::SchemeRegistry;
use crate::scheme::HashRecord;
use crate::verifier::Verifier;

pub use self::context::SessionContext;
pub use self::state::Phase;
use self::state::State;

/// Responds to client authentication challenges.
/// The entrypoint for the SCRAM server side implementation.
pub struct ScramServer<D: CredentialDirectory> {
    verifier: Verifier,
    directory: D,
    config: Config,
    decoy_key: hmac::Key,
}

impl<D: CredentialDirectory> ScramServer<D> {
    /// Create a new ScramServer using the given verifier and credential directory, with the
    /// default configuration.
    pub fn new(verifier: Verifier, directory: D) -> Self {
        ScramServer::with_config(verifier, directory, Config::default())
    }

    /// Create a new ScramServer with an explicit configuration.
    ///
    /// The key deriving decoy salts for unknown users is drawn from `OsRng` once per server.
    pub fn with_config(verifier: Verifier, directory: D, config: Config) -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut secret[..]);
        ScramServer {
            verifier,
            directory,
            config,
            decoy_key: hmac::Key::new(hmac::HMAC_SHA256, &secret[..]),
        }
    }

    /// Starts a new authentication attempt.
    pub fn start(&self) -> ServerSession<'_, D> {
        ServerSession {
            server: self,
            context: SessionContext::new(),
        }
    }

    /// The verifier credentials are parsed with.
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// The directory credentials are looked up in.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// The configuration of this server.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Finds the credential of `username`. Unknown users and users whose stored credential
    /// can't be parsed get a decoy, so the challenge doesn't reveal either case. The flag tells
    /// whether a usable credential exists.
    pub(crate) fn stored_credential(&self, username: &str) -> Result<(HashRecord, bool), Error> {
        match self.directory.lookup_credential(username) {
            Lookup::Found(encoded) => {
                let encoded = Zeroizing::new(encoded);
                match self.verifier.parse(&encoded) {
                    Ok(record) => Ok((record, true)),
                    Err(error) => {
                        warn!(username, %error, "unusable stored credential, using decoy credential");
                        Ok((self.decoy_record(username)?, false))
                    }
                }
            }
            Lookup::NotFound => {
                debug!(username, "unknown SCRAM user, using decoy credential");
                Ok((self.decoy_record(username)?, false))
            }
        }
    }

    fn decoy_record(&self, username: &str) -> Result<HashRecord, Error> {
        let registration = self.registry().lookup(self.config.decoy_scheme)?;
        let seed = hmac::sign(&self.decoy_key, username.as_bytes());
        Ok(registration.scheme().decoy(seed.as_ref(), registration.default_cost(), &mut OsRng))
    }

    fn registry(&self) -> &SchemeRegistry {
        self.verifier.registry()
    }
}

/// One authentication attempt. Messages are fed in with
/// [`handle_response`](#method.handle_response) and answers taken out with
/// [`produce_challenge`](#method.produce_challenge).
pub struct ServerSession<'a, D: CredentialDirectory> {
    server: &'a ScramServer<D>,
    context: SessionContext,
}

impl<'a, D: CredentialDirectory> ServerSession<'a, D> {
    /// Produces the next server message, if one is due.
    ///
    /// In the initial phase this is the challenge (`r`, `s`, `i`), once the client's first
    /// message was handled. In a terminal phase it is the final `v=` or `e=` message, handed out
    /// exactly once. Everything else yields `None`.
    ///
    /// By default, this method uses `OsRng` as its source of randomness for the nonce. To
    /// specify the randomness source, use
    /// [`produce_challenge_with_rng`](#method.produce_challenge_with_rng).
    pub fn produce_challenge(&mut self) -> Result<Option<ChallengeResponse>, Error> {
        self.produce_challenge_with_rng(&mut OsRng)
    }

    /// Produces the next server message with the given source of randomness for the server's
    /// nonce.
    pub fn produce_challenge_with_rng<R: Rng + CryptoRng>(&mut self,
                                                          rng: &mut R)
                                                          -> Result<Option<ChallengeResponse>, Error> {
        let challenge = match self.context.phase() {
            Phase::Initial => state::server_first(&mut self.context, self.server.config.nonce_length, rng),
            Phase::Validation => None,
            Phase::Completed | Phase::Failed => self.context.state_mut().take_server_final(),
        };
        Ok(challenge)
    }

    /// Handles a message from the client.
    ///
    /// An error in the initial or validation phase fails the session; the `e=` message for the
    /// client is then available from [`produce_challenge`](#method.produce_challenge). Messages
    /// after the exchange ended are rejected without changing anything.
    pub fn handle_response(&mut self, response: &str) -> Result<(), Error> {
        let phase = self.context.phase();
        let result = match phase {
            Phase::Initial => state::handle_client_first(&mut self.context, self.server, response),
            Phase::Validation => {
                state::handle_client_final(&mut self.context, &self.server.directory, response)
            }
            Phase::Completed | Phase::Failed => return Err(Error::ProtocolSequence(phase.name())),
        };
        if let Err(ref error) = result {
            warn!(phase = phase.name(), %error, "SCRAM exchange failed");
            let mut server_final = ChallengeResponse::new();
            server_final.put(Attribute::Error, state::server_error(error));
            self.context.transition(State::Failed { server_final: Some(server_final) });
        }
        result
    }

    /// Whether the client authenticated successfully.
    pub fn is_complete(&self) -> bool {
        self.context.phase() == Phase::Completed
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.context.phase()
    }

    /// The data collected so far.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}
