use tracing::debug;

use crate::scheme::HashRecord;
use super::state::{Phase, State};

/// The state of one authentication attempt.
///
/// A context is owned by exactly one [`ServerSession`](struct.ServerSession.html) and dropped
/// with it. The stored credential it holds is wiped on drop.
#[derive(Debug)]
pub struct SessionContext {
    state: State,
    username: Option<String>,
    authzid: Option<String>,
    gs2_header: String,
    client_first_bare: String,
    client_nonce: String,
    server_nonce: String,
    combined_nonce: String,
    server_first: String,
    salt: Vec<u8>,
    iterations: u32,
    credential: Option<HashRecord>,
    known_user: bool,
    received_client_message: bool,
}

impl SessionContext {
    pub(crate) fn new() -> Self {
        SessionContext {
            state: State::Initial,
            username: None,
            authzid: None,
            gs2_header: String::new(),
            client_first_bare: String::new(),
            client_nonce: String::new(),
            server_nonce: String::new(),
            combined_nonce: String::new(),
            server_first: String::new(),
            salt: Vec::new(),
            iterations: 0,
            credential: None,
            known_user: false,
            received_client_message: false,
        }
    }

    /// The current phase of the exchange.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The authentication identity sent by the client.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The authorization identity requested by the client, if any.
    pub fn authzid(&self) -> Option<&str> {
        self.authzid.as_deref()
    }

    /// The nonce chosen by the client.
    pub fn client_nonce(&self) -> &str {
        &self.client_nonce
    }

    /// The part of the nonce added by the server.
    pub fn server_nonce(&self) -> &str {
        &self.server_nonce
    }

    /// Client nonce followed by server nonce.
    pub fn combined_nonce(&self) -> &str {
        &self.combined_nonce
    }

    /// The salt advertised to the client.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The iteration count advertised to the client.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Whether the client's first message has been processed.
    pub fn received_client_message(&self) -> bool {
        self.received_client_message
    }

    pub(crate) fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Replaces the current state. The previous state is only kept in the log.
    pub(crate) fn transition(&mut self, next: State) {
        debug!(from = self.state.phase().name(), to = next.phase().name(), "SCRAM server state change");
        self.state = next;
    }

    pub(crate) fn record_client_first(&mut self,
                                      username: String,
                                      authzid: Option<String>,
                                      gs2_header: &str,
                                      client_first_bare: &str,
                                      client_nonce: &str) {
        self.username = Some(username);
        self.authzid = authzid;
        self.gs2_header = gs2_header.to_string();
        self.client_first_bare = client_first_bare.to_string();
        self.client_nonce = client_nonce.to_string();
        self.received_client_message = true;
    }

    pub(crate) fn set_credential(&mut self, credential: HashRecord, known_user: bool) {
        self.salt = credential.salt().to_vec();
        self.iterations = credential.cost();
        self.credential = Some(credential);
        self.known_user = known_user;
    }

    pub(crate) fn record_server_first(&mut self,
                                      server_nonce: String,
                                      combined_nonce: String,
                                      server_first: String) {
        self.server_nonce = server_nonce;
        self.combined_nonce = combined_nonce;
        self.server_first = server_first;
    }

    pub(crate) fn gs2_header(&self) -> &str {
        &self.gs2_header
    }

    pub(crate) fn client_first_bare(&self) -> &str {
        &self.client_first_bare
    }

    pub(crate) fn server_first(&self) -> &str {
        &self.server_first
    }

    pub(crate) fn credential(&self) -> Option<&HashRecord> {
        self.credential.as_ref()
    }

    pub(crate) fn known_user(&self) -> bool {
        self.known_user
    }
}
