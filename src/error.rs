use thiserror::Error;

/// The error cases of credential handling and the SCRAM mechanism.
#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// No registered scheme matches the credential. Contains the `$tag$` prefix only.
    #[error("no registered hash scheme for prefix '{0}'")]
    UnknownScheme(String),
    /// The credential text violates the fixed grammar of its scheme.
    #[error("malformed {scheme} credential: {reason}")]
    MalformedHash {
        /// Name of the scheme whose grammar was violated.
        scheme: &'static str,
        /// The part of the credential that was rejected.
        reason: Malformed,
    },
    /// The underlying hash primitive refused its input.
    #[error("hash primitive failed: {0}")]
    Primitive(String),
    /// The recomputed digest or proof didn't match.
    #[error("authentication failed")]
    Authentication,
    /// The user authenticated but may not act as the requested authorization identity.
    #[error("user '{authcid}' not authorized to act as '{authzid}'")]
    Authorization {
        /// The authenticated user.
        authcid: String,
        /// The requested authorization identity.
        authzid: String,
    },
    /// The directory has no credential for this user. Never report this to a client.
    #[error("no such user: '{0}'")]
    NoSuchUser(String),
    /// A message arrived in a state that doesn't expect one.
    #[error("message not expected in {0} state")]
    ProtocolSequence(&'static str),
    /// A message wasn't formatted as required. `Kind` contains further information.
    ///
    /// RFC5802 section 7 describes the format of the exchanged messages.
    #[error("{0}")]
    Protocol(Kind),
    /// The client required channel binding, which this server doesn't support.
    #[error("unsupported extension")]
    UnsupportedExtension,
}

impl Error {
    /// Returns `true` for the failures a client must not be able to tell apart: a wrong
    /// password and an unknown user.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(*self, Error::Authentication | Error::NoSuchUser(_))
    }

    pub(crate) fn malformed(scheme: &'static str, reason: Malformed) -> Self {
        Error::MalformedHash { scheme, reason }
    }
}

/// The part of an encoded credential that failed to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Malformed {
    /// The scheme key is missing.
    #[error("missing scheme prefix")]
    Prefix,
    /// The cost field isn't a two digit number in range.
    #[error("invalid cost")]
    Cost,
    /// The `rounds=` field isn't a decimal number in range.
    #[error("invalid rounds")]
    Rounds,
    /// A `$` separator is missing.
    #[error("missing delimiter")]
    Delimiter,
    /// The salt has the wrong length or alphabet.
    #[error("invalid salt")]
    Salt,
    /// The digest has the wrong length or alphabet.
    #[error("invalid digest")]
    Digest,
}

/// The kinds of protocol errors.
#[derive(Debug, PartialEq, Error)]
pub enum Kind {
    /// The client echoed a nonce that isn't the combined nonce.
    #[error("Invalid nonce")]
    InvalidNonce,
    /// The content of the field `Field` is invalid.
    #[error("Invalid field {0:?}")]
    InvalidField(Field),
    /// The field `Field` was expected but not found.
    #[error("Expected field {0:?}")]
    ExpectedField(Field),
    /// The attribute key isn't one of the known single-letter keys.
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(char),
    /// An attribute isn't of the form `k=value`.
    #[error("Malformed attribute")]
    MalformedAttribute,
    /// The field `Field` occurs more than once.
    #[error("Duplicate field {0:?}")]
    DuplicateField(Field),
}

/// The fields used in the exchanged messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// Nonce
    Nonce,
    /// Salt
    Salt,
    /// Iterations
    Iterations,
    /// Verify or Error
    VerifyOrError,
    /// Channel Binding
    ChannelBinding,
    /// Authtorization ID
    Authzid,
    /// Authcid
    Authcid,
    /// Client Proof
    Proof,
}
