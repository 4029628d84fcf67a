use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Field, Kind};

/// The single-letter attributes of SCRAM messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// `n`, the user name.
    Username,
    /// `r`, the client or combined nonce.
    Nonce,
    /// `s`, the base64 salt.
    Salt,
    /// `i`, the iteration count.
    IterationCount,
    /// `c`, the base64 channel binding header.
    ChannelBinding,
    /// `p`, the base64 client proof.
    Proof,
    /// `v`, the base64 server signature.
    Verifier,
    /// `e`, a server error.
    Error,
}

impl Attribute {
    /// The wire key of the attribute.
    pub fn code(self) -> char {
        match self {
            Attribute::Username => 'n',
            Attribute::Nonce => 'r',
            Attribute::Salt => 's',
            Attribute::IterationCount => 'i',
            Attribute::ChannelBinding => 'c',
            Attribute::Proof => 'p',
            Attribute::Verifier => 'v',
            Attribute::Error => 'e',
        }
    }

    /// Maps a wire key back to the attribute.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'n' => Some(Attribute::Username),
            'r' => Some(Attribute::Nonce),
            's' => Some(Attribute::Salt),
            'i' => Some(Attribute::IterationCount),
            'c' => Some(Attribute::ChannelBinding),
            'p' => Some(Attribute::Proof),
            'v' => Some(Attribute::Verifier),
            'e' => Some(Attribute::Error),
            _ => None,
        }
    }

    /// The error field reported when the attribute is missing or invalid.
    pub fn field(self) -> Field {
        match self {
            Attribute::Username => Field::Authcid,
            Attribute::Nonce => Field::Nonce,
            Attribute::Salt => Field::Salt,
            Attribute::IterationCount => Field::Iterations,
            Attribute::ChannelBinding => Field::ChannelBinding,
            Attribute::Proof => Field::Proof,
            Attribute::Verifier | Attribute::Error => Field::VerifyOrError,
        }
    }
}

/// An ordered list of `key=value` attributes, the body of every SCRAM message.
///
/// Keys are unique and keep their insertion order, which is also the order they are
/// serialized in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChallengeResponse {
    attributes: Vec<(Attribute, String)>,
}

impl ChallengeResponse {
    /// Creates an empty message.
    pub fn new() -> Self {
        ChallengeResponse::default()
    }

    /// Sets `attribute`. An existing value is replaced in place, keeping its position.
    ///
    /// Values must not contain `,`, or the rendered message would not parse back.
    pub fn put<V: Into<String>>(&mut self, attribute: Attribute, value: V) -> &mut Self {
        let value = value.into();
        debug_assert!(!value.contains(','), "attribute values can't contain ','");
        match self.attributes.iter_mut().find(|(a, _)| *a == attribute) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((attribute, value)),
        }
        self
    }

    /// Gets the value of `attribute`.
    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, v)| v.as_str())
    }

    /// Gets the value of `attribute` or fails with `ExpectedField`.
    pub fn require(&self, attribute: Attribute) -> Result<&str, Error> {
        self.get(attribute).ok_or(Error::Protocol(Kind::ExpectedField(attribute.field())))
    }

    /// The attributes in order.
    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.attributes.iter().map(|(a, _)| *a)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the message has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Parses a comma separated attribute list. The empty string is the empty message.
    ///
    /// Values may contain `=`; everything after the first `=` belongs to the value.
    pub fn parse(data: &str) -> Result<Self, Error> {
        let mut message = ChallengeResponse::new();
        if data.is_empty() {
            return Ok(message);
        }
        for part in data.split(',') {
            let mut chars = part.chars();
            let code = chars.next().ok_or(Error::Protocol(Kind::MalformedAttribute))?;
            if chars.next() != Some('=') {
                return Err(Error::Protocol(Kind::MalformedAttribute));
            }
            let attribute = Attribute::from_code(code)
                .ok_or(Error::Protocol(Kind::UnknownAttribute(code)))?;
            if message.get(attribute).is_some() {
                return Err(Error::Protocol(Kind::DuplicateField(attribute.field())));
            }
            message.attributes.push((attribute, chars.as_str().to_string()));
        }
        Ok(message)
    }
}

impl FromStr for ChallengeResponse {
    type Err = Error;

    fn from_str(data: &str) -> Result<Self, Error> {
        ChallengeResponse::parse(data)
    }
}

impl fmt::Display for ChallengeResponse {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (attribute, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                fmt.write_str(",")?;
            }
            write!(fmt, "{}={}", attribute.code(), value)?;
        }
        Ok(())
    }
}
