//! Password hash schemes and their on-disk framing.
//!
//! Each [`Scheme`] variant parses, renders and recomputes one family of encoded credentials.
//! The digest computation itself is delegated to `pwhash`; this module only deals with keys,
//! field widths, alphabets and costs.

pub mod bcrypt;
pub mod registry;
pub mod sha_crypt;

use std::fmt;

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::Error;

pub use self::bcrypt::BcryptVersion;
pub use self::sha_crypt::ShaVariant;

/// The decoded structure of an encoded credential.
///
/// Records never change after construction. Salt and digest are wiped when the record is
/// dropped, and the `Debug` output omits the digest.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HashRecord {
    #[zeroize(skip)]
    scheme: Scheme,
    #[zeroize(skip)]
    cost: u32,
    #[zeroize(skip)]
    explicit_rounds: bool,
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl HashRecord {
    pub(crate) fn new(scheme: Scheme, cost: u32, salt: Vec<u8>, digest: Vec<u8>) -> Self {
        HashRecord {
            scheme,
            cost,
            explicit_rounds: false,
            salt,
            digest,
        }
    }

    pub(crate) fn with_explicit_rounds(mut self, explicit_rounds: bool) -> Self {
        self.explicit_rounds = explicit_rounds;
        self
    }

    /// The scheme that produced this record.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The scheme defined work factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// The salt, in the representation the scheme's `compute_hash` expects.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The stored digest.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Whether a SHA-crypt credential spelled out its `rounds=` field.
    pub fn explicit_rounds(&self) -> bool {
        self.explicit_rounds
    }

    /// Renders the record back into its encoded credential.
    pub fn render(&self) -> String {
        self.scheme.render(self)
    }
}

impl fmt::Debug for HashRecord {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("HashRecord")
            .field("scheme", &self.scheme.key())
            .field("cost", &self.cost)
            .field("salt_len", &self.salt.len())
            .field("digest_len", &self.digest.len())
            .finish()
    }
}

/// The supported credential formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// OpenBSD bcrypt, `$2a$`, `$2b$` or `$2y$`.
    Bcrypt(BcryptVersion),
    /// Unix SHA-crypt, `$5$` or `$6$`.
    ShaCrypt(ShaVariant),
}

impl Scheme {
    /// Every scheme this crate implements.
    pub const ALL: [Scheme; 5] = [
        Scheme::Bcrypt(BcryptVersion::V2a),
        Scheme::Bcrypt(BcryptVersion::V2b),
        Scheme::Bcrypt(BcryptVersion::V2y),
        Scheme::ShaCrypt(ShaVariant::Sha256),
        Scheme::ShaCrypt(ShaVariant::Sha512),
    ];

    /// The literal prefix identifying the scheme, e.g. `"$2a$"`.
    pub fn key(self) -> &'static str {
        match self {
            Scheme::Bcrypt(version) => version.key(),
            Scheme::ShaCrypt(variant) => variant.key(),
        }
    }

    /// A human readable name.
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Bcrypt(version) => version.name(),
            Scheme::ShaCrypt(variant) => variant.name(),
        }
    }

    /// Parses an encoded credential of this scheme.
    pub fn parse(self, encoded: &str) -> Result<HashRecord, Error> {
        match self {
            Scheme::Bcrypt(version) => bcrypt::parse(version, encoded),
            Scheme::ShaCrypt(variant) => sha_crypt::parse(variant, encoded),
        }
    }

    /// Hashes `plaintext` with the given salt and cost. The result has the representation of
    /// [`HashRecord::digest`](struct.HashRecord.html#method.digest) and is identical for
    /// identical inputs.
    pub fn compute_hash(self,
                        plaintext: &[u8],
                        salt: &[u8],
                        cost: u32)
                        -> Result<Zeroizing<Vec<u8>>, Error> {
        match self {
            Scheme::Bcrypt(version) => bcrypt::compute_hash(version, plaintext, salt, cost),
            Scheme::ShaCrypt(variant) => sha_crypt::compute_hash(variant, plaintext, salt, cost),
        }
    }

    /// Creates a record for `plaintext` with a fresh salt drawn from `rng`.
    ///
    /// Please only use a cryptographically secure random number generator.
    pub fn create_new<R: RngCore + CryptoRng>(self,
                                             plaintext: &[u8],
                                             cost: u32,
                                             rng: &mut R)
                                             -> Result<HashRecord, Error> {
        let salt = match self {
            Scheme::Bcrypt(_) => bcrypt::generate_salt(rng),
            Scheme::ShaCrypt(_) => sha_crypt::generate_salt(rng),
        };
        let digest = self.compute_hash(plaintext, &salt, cost)?;
        Ok(HashRecord::new(self, cost, salt, digest.to_vec()))
    }

    /// Fabricates a record for a user that doesn't exist. The salt is derived from `seed`, so
    /// it stays the same for repeated attempts on the same name. The digest is random.
    pub(crate) fn decoy<R: RngCore + CryptoRng>(self,
                                               seed: &[u8],
                                               cost: u32,
                                               rng: &mut R)
                                               -> HashRecord {
        let (salt, digest) = match self {
            Scheme::Bcrypt(_) => bcrypt::decoy_parts(seed, rng),
            Scheme::ShaCrypt(variant) => sha_crypt::decoy_parts(variant, seed, rng),
        };
        HashRecord::new(self, cost, salt, digest)
    }

    /// Renders `record` in this scheme's framing.
    pub fn render(self, record: &HashRecord) -> String {
        match self {
            Scheme::Bcrypt(version) => bcrypt::render(version, record),
            Scheme::ShaCrypt(variant) => sha_crypt::render(variant, record),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

/// Returns the `$tag$` prefix of `encoded` without revealing anything after it.
pub(crate) fn scheme_tag(encoded: &str) -> &str {
    if !encoded.starts_with('$') {
        return "";
    }
    match encoded[1..].find('$') {
        Some(end) => &encoded[..end + 2],
        None => "",
    }
}
