//! bcrypt credentials.
//!
//! The format is `$2a$` + two digit cost + `$` + 22 symbols of salt + 31 symbols of digest,
//! both in the bcrypt radix-64 alphabet. The salt decodes to 16 bytes and the digest to 23.

use pwhash::bcrypt::{self as primitive, BcryptSetup, BcryptVariant};
use rand::{CryptoRng, RngCore};
use tracing::trace;
use zeroize::Zeroizing;

use crate::codec::{decode_radix64, encode_radix64, split_chars, split_delim};
use crate::error::{Error, Malformed};
use super::{HashRecord, Scheme};

/// Decoded salt length.
pub const SALT_LEN: usize = 16;
/// Encoded salt length.
pub const SALT_CHARS: usize = 22;
/// Decoded digest length.
pub const DIGEST_LEN: usize = 23;
/// Encoded digest length.
pub const DIGEST_CHARS: usize = 31;
/// Lowest accepted log2 cost.
pub const MIN_COST: u32 = 4;
/// Highest accepted log2 cost.
pub const MAX_COST: u32 = 31;
/// Cost of newly issued credentials.
pub const DEFAULT_COST: u32 = 12;

/// The bcrypt version tag. It is part of the scheme key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BcryptVersion {
    /// `$2a$`
    V2a,
    /// `$2b$`
    V2b,
    /// `$2y$`
    V2y,
}

impl BcryptVersion {
    /// The scheme key of this version.
    pub fn key(self) -> &'static str {
        match self {
            BcryptVersion::V2a => "$2a$",
            BcryptVersion::V2b => "$2b$",
            BcryptVersion::V2y => "$2y$",
        }
    }

    /// The scheme name of this version.
    pub fn name(self) -> &'static str {
        match self {
            BcryptVersion::V2a => "BCrypt-2a",
            BcryptVersion::V2b => "BCrypt-2b",
            BcryptVersion::V2y => "BCrypt-2y",
        }
    }

    fn variant(self) -> BcryptVariant {
        match self {
            BcryptVersion::V2a => BcryptVariant::V2a,
            BcryptVersion::V2b => BcryptVariant::V2b,
            BcryptVersion::V2y => BcryptVariant::V2y,
        }
    }
}

fn check_cost(version: BcryptVersion, cost: u32) -> Result<u32, Error> {
    if cost < MIN_COST || cost > MAX_COST {
        return Err(Error::malformed(version.name(), Malformed::Cost));
    }
    Ok(cost)
}

pub(crate) fn parse(version: BcryptVersion, encoded: &str) -> Result<HashRecord, Error> {
    let malformed = |reason| Error::malformed(version.name(), reason);

    let rest = encoded.strip_prefix(version.key()).ok_or_else(|| malformed(Malformed::Prefix))?;
    let (cost, rest) = split_delim(rest, '$').ok_or_else(|| malformed(Malformed::Delimiter))?;
    if cost.len() != 2 || !cost.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(Malformed::Cost));
    }
    let cost = check_cost(version, cost.parse().map_err(|_| malformed(Malformed::Cost))?)?;

    let (salt, digest) = split_chars(rest, SALT_CHARS).ok_or_else(|| malformed(Malformed::Salt))?;
    let salt = decode_radix64(salt).ok_or_else(|| malformed(Malformed::Salt))?;
    if digest.len() != DIGEST_CHARS {
        return Err(malformed(Malformed::Digest));
    }
    let digest = decode_radix64(digest).ok_or_else(|| malformed(Malformed::Digest))?;

    Ok(HashRecord::new(Scheme::Bcrypt(version), cost, salt, digest))
}

pub(crate) fn render(version: BcryptVersion, record: &HashRecord) -> String {
    format!("{}{:02}${}{}",
            version.key(),
            record.cost(),
            encode_radix64(record.salt()),
            encode_radix64(record.digest()))
}

pub(crate) fn compute_hash(version: BcryptVersion,
                           plaintext: &[u8],
                           salt: &[u8],
                           cost: u32)
                           -> Result<Zeroizing<Vec<u8>>, Error> {
    if salt.len() != SALT_LEN {
        return Err(Error::malformed(version.name(), Malformed::Salt));
    }
    let cost = check_cost(version, cost)?;
    let salt = encode_radix64(salt);
    let setup = BcryptSetup {
        salt: Some(salt.as_str()),
        cost: Some(cost),
        variant: Some(version.variant()),
    };
    trace!(scheme = version.name(), cost, "computing bcrypt hash");
    let encoded = Zeroizing::new(primitive::hash_with(setup, plaintext)
        .map_err(|e| Error::Primitive(e.to_string()))?);
    let record = parse(version, &encoded)?;
    Ok(Zeroizing::new(record.digest().to_vec()))
}

pub(crate) fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    salt
}

pub(crate) fn decoy_parts<R: RngCore + CryptoRng>(seed: &[u8], rng: &mut R) -> (Vec<u8>, Vec<u8>) {
    let salt = seed.iter().cycle().take(SALT_LEN).cloned().collect();
    let mut digest = vec![0u8; DIGEST_LEN];
    rng.fill_bytes(&mut digest);
    (salt, digest)
}
