//! Unix SHA-crypt credentials (`$5$` and `$6$`).
//!
//! The format is `key [rounds=N$] salt $ checksum`. Salt and checksum are kept as the crypt(3)
//! text tokens, which is what the primitive consumes and produces.

use pwhash::{sha256_crypt, sha512_crypt, HashSetup};
use rand::{CryptoRng, Rng, RngCore};
use tracing::trace;
use zeroize::Zeroizing;

use crate::codec::{is_crypt_symbol, split_delim};
use crate::error::{Error, Malformed};
use super::{HashRecord, Scheme};

/// Rounds used when the credential doesn't say otherwise.
pub const DEFAULT_ROUNDS: u32 = 5000;
/// Lowest accepted rounds value.
pub const MIN_ROUNDS: u32 = 1000;
/// Highest accepted rounds value.
pub const MAX_ROUNDS: u32 = 999_999_999;
/// Longest salt token.
pub const MAX_SALT_LEN: usize = 16;

const ROUNDS_PREFIX: &str = "rounds=";
const SALT_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// The digest function of a SHA-crypt scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaVariant {
    /// SHA-256, `$5$`
    Sha256,
    /// SHA-512, `$6$`
    Sha512,
}

impl ShaVariant {
    /// The scheme key of this variant.
    pub fn key(self) -> &'static str {
        match self {
            ShaVariant::Sha256 => "$5$",
            ShaVariant::Sha512 => "$6$",
        }
    }

    /// The scheme name of this variant.
    pub fn name(self) -> &'static str {
        match self {
            ShaVariant::Sha256 => "UNIX-SHA-256",
            ShaVariant::Sha512 => "UNIX-SHA-512",
        }
    }

    /// Length of the checksum token.
    pub fn digest_chars(self) -> usize {
        match self {
            ShaVariant::Sha256 => 43,
            ShaVariant::Sha512 => 86,
        }
    }
}

fn check_rounds(variant: ShaVariant, rounds: u32) -> Result<u32, Error> {
    if rounds < MIN_ROUNDS || rounds > MAX_ROUNDS {
        return Err(Error::malformed(variant.name(), Malformed::Rounds));
    }
    Ok(rounds)
}

fn check_salt(variant: ShaVariant, salt: &[u8]) -> Result<(), Error> {
    if salt.len() > MAX_SALT_LEN || !salt.iter().all(|b| is_crypt_symbol(*b)) {
        return Err(Error::malformed(variant.name(), Malformed::Salt));
    }
    Ok(())
}

pub(crate) fn parse(variant: ShaVariant, encoded: &str) -> Result<HashRecord, Error> {
    let malformed = |reason| Error::malformed(variant.name(), reason);

    let mut rest = encoded.strip_prefix(variant.key()).ok_or_else(|| malformed(Malformed::Prefix))?;
    let mut rounds = DEFAULT_ROUNDS;
    let explicit_rounds = rest.starts_with(ROUNDS_PREFIX);
    if explicit_rounds {
        let (value, tail) = split_delim(&rest[ROUNDS_PREFIX.len()..], '$')
            .ok_or_else(|| malformed(Malformed::Delimiter))?;
        // Leading zeroes wouldn't survive rendering.
        if value.is_empty() || value.starts_with('0') || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(Malformed::Rounds));
        }
        rounds = check_rounds(variant, value.parse().map_err(|_| malformed(Malformed::Rounds))?)?;
        rest = tail;
    }

    let (salt, digest) = split_delim(rest, '$').ok_or_else(|| malformed(Malformed::Delimiter))?;
    check_salt(variant, salt.as_bytes())?;
    if digest.len() != variant.digest_chars() || !digest.bytes().all(is_crypt_symbol) {
        return Err(malformed(Malformed::Digest));
    }

    Ok(HashRecord::new(Scheme::ShaCrypt(variant),
                       rounds,
                       salt.as_bytes().to_vec(),
                       digest.as_bytes().to_vec())
        .with_explicit_rounds(explicit_rounds))
}

pub(crate) fn render(variant: ShaVariant, record: &HashRecord) -> String {
    let salt = String::from_utf8_lossy(record.salt());
    let digest = String::from_utf8_lossy(record.digest());
    if record.explicit_rounds() || record.cost() != DEFAULT_ROUNDS {
        format!("{}{}{}${}${}", variant.key(), ROUNDS_PREFIX, record.cost(), salt, digest)
    } else {
        format!("{}{}${}", variant.key(), salt, digest)
    }
}

/// Recomputes the checksum token for `plaintext`.
///
/// `pwhash` marks `sha256_crypt` deprecated as a recommendation for new credentials. Existing
/// `$5$` credentials still have to be verified and issued, so the warning is silenced for that
/// one call.
pub(crate) fn compute_hash(variant: ShaVariant,
                           plaintext: &[u8],
                           salt: &[u8],
                           rounds: u32)
                           -> Result<Zeroizing<Vec<u8>>, Error> {
    check_salt(variant, salt)?;
    let rounds = check_rounds(variant, rounds)?;
    let salt = std::str::from_utf8(salt).map_err(|_| Error::malformed(variant.name(), Malformed::Salt))?;
    let setup = HashSetup {
        salt: Some(salt),
        rounds: Some(rounds),
    };
    trace!(scheme = variant.name(), rounds, "computing sha-crypt hash");
    let encoded = match variant {
        #[allow(deprecated)]
        ShaVariant::Sha256 => sha256_crypt::hash_with(setup, plaintext),
        ShaVariant::Sha512 => sha512_crypt::hash_with(setup, plaintext),
    };
    let encoded = Zeroizing::new(encoded.map_err(|e| Error::Primitive(e.to_string()))?);
    let record = parse(variant, &encoded)?;
    Ok(Zeroizing::new(record.digest().to_vec()))
}

pub(crate) fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Vec<u8> {
    (0..MAX_SALT_LEN)
        .map(|_| SALT_ALPHABET[rng.gen_range(0..SALT_ALPHABET.len())])
        .collect()
}

pub(crate) fn decoy_parts<R: RngCore + CryptoRng>(variant: ShaVariant,
                                                  seed: &[u8],
                                                  rng: &mut R)
                                                  -> (Vec<u8>, Vec<u8>) {
    let salt = seed.iter()
        .cycle()
        .take(MAX_SALT_LEN)
        .map(|b| SALT_ALPHABET[usize::from(b & 0x3f)])
        .collect();
    let digest = (0..variant.digest_chars())
        .map(|_| SALT_ALPHABET[rng.gen_range(0..SALT_ALPHABET.len())])
        .collect();
    (salt, digest)
}
