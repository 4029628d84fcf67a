use crate::scheme::{bcrypt, sha_crypt};
use crate::DEFAULT_NONCE_LENGTH;

/// Tunables for issuing credentials and running SCRAM sessions.
///
/// Loading these from a file is left to the host; `Config::default()` matches the crate
/// constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Number of printable characters the server appends to the client nonce.
    pub nonce_length: usize,
    /// log2 cost of newly issued bcrypt credentials.
    pub bcrypt_cost: u32,
    /// Rounds of newly issued SHA-crypt credentials.
    pub sha_crypt_rounds: u32,
    /// Scheme key used to fabricate challenges for unknown users. It should match the scheme
    /// most real users have, or the salt format gives the lookup miss away.
    pub decoy_scheme: &'static str,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nonce_length: DEFAULT_NONCE_LENGTH,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            sha_crypt_rounds: sha_crypt::DEFAULT_ROUNDS,
            decoy_scheme: "$6$",
        }
    }
}
