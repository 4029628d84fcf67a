use std::sync::Arc;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use ring::constant_time::verify_slices_are_equal;
use tracing::{debug, warn};

use crate::directory::{CredentialDirectory, Lookup};
use crate::error::Error;
use crate::scheme::registry::SchemeRegistry;
use crate::scheme::{HashRecord, Scheme};

/// Checks candidate passwords against encoded credentials and issues new credentials.
///
/// Cloning is cheap; all clones share one read-only registry.
#[derive(Clone, Debug)]
pub struct Verifier {
    registry: Arc<SchemeRegistry>,
}

impl Verifier {
    /// Creates a verifier dispatching through `registry`.
    pub fn new(registry: Arc<SchemeRegistry>) -> Self {
        Verifier { registry }
    }

    /// The registry this verifier dispatches through.
    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Finds the scheme of an encoded credential.
    pub fn identify(&self, encoded: &str) -> Result<Scheme, Error> {
        self.registry.identify(encoded)
    }

    /// Decodes an encoded credential into its fields.
    pub fn parse(&self, encoded: &str) -> Result<HashRecord, Error> {
        self.registry.parse(encoded)
    }

    /// Checks `plaintext` against a parsed credential. The digests are compared in constant
    /// time.
    pub fn verify_record(&self, plaintext: &str, record: &HashRecord) -> Result<bool, Error> {
        let scheme = record.scheme();
        let digest = scheme.compute_hash(plaintext.as_bytes(), record.salt(), record.cost())?;
        Ok(verify_slices_are_equal(&digest, record.digest()).is_ok())
    }

    /// Checks `plaintext` against an encoded credential.
    ///
    /// # Return value
    ///
    /// `Ok(false)` for a wrong password; an error if the credential can't be parsed or hashed.
    pub fn verify(&self, plaintext: &str, encoded: &str) -> Result<bool, Error> {
        let record = self.parse(encoded)?;
        self.verify_record(plaintext, &record)
    }

    /// Looks `username` up in `directory` and checks `plaintext` against the stored credential.
    ///
    /// Returns `Error::NoSuchUser` or `Error::Authentication` on failure. Both report `true`
    /// from [`Error::is_authentication_failure`](enum.Error.html#method.is_authentication_failure)
    /// and must be answered identically towards the client.
    pub fn verify_user<D: CredentialDirectory + ?Sized>(&self,
                                                        directory: &D,
                                                        username: &str,
                                                        plaintext: &str)
                                                        -> Result<(), Error> {
        let encoded = match directory.lookup_credential(username) {
            Lookup::Found(encoded) => encoded,
            Lookup::NotFound => {
                debug!(username, "no credential in directory");
                return Err(Error::NoSuchUser(username.to_string()));
            }
        };
        if self.verify(plaintext, &encoded)? {
            Ok(())
        } else {
            warn!(username, "password verification failed");
            Err(Error::Authentication)
        }
    }

    /// Creates a new encoded credential for `plaintext` using the scheme registered under
    /// `key` and its configured cost. The salt comes from the operating system.
    pub fn issue(&self, plaintext: &str, key: &str) -> Result<String, Error> {
        self.issue_with_rng(plaintext, key, &mut OsRng)
    }

    /// Like [`issue`](#method.issue), with a custom source of randomness for the salt. Please
    /// only use a cryptographically secure random number generator!
    pub fn issue_with_rng<R: RngCore + CryptoRng>(&self,
                                                 plaintext: &str,
                                                 key: &str,
                                                 rng: &mut R)
                                                 -> Result<String, Error> {
        let registration = self.registry.lookup(key)?;
        let record = registration.scheme()
            .create_new(plaintext.as_bytes(), registration.default_cost(), rng)?;
        Ok(record.render())
    }
}
