use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use super::{scheme_tag, BcryptVersion, HashRecord, Scheme, ShaVariant};

/// A scheme together with the cost used when issuing new credentials for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registration {
    scheme: Scheme,
    default_cost: u32,
}

impl Registration {
    /// The registered scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The literal prefix the scheme is registered under.
    pub fn key(&self) -> &'static str {
        self.scheme.key()
    }

    /// Cost applied to credentials created through the registry.
    pub fn default_cost(&self) -> u32 {
        self.default_cost
    }
}

/// Maps credential prefixes to schemes.
///
/// Build the registry once at startup and share it read-only, usually through an `Arc` handed
/// to [`Verifier::new`](../../struct.Verifier.html#method.new).
#[derive(Clone, Debug, Default)]
pub struct SchemeRegistry {
    registrations: Vec<Registration>,
}

impl SchemeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        SchemeRegistry::default()
    }

    /// Creates a registry with every scheme of this crate and their default costs.
    pub fn with_defaults() -> Self {
        SchemeRegistry::from_config(&Config::default())
    }

    /// Creates a registry with every scheme of this crate, taking the costs from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = SchemeRegistry::new();
        for version in &[BcryptVersion::V2a, BcryptVersion::V2b, BcryptVersion::V2y] {
            registry.register(Scheme::Bcrypt(*version), config.bcrypt_cost);
        }
        for variant in &[ShaVariant::Sha256, ShaVariant::Sha512] {
            registry.register(Scheme::ShaCrypt(*variant), config.sha_crypt_rounds);
        }
        registry
    }

    /// Registers `scheme` under its key, replacing an earlier registration of the same key.
    pub fn register(&mut self, scheme: Scheme, default_cost: u32) -> &mut Self {
        let registration = Registration { scheme, default_cost };
        match self.registrations.iter_mut().find(|r| r.key() == scheme.key()) {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
        self
    }

    /// All registrations in registration order.
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Looks up the registration for an exact scheme key such as `"$6$"`.
    pub fn lookup(&self, key: &str) -> Result<&Registration, Error> {
        self.registrations
            .iter()
            .find(|r| r.key() == key)
            .ok_or_else(|| Error::UnknownScheme(key.to_string()))
    }

    /// Finds the scheme of an encoded credential. The longest matching key wins.
    pub fn identify(&self, encoded: &str) -> Result<Scheme, Error> {
        let scheme = self.registrations
            .iter()
            .filter(|r| encoded.starts_with(r.key()))
            .max_by_key(|r| r.key().len())
            .map(|r| r.scheme)
            .ok_or_else(|| Error::UnknownScheme(scheme_tag(encoded).to_string()))?;
        debug!(scheme = scheme.name(), "identified credential scheme");
        Ok(scheme)
    }

    /// Identifies the scheme of `encoded` and parses it.
    pub fn parse(&self, encoded: &str) -> Result<HashRecord, Error> {
        self.identify(encoded)?.parse(encoded)
    }
}
