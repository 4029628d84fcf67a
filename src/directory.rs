//! The user directory the server consults for stored credentials.

use std::collections::HashMap;

use tracing::{debug, warn};

/// The result of a credential lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The encoded credential of the user.
    Found(String),
    /// The directory has no entry for the user.
    NotFound,
}

/// A `CredentialDirectory` looks up the encoded credential of a user, and also checks if a
/// user is authorized to act on another user's behalf. The authorization component is
/// optional, and if not implemented will simply allow users to act on their own behalf, and
/// no one else's.
///
/// New credentials can be produced with [`Verifier::issue`](../struct.Verifier.html#method.issue).
pub trait CredentialDirectory {
    /// Gets the encoded credential for the given user.
    fn lookup_credential(&self, username: &str) -> Lookup;

    /// Checks to see if the user given by `authcid` is authorized to act as the user given
    /// by `authzid`. The default implementation just checks if the two are equal.
    fn authorize(&self, authcid: &str, authzid: &str) -> bool {
        authcid == authzid
    }
}

impl<'a, D: CredentialDirectory + ?Sized> CredentialDirectory for &'a D {
    fn lookup_credential(&self, username: &str) -> Lookup {
        (**self).lookup_credential(username)
    }

    fn authorize(&self, authcid: &str, authzid: &str) -> bool {
        (**self).authorize(authcid, authzid)
    }
}

/// The outcome of loading directory lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of entries loaded.
    pub loaded: usize,
    /// 1-based numbers of the lines that were skipped as malformed.
    pub skipped: Vec<usize>,
}

impl LoadReport {
    /// Whether every non-blank line was loaded.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// An in-memory directory of `username -> encoded credential` entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    entries: HashMap<String, String>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        MemoryDirectory::default()
    }

    /// Adds or replaces the credential of `username`.
    pub fn insert<U: Into<String>, C: Into<String>>(&mut self, username: U, credential: C) {
        self.entries.insert(username.into(), credential.into());
    }

    /// Removes the entry of `username`, returning whether there was one.
    pub fn remove(&mut self, username: &str) -> bool {
        self.entries.remove(username).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses `username:credential` lines. Blank lines and lines starting with `#` are ignored;
    /// a line without `:` or with an empty username or credential is skipped and reported.
    /// Later lines replace earlier ones for the same user.
    pub fn load(text: &str) -> (Self, LoadReport) {
        let mut directory = MemoryDirectory::new();
        let mut report = LoadReport::default();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once(':') {
                Some((username, credential)) if !username.is_empty() && !credential.is_empty() => {
                    directory.insert(username, credential);
                    report.loaded += 1;
                }
                _ => {
                    // Never log the line itself, it may hold a credential.
                    warn!(line = index + 1, "skipping malformed directory entry");
                    report.skipped.push(index + 1);
                }
            }
        }
        debug!(loaded = report.loaded, skipped = report.skipped.len(), "loaded directory");
        (directory, report)
    }

    /// Renders the directory back into `username:credential` lines, sorted by username.
    pub fn to_lines(&self) -> String {
        let mut usernames: Vec<&String> = self.entries.keys().collect();
        usernames.sort();
        usernames
            .into_iter()
            .map(|username| format!("{}:{}\n", username, self.entries[username]))
            .collect()
    }
}

impl CredentialDirectory for MemoryDirectory {
    fn lookup_credential(&self, username: &str) -> Lookup {
        match self.entries.get(username) {
            Some(credential) => Lookup::Found(credential.clone()),
            None => Lookup::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: &str = "\
# users
alice:$6$DVW4laGf$QwTuOOtd.1G3u2fs8d5/OtcQ73qTbwA.oAC1XWTmkkjrvDLEJ2WweTcBdxRkzfjQVfZCw3OVVBAMsIGMkH3On/
broken line

:$6$nouser$x
bob:$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW
carol:
";

    #[test]
    fn test_load_reports_skipped_lines() {
        let (directory, report) = MemoryDirectory::load(LINES);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, vec![3, 5, 7]);
        assert!(!report.is_clean());
        assert_eq!(directory.len(), 2);
        assert!(matches!(directory.lookup_credential("alice"), Lookup::Found(ref c) if c.starts_with("$6$")));
        assert_eq!(directory.lookup_credential("carol"), Lookup::NotFound);
    }

    #[test]
    fn test_lines_round_trip() {
        let (directory, _) = MemoryDirectory::load(LINES);
        let (reloaded, report) = MemoryDirectory::load(&directory.to_lines());
        assert!(report.is_clean());
        assert_eq!(reloaded.lookup_credential("bob"), directory.lookup_credential("bob"));
        assert_eq!(reloaded.to_lines(), directory.to_lines());
    }

    #[test]
    fn test_default_authorization() {
        let directory = MemoryDirectory::new();
        assert!(directory.authorize("user", "user"));
        assert!(!directory.authorize("user", "admin"));
        assert!((&directory).authorize("user", "user"));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut directory = MemoryDirectory::new();
        assert!(directory.is_empty());
        directory.insert("dave", "$5$abc$def");
        assert_eq!(directory.lookup_credential("dave"), Lookup::Found("$5$abc$def".into()));
        assert!(directory.remove("dave"));
        assert!(!directory.remove("dave"));
    }
}
