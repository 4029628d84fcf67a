//! # Password hash schemes and a SCRAM server backed by them
//!
//! This crate reads, writes and verifies the crypt(3) style credentials found in user
//! directories: OpenBSD bcrypt (`$2a$`, `$2b$`, `$2y$`) and Unix SHA-crypt (`$5$`, `$6$`).
//! On top of that it provides the server side of a SCRAM exchange (RFC5802) that authenticates
//! clients against those stored hashes. It doesn't support channel-binding.
//!
//! # Usage
//!
//! Credentials are parsed and checked through a [`Verifier`](struct.Verifier.html), which
//! dispatches on the scheme key through a [`SchemeRegistry`](struct.SchemeRegistry.html).
//!
//! The server and the client exchange four messages. A
//! [`ServerSession`](struct.ServerSession.html) handles the client's messages with
//! [`handle_response`](struct.ServerSession.html#method.handle_response) and yields its own
//! with [`produce_challenge`](struct.ServerSession.html#method.produce_challenge). Any error
//! returned means that the authentication attempt wasn't successful; the session then has an
//! `e=` message ready for the client.
//!
//! The salt and iteration count of the challenge are those of the stored credential, and the
//! stored digest takes the place of the SCRAM salted password. A client therefore has to know
//! the scheme of its credential to compute the proof.
//!
//! ``` rust,ignore
//! use std::sync::Arc;
//! use credential_scram::{MemoryDirectory, SchemeRegistry, ScramServer, Verifier};
//!
//! // This function represents your I/O implementation.
//! fn send_and_receive(message: &str) -> String {
//!     unimplemented!()
//! }
//!
//! let verifier = Verifier::new(Arc::new(SchemeRegistry::with_defaults()));
//! let mut directory = MemoryDirectory::new();
//! directory.insert("user", verifier.issue("password", "$6$").unwrap());
//!
//! let server = ScramServer::new(verifier, directory);
//! let mut session = server.start();
//!
//! let client_first = send_and_receive("");
//! session.handle_response(&client_first).unwrap();
//! let server_first = session.produce_challenge().unwrap().unwrap();
//!
//! let client_final = send_and_receive(&server_first.to_string());
//! let result = session.handle_response(&client_final);
//! let server_final = session.produce_challenge().unwrap().unwrap();
//! send_and_receive(&server_final.to_string());
//!
//! assert!(result.is_ok() && session.is_complete());
//! ```

pub mod codec;
mod config;
mod directory;
mod error;
mod message;
pub mod scheme;
mod server;
mod utils;
mod verifier;

pub use crate::config::Config;
pub use crate::directory::{CredentialDirectory, LoadReport, Lookup, MemoryDirectory};
pub use crate::error::{Error, Field, Kind, Malformed};
pub use crate::message::{Attribute, ChallengeResponse};
pub use crate::scheme::registry::{Registration, SchemeRegistry};
pub use crate::scheme::{BcryptVersion, HashRecord, Scheme, ShaVariant};
pub use crate::server::{Phase, ScramServer, ServerSession, SessionContext};
pub use crate::utils::{auth_message, find_proofs};
pub use crate::verifier::Verifier;

/// The length of the server nonce in characters/bytes.
pub const DEFAULT_NONCE_LENGTH: usize = 48;
