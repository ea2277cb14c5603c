//! Authentication module for the Orderly API.
//!
//! This module provides:
//! - Credential management with secure secret storage
//! - Millisecond timestamp generation for request signing
//! - Ed25519 signature generation for authenticated requests

mod credentials;
mod signer;
mod timestamp;

pub use credentials::{Credentials, CredentialsProvider, EnvCredentials, StaticCredentials};
pub use signer::RequestSigner;
pub use timestamp::{SystemTimestamp, TimestampProvider};
