//! Credential management for Orderly API authentication.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// API credentials for an Orderly account.
#[derive(Clone)]
pub struct Credentials {
    /// The account id the credentials belong to (a 32-byte hex string)
    pub account_id: String,
    /// The base58-encoded Ed25519 public key, without the `ed25519:` prefix
    pub orderly_key: String,
    /// The base58-encoded Ed25519 private key (private, used for signing)
    orderly_secret: SecretString,
}

impl Credentials {
    /// Create new credentials from an account id, orderly key and secret.
    pub fn new(
        account_id: impl Into<String>,
        orderly_key: impl Into<String>,
        orderly_secret: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            orderly_key: orderly_key.into(),
            orderly_secret: SecretString::from(orderly_secret.into()),
        }
    }

    /// Get the orderly secret for signing.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_secret(&self) -> &str {
        self.orderly_secret.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("orderly_key", &self.orderly_key)
            .field("orderly_secret", &"[REDACTED]")
            .finish()
    }
}

/// Trait for providing API credentials.
///
/// Implement this trait to customize how credentials are retrieved,
/// for example from a secrets manager or environment variables.
pub trait CredentialsProvider: Send + Sync {
    /// Get the credentials.
    fn get_credentials(&self) -> &Credentials;
}

/// Static credentials provider that holds credentials directly.
#[derive(Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    /// Create a new static credentials provider.
    pub fn new(
        account_id: impl Into<String>,
        orderly_key: impl Into<String>,
        orderly_secret: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(account_id, orderly_key, orderly_secret),
        }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl CredentialsProvider for Arc<StaticCredentials> {
    fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// Credentials provider that reads from environment variables.
///
/// By default, reads from `ORDERLY_ACCOUNT_ID`, `ORDERLY_KEY` and `ORDERLY_SECRET`.
pub struct EnvCredentials {
    credentials: Credentials,
}

impl EnvCredentials {
    /// Create credentials from default environment variables.
    ///
    /// Reads `ORDERLY_ACCOUNT_ID`, `ORDERLY_KEY` and `ORDERLY_SECRET`.
    ///
    /// # Panics
    ///
    /// Panics if the environment variables are not set.
    pub fn from_env() -> Self {
        Self::from_env_vars("ORDERLY_ACCOUNT_ID", "ORDERLY_KEY", "ORDERLY_SECRET")
    }

    /// Create credentials from custom environment variable names.
    ///
    /// # Panics
    ///
    /// Panics if the environment variables are not set.
    pub fn from_env_vars(account_var: &str, key_var: &str, secret_var: &str) -> Self {
        let account_id = std::env::var(account_var)
            .unwrap_or_else(|_| panic!("Environment variable {account_var} not set"));
        let orderly_key = std::env::var(key_var)
            .unwrap_or_else(|_| panic!("Environment variable {key_var} not set"));
        let orderly_secret = std::env::var(secret_var)
            .unwrap_or_else(|_| panic!("Environment variable {secret_var} not set"));

        Self {
            credentials: Credentials::new(account_id, orderly_key, orderly_secret),
        }
    }

    /// Try to create credentials from default environment variables.
    ///
    /// Returns `None` if any of the environment variables are not set.
    pub fn try_from_env() -> Option<Self> {
        Self::try_from_env_vars("ORDERLY_ACCOUNT_ID", "ORDERLY_KEY", "ORDERLY_SECRET")
    }

    /// Try to create credentials from custom environment variable names.
    ///
    /// Returns `None` if any of the environment variables are not set.
    pub fn try_from_env_vars(account_var: &str, key_var: &str, secret_var: &str) -> Option<Self> {
        let account_id = std::env::var(account_var).ok()?;
        let orderly_key = std::env::var(key_var).ok()?;
        let orderly_secret = std::env::var(secret_var).ok()?;

        Some(Self {
            credentials: Credentials::new(account_id, orderly_key, orderly_secret),
        })
    }
}

impl CredentialsProvider for EnvCredentials {
    fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }
}
