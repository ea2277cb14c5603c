//! Ed25519 signature generation for Orderly API authentication.
//!
//! Orderly authenticates with Ed25519 key pairs. The private key is
//! distributed as a base58 string whose decoded form starts with the 32-byte
//! signing seed. Signatures are base64-encoded and sent in the
//! `orderly-signature` header (REST) or the `sign` field of the WebSocket
//! auth message.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signature, Signer, SigningKey};

use crate::error::OrderlyError;

/// Signs request payloads with an Orderly account's Ed25519 key.
#[derive(Clone)]
pub struct RequestSigner {
    signing_key: SigningKey,
}

impl RequestSigner {
    /// Create a signer from a base58-encoded orderly secret.
    ///
    /// The first 32 bytes of the decoded secret are the Ed25519 seed; any
    /// trailing bytes (some encodings append the public key) are ignored.
    pub fn from_base58_secret(orderly_secret: &str) -> Result<Self, OrderlyError> {
        let decoded = bs58::decode(orderly_secret)
            .into_vec()
            .map_err(|e| OrderlyError::Auth(format!("orderly secret is not valid base58: {e}")))?;

        if decoded.len() < 32 {
            return Err(OrderlyError::Auth(format!(
                "orderly secret decodes to {} bytes, need at least 32",
                decoded.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&decoded[..32]);

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Sign a message, returning the raw Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Sign a message and base64-encode the 64-byte signature.
    pub fn sign_base64(&self, message: &[u8]) -> String {
        BASE64.encode(self.sign(message).to_bytes())
    }

    /// The base58-encoded public key matching this signer.
    pub fn public_key_base58(&self) -> String {
        bs58::encode(self.signing_key.verifying_key().to_bytes()).into_string()
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public_key", &self.public_key_base58())
            .finish()
    }
}
