//! Bearer-token envelope and digest helpers.
//!
//! A token is the base64 encoding of a small JSON payload: the owning user
//! id, the issuance timestamp, and 16 bytes of random entropy. The raw token
//! is revealed to the client exactly once; the server persists only its
//! SHA-256 hex digest, which is what every lookup keys on.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Entropy bytes embedded in each token (16 bytes = 32 hex chars).
const NONCE_BYTES: usize = 16;

/// Decoded contents of a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub user_id: String,
    /// Unix epoch seconds at issuance.
    pub issued_at: u64,
    /// Random entropy, hex-encoded.
    pub nonce: String,
}

/// Mint a fresh token for the given user.
pub fn issue(user_id: &str, issued_at: u64) -> String {
    let mut entropy = [0u8; NONCE_BYTES];
    rand::rng().fill_bytes(&mut entropy);

    let payload = TokenPayload {
        user_id: user_id.to_string(),
        issued_at,
        nonce: hex::encode(entropy),
    };

    // Serializing a struct of strings and integers cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    BASE64.encode(json)
}

/// Decode a token back into its payload. Malformed base64 or JSON yields
/// `None`; it is never an error the caller has to distinguish.
pub fn decode(token: &str) -> Option<TokenPayload> {
    let bytes = BASE64.decode(token).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// One-way digest of a token for storage and lookup (single SHA-256 pass —
/// tokens are already high-entropy, unlike passwords).
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
