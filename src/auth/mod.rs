//! Password authentication, bearer sessions, and the password-reset flow.
//!
//! Provides:
//! - User registration with email/password (PBKDF2-HMAC-SHA512, 1000 rounds,
//!   per-user salt, stored as a `salt:hash` hex pair)
//! - Session token management (base64 payload envelope, SHA-256 hashed for
//!   storage, 7-day expiry, multi-device)
//! - Single-use, 15-minute password-reset tokens that revoke every session
//!   for the user on success
//!
//! ## Design Decisions
//! - The bearer string is deliberately non-authoritative: the server keeps
//!   only a SHA-256 digest in `user_sessions` and every verification goes
//!   through that lookup, so the envelope needs no signature.
//! - Reset tokens are short human-typable codes (6 uppercase hex chars); at
//!   most one unused, unexpired code exists per user at a time.

pub mod reset;
pub mod store;
pub mod token;

pub use store::{AuthStore, UserView};
