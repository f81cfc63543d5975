//! Password-reset flow: short-lived single-use codes.
//!
//! A reset token moves `Issued → Used` exactly once; expiry is implicit via
//! the time check, never a stored state. Invariants:
//! - at most one unused, unexpired token per user (issuing a new one marks
//!   all prior unused tokens used first)
//! - consumption is atomic with the password change it authorizes
//! - a successful reset deletes every session the user holds

use super::store::{generate_salt, hash_password, AuthStore};
use crate::db::epoch_secs;
use crate::error::ApiError;
use rand::RngCore;

/// Reset codes are 3 random bytes, hex-encoded and uppercased: short enough
/// to type from an email on a phone, 24 bits of entropy over a 15-minute
/// window.
const RESET_TOKEN_BYTES: usize = 3;

/// Generate a human-typable reset code, e.g. `"3FA81C"`.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes).to_uppercase()
}

impl AuthStore {
    /// Issue a reset token for the account behind `email`.
    ///
    /// Returns `Ok(None)` when no such account exists — the HTTP layer
    /// answers with the same generic 200 either way, so the response shape
    /// never confirms account existence. The raw token is handed to the
    /// caller for out-of-band delivery; it is only echoed over HTTP behind
    /// the `reveal_reset_tokens` dev flag.
    pub fn request_reset(&self, email: &str) -> Result<Option<String>, ApiError> {
        let email = email.trim().to_lowercase();
        let now = epoch_secs() as i64;

        let mut conn = self.db().conn()?;
        let tx = conn.transaction()?;

        let user_id: Option<String> = match tx.query_row(
            "SELECT id FROM users WHERE email = ?1 COLLATE NOCASE",
            rusqlite::params![email],
            |row| row.get(0),
        ) {
            Ok(id) => Some(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        // One live token per user: retire everything still marked unused.
        tx.execute(
            "UPDATE password_reset_tokens SET used = 1 WHERE user_id = ?1 AND used = 0",
            rusqlite::params![user_id],
        )?;

        let token = generate_reset_token();
        let expires_at = now + self.reset_ttl_secs() as i64;
        tx.execute(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, token, expires_at, now],
        )?;
        tx.commit()?;

        tracing::info!(user_id = %user_id, "password reset token issued");
        Ok(Some(token))
    }

    /// Consume a reset token and set a new password.
    ///
    /// The password update, the token's `used` flag, and the session purge
    /// commit together or not at all.
    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        if new_password.len() < 6 {
            return Err(ApiError::validation(
                "Password must be at least 6 characters long",
            ));
        }

        let now = epoch_secs() as i64;
        let mut conn = self.db().conn()?;
        let tx = conn.transaction()?;

        let row: Result<(i64, String), _> = tx.query_row(
            "SELECT id, user_id FROM password_reset_tokens
             WHERE token = ?1 AND used = 0 AND expires_at > ?2",
            rusqlite::params![token, now],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        let (token_id, user_id) = match row {
            Ok(r) => r,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(ApiError::validation("Invalid or expired reset token"));
            }
            Err(e) => return Err(e.into()),
        };

        tx.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![hash_password(new_password, &generate_salt()), now, user_id],
        )?;
        tx.execute(
            "UPDATE password_reset_tokens SET used = 1 WHERE id = ?1",
            rusqlite::params![token_id],
        )?;
        // Cascading invalidation: force re-authentication everywhere.
        tx.execute(
            "DELETE FROM user_sessions WHERE user_id = ?1",
            rusqlite::params![user_id],
        )?;
        tx.commit()?;

        tracing::info!(user_id = %user_id, "password reset completed, sessions revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, AuthStore) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(&tmp.path().join("auth.db")).unwrap();
        let store = AuthStore::new(db, 3600, 900);
        (tmp, store)
    }

    #[test]
    fn token_is_six_uppercase_hex_chars() {
        for _ in 0..32 {
            let token = generate_reset_token();
            assert_eq!(token.len(), 6);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn unknown_email_yields_none_not_error() {
        let (_tmp, store) = test_store();
        assert!(store.request_reset("ghost@example.com").unwrap().is_none());
    }

    #[test]
    fn full_reset_flow_changes_password_and_revokes_sessions() {
        let (_tmp, store) = test_store();

        let (_user, token) = store
            .register("jane@example.com", "oldpassword", "Jane", None)
            .unwrap();
        let (_user, second) = store.login("jane@example.com", "oldpassword").unwrap();

        let reset = store.request_reset("jane@example.com").unwrap().unwrap();
        store.reset_password(&reset, "newpassword").unwrap();

        // Every previously issued session now fails verification.
        assert!(store.verify_token(&token).is_err());
        assert!(store.verify_token(&second).is_err());

        // Old password dead, new one live.
        assert!(store.login("jane@example.com", "oldpassword").is_err());
        store.login("jane@example.com", "newpassword").unwrap();
    }

    #[test]
    fn reset_token_is_single_use() {
        let (_tmp, store) = test_store();

        store
            .register("jane@example.com", "oldpassword", "Jane", None)
            .unwrap();
        let reset = store.request_reset("jane@example.com").unwrap().unwrap();

        store.reset_password(&reset, "firstnew1").unwrap();
        let err = store.reset_password(&reset, "secondnew2").unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired reset token");
    }

    #[test]
    fn new_request_retires_previous_token() {
        let (_tmp, store) = test_store();

        store
            .register("jane@example.com", "oldpassword", "Jane", None)
            .unwrap();
        let first = store.request_reset("jane@example.com").unwrap().unwrap();
        let second = store.request_reset("jane@example.com").unwrap().unwrap();

        let err = store.reset_password(&first, "newpassword").unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired reset token");
        store.reset_password(&second, "newpassword").unwrap();
    }

    #[test]
    fn expired_token_is_rejected_with_token_error() {
        let (_tmp, store) = test_store();

        let (user, _token) = store
            .register("jane@example.com", "oldpassword", "Jane", None)
            .unwrap();

        // Plant a token that expired 16 minutes ago.
        let past = epoch_secs() as i64 - 16 * 60;
        store
            .db()
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO password_reset_tokens (user_id, token, expires_at, created_at)
                 VALUES (?1, 'ABC123', ?2, ?3)",
                rusqlite::params![user.id, past, past - 900],
            )
            .unwrap();

        let err = store.reset_password("ABC123", "newpassword").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid or expired reset token");
    }

    #[test]
    fn short_replacement_password_is_rejected_before_lookup() {
        let (_tmp, store) = test_store();
        let err = store.reset_password("ABC123", "12345").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().contains("6 characters"));
    }
}
