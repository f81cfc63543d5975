//! SQLite-backed credential store and session manager.
//!
//! Tables (created by [`crate::db::Database::open`]):
//! - `users`: email, `salt:hash` password hash, profile fields, active flag
//! - `user_sessions`: token digest, user_id, expiry
//! - `password_reset_tokens`: see [`super::reset`]

use crate::db::{epoch_secs, Database};
use crate::error::ApiError;
use rand::RngCore;
use serde::Serialize;
use sha2::Sha512;

/// Salt byte length for password hashing (16 bytes = 32 hex chars).
const SALT_BYTES: usize = 16;

/// PBKDF2 iteration count for password stretching.
const PBKDF2_ROUNDS: u32 = 1000;

/// Derived-key length in bytes.
const DERIVED_KEY_BYTES: usize = 64;

/// Public projection of a user row; what handlers put on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub role: String,
}

/// Credential store + session manager over the shared pool.
#[derive(Clone)]
pub struct AuthStore {
    db: Database,
    session_ttl_secs: u64,
    reset_ttl_secs: u64,
}

impl AuthStore {
    pub fn new(db: Database, session_ttl_secs: u64, reset_ttl_secs: u64) -> Self {
        Self {
            db,
            session_ttl_secs,
            reset_ttl_secs,
        }
    }

    pub(super) fn db(&self) -> &Database {
        &self.db
    }

    pub(super) fn reset_ttl_secs(&self) -> u64 {
        self.reset_ttl_secs
    }

    // ── Registration & login ────────────────────────────────────────

    /// Create a user account and open its first session.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        company: Option<&str>,
    ) -> Result<(UserView, String), ApiError> {
        let email = email.trim().to_lowercase();
        if !valid_email(&email) {
            return Err(ApiError::validation("Invalid email format"));
        }
        if password.len() < 6 {
            return Err(ApiError::validation(
                "Password must be at least 6 characters long",
            ));
        }
        if full_name.trim().is_empty() {
            return Err(ApiError::validation("Full name is required"));
        }

        let user_id = uuid::Uuid::new_v4().to_string();
        let password_hash = hash_password(password, &generate_salt());
        let now = epoch_secs() as i64;

        let conn = self.db.conn()?;

        // Friendlier pre-check; the UNIQUE constraint below is the authority
        // under concurrent registration.
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE",
                rusqlite::params![email],
                |_| Ok(true),
            )
            .unwrap_or(false);
        if exists {
            return Err(ApiError::conflict("User with this email already exists"));
        }

        let inserted = conn.execute(
            "INSERT INTO users (id, email, password_hash, full_name, company, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![user_id, email, password_hash, full_name.trim(), company, now],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(ApiError::conflict("User with this email already exists"));
            }
            Err(e) => return Err(e.into()),
        }
        drop(conn);

        let user = self.get_user(&user_id)?.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("user row vanished after insert"))
        })?;
        let token = self.create_session(&user_id)?;
        Ok((user, token))
    }

    /// Authenticate by email + password and open a new session.
    ///
    /// Unknown email and wrong password produce the identical error on
    /// purpose (no account enumeration); a deactivated account is the one
    /// distinguishable case.
    pub fn login(&self, email: &str, password: &str) -> Result<(UserView, String), ApiError> {
        let email = email.trim().to_lowercase();
        let now = epoch_secs() as i64;

        let conn = self.db.conn()?;
        let row: Result<(String, String, bool), _> = conn.query_row(
            "SELECT id, password_hash, is_active FROM users WHERE email = ?1 COLLATE NOCASE",
            rusqlite::params![email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        );

        let (user_id, stored_hash, is_active) = match row {
            Ok(r) => r,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                // Dummy derivation to level the timing against real accounts.
                let _ = hash_password(password, "00000000000000000000000000000000");
                return Err(ApiError::unauthenticated("Invalid email or password"));
            }
            Err(e) => return Err(e.into()),
        };

        if !is_active {
            return Err(ApiError::unauthenticated("Account is deactivated"));
        }
        if !verify_password(password, &stored_hash) {
            return Err(ApiError::unauthenticated("Invalid email or password"));
        }

        // Opportunistic cleanup: drop this user's already-expired sessions.
        conn.execute(
            "DELETE FROM user_sessions WHERE user_id = ?1 AND expires_at <= ?2",
            rusqlite::params![user_id, now],
        )?;
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            rusqlite::params![now, user_id],
        )?;
        drop(conn);

        let user = self.get_user(&user_id)?.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("user row vanished during login"))
        })?;
        let token = self.create_session(&user_id)?;
        Ok((user, token))
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Mint a bearer token for the user and persist its digest.
    /// The plaintext token is only ever revealed here.
    pub fn create_session(&self, user_id: &str) -> Result<String, ApiError> {
        let now = epoch_secs();
        let token = super::token::issue(user_id, now);
        let expires_at = now + self.session_ttl_secs;

        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO user_sessions (token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                super::token::digest(&token),
                user_id,
                now as i64,
                expires_at as i64
            ],
        )?;
        Ok(token)
    }

    /// Resolve a bearer token to its user.
    ///
    /// The digest lookup is the authority; the decoded payload is only
    /// cross-checked against the session row. Malformed encodings fail
    /// verification like any unknown token.
    pub fn verify_token(&self, token: &str) -> Result<UserView, ApiError> {
        let invalid = || ApiError::unauthenticated("Invalid or expired token");

        let payload = super::token::decode(token).ok_or_else(invalid)?;
        let now = epoch_secs() as i64;

        let conn = self.db.conn()?;
        let row: Result<(String, bool, UserView), _> = conn.query_row(
            "SELECT s.user_id, u.is_active, u.id, u.email, u.full_name, u.company, u.role
             FROM user_sessions s
             JOIN users u ON s.user_id = u.id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            rusqlite::params![super::token::digest(token), now],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    UserView {
                        id: row.get(2)?,
                        email: row.get(3)?,
                        full_name: row.get(4)?,
                        company: row.get(5)?,
                        role: row.get(6)?,
                    },
                ))
            },
        );

        let (session_user, is_active, user) = match row {
            Ok(r) => r,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(invalid()),
            Err(e) => return Err(e.into()),
        };

        if session_user != payload.user_id {
            return Err(invalid());
        }
        if !is_active {
            return Err(ApiError::unauthenticated("Account is deactivated"));
        }
        Ok(user)
    }

    /// Delete every session the user holds. Used by the reset flow and
    /// available for an explicit "log out everywhere".
    pub fn revoke_all_sessions(&self, user_id: &str) -> Result<u64, ApiError> {
        let conn = self.db.conn()?;
        let deleted = conn.execute(
            "DELETE FROM user_sessions WHERE user_id = ?1",
            rusqlite::params![user_id],
        )?;
        Ok(deleted as u64)
    }

    /// Look up a user by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<UserView>, ApiError> {
        let conn = self.db.conn()?;
        let row = conn.query_row(
            "SELECT id, email, full_name, company, role FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            |row| {
                Ok(UserView {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                    company: row.get(3)?,
                    role: row.get(4)?,
                })
            },
        );
        match row {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Cryptographic helpers ───────────────────────────────────────────

/// Generate a random salt (hex-encoded).
pub(super) fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derive a `salt:hash` hex pair with PBKDF2-HMAC-SHA512.
pub(super) fn hash_password(password: &str, salt: &str) -> String {
    let mut derived = [0u8; DERIVED_KEY_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut derived,
    );
    format!("{salt}:{}", hex::encode(derived))
}

/// Recompute with the stored salt and compare in constant time.
pub(super) fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, _)) = stored.split_once(':') else {
        return false;
    };
    constant_time_eq(hash_password(password, salt).as_bytes(), stored.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// `local@domain.tld`-shaped check, nothing fancier.
fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
