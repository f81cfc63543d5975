//! TOML configuration with per-section defaults.
//!
//! Every section and field is optional in the file; missing values fall back
//! to the defaults below, and a missing file yields a fully defaulted config.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "propdesk.db".into(),
        }
    }
}

/// Authentication and reset-flow tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default 7 days).
    pub session_ttl_secs: u64,
    /// Password-reset token lifetime in seconds (default 15 minutes).
    pub reset_ttl_secs: u64,
    /// Whether new accounts may be created over HTTP.
    pub allow_registration: bool,
    /// Dev affordance: include the raw reset token in the forgot-password
    /// response body. Must stay off in production — tokens are meant to be
    /// delivered out-of-band.
    pub reveal_reset_tokens: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 7 * 24 * 3600,
            reset_ttl_secs: 15 * 60,
            allow_registration: true,
            reveal_reset_tokens: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file is not an error;
    /// it yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.auth.session_ttl_secs, 7 * 24 * 3600);
        assert_eq!(config.auth.reset_ttl_secs, 15 * 60);
        assert!(config.auth.allow_registration);
        assert!(!config.auth.reveal_reset_tokens);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let raw = r#"
            [server]
            port = 9090

            [auth]
            reveal_reset_tokens = true
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.path, "propdesk.db");
        assert!(config.auth.reveal_reset_tokens);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config.server.port, 8787);
    }
}
