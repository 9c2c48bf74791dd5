//! Server configuration.
//!
//! Loaded from an optional YAML file named by `FORGE_CONFIG`; the `LISTEN`
//! environment variable overrides the listen address. Every field has a
//! default, so an empty file (or no file) yields a working local setup.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const CONFIG_ENV: &str = "FORGE_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub static_files: Option<StaticFilesConfig>,
    /// Adds collaborator detail to internal error responses.
    pub dev_mode: bool,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Pending-connection queue length passed to `listen(2)`.
    pub backlog: u32,
    /// Connections handled at once; further accepts wait for a free slot.
    pub max_connections: usize,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_index() -> String {
    "index.html".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            static_files: None,
            dev_mode: false,
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            backlog: 128,
            max_connections: 256,
            read_timeout_ms: 5_000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 24 * 60 * 60,
            users: vec![UserConfig {
                username: "admin".to_string(),
                password: "password123".to_string(),
            }],
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Checks a username/password pair against the configured users.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users.iter().any(|user| {
            user.username == username && passwords_match(&user.password, password)
        })
    }
}

/// Compares fixed-size digests in constant time, so neither the content nor
/// the length of the stored password shows in the timing.
fn passwords_match(expected: &str, given: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let given = Sha256::digest(given.as_bytes());
    expected.as_slice().ct_eq(given.as_slice()).into()
}

impl Config {
    /// Loads configuration from `FORGE_CONFIG` (if set) and applies the
    /// `LISTEN` override.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.listen_addr is empty".to_string()));
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "server.max_connections must be at least 1".to_string(),
            ));
        }
        if self.server.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.read_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.auth.users.is_empty() {
            return Err(ConfigError::Invalid("auth.users is empty".to_string()));
        }
        if self.auth.users.iter().any(|u| u.username.is_empty()) {
            return Err(ConfigError::Invalid("auth.users has an empty username".to_string()));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }
}
