//! Environment-driven configuration.
//!
//! Recognized variables:
//! - `PORT`: listen port (default 3000)
//! - `ADMIN_ID` / `ADMIN_PW`: admin credentials; login is disabled if unset
//! - `SESSION_SECRET`: session cookie signing key
//! - `UPLOAD_DIR`: contract storage directory (default `uploads`)
//! - `STATIC_DIR`: page directory (default `contract`)
//! - `MAX_UPLOAD_BYTES`: multipart body cap (default 50 MiB)

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Used when `SESSION_SECRET` is not set. Startup warns about it.
pub const DEFAULT_SESSION_SECRET: &str = "contract-vault-default-secret";

/// Default cap on an upload request body.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),

    #[error("MAX_UPLOAD_BYTES must be a positive integer, got {0:?}")]
    InvalidMaxUpload(String),
}

#[derive(Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub admin_id: Option<String>,
    pub admin_pw: Option<String>,
    pub session_secret: String,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            admin_id: None,
            admin_pw: None,
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("contract"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

// Keeps credentials out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("admin_id", &self.admin_id)
            .field("admin_pw", &self.admin_pw.as_ref().map(|_| "<redacted>"))
            .field("session_secret", &"<redacted>")
            .field("upload_dir", &self.upload_dir)
            .field("static_dir", &self.static_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = match port.trim().parse::<u16>() {
                Ok(p) if p > 0 => p,
                _ => return Err(ConfigError::InvalidPort(port)),
            };
        }
        if let Some(limit) = get("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = match limit.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidMaxUpload(limit)),
            };
        }
        config.admin_id = get("ADMIN_ID");
        config.admin_pw = get("ADMIN_PW");
        if let Some(secret) = get("SESSION_SECRET") {
            config.session_secret = secret;
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.session_secret == DEFAULT_SESSION_SECRET
    }

    pub fn admin_configured(&self) -> bool {
        self.admin_id.is_some() && self.admin_pw.is_some()
    }
}
