use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::bitbucket::Credentials;

pub const CONFIG_FILE: &str = ".bitbucket-pr.toml";
pub const CLIENT_ID_ENV: &str = "BITBUCKET_CLIENT_ID";
pub const SECRET_ENV: &str = "BITBUCKET_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Bitbucket credentials not found; set BITBUCKET_CLIENT_ID and BITBUCKET_SECRET or add them to .bitbucket-pr.toml")]
    MissingCredentials,
}

/// Top-level configuration loaded from `.bitbucket-pr.toml`.
/// All fields are optional; environment variables fill the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitbucket: BitbucketConfig,
}

#[derive(Clone, Default, Deserialize)]
pub struct BitbucketConfig {
    /// OAuth consumer key
    pub client_id: Option<String>,
    /// OAuth consumer secret
    pub secret: Option<String>,
}

impl std::fmt::Debug for BitbucketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketConfig")
            .field("client_id", &self.client_id)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Config {
    /// Load `.bitbucket-pr.toml` from the current directory, or defaults if
    /// it doesn't exist, then fill missing credentials from the environment.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from a specific path, without environment fallbacks.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset credential fields from `lookup`. File values win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.bitbucket.client_id.is_none() {
            self.bitbucket.client_id = lookup(CLIENT_ID_ENV);
        }
        if self.bitbucket.secret.is_none() {
            self.bitbucket.secret = lookup(SECRET_ENV);
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (&self.bitbucket.client_id, &self.bitbucket.secret) {
            (Some(client_id), Some(secret)) => Ok(Credentials::new(client_id, secret)),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}
