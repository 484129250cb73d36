//! # bc-configs
//!
//! Layered runtime settings for the book club server.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `config/bookclub.toml` (optional)
//! 3. `BOOKCLUB__SECTION__KEY` environment variables (`.env` is loaded first)

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const CONFIG_FILE: &str = "config/bookclub";
const ENV_PREFIX: &str = "BOOKCLUB";
const DEFAULT_PEPPER: &str = "bookclub-dev-pepper";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub auth: AuthSettings,
    pub log_format: LogFormat,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    /// Extra attempts for transient store errors
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub root: PathBuf,
    pub url_prefix: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub session_ttl_hours: i64,
    #[serde(deserialize_with = "secret")]
    pub pepper: SecretString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| SecretString::new(s.into_boxed_str()))
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://bookclub.db".to_string(),
            max_connections: 5,
            retry_attempts: 1,
            retry_backoff_ms: 50,
        }
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/uploads"),
            url_prefix: "/static/uploads".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 30,
            pepper: SecretString::new(DEFAULT_PEPPER.into()),
        }
    }
}

impl Settings {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::build(Config::builder().add_source(File::with_name(CONFIG_FILE).required(false)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.database.max_connections == 0 {
            return Err(SettingsError::Invalid {
                key: "database.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(SettingsError::Invalid {
                key: "auth.session_ttl_hours",
                reason: "must be positive".to_string(),
            });
        }
        if self.media.max_upload_bytes == 0 {
            return Err(SettingsError::Invalid {
                key: "media.max_upload_bytes",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// True while `auth.pepper` is still the development default.
    pub fn uses_default_pepper(&self) -> bool {
        secrecy::ExposeSecret::expose_secret(&self.auth.pepper) == DEFAULT_PEPPER
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
