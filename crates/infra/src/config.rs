//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults ([`AppConfig::default`]);
//! 2. an optional file at `$LIVEBASE_CONFIG` (default `livebase.toml`);
//! 3. environment variables prefixed `LIVEBASE__`, nested with `__`
//!    (`LIVEBASE__AUTH__JWT_SECRET` sets `auth.jwt_secret`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use livebase_observability::{LogFormat, LoggingConfig};

/// Secret used when none is configured. Only acceptable for local runs.
pub const INSECURE_DEV_SECRET: &str = "livebase-insecure-dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: INSECURE_DEV_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres URL; the in-memory store is used when unset.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub local_root: PathBuf,
    pub public_base_url: String,
    pub object_store: Option<ObjectStoreConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("uploads"),
            public_base_url: "/files".to_string(),
            object_store: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    #[serde(default)]
    pub access_token: Option<String>,
    pub public_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub translation_ttl_secs: u64,
    pub translation_max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            translation_ttl_secs: 300,
            translation_max_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub retention_days: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 24 * 60 * 60,
            retention_days: 90,
        }
    }
}

impl AppConfig {
    /// Load from `$LIVEBASE_CONFIG` (or `livebase.toml`) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LIVEBASE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("livebase.toml"));
        Self::load_from(&path)
    }

    /// Load with `path` as the (optional) file layer.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "loading configuration");
        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("LIVEBASE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.cleanup.enabled && self.cleanup.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cleanup.interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.auth.jwt_secret == INSECURE_DEV_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.cache.translation_ttl_secs, 300);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("livebase.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[auth]
jwt_secret = "from-file"

[cleanup]
retention_days = 30

[storage.object_store]
endpoint = "https://objects.example.com"
bucket = "images"
public_base_url = "https://cdn.example.com"

[logging]
format = "pretty"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert!(!config.uses_insecure_secret());
        assert_eq!(config.cleanup.retention_days, 30);
        assert!(config.cleanup.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        let object_store = config.storage.object_store.unwrap();
        assert_eq!(object_store.bucket, "images");
        assert_eq!(object_store.access_token, None);
    }

    #[test]
    fn rejects_empty_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(AppConfig::default().uses_insecure_secret());
    }
}
