//! Runtime configuration.
//!
//! Loaded from environment variables prefixed `ESTORE_` (for example
//! `ESTORE_BIND_ADDR`, `ESTORE_DATABASE_URL`) on top of built-in defaults.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use estore_inventory::{DEFAULT_PAGE_SIZE, MAX_IMAGE_BYTES};

pub const ENV_PREFIX: &str = "ESTORE";

/// Used when no JWT secret is configured. Local development only.
pub const INSECURE_DEV_JWT_SECRET: &str = "estore-insecure-dev-secret";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// No URL → in-memory gateway.
    #[serde(default)]
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// No directory → in-memory object store.
    #[serde(default)]
    pub storage_dir: Option<String>,
    pub bucket: String,
    /// Base of public object URLs: `{public_storage_url}/{bucket}/{path}`.
    pub public_storage_url: String,
    pub page_size: usize,
    /// Newest history rows fetched when listing items.
    pub history_limit: usize,
    pub max_image_bytes: usize,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    pub fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("database_max_connections", 5)?
            .set_default("bucket", "inventory-images")?
            .set_default("public_storage_url", "http://localhost:8080/storage")?
            .set_default("page_size", DEFAULT_PAGE_SIZE as u64)?
            .set_default("history_limit", 500)?
            .set_default("max_image_bytes", MAX_IMAGE_BYTES as u64)?
            .add_source(env.prefix_separator("_").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Secret bytes for HS256, falling back to the insecure development secret.
    pub fn jwt_secret_bytes(&self) -> Vec<u8> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => secret.as_bytes().to_vec(),
            _ => {
                tracing::warn!("ESTORE_JWT_SECRET is not set; using an insecure development secret");
                INSECURE_DEV_JWT_SECRET.as_bytes().to_vec()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: None,
            database_url: None,
            database_max_connections: 5,
            storage_dir: None,
            bucket: "inventory-images".to_string(),
            public_storage_url: "http://localhost:8080/storage".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            history_limit: 500,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let cfg = AppConfig::from_env(env(&[])).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = AppConfig::from_env(env(&[
            ("ESTORE_BIND_ADDR", "127.0.0.1:9000"),
            ("ESTORE_DATABASE_URL", "postgres://localhost/estore"),
            ("ESTORE_PAGE_SIZE", "25"),
            ("ESTORE_JWT_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/estore"));
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.jwt_secret_bytes(), b"s3cret".to_vec());
        assert_eq!(cfg.history_limit, 500);
    }

    #[test]
    fn single_underscore_after_prefix_is_required() {
        let cfg = AppConfig::from_env(env(&[
            ("ESTORE_STORAGE_DIR", "/var/lib/estore"),
            ("ESTORE_HISTORY_LIMIT", "50"),
            ("ESTORE__BIND_ADDR", "127.0.0.1:1"),
        ]))
        .unwrap();
        assert_eq!(cfg.storage_dir.as_deref(), Some("/var/lib/estore"));
        assert_eq!(cfg.history_limit, 50);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn blank_secret_falls_back_to_dev_secret() {
        let cfg = AppConfig {
            jwt_secret: Some("  ".into()),
            ..AppConfig::default()
        };
        assert_eq!(cfg.jwt_secret_bytes(), INSECURE_DEV_JWT_SECRET.as_bytes().to_vec());
    }
}
