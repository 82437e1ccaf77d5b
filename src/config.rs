//! ORM configuration.
//!
//! [`OrmConfig`] can be loaded from `config/config.toml` (section `[orm]`) or from
//! environment variables prefixed with `LIFELINE`, e.g.
//! `LIFELINE__ORM__FOREIGN_KEY_SUFFIX=_fk`.

use crate::executor::Backend;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrmConfig {
    /// SQL dialect statements are rendered for
    #[serde(default)]
    pub backend: Backend,
    /// Suffix appended to default foreign key names
    #[serde(default = "default_foreign_key_suffix")]
    pub foreign_key_suffix: String,
    /// Primary key column for models that do not declare one
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Pluralize model names to get table names
    #[serde(default = "default_table_names_plural")]
    pub table_names_plural: bool,
    /// Reload loaded records restored from a snapshot
    #[serde(default = "default_reload_on_wakeup")]
    pub reload_on_wakeup: bool,
    /// Lifetime of column cache entries; unset keeps them for the process lifetime
    #[serde(default)]
    pub column_cache_ttl_seconds: Option<u64>,
}

fn default_foreign_key_suffix() -> String {
    "_id".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_table_names_plural() -> bool {
    true
}

fn default_reload_on_wakeup() -> bool {
    true
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            foreign_key_suffix: default_foreign_key_suffix(),
            primary_key: default_primary_key(),
            table_names_plural: default_table_names_plural(),
            reload_on_wakeup: default_reload_on_wakeup(),
            column_cache_ttl_seconds: None,
        }
    }
}

impl OrmConfig {
    /// Load the ORM configuration from `config/config.toml`, falling back to env vars.
    ///
    /// A missing `[orm]` section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        // Build configuration by reading the TOML file (optional) and environment variables
        let builder = Config::builder()
            .add_source(File::with_name("config/config.toml").required(false))
            .add_source(Environment::with_prefix("LIFELINE").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new("config/config.toml").exists() {
                    log::warn!(
                        "Failed to load config file, falling back to env. Error: {}",
                        err
                    );
                }
                // Retry using only environment variables as source
                Config::builder()
                    .add_source(Environment::with_prefix("LIFELINE").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        match settings.get::<OrmConfig>("orm") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(OrmConfig::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "ORM configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }

    /// Column cache TTL as a `Duration`
    pub fn column_cache_ttl(&self) -> Option<Duration> {
        self.column_cache_ttl_seconds.map(Duration::from_secs)
    }
}
