mod loader;
pub mod typed;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use typed::ConfigProperties;
pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A section loaded but one of its values is out of range.
    Invalid { key: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
            ConfigError::Invalid { key, reason } => write!(f, "invalid config '{key}': {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Service configuration loaded from YAML files, `.env` files, and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `<dir>/application.yaml`
/// 2. `<dir>/application-{profile}.yaml`
/// 3. `.env` and `.env.{profile}` (loaded into the process environment, never overwriting)
/// 4. `HCM_*` environment variables (`HCM_DATABASE_URL` overrides `hcm.database.url`)
///
/// The profile is taken from `HCM_PROFILE` when set, else from the argument.
#[derive(Debug, Clone)]
pub struct HcmConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

pub const PROFILE_ENV: &str = "HCM_PROFILE";
const ENV_PREFIX: &str = "HCM_";

impl HcmConfig {
    /// Load from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from_dir(".", profile)
    }

    pub fn load_from_dir(dir: impl AsRef<Path>, profile: &str) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("application.yaml"), &mut values)?;
        loader::load_yaml_file(&dir.join(format!("application-{profile}.yaml")), &mut values)?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{profile}")));

        loader::overlay_env(ENV_PREFIX, std::env::vars(), &mut values);

        tracing::debug!(profile = %profile, keys = values.len(), "configuration loaded");
        Ok(Self { values, profile })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(Self {
            values,
            profile: profile.to_string(),
        })
    }

    /// Create an empty config (useful for testing).
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning `default` if the key is missing.
    ///
    /// A present but malformed value is still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key),
            None => Ok(default),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Whether any key lives under `prefix`.
    pub fn has_section(&self, prefix: &str) -> bool {
        let dotted = format!("{prefix}.");
        self.values.keys().any(|k| k == prefix || k.starts_with(&dotted))
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Read a typed section.
    pub fn section<C: ConfigProperties>(&self) -> Result<C, ConfigError> {
        C::from_config(self)
    }
}
