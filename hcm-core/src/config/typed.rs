use super::{ConfigError, HcmConfig};

/// A strongly-typed configuration section read from keys under [`prefix`].
///
/// ```ignore
/// impl ConfigProperties for DatabaseConfig {
///     fn prefix() -> &'static str { "hcm.database" }
///
///     fn from_config(config: &HcmConfig) -> Result<Self, ConfigError> {
///         let p = Self::prefix();
///         Ok(Self {
///             url: config.get(&format!("{p}.url"))?,
///             max_connections: config.get_or(&format!("{p}.max_connections"), 10)?,
///         })
///     }
/// }
/// ```
///
/// [`prefix`]: ConfigProperties::prefix
pub trait ConfigProperties: Sized {
    fn prefix() -> &'static str;

    fn from_config(config: &HcmConfig) -> Result<Self, ConfigError>;

    /// Build the section, falling back to `default` when none of its keys are set.
    fn from_config_or(config: &HcmConfig, default: Self) -> Result<Self, ConfigError> {
        if config.has_section(Self::prefix()) {
            Self::from_config(config)
        } else {
            Ok(default)
        }
    }
}
