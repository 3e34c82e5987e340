use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{ConfigError, ConfigProperties, HcmConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging section, read from `hcm.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl ConfigProperties for LogConfig {
    fn prefix() -> &'static str {
        "hcm.log"
    }

    fn from_config(config: &HcmConfig) -> Result<Self, ConfigError> {
        let p = Self::prefix();
        let defaults = Self::default();
        let format_key = format!("{p}.format");
        let format = match config
            .get_or::<String>(&format_key, "pretty".to_string())?
            .to_ascii_lowercase()
            .as_str()
        {
            "pretty" | "text" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    key: format_key,
                    reason: format!("unknown log format '{other}'"),
                })
            }
        };
        Ok(Self {
            level: config.get_or(&format!("{p}.level"), defaults.level)?,
            format,
        })
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over [`LogConfig::level`]. Calling this twice
/// is harmless: the second installation is ignored.
pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false);
            Registry::default().with(env_filter).with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false);
            Registry::default().with(env_filter).with(fmt_layer).try_init()
        }
    };

    if let Err(e) = result {
        tracing::debug!("tracing subscriber already installed: {e}");
    }
}
