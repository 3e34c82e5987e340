use std::time::Duration;

use hcm_core::{ConfigError, ConfigProperties, HcmConfig};

/// Database section, read from `hcm.database`.
///
/// ```yaml
/// hcm:
///   database:
///     url: "postgres://hcm@db/hcm"
///     max_connections: 20
///     slow_request: 200ms
///     ingress:
///       qps: 500
///       burst: 1000
///     txn:
///       max_retry: 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Statements slower than this are logged at `warn`.
    pub slow_request: Duration,
    /// Per-table statements per second; 0 disables the ingress limiter.
    pub ingress_qps: u32,
    pub ingress_burst: u32,
    /// Extra attempts granted to a unit of work that asks to be retried.
    pub max_retry: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            slow_request: Duration::from_millis(200),
            ingress_qps: 0,
            ingress_burst: 0,
            max_retry: 3,
        }
    }
}

impl ConfigProperties for DatabaseConfig {
    fn prefix() -> &'static str {
        "hcm.database"
    }

    fn from_config(config: &HcmConfig) -> Result<Self, ConfigError> {
        let p = Self::prefix();
        let d = Self::default();
        let url: String = config.get(&format!("{p}.url"))?;
        if url.is_empty() {
            return Err(ConfigError::Invalid {
                key: format!("{p}.url"),
                reason: "database url is empty".to_string(),
            });
        }
        let ingress_qps = config.get_or(&format!("{p}.ingress.qps"), d.ingress_qps)?;
        Ok(Self {
            url,
            max_connections: config.get_or(&format!("{p}.max_connections"), d.max_connections)?,
            slow_request: config.get_or(&format!("{p}.slow_request"), d.slow_request)?,
            ingress_qps,
            ingress_burst: config.get_or(&format!("{p}.ingress.burst"), ingress_qps)?,
            max_retry: config.get_or(&format!("{p}.txn.max_retry"), d.max_retry)?,
        })
    }
}
