//! # hcm-core
//!
//! Runtime pieces shared by every hcm crate: the per-request [`Kit`], the
//! `{code, message}` error envelope, layered configuration, tracing setup,
//! and the [`Vendor`] strategy registry.

pub mod config;
pub mod error;
pub mod kit;
pub mod logging;
pub mod vendor;

pub use config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, HcmConfig};
pub use error::{ApiError, BaseResp, ErrorCode};
pub use kit::Kit;
pub use logging::{init_tracing, LogConfig, LogFormat};
pub use vendor::{Vendor, VendorRegistry};

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::{ApiError, BaseResp, ErrorCode, HcmConfig, Kit, Vendor, VendorRegistry};
}
