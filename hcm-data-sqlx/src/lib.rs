//! # hcm-data-sqlx: SQLx backend for the hcm data layer
//!
//! This crate runs the statements built by [`hcm-data`] against a real
//! database through SQLx's `Any` driver, so one binary serves SQLite, MySQL
//! and PostgreSQL deployments.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Orm`] | Pool + dialect; runs statements behind the ingress limiter and slow-query log |
//! | [`Tx`] | Transaction wrapper handed to unit-of-work callbacks |
//! | [`Orm::auto_txn`] | Unit of work: commit on success, rollback on error, panic, cancel or timeout |
//! | [`Dao`] | Generic list / create / update / delete for a [`Table`](hcm_data::Table) |
//! | [`CascadePlan`] | Child tables removed with their parents by [`Orm::delete_with_children`] |
//! | [`IngressLimiter`] | Per-table token bucket |
//! | [`IdGenerator`] | Primary key source, UUID by default |
//! | [`DatabaseConfig`] | `hcm.database` configuration section |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error(ctx)`) |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` (default) |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```ignore
//! use hcm_core::{HcmConfig, Kit};
//! use hcm_data_sqlx::{Dao, DatabaseConfig, Orm};
//!
//! let config = HcmConfig::load("dev")?;
//! let orm = Orm::connect(&config.section::<DatabaseConfig>()?).await?;
//!
//! let dao = Dao::<SecurityGroup>::new(orm.clone());
//! let page = dao.list(&Kit::new(), &req).await?;
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use hcm_data_sqlx::SqlxErrorExt;
//!
//! let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM region")
//!     .fetch_one(orm.pool())
//!     .await
//!     .map_err(|e| e.into_data_error("count region"))?;
//! ```

mod bind;
pub mod cascade;
pub mod config;
pub mod dao;
pub mod error;
pub mod id;
pub mod limiter;
pub mod orm;
pub mod tx;

pub use cascade::{CascadeChild, CascadePlan};
pub use config::DatabaseConfig;
pub use dao::{Dao, ListPolicy};
pub use error::{SqlxErrorExt, SqlxResult};
pub use id::{IdGenerator, UuidGenerator};
pub use limiter::IngressLimiter;
pub use orm::Orm;
pub use tx::{Tx, TxnOption};

/// Re-exports of the most commonly used types from both `hcm-data` and this crate.
pub mod prelude {
    pub use crate::{CascadeChild, CascadePlan, Dao, DatabaseConfig, Orm, SqlxErrorExt, Tx, TxnOption};
    pub use hcm_data::prelude::*;
}
