//! hcm: the data-access layer shared by the cloud resource services.
//!
//! This facade crate re-exports the hcm sub-crates through a single
//! dependency with feature flags:
//!
//! ```ignore
//! use hcm::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                     |
//! |-------------|---------|---------------------------|
//! | `data-sqlx` | **yes** | `hcm-data-sqlx`           |
//! | `sqlite`    | **yes** | `hcm-data-sqlx/sqlite`    |
//! | `postgres`  | no      | `hcm-data-sqlx/postgres`  |
//! | `mysql`     | no      | `hcm-data-sqlx/mysql`     |

pub extern crate hcm_core;
pub extern crate hcm_data;
pub extern crate hcm_filter;

#[cfg(feature = "data-sqlx")]
pub use hcm_data_sqlx;

// Re-export everything from hcm-core at the top level for convenience.
pub use hcm_core::*;

pub mod prelude {
    //! Everything a service needs to declare tables and list, write or
    //! delete them.
    pub use hcm_core::prelude::*;
    pub use hcm_data::prelude::*;
    pub use hcm_filter::prelude::*;

    #[cfg(feature = "data-sqlx")]
    pub use hcm_data_sqlx::prelude::*;
}
