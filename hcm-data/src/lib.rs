//! # hcm-data
//!
//! Backend-independent data access types: list requests and pages, the
//! [`Table`] row trait, the [`QueryBuilder`] statement builder, vendor
//! extension blobs, and [`DataError`].
//!
//! A list endpoint validates its [`ListOption`] against the table's filter
//! allow-list and page policy, then hands the parts to a backend:
//!
//! ```ignore
//! let req: ListReq = serde_json::from_slice(&body)?;
//! req.validate(&SecurityGroup::expr_option(), None)?;
//! let (filter, page) = req.parts()?;
//! let stmt = QueryBuilder::new_with_dialect("security_group", Dialect::Sqlite)
//!     .build_select(&projection::<SecurityGroup>(&req.fields)?, filter, page, &PageSqlOption::default())?;
//! ```

pub mod error;
pub mod extension;
pub mod list;
pub mod page;
pub mod query;
pub mod table;

pub use error::DataError;
pub use extension::{ExtensionBlob, ExtensionRegistry};
pub use list::{BatchDeleteByIdReq, BatchDeleteReq, ListOption, ListReq, ListResult};
pub use page::{page_sql_expr, BasePage, Order, PageOption, PageSqlOption, SortOption};
pub use query::{QueryBuilder, Statement};
pub use table::{projection, Column, Table};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        BasePage, DataError, ListOption, ListReq, ListResult, Order, PageOption, PageSqlOption,
        QueryBuilder, Table,
    };
}
