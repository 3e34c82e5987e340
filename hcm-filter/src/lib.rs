//! # hcm-filter
//!
//! The filter language every list and delete endpoint speaks.
//!
//! An [`Expression`] is a tree of [`AtomRule`]s (`field <op> value`) joined by
//! `and` / `or`. Callers validate it against an [`ExprOption`] allow-list and
//! then compile it into a parameterized predicate:
//!
//! ```ignore
//! let expr: Expression = serde_json::from_str(
//!     r#"{"op":"and","rules":[{"field":"id","op":"in","value":["7","8"]}]}"#,
//! )?;
//! expr.validate(&ExprOption::new([("id", ColumnType::String)]))?;
//! let clause = expr.compile(&SqlWhereOption::new(Dialect::Sqlite))?;
//! assert_eq!(clause.where_sql(), "WHERE id IN (?, ?)");
//! ```
//!
//! Values are always bound, never interpolated. Field names are checked as
//! identifiers during compilation in addition to the allow-list check.

pub mod arg;
pub mod compile;
pub mod dialect;
pub mod error;
mod eval;
pub mod expression;
pub mod operator;
pub mod option;
mod validate;

pub use arg::SqlArg;
pub use compile::{CrownedOption, SqlWhereOption, WhereClause};
pub use dialect::{is_valid_identifier, Dialect};
pub use error::FilterError;
pub use expression::{AtomRule, Expression, LogicOperator, Rule};
pub use operator::OpType;
pub use option::{ColumnType, ExprOption};

pub mod prelude {
    //! Re-exports of the most commonly used filter types.
    pub use crate::{
        AtomRule, ColumnType, Dialect, ExprOption, Expression, LogicOperator, OpType, Rule,
        SqlWhereOption,
    };
}
