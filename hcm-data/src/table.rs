use hcm_filter::{ColumnType, ExprOption, SqlArg};

use crate::DataError;

/// A column of a [`Table`]: its name and the filter type of its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

pub const ID_COLUMN: &str = "id";

/// A database table row.
///
/// Implemented by hand for every resource table:
///
/// ```ignore
/// impl Table for SecurityGroup {
///     fn table_name() -> &'static str { "security_group" }
///     fn columns() -> &'static [Column] {
///         const COLS: &[Column] = &[
///             Column::new("id", ColumnType::String),
///             Column::new("vendor", ColumnType::String),
///             Column::new("name", ColumnType::String),
///         ];
///         COLS
///     }
///     fn id(&self) -> &str { &self.id }
///     fn set_id(&mut self, id: String) { self.id = id; }
///     fn values(&self) -> Vec<SqlArg> {
///         vec![self.id.as_str().into(), self.vendor.as_str().into(), self.name.as_str().into()]
///     }
/// }
/// ```
pub trait Table: Send + Sync + Unpin + 'static {
    fn table_name() -> &'static str;

    /// All columns, `id` included, in insert order.
    fn columns() -> &'static [Column];

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Values in the order of [`Table::columns`].
    fn values(&self) -> Vec<SqlArg>;

    /// Checks run before insert.
    fn insert_validate(&self) -> Result<(), DataError> {
        Ok(())
    }

    /// Checks run before update.
    fn update_validate(&self) -> Result<(), DataError> {
        Ok(())
    }

    /// Columns written by an update: every non-id column holding a value.
    fn update_values(&self) -> Vec<(&'static str, SqlArg)> {
        Self::columns()
            .iter()
            .zip(self.values())
            .filter(|(col, value)| col.name != ID_COLUMN && *value != SqlArg::Null)
            .map(|(col, value)| (col.name, value))
            .collect()
    }

    /// Filter allow-list derived from the columns.
    fn expr_option() -> ExprOption {
        ExprOption::new(Self::columns().iter().map(|c| (c.name, c.ty)))
    }

    fn column_names() -> Vec<&'static str> {
        Self::columns().iter().map(|c| c.name).collect()
    }
}

/// Columns of `T` to select: every column, or the validated projection.
pub fn projection<T: Table>(fields: &[String]) -> Result<Vec<&'static str>, DataError> {
    if fields.is_empty() {
        return Ok(T::column_names());
    }
    fields
        .iter()
        .map(|field| {
            T::columns()
                .iter()
                .find(|c| c.name == field)
                .map(|c| c.name)
                .ok_or_else(|| {
                    DataError::invalid(format!(
                        "field: {field} is not a column of {}",
                        T::table_name()
                    ))
                })
        })
        .collect()
}
