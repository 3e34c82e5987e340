use hcm_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
/// implemented here. Use `.into_data_error(context)` instead, naming the
/// operation that failed:
///
/// ```ignore
/// let rows = query.fetch_all(&pool).await.map_err(|e| e.into_data_error("list security_group"))?;
/// ```
pub trait SqlxErrorExt {
    fn into_data_error(self, context: impl Into<String>) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self, context: impl Into<String>) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound(context.into()),
            _ => DataError::database(context, self),
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;
