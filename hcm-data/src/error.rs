use hcm_core::{ApiError, ErrorCode};
use hcm_filter::FilterError;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// Caller input rejected before reaching the database.
    InvalidParameter(String),
    /// An update or lookup matched no rows.
    NotFound(String),
    /// A driver error, wrapped with the operation that failed.
    Database {
        context: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Begin or commit failed.
    Transaction(String),
    /// Returned by a unit-of-work callback to request another attempt.
    RetryTransaction,
    /// The ingress limiter refused the statement.
    TooManyRequests(String),
    /// The request's cancellation token fired.
    Canceled,
    /// The request's deadline passed.
    Timeout,
    Other(String),
}

impl DataError {
    /// Wrap a driver error with the operation it interrupted,
    /// e.g. `DataError::database("list security_group", err)`.
    pub fn database(
        context: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DataError::Database {
            context: context.into(),
            source: Box::new(err),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DataError::InvalidParameter(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DataError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            DataError::NotFound(_) => ErrorCode::RecordNotFound,
            DataError::TooManyRequests(_) => ErrorCode::TooManyRequest,
            DataError::Canceled => ErrorCode::Aborted,
            DataError::Timeout => ErrorCode::DeadlineExceeded,
            DataError::Database { .. }
            | DataError::Transaction(_)
            | DataError::RetryTransaction
            | DataError::Other(_) => ErrorCode::Unknown,
        }
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::InvalidParameter(msg) => f.write_str(msg),
            DataError::NotFound(msg) => write!(f, "record not found: {msg}"),
            DataError::Database { context, source } => write!(f, "{context} failed, err: {source}"),
            DataError::Transaction(msg) => write!(f, "transaction failed, err: {msg}"),
            DataError::RetryTransaction => f.write_str("retry transaction"),
            DataError::TooManyRequests(msg) => write!(f, "too many requests: {msg}"),
            DataError::Canceled => f.write_str("request canceled"),
            DataError::Timeout => f.write_str("request deadline exceeded"),
            DataError::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<FilterError> for DataError {
    fn from(err: FilterError) -> Self {
        DataError::InvalidParameter(err.to_string())
    }
}

impl From<ApiError> for DataError {
    fn from(err: ApiError) -> Self {
        match err.code {
            ErrorCode::InvalidParameter => DataError::InvalidParameter(err.message),
            ErrorCode::RecordNotFound => DataError::NotFound(err.message),
            ErrorCode::TooManyRequest => DataError::TooManyRequests(err.message),
            ErrorCode::Aborted => DataError::Canceled,
            ErrorCode::DeadlineExceeded => DataError::Timeout,
            ErrorCode::Ok | ErrorCode::Unknown => DataError::Other(err.message),
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        ApiError::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_carry_context() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = DataError::database("list security_group", io);
        assert_eq!(err.to_string(), "list security_group failed, err: connection reset");
        assert!(std::error::Error::source(&err).is_some());

        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::Unknown);
    }

    #[test]
    fn codes_survive_the_boundary() {
        let api: ApiError = DataError::NotFound("security group 1".into()).into();
        assert_eq!(api.code, ErrorCode::RecordNotFound);

        let back: DataError = ApiError::invalid_parameter("page.limit is required").into();
        assert!(matches!(back, DataError::InvalidParameter(m) if m == "page.limit is required"));

        let filter: DataError = FilterError::invalid("rule field: x is not allowed").into();
        assert_eq!(filter.code(), ErrorCode::InvalidParameter);
    }
}
