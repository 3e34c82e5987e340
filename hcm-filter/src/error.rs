use hcm_core::ApiError;

/// Errors raised while validating or compiling a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    InvalidParameter(String),
    InvalidIdentifier { kind: &'static str, ident: String },
}

impl FilterError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        FilterError::InvalidParameter(msg.into())
    }
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::InvalidParameter(msg) => f.write_str(msg),
            FilterError::InvalidIdentifier { kind, ident } => {
                write!(f, "invalid {kind} identifier: {ident}")
            }
        }
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::invalid_parameter(err.to_string())
    }
}
