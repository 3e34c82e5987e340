use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Numeric error codes carried by the response envelope.
///
/// `Ok` is the only success code; every other value means the `message`
/// field describes a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok,
    Unknown,
    InvalidParameter,
    RecordNotFound,
    TooManyRequest,
    Aborted,
    DeadlineExceeded,
}

impl ErrorCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            ErrorCode::Ok => 0,
            ErrorCode::Unknown => -1,
            ErrorCode::InvalidParameter => 2000000,
            ErrorCode::RecordNotFound => 2000002,
            ErrorCode::TooManyRequest => 2000003,
            ErrorCode::Aborted => 2000004,
            ErrorCode::DeadlineExceeded => 2000005,
        }
    }

    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => ErrorCode::Ok,
            2000000 => ErrorCode::InvalidParameter,
            2000002 => ErrorCode::RecordNotFound,
            2000003 => ErrorCode::TooManyRequest,
            2000004 => ErrorCode::Aborted,
            2000005 => ErrorCode::DeadlineExceeded,
            _ => ErrorCode::Unknown,
        }
    }

    /// HTTP status used when the code is rendered as a response.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::Ok => StatusCode::OK,
            ErrorCode::InvalidParameter => StatusCode::BAD_REQUEST,
            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorCode::TooManyRequest => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Aborted => StatusCode::CONFLICT,
            ErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error that crosses the service boundary as `{code, message}`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RecordNotFound, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code: {}, message: {}", self.code.as_i32(), self.message)
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for ApiError {}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::unknown(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_parameter(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body: BaseResp<()> = BaseResp::error(&self);
        (status, Json(body)).into_response()
    }
}

/// The response envelope shared by every endpoint.
///
/// ```json
/// {"code": 0, "message": "", "data": {"count": 0, "details": []}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseResp<T> {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> BaseResp<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: ErrorCode::Ok.as_i32(),
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Self {
            code: err.code.as_i32(),
            message: err.message.clone(),
            data: None,
        }
    }

    /// Turn a received envelope back into a result.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.code == ErrorCode::Ok.as_i32() {
            Ok(self.data)
        } else {
            Err(ApiError::new(ErrorCode::from_i32(self.code), self.message))
        }
    }
}

impl<T: Serialize> IntoResponse for BaseResp<T> {
    fn into_response(self) -> Response {
        let status = ErrorCode::from_i32(self.code).status();
        (status, Json(self)).into_response()
    }
}

/// Generate `From<E> for ApiError` implementations that map error types to
/// a specific [`ErrorCode`].
///
/// # Example
///
/// ```ignore
/// hcm_core::map_error! {
///     crate::vpc::VpcError => InvalidParameter,
///     crate::sync::SyncError => Unknown,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $code:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::ApiError {
                fn from(err: $err_ty) -> Self {
                    $crate::ApiError::new($crate::ErrorCode::$code, err.to_string())
                }
            }
        )*
    };
}
