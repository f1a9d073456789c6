//! Application-level errors.
//!
//! An [`ApiError`] is an intentional, user-facing failure. It is rendered
//! verbatim into the envelope (code 10400 unless chosen otherwise) and is not
//! logged as a server fault.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::{Envelope, CODE_BAD_REQUEST};

/// A recognised application error carrying a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

impl ApiError {
    /// Application error with the default 10400 code.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(CODE_BAD_REQUEST, message)
    }

    /// Application error with an explicit envelope code.
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Abort the current request by unwinding with this error as payload.
    ///
    /// The recovery middleware renders it like a returned `ApiError`.
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Envelope::<serde_json::Value>::failure(self.code, self.message).into_response()
    }
}

/// Return early with a 10400 [`ApiError`] built from a format string.
#[macro_export]
macro_rules! api_bail {
    ($($arg:tt)*) => {
        return Err($crate::http::error::ApiError::bad_request(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    fn check(flag: bool) -> Result<u8, ApiError> {
        if !flag {
            api_bail!("flag[{}] is off", "x");
        }
        Ok(1)
    }

    #[test]
    fn bail_formats_message() {
        assert_eq!(check(true), Ok(1));
        let err = check(false).unwrap_err();
        assert_eq!(err.code, 10400);
        assert_eq!(err.to_string(), "flag[x] is off");
    }

    #[tokio::test]
    async fn renders_as_failure_envelope() {
        let response = ApiError::with_code(10403, "forbidden").into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], 10403);
        assert_eq!(body["message"], "forbidden");
        assert!(body["data"].is_null());
    }
}
