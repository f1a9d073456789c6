//! Uniform JSON response envelope.
//!
//! Every application response has the shape
//!
//! ```text
//! { "data": <any|null>, "message": <string>, "timestamp": <int>, "code": <int> }
//! ```
//!
//! The transport status is always 200; success or failure is carried in
//! `code`. Clients depend on this, so failures never map onto real HTTP
//! status codes here.

use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Application code for a successful request.
pub const CODE_SUCCESS: i64 = 200;
/// Application code for a rejected request (bad input, application error).
pub const CODE_BAD_REQUEST: i64 = 10400;
/// Application code for a request that failed inside the server.
pub const CODE_INTERNAL: i64 = 10500;

pub const MESSAGE_SUCCESS: &str = "请求成功";
pub const MESSAGE_PANIC: &str = "请求panic";
pub const MESSAGE_BROKEN: &str = "请求broken";

/// Seconds since the Unix epoch.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// The response body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    pub data: Option<T>,
    pub message: String,
    pub timestamp: i64,
    pub code: i64,
}

impl<T> Envelope<T> {
    /// `{data, "请求成功", now, 200}`.
    pub fn success(data: T) -> Self {
        Self::success_with_code(CODE_SUCCESS, data)
    }

    /// Success body with a caller-chosen application code.
    pub fn success_with_code(code: i64, data: T) -> Self {
        Self {
            data: Some(data),
            message: MESSAGE_SUCCESS.to_string(),
            timestamp: now_unix(),
            code,
        }
    }

    /// Failure body that still carries a payload next to the error text.
    pub fn error_with_data(code: i64, data: T, err: impl Display) -> Self {
        Self {
            data: Some(data),
            message: err.to_string(),
            timestamp: now_unix(),
            code,
        }
    }

    /// `{null, message, now, code}`.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: message.into(),
            timestamp: now_unix(),
            code,
        }
    }

    /// True when the body reports success.
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS && self.message == MESSAGE_SUCCESS
    }
}

impl Envelope<serde_json::Value> {
    /// Success body with `data: null`.
    pub fn empty() -> Self {
        Self {
            data: None,
            message: MESSAGE_SUCCESS.to_string(),
            timestamp: now_unix(),
            code: CODE_SUCCESS,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Input accepted by [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInput {
    /// Nothing went wrong.
    None,
    /// A plain message to report as a failure.
    Message(String),
    /// An error, reported through its description.
    Error(String),
}

impl RenderInput {
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        RenderInput::Error(err.to_string())
    }
}

/// Map a [`RenderInput`] onto an envelope.
pub fn render(input: RenderInput) -> Envelope {
    match input {
        RenderInput::None => Envelope::empty(),
        RenderInput::Message(message) => Envelope::failure(CODE_BAD_REQUEST, message),
        RenderInput::Error(description) => Envelope::failure(CODE_BAD_REQUEST, description),
    }
}

/// Turn a handler result into a response: success envelope or a 10400 failure.
pub fn respond<T, E>(result: Result<T, E>) -> Response
where
    T: Serialize,
    E: Display,
{
    match result {
        Ok(data) => Envelope::success(data).into_response(),
        Err(err) => render(RenderInput::Error(err.to_string())).into_response(),
    }
}

/// Like [`respond`] but with a custom success code.
pub fn respond_with_code<T, E>(code: i64, result: Result<T, E>) -> Response
where
    T: Serialize,
    E: Display,
{
    match result {
        Ok(data) => Envelope::success_with_code(code, data).into_response(),
        Err(err) => render(RenderInput::Error(err.to_string())).into_response(),
    }
}
