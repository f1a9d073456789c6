//! Per-request accessors and parameter helpers.
//!
//! # Responsibilities
//! - Read the trace ID, client IP and host of a request
//! - Carry the per-request context (trace ID, start time, reported errors)
//! - Typed access to query/path parameters and JSON bodies, failing with
//!   an [`ApiError`] instead of a bare rejection

use std::collections::HashMap;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;

use crate::http::error::ApiError;

/// Header carrying the per-request trace identifier.
pub const X_TRACE_ID: &str = "x-trace-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub fn trace_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trace ID of the request, as set (or generated) by the trace ID layer.
pub fn trace_id<B>(req: &axum::http::Request<B>) -> Option<String> {
    trace_id_from_headers(req.headers())
}

/// `X-Forwarded-For` if present, otherwise the peer address of the connection.
pub fn client_ip<B>(req: &axum::http::Request<B>) -> Option<String> {
    let forwarded = req
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    if let Some(xff) = forwarded {
        return Some(xff.to_string());
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// `Host` header, falling back to the host component of the URI.
pub fn request_host<B>(req: &axum::http::Request<B>) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .or_else(|| req.uri().host())
        .map(str::to_string)
}

/// Value of an arbitrary request header, empty when absent.
pub fn header<B>(req: &axum::http::Request<B>, key: &str) -> String {
    req.headers()
        .get(key)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Ephemeral per-request state, inserted into request extensions by the
/// access logger.
///
/// Handlers attach non-fatal errors with [`RequestContext::push_error`]; they
/// only influence the level of the access log line.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    started: Instant,
    errors: Arc<Mutex<Vec<String>>>,
}

impl RequestContext {
    /// Create a context for a request that starts now.
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            started: Instant::now(),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Trace ID the request was logged under.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// When the access logger first saw the request.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Attach a non-fatal error to the request.
    pub fn push_error(&self, err: impl Display) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err.to_string());
    }

    /// Errors reported so far, in the order they were attached.
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// All errors joined for a single log field.
    pub fn error_text(&self) -> String {
        self.errors()
            .iter()
            .enumerate()
            .map(|(i, e)| format!("Error #{:02}: {}", i + 1, e))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Query string parameters with the lookup rules handlers expect: an empty
/// value counts as absent.
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self(values)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Required string, unless a default is supplied.
    pub fn str(&self, key: &str, default: Option<&str>) -> Result<String, ApiError> {
        match (self.get(key), default) {
            (Some(v), _) => Ok(v.to_string()),
            (None, Some(d)) => Ok(d.to_string()),
            (None, None) => Err(ApiError::bad_request(format!(
                "query param[{key}] is necessary"
            ))),
        }
    }

    pub fn str_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Integer parameter with the platform word width.
    pub fn int(&self, key: &str, default: Option<i64>) -> Result<i64, ApiError> {
        match self.get(key) {
            Some(v) => v
                .parse()
                .map_err(|_| ApiError::bad_request(format!("cannot convert [{v}] to int"))),
            None => default.ok_or_else(|| {
                ApiError::bad_request(format!("query param[{key}] is necessary"))
            }),
        }
    }

    pub fn int64(&self, key: &str, default: Option<i64>) -> Result<i64, ApiError> {
        match self.get(key) {
            Some(v) => v
                .parse()
                .map_err(|_| ApiError::bad_request(format!("cannot convert [{v}] to int64"))),
            None => default.ok_or_else(|| {
                ApiError::bad_request(format!("query param[{key}] is necessary"))
            }),
        }
    }

    /// `"1"` is true; anything unparsable is false.
    pub fn bool(&self, key: &str, default: Option<bool>) -> bool {
        match self.get(key) {
            Some(v) => v.parse::<i64>().map(|n| n == 1).unwrap_or(false),
            None => default.unwrap_or(false),
        }
    }

    /// Row offset for the `page` parameter (1-based, default 1).
    ///
    /// A page whose offset does not fit in an `i64` is a 10400 error.
    pub fn offset(&self, limit: i64) -> Result<i64, ApiError> {
        let limit = if limit <= 0 { 10 } else { limit };
        let page = self.int("page", Some(1))?;
        page.checked_sub(1)
            .and_then(|p| p.checked_mul(limit))
            .ok_or_else(|| ApiError::bad_request(format!("page[{page}] is out of range")))
    }
}

impl<S> FromRequestParts<S> for Params
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(values) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Self(values))
    }
}

/// Required, non-empty URL parameter.
pub fn path_str(params: &HashMap<String, String>, field: &str) -> Result<String, ApiError> {
    match params.get(field).filter(|v| !v.is_empty()) {
        Some(v) => Ok(v.clone()),
        None => Err(ApiError::bad_request(format!("url param[{field}] is null"))),
    }
}

pub fn path_int64(params: &HashMap<String, String>, field: &str) -> Result<i64, ApiError> {
    let value = path_str(params, field)?;
    value
        .parse()
        .map_err(|_| ApiError::bad_request(format!("cannot convert {value} to int64")))
}

/// JSON body extractor that rejects with a 10400 envelope.
#[derive(Debug, Clone)]
pub struct Bind<T>(pub T);

impl<T, S> FromRequest<S> for Bind<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Bind(value)),
            Err(rejection) => Err(ApiError::bad_request(format!(
                "参数不合法: {}",
                rejection.body_text()
            ))),
        }
    }
}
