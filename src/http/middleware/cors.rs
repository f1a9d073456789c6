//! Permissive CORS headers and preflight short-circuit.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, UPDATE, HEAD, OPTIONS";
const ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Authorization";
const EXPOSE_HEADERS: &str = "Content-Length, Access-Control-Allow-Origin, Access-Control-Allow-Headers, Access-Control-Request-Headers, Cache-Control, Content-Language, Content-Type";
const MAX_AGE: &str = "3600";

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(EXPOSE_HEADERS));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
}

/// Attach CORS headers when the request has an `Origin`; answer every
/// `OPTIONS` request with an empty 204.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    let has_origin = request
        .headers()
        .get(header::ORIGIN)
        .is_some_and(|v| !v.is_empty());

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if has_origin {
        let status = response.status();
        let headers = response.headers_mut();
        apply_cors_headers(headers);
        if status != StatusCode::NO_CONTENT && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
    }

    response
}
