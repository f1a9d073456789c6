//! Last-resort failure interception.
//!
//! Unwinding failures raised by downstream handlers are caught here and
//! turned into an envelope, so the serving process keeps running and every
//! request still gets exactly one response.
//!
//! # Classification
//! - [`ApiError`] payload: rendered verbatim, not logged as a fault
//! - I/O error of kind `BrokenPipe` / `ConnectionReset` (directly or anywhere
//!   in its source chain): `请求broken`
//! - anything else: `请求panic`, logged with the stack at the failure point

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use axum::{
    extract::Request,
    http::{HeaderMap, Method, Uri, Version},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use crate::http::error::ApiError;
use crate::http::response::{Envelope, CODE_INTERNAL, MESSAGE_BROKEN, MESSAGE_PANIC};

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install the panic hook that records the stack of the failing thread.
///
/// The previously installed hook still runs, except for [`ApiError`]
/// payloads which are expected control flow.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().is::<ApiError>() {
                return;
            }
            let backtrace = Backtrace::force_capture();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

fn take_backtrace() -> Option<Backtrace> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

/// How a caught failure is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Application(ApiError),
    BrokenPipe,
    Panic,
}

/// True for the socket conditions where the peer has gone away.
pub fn is_broken_pipe(err: &(dyn StdError + 'static)) -> bool {
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if matches!(
            io_err.kind(),
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
        ) {
            return true;
        }
        if let Some(inner) = io_err.get_ref() {
            if is_broken_pipe(inner) {
                return true;
            }
        }
    }
    err.source().is_some_and(is_broken_pipe)
}

pub fn classify(payload: &(dyn Any + Send)) -> Failure {
    if let Some(api) = payload.downcast_ref::<ApiError>() {
        return Failure::Application(api.clone());
    }
    let broken = if let Some(err) = payload.downcast_ref::<io::Error>() {
        is_broken_pipe(err)
    } else if let Some(err) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        is_broken_pipe(err.as_ref())
    } else {
        false
    };
    if broken {
        Failure::BrokenPipe
    } else {
        Failure::Panic
    }
}

/// Human-readable form of a panic payload.
pub fn describe(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<io::Error>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<ApiError>() {
        err.to_string()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Request head captured before the downstream call; the body is not kept.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

impl RequestSnapshot {
    pub fn capture<B>(request: &axum::http::Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }
}

impl fmt::Display for RequestSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        write!(f, "{} {} {:?}\r\n", self.method, target, self.version)?;
        for (name, value) in &self.headers {
            write!(f, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()))?;
        }
        Ok(())
    }
}

fn internal_failure(message: &str) -> Response {
    Envelope::<serde_json::Value>::failure(CODE_INTERNAL, message).into_response()
}

pub async fn recovery_middleware(request: Request, next: Next) -> Response {
    install_panic_hook();

    let snapshot = RequestSnapshot::capture(&request);
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => recover(payload.as_ref(), &snapshot),
    }
}

fn recover(payload: &(dyn Any + Send), snapshot: &RequestSnapshot) -> Response {
    match classify(payload) {
        Failure::Application(err) => {
            take_backtrace();
            err.into_response()
        }
        Failure::BrokenPipe => {
            take_backtrace();
            tracing::error!(
                path = %snapshot.uri.path(),
                error = %describe(payload),
                request = %snapshot,
                "Recovery from broken pipe"
            );
            internal_failure(MESSAGE_BROKEN)
        }
        Failure::Panic => {
            let stack = take_backtrace()
                .map(|bt| bt.to_string())
                .unwrap_or_else(|| Backtrace::force_capture().to_string());
            tracing::error!(
                error = %describe(payload),
                request = %snapshot,
                stack = %stack,
                "Recovery from panic"
            );
            internal_failure(MESSAGE_PANIC)
        }
    }
}
