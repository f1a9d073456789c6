//! Engine bootstrap.
//!
//! # Responsibilities
//! - Validate configuration and resolve default paths/addresses
//! - Own the metrics registry for the process lifetime
//! - Wrap application routes in the middleware chain
//! - Attach the metrics and profiling endpoints when enabled
//! - Serve with connect info and graceful shutdown, starting the
//!   diagnostics listener when enabled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::schema::{DEFAULT_DIAGNOSTICS_ADDRESS, DEFAULT_METRICS_PATH};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticsError, DiagnosticsListener};
use crate::http::middleware::{
    access_log_middleware, cors_middleware, recovery::install_panic_hook, recovery_middleware,
    trace_id_layer, AccessLogState,
};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{metrics_handler, MetricsError, MetricsRegistry};
use crate::observability::profiling::{default_profiling_path, mark_process_start, profiling_handler};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0:?}")]
    Config(Vec<ValidationError>),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// The configured request pipeline plus its operational collaborators.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
    metrics_path: Option<String>,
    profiling_path: Option<String>,
    diagnostics_address: Option<SocketAddr>,
}

fn or_default(value: &str, default: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        validate_config(&config).map_err(EngineError::Config)?;
        mark_process_start();
        install_panic_hook();

        let metrics = Arc::new(MetricsRegistry::new()?);

        let metrics_path = config
            .metrics
            .then(|| or_default(&config.metrics_path, || DEFAULT_METRICS_PATH.to_string()));
        let profiling_path = config
            .profiling
            .then(|| or_default(&config.profiling_path, default_profiling_path));
        let diagnostics_address = if config.diagnostics {
            let addr = or_default(&config.diagnostics_address, || {
                DEFAULT_DIAGNOSTICS_ADDRESS.to_string()
            });
            let parsed = addr.parse().map_err(|_| {
                EngineError::Config(vec![ValidationError::BadAddress {
                    field: "diagnostics_address",
                    value: addr.clone(),
                }])
            })?;
            Some(parsed)
        } else {
            None
        };

        tracing::debug!(
            debug = config.debug,
            cors = config.cors,
            metrics_path = ?metrics_path,
            profiling_path = ?profiling_path,
            diagnostics_address = ?diagnostics_address,
            "Engine configured"
        );

        Ok(Self {
            config,
            metrics,
            metrics_path,
            profiling_path,
            diagnostics_address,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn metrics_path(&self) -> Option<&str> {
        self.metrics_path.as_deref()
    }

    pub fn profiling_path(&self) -> Option<&str> {
        self.profiling_path.as_deref()
    }

    pub fn diagnostics_address(&self) -> Option<SocketAddr> {
        self.diagnostics_address
    }

    fn access_log_state(&self) -> AccessLogState {
        AccessLogState::new(self.metrics.clone())
            .with_slow_threshold(Duration::from_millis(self.config.slow_threshold_ms))
            .with_skip_paths(self.config.skip_log_paths.iter().cloned())
    }

    /// Add the operational endpoints to `app` and wrap everything in
    /// cors → trace_id → access_log → recovery.
    pub fn router(&self, app: Router) -> Router {
        let mut app = app;
        if let Some(path) = &self.metrics_path {
            app = app.route(path, get(metrics_handler).with_state(self.metrics.clone()));
        }
        if let Some(path) = &self.profiling_path {
            app = app.route(path, get(profiling_handler));
        }

        let app = app
            .layer(from_fn(recovery_middleware))
            .layer(from_fn_with_state(self.access_log_state(), access_log_middleware))
            .layer(trace_id_layer());

        if self.config.cors {
            app.layer(from_fn(cors_middleware))
        } else {
            app
        }
    }

    /// Serve `app` on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        app: Router,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), EngineError> {
        let addr = listener.local_addr()?;

        if let Some(diag_addr) = self.diagnostics_address {
            let diagnostics = DiagnosticsListener::bind(diag_addr).await?;
            let rx = shutdown.subscribe();
            tokio::spawn(diagnostics.run(rx));
        }

        let app = self
            .router(app)
            .into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!(address = %addr, "HTTP server starting");

        let mut rx = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
