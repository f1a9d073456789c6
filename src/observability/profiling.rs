//! Runtime profiling endpoint.
//!
//! Exposes a snapshot of the Tokio runtime and process state. The default
//! mount point embeds the host's first local address so that several
//! instances behind one load balancer can be told apart.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::OnceLock;
use std::time::Instant;

use axum::response::IntoResponse;
use serde::Serialize;

use crate::http::response::Envelope;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Mark the process start; later calls are no-ops.
pub fn mark_process_start() {
    PROCESS_START.get_or_init(Instant::now);
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStats {
    pub version: &'static str,
    pub pid: u32,
    pub uptime_secs: u64,
    pub workers: Option<usize>,
    pub alive_tasks: Option<usize>,
    pub global_queue_depth: Option<usize>,
}

impl RuntimeStats {
    /// Snapshot the current process. Runtime fields are `None` outside Tokio.
    pub fn collect() -> Self {
        let uptime_secs = PROCESS_START
            .get_or_init(Instant::now)
            .elapsed()
            .as_secs();
        let runtime = tokio::runtime::Handle::try_current().ok().map(|h| h.metrics());

        Self {
            version: env!("CARGO_PKG_VERSION"),
            pid: std::process::id(),
            uptime_secs,
            workers: runtime.as_ref().map(|m| m.num_workers()),
            alive_tasks: runtime.as_ref().map(|m| m.num_alive_tasks()),
            global_queue_depth: runtime.as_ref().map(|m| m.global_queue_depth()),
        }
    }

    /// `key: value` lines, one per field.
    pub fn to_text(&self) -> String {
        fn opt(v: Option<usize>) -> String {
            v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
        }
        format!(
            "version: {}\npid: {}\nuptime_secs: {}\nworkers: {}\nalive_tasks: {}\nglobal_queue_depth: {}\n",
            self.version,
            self.pid,
            self.uptime_secs,
            opt(self.workers),
            opt(self.alive_tasks),
            opt(self.global_queue_depth),
        )
    }
}

pub async fn profiling_handler() -> impl IntoResponse {
    Envelope::success(RuntimeStats::collect())
}

/// First non-loopback local address, found by routing a UDP socket.
/// No packet is sent.
pub fn local_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub fn default_profiling_path() -> String {
    format!("/hostdebug/{}/entry", local_ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_shape() {
        let path = default_profiling_path();
        assert!(path.starts_with("/hostdebug/"));
        assert!(path.ends_with("/entry"));
    }

    #[test]
    fn stats_outside_runtime() {
        let stats = RuntimeStats::collect();
        assert!(stats.workers.is_none());
        assert!(stats.to_text().contains("workers: -"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stats_inside_runtime() {
        let stats = RuntimeStats::collect();
        assert_eq!(stats.workers, Some(2));
        assert!(stats.to_text().contains(&format!("pid: {}", std::process::id())));
    }
}
