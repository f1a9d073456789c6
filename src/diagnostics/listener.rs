//! Background diagnostics listener.
//!
//! # Responsibilities
//! - Bind the configured address
//! - Serve each connection on its own task
//! - Stop accepting when shutdown is signalled

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::diagnostics::protocol;

/// How long a client may take to send its command byte.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("Failed to bind diagnostics listener: {0}")]
    Bind(std::io::Error),
}

pub struct DiagnosticsListener {
    inner: TcpListener,
}

impl DiagnosticsListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, DiagnosticsError> {
        let inner = TcpListener::bind(addr).await.map_err(DiagnosticsError::Bind)?;
        let local_addr = inner.local_addr().map_err(DiagnosticsError::Bind)?;

        tracing::info!(address = %local_addr, "Diagnostics listener bound");

        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Accept connections until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream).await {
                                tracing::debug!(peer = %peer, error = %e, "Diagnostics connection failed");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Diagnostics accept failed");
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Diagnostics listener received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

async fn serve(mut stream: TcpStream) -> std::io::Result<()> {
    let mut command = [0u8; 1];
    tokio::time::timeout(READ_TIMEOUT, stream.read_exact(&mut command))
        .await
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::TimedOut))??;

    stream.write_all(protocol::respond(command[0]).as_bytes()).await?;
    stream.shutdown().await
}
