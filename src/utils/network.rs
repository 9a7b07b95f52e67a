//! Network utilities
//!
//! Provides timeout wrapping and TCP connection helpers.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::error::{FtpClientError, FtpResult};

/// Runs `operation`, bounded by `limit` when one is set.
pub async fn with_timeout<T, F>(limit: Option<Duration>, operation: F) -> FtpResult<T>
where
    F: Future<Output = FtpResult<T>>,
{
    match limit {
        Some(duration) => tokio::time::timeout(duration, operation)
            .await
            .map_err(|_| FtpClientError::Timeout(duration))?,
        None => operation.await,
    }
}

/// Opens a TCP connection to `addr` (host:port).
pub async fn connect_tcp(addr: &str, limit: Option<Duration>) -> FtpResult<TcpStream> {
    debug!("Connecting to {}", addr);

    let stream = with_timeout(limit, async {
        TcpStream::connect(addr)
            .await
            .map_err(|source| FtpClientError::Connect {
                addr: addr.to_string(),
                source,
            })
    })
    .await?;

    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY on {}: {}", addr, e);
    }

    Ok(stream)
}
