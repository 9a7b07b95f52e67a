//! Module `data_channel`
//!
//! Data connections for a single transfer. A connection starts as a
//! `PendingDataSession`: TCP connected, TLS not yet started. The server only
//! begins negotiating once it has seen the transfer command, so the
//! handshake is a separate step that turns it into a `SecureDataSession`.

use log::debug;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::error::FtpResult;
use crate::transport::tls::TrustContext;
use crate::utils::network::with_timeout;

/// A connected data socket awaiting its TLS handshake
pub struct PendingDataSession<S = TcpStream> {
    stream: S,
    endpoint: SocketAddr,
    trust: TrustContext,
    timeout: Option<Duration>,
}

/// An encrypted data connection
pub struct SecureDataSession<S = TcpStream> {
    stream: TlsStream<S>,
    endpoint: SocketAddr,
    timeout: Option<Duration>,
}

impl<S> PendingDataSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        endpoint: SocketAddr,
        trust: TrustContext,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            stream,
            endpoint,
            trust,
            timeout,
        }
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Negotiates TLS with the shared trust context.
    ///
    /// Dropping the session instead closes the socket without a handshake.
    pub async fn handshake(self) -> FtpResult<SecureDataSession<S>> {
        debug!("TLS handshake on data connection {}", self.endpoint);
        let stream = self.trust.handshake(self.stream, self.timeout).await?;
        Ok(SecureDataSession {
            stream,
            endpoint: self.endpoint,
            timeout: self.timeout,
        })
    }
}

impl<S> SecureDataSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the next chunk; `Ok(0)` means the server finished sending.
    ///
    /// Many servers close data connections without close_notify. That
    /// truncation is treated as end of stream; the completion reply on the
    /// control channel confirms the transfer.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> FtpResult<usize> {
        let stream = &mut self.stream;
        with_timeout(self.timeout, async move {
            match stream.read(buf).await {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    debug!("Data connection closed without close_notify");
                    Ok(0)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    pub async fn write_all(&mut self, data: &[u8]) -> FtpResult<()> {
        let stream = &mut self.stream;
        with_timeout(self.timeout, async move {
            stream.write_all(data).await?;
            Ok(())
        })
        .await
    }

    /// Sends close_notify, flushes, and drops the socket.
    pub async fn close(mut self) -> FtpResult<()> {
        let stream = &mut self.stream;
        let result = with_timeout(self.timeout, async move {
            stream.shutdown().await?;
            Ok(())
        })
        .await;
        debug!("Data connection {} closed", self.endpoint);
        result
    }
}
