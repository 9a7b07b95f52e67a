//! Module `control`
//!
//! The control connection: one validated command line out, one complete
//! reply back. The same type serves the plaintext channel before
//! `AUTH TLS` and the encrypted channel afterwards; `upgrade` consumes the
//! plaintext channel so it cannot be written to once TLS is up.

use log::{debug, trace};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_rustls::client::TlsStream;

use crate::config::LimitsConfig;
use crate::error::{FtpClientError, FtpResult, ProtocolError};
use crate::protocol::{CommandLine, Reply, read_reply};
use crate::transport::tls::TrustContext;
use crate::utils::network::with_timeout;

/// Control connection over any byte stream
pub struct ControlChannel<S> {
    reader: BufReader<S>,
    max_reply_length: usize,
    max_command_length: usize,
    reply_timeout: Option<Duration>,
    peer: Option<SocketAddr>,
}

impl<S> ControlChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    ///
    /// # Arguments
    ///
    /// * `stream` - Connected control stream
    /// * `limits` - Reply and command size limits
    /// * `reply_timeout` - Bound on every reply read and write; `None` waits forever
    pub fn new(stream: S, limits: &LimitsConfig, reply_timeout: Option<Duration>) -> Self {
        Self {
            reader: BufReader::new(stream),
            max_reply_length: limits.max_reply_length,
            max_command_length: limits.max_command_length,
            reply_timeout,
            peer: None,
        }
    }

    /// Records the remote address of the underlying socket.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout
    }

    /// Validates `raw` against this channel's command length limit.
    pub fn command_line(&self, raw: &str) -> FtpResult<CommandLine> {
        Ok(CommandLine::new(raw, self.max_command_length)?)
    }

    /// Reads one complete reply.
    pub async fn read_reply(&mut self) -> FtpResult<Reply> {
        let max_len = self.max_reply_length;
        let reader = &mut self.reader;
        let reply = with_timeout(self.reply_timeout, read_reply(reader, max_len)).await?;
        trace!("<<< {}", reply.text().trim_end());
        Ok(reply)
    }

    /// Writes the whole line and flushes it, without reading a reply.
    pub async fn send_line(&mut self, line: &CommandLine) -> FtpResult<()> {
        trace!(">>> {}", line.redacted());
        let stream = &mut self.reader;
        with_timeout(self.reply_timeout, async move {
            stream.write_all(line.as_wire().as_bytes()).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    /// Sends `line` and reads exactly one reply.
    ///
    /// A failed write returns immediately; no reply is read.
    pub async fn send_command(&mut self, line: &CommandLine) -> FtpResult<Reply> {
        self.send_line(line).await?;
        self.read_reply().await
    }

    /// Validates and sends a raw command, returning its reply.
    pub async fn execute(&mut self, raw: &str) -> FtpResult<Reply> {
        let line = self.command_line(raw)?;
        self.send_command(&line).await
    }

    /// Like `execute`, but any reply other than `code` is an error.
    pub async fn expect_code(&mut self, raw: &str, code: u16) -> FtpResult<Reply> {
        let line = self.command_line(raw)?;
        let reply = self.send_command(&line).await?;
        if reply.code() != code {
            return Err(unexpected(&line, reply));
        }
        Ok(reply)
    }

    /// Like `execute`, but the reply must be `2xx`.
    pub async fn expect_completion(&mut self, raw: &str) -> FtpResult<Reply> {
        let line = self.command_line(raw)?;
        let reply = self.send_command(&line).await?;
        if !reply.is_completion() {
            return Err(unexpected(&line, reply));
        }
        Ok(reply)
    }

    /// Closes the write half: close_notify on TLS, FIN on TCP.
    pub async fn shutdown(&mut self) -> FtpResult<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Performs the TLS handshake over this connection.
    ///
    /// Consumes the plaintext channel. Fails if the server already sent
    /// bytes beyond the `234` reply, since those would be read as plaintext.
    pub async fn upgrade(self, trust: &TrustContext) -> FtpResult<ControlChannel<TlsStream<S>>> {
        let buffered = self.reader.buffer().len();
        if buffered > 0 {
            return Err(ProtocolError::BufferedPlaintext(buffered).into());
        }

        debug!("Starting TLS handshake on control channel");
        let stream = trust
            .handshake(self.reader.into_inner(), self.reply_timeout)
            .await?;
        debug!("Control channel encrypted");

        Ok(ControlChannel {
            reader: BufReader::new(stream),
            max_reply_length: self.max_reply_length,
            max_command_length: self.max_command_length,
            reply_timeout: self.reply_timeout,
            peer: self.peer,
        })
    }
}

/// Builds the error for a reply the caller did not accept.
pub fn unexpected(line: &CommandLine, reply: Reply) -> FtpClientError {
    FtpClientError::UnexpectedReply {
        command: line.redacted(),
        reply,
    }
}
