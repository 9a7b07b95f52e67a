//! Core session implementation
//!
//! An `FtpsSession` is a logged-in control connection whose TLS upgrade
//! and `PROT P` negotiation already succeeded. There is no way to obtain
//! one over a plaintext channel.

use log::{debug, info, warn};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::config::ClientConfig;
use crate::error::{FtpClientError, FtpResult};
use crate::protocol::commands::QUIT;
use crate::protocol::{CommandLine, Reply};
use crate::session::login::secure_login;
use crate::session::state::{ProtectionLevel, SessionState};
use crate::transfer::{TransferReport, TransferRequest, TransferSettings, run_transfer};
use crate::transport::{ControlChannel, TrustContext};
use crate::utils::network::connect_tcp;

/// A logged-in FTPS session
pub struct FtpsSession<S = TcpStream> {
    control: ControlChannel<TlsStream<S>>,
    settings: TransferSettings,
    state: SessionState,
}

impl FtpsSession<TcpStream> {
    /// Connects to the configured server and runs the secure login.
    ///
    /// Any failure here is fatal; there is no fallback to plaintext.
    pub async fn establish(config: &ClientConfig, trust: TrustContext) -> FtpResult<Self> {
        let addr = config.server.control_address();
        let stream = connect_tcp(&addr, config.server.connect_timeout()).await?;
        let peer = stream.peer_addr().ok();
        info!("Connected to {}", addr);

        Self::login_over(stream, peer, config, trust).await
    }
}

impl<S> FtpsSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs the secure login over an already connected stream.
    pub async fn login_over(
        stream: S,
        peer: Option<SocketAddr>,
        config: &ClientConfig,
        trust: TrustContext,
    ) -> FtpResult<Self> {
        let mut control = ControlChannel::new(stream, &config.limits, config.server.reply_timeout());
        if let Some(peer) = peer {
            control = control.with_peer(peer);
        }

        let mut state = SessionState::default();
        let control = secure_login(control, &trust, &config.auth, &mut state).await?;

        Ok(Self {
            control,
            settings: TransferSettings::from_config(config, trust),
            state,
        })
    }

    /// The `220` text the server greeted us with.
    pub fn greeting(&self) -> Option<&Reply> {
        self.state.greeting()
    }

    pub fn protection(&self) -> ProtectionLevel {
        self.state.protection()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Validates a user command against the command length limit.
    pub fn command_line(&self, raw: &str) -> FtpResult<CommandLine> {
        self.control.command_line(raw)
    }

    /// Sends one command on the encrypted channel and returns its reply.
    pub async fn send_command(&mut self, line: &CommandLine) -> FtpResult<Reply> {
        self.ensure_open()?;
        self.control.send_command(line).await
    }

    /// Runs a LIST, RETR or STOR, echoing its replies and any listing to
    /// `output`.
    pub async fn transfer<W>(
        &mut self,
        request: TransferRequest,
        output: &mut W,
    ) -> FtpResult<TransferReport>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.ensure_open()?;
        run_transfer(&mut self.control, &self.settings, request, output).await
    }

    /// Sends `QUIT`, reads the goodbye and closes the connection.
    pub async fn quit(&mut self) -> FtpResult<Reply> {
        let line = self.control.command_line(QUIT)?;
        self.quit_with(&line).await
    }

    /// Like `quit`, with the user's own spelling of the command.
    pub async fn quit_with(&mut self, line: &CommandLine) -> FtpResult<Reply> {
        self.ensure_open()?;
        let result = self.control.send_command(line).await;
        self.close().await;
        result
    }

    /// Closes TLS and the socket without sending `QUIT`.
    pub async fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state.close();
        match self.control.shutdown().await {
            Ok(()) => debug!("Control connection closed"),
            Err(e) => warn!("Error while closing control connection: {}", e),
        }
    }

    fn ensure_open(&self) -> FtpResult<()> {
        if self.state.is_closed() {
            return Err(FtpClientError::PeerClosed);
        }
        Ok(())
    }
}
