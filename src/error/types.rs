//! Error types
//!
//! Defines the error taxonomy of the FTPS client: connection, channel I/O,
//! TLS negotiation, protocol grammar, reply codes and local files.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::Reply;

/// Violations of the FTP reply/command grammar
#[derive(Debug)]
pub enum ProtocolError {
    MalformedPasv(String),
    InvalidReplyCode(String),
    ReplyTooLong(usize),
    CommandTooLong { length: usize, max: usize },
    InvalidCommand(String),
    BufferedPlaintext(usize),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MalformedPasv(text) => {
                write!(f, "Malformed PASV reply: {}", text.trim_end())
            }
            ProtocolError::InvalidReplyCode(line) => {
                write!(f, "Invalid reply code in: {}", line.trim_end())
            }
            ProtocolError::ReplyTooLong(max) => {
                write!(f, "Reply exceeds the maximum of {} bytes", max)
            }
            ProtocolError::CommandTooLong { length, max } => {
                write!(f, "Command is {} bytes, maximum is {}", length, max)
            }
            ProtocolError::InvalidCommand(msg) => write!(f, "Invalid command: {}", msg),
            ProtocolError::BufferedPlaintext(n) => write!(
                f,
                "{} plaintext bytes received before the TLS handshake",
                n
            ),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// General error for every client operation
#[derive(Debug)]
pub enum FtpClientError {
    Connect { addr: String, source: io::Error },
    Io(io::Error),
    PeerClosed,
    Timeout(Duration),
    TlsHandshake(String),
    Protocol(ProtocolError),
    UnexpectedReply { command: String, reply: Reply },
    LocalFile { path: PathBuf, source: io::Error },
    Config(String),
}

impl fmt::Display for FtpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpClientError::Connect { addr, source } => {
                write!(f, "Failed to connect to {}: {}", addr, source)
            }
            FtpClientError::Io(e) => write!(f, "I/O error: {}", e),
            FtpClientError::PeerClosed => write!(f, "Connection closed by the server"),
            FtpClientError::Timeout(d) => write!(f, "Timed out after {:?}", d),
            FtpClientError::TlsHandshake(msg) => write!(f, "TLS handshake failed: {}", msg),
            FtpClientError::Protocol(e) => write!(f, "Protocol error: {}", e),
            FtpClientError::UnexpectedReply { command, reply } => write!(
                f,
                "Unexpected reply to {}: {}",
                command,
                reply.text().trim_end()
            ),
            FtpClientError::LocalFile { path, source } => {
                write!(f, "Local file {}: {}", path.display(), source)
            }
            FtpClientError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for FtpClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FtpClientError::Connect { source, .. } => Some(source),
            FtpClientError::Io(e) => Some(e),
            FtpClientError::Protocol(e) => Some(e),
            FtpClientError::LocalFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for FtpClientError {
    fn from(error: io::Error) -> Self {
        FtpClientError::Io(error)
    }
}

impl From<ProtocolError> for FtpClientError {
    fn from(error: ProtocolError) -> Self {
        FtpClientError::Protocol(error)
    }
}

impl From<config::ConfigError> for FtpClientError {
    fn from(error: config::ConfigError) -> Self {
        FtpClientError::Config(error.to_string())
    }
}

pub type FtpResult<T> = Result<T, FtpClientError>;
