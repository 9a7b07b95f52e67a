//! Transfer requests
//!
//! The three commands that move data over a passive data connection.

use std::fmt;

/// Which way the payload flows on the data connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Send,
}

/// A data-channel command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRequest {
    /// Directory listing, optionally for a path
    List(Option<String>),
    /// Download a remote file to the local file of the same name
    Retrieve(String),
    /// Upload a local file to the remote file of the same name
    Store(String),
}

impl TransferRequest {
    pub fn direction(&self) -> Direction {
        match self {
            TransferRequest::List(_) | TransferRequest::Retrieve(_) => Direction::Receive,
            TransferRequest::Store(_) => Direction::Send,
        }
    }

    /// The command sent on the control channel.
    pub fn command(&self) -> String {
        match self {
            TransferRequest::List(None) => "LIST".to_string(),
            TransferRequest::List(Some(path)) => format!("LIST {}", path),
            TransferRequest::Retrieve(name) => format!("RETR {}", name),
            TransferRequest::Store(name) => format!("STOR {}", name),
        }
    }
}

impl fmt::Display for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command())
    }
}
