//! Error handlers
//!
//! Classifies errors as fatal to the session or local to one command.

use crate::error::types::{FtpClientError, ProtocolError};
use log::{error, warn};

/// Log an FTPS client error at a level matching its severity
pub fn handle_error(err: &FtpClientError) {
    if is_fatal(err) {
        error!("FTPS client error: {}", err);
    } else {
        warn!("{}", err);
    }
}

/// Whether the error leaves the control session unusable.
///
/// Local failures (bad input, rejected commands, missing local files,
/// malformed PASV replies that were fully consumed) only abort the current
/// command; everything else ends the session.
pub fn is_fatal(err: &FtpClientError) -> bool {
    match err {
        FtpClientError::Protocol(ProtocolError::CommandTooLong { .. })
        | FtpClientError::Protocol(ProtocolError::InvalidCommand(_))
        | FtpClientError::Protocol(ProtocolError::MalformedPasv(_)) => false,
        FtpClientError::UnexpectedReply { .. } | FtpClientError::LocalFile { .. } => false,
        _ => true,
    }
}
