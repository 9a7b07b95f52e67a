//! Transfer result types
//!
//! Defines the phases of a transfer and the report returned once it ends.

use log::debug;

use crate::error::FtpClientError;
use crate::protocol::Reply;
use crate::transfer::modes::TransferRequest;

/// Phase of the per-transfer state machine
///
/// `Idle -> DataOpened -> CommandSent -> Handshaking -> Streaming -> Draining`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferPhase {
    Idle,
    DataOpened,
    CommandSent,
    Handshaking,
    Streaming,
    Draining,
}

/// Outcome of one LIST, RETR or STOR
#[derive(Debug)]
pub struct TransferReport {
    pub request: TransferRequest,
    /// Payload bytes moved over the data connection
    pub bytes: u64,
    /// Reply to the transfer command (normally `150`)
    pub preliminary: Option<Reply>,
    /// Reply drained after the data connection closed (normally `226`)
    pub completion: Option<Reply>,
    /// Last phase reached
    pub phase: TransferPhase,
    /// First error hit during the transfer, if any
    pub error: Option<FtpClientError>,
}

impl TransferReport {
    pub fn new(request: TransferRequest) -> Self {
        Self {
            request,
            bytes: 0,
            preliminary: None,
            completion: None,
            phase: TransferPhase::Idle,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.completion.as_ref().is_some_and(Reply::is_completion)
    }

    /// Whether exactly one completion reply was consumed after a `1xx`.
    pub fn drained(&self) -> bool {
        self.completion.is_some()
    }

    /// Keeps the first error; later ones are consequences of it.
    pub(crate) fn record_error(&mut self, err: FtpClientError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub(crate) fn enter(&mut self, phase: TransferPhase) {
        debug!("{}: {:?} -> {:?}", self.request, self.phase, phase);
        self.phase = phase;
    }
}
