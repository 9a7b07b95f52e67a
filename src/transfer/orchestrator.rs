//! Transfer orchestrator
//!
//! Runs one LIST, RETR or STOR through its phases:
//!
//! 1. open the local file (RETR/STOR), before touching the network
//! 2. `PASV` and connect the data socket
//! 3. send the transfer command and require a `1xx` reply
//! 4. TLS handshake on the data connection
//! 5. stream the payload, then close the data connection; an existing RETR
//!    target is only emptied here, so a refused download leaves it intact
//! 6. drain exactly one completion reply from the control channel
//!
//! Once the server has answered `1xx`, step 6 always runs, whatever
//! happened in steps 4 and 5. Skipping it would leave the `226` queued and
//! every later reply would be read one command late.

use log::{debug, info};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::{ClientConfig, ServerConfig};
use crate::error::{FtpClientError, FtpResult, is_fatal};
use crate::protocol::Reply;
use crate::transfer::file_ops::{LocalFile, receive_file, receive_into, send_file};
use crate::transfer::modes::{Direction, TransferRequest};
use crate::transfer::operations::{connect_data, request_passive};
use crate::transfer::results::{TransferPhase, TransferReport};
use crate::transport::control::unexpected;
use crate::transport::{ControlChannel, PendingDataSession, TrustContext};

/// Everything a transfer needs besides the control channel
#[derive(Clone)]
pub struct TransferSettings {
    pub trust: TrustContext,
    pub server: ServerConfig,
    pub buffer_size: usize,
    /// Directory RETR writes to and STOR reads from
    pub local_dir: PathBuf,
}

impl TransferSettings {
    pub fn from_config(config: &ClientConfig, trust: TrustContext) -> Self {
        Self {
            trust,
            server: config.server.clone(),
            buffer_size: config.limits.transfer_buffer_size,
            local_dir: PathBuf::from(&config.local.directory),
        }
    }
}

/// Runs one transfer to completion.
///
/// The replies to the transfer command and any LIST payload are written to
/// `output` in the order they arrive.
///
/// # Returns
///
/// * `Ok(report)` - the control channel is still in sync; `report.error`
///   holds any failure local to this transfer
/// * `Err(e)` - the control channel failed and the session is unusable
pub async fn run_transfer<S, W>(
    control: &mut ControlChannel<S>,
    settings: &TransferSettings,
    request: TransferRequest,
    output: &mut W,
) -> FtpResult<TransferReport>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut report = TransferReport::new(request.clone());

    let mut local = match LocalFile::open_for(&request, &settings.local_dir).await {
        Ok(local) => local,
        Err(e) => {
            report.record_error(e);
            return Ok(report);
        }
    };

    let pending = match open_data(control, settings, &mut report).await {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            discard(local).await;
            return Ok(report);
        }
        Err(e) => {
            discard(local).await;
            return Err(e);
        }
    };
    report.enter(TransferPhase::DataOpened);

    let line = match control.command_line(&request.command()) {
        Ok(line) => line,
        Err(e) => {
            report.record_error(e);
            discard(local).await;
            return Ok(report);
        }
    };

    let preliminary = match control.send_command(&line).await {
        Ok(reply) => reply,
        Err(e) => {
            discard(local).await;
            return Err(e);
        }
    };
    report.enter(TransferPhase::CommandSent);
    echo(output, &preliminary, &mut report).await;
    report.preliminary = Some(preliminary.clone());

    if !preliminary.is_preliminary() {
        // No data will flow and no completion reply follows.
        drop(pending);
        report.record_error(unexpected(&line, preliminary));
        discard(local).await;
        return Ok(report);
    }

    report.enter(TransferPhase::Handshaking);
    match pending.handshake().await {
        Ok(mut session) => {
            report.enter(TransferPhase::Streaming);
            let buffer_size = settings.buffer_size;
            let streamed = match (&request, local.as_mut()) {
                (TransferRequest::Retrieve(_), Some(file)) => match file.truncate().await {
                    Ok(()) => {
                        receive_file(&mut session, file, buffer_size, &mut report.bytes).await
                    }
                    Err(e) => Err(e),
                },
                (TransferRequest::Store(_), Some(file)) => {
                    send_file(&mut session, file, buffer_size, &mut report.bytes).await
                }
                _ => {
                    receive_into(
                        &mut session,
                        output,
                        buffer_size,
                        &mut report.bytes,
                        FtpClientError::Io,
                    )
                    .await
                }
            };
            if let Err(e) = streamed {
                report.record_error(e);
            }

            let closed = session.close().await;
            match (closed, request.direction()) {
                (Ok(()), _) => {}
                // The server may already have torn down its end.
                (Err(e), Direction::Receive) => debug!("Closing data connection: {}", e),
                (Err(e), Direction::Send) => report.record_error(e),
            }

            if let Some(file) = local.take() {
                if let TransferRequest::Retrieve(_) = request {
                    if let Err(e) = file.finish().await {
                        report.record_error(e);
                    }
                }
            }
        }
        Err(e) => {
            report.record_error(e);
            discard(local).await;
        }
    }

    report.enter(TransferPhase::Draining);
    let completion = control.read_reply().await?;
    if !completion.is_completion() {
        report.record_error(unexpected(&line, completion.clone()));
    }
    echo(output, &completion, &mut report).await;
    report.completion = Some(completion);

    if report.is_success() {
        info!("{} complete, {} bytes", request, report.bytes);
    }
    Ok(report)
}

/// `PASV` plus connect.
///
/// `Ok(None)` means the attempt failed but the control channel is fine;
/// the error is recorded in `report`.
async fn open_data<S>(
    control: &mut ControlChannel<S>,
    settings: &TransferSettings,
    report: &mut TransferReport,
) -> FtpResult<Option<PendingDataSession>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let endpoint = match request_passive(control, settings.server.pasv_nat_workaround).await {
        Ok(endpoint) => endpoint,
        Err(e) if is_fatal(&e) => return Err(e),
        Err(e) => {
            report.record_error(e);
            return Ok(None);
        }
    };

    match connect_data(endpoint, &settings.trust, &settings.server).await {
        Ok(pending) => Ok(Some(pending)),
        Err(e) => {
            report.record_error(e);
            Ok(None)
        }
    }
}

async fn echo<W>(output: &mut W, reply: &Reply, report: &mut TransferReport)
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let written = async {
        output.write_all(reply.text().as_bytes()).await?;
        output.flush().await
    }
    .await;
    if let Err(e) = written {
        report.record_error(FtpClientError::Io(e));
    }
}

async fn discard(local: Option<LocalFile>) {
    if let Some(local) = local {
        local.discard().await;
    }
}
