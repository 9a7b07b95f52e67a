//! Module `dispatcher`
//!
//! The interactive prompt. Reads one command per line, routes data
//! transfers to the orchestrator, forwards everything else to the server,
//! and prints the replies.

use log::{debug, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::client::results::DispatchOutcome;
use crate::error::{FtpClientError, FtpResult, is_fatal};
use crate::protocol::{Command, Reply, parse_command};
use crate::session::FtpsSession;
use crate::transfer::TransferRequest;

pub const PROMPT: &str = "ftps> ";
pub const UNSUPPORTED_MESSAGE: &str = "Command not supported. Use LIST and PASV instead.";

/// Prompt loop over an input source, an output sink and a diagnostics sink
pub struct Dispatcher<R, W, E> {
    input: R,
    output: W,
    diagnostics: E,
    show_prompt: bool,
}

impl<R, W, E> Dispatcher<R, W, E>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W, diagnostics: E) -> Self {
        Self {
            input,
            output,
            diagnostics,
            show_prompt: true,
        }
    }

    /// Disables the `ftps> ` prompt, for scripted input.
    pub fn without_prompt(mut self) -> Self {
        self.show_prompt = false;
        self
    }

    pub fn into_parts(self) -> (R, W, E) {
        (self.input, self.output, self.diagnostics)
    }

    /// Runs until `QUIT`, end of input, or a fatal error.
    ///
    /// End of input sends `QUIT` like the user typed it. A fatal error
    /// closes the session and is returned.
    pub async fn run<S>(&mut self, session: &mut FtpsSession<S>) -> FtpResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            self.prompt().await?;

            let outcome = match self.read_line().await? {
                Some(raw) => self.dispatch_line(session, &raw).await,
                None => {
                    info!("End of input, sending QUIT");
                    self.quit(session).await
                }
            };

            match outcome {
                Ok(DispatchOutcome::Continue) => {}
                Ok(DispatchOutcome::Quit) => return Ok(()),
                Err(e) if !is_fatal(&e) => self.diagnose(&e).await?,
                Err(e) => {
                    session.close().await;
                    return Err(e);
                }
            }
        }
    }

    /// Handles one input line.
    pub async fn dispatch_line<S>(
        &mut self,
        session: &mut FtpsSession<S>,
        raw: &str,
    ) -> FtpResult<DispatchOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let line = session.command_line(raw)?;

        match parse_command(&line) {
            Command::Empty => Ok(DispatchOutcome::Continue),
            Command::Quit => {
                let reply = session.quit_with(&line).await?;
                self.print_reply(&reply).await?;
                Ok(DispatchOutcome::Quit)
            }
            Command::Unsupported(verb) => {
                debug!("Refusing {} locally", verb);
                self.print(UNSUPPORTED_MESSAGE).await?;
                Ok(DispatchOutcome::Continue)
            }
            Command::MissingArgument(verb) => {
                self.complain(&format!("Usage: {} <file name>", verb))
                    .await?;
                Ok(DispatchOutcome::Continue)
            }
            Command::List(path) => self.transfer(session, TransferRequest::List(path)).await,
            Command::Retr(name) => self.transfer(session, TransferRequest::Retrieve(name)).await,
            Command::Stor(name) => self.transfer(session, TransferRequest::Store(name)).await,
            Command::Raw => {
                let reply = session.send_command(&line).await?;
                self.print_reply(&reply).await?;
                Ok(DispatchOutcome::Continue)
            }
        }
    }

    async fn transfer<S>(
        &mut self,
        session: &mut FtpsSession<S>,
        request: TransferRequest,
    ) -> FtpResult<DispatchOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let report = session.transfer(request, &mut self.output).await?;
        if let Some(err) = &report.error {
            self.diagnose(err).await?;
        }
        Ok(DispatchOutcome::Continue)
    }

    async fn quit<S>(&mut self, session: &mut FtpsSession<S>) -> FtpResult<DispatchOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let reply = session.quit().await?;
        self.print_reply(&reply).await?;
        Ok(DispatchOutcome::Quit)
    }

    /// Next line without its terminator; `None` at end of input.
    async fn read_line(&mut self) -> FtpResult<Option<String>> {
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    async fn prompt(&mut self) -> FtpResult<()> {
        if self.show_prompt {
            self.output.write_all(PROMPT.as_bytes()).await?;
            self.output.flush().await?;
        }
        Ok(())
    }

    async fn print_reply(&mut self, reply: &Reply) -> FtpResult<()> {
        self.output.write_all(reply.text().as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn print(&mut self, message: &str) -> FtpResult<()> {
        self.output.write_all(message.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn complain(&mut self, message: &str) -> FtpResult<()> {
        self.diagnostics.write_all(message.as_bytes()).await?;
        self.diagnostics.write_all(b"\n").await?;
        self.diagnostics.flush().await?;
        Ok(())
    }

    async fn diagnose(&mut self, err: &FtpClientError) -> FtpResult<()> {
        debug!("Command failed: {:?}", err);
        self.complain(&format!("Error: {}", err)).await
    }
}
