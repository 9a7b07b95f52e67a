//! Explicit FTPS login
//!
//! `220` greeting, `AUTH TLS` and the handshake, then `PBSZ 0` / `PROT P`
//! and the credentials, all on the encrypted channel. Each step runs only
//! after the previous one was accepted; any other reply ends the session.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;

use crate::config::AuthConfig;
use crate::error::{FtpClientError, FtpResult};
use crate::protocol::commands::{AUTH_TLS, PBSZ_ZERO, PROT_PRIVATE};
use crate::protocol::reply::{AUTH_ACCEPTED, LOGGED_IN, NEED_PASSWORD, SERVICE_READY};
use crate::protocol::Reply;
use crate::session::state::{ProtectionLevel, SessionState};
use crate::transport::control::unexpected;
use crate::transport::{ControlChannel, TrustContext};

/// Reads the server greeting, which must be `220`.
pub async fn read_greeting<S>(
    control: &mut ControlChannel<S>,
    state: &mut SessionState,
) -> FtpResult<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting = control.read_reply().await?;
    if greeting.code() != SERVICE_READY {
        return Err(FtpClientError::UnexpectedReply {
            command: "(greeting)".to_string(),
            reply: greeting,
        });
    }
    state.set_greeting(greeting.clone());
    Ok(greeting)
}

/// `AUTH TLS`, then the handshake over the same connection.
pub async fn upgrade_control<S>(
    mut control: ControlChannel<S>,
    trust: &TrustContext,
    state: &mut SessionState,
) -> FtpResult<ControlChannel<TlsStream<S>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    control.expect_code(AUTH_TLS, AUTH_ACCEPTED).await?;
    let secure = control.upgrade(trust).await?;
    state.mark_control_encrypted();
    info!("Control channel upgraded to TLS");
    Ok(secure)
}

/// `PBSZ 0` and `PROT P`: every data channel will be encrypted.
pub async fn negotiate_protection<S>(
    control: &mut ControlChannel<S>,
    state: &mut SessionState,
) -> FtpResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    control.expect_completion(PBSZ_ZERO).await?;
    control.expect_completion(PROT_PRIVATE).await?;
    state.set_protection(ProtectionLevel::Private);
    debug!("Data channel protection set to {}", state.protection());
    Ok(())
}

/// `USER`, then `PASS` if the server asks for it.
pub async fn authenticate<S>(
    control: &mut ControlChannel<S>,
    auth: &AuthConfig,
    state: &mut SessionState,
) -> FtpResult<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let user = control.command_line(&format!("USER {}", auth.username))?;
    let reply = control.send_command(&user).await?;

    let reply = match reply.code() {
        LOGGED_IN => reply,
        NEED_PASSWORD => {
            let pass = control.command_line(&format!("PASS {}", auth.password))?;
            let reply = control.send_command(&pass).await?;
            if reply.code() != LOGGED_IN {
                return Err(unexpected(&pass, reply));
            }
            reply
        }
        _ => return Err(unexpected(&user, reply)),
    };

    state.login(&auth.username);
    info!("Logged in as {}", auth.username);
    Ok(reply)
}

/// Runs the whole sequence on a freshly connected control channel.
pub async fn secure_login<S>(
    mut control: ControlChannel<S>,
    trust: &TrustContext,
    auth: &AuthConfig,
    state: &mut SessionState,
) -> FtpResult<ControlChannel<TlsStream<S>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    read_greeting(&mut control, state).await?;
    let mut secure = upgrade_control(control, trust, state).await?;
    negotiate_protection(&mut secure, state).await?;
    authenticate(&mut secure, auth, state).await?;
    Ok(secure)
}
