//! Transfer operations
//!
//! Passive-mode negotiation: ask the server for a data endpoint with `PASV`
//! and connect to it. The returned data session is not yet encrypted.

use log::{debug, info, warn};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ServerConfig;
use crate::error::FtpResult;
use crate::protocol::commands::PASV;
use crate::protocol::reply::PASSIVE_MODE;
use crate::protocol::{PassiveEndpoint, parse_pasv_reply};
use crate::transport::control::unexpected;
use crate::transport::{ControlChannel, PendingDataSession, TrustContext};
use crate::utils::network::connect_tcp;

/// Sends `PASV` and parses the announced endpoint.
///
/// # Errors
///
/// * `UnexpectedReply` - the reply code is not `227`
/// * `Protocol(MalformedPasv)` - the reply carries no valid address tuple
/// * control channel I/O errors
pub async fn request_passive<S>(
    control: &mut ControlChannel<S>,
    nat_workaround: bool,
) -> FtpResult<PassiveEndpoint>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let line = control.command_line(PASV)?;
    let reply = control.send_command(&line).await?;
    if reply.code() != PASSIVE_MODE {
        return Err(unexpected(&line, reply));
    }

    let announced = parse_pasv_reply(reply.text())?;
    debug!("Server announced passive endpoint {}", announced.socket_addr());

    if nat_workaround {
        Ok(apply_nat_workaround(announced, control.peer_addr()))
    } else {
        Ok(announced)
    }
}

/// Replaces a private or unspecified PASV address with the control peer's
/// address. Servers behind NAT often announce their internal address.
pub fn apply_nat_workaround(
    endpoint: PassiveEndpoint,
    peer: Option<SocketAddr>,
) -> PassiveEndpoint {
    if !endpoint.is_unroutable() {
        return endpoint;
    }

    match peer.map(|addr| addr.ip()) {
        Some(IpAddr::V4(peer_ip)) if peer_ip != endpoint.ip => {
            info!(
                "PASV announced {}, using control peer {} instead",
                endpoint.ip, peer_ip
            );
            PassiveEndpoint {
                ip: peer_ip,
                port: endpoint.port,
            }
        }
        Some(IpAddr::V6(peer_ip)) => {
            warn!(
                "PASV announced {} but control peer {} is IPv6, keeping it",
                endpoint.ip, peer_ip
            );
            endpoint
        }
        _ => endpoint,
    }
}

/// Connects to the passive endpoint without starting TLS.
pub async fn connect_data(
    endpoint: PassiveEndpoint,
    trust: &TrustContext,
    server: &ServerConfig,
) -> FtpResult<PendingDataSession> {
    let addr = endpoint.socket_addr();
    let stream = connect_tcp(&addr.to_string(), server.connect_timeout()).await?;
    debug!("Data connection established to {}", addr);
    Ok(PendingDataSession::new(
        stream,
        addr,
        trust.clone(),
        server.reply_timeout(),
    ))
}
