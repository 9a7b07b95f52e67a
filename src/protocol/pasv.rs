//! PASV reply grammar
//!
//! `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).`

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::ProtocolError;

/// Data endpoint announced by the server in a PASV reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveEndpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl PassiveEndpoint {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }

    /// Private and unspecified addresses are not reachable from outside the
    /// server's own network.
    pub fn is_unroutable(&self) -> bool {
        self.ip.is_private() || self.ip.is_unspecified()
    }
}

/// Extracts the passive endpoint from the text of a PASV reply.
///
/// Exactly six comma-separated decimal fields in `0..=255` must appear
/// between the first `(` and the following `)`.
pub fn parse_pasv_reply(text: &str) -> Result<PassiveEndpoint, ProtocolError> {
    let malformed = || ProtocolError::MalformedPasv(text.to_string());

    let open = text.find('(').ok_or_else(malformed)?;
    let close = text[open..].find(')').ok_or_else(malformed)? + open;

    let fields = text[open + 1..close]
        .split(',')
        .map(|field| field.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| malformed())?;

    let &[h1, h2, h3, h4, p1, p2] = fields.as_slice() else {
        return Err(malformed());
    };

    Ok(PassiveEndpoint {
        ip: Ipv4Addr::new(h1, h2, h3, h4),
        port: u16::from(p1) * 256 + u16::from(p2),
    })
}
