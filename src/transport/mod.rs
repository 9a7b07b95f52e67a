pub mod control;
pub mod data_channel;
pub mod tls;

#[cfg(test)]
pub(crate) mod test_support;

pub use control::ControlChannel;
pub use data_channel::{PendingDataSession, SecureDataSession};
pub use tls::TrustContext;

use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// Control channel before `AUTH TLS`
pub type PlainControlChannel = ControlChannel<TcpStream>;

/// Control channel after the TLS upgrade
pub type SecureControlChannel = ControlChannel<TlsStream<TcpStream>>;
