pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transfer;
pub mod transport;
pub mod utils;

pub use client::Dispatcher;
pub use config::ClientConfig;
pub use error::{FtpClientError, FtpResult};
pub use session::FtpsSession;
pub use transport::TrustContext;
