//! Session module
//!
//! The control session: secure login and the commands run over it.

pub mod core;
pub mod login;
pub mod state;

pub use self::core::FtpsSession;
pub use state::{ProtectionLevel, SessionState};
