//! Transfer module for the FTPS client
//!
//! Passive data connections and the LIST/RETR/STOR state machine that runs
//! over them.

pub mod file_ops;
pub mod modes;
pub mod operations;
pub mod orchestrator;
pub mod results;

// Re-export key types and functions
pub use file_ops::LocalFile;
pub use modes::{Direction, TransferRequest};
pub use operations::{apply_nat_workaround, connect_data, request_passive};
pub use orchestrator::{TransferSettings, run_transfer};
pub use results::{TransferPhase, TransferReport};
