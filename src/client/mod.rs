//! Interactive client
//!
//! The prompt loop that drives a logged-in session.

pub mod dispatcher;
pub mod results;

pub use dispatcher::{Dispatcher, PROMPT, UNSUPPORTED_MESSAGE};
pub use results::DispatchOutcome;
