//! Client result types
//!
//! Defines what the dispatcher reports after handling one input line.

/// Whether the prompt loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    Quit,
}
