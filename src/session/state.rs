//! Session state
//!
//! Tracks how far the login sequence got and what the server said.

use std::fmt;

use crate::protocol::Reply;

/// Data channel protection negotiated with `PROT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtectionLevel {
    /// `PROT C`, the state before negotiation
    #[default]
    Clear,
    /// `PROT P`, data channels are encrypted
    Private,
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionLevel::Clear => write!(f, "C"),
            ProtectionLevel::Private => write!(f, "P"),
        }
    }
}

/// Represents the state of a control session.
#[derive(Debug, Default)]
pub struct SessionState {
    greeting: Option<Reply>,
    control_encrypted: bool,
    protection: ProtectionLevel,
    username: Option<String>,
    logged_in: bool,
    closed: bool,
}

impl SessionState {
    pub fn greeting(&self) -> Option<&Reply> {
        self.greeting.as_ref()
    }

    pub fn set_greeting(&mut self, greeting: Reply) {
        self.greeting = Some(greeting);
    }

    pub fn is_control_encrypted(&self) -> bool {
        self.control_encrypted
    }

    pub fn mark_control_encrypted(&mut self) {
        self.control_encrypted = true;
    }

    pub fn protection(&self) -> ProtectionLevel {
        self.protection
    }

    pub fn set_protection(&mut self, level: ProtectionLevel) {
        self.protection = level;
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn login(&mut self, username: &str) {
        self.username = Some(username.to_string());
        self.logged_in = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the session finished. No commands are sent afterwards.
    pub fn close(&mut self) {
        self.logged_in = false;
        self.closed = true;
    }
}
