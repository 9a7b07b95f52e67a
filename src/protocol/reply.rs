//! FTP replies
//!
//! A reply is the complete text the server sent for one command (one or
//! more lines) together with its three-digit status code.

use std::fmt;

use crate::error::ProtocolError;

pub const SERVICE_READY: u16 = 220;
pub const AUTH_ACCEPTED: u16 = 234;
pub const PASSIVE_MODE: u16 = 227;
pub const NEED_PASSWORD: u16 = 331;
pub const LOGGED_IN: u16 = 230;

/// A complete server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// The three-digit status code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The reply exactly as received, line terminators included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1xx: the command was accepted and another reply will follow.
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// 4xx or 5xx
    pub fn is_negative(&self) -> bool {
        self.code >= 400
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text.trim_end())
    }
}

/// Extracts the status code from the first line of a reply.
///
/// The line must start with three digits (first digit 1-5), followed by
/// nothing, a space, or the `-` that opens a multi-line reply.
pub fn parse_code(line: &[u8]) -> Result<u16, ProtocolError> {
    let invalid = || ProtocolError::InvalidReplyCode(String::from_utf8_lossy(line).into_owned());

    if line.len() < 3 || !line[..3].iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    if !(b'1'..=b'5').contains(&line[0]) {
        return Err(invalid());
    }
    match line.get(3) {
        None | Some(b' ') | Some(b'-') => {}
        Some(_) => return Err(invalid()),
    }

    Ok(line[..3]
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0')))
}

/// Whether `line` closes a multi-line reply opened with `code`.
pub fn is_final_line(line: &[u8], code: u16) -> bool {
    let digits = code.to_string();
    line.len() >= 3
        && &line[..3] == digits.as_bytes()
        && (line.len() == 3 || line[3] == b' ')
}
