//! FTP command lines
//!
//! Validation of outgoing command lines and classification of the lines a
//! user types at the prompt.

use crate::error::ProtocolError;

pub const AUTH_TLS: &str = "AUTH TLS";
pub const PBSZ_ZERO: &str = "PBSZ 0";
pub const PROT_PRIVATE: &str = "PROT P";
pub const PASV: &str = "PASV";
pub const QUIT: &str = "QUIT";

/// A validated, CRLF-terminated command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    line: String,
}

impl CommandLine {
    /// Normalizes `raw` into a command line.
    ///
    /// Trailing CR/LF characters are stripped and a single CRLF appended.
    /// Embedded line breaks or NUL bytes are rejected, as is a line longer
    /// than `max_len` bytes including its CRLF.
    pub fn new(raw: &str, max_len: usize) -> Result<Self, ProtocolError> {
        let command = raw.trim_end_matches(['\r', '\n']);

        if command.contains(['\r', '\n', '\0']) {
            return Err(ProtocolError::InvalidCommand(
                "line break or NUL inside command".into(),
            ));
        }

        let line = format!("{command}\r\n");
        if line.len() > max_len {
            return Err(ProtocolError::CommandTooLong {
                length: line.len(),
                max: max_len,
            });
        }

        Ok(Self { line })
    }

    /// The line as sent on the wire, CRLF included.
    pub fn as_wire(&self) -> &str {
        &self.line
    }

    /// The command without its CRLF.
    pub fn command(&self) -> &str {
        self.line.trim_end_matches("\r\n")
    }

    /// The first token, upper-cased.
    pub fn verb(&self) -> String {
        self.command()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase()
    }

    /// Everything after the verb, trimmed; `None` when empty.
    pub fn argument(&self) -> Option<&str> {
        let command = self.command().trim_start();
        let arg = command
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .unwrap_or("");
        if arg.is_empty() { None } else { Some(arg) }
    }

    pub fn is_empty(&self) -> bool {
        self.command().trim().is_empty()
    }

    /// The command with any password argument masked, for logs.
    pub fn redacted(&self) -> String {
        if self.verb() == "PASS" {
            "PASS ****".to_string()
        } else {
            self.command().to_string()
        }
    }
}

/// What the user asked for at the prompt
#[derive(Debug, PartialEq)]
pub enum Command {
    List(Option<String>),
    Retr(String),
    Stor(String),
    Unsupported(String),
    MissingArgument(String),
    Quit,
    Empty,
    Raw,
}

/// Classifies a user command line by its verb (case-insensitive).
///
/// The whole verb must match, not a prefix: `LISTX` or `RETRIEVE` go to the
/// server as raw commands instead of starting a transfer.
///
/// `QUIT` terminates only when it is the whole line; `QUIT something` is
/// forwarded like any other command.
pub fn parse_command(line: &CommandLine) -> Command {
    if line.is_empty() {
        return Command::Empty;
    }
    if line.command().trim().eq_ignore_ascii_case(QUIT) {
        return Command::Quit;
    }

    let verb = line.verb();
    let arg = line.argument().map(str::to_string);

    match verb.as_str() {
        "LIST" => Command::List(arg),
        "RETR" => arg.map_or(Command::MissingArgument(verb.clone()), Command::Retr),
        "STOR" => arg.map_or(Command::MissingArgument(verb.clone()), Command::Stor),
        "NLST" | "PORT" => Command::Unsupported(verb),
        _ => Command::Raw,
    }
}
