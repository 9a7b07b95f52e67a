//! FTP protocol layer
//!
//! Reply grammar, the reply reader, command lines and PASV parsing.

pub mod commands;
pub mod pasv;
pub mod reader;
pub mod reply;

pub use commands::{Command, CommandLine, parse_command};
pub use pasv::{PassiveEndpoint, parse_pasv_reply};
pub use reader::read_reply;
pub use reply::Reply;
