//! Input validation utilities
//!
//! Local file names come straight from the prompt and double as remote
//! names, so they are checked before any file is touched.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::FtpClientError;

/// Validates a local file name used by RETR/STOR.
///
/// Relative paths into subdirectories are allowed; empty names, absolute
/// paths and `..` components are not.
pub fn validate_local_path(name: &str) -> Result<PathBuf, FtpClientError> {
    let path = PathBuf::from(name);
    let reject = |reason: &str| FtpClientError::LocalFile {
        path: path.clone(),
        source: io::Error::new(io::ErrorKind::InvalidInput, reason.to_string()),
    };

    if name.trim().is_empty() {
        return Err(reject("empty file name"));
    }
    if name.contains('\0') {
        return Err(reject("NUL in file name"));
    }

    for component in Path::new(name).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(reject("parent directory reference")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(reject("absolute path"));
            }
        }
    }

    Ok(path)
}
