//! Module `file_ops`
//!
//! Local side of RETR and STOR, plus the copy loops that move bytes
//! between a data session and a local file or output sink.

use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions, remove_file};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FtpClientError, FtpResult};
use crate::transfer::modes::TransferRequest;
use crate::transport::SecureDataSession;
use crate::utils::validation::validate_local_path;

/// A local file opened for one transfer
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    file: File,
    created: bool,
}

impl LocalFile {
    /// Opens the local file a request needs, before any network activity.
    ///
    /// RETR creates the target, or opens an existing one without touching
    /// its contents until [`LocalFile::truncate`]. STOR opens the source for
    /// reading. LIST needs no file and yields `None`.
    pub async fn open_for(request: &TransferRequest, local_dir: &Path) -> FtpResult<Option<Self>> {
        match request {
            TransferRequest::List(_) => Ok(None),
            TransferRequest::Retrieve(name) => {
                let path = local_dir.join(validate_local_path(name)?);
                let (file, created) = open_download_target(&path)
                    .await
                    .map_err(|source| local_error(&path, source))?;
                debug!("Opened {} for writing", path.display());
                Ok(Some(Self {
                    path,
                    file,
                    created,
                }))
            }
            TransferRequest::Store(name) => {
                let path = local_dir.join(validate_local_path(name)?);
                let file = File::open(&path)
                    .await
                    .map_err(|source| local_error(&path, source))?;
                if file
                    .metadata()
                    .await
                    .map_err(|source| local_error(&path, source))?
                    .is_dir()
                {
                    return Err(local_error(
                        &path,
                        io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
                    ));
                }
                debug!("Opened {} for reading", path.display());
                Ok(Some(Self {
                    path,
                    file,
                    created: false,
                }))
            }
        }
    }

    /// Empties a download target once data is about to arrive.
    pub async fn truncate(&mut self) -> FtpResult<()> {
        let path = &self.path;
        self.file
            .set_len(0)
            .await
            .map_err(|source| local_error(path, source))
    }

    /// Flushes buffered writes to disk.
    pub async fn finish(mut self) -> FtpResult<()> {
        let path = self.path.clone();
        self.file
            .flush()
            .await
            .map_err(|source| local_error(&path, source))
    }

    /// Closes the file and removes it if this transfer created it.
    pub async fn discard(self) {
        let Self {
            path,
            file,
            created,
        } = self;
        drop(file);
        if created {
            match remove_file(&path).await {
                Ok(()) => debug!("Removed unused download target {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Creates `path`, or opens it as is when it already exists.
///
/// The flag is true only when this call created the file.
async fn open_download_target(path: &Path) -> io::Result<(File, bool)> {
    match OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(file) => Ok((file, true)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let file = OpenOptions::new().write(true).open(path).await?;
            Ok((file, false))
        }
        Err(e) => Err(e),
    }
}

fn local_error(path: &Path, source: io::Error) -> FtpClientError {
    FtpClientError::LocalFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies the data session into `sink` until the server closes it.
///
/// `bytes` is updated as chunks arrive so a partial count survives an error.
/// Sink failures are mapped through `sink_error`.
pub async fn receive_into<S, W, E>(
    session: &mut SecureDataSession<S>,
    sink: &mut W,
    buffer_size: usize,
    bytes: &mut u64,
    sink_error: E,
) -> FtpResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
    E: Fn(io::Error) -> FtpClientError,
{
    let mut buffer = vec![0u8; buffer_size];
    loop {
        let n = session.read_chunk(&mut buffer).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buffer[..n]).await.map_err(&sink_error)?;
        *bytes += n as u64;
    }
    sink.flush().await.map_err(&sink_error)?;
    Ok(())
}

/// Downloads into a local file.
pub async fn receive_file<S>(
    session: &mut SecureDataSession<S>,
    local: &mut LocalFile,
    buffer_size: usize,
    bytes: &mut u64,
) -> FtpResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let path = local.path.clone();
    receive_into(session, &mut local.file, buffer_size, bytes, |source| {
        local_error(&path, source)
    })
    .await
}

/// Uploads a local file until end of file.
pub async fn send_file<S>(
    session: &mut SecureDataSession<S>,
    local: &mut LocalFile,
    buffer_size: usize,
    bytes: &mut u64,
) -> FtpResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; buffer_size];
    loop {
        let n = local
            .file
            .read(&mut buffer)
            .await
            .map_err(|source| local_error(&local.path, source))?;
        if n == 0 {
            break;
        }
        session.write_all(&buffer[..n]).await?;
        *bytes += n as u64;
    }
    Ok(())
}
