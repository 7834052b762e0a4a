//! Server-side upload handler.
//!
//! Drives one connection through the upload protocol: read the requested
//! filename, reserve a collision-free name in the shared [`FileIndex`],
//! announce it to the client, then inflate the rest of the stream into a new
//! file. Every error ends the connection; nothing is retried and a partially
//! written file is left where it is.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf};
use tracing::{debug, error, info, trace, warn};

use files_core::constants::FILE_BUFFER_SIZE;
use files_core::error::{Error, Result};
use files_core::file::{StreamingDecompressor, TransferFailure, TransferPhase, TransferReport};
use files_core::{FileIndex, protocol};

/// Per-connection bookkeeping.
struct TransferSession {
    phase: TransferPhase,
    requested: Option<String>,
    resolved: Option<String>,
    bytes: u64,
    started_at: Instant,
}

impl TransferSession {
    fn new() -> Self {
        Self {
            phase: TransferPhase::AwaitHeader,
            requested: None,
            resolved: None,
            bytes: 0,
            started_at: Instant::now(),
        }
    }

    fn enter(&mut self, phase: TransferPhase) {
        trace!(from = %self.phase, to = %phase, "Transfer phase change");
        self.phase = phase;
    }

    fn fail(self, source: Error) -> TransferFailure {
        TransferFailure {
            phase: self.phase,
            requested: self.requested,
            resolved: self.resolved,
            bytes: self.bytes,
            source,
        }
    }
}

/// Server-side upload handler.
///
/// One handler is shared by every connection; the only state that outlives
/// a connection is the name reservations it makes in the index.
#[derive(Debug)]
pub struct TransferHandler {
    /// Shared filename registry.
    index: Arc<FileIndex>,
    /// Directory the files are written to.
    root: PathBuf,
}

impl TransferHandler {
    /// Create a new handler storing files under `root`.
    pub fn new(index: Arc<FileIndex>, root: PathBuf) -> Self {
        Self { index, root }
    }

    /// The shared filename registry.
    pub fn index(&self) -> &Arc<FileIndex> {
        &self.index
    }

    /// Directory the files are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve one connection and log how it ended.
    ///
    /// Errors never leave this function; a failed upload only affects its
    /// own connection.
    pub async fn serve<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        match self.receive(stream).await {
            Ok(report) => {
                info!(
                    %peer,
                    requested = %report.requested,
                    resolved = %report.resolved,
                    renamed = report.was_renamed(),
                    bytes = report.bytes,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    bytes_per_sec = report.speed_bps() as u64,
                    "Received file"
                );
            }
            Err(failure) if failure.source.is_protocol() => {
                warn!(%peer, error = %failure.source, "Could not read the requested filename");
            }
            Err(failure) => {
                error!(
                    %peer,
                    phase = %failure.phase,
                    requested = failure.requested.as_deref().unwrap_or(""),
                    resolved = failure.resolved.as_deref().unwrap_or(""),
                    bytes = failure.bytes,
                    partial_file = failure.left_file(),
                    error = %failure.source,
                    "Could not receive file"
                );
            }
        }
    }

    /// Run the upload protocol on `stream`.
    ///
    /// The stream is dropped, closing the connection, before this returns.
    pub async fn receive<S>(&self, stream: S) -> std::result::Result<TransferReport, TransferFailure>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let mut session = TransferSession::new();
        match self.run(&mut session, stream).await {
            Ok(report) => Ok(report),
            Err(e) => Err(session.fail(e)),
        }
    }

    async fn run<S>(&self, session: &mut TransferSession, stream: S) -> Result<TransferReport>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        let requested = protocol::read_filename(&mut reader).await?;
        session.requested = Some(requested.clone());

        session.enter(TransferPhase::Resolving);
        let resolved = self.index.resolve(&requested);
        session.resolved = Some(resolved.clone());
        debug!(requested = %requested, resolved = %resolved, "Resolved filename");

        // The client may already be streaming, so keep going without it.
        if let Err(e) = announce(&mut write_half, &resolved).await {
            warn!(resolved = %resolved, error = %e, "Could not send the resolved filename back");
        }

        session.enter(TransferPhase::Streaming);
        let path = self.root.join(&resolved);
        let mut file = File::create(&path).await.map_err(|source| Error::FileCreate {
            path: path.clone(),
            source,
        })?;
        info!(resolved = %resolved, "Receiving file");

        let mut decompressor = StreamingDecompressor::new(reader);
        let streamed = inflate_into(&mut decompressor, &mut file, &path, &mut session.bytes).await;

        // Whatever was written must reach the disk, even after a failure.
        let flushed = file.flush().await.map_err(|e| Error::FileTransfer {
            message: format!("could not flush {}: {}", path.display(), e),
        });
        streamed?;
        flushed?;
        drop(file);
        debug!(
            resolved = %resolved,
            compressed_bytes = decompressor.total_in(),
            bytes = session.bytes,
            "End of compressed stream"
        );

        if let Err(e) = write_half.shutdown().await {
            warn!(resolved = %resolved, error = %e, "Could not close the connection cleanly");
        }

        session.enter(TransferPhase::Closed);
        Ok(TransferReport {
            requested,
            resolved,
            bytes: session.bytes,
            elapsed: session.started_at.elapsed(),
        })
    }
}

/// Copy decompressed data into `file` until the DEFLATE stream ends.
async fn inflate_into<R>(
    decompressor: &mut StreamingDecompressor<R>,
    file: &mut File,
    path: &Path,
    bytes: &mut u64,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut buf = vec![0u8; FILE_BUFFER_SIZE];
    loop {
        let n = decompressor.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        file.write_all(&buf[..n])
            .await
            .map_err(|e| Error::FileTransfer {
                message: format!("could not write {}: {}", path.display(), e),
            })?;
        *bytes += n as u64;
    }
}

/// Send the resolved filename, without a delimiter.
async fn announce<S: AsyncWrite>(writer: &mut WriteHalf<S>, resolved: &str) -> Result<()> {
    writer.write_all(resolved.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
