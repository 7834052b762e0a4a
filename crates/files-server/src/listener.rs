//! TCP listener for upload connections.
//!
//! `FileListener` owns the listening socket and the shared handler. The
//! accept loop runs on one task and spawns one task per connection, so a
//! slow client never holds up the others.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use files_core::FileIndex;
use files_core::error::Result;

use crate::handler::TransferHandler;

// =============================================================================
// Constants
// =============================================================================

/// Pause after a transient accept failure before accepting again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// `ENFILE` (23) and `EMFILE` (24) from `<errno.h>`: the system or process
/// descriptor table is full. Linux, macOS and the BSDs share these values.
#[cfg(unix)]
const FD_EXHAUSTED: [i32; 2] = [23, 24];

// =============================================================================
// Server Configuration
// =============================================================================

/// Server configuration for the upload listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the server.
    pub bind_addr: SocketAddr,
    /// Directory scanned at startup and used to store uploads.
    pub root: PathBuf,
}

// =============================================================================
// FileListener
// =============================================================================

/// Upload server listener.
pub struct FileListener {
    /// Listening socket.
    listener: TcpListener,
    /// Local address.
    local_addr: SocketAddr,
    /// Handler shared by all connection tasks.
    handler: Arc<TransferHandler>,
}

impl FileListener {
    /// Scan the storage directory and bind the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let index = FileIndex::from_dir(&config.root)?;
        info!(
            dir = %config.root.display(),
            known_files = index.len(),
            "Indexed storage directory"
        );

        Self::with_index(config, Arc::new(index)).await
    }

    /// Bind the listening socket using an existing index.
    pub async fn with_index(config: ServerConfig, index: Arc<FileIndex>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let handler = Arc::new(TransferHandler::new(index, config.root));

        Ok(Self {
            listener,
            local_addr,
            handler,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the shared filename registry.
    pub fn index(&self) -> &Arc<FileIndex> {
        self.handler.index()
    }

    /// Run the accept loop.
    ///
    /// Only returns on an accept error that retrying cannot fix; transient
    /// failures are logged and the loop keeps going.
    pub async fn run(self) -> Result<()> {
        info!(
            addr = %self.local_addr,
            dir = %self.handler.root().display(),
            "Server starting"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted connection");
                    let handler = Arc::clone(&self.handler);
                    tokio::spawn(async move {
                        handler.serve(stream, peer).await;
                    });
                }
                Err(e) if is_transient_accept_error(&e) => {
                    warn!(error = %e, "Failed to accept connection, retrying");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    return Err(e.into());
                }
            }
        }
    }
}

/// Whether an accept error only affects one pending connection or clears
/// up on its own.
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || is_fd_exhausted(e)
}

#[cfg(unix)]
fn is_fd_exhausted(e: &io::Error) -> bool {
    e.raw_os_error()
        .is_some_and(|code| FD_EXHAUSTED.contains(&code))
}

#[cfg(not(unix))]
fn is_fd_exhausted(_e: &io::Error) -> bool {
    false
}
