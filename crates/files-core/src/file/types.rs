//! File transfer state types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::error::Error as FilesError;

/// Phase of a single upload connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Waiting for the filename header.
    AwaitHeader,
    /// Reserving an on-disk name and announcing it to the client.
    Resolving,
    /// Decompressing the payload into the output file.
    Streaming,
    /// Connection finished, successfully or not.
    Closed,
}

impl TransferPhase {
    /// Short lowercase name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPhase::AwaitHeader => "await_header",
            TransferPhase::Resolving => "resolving",
            TransferPhase::Streaming => "streaming",
            TransferPhase::Closed => "closed",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Filename the client asked for.
    pub requested: String,
    /// Filename the data was stored under.
    pub resolved: String,
    /// Decompressed bytes written.
    pub bytes: u64,
    /// Time from header to end of stream.
    pub elapsed: Duration,
}

impl TransferReport {
    /// Whether the file was stored under a different name than requested.
    pub fn was_renamed(&self) -> bool {
        self.requested != self.resolved
    }

    /// Get transfer speed in bytes per second.
    pub fn speed_bps(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.bytes as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// A failed upload: the error plus how far the connection got.
#[derive(Debug, Error)]
#[error("{phase} failed: {source}")]
pub struct TransferFailure {
    /// Phase in which the error happened.
    pub phase: TransferPhase,
    /// Filename the client asked for, if the header was read.
    pub requested: Option<String>,
    /// Name reserved for the upload, if resolution was reached.
    pub resolved: Option<String>,
    /// Decompressed bytes written before the failure.
    pub bytes: u64,
    /// Underlying error.
    #[source]
    pub source: FilesError,
}

impl TransferFailure {
    /// Whether the failure left a (possibly partial) file on disk.
    pub fn left_file(&self) -> bool {
        self.phase == TransferPhase::Streaming
            && !matches!(self.source, FilesError::FileCreate { .. })
    }
}
