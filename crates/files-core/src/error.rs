//! Error types for files-core.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for files operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation or malformed header.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Requested filename is not acceptable as a single path component.
    #[error("invalid filename {name:?}: {reason}")]
    InvalidFilename { name: String, reason: &'static str },

    /// Connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// Output file could not be created.
    #[error("could not create file {}: {source}", path.display())]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File transfer failed mid-stream.
    #[error("file transfer error: {message}")]
    FileTransfer { message: String },

    /// Compression or decompression failed.
    #[error("compression error: {message}")]
    Compression { message: String },
}

impl Error {
    /// Returns true if the peer sent a header the server refuses.
    ///
    /// Protocol errors happen before name resolution, so they never reserve
    /// a name and never create a file.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Protocol { .. } | Error::InvalidFilename { .. } | Error::ConnectionClosed
        )
    }
}

/// Convenience result type for files operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_protocol() {
        let err = Error::Protocol {
            message: "missing filename".into(),
        };
        assert_eq!(err.to_string(), "protocol error: missing filename");
    }

    #[test]
    fn error_display_invalid_filename() {
        let err = Error::InvalidFilename {
            name: "../etc/passwd".into(),
            reason: "contains a path separator",
        };
        assert_eq!(
            err.to_string(),
            "invalid filename \"../etc/passwd\": contains a path separator"
        );
    }

    #[test]
    fn error_display_file_create() {
        let err = Error::FileCreate {
            path: PathBuf::from("/srv/notes.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "could not create file /srv/notes.txt: denied");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn protocol_errors() {
        assert!(Error::ConnectionClosed.is_protocol());
        assert!(Error::Protocol {
            message: "bad".into()
        }
        .is_protocol());
        assert!(Error::InvalidFilename {
            name: "..".into(),
            reason: "reserved name"
        }
        .is_protocol());

        assert!(!Error::FileTransfer {
            message: "reset".into()
        }
        .is_protocol());
        assert!(!Error::Io(std::io::Error::other("boom")).is_protocol());
    }
}
