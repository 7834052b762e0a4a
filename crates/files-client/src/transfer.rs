//! Upload client implementation.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use files_core::constants::{DEFAULT_COMPRESSION_LEVEL, FILE_BUFFER_SIZE};
use files_core::error::{Error, Result};
use files_core::file::StreamingCompressor;
use files_core::protocol;

/// Upper bound on the server's reply; a resolved name is a filename plus a
/// copy suffix.
const MAX_RESPONSE_LEN: u64 = 4096;

/// Result of an upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Name sent in the header.
    pub requested: String,
    /// Name the server stored the data under.
    pub resolved: String,
    /// Uncompressed bytes sent.
    pub bytes: u64,
    /// Time from connect to the server closing the connection.
    pub duration: Duration,
}

/// Upload client for one server.
#[derive(Debug, Clone)]
pub struct FileSender {
    /// Server address (`host:port`).
    server: String,
    /// DEFLATE level used for the payload.
    level: u32,
}

impl FileSender {
    /// Create a sender for `server` using the default compression level.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Use a different compression level (0-9).
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Upload a local file.
    ///
    /// The file's own name is requested unless `remote_name` is given.
    pub async fn upload(&self, local_path: &Path, remote_name: Option<&str>) -> Result<UploadResult> {
        let name = match remote_name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidFilename {
                    name: local_path.display().to_string(),
                    reason: "local path has no UTF-8 file name",
                })?,
        };

        let file = File::open(local_path).await?;
        self.send_reader(&name, file).await
    }

    /// Upload an in-memory payload.
    pub async fn send_bytes(&self, name: &str, data: &[u8]) -> Result<UploadResult> {
        self.send_reader(name, data).await
    }

    /// Send the header, stream `reader` compressed, and wait for the
    /// resolved name.
    async fn send_reader<R: AsyncRead + Unpin>(&self, name: &str, mut reader: R) -> Result<UploadResult> {
        let header = protocol::encode_filename(name)?;
        let started_at = Instant::now();

        let stream = TcpStream::connect(self.server.as_str()).await?;
        debug!(server = %self.server, name, "Connected");
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(&header).await?;

        let level = self.level;
        let send = async move {
            let mut compressor = StreamingCompressor::new(write_half, level);
            let mut buf = vec![0u8; FILE_BUFFER_SIZE];
            let mut bytes = 0u64;
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                compressor.write(&buf[..n]).await?;
                bytes += n as u64;
            }
            compressor.finish().await?;
            Ok::<_, Error>(bytes)
        };

        // The server answers as soon as it has resolved the name, but only
        // closes once the whole stream is stored.
        let receive = async move {
            let mut response = Vec::new();
            read_half
                .take(MAX_RESPONSE_LEN)
                .read_to_end(&mut response)
                .await?;
            Ok::<_, Error>(response)
        };

        let (sent, received) = tokio::join!(send, receive);
        let bytes = sent?;
        let response = received?;

        if response.is_empty() {
            return Err(Error::Protocol {
                message: "server closed the connection without a filename".into(),
            });
        }
        let resolved = String::from_utf8(response).map_err(|_| Error::Protocol {
            message: "server sent a filename that is not valid UTF-8".into(),
        })?;

        info!(requested = name, resolved = %resolved, bytes, "Upload complete");
        Ok(UploadResult {
            requested: name.to_string(),
            resolved,
            bytes,
            duration: started_at.elapsed(),
        })
    }
}
