//! Streaming raw DEFLATE for file transfer.
//!
//! Uploads are raw DEFLATE streams (no zlib or gzip framing). These types sit
//! between an async socket and flate2 so a connection can be encoded and
//! decoded as it flows.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::MAX_COMPRESSION_LEVEL;
use crate::error::{Error, Result};

/// Streaming compressor writing a raw DEFLATE stream to `W`.
pub struct StreamingCompressor<W: AsyncWrite + Unpin> {
    writer: W,
    encoder: DeflateEncoder<Vec<u8>>,
}

impl<W: AsyncWrite + Unpin> StreamingCompressor<W> {
    /// Create a new streaming compressor.
    pub fn new(writer: W, level: u32) -> Self {
        let level = Compression::new(level.min(MAX_COMPRESSION_LEVEL));
        Self {
            writer,
            encoder: DeflateEncoder::new(Vec::new(), level),
        }
    }

    /// Compress `data` and forward whatever output is ready to the writer.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.encoder.write_all(data).map_err(|e| Error::Compression {
            message: format!("compression write failed: {}", e),
        })?;

        let pending = self.encoder.get_mut();
        if !pending.is_empty() {
            self.writer.write_all(pending).await?;
            pending.clear();
        }
        Ok(())
    }

    /// Finish the stream and shut down the underlying writer.
    ///
    /// For a TCP write half this half-closes the connection.
    pub async fn finish(self) -> Result<W> {
        let Self {
            mut writer,
            encoder,
        } = self;

        let tail = encoder.finish().map_err(|e| Error::Compression {
            message: format!("compression finish failed: {}", e),
        })?;
        writer.write_all(&tail).await?;
        writer.shutdown().await?;
        Ok(writer)
    }
}

/// Streaming decompressor reading a raw DEFLATE stream from `R`.
///
/// Input is consumed only as far as the inflater needs it, so the reader is
/// left positioned right after the final DEFLATE block.
pub struct StreamingDecompressor<R: AsyncBufRead + Unpin> {
    reader: R,
    inflate: Decompress,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> StreamingDecompressor<R> {
    /// Create a new streaming decompressor.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            inflate: Decompress::new(false),
            finished: false,
        }
    }

    /// Read decompressed data; `Ok(0)` marks the end of the DEFLATE stream.
    ///
    /// A corrupt stream, or a reader that hits EOF before the final block,
    /// is an error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }

        loop {
            let input = self.reader.fill_buf().await?;
            let at_eof = input.is_empty();

            let before_in = self.inflate.total_in();
            let before_out = self.inflate.total_out();
            let status = self
                .inflate
                .decompress(input, buf, FlushDecompress::None)
                .map_err(|e| Error::FileTransfer {
                    message: format!("decompression failed: {}", e),
                })?;
            let consumed = (self.inflate.total_in() - before_in) as usize;
            let produced = (self.inflate.total_out() - before_out) as usize;
            self.reader.consume(consumed);

            match status {
                Status::StreamEnd => {
                    self.finished = true;
                    return Ok(produced);
                }
                Status::Ok | Status::BufError if produced > 0 => return Ok(produced),
                Status::Ok | Status::BufError if at_eof => {
                    return Err(Error::FileTransfer {
                        message: "stream ended before the final DEFLATE block".into(),
                    });
                }
                Status::Ok | Status::BufError => continue,
            }
        }
    }

    /// Total compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.inflate.total_in()
    }
}
