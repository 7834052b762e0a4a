//! Raw TCP client for exercising the upload protocol directly.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// What a raw upload observed.
#[derive(Debug)]
pub struct RawUpload {
    /// Bytes the server sent back before closing.
    pub response: Vec<u8>,
    /// Error hit while writing the request, if the server hung up early.
    pub write_error: Option<io::Error>,
}

/// Send `request` verbatim, half-close, and read until the server closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> io::Result<RawUpload> {
    let stream = TcpStream::connect(addr).await?;
    let (mut read_half, mut write_half) = stream.into_split();

    let send = async move {
        write_half.write_all(request).await?;
        write_half.shutdown().await
    };
    let receive = async move {
        let mut response = Vec::new();
        read_half.read_to_end(&mut response).await.map(|_| response)
    };

    let (sent, received) = tokio::join!(send, receive);
    Ok(RawUpload {
        response: received?,
        write_error: sent.err(),
    })
}
