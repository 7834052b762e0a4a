//! Upload header codec.
//!
//! An upload starts with the requested filename followed by exactly one
//! whitespace byte:
//!
//! ```text
//! client -> server: <filename><whitespace>
//! client -> server: <raw DEFLATE stream>
//! server -> client: <resolved filename>        (no delimiter, then close)
//! ```
//!
//! The filename is a single token and cannot itself contain whitespace.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::constants::MAX_FILENAME_LEN;
use crate::error::{Error, Result};

/// Bytes skipped before the filename token starts.
fn is_leading_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r')
}

/// Read one byte, mapping a clean EOF to `None`.
async fn next_byte<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<u8>> {
    match reader.read_u8().await {
        Ok(byte) => Ok(Some(byte)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Check that `name` is usable as a single file inside the storage directory.
pub fn validate_filename(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("empty name")
    } else if name.len() > MAX_FILENAME_LEN {
        Some("name too long")
    } else if name == "." || name == ".." {
        Some("reserved name")
    } else if name.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if name.contains('\0') {
        Some("contains a NUL byte")
    } else if name.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidFilename {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Read the requested filename from the start of an upload.
///
/// Leading spaces, tabs and carriage returns are skipped; the token ends at
/// the first ASCII whitespace byte, which is consumed and nothing more. The
/// reader should be buffered since it is consumed one byte at a time, and
/// the bytes following the delimiter are the compressed file contents.
pub async fn read_filename<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut token = Vec::new();

    let mut byte = loop {
        match next_byte(reader).await? {
            None => return Err(Error::ConnectionClosed),
            Some(b) if is_leading_blank(b) => continue,
            Some(b'\n') => {
                return Err(Error::Protocol {
                    message: "newline before filename".into(),
                });
            }
            Some(b) => break b,
        }
    };

    while !byte.is_ascii_whitespace() {
        if token.len() == MAX_FILENAME_LEN {
            return Err(Error::Protocol {
                message: format!("filename longer than {MAX_FILENAME_LEN} bytes"),
            });
        }
        token.push(byte);

        byte = match next_byte(reader).await? {
            Some(b) => b,
            None => {
                return Err(Error::Protocol {
                    message: "connection closed before filename delimiter".into(),
                });
            }
        };
    }

    let name = String::from_utf8(token).map_err(|_| Error::Protocol {
        message: "filename is not valid UTF-8".into(),
    })?;
    validate_filename(&name)?;
    Ok(name)
}

/// Encode the upload header for `name`.
pub fn encode_filename(name: &str) -> Result<Vec<u8>> {
    validate_filename(name)?;
    let mut header = Vec::with_capacity(name.len() + 1);
    header.extend_from_slice(name.as_bytes());
    header.push(b'\n');
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    async fn read(input: &[u8]) -> Result<String> {
        let mut reader = BufReader::new(input);
        read_filename(&mut reader).await
    }

    #[tokio::test]
    async fn reads_newline_terminated_name() {
        assert_eq!(read(b"notes.txt\n").await.unwrap(), "notes.txt");
    }

    #[tokio::test]
    async fn accepts_any_whitespace_delimiter() {
        assert_eq!(read(b"notes.txt data").await.unwrap(), "notes.txt");
        assert_eq!(read(b"notes.txt\tdata").await.unwrap(), "notes.txt");
        assert_eq!(read(b"notes.txt\r\n").await.unwrap(), "notes.txt");
    }

    #[tokio::test]
    async fn skips_leading_blanks() {
        assert_eq!(read(b"  \tnotes.txt\n").await.unwrap(), "notes.txt");
    }

    #[tokio::test]
    async fn consumes_exactly_one_delimiter() {
        let mut reader = BufReader::new(&b"a.bin\n\x01\x02"[..]);
        assert_eq!(read_filename(&mut reader).await.unwrap(), "a.bin");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_input_is_connection_closed() {
        assert!(matches!(read(b"").await, Err(Error::ConnectionClosed)));
        assert!(matches!(read(b"   ").await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn missing_delimiter_is_protocol_error() {
        assert!(matches!(
            read(b"notes.txt").await,
            Err(Error::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn newline_before_name_is_protocol_error() {
        assert!(matches!(read(b"\nnotes.txt\n").await, Err(Error::Protocol { .. })));
    }

    #[tokio::test]
    async fn overlong_name_is_rejected() {
        let mut input = vec![b'a'; MAX_FILENAME_LEN + 1];
        input.push(b'\n');
        assert!(matches!(read(&input).await, Err(Error::Protocol { .. })));

        let mut input = vec![b'a'; MAX_FILENAME_LEN];
        input.push(b'\n');
        assert_eq!(read(&input).await.unwrap().len(), MAX_FILENAME_LEN);
    }

    #[tokio::test]
    async fn non_utf8_name_is_rejected() {
        assert!(matches!(
            read(b"\xff\xfe.txt\n").await,
            Err(Error::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn path_components_are_rejected() {
        for input in [&b"../secret\n"[..], b"dir/file.txt\n", b"..\n", b".\n", b"a\\b\n"] {
            assert!(
                matches!(read(input).await, Err(Error::InvalidFilename { .. })),
                "accepted {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn validate_filename_rules() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("a b").is_err());
        assert!(validate_filename("nul\0.txt").is_err());
        assert!(validate_filename(&"x".repeat(MAX_FILENAME_LEN + 1)).is_err());
    }

    #[test]
    fn encode_appends_newline() {
        assert_eq!(encode_filename("notes.txt").unwrap(), b"notes.txt\n");
        assert!(encode_filename("a/b").is_err());
    }
}
