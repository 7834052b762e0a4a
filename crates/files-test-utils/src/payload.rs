//! Payload helpers.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

/// Deterministic pseudo-random payload of `len` bytes.
///
/// Different seeds give different contents, so two uploads of the same
/// length can be told apart on disk.
pub fn test_payload(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Compress `data` into a raw DEFLATE stream.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate write");
    encoder.finish().expect("deflate finish")
}

/// Decompress a complete raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut output)
        .expect("inflate");
    output
}

/// Build a complete upload: `<name>\n` followed by the compressed payload.
pub fn upload_request(name: &str, data: &[u8]) -> Vec<u8> {
    let mut request = format!("{name}\n").into_bytes();
    request.extend(deflate(data));
    request
}
