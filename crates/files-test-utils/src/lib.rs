//! files-test-utils: Test infrastructure for files.
//!
//! Provides:
//! - Deterministic payloads and DEFLATE helpers
//! - A raw TCP client for driving the wire protocol byte by byte
//! - Temporary storage directories

mod payload;
mod raw_client;

pub use payload::{deflate, inflate, test_payload, upload_request};
pub use raw_client::{RawUpload, send_raw};

/// Create a temporary storage directory, optionally pre-populated with files.
pub fn storage_dir(existing: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for name in existing {
        std::fs::write(dir.path().join(name), name.as_bytes()).expect("seed file");
    }
    dir
}
