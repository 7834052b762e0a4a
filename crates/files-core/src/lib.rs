//! files-core: Shared library for the files transfer service.
//!
//! This crate provides:
//! - The collision-free name resolver (`FileIndex`)
//! - Wire header codec for the upload protocol
//! - Raw DEFLATE compression utilities
//! - Transfer state types
//! - Error type and logging setup

pub mod constants;
pub mod error;
pub mod file;
pub mod file_index;
pub mod logging;
pub mod protocol;

pub use error::{Error, Result};
pub use file_index::FileIndex;
pub use logging::{LogFormat, init_logging, init_test_logging};
