//! File transfer support for files.
//!
//! This module provides:
//! - Streaming raw DEFLATE
//! - Transfer state types

pub mod compress;
pub mod types;

pub use compress::{StreamingCompressor, StreamingDecompressor};
pub use types::{TransferFailure, TransferPhase, TransferReport};
