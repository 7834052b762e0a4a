//! files-client: Uploader for the files transfer service.
//!
//! Provides:
//! - `FileSender`, which speaks the upload protocol
//! - Command-line parsing for the client binary

pub mod cli;
pub mod transfer;

pub use cli::Cli;
pub use transfer::{FileSender, UploadResult};
