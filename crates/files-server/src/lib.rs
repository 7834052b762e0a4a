//! files-server: Server library for the files upload service.
//!
//! Provides:
//! - The per-connection upload handler
//! - The TCP accept loop
//! - Command-line parsing for the server binary

pub mod cli;
pub mod handler;
pub mod listener;

pub use cli::Cli;
pub use handler::TransferHandler;
pub use listener::{FileListener, ServerConfig};
