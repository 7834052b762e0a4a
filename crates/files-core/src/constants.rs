//! Protocol and storage constants for files.

// =============================================================================
// Naming Constants
// =============================================================================

/// Token inserted between a base name and its copy number on collision.
pub const COPY_SUFFIX: &str = "_copy";

/// Maximum length in bytes of a requested filename token.
pub const MAX_FILENAME_LEN: usize = 255;

// =============================================================================
// Transfer Constants
// =============================================================================

/// Buffer size for decompressed file data.
pub const FILE_BUFFER_SIZE: usize = 32 * 1024;

/// Default DEFLATE compression level used by uploaders.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Maximum DEFLATE compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;
