//! Crate-specific error types for filemap.

use std::io;
use thiserror::Error;

use crate::advise::MapAdvice;

/// Result alias for filemap operations.
pub type Result<T> = std::result::Result<T, FileMapError>;

/// Error type covering granularity lookup, mapping, advice, and view access.
#[derive(Debug, Error)]
pub enum FileMapError {
    /// Wrapper for `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The OS could not report its allocation granularity.
    #[error("could not determine allocation granularity: {0}")]
    Granularity(#[source] io::Error),

    /// The OS refused to establish the mapping.
    #[error("mapping failed: offset={offset}, len={len}: {source}")]
    Map {
        /// Page-aligned file offset handed to the OS.
        offset: u64,
        /// Page-adjusted length handed to the OS.
        len: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A zero-length mapping was requested.
    #[error("mapping length must be greater than zero")]
    ZeroLength,

    /// The requested range cannot be expressed on this platform.
    #[error("invalid mapping range: offset={offset}, len={len}")]
    InvalidRange {
        /// Requested file offset.
        offset: u64,
        /// Requested length.
        len: usize,
    },

    /// `create` was called on a region that already holds a mapping.
    #[error("region already holds a mapping")]
    AlreadyMapped,

    /// The operation needs a mapping but the region is empty.
    #[error("region holds no mapping")]
    NotMapped,

    /// Error returned when attempting an operation in an incompatible mode.
    #[error("invalid access mode: {0}")]
    InvalidMode(&'static str),

    /// Error when a requested offset/length pair is out of bounds.
    #[error("range out of bounds: offset={offset}, len={len}, total={total}")]
    OutOfBounds {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Total length of the logical view.
        total: u64,
    },

    /// The platform (or this build) has no memory-advice facility.
    #[error("memory advice {0:?} is not supported on this platform")]
    AdviceUnsupported(MapAdvice),

    /// The OS rejected the memory advice.
    #[error("memory advice {advice:?} failed: {source}")]
    AdviceFailed {
        /// Advice that was rejected.
        advice: MapAdvice,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}
