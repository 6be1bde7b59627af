//! Utility helpers for allocation granularity, alignment, and safe range calculations.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::errors::{FileMapError, Result};
use crate::sys::{DefaultBackend, MapBackend};

/// Lazily resolved granularity shared by every caller of one instance.
///
/// Concurrent first callers are serialized so the OS is asked a single time. A failed
/// query is not cached; the next caller asks again.
pub(crate) struct GranularityCache {
    // Zero means "not resolved yet"; the OS never reports a zero granularity.
    value: AtomicUsize,
    init: Mutex<()>,
}

impl GranularityCache {
    pub(crate) const fn new() -> Self {
        Self {
            value: AtomicUsize::new(0),
            init: Mutex::new(()),
        }
    }

    pub(crate) fn get_or_query(&self, query: fn() -> io::Result<usize>) -> io::Result<usize> {
        let cached = self.value.load(Ordering::Acquire);
        if cached != 0 {
            return Ok(cached);
        }

        let _guard = self.init.lock();
        let cached = self.value.load(Ordering::Acquire);
        if cached != 0 {
            return Ok(cached);
        }
        let value = query()?;
        if value == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "OS reported a zero allocation granularity",
            ));
        }
        self.value.store(value, Ordering::Release);
        Ok(value)
    }
}

static GRANULARITY: GranularityCache = GranularityCache::new();

/// Allocation granularity of the running OS: the alignment mapping offsets must honor.
///
/// This is the page size on Unix and the (usually 64 KiB) allocation granularity on Windows.
/// Resolved once per process and cached afterwards.
///
/// # Errors
///
/// Returns `FileMapError::Granularity` if the OS cannot report it.
pub fn allocation_granularity() -> Result<usize> {
    DefaultBackend::allocation_granularity().map_err(FileMapError::Granularity)
}

/// Resolve the process-wide granularity with `query`, at most once.
#[cfg_attr(not(any(unix, windows)), allow(dead_code))]
pub(crate) fn cached_granularity(query: fn() -> io::Result<usize>) -> io::Result<usize> {
    GRANULARITY.get_or_query(query)
}

/// A caller-requested `(offset, len)` widened to the granularity the OS requires.
///
/// `offset` is rounded down to a multiple of the granularity and `len` grows by the same
/// amount, so the aligned range always covers the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedRange {
    /// Aligned file offset handed to the OS.
    pub offset: u64,
    /// Length handed to the OS (`requested len + adjust`).
    pub len: usize,
    /// Distance from the aligned offset to the requested one.
    pub adjust: usize,
}

impl AlignedRange {
    /// Align `offset`/`len` to `granularity`.
    ///
    /// # Errors
    ///
    /// Returns `FileMapError::InvalidRange` if `granularity` is zero or the adjusted
    /// length overflows `usize`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(offset: u64, len: usize, granularity: usize) -> Result<Self> {
        let invalid = || FileMapError::InvalidRange { offset, len };
        if granularity == 0 {
            return Err(invalid());
        }
        let aligned = align_down(offset, granularity as u64);
        // Difference is below `granularity`, so it fits in usize.
        let adjust = (offset - aligned) as usize;
        let aligned_len = len.checked_add(adjust).ok_or_else(invalid)?;
        Ok(Self {
            offset: aligned,
            len: aligned_len,
            adjust,
        })
    }
}

/// Align a value down to the nearest multiple of `alignment`.
#[must_use]
pub fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    // Fast path for power-of-2 alignments (common case for page sizes)
    if alignment.is_power_of_two() {
        value & !(alignment - 1)
    } else {
        value - value % alignment
    }
}

/// Ensure the requested [offset, offset+len) range is within [0, total).
/// Returns `Ok(())` if valid; otherwise an `OutOfBounds` error.
///
/// # Errors
///
/// Returns `FileMapError::OutOfBounds` if the range exceeds bounds.
pub fn ensure_in_bounds(offset: u64, len: u64, total: u64) -> Result<()> {
    if offset > total {
        return Err(FileMapError::OutOfBounds { offset, len, total });
    }
    let end = offset.saturating_add(len);
    if end > total {
        return Err(FileMapError::OutOfBounds { offset, len, total });
    }
    Ok(())
}

/// Compute a safe byte slice range for a given total length, returning start..end as usize tuple.
///
/// # Errors
///
/// Returns `FileMapError::OutOfBounds` if the requested range exceeds the total length.
#[allow(clippy::cast_possible_truncation)]
pub fn slice_range(offset: u64, len: u64, total: u64) -> Result<(usize, usize)> {
    ensure_in_bounds(offset, len, total)?;
    // Safe to cast because we've already validated bounds against total
    // which itself is the length of an in-memory view
    let start = offset as usize;
    let end = (offset + len) as usize;
    Ok((start, end))
}
