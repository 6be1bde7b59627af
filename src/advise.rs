//! Memory advise operations for optimizing OS behavior.

use crate::errors::{FileMapError, Result};
use crate::filemap::FileMap;
use crate::sys::MapBackend;

/// Memory access pattern advice for the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAdvice {
    /// Normal access pattern (default).
    Normal,
    /// Random access pattern.
    Random,
    /// Sequential access pattern.
    Sequential,
    /// Will need this range soon.
    WillNeed,
    /// Won't need this range soon.
    DontNeed,
}

impl MapAdvice {
    /// Every advice kind, in declaration order.
    pub const ALL: [MapAdvice; 5] = [
        MapAdvice::Normal,
        MapAdvice::Random,
        MapAdvice::Sequential,
        MapAdvice::WillNeed,
        MapAdvice::DontNeed,
    ];
}

impl<B: MapBackend> FileMap<B> {
    /// Advise the OS about the expected access pattern for the whole mapping.
    ///
    /// The advice covers the aligned OS mapping, not just the logical view. It is a hint
    /// and may be ignored; the mapped data stays valid either way.
    ///
    /// # Platform-specific behavior
    ///
    /// - **Unix**: Uses `madvise` system call
    /// - **Windows** and builds without the `advise` feature: always `AdviceUnsupported`
    ///
    /// # Errors
    ///
    /// Returns `FileMapError::NotMapped` if the region holds no mapping.
    /// Returns `FileMapError::AdviceUnsupported` if the platform has no advice facility.
    /// Returns `FileMapError::AdviceFailed` if the system call fails.
    pub fn advise(&self, advice: MapAdvice) -> Result<()> {
        let (base, len) = self.base().ok_or(FileMapError::NotMapped)?;

        if cfg!(not(feature = "advise")) {
            return Err(FileMapError::AdviceUnsupported(advice));
        }

        // SAFETY: base/len describe the live mapping this region owns.
        match unsafe { B::advise(base, len, advice) } {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::Unsupported => {
                Err(FileMapError::AdviceUnsupported(advice))
            }
            Err(source) => {
                log::warn!("madvise({advice:?}) failed: {source}");
                Err(FileMapError::AdviceFailed { advice, source })
            }
        }
    }
}
