//! Platform mapping primitives.
//!
//! [`MapBackend`] is the capability interface a [`FileMap`](crate::FileMap) depends on:
//! report the allocation granularity, map an aligned file range, unmap it, and pass
//! access-pattern advice along. [`DefaultBackend`] is the implementation for the build
//! target; tests and embedders can supply their own.

use std::io;
use std::ptr::NonNull;

use crate::advise::MapAdvice;
use crate::filemap::MapAccess;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::{OsBackend as DefaultBackend, RawDescriptor};
    } else if #[cfg(windows)] {
        mod windows;
        pub use windows::{OsBackend as DefaultBackend, RawDescriptor};
    } else {
        mod unsupported;
        pub use unsupported::{OsBackend as DefaultBackend, RawDescriptor};
    }
}

/// Low-level mapping operations for one platform.
///
/// Every mapping is shared: writes through a read-write mapping reach the file and
/// every other mapper of it.
///
/// # Safety
///
/// Implementors must return addresses of live mappings of exactly the requested
/// length from [`map`](Self::map), and [`unmap`](Self::unmap) must release them.
pub unsafe trait MapBackend {
    /// Allocation granularity mapping offsets must be aligned to.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the value cannot be determined.
    fn allocation_granularity() -> io::Result<usize>;

    /// Map `len` bytes of `descriptor` starting at the aligned `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be a multiple of [`allocation_granularity`](Self::allocation_granularity)
    /// and `len` must be non-zero. The caller owns the returned mapping and must release
    /// it with [`unmap`](Self::unmap) exactly once.
    unsafe fn map(
        descriptor: RawDescriptor,
        offset: u64,
        len: usize,
        access: MapAccess,
    ) -> io::Result<NonNull<u8>>;

    /// Release a mapping created by [`map`](Self::map).
    ///
    /// # Safety
    ///
    /// `addr`/`len` must be exactly what [`map`](Self::map) produced, and nothing may
    /// access the range afterwards.
    unsafe fn unmap(addr: NonNull<u8>, len: usize) -> io::Result<()>;

    /// Hint the expected access pattern for `[addr, addr + len)`.
    ///
    /// The default reports [`io::ErrorKind::Unsupported`] without touching the range.
    ///
    /// # Safety
    ///
    /// `addr`/`len` must describe a live mapping created by [`map`](Self::map).
    unsafe fn advise(addr: NonNull<u8>, len: usize, advice: MapAdvice) -> io::Result<()> {
        let _ = (addr, len, advice);
        Err(io::ErrorKind::Unsupported.into())
    }
}

/// Something that can hand out the raw descriptor of an open file.
///
/// Implemented for every `AsFd` type on Unix and every `AsHandle` type on Windows,
/// so `&File` works directly. The region only borrows the descriptor; it never
/// closes it.
pub trait MapSource {
    /// Raw descriptor to map from.
    fn raw_descriptor(&self) -> RawDescriptor;
}

#[cfg(unix)]
impl<T: std::os::fd::AsFd> MapSource for T {
    fn raw_descriptor(&self) -> RawDescriptor {
        use std::os::fd::AsRawFd;
        self.as_fd().as_raw_fd()
    }
}

#[cfg(windows)]
impl<T: std::os::windows::io::AsHandle> MapSource for T {
    fn raw_descriptor(&self) -> RawDescriptor {
        use std::os::windows::io::AsRawHandle;
        self.as_handle().as_raw_handle()
    }
}
