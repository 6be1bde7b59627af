//! Fallback for targets without file mapping: every call fails.

use std::io;
use std::ptr::NonNull;

use super::MapBackend;
use crate::filemap::MapAccess;

/// Raw descriptor placeholder.
pub type RawDescriptor = i32;

/// Backend that reports every operation as unsupported.
#[derive(Debug)]
pub struct OsBackend;

unsafe impl MapBackend for OsBackend {
    fn allocation_granularity() -> io::Result<usize> {
        Err(io::ErrorKind::Unsupported.into())
    }

    unsafe fn map(
        _descriptor: RawDescriptor,
        _offset: u64,
        _len: usize,
        _access: MapAccess,
    ) -> io::Result<NonNull<u8>> {
        Err(io::ErrorKind::Unsupported.into())
    }

    unsafe fn unmap(_addr: NonNull<u8>, _len: usize) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }
}
