//! `mmap`/`munmap`/`madvise` backend.

use std::io;
use std::ptr::{self, NonNull};

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
use libc::mmap as mmap64;
#[cfg(all(target_os = "linux", target_env = "gnu"))]
use libc::mmap64;

use super::MapBackend;
#[cfg(feature = "advise")]
use crate::advise::MapAdvice;
use crate::filemap::MapAccess;
use crate::utils::cached_granularity;

/// Raw file descriptor.
pub type RawDescriptor = std::os::fd::RawFd;

/// Backend built on the POSIX mapping calls.
#[derive(Debug)]
pub struct OsBackend;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn query_page_size() -> io::Result<usize> {
    // SAFETY: sysconf with _SC_PAGESIZE has no preconditions.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(page_size as usize)
}

unsafe impl MapBackend for OsBackend {
    fn allocation_granularity() -> io::Result<usize> {
        cached_granularity(query_page_size)
    }

    unsafe fn map(
        descriptor: RawDescriptor,
        offset: u64,
        len: usize,
        access: MapAccess,
    ) -> io::Result<NonNull<u8>> {
        let offset = offset
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds off_t"))?;
        let prot = match access {
            MapAccess::ReadOnly => libc::PROT_READ,
            MapAccess::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
        };

        // SAFETY: a fresh address is chosen by the kernel; the caller guarantees the
        // offset is page-aligned and len is non-zero.
        let ptr = unsafe {
            mmap64(
                ptr::null_mut(),
                len,
                prot,
                libc::MAP_SHARED,
                descriptor,
                offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping"))
    }

    unsafe fn unmap(addr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: the caller passes a mapping produced by `map`.
        if unsafe { libc::munmap(addr.as_ptr().cast(), len) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(feature = "advise")]
    unsafe fn advise(addr: NonNull<u8>, len: usize, advice: MapAdvice) -> io::Result<()> {
        use libc::{madvise, MADV_DONTNEED, MADV_NORMAL, MADV_RANDOM, MADV_SEQUENTIAL, MADV_WILLNEED};

        let advice_flag = match advice {
            MapAdvice::Normal => MADV_NORMAL,
            MapAdvice::Random => MADV_RANDOM,
            MapAdvice::Sequential => MADV_SEQUENTIAL,
            MapAdvice::WillNeed => MADV_WILLNEED,
            MapAdvice::DontNeed => MADV_DONTNEED,
        };

        // SAFETY: the caller passes a live mapping produced by `map`.
        if unsafe { madvise(addr.as_ptr().cast(), len, advice_flag) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
