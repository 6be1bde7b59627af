//! `CreateFileMappingW`/`MapViewOfFile` backend.
//!
//! Memory advice is not available here; [`MapBackend::advise`] keeps its unsupported default.

use std::ffi::c_void;
use std::io;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use super::MapBackend;
use crate::filemap::MapAccess;
use crate::utils::cached_granularity;

/// Raw file handle.
pub type RawDescriptor = std::os::windows::io::RawHandle;

/// Backend built on the Win32 file-mapping calls.
#[derive(Debug)]
pub struct OsBackend;

const PAGE_READONLY: u32 = 0x02;
const PAGE_READWRITE: u32 = 0x04;
const FILE_MAP_WRITE: u32 = 0x0002;
const FILE_MAP_READ: u32 = 0x0004;

#[allow(non_snake_case)]
#[repr(C)]
struct SYSTEM_INFO {
    wProcessorArchitecture: u16,
    wReserved: u16,
    dwPageSize: u32,
    lpMinimumApplicationAddress: *mut c_void,
    lpMaximumApplicationAddress: *mut c_void,
    dwActiveProcessorMask: usize,
    dwNumberOfProcessors: u32,
    dwProcessorType: u32,
    dwAllocationGranularity: u32,
    wProcessorLevel: u16,
    wProcessorRevision: u16,
}

#[allow(non_snake_case)]
extern "system" {
    fn GetSystemInfo(lpSystemInfo: *mut SYSTEM_INFO);
    fn CreateFileMappingW(
        hFile: *mut c_void,
        lpFileMappingAttributes: *mut c_void,
        flProtect: u32,
        dwMaximumSizeHigh: u32,
        dwMaximumSizeLow: u32,
        lpName: *const u16,
    ) -> *mut c_void;
    fn MapViewOfFile(
        hFileMappingObject: *mut c_void,
        dwDesiredAccess: u32,
        dwFileOffsetHigh: u32,
        dwFileOffsetLow: u32,
        dwNumberOfBytesToMap: usize,
    ) -> *mut c_void;
    fn UnmapViewOfFile(lpBaseAddress: *const c_void) -> i32;
    fn CloseHandle(hObject: *mut c_void) -> i32;
}

fn query_allocation_granularity() -> io::Result<usize> {
    let mut sysinfo = MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo always fills the structure.
    let granularity = unsafe {
        GetSystemInfo(sysinfo.as_mut_ptr());
        sysinfo.assume_init().dwAllocationGranularity
    };
    Ok(granularity as usize)
}

unsafe impl MapBackend for OsBackend {
    fn allocation_granularity() -> io::Result<usize> {
        cached_granularity(query_allocation_granularity)
    }

    #[allow(clippy::cast_possible_truncation)]
    unsafe fn map(
        descriptor: RawDescriptor,
        offset: u64,
        len: usize,
        access: MapAccess,
    ) -> io::Result<NonNull<u8>> {
        let (protect, desired) = match access {
            MapAccess::ReadOnly => (PAGE_READONLY, FILE_MAP_READ),
            MapAccess::ReadWrite => (PAGE_READWRITE, FILE_MAP_READ | FILE_MAP_WRITE),
        };

        // SAFETY: a zero maximum size maps the file at its current size.
        let mapping = unsafe {
            CreateFileMappingW(descriptor, ptr::null_mut(), protect, 0, 0, ptr::null())
        };
        if mapping.is_null() {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: the caller guarantees the offset honors the allocation granularity.
        let view = unsafe {
            MapViewOfFile(
                mapping,
                desired,
                (offset >> 32) as u32,
                offset as u32,
                len,
            )
        };
        let err = view.is_null().then(io::Error::last_os_error);

        // The view keeps the section alive on its own.
        // SAFETY: `mapping` is a handle we own.
        unsafe { CloseHandle(mapping) };

        match err {
            Some(err) => Err(err),
            None => NonNull::new(view.cast::<u8>())
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "MapViewOfFile returned null")),
        }
    }

    unsafe fn unmap(addr: NonNull<u8>, _len: usize) -> io::Result<()> {
        // SAFETY: the caller passes a view produced by `map`.
        if unsafe { UnmapViewOfFile(addr.as_ptr().cast_const().cast()) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
