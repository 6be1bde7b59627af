//! The mapped file region: one shared mapping of an arbitrary byte range of an open file.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::slice;

use crate::errors::{FileMapError, Result};
use crate::sys::{DefaultBackend, MapBackend, MapSource, RawDescriptor};
use crate::utils::{slice_range, AlignedRange};

/// Access mode for a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapAccess {
    /// Read-only mapping. Writing through it faults.
    #[default]
    ReadOnly,
    /// Read-write mapping. Writes reach the file and every other mapper of it.
    ReadWrite,
}

impl MapAccess {
    /// `ReadOnly` when `read_only` is set, `ReadWrite` otherwise.
    #[must_use]
    pub fn from_read_only(read_only: bool) -> Self {
        if read_only {
            Self::ReadOnly
        } else {
            Self::ReadWrite
        }
    }
}

// A live OS mapping plus the logical view carved out of it.
struct Mapping {
    name: Option<String>,
    base: NonNull<u8>,
    base_len: usize,
    data_offset: u64,
    // data = base + adjust
    adjust: usize,
    data_len: usize,
    access: MapAccess,
}

/// A byte range of an open file mapped into memory.
///
/// The OS only maps at offsets aligned to its allocation granularity, so the region maps
/// a slightly larger aligned range and exposes the exact `(offset, len)` the caller asked
/// for as its logical view. The mapping is shared: writes through a read-write region
/// reach the file.
///
/// A region starts empty, is populated once by [`create`](Self::create), and releases its
/// mapping when dropped. Moving a `FileMap` moves the mapping; [`take`](Self::take)
/// moves it out and leaves the source empty.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use filemap::{FileMap, MapAccess, MapAdvice};
///
/// let file = File::open("data.bin")?;
///
/// let mut region = FileMap::new();
/// region.create(Some("data.bin"), &file, 4106, 100, MapAccess::ReadOnly)?;
/// region.advise(MapAdvice::Sequential)?;
///
/// assert_eq!(region.len(), 100);
/// let header = region.view(0, 16)?;
/// # let _ = header;
/// # Ok::<(), filemap::FileMapError>(())
/// ```
pub struct FileMap<B: MapBackend = DefaultBackend> {
    mapping: Option<Mapping>,
    _backend: PhantomData<fn() -> B>,
}

// SAFETY: the region exclusively owns its mapping. Shared access only reads through it,
// mutable access requires `&mut self`.
unsafe impl<B: MapBackend> Send for FileMap<B> {}
// SAFETY: see above.
unsafe impl<B: MapBackend> Sync for FileMap<B> {}

impl FileMap {
    /// Create an empty region on the default backend.
    ///
    /// Use `FileMap::<B>::default()` for another backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for mapping a region in one call.
    #[must_use]
    pub fn options<'a>() -> FileMapOptions<'a> {
        FileMapOptions::new()
    }
}

impl<B: MapBackend> Default for FileMap<B> {
    fn default() -> Self {
        Self {
            mapping: None,
            _backend: PhantomData,
        }
    }
}

impl<B: MapBackend> FileMap<B> {
    /// Map `len` bytes of `source` starting at `offset`.
    ///
    /// `name` is copied and kept for diagnostics only. The source is borrowed for the call;
    /// the mapping stays valid after it is closed.
    ///
    /// # Errors
    ///
    /// Returns `FileMapError::AlreadyMapped` if the region already holds a mapping.
    /// Returns `FileMapError::ZeroLength` if `len` is zero.
    /// Returns `FileMapError::InvalidRange` if the aligned length overflows.
    /// Returns `FileMapError::Granularity` if the OS cannot report its granularity.
    /// Returns `FileMapError::Map` if the OS refuses the mapping.
    ///
    /// On error the region is left exactly as it was.
    ///
    /// # Shared contents
    ///
    /// The mapping is shared with the file. Another read-write region over the same file,
    /// another process, or a plain `write` to the file can change the mapped bytes while a
    /// slice from [`as_slice`](Self::as_slice) or [`view`](Self::view) is borrowed. Callers
    /// that need stable contents must coordinate writers themselves, or copy the bytes out
    /// with [`read_into`](Self::read_into). Truncating the file below the mapped range
    /// makes later access fault.
    pub fn create<S: MapSource + ?Sized>(
        &mut self,
        name: Option<&str>,
        source: &S,
        offset: u64,
        len: usize,
        access: MapAccess,
    ) -> Result<()> {
        // SAFETY: the descriptor belongs to `source`, which is borrowed for this call.
        unsafe { self.create_raw(name, source.raw_descriptor(), offset, len, access) }
    }

    /// Like [`create`](Self::create), for callers that only hold a raw descriptor.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create). An invalid descriptor yields `FileMapError::Map`.
    ///
    /// # Safety
    ///
    /// `descriptor` must not be closed or reused by another thread while this call runs.
    pub unsafe fn create_raw(
        &mut self,
        name: Option<&str>,
        descriptor: RawDescriptor,
        offset: u64,
        len: usize,
        access: MapAccess,
    ) -> Result<()> {
        if self.mapping.is_some() {
            return Err(FileMapError::AlreadyMapped);
        }
        if len == 0 {
            return Err(FileMapError::ZeroLength);
        }

        let granularity = B::allocation_granularity().map_err(|e| {
            log::error!("could not get allocation granularity: {e}");
            FileMapError::Granularity(e)
        })?;
        let range = AlignedRange::new(offset, len, granularity)?;

        // SAFETY: `range.offset` is aligned to the granularity and `range.len` is non-zero.
        let base = unsafe { B::map(descriptor, range.offset, range.len, access) }.map_err(|source| {
            log::error!("mmap({},{}) failed: {source}", range.offset, range.len);
            FileMapError::Map {
                offset: range.offset,
                len: range.len,
                source,
            }
        })?;

        let mapping = Mapping {
            name: name.map(str::to_owned),
            base,
            base_len: range.len,
            data_offset: offset,
            adjust: range.adjust,
            data_len: len,
            access,
        };
        log::trace!(
            "MAP: base {:p}/{} data {:p}/{}",
            mapping.base,
            mapping.base_len,
            // SAFETY: adjust < base_len, so the pointer stays inside the mapping.
            unsafe { mapping.base.as_ptr().add(mapping.adjust) },
            mapping.data_len
        );
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Move the mapping out into a new region, leaving this one empty.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            mapping: self.mapping.take(),
            _backend: PhantomData,
        }
    }

    /// Move the mapping into `dst`, leaving this region empty.
    ///
    /// A mapping `dst` already held is released first.
    pub fn transfer_to(&mut self, dst: &mut Self) {
        *dst = self.take();
    }

    /// Whether the region currently holds a mapping.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Label given at creation, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.mapping.as_ref().and_then(|m| m.name.as_deref())
    }

    /// Access mode of the mapping, if any.
    #[must_use]
    pub fn access(&self) -> Option<MapAccess> {
        self.mapping.as_ref().map(|m| m.access)
    }

    /// File offset the logical view starts at (0 when empty).
    #[must_use]
    pub fn data_offset(&self) -> u64 {
        self.mapping.as_ref().map_or(0, |m| m.data_offset)
    }

    /// Start of the logical view (null when empty).
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.mapping.as_ref().map_or(ptr::null(), |m| {
            // SAFETY: adjust < base_len.
            unsafe { m.base.as_ptr().add(m.adjust).cast_const() }
        })
    }

    /// Length of the logical view (0 when empty).
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.data_len)
    }

    /// Whether the logical view is empty, which only happens for an empty region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start of the aligned OS mapping (null when empty).
    #[must_use]
    pub fn base_ptr(&self) -> *const u8 {
        self.mapping
            .as_ref()
            .map_or(ptr::null(), |m| m.base.as_ptr().cast_const())
    }

    /// Length of the aligned OS mapping (0 when empty).
    #[must_use]
    pub fn base_len(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.base_len)
    }

    /// Distance between the OS mapping and the logical view, `data_offset % granularity`.
    #[must_use]
    pub fn adjust(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.adjust)
    }

    /// The logical view as a byte slice (empty when the region is empty).
    ///
    /// Other mappers of the file may change these bytes while the slice is borrowed; see
    /// [`create`](Self::create).
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match &self.mapping {
            // SAFETY: [base + adjust, base + adjust + data_len) lies inside the live mapping.
            Some(m) => unsafe { slice::from_raw_parts(m.base.as_ptr().add(m.adjust), m.data_len) },
            None => &[],
        }
    }

    /// The logical view as a mutable byte slice.
    ///
    /// # Errors
    ///
    /// Returns `FileMapError::InvalidMode` if the mapping is read-only.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match &mut self.mapping {
            Some(m) if m.access == MapAccess::ReadOnly => {
                Err(FileMapError::InvalidMode("mutable access on read-only mapping"))
            }
            // SAFETY: the range lies inside the live mapping, which is writable, and
            // `&mut self` rules out other borrows of it.
            Some(m) => Ok(unsafe {
                slice::from_raw_parts_mut(m.base.as_ptr().add(m.adjust), m.data_len)
            }),
            None => Ok(&mut []),
        }
    }

    /// Zero-copy sub-view `[offset, offset + len)` of the logical view.
    ///
    /// # Errors
    ///
    /// Returns `FileMapError::OutOfBounds` if the range exceeds the logical view.
    pub fn view(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let data = self.as_slice();
        let (start, end) = slice_range(offset, len, data.len() as u64)?;
        Ok(&data[start..end])
    }

    /// Copy bytes starting at `offset` of the logical view into `buf`.
    ///
    /// # Errors
    ///
    /// Returns `FileMapError::OutOfBounds` if the range exceeds the logical view.
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let src = self.view(offset, buf.len() as u64)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    pub(crate) fn base(&self) -> Option<(NonNull<u8>, usize)> {
        self.mapping.as_ref().map(|m| (m.base, m.base_len))
    }
}

impl<B: MapBackend> Drop for FileMap<B> {
    fn drop(&mut self) {
        let Some(m) = self.mapping.take() else {
            return;
        };
        // SAFETY: base/base_len came from `B::map` and are released only here.
        if let Err(e) = unsafe { B::unmap(m.base, m.base_len) } {
            log::error!("munmap({:p}, {}) failed: {e}", m.base, m.base_len);
        }
    }
}

impl<B: MapBackend> fmt::Debug for FileMap<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMap")
            .field("name", &self.name())
            .field("access", &self.access())
            .field("base", &self.base_ptr())
            .field("base_len", &self.base_len())
            .field("data_offset", &self.data_offset())
            .field("data", &self.as_ptr())
            .field("len", &self.len())
            .finish()
    }
}

/// Builder-style configuration for mapping a region.
///
/// # Examples
///
/// ```no_run
/// use std::fs::OpenOptions;
/// use filemap::FileMap;
///
/// let file = OpenOptions::new().read(true).write(true).open("data.bin")?;
/// let mut region = FileMap::options()
///     .name("data.bin")
///     .offset(100)
///     .len(12)
///     .read_only(false)
///     .map(&file)?;
/// region.as_mut_slice()?.copy_from_slice(b"Hello, mmap!");
/// # Ok::<(), filemap::FileMapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileMapOptions<'a> {
    name: Option<&'a str>,
    offset: u64,
    len: usize,
    access: MapAccess,
}

impl<'a> FileMapOptions<'a> {
    /// Read-only, offset 0, length unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic label copied into the region.
    #[must_use]
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// File offset of the logical view. Need not be aligned.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Length of the logical view. Must be non-zero.
    #[must_use]
    pub fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Select read-only (`true`) or read-write (`false`) access.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.access = MapAccess::from_read_only(read_only);
        self
    }

    /// Select the access mode.
    #[must_use]
    pub fn access(mut self, access: MapAccess) -> Self {
        self.access = access;
        self
    }

    /// Map `source` with these options on the default backend.
    ///
    /// # Errors
    ///
    /// Returns errors from [`FileMap::create`].
    pub fn map<S: MapSource + ?Sized>(&self, source: &S) -> Result<FileMap> {
        self.map_with::<DefaultBackend, S>(source)
    }

    /// Map `source` with these options on backend `B`.
    ///
    /// # Errors
    ///
    /// Returns errors from [`FileMap::create`].
    pub fn map_with<B: MapBackend, S: MapSource + ?Sized>(&self, source: &S) -> Result<FileMap<B>> {
        let mut region = FileMap::<B>::default();
        region.create(self.name, source, self.offset, self.len, self.access)?;
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn scratch(len: usize) -> File {
        let mut file = tempfile::tempfile().expect("tempfile");
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).expect("fill");
        file
    }

    #[test]
    fn empty_region_reports_nothing() {
        let region: FileMap = FileMap::new();
        assert!(!region.is_mapped());
        assert!(region.as_ptr().is_null());
        assert!(region.base_ptr().is_null());
        assert_eq!(region.len(), 0);
        assert_eq!(region.base_len(), 0);
        assert_eq!(region.name(), None);
        assert!(region.as_slice().is_empty());
    }

    #[test]
    fn second_create_is_rejected_and_keeps_first_mapping() {
        let file = scratch(8192);
        let mut region = FileMap::new();
        region.create(Some("first"), &file, 10, 20, MapAccess::ReadOnly).expect("create");
        let before = region.as_ptr();

        let err = region
            .create(Some("second"), &file, 0, 20, MapAccess::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, FileMapError::AlreadyMapped));
        assert_eq!(region.as_ptr(), before);
        assert_eq!(region.name(), Some("first"));
        assert_eq!(region.data_offset(), 10);
    }

    #[test]
    fn zero_length_is_rejected() {
        let file = scratch(16);
        let mut region = FileMap::new();
        let err = region.create(None, &file, 0, 0, MapAccess::ReadOnly).unwrap_err();
        assert!(matches!(err, FileMapError::ZeroLength));
        assert!(!region.is_mapped());
    }

    #[test]
    fn read_only_refuses_mutable_slice() {
        let file = scratch(64);
        let mut region = FileMap::new();
        region.create(None, &file, 0, 64, MapAccess::ReadOnly).expect("create");
        assert!(matches!(region.as_mut_slice(), Err(FileMapError::InvalidMode(_))));
    }

    #[test]
    fn view_and_read_into_are_bounds_checked() {
        let file = scratch(4096);
        let region = FileMap::options().offset(5).len(10).map(&file).expect("map");

        assert_eq!(region.view(0, 3).expect("view"), &[5, 6, 7]);
        let mut buf = [0u8; 2];
        region.read_into(8, &mut buf).expect("read_into");
        assert_eq!(buf, [13, 14]);

        let err = region.view(8, 3).unwrap_err();
        assert_eq!(err.to_string(), "range out of bounds: offset=8, len=3, total=10");
        assert!(region.read_into(11, &mut []).is_err());
    }

    #[test]
    fn access_from_read_only_flag() {
        assert_eq!(MapAccess::from_read_only(true), MapAccess::ReadOnly);
        assert_eq!(MapAccess::from_read_only(false), MapAccess::ReadWrite);
    }
}
