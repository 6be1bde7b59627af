//! Basic integration tests for filemap.

use filemap::{allocation_granularity, FileMap, FileMapError, MapAccess};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

fn patterned(len: usize) -> anyhow::Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new()?;
    let data: Vec<u8> = (0..len).map(|i| (i * 31 % 253) as u8).collect();
    tmp.write_all(&data)?;
    tmp.flush()?;
    Ok(tmp)
}

fn read_file_at(file: &mut File, offset: u64, len: usize) -> anyhow::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[test]
fn unaligned_offset_maps_requested_bytes() -> anyhow::Result<()> {
    let page = allocation_granularity()?;
    let tmp = patterned(page * 3)?;
    let mut file = tmp.reopen()?;

    let offset = page as u64 + 10;
    let mut region = FileMap::new();
    region.create(Some("patterned"), &file, offset, 100, MapAccess::ReadOnly)?;

    assert_eq!(region.adjust(), 10);
    assert_eq!(region.as_ptr() as usize - region.base_ptr() as usize, 10);
    assert_eq!(region.len(), 100);
    assert_eq!(region.base_len(), 110);
    assert_eq!(region.data_offset(), offset);
    assert_eq!(region.name(), Some("patterned"));
    assert_eq!(region.access(), Some(MapAccess::ReadOnly));

    let expected = read_file_at(&mut file, offset, 100)?;
    assert_eq!(region.as_slice(), expected.as_slice());
    Ok(())
}

#[test]
fn aligned_offset_needs_no_adjustment() -> anyhow::Result<()> {
    let page = allocation_granularity()?;
    let tmp = patterned(page * 4)?;
    let mut file = tmp.reopen()?;

    for pages in 0..3u64 {
        let offset = pages * page as u64;
        let region = FileMap::options().offset(offset).len(page + 7).map(&file)?;
        assert_eq!(region.base_ptr(), region.as_ptr());
        assert_eq!(region.base_len(), page + 7);
        assert_eq!(region.adjust(), 0);
        assert_eq!(region.as_slice(), read_file_at(&mut file, offset, page + 7)?.as_slice());
    }
    Ok(())
}

#[test]
fn logical_view_offsets_match_modulo() -> anyhow::Result<()> {
    let page = allocation_granularity()?;
    let tmp = patterned(page * 2 + 64)?;
    let file = tmp.reopen()?;

    for offset in [1u64, 63, page as u64 - 1, page as u64 + 1, 2 * page as u64 + 3] {
        let region = FileMap::options().offset(offset).len(32).map(&file)?;
        assert_eq!(
            (region.as_ptr() as usize - region.base_ptr() as usize) as u64,
            offset % page as u64
        );
        assert_eq!(region.len(), 32);
        assert!(region.len() <= region.base_len() - region.adjust());
    }
    Ok(())
}

#[test]
fn writes_reach_the_file_and_other_mappers() -> anyhow::Result<()> {
    let page = allocation_granularity()?;
    let tmp = patterned(page * 2)?;
    let mut file = OpenOptions::new().read(true).write(true).open(tmp.path())?;

    let offset = page as u64 - 3;
    let mut writer = FileMap::options()
        .name("writer")
        .offset(offset)
        .len(12)
        .read_only(false)
        .map(&file)?;
    let reader = FileMap::options().offset(offset).len(12).map(&file)?;

    writer.as_mut_slice()?.copy_from_slice(b"Hello, mmap!");

    assert_eq!(reader.as_slice(), b"Hello, mmap!");
    assert_eq!(read_file_at(&mut file, offset, 12)?, b"Hello, mmap!");
    Ok(())
}

#[test]
fn mapping_outlives_the_descriptor() -> anyhow::Result<()> {
    let tmp = patterned(1024)?;
    let file = tmp.reopen()?;
    let region = FileMap::options().offset(100).len(50).map(&file)?;
    let snapshot = region.as_slice().to_vec();

    drop(file);

    assert_eq!(region.as_slice(), snapshot.as_slice());
    Ok(())
}

#[test]
fn read_write_on_read_only_descriptor_fails_cleanly() -> anyhow::Result<()> {
    let tmp = patterned(4096)?;
    let file = File::open(tmp.path())?;

    let mut region = FileMap::new();
    let result = region.create(Some("ro"), &file, 0, 16, MapAccess::ReadWrite);
    assert!(matches!(result, Err(FileMapError::Map { .. })));
    assert!(!region.is_mapped());
    assert!(region.as_ptr().is_null());
    assert_eq!(region.name(), None);

    // The same region can still be populated afterwards.
    region.create(Some("ro"), &file, 0, 16, MapAccess::ReadOnly)?;
    assert!(region.is_mapped());
    Ok(())
}

#[test]
#[cfg(unix)]
fn invalid_descriptor_leaves_region_empty() {
    let mut region = FileMap::new();
    // SAFETY: -1 is never an open descriptor.
    let result = unsafe { region.create_raw(Some("bad"), -1, 0, 100, MapAccess::ReadOnly) };

    match result {
        Err(FileMapError::Map { offset, len, source }) => {
            assert_eq!(offset, 0);
            assert_eq!(len, 100);
            assert_eq!(source.raw_os_error(), Some(libc::EBADF));
        }
        other => panic!("expected mapping failure, got {other:?}"),
    }
    assert!(!region.is_mapped());
    assert!(region.base_ptr().is_null());
    assert_eq!(region.len(), 0);
}

#[test]
fn zero_length_is_rejected() -> anyhow::Result<()> {
    let tmp = patterned(16)?;
    let file = tmp.reopen()?;
    let err = FileMap::options().map(&file).unwrap_err();
    assert_eq!(err.to_string(), "mapping length must be greater than zero");
    Ok(())
}

#[test]
fn concurrent_readers_share_one_region() -> anyhow::Result<()> {
    let page = allocation_granularity()?;
    let tmp = patterned(page * 2)?;
    let file = tmp.reopen()?;
    let region = FileMap::options().offset(5).len(page).map(&file)?;
    let expected = region.as_slice().to_vec();

    std::thread::scope(|s| {
        for t in 0..4 {
            let region = &region;
            let expected = &expected;
            s.spawn(move || {
                let start = t * 100;
                assert_eq!(
                    region.view(start as u64, 100).expect("view"),
                    &expected[start..start + 100]
                );
            });
        }
    });
    Ok(())
}

#[test]
fn read_into_copy_is_stable_across_shared_writes() -> anyhow::Result<()> {
    let tmp = patterned(4096)?;
    let file = OpenOptions::new().read(true).write(true).open(tmp.path())?;

    let reader = FileMap::options().offset(20).len(8).map(&file)?;
    let mut writer = FileMap::options().offset(20).len(8).read_only(false).map(&file)?;

    let mut snapshot = [0u8; 8];
    reader.read_into(0, &mut snapshot)?;
    let original = snapshot;

    writer.as_mut_slice()?.copy_from_slice(b"CHANGED!");

    // The mapped view follows the other writer; the copied bytes do not.
    assert_eq!(reader.as_slice(), b"CHANGED!");
    assert_eq!(snapshot, original);
    assert_ne!(&snapshot, b"CHANGED!");
    Ok(())
}
