//! # filemap: map an arbitrary byte range of an open file into memory
//!
//! The OS only maps file ranges that start on its allocation granularity. This crate
//! takes any `(offset, len)` a caller asks for, maps the smallest aligned range that
//! covers it, and hands back exactly the requested bytes as a contiguous view.
//!
//! ## Features
//!
//! - **Alignment handled**: unaligned offsets are rounded down and the view is offset back
//! - **Shared mappings**: writes through a read-write region reach the file
//! - **Single owner**: the mapping is released exactly once, on drop, wherever it was moved
//! - **Access hints**: `madvise`-style advice where the platform supports it
//! - **Cross-platform**: Unix (`mmap`) and Windows (`MapViewOfFile`) backends
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use filemap::{FileMap, MapAccess};
//!
//! let file = File::open("data.bin")?;
//!
//! // Map 100 bytes starting 10 bytes into the second page
//! let mut region = FileMap::new();
//! region.create(Some("data.bin"), &file, 4096 + 10, 100, MapAccess::ReadOnly)?;
//!
//! // The file can be closed; the mapping stays valid
//! drop(file);
//! assert_eq!(region.as_slice().len(), 100);
//! # Ok::<(), filemap::FileMapError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: Error types for all region operations
//! - [`utils`]: Allocation granularity, alignment arithmetic, bounds checking
//! - [`sys`]: Platform mapping backends behind the `MapBackend` trait
//! - [`filemap`]: Core `FileMap` region and its builder
//! - [`advise`]: Access-pattern advice
//!
//! ## Feature Flags
//!
//! - `advise` (default): forward advice to `madvise`; without it `advise` reports unsupported

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]

pub mod advise;
pub mod errors;
pub mod filemap;
pub mod sys;
pub mod utils;

pub use advise::MapAdvice;
pub use errors::{FileMapError, Result};
pub use filemap::{FileMap, FileMapOptions, MapAccess};
pub use sys::{DefaultBackend, MapBackend, MapSource, RawDescriptor};
pub use utils::allocation_granularity;
