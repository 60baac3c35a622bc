//! # tagalloc - A Boundary-Tag Heap Allocator
//!
//! This crate provides a **first-fit, immediately coalescing** heap allocator
//! that manages a single contiguous region which only ever grows, the way a
//! classic `sbrk`-based `malloc` does.
//!
//! ## Overview
//!
//! The region is carved into blocks. Every block carries a boundary tag at
//! both ends, so the allocator can step to either neighbor in O(1) without any
//! explicit free list:
//!
//! ```text
//!   One Block:
//!   ┌──────────┬────────────────────────────────────┬──────────┐
//!   │  header  │              payload               │  footer  │
//!   │ size | a │                                    │ size | a │
//!   └──────────┴────────────────────────────────────┴──────────┘
//!     4 bytes  ▲                                      4 bytes
//!              └── Handle returned to the caller (8-byte aligned)
//! ```
//!
//! Two permanently allocated sentinels bound the block list, so the edges of
//! the region look like "already allocated" neighbors:
//!
//! ```text
//!   ┌─────┬──────────┬─────────┬─────────┬─────────┬─ ─ ─ ─┬──────────┐
//!   │ pad │ prologue │ block 1 │ block 2 │ block 3 │  ...  │ epilogue │
//!   │     │  8 / 1   │         │         │         │       │  0 / 1   │
//!   └─────┴──────────┴─────────┴─────────┴─────────┴─ ─ ─ ─┴──────────┘
//!                                                                      ▲
//!                                                                 Region break
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── tag        - Boundary tag encoding and offset arithmetic
//!   ├── block      - Handles and the implicit block list walker
//!   ├── region     - Region trait, VecRegion and MmapRegion
//!   ├── config     - HeapConfig
//!   ├── heap       - Heap: allocate, release, resize
//!   ├── check      - Heap consistency checker
//!   └── error      - AllocError, CheckError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::Heap;
//!
//! let mut heap = Heap::new()?;
//!
//! let a = heap.allocate(100)?.expect("non-zero size");
//! heap.payload_mut(a)?[..5].copy_from_slice(b"hello");
//!
//! let a = heap.resize(Some(a), 400)?.expect("non-zero size");
//! assert_eq!(&heap.payload(a)?[..5], b"hello");
//!
//! heap.release(a)?;
//! heap.check()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## How It Works
//!
//! ```text
//!   allocate(n)
//!      │
//!      ├── adjust: max(16, align(n + 8))
//!      ├── first fit over the block list ──── hit ───┐
//!      │                                             ▼
//!      └── miss: grow region, coalesce ──────► place (split if the
//!                                              remainder is >= 16)
//!
//!   release(h)  ── mark free ──► coalesce with free neighbors
//! ```
//!
//! ## Limitations
//!
//! - **Single owner**: every mutating operation takes `&mut self`; wrap the
//!   heap in a lock yourself if it must be shared.
//! - **Grow only**: the region is never shrunk.
//! - **Linear search**: first fit is O(number of blocks).
//! - **4 GiB**: block sizes live in 32-bit tags, which caps the region size.

pub mod align;
mod block;
mod check;
mod config;
mod error;
mod heap;
pub mod region;
pub mod tag;

pub use block::{Block, Blocks, Handle};
pub use config::{CHUNK_SIZE, HeapConfig, HeapConfigBuilder, MAX_HEAP};
pub use error::{AllocError, CheckError};
pub use heap::Heap;
#[cfg(unix)]
pub use region::MmapRegion;
pub use region::{Region, VecRegion};
