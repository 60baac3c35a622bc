//! Backing storage for the heap.
//!
//! A [`Region`] behaves like `sbrk(2)`: it hands out bytes strictly at the end
//! of what it has already granted and never moves or shrinks. Offsets into a
//! region stay valid for its whole lifetime.

use std::{ptr, slice};

use crate::error::AllocError;

/// A contiguous, growable byte region.
///
/// Payload offsets handed out by a [`Heap`](crate::Heap) are multiples of 8,
/// so absolute addresses are only 8-byte aligned if [`heap_lo`](Self::heap_lo)
/// is. Implementations must keep the base 8-byte aligned.
pub trait Region {
  /// Extends the region by `incr` bytes and returns the offset of the old
  /// break, i.e. the first newly granted byte.
  fn sbrk(
    &mut self,
    incr: usize,
  ) -> Result<usize, AllocError>;

  /// Number of bytes granted so far.
  fn heap_size(&self) -> usize;

  /// The granted bytes, `[0, heap_size)`.
  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];

  /// Address of the first byte of the region.
  fn heap_lo(&self) -> *const u8 {
    self.bytes().as_ptr()
  }

  /// Address of the last granted byte, if any.
  fn heap_hi(&self) -> Option<*const u8> {
    self.bytes().last().map(ptr::from_ref)
  }
}

/// A region backed by an owned, 8-byte aligned buffer.
///
/// The buffer grows on demand up to `max_size` bytes.
#[derive(Debug, Clone)]
pub struct VecRegion {
  words: Vec<u64>,
  brk: usize,
  max_size: usize,
}

impl VecRegion {
  pub fn new(max_size: usize) -> Self {
    Self {
      words: Vec::new(),
      brk: 0,
      max_size,
    }
  }

  pub fn max_size(&self) -> usize {
    self.max_size
  }
}

impl Region for VecRegion {
  fn sbrk(
    &mut self,
    incr: usize,
  ) -> Result<usize, AllocError> {
    let old_brk = self.brk;
    let new_brk = old_brk
      .checked_add(incr)
      .filter(|&brk| brk <= self.max_size)
      .ok_or(AllocError::OutOfSpace { requested: incr })?;

    let words = new_brk.div_ceil(size_of::<u64>());
    if words > self.words.len() {
      self.words.resize(words, 0);
    }
    self.brk = new_brk;

    Ok(old_brk)
  }

  fn heap_size(&self) -> usize {
    self.brk
  }

  fn bytes(&self) -> &[u8] {
    // SAFETY: `words` holds at least `brk` initialized bytes and u8 has no
    // alignment or validity requirements.
    unsafe { slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.brk) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    // SAFETY: see `bytes`; the slice borrows `self` mutably.
    unsafe { slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), self.brk) }
  }
}

#[cfg(unix)]
pub use mmap::MmapRegion;

#[cfg(unix)]
mod mmap {
  use std::{ptr, slice};

  use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void};
  use log::{debug, warn};

  use super::Region;
  use crate::error::AllocError;

  /// A region carved out of one anonymous mapping reserved up front.
  ///
  /// The whole `max_size` range is mapped at construction, and [`sbrk`](Region::sbrk)
  /// only moves a break pointer inside it, so granted memory never relocates.
  /// The mapping is released when the region is dropped.
  ///
  /// ```text
  ///   base                      brk                          base + max_size
  ///   ┌─────────────────────────┬───────────────────────────────────┐
  ///   │     granted (heap)      │            reserved               │
  ///   └─────────────────────────┴───────────────────────────────────┘
  /// ```
  #[derive(Debug)]
  pub struct MmapRegion {
    base: *mut u8,
    brk: usize,
    max_size: usize,
  }

  impl MmapRegion {
    /// Reserves `max_size` bytes of anonymous memory.
    pub fn reserve(max_size: usize) -> Result<Self, AllocError> {
      if max_size == 0 {
        return Ok(Self {
          base: ptr::NonNull::<u64>::dangling().as_ptr().cast(),
          brk: 0,
          max_size,
        });
      }

      let addr = unsafe {
        libc::mmap(
          ptr::null_mut(),
          max_size,
          PROT_READ | PROT_WRITE,
          MAP_PRIVATE | MAP_ANONYMOUS,
          -1,
          0,
        )
      };

      if addr == MAP_FAILED {
        warn!("mmap of {max_size} bytes failed");
        return Err(AllocError::OutOfSpace { requested: max_size });
      }

      debug!("reserved {max_size} bytes at {addr:?}");

      Ok(Self {
        base: addr.cast(),
        brk: 0,
        max_size,
      })
    }

    pub fn max_size(&self) -> usize {
      self.max_size
    }
  }

  impl Region for MmapRegion {
    fn sbrk(
      &mut self,
      incr: usize,
    ) -> Result<usize, AllocError> {
      let old_brk = self.brk;
      self.brk = old_brk
        .checked_add(incr)
        .filter(|&brk| brk <= self.max_size)
        .ok_or(AllocError::OutOfSpace { requested: incr })?;

      Ok(old_brk)
    }

    fn heap_size(&self) -> usize {
      self.brk
    }

    fn bytes(&self) -> &[u8] {
      // SAFETY: `[base, base + brk)` lies inside our private mapping, which
      // anonymous mmap zero-fills.
      unsafe { slice::from_raw_parts(self.base, self.brk) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
      // SAFETY: see `bytes`; the slice borrows `self` mutably.
      unsafe { slice::from_raw_parts_mut(self.base, self.brk) }
    }
  }

  impl Drop for MmapRegion {
    fn drop(&mut self) {
      if self.max_size == 0 {
        return;
      }

      let ret = unsafe { libc::munmap(self.base.cast::<c_void>(), self.max_size) };
      if ret != 0 {
        warn!("munmap of {} bytes at {:?} failed", self.max_size, self.base);
      }
    }
  }
}
