use crate::error::CheckError;
use crate::heap::Heap;
use crate::region::Region;
use crate::tag::{self, DSIZE, MIN_BLOCK_SIZE, Tag, WSIZE};

impl<R: Region> Heap<R> {
  /// Walks the whole region and verifies the boundary-tag invariants.
  ///
  /// Every public operation leaves the heap in a state that passes this
  /// check; a failure means the heap was corrupted by writes outside a
  /// payload or by a bogus handle.
  pub fn check(&self) -> Result<(), CheckError> {
    let bytes = self.region.bytes();
    let end = bytes.len();

    if self.listp + 2 * WSIZE > end {
      return Err(CheckError::BadPrologue);
    }

    let prologue = tag::get(bytes, tag::header(self.listp));
    if prologue != Tag::used(DSIZE) || tag::get(bytes, self.listp) != prologue {
      return Err(CheckError::BadPrologue);
    }

    let mut bp = self.first_block();
    let mut prev_free: Option<usize> = None;

    loop {
      if bp > end {
        return Err(CheckError::Overrun { offset: bp });
      }

      let header = tag::get(bytes, tag::header(bp));

      if header.size == 0 {
        if !header.allocated || bp != end {
          return Err(CheckError::BadEpilogue { offset: tag::header(bp) });
        }
        return Ok(());
      }

      if bp % DSIZE != 0 {
        return Err(CheckError::Misaligned { offset: bp });
      }
      if header.size < MIN_BLOCK_SIZE || header.size % DSIZE != 0 {
        return Err(CheckError::Undersized { offset: bp, size: header.size });
      }
      if tag::next(bp, header.size) > end {
        return Err(CheckError::Overrun { offset: bp });
      }
      if tag::get(bytes, tag::footer(bp, header.size)) != header {
        return Err(CheckError::TagMismatch { offset: bp });
      }

      prev_free = match (prev_free, header.allocated) {
        (Some(offset), false) => return Err(CheckError::UncoalescedFree { offset, next: bp }),
        (_, false) => Some(bp),
        (_, true) => None,
      };

      bp = tag::next(bp, header.size);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::HeapConfig;

  fn heap() -> Heap {
    Heap::with_config(HeapConfig::default()).unwrap()
  }

  #[test]
  fn test_fresh_heap_is_consistent() {
    assert_eq!(heap().check(), Ok(()));
  }

  #[test]
  fn test_detects_bad_prologue() {
    let mut heap = heap();
    tag::put(heap.region.bytes_mut(), 4, Tag::free(8));

    assert_eq!(heap.check(), Err(CheckError::BadPrologue));
  }

  #[test]
  fn test_detects_tag_mismatch() {
    let mut heap = heap();
    let a = heap.allocate(8).unwrap().unwrap();
    tag::put(heap.region.bytes_mut(), tag::footer(a.offset(), 16), Tag::free(16));

    assert_eq!(heap.check(), Err(CheckError::TagMismatch { offset: 16 }));
  }

  #[test]
  fn test_detects_uncoalesced_free_blocks() {
    let mut heap = heap();
    let a = heap.allocate(8).unwrap().unwrap();
    let bytes = heap.region.bytes_mut();
    tag::put(bytes, tag::header(a.offset()), Tag::free(16));
    tag::put(bytes, tag::footer(a.offset(), 16), Tag::free(16));

    assert_eq!(heap.check(), Err(CheckError::UncoalescedFree { offset: 16, next: 32 }));
  }

  #[test]
  fn test_detects_undersized_block() {
    let mut heap = heap();
    tag::put(heap.region.bytes_mut(), 12, Tag::free(8));

    assert_eq!(heap.check(), Err(CheckError::Undersized { offset: 16, size: 8 }));
  }

  #[test]
  fn test_detects_overrun() {
    let mut heap = heap();
    tag::put(heap.region.bytes_mut(), 12, Tag::free(8192));

    assert_eq!(heap.check(), Err(CheckError::Overrun { offset: 16 }));
  }

  #[test]
  fn test_detects_bad_epilogue() {
    let mut heap = heap();
    let end = heap.heap_size();
    tag::put(heap.region.bytes_mut(), end - WSIZE, Tag::free(0));

    assert_eq!(heap.check(), Err(CheckError::BadEpilogue { offset: end - WSIZE }));
  }
}
