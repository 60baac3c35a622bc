use std::num::NonZeroUsize;

use crate::tag::{self, Tag};

/// Payload offset of a block, measured from the start of the region.
///
/// Handles are plain offsets, so they stay valid when the backing buffer is
/// reallocated. A handle is only meaningful for the heap that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
  /// Builds a handle from a raw payload offset. Returns `None` for offset 0,
  /// which can never hold a payload.
  pub const fn from_offset(offset: usize) -> Option<Self> {
    match NonZeroUsize::new(offset) {
      Some(offset) => Some(Self(offset)),
      None => None,
    }
  }

  pub const fn offset(self) -> usize {
    self.0.get()
  }
}

/// A snapshot of one block's boundary tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
  pub handle: Handle,
  pub size: usize,
  pub is_free: bool,
}

impl Block {
  pub fn new(
    handle: Handle,
    size: usize,
    is_free: bool,
  ) -> Self {
    Self { handle, size, is_free }
  }

  /// Payload bytes available to the owner of this block.
  pub fn usable_size(&self) -> usize {
    self.size - tag::DSIZE
  }
}

/// Walks the implicit block list from the first block after the prologue up
/// to, but not including, the epilogue.
///
/// The walk stops early if a size would step outside the region, so it is
/// safe on a corrupted heap.
pub struct Blocks<'a> {
  bytes: &'a [u8],
  bp: usize,
}

impl<'a> Blocks<'a> {
  pub(crate) fn new(
    bytes: &'a [u8],
    first: usize,
  ) -> Self {
    Self { bytes, bp: first }
  }
}

impl Iterator for Blocks<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    if self.bp < tag::WSIZE || self.bp > self.bytes.len() {
      return None;
    }

    let Tag { size, allocated } = tag::get(self.bytes, tag::header(self.bp));
    if size == 0 || tag::next(self.bp, size) > self.bytes.len() {
      return None;
    }

    let handle = Handle::from_offset(self.bp)?;
    self.bp = tag::next(self.bp, size);

    Some(Block::new(handle, size, !allocated))
  }
}
