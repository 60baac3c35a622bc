use std::fmt::{self, Debug, Formatter};

use log::{debug, trace, warn};

use crate::block::{Blocks, Handle};
use crate::config::HeapConfig;
use crate::error::AllocError;
use crate::region::{Region, VecRegion};
use crate::tag::{self, DSIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, Tag, WSIZE};
use crate::align;

/// A first-fit heap over an implicit, boundary-tagged block list.
///
/// ```text
///   pad  prologue       block           block               epilogue
///   ┌───┬───┬───┬─────┬──────────┬─────┬─────┬──────────┬─────┬───┐
///   │ 0 │8/1│8/1│ hdr │ payload  │ ftr │ hdr │ payload  │ ftr │0/1│
///   └───┴───┴───┴─────┴──────────┴─────┴─────┴──────────┴─────┴───┘
///           ▲             ▲                     ▲
///         listp        handle                handle
/// ```
///
/// The heap owns its [`Region`] and only ever grows it. All block handles are
/// offsets into that region.
pub struct Heap<R: Region = VecRegion> {
  pub(crate) region: R,
  pub(crate) config: HeapConfig,
  /// Payload offset of the prologue block.
  pub(crate) listp: usize,
}

impl Heap<VecRegion> {
  /// Creates a heap with the default configuration over an owned buffer.
  pub fn new() -> Result<Self, AllocError> {
    Self::with_config(HeapConfig::default())
  }

  /// Creates a heap over an owned buffer of at most `config.max_heap` bytes.
  pub fn with_config(config: HeapConfig) -> Result<Self, AllocError> {
    Self::init(VecRegion::new(config.max_heap), config)
  }
}

#[cfg(unix)]
impl Heap<crate::region::MmapRegion> {
  /// Creates a heap over an anonymous mapping of `config.max_heap` bytes.
  pub fn mmap(config: HeapConfig) -> Result<Self, AllocError> {
    Self::init(crate::region::MmapRegion::reserve(config.max_heap)?, config)
  }
}

impl<R: Region> Heap<R> {
  /// Lays out the pad word and both sentinels at the current end of `region`,
  /// then grows it by one chunk so the first allocation has a free block to
  /// land in.
  pub fn init(
    mut region: R,
    config: HeapConfig,
  ) -> Result<Self, AllocError> {
    debug_assert_eq!(region.heap_lo() as usize % DSIZE, 0, "region base is not 8-byte aligned");

    let brk = region.heap_size();
    let pad = align!(brk) - brk;
    let start = region.sbrk(pad + 4 * WSIZE)? + pad;

    let bytes = region.bytes_mut();
    bytes[start..start + WSIZE].fill(0);
    tag::put(bytes, start + WSIZE, Tag::used(DSIZE));
    tag::put(bytes, start + 2 * WSIZE, Tag::used(DSIZE));
    tag::put(bytes, start + 3 * WSIZE, Tag::used(0));

    let mut heap = Self {
      region,
      config,
      listp: start + DSIZE,
    };

    debug!("heap initialized at offset {start:#x}, chunk size {}", config.growth_step());

    heap.extend(config.growth_step())?;

    Ok(heap)
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  /// Bytes currently obtained from the region.
  pub fn heap_size(&self) -> usize {
    self.region.heap_size()
  }

  /// Iterates over every block between the prologue and the epilogue.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks::new(self.region.bytes(), self.first_block())
  }

  /// Absolute address of the payload behind `handle`.
  ///
  /// The address is only valid until the region next grows: a [`VecRegion`]
  /// may move its buffer then. Handles stay valid across growth.
  pub fn as_ptr(
    &self,
    handle: Handle,
  ) -> *const u8 {
    self.region.heap_lo().wrapping_add(handle.offset())
  }

  /// Allocates a block with room for at least `size` payload bytes.
  ///
  /// Returns `Ok(None)` for a zero-sized request.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<Handle>, AllocError> {
    if size == 0 {
      return Ok(None);
    }

    let asize = tag::adjusted_size(size).ok_or(AllocError::OutOfSpace { requested: size })?;

    let bp = match self.find_fit(asize) {
      Some(bp) => bp,
      None => self.extend(asize.max(self.config.growth_step()))?,
    };

    self.place(bp, asize);

    Ok(Handle::from_offset(bp))
  }

  /// Like [`allocate`](Self::allocate), but the whole usable payload is zeroed.
  pub fn allocate_zeroed(
    &mut self,
    size: usize,
  ) -> Result<Option<Handle>, AllocError> {
    let handle = self.allocate(size)?;
    if let Some(handle) = handle {
      self.payload_mut(handle)?.fill(0);
    }
    Ok(handle)
  }

  /// Returns a block to the heap, merging it with free neighbors.
  pub fn release(
    &mut self,
    handle: Handle,
  ) -> Result<(), AllocError> {
    let size = self.validate(handle)?;
    self.free_block(handle.offset(), size);
    Ok(())
  }

  /// Changes the size of an allocation, preserving its contents up to the
  /// smaller of the old and new sizes.
  ///
  /// A `None` handle allocates; a zero size releases and returns `Ok(None)`.
  /// The block is shrunk or grown in place when possible, otherwise its
  /// contents move to a new block and the old one is released. On error the
  /// original block is left untouched.
  pub fn resize(
    &mut self,
    handle: Option<Handle>,
    size: usize,
  ) -> Result<Option<Handle>, AllocError> {
    let Some(handle) = handle else {
      return self.allocate(size);
    };

    if size == 0 {
      self.release(handle)?;
      return Ok(None);
    }

    let old_size = self.validate(handle)?;
    let asize = tag::adjusted_size(size).ok_or(AllocError::OutOfSpace { requested: size })?;
    let bp = handle.offset();

    if asize <= old_size {
      self.shrink(bp, old_size, asize);
      return Ok(Some(handle));
    }

    let next = self.header(tag::next(bp, old_size));
    if !next.allocated && old_size + next.size >= asize {
      trace!("growing block {bp:#x} in place from {old_size} to {asize}");
      self.write_block(bp, Tag::used(old_size + next.size));
      self.shrink(bp, old_size + next.size, asize);
      return Ok(Some(handle));
    }

    let moved = self.allocate(size)?.ok_or(AllocError::OutOfSpace { requested: size })?;

    let copy = size.min(old_size - DSIZE);
    self.region.bytes_mut().copy_within(bp..bp + copy, moved.offset());
    self.free_block(bp, old_size);

    Ok(Some(moved))
  }

  /// Payload bytes usable through `handle`; may exceed the requested size.
  pub fn usable_size(
    &self,
    handle: Handle,
  ) -> Result<usize, AllocError> {
    Ok(self.validate(handle)? - DSIZE)
  }

  pub fn payload(
    &self,
    handle: Handle,
  ) -> Result<&[u8], AllocError> {
    let size = self.validate(handle)?;
    let bp = handle.offset();
    Ok(&self.region.bytes()[bp..bp + size - DSIZE])
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> Result<&mut [u8], AllocError> {
    let size = self.validate(handle)?;
    let bp = handle.offset();
    Ok(&mut self.region.bytes_mut()[bp..bp + size - DSIZE])
  }

  pub(crate) fn first_block(&self) -> usize {
    tag::next(self.listp, DSIZE)
  }

  fn tag_at(
    &self,
    offset: usize,
  ) -> Tag {
    tag::get(self.region.bytes(), offset)
  }

  fn header(
    &self,
    bp: usize,
  ) -> Tag {
    self.tag_at(tag::header(bp))
  }

  /// Writes identical header and footer tags for the block at `bp`.
  fn write_block(
    &mut self,
    bp: usize,
    block: Tag,
  ) {
    let bytes = self.region.bytes_mut();
    tag::put(bytes, tag::header(bp), block);
    tag::put(bytes, tag::footer(bp, block.size), block);
  }

  /// Checks that `handle` addresses an allocated block and returns its size.
  fn validate(
    &self,
    handle: Handle,
  ) -> Result<usize, AllocError> {
    let bp = handle.offset();
    let end = self.region.heap_size();
    let invalid = AllocError::InvalidHandle { offset: bp };

    if bp < self.first_block() || bp % DSIZE != 0 || bp >= end {
      return Err(invalid);
    }

    let header = self.header(bp);
    if header.size < MIN_BLOCK_SIZE || tag::next(bp, header.size) > end {
      return Err(invalid);
    }
    if !header.allocated {
      return Err(AllocError::DoubleFree { offset: bp });
    }
    if self.tag_at(tag::footer(bp, header.size)) != header {
      return Err(invalid);
    }

    Ok(header.size)
  }

  fn free_block(
    &mut self,
    bp: usize,
    size: usize,
  ) {
    self.write_block(bp, Tag::free(size));
    self.coalesce(bp);
  }

  /// Grows the region by at least `bytes` and returns the resulting free
  /// block, which may have merged with a free block before the old epilogue.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<usize, AllocError> {
    let size = align!(bytes);
    let end = self.region.heap_size();

    if end.checked_add(size).is_none_or(|end| end > MAX_BLOCK_SIZE) {
      warn!("refusing to grow heap of {end} bytes by {size}");
      return Err(AllocError::OutOfSpace { requested: size });
    }

    // The new space starts right after the old epilogue header, which becomes
    // the header of the new block.
    let bp = self.region.sbrk(size).inspect_err(|err| warn!("heap growth failed: {err}"))?;

    self.write_block(bp, Tag::free(size));
    tag::put(self.region.bytes_mut(), tag::header(tag::next(bp, size)), Tag::used(0));

    debug!("heap grew by {size} bytes to {}", self.region.heap_size());

    Ok(self.coalesce(bp))
  }

  /// Returns the first free block, in address order, of at least `asize` bytes.
  fn find_fit(
    &self,
    asize: usize,
  ) -> Option<usize> {
    self
      .blocks()
      .find(|block| block.is_free && block.size >= asize)
      .map(|block| block.handle.offset())
  }

  /// Marks `asize` bytes of the free block at `bp` as allocated, splitting off
  /// the rest when it can form a block of its own.
  fn place(
    &mut self,
    bp: usize,
    asize: usize,
  ) {
    let csize = self.header(bp).size;

    if csize - asize >= MIN_BLOCK_SIZE {
      trace!("placing {asize} bytes at {bp:#x}, splitting off {}", csize - asize);
      self.write_block(bp, Tag::used(asize));
      self.write_block(tag::next(bp, asize), Tag::free(csize - asize));
    } else {
      trace!("placing {asize} bytes at {bp:#x} using the whole {csize}-byte block");
      self.write_block(bp, Tag::used(csize));
    }
  }

  /// Cuts the allocated block at `bp` down to `asize` bytes and frees the
  /// tail, if the tail is large enough to be a block.
  fn shrink(
    &mut self,
    bp: usize,
    size: usize,
    asize: usize,
  ) {
    if size - asize < MIN_BLOCK_SIZE {
      return;
    }

    self.write_block(bp, Tag::used(asize));
    let rest = tag::next(bp, asize);
    self.free_block(rest, size - asize);
  }

  /// Merges the free block at `bp` with whichever neighbors are free and
  /// returns the payload offset of the merged block.
  fn coalesce(
    &mut self,
    bp: usize,
  ) -> usize {
    let mut size = self.header(bp).size;
    let prev = self.tag_at(tag::prev_footer(bp));
    let next = self.header(tag::next(bp, size));

    match (prev.allocated, next.allocated) {
      (true, true) => bp,
      (true, false) => {
        trace!("coalescing {bp:#x} with next block");
        size += next.size;
        self.write_block(bp, Tag::free(size));
        bp
      }
      (false, true) => {
        trace!("coalescing {bp:#x} with previous block");
        size += prev.size;
        let bp = tag::prev(bp, prev.size);
        self.write_block(bp, Tag::free(size));
        bp
      }
      (false, false) => {
        trace!("coalescing {bp:#x} with both neighbors");
        size += prev.size + next.size;
        let bp = tag::prev(bp, prev.size);
        self.write_block(bp, Tag::free(size));
        bp
      }
    }
  }
}

impl<R: Region> Debug for Heap<R> {
  fn fmt(
    &self,
    f: &mut Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "Heap of {} bytes", self.heap_size())?;

    for block in self.blocks() {
      let state = if block.is_free { "free" } else { "allocated" };
      write!(f, "\n\toffset {:#x}: {} bytes {state}", block.handle.offset(), block.size)?;
    }

    Ok(())
  }
}
