//! Boundary tag encoding and block offset arithmetic.
//!
//! A tag is one 4-byte word holding a block's total size with the allocated
//! flag packed into bit 0. Sizes are always multiples of [`DSIZE`], so the
//! low three bits are free.
//!
//! ```text
//!   31                                 3   2   1   0
//!   ┌──────────────────────────────────┬───┬───┬───┐
//!   │            block size            │ 0 │ 0 │ a │
//!   └──────────────────────────────────┴───┴───┴───┘
//! ```
//!
//! All offsets here are payload offsets ("block pointers") measured from the
//! start of the region.

/// Width of a single tag word, in bytes.
pub const WSIZE: usize = 4;

/// Double word. Block sizes and payload offsets are multiples of this.
pub const DSIZE: usize = 8;

/// Smallest block that can exist: header, footer and one aligned payload unit.
pub const MIN_BLOCK_SIZE: usize = 2 * DSIZE;

/// Largest size a tag word can describe.
pub const MAX_BLOCK_SIZE: usize = (u32::MAX as usize) & !0x7;

const SIZE_MASK: u32 = !0x7;
const ALLOC_BIT: u32 = 0x1;

/// Decoded contents of a header or footer word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
  pub size: usize,
  pub allocated: bool,
}

impl Tag {
  pub const fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self { size, allocated }
  }

  pub const fn free(size: usize) -> Self {
    Self::new(size, false)
  }

  pub const fn used(size: usize) -> Self {
    Self::new(size, true)
  }

  /// Packs size and allocated bit into one word.
  ///
  /// `size` must be a multiple of 8 and no larger than [`MAX_BLOCK_SIZE`].
  pub const fn pack(self) -> u32 {
    debug_assert!(self.size % DSIZE == 0 && self.size <= MAX_BLOCK_SIZE);
    (self.size as u32) | (self.allocated as u32)
  }

  pub const fn unpack(word: u32) -> Self {
    Self {
      size: (word & SIZE_MASK) as usize,
      allocated: word & ALLOC_BIT != 0,
    }
  }
}

/// Reads the tag word stored at `offset`.
#[inline]
pub fn get(
  bytes: &[u8],
  offset: usize,
) -> Tag {
  let mut word = [0u8; WSIZE];
  word.copy_from_slice(&bytes[offset..offset + WSIZE]);
  Tag::unpack(u32::from_ne_bytes(word))
}

/// Writes `tag` into the word at `offset`.
#[inline]
pub fn put(
  bytes: &mut [u8],
  offset: usize,
  tag: Tag,
) {
  bytes[offset..offset + WSIZE].copy_from_slice(&tag.pack().to_ne_bytes());
}

/// Offset of the header word of the block whose payload starts at `bp`.
#[inline]
pub const fn header(bp: usize) -> usize {
  bp - WSIZE
}

/// Offset of the footer word of a block of `size` bytes at `bp`.
#[inline]
pub const fn footer(
  bp: usize,
  size: usize,
) -> usize {
  bp + size - DSIZE
}

/// Payload offset of the block following a block of `size` bytes at `bp`.
#[inline]
pub const fn next(
  bp: usize,
  size: usize,
) -> usize {
  bp + size
}

/// Offset of the previous block's footer, which sits right before our header.
#[inline]
pub const fn prev_footer(bp: usize) -> usize {
  bp - DSIZE
}

/// Payload offset of the block preceding `bp`, given the size read from its
/// footer.
#[inline]
pub const fn prev(
  bp: usize,
  prev_size: usize,
) -> usize {
  bp - prev_size
}

/// Total block size needed to hold `size` payload bytes, or `None` if the
/// request cannot be represented in a tag.
pub fn adjusted_size(size: usize) -> Option<usize> {
  if size <= DSIZE {
    return Some(MIN_BLOCK_SIZE);
  }

  let total = size.checked_add(DSIZE + (DSIZE - 1))?;
  let asize = DSIZE * (total / DSIZE);

  (asize <= MAX_BLOCK_SIZE).then_some(asize)
}
