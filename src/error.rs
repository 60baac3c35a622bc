/// Errors returned by heap operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  /// The region could not grow by the requested amount, or the request is
  /// too large to describe with a boundary tag.
  #[error("out of space: cannot obtain {requested} bytes")]
  OutOfSpace { requested: usize },
  /// The handle does not address an allocated block of this heap.
  #[error("invalid handle at offset {offset:#x}")]
  InvalidHandle { offset: usize },
  /// The handle addresses a block that is already free.
  #[error("block at offset {offset:#x} is already free")]
  DoubleFree { offset: usize },
}

/// First invariant violation found by [`Heap::check`](crate::Heap::check).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
  #[error("bad prologue block")]
  BadPrologue,
  #[error("bad epilogue header at offset {offset:#x}")]
  BadEpilogue { offset: usize },
  #[error("payload at offset {offset:#x} is not 8-byte aligned")]
  Misaligned { offset: usize },
  #[error("block at offset {offset:#x} has invalid size {size}")]
  Undersized { offset: usize, size: usize },
  #[error("header and footer disagree for block at offset {offset:#x}")]
  TagMismatch { offset: usize },
  #[error("free blocks at offset {offset:#x} and {next:#x} were not coalesced")]
  UncoalescedFree { offset: usize, next: usize },
  #[error("block at offset {offset:#x} runs past the end of the region")]
  Overrun { offset: usize },
}
