/// Rounds `value` up to the heap's double-word alignment (8 bytes).
///
/// Every block size in the heap is a multiple of this unit, which keeps every
/// payload offset 8-byte aligned.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::tag::DSIZE)
  };
}

/// Rounds `value` up to a multiple of `unit`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align_to;
///
/// assert_eq!(align_to!(5, 4), 8);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $unit:expr) => {
    ($value + $unit - 1) & !($unit - 1)
  };
}

#[cfg(test)]
mod tests {
  use crate::tag::DSIZE;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (DSIZE * i + 1)..=(DSIZE * (i + 1));

      let expected_alignment = DSIZE * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to() {
    assert_eq!(align_to!(0usize, 4), 0);
    assert_eq!(align_to!(1usize, 4), 4);
    assert_eq!(align_to!(4096usize, 4096), 4096);
    assert_eq!(align_to!(4097usize, 4096), 8192);
  }
}
