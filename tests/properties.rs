use tagalloc::{AllocError, CHUNK_SIZE, Handle, Heap, HeapConfig, Region, VecRegion};

fn alloc<R: Region>(
  heap: &mut Heap<R>,
  size: usize,
) -> Handle {
  heap.allocate(size).unwrap().unwrap()
}

fn sizes() -> impl Iterator<Item = usize> {
  // Small deterministic spread of sizes, including the split boundaries.
  (1..=40).chain([63, 64, 65, 100, 255, 256, 1000, 4000, 4088, 4089, 10_000])
}

#[test]
fn test_handles_are_aligned() {
  let mut heap = Heap::new().unwrap();

  for size in sizes() {
    let handle = alloc(&mut heap, size);
    assert_eq!(handle.offset() % 8, 0, "offset for size {size}");
    assert_eq!(heap.as_ptr(handle) as usize % 8, 0, "address for size {size}");
    assert!(heap.usable_size(handle).unwrap() >= size);
  }

  heap.check().unwrap();
}

#[cfg(unix)]
#[test]
fn test_mmap_handles_are_aligned() {
  let mut heap = Heap::mmap(HeapConfig::default()).unwrap();

  for size in sizes() {
    let handle = alloc(&mut heap, size);
    assert_eq!(heap.as_ptr(handle) as usize % 8, 0);
  }

  heap.check().unwrap();
}

#[test]
fn test_live_blocks_never_overlap() {
  let mut heap = Heap::new().unwrap();
  let mut live = Vec::new();

  for (i, size) in sizes().enumerate() {
    let handle = alloc(&mut heap, size);
    heap.payload_mut(handle).unwrap().fill(i as u8);
    live.push((handle, size, i as u8));

    // Free every third block to create holes for later requests.
    if i % 3 == 2 {
      let (handle, ..) = live.remove(live.len() / 2);
      heap.release(handle).unwrap();
    }
  }

  let mut ranges: Vec<_> = live
    .iter()
    .map(|&(handle, ..)| {
      let start = handle.offset();
      (start, start + heap.usable_size(handle).unwrap())
    })
    .collect();
  ranges.sort();

  for pair in ranges.windows(2) {
    assert!(pair[0].1 <= pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
  }

  for &(handle, _, fill) in &live {
    assert!(heap.payload(handle).unwrap().iter().all(|&byte| byte == fill));
  }
}

#[test]
fn test_releases_leave_no_adjacent_free_blocks() {
  let mut heap = Heap::new().unwrap();
  let handles: Vec<_> = (1..=64).map(|i| alloc(&mut heap, i * 12)).collect();

  // Release in an interleaved order so every coalescing case shows up.
  let order = (0..handles.len()).step_by(2).chain((1..handles.len()).step_by(2).rev());
  for i in order {
    heap.release(handles[i]).unwrap();
    heap.check().unwrap();

    let blocks: Vec<_> = heap.blocks().collect();
    for pair in blocks.windows(2) {
      assert!(!(pair[0].is_free && pair[1].is_free));
    }
  }

  let blocks: Vec<_> = heap.blocks().collect();
  assert_eq!(blocks.len(), 1);
  assert!(blocks[0].is_free);
  assert_eq!(blocks[0].size, heap.heap_size() - 16);
}

#[test]
fn test_resize_keeps_contents() {
  let mut heap = Heap::new().unwrap();
  let a = alloc(&mut heap, 40);
  let _fence = alloc(&mut heap, 8);

  let pattern: Vec<u8> = (0..40).collect();
  heap.payload_mut(a).unwrap()[..40].copy_from_slice(&pattern);

  let b = heap.resize(Some(a), 5000).unwrap().unwrap();
  assert_ne!(a, b);
  assert_eq!(&heap.payload(b).unwrap()[..40], &pattern[..]);

  let c = heap.resize(Some(b), 20).unwrap().unwrap();
  assert_eq!(c, b);
  assert_eq!(&heap.payload(c).unwrap()[..20], &pattern[..20]);

  heap.check().unwrap();
}

#[test]
fn test_first_fit_takes_lowest_address() {
  let mut heap = Heap::new().unwrap();

  let small = alloc(&mut heap, 8); // 16-byte block
  let _fence1 = alloc(&mut heap, 8);
  let large = alloc(&mut heap, 56); // 64-byte block
  let _fence2 = alloc(&mut heap, 8);
  let exact = alloc(&mut heap, 24); // 32-byte block
  let _fence3 = alloc(&mut heap, 8);

  for handle in [small, large, exact] {
    heap.release(handle).unwrap();
  }

  let free: Vec<_> = heap.blocks().filter(|b| b.is_free).map(|b| b.size).collect();
  assert_eq!(&free[..3], &[16, 64, 32]);

  // A 32-byte block is needed; the 64-byte block comes first in address order.
  let handle = alloc(&mut heap, 24);
  assert_eq!(handle, large);

  let free: Vec<_> = heap.blocks().filter(|b| b.is_free).map(|b| b.size).collect();
  assert_eq!(&free[..3], &[16, 32, 32]);
  heap.check().unwrap();
}

#[test]
fn test_small_remainder_is_not_split() {
  let mut heap = Heap::new().unwrap();

  let hole = alloc(&mut heap, 24); // 32-byte block
  let fence = alloc(&mut heap, 8);
  heap.release(hole).unwrap();

  let before: Vec<_> = heap.blocks().collect();

  // 16 bytes need a 24-byte block; the 8 left over cannot form a block.
  let handle = alloc(&mut heap, 16);

  assert_eq!(handle, hole);
  assert_eq!(heap.usable_size(handle), Ok(24));

  let after: Vec<_> = heap.blocks().collect();
  assert_eq!(after[1], before[1]);
  assert_eq!(after[1].handle, fence);
  heap.check().unwrap();
}

#[test]
fn test_growth_merges_with_trailing_free_block() {
  let mut heap = Heap::new().unwrap();

  let head = alloc(&mut heap, 2000); // 2008-byte block
  let trailing = heap.blocks().last().unwrap();
  assert!(trailing.is_free);
  assert_eq!(trailing.size, 4096 - 2008);

  let size_before = heap.heap_size();
  let big = alloc(&mut heap, CHUNK_SIZE + 1);

  assert_eq!(big, trailing.handle);
  assert_eq!(heap.heap_size() - size_before, 4112);
  assert!(heap.usable_size(big).unwrap() > CHUNK_SIZE);
  assert_eq!(heap.usable_size(head), Ok(2000));
  heap.check().unwrap();
}

#[test]
fn test_growth_after_exhaustion() {
  let mut heap = Heap::new().unwrap();

  let all = alloc(&mut heap, CHUNK_SIZE - 8);
  assert!(heap.blocks().all(|b| !b.is_free));

  let big = alloc(&mut heap, CHUNK_SIZE + 1);

  assert!(big.offset() > all.offset());
  assert_eq!(heap.heap_size(), 16 + 4096 + 4112);
  heap.check().unwrap();
}

#[test]
fn test_freed_block_is_reused() {
  let mut heap = Heap::new().unwrap();

  let a = alloc(&mut heap, 100);
  let b = alloc(&mut heap, 200);
  heap.release(a).unwrap();
  let c = alloc(&mut heap, 90);

  assert_eq!(c, a);
  assert!(b > c);
  heap.check().unwrap();
}

#[test]
fn test_out_of_space() {
  let config = HeapConfig::builder().max_heap(16 + 4096).build();
  let mut heap = Heap::with_config(config).unwrap();

  let a = alloc(&mut heap, 4000);
  assert_eq!(heap.allocate(200), Err(AllocError::OutOfSpace { requested: 4096 }));

  // Failure does not disturb existing state.
  heap.check().unwrap();
  heap.release(a).unwrap();
  assert!(heap.allocate(200).unwrap().is_some());
}

#[test]
fn test_custom_region_and_chunk_size() {
  let config = HeapConfig::builder().chunk_size(100).build();
  let mut heap = Heap::init(VecRegion::new(1 << 16), config).unwrap();

  assert_eq!(heap.heap_size(), 16 + 104);

  let handles: Vec<_> = (0..10).map(|_| alloc(&mut heap, 40)).collect();
  assert!(heap.heap_size() > 16 + 104);

  for handle in handles {
    heap.release(handle).unwrap();
  }
  assert_eq!(heap.blocks().count(), 1);
  heap.check().unwrap();
}
