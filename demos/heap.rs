use std::error::Error;

use tagalloc::{Handle, Heap, HeapConfig, Region};

/// Prints a handle's offset, usable size and absolute address.
fn print_alloc<R: Region>(
  heap: &Heap<R>,
  label: &str,
  handle: Handle,
) -> Result<(), Box<dyn Error>> {
  println!(
    "[{}] offset = {:#x}, usable = {} bytes, address = {:?}",
    label,
    handle.offset(),
    heap.usable_size(handle)?,
    heap.as_ptr(handle),
  );
  Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
  let config = HeapConfig::from_env();
  let mut heap = Heap::with_config(config)?;

  println!("{heap:?}");

  // --------------------------------------------------------------------
  // 1) Two allocations carve the first chunk from the front.
  // --------------------------------------------------------------------
  let a = heap.allocate(100)?.ok_or("zero-sized allocation")?;
  let b = heap.allocate(200)?.ok_or("zero-sized allocation")?;
  println!("\n[1] Allocate 100 and 200 bytes");
  print_alloc(&heap, "a", a)?;
  print_alloc(&heap, "b", b)?;

  // --------------------------------------------------------------------
  // 2) Releasing `a` leaves a hole before `b`; first fit reuses it.
  // --------------------------------------------------------------------
  heap.release(a)?;
  let c = heap.allocate(90)?.ok_or("zero-sized allocation")?;
  println!("\n[2] Release a, allocate 90 bytes");
  print_alloc(&heap, "c", c)?;
  println!("[2] c == a? {}", if c == a { "Yes, it reused the freed block" } else { "No" });

  // --------------------------------------------------------------------
  // 3) Resizing keeps the payload prefix.
  // --------------------------------------------------------------------
  heap.payload_mut(c)?[..5].copy_from_slice(b"hello");
  let c = heap.resize(Some(c), 1000)?.ok_or("zero-sized allocation")?;
  println!("\n[3] Resize c to 1000 bytes");
  print_alloc(&heap, "c", c)?;
  println!("[3] prefix = {:?}", String::from_utf8_lossy(&heap.payload(c)?[..5]));

  // --------------------------------------------------------------------
  // 4) A request larger than the free space grows the region.
  // --------------------------------------------------------------------
  let before = heap.heap_size();
  let big = heap.allocate(64 * 1024)?.ok_or("zero-sized allocation")?;
  println!("\n[4] Allocate 64 KiB");
  print_alloc(&heap, "big", big)?;
  println!("[4] heap size {} -> {}", before, heap.heap_size());

  // --------------------------------------------------------------------
  // 5) Releasing everything coalesces back into one free block.
  // --------------------------------------------------------------------
  for handle in [b, c, big] {
    heap.release(handle)?;
  }
  heap.check()?;
  println!("\n[5] Released everything\n{heap:?}");

  Ok(())
}
