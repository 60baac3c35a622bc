//! Heap configuration.
//!
//! Values can be set programmatically or loaded from environment variables.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TAGALLOC_CHUNK_SIZE` | Bytes to grow the region by when no free block fits | 4096 |
//! | `TAGALLOC_MAX_HEAP` | Upper bound on the region size in bytes | 20971520 (20MB) |
//!
//! # Example
//!
//! ```rust
//! use tagalloc::HeapConfig;
//!
//! let config = HeapConfig::builder()
//!   .chunk_size(8192)
//!   .max_heap(1 << 20)
//!   .build();
//!
//! assert_eq!(config.chunk_size, 8192);
//! ```

use std::env;

use log::warn;

use crate::align;
use crate::tag::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};

/// Default growth step, in bytes.
pub const CHUNK_SIZE: usize = 1 << 12;

/// Default upper bound on the region size, in bytes.
pub const MAX_HEAP: usize = 20 * (1 << 20);

/// Tunables for a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Minimum number of bytes requested from the region per growth event.
  pub chunk_size: usize,
  /// Maximum size of the backing region. Used by the convenience
  /// constructors; custom regions enforce their own limit.
  pub max_heap: usize,
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      chunk_size: CHUNK_SIZE,
      max_heap: MAX_HEAP,
    }
  }
}

impl HeapConfig {
  pub fn builder() -> HeapConfigBuilder {
    HeapConfigBuilder::default()
  }

  /// Loads configuration from `TAGALLOC_*` variables, falling back to the
  /// defaults for anything unset or unparsable.
  pub fn from_env() -> Self {
    let mut builder = Self::builder();

    if let Some(chunk_size) = parse_env("TAGALLOC_CHUNK_SIZE") {
      builder = builder.chunk_size(chunk_size);
    }
    if let Some(max_heap) = parse_env("TAGALLOC_MAX_HEAP") {
      builder = builder.max_heap(max_heap);
    }

    builder.build()
  }

  /// Growth step rounded to the heap alignment and never below one block.
  pub(crate) fn growth_step(&self) -> usize {
    align!(self.chunk_size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE))
  }
}

fn parse_env(key: &str) -> Option<usize> {
  parse_bytes(key, &env::var(key).ok()?)
}

fn parse_bytes(
  key: &str,
  raw: &str,
) -> Option<usize> {
  match raw.trim().parse() {
    Ok(value) => Some(value),
    Err(_) => {
      warn!("ignoring {key}={raw:?}: not a byte count");
      None
    }
  }
}

/// Builder for [`HeapConfig`].
#[derive(Debug, Clone, Default)]
pub struct HeapConfigBuilder {
  config: HeapConfig,
}

impl HeapConfigBuilder {
  pub fn chunk_size(
    mut self,
    bytes: usize,
  ) -> Self {
    self.config.chunk_size = bytes;
    self
  }

  pub fn max_heap(
    mut self,
    bytes: usize,
  ) -> Self {
    self.config.max_heap = bytes;
    self
  }

  pub fn build(self) -> HeapConfig {
    self.config
  }
}
