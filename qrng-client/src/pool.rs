//! FIFO byte pool for over-fetched entropy
//!
//! Network backends fetch in fixed chunks while callers ask for arbitrary
//! sizes. The pool keeps the surplus of one fetch for the next read. Bytes
//! leave the pool exactly once.

use bytes::{Buf, Bytes};
use std::collections::VecDeque;

/// Bounded FIFO of byte chunks
///
/// # Design
///
/// - Stores data as reference-counted `Bytes` chunks, no copying on push
/// - Evicts the oldest chunks when a push would exceed capacity
/// - Drains into caller buffers, writing only the bytes it hands out
#[derive(Debug)]
pub struct BytePool {
    chunks: VecDeque<Bytes>,
    max_size: usize,
    current_size: usize,
    stats: PoolStats,
}

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub total_pushes: u64,
    pub bytes_pushed: u64,
    pub bytes_drained: u64,
    pub evictions_overflow: u64,
}

impl BytePool {
    /// Create a new pool with specified capacity
    pub fn new(max_size: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            max_size,
            current_size: 0,
            stats: PoolStats::default(),
        }
    }

    /// Push data into the pool, evicting the oldest chunks on overflow
    ///
    /// Data larger than the whole pool keeps only its newest `capacity` bytes.
    pub fn push(&mut self, data: impl Into<Bytes>) {
        let mut data = data.into();
        if data.is_empty() {
            return;
        }

        if data.len() > self.max_size {
            data.advance(data.len() - self.max_size);
        }

        while self.current_size + data.len() > self.max_size {
            match self.chunks.pop_front() {
                Some(evicted) => {
                    self.current_size -= evicted.len();
                    self.stats.evictions_overflow += 1;
                }
                None => break,
            }
        }

        self.current_size += data.len();
        self.stats.total_pushes += 1;
        self.stats.bytes_pushed += data.len() as u64;
        self.chunks.push_back(data);
    }

    /// Move up to `dst.len()` bytes into the front of `dst`
    ///
    /// Returns the number of bytes written; `dst` beyond that is untouched.
    pub fn drain_into(&mut self, dst: &mut [u8]) -> usize {
        let mut written = 0;

        while written < dst.len() {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };

            let take = front.len().min(dst.len() - written);
            dst[written..written + take].copy_from_slice(&front[..take]);
            front.advance(take);
            written += take;

            if front.is_empty() {
                self.chunks.pop_front();
            }
        }

        self.current_size -= written;
        self.stats.bytes_drained += written as u64;
        written
    }

    /// Bytes currently held
    pub fn len(&self) -> usize {
        self.current_size
    }

    pub fn is_empty(&self) -> bool {
        self.current_size == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Clear all data from the pool
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.current_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_drain() {
        let mut pool = BytePool::new(1024);
        pool.push(vec![1, 2, 3, 4]);
        pool.push(vec![5, 6]);
        assert_eq!(pool.len(), 6);

        let mut out = [0u8; 5];
        assert_eq!(pool.drain_into(&mut out), 5);
        assert_eq!(out, [1, 2, 3, 4, 5]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_drain_leaves_tail_untouched() {
        let mut pool = BytePool::new(16);
        pool.push(vec![9, 9]);

        let mut out = [0xAAu8; 4];
        assert_eq!(pool.drain_into(&mut out), 2);
        assert_eq!(out, [9, 9, 0xAA, 0xAA]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_overflow_eviction() {
        let mut pool = BytePool::new(10);
        pool.push(vec![1; 8]);
        pool.push(vec![2; 8]);
        assert_eq!(pool.len(), 8);
        assert_eq!(pool.stats().evictions_overflow, 1);

        let mut out = [0u8; 8];
        pool.drain_into(&mut out);
        assert_eq!(out, [2; 8]);
    }

    #[test]
    fn test_oversized_push_keeps_newest() {
        let mut pool = BytePool::new(4);
        pool.push(vec![1, 2, 3, 4, 5, 6]);
        let mut out = [0u8; 4];
        assert_eq!(pool.drain_into(&mut out), 4);
        assert_eq!(out, [3, 4, 5, 6]);
    }
}
