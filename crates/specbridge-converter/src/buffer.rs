//! Reusable output buffers.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Buffers kept for reuse; extras are dropped on return.
const MAX_POOLED: usize = 8;

/// A pool of byte buffers shared by concurrent conversions.
#[derive(Debug, Default)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a cleared buffer, allocating when the pool is empty.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self.buffers.lock().pop().unwrap_or_default();
        PooledBuffer { pool: self, buf }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.buffers.lock().len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < MAX_POOLED {
            buffers.push(buf);
        }
    }
}

/// A buffer on loan from a [`BufferPool`]; returned, cleared, on drop.
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    pool: &'p BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
