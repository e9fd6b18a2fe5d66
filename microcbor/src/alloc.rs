/***************************************************************************************************
 * Copyright (c) 2021-2023 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice (including the next
 * paragraph) shall be included in all copies or substantial portions of the
 * Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * Indefinite-length string allocator
 *
 * The decoder has no allocator of its own. When an indefinite length string must be
 * concatenated (or every string copied, in allocate-all-strings mode), the bytes go
 * through this pluggable interface. One block is open at a time; only the most recent
 * block may grow, which is sufficient for chunk-by-chunk concatenation.
 **************************************************************************************************/
use crate::error::{CBORError, Result};

/// The memory policy for string concatenation. One block is open at a time:
/// `extend` grows it (the reallocate mode), `take` closes it and hands out the finished
/// slice (the allocate mode), `release` discards it (the free mode), and `destruct` tears
/// the allocator down when the decoder finishes.
pub trait StringAllocator<'pool> {
    /// Append `bytes` to the open block, opening one if none is open.
    fn extend(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the open block and return it. The slice stays valid for the pool lifetime.
    fn take(&mut self) -> Result<&'pool [u8]>;

    /// Discard the open block.
    fn release(&mut self);

    /// Tear down the allocator. Called once by the decoder's `finish`.
    fn destruct(&mut self) {}
}

/// A bump allocator over a caller-provided buffer.
///
/// Finished blocks are split off the front of the buffer and never reclaimed, so the pool
/// must be sized for the whole decode. Note in particular that a label search over a map
/// with indefinite length labels re-performs the concatenation on every search, so the
/// pool should be sized at least the input length plus a small overhead.
pub struct StringPool<'pool> {
    /// The unallocated tail of the pool. The open block occupies its first `open` bytes.
    free: Option<&'pool mut [u8]>,
    open: usize,
}

impl<'pool> StringPool<'pool> {
    /// Construct a pool over `buffer`.
    pub fn new(buffer: &'pool mut [u8]) -> StringPool<'pool> {
        StringPool {
            free: Some(buffer),
            open: 0,
        }
    }

    /// Bytes still available for allocation.
    pub fn room_left(&self) -> usize {
        match &self.free {
            Some(b) => b.len() - self.open,
            None => 0,
        }
    }
}

impl<'pool> StringAllocator<'pool> for StringPool<'pool> {
    fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        let buf = self.free.as_mut().ok_or(CBORError::PoolExhausted)?;
        if self.open + bytes.len() > buf.len() {
            return Err(CBORError::PoolExhausted);
        }
        buf[self.open..self.open + bytes.len()].copy_from_slice(bytes);
        self.open += bytes.len();
        Ok(())
    }

    fn take(&mut self) -> Result<&'pool [u8]> {
        let buf = self.free.take().ok_or(CBORError::PoolExhausted)?;
        let (block, rest) = buf.split_at_mut(self.open);
        self.free = Some(rest);
        self.open = 0;
        Ok(block)
    }

    fn release(&mut self) {
        self.open = 0;
    }

    fn destruct(&mut self) {
        self.free = None;
        self.open = 0;
    }
}
