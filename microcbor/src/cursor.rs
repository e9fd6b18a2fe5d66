/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
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
 * Input cursor
 *
 * A bounded reader over the input byte slice. All decode operations go through the cursor,
 * which keeps the single invariant `position <= input.len()` in one place. Positions are
 * 32 bit so that two values above the maximum input size remain usable as sentinels.
 **************************************************************************************************/
use crate::constants::MAX_INPUT_SIZE;
use crate::error::{CBORError, Result};

use std::cmp::Ordering;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A read-only byte slice plus a position. The slice has lifetime `'buf`, which must be
/// longer than any borrow handed out of the cursor itself.
#[derive(Debug, Copy, Clone)]
pub struct InputCursor<'buf> {
    bytes: &'buf [u8],
    index: usize,
}

impl<'buf> InputCursor<'buf> {
    /// Construct a cursor over `input`. Fails with `InputTooLarge` when the input exceeds
    /// the 32 bit offset space.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(input: &'buf [u8]) -> Result<InputCursor<'buf>> {
        if input.len() > MAX_INPUT_SIZE {
            Err(CBORError::InputTooLarge)
        } else {
            Ok(InputCursor {
                bytes: input,
                index: 0,
            })
        }
    }

    /// The current position as a 32 bit offset.
    #[inline]
    pub fn tell(&self) -> u32 {
        self.index as u32
    }

    /// Reposition the cursor. Positions past the input are clamped to its end.
    #[inline]
    pub(crate) fn seek(&mut self, position: u32) {
        self.index = (position as usize).min(self.bytes.len());
    }

    /// Total input length.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Return `true` if the input is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of bytes not yet consumed.
    #[inline]
    pub fn bytes_available(&self) -> usize {
        self.bytes.len() - self.index
    }

    /// Return the next byte without advancing, or `HitEnd`.
    #[inline]
    pub fn peek_byte(&self) -> Result<u8> {
        if self.index < self.bytes.len() {
            Ok(self.bytes[self.index])
        } else {
            Err(CBORError::HitEnd)
        }
    }

    /// Return the next `n` bytes without advancing, or `HitEnd`.
    pub fn peek(&self, n: usize) -> Result<&'buf [u8]> {
        if self.bytes_available() >= n {
            Ok(&self.bytes[self.index..self.index + n])
        } else {
            Err(CBORError::HitEnd)
        }
    }

    /// Consume one byte.
    #[inline]
    pub fn consume_byte(&mut self) -> Result<u8> {
        let b = self.peek_byte()?;
        self.index += 1;
        Ok(b)
    }

    /// Consume `n` bytes, returning the slice over them. The returned slice borrows from
    /// the input, not from the cursor.
    pub fn consume(&mut self, n: usize) -> Result<&'buf [u8]> {
        if self.bytes_available() >= n {
            let s = &self.bytes[self.index..self.index + n];
            self.index += n;
            Ok(s)
        } else {
            Err(CBORError::HitEnd)
        }
    }

    /// The undecoded remainder of the input.
    #[inline]
    pub fn remainder(&self) -> &'buf [u8] {
        &self.bytes[self.index..]
    }

    /// A slice of the input by absolute offsets. Used to recover the encoded form of an
    /// already-consumed region, e.g. a map label for sort checking.
    pub(crate) fn region(&self, start: u32, len: u32) -> &'buf [u8] {
        &self.bytes[start as usize..(start + len) as usize]
    }

    /// Compare two regions of the input bytewise. A shorter region is smaller only after a
    /// fully equal prefix, which is exactly the ordering of bytewise lexicographic
    /// comparison over encoded forms.
    #[cfg_attr(feature = "trace", trace)]
    pub fn compare_regions(&self, s1: u32, l1: u32, s2: u32, l2: u32) -> Ordering {
        self.region(s1, l1).cmp(self.region(s2, l2))
    }
}
