/***************************************************************************************************
 * Copyright (c) 2021 Jeremy O'Donoghue. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all copies or
 * substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * Output sink
 *
 * A bounded writer over a caller-provided byte buffer. Supports in-place insertion (for
 * wrapping a late-computed length header around already-emitted bytes) and an optional
 * streaming flush target. All operations are no-ops after the first error; the caller
 * drains the sticky error when retrieving the output.
 **************************************************************************************************/
use crate::error::{CBORError, Result};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Initialization guard. A sink whose magic does not equal this constant was never
/// initialized (or was trampled) and reports `BadState` on every operation.
const SINK_MAGIC: u32 = 0x0b0f_f0b0;

/// A streaming flush target. When attached, the sink drains its valid bytes to the target
/// on `flush` and whenever `append` runs out of room. Arbitrary-position insertion is
/// forbidden in streaming mode.
pub trait FlushSink {
    /// Write `bytes` to the target. A non-success return surfaces as `FlushWrite`.
    fn flush(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A mutable byte buffer plus a `valid` watermark.
pub struct OutputSink<'buf> {
    bytes: &'buf mut [u8],
    valid: usize,
    magic: u32,
    err: Option<CBORError>,
    flush_to: Option<&'buf mut dyn FlushSink>,
}

impl<'buf> OutputSink<'buf> {
    /// Construct a sink over `buffer`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(buffer: &'buf mut [u8]) -> OutputSink<'buf> {
        OutputSink {
            bytes: buffer,
            valid: 0,
            magic: SINK_MAGIC,
            err: None,
            flush_to: None,
        }
    }

    /// Construct a streaming sink: `buffer` is a staging area drained to `target` whenever
    /// it fills up and at `flush`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new_streaming(
        buffer: &'buf mut [u8],
        target: &'buf mut dyn FlushSink,
    ) -> OutputSink<'buf> {
        OutputSink {
            bytes: buffer,
            valid: 0,
            magic: SINK_MAGIC,
            err: None,
            flush_to: Some(target),
        }
    }

    /// Verify the guard and the sticky error.
    #[inline]
    fn check(&self) -> Result<()> {
        if self.magic != SINK_MAGIC {
            return Err(CBORError::BadState);
        }
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[inline]
    fn fail(&mut self, e: CBORError) -> CBORError {
        if self.err.is_none() {
            self.err = Some(e);
        }
        e
    }

    /// The number of valid bytes emitted so far.
    #[inline]
    pub fn tell(&self) -> usize {
        self.valid
    }

    /// Bytes of capacity not yet used.
    #[inline]
    pub fn room_left(&self) -> usize {
        self.bytes.len() - self.valid
    }

    /// Return `true` if `n` further bytes fit without a flush.
    #[inline]
    pub fn will_fit(&self, n: usize) -> bool {
        n <= self.room_left()
    }

    /// Return `true` if the sink is in streaming mode.
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.flush_to.is_some()
    }

    /// The sticky error, if any.
    #[inline]
    pub fn status(&self) -> Option<CBORError> {
        self.err
    }

    /// Forget all emitted bytes and clear the error.
    pub fn reset(&mut self) {
        self.valid = 0;
        self.err = None;
    }

    /// Copy `src` at the end of the valid bytes and advance the watermark. In streaming
    /// mode a full buffer is drained to the flush target first.
    #[cfg_attr(feature = "trace", trace)]
    pub fn append(&mut self, src: &[u8]) -> Result<()> {
        self.check()?;
        if !self.will_fit(src.len()) {
            if self.flush_to.is_some() {
                self.flush()?;
            }
            if !self.will_fit(src.len()) {
                return Err(self.fail(CBORError::BufferTooSmall));
            }
        }
        self.bytes[self.valid..self.valid + src.len()].copy_from_slice(src);
        self.valid += src.len();
        Ok(())
    }

    /// Append a single byte.
    #[inline]
    pub fn append_byte(&mut self, b: u8) -> Result<()> {
        self.append(&[b])
    }

    /// Shift the tail right and copy `src` in at `offset`. Fails with `InsertPoint` when
    /// `offset` is past the watermark, and with `Streaming` in streaming mode (bytes below
    /// the watermark may already have been drained).
    #[cfg_attr(feature = "trace", trace)]
    pub fn insert_at(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        self.check()?;
        if self.flush_to.is_some() {
            return Err(self.fail(CBORError::Streaming));
        }
        if offset > self.valid {
            return Err(self.fail(CBORError::InsertPoint));
        }
        if !self.will_fit(src.len()) {
            return Err(self.fail(CBORError::BufferTooSmall));
        }
        self.bytes.copy_within(offset..self.valid, offset + src.len());
        self.bytes[offset..offset + src.len()].copy_from_slice(src);
        self.valid += src.len();
        Ok(())
    }

    /// Advance the watermark by `n` without writing, reserving a slot that will be
    /// overwritten later.
    #[cfg_attr(feature = "trace", trace)]
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.check()?;
        if !self.will_fit(n) {
            return Err(self.fail(CBORError::BufferTooSmall));
        }
        self.valid += n;
        Ok(())
    }

    /// Overwrite already-valid bytes in place.
    pub(crate) fn overwrite_at(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        self.check()?;
        if offset + src.len() > self.valid {
            return Err(self.fail(CBORError::InsertPoint));
        }
        self.bytes[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Exchange the regions `[start, pivot)` and `[pivot, end)` in place by three
    /// reversals. Used to move a late-computed length header in front of already-emitted
    /// content with constant auxiliary storage.
    #[cfg_attr(feature = "trace", trace)]
    pub fn swap(&mut self, start: usize, pivot: usize, end: usize) -> Result<()> {
        self.check()?;
        if self.flush_to.is_some() {
            return Err(self.fail(CBORError::Streaming));
        }
        if !(start <= pivot && pivot <= end && end <= self.valid) {
            return Err(self.fail(CBORError::InsertPoint));
        }
        self.bytes[start..pivot].reverse();
        self.bytes[pivot..end].reverse();
        self.bytes[start..end].reverse();
        Ok(())
    }

    /// Compare two regions of the valid bytes. Returns a negative value if the first is
    /// smaller, positive if greater, zero if equal; a shorter region is smaller only after
    /// a fully equal prefix.
    pub fn compare_regions(&self, s1: usize, l1: usize, s2: usize, l2: usize) -> i32 {
        use std::cmp::Ordering;
        match self.bytes[s1..s1 + l1].cmp(&self.bytes[s2..s2 + l2]) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// A view of already-emitted bytes by offset range.
    pub(crate) fn view(&self, start: usize, end: usize) -> Result<&[u8]> {
        if start <= end && end <= self.valid {
            Ok(&self.bytes[start..end])
        } else {
            Err(CBORError::InsertPoint)
        }
    }

    /// Drain the valid bytes to the streaming flush target. Fails with `NotStreaming` when
    /// no target is attached.
    #[cfg_attr(feature = "trace", trace)]
    pub fn flush(&mut self) -> Result<()> {
        self.check()?;
        match self.flush_to.as_mut() {
            Some(target) => {
                if target.flush(&self.bytes[..self.valid]).is_err() {
                    return Err(self.fail(CBORError::FlushWrite));
                }
                self.valid = 0;
                Ok(())
            }
            None => Err(self.fail(CBORError::NotStreaming)),
        }
    }

    /// Borrow the emitted bytes. Fails if the sink holds a sticky error.
    pub fn get_output(&self) -> Result<&[u8]> {
        self.check()?;
        Ok(&self.bytes[..self.valid])
    }

    /// Consume the sink, returning the emitted bytes with the buffer's own lifetime.
    pub fn into_output(self) -> Result<&'buf [u8]> {
        self.check()?;
        Ok(&self.bytes[..self.valid])
    }
}
