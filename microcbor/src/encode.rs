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
 * CBOR Encoder
 *
 * Emits definite length CBOR using preferred serialization by default. Maps, arrays and
 * byte-string wrapping open with a one byte placeholder head; on close the content length
 * is known, the minimal head is chosen, and a grown head is rotated in front of the
 * already-emitted content through the sink's three-reversal swap. The sink is never
 * re-copied end to end.
 **************************************************************************************************/
use crate::constants::*;
use crate::error::{CBORError, Result};
use crate::number::{encode_head, reduce_double, reduce_single, ReducedFloat, MAX_HEAD_LEN};
use crate::sink::{FlushSink, OutputSink};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

#[derive(Debug, Copy, Clone, PartialEq)]
enum EncFrameKind {
    Array,
    Map,
    BstrWrap,
}

/// One open container: its kind, the offset of its placeholder head byte, and the number
/// of items emitted inside it so far.
#[derive(Debug, Copy, Clone)]
struct EncFrame {
    kind: EncFrameKind,
    head: usize,
    items: u32,
}

const FRAME_NONE: EncFrame = EncFrame {
    kind: EncFrameKind::Array,
    head: 0,
    items: 0,
};

/// The encoder context. Create with [`Encoder::new`], emit items, close every opened
/// container, and take the encoded bytes with [`Encoder::finish`]. The context holds one
/// sticky error; after a failure every operation is a no-op returning it, so a linear
/// emit sequence need only check at `finish`.
pub struct Encoder<'buf> {
    sink: OutputSink<'buf>,
    frames: [EncFrame; MAX_NEST],
    depth: usize,
    err: Option<CBORError>,
}

impl<'buf> Encoder<'buf> {
    /// Construct an encoder over `buffer`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(buffer: &'buf mut [u8]) -> Encoder<'buf> {
        Encoder::from_sink(OutputSink::new(buffer))
    }

    /// Construct a streaming encoder: `buffer` stages bytes drained to `target`. Nested
    /// containers are unavailable in this mode, since closing one revisits bytes that may
    /// already have been drained.
    pub fn new_streaming(
        buffer: &'buf mut [u8],
        target: &'buf mut dyn FlushSink,
    ) -> Encoder<'buf> {
        Encoder::from_sink(OutputSink::new_streaming(buffer, target))
    }

    /// Construct an encoder over an existing sink.
    pub fn from_sink(sink: OutputSink<'buf>) -> Encoder<'buf> {
        Encoder {
            sink,
            frames: [FRAME_NONE; MAX_NEST],
            depth: 0,
            err: None,
        }
    }

    /// Offset of the next byte to be emitted.
    #[inline]
    pub fn tell(&self) -> usize {
        self.sink.tell()
    }

    /// A view of already-emitted bytes. Used by protocols that need the exact encoded
    /// form of an earlier region, e.g. to sign it.
    pub fn bytes_between(&self, start: usize, end: usize) -> Result<&[u8]> {
        self.sink.view(start, end)
    }

    /// The sticky error, if any.
    #[inline]
    pub fn status(&self) -> Option<CBORError> {
        self.err
    }

    /***********************************************************************************************
     * Scalar emits
     **********************************************************************************************/

    /// Emit an unsigned integer with the shortest head.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_u64(&mut self, v: u64) -> Result<()> {
        self.item_head(MT_UINT, v)
    }

    /// Emit a signed integer with the shortest head.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_i64(&mut self, v: i64) -> Result<()> {
        if v < 0 {
            self.item_head(MT_NINT, (-1 - v) as u64)
        } else {
            self.item_head(MT_UINT, v as u64)
        }
    }

    /// Emit the negative integer -1 - `n`. Covers the 65 bit negative range below
    /// i64::MIN.
    pub fn add_negative_u64(&mut self, n: u64) -> Result<()> {
        self.item_head(MT_NINT, n)
    }

    /// Emit a byte string.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.item_head(MT_BSTR, bytes.len() as u64)?;
        let r = self.sink.append(bytes);
        self.seal(r)
    }

    /// Emit a text string.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_text(&mut self, text: &str) -> Result<()> {
        self.item_head(MT_TSTR, text.len() as u64)?;
        let r = self.sink.append(text.as_bytes());
        self.seal(r)
    }

    /// Emit `true` or `false`.
    pub fn add_bool(&mut self, v: bool) -> Result<()> {
        let simple = if v { SIMPLE_TRUE } else { SIMPLE_FALSE };
        self.item_head(MT_SIMPLE, simple as u64)
    }

    /// Emit `null`.
    pub fn add_null(&mut self) -> Result<()> {
        self.item_head(MT_SIMPLE, SIMPLE_NULL as u64)
    }

    /// Emit `undefined`.
    pub fn add_undefined(&mut self) -> Result<()> {
        self.item_head(MT_SIMPLE, SIMPLE_UNDEFINED as u64)
    }

    /// Emit a simple value outside 20..=31 (use the dedicated operations for booleans,
    /// null and undefined; 24..=31 are reserved by RFC 8949).
    pub fn add_simple(&mut self, v: u8) -> Result<()> {
        if (20..=31).contains(&v) {
            return Err(self.fail(CBORError::Unsupported));
        }
        self.item_head(MT_SIMPLE, v as u64)
    }

    /// Emit a double using preferred serialization: half precision if and only if the
    /// round trip is exact, else single precision if exact, else the full double. NaN
    /// payloads are preserved where the narrower significand can hold them.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_f64(&mut self, v: f64) -> Result<()> {
        match reduce_double(v) {
            ReducedFloat::Half(bits) => self.float_item(&bits.to_be_bytes(), PAYLOAD_TWO_BYTES),
            ReducedFloat::Single(s) => self.float_item(&s.to_bits().to_be_bytes(), PAYLOAD_FOUR_BYTES),
            ReducedFloat::Double(d) => self.float_item(&d.to_bits().to_be_bytes(), PAYLOAD_EIGHT_BYTES),
        }
    }

    /// Emit a single, reduced to half precision when exact.
    pub fn add_f32(&mut self, v: f32) -> Result<()> {
        match reduce_single(v) {
            ReducedFloat::Half(bits) => self.float_item(&bits.to_be_bytes(), PAYLOAD_TWO_BYTES),
            _ => self.float_item(&v.to_bits().to_be_bytes(), PAYLOAD_FOUR_BYTES),
        }
    }

    /// Emit a double without reduction. For protocols that fix the width.
    pub fn add_f64_no_reduce(&mut self, v: f64) -> Result<()> {
        self.float_item(&v.to_bits().to_be_bytes(), PAYLOAD_EIGHT_BYTES)
    }

    /// Emit a single without reduction.
    pub fn add_f32_no_reduce(&mut self, v: f32) -> Result<()> {
        self.float_item(&v.to_bits().to_be_bytes(), PAYLOAD_FOUR_BYTES)
    }

    /// Emit raw half precision bits.
    pub fn add_f16_bits(&mut self, bits: u16) -> Result<()> {
        self.float_item(&bits.to_be_bytes(), PAYLOAD_TWO_BYTES)
    }

    /// Tag the next item. With no following item the encoding is malformed, which
    /// `finish` cannot detect; the caller owns that pairing.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_tag(&mut self, tag: u64) -> Result<()> {
        self.head_only(MT_TAG, tag)
    }

    /// Emit one already-encoded CBOR item verbatim.
    pub fn add_encoded(&mut self, cbor: &[u8]) -> Result<()> {
        self.note_item()?;
        let r = self.sink.append(cbor);
        self.seal(r)
    }

    /***********************************************************************************************
     * Containers
     **********************************************************************************************/

    /// Open an array. Must be matched by `close_array`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn open_array(&mut self) -> Result<()> {
        self.open(EncFrameKind::Array)
    }

    /// Close the innermost open array.
    #[cfg_attr(feature = "trace", trace)]
    pub fn close_array(&mut self) -> Result<()> {
        self.close(EncFrameKind::Array)
    }

    /// Open a map. Items inside are alternating labels and values; `close_map` fails on
    /// an odd count.
    #[cfg_attr(feature = "trace", trace)]
    pub fn open_map(&mut self) -> Result<()> {
        self.open(EncFrameKind::Map)
    }

    /// Close the innermost open map.
    #[cfg_attr(feature = "trace", trace)]
    pub fn close_map(&mut self) -> Result<()> {
        self.close(EncFrameKind::Map)
    }

    /// Open a byte string whose content is the subsequent emits; its byte length is
    /// patched in at close. Emit `add_tag(24)` first to mark wrapped CBOR.
    #[cfg_attr(feature = "trace", trace)]
    pub fn open_bstr_wrap(&mut self) -> Result<()> {
        self.open(EncFrameKind::BstrWrap)
    }

    /// Close the innermost byte-string wrap.
    #[cfg_attr(feature = "trace", trace)]
    pub fn close_bstr_wrap(&mut self) -> Result<()> {
        self.close(EncFrameKind::BstrWrap)
    }

    /// Finish encoding: every opened container must be closed and no error pending. In
    /// streaming mode the staged bytes are drained first and the returned slice is empty.
    #[cfg_attr(feature = "trace", trace)]
    pub fn finish(mut self) -> Result<&'buf [u8]> {
        if let Some(e) = self.err {
            return Err(e);
        }
        if self.depth != 0 {
            return Err(CBORError::ArrayOrMapStillOpen);
        }
        if self.sink.is_streaming() {
            self.sink.flush()?;
        }
        self.sink.into_output()
    }

    /***********************************************************************************************
     * Internals
     **********************************************************************************************/

    #[inline]
    fn fail(&mut self, e: CBORError) -> CBORError {
        if self.err.is_none() {
            self.err = Some(e);
        }
        e
    }

    fn seal<T>(&mut self, r: core::result::Result<T, CBORError>) -> Result<T> {
        match r {
            Ok(v) => Ok(v),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Count one item in the enclosing open container.
    fn note_item(&mut self) -> Result<()> {
        if let Some(e) = self.err {
            return Err(e);
        }
        if self.depth > 0 {
            self.frames[self.depth - 1].items += 1;
        }
        Ok(())
    }

    /// Emit the head of a complete scalar item.
    fn item_head(&mut self, mt: u8, arg: u64) -> Result<()> {
        self.note_item()?;
        let mut tmp = [0u8; MAX_HEAD_LEN];
        let n = encode_head(mt, arg, &mut tmp);
        let r = self.sink.append(&tmp[..n]);
        self.seal(r)
    }

    /// Emit a head that does not count as an item (tag numbers).
    fn head_only(&mut self, mt: u8, arg: u64) -> Result<()> {
        if let Some(e) = self.err {
            return Err(e);
        }
        let mut tmp = [0u8; MAX_HEAD_LEN];
        let n = encode_head(mt, arg, &mut tmp);
        let r = self.sink.append(&tmp[..n]);
        self.seal(r)
    }

    fn float_item(&mut self, be_bits: &[u8], ai: u8) -> Result<()> {
        self.note_item()?;
        let r = self.sink.append(&[MT_FLOAT | ai]);
        self.seal(r)?;
        let r = self.sink.append(be_bits);
        self.seal(r)
    }

    fn open(&mut self, kind: EncFrameKind) -> Result<()> {
        self.note_item()?;
        if self.sink.is_streaming() {
            return Err(self.fail(CBORError::Streaming));
        }
        if self.depth == MAX_NEST {
            return Err(self.fail(CBORError::ArrayOrMapNestingTooDeep));
        }
        self.frames[self.depth] = EncFrame {
            kind,
            head: self.sink.tell(),
            items: 0,
        };
        self.depth += 1;
        let r = self.sink.append(&[0]);
        self.seal(r)
    }

    fn close(&mut self, kind: EncFrameKind) -> Result<()> {
        if let Some(e) = self.err {
            return Err(e);
        }
        if self.depth == 0 {
            return Err(self.fail(CBORError::TooManyCloses));
        }
        let frame = self.frames[self.depth - 1];
        if frame.kind != kind {
            return Err(self.fail(CBORError::ArrayOrMapStillOpen));
        }
        let arg = match kind {
            EncFrameKind::Array => frame.items as u64,
            EncFrameKind::Map => {
                if frame.items % 2 != 0 {
                    return Err(self.fail(CBORError::OddMapItems));
                }
                (frame.items / 2) as u64
            }
            EncFrameKind::BstrWrap => (self.sink.tell() - frame.head - 1) as u64,
        };
        if kind != EncFrameKind::BstrWrap && arg > MAX_CONTAINER_ITEMS {
            return Err(self.fail(CBORError::ArrayDecodeTooLong));
        }
        let mt = match kind {
            EncFrameKind::Array => MT_ARRAY,
            EncFrameKind::Map => MT_MAP,
            EncFrameKind::BstrWrap => MT_BSTR,
        };
        let mut tmp = [0u8; MAX_HEAD_LEN];
        let n = encode_head(mt, arg, &mut tmp);
        let r = self.sink.overwrite_at(frame.head, &tmp[..1]);
        self.seal(r)?;
        if n > 1 {
            // The head grew past its placeholder: append the argument bytes and rotate
            // them in front of the content
            let end = self.sink.tell();
            let r = self.sink.append(&tmp[1..n]);
            self.seal(r)?;
            let r = self.sink.swap(frame.head + 1, end, end + (n - 1));
            self.seal(r)?;
        }
        self.depth -= 1;
        Ok(())
    }
}
