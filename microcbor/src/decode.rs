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
 * CBOR Decoder
 *
 * Stateful pre-order traversal of a CBOR input producing typed items. Handles definite and
 * indefinite lengths, tag numbers, breaks and nesting with a fixed-depth frame stack; no
 * heap allocation. The context holds one sticky error: once set, every decode operation is
 * a no-op returning it, so a linear call sequence need only check the error at `finish`.
 **************************************************************************************************/
use crate::alloc::StringAllocator;
use crate::constants::{opts, *};
use crate::cursor::InputCursor;
use crate::error::{CBORError, Result};
use crate::item::{Item, Label, Mantissa, TagSet, Value};
use crate::number::{
    argument_is_preferred, argument_size, double_is_whole, half_to_double, reduce_double,
    reduce_single, ReducedFloat,
};
use crate::tagnumber::{builtin_tag_content, TagContentFn, TagHandler};

use std::cmp::Ordering;
use std::convert::TryInto;
use std::str::from_utf8;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Count sentinel for indefinite length frames
pub(crate) const INDEF: u32 = u32::MAX;
/// End offset sentinel: not yet determined
pub(crate) const END_UNKNOWN: u32 = u32::MAX;
/// No previous label recorded (sorted-map checking)
const PREV_NONE: (u32, u32) = (u32::MAX, 0);

/***************************************************************************************************
 * Nesting frame stack
 **************************************************************************************************/

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum FrameKind {
    /// The input itself (a CBOR sequence at the top level)
    Top,
    Array,
    Map,
    BoundedArray,
    BoundedMap,
    BoundedBstr,
}

impl FrameKind {
    #[inline]
    pub(crate) fn is_map(self) -> bool {
        matches!(self, FrameKind::Map | FrameKind::BoundedMap)
    }

    #[inline]
    pub(crate) fn is_bounded(self) -> bool {
        matches!(
            self,
            FrameKind::BoundedArray | FrameKind::BoundedMap | FrameKind::BoundedBstr
        )
    }

    #[inline]
    fn counts_toward_array_map_limit(self) -> bool {
        !matches!(self, FrameKind::Top | FrameKind::BoundedBstr)
    }
}

/// One open container. `count`/`remaining` are direct child items (two per map pair);
/// `start` is the offset of the first contained byte; `end` is the offset just past the
/// container once determined. `resume` is only used by byte-string wrapping: the position
/// at which decoding continues after exit.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Frame {
    pub(crate) kind: FrameKind,
    pub(crate) count: u32,
    pub(crate) remaining: u32,
    pub(crate) start: u32,
    pub(crate) end: u32,
    pub(crate) resume: u32,
    pub(crate) label_next: bool,
    prev_label: (u32, u32),
}

impl Frame {
    fn top() -> Frame {
        Frame {
            kind: FrameKind::Top,
            count: INDEF,
            remaining: INDEF,
            start: 0,
            end: END_UNKNOWN,
            resume: 0,
            label_next: false,
            prev_label: PREV_NONE,
        }
    }
}

/// The fixed-depth frame stack. `frames[0]` is the top level; `depth` indexes the current
/// innermost frame.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Nesting {
    pub(crate) frames: [Frame; MAX_NEST + 1],
    pub(crate) depth: usize,
}

impl Nesting {
    pub(crate) fn new() -> Nesting {
        Nesting {
            frames: [Frame::top(); MAX_NEST + 1],
            depth: 0,
        }
    }

    #[inline]
    pub(crate) fn top(&self) -> &Frame {
        &self.frames[self.depth]
    }

    #[inline]
    pub(crate) fn top_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.depth]
    }

    pub(crate) fn push(&mut self, kind: FrameKind, count: u32, start: u32) -> Result<()> {
        if self.depth + 1 > MAX_NEST {
            return Err(CBORError::ArrayOrMapNestingTooDeep);
        }
        if kind.counts_toward_array_map_limit() {
            let open = self.frames[1..=self.depth]
                .iter()
                .filter(|f| f.kind.counts_toward_array_map_limit())
                .count();
            if open + 1 > MAX_NEST_ARRAY_MAP {
                return Err(CBORError::ArrayOrMapNestingTooDeep);
            }
        }
        self.depth += 1;
        self.frames[self.depth] = Frame {
            kind,
            count,
            remaining: count,
            start,
            end: END_UNKNOWN,
            resume: 0,
            label_next: true,
            prev_label: PREV_NONE,
        };
        Ok(())
    }

    #[inline]
    fn pop(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    /// Index of the most recently entered bounded frame, if any.
    pub(crate) fn innermost_bounded(&self) -> Option<usize> {
        (1..=self.depth).rev().find(|i| self.frames[*i].kind.is_bounded())
    }
}

/// Traversal descent modes used by the bounded-navigation layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Descend {
    No,
    Array,
    Map,
}

/// Saved traversal state for `peek` and label search.
pub(crate) struct SavedState {
    position: u32,
    nesting: Nesting,
    last_err: Option<CBORError>,
    mapped_used: usize,
    val_off: u32,
    val_rem: u32,
}

/***************************************************************************************************
 * Decoder context
 **************************************************************************************************/

/// The decoder context. Create with [`Decoder::new`] (or [`Decoder::with_allocator`] when
/// indefinite length strings must be handled), call [`Decoder::next`] and the bounded
/// navigation operations, and drain the sticky error with [`Decoder::finish`].
///
/// Items borrow from the input (or the allocator pool) and stay valid as long as those do;
/// the context itself may be dropped.
pub struct Decoder<'buf> {
    pub(crate) cursor: InputCursor<'buf>,
    pub(crate) opts: u32,
    pub(crate) nesting: Nesting,
    pub(crate) last_err: Option<CBORError>,
    mapped_tags: [u64; MAX_MAPPED_TAGS],
    mapped_used: usize,
    handlers: Option<&'buf [TagHandler]>,
    alloc: Option<&'buf mut (dyn StringAllocator<'buf> + 'buf)>,
    /// Offset of the head of the most recent data item (past its map label)
    pub(crate) val_off: u32,
    /// `remaining` of the containing frame when that head was reached
    pub(crate) val_rem: u32,
    /// Input range of the most recent definite string value
    pub(crate) last_string: (u32, u32),
}

impl<'buf> Decoder<'buf> {
    /// Construct a decoder over `input` with the given option flags (see
    /// [`crate::constants::opts`]). An oversized input is recorded as the sticky error
    /// rather than failing construction.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(input: &'buf [u8], options: u32) -> Decoder<'buf> {
        let (cursor, last_err) = match InputCursor::new(input) {
            Ok(c) => (c, None),
            Err(e) => (InputCursor::new(&[]).unwrap_or_else(|_| unreachable!()), Some(e)),
        };
        Decoder {
            cursor,
            opts: options,
            nesting: Nesting::new(),
            last_err,
            mapped_tags: [0; MAX_MAPPED_TAGS],
            mapped_used: 0,
            handlers: None,
            alloc: None,
            val_off: 0,
            val_rem: INDEF,
            last_string: PREV_NONE,
        }
    }

    /// Construct a decoder with a string allocator for indefinite length string
    /// concatenation (and allocate-all-strings mode).
    pub fn with_allocator(
        input: &'buf [u8],
        options: u32,
        allocator: &'buf mut (dyn StringAllocator<'buf> + 'buf),
    ) -> Decoder<'buf> {
        let mut d = Decoder::new(input, options);
        d.alloc = Some(allocator);
        d
    }

    /// Install a table of tag-number handlers, consulted innermost tag first and before
    /// the built-in handlers.
    pub fn set_tag_handlers(&mut self, handlers: &'buf [TagHandler]) {
        self.handlers = Some(handlers);
    }

    /// The current cursor position.
    #[inline]
    pub fn tell(&self) -> u32 {
        self.cursor.tell()
    }

    /// Take and clear the sticky error. Decoding may be resumed only after a recoverable
    /// error (see [`CBORError::is_recoverable`]), usually combined with `rewind`.
    pub fn get_and_reset_error(&mut self) -> Option<CBORError> {
        self.last_err.take()
    }

    /// Resolve a 16 bit tag slot from an [`Item`]'s tag set to the full tag number.
    pub fn resolve_tag(&self, slot: u16) -> Option<u64> {
        if slot == TAG_SLOT_NONE {
            None
        } else if slot < TAG_SLOT_BASE {
            Some(slot as u64)
        } else {
            let i = (slot - TAG_SLOT_BASE) as usize;
            if i < self.mapped_used {
                Some(self.mapped_tags[i])
            } else {
                None
            }
        }
    }

    /// The `n`th unconsumed tag number on `item`, innermost first.
    pub fn item_tag(&self, item: &Item<'buf>, n: usize) -> Option<u64> {
        item.tags.slot(n).and_then(|s| self.resolve_tag(s))
    }

    /// Decode the next item in pre-order.
    #[cfg_attr(feature = "trace", trace)]
    pub fn next(&mut self) -> Result<Item<'buf>> {
        self.traverse(Descend::No)
    }

    /// Decode the next item without advancing the traversal. The string allocator, if
    /// engaged by the peeked item, is not rewound.
    pub fn peek(&mut self) -> Result<Item<'buf>> {
        let saved = self.save();
        let r = self.traverse(Descend::No);
        self.restore(saved);
        r
    }

    /// Check that decoding completed: no sticky error, no container still open, no input
    /// bytes left over. Tears down the string allocator.
    #[cfg_attr(feature = "trace", trace)]
    pub fn finish(&mut self) -> Result<()> {
        if let Some(a) = self.alloc.as_mut() {
            a.destruct();
        }
        if let Some(e) = self.last_err {
            return Err(e);
        }
        if self.nesting.depth != 0 {
            return Err(CBORError::ArrayOrMapStillOpen);
        }
        if self.cursor.bytes_available() != 0 {
            return Err(CBORError::ExtraBytes);
        }
        Ok(())
    }

    /***********************************************************************************************
     * Traversal internals
     **********************************************************************************************/

    pub(crate) fn save(&self) -> SavedState {
        SavedState {
            position: self.cursor.tell(),
            nesting: self.nesting,
            last_err: self.last_err,
            mapped_used: self.mapped_used,
            val_off: self.val_off,
            val_rem: self.val_rem,
        }
    }

    pub(crate) fn restore(&mut self, s: SavedState) {
        self.cursor.seek(s.position);
        self.nesting = s.nesting;
        self.last_err = s.last_err;
        self.mapped_used = s.mapped_used;
        self.val_off = s.val_off;
        self.val_rem = s.val_rem;
    }

    /// The sticky-error wrapper around one traversal step. `NoMoreItems` is a boundary
    /// signal and does not stick.
    pub(crate) fn traverse(&mut self, descend: Descend) -> Result<Item<'buf>> {
        if let Some(e) = self.last_err {
            return Err(e);
        }
        match self.traverse_inner(descend) {
            Ok(item) => Ok(item),
            Err(e) => {
                if e != CBORError::NoMoreItems {
                    self.last_err = Some(e);
                }
                Err(e)
            }
        }
    }

    fn traverse_inner(&mut self, descend: Descend) -> Result<Item<'buf>> {
        self.check_boundary()?;
        let depth_before = self.nesting.depth;
        let in_map = self.nesting.top().kind.is_map();
        let map_as_array = self.opts & opts::MAP_AS_ARRAY != 0;

        let mut label = Label::None;
        let mut label_from_pool = false;
        if in_map && !map_as_array && self.nesting.top().label_next {
            let (l, lp) = self.decode_label()?;
            label = l;
            label_from_pool = lp;
        }
        self.val_off = self.cursor.tell();
        self.val_rem = self.nesting.top().remaining;
        let nest_level = depth_before as u8;

        let (value, value_from_pool, tags) = self.decode_data_item(descend)?;

        if in_map {
            let f = &mut self.nesting.frames[depth_before];
            if map_as_array {
                f.label_next = !f.label_next;
            } else {
                f.label_next = true;
            }
        }
        self.ascend()?;

        Ok(Item {
            value,
            label,
            nest_level,
            next_nest_level: self.nesting.depth as u8,
            tags,
            value_from_pool,
            label_from_pool,
        })
    }

    /// Produce `NoMoreItems` at the edge of the current bounded container or input.
    fn check_boundary(&mut self) -> Result<()> {
        let top = *self.nesting.top();
        match top.kind {
            FrameKind::Top => {
                if self.cursor.bytes_available() == 0 {
                    Err(CBORError::NoMoreItems)
                } else {
                    Ok(())
                }
            }
            FrameKind::BoundedArray | FrameKind::BoundedMap => {
                if top.remaining == INDEF {
                    if self.cursor.peek_byte()? == BREAK_BYTE {
                        self.nesting.top_mut().end = self.cursor.tell() + 1;
                        Err(CBORError::NoMoreItems)
                    } else {
                        Ok(())
                    }
                } else if top.remaining == 0 {
                    self.nesting.top_mut().end = self.cursor.tell();
                    Err(CBORError::NoMoreItems)
                } else {
                    Ok(())
                }
            }
            FrameKind::BoundedBstr => {
                if self.cursor.tell() >= top.end {
                    Err(CBORError::NoMoreItems)
                } else {
                    Ok(())
                }
            }
            // Normal frames close through the look-ahead in `ascend`
            FrameKind::Array | FrameKind::Map => Ok(()),
        }
    }

    /// Count one consumed direct child in the current frame.
    fn count_consume(&mut self) {
        let top = self.nesting.top_mut();
        if top.kind != FrameKind::Top && top.remaining != INDEF && top.remaining > 0 {
            top.remaining -= 1;
        }
    }

    /// Close every definite length frame whose count is exhausted and every indefinite
    /// length frame whose break byte is next, so that `next_nest_level` reflects the
    /// post-closure depth. Bounded frames are never closed here.
    fn ascend(&mut self) -> Result<()> {
        loop {
            let top = *self.nesting.top();
            match top.kind {
                FrameKind::Array | FrameKind::Map => {
                    if top.remaining == INDEF {
                        match self.cursor.peek_byte() {
                            Ok(BREAK_BYTE) => {
                                if top.kind == FrameKind::Map && !top.label_next {
                                    // Break between a label and its value
                                    return Err(CBORError::BadBreak);
                                }
                                self.cursor.consume_byte()?;
                                self.nesting.pop();
                            }
                            // Truncation surfaces on the next read
                            _ => break,
                        }
                    } else if top.remaining == 0 {
                        self.nesting.pop();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Read one initial byte and its argument. Applies the shortest-form checks and
    /// rejects the reserved additional information values.
    fn read_head(&mut self) -> Result<(u8, u8, u64)> {
        let ib = self.cursor.consume_byte()?;
        let mt = ib & MT_MASK;
        let ai = ib & AI_MASK;
        match ai {
            0..=PAYLOAD_AI_BITS => Ok((mt, ai, ai as u64)),
            PAYLOAD_ONE_BYTE..=PAYLOAD_EIGHT_BYTES => {
                let n = argument_size(ai).ok_or(CBORError::BadInt)?;
                let bytes = self.cursor.consume(n)?;
                let arg = match n {
                    1 => bytes[0] as u64,
                    2 => u16::from_be_bytes(bytes.try_into().map_err(|_| CBORError::HitEnd)?) as u64,
                    4 => u32::from_be_bytes(bytes.try_into().map_err(|_| CBORError::HitEnd)?) as u64,
                    _ => u64::from_be_bytes(bytes.try_into().map_err(|_| CBORError::HitEnd)?),
                };
                // Floats (mt 7, ai 25..=27) carry raw bits, checked by the float decode;
                // two-byte simple values have their own wasted-byte rule
                if mt != MT_SIMPLE
                    && self.opts & opts::ONLY_PREFERRED_NUMBERS != 0
                    && !argument_is_preferred(arg, ai)
                {
                    return Err(CBORError::NotPreferred);
                }
                Ok((mt, ai, arg))
            }
            PAYLOAD_INDEFINITE => match mt {
                MT_BSTR | MT_TSTR | MT_ARRAY | MT_MAP | MT_SIMPLE => Ok((mt, ai, 0)),
                _ => Err(CBORError::BadInt),
            },
            _ => Err(CBORError::BadInt),
        }
    }

    /// Decode a map label: an integer or a string. Applies the sorted-map and duplicate
    /// checks when configured.
    fn decode_label(&mut self) -> Result<(Label<'buf>, bool)> {
        let l0 = self.cursor.tell();
        let (mt, ai, arg) = self.read_head()?;
        let strings_only = self.opts & opts::MAP_STRINGS_ONLY != 0;
        let mut from_pool = false;
        let label = match mt {
            MT_UINT if !strings_only => {
                if arg <= i64::MAX as u64 {
                    Label::Int(arg as i64)
                } else {
                    Label::UInt(arg)
                }
            }
            MT_NINT if !strings_only => {
                if arg <= i64::MAX as u64 {
                    Label::Int(-1 - arg as i64)
                } else {
                    return Err(CBORError::MapLabelType);
                }
            }
            MT_BSTR if !strings_only => {
                let (bytes, fp) = self.read_string(mt, ai, arg)?;
                from_pool = fp;
                Label::Bstr(bytes)
            }
            MT_TSTR => {
                let (bytes, fp) = self.read_string(mt, ai, arg)?;
                from_pool = fp;
                Label::Tstr(from_utf8(bytes).map_err(|_| CBORError::Utf8)?)
            }
            _ => return Err(CBORError::MapLabelType),
        };
        if self.opts & opts::ONLY_SORTED_MAPS != 0 {
            let llen = self.cursor.tell() - l0;
            let prev = self.nesting.top().prev_label;
            if prev != PREV_NONE {
                match self.cursor.compare_regions(prev.0, prev.1, l0, llen) {
                    Ordering::Less => {}
                    Ordering::Equal => return Err(CBORError::DuplicateLabel),
                    Ordering::Greater => return Err(CBORError::Unsorted),
                }
            }
            self.nesting.top_mut().prev_label = (l0, llen);
        }
        self.count_consume();
        self.nesting.top_mut().label_next = false;
        Ok((label, from_pool))
    }

    /// Decode one data item: its prefixed tag numbers, its head, its payload, and the tag
    /// content transforms.
    fn decode_data_item(&mut self, descend: Descend) -> Result<(Value<'buf>, bool, TagSet)> {
        self.count_consume();

        let mut pending = [0u64; MAX_TAGS_PER_ITEM];
        let mut npend = 0usize;
        let (mt, ai, arg) = loop {
            let h = self.read_head()?;
            if h.0 == MT_TAG {
                if npend == MAX_TAGS_PER_ITEM {
                    return Err(CBORError::TooManyTags);
                }
                pending[npend] = h.2;
                npend += 1;
            } else {
                break h;
            }
        };

        let mut from_pool = false;
        let value = match mt {
            MT_UINT => {
                if arg <= i64::MAX as u64 {
                    Value::Int(arg as i64)
                } else {
                    Value::UInt(arg)
                }
            }
            MT_NINT => {
                if arg <= i64::MAX as u64 {
                    Value::Int(-1 - arg as i64)
                } else {
                    Value::NegInt65(arg)
                }
            }
            MT_BSTR | MT_TSTR => {
                let (bytes, fp) = self.read_string(mt, ai, arg)?;
                from_pool = fp;
                if mt == MT_BSTR {
                    Value::Bstr(bytes)
                } else {
                    Value::Tstr(from_utf8(bytes).map_err(|_| CBORError::Utf8)?)
                }
            }
            MT_ARRAY
                if descend == Descend::No
                    && npend > 0
                    && (pending[npend - 1] == TAG_DECIMAL_FRACTION
                        || pending[npend - 1] == TAG_BIGFLOAT) =>
            {
                // Structural tag content: the two-element array is consumed here rather
                // than surfaced as separate items
                if ai == PAYLOAD_INDEFINITE || arg != 2 {
                    return Err(CBORError::BadExpMantissa);
                }
                let tag = pending[npend - 1];
                npend -= 1;
                let (exponent, mantissa) = self.decode_exp_mantissa()?;
                if tag == TAG_DECIMAL_FRACTION {
                    Value::DecimalFraction { exponent, mantissa }
                } else {
                    Value::BigFloat { exponent, mantissa }
                }
            }
            MT_ARRAY | MT_MAP => self.open_container(mt, ai, arg, descend)?,
            MT_SIMPLE => self.decode_type7(ai, arg)?,
            _ => return Err(CBORError::Unsupported),
        };

        // Tag content transforms, innermost first. An unconsumed tag blocks the ones
        // outside it.
        let mut item = Item {
            value,
            label: Label::None,
            nest_level: 0,
            next_nest_level: 0,
            tags: TagSet::empty(),
            value_from_pool: from_pool,
            label_from_pool: false,
        };
        while npend > 0 {
            let tag = pending[npend - 1];
            let handled = match self.lookup_handler(tag) {
                Some(f) => f(tag, &mut item)?,
                None => builtin_tag_content(tag, &mut item, self.opts)?,
            };
            if handled {
                npend -= 1;
            } else {
                break;
            }
        }
        if npend > 0 && self.opts & opts::ALLOW_UNPROCESSED_TAG_NUMBERS == 0 {
            return Err(CBORError::UnprocessedTagNumber);
        }
        let mut tags = TagSet::empty();
        for j in 0..npend {
            tags.slots[j] = self.map_tag(pending[npend - 1 - j])?;
        }
        Ok((item.value, item.value_from_pool, tags))
    }

    fn lookup_handler(&self, tag: u64) -> Option<TagContentFn> {
        self.handlers
            .and_then(|hs| hs.iter().find(|h| h.tag == tag).map(|h| h.decode))
    }

    /// Open an array or map frame and emit its header item.
    fn open_container(&mut self, mt: u8, ai: u8, arg: u64, descend: Descend) -> Result<Value<'buf>> {
        let map_as_array = self.opts & opts::MAP_AS_ARRAY != 0;
        let indefinite = ai == PAYLOAD_INDEFINITE;
        if indefinite && self.opts & opts::NO_INDEF_LENGTH != 0 {
            return Err(CBORError::NotPreferred);
        }
        let (frame_count, item_count) = if indefinite {
            (INDEF, INDEFINITE_COUNT)
        } else {
            if arg > MAX_CONTAINER_ITEMS {
                return Err(CBORError::ArrayDecodeTooLong);
            }
            if mt == MT_MAP {
                if map_as_array {
                    if arg > (MAX_CONTAINER_ITEMS / 2) {
                        return Err(CBORError::ArrayDecodeTooLong);
                    }
                    ((arg * 2) as u32, (arg * 2) as u16)
                } else {
                    ((arg * 2) as u32, arg as u16)
                }
            } else {
                (arg as u32, arg as u16)
            }
        };
        let kind = match (mt, descend) {
            (MT_ARRAY, Descend::No) => FrameKind::Array,
            (MT_ARRAY, Descend::Array) => FrameKind::BoundedArray,
            (MT_MAP, Descend::No) => FrameKind::Map,
            (MT_MAP, Descend::Map) => FrameKind::BoundedMap,
            _ => return Err(CBORError::IncompatibleType),
        };
        self.nesting.push(kind, frame_count, self.cursor.tell())?;
        if mt == MT_MAP && !map_as_array {
            Ok(Value::Map(item_count))
        } else {
            Ok(Value::Array(item_count))
        }
    }

    /// Decode a major type 7 item.
    fn decode_type7(&mut self, ai: u8, arg: u64) -> Result<Value<'buf>> {
        let dcbor_simples = self.opts & opts::DISALLOW_DCBOR_SIMPLES != 0;
        match ai {
            SIMPLE_FALSE => Ok(Value::False),
            SIMPLE_TRUE => Ok(Value::True),
            SIMPLE_NULL => Ok(Value::Null),
            SIMPLE_UNDEFINED => {
                if dcbor_simples {
                    Err(CBORError::DcborConformance)
                } else {
                    Ok(Value::Undefined)
                }
            }
            0..=19 => {
                if dcbor_simples {
                    Err(CBORError::DcborConformance)
                } else {
                    Ok(Value::Simple(ai))
                }
            }
            PAYLOAD_ONE_BYTE => {
                // The canonical wasted-byte check: two-byte simple values start at 32
                if arg < 32 {
                    Err(CBORError::BadType7)
                } else if dcbor_simples {
                    Err(CBORError::DcborConformance)
                } else {
                    Ok(Value::Simple(arg as u8))
                }
            }
            PAYLOAD_TWO_BYTES => {
                let v = half_to_double(arg as u16);
                self.check_reduced_float(v)?;
                Ok(Value::Float64(v))
            }
            PAYLOAD_FOUR_BYTES => {
                let v = f32::from_bits(arg as u32);
                if self.opts & opts::ONLY_PREFERRED_NUMBERS != 0
                    && !matches!(reduce_single(v), ReducedFloat::Single(_))
                {
                    return Err(CBORError::NotPreferred);
                }
                self.check_reduced_float(v as f64)?;
                Ok(Value::Float32(v))
            }
            PAYLOAD_EIGHT_BYTES => {
                let v = f64::from_bits(arg);
                if self.opts & opts::ONLY_PREFERRED_NUMBERS != 0
                    && !matches!(reduce_double(v), ReducedFloat::Double(_))
                {
                    return Err(CBORError::NotPreferred);
                }
                self.check_reduced_float(v)?;
                Ok(Value::Float64(v))
            }
            PAYLOAD_INDEFINITE => Err(CBORError::BadBreak),
            _ => Err(CBORError::BadInt),
        }
    }

    fn check_reduced_float(&self, v: f64) -> Result<()> {
        if self.opts & opts::ONLY_REDUCED_FLOATS != 0 && double_is_whole(v) {
            Err(CBORError::DcborConformance)
        } else {
            Ok(())
        }
    }

    /// Read a definite or indefinite string payload.
    fn read_string(&mut self, mt: u8, ai: u8, arg: u64) -> Result<(&'buf [u8], bool)> {
        if ai == PAYLOAD_INDEFINITE {
            self.last_string = PREV_NONE;
            let bytes = self.read_indefinite_string(mt)?;
            Ok((bytes, true))
        } else {
            if arg > MAX_INPUT_SIZE as u64 {
                return Err(CBORError::HitEnd);
            }
            let s0 = self.cursor.tell();
            let bytes = self.cursor.consume(arg as usize)?;
            self.last_string = (s0, arg as u32);
            if self.opts & opts::ALLOC_ALL_STRINGS != 0 {
                let a = self.alloc.as_mut().ok_or(CBORError::NoStringAllocator)?;
                a.extend(bytes)?;
                Ok((a.take()?, true))
            } else {
                Ok((bytes, false))
            }
        }
    }

    /// Concatenate the chunks of an indefinite length string into allocator memory.
    fn read_indefinite_string(&mut self, mt: u8) -> Result<&'buf [u8]> {
        if self.opts & opts::NO_INDEF_LENGTH != 0 {
            return Err(CBORError::NotPreferred);
        }
        if self.alloc.is_none() {
            return Err(CBORError::NoStringAllocator);
        }
        loop {
            if self.cursor.peek_byte()? == BREAK_BYTE {
                self.cursor.consume_byte()?;
                break;
            }
            let (cmt, cai, clen) = self.read_head()?;
            if cmt != mt || cai == PAYLOAD_INDEFINITE {
                return Err(CBORError::IndefiniteStringChunk);
            }
            if clen > MAX_INPUT_SIZE as u64 {
                return Err(CBORError::HitEnd);
            }
            let chunk = self.cursor.consume(clen as usize)?;
            let a = self.alloc.as_mut().ok_or(CBORError::NoStringAllocator)?;
            a.extend(chunk)?;
        }
        let a = self.alloc.as_mut().ok_or(CBORError::NoStringAllocator)?;
        a.take()
    }

    /// Decode the exponent and mantissa of a decimal fraction or bigfloat.
    fn decode_exp_mantissa(&mut self) -> Result<(i64, Mantissa<'buf>)> {
        let (mt, _, arg) = self.read_head()?;
        let exponent = match mt {
            MT_UINT if arg <= i64::MAX as u64 => arg as i64,
            MT_NINT if arg <= i64::MAX as u64 => -1 - arg as i64,
            _ => return Err(CBORError::BadExpMantissa),
        };
        let (mt, _, arg) = self.read_head()?;
        let mantissa = match mt {
            MT_UINT => {
                if arg <= i64::MAX as u64 {
                    Mantissa::Int(arg as i64)
                } else {
                    Mantissa::UInt(arg)
                }
            }
            MT_NINT if arg <= i64::MAX as u64 => Mantissa::Int(-1 - arg as i64),
            MT_TAG if arg == TAG_POS_BIGNUM || arg == TAG_NEG_BIGNUM => {
                let negative = arg == TAG_NEG_BIGNUM;
                let (bmt, bai, blen) = self.read_head()?;
                if bmt != MT_BSTR || bai == PAYLOAD_INDEFINITE {
                    return Err(CBORError::BadExpMantissa);
                }
                if blen > MAX_INPUT_SIZE as u64 {
                    return Err(CBORError::HitEnd);
                }
                let bytes = self.cursor.consume(blen as usize)?;
                if negative {
                    Mantissa::NegBignum(bytes)
                } else {
                    Mantissa::PosBignum(bytes)
                }
            }
            _ => return Err(CBORError::BadExpMantissa),
        };
        Ok((exponent, mantissa))
    }

    /***********************************************************************************************
     * Helpers shared with the bounded navigation layer
     **********************************************************************************************/

    /// Run the closure look-ahead; see `ascend`.
    pub(crate) fn close_completed_frames(&mut self) -> Result<()> {
        self.ascend()
    }

    /// Forget the previous-label record of the current frame (sorted-map checking).
    pub(crate) fn reset_sort_state(&mut self) {
        self.nesting.top_mut().prev_label = PREV_NONE;
    }

    /// Drop every frame, back to a fresh top level.
    pub(crate) fn reset_nesting(&mut self) {
        self.nesting = Nesting::new();
    }

    /// Push the bounded frame for entered byte-string wrapped CBOR.
    pub(crate) fn push_bstr_frame(&mut self, start: u32, end: u32, resume: u32) -> Result<()> {
        self.nesting.push(FrameKind::BoundedBstr, INDEF, start)?;
        let f = self.nesting.top_mut();
        f.end = end;
        f.resume = resume;
        Ok(())
    }

    /// Map a tag number into a 16 bit slot, using the per-context table for large values.
    fn map_tag(&mut self, tag: u64) -> Result<u16> {
        if tag < TAG_SLOT_BASE as u64 {
            return Ok(tag as u16);
        }
        for i in 0..self.mapped_used {
            if self.mapped_tags[i] == tag {
                return Ok(TAG_SLOT_BASE + i as u16);
            }
        }
        if self.mapped_used == MAX_MAPPED_TAGS {
            return Err(CBORError::TooManyTags);
        }
        self.mapped_tags[self.mapped_used] = tag;
        self.mapped_used += 1;
        Ok(TAG_SLOT_BASE + (self.mapped_used - 1) as u16)
    }
}
