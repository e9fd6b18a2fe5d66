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
 * Bounded navigation
 *
 * Enter/Exit for maps, arrays and byte-string wrapped CBOR, cursor rewind, and label
 * indexed map search. In bounded mode traversal is restricted to the entered sub-tree:
 * its edge reads `NoMoreItems` instead of crossing into the parent.
 *
 * Label retrieval has a deliberately asymmetric cursor contract, retained for
 * compatibility: retrieving a scalar leaves the traversal cursor untouched, while entering
 * a container by label places the cursor as if the caller had traversed in order to it, so
 * that the matching exit lands just after the container.
 **************************************************************************************************/
use crate::constants::{TAG_WRAPPED_CBOR, TAG_WRAPPED_CBOR_SEQUENCE};
use crate::decode::{Decoder, Descend, FrameKind, END_UNKNOWN, INDEF};
use crate::error::{CBORError, Result};
use crate::item::{Item, Label, Value, ValueKind};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// One entry of a batch map search: the sought label, an optional expected value kind,
/// and the matched item once the search ran.
#[derive(Debug, Copy, Clone)]
pub struct MapQuery<'buf> {
    pub label: Label<'buf>,
    pub expect: Option<ValueKind>,
    pub item: Option<Item<'buf>>,
    hit: Option<SearchHit>,
}

#[derive(Debug, Copy, Clone)]
struct SearchHit {
    /// Offset of the value head (past the label)
    val_off: u32,
    /// `remaining` of the map frame at that point
    val_rem: u32,
}

impl<'buf> MapQuery<'buf> {
    /// A query matching `label` with any value type.
    pub fn new<L: Into<Label<'buf>>>(label: L) -> MapQuery<'buf> {
        MapQuery {
            label: label.into(),
            expect: None,
            item: None,
            hit: None,
        }
    }

    /// A query matching `label` whose value must have kind `expect`.
    pub fn with_kind<L: Into<Label<'buf>>>(label: L, expect: ValueKind) -> MapQuery<'buf> {
        MapQuery {
            label: label.into(),
            expect: Some(expect),
            item: None,
            hit: None,
        }
    }

    /// Return `true` if the search matched this query.
    pub fn found(&self) -> bool {
        self.item.is_some()
    }
}

impl<'buf> Decoder<'buf> {
    /***********************************************************************************************
     * Enter / Exit
     **********************************************************************************************/

    /// Consume an array header and restrict traversal to its contents. The returned item
    /// is the header; the edge of the array reads `NoMoreItems`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_array(&mut self) -> Result<Item<'buf>> {
        let item = self.traverse(Descend::Array)?;
        match item.value {
            Value::Array(_) => Ok(item),
            _ => Err(self.sticky(CBORError::IncompatibleType)),
        }
    }

    /// Consume a map header and restrict traversal to its contents.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_map(&mut self) -> Result<Item<'buf>> {
        let item = self.traverse(Descend::Map)?;
        match item.value {
            Value::Map(_) => Ok(item),
            _ => Err(self.sticky(CBORError::IncompatibleType)),
        }
    }

    /// Consume a byte string (optionally required to carry tag 24 or 63) and decode its
    /// content as if it were the whole input. Returns the wrapped bytes. On exit the
    /// cursor resumes after the byte string.
    ///
    /// Strings concatenated from indefinite length chunks live in the allocator pool and
    /// cannot be entered this way.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_bstr_wrapped(&mut self, required_tag: Option<u64>) -> Result<&'buf [u8]> {
        let item = self.traverse(Descend::No)?;
        let content = match (item.value, required_tag) {
            (Value::Bstr(b), None) => b,
            (Value::WrappedCbor(b), None) | (Value::WrappedCbor(b), Some(TAG_WRAPPED_CBOR)) => b,
            (Value::WrappedCborSequence(b), None)
            | (Value::WrappedCborSequence(b), Some(TAG_WRAPPED_CBOR_SEQUENCE)) => b,
            _ => return Err(self.sticky(CBORError::IncompatibleType)),
        };
        if item.value_from_pool {
            return Err(self.sticky(CBORError::Unsupported));
        }
        let (start, len) = self.last_string;
        let resume = self.cursor.tell();
        if let Err(e) = self.push_bstr_frame(start, start + len, resume) {
            return Err(self.sticky(e));
        }
        self.cursor.seek(start);
        Ok(content)
    }

    /// Leave the entered array. With the end offset still unknown, the remaining items are
    /// read and discarded, so every one must be well-formed.
    pub fn exit_array(&mut self) -> Result<()> {
        self.exit_container(FrameKind::BoundedArray)
    }

    /// Leave the entered map.
    pub fn exit_map(&mut self) -> Result<()> {
        self.exit_container(FrameKind::BoundedMap)
    }

    /// Leave entered byte-string wrapped CBOR; the cursor resumes after the byte string.
    /// Content after the cursor position is not inspected.
    pub fn exit_bstr_wrapped(&mut self) -> Result<()> {
        if let Some(e) = self.last_err {
            return Err(e);
        }
        if self.nesting.top().kind != FrameKind::BoundedBstr {
            return Err(self.sticky(CBORError::ExitMismatch));
        }
        let resume = self.nesting.top().resume;
        self.pop_bounded();
        self.cursor.seek(resume);
        self.ascend_after_exit()
    }

    /// Set the cursor back to the start of the current bounded container (or the input
    /// start when none is entered) and clear the error state.
    #[cfg_attr(feature = "trace", trace)]
    pub fn rewind(&mut self) {
        self.last_err = None;
        match self.nesting.innermost_bounded() {
            Some(i) => {
                self.nesting.depth = i;
                let f = &mut self.nesting.frames[i];
                if f.kind != FrameKind::BoundedBstr {
                    f.remaining = f.count;
                }
                f.label_next = true;
                let start = f.start;
                self.reset_sort_state();
                self.cursor.seek(start);
            }
            None => {
                self.reset_nesting();
                self.cursor.seek(0);
            }
        }
    }

    fn exit_container(&mut self, want: FrameKind) -> Result<()> {
        if let Some(e) = self.last_err {
            return Err(e);
        }
        let bounded = match self.nesting.innermost_bounded() {
            Some(i) if self.nesting.frames[i].kind == want => i,
            _ => return Err(self.sticky(CBORError::ExitMismatch)),
        };
        let frame = self.nesting.frames[bounded];
        if frame.end != END_UNKNOWN && self.nesting.depth == bounded {
            // Fast path: the end offset was determined by an earlier traversal or search
            self.cursor.seek(frame.end);
        } else {
            // Read and discard up to the boundary; malformed content surfaces here
            loop {
                match self.next() {
                    Ok(_) => {}
                    Err(CBORError::NoMoreItems) => break,
                    Err(e) => return Err(e),
                }
            }
            let end = self.nesting.top().end;
            self.cursor.seek(end);
        }
        self.pop_bounded();
        self.ascend_after_exit()
    }

    /***********************************************************************************************
     * Label search
     **********************************************************************************************/

    /// Search the entered map for `label` and return the matching value item. The
    /// traversal cursor is unchanged. The whole map is traversed on every call: a
    /// duplicate of the sought label reads `DuplicateLabel` and malformed content
    /// anywhere in the map surfaces its own error.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_in_map<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<Item<'buf>> {
        let mut queries = [MapQuery::new(label.into())];
        self.search_map(&mut queries, None)?;
        queries[0].item.take().ok_or(CBORError::LabelNotFound)
    }

    /// [`Decoder::get_in_map`] narrowed to an integer value.
    pub fn get_i64_in_map<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<i64> {
        self.get_in_map(label)?.as_i64()
    }

    /// [`Decoder::get_in_map`] narrowed to a byte string value.
    pub fn get_bstr_in_map<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<&'buf [u8]> {
        match self.get_in_map(label)?.value {
            Value::Bstr(b) => Ok(b),
            _ => Err(CBORError::IncompatibleType),
        }
    }

    /// [`Decoder::get_in_map`] narrowed to a text string value.
    pub fn get_tstr_in_map<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<&'buf str> {
        match self.get_in_map(label)?.value {
            Value::Tstr(s) => Ok(s),
            _ => Err(CBORError::IncompatibleType),
        }
    }

    /// [`Decoder::get_in_map`] narrowed to a boolean value.
    pub fn get_bool_in_map<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<bool> {
        match self.get_in_map(label)?.value {
            Value::True => Ok(true),
            Value::False => Ok(false),
            _ => Err(CBORError::IncompatibleType),
        }
    }

    /// One traversal of the entered map matching every query at once. Queries whose label
    /// is absent are left unmatched; duplicate detection applies to every sought label.
    /// The traversal cursor is unchanged.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_items_in_map(&mut self, queries: &mut [MapQuery<'buf>]) -> Result<()> {
        self.search_map(queries, None)
    }

    /// As [`Decoder::get_items_in_map`], additionally invoking `unmatched` for every
    /// direct member of the map that no query matches. The callback may abort the
    /// traversal by returning an error (`UserError` is reserved for protocol failures).
    pub fn traverse_map_items(
        &mut self,
        queries: &mut [MapQuery<'buf>],
        unmatched: &mut dyn FnMut(&Item<'buf>) -> Result<()>,
    ) -> Result<()> {
        self.search_map(queries, Some(unmatched))
    }

    /// Search the entered map for `label`, whose value must be a map, and enter it. The
    /// cursor is placed such that the matching `exit_map` lands just after the entered
    /// container, as if the caller had traversed in order to it.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_map_by_label<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<Item<'buf>> {
        self.seek_to_value(label.into(), ValueKind::Map)?;
        self.enter_map()
    }

    /// As [`Decoder::enter_map_by_label`], for an array value.
    pub fn enter_array_by_label<L: Into<Label<'buf>>>(&mut self, label: L) -> Result<Item<'buf>> {
        self.seek_to_value(label.into(), ValueKind::Array)?;
        self.enter_array()
    }

    /// As [`Decoder::enter_map_by_label`], for a byte-string wrapped value.
    pub fn enter_bstr_wrapped_by_label<L: Into<Label<'buf>>>(
        &mut self,
        label: L,
        required_tag: Option<u64>,
    ) -> Result<&'buf [u8]> {
        self.seek_to_value_any(label.into())?;
        self.enter_bstr_wrapped(required_tag)
    }

    /***********************************************************************************************
     * Internals
     **********************************************************************************************/

    fn sticky(&mut self, e: CBORError) -> CBORError {
        if self.last_err.is_none() {
            self.last_err = Some(e);
        }
        e
    }

    fn pop_bounded(&mut self) {
        self.nesting.depth -= 1;
    }

    /// Run the container closure look-ahead after leaving a bounded frame, so the parent
    /// counts settle exactly as they would have after in-order traversal.
    fn ascend_after_exit(&mut self) -> Result<()> {
        match self.close_completed_frames() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.sticky(e)),
        }
    }

    /// Reposition the traversal onto the value of `label`, leaving the map frame exactly
    /// as if the preceding pairs had been consumed in order.
    fn seek_to_value(&mut self, label: Label<'buf>, expect: ValueKind) -> Result<()> {
        let mut queries = [MapQuery::with_kind(label, expect)];
        self.search_map(&mut queries, None)?;
        self.apply_hit(&queries[0])
    }

    fn seek_to_value_any(&mut self, label: Label<'buf>) -> Result<()> {
        let mut queries = [MapQuery::new(label)];
        self.search_map(&mut queries, None)?;
        self.apply_hit(&queries[0])
    }

    fn apply_hit(&mut self, q: &MapQuery<'buf>) -> Result<()> {
        let hit = match q.hit {
            Some(h) => h,
            None => return Err(CBORError::LabelNotFound),
        };
        let f = self.nesting.top_mut();
        f.remaining = hit.val_rem;
        f.label_next = false;
        self.cursor.seek(hit.val_off);
        Ok(())
    }

    /// The single traversal behind every label search form.
    fn search_map(
        &mut self,
        queries: &mut [MapQuery<'buf>],
        mut unmatched: Option<&mut dyn FnMut(&Item<'buf>) -> Result<()>>,
    ) -> Result<()> {
        if let Some(e) = self.last_err {
            return Err(e);
        }
        if self.nesting.top().kind != FrameKind::BoundedMap {
            return Err(self.sticky(CBORError::MapNotEntered));
        }
        for q in queries.iter_mut() {
            q.item = None;
            q.hit = None;
        }
        let map_depth = self.nesting.depth;
        let saved = self.save();
        {
            let f = self.nesting.top_mut();
            if f.remaining != INDEF {
                f.remaining = f.count;
            }
            f.label_next = true;
            let start = f.start;
            self.reset_sort_state();
            self.cursor.seek(start);
        }
        let mut err: Option<CBORError> = None;
        loop {
            let item = match self.next() {
                Ok(item) => item,
                Err(CBORError::NoMoreItems) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            };
            // Only direct members carry labels of this map; deeper items are the
            // contents of values being skipped over
            if item.nest_level as usize != map_depth {
                continue;
            }
            let mut matched = false;
            for q in queries.iter_mut() {
                if q.label == item.label {
                    if q.item.is_some() {
                        err = Some(CBORError::DuplicateLabel);
                        break;
                    }
                    if let Some(k) = q.expect {
                        if item.value.kind() != k {
                            err = Some(CBORError::IncompatibleType);
                            break;
                        }
                    }
                    q.item = Some(item);
                    q.hit = Some(SearchHit {
                        val_off: self.val_off,
                        val_rem: self.val_rem,
                    });
                    matched = true;
                }
            }
            if err.is_some() {
                break;
            }
            if !matched {
                if let Some(cb) = unmatched.as_mut() {
                    if let Err(e) = cb(&item) {
                        err = Some(e);
                        break;
                    }
                }
            }
        }
        let end = self.nesting.frames[map_depth].end;
        self.restore(saved);
        match err {
            Some(e) => Err(self.sticky(e)),
            None => {
                // Remember the discovered end for the bounded-exit fast path
                self.nesting.frames[map_depth].end = end;
                Ok(())
            }
        }
    }
}
