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
 * Bounded navigation: enter/exit with end detection, rewind, label search with its
 * committed cursor contract, batch and callback search, and byte-string wrapped entry.
 **************************************************************************************************/

extern crate microcbor;

use microcbor::decoder::{Decoder, MapQuery};
use microcbor::error::CBORError;
use microcbor::types::{Label, Value, ValueKind};

// {1: 2, 3: 4}
const SMALL_MAP: &[u8] = &[0xa2, 0x01, 0x02, 0x03, 0x04];

#[test]
fn bounded_map_end_detection() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    assert_eq!(d.next().unwrap().value, Value::Int(2));
    assert_eq!(d.next().unwrap().value, Value::Int(4));
    assert_eq!(d.next(), Err(CBORError::NoMoreItems));
    // The boundary signal does not stick
    d.exit_map().unwrap();
    assert_eq!(d.tell() as usize, SMALL_MAP.len());
    d.finish().unwrap();
}

#[test]
fn bounded_exit_without_full_traversal() {
    // Exit reads and discards the remaining items
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    d.exit_map().unwrap();
    assert_eq!(d.tell() as usize, SMALL_MAP.len());
    d.finish().unwrap();
}

#[test]
fn bounded_indefinite_map() {
    // {_ 1: 2, 3: 4}
    let input: &[u8] = &[0xbf, 0x01, 0x02, 0x03, 0x04, 0xff];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    assert_eq!(d.get_i64_in_map(3i64).unwrap(), 4);
    d.exit_map().unwrap();
    assert_eq!(d.tell() as usize, input.len());
    d.finish().unwrap();
}

#[test]
fn bounded_array() {
    let input: &[u8] = &[0x83, 0x0a, 0x0b, 0x0c];
    let mut d = Decoder::new(input, 0);
    let header = d.enter_array().unwrap();
    assert_eq!(header.value, Value::Array(3));
    assert_eq!(d.next().unwrap().value, Value::Int(10));
    assert_eq!(d.next().unwrap().value, Value::Int(11));
    assert_eq!(d.next().unwrap().value, Value::Int(12));
    assert_eq!(d.next(), Err(CBORError::NoMoreItems));
    d.exit_array().unwrap();
    d.finish().unwrap();
}

#[test]
fn exit_mismatch_is_detected() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    assert_eq!(d.exit_array(), Err(CBORError::ExitMismatch));
}

#[test]
fn enter_scalar_fails() {
    let mut d = Decoder::new(&[0x01], 0);
    assert_eq!(d.enter_map(), Err(CBORError::IncompatibleType));
}

#[test]
fn rewind_restarts_the_bounded_container() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    assert_eq!(d.next().unwrap().value, Value::Int(2));
    assert_eq!(d.next().unwrap().value, Value::Int(4));
    assert_eq!(d.next(), Err(CBORError::NoMoreItems));
    d.rewind();
    assert_eq!(d.next().unwrap().value, Value::Int(2));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn rewind_without_bounded_container_restarts_input() {
    let mut d = Decoder::new(&[0x01, 0x02], 0);
    assert_eq!(d.next().unwrap().value, Value::Int(1));
    d.rewind();
    assert_eq!(d.next().unwrap().value, Value::Int(1));
    assert_eq!(d.next().unwrap().value, Value::Int(2));
    d.finish().unwrap();
}

/***************************************************************************************************
 * Label search
 **************************************************************************************************/

#[test]
fn scalar_label_search_leaves_the_cursor() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    let before = d.tell();
    let item = d.get_in_map(3i64).unwrap();
    assert_eq!(item.value, Value::Int(4));
    assert_eq!(item.label, Label::Int(3));
    assert_eq!(d.tell(), before);
    // Traversal resumes where it left off
    assert_eq!(d.next().unwrap().value, Value::Int(2));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn label_search_by_text_label() {
    // {"a": 1, "b": h'02'}
    let input: &[u8] = &[0xa2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x41, 0x02];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    assert_eq!(d.get_i64_in_map("a").unwrap(), 1);
    assert_eq!(d.get_bstr_in_map("b").unwrap(), &[0x02]);
    assert_eq!(d.get_in_map("c"), Err(CBORError::LabelNotFound));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn label_types_match_exactly() {
    // {1: 2, "1": 3}
    let input: &[u8] = &[0xa2, 0x01, 0x02, 0x61, 0x31, 0x03];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    assert_eq!(d.get_i64_in_map(1i64).unwrap(), 2);
    assert_eq!(d.get_i64_in_map("1").unwrap(), 3);
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn duplicate_of_the_sought_label_is_flagged() {
    // {1: 2, 1: 3} - only searches for label 1 see the duplicate
    let input: &[u8] = &[0xa2, 0x01, 0x02, 0x01, 0x03];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    assert_eq!(d.get_in_map(1i64), Err(CBORError::DuplicateLabel));
    assert_eq!(d.get_and_reset_error(), Some(CBORError::DuplicateLabel));
    d.rewind();
    // A different label does not see it
    assert_eq!(d.get_in_map(9i64), Err(CBORError::LabelNotFound));
}

#[test]
fn search_skips_aggregate_values() {
    // {1: [9, 9], 2: {"x": 0}, 3: 7}
    let input: &[u8] = &[
        0xa3, 0x01, 0x82, 0x09, 0x09, 0x02, 0xa1, 0x61, 0x78, 0x00, 0x03, 0x07,
    ];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    assert_eq!(d.get_i64_in_map(3i64).unwrap(), 7);
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn batch_search_fills_all_queries_in_one_pass() {
    let input: &[u8] = &[
        0xa3, 0x01, 0x82, 0x09, 0x09, 0x02, 0xa1, 0x61, 0x78, 0x00, 0x03, 0x07,
    ];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    let mut queries = [
        MapQuery::with_kind(1i64, ValueKind::Array),
        MapQuery::with_kind(3i64, ValueKind::Integer),
        MapQuery::new(99i64),
    ];
    d.get_items_in_map(&mut queries).unwrap();
    assert_eq!(queries[0].item.unwrap().value, Value::Array(2));
    assert_eq!(queries[1].item.unwrap().value, Value::Int(7));
    assert!(!queries[2].found());
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn batch_search_checks_expected_kinds() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    let mut queries = [MapQuery::with_kind(1i64, ValueKind::Tstr)];
    assert_eq!(
        d.get_items_in_map(&mut queries),
        Err(CBORError::IncompatibleType)
    );
}

#[test]
fn callback_search_sees_unmatched_items() {
    let input: &[u8] = &[
        0xa3, 0x01, 0x82, 0x09, 0x09, 0x02, 0xa1, 0x61, 0x78, 0x00, 0x03, 0x07,
    ];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    let mut queries = [MapQuery::new(3i64)];
    let mut unmatched_labels = std::vec::Vec::new();
    d.traverse_map_items(&mut queries, &mut |item| {
        unmatched_labels.push(item.label);
        Ok(())
    })
    .unwrap();
    assert_eq!(unmatched_labels, &[Label::Int(1), Label::Int(2)]);
    assert_eq!(queries[0].item.unwrap().value, Value::Int(7));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn callback_can_abort_the_traversal() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    d.enter_map().unwrap();
    let mut queries: [MapQuery; 0] = [];
    let err = d
        .traverse_map_items(&mut queries, &mut |_| Err(CBORError::UserError(7)))
        .unwrap_err();
    assert_eq!(err, CBORError::UserError(7));
}

#[test]
fn enter_by_label_positions_the_cursor_for_exit() {
    // {1: [10, 11], 2: 5}
    let input: &[u8] = &[0xa2, 0x01, 0x82, 0x0a, 0x0b, 0x02, 0x05];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    d.enter_array_by_label(1i64).unwrap();
    assert_eq!(d.next().unwrap().value, Value::Int(10));
    assert_eq!(d.next().unwrap().value, Value::Int(11));
    assert_eq!(d.next(), Err(CBORError::NoMoreItems));
    d.exit_array().unwrap();
    // The cursor sits just after the entered container, as if traversed in order
    let tail = d.next().unwrap();
    assert_eq!(tail.label, Label::Int(2));
    assert_eq!(tail.value, Value::Int(5));
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn enter_map_by_label() {
    // {5: {"k": 1}}
    let input: &[u8] = &[0xa1, 0x05, 0xa1, 0x61, 0x6b, 0x01];
    let mut d = Decoder::new(input, 0);
    d.enter_map().unwrap();
    d.enter_map_by_label(5i64).unwrap();
    assert_eq!(d.get_i64_in_map("k").unwrap(), 1);
    d.exit_map().unwrap();
    d.exit_map().unwrap();
    d.finish().unwrap();
}

#[test]
fn search_requires_an_entered_map() {
    let mut d = Decoder::new(&[0x82, 0x01, 0x02], 0);
    assert_eq!(d.get_in_map(1i64), Err(CBORError::MapNotEntered));
}

/***************************************************************************************************
 * Byte-string wrapped CBOR
 **************************************************************************************************/

#[test]
fn enter_bstr_wrapped_and_resume() {
    // [h'A2 01 02 03 04', 7]
    let input: &[u8] = &[0x82, 0x45, 0xa2, 0x01, 0x02, 0x03, 0x04, 0x07];
    let mut d = Decoder::new(input, 0);
    d.enter_array().unwrap();
    let content = d.enter_bstr_wrapped(None).unwrap();
    assert_eq!(content, &[0xa2, 0x01, 0x02, 0x03, 0x04]);
    d.enter_map().unwrap();
    assert_eq!(d.get_i64_in_map(1i64).unwrap(), 2);
    d.exit_map().unwrap();
    d.exit_bstr_wrapped().unwrap();
    // Decoding resumes after the byte string
    assert_eq!(d.next().unwrap().value, Value::Int(7));
    d.exit_array().unwrap();
    d.finish().unwrap();
}

#[test]
fn enter_bstr_wrapped_with_required_tag() {
    // 24(<< 1 >>)
    let input: &[u8] = &[0xd8, 0x18, 0x41, 0x01];
    let mut d = Decoder::new(input, 0);
    let content = d.enter_bstr_wrapped(Some(24)).unwrap();
    assert_eq!(content, &[0x01]);
    assert_eq!(d.next().unwrap().value, Value::Int(1));
    d.exit_bstr_wrapped().unwrap();
    d.finish().unwrap();

    // An untagged byte string does not satisfy a required tag
    let mut d = Decoder::new(&[0x41, 0x01], 0);
    assert_eq!(d.enter_bstr_wrapped(Some(24)), Err(CBORError::IncompatibleType));
}

#[test]
fn tell_tracks_the_cursor() {
    let mut d = Decoder::new(SMALL_MAP, 0);
    assert_eq!(d.tell(), 0);
    d.enter_map().unwrap();
    assert_eq!(d.tell(), 1);
    d.next().unwrap();
    assert_eq!(d.tell(), 3);
    d.exit_map().unwrap();
    assert_eq!(d.tell() as usize, SMALL_MAP.len());
}
