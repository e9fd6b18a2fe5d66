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
 * Test cases from RFC 8949 for the encoder: preferred serialization of integers and
 * floats, and the open/close head fix-up for arrays, maps and wrapped byte strings.
 **************************************************************************************************/

extern crate microcbor;

use microcbor::encoder::Encoder;
use microcbor::error::CBORError;

fn encode_with<F>(f: F) -> std::vec::Vec<u8>
where
    F: FnOnce(&mut Encoder) -> Result<(), CBORError>,
{
    let mut buf = [0u8; 1024];
    let mut enc = Encoder::new(&mut buf);
    f(&mut enc).expect("encode");
    enc.finish().expect("finish").to_vec()
}

macro_rules! check_encode {
    ($expected:expr, $f:expr) => {{
        let expected: &[u8] = $expected;
        assert_eq!(encode_with($f).as_slice(), expected)
    }};
}

#[test]
fn preferred_integer_heads() {
    check_encode!(&[0x00], |e| e.add_i64(0));
    check_encode!(&[0x01], |e| e.add_i64(1));
    check_encode!(&[0x17], |e| e.add_i64(23));
    check_encode!(&[0x18, 0x18], |e| e.add_i64(24));
    check_encode!(&[0x18, 0x64], |e| e.add_i64(100));
    check_encode!(&[0x19, 0x03, 0xe8], |e| e.add_i64(1000));
    check_encode!(&[0x1a, 0x00, 0x0f, 0x42, 0x40], |e| e.add_i64(1000000));
    check_encode!(
        &[0x1b, 0x00, 0x00, 0x00, 0xe8, 0xd4, 0xa5, 0x10, 0x00],
        |e| e.add_i64(1000000000000)
    );
    check_encode!(
        &[0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        |e| e.add_u64(u64::MAX)
    );

    check_encode!(&[0x20], |e| e.add_i64(-1));
    check_encode!(&[0x29], |e| e.add_i64(-10));
    check_encode!(&[0x37], |e| e.add_i64(-24));
    check_encode!(&[0x38, 0x18], |e| e.add_i64(-25));
    check_encode!(&[0x38, 0x63], |e| e.add_i64(-100));
    check_encode!(&[0x39, 0x03, 0xe7], |e| e.add_i64(-1000));
    check_encode!(
        &[0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        |e| e.add_i64(i64::MIN)
    );
    // -18446744073709551616, below i64::MIN
    check_encode!(
        &[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        |e| e.add_negative_u64(u64::MAX)
    );
}

#[test]
fn strings_encode() {
    check_encode!(&[0x40], |e| e.add_bytes(&[]));
    check_encode!(&[0x43, 0x01, 0x02, 0x03], |e| e.add_bytes(&[1, 2, 3]));
    check_encode!(&[0x60], |e| e.add_text(""));
    check_encode!(&[0x64, 0x49, 0x45, 0x54, 0x46], |e| e.add_text("IETF"));
}

#[test]
fn simple_values_encode() {
    check_encode!(&[0xf4], |e| e.add_bool(false));
    check_encode!(&[0xf5], |e| e.add_bool(true));
    check_encode!(&[0xf6], |e| e.add_null());
    check_encode!(&[0xf7], |e| e.add_undefined());
    check_encode!(&[0xf0], |e| e.add_simple(16));
    check_encode!(&[0xf8, 0xff], |e| e.add_simple(255));
    // 20..=31 are reserved for the dedicated operations or illegal outright
    let mut buf = [0u8; 16];
    let mut enc = Encoder::new(&mut buf);
    assert_eq!(enc.add_simple(24), Err(CBORError::Unsupported));
}

#[test]
fn float_reduction() {
    // 1.5 survives the round trip to half precision
    check_encode!(&[0xf9, 0x3e, 0x00], |e| e.add_f64(1.5));
    check_encode!(&[0xf9, 0x3c, 0x00], |e| e.add_f64(1.0));
    check_encode!(&[0xf9, 0x7b, 0xff], |e| e.add_f64(65504.0));
    check_encode!(&[0xf9, 0x00, 0x00], |e| e.add_f64(0.0));
    check_encode!(&[0xf9, 0x80, 0x00], |e| e.add_f64(-0.0));
    check_encode!(&[0xf9, 0x7c, 0x00], |e| e.add_f64(f64::INFINITY));
    check_encode!(&[0xf9, 0xfc, 0x00], |e| e.add_f64(f64::NEG_INFINITY));
    // 100000.0 needs single precision
    check_encode!(&[0xfa, 0x47, 0xc3, 0x50, 0x00], |e| e.add_f64(100000.0));
    // 1.1 is exact in neither half nor single
    check_encode!(
        &[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a],
        |e| e.add_f64(1.1)
    );
    // The canonical quiet NaN reduces to the half precision NaN
    check_encode!(&[0xf9, 0x7e, 0x00], |e| e.add_f64(f64::NAN));
    // Width can be pinned when a protocol demands it
    check_encode!(
        &[0xfb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        |e| e.add_f64_no_reduce(1.5)
    );
}

#[test]
fn nan_payloads_survive_when_they_fit() {
    // A payload in the top 10 significand bits narrows to half with a right shift
    let nan_with_payload = f64::from_bits(0x7ff8_4000_0000_0000);
    check_encode!(&[0xf9, 0x7e, 0x10], |e| e.add_f64(nan_with_payload));
    // A payload needing 23 bits narrows only to single
    let nan_single = f64::from_bits(0x7ff8_0000_2000_0000);
    check_encode!(&[0xfa, 0x7f, 0xc0, 0x00, 0x01], |e| e.add_f64(nan_single));
    // A payload using the low mantissa bits cannot be narrowed at all
    let nan_double = f64::from_bits(0x7ff8_0000_0000_0001);
    check_encode!(
        &[0xfb, 0x7f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01],
        |e| e.add_f64(nan_double)
    );
}

#[test]
fn arrays_and_maps_encode() {
    check_encode!(&[0x80], |e| {
        e.open_array()?;
        e.close_array()
    });
    check_encode!(&[0x83, 0x01, 0x02, 0x03], |e| {
        e.open_array()?;
        e.add_i64(1)?;
        e.add_i64(2)?;
        e.add_i64(3)?;
        e.close_array()
    });
    // [1, [2, 3]]
    check_encode!(&[0x82, 0x01, 0x82, 0x02, 0x03], |e| {
        e.open_array()?;
        e.add_i64(1)?;
        e.open_array()?;
        e.add_i64(2)?;
        e.add_i64(3)?;
        e.close_array()?;
        e.close_array()
    });
    check_encode!(&[0xa0], |e| {
        e.open_map()?;
        e.close_map()
    });
    // {1: 2, 3: 4}
    check_encode!(&[0xa2, 0x01, 0x02, 0x03, 0x04], |e| {
        e.open_map()?;
        e.add_i64(1)?;
        e.add_i64(2)?;
        e.add_i64(3)?;
        e.add_i64(4)?;
        e.close_map()
    });
}

#[test]
fn long_array_grows_its_head() {
    // 25 elements force a two byte head placed after the content was emitted
    let out = encode_with(|e| {
        e.open_array()?;
        for i in 0..25 {
            e.add_i64(i)?;
        }
        e.close_array()
    });
    assert_eq!(out[0], 0x98);
    assert_eq!(out[1], 25);
    assert_eq!(out[2], 0x00);
    // Values 0..=23 take one byte each; 24 takes two
    assert_eq!(out[out.len() - 1], 0x18);
    assert_eq!(out.len(), 2 + 24 + 2);

    // 256 elements force a three byte head
    let out = encode_with(|e| {
        e.open_array()?;
        for _ in 0..256 {
            e.add_i64(0)?;
        }
        e.close_array()
    });
    assert_eq!(&out[..3], &[0x99, 0x01, 0x00]);
    assert_eq!(out.len(), 3 + 256);
}

#[test]
fn bstr_wrapping_encodes_and_grows() {
    // << 1 >> : a byte string holding one encoded item
    check_encode!(&[0x41, 0x01], |e| {
        e.open_bstr_wrap()?;
        e.add_i64(1)?;
        e.close_bstr_wrap()
    });
    // Tag 24 marks wrapped CBOR
    check_encode!(&[0xd8, 0x18, 0x41, 0x01], |e| {
        e.add_tag(24)?;
        e.open_bstr_wrap()?;
        e.add_i64(1)?;
        e.close_bstr_wrap()
    });
    // Content longer than 23 bytes forces the head to grow
    let out = encode_with(|e| {
        e.open_bstr_wrap()?;
        e.add_bytes(&[0u8; 30])?;
        e.close_bstr_wrap()
    });
    // Inner item: 0x58 30 zeros...; wrap: 0x58 (30 + 2)
    assert_eq!(&out[..4], &[0x58, 0x20, 0x58, 0x1e]);
    assert_eq!(out.len(), 2 + 2 + 30);
}

#[test]
fn tags_encode() {
    check_encode!(&[0xc1, 0x1a, 0x51, 0x4b, 0x67, 0xb0], |e| {
        e.add_tag(1)?;
        e.add_i64(1363896240)
    });
    check_encode!(&[0xd9, 0xd9, 0xf7, 0x00], |e| {
        e.add_tag(55799)?;
        e.add_i64(0)
    });
}

#[test]
fn add_encoded_passes_bytes_through() {
    check_encode!(&[0x82, 0x01, 0x43, 0x0a, 0x0b, 0x0c], |e| {
        e.open_array()?;
        e.add_i64(1)?;
        // The raw item counts as one array element
        e.add_encoded(&[0x43, 0x0a, 0x0b, 0x0c])?;
        e.close_array()
    });
}

#[test]
fn close_mismatches_are_rejected() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_array().unwrap();
    assert_eq!(enc.close_map(), Err(CBORError::ArrayOrMapStillOpen));

    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    assert_eq!(enc.close_array(), Err(CBORError::TooManyCloses));

    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_map().unwrap();
    enc.add_i64(1).unwrap();
    assert_eq!(enc.close_map(), Err(CBORError::OddMapItems));
}

#[test]
fn unclosed_container_fails_finish() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_array().unwrap();
    enc.add_i64(1).unwrap();
    assert_eq!(enc.finish(), Err(CBORError::ArrayOrMapStillOpen));
}

#[test]
fn buffer_exhaustion_is_sticky() {
    let mut buf = [0u8; 4];
    let mut enc = Encoder::new(&mut buf);
    assert_eq!(enc.add_bytes(&[0u8; 16]), Err(CBORError::BufferTooSmall));
    assert_eq!(enc.add_i64(1), Err(CBORError::BufferTooSmall));
    assert_eq!(enc.finish(), Err(CBORError::BufferTooSmall));
}

#[test]
fn round_trip_through_the_decoder() {
    use microcbor::decoder::Decoder;
    use microcbor::types::{Label, Value};

    let out = encode_with(|e| {
        e.open_map()?;
        e.add_i64(1)?;
        e.add_text("one")?;
        e.add_i64(2)?;
        e.open_array()?;
        e.add_f64(1.5)?;
        e.add_bool(true)?;
        e.close_array()?;
        e.close_map()
    });
    let mut d = Decoder::new(&out, 0);
    assert_eq!(d.next().unwrap().value, Value::Map(2));
    let one = d.next().unwrap();
    assert_eq!(one.label, Label::Int(1));
    assert_eq!(one.value, Value::Tstr("one"));
    let arr = d.next().unwrap();
    assert_eq!(arr.label, Label::Int(2));
    assert_eq!(arr.value, Value::Array(2));
    assert_eq!(d.next().unwrap().value, Value::Float64(1.5));
    assert_eq!(d.next().unwrap().value, Value::True);
    d.finish().unwrap();
}
