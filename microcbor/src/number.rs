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
 * Number and float codec
 *
 * Head-byte argument encoding with the preferred (shortest form) serialization rules of
 * RFC 8949 section 4.2.1, and IEEE-754 reduction of doubles down to half precision for
 * preferred float serialization. Half precision values are widened through the `half`
 * crate on decode.
 **************************************************************************************************/
use crate::constants::*;

use half::f16;

/// Largest head: one MT/AI byte plus an eight byte argument.
pub(crate) const MAX_HEAD_LEN: usize = 9;

/// Encode `arg` with major type `mt` using preferred serialization into `out`, returning
/// the number of bytes used. The caller provides `out` of `MAX_HEAD_LEN` bytes.
pub(crate) fn encode_head(mt: u8, arg: u64, out: &mut [u8; MAX_HEAD_LEN]) -> usize {
    let vs = arg.to_be_bytes();
    if arg < PAYLOAD_ONE_BYTE as u64 {
        out[0] = mt | (arg as u8);
        1
    } else if arg <= u8::MAX as u64 {
        out[0] = mt | PAYLOAD_ONE_BYTE;
        out[1] = vs[7];
        2
    } else if arg <= u16::MAX as u64 {
        out[0] = mt | PAYLOAD_TWO_BYTES;
        out[1..3].copy_from_slice(&vs[6..8]);
        3
    } else if arg <= u32::MAX as u64 {
        out[0] = mt | PAYLOAD_FOUR_BYTES;
        out[1..5].copy_from_slice(&vs[4..8]);
        5
    } else {
        out[0] = mt | PAYLOAD_EIGHT_BYTES;
        out[1..9].copy_from_slice(&vs[0..8]);
        9
    }
}

/// Number of argument bytes following the MT/AI byte for a given AI value, or `None` for
/// the values that carry no argument bytes.
pub(crate) fn argument_size(ai: u8) -> Option<usize> {
    match ai {
        0..=PAYLOAD_AI_BITS => Some(0),
        PAYLOAD_ONE_BYTE => Some(1),
        PAYLOAD_TWO_BYTES => Some(2),
        PAYLOAD_FOUR_BYTES => Some(4),
        PAYLOAD_EIGHT_BYTES => Some(8),
        _ => None,
    }
}

/// Return `true` if `arg` encoded with AI value `ai` uses the shortest legal form.
pub(crate) fn argument_is_preferred(arg: u64, ai: u8) -> bool {
    match ai {
        0..=PAYLOAD_AI_BITS => true,
        PAYLOAD_ONE_BYTE => arg >= PAYLOAD_ONE_BYTE as u64,
        PAYLOAD_TWO_BYTES => arg > u8::MAX as u64,
        PAYLOAD_FOUR_BYTES => arg > u16::MAX as u64,
        PAYLOAD_EIGHT_BYTES => arg > u32::MAX as u64,
        _ => false,
    }
}

/***************************************************************************************************
 * IEEE-754 reduction
 **************************************************************************************************/

/// A double reduced to its shortest lossless representation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ReducedFloat {
    /// Raw bits of an f16
    Half(u16),
    Single(f32),
    Double(f64),
}

// f64 bit layout
const F64_MANTISSA_BITS: u32 = 52;
const F64_MANTISSA_MASK: u64 = (1u64 << F64_MANTISSA_BITS) - 1;
const F64_SIGN_SHIFT: u32 = 63;
// Mantissa bits discarded when narrowing a NaN payload
const F64_TO_F16_PAYLOAD_SHIFT: u32 = F64_MANTISSA_BITS - 10;
const F64_TO_F32_PAYLOAD_SHIFT: u32 = F64_MANTISSA_BITS - 23;

/// Reduce a double to half precision if and only if the round trip is exact, else to
/// single precision if that round trip is exact, else keep it double.
///
/// NaN payloads are preserved when they fit the narrower significand after the right
/// shift; payloads that would be truncated prevent reduction.
pub fn reduce_double(v: f64) -> ReducedFloat {
    if v.is_nan() {
        return reduce_nan(v);
    }
    let half = f16::from_f64(v);
    if f64::from(half) == v {
        return ReducedFloat::Half(half.to_bits());
    }
    let single = v as f32;
    if single as f64 == v {
        return ReducedFloat::Single(single);
    }
    ReducedFloat::Double(v)
}

/// Reduce a single to half precision when the round trip is exact.
pub fn reduce_single(v: f32) -> ReducedFloat {
    match reduce_double(v as f64) {
        ReducedFloat::Half(h) => ReducedFloat::Half(h),
        _ => ReducedFloat::Single(v),
    }
}

fn reduce_nan(v: f64) -> ReducedFloat {
    let bits = v.to_bits();
    let sign = (bits >> F64_SIGN_SHIFT) as u16;
    let payload = bits & F64_MANTISSA_MASK;
    if payload & ((1u64 << F64_TO_F16_PAYLOAD_SHIFT) - 1) == 0 {
        // Payload survives the shift into a 10 bit half significand
        let h = (sign << 15) | 0x7c00 | (payload >> F64_TO_F16_PAYLOAD_SHIFT) as u16;
        ReducedFloat::Half(h)
    } else if payload & ((1u64 << F64_TO_F32_PAYLOAD_SHIFT) - 1) == 0 {
        let s = ((sign as u32) << 31) | 0x7f80_0000 | (payload >> F64_TO_F32_PAYLOAD_SHIFT) as u32;
        ReducedFloat::Single(f32::from_bits(s))
    } else {
        ReducedFloat::Double(v)
    }
}

/// Widen the raw bits of an f16 to a double.
#[inline]
pub fn half_to_double(bits: u16) -> f64 {
    f64::from(f16::from_bits(bits))
}

/// Return `true` if `v` is a finite whole number that an integer could represent. Used by
/// the dCBOR reduced-float check: such values must be encoded as integers.
pub fn double_is_whole(v: f64) -> bool {
    v.is_finite()
        && v == v.trunc()
        && v >= -9.223_372_036_854_776e18 // i64::MIN
        && v < 1.844_674_407_370_955_2e19 // 2^64
}
