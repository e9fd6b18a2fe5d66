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
 * microcbor CBOR constants
 *
 * Wire-format constants from RFC 8949, the tag numbers the decoder understands natively, the
 * implementation limits of the fixed-size context structures, and the decoder option flags.
 **************************************************************************************************/

/// Major type bitmask
pub const MT_MASK: u8 = 0b111_00000;
/// Additional Information bitmask
pub const AI_MASK: u8 = 0b000_11111;

/// Major Type 0 (Positive integers)
pub const MT_UINT: u8 = 0b000_00000;
/// Major Type 1 (Negative integers)
pub const MT_NINT: u8 = 0b001_00000;
/// Major Type 2 (Byte Strings)
pub const MT_BSTR: u8 = 0b010_00000;
/// Major Type 3 (Text Strings)
pub const MT_TSTR: u8 = 0b011_00000;
/// Major Type 4 (Array)
pub const MT_ARRAY: u8 = 0b100_00000;
/// Major Type 5 (Map)
pub const MT_MAP: u8 = 0b101_00000;
/// Major Type 6 (Tag)
pub const MT_TAG: u8 = 0b110_00000;
/// Major Type 7 (Floats, simple types etc.)
pub const MT_SIMPLE: u8 = 0b111_00000;
pub const MT_FLOAT: u8 = 0b111_00000;

/// Maximum value of a "simple" payload mapped on AI bits
pub const PAYLOAD_AI_BITS: u8 = 23;
/// Indicates one byte of length or value information follows MT/AI byte
pub const PAYLOAD_ONE_BYTE: u8 = 24;
/// Indicates two bytes of length or value information follow MT/AI byte
pub const PAYLOAD_TWO_BYTES: u8 = 25;
/// Indicates four bytes of length or value information follow MT/AI byte
pub const PAYLOAD_FOUR_BYTES: u8 = 26;
/// Indicates eight bytes of length or value information follow MT/AI byte
pub const PAYLOAD_EIGHT_BYTES: u8 = 27;
/// Indicates an indefinite length item (mt 2..=5) or a break (mt 7)
pub const PAYLOAD_INDEFINITE: u8 = 31;

/// The one-byte marker closing an indefinite length container
pub const BREAK_BYTE: u8 = 0xff;

/// Simple value for `false`
pub const SIMPLE_FALSE: u8 = 20;
/// Simple value for `true`
pub const SIMPLE_TRUE: u8 = 21;
/// Simple value for `null`
pub const SIMPLE_NULL: u8 = 22;
/// Simple value for `undefined`
pub const SIMPLE_UNDEFINED: u8 = 23;

/***************************************************************************************************
 * Tag numbers handled natively (IANA CBOR Tags registry)
 **************************************************************************************************/

/// RFC 3339 date/time string
pub const TAG_DATE_STRING: u64 = 0;
/// Epoch-based date/time (integer or float seconds)
pub const TAG_EPOCH_DATE: u64 = 1;
/// Positive bignum (bstr)
pub const TAG_POS_BIGNUM: u64 = 2;
/// Negative bignum (bstr, value is -1 - n)
pub const TAG_NEG_BIGNUM: u64 = 3;
/// Decimal fraction ([exponent, mantissa])
pub const TAG_DECIMAL_FRACTION: u64 = 4;
/// Bigfloat ([exponent, mantissa])
pub const TAG_BIGFLOAT: u64 = 5;
/// Expected conversion to base64url
pub const TAG_B64URL_HINT: u64 = 21;
/// Expected conversion to base64
pub const TAG_B64_HINT: u64 = 22;
/// Expected conversion to base16
pub const TAG_B16_HINT: u64 = 23;
/// Byte string carrying one encoded CBOR data item
pub const TAG_WRAPPED_CBOR: u64 = 24;
/// URI text string
pub const TAG_URI: u64 = 32;
/// base64url-encoded text string
pub const TAG_B64URL: u64 = 33;
/// base64-encoded text string
pub const TAG_B64: u64 = 34;
/// Regular expression text string
pub const TAG_REGEX: u64 = 35;
/// MIME message text string
pub const TAG_MIME: u64 = 36;
/// Binary UUID (bstr)
pub const TAG_UUID: u64 = 37;
/// Byte string carrying an encoded CBOR sequence
pub const TAG_WRAPPED_CBOR_SEQUENCE: u64 = 63;
/// Days since the epoch
pub const TAG_EPOCH_DAYS: u64 = 100;
/// Binary MIME message (bstr)
pub const TAG_BINARY_MIME: u64 = 257;
/// RFC 3339 date-only string
pub const TAG_DAYS_STRING: u64 = 1004;

/***************************************************************************************************
 * Implementation limits
 **************************************************************************************************/

/// Largest input the decoder accepts. Two values above are reserved as offset sentinels.
pub const MAX_INPUT_SIZE: usize = (u32::MAX - 2) as usize;

/// Largest declared element count for a single definite length array or map. One below the
/// indefinite-length sentinel reported in decoded items.
pub const MAX_CONTAINER_ITEMS: u64 = 0xfffe;

/// Element count reported for an indefinite length array or map
pub const INDEFINITE_COUNT: u16 = u16::MAX;

/// Maximum nesting of arrays and maps
pub const MAX_NEST_ARRAY_MAP: usize = 10;

/// Maximum total nesting, including entered byte-string wrapped CBOR
pub const MAX_NEST: usize = 16;

/// Maximum number of tag numbers recorded on a single item, innermost first
pub const MAX_TAGS_PER_ITEM: usize = 4;

/// Number of large tag numbers that can be mapped into 16 bit tag slots per decoder instance
pub const MAX_MAPPED_TAGS: usize = 4;

/// Tag slot values at or above this refer to the decoder's mapping table
pub const TAG_SLOT_BASE: u16 = 0xfff0;

/// The empty tag slot marker
pub const TAG_SLOT_NONE: u16 = 0xffff;

/***************************************************************************************************
 * Decoder options
 **************************************************************************************************/

/// Module defining bitfield values for the decoder configuration flags, and the composite
/// conformance profiles built from them. See [`crate::decoder::Decoder::new`].
pub mod opts {
    /// Non-string map labels raise `MapLabelType`
    pub const MAP_STRINGS_ONLY: u32 = 0x0001;
    /// Maps are returned as arrays of 2N items; labels are ordinary items
    pub const MAP_AS_ARRAY: u32 = 0x0002;
    /// Tag numbers left unconsumed on an item are surfaced instead of raising
    /// `UnprocessedTagNumber`
    pub const ALLOW_UNPROCESSED_TAG_NUMBERS: u32 = 0x0004;
    /// Indefinite length items raise `NotPreferred`
    pub const NO_INDEF_LENGTH: u32 = 0x0008;
    /// Non-shortest integer and float encodings raise `NotPreferred`
    pub const ONLY_PREFERRED_NUMBERS: u32 = 0x0010;
    /// Bignums that fit a native integer raise `NotPreferredBigNum`
    pub const ONLY_PREFERRED_BIG_NUMBERS: u32 = 0x0020;
    /// Unsorted or duplicate-keyed maps raise `Unsorted` / `DuplicateLabel`
    pub const ONLY_SORTED_MAPS: u32 = 0x0040;
    /// Whole-number floats raise `DcborConformance`
    pub const ONLY_REDUCED_FLOATS: u32 = 0x0080;
    /// Simple values other than false/true/null raise `DcborConformance`
    pub const DISALLOW_DCBOR_SIMPLES: u32 = 0x0100;
    /// Copy every decoded string into the string allocator pool
    pub const ALLOC_ALL_STRINGS: u32 = 0x0200;

    /// Preferred serialization: definite lengths and shortest-form numbers only
    pub const PREFERRED: u32 = NO_INDEF_LENGTH | ONLY_PREFERRED_NUMBERS | ONLY_PREFERRED_BIG_NUMBERS;
    /// CBOR Common Deterministic Encoding: preferred serialization plus sorted maps
    pub const CDE: u32 = PREFERRED | ONLY_SORTED_MAPS;
    /// dCBOR application profile: CDE plus reduced floats and restricted simples
    pub const DCBOR: u32 = CDE | ONLY_REDUCED_FLOATS | DISALLOW_DCBOR_SIMPLES;
}
