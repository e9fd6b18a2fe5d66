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
 * Decoded item representation
 *
 * A decoded item is a tagged value carrying its map label, its nesting levels, and the tag
 * numbers left attached to it. Items may borrow immutably from the input buffer or from the
 * string allocator pool, which must therefore outlive the item itself - this is the 'buf
 * lifetime. Items must not be retained beyond the owning input or pool; nothing is copied.
 **************************************************************************************************/
use crate::constants::{INDEFINITE_COUNT, MAX_TAGS_PER_ITEM, TAG_SLOT_NONE};
use crate::error::CBORError;

use std::convert::TryFrom;

/// The mantissa of a decimal fraction or bigfloat: a native integer or a bignum slice.
#[derive(PartialEq, Debug, Copy, Clone)]
pub enum Mantissa<'buf> {
    /// Mantissa fits a signed 64 bit integer
    Int(i64),
    /// Mantissa in (i64::MAX, u64::MAX]
    UInt(u64),
    /// Positive bignum mantissa
    PosBignum(&'buf [u8]),
    /// Negative bignum mantissa (value is -1 - n)
    NegBignum(&'buf [u8]),
}

/// The closed set of values the decoder may emit.
///
/// Representations follow the smallest faithful native type:
///
/// - Integers in [i64::MIN, i64::MAX] are `Int`; positive values above that are `UInt`;
///   negative values below i64::MIN (CBOR can express down to -2^64) are `NegInt65`,
///   holding n where the value is -1 - n.
/// - `bstr` and `tstr` are immutable borrowed slices over the input (or the allocator pool
///   for concatenated indefinite length strings).
/// - Arrays and maps carry their element (or pair) count; `INDEFINITE_COUNT` for
///   indefinite length. Contents follow as separate items in pre-order.
/// - Half precision floats are widened to `Float64` on decode.
#[derive(PartialEq, Debug, Copy, Clone)]
pub enum Value<'buf> {
    /// Emitted by operations that became no-ops after a sticky error
    None,
    Int(i64),
    UInt(u64),
    /// A negative integer in [-2^64, i64::MIN); holds n, the value is -1 - n
    NegInt65(u64),
    Bstr(&'buf [u8]),
    Tstr(&'buf str),
    /// Array header; the count, or `INDEFINITE_COUNT`
    Array(u16),
    /// Map header; the pair count, or `INDEFINITE_COUNT`
    Map(u16),
    False,
    True,
    Null,
    Undefined,
    /// A simple value outside 20..=23
    Simple(u8),
    Float32(f32),
    Float64(f64),
    /// Tag 0 content
    DateString(&'buf str),
    /// Tag 1 content; fraction is 0.0 for integer epochs
    Epoch { seconds: i64, fraction: f64 },
    /// Tag 1004 content
    DaysString(&'buf str),
    /// Tag 100 content
    EpochDays(i64),
    /// Tag 2 content
    PosBignum(&'buf [u8]),
    /// Tag 3 content (value is -1 - n)
    NegBignum(&'buf [u8]),
    /// Tag 4 content
    DecimalFraction { exponent: i64, mantissa: Mantissa<'buf> },
    /// Tag 5 content
    BigFloat { exponent: i64, mantissa: Mantissa<'buf> },
    /// Tag 32 content
    Uri(&'buf str),
    /// Tag 33 content
    Base64Url(&'buf str),
    /// Tag 34 content
    Base64(&'buf str),
    /// Tag 35 content
    Regex(&'buf str),
    /// Tag 36 content
    Mime(&'buf str),
    /// Tag 257 content
    BinaryMime(&'buf [u8]),
    /// Tag 37 content
    Uuid(&'buf [u8]),
    /// Tag 24 content: one encoded CBOR item
    WrappedCbor(&'buf [u8]),
    /// Tag 63 content: an encoded CBOR sequence
    WrappedCborSequence(&'buf [u8]),
}

impl<'buf> Value<'buf> {
    /// The coarse kind of this value, used for expected-type checks in batch map search.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Int(_) | Value::UInt(_) | Value::NegInt65(_) => ValueKind::Integer,
            Value::Bstr(_) => ValueKind::Bstr,
            Value::Tstr(_) => ValueKind::Tstr,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::False | Value::True => ValueKind::Bool,
            Value::Null => ValueKind::Null,
            Value::Undefined => ValueKind::Undefined,
            Value::Simple(_) => ValueKind::Simple,
            Value::Float32(_) | Value::Float64(_) => ValueKind::Float,
            Value::DateString(_) | Value::DaysString(_) => ValueKind::DateString,
            Value::Epoch { .. } | Value::EpochDays(_) => ValueKind::Epoch,
            Value::PosBignum(_) | Value::NegBignum(_) => ValueKind::Bignum,
            Value::DecimalFraction { .. } | Value::BigFloat { .. } => ValueKind::ExpMantissa,
            Value::Uri(_)
            | Value::Base64Url(_)
            | Value::Base64(_)
            | Value::Regex(_)
            | Value::Mime(_) => ValueKind::TaggedTstr,
            Value::BinaryMime(_) | Value::Uuid(_) => ValueKind::TaggedBstr,
            Value::WrappedCbor(_) | Value::WrappedCborSequence(_) => ValueKind::WrappedCbor,
        }
    }
}

/// Coarse value discriminants for expected-type checks.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ValueKind {
    None,
    Integer,
    Bstr,
    Tstr,
    Array,
    Map,
    Bool,
    Null,
    Undefined,
    Simple,
    Float,
    DateString,
    Epoch,
    Bignum,
    ExpMantissa,
    TaggedTstr,
    TaggedBstr,
    WrappedCbor,
}

/// A map label. Aggregate labels are not supported; integer and string labels cover the
/// protocols this implementation targets.
#[derive(PartialEq, Debug, Copy, Clone)]
pub enum Label<'buf> {
    /// The item is not a direct member of a map
    None,
    Int(i64),
    /// An unsigned label in (i64::MAX, u64::MAX]
    UInt(u64),
    Bstr(&'buf [u8]),
    Tstr(&'buf str),
}

impl<'buf> From<i64> for Label<'buf> {
    #[inline(always)]
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl<'buf> From<u64> for Label<'buf> {
    #[inline(always)]
    fn from(v: u64) -> Self {
        if v <= i64::MAX as u64 {
            Label::Int(v as i64)
        } else {
            Label::UInt(v)
        }
    }
}

impl<'buf> From<&'buf str> for Label<'buf> {
    #[inline(always)]
    fn from(v: &'buf str) -> Self {
        Label::Tstr(v)
    }
}

impl<'buf> From<&'buf [u8]> for Label<'buf> {
    #[inline(always)]
    fn from(v: &'buf [u8]) -> Self {
        Label::Bstr(v)
    }
}

/// The tag numbers left attached to an item, innermost first. Tag numbers below
/// `TAG_SLOT_BASE` are stored directly; larger ones are represented by a slot referring to
/// the decoder's per-instance mapping table and must be resolved through
/// [`crate::decoder::Decoder::resolve_tag`].
#[derive(PartialEq, Debug, Copy, Clone)]
pub struct TagSet {
    pub(crate) slots: [u16; MAX_TAGS_PER_ITEM],
}

impl TagSet {
    /// A tag set with no tags attached.
    pub const fn empty() -> TagSet {
        TagSet {
            slots: [TAG_SLOT_NONE; MAX_TAGS_PER_ITEM],
        }
    }

    /// Return `true` if no tag numbers are attached.
    pub fn is_empty(&self) -> bool {
        self.slots[0] == TAG_SLOT_NONE
    }

    /// The `n`th tag slot, innermost first.
    pub fn slot(&self, n: usize) -> Option<u16> {
        if n < MAX_TAGS_PER_ITEM && self.slots[n] != TAG_SLOT_NONE {
            Some(self.slots[n])
        } else {
            None
        }
    }

    /// Number of attached tag numbers.
    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|s| **s != TAG_SLOT_NONE).count()
    }
}

/// One decoded CBOR item.
#[derive(PartialEq, Debug, Copy, Clone)]
pub struct Item<'buf> {
    /// The decoded value
    pub value: Value<'buf>,
    /// The map label, when the item is a direct member of a map
    pub label: Label<'buf>,
    /// Nesting depth at which this item sits (0 = top level)
    pub nest_level: u8,
    /// Nesting depth of the item that follows, reflecting any container closures this item
    /// completes
    pub next_nest_level: u8,
    /// Unconsumed tag numbers, innermost first
    pub tags: TagSet,
    /// The value string borrows from the allocator pool, not the input
    pub value_from_pool: bool,
    /// The label string borrows from the allocator pool, not the input
    pub label_from_pool: bool,
}

impl<'buf> Item<'buf> {
    /// The zero item returned by no-op operations.
    pub const fn none() -> Item<'buf> {
        Item {
            value: Value::None,
            label: Label::None,
            nest_level: 0,
            next_nest_level: 0,
            tags: TagSet::empty(),
            value_from_pool: false,
            label_from_pool: false,
        }
    }

    /// Convert an integer-typed item to `i64`. `ConversionOverflow` for positive values
    /// above i64::MAX, `ConversionUnderflow` below i64::MIN. Both are recoverable.
    pub fn as_i64(&self) -> crate::error::Result<i64> {
        match self.value {
            Value::Int(v) => Ok(v),
            Value::UInt(_) => Err(CBORError::ConversionOverflow),
            Value::NegInt65(_) => Err(CBORError::ConversionUnderflow),
            _ => Err(CBORError::IncompatibleType),
        }
    }

    /// Convert an integer-typed item to `u64`. Negative values underflow.
    pub fn as_u64(&self) -> crate::error::Result<u64> {
        match self.value {
            Value::Int(v) if v >= 0 => Ok(v as u64),
            Value::Int(_) | Value::NegInt65(_) => Err(CBORError::ConversionUnderflow),
            Value::UInt(v) => Ok(v),
            _ => Err(CBORError::IncompatibleType),
        }
    }

    /// Convert a float- or integer-typed item to `f64`.
    pub fn as_f64(&self) -> crate::error::Result<f64> {
        match self.value {
            Value::Float64(v) => Ok(v),
            Value::Float32(v) => Ok(v as f64),
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            _ => Err(CBORError::IncompatibleType),
        }
    }

    /// The array element count or map pair count, when the item is a container header.
    /// `None` for indefinite length containers.
    pub fn container_count(&self) -> Option<u16> {
        match self.value {
            Value::Array(n) | Value::Map(n) if n != INDEFINITE_COUNT => Some(n),
            _ => None,
        }
    }
}

/***************************************************************************************************
 * Standard Trait Implementations: Try to convert an Item into a value. Always fallible
 **************************************************************************************************/

/// Attempt to convert an item into bool
impl<'buf> TryFrom<&Item<'buf>> for bool {
    type Error = CBORError;

    fn try_from(item: &Item<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::True => Ok(true),
            Value::False => Ok(false),
            _ => Err(CBORError::IncompatibleType),
        }
    }
}

/// Attempt to convert an item into i64
impl<'buf> TryFrom<&Item<'buf>> for i64 {
    type Error = CBORError;

    fn try_from(item: &Item<'buf>) -> Result<Self, Self::Error> {
        item.as_i64()
    }
}

/// Attempt to convert an item into u64
impl<'buf> TryFrom<&Item<'buf>> for u64 {
    type Error = CBORError;

    fn try_from(item: &Item<'buf>) -> Result<Self, Self::Error> {
        item.as_u64()
    }
}

/// Attempt to convert an item into f64
impl<'buf> TryFrom<&Item<'buf>> for f64 {
    type Error = CBORError;

    fn try_from(item: &Item<'buf>) -> Result<Self, Self::Error> {
        item.as_f64()
    }
}

/// Attempt to convert an item into a &str
///
/// # Lifetime
///
/// The lifetime of the str is the lifetime of the underlying input buffer or allocator
/// pool on which the item is bounded.
impl<'buf> TryFrom<&Item<'buf>> for &'buf str {
    type Error = CBORError;

    fn try_from(item: &Item<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::Tstr(s) => Ok(s),
            _ => Err(CBORError::IncompatibleType),
        }
    }
}

/// Attempt to convert an item into a &[u8]
///
/// # Lifetime
///
/// The lifetime of the &[u8] is the lifetime of the underlying input buffer or allocator
/// pool on which the item is bounded.
impl<'buf> TryFrom<&Item<'buf>> for &'buf [u8] {
    type Error = CBORError;

    fn try_from(item: &Item<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::Bstr(b) => Ok(b),
            _ => Err(CBORError::IncompatibleType),
        }
    }
}
