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
 * Tag-number dispatch
 *
 * After an item and its prefixed tag numbers have been read, handlers are consulted
 * innermost tag first: a handler may transform the item (e.g. a text string under tag 0
 * becomes a DateString) and consume that tag number. Caller-installed handlers take
 * precedence over the built-in set. Tag numbers nobody consumes raise
 * `UnprocessedTagNumber` unless the permissive compatibility option is set.
 **************************************************************************************************/
use crate::constants::{opts, *};
use crate::error::{CBORError, Result};
use crate::item::{Item, Value};

/// A tag content transform: `Ok(true)` when it consumed the tag, `Ok(false)` to decline;
/// an error aborts the decode and becomes the sticky error. Lifetime-polymorphic so
/// handler tables can live in statics.
pub type TagContentFn = for<'a> fn(u64, &mut Item<'a>) -> Result<bool>;

/// One installable tag handler.
#[derive(Copy, Clone)]
pub struct TagHandler {
    pub tag: u64,
    pub decode: TagContentFn,
}

/// The built-in handler set covering the registry tags the core understands. Decimal
/// fractions and bigfloats (tags 4 and 5) are consumed structurally by the decoder before
/// this point; seeing them here means the tag sat on the wrong content type.
pub(crate) fn builtin_tag_content<'buf>(
    tag: u64,
    item: &mut Item<'buf>,
    options: u32,
) -> Result<bool> {
    match tag {
        TAG_DATE_STRING => match item.value {
            Value::Tstr(s) => {
                validate_rfc3339(s)?;
                item.value = Value::DateString(s);
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_EPOCH_DATE => {
            item.value = decode_epoch(&item.value)?;
            Ok(true)
        }
        TAG_POS_BIGNUM | TAG_NEG_BIGNUM => match item.value {
            Value::Bstr(b) => {
                if options & opts::ONLY_PREFERRED_BIG_NUMBERS != 0 && bignum_fits_native(b) {
                    return Err(CBORError::NotPreferredBigNum);
                }
                item.value = if tag == TAG_POS_BIGNUM {
                    Value::PosBignum(b)
                } else {
                    Value::NegBignum(b)
                };
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_DECIMAL_FRACTION | TAG_BIGFLOAT => match item.value {
            // An entered tag 4/5 array is traversed by the caller; leave the tag attached
            Value::Array(_) => Ok(false),
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        // Expected-encoding hints carry no content constraint
        TAG_B64URL_HINT | TAG_B64_HINT | TAG_B16_HINT => Ok(true),
        TAG_WRAPPED_CBOR => match item.value {
            Value::Bstr(b) => {
                item.value = Value::WrappedCbor(b);
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_WRAPPED_CBOR_SEQUENCE => match item.value {
            Value::Bstr(b) => {
                item.value = Value::WrappedCborSequence(b);
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_URI | TAG_B64URL | TAG_B64 | TAG_REGEX | TAG_MIME => match item.value {
            Value::Tstr(s) => {
                item.value = match tag {
                    TAG_URI => Value::Uri(s),
                    TAG_B64URL => Value::Base64Url(s),
                    TAG_B64 => Value::Base64(s),
                    TAG_REGEX => Value::Regex(s),
                    _ => Value::Mime(s),
                };
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_UUID => match item.value {
            Value::Bstr(b) => {
                item.value = Value::Uuid(b);
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_EPOCH_DAYS => match item.value {
            Value::Int(d) => {
                item.value = Value::EpochDays(d);
                Ok(true)
            }
            Value::UInt(_) | Value::NegInt65(_) => Err(CBORError::DateOverflow),
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_BINARY_MIME => match item.value {
            Value::Bstr(b) => {
                item.value = Value::BinaryMime(b);
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        TAG_DAYS_STRING => match item.value {
            Value::Tstr(s) => {
                validate_date_only(s)?;
                item.value = Value::DaysString(s);
                Ok(true)
            }
            _ => Err(CBORError::UnrecoverableTagContent),
        },
        _ => Ok(false),
    }
}

fn decode_epoch<'buf>(value: &Value<'buf>) -> Result<Value<'buf>> {
    match *value {
        Value::Int(v) => Ok(Value::Epoch {
            seconds: v,
            fraction: 0.0,
        }),
        Value::UInt(_) | Value::NegInt65(_) => Err(CBORError::DateOverflow),
        Value::Float64(v) => split_epoch_float(v),
        Value::Float32(v) => split_epoch_float(v as f64),
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}

fn split_epoch_float<'buf>(v: f64) -> Result<Value<'buf>> {
    if !v.is_finite() || v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return Err(CBORError::DateOverflow);
    }
    let seconds = v.trunc() as i64;
    Ok(Value::Epoch {
        seconds,
        fraction: v - v.trunc(),
    })
}

/// A bignum whose magnitude fits an unsigned 64 bit integer must be encoded as a native
/// integer under preferred serialization.
fn bignum_fits_native(bytes: &[u8]) -> bool {
    let significant = bytes.iter().skip_while(|b| **b == 0).count();
    significant <= 8
}

#[cfg(feature = "full")]
fn validate_rfc3339(s: &str) -> Result<()> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|_| ())
        .map_err(|_| CBORError::UnrecoverableTagContent)
}

#[cfg(not(feature = "full"))]
fn validate_rfc3339(_s: &str) -> Result<()> {
    Ok(())
}

#[cfg(feature = "full")]
fn validate_date_only(s: &str) -> Result<()> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| CBORError::UnrecoverableTagContent)
}

#[cfg(not(feature = "full"))]
fn validate_date_only(_s: &str) -> Result<()> {
    Ok(())
}
