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
 * COSE header parameter engine
 *
 * Every COSE message carries a pair of parameter maps: a protected bucket wrapped in a
 * byte string (so its exact encoded form is reproducible for signing) and an unprotected
 * bucket emitted inline. This module encodes and decodes both buckets, enforces the
 * critical-parameter rules of RFC 9052 section 3.1, detects duplicate labels across the
 * pair, and projects the registry parameters into a flat record.
 *
 * Storage is caller supplied: parameters decode into a `ParamStorage` pool, appended after
 * anything already there (a multi-layer message decodes each layer into the same pool with
 * a distinct location).
 **************************************************************************************************/
use crate::constants::{label, MAX_CRITICAL_INT_LABELS, MAX_CRITICAL_TSTR_LABELS};
use crate::crypto::KeyHandle;
use crate::error::{CoseError, Result};

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcbor::types::{Item, Label, Value};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Where in the message a parameter sits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Location {
    /// The body header buckets
    Body,
    /// The Nth signer of a COSE_Sign
    Signer(u8),
    /// The Nth recipient of a COSE_Encrypt
    Recipient(u8),
    /// The Nth countersignature
    CounterSign(u8),
}

/// The Y coordinate of an EC2 key: a full byte string or its compressed-point sign.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum YCoord<'buf> {
    Sign(bool),
    Bytes(&'buf [u8]),
}

/// A decoded ECDH ephemeral public key.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EphemeralKey<'buf> {
    pub crv: i64,
    pub x: &'buf [u8],
    pub y: YCoord<'buf>,
}

/// A header parameter value. `Empty` marks a parameter whose value was skipped because
/// nothing understood it; `Ephemeral` and `Key` are produced by special decoders.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ParamValue<'buf> {
    Empty,
    Int(i64),
    Bstr(&'buf [u8]),
    Tstr(&'buf str),
    Bool(bool),
    Ephemeral(EphemeralKey<'buf>),
    Key(KeyHandle),
}

/// One header parameter.
#[derive(Copy, Clone, Debug)]
pub struct Parameter<'buf> {
    /// Integer label from the COSE Header Parameters registry (or a private-use value)
    pub label: i64,
    pub value: ParamValue<'buf>,
    /// The parameter lives in the protected bucket
    pub protected: bool,
    /// The parameter is listed in (or destined for) the crit list
    pub critical: bool,
    pub location: Location,
}

impl<'buf> Parameter<'buf> {
    /// An unprotected body parameter.
    pub fn new(param_label: i64, value: ParamValue<'buf>) -> Parameter<'buf> {
        Parameter {
            label: param_label,
            value,
            protected: false,
            critical: false,
            location: Location::Body,
        }
    }

    /// The algorithm parameter. Always protected.
    pub fn alg(alg: i64) -> Parameter<'buf> {
        Parameter::new(label::ALG, ParamValue::Int(alg)).protect()
    }

    /// The key identifier parameter.
    pub fn kid(kid: &'buf [u8]) -> Parameter<'buf> {
        Parameter::new(label::KID, ParamValue::Bstr(kid))
    }

    /// The full initialization vector parameter.
    pub fn iv(iv: &'buf [u8]) -> Parameter<'buf> {
        Parameter::new(label::IV, ParamValue::Bstr(iv))
    }

    /// The partial initialization vector parameter.
    pub fn partial_iv(piv: &'buf [u8]) -> Parameter<'buf> {
        Parameter::new(label::PARTIAL_IV, ParamValue::Bstr(piv))
    }

    /// An integer content type parameter.
    pub fn content_type_int(ct: u16) -> Parameter<'buf> {
        Parameter::new(label::CONTENT_TYPE, ParamValue::Int(ct as i64))
    }

    /// A text content type parameter.
    pub fn content_type_text(ct: &'buf str) -> Parameter<'buf> {
        Parameter::new(label::CONTENT_TYPE, ParamValue::Tstr(ct))
    }

    /// Move the parameter into the protected bucket.
    pub fn protect(mut self) -> Parameter<'buf> {
        self.protected = true;
        self
    }

    /// Mark the parameter critical. It is synthesised into the crit list on encode.
    pub fn criticalize(mut self) -> Parameter<'buf> {
        self.critical = true;
        self
    }

    /// Place the parameter at `location`.
    pub fn at(mut self, location: Location) -> Parameter<'buf> {
        self.location = location;
        self
    }
}

/// The caller supplied parameter pool.
#[derive(Debug)]
pub struct ParamStorage<'a, 'buf> {
    slots: &'a mut [Parameter<'buf>],
    used: usize,
}

impl<'a, 'buf> ParamStorage<'a, 'buf> {
    /// Construct a pool over `slots`.
    pub fn new(slots: &'a mut [Parameter<'buf>]) -> ParamStorage<'a, 'buf> {
        ParamStorage { slots, used: 0 }
    }

    /// Append one parameter.
    pub fn push(&mut self, p: Parameter<'buf>) -> Result<()> {
        if self.used == self.slots.len() {
            return Err(CoseError::TooManyParameters);
        }
        self.slots[self.used] = p;
        self.used += 1;
        Ok(())
    }

    /// The decoded parameters.
    pub fn params(&self) -> &[Parameter<'buf>] {
        &self.slots[..self.used]
    }

    /// Number of parameters in the pool.
    pub fn len(&self) -> usize {
        self.used
    }

    /// Return `true` if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    fn slice_mut(&mut self) -> &mut [Parameter<'buf>] {
        &mut self.slots[..self.used]
    }
}

/// A caller supplied decoder for parameter values the engine does not handle natively
/// (anything that is not an integer, string or boolean). Called with the decoder
/// positioned after the value's header item, the header item itself, and the parameter
/// record to fill in. `Ok(true)` when the value was consumed and the record populated;
/// `Ok(false)` to decline, leaving the decoder untouched.
pub type SpecialDecodeFn<'buf> =
    fn(&mut Decoder<'buf>, &Item<'buf>, &mut Parameter<'buf>) -> Result<bool>;

/// The collected critical labels of one header pair.
struct CritList<'buf> {
    ints: [i64; MAX_CRITICAL_INT_LABELS],
    n_ints: usize,
    tstrs: [&'buf str; MAX_CRITICAL_TSTR_LABELS],
    n_tstrs: usize,
}

impl<'buf> CritList<'buf> {
    fn new() -> CritList<'buf> {
        CritList {
            ints: [0; MAX_CRITICAL_INT_LABELS],
            n_ints: 0,
            tstrs: [""; MAX_CRITICAL_TSTR_LABELS],
            n_tstrs: 0,
        }
    }

    fn push_int(&mut self, v: i64) -> Result<()> {
        if self.n_ints == MAX_CRITICAL_INT_LABELS {
            return Err(CoseError::TooManyCriticalParameters);
        }
        self.ints[self.n_ints] = v;
        self.n_ints += 1;
        Ok(())
    }

    fn push_tstr(&mut self, v: &'buf str) -> Result<()> {
        if self.n_tstrs == MAX_CRITICAL_TSTR_LABELS {
            return Err(CoseError::TooManyCriticalParameters);
        }
        self.tstrs[self.n_tstrs] = v;
        self.n_tstrs += 1;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.n_ints == 0 && self.n_tstrs == 0
    }
}

/***************************************************************************************************
 * Encoding
 **************************************************************************************************/

/// Emit the protected bucket of `location` as a byte-string wrapped map. A crit
/// sub-parameter is synthesised when any protected parameter is critical; a critical
/// parameter outside the protected bucket refuses to encode.
#[cfg_attr(feature = "trace", trace)]
pub fn headers_encode_protected(
    enc: &mut Encoder,
    params: &[Parameter],
    location: Location,
) -> Result<()> {
    for p in params.iter() {
        if p.location == location && p.critical && !p.protected {
            return Err(CoseError::CritParameterInUnprotected);
        }
    }
    let mine = || params.iter().filter(move |p| p.location == location && p.protected);
    let n_params = mine().count();
    let n_crit = mine().filter(|p| p.critical).count();

    enc.open_bstr_wrap()?;
    if n_params > 0 {
        enc.open_map()?;
        if n_crit > 0 {
            enc.add_i64(label::CRIT)?;
            enc.open_array()?;
            for p in mine().filter(|p| p.critical) {
                enc.add_i64(p.label)?;
            }
            enc.close_array()?;
        }
        for p in mine() {
            enc.add_i64(p.label)?;
            encode_value(enc, p)?;
        }
        enc.close_map()?;
    }
    enc.close_bstr_wrap()?;
    Ok(())
}

/// Emit the unprotected bucket of `location` as an inline map.
#[cfg_attr(feature = "trace", trace)]
pub fn headers_encode_unprotected(
    enc: &mut Encoder,
    params: &[Parameter],
    location: Location,
) -> Result<()> {
    enc.open_map()?;
    for p in params.iter().filter(|p| p.location == location && !p.protected) {
        enc.add_i64(p.label)?;
        encode_value(enc, p)?;
    }
    enc.close_map()?;
    Ok(())
}

/// Emit both buckets.
pub fn headers_encode(enc: &mut Encoder, params: &[Parameter], location: Location) -> Result<()> {
    headers_encode_protected(enc, params, location)?;
    headers_encode_unprotected(enc, params, location)
}

fn encode_value(enc: &mut Encoder, p: &Parameter) -> Result<()> {
    match p.value {
        ParamValue::Int(v) => enc.add_i64(v)?,
        ParamValue::Bstr(b) => enc.add_bytes(b)?,
        ParamValue::Tstr(s) => enc.add_text(s)?,
        ParamValue::Bool(v) => enc.add_bool(v)?,
        ParamValue::Ephemeral(k) => encode_ephemeral_key(enc, &k)?,
        ParamValue::Empty | ParamValue::Key(_) => return Err(CoseError::ParameterCbor),
    }
    Ok(())
}

/// Emit a COSE_Key map for an EC2 ephemeral public key.
fn encode_ephemeral_key(enc: &mut Encoder, k: &EphemeralKey) -> Result<()> {
    use crate::constants::key;
    enc.open_map()?;
    enc.add_i64(key::KTY)?;
    enc.add_i64(key::KTY_EC2)?;
    enc.add_i64(key::CRV)?;
    enc.add_i64(k.crv)?;
    enc.add_i64(key::X)?;
    enc.add_bytes(k.x)?;
    enc.add_i64(key::Y)?;
    match k.y {
        YCoord::Sign(s) => enc.add_bool(s)?,
        YCoord::Bytes(b) => enc.add_bytes(b)?,
    }
    enc.close_map()?;
    Ok(())
}

/***************************************************************************************************
 * Decoding
 **************************************************************************************************/

/// Decode the protected and unprotected buckets at the decoder's position into `storage`,
/// appending after anything already there. Returns the protected bucket's raw bytes (the
/// wrapped map encoding, possibly empty), needed verbatim for the to-be-signed structure.
///
/// The contract, in order: enter the byte-string wrapped protected map and decode it;
/// decode the inline unprotected map; reject non-integer labels; collect crit (protected
/// bucket only, non-empty); dispatch non-scalar values to `special`; mark parameters the
/// crit list names as critical, requiring them protected and understood; reject duplicate
/// labels across both buckets.
#[cfg_attr(feature = "trace", trace)]
pub fn headers_decode<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    location: Location,
    special: Option<SpecialDecodeFn<'buf>>,
) -> Result<&'buf [u8]> {
    let first = storage.len();
    let mut crit = CritList::new();

    // Protected bucket: a byte string wrapping a map, or empty
    let protected_bytes = dec.enter_bstr_wrapped(None)?;
    if !protected_bytes.is_empty() {
        dec.enter_map()?;
        decode_bucket(dec, storage, location, true, special, &mut crit)?;
        dec.exit_map()?;
    }
    dec.exit_bstr_wrapped()?;

    // Unprotected bucket: an inline map
    dec.enter_map()?;
    decode_bucket(dec, storage, location, false, special, &mut crit)?;
    dec.exit_map()?;

    // Mark critical parameters; every listed label must name a protected, understood
    // parameter of this header pair
    for i in 0..crit.n_ints {
        let wanted = crit.ints[i];
        let mut found = false;
        for p in storage.slice_mut()[first..].iter_mut() {
            if p.label == wanted {
                if !p.protected {
                    return Err(CoseError::ParameterNotProtected);
                }
                if matches!(p.value, ParamValue::Empty) {
                    return Err(CoseError::UnknownCriticalParameter);
                }
                p.critical = true;
                found = true;
            }
        }
        if !found {
            return Err(CoseError::UnknownCriticalParameter);
        }
    }
    // Text labels never match the integer-labeled parameters this engine stores
    if crit.n_tstrs > 0 {
        return Err(CoseError::UnknownCriticalParameter);
    }

    // Duplicate labels across both buckets of one header pair
    let all = storage.params();
    for i in first..all.len() {
        for j in (i + 1)..all.len() {
            if all[i].label == all[j].label && all[i].location == all[j].location {
                return Err(CoseError::DuplicateParameter);
            }
        }
    }

    Ok(protected_bytes)
}

/// Decode the direct members of the entered header map.
fn decode_bucket<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    location: Location,
    protected: bool,
    special: Option<SpecialDecodeFn<'buf>>,
    crit: &mut CritList<'buf>,
) -> Result<()> {
    loop {
        let item = match dec.next() {
            Ok(item) => item,
            Err(microcbor::error::CBORError::NoMoreItems) => break,
            Err(e) => return Err(e.into()),
        };
        let param_label = match item.label {
            Label::Int(v) => v,
            _ => return Err(CoseError::ParameterCbor),
        };
        if param_label == label::CRIT {
            decode_crit(dec, &item, protected, crit)?;
            continue;
        }
        let mut p = Parameter {
            label: param_label,
            value: ParamValue::Empty,
            protected,
            critical: false,
            location,
        };
        match item.value {
            Value::Int(v) => p.value = ParamValue::Int(v),
            Value::Bstr(b) => p.value = ParamValue::Bstr(b),
            Value::Tstr(s) => p.value = ParamValue::Tstr(s),
            Value::True => p.value = ParamValue::Bool(true),
            Value::False => p.value = ParamValue::Bool(false),
            _ => {
                let consumed = match special {
                    Some(f) => f(dec, &item, &mut p)?,
                    None => false,
                };
                if !consumed {
                    // Skip the value; if crit names it the post-pass rejects the message
                    skip_children(dec, &item)?;
                }
            }
        }
        storage.push(p)?;
    }
    Ok(())
}

/// Decode the crit parameter: a non-empty array of integer or text labels, protected
/// bucket only.
fn decode_crit<'buf>(
    dec: &mut Decoder<'buf>,
    item: &Item<'buf>,
    protected: bool,
    crit: &mut CritList<'buf>,
) -> Result<()> {
    if !protected {
        return Err(CoseError::ParameterNotProtected);
    }
    match item.value {
        Value::Array(_) => {}
        _ => return Err(CoseError::ParameterCbor),
    }
    if item.next_nest_level <= item.nest_level {
        // The array closed immediately: it is empty
        return Err(CoseError::EmptyCritList);
    }
    loop {
        let el = dec.next().map_err(CoseError::from)?;
        match el.value {
            Value::Int(v) => crit.push_int(v)?,
            Value::Tstr(s) => crit.push_tstr(s)?,
            _ => return Err(CoseError::ParameterCbor),
        }
        if el.next_nest_level <= item.nest_level {
            break;
        }
    }
    if crit.is_empty() {
        return Err(CoseError::EmptyCritList);
    }
    Ok(())
}

/// Consume the contents of an aggregate value nobody decoded.
fn skip_children<'buf>(dec: &mut Decoder<'buf>, item: &Item<'buf>) -> Result<()> {
    if item.next_nest_level > item.nest_level {
        loop {
            let el = dec.next().map_err(CoseError::from)?;
            if el.next_nest_level <= item.nest_level {
                break;
            }
        }
    }
    Ok(())
}

/***************************************************************************************************
 * Common parameter extraction
 **************************************************************************************************/

/// The content type parameter: absent, a registry integer, or a media type string.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ContentType<'buf> {
    None,
    Int(u16),
    Tstr(&'buf str),
}

/// The registry parameters of one header pair, projected flat.
#[derive(Copy, Clone, Debug)]
pub struct CommonParams<'buf> {
    pub alg: i64,
    pub kid: Option<&'buf [u8]>,
    pub iv: Option<&'buf [u8]>,
    pub partial_iv: Option<&'buf [u8]>,
    pub content_type: ContentType<'buf>,
}

/// Project the parameters of `location` into a [`CommonParams`]. Enforces: alg present,
/// protected, an integer and not the reserved zero; iv and partial-iv mutually exclusive;
/// content type an unsigned integer up to 0xffff or a text string.
#[cfg_attr(feature = "trace", trace)]
pub fn common_params<'buf>(
    params: &[Parameter<'buf>],
    location: Location,
) -> Result<CommonParams<'buf>> {
    let mut out = CommonParams {
        alg: crate::constants::alg::RESERVED,
        kid: None,
        iv: None,
        partial_iv: None,
        content_type: ContentType::None,
    };
    let mut have_alg = false;
    for p in params.iter().filter(|p| p.location == location) {
        match p.label {
            label::ALG => {
                match p.value {
                    ParamValue::Int(v) => out.alg = v,
                    _ => return Err(CoseError::ParameterCbor),
                }
                if !p.protected {
                    return Err(CoseError::ParameterNotProtected);
                }
                have_alg = true;
            }
            label::KID => match p.value {
                ParamValue::Bstr(b) => out.kid = Some(b),
                _ => return Err(CoseError::ParameterCbor),
            },
            label::IV => match p.value {
                ParamValue::Bstr(b) => out.iv = Some(b),
                _ => return Err(CoseError::ParameterCbor),
            },
            label::PARTIAL_IV => match p.value {
                ParamValue::Bstr(b) => out.partial_iv = Some(b),
                _ => return Err(CoseError::ParameterCbor),
            },
            label::CONTENT_TYPE => match p.value {
                ParamValue::Int(v) => {
                    if !(0..=0xffff).contains(&v) {
                        return Err(CoseError::ContentTypeRange);
                    }
                    out.content_type = ContentType::Int(v as u16);
                }
                ParamValue::Tstr(s) => out.content_type = ContentType::Tstr(s),
                _ => return Err(CoseError::ParameterCbor),
            },
            _ => {}
        }
    }
    if !have_alg {
        return Err(CoseError::NoAlgorithm);
    }
    if out.alg == crate::constants::alg::RESERVED {
        return Err(CoseError::ReservedAlgorithm);
    }
    if out.iv.is_some() && out.partial_iv.is_some() {
        return Err(CoseError::DuplicateParameter);
    }
    Ok(out)
}
