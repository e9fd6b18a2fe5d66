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
 * COSE_Mac0
 *
 * Mirrors COSE_Sign1 with an authentication tag in place of the signature. The MACed
 * bytes are the MAC_structure with context string "MAC0".
 **************************************************************************************************/
use crate::constants::*;
use crate::crypto::MacProvider;
use crate::error::{CoseError, Result};
use crate::message::{Payload, MAC0_TAGS};
use crate::params::{
    common_params, headers_decode, headers_encode_protected, headers_encode_unprotected, Location,
    ParamStorage, Parameter, SpecialDecodeFn,
};
use crate::sign::{to_be_signed, to_be_signed_wrapping};

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcbor::types::Value;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A decoded COSE_Mac0.
#[derive(Copy, Clone, Debug)]
pub struct Mac0Message<'buf> {
    /// Raw content of the protected bucket
    pub protected: &'buf [u8],
    /// The payload, `None` when detached
    pub payload: Option<&'buf [u8]>,
    pub tag: &'buf [u8],
}

/// Encode and authenticate a COSE_Mac0 into `enc`.
#[cfg_attr(feature = "trace", trace)]
pub fn mac0_encode(
    enc: &mut Encoder,
    params: &[Parameter],
    payload: Payload,
    external_aad: &[u8],
    mac: &mut dyn MacProvider,
    scratch: &mut [u8],
    include_tag: bool,
) -> Result<()> {
    let common = common_params(params, Location::Body)?;
    if common.alg != mac.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }

    if include_tag {
        enc.add_tag(TAG_COSE_MAC0)?;
    }
    enc.open_array()?;
    let p0 = enc.tell();
    headers_encode_protected(enc, params, Location::Body)?;
    let p1 = enc.tell();
    headers_encode_unprotected(enc, params, Location::Body)?;
    match payload.attached() {
        Some(b) => enc.add_bytes(b)?,
        None => enc.add_null()?,
    }

    let tag_size = mac.tag_size();
    if scratch.len() <= tag_size {
        return Err(CoseError::ScratchTooSmall);
    }
    let (tbm_buf, tag_buf) = scratch.split_at_mut(scratch.len() - tag_size);
    let tag_len = {
        let protected = enc.bytes_between(p0, p1)?;
        let tbm = to_be_signed(
            tbm_buf,
            CONTEXT_MAC0,
            protected,
            None,
            external_aad,
            payload.bytes(),
        )?;
        mac.compute(tbm, tag_buf)?
    };
    enc.add_bytes(&tag_buf[..tag_len])?;
    enc.close_array()?;
    Ok(())
}

/// Decode a COSE_Mac0 (tag 17 or untagged) at the decoder's position.
#[cfg_attr(feature = "trace", trace)]
pub fn mac0_decode<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    special: Option<SpecialDecodeFn<'buf>>,
) -> Result<Mac0Message<'buf>> {
    dec.set_tag_handlers(&MAC0_TAGS);
    let envelope = dec.enter_array()?;
    if envelope.container_count() != Some(4) {
        return Err(CoseError::MessageFormat);
    }
    let protected = headers_decode(dec, storage, Location::Body, special)?;
    let payload = match dec.next().map_err(CoseError::from)?.value {
        Value::Bstr(b) => Some(b),
        Value::Null => None,
        _ => return Err(CoseError::MessageFormat),
    };
    let tag = match dec.next().map_err(CoseError::from)?.value {
        Value::Bstr(b) => b,
        _ => return Err(CoseError::MessageFormat),
    };
    dec.exit_array()?;
    Ok(Mac0Message {
        protected,
        payload,
        tag,
    })
}

/// Verify a decoded COSE_Mac0.
#[cfg_attr(feature = "trace", trace)]
pub fn mac0_verify(
    msg: &Mac0Message,
    params: &[Parameter],
    external_aad: &[u8],
    detached_payload: Option<&[u8]>,
    mac: &dyn MacProvider,
    scratch: &mut [u8],
) -> Result<()> {
    let common = common_params(params, Location::Body)?;
    if common.alg != mac.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let payload = match msg.payload {
        Some(b) => b,
        None => detached_payload.ok_or(CoseError::PayloadMissing)?,
    };
    let tbm = to_be_signed_wrapping(
        scratch,
        CONTEXT_MAC0,
        msg.protected,
        None,
        external_aad,
        payload,
    )?;
    mac.verify(tbm, msg.tag)
}
