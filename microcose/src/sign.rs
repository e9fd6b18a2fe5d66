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
 * COSE_Sign1 and COSE_Sign
 *
 * A COSE_Sign1 is (an optional tag 18 around) a four-element array: protected headers
 * bstr, unprotected headers map, payload, signature. The signed bytes are the
 * Sig_structure of RFC 9052 section 4.4: a canonical array of the context string, the
 * body protected bucket, the per-signer protected bucket (COSE_Sign only), the external
 * AAD and the payload. COSE_Sign adds an array of per-signer structures, each carrying
 * its own header buckets and signature.
 **************************************************************************************************/
use crate::constants::*;
use crate::crypto::{Signer, Verifier};
use crate::error::{CoseError, Result};
use crate::message::{Payload, SIGN1_TAGS, SIGN_TAGS};
use crate::params::{
    common_params, headers_decode, headers_encode_protected, headers_encode_unprotected, Location,
    ParamStorage, Parameter, SpecialDecodeFn,
};

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcbor::types::Value;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// One signer of a COSE_Sign message: its header parameters and its signing capability.
pub struct SignerEntry<'a, 'buf> {
    pub params: &'a [Parameter<'buf>],
    pub signer: &'a mut dyn Signer,
}

/// A decoded COSE_Sign1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sign1Message<'buf> {
    /// Raw content of the protected bucket (the map bytes; empty when no parameters)
    pub protected: &'buf [u8],
    /// The payload, `None` when detached
    pub payload: Option<&'buf [u8]>,
    pub signature: &'buf [u8],
}

/// One decoded signature of a COSE_Sign.
#[derive(Copy, Clone, Debug, Default)]
pub struct SignatureInfo<'buf> {
    /// Raw content of the signer's protected bucket
    pub protected: &'buf [u8],
    pub signature: &'buf [u8],
}

/// A decoded COSE_Sign.
#[derive(Copy, Clone, Debug)]
pub struct SignMessage<'buf> {
    pub protected: &'buf [u8],
    pub payload: Option<&'buf [u8]>,
    pub n_signatures: usize,
}

/***************************************************************************************************
 * COSE_Sign1
 **************************************************************************************************/

/// Encode and sign a COSE_Sign1 into `enc`. `params` must include the protected alg
/// parameter matching `signer`. `scratch` holds the Sig_structure and the raw signature
/// while the message is assembled; it must be at least the encoded protected headers plus
/// payload plus signature in size.
#[cfg_attr(feature = "trace", trace)]
pub fn sign1_encode(
    enc: &mut Encoder,
    params: &[Parameter],
    payload: Payload,
    external_aad: &[u8],
    signer: &mut dyn Signer,
    scratch: &mut [u8],
    include_tag: bool,
) -> Result<()> {
    let common = common_params(params, Location::Body)?;
    if common.alg != signer.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }

    if include_tag {
        enc.add_tag(TAG_COSE_SIGN1)?;
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

    let sig_size = signer.signature_size();
    if scratch.len() <= sig_size {
        return Err(CoseError::ScratchTooSmall);
    }
    let (tbs_buf, sig_buf) = scratch.split_at_mut(scratch.len() - sig_size);
    let sig_len = {
        let protected = enc.bytes_between(p0, p1)?;
        let tbs = to_be_signed(
            tbs_buf,
            CONTEXT_SIGNATURE1,
            protected,
            None,
            external_aad,
            payload.bytes(),
        )?;
        signer.sign(tbs, sig_buf)?
    };
    enc.add_bytes(&sig_buf[..sig_len])?;
    enc.close_array()?;
    Ok(())
}

/// Decode a COSE_Sign1 (tag 18 or untagged) at the decoder's position. Header parameters
/// land in `storage`; `special` handles non-scalar parameter values.
#[cfg_attr(feature = "trace", trace)]
pub fn sign1_decode<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    special: Option<SpecialDecodeFn<'buf>>,
) -> Result<Sign1Message<'buf>> {
    dec.set_tag_handlers(&SIGN1_TAGS);
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
    let signature = match dec.next().map_err(CoseError::from)?.value {
        Value::Bstr(b) => b,
        _ => return Err(CoseError::MessageFormat),
    };
    dec.exit_array()?;
    Ok(Sign1Message {
        protected,
        payload,
        signature,
    })
}

/// Verify a decoded COSE_Sign1. `params` are the decoded body parameters;
/// `detached_payload` supplies the payload when the message carries nil.
#[cfg_attr(feature = "trace", trace)]
pub fn sign1_verify(
    msg: &Sign1Message,
    params: &[Parameter],
    external_aad: &[u8],
    detached_payload: Option<&[u8]>,
    verifier: &dyn Verifier,
    scratch: &mut [u8],
) -> Result<()> {
    let common = common_params(params, Location::Body)?;
    if common.alg != verifier.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let payload = match msg.payload {
        Some(b) => b,
        None => detached_payload.ok_or(CoseError::PayloadMissing)?,
    };
    let tbs = to_be_signed_wrapping(
        scratch,
        CONTEXT_SIGNATURE1,
        msg.protected,
        None,
        external_aad,
        payload,
    )?;
    verifier.verify(tbs, msg.signature)
}

/***************************************************************************************************
 * COSE_Sign
 **************************************************************************************************/

/// Encode and sign a COSE_Sign with one signature per entry of `signers`.
#[cfg_attr(feature = "trace", trace)]
pub fn sign_encode(
    enc: &mut Encoder,
    body_params: &[Parameter],
    payload: Payload,
    external_aad: &[u8],
    signers: &mut [SignerEntry],
    scratch: &mut [u8],
    include_tag: bool,
) -> Result<()> {
    if include_tag {
        enc.add_tag(TAG_COSE_SIGN)?;
    }
    enc.open_array()?;
    let bp0 = enc.tell();
    headers_encode_protected(enc, body_params, Location::Body)?;
    let bp1 = enc.tell();
    headers_encode_unprotected(enc, body_params, Location::Body)?;
    match payload.attached() {
        Some(b) => enc.add_bytes(b)?,
        None => enc.add_null()?,
    }

    // The body protected bytes are needed for every signer while the encoder moves on,
    // so they are staged into the front of the scratch buffer
    let bp_len = bp1 - bp0;
    if bp_len >= scratch.len() {
        return Err(CoseError::ScratchTooSmall);
    }
    let (bp_buf, rest) = scratch.split_at_mut(bp_len);
    bp_buf.copy_from_slice(enc.bytes_between(bp0, bp1)?);

    enc.open_array()?;
    for (i, entry) in signers.iter_mut().enumerate() {
        let location = Location::Signer(i as u8);
        let common = common_params(entry.params, location)?;
        if common.alg != entry.signer.algorithm() {
            return Err(CoseError::AlgorithmMismatch);
        }
        enc.open_array()?;
        let sp0 = enc.tell();
        headers_encode_protected(enc, entry.params, location)?;
        let sp1 = enc.tell();
        headers_encode_unprotected(enc, entry.params, location)?;

        let sig_size = entry.signer.signature_size();
        if rest.len() <= sig_size {
            return Err(CoseError::ScratchTooSmall);
        }
        let (tbs_buf, sig_buf) = rest.split_at_mut(rest.len() - sig_size);
        let sig_len = {
            let sign_protected = enc.bytes_between(sp0, sp1)?;
            let tbs = to_be_signed(
                tbs_buf,
                CONTEXT_SIGNATURE,
                bp_buf,
                Some(sign_protected),
                external_aad,
                payload.bytes(),
            )?;
            entry.signer.sign(tbs, sig_buf)?
        };
        enc.add_bytes(&sig_buf[..sig_len])?;
        enc.close_array()?;
    }
    enc.close_array()?;
    enc.close_array()?;
    Ok(())
}

/// Decode a COSE_Sign (tag 98 or untagged). Body parameters land in `storage`; each
/// signer's parameters follow at `Location::Signer(i)`, and its protected bytes and
/// signature fill `signatures[i]`.
#[cfg_attr(feature = "trace", trace)]
pub fn sign_decode<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    signatures: &mut [SignatureInfo<'buf>],
    special: Option<SpecialDecodeFn<'buf>>,
) -> Result<SignMessage<'buf>> {
    dec.set_tag_handlers(&SIGN_TAGS);
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

    dec.enter_array()?;
    let mut n_signatures = 0usize;
    loop {
        match dec.enter_array() {
            Ok(sig_envelope) => {
                if sig_envelope.container_count() != Some(3) {
                    return Err(CoseError::MessageFormat);
                }
            }
            Err(microcbor::error::CBORError::NoMoreItems) => break,
            Err(e) => return Err(e.into()),
        }
        if n_signatures == signatures.len() {
            return Err(CoseError::TooManySigners);
        }
        let sign_protected =
            headers_decode(dec, storage, Location::Signer(n_signatures as u8), special)?;
        let signature = match dec.next().map_err(CoseError::from)?.value {
            Value::Bstr(b) => b,
            _ => return Err(CoseError::MessageFormat),
        };
        dec.exit_array()?;
        signatures[n_signatures] = SignatureInfo {
            protected: sign_protected,
            signature,
        };
        n_signatures += 1;
    }
    dec.exit_array()?;
    dec.exit_array()?;
    Ok(SignMessage {
        protected,
        payload,
        n_signatures,
    })
}

/// Verify one signature of a decoded COSE_Sign.
#[cfg_attr(feature = "trace", trace)]
pub fn sign_verify_signature(
    msg: &SignMessage,
    info: &SignatureInfo,
    params: &[Parameter],
    signer_index: u8,
    external_aad: &[u8],
    detached_payload: Option<&[u8]>,
    verifier: &dyn Verifier,
    scratch: &mut [u8],
) -> Result<()> {
    let common = common_params(params, Location::Signer(signer_index))?;
    if common.alg != verifier.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let payload = match msg.payload {
        Some(b) => b,
        None => detached_payload.ok_or(CoseError::PayloadMissing)?,
    };
    let tbs = to_be_signed_wrapping(
        scratch,
        CONTEXT_SIGNATURE,
        msg.protected,
        Some(info.protected),
        external_aad,
        payload,
    )?;
    verifier.verify(tbs, info.signature)
}

/***************************************************************************************************
 * Sig_structure construction
 **************************************************************************************************/

/// Build a Sig_structure from already-encoded protected buckets (each a complete bstr
/// item). Returns the encoded bytes within `buf`.
pub(crate) fn to_be_signed<'s>(
    buf: &'s mut [u8],
    context: &str,
    body_protected_item: &[u8],
    sign_protected_item: Option<&[u8]>,
    external_aad: &[u8],
    payload: &[u8],
) -> Result<&'s [u8]> {
    let mut enc = Encoder::new(buf);
    enc.open_array()?;
    enc.add_text(context)?;
    enc.add_encoded(body_protected_item)?;
    if let Some(sp) = sign_protected_item {
        enc.add_encoded(sp)?;
    }
    enc.add_bytes(external_aad)?;
    enc.add_bytes(payload)?;
    enc.close_array()?;
    enc.finish().map_err(|e| match e {
        microcbor::error::CBORError::BufferTooSmall => CoseError::ScratchTooSmall,
        other => CoseError::Cbor(other),
    })
}

/// As [`to_be_signed`], from the raw protected map content (decode side), re-wrapping it
/// into a bstr item.
pub(crate) fn to_be_signed_wrapping<'s>(
    buf: &'s mut [u8],
    context: &str,
    body_protected_content: &[u8],
    sign_protected_content: Option<&[u8]>,
    external_aad: &[u8],
    payload: &[u8],
) -> Result<&'s [u8]> {
    let mut enc = Encoder::new(buf);
    enc.open_array()?;
    enc.add_text(context)?;
    enc.add_bytes(body_protected_content)?;
    if let Some(sp) = sign_protected_content {
        enc.add_bytes(sp)?;
    }
    enc.add_bytes(external_aad)?;
    enc.add_bytes(payload)?;
    enc.close_array()?;
    enc.finish().map_err(|e| match e {
        microcbor::error::CBORError::BufferTooSmall => CoseError::ScratchTooSmall,
        other => CoseError::Cbor(other),
    })
}

