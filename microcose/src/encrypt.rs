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
 * COSE_Encrypt0 and COSE_Encrypt
 *
 * COSE_Encrypt0 carries ciphertext encrypted directly under a key both parties hold.
 * COSE_Encrypt adds a recipient list distributing the content encryption key; recipients
 * have the same header-bucket structure and may nest one level for content key
 * distribution. The additional authenticated data is the Enc_structure of RFC 9052
 * section 5.3. ECDH-ES recipients carry an ephemeral public key header parameter decoded
 * through the special-parameter callback.
 **************************************************************************************************/
use crate::constants::*;
use crate::crypto::{Cipher, KeyAgreement, KeyHandle};
use crate::error::{CoseError, Result};
use crate::message::{ENCRYPT0_TAGS, ENCRYPT_TAGS};
use crate::params::{
    common_params, headers_decode, headers_encode_protected, headers_encode_unprotected,
    EphemeralKey, Location, ParamStorage, ParamValue, Parameter, SpecialDecodeFn, YCoord,
};

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcbor::error::CBORError;
use microcbor::types::{Item, Label, Value};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A decoded COSE_Encrypt0.
#[derive(Copy, Clone, Debug)]
pub struct Encrypt0Message<'buf> {
    /// Raw content of the protected bucket
    pub protected: &'buf [u8],
    pub ciphertext: &'buf [u8],
}

/// A decoded COSE_Encrypt.
#[derive(Copy, Clone, Debug)]
pub struct EncryptMessage<'buf> {
    pub protected: &'buf [u8],
    pub ciphertext: &'buf [u8],
    pub n_recipients: usize,
}

/// One recipient to emit into a COSE_Encrypt. For ECDH-ES direct key agreement the
/// encrypted key is empty and the ephemeral public key travels as a header parameter.
pub struct RecipientEntry<'a, 'buf> {
    pub params: &'a [Parameter<'buf>],
    pub encrypted_key: &'a [u8],
}

/// One decoded recipient. `parent` is set for a nested recipient, referring to the
/// flattened index of the recipient that carries it.
#[derive(Copy, Clone, Debug, Default)]
pub struct RecipientInfo<'buf> {
    /// Raw content of the recipient's protected bucket
    pub protected: &'buf [u8],
    pub encrypted_key: &'buf [u8],
    pub parent: Option<u8>,
}

/***************************************************************************************************
 * COSE_Encrypt0
 **************************************************************************************************/

/// Encrypt `plaintext` and encode a COSE_Encrypt0 into `enc`. The nonce comes from the
/// iv header parameter. `scratch` stages the Enc_structure and the ciphertext.
#[cfg_attr(feature = "trace", trace)]
pub fn encrypt0_encode(
    enc: &mut Encoder,
    params: &[Parameter],
    plaintext: &[u8],
    external_aad: &[u8],
    key: KeyHandle,
    cipher: &mut dyn Cipher,
    scratch: &mut [u8],
    include_tag: bool,
) -> Result<()> {
    let common = common_params(params, Location::Body)?;
    if common.alg != cipher.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let nonce = common.iv.ok_or(CoseError::NonceMissing)?;

    if include_tag {
        enc.add_tag(TAG_COSE_ENCRYPT0)?;
    }
    enc.open_array()?;
    let p0 = enc.tell();
    headers_encode_protected(enc, params, Location::Body)?;
    let p1 = enc.tell();
    headers_encode_unprotected(enc, params, Location::Body)?;

    let ct_size = plaintext.len() + cipher.overhead();
    if scratch.len() <= ct_size {
        return Err(CoseError::ScratchTooSmall);
    }
    let (aad_buf, ct_buf) = scratch.split_at_mut(scratch.len() - ct_size);
    let ct_len = {
        let protected = enc.bytes_between(p0, p1)?;
        let aad = enc_structure(aad_buf, CONTEXT_ENCRYPT0, EncodedProtected::Item(protected), external_aad)?;
        cipher.encrypt(key, nonce, aad, plaintext, ct_buf)?
    };
    enc.add_bytes(&ct_buf[..ct_len])?;
    enc.close_array()?;
    Ok(())
}

/// Decode a COSE_Encrypt0 (tag 16 or untagged) at the decoder's position.
#[cfg_attr(feature = "trace", trace)]
pub fn encrypt0_decode<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    special: Option<SpecialDecodeFn<'buf>>,
) -> Result<Encrypt0Message<'buf>> {
    dec.set_tag_handlers(&ENCRYPT0_TAGS);
    let envelope = dec.enter_array()?;
    if envelope.container_count() != Some(3) {
        return Err(CoseError::MessageFormat);
    }
    let protected = headers_decode(dec, storage, Location::Body, special)?;
    let ciphertext = match dec.next().map_err(CoseError::from)?.value {
        Value::Bstr(b) => b,
        _ => return Err(CoseError::MessageFormat),
    };
    dec.exit_array()?;
    Ok(Encrypt0Message {
        protected,
        ciphertext,
    })
}

/// Decrypt a decoded COSE_Encrypt0 into `plaintext_out`, returning the plaintext length.
#[cfg_attr(feature = "trace", trace)]
pub fn encrypt0_decrypt(
    msg: &Encrypt0Message,
    params: &[Parameter],
    external_aad: &[u8],
    key: KeyHandle,
    cipher: &mut dyn Cipher,
    plaintext_out: &mut [u8],
    scratch: &mut [u8],
) -> Result<usize> {
    let common = common_params(params, Location::Body)?;
    if common.alg != cipher.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let nonce = common.iv.ok_or(CoseError::NonceMissing)?;
    let aad = enc_structure(
        scratch,
        CONTEXT_ENCRYPT0,
        EncodedProtected::Content(msg.protected),
        external_aad,
    )?;
    cipher.decrypt(key, nonce, aad, msg.ciphertext, plaintext_out)
}

/***************************************************************************************************
 * COSE_Encrypt
 **************************************************************************************************/

/// Encrypt `plaintext` under `cek` and encode a COSE_Encrypt with the given recipients.
#[cfg_attr(feature = "trace", trace)]
pub fn encrypt_encode(
    enc: &mut Encoder,
    body_params: &[Parameter],
    plaintext: &[u8],
    external_aad: &[u8],
    cek: KeyHandle,
    cipher: &mut dyn Cipher,
    recipients: &[RecipientEntry],
    scratch: &mut [u8],
    include_tag: bool,
) -> Result<()> {
    let common = common_params(body_params, Location::Body)?;
    if common.alg != cipher.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let nonce = common.iv.ok_or(CoseError::NonceMissing)?;

    if include_tag {
        enc.add_tag(TAG_COSE_ENCRYPT)?;
    }
    enc.open_array()?;
    let p0 = enc.tell();
    headers_encode_protected(enc, body_params, Location::Body)?;
    let p1 = enc.tell();
    headers_encode_unprotected(enc, body_params, Location::Body)?;

    let ct_size = plaintext.len() + cipher.overhead();
    if scratch.len() <= ct_size {
        return Err(CoseError::ScratchTooSmall);
    }
    let (aad_buf, ct_buf) = scratch.split_at_mut(scratch.len() - ct_size);
    let ct_len = {
        let protected = enc.bytes_between(p0, p1)?;
        let aad = enc_structure(aad_buf, CONTEXT_ENCRYPT, EncodedProtected::Item(protected), external_aad)?;
        cipher.encrypt(cek, nonce, aad, plaintext, ct_buf)?
    };
    enc.add_bytes(&ct_buf[..ct_len])?;

    enc.open_array()?;
    for (i, r) in recipients.iter().enumerate() {
        let location = Location::Recipient(i as u8);
        enc.open_array()?;
        headers_encode_protected(enc, r.params, location)?;
        headers_encode_unprotected(enc, r.params, location)?;
        enc.add_bytes(r.encrypted_key)?;
        enc.close_array()?;
    }
    enc.close_array()?;
    enc.close_array()?;
    Ok(())
}

/// Decode a COSE_Encrypt (tag 96 or untagged). Recipient parameters land in `storage` at
/// `Location::Recipient(i)` with `i` the flattened index filled into `recipients[i]`.
/// Pass [`ephemeral_key_decoder`] as `special` to handle ECDH-ES recipients.
#[cfg_attr(feature = "trace", trace)]
pub fn encrypt_decode<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    recipients: &mut [RecipientInfo<'buf>],
    special: Option<SpecialDecodeFn<'buf>>,
) -> Result<EncryptMessage<'buf>> {
    dec.set_tag_handlers(&ENCRYPT_TAGS);
    let envelope = dec.enter_array()?;
    if envelope.container_count() != Some(4) {
        return Err(CoseError::MessageFormat);
    }
    let protected = headers_decode(dec, storage, Location::Body, special)?;
    let ciphertext = match dec.next().map_err(CoseError::from)?.value {
        Value::Bstr(b) => b,
        _ => return Err(CoseError::MessageFormat),
    };
    let mut n_recipients = 0usize;
    decode_recipients(dec, storage, recipients, &mut n_recipients, special, None, 1)?;
    dec.exit_array()?;
    Ok(EncryptMessage {
        protected,
        ciphertext,
        n_recipients,
    })
}

/// Decode one recipients array, flattening nested recipients.
fn decode_recipients<'buf>(
    dec: &mut Decoder<'buf>,
    storage: &mut ParamStorage<'_, 'buf>,
    recipients: &mut [RecipientInfo<'buf>],
    n_recipients: &mut usize,
    special: Option<SpecialDecodeFn<'buf>>,
    parent: Option<u8>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_RECIPIENT_NESTING {
        return Err(CoseError::RecipientNesting);
    }
    dec.enter_array().map_err(CoseError::from)?;
    loop {
        let count = match dec.enter_array() {
            Ok(envelope) => match envelope.container_count() {
                Some(3) | Some(4) => envelope.container_count(),
                _ => return Err(CoseError::MessageFormat),
            },
            Err(CBORError::NoMoreItems) => break,
            Err(e) => return Err(e.into()),
        };
        if *n_recipients == recipients.len() {
            return Err(CoseError::TooManyRecipients);
        }
        let index = *n_recipients;
        *n_recipients += 1;
        let protected =
            headers_decode(dec, storage, Location::Recipient(index as u8), special)?;
        let encrypted_key = match dec.next().map_err(CoseError::from)?.value {
            Value::Bstr(b) => b,
            _ => return Err(CoseError::MessageFormat),
        };
        if count == Some(4) {
            decode_recipients(
                dec,
                storage,
                recipients,
                n_recipients,
                special,
                Some(index as u8),
                depth + 1,
            )?;
        }
        dec.exit_array()?;
        recipients[index] = RecipientInfo {
            protected,
            encrypted_key,
            parent,
        };
    }
    dec.exit_array()?;
    Ok(())
}

/// Derive the content encryption key from an ECDH-ES recipient and decrypt the message
/// into `plaintext_out`, returning the plaintext length.
#[cfg_attr(feature = "trace", trace)]
pub fn encrypt_decrypt_recipient(
    msg: &EncryptMessage,
    params: &[Parameter],
    recipient: u8,
    agreement: &mut dyn KeyAgreement,
    cipher: &mut dyn Cipher,
    external_aad: &[u8],
    plaintext_out: &mut [u8],
    scratch: &mut [u8],
) -> Result<usize> {
    let body = common_params(params, Location::Body)?;
    if body.alg != cipher.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let nonce = body.iv.ok_or(CoseError::NonceMissing)?;
    let recipient_common = common_params(params, Location::Recipient(recipient))?;
    if recipient_common.alg != agreement.algorithm() {
        return Err(CoseError::AlgorithmMismatch);
    }
    let ephemeral = params
        .iter()
        .find(|p| {
            p.location == Location::Recipient(recipient) && p.label == label::EPHEMERAL_KEY
        })
        .and_then(|p| match p.value {
            ParamValue::Ephemeral(k) => Some(k),
            _ => None,
        })
        .ok_or(CoseError::EphemeralKeyFormat)?;
    let cek = agreement.derive(&ephemeral)?;
    let aad = enc_structure(
        scratch,
        CONTEXT_ENCRYPT,
        EncodedProtected::Content(msg.protected),
        external_aad,
    )?;
    cipher.decrypt(cek, nonce, aad, msg.ciphertext, plaintext_out)
}

/***************************************************************************************************
 * Ephemeral key parameter
 **************************************************************************************************/

/// The special-parameter decoder for the ECDH-ES ephemeral public key (label -1): parses
/// the COSE_Key map (kty, crv, x, y as bytes or sign bit) and stores it in the
/// parameter's special value. The key type must be EC2.
pub fn ephemeral_key_decoder<'buf>(
    dec: &mut Decoder<'buf>,
    item: &Item<'buf>,
    p: &mut Parameter<'buf>,
) -> Result<bool> {
    if p.label != label::EPHEMERAL_KEY {
        return Ok(false);
    }
    match item.value {
        Value::Map(_) => {}
        _ => return Err(CoseError::EphemeralKeyFormat),
    }
    if item.next_nest_level <= item.nest_level {
        return Err(CoseError::EphemeralKeyFormat);
    }
    let mut kty = None;
    let mut crv = None;
    let mut x = None;
    let mut y = None;
    loop {
        let el = dec.next().map_err(CoseError::from)?;
        match (el.label, el.value) {
            (Label::Int(l), Value::Int(v)) if l == key::KTY => kty = Some(v),
            (Label::Int(l), Value::Int(v)) if l == key::CRV => crv = Some(v),
            (Label::Int(l), Value::Bstr(b)) if l == key::X => x = Some(b),
            (Label::Int(l), Value::Bstr(b)) if l == key::Y => y = Some(YCoord::Bytes(b)),
            (Label::Int(l), Value::True) if l == key::Y => y = Some(YCoord::Sign(true)),
            (Label::Int(l), Value::False) if l == key::Y => y = Some(YCoord::Sign(false)),
            _ => return Err(CoseError::EphemeralKeyFormat),
        }
        if el.next_nest_level <= item.nest_level {
            break;
        }
    }
    match kty {
        Some(v) if v == key::KTY_EC2 => {}
        _ => return Err(CoseError::EphemeralKeyType),
    }
    match (crv, x, y) {
        (Some(crv), Some(x), Some(y)) => {
            p.value = ParamValue::Ephemeral(EphemeralKey { crv, x, y });
            Ok(true)
        }
        _ => Err(CoseError::EphemeralKeyFormat),
    }
}

/***************************************************************************************************
 * Enc_structure construction
 **************************************************************************************************/

enum EncodedProtected<'a> {
    /// A complete bstr item (encode side)
    Item(&'a [u8]),
    /// The raw map content to re-wrap (decode side)
    Content(&'a [u8]),
}

/// Build the Enc_structure: [context, body protected, external AAD]. Returns the encoded
/// bytes within `buf`; they are the cipher's additional authenticated data.
fn enc_structure<'s>(
    buf: &'s mut [u8],
    context: &str,
    protected: EncodedProtected,
    external_aad: &[u8],
) -> Result<&'s [u8]> {
    let mut enc = Encoder::new(buf);
    enc.open_array()?;
    enc.add_text(context)?;
    match protected {
        EncodedProtected::Item(b) => enc.add_encoded(b)?,
        EncodedProtected::Content(b) => enc.add_bytes(b)?,
    }
    enc.add_bytes(external_aad)?;
    enc.close_array()?;
    enc.finish().map_err(|e| match e {
        CBORError::BufferTooSmall => CoseError::ScratchTooSmall,
        other => CoseError::Cbor(other),
    })
}
