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
 * Message envelope helpers
 *
 * The payload representation shared by every flow, the tag-number acceptance tables the
 * flows install while decoding an envelope, and a cheap classification helper for callers
 * that receive an unknown COSE message.
 **************************************************************************************************/
use crate::constants::*;

use microcbor::decoder::TagHandler;
use microcbor::types::Item;

/// The payload of a signed or MACed message. A detached payload is carried outside the
/// message (the envelope holds nil) but still covered by the signature or tag.
#[derive(Copy, Clone, Debug)]
pub enum Payload<'a> {
    Attached(&'a [u8]),
    Detached(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// The bytes covered by the signature or tag.
    pub fn bytes(&self) -> &'a [u8] {
        match self {
            Payload::Attached(b) | Payload::Detached(b) => b,
        }
    }

    /// The bytes carried inside the envelope, if any.
    pub fn attached(&self) -> Option<&'a [u8]> {
        match self {
            Payload::Attached(b) => Some(b),
            Payload::Detached(_) => None,
        }
    }
}

/// Accept (and discard) an expected message tag number. The flows verify the envelope
/// shape themselves; an unexpected tag number is left unconsumed and fails decode under
/// the strict tag policy.
fn accept<'a>(_tag: u64, _item: &mut Item<'a>) -> microcbor::error::Result<bool> {
    Ok(true)
}

pub(crate) static SIGN1_TAGS: [TagHandler; 1] = [TagHandler {
    tag: TAG_COSE_SIGN1,
    decode: accept,
}];

pub(crate) static SIGN_TAGS: [TagHandler; 1] = [TagHandler {
    tag: TAG_COSE_SIGN,
    decode: accept,
}];

pub(crate) static MAC0_TAGS: [TagHandler; 1] = [TagHandler {
    tag: TAG_COSE_MAC0,
    decode: accept,
}];

pub(crate) static ENCRYPT0_TAGS: [TagHandler; 1] = [TagHandler {
    tag: TAG_COSE_ENCRYPT0,
    decode: accept,
}];

pub(crate) static ENCRYPT_TAGS: [TagHandler; 1] = [TagHandler {
    tag: TAG_COSE_ENCRYPT,
    decode: accept,
}];

/// Read the leading tag number of an encoded COSE message without touching a decoder
/// context, to classify it before dispatching to a flow. Returns `None` for an untagged
/// or truncated message.
pub fn peek_message_tag(message: &[u8]) -> Option<u64> {
    let ib = *message.first()?;
    if ib & 0b111_00000 != 0b110_00000 {
        return None;
    }
    let ai = ib & 0b000_11111;
    match ai {
        0..=23 => Some(ai as u64),
        24 => message.get(1).map(|b| *b as u64),
        25 => {
            let b = message.get(1..3)?;
            Some(u16::from_be_bytes([b[0], b[1]]) as u64)
        }
        26 => {
            let b = message.get(1..5)?;
            Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
        }
        27 => {
            let b = message.get(1..9)?;
            Some(u64::from_be_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ]))
        }
        _ => None,
    }
}
