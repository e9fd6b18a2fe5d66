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
 * Sign1 round trip
 *
 * Sign and verify the COSE_Sign1 example of RFC 9052 Appendix C.2.1 using ECDSA
 * P256/SHA256 (deterministic per RFC 6979, as the p256 crate implements it). The key
 * material is kid '11' from the COSE working group example key set.
 **************************************************************************************************/
use std::error::Error;

use p256::ecdsa::signature::{Signature as _, Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcose::constants::alg;
use microcose::crypto;
use microcose::error::CoseError;
use microcose::params::{ParamStorage, Parameter};
use microcose::sign::{sign1_decode, sign1_encode, sign1_verify};
use microcose::Payload;

// kid '11' private key, from https://github.com/cose-wg/Examples/blob/master/KeySet.txt
const KID_11_PRIV: [u8; 32] = [
    0x57, 0xc9, 0x20, 0x77, 0x66, 0x41, 0x46, 0xe8, 0x76, 0x76, 0x0c, 0x95, 0x20, 0xd0, 0x54, 0xaa,
    0x93, 0xc3, 0xaf, 0xb0, 0x4e, 0x30, 0x67, 0x05, 0xdb, 0x60, 0x90, 0x30, 0x85, 0x07, 0xb4, 0xd3,
];

// kid '11' public key in uncompressed form per SEC1, v2.0
const KID_11_PUB: [u8; 65] = [
    0x04, // x
    0xba, 0xc5, 0xb1, 0x1c, 0xad, 0x8f, 0x99, 0xf9, 0xc7, 0x2b, 0x05, 0xcf, 0x4b, 0x9e, 0x26, 0xd2,
    0x44, 0xdc, 0x18, 0x9f, 0x74, 0x52, 0x28, 0x25, 0x5a, 0x21, 0x9a, 0x86, 0xd6, 0xa0, 0x9e, 0xff,
    // y
    0x20, 0x13, 0x8b, 0xf8, 0x2d, 0xc1, 0xb6, 0xd5, 0x62, 0xbe, 0x0f, 0xa5, 0x4a, 0xb7, 0x80, 0x4a,
    0x3a, 0x64, 0xb6, 0xd7, 0x2c, 0xcf, 0xed, 0x6b, 0x6f, 0xb6, 0xed, 0x28, 0xbb, 0xfc, 0x11, 0x7e,
];

struct P256Signer {
    key: SigningKey,
}

impl crypto::Signer for P256Signer {
    fn algorithm(&self) -> i64 {
        alg::ES256
    }

    fn signature_size(&self) -> usize {
        64
    }

    fn sign(&mut self, to_be_signed: &[u8], signature: &mut [u8]) -> Result<usize, CoseError> {
        let sig: Signature = self.key.sign(to_be_signed);
        let bytes = sig.as_bytes();
        signature[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }
}

struct P256Verifier {
    key: VerifyingKey,
}

impl crypto::Verifier for P256Verifier {
    fn algorithm(&self) -> i64 {
        alg::ES256
    }

    fn verify(&self, to_be_signed: &[u8], signature: &[u8]) -> Result<(), CoseError> {
        let sig = Signature::from_bytes(signature).map_err(|_| CoseError::SignatureVerify)?;
        self.key
            .verify(to_be_signed, &sig)
            .map_err(|_| CoseError::SignatureVerify)
    }
}

fn print_hex(name: &str, bytes: &[u8]) {
    print!("{} ", name);
    for b in bytes {
        print!("{:02x}", b);
    }
    println!();
}

fn main() -> Result<(), Box<dyn Error>> {
    let payload = b"This is the content.";

    // Sign
    let mut signer = P256Signer {
        key: SigningKey::from_bytes(&KID_11_PRIV)?,
    };
    let params = [Parameter::alg(alg::ES256), Parameter::kid(b"11")];
    let mut message_buf = [0u8; 256];
    let mut scratch = [0u8; 512];
    let mut enc = Encoder::new(&mut message_buf);
    sign1_encode(
        &mut enc,
        &params,
        Payload::Attached(payload),
        b"",
        &mut signer,
        &mut scratch,
        true,
    )?;
    let message = enc.finish()?;
    print_hex("COSE_Sign1", message);

    // Verify
    let verifier = P256Verifier {
        key: VerifyingKey::from_sec1_bytes(&KID_11_PUB)?,
    };
    let mut slots = [Parameter::new(0, microcose::params::ParamValue::Empty); 8];
    let mut storage = ParamStorage::new(&mut slots);
    let mut dec = Decoder::new(message, 0);
    let msg = sign1_decode(&mut dec, &mut storage, None)?;
    sign1_verify(&msg, storage.params(), b"", None, &verifier, &mut scratch)?;
    dec.finish()?;

    println!(
        "Verification succeeded: message content {:?}",
        core::str::from_utf8(msg.payload.unwrap_or(&[]))?
    );
    Ok(())
}
