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
 * COSE_Sign1 and COSE_Sign flows: byte-exact envelope encoding, ECDSA P-256 round trips,
 * detached payloads and multi-signer messages.
 **************************************************************************************************/

extern crate microcbor;
extern crate microcose;
extern crate p256;
extern crate sha2;

use p256::ecdsa::signature::{Signature as _, Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcose::constants::alg;
use microcose::crypto;
use microcose::error::CoseError;
use microcose::params::{ParamStorage, ParamValue, Parameter};
use microcose::sign::{
    sign1_decode, sign1_encode, sign1_verify, sign_decode, sign_encode, sign_verify_signature,
    SignatureInfo, SignerEntry,
};
use microcose::Payload;

// kid '11' from the COSE working group example key set
const KID_11_PRIV: [u8; 32] = [
    0x57, 0xc9, 0x20, 0x77, 0x66, 0x41, 0x46, 0xe8, 0x76, 0x76, 0x0c, 0x95, 0x20, 0xd0, 0x54, 0xaa,
    0x93, 0xc3, 0xaf, 0xb0, 0x4e, 0x30, 0x67, 0x05, 0xdb, 0x60, 0x90, 0x30, 0x85, 0x07, 0xb4, 0xd3,
];

const KID_11_PUB: [u8; 65] = [
    0x04, 0xba, 0xc5, 0xb1, 0x1c, 0xad, 0x8f, 0x99, 0xf9, 0xc7, 0x2b, 0x05, 0xcf, 0x4b, 0x9e,
    0x26, 0xd2, 0x44, 0xdc, 0x18, 0x9f, 0x74, 0x52, 0x28, 0x25, 0x5a, 0x21, 0x9a, 0x86, 0xd6,
    0xa0, 0x9e, 0xff, 0x20, 0x13, 0x8b, 0xf8, 0x2d, 0xc1, 0xb6, 0xd5, 0x62, 0xbe, 0x0f, 0xa5,
    0x4a, 0xb7, 0x80, 0x4a, 0x3a, 0x64, 0xb6, 0xd7, 0x2c, 0xcf, 0xed, 0x6b, 0x6f, 0xb6, 0xed,
    0x28, 0xbb, 0xfc, 0x11, 0x7e,
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

/// A deterministic stand-in for signature tests that care about the to-be-signed bytes
/// rather than real cryptography: the "signature" is SHA-256 over a key byte and the
/// Sig_structure.
struct DigestSigner {
    key: u8,
    algorithm: i64,
}

impl crypto::Signer for DigestSigner {
    fn algorithm(&self) -> i64 {
        self.algorithm
    }
    fn signature_size(&self) -> usize {
        32
    }
    fn sign(&mut self, to_be_signed: &[u8], signature: &mut [u8]) -> Result<usize, CoseError> {
        let digest = Sha256::new().chain_update([self.key]).chain_update(to_be_signed).finalize();
        signature[..32].copy_from_slice(&digest);
        Ok(32)
    }
}

impl crypto::Verifier for DigestSigner {
    fn algorithm(&self) -> i64 {
        self.algorithm
    }
    fn verify(&self, to_be_signed: &[u8], signature: &[u8]) -> Result<(), CoseError> {
        let digest = Sha256::new().chain_update([self.key]).chain_update(to_be_signed).finalize();
        if signature == digest.as_slice() {
            Ok(())
        } else {
            Err(CoseError::SignatureVerify)
        }
    }
}

/// All-zero signatures of a fixed width, for byte-exact envelope checks.
struct ZeroSigner;

impl crypto::Signer for ZeroSigner {
    fn algorithm(&self) -> i64 {
        alg::ES256
    }
    fn signature_size(&self) -> usize {
        64
    }
    fn sign(&mut self, _to_be_signed: &[u8], signature: &mut [u8]) -> Result<usize, CoseError> {
        signature[..64].fill(0);
        Ok(64)
    }
}

fn empty_slots<'buf>() -> [Parameter<'buf>; 16] {
    [Parameter::new(0, ParamValue::Empty); 16]
}

#[test]
fn sign1_envelope_is_byte_exact() {
    // Protected { alg: ES256 }, no unprotected parameters, empty payload, 64 zero bytes
    // of signature, wrapped in an array of four under tag 18
    let params = [Parameter::alg(alg::ES256)];
    let mut message_buf = [0u8; 256];
    let mut scratch = [0u8; 256];
    let mut enc = Encoder::new(&mut message_buf);
    sign1_encode(
        &mut enc,
        &params,
        Payload::Attached(&[]),
        b"",
        &mut ZeroSigner,
        &mut scratch,
        true,
    )
    .unwrap();
    let message = enc.finish().unwrap();

    let mut expected = std::vec![0xd2, 0x84, 0x43, 0xa1, 0x01, 0x26, 0xa0, 0x40, 0x58, 0x40];
    expected.extend_from_slice(&[0u8; 64]);
    assert_eq!(message, expected.as_slice());
}

#[test]
fn sign1_round_trip_with_p256() {
    let payload = b"This is the content.";
    let params = [Parameter::alg(alg::ES256), Parameter::kid(b"11")];
    let mut signer = P256Signer {
        key: SigningKey::from_bytes(&KID_11_PRIV).unwrap(),
    };
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
    )
    .unwrap();
    let message = enc.finish().unwrap();

    let verifier = P256Verifier {
        key: VerifyingKey::from_sec1_bytes(&KID_11_PUB).unwrap(),
    };
    let mut slots = empty_slots();
    let mut storage = ParamStorage::new(&mut slots);
    let mut dec = Decoder::new(message, 0);
    let msg = sign1_decode(&mut dec, &mut storage, None).unwrap();
    dec.finish().unwrap();
    assert_eq!(msg.payload, Some(payload as &[u8]));
    sign1_verify(&msg, storage.params(), b"", None, &verifier, &mut scratch).unwrap();

    // A corrupted payload must not verify
    let mut bad = message.to_vec();
    let n = bad.len();
    bad[n - 70] ^= 0x01;
    let mut slots = empty_slots();
    let mut storage = ParamStorage::new(&mut slots);
    let mut dec = Decoder::new(&bad, 0);
    let msg = sign1_decode(&mut dec, &mut storage, None).unwrap();
    assert_eq!(
        sign1_verify(&msg, storage.params(), b"", None, &verifier, &mut scratch),
        Err(CoseError::SignatureVerify)
    );
}

#[test]
fn sign1_detached_payload() {
    let payload = b"detached content";
    let params = [Parameter::alg(alg::ES256)];
    let mut signer = DigestSigner {
        key: 1,
        algorithm: alg::ES256,
    };
    let mut message_buf = [0u8; 256];
    let mut scratch = [0u8; 512];
    let mut enc = Encoder::new(&mut message_buf);
    sign1_encode(
        &mut enc,
        &params,
        Payload::Detached(payload),
        b"aad",
        &mut signer,
        &mut scratch,
        true,
    )
    .unwrap();
    let message = enc.finish().unwrap();

    let mut slots = empty_slots();
    let mut storage = ParamStorage::new(&mut slots);
    let mut dec = Decoder::new(message, 0);
    let msg = sign1_decode(&mut dec, &mut storage, None).unwrap();
    dec.finish().unwrap();
    // The envelope carries nil; the payload travels outside
    assert_eq!(msg.payload, None);
    sign1_verify(
        &msg,
        storage.params(),
        b"aad",
        Some(payload),
        &signer,
        &mut scratch,
    )
    .unwrap();
    // Verification without the detached payload cannot proceed
    assert_eq!(
        sign1_verify(&msg, storage.params(), b"aad", None, &signer, &mut scratch),
        Err(CoseError::PayloadMissing)
    );
}

#[test]
fn sign1_untagged_message_decodes() {
    let params = [Parameter::alg(alg::ES256)];
    let mut signer = DigestSigner {
        key: 2,
        algorithm: alg::ES256,
    };
    let mut message_buf = [0u8; 256];
    let mut scratch = [0u8; 512];
    let mut enc = Encoder::new(&mut message_buf);
    sign1_encode(
        &mut enc,
        &params,
        Payload::Attached(b"x"),
        b"",
        &mut signer,
        &mut scratch,
        false,
    )
    .unwrap();
    let message = enc.finish().unwrap();
    assert_eq!(message[0], 0x84);

    let mut slots = empty_slots();
    let mut storage = ParamStorage::new(&mut slots);
    let mut dec = Decoder::new(message, 0);
    let msg = sign1_decode(&mut dec, &mut storage, None).unwrap();
    dec.finish().unwrap();
    sign1_verify(&msg, storage.params(), b"", None, &signer, &mut scratch).unwrap();
}

#[test]
fn sign1_wrong_algorithm_is_rejected() {
    let params = [Parameter::alg(alg::ES384)];
    let mut signer = DigestSigner {
        key: 3,
        algorithm: alg::ES256,
    };
    let mut message_buf = [0u8; 256];
    let mut scratch = [0u8; 256];
    let mut enc = Encoder::new(&mut message_buf);
    assert_eq!(
        sign1_encode(
            &mut enc,
            &params,
            Payload::Attached(b"x"),
            b"",
            &mut signer,
            &mut scratch,
            true,
        ),
        Err(CoseError::AlgorithmMismatch)
    );
}

#[test]
fn sign_two_signers_round_trip() {
    let payload = b"multi-signer content";
    let body_params = [Parameter::content_type_int(0)];
    let params_a = [
        Parameter::alg(alg::ES256).at(microcose::params::Location::Signer(0)),
        Parameter::kid(b"a").at(microcose::params::Location::Signer(0)),
    ];
    let params_b = [
        Parameter::alg(alg::ES384).at(microcose::params::Location::Signer(1)),
        Parameter::kid(b"b").at(microcose::params::Location::Signer(1)),
    ];
    let mut signer_a = DigestSigner {
        key: 0xaa,
        algorithm: alg::ES256,
    };
    let mut signer_b = DigestSigner {
        key: 0xbb,
        algorithm: alg::ES384,
    };
    let mut entries = [
        SignerEntry {
            params: &params_a,
            signer: &mut signer_a,
        },
        SignerEntry {
            params: &params_b,
            signer: &mut signer_b,
        },
    ];

    let mut message_buf = [0u8; 512];
    let mut scratch = [0u8; 512];
    let mut enc = Encoder::new(&mut message_buf);
    sign_encode(
        &mut enc,
        &body_params,
        Payload::Attached(payload),
        b"",
        &mut entries,
        &mut scratch,
        true,
    )
    .unwrap();
    let message = enc.finish().unwrap();

    let mut slots = empty_slots();
    let mut storage = ParamStorage::new(&mut slots);
    let mut sigs = [SignatureInfo::default(); 4];
    let mut dec = Decoder::new(message, 0);
    let msg = sign_decode(&mut dec, &mut storage, &mut sigs, None).unwrap();
    dec.finish().unwrap();
    assert_eq!(msg.n_signatures, 2);
    assert_eq!(msg.payload, Some(payload as &[u8]));

    let check_a = DigestSigner {
        key: 0xaa,
        algorithm: alg::ES256,
    };
    sign_verify_signature(
        &msg,
        &sigs[0],
        storage.params(),
        0,
        b"",
        None,
        &check_a,
        &mut scratch,
    )
    .unwrap();
    let check_b = DigestSigner {
        key: 0xbb,
        algorithm: alg::ES384,
    };
    sign_verify_signature(
        &msg,
        &sigs[1],
        storage.params(),
        1,
        b"",
        None,
        &check_b,
        &mut scratch,
    )
    .unwrap();
    // Swapping the verifiers must fail
    assert_eq!(
        sign_verify_signature(
            &msg,
            &sigs[0],
            storage.params(),
            0,
            b"",
            None,
            &check_b,
            &mut scratch,
        ),
        Err(CoseError::AlgorithmMismatch)
    );
}

#[test]
fn wrong_message_tag_is_rejected() {
    // A Mac0 tag on a Sign1-shaped message leaves the tag unconsumed
    let mut message_buf = [0u8; 128];
    let mut enc = Encoder::new(&mut message_buf);
    enc.add_tag(17).unwrap();
    enc.open_array().unwrap();
    enc.add_bytes(&[]).unwrap();
    enc.open_map().unwrap();
    enc.close_map().unwrap();
    enc.add_bytes(b"p").unwrap();
    enc.add_bytes(&[0u8; 4]).unwrap();
    enc.close_array().unwrap();
    let message = enc.finish().unwrap();

    let mut slots = empty_slots();
    let mut storage = ParamStorage::new(&mut slots);
    let mut dec = Decoder::new(message, 0);
    assert_eq!(
        sign1_decode(&mut dec, &mut storage, None),
        Err(CoseError::Cbor(
            microcbor::error::CBORError::UnprocessedTagNumber
        ))
    );
}
