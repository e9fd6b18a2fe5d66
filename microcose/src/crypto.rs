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
 * Abstract crypto interface
 *
 * The COSE flows carry no cryptography of their own: each capability is a small trait the
 * caller implements over whatever primitive library or hardware the target provides. Keys
 * are opaque handles the provider understands; key material never passes through this
 * crate.
 **************************************************************************************************/
use crate::error::Result;
use crate::params::EphemeralKey;

/// An opaque reference to key material held by a crypto provider.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyHandle(pub u64);

/// Signature creation for COSE_Sign / COSE_Sign1.
pub trait Signer {
    /// The COSE algorithm identifier this signer implements.
    fn algorithm(&self) -> i64;

    /// Size of a signature in bytes, for buffer sizing.
    fn signature_size(&self) -> usize;

    /// Sign `to_be_signed`, writing the signature into `signature`. Returns the number of
    /// bytes written.
    fn sign(&mut self, to_be_signed: &[u8], signature: &mut [u8]) -> Result<usize>;
}

/// Signature verification for COSE_Sign / COSE_Sign1.
pub trait Verifier {
    /// The COSE algorithm identifier this verifier implements.
    fn algorithm(&self) -> i64;

    /// Verify `signature` over `to_be_signed`.
    fn verify(&self, to_be_signed: &[u8], signature: &[u8]) -> Result<()>;
}

/// Authentication tags for COSE_Mac0.
pub trait MacProvider {
    /// The COSE algorithm identifier this provider implements.
    fn algorithm(&self) -> i64;

    /// Size of the authentication tag in bytes.
    fn tag_size(&self) -> usize;

    /// Compute the tag over `to_be_maced` into `tag`, returning the bytes written.
    fn compute(&mut self, to_be_maced: &[u8], tag: &mut [u8]) -> Result<usize>;

    /// Verify `tag` over `to_be_maced`.
    fn verify(&self, to_be_maced: &[u8], tag: &[u8]) -> Result<()>;
}

/// Authenticated encryption for COSE_Encrypt0 / COSE_Encrypt.
pub trait Cipher {
    /// The COSE algorithm identifier this cipher implements.
    fn algorithm(&self) -> i64;

    /// Ciphertext expansion in bytes (the authentication tag).
    fn overhead(&self) -> usize;

    /// Encrypt `plaintext` under `key` with `nonce` and additional data `aad` into `out`,
    /// returning the ciphertext length.
    fn encrypt(
        &mut self,
        key: KeyHandle,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
        out: &mut [u8],
    ) -> Result<usize>;

    /// Decrypt and authenticate `ciphertext` into `out`, returning the plaintext length.
    fn decrypt(
        &mut self,
        key: KeyHandle,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        out: &mut [u8],
    ) -> Result<usize>;
}

/// Content key distribution for COSE_Encrypt recipients (ECDH-ES).
pub trait KeyAgreement {
    /// The COSE algorithm identifier this agreement scheme implements.
    fn algorithm(&self) -> i64;

    /// Derive the content encryption key from the sender's ephemeral public key and the
    /// recipient's static private key. Returns a handle to the derived key.
    fn derive(&mut self, ephemeral: &EphemeralKey) -> Result<KeyHandle>;
}
