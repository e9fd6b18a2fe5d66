/***************************************************************************************************
 * Copyright (c) 2020-2023, Qualcomm Innovation Center, Inc. All rights reserved.
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
 * microcose module definition
 *
 * COSE (RFC 9052) signing, MAC and encryption envelopes built on the microcbor codec.
 * The flows are thin: all CBOR structure goes through microcbor's bounded navigation and
 * nested-container encoding, and all cryptography goes through caller-supplied capability
 * traits. Requires neither the Rust standard library nor an allocator.
 **************************************************************************************************/

// Default configuration
#![no_std]
#![warn(missing_docs)]

//! # MICROCOSE
//!
//! The `microcose` crate processes COSE messages
//! ([RFC 9052](https://datatracker.ietf.org/doc/rfc9052/)): COSE_Sign1 and COSE_Sign
//! signatures, COSE_Mac0 authentication tags, and COSE_Encrypt0 / COSE_Encrypt
//! encryption with recipients.
//!
//! The crate contains no cryptography. Each flow takes a small capability trait
//! ([`crypto::Signer`], [`crypto::Verifier`], [`crypto::MacProvider`],
//! [`crypto::Cipher`], [`crypto::KeyAgreement`]) the caller implements over the
//! primitive library or hardware of the target; keys are opaque [`crypto::KeyHandle`]s.
//!
//! The header-parameter engine ([`params`]) carries the weight: it encodes and decodes
//! the protected/unprotected buckets every message shares, enforces the
//! critical-parameter rules, detects duplicate labels, and dispatches non-scalar values
//! (such as the ECDH-ES ephemeral key) to caller callbacks.
//!
//! ## Example
//!
//! `examples/sign1_roundtrip` signs and verifies the COSE_Sign1 example of RFC 9052
//! Appendix C.2.1 with a deterministic ECDSA P-256 signature.

// Pull in std if we are testing or if it is defined as feature (because we run tests on a
// platform supporting I/O and full feature set.
#[cfg(any(feature = "std", test))]
extern crate std;

// If we are really building no_std, pull in core as well. It is aliased as std so that "use"
// statements are always the same
#[cfg(all(not(feature = "std"), not(test)))]
extern crate core as std;

extern crate microcbor;

pub(crate) mod message;

/// The `constants` module exposes the COSE registry values and limits.
pub mod constants;

/// The `crypto` module defines the abstract capability traits the flows call into.
pub mod crypto;

/// The `encrypt` module implements COSE_Encrypt0 and COSE_Encrypt.
pub mod encrypt;

/// The `error` module contains error definitions used throughout `microcose`.
pub mod error;

/// The `mac` module implements COSE_Mac0.
pub mod mac;

/// The `params` module implements the header parameter engine.
pub mod params;

/// The `sign` module implements COSE_Sign1 and COSE_Sign.
pub mod sign;

pub use message::{peek_message_tag, Payload};
