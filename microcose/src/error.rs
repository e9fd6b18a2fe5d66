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
 * microcose Error API
 *
 * COSE processing failures. CBOR-level failures are carried through unchanged in the
 * `Cbor` variant so a caller can still distinguish a malformed message from a protocol
 * violation.
 **************************************************************************************************/
use std::result;

use microcbor::error::CBORError;

#[cfg(any(feature = "full", test))]
use thiserror::Error;

/// An alias for Result<T, CoseError> used throughout this crate.
pub type Result<T> = result::Result<T, CoseError>;

/// `CoseError` reports COSE message and header-parameter processing failures.
#[cfg_attr(any(feature = "full", test), derive(Copy, Clone, PartialEq, Error, Debug))]
#[cfg_attr(all(not(feature = "full"), not(test)), derive(Copy, Clone, PartialEq, Debug))]
pub enum CoseError {
    /// A CBOR-level failure while encoding or decoding the message
    #[cfg_attr(any(feature = "full", test), error("CBOR error: {0:?}"))]
    Cbor(CBORError),

    // Header parameter engine.
    /// A header parameter used CBOR this implementation does not accept (e.g. a
    /// non-integer label)
    #[cfg_attr(any(feature = "full", test), error("Bad header parameter CBOR"))]
    ParameterCbor,
    /// The same label appeared twice across the protected and unprotected buckets
    #[cfg_attr(any(feature = "full", test), error("Duplicate header parameter"))]
    DuplicateParameter,
    /// A parameter marked critical was emitted into the unprotected bucket
    #[cfg_attr(any(feature = "full", test), error("Critical parameter in unprotected bucket"))]
    CritParameterInUnprotected,
    /// A critical parameter is present but not understood, or listed but absent
    #[cfg_attr(any(feature = "full", test), error("Unknown critical parameter"))]
    UnknownCriticalParameter,
    /// A parameter that must be integrity protected is not in the protected bucket
    #[cfg_attr(any(feature = "full", test), error("Parameter not in the protected bucket"))]
    ParameterNotProtected,
    /// The crit parameter held an empty array, invalid per RFC 9052
    #[cfg_attr(any(feature = "full", test), error("Empty crit parameter list"))]
    EmptyCritList,
    /// More critical labels than the fixed list holds
    #[cfg_attr(any(feature = "full", test), error("Too many critical parameters"))]
    TooManyCriticalParameters,
    /// The caller-supplied parameter pool is full
    #[cfg_attr(any(feature = "full", test), error("Parameter storage exhausted"))]
    TooManyParameters,
    /// The content type is a negative or oversized integer
    #[cfg_attr(any(feature = "full", test), error("Content type out of range"))]
    ContentTypeRange,

    // Algorithms.
    /// No algorithm parameter in the protected bucket
    #[cfg_attr(any(feature = "full", test), error("No algorithm parameter"))]
    NoAlgorithm,
    /// The algorithm identifier is the reserved value zero
    #[cfg_attr(any(feature = "full", test), error("Reserved algorithm identifier"))]
    ReservedAlgorithm,
    /// The message algorithm does not match the supplied crypto provider
    #[cfg_attr(any(feature = "full", test), error("Algorithm does not match the provider"))]
    AlgorithmMismatch,

    // Message structure.
    /// The message is not the expected tag/array shape
    #[cfg_attr(any(feature = "full", test), error("Unexpected message structure"))]
    MessageFormat,
    /// A detached payload was needed but not supplied
    #[cfg_attr(any(feature = "full", test), error("Detached payload not supplied"))]
    PayloadMissing,
    /// The supplied nonce/IV parameter is missing
    #[cfg_attr(any(feature = "full", test), error("No IV for the cipher"))]
    NonceMissing,
    /// More signers than the caller-provided signature list holds
    #[cfg_attr(any(feature = "full", test), error("Too many signers"))]
    TooManySigners,
    /// More recipients than the caller-provided recipient list holds
    #[cfg_attr(any(feature = "full", test), error("Too many recipients"))]
    TooManyRecipients,
    /// Recipient structures nest deeper than supported
    #[cfg_attr(any(feature = "full", test), error("Recipient nesting too deep"))]
    RecipientNesting,
    /// The scratch buffer is too small for the to-be-signed or AAD structure
    #[cfg_attr(any(feature = "full", test), error("Scratch buffer too small"))]
    ScratchTooSmall,

    // Crypto outcomes.
    /// The signature did not verify
    #[cfg_attr(any(feature = "full", test), error("Signature verification failed"))]
    SignatureVerify,
    /// The authentication tag did not verify
    #[cfg_attr(any(feature = "full", test), error("MAC verification failed"))]
    MacVerify,
    /// Decryption failed
    #[cfg_attr(any(feature = "full", test), error("Decryption failed"))]
    DecryptFail,
    /// The crypto provider rejected the operation
    #[cfg_attr(any(feature = "full", test), error("Crypto provider failure"))]
    CryptoFail,

    // Key distribution.
    /// The ephemeral key has an unsupported key type
    #[cfg_attr(any(feature = "full", test), error("Ephemeral key has the wrong key type"))]
    EphemeralKeyType,
    /// The ephemeral key map is malformed or incomplete
    #[cfg_attr(any(feature = "full", test), error("Malformed ephemeral key"))]
    EphemeralKeyFormat,
}

impl From<CBORError> for CoseError {
    fn from(e: CBORError) -> Self {
        CoseError::Cbor(e)
    }
}
