/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
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
 * microcose constants
 *
 * COSE message tag numbers, the header parameter registry labels, algorithm identifiers,
 * the to-be-signed context strings, and the fixed-size limits of the parameter engine.
 * Registry values are from RFC 9052 / RFC 9053 and the IANA COSE registries.
 **************************************************************************************************/

/// COSE_Encrypt0 tag number
pub const TAG_COSE_ENCRYPT0: u64 = 16;
/// COSE_Mac0 tag number
pub const TAG_COSE_MAC0: u64 = 17;
/// COSE_Sign1 tag number
pub const TAG_COSE_SIGN1: u64 = 18;
/// COSE_Encrypt tag number
pub const TAG_COSE_ENCRYPT: u64 = 96;
/// COSE_Sign tag number
pub const TAG_COSE_SIGN: u64 = 98;

/// Header parameter labels (IANA COSE Header Parameters registry)
pub mod label {
    /// Cryptographic algorithm to use
    pub const ALG: i64 = 1;
    /// Critical header parameters
    pub const CRIT: i64 = 2;
    /// Content type of the payload
    pub const CONTENT_TYPE: i64 = 3;
    /// Key identifier
    pub const KID: i64 = 4;
    /// Full initialization vector
    pub const IV: i64 = 5;
    /// Partial initialization vector
    pub const PARTIAL_IV: i64 = 6;
    /// Ephemeral public key for ECDH-ES
    pub const EPHEMERAL_KEY: i64 = -1;
    /// HKDF salt
    pub const SALT: i64 = -20;
    /// PartyU identity for key derivation
    pub const PARTY_U_IDENTITY: i64 = -21;
    /// PartyV identity for key derivation
    pub const PARTY_V_IDENTITY: i64 = -22;
}

/// Algorithm identifiers (IANA COSE Algorithms registry)
pub mod alg {
    /// Reserved; never a valid algorithm choice
    pub const RESERVED: i64 = 0;
    /// ECDSA w/ SHA-256 on P-256
    pub const ES256: i64 = -7;
    /// EdDSA
    pub const EDDSA: i64 = -8;
    /// ECDSA w/ SHA-384 on P-384
    pub const ES384: i64 = -35;
    /// ECDSA w/ SHA-512 on P-521
    pub const ES512: i64 = -36;
    /// HMAC w/ SHA-256, 256 bit tag
    pub const HMAC_256: i64 = 5;
    /// AES-GCM, 128 bit key
    pub const A128GCM: i64 = 1;
    /// AES-GCM, 192 bit key
    pub const A192GCM: i64 = 2;
    /// AES-GCM, 256 bit key
    pub const A256GCM: i64 = 3;
    /// ECDH-ES + HKDF-256, ephemeral-static direct key agreement
    pub const ECDH_ES_HKDF_256: i64 = -25;
}

/// COSE_Key map labels and the values this implementation understands
pub mod key {
    /// Key type
    pub const KTY: i64 = 1;
    /// Elliptic curve identifier
    pub const CRV: i64 = -1;
    /// X coordinate
    pub const X: i64 = -2;
    /// Y coordinate (bstr) or its sign (bool)
    pub const Y: i64 = -3;
    /// Key type: elliptic curve with x/y coordinates
    pub const KTY_EC2: i64 = 2;
    /// Curve P-256
    pub const CRV_P256: i64 = 1;
}

/// Context string for a COSE_Sign signature
pub const CONTEXT_SIGNATURE: &str = "Signature";
/// Context string for a COSE_Sign1 signature
pub const CONTEXT_SIGNATURE1: &str = "Signature1";
/// Context string for a COSE_Mac0 tag
pub const CONTEXT_MAC0: &str = "MAC0";
/// Context string for COSE_Encrypt0 additional data
pub const CONTEXT_ENCRYPT0: &str = "Encrypt0";
/// Context string for COSE_Encrypt additional data
pub const CONTEXT_ENCRYPT: &str = "Encrypt";

/// Critical-parameter list capacity: integer labels
pub const MAX_CRITICAL_INT_LABELS: usize = 4;
/// Critical-parameter list capacity: text labels
pub const MAX_CRITICAL_TSTR_LABELS: usize = 4;
/// Maximum depth of nested recipient structures
pub const MAX_RECIPIENT_NESTING: usize = 2;
