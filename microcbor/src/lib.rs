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
 * microcbor module definition
 *
 * A streaming, memory efficient serializer and deserializer for CBOR (RFC 8949). This
 * implementation is designed for use in constrained systems and requires neither the Rust
 * standard library nor an allocator.
 **************************************************************************************************/

// Default configuration
#![no_std]
#![warn(missing_docs)]

//! # MICROCBOR
//!
//! The `microcbor` crate provides a CBOR implementation aimed at embedded targets where
//! the programmer wants to maintain low-level control over serialization and
//! deserialization. The typical use-case is implementation of a standardized CBOR-based
//! container or protocol such as COSE
//! [RFC 9052](https://datatracker.ietf.org/doc/rfc9052/) - the companion `microcose`
//! crate is built entirely on the operations exported here.
//!
//! The default configuration does not require an allocator: decoding borrows from the
//! input buffer, encoding writes into a caller-provided buffer, and the only memory
//! policy decision - how to concatenate indefinite length strings - is delegated to a
//! caller-supplied [`decoder::StringAllocator`].
//!
//! ## Features
//!
//! - A streaming decoder ([`decoder::Decoder`]) producing typed items in pre-order, with
//!   definite and indefinite lengths, tag number recording and per-item nesting levels.
//! - Bounded navigation: enter a map, array or byte-string wrapped CBOR and traverse it
//!   with automatic end detection, or look items up by label while the cursor stays put.
//! - Deterministic "preferred serialization" on the encoder, and decode-side conformance
//!   checking up to the CDE and dCBOR profiles ([`constants::opts`]).
//! - An encoder ([`encoder::Encoder`]) that computes array, map and wrapped byte-string
//!   heads after the fact, rotating a grown head in front of emitted content in place.
//!
//! ## Decoding
//!
//! ```
//! use microcbor::decoder::Decoder;
//! use microcbor::error::CBORError;
//! use microcbor::types::Value;
//!
//! fn main() -> Result<(), CBORError> {
//!     // { 1: "IETF", 2: h'0102' }
//!     let input: &[u8] = &[0xa2, 0x01, 0x64, 0x49, 0x45, 0x54, 0x46, 0x02, 0x42, 0x01, 0x02];
//!     let mut decoder = Decoder::new(input, 0);
//!     decoder.enter_map()?;
//!     assert_eq!(decoder.get_tstr_in_map(1i64)?, "IETF");
//!     assert_eq!(decoder.get_bstr_in_map(2i64)?, &[0x01, 0x02]);
//!     decoder.exit_map()?;
//!     decoder.finish()
//! }
//! ```
//!
//! ## Encoding
//!
//! ```
//! use microcbor::encoder::Encoder;
//! use microcbor::error::CBORError;
//!
//! fn main() -> Result<(), CBORError> {
//!     let mut buffer = [0u8; 32];
//!     let mut encoder = Encoder::new(&mut buffer);
//!     encoder.open_map()?;
//!     encoder.add_i64(1)?;
//!     encoder.add_text("IETF")?;
//!     encoder.add_i64(2)?;
//!     encoder.add_bytes(&[0x01, 0x02])?;
//!     encoder.close_map()?;
//!     assert_eq!(
//!         encoder.finish()?,
//!         &[0xa2, 0x01, 0x64, 0x49, 0x45, 0x54, 0x46, 0x02, 0x42, 0x01, 0x02]
//!     );
//!     Ok(())
//! }
//! ```

// Pull in std if we are testing or if it is defined as feature (because we run tests on a
// platform supporting I/O and full feature set.
#[cfg(any(feature = "std", test))]
extern crate std;

// If we are really building no_std, pull in core as well. It is aliased as std so that "use"
// statements are always the same
#[cfg(all(not(feature = "std"), not(test)))]
extern crate core as std;

extern crate half;

#[cfg(feature = "full")]
extern crate chrono;

pub(crate) mod alloc;
pub(crate) mod cursor;
pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod item;
pub(crate) mod navigate;
pub(crate) mod number;
pub(crate) mod sink;
pub(crate) mod tagnumber;

/// The `constants` module exposes the wire-format constants, implementation limits and
/// decoder option flags.
pub mod constants;

/// The `error` module contains error definitions used throughout `microcbor`.
pub mod error;

/// The `types` module exports the decoded item representation: [`types::Item`] and the
/// tagged unions it is built from.
pub mod types {
    pub use super::item::{Item, Label, Mantissa, TagSet, Value, ValueKind};
    pub use super::number::{reduce_double, reduce_single, ReducedFloat};
}

/// The `decoder` module exports the decoder context, the bounded navigation helpers and
/// the pluggable string allocator.
pub mod decoder {
    pub use super::alloc::{StringAllocator, StringPool};
    pub use super::cursor::InputCursor;
    pub use super::decode::Decoder;
    pub use super::navigate::MapQuery;
    pub use super::tagnumber::{TagContentFn, TagHandler};

    pub use super::constants::opts;
}

/// The `encoder` module exports the encoder context and the output sink it writes to.
pub mod encoder {
    pub use super::encode::Encoder;
    pub use super::sink::{FlushSink, OutputSink};
}
