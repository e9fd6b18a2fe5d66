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
 * microcbor CBOR Error API
 *
 * Errors are grouped into ranges: not-well-formed, invalid-but-well-formed, implementation
 * limit, configuration, output sink, conversion and a user range reserved for callbacks.
 * The decoder and encoder each hold one sticky error; once set, subsequent operations are
 * no-ops returning it, so linear call sequences need only check at the end.
 **************************************************************************************************/
use std::result;

#[cfg(any(feature = "full", test))]
use thiserror::Error;

/// An alias for Result<T, CBORError> used throughout this crate.
pub type Result<T> = result::Result<T, CBORError>;

/// `CBORError` reports decode, encode and conversion failures.
#[cfg_attr(any(feature = "full", test), derive(Copy, Clone, PartialEq, Error, Debug))]
#[cfg_attr(all(not(feature = "full"), not(test)), derive(Copy, Clone, PartialEq, Debug))]
pub enum CBORError {
    // Not-well-formed encodings. Unrecoverable: the cursor position is indeterminate.
    /// The input ended in the middle of an item
    #[cfg_attr(any(feature = "full", test), error("Input ended in the middle of an item"))]
    HitEnd,
    /// Additional information 28-30 is reserved, or 31 used where it is not allowed
    #[cfg_attr(any(feature = "full", test), error("Reserved or misplaced additional information value"))]
    BadInt,
    /// A break byte appeared outside an indefinite length container
    #[cfg_attr(any(feature = "full", test), error("Break outside an indefinite length container"))]
    BadBreak,
    /// A two-byte simple value encoded an argument below 32
    #[cfg_attr(any(feature = "full", test), error("Two-byte simple value with argument below 32"))]
    BadType7,
    /// The encoding is not supported by this implementation
    #[cfg_attr(any(feature = "full", test), error("Encoding is not supported"))]
    Unsupported,
    /// A chunk of an indefinite length string was not a definite string of the same major type
    #[cfg_attr(any(feature = "full", test), error("Bad chunk inside an indefinite length string"))]
    IndefiniteStringChunk,
    /// A tstr contains an invalid UTF-8 sequence
    #[cfg_attr(any(feature = "full", test), error("A tstr contains an invalid UTF8 sequence"))]
    Utf8,

    // Invalid but well-formed encodings.
    /// No further items in the current bounded container or input. This is a traversal
    /// boundary signal; it does not stick to the context.
    #[cfg_attr(any(feature = "full", test), error("No more items in the bounded container"))]
    NoMoreItems,
    /// Tag 4/5 content was not a two-element array of exponent and mantissa
    #[cfg_attr(any(feature = "full", test), error("Bad decimal fraction or bigfloat content"))]
    BadExpMantissa,
    /// Tag content did not have the type the tag number requires
    #[cfg_attr(any(feature = "full", test), error("Tag content has the wrong type"))]
    UnrecoverableTagContent,
    /// Tag 1 or tag 100 content does not fit the epoch representation
    #[cfg_attr(any(feature = "full", test), error("Epoch date out of range"))]
    DateOverflow,
    /// A map label has a type not allowed by the decode options
    #[cfg_attr(any(feature = "full", test), error("Map label type not allowed"))]
    MapLabelType,
    /// Input remained after the top level item at finish
    #[cfg_attr(any(feature = "full", test), error("Extra bytes after the decoded item"))]
    ExtraBytes,

    // Conformance failures (configuration dependent).
    /// Shortest-form or definite-length rules of preferred serialization were violated
    #[cfg_attr(any(feature = "full", test), error("Not preferred serialization"))]
    NotPreferred,
    /// A bignum that fits a native integer was encoded as a bignum
    #[cfg_attr(any(feature = "full", test), error("Bignum fits a native integer"))]
    NotPreferredBigNum,
    /// Map labels are not in bytewise lexicographic order
    #[cfg_attr(any(feature = "full", test), error("Map labels not sorted"))]
    Unsorted,
    /// The sought map label, or a label under sorted-map checking, appeared twice
    #[cfg_attr(any(feature = "full", test), error("Duplicate map label"))]
    DuplicateLabel,
    /// The sought label is not present in the map
    #[cfg_attr(any(feature = "full", test), error("Label not found in map"))]
    LabelNotFound,
    /// A dCBOR rule (reduced floats, restricted simples) was violated
    #[cfg_attr(any(feature = "full", test), error("dCBOR conformance violation"))]
    DcborConformance,
    /// A tag number was left unconsumed on a returned item
    #[cfg_attr(any(feature = "full", test), error("Unprocessed tag number on item"))]
    UnprocessedTagNumber,

    // Implementation limits.
    /// Arrays and maps nest deeper than the fixed frame stack
    #[cfg_attr(any(feature = "full", test), error("Array or map nesting too deep"))]
    ArrayOrMapNestingTooDeep,
    /// A definite length container declared more elements than the per-container limit
    #[cfg_attr(any(feature = "full", test), error("Array or map declares too many elements"))]
    ArrayDecodeTooLong,
    /// More tag numbers on one item than the fixed tag list
    #[cfg_attr(any(feature = "full", test), error("Too many tag numbers on one item"))]
    TooManyTags,
    /// The input is larger than the maximum the 32 bit cursor supports
    #[cfg_attr(any(feature = "full", test), error("Input too large"))]
    InputTooLarge,

    // Configuration and usage.
    /// An indefinite length string was met and no string allocator is configured
    #[cfg_attr(any(feature = "full", test), error("No string allocator configured"))]
    NoStringAllocator,
    /// The string allocator pool is exhausted
    #[cfg_attr(any(feature = "full", test), error("String allocator pool exhausted"))]
    PoolExhausted,
    /// Exit does not match the most recently entered bounded container
    #[cfg_attr(any(feature = "full", test), error("Exit does not match the entered container"))]
    ExitMismatch,
    /// A label operation was attempted with no bounded map entered
    #[cfg_attr(any(feature = "full", test), error("No bounded map entered"))]
    MapNotEntered,
    /// Finish was called with a container still open
    #[cfg_attr(any(feature = "full", test), error("Array or map still open"))]
    ArrayOrMapStillOpen,
    /// More closes than opens
    #[cfg_attr(any(feature = "full", test), error("Close without a matching open"))]
    TooManyCloses,
    /// A map was closed with an odd number of items
    #[cfg_attr(any(feature = "full", test), error("Map closed with an odd number of items"))]
    OddMapItems,

    // Conversion failures. Recoverable.
    /// A number conversion has overflowed
    #[cfg_attr(any(feature = "full", test), error("Overflow in number conversion"))]
    ConversionOverflow,
    /// A number conversion has underflowed
    #[cfg_attr(any(feature = "full", test), error("Underflow in number conversion"))]
    ConversionUnderflow,
    /// Attempt to convert an item of incompatible type
    #[cfg_attr(any(feature = "full", test), error("Attempt to convert an item of incompatible type"))]
    IncompatibleType,

    // Output sink.
    /// The output buffer is too small for the next emit
    #[cfg_attr(any(feature = "full", test), error("Output buffer too small"))]
    BufferTooSmall,
    /// The sink magic guard does not match; the context was not initialized or was corrupted
    #[cfg_attr(any(feature = "full", test), error("Sink context not initialized or corrupted"))]
    BadState,
    /// Insertion offset is past the valid data watermark
    #[cfg_attr(any(feature = "full", test), error("Insertion point past valid data"))]
    InsertPoint,
    /// Operation is not available in streaming mode
    #[cfg_attr(any(feature = "full", test), error("Operation not available in streaming mode"))]
    Streaming,
    /// Operation requires streaming mode
    #[cfg_attr(any(feature = "full", test), error("Operation requires streaming mode"))]
    NotStreaming,
    /// The streaming flush callback failed
    #[cfg_attr(any(feature = "full", test), error("Streaming flush failed"))]
    FlushWrite,

    /// Reserved range for caller-supplied callbacks to surface protocol errors
    #[cfg_attr(any(feature = "full", test), error("Callback error {0}"))]
    UserError(u8),
}

impl CBORError {
    /// Return `true` if the error means the input is not well-formed CBOR. The cursor
    /// position is indeterminate and the only valid operation on the context is `init`.
    pub fn is_not_well_formed(&self) -> bool {
        matches!(
            self,
            CBORError::HitEnd
                | CBORError::BadInt
                | CBORError::BadBreak
                | CBORError::BadType7
                | CBORError::Unsupported
                | CBORError::IndefiniteStringChunk
        )
    }

    /// Return `true` if decoding cannot continue after this error.
    pub fn is_unrecoverable(&self) -> bool {
        self.is_not_well_formed()
            || matches!(
                self,
                CBORError::NoMoreItems
                    | CBORError::BadExpMantissa
                    | CBORError::UnrecoverableTagContent
            )
    }

    /// Return `true` if the error can be cleared with `get_and_reset_error` and decoding
    /// resumed, possibly after `rewind`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CBORError::DuplicateLabel
                | CBORError::LabelNotFound
                | CBORError::ConversionOverflow
                | CBORError::ConversionUnderflow
                | CBORError::IncompatibleType
        )
    }
}
