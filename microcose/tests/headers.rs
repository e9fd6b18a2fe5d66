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
 * Header parameter engine: bucket round trips, the critical-parameter rule matrix,
 * duplicate detection across buckets, and common-parameter extraction.
 **************************************************************************************************/

extern crate microcbor;
extern crate microcose;

use microcbor::decoder::Decoder;
use microcbor::encoder::Encoder;
use microcose::constants::{alg, label};
use microcose::error::CoseError;
use microcose::params::{
    common_params, headers_decode, headers_encode, ContentType, Location, ParamStorage,
    ParamValue, Parameter,
};

fn decode_headers<'buf, 'a>(
    input: &'buf [u8],
    slots: &'a mut [Parameter<'buf>],
) -> Result<ParamStorage<'a, 'buf>, CoseError> {
    let mut storage = ParamStorage::new(slots);
    let mut dec = Decoder::new(input, 0);
    headers_decode(&mut dec, &mut storage, Location::Body, None)?;
    dec.finish().map_err(CoseError::from)?;
    Ok(storage)
}

fn empty_slots<'buf>() -> [Parameter<'buf>; 8] {
    [Parameter::new(0, ParamValue::Empty); 8]
}

#[test]
fn buckets_round_trip() {
    let params = [
        Parameter::alg(alg::ES256),
        Parameter::kid(b"key-1"),
        Parameter::content_type_int(42),
    ];
    let mut buf = [0u8; 128];
    let mut enc = Encoder::new(&mut buf);
    headers_encode(&mut enc, &params, Location::Body).unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    let storage = decode_headers(encoded, &mut slots).unwrap();
    let decoded = storage.params();
    assert_eq!(decoded.len(), 3);

    let alg_p = decoded.iter().find(|p| p.label == label::ALG).unwrap();
    assert!(alg_p.protected);
    assert_eq!(alg_p.value, ParamValue::Int(alg::ES256));

    let kid_p = decoded.iter().find(|p| p.label == label::KID).unwrap();
    assert!(!kid_p.protected);
    assert_eq!(kid_p.value, ParamValue::Bstr(b"key-1"));

    let common = common_params(decoded, Location::Body).unwrap();
    assert_eq!(common.alg, alg::ES256);
    assert_eq!(common.kid, Some(b"key-1" as &[u8]));
    assert_eq!(common.content_type, ContentType::Int(42));
}

#[test]
fn empty_protected_bucket_is_an_empty_bstr() {
    let params = [Parameter::kid(b"k")];
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    headers_encode(&mut enc, &params, Location::Body).unwrap();
    let encoded = enc.finish().unwrap();
    assert_eq!(encoded[0], 0x40);

    let mut slots = empty_slots();
    let storage = decode_headers(encoded, &mut slots).unwrap();
    assert_eq!(storage.len(), 1);
}

/***************************************************************************************************
 * Critical parameters
 **************************************************************************************************/

/// Protected bucket << {2: [99], 99: 1} >>, empty unprotected map.
fn crit_message(with_param: bool, param_protected: bool) -> std::vec::Vec<u8> {
    let mut buf = [0u8; 128];
    let mut enc = Encoder::new(&mut buf);
    enc.open_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_i64(label::CRIT).unwrap();
    enc.open_array().unwrap();
    enc.add_i64(99).unwrap();
    enc.close_array().unwrap();
    if with_param && param_protected {
        enc.add_i64(99).unwrap();
        enc.add_i64(1).unwrap();
    }
    enc.close_map().unwrap();
    enc.close_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    if with_param && !param_protected {
        enc.add_i64(99).unwrap();
        enc.add_i64(1).unwrap();
    }
    enc.close_map().unwrap();
    enc.finish().unwrap().to_vec()
}

#[test]
fn critical_parameter_present_and_protected_succeeds() {
    let encoded = crit_message(true, true);
    let mut slots = empty_slots();
    let storage = decode_headers(&encoded, &mut slots).unwrap();
    let p = storage.params().iter().find(|p| p.label == 99).unwrap();
    assert!(p.critical);
    assert!(p.protected);
}

#[test]
fn critical_parameter_absent_fails() {
    let encoded = crit_message(false, true);
    let mut slots = empty_slots();
    assert_eq!(
        decode_headers(&encoded, &mut slots).unwrap_err(),
        CoseError::UnknownCriticalParameter
    );
}

#[test]
fn critical_parameter_in_unprotected_fails() {
    let encoded = crit_message(true, false);
    let mut slots = empty_slots();
    assert_eq!(
        decode_headers(&encoded, &mut slots).unwrap_err(),
        CoseError::ParameterNotProtected
    );
}

#[test]
fn empty_crit_list_fails() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_i64(label::CRIT).unwrap();
    enc.open_array().unwrap();
    enc.close_array().unwrap();
    enc.close_map().unwrap();
    enc.close_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.close_map().unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    assert_eq!(
        decode_headers(encoded, &mut slots).unwrap_err(),
        CoseError::EmptyCritList
    );
}

#[test]
fn crit_in_the_unprotected_bucket_fails() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_bstr_wrap().unwrap();
    enc.close_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_i64(label::CRIT).unwrap();
    enc.open_array().unwrap();
    enc.add_i64(99).unwrap();
    enc.close_array().unwrap();
    enc.close_map().unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    assert_eq!(
        decode_headers(encoded, &mut slots).unwrap_err(),
        CoseError::ParameterNotProtected
    );
}

#[test]
fn encode_synthesises_the_crit_list() {
    let params = [
        Parameter::alg(alg::ES256),
        Parameter::new(99, ParamValue::Int(1)).protect().criticalize(),
    ];
    let mut buf = [0u8; 128];
    let mut enc = Encoder::new(&mut buf);
    headers_encode(&mut enc, &params, Location::Body).unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    let storage = decode_headers(encoded, &mut slots).unwrap();
    let p = storage.params().iter().find(|p| p.label == 99).unwrap();
    assert!(p.critical);
}

#[test]
fn encode_rejects_unprotected_critical_parameters() {
    let params = [Parameter::new(99, ParamValue::Int(1)).criticalize()];
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    assert_eq!(
        headers_encode(&mut enc, &params, Location::Body),
        Err(CoseError::CritParameterInUnprotected)
    );
}

/***************************************************************************************************
 * Duplicates and malformed labels
 **************************************************************************************************/

#[test]
fn duplicate_label_across_buckets_fails() {
    // alg in protected and again in unprotected
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_i64(label::ALG).unwrap();
    enc.add_i64(alg::ES256).unwrap();
    enc.close_map().unwrap();
    enc.close_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_i64(label::ALG).unwrap();
    enc.add_i64(alg::ES384).unwrap();
    enc.close_map().unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    assert_eq!(
        decode_headers(encoded, &mut slots).unwrap_err(),
        CoseError::DuplicateParameter
    );
}

#[test]
fn non_integer_labels_fail() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_bstr_wrap().unwrap();
    enc.close_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_text("alg").unwrap();
    enc.add_i64(alg::ES256).unwrap();
    enc.close_map().unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    assert_eq!(
        decode_headers(encoded, &mut slots).unwrap_err(),
        CoseError::ParameterCbor
    );
}

#[test]
fn unknown_aggregate_values_are_skipped() {
    // An unknown parameter carrying an array value decodes as Empty and is stepped over
    let mut buf = [0u8; 64];
    let mut enc = Encoder::new(&mut buf);
    enc.open_bstr_wrap().unwrap();
    enc.close_bstr_wrap().unwrap();
    enc.open_map().unwrap();
    enc.add_i64(-70000).unwrap();
    enc.open_array().unwrap();
    enc.add_i64(1).unwrap();
    enc.add_i64(2).unwrap();
    enc.close_array().unwrap();
    enc.add_i64(label::KID).unwrap();
    enc.add_bytes(b"k").unwrap();
    enc.close_map().unwrap();
    let encoded = enc.finish().unwrap();

    let mut slots = empty_slots();
    let storage = decode_headers(encoded, &mut slots).unwrap();
    assert_eq!(storage.len(), 2);
    let unknown = storage.params().iter().find(|p| p.label == -70000).unwrap();
    assert_eq!(unknown.value, ParamValue::Empty);
    let kid = storage.params().iter().find(|p| p.label == label::KID).unwrap();
    assert_eq!(kid.value, ParamValue::Bstr(b"k"));
}

/***************************************************************************************************
 * Common parameter rules
 **************************************************************************************************/

#[test]
fn alg_must_be_protected() {
    let params = [Parameter::new(label::ALG, ParamValue::Int(alg::ES256))];
    assert_eq!(
        common_params(&params, Location::Body).unwrap_err(),
        CoseError::ParameterNotProtected
    );
}

#[test]
fn alg_must_be_present_and_not_reserved() {
    let params: [Parameter; 0] = [];
    assert_eq!(
        common_params(&params, Location::Body).unwrap_err(),
        CoseError::NoAlgorithm
    );
    let params = [Parameter::alg(alg::RESERVED)];
    assert_eq!(
        common_params(&params, Location::Body).unwrap_err(),
        CoseError::ReservedAlgorithm
    );
}

#[test]
fn iv_and_partial_iv_are_mutually_exclusive() {
    let params = [
        Parameter::alg(alg::A128GCM),
        Parameter::iv(b"0123456789ab"),
        Parameter::partial_iv(b"01"),
    ];
    assert_eq!(
        common_params(&params, Location::Body).unwrap_err(),
        CoseError::DuplicateParameter
    );
}

#[test]
fn content_type_range_is_checked() {
    let params = [
        Parameter::alg(alg::ES256),
        Parameter::new(label::CONTENT_TYPE, ParamValue::Int(-1)),
    ];
    assert_eq!(
        common_params(&params, Location::Body).unwrap_err(),
        CoseError::ContentTypeRange
    );
    let params = [
        Parameter::alg(alg::ES256),
        Parameter::new(label::CONTENT_TYPE, ParamValue::Int(0x10000)),
    ];
    assert_eq!(
        common_params(&params, Location::Body).unwrap_err(),
        CoseError::ContentTypeRange
    );
}

#[test]
fn locations_keep_parameter_lists_apart() {
    // The same label at different locations is not a duplicate
    let params = [
        Parameter::alg(alg::ES256),
        Parameter::alg(alg::ES384).at(Location::Signer(0)),
    ];
    assert_eq!(common_params(&params, Location::Body).unwrap().alg, alg::ES256);
    assert_eq!(
        common_params(&params, Location::Signer(0)).unwrap().alg,
        alg::ES384
    );
}
