// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Frame-level integration tests: known wire vectors and cross-version
//! round trips through the full codec.

use cql_proto::{
    Batch,
    BatchChild,
    BatchStatement,
    BatchType,
    CompressionType,
    Consistency,
    CqlError,
    CqlValue,
    DataType,
    ErrorCode,
    Event,
    Frame,
    FrameCodec,
    HeaderFlags,
    Message,
    Options,
    ProtocolVersion,
    Query,
    QueryResult,
    Register,
    Rows,
    RowsMetadata,
    Startup,
    StatusChangeType,
    Supported,
    Value,
};
use maplit::hashmap;
use std::collections::HashMap;
use uuid::Uuid;

fn round_trip(codec: &FrameCodec, frame: &Frame) -> Vec<u8> {
    let mut wire = Vec::new();
    codec.encode(frame, &mut wire).unwrap();
    let mut start = 0;
    let decoded = codec.decode_frame(&mut start, &wire).unwrap();
    assert_eq!(start, wire.len(), "a frame must consume exactly its bytes");
    assert_eq!(decoded.body, frame.body);
    assert_eq!(decoded.header.version, frame.header.version);
    assert_eq!(decoded.header.stream, frame.header.stream);
    assert_eq!(decoded.header.opcode, frame.header.opcode);
    assert_eq!(
        decoded.header.body_len as usize,
        wire.len() - frame.header.version.header_len(),
        "the header body length must match the body"
    );
    wire
}

#[test]
fn traced_startup_request_wire_vector() {
    let codec = FrameCodec::new();
    let frame = Frame::request(
        ProtocolVersion::V4,
        1,
        true,
        hashmap! { "hello".to_string() => vec![0xCA, 0xFE, 0xBA, 0xBE] },
        Startup::default(),
    )
    .unwrap();
    let wire = round_trip(&codec, &frame);
    assert_eq!(
        &wire[..9],
        [
            0x04, // request, version 4
            0x06, // TRACING | CUSTOM_PAYLOAD
            0x00, 0x01, // stream 1
            0x01, // STARTUP
            0x00, 0x00, 0x00, 0x13, // body length
        ]
    );
    // custom payload first, then the empty option map
    assert_eq!(
        &wire[9..],
        [
            0x00, 0x01, // one payload entry
            0x00, 0x05, b'h', b'e', b'l', b'l', b'o', // key
            0x00, 0x00, 0x00, 0x04, 0xCA, 0xFE, 0xBA, 0xBE, // value
            0x00, 0x00, // empty [string map]
        ]
    );
}

#[test]
fn traced_rows_response_with_warnings() {
    let codec = FrameCodec::new();
    let tracing_id = Uuid::parse_str("C0D1D21E-BB01-4196-86DB-BC317BC1796A").unwrap();
    let frame = Frame::response(
        ProtocolVersion::V4,
        1,
        Some(tracing_id),
        HashMap::new(),
        vec!["I'm warning you!!".to_string()],
        QueryResult::Rows(Rows {
            metadata: RowsMetadata {
                column_count: 1,
                ..RowsMetadata::default()
            },
            data: Vec::new(),
        }),
    )
    .unwrap();
    let wire = round_trip(&codec, &frame);
    assert_eq!(wire[0], 0x84);
    assert_eq!(wire[1], HeaderFlags::TRACING | HeaderFlags::WARNING);
    // the tracing id leads the body
    assert_eq!(&wire[9..25], tracing_id.as_bytes());

    let mut start = 0;
    let decoded = codec.decode_frame(&mut start, &wire).unwrap();
    assert_eq!(decoded.body.tracing_id, Some(tracing_id));
    assert_eq!(decoded.body.warnings, frame.body.warnings);
}

#[test]
fn every_version_round_trips_its_messages() {
    let codec = FrameCodec::new();
    let versions = [
        ProtocolVersion::V3,
        ProtocolVersion::V4,
        ProtocolVersion::V5,
        ProtocolVersion::DseV1,
        ProtocolVersion::DseV2,
    ];
    for version in versions {
        let mut query = Query::new("SELECT * FROM system.peers");
        query.params.consistency = Consistency::LocalOne;
        query.params.page_size = Some(100);
        round_trip(&codec, &Frame::request(version, 10, false, HashMap::new(), query).unwrap());

        let mut batch = Batch::new(BatchType::Unlogged);
        batch.children = vec![BatchChild {
            statement: BatchStatement::Query("INSERT INTO t (k) VALUES (?)".to_string()),
            values: vec![Value::Bytes(vec![0, 0, 0, 5])],
        }];
        round_trip(&codec, &Frame::request(version, 11, false, HashMap::new(), batch).unwrap());

        round_trip(
            &codec,
            &Frame::request(version, 12, false, HashMap::new(), Register::all()).unwrap(),
        );

        round_trip(
            &codec,
            &Frame::response(
                version,
                12,
                None,
                HashMap::new(),
                Vec::new(),
                CqlError::new(ErrorCode::SyntaxError, "line 1:0 no viable alternative"),
            )
            .unwrap(),
        );

        round_trip(
            &codec,
            &Frame::response(
                version,
                -1,
                None,
                HashMap::new(),
                Vec::new(),
                Event::StatusChange {
                    change_type: StatusChangeType::Up,
                    address: "10.0.0.1:9042".parse().unwrap(),
                },
            )
            .unwrap(),
        );

        round_trip(
            &codec,
            &Frame::response(
                version,
                0,
                None,
                HashMap::new(),
                Vec::new(),
                Supported {
                    options: hashmap! {
                        "COMPRESSION".to_string() => vec!["lz4".to_string(), "snappy".to_string()],
                    },
                },
            )
            .unwrap(),
        );
    }
}

#[test]
fn compression_is_transparent_for_compressible_frames() {
    for compression in [CompressionType::Lz4, CompressionType::Snappy] {
        let codec = FrameCodec::with_compression(compression);
        let frame = Frame::response(
            ProtocolVersion::V4,
            6,
            None,
            HashMap::new(),
            vec!["warning".to_string()],
            QueryResult::SetKeyspace("ks1".to_string()),
        )
        .unwrap();
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        assert_eq!(wire[1] & HeaderFlags::COMPRESSION, HeaderFlags::COMPRESSION);
        let mut start = 0;
        let decoded = codec.decode_frame(&mut start, &wire).unwrap();
        assert_eq!(decoded.body, frame.body);
    }
}

#[test]
fn startup_and_options_never_set_the_compression_flag() {
    let codec = FrameCodec::with_compression(CompressionType::Lz4);
    for message in [Message::from(Startup::new()), Message::from(Options)] {
        let frame = Frame::request(ProtocolVersion::V4, 0, false, HashMap::new(), message).unwrap();
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        assert_eq!(wire[1] & HeaderFlags::COMPRESSION, 0);
    }
}

#[test]
fn preamble_fields_are_version_gated() {
    // custom payload on v3 fails to build and to decode
    assert!(Frame::request(
        ProtocolVersion::V3,
        0,
        false,
        hashmap! { "k".to_string() => vec![1u8] },
        Options,
    )
    .is_err());

    // hand-craft a v3 frame claiming a custom payload
    let codec = FrameCodec::new();
    let mut wire = Vec::new();
    codec
        .encode(
            &Frame::request(ProtocolVersion::V3, 0, false, HashMap::new(), Options).unwrap(),
            &mut wire,
        )
        .unwrap();
    wire[1] |= HeaderFlags::CUSTOM_PAYLOAD;
    let mut start = 0;
    let err = codec.decode_frame(&mut start, &wire).unwrap_err();
    assert!(format!("{}", err).contains("not supported in protocol v3"));

    // warnings on a request frame are rejected outright
    assert!(Frame::response(
        ProtocolVersion::V3,
        0,
        None,
        HashMap::new(),
        vec!["w".to_string()],
        Options,
    )
    .is_err());
}

#[test]
fn v2_collections_are_bounded_by_the_short_prefix() {
    let data_type = DataType::List(Box::new(DataType::Tinyint));
    let at_limit = CqlValue::List(vec![CqlValue::Tinyint(0); 65_535]);
    assert!(at_limit.encode(&data_type, ProtocolVersion::V2).is_ok());

    let over_limit = CqlValue::List(vec![CqlValue::Tinyint(0); 65_536]);
    assert!(over_limit.encode(&data_type, ProtocolVersion::V2).is_err());
    assert!(over_limit.encode(&data_type, ProtocolVersion::V3).is_ok());
}

#[test]
fn multi_frame_stream_decoding() {
    let codec = FrameCodec::new();
    let mut wire = Vec::new();
    for stream in 0..4i16 {
        codec
            .encode(
                &Frame::request(
                    ProtocolVersion::V4,
                    stream,
                    false,
                    HashMap::new(),
                    Query::new(format!("SELECT {}", stream)),
                )
                .unwrap(),
                &mut wire,
            )
            .unwrap();
    }
    let mut start = 0;
    for stream in 0..4i16 {
        let frame = codec.decode_frame(&mut start, &wire).unwrap();
        assert_eq!(frame.header.stream, stream);
    }
    assert_eq!(start, wire.len());
}

#[test]
fn length_consistency_across_message_kinds() {
    // the encoded body length always matches the header claim, which in turn
    // comes from encoded_length
    let codec = FrameCodec::new();
    let frames = vec![
        Frame::request(ProtocolVersion::V5, 1, false, HashMap::new(), {
            let mut q = Query::new("UPDATE t SET v = ? WHERE k = ?");
            q.params.values = cql_proto::QueryValues::Positional(vec![
                Value::Bytes(vec![1, 2, 3]),
                Value::Null,
                Value::Unset,
            ]);
            q.params.keyspace = Some("ks1".to_string());
            q.params.now_in_seconds = Some(12_345);
            q
        })
        .unwrap(),
        Frame::response(
            ProtocolVersion::V5,
            2,
            None,
            HashMap::new(),
            Vec::new(),
            QueryResult::Void,
        )
        .unwrap(),
    ];
    for frame in frames {
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        let mut start = 0;
        let header = codec.decode_header(&mut start, &wire).unwrap();
        assert_eq!(header.body_len as usize, wire.len() - 9);
    }
}
