// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements decoder/encoder for a Cassandra frame and the
//! associated protocol.
//! See `https://github.com/apache/cassandra/blob/trunk/doc/native_protocol_v5.spec`
//! for more details.

pub(crate) mod auth_challenge;
pub(crate) mod auth_response;
pub(crate) mod auth_success;
pub(crate) mod authenticate;
pub(crate) mod batch;
pub(crate) mod batchflags;
pub(crate) mod consistency;
pub(crate) mod data_type;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod execute;
pub(crate) mod header;
pub(crate) mod message;
pub(crate) mod opcode;
pub(crate) mod options;
pub(crate) mod prepare;
pub mod primitives;
pub(crate) mod query;
pub(crate) mod queryflags;
pub(crate) mod register;
pub(crate) mod result;
pub(crate) mod revise;
pub(crate) mod startup;
pub(crate) mod supported;
pub(crate) mod value;
pub(crate) mod version;

pub use auth_challenge::AuthChallenge;
pub use auth_response::AuthResponse;
pub use auth_success::AuthSuccess;
pub use authenticate::Authenticate;
pub use batch::{
    Batch,
    BatchChild,
    BatchStatement,
    BatchType,
};
pub use batchflags::BatchFlags;
pub use consistency::Consistency;
pub use data_type::{
    type_codes,
    DataType,
};
pub use error::{
    CqlError,
    ErrorCode,
    ErrorDetails,
    FailureReasons,
};
pub use event::{
    Event,
    EventType,
    SchemaChange,
    SchemaChangeTarget,
    SchemaChangeType,
    StatusChangeType,
    TopologyChangeType,
};
pub use execute::Execute;
pub use header::{
    Direction,
    Header,
    HeaderFlags,
};
pub use message::Message;
pub use opcode::OpCode;
pub use options::{
    Options,
    Ready,
};
pub use prepare::Prepare;
pub use query::{
    ContinuousPagingOptions,
    Query,
    QueryParams,
    QueryValues,
    Value,
};
pub use queryflags::QueryFlags;
pub use register::Register;
pub use result::{
    result_kinds,
    ColumnSpec,
    Prepared,
    QueryResult,
    Rows,
    RowsMetadata,
    VariablesMetadata,
};
pub use revise::{
    Revise,
    ReviseType,
};
pub use startup::Startup;
pub use supported::Supported;
pub use value::{
    CqlValue,
    Duration,
    Varint,
};
pub use version::ProtocolVersion;

use crate::compression::{
    Compression,
    CompressionType,
};
use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use log::{
    trace,
    warn,
};
use std::collections::HashMap;
use uuid::Uuid;

/**
    The decoded body of a frame: the optional preamble fields announced by the
    header flags, then the message.

    The preamble fields use emptiness as their absence marker: the matching
    flag is set on encode exactly when the map or list is non-empty, and both
    are version gated (v4+), and tracing id and warnings are restricted to
    responses.
*/
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Body {
    /// The tracing id of the response, present when the client asked for
    /// tracing.
    pub tracing_id: Option<Uuid>,
    /// The opaque custom payload (v4+), reserved for proxies and custom query
    /// handlers.
    pub custom_payload: HashMap<String, Vec<u8>>,
    /// The warnings the server attached to this response (v4+).
    pub warnings: Vec<String>,
    /// The message itself.
    pub message: Message,
}

impl Body {
    /// Create a body carrying just a message.
    pub fn new(message: impl Into<Message>) -> Self {
        Self {
            tracing_id: None,
            custom_payload: HashMap::new(),
            warnings: Vec::new(),
            message: message.into(),
        }
    }
}

/// A full protocol frame: header plus decoded body.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// The frame header.
    pub header: Header,
    /// The frame body.
    pub body: Body,
}

impl Frame {
    /// Build a request frame, validating that the message actually is a
    /// request and that the preamble fields are allowed under the version.
    pub fn request(
        version: ProtocolVersion,
        stream: i16,
        tracing: bool,
        custom_payload: HashMap<String, Vec<u8>>,
        message: impl Into<Message>,
    ) -> Result<Self> {
        let message = message.into();
        ensure!(
            message.direction() == Direction::Request,
            "cannot build a request frame from a {} message ({})",
            message.direction(),
            message.opcode()
        );
        ensure!(
            custom_payload.is_empty() || version.supports_custom_payload(),
            "custom payloads are not supported in protocol {}",
            version
        );
        let mut header = Header::new(version, Direction::Request, stream, message.opcode());
        header.flags.set_tracing(tracing);
        Ok(Self {
            header,
            body: Body {
                tracing_id: None,
                custom_payload,
                warnings: Vec::new(),
                message,
            },
        })
    }

    /// Build a response frame, validating direction, tracing id and preamble
    /// version gates.
    pub fn response(
        version: ProtocolVersion,
        stream: i16,
        tracing_id: Option<Uuid>,
        custom_payload: HashMap<String, Vec<u8>>,
        warnings: Vec<String>,
        message: impl Into<Message>,
    ) -> Result<Self> {
        let message = message.into();
        ensure!(
            message.direction() == Direction::Response,
            "cannot build a response frame from a {} message ({})",
            message.direction(),
            message.opcode()
        );
        ensure!(
            custom_payload.is_empty() || version.supports_custom_payload(),
            "custom payloads are not supported in protocol {}",
            version
        );
        ensure!(
            warnings.is_empty() || version.supports_warnings(),
            "warnings are not supported in protocol {}",
            version
        );
        let mut header = Header::new(version, Direction::Response, stream, message.opcode());
        header.flags.set_tracing(tracing_id.is_some());
        Ok(Self {
            header,
            body: Body {
                tracing_id,
                custom_payload,
                warnings,
                message,
            },
        })
    }
}

/// A frame whose body is kept as opaque (possibly compressed) bytes, for
/// forwarding without the cost of a full decode.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrame {
    /// The frame header; its body length always matches `body.len()`.
    pub header: Header,
    /// The encoded body bytes, compressed when the header says so.
    pub body: Vec<u8>,
}

/**
    The frame codec: a read-only configuration bundle (the compressor choice)
    plus the encode/decode entry points. A configured codec can be shared
    freely across threads since every call owns its buffers exclusively.

    Header decoding failures are fatal to the connection; body decoding
    failures are recoverable because the header's body length lets the caller
    skip to the next frame with [`FrameCodec::discard_body`].
*/
#[derive(Copy, Clone, Debug, Default)]
pub struct FrameCodec {
    compression: Option<CompressionType>,
}

impl FrameCodec {
    /// Create a codec without body compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec compressing eligible bodies with the given algorithm.
    pub fn with_compression(compression: CompressionType) -> Self {
        Self {
            compression: Some(compression),
        }
    }

    /// The configured compression algorithm.
    pub fn compression(&self) -> Option<CompressionType> {
        self.compression
    }

    fn check_frame(&self, frame: &Frame) -> Result<()> {
        let version = frame.header.version;
        let message = &frame.body.message;
        ensure!(
            frame.header.opcode == message.opcode(),
            "header opcode {} does not match message opcode {}",
            frame.header.opcode,
            message.opcode()
        );
        ensure!(
            frame.header.direction == message.direction(),
            "header direction {} does not match {} message {}",
            frame.header.direction,
            message.direction(),
            message.opcode()
        );
        if frame.header.direction == Direction::Request {
            ensure!(
                frame.body.tracing_id.is_none(),
                "a request frame cannot carry a tracing id"
            );
            ensure!(frame.body.warnings.is_empty(), "a request frame cannot carry warnings");
        }
        ensure!(
            frame.body.custom_payload.is_empty() || version.supports_custom_payload(),
            "custom payloads are not supported in protocol {}",
            version
        );
        ensure!(
            frame.body.warnings.is_empty() || version.supports_warnings(),
            "warnings are not supported in protocol {}",
            version
        );
        if let Some(compression) = self.compression {
            ensure!(
                version.supports_compression(compression),
                "{} compression is not supported in protocol {}",
                compression,
                version
            );
        }
        Ok(())
    }

    /// The flags the encoded frame will carry, derived from the body contents
    /// and the codec configuration.
    fn encode_flags(&self, frame: &Frame) -> HeaderFlags {
        let mut flags = HeaderFlags::default();
        flags.set_tracing(match frame.header.direction {
            Direction::Request => frame.header.flags.tracing(),
            Direction::Response => frame.body.tracing_id.is_some(),
        });
        flags.set_custom_payload(!frame.body.custom_payload.is_empty());
        flags.set_warning(!frame.body.warnings.is_empty());
        flags.set_use_beta(frame.header.version.is_beta());
        flags.set_compression(self.compression.is_some() && frame.header.opcode.is_compressible());
        flags
    }

    fn write_preamble(&self, frame: &Frame, payload: &mut Vec<u8>) -> Result<()> {
        if let Some(tracing_id) = &frame.body.tracing_id {
            primitives::write_uuid(tracing_id, payload);
        }
        if !frame.body.custom_payload.is_empty() {
            primitives::write_bytes_map(&frame.body.custom_payload, payload)?;
        }
        if !frame.body.warnings.is_empty() {
            primitives::write_string_list(&frame.body.warnings, payload)?;
        }
        Ok(())
    }

    fn body_length(&self, frame: &Frame) -> Result<usize> {
        let mut len = 0;
        if frame.body.tracing_id.is_some() {
            len += primitives::UUID_LEN;
        }
        if !frame.body.custom_payload.is_empty() {
            len += primitives::bytes_map_len(&frame.body.custom_payload);
        }
        if !frame.body.warnings.is_empty() {
            len += primitives::string_list_len(&frame.body.warnings);
        }
        Ok(len + frame.body.message.encoded_length(frame.header.version)?)
    }

    /// Encode a frame into the sink. An uncompressed body is streamed
    /// straight into the sink after an exact length computation; a compressed
    /// body goes through a scratch buffer first.
    ///
    /// A failed encode may leave a partial write behind: the sink must be
    /// considered poisoned.
    pub fn encode(&self, frame: &Frame, sink: &mut Vec<u8>) -> Result<()> {
        self.check_frame(frame)?;
        let mut header = frame.header;
        header.flags = self.encode_flags(frame);
        if let Some(compression) = self.compression.filter(|_| header.flags.compression()) {
            let mut body = Vec::with_capacity(self.body_length(frame)?);
            self.write_preamble(frame, &mut body)?;
            frame
                .body
                .message
                .encode(header.version, &mut body)
                .with_context(|| format!("cannot encode {} body", header.opcode))?;
            let compressed = compression
                .compress(&body)
                .with_context(|| format!("cannot compress {} body", header.opcode))?;
            ensure!(
                compressed.len() <= i32::MAX as usize,
                "compressed body of {} bytes overflows the body length",
                compressed.len()
            );
            header.body_len = compressed.len() as i32;
            header.write(sink)?;
            sink.extend(compressed);
        } else {
            let body_len = self.body_length(frame)?;
            ensure!(
                body_len <= i32::MAX as usize,
                "body of {} bytes overflows the body length",
                body_len
            );
            header.body_len = body_len as i32;
            header.write(sink)?;
            let body_start = sink.len();
            self.write_preamble(frame, sink)?;
            frame
                .body
                .message
                .encode(header.version, sink)
                .with_context(|| format!("cannot encode {} body", header.opcode))?;
            ensure!(
                sink.len() - body_start == body_len,
                "{} body length mismatch: declared {} bytes, wrote {}",
                header.opcode,
                body_len,
                sink.len() - body_start
            );
        }
        Ok(())
    }

    /// Encode a pre-converted raw frame: its header followed by its opaque
    /// body bytes.
    pub fn encode_raw(&self, frame: &RawFrame, sink: &mut Vec<u8>) -> Result<()> {
        ensure!(
            frame.body.len() <= i32::MAX as usize,
            "body of {} bytes overflows the body length",
            frame.body.len()
        );
        let mut header = frame.header;
        header.body_len = frame.body.len() as i32;
        header.write(sink)?;
        sink.extend(&frame.body);
        Ok(())
    }

    /// Convert a frame to its raw form, encoding (and possibly compressing)
    /// the body once.
    pub fn convert_to_raw(&self, frame: &Frame) -> Result<RawFrame> {
        let mut encoded = Vec::new();
        self.encode(frame, &mut encoded)?;
        let mut start = 0;
        let header = Header::read(&mut start, &encoded)?;
        Ok(RawFrame {
            header,
            body: encoded.split_off(start),
        })
    }

    /// Decode a frame header. A failure here is fatal to the connection since
    /// resynchronization is impossible.
    pub fn decode_header(&self, start: &mut usize, payload: &[u8]) -> Result<Header> {
        let header = Header::read(start, payload).context("cannot decode frame header")?;
        if header.version.is_beta() && !header.flags.use_beta() {
            bail!(
                "protocol {} is in beta and requires the USE_BETA flag",
                header.version
            );
        }
        if header.flags.undefined_bits() != 0 {
            warn!(
                "ignoring undefined header flag bits {:#04x} on a {} frame",
                header.flags.undefined_bits(),
                header.opcode
            );
        }
        Ok(header)
    }

    /// Decode the body of a frame whose header was already read, yielding the
    /// full frame.
    pub fn decode_body(&self, header: Header, start: &mut usize, payload: &[u8]) -> Result<Frame> {
        let body_len = header.body_len as usize;
        ensure!(
            payload.len() >= *start + body_len,
            "cannot read {} body: unexpected end of buffer ({} bytes missing)",
            header.opcode,
            *start + body_len - payload.len()
        );
        let raw_body = &payload[*start..][..body_len];
        *start += body_len;
        let decompressed;
        let body_bytes = if header.flags.compression() {
            let compression = self
                .compression
                .with_context(|| format!("{} body is compressed but no compressor is configured", header.opcode))?;
            decompressed = compression
                .decompress(raw_body)
                .with_context(|| format!("cannot decompress {} body", header.opcode))?;
            decompressed.as_slice()
        } else {
            raw_body
        };
        let version = header.version;
        let mut pos = 0;
        let tracing_id = if header.flags.tracing() && header.direction == Direction::Response {
            Some(primitives::read_uuid(&mut pos, body_bytes).context("cannot read tracing id")?)
        } else {
            None
        };
        let custom_payload = if header.flags.custom_payload() {
            ensure!(
                version.supports_custom_payload(),
                "custom payloads are not supported in protocol {}",
                version
            );
            primitives::read_bytes_map(&mut pos, body_bytes).context("cannot read custom payload")?
        } else {
            HashMap::new()
        };
        let warnings = if header.flags.warning() {
            ensure!(
                version.supports_warnings(),
                "warnings are not supported in protocol {}",
                version
            );
            primitives::read_string_list(&mut pos, body_bytes).context("cannot read warnings")?
        } else {
            Vec::new()
        };
        let message = Message::decode(header.opcode, &mut pos, body_bytes, version)
            .with_context(|| format!("cannot decode {} body", header.opcode))?;
        ensure!(
            pos == body_bytes.len(),
            "{} body carries {} undecoded trailing bytes",
            header.opcode,
            body_bytes.len() - pos
        );
        ensure!(
            header.direction == message.direction(),
            "header direction {} does not match {} message {}",
            header.direction,
            message.direction(),
            header.opcode
        );
        trace!(
            "decoded {} frame: {} stream {} ({} body bytes)",
            version,
            header.opcode,
            header.stream,
            body_len
        );
        Ok(Frame {
            header,
            body: Body {
                tracing_id,
                custom_payload,
                warnings,
                message,
            },
        })
    }

    /// Copy the (possibly compressed) body of a frame whose header was
    /// already read, without decoding it.
    pub fn decode_raw_body(&self, header: &Header, start: &mut usize, payload: &[u8]) -> Result<Vec<u8>> {
        let body_len = header.body_len as usize;
        ensure!(
            payload.len() >= *start + body_len,
            "cannot read {} body: unexpected end of buffer ({} bytes missing)",
            header.opcode,
            *start + body_len - payload.len()
        );
        let body = payload[*start..][..body_len].to_vec();
        *start += body_len;
        Ok(body)
    }

    /// Skip the body of a frame whose header was already read. This is the
    /// recovery path after a body decoding failure.
    pub fn discard_body(&self, header: &Header, start: &mut usize, payload: &[u8]) -> Result<()> {
        let body_len = header.body_len as usize;
        ensure!(
            payload.len() >= *start + body_len,
            "cannot skip {} body: unexpected end of buffer ({} bytes missing)",
            header.opcode,
            *start + body_len - payload.len()
        );
        *start += body_len;
        Ok(())
    }

    /// Decode a full frame: header, preamble and message.
    pub fn decode_frame(&self, start: &mut usize, payload: &[u8]) -> Result<Frame> {
        let header = self.decode_header(start, payload)?;
        self.decode_body(header, start, payload)
    }

    /// Decode a frame keeping its body opaque.
    pub fn decode_raw_frame(&self, start: &mut usize, payload: &[u8]) -> Result<RawFrame> {
        let header = self.decode_header(start, payload)?;
        let body = self.decode_raw_body(&header, start, payload)?;
        Ok(RawFrame { header, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_rejects_responses() {
        let err = Frame::request(ProtocolVersion::V4, 0, false, HashMap::new(), Ready).unwrap_err();
        assert!(format!("{}", err).contains("response message"));
    }

    #[test]
    fn response_builder_rejects_requests() {
        assert!(Frame::response(ProtocolVersion::V4, 0, None, HashMap::new(), Vec::new(), Startup::new()).is_err());
    }

    #[test]
    fn custom_payload_is_gated_in_builders() {
        let payload = maplit::hashmap! { "k".to_string() => vec![1u8] };
        assert!(Frame::request(ProtocolVersion::V3, 0, false, payload.clone(), Options).is_err());
        assert!(Frame::request(ProtocolVersion::V4, 0, false, payload, Options).is_ok());
    }

    #[test]
    fn encode_checks_header_message_agreement() {
        let mut frame = Frame::request(ProtocolVersion::V4, 0, false, HashMap::new(), Startup::new()).unwrap();
        frame.header.opcode = OpCode::Query;
        assert!(FrameCodec::new().encode(&frame, &mut Vec::new()).is_err());
    }

    #[test]
    fn round_trip_uncompressed() {
        let codec = FrameCodec::new();
        let frame = Frame::request(ProtocolVersion::V4, 7, false, HashMap::new(), Query::new("SELECT 1")).unwrap();
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        let mut start = 0;
        let decoded = codec.decode_frame(&mut start, &wire).unwrap();
        assert_eq!(start, wire.len());
        assert_eq!(decoded.body, frame.body);
        assert_eq!(decoded.header.stream, 7);
        assert_eq!(decoded.header.body_len as usize, wire.len() - 9);
    }

    #[test]
    fn round_trip_compressed() {
        for compression in [CompressionType::Lz4, CompressionType::Snappy] {
            let codec = FrameCodec::with_compression(compression);
            let frame =
                Frame::request(ProtocolVersion::V4, 1, false, HashMap::new(), Query::new("SELECT 1")).unwrap();
            let mut wire = Vec::new();
            codec.encode(&frame, &mut wire).unwrap();
            assert_eq!(wire[1] & HeaderFlags::COMPRESSION, HeaderFlags::COMPRESSION);
            let mut start = 0;
            let decoded = codec.decode_frame(&mut start, &wire).unwrap();
            assert_eq!(decoded.body, frame.body);
        }
    }

    #[test]
    fn startup_is_never_compressed() {
        let codec = FrameCodec::with_compression(CompressionType::Lz4);
        let frame = Frame::request(ProtocolVersion::V4, 0, false, HashMap::new(), Startup::new()).unwrap();
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        assert_eq!(wire[1] & HeaderFlags::COMPRESSION, 0);
        let mut start = 0;
        assert_eq!(codec.decode_frame(&mut start, &wire).unwrap().body, frame.body);
    }

    #[test]
    fn snappy_is_rejected_on_v5() {
        let codec = FrameCodec::with_compression(CompressionType::Snappy);
        let frame = Frame::request(ProtocolVersion::V5, 0, false, HashMap::new(), Options).unwrap();
        assert!(codec.encode(&frame, &mut Vec::new()).is_err());
    }

    #[test]
    fn compressed_body_without_compressor_is_rejected() {
        let codec = FrameCodec::with_compression(CompressionType::Lz4);
        let frame = Frame::request(ProtocolVersion::V4, 0, false, HashMap::new(), Query::new("SELECT 1")).unwrap();
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        let mut start = 0;
        let err = FrameCodec::new().decode_frame(&mut start, &wire).unwrap_err();
        assert!(format!("{:#}", err).contains("no compressor"));
    }

    #[test]
    fn raw_round_trip() {
        let codec = FrameCodec::new();
        let frame = Frame::request(ProtocolVersion::V4, 3, false, HashMap::new(), Query::new("SELECT 1")).unwrap();
        let raw = codec.convert_to_raw(&frame).unwrap();
        assert_eq!(raw.header.body_len as usize, raw.body.len());
        let mut wire = Vec::new();
        codec.encode_raw(&raw, &mut wire).unwrap();
        let mut direct = Vec::new();
        codec.encode(&frame, &mut direct).unwrap();
        assert_eq!(wire, direct);

        let mut start = 0;
        let reraw = codec.decode_raw_frame(&mut start, &wire).unwrap();
        assert_eq!(reraw, raw);
    }

    #[test]
    fn discard_body_skips_to_the_next_frame() {
        let codec = FrameCodec::new();
        let mut wire = Vec::new();
        codec
            .encode(
                &Frame::request(ProtocolVersion::V4, 1, false, HashMap::new(), Query::new("SELECT 1")).unwrap(),
                &mut wire,
            )
            .unwrap();
        codec
            .encode(
                &Frame::request(ProtocolVersion::V4, 2, false, HashMap::new(), Options).unwrap(),
                &mut wire,
            )
            .unwrap();
        let mut start = 0;
        let header = codec.decode_header(&mut start, &wire).unwrap();
        codec.discard_body(&header, &mut start, &wire).unwrap();
        let second = codec.decode_frame(&mut start, &wire).unwrap();
        assert_eq!(second.header.stream, 2);
        assert_eq!(start, wire.len());
    }

    #[test]
    fn trailing_garbage_in_body_is_a_protocol_error() {
        let codec = FrameCodec::new();
        let frame = Frame::request(ProtocolVersion::V4, 0, false, HashMap::new(), Options).unwrap();
        let mut wire = Vec::new();
        codec.encode(&frame, &mut wire).unwrap();
        // extend the body with one byte the message codec will not consume
        wire.push(0xAB);
        let len = (wire.len() - 9) as i32;
        wire[5..9].copy_from_slice(&len.to_be_bytes());
        let mut start = 0;
        let err = codec.decode_frame(&mut start, &wire).unwrap_err();
        assert!(format!("{}", err).contains("trailing"));
    }

    #[test]
    fn body_errors_are_recoverable_headers_are_not() {
        let codec = FrameCodec::new();
        // an unknown version byte poisons the stream
        let mut start = 0;
        assert!(codec.decode_header(&mut start, &[0x01, 0, 0, 0, 0x05, 0, 0, 0, 0]).is_err());

        // a bad body leaves the cursor positioned after the frame
        let mut wire = Vec::new();
        codec
            .encode(
                &Frame::request(ProtocolVersion::V4, 1, false, HashMap::new(), Query::new("SELECT 1")).unwrap(),
                &mut wire,
            )
            .unwrap();
        wire.truncate(wire.len() - 1);
        let len = (wire.len() - 9) as i32;
        wire[5..9].copy_from_slice(&len.to_be_bytes());
        let mut start = 0;
        let header = codec.decode_header(&mut start, &wire).unwrap();
        assert!(codec.decode_body(header, &mut start, &wire).is_err());
    }
}
