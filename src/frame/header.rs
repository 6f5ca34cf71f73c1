// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the frame header.

use super::{
    opcode::OpCode,
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    ensure,
    Context,
    Result,
};
use std::convert::TryFrom;

/// Direction of a frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Direction {
    Request = 0,
    Response = 1,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Request => write!(f, "request"),
            Direction::Response => write!(f, "response"),
        }
    }
}

/**
    Flags applying to a frame. The flags have the following meaning (described
    by the mask that allows selecting them):

    - `0x01`: Compression flag. If set, the frame body is compressed. The actual
            compression to use should have been set up beforehand through the
            Startup message.
    - `0x02`: Tracing flag. For a request frame, this indicates the client requires
            tracing of the request. If a response frame has the tracing flag set,
            its body contains a tracing ID. The tracing ID is a `[uuid]` and is
            the first thing in the frame body.
    - `0x04`: Custom payload flag. For a request or response frame, this indicates
            that a generic key-value custom payload is present in the frame, as a
            `[bytes map]` following the tracing ID if any.
    - `0x08`: Warning flag. The response contains warnings which were generated by
            the server to go along with this response, as a `[string list]`
            following the tracing ID if any.
    - `0x10`: Use beta flag. Indicates that the client opts in to use a protocol
            version that is currently in beta.

    The rest of the flags is currently unused and ignored.
*/
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct HeaderFlags(u8);

impl HeaderFlags {
    /// The compression flag.
    pub const COMPRESSION: u8 = 0x01;
    /// The tracing flag.
    pub const TRACING: u8 = 0x02;
    /// The custom payload flag.
    pub const CUSTOM_PAYLOAD: u8 = 0x04;
    /// The warning flag.
    pub const WARNING: u8 = 0x08;
    /// The use beta flag.
    pub const USE_BETA: u8 = 0x10;

    /// Create flags from their raw byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// The raw flags byte.
    pub fn as_byte(&self) -> u8 {
        self.0
    }

    /// Whether the frame body is compressed.
    pub fn compression(&self) -> bool {
        self.0 & Self::COMPRESSION != 0
    }

    /// Set the compression flag.
    pub fn set_compression(&mut self, value: bool) {
        self.set(Self::COMPRESSION, value);
    }

    /// Whether tracing was requested (requests) or a tracing id is present
    /// (responses).
    pub fn tracing(&self) -> bool {
        self.0 & Self::TRACING != 0
    }

    /// Set the tracing flag.
    pub fn set_tracing(&mut self, value: bool) {
        self.set(Self::TRACING, value);
    }

    /// Whether a custom payload is present in the body.
    pub fn custom_payload(&self) -> bool {
        self.0 & Self::CUSTOM_PAYLOAD != 0
    }

    /// Set the custom payload flag.
    pub fn set_custom_payload(&mut self, value: bool) {
        self.set(Self::CUSTOM_PAYLOAD, value);
    }

    /// Whether warnings are present in the body.
    pub fn warning(&self) -> bool {
        self.0 & Self::WARNING != 0
    }

    /// Set the warning flag.
    pub fn set_warning(&mut self, value: bool) {
        self.set(Self::WARNING, value);
    }

    /// Whether the beta protocol opt-in flag is set.
    pub fn use_beta(&self) -> bool {
        self.0 & Self::USE_BETA != 0
    }

    /// Set the use beta flag.
    pub fn set_use_beta(&mut self, value: bool) {
        self.set(Self::USE_BETA, value);
    }

    /// The bits of this flags byte that are not defined by the protocol.
    pub fn undefined_bits(&self) -> u8 {
        self.0 & !(Self::COMPRESSION | Self::TRACING | Self::CUSTOM_PAYLOAD | Self::WARNING | Self::USE_BETA)
    }

    fn set(&mut self, mask: u8, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

/// The full header of a frame: protocol version, direction, frame flags,
/// stream id, opcode and body length. This one shape serves both decoded and
/// raw frames; on the wire the direction rides in the high bit of the version
/// byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// The protocol version of the frame.
    pub version: ProtocolVersion,
    /// Whether the frame is a request or a response.
    pub direction: Direction,
    /// The frame flags.
    pub flags: HeaderFlags,
    /// The stream id of the frame. Requests must use non-negative values;
    /// negative ids are reserved for server-initiated streams (events use -1).
    /// v2 narrows the id to a single signed byte.
    pub stream: i16,
    /// The opcode of the message carried in the body.
    pub opcode: OpCode,
    /// The length in bytes of the (possibly compressed) frame body.
    pub body_len: i32,
}

impl Header {
    /// Create a header for the given version, direction, stream and opcode
    /// with empty flags and a zero body length; the frame codec fills both in
    /// while encoding.
    pub fn new(version: ProtocolVersion, direction: Direction, stream: i16, opcode: OpCode) -> Self {
        Self {
            version,
            direction,
            flags: HeaderFlags::default(),
            stream,
            opcode,
            body_len: 0,
        }
    }

    /// The encoded length of this header: 9 bytes, or 8 under v2.
    pub fn encoded_len(&self) -> usize {
        self.version.header_len()
    }

    /// Read a header from the payload, self-describing via its version byte.
    pub fn read(start: &mut usize, payload: &[u8]) -> Result<Self> {
        let version_byte = primitives::read_byte(start, payload).context("cannot read header version")?;
        let direction = if version_byte & 0x80 != 0 {
            Direction::Response
        } else {
            Direction::Request
        };
        let version = ProtocolVersion::try_from(version_byte & 0x7F)?;
        let flags = HeaderFlags::from_byte(primitives::read_byte(start, payload).context("cannot read header flags")?);
        let stream = if version.uses_short_stream_id() {
            primitives::read_short(start, payload).context("cannot read header stream id")? as i16
        } else {
            primitives::read_byte(start, payload).context("cannot read header stream id")? as i8 as i16
        };
        let opcode = OpCode::try_from(primitives::read_byte(start, payload).context("cannot read header opcode")?)?;
        let body_len = primitives::read_int(start, payload).context("cannot read header body length")?;
        ensure!(body_len >= 0, "invalid negative body length: {}", body_len);
        Ok(Self {
            version,
            direction,
            flags,
            stream,
            opcode,
            body_len,
        })
    }

    /// Write this header; fails when the stream id does not fit the version's
    /// stream id width.
    pub fn write(&self, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_byte(((self.direction as u8) << 7) | self.version.as_byte(), payload);
        primitives::write_byte(self.flags.as_byte(), payload);
        if self.version.uses_short_stream_id() {
            primitives::write_short(self.stream as u16, payload);
        } else {
            ensure!(
                self.stream.unsigned_abs() <= i8::MAX as u16,
                "stream id {} does not fit the single-byte stream id of {}",
                self.stream,
                self.version
            );
            primitives::write_byte(self.stream as i8 as u8, payload);
        }
        primitives::write_byte(self.opcode as u8, payload);
        primitives::write_int(self.body_len, payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_header_layout() {
        let mut header = Header::new(ProtocolVersion::V4, Direction::Request, 1, OpCode::Startup);
        header.flags.set_tracing(true);
        header.flags.set_custom_payload(true);
        let mut payload = Vec::new();
        header.write(&mut payload).unwrap();
        assert_eq!(payload, [0x04, 0x06, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
        let mut start = 0;
        assert_eq!(Header::read(&mut start, &payload).unwrap(), header);
        assert_eq!(start, 9);
    }

    #[test]
    fn response_direction_rides_the_version_byte() {
        let header = Header::new(ProtocolVersion::V5, Direction::Response, -1, OpCode::Event);
        let mut payload = Vec::new();
        header.write(&mut payload).unwrap();
        assert_eq!(payload[0], 0x85);
        assert_eq!(&payload[2..4], &(-1i16).to_be_bytes());
        let mut start = 0;
        let decoded = Header::read(&mut start, &payload).unwrap();
        assert_eq!(decoded.direction, Direction::Response);
        assert_eq!(decoded.stream, -1);
    }

    #[test]
    fn v2_stream_id_is_one_signed_byte() {
        let mut header = Header::new(ProtocolVersion::V2, Direction::Request, 127, OpCode::Query);
        let mut payload = Vec::new();
        header.write(&mut payload).unwrap();
        assert_eq!(payload.len(), 8);
        let mut start = 0;
        let decoded = Header::read(&mut start, &payload).unwrap();
        assert_eq!(decoded.stream, 127);
        assert_eq!(start, 8);

        header.stream = -127;
        let mut payload = Vec::new();
        header.write(&mut payload).unwrap();
        let mut start = 0;
        assert_eq!(Header::read(&mut start, &payload).unwrap().stream, -127);

        header.stream = 128;
        assert!(header.write(&mut Vec::new()).is_err());
        header.stream = -128;
        assert!(header.write(&mut Vec::new()).is_err());
    }

    #[test]
    fn undefined_flag_bits() {
        let flags = HeaderFlags::from_byte(0xE0);
        assert_eq!(flags.undefined_bits(), 0xE0);
        assert!(!flags.compression());
    }
}
