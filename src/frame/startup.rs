// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the STARTUP request.

use super::{
    primitives,
    version::ProtocolVersion,
};
use crate::compression::CompressionType;
use anyhow::Result;
use std::collections::HashMap;

/**
    The STARTUP message, the first message sent by a client on a connection.

    The body is a `[string map]` of options. `CQL_VERSION` is mandatory;
    `COMPRESSION` selects the body compression for all subsequent frames.
    STARTUP itself is never compressed.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Startup {
    /// The startup options.
    pub options: HashMap<String, String>,
}

impl Startup {
    /// The mandatory CQL version option key.
    pub const CQL_VERSION: &'static str = "CQL_VERSION";
    /// The compression option key.
    pub const COMPRESSION: &'static str = "COMPRESSION";
    /// The option key asking the server not to use compact storage semantics.
    pub const NO_COMPACT: &'static str = "NO_COMPACT";
    /// The option key asking the server to fail rather than shed on overload.
    pub const THROW_ON_OVERLOAD: &'static str = "THROW_ON_OVERLOAD";

    /// Create a STARTUP message advertising CQL version 3.0.0.
    pub fn new() -> Self {
        let mut options = HashMap::new();
        options.insert(Self::CQL_VERSION.to_string(), "3.0.0".to_string());
        Self { options }
    }

    /// Create a STARTUP message additionally negotiating the given body
    /// compression.
    pub fn with_compression(compression: CompressionType) -> Self {
        let mut startup = Self::new();
        startup
            .options
            .insert(Self::COMPRESSION.to_string(), compression.name().to_string());
        startup
    }

    /// The negotiated compression algorithm, if the option is present and
    /// recognized.
    pub fn compression(&self) -> Option<CompressionType> {
        self.options.get(Self::COMPRESSION)?.parse().ok()
    }

    pub(crate) fn encode(&self, _version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_string_map(&self.options, payload)
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::string_map_len(&self.options))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            options: primitives::read_string_map(start, payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let startup = Startup::with_compression(CompressionType::Lz4);
        let mut payload = Vec::new();
        startup.encode(ProtocolVersion::V4, &mut payload).unwrap();
        assert_eq!(startup.encoded_length(ProtocolVersion::V4).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(
            Startup::decode(&mut start, &payload, ProtocolVersion::V4).unwrap(),
            startup
        );
        assert_eq!(start, payload.len());
    }

    #[test]
    fn compression_option() {
        assert_eq!(Startup::new().compression(), None);
        assert_eq!(
            Startup::with_compression(CompressionType::Snappy).compression(),
            Some(CompressionType::Snappy)
        );
    }

    #[test]
    fn empty_option_map_is_two_bytes() {
        let startup = Startup::default();
        let mut payload = Vec::new();
        startup.encode(ProtocolVersion::V4, &mut payload).unwrap();
        assert_eq!(payload, [0x00, 0x00]);
    }
}
