// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the SUPPORTED response.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};
use std::collections::HashMap;

/// The SUPPORTED response to an OPTIONS request. The body is a
/// `[string multimap]` of the startup options the server accepts and their
/// possible values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Supported {
    /// The supported startup options.
    pub options: HashMap<String, Vec<String>>,
}

impl Supported {
    /// The values advertised for the given option key.
    pub fn get(&self, option: &str) -> &[String] {
        self.options.get(option).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn encode(&self, _version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_string_multimap(&self.options, payload)
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::string_multimap_len(&self.options))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            options: primitives::read_string_multimap(start, payload).context("cannot read supported options")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn round_trip() {
        let supported = Supported {
            options: hashmap! {
                "CQL_VERSION".to_string() => vec!["3.4.5".to_string()],
                "COMPRESSION".to_string() => vec!["lz4".to_string(), "snappy".to_string()],
            },
        };
        let mut payload = Vec::new();
        supported.encode(ProtocolVersion::V4, &mut payload).unwrap();
        assert_eq!(supported.encoded_length(ProtocolVersion::V4).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(
            Supported::decode(&mut start, &payload, ProtocolVersion::V4).unwrap(),
            supported
        );
        assert_eq!(supported.get("COMPRESSION").len(), 2);
        assert!(supported.get("PROTOCOL_VERSIONS").is_empty());
    }
}
