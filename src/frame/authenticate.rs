// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the AUTHENTICATE response.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};

/// The AUTHENTICATE response, sent instead of READY when the server requires
/// authentication. The body is the `[string]` name of the authenticator class
/// the client must satisfy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Authenticate {
    /// The fully qualified server-side authenticator class name.
    pub authenticator: String,
}

impl Authenticate {
    pub(crate) fn encode(&self, _version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_string(&self.authenticator, payload)
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::string_len(&self.authenticator))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            authenticator: primitives::read_string(start, payload).context("cannot read authenticator class name")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let authenticate = Authenticate {
            authenticator: "org.apache.cassandra.auth.PasswordAuthenticator".to_string(),
        };
        let mut payload = Vec::new();
        authenticate.encode(ProtocolVersion::V4, &mut payload).unwrap();
        assert_eq!(authenticate.encoded_length(ProtocolVersion::V4).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(
            Authenticate::decode(&mut start, &payload, ProtocolVersion::V4).unwrap(),
            authenticate
        );
    }
}
