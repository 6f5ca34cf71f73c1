// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the AUTH_SUCCESS response.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};

/// The AUTH_SUCCESS response concluding the authentication exchange. The body
/// is one final `[bytes]` token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSuccess {
    /// The final SASL token.
    pub token: Option<Vec<u8>>,
}

impl AuthSuccess {
    pub(crate) fn encode(&self, _version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_bytes(self.token.as_deref(), payload)
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::bytes_len(self.token.as_deref()))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            token: primitives::read_bytes(start, payload).context("cannot read SASL success token")?,
        })
    }
}
