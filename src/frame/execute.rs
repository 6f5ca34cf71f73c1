// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the EXECUTE request.

use super::{
    primitives,
    query::QueryParams,
    version::ProtocolVersion,
};
use anyhow::{
    ensure,
    Context,
    Result,
};

/**
    The EXECUTE request: a `[short bytes]` prepared statement id, under v5 and
    DSEv2 the `[short bytes]` result-metadata id the client knows for that
    statement, and a query parameters block.

    The result-metadata id is mandatory on versions that define it: the server
    compares it against the current result shape and announces changes through
    the METADATA_CHANGED result flag.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Execute {
    /// The prepared statement id from the Prepared result.
    pub id: Vec<u8>,
    /// The result-metadata id from the Prepared result (v5/DSEv2).
    pub result_metadata_id: Option<Vec<u8>>,
    /// The query parameters.
    pub params: QueryParams,
}

impl Execute {
    /// Create an EXECUTE of the given prepared statement id with default
    /// parameters.
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            result_metadata_id: None,
            params: QueryParams::default(),
        }
    }

    fn check(&self, version: ProtocolVersion) -> Result<()> {
        if version.supports_result_metadata_id() {
            ensure!(
                self.result_metadata_id.is_some(),
                "protocol {} requires the result-metadata id in EXECUTE",
                version
            );
        } else {
            ensure!(
                self.result_metadata_id.is_none(),
                "the result-metadata id is not supported in protocol {}",
                version
            );
        }
        Ok(())
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        self.check(version)?;
        primitives::write_short_bytes(&self.id, payload)?;
        if let Some(result_metadata_id) = &self.result_metadata_id {
            primitives::write_short_bytes(result_metadata_id, payload)?;
        }
        self.params.write(payload, version)
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(primitives::short_bytes_len(&self.id)
            + self
                .result_metadata_id
                .as_deref()
                .map(primitives::short_bytes_len)
                .unwrap_or(0)
            + self.params.encoded_len(version)?)
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let id = primitives::read_short_bytes(start, payload).context("cannot read prepared statement id")?;
        let result_metadata_id = if version.supports_result_metadata_id() {
            Some(primitives::read_short_bytes(start, payload).context("cannot read result-metadata id")?)
        } else {
            None
        };
        Ok(Self {
            id,
            result_metadata_id,
            params: QueryParams::read(start, payload, version)?,
        })
    }
}
