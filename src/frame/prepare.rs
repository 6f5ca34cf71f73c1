// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the PREPARE request.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    ensure,
    Context,
    Result,
};

/// The PREPARE flag bitmap, an `[int]` present from v5 and DSEv2 on.
const WITH_KEYSPACE: i32 = 0x01;

/**
    The PREPARE request: a `[long string]` CQL statement to prepare. v5 and
    DSEv2 add an `[int]` flag bitmap whose only defined bit announces an
    optional keyspace `[string]` the statement is resolved against.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prepare {
    /// The CQL statement to prepare.
    pub query: String,
    /// The keyspace the statement is resolved in (v5/DSEv2).
    pub keyspace: Option<String>,
}

impl Prepare {
    /// Create a PREPARE for the given statement.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            keyspace: None,
        }
    }

    fn check(&self, version: ProtocolVersion) -> Result<()> {
        ensure!(
            self.keyspace.is_none() || version.supports_prepare_flags(),
            "the prepare keyspace option is not supported in protocol {}",
            version
        );
        Ok(())
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        self.check(version)?;
        primitives::write_long_string(&self.query, payload)?;
        if version.supports_prepare_flags() {
            let flags = if self.keyspace.is_some() { WITH_KEYSPACE } else { 0 };
            primitives::write_int(flags, payload);
            if let Some(keyspace) = &self.keyspace {
                primitives::write_string(keyspace, payload)?;
            }
        }
        Ok(())
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        let mut len = primitives::long_string_len(&self.query);
        if version.supports_prepare_flags() {
            len += 4 + self.keyspace.as_deref().map(primitives::string_len).unwrap_or(0);
        }
        Ok(len)
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let query = primitives::read_long_string(start, payload).context("cannot read statement to prepare")?;
        let keyspace = if version.supports_prepare_flags() {
            let flags = primitives::read_int(start, payload).context("cannot read prepare flags")?;
            if flags & WITH_KEYSPACE != 0 {
                Some(primitives::read_string(start, payload).context("cannot read prepare keyspace")?)
            } else {
                None
            }
        } else {
            None
        };
        Ok(Self { query, keyspace })
    }
}
