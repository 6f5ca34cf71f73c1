// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the flag bitmap of the query parameters block shared
//! by QUERY and EXECUTE, and reused in part by BATCH.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};

/**
    The query parameter flags. v3 and v4 encode them as a single `[byte]`;
    v5 and the DSE variants widened the bitmap to an `[int]`, which is where
    the DSE continuous-paging bits live:

    - `0x01`: VALUES: bound values follow the flags.
    - `0x02`: SKIP_METADATA: the result may omit its column metadata.
    - `0x04`: PAGE_SIZE: a page size `[int]` is present.
    - `0x08`: WITH_PAGING_STATE: a paging state `[bytes]` is present.
    - `0x10`: WITH_SERIAL_CONSISTENCY: a serial consistency `[short]` is present.
    - `0x20`: WITH_DEFAULT_TIMESTAMP: a default timestamp `[long]` is present.
    - `0x40`: WITH_NAMES_FOR_VALUES: bound values are named.
    - `0x80`: WITH_KEYSPACE: a keyspace `[string]` is present (v5/DSEv2).
    - `0x100`: WITH_NOW_IN_SECONDS: a "now" override `[int]` is present (v5).
    - `0x40000000`: PAGE_SIZE_BYTES: the page size is in bytes, not rows (DSE).
    - `0x80000000`: WITH_CONTINUOUS_PAGING: continuous paging options follow (DSE).
*/
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct QueryFlags(u32);

impl QueryFlags {
    /// The values flag.
    pub const VALUES: u32 = 0x01;
    /// The skip metadata flag.
    pub const SKIP_METADATA: u32 = 0x02;
    /// The page size flag.
    pub const PAGE_SIZE: u32 = 0x04;
    /// The paging state flag.
    pub const WITH_PAGING_STATE: u32 = 0x08;
    /// The serial consistency flag.
    pub const WITH_SERIAL_CONSISTENCY: u32 = 0x10;
    /// The default timestamp flag.
    pub const WITH_DEFAULT_TIMESTAMP: u32 = 0x20;
    /// The named values flag.
    pub const WITH_NAMES_FOR_VALUES: u32 = 0x40;
    /// The keyspace flag.
    pub const WITH_KEYSPACE: u32 = 0x80;
    /// The now-in-seconds flag.
    pub const WITH_NOW_IN_SECONDS: u32 = 0x100;
    /// The DSE page-size-in-bytes flag.
    pub const PAGE_SIZE_BYTES: u32 = 0x4000_0000;
    /// The DSE continuous paging flag.
    pub const WITH_CONTINUOUS_PAGING: u32 = 0x8000_0000;

    /// Create flags from their raw bitmap.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bitmap.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether all bits of `mask` are set.
    pub fn contains(&self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    /// Set all bits of `mask` to `value`.
    pub fn set(&mut self, mask: u32, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// The width in bytes of the flag bitmap under the given version.
    pub fn encoded_len(version: ProtocolVersion) -> usize {
        if version.uses_int_query_flags() {
            4
        } else {
            1
        }
    }

    /// Read the bitmap with the version's width.
    pub fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let bits = if version.uses_int_query_flags() {
            primitives::read_int(start, payload).context("cannot read query flags")? as u32
        } else {
            primitives::read_byte(start, payload).context("cannot read query flags")? as u32
        };
        Ok(Self(bits))
    }

    /// Write the bitmap with the version's width. Flags outside the byte range
    /// only exist on versions using the `[int]` width, which the gates in the
    /// query parameters codec guarantee.
    pub fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) {
        if version.uses_int_query_flags() {
            primitives::write_int(self.0 as i32, payload);
        } else {
            primitives::write_byte(self.0 as u8, payload);
        }
    }
}
