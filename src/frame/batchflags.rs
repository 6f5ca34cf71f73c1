// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the BATCH flag bitmap, a subset of the query flags
//! with the same version-dependent width.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};

/**
    The batch parameter flags. Like the query flags they are a `[byte]` in v3
    and v4 and an `[int]` from v5 and in the DSE variants. Only a subset of the
    query bits is defined:

    - `0x10`: WITH_SERIAL_CONSISTENCY: a serial consistency `[short]` is present.
    - `0x20`: WITH_DEFAULT_TIMESTAMP: a default timestamp `[long]` is present.
    - `0x40`: WITH_NAMES_FOR_VALUES: child statement values are named.
    - `0x80`: WITH_KEYSPACE: a keyspace `[string]` is present (v5/DSEv2).
    - `0x100`: WITH_NOW_IN_SECONDS: a "now" override `[int]` is present (v5).
*/
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct BatchFlags(u32);

impl BatchFlags {
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
            primitives::read_int(start, payload).context("cannot read batch flags")? as u32
        } else {
            primitives::read_byte(start, payload).context("cannot read batch flags")? as u32
        };
        Ok(Self(bits))
    }

    /// Write the bitmap with the version's width.
    pub fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) {
        if version.uses_int_query_flags() {
            primitives::write_int(self.0 as i32, payload);
        } else {
            primitives::write_byte(self.0 as u8, payload);
        }
    }
}
