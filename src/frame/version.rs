// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the known protocol versions and their feature gates.

use anyhow::{
    bail,
    Result,
};
use std::{
    convert::TryFrom,
    fmt,
};

/**
    A native protocol version.

    The version is carried in the low 7 bits of the first header byte (the high
    bit encodes the direction of the frame). Bit `0x40` marks the DataStax
    Enterprise variants, which extend the OSS protocol with continuous paging
    and the REVISE_REQUEST message.

    The discriminants follow the wire encoding, which also gives the feature
    ordering used by the gates below: `V2 < V3 < V4 < V5 < DseV1 < DseV2`,
    where DSEv1 behaves as a superset of v4 for frame-level features and DSEv2
    as a superset of v5.
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ProtocolVersion {
    V2 = 0x02,
    V3 = 0x03,
    V4 = 0x04,
    V5 = 0x05,
    DseV1 = 0x41,
    DseV2 = 0x42,
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::V4
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = anyhow::Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x02 => ProtocolVersion::V2,
            0x03 => ProtocolVersion::V3,
            0x04 => ProtocolVersion::V4,
            0x05 => ProtocolVersion::V5,
            0x41 => ProtocolVersion::DseV1,
            0x42 => ProtocolVersion::DseV2,
            b => bail!("unsupported protocol version: {:#04x}", b),
        })
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V2 => write!(f, "v2"),
            ProtocolVersion::V3 => write!(f, "v3"),
            ProtocolVersion::V4 => write!(f, "v4"),
            ProtocolVersion::V5 => write!(f, "v5"),
            ProtocolVersion::DseV1 => write!(f, "DSEv1"),
            ProtocolVersion::DseV2 => write!(f, "DSEv2"),
        }
    }
}

impl ProtocolVersion {
    /// The wire encoding of this version (low 7 bits of the first header byte).
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Whether this is a DataStax Enterprise variant.
    pub fn is_dse(&self) -> bool {
        self.as_byte() & 0x40 != 0
    }

    /// Whether this version is a beta protocol. Beta versions must be requested
    /// with the USE_BETA frame flag; no beta version is currently in the
    /// supported set, so this always returns `false`.
    pub fn is_beta(&self) -> bool {
        false
    }

    /// The byte length of a frame header under this version: v2 headers carry a
    /// single-byte stream id and are 8 bytes, v3 and later are 9 bytes.
    pub fn header_len(&self) -> usize {
        if *self == ProtocolVersion::V2 {
            8
        } else {
            9
        }
    }

    /// Whether stream ids are 2-byte signed values (v3+) rather than v2's
    /// single signed byte.
    pub fn uses_short_stream_id(&self) -> bool {
        *self >= ProtocolVersion::V3
    }

    /// Custom payloads in the frame body preamble (v4+).
    pub fn supports_custom_payload(&self) -> bool {
        *self >= ProtocolVersion::V4
    }

    /// Warnings in the frame body preamble of responses (v4+).
    pub fn supports_warnings(&self) -> bool {
        *self >= ProtocolVersion::V4
    }

    /// Unset bound values in QUERY/EXECUTE/BATCH (v4+).
    pub fn supports_unset_values(&self) -> bool {
        *self >= ProtocolVersion::V4
    }

    /// The `date`, `time`, `smallint` and `tinyint` data types (v4+).
    pub fn supports_v4_types(&self) -> bool {
        *self >= ProtocolVersion::V4
    }

    /// The `udt` and `tuple` data types (v3+).
    pub fn supports_udt_and_tuple(&self) -> bool {
        *self >= ProtocolVersion::V3
    }

    /// The deprecated `text` type code 0x000A, folded into `varchar` in v3.
    pub fn supports_text_alias(&self) -> bool {
        *self <= ProtocolVersion::V2
    }

    /// The `duration` data type (v5 and DSE only).
    pub fn supports_duration(&self) -> bool {
        *self >= ProtocolVersion::V5
    }

    /// Partition key indices in the Prepared result variables metadata (v4+).
    pub fn supports_pk_indices(&self) -> bool {
        *self >= ProtocolVersion::V4
    }

    /// Per-node failure reason maps in READ_FAILURE/WRITE_FAILURE errors;
    /// earlier versions carry a plain failure count.
    pub fn supports_reason_map(&self) -> bool {
        *self >= ProtocolVersion::V5
    }

    /// 4-byte QUERY/EXECUTE/BATCH flag bitmaps. v3/v4 use a single byte; v5
    /// and both DSE variants widened the bitmap to an `[int]` to make room for
    /// the continuous-paging bits.
    pub fn uses_int_query_flags(&self) -> bool {
        *self >= ProtocolVersion::V5
    }

    /// 4-byte element counts and lengths inside collection values (v3+);
    /// v2 collections use 2-byte lengths.
    pub fn uses_int_collection_length(&self) -> bool {
        *self >= ProtocolVersion::V3
    }

    /// The PREPARE flag bitmap and its WITH_KEYSPACE option (v5 and DSEv2).
    pub fn supports_prepare_flags(&self) -> bool {
        matches!(self, ProtocolVersion::V5 | ProtocolVersion::DseV2)
    }

    /// The WITH_KEYSPACE query/batch flag (v5 and DSEv2).
    pub fn supports_keyspace_in_request(&self) -> bool {
        matches!(self, ProtocolVersion::V5 | ProtocolVersion::DseV2)
    }

    /// The result-metadata id exchanged by EXECUTE and the Prepared/Rows
    /// results (v5 and DSEv2).
    pub fn supports_result_metadata_id(&self) -> bool {
        matches!(self, ProtocolVersion::V5 | ProtocolVersion::DseV2)
    }

    /// The NOW_IN_SECONDS query/batch option (OSS v5 only).
    pub fn supports_now_in_seconds(&self) -> bool {
        *self == ProtocolVersion::V5
    }

    /// Continuous paging options and result metadata (DSE only).
    pub fn supports_continuous_paging(&self) -> bool {
        self.is_dse()
    }

    /// The REVISE_REQUEST message (DSE only).
    pub fn supports_revise_request(&self) -> bool {
        self.is_dse()
    }

    /// The MORE_CONTINUOUS_PAGES revision type (DSEv2 only).
    pub fn supports_more_pages_revision(&self) -> bool {
        *self == ProtocolVersion::DseV2
    }

    /// Function and aggregate schema-change targets (v4+).
    pub fn supports_function_schema_changes(&self) -> bool {
        *self >= ProtocolVersion::V4
    }

    /// Whether the given compression algorithm may be negotiated under this
    /// version; OSS v5 dropped Snappy.
    pub fn supports_compression(&self, compression: crate::compression::CompressionType) -> bool {
        match compression {
            crate::compression::CompressionType::Snappy => *self != ProtocolVersion::V5,
            crate::compression::CompressionType::Lz4 => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering_matches_features() {
        assert!(ProtocolVersion::V3 < ProtocolVersion::V5);
        assert!(ProtocolVersion::DseV1.supports_custom_payload());
        assert!(ProtocolVersion::DseV1.supports_reason_map());
        assert!(!ProtocolVersion::DseV1.supports_prepare_flags());
        assert!(ProtocolVersion::DseV2.supports_prepare_flags());
        assert!(!ProtocolVersion::DseV2.supports_now_in_seconds());
        assert!(ProtocolVersion::V5.supports_now_in_seconds());
        assert!(!ProtocolVersion::V3.supports_custom_payload());
        assert!(ProtocolVersion::V2.supports_text_alias());
        assert!(!ProtocolVersion::V3.supports_text_alias());
    }

    #[test]
    fn dse_bit() {
        assert!(ProtocolVersion::DseV1.is_dse());
        assert!(ProtocolVersion::DseV2.is_dse());
        assert!(!ProtocolVersion::V5.is_dse());
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!(ProtocolVersion::try_from(0x01).is_err());
        assert!(ProtocolVersion::try_from(0x43).is_err());
    }

    #[test]
    fn header_len_depends_on_stream_id_width() {
        assert_eq!(ProtocolVersion::V2.header_len(), 8);
        assert_eq!(ProtocolVersion::V4.header_len(), 9);
        assert!(!ProtocolVersion::V2.uses_short_stream_id());
    }
}
