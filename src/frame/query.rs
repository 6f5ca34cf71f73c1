// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the QUERY request and the query parameters block it
//! shares with EXECUTE.

use super::{
    consistency::Consistency,
    primitives,
    queryflags::QueryFlags,
    version::ProtocolVersion,
};
use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use std::convert::TryFrom;

/**
    A bound value. On the wire a value is a `[bytes]` whose length doubles as
    a marker: -1 is a null value and -2 (v4+) leaves the variable unset,
    which unlike null creates no tombstone.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A null value.
    Null,
    /// An unset value (v4+).
    Unset,
    /// A regular value, already encoded by its column codec.
    Bytes(Vec<u8>),
}

impl Value {
    pub(crate) fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        match self {
            Value::Null => primitives::write_int(-1, payload),
            Value::Unset => {
                ensure!(
                    version.supports_unset_values(),
                    "unset values are not supported in protocol {}",
                    version
                );
                primitives::write_int(-2, payload);
            }
            Value::Bytes(bytes) => primitives::write_bytes(Some(bytes.as_slice()), payload)?,
        }
        Ok(())
    }

    pub(crate) fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let len = primitives::read_int(start, payload).context("cannot read value length")?;
        Ok(match len {
            -1 => Value::Null,
            -2 => {
                ensure!(
                    version.supports_unset_values(),
                    "unset values are not supported in protocol {}",
                    version
                );
                Value::Unset
            }
            len if len < 0 => bail!("invalid value length: {}", len),
            len => {
                let mut content = vec![0u8; len as usize];
                let end = *start + len as usize;
                ensure!(payload.len() >= end, "cannot read value content: unexpected end of buffer");
                content.copy_from_slice(&payload[*start..end]);
                *start = end;
                Value::Bytes(content)
            }
        })
    }

    pub(crate) fn encoded_len(&self) -> usize {
        match self {
            Value::Null | Value::Unset => 4,
            Value::Bytes(bytes) => 4 + bytes.len(),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

/// The bound values of a query: absent, positional, or named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValues {
    /// No bound values.
    None,
    /// Positional values.
    Positional(Vec<Value>),
    /// Named values, in insertion order.
    Named(Vec<(String, Value)>),
}

impl Default for QueryValues {
    fn default() -> Self {
        QueryValues::None
    }
}

impl QueryValues {
    fn is_none(&self) -> bool {
        matches!(self, QueryValues::None)
    }

    pub(crate) fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        match self {
            QueryValues::None => (),
            QueryValues::Positional(values) => {
                ensure!(
                    values.len() <= u16::MAX as usize,
                    "value count {} overflows the [short] prefix",
                    values.len()
                );
                primitives::write_short(values.len() as u16, payload);
                for value in values {
                    value.write(payload, version)?;
                }
            }
            QueryValues::Named(values) => {
                ensure!(
                    values.len() <= u16::MAX as usize,
                    "value count {} overflows the [short] prefix",
                    values.len()
                );
                primitives::write_short(values.len() as u16, payload);
                for (name, value) in values {
                    primitives::write_string(name, payload)?;
                    value.write(payload, version)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn read(
        start: &mut usize,
        payload: &[u8],
        version: ProtocolVersion,
        named: bool,
    ) -> Result<Self> {
        let count = primitives::read_short(start, payload).context("cannot read value count")? as usize;
        if named {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let name = primitives::read_string(start, payload).context("cannot read value name")?;
                values.push((name, Value::read(start, payload, version)?));
            }
            Ok(QueryValues::Named(values))
        } else {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(Value::read(start, payload, version)?);
            }
            Ok(QueryValues::Positional(values))
        }
    }

    pub(crate) fn encoded_len(&self) -> usize {
        match self {
            QueryValues::None => 0,
            QueryValues::Positional(values) => 2 + values.iter().map(Value::encoded_len).sum::<usize>(),
            QueryValues::Named(values) => {
                2 + values
                    .iter()
                    .map(|(name, value)| primitives::string_len(name) + value.encoded_len())
                    .sum::<usize>()
            }
        }
    }
}

/// The DSE continuous paging options, present when the
/// WITH_CONTINUOUS_PAGING flag is set. `next_pages` only exists on the DSEv2
/// wire form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ContinuousPagingOptions {
    /// Maximum number of pages the server may push, 0 for no limit.
    pub max_pages: i32,
    /// Maximum pages per second, 0 for no limit.
    pub pages_per_second: i32,
    /// Number of pages the client is immediately ready for (DSEv2).
    pub next_pages: i32,
}

impl ContinuousPagingOptions {
    fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) {
        primitives::write_int(self.max_pages, payload);
        primitives::write_int(self.pages_per_second, payload);
        if version.supports_more_pages_revision() {
            primitives::write_int(self.next_pages, payload);
        }
    }

    fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let max_pages = primitives::read_int(start, payload).context("cannot read continuous paging max pages")?;
        let pages_per_second =
            primitives::read_int(start, payload).context("cannot read continuous paging pages per second")?;
        let next_pages = if version.supports_more_pages_revision() {
            primitives::read_int(start, payload).context("cannot read continuous paging next pages")?
        } else {
            0
        };
        Ok(Self {
            max_pages,
            pages_per_second,
            next_pages,
        })
    }

    fn encoded_len(&self, version: ProtocolVersion) -> usize {
        if version.supports_more_pages_revision() {
            12
        } else {
            8
        }
    }
}

/**
    The query parameters block: consistency, a version-width flag bitmap and
    the flag-gated options, in wire order.

    Encoding derives the bitmap from which fields are populated and fails with
    a feature-gate error when a populated field is not available under the
    version in use; nothing is silently dropped.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct QueryParams {
    /// The consistency level of the query.
    pub consistency: Consistency,
    /// The bound values.
    pub values: QueryValues,
    /// Ask the server to omit result metadata from the response.
    pub skip_metadata: bool,
    /// The desired page size, in rows (or bytes under `page_size_in_bytes`).
    pub page_size: Option<i32>,
    /// The page size unit: bytes instead of rows (DSE continuous paging).
    pub page_size_in_bytes: bool,
    /// The paging state from a previous result.
    pub paging_state: Option<Vec<u8>>,
    /// The consistency for the serial phase of conditional updates; must be
    /// SERIAL or LOCAL_SERIAL.
    pub serial_consistency: Option<Consistency>,
    /// The default timestamp in microseconds, overriding the server-assigned
    /// one.
    pub default_timestamp: Option<i64>,
    /// The keyspace the query executes in (v5/DSEv2).
    pub keyspace: Option<String>,
    /// The "now" override in seconds since the epoch, for testing (v5).
    pub now_in_seconds: Option<i32>,
    /// The DSE continuous paging options.
    pub continuous_paging: Option<ContinuousPagingOptions>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            consistency: Consistency::default(),
            values: QueryValues::None,
            skip_metadata: false,
            page_size: None,
            page_size_in_bytes: false,
            paging_state: None,
            serial_consistency: None,
            default_timestamp: None,
            keyspace: None,
            now_in_seconds: None,
            continuous_paging: None,
        }
    }
}

impl QueryParams {
    fn flags(&self) -> QueryFlags {
        let mut flags = QueryFlags::default();
        flags.set(QueryFlags::VALUES, !self.values.is_none());
        flags.set(
            QueryFlags::WITH_NAMES_FOR_VALUES,
            matches!(self.values, QueryValues::Named(_)),
        );
        flags.set(QueryFlags::SKIP_METADATA, self.skip_metadata);
        flags.set(QueryFlags::PAGE_SIZE, self.page_size.is_some());
        flags.set(QueryFlags::WITH_PAGING_STATE, self.paging_state.is_some());
        flags.set(QueryFlags::WITH_SERIAL_CONSISTENCY, self.serial_consistency.is_some());
        flags.set(QueryFlags::WITH_DEFAULT_TIMESTAMP, self.default_timestamp.is_some());
        flags.set(QueryFlags::WITH_KEYSPACE, self.keyspace.is_some());
        flags.set(QueryFlags::WITH_NOW_IN_SECONDS, self.now_in_seconds.is_some());
        flags.set(QueryFlags::PAGE_SIZE_BYTES, self.page_size_in_bytes);
        flags.set(QueryFlags::WITH_CONTINUOUS_PAGING, self.continuous_paging.is_some());
        flags
    }

    fn check(&self, version: ProtocolVersion) -> Result<()> {
        if let Some(serial) = self.serial_consistency {
            ensure!(
                serial.is_serial(),
                "serial consistency must be SERIAL or LOCAL_SERIAL, got {}",
                serial
            );
        }
        ensure!(
            self.keyspace.is_none() || version.supports_keyspace_in_request(),
            "the query keyspace option is not supported in protocol {}",
            version
        );
        ensure!(
            self.now_in_seconds.is_none() || version.supports_now_in_seconds(),
            "the now-in-seconds option is not supported in protocol {}",
            version
        );
        ensure!(
            !self.page_size_in_bytes || version.supports_continuous_paging(),
            "page sizes in bytes are not supported in protocol {}",
            version
        );
        ensure!(
            self.continuous_paging.is_none() || version.supports_continuous_paging(),
            "continuous paging is not supported in protocol {}",
            version
        );
        Ok(())
    }

    pub(crate) fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        self.check(version)?;
        primitives::write_short(self.consistency as u16, payload);
        self.flags().write(payload, version);
        self.values.write(payload, version)?;
        if let Some(page_size) = self.page_size {
            primitives::write_int(page_size, payload);
        }
        if let Some(paging_state) = &self.paging_state {
            primitives::write_bytes(Some(paging_state.as_slice()), payload)?;
        }
        if let Some(serial) = self.serial_consistency {
            primitives::write_short(serial as u16, payload);
        }
        if let Some(timestamp) = self.default_timestamp {
            primitives::write_long(timestamp, payload);
        }
        if let Some(keyspace) = &self.keyspace {
            primitives::write_string(keyspace, payload)?;
        }
        if let Some(now) = self.now_in_seconds {
            primitives::write_int(now, payload);
        }
        if let Some(options) = &self.continuous_paging {
            options.write(payload, version);
        }
        Ok(())
    }

    pub(crate) fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let consistency = Consistency::try_from(
            primitives::read_short(start, payload).context("cannot read query consistency")?,
        )?;
        let flags = QueryFlags::read(start, payload, version)?;
        ensure!(
            !flags.contains(QueryFlags::WITH_KEYSPACE) || version.supports_keyspace_in_request(),
            "the query keyspace option is not supported in protocol {}",
            version
        );
        ensure!(
            !flags.contains(QueryFlags::WITH_NOW_IN_SECONDS) || version.supports_now_in_seconds(),
            "the now-in-seconds option is not supported in protocol {}",
            version
        );
        ensure!(
            !(flags.contains(QueryFlags::WITH_CONTINUOUS_PAGING) || flags.contains(QueryFlags::PAGE_SIZE_BYTES))
                || version.supports_continuous_paging(),
            "continuous paging is not supported in protocol {}",
            version
        );
        let values = if flags.contains(QueryFlags::VALUES) {
            QueryValues::read(start, payload, version, flags.contains(QueryFlags::WITH_NAMES_FOR_VALUES))?
        } else {
            QueryValues::None
        };
        let page_size = if flags.contains(QueryFlags::PAGE_SIZE) {
            Some(primitives::read_int(start, payload).context("cannot read page size")?)
        } else {
            None
        };
        let paging_state = if flags.contains(QueryFlags::WITH_PAGING_STATE) {
            primitives::read_bytes(start, payload).context("cannot read paging state")?
        } else {
            None
        };
        let serial_consistency = if flags.contains(QueryFlags::WITH_SERIAL_CONSISTENCY) {
            let serial = Consistency::try_from(
                primitives::read_short(start, payload).context("cannot read serial consistency")?,
            )?;
            ensure!(
                serial.is_serial(),
                "serial consistency must be SERIAL or LOCAL_SERIAL, got {}",
                serial
            );
            Some(serial)
        } else {
            None
        };
        let default_timestamp = if flags.contains(QueryFlags::WITH_DEFAULT_TIMESTAMP) {
            Some(primitives::read_long(start, payload).context("cannot read default timestamp")?)
        } else {
            None
        };
        let keyspace = if flags.contains(QueryFlags::WITH_KEYSPACE) {
            Some(primitives::read_string(start, payload).context("cannot read query keyspace")?)
        } else {
            None
        };
        let now_in_seconds = if flags.contains(QueryFlags::WITH_NOW_IN_SECONDS) {
            Some(primitives::read_int(start, payload).context("cannot read now-in-seconds")?)
        } else {
            None
        };
        let continuous_paging = if flags.contains(QueryFlags::WITH_CONTINUOUS_PAGING) {
            Some(ContinuousPagingOptions::read(start, payload, version)?)
        } else {
            None
        };
        Ok(Self {
            consistency,
            values,
            skip_metadata: flags.contains(QueryFlags::SKIP_METADATA),
            page_size,
            page_size_in_bytes: flags.contains(QueryFlags::PAGE_SIZE_BYTES),
            paging_state,
            serial_consistency,
            default_timestamp,
            keyspace,
            now_in_seconds,
            continuous_paging,
        })
    }

    pub(crate) fn encoded_len(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(2
            + QueryFlags::encoded_len(version)
            + self.values.encoded_len()
            + self.page_size.map(|_| 4).unwrap_or(0)
            + self
                .paging_state
                .as_deref()
                .map(|s| primitives::bytes_len(Some(s)))
                .unwrap_or(0)
            + self.serial_consistency.map(|_| 2).unwrap_or(0)
            + self.default_timestamp.map(|_| 8).unwrap_or(0)
            + self.keyspace.as_deref().map(primitives::string_len).unwrap_or(0)
            + self.now_in_seconds.map(|_| 4).unwrap_or(0)
            + self
                .continuous_paging
                .as_ref()
                .map(|o| o.encoded_len(version))
                .unwrap_or(0))
    }
}

/// The QUERY request: a `[long string]` CQL statement and its parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// The CQL statement.
    pub query: String,
    /// The query parameters.
    pub params: QueryParams,
}

impl Query {
    /// Create a QUERY with default parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: QueryParams::default(),
        }
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_long_string(&self.query, payload)?;
        self.params.write(payload, version)
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::long_string_len(&self.query) + self.params.encoded_len(version)?)
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            query: primitives::read_long_string(start, payload).context("cannot read query string")?,
            params: QueryParams::read(start, payload, version)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(query: Query, version: ProtocolVersion) -> Vec<u8> {
        let mut payload = Vec::new();
        query.encode(version, &mut payload).unwrap();
        assert_eq!(query.encoded_length(version).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(Query::decode(&mut start, &payload, version).unwrap(), query);
        assert_eq!(start, payload.len());
        payload
    }

    #[test]
    fn bare_query() {
        let payload = round_trip(Query::new("SELECT * FROM system.local"), ProtocolVersion::V4);
        // long string, consistency, single flag byte
        assert_eq!(payload.len(), 4 + 26 + 2 + 1);
    }

    #[test]
    fn positional_and_named_values() {
        let mut query = Query::new("INSERT INTO t (a, b) VALUES (?, ?)");
        query.params.values = QueryValues::Positional(vec![
            Value::Bytes(vec![0, 0, 0, 1]),
            Value::Null,
            Value::Unset,
        ]);
        round_trip(query, ProtocolVersion::V4);

        let mut query = Query::new("INSERT INTO t (a) VALUES (:a)");
        query.params.values = QueryValues::Named(vec![("a".to_string(), Value::Bytes(vec![7]))]);
        round_trip(query, ProtocolVersion::V4);
    }

    #[test]
    fn unset_values_require_v4() {
        let mut query = Query::new("UPDATE t SET a = ? WHERE k = 1");
        query.params.values = QueryValues::Positional(vec![Value::Unset]);
        assert!(query.encode(ProtocolVersion::V3, &mut Vec::new()).is_err());
        assert!(query.encode(ProtocolVersion::V4, &mut Vec::new()).is_ok());
    }

    #[test]
    fn paging_and_timestamps() {
        let mut query = Query::new("SELECT * FROM t");
        query.params.page_size = Some(5000);
        query.params.paging_state = Some(vec![0xAA, 0xBB]);
        query.params.serial_consistency = Some(Consistency::LocalSerial);
        query.params.default_timestamp = Some(1_617_735_902_000_000);
        round_trip(query, ProtocolVersion::V3);
    }

    #[test]
    fn non_serial_serial_consistency_is_rejected() {
        let mut query = Query::new("SELECT * FROM t");
        query.params.serial_consistency = Some(Consistency::Quorum);
        assert!(query.encode(ProtocolVersion::V4, &mut Vec::new()).is_err());
    }

    #[test]
    fn keyspace_and_now_in_seconds_are_gated() {
        let mut query = Query::new("SELECT * FROM t");
        query.params.keyspace = Some("ks1".to_string());
        assert!(query.encode(ProtocolVersion::V4, &mut Vec::new()).is_err());
        assert!(query.encode(ProtocolVersion::DseV1, &mut Vec::new()).is_err());
        round_trip(query.clone(), ProtocolVersion::V5);
        round_trip(query.clone(), ProtocolVersion::DseV2);

        query.params.now_in_seconds = Some(1_617_735_902);
        assert!(query.encode(ProtocolVersion::DseV2, &mut Vec::new()).is_err());
        round_trip(query, ProtocolVersion::V5);
    }

    #[test]
    fn continuous_paging_is_dse_only() {
        let mut query = Query::new("SELECT * FROM t");
        query.params.page_size = Some(10_000);
        query.params.page_size_in_bytes = true;
        query.params.continuous_paging = Some(ContinuousPagingOptions {
            max_pages: 0,
            pages_per_second: 10,
            next_pages: 4,
        });
        assert!(query.encode(ProtocolVersion::V5, &mut Vec::new()).is_err());
        round_trip(
            Query {
                params: QueryParams {
                    continuous_paging: Some(ContinuousPagingOptions {
                        next_pages: 0,
                        ..query.params.continuous_paging.unwrap()
                    }),
                    ..query.params.clone()
                },
                ..query.clone()
            },
            ProtocolVersion::DseV1,
        );
        round_trip(query, ProtocolVersion::DseV2);
    }

    #[test]
    fn flag_width_is_one_byte_before_v5() {
        let query = Query::new("SELECT 1");
        let mut v4 = Vec::new();
        query.encode(ProtocolVersion::V4, &mut v4).unwrap();
        let mut v5 = Vec::new();
        query.encode(ProtocolVersion::V5, &mut v5).unwrap();
        assert_eq!(v5.len(), v4.len() + 3);
    }
}
