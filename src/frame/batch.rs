// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the BATCH request.

use super::{
    batchflags::BatchFlags,
    consistency::Consistency,
    primitives,
    query::Value,
    version::ProtocolVersion,
};
use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use std::convert::TryFrom;

/// The kind of a batch, its first body byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BatchType {
    /// A logged batch: atomicity through the batch log.
    Logged = 0,
    /// An unlogged batch: no atomicity guarantee.
    Unlogged = 1,
    /// A batch of counter updates.
    Counter = 2,
}

impl TryFrom<u8> for BatchType {
    type Error = anyhow::Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => BatchType::Logged,
            1 => BatchType::Unlogged,
            2 => BatchType::Counter,
            b => bail!("unknown batch type: {:#04x}", b),
        })
    }
}

/// One statement of a batch: an inline CQL string or a prepared statement id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchStatement {
    /// An inline CQL statement (child kind 0).
    Query(String),
    /// A prepared statement id (child kind 1).
    Prepared(Vec<u8>),
}

/// One child of a batch: a statement and its positional bound values.
///
/// The wire format reserves a names-for-values layout behind the batch flag
/// `0x40`, but the flag trails the children it would re-shape and the server
/// has never accepted it; like the protocol spec, this codec treats it as
/// broken and only supports positional values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchChild {
    /// The statement to execute.
    pub statement: BatchStatement,
    /// The positional bound values of this statement.
    pub values: Vec<Value>,
}

impl BatchChild {
    fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        match &self.statement {
            BatchStatement::Query(query) => {
                primitives::write_byte(0, payload);
                primitives::write_long_string(query, payload)?;
            }
            BatchStatement::Prepared(id) => {
                primitives::write_byte(1, payload);
                primitives::write_short_bytes(id, payload)?;
            }
        }
        ensure!(
            self.values.len() <= u16::MAX as usize,
            "batch child value count {} overflows the [short] prefix",
            self.values.len()
        );
        primitives::write_short(self.values.len() as u16, payload);
        for value in &self.values {
            value.write(payload, version)?;
        }
        Ok(())
    }

    fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let kind = primitives::read_byte(start, payload).context("cannot read batch child kind")?;
        let statement = match kind {
            0 => BatchStatement::Query(
                primitives::read_long_string(start, payload).context("cannot read batch child statement")?,
            ),
            1 => BatchStatement::Prepared(
                primitives::read_short_bytes(start, payload).context("cannot read batch child prepared id")?,
            ),
            b => bail!("unknown batch child kind: {:#04x}", b),
        };
        let count = primitives::read_short(start, payload).context("cannot read batch child value count")? as usize;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(Value::read(start, payload, version)?);
        }
        Ok(Self { statement, values })
    }

    fn encoded_len(&self) -> usize {
        let statement_len = match &self.statement {
            BatchStatement::Query(query) => 1 + primitives::long_string_len(query),
            BatchStatement::Prepared(id) => 1 + primitives::short_bytes_len(id),
        };
        statement_len + 2 + self.values.iter().map(Value::encoded_len).sum::<usize>()
    }
}

/**
    The BATCH request: a batch type, a list of children (each an inline
    statement or a prepared id with its values), the batch consistency and a
    flag-gated options tail mirroring a subset of the query parameters.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    /// The kind of batch.
    pub batch_type: BatchType,
    /// The batched statements.
    pub children: Vec<BatchChild>,
    /// The consistency level of the batch.
    pub consistency: Consistency,
    /// The consistency for the serial phase of conditional updates.
    pub serial_consistency: Option<Consistency>,
    /// The default timestamp in microseconds.
    pub default_timestamp: Option<i64>,
    /// The keyspace the batch executes in (v5/DSEv2).
    pub keyspace: Option<String>,
    /// The "now" override in seconds since the epoch (v5).
    pub now_in_seconds: Option<i32>,
}

impl Batch {
    /// Create an empty batch of the given type.
    pub fn new(batch_type: BatchType) -> Self {
        Self {
            batch_type,
            children: Vec::new(),
            consistency: Consistency::default(),
            serial_consistency: None,
            default_timestamp: None,
            keyspace: None,
            now_in_seconds: None,
        }
    }

    fn flags(&self) -> BatchFlags {
        let mut flags = BatchFlags::default();
        flags.set(BatchFlags::WITH_SERIAL_CONSISTENCY, self.serial_consistency.is_some());
        flags.set(BatchFlags::WITH_DEFAULT_TIMESTAMP, self.default_timestamp.is_some());
        flags.set(BatchFlags::WITH_KEYSPACE, self.keyspace.is_some());
        flags.set(BatchFlags::WITH_NOW_IN_SECONDS, self.now_in_seconds.is_some());
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
            "the batch keyspace option is not supported in protocol {}",
            version
        );
        ensure!(
            self.now_in_seconds.is_none() || version.supports_now_in_seconds(),
            "the now-in-seconds option is not supported in protocol {}",
            version
        );
        Ok(())
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        self.check(version)?;
        primitives::write_byte(self.batch_type as u8, payload);
        ensure!(
            self.children.len() <= u16::MAX as usize,
            "batch child count {} overflows the [short] prefix",
            self.children.len()
        );
        primitives::write_short(self.children.len() as u16, payload);
        for child in &self.children {
            child.write(payload, version)?;
        }
        primitives::write_short(self.consistency as u16, payload);
        self.flags().write(payload, version);
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
        Ok(())
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(1
            + 2
            + self.children.iter().map(BatchChild::encoded_len).sum::<usize>()
            + 2
            + BatchFlags::encoded_len(version)
            + self.serial_consistency.map(|_| 2).unwrap_or(0)
            + self.default_timestamp.map(|_| 8).unwrap_or(0)
            + self.keyspace.as_deref().map(primitives::string_len).unwrap_or(0)
            + self.now_in_seconds.map(|_| 4).unwrap_or(0))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let batch_type =
            BatchType::try_from(primitives::read_byte(start, payload).context("cannot read batch type")?)?;
        let count = primitives::read_short(start, payload).context("cannot read batch child count")? as usize;
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            children.push(BatchChild::read(start, payload, version)?);
        }
        let consistency = Consistency::try_from(
            primitives::read_short(start, payload).context("cannot read batch consistency")?,
        )?;
        let flags = BatchFlags::read(start, payload, version)?;
        ensure!(
            !flags.contains(BatchFlags::WITH_NAMES_FOR_VALUES),
            "the names-for-values flag in BATCH is broken and unsupported"
        );
        ensure!(
            !flags.contains(BatchFlags::WITH_KEYSPACE) || version.supports_keyspace_in_request(),
            "the batch keyspace option is not supported in protocol {}",
            version
        );
        ensure!(
            !flags.contains(BatchFlags::WITH_NOW_IN_SECONDS) || version.supports_now_in_seconds(),
            "the now-in-seconds option is not supported in protocol {}",
            version
        );
        let serial_consistency = if flags.contains(BatchFlags::WITH_SERIAL_CONSISTENCY) {
            let serial = Consistency::try_from(
                primitives::read_short(start, payload).context("cannot read batch serial consistency")?,
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
        let default_timestamp = if flags.contains(BatchFlags::WITH_DEFAULT_TIMESTAMP) {
            Some(primitives::read_long(start, payload).context("cannot read batch default timestamp")?)
        } else {
            None
        };
        let keyspace = if flags.contains(BatchFlags::WITH_KEYSPACE) {
            Some(primitives::read_string(start, payload).context("cannot read batch keyspace")?)
        } else {
            None
        };
        let now_in_seconds = if flags.contains(BatchFlags::WITH_NOW_IN_SECONDS) {
            Some(primitives::read_int(start, payload).context("cannot read batch now-in-seconds")?)
        } else {
            None
        };
        Ok(Self {
            batch_type,
            children,
            consistency,
            serial_consistency,
            default_timestamp,
            keyspace,
            now_in_seconds,
        })
    }
}
