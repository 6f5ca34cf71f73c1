// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the self-describing type descriptors used in result
//! metadata and UDT/tuple definitions, together with their wire codec.
//!
//! A descriptor is a `[short]` type code optionally followed by a payload:
//! nothing for primitive types, a class name for `custom`, nested descriptors
//! for collections and tuples, and named fields for UDTs.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use std::fmt;

/**
    The data type of a column or bound variable.

    `Udt` fields are kept as ordered (name, type) pairs, which makes the
    "as many names as types" invariant structural. `Text` is the deprecated
    pre-v3 alias code 0x000A for `Varchar` and is only readable/writable when
    talking v2.
*/
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum DataType {
    Custom {
        /// The fully qualified server-side class name of the custom type.
        class: String,
    },
    Ascii,
    Bigint,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    Text,
    Timestamp,
    Uuid,
    Varchar,
    Varint,
    Timeuuid,
    Inet,
    Date,
    Time,
    Smallint,
    Tinyint,
    Duration,
    List(Box<DataType>),
    Map(Box<DataType>, Box<DataType>),
    Set(Box<DataType>),
    Udt {
        /// The keyspace the type is defined in.
        keyspace: String,
        /// The name of the user defined type.
        name: String,
        /// The ordered fields of the type.
        fields: Vec<(String, DataType)>,
    },
    Tuple(Vec<DataType>),
}

/// The `[short]` codes identifying each data type on the wire.
pub mod type_codes {
    #![allow(missing_docs)]
    pub const CUSTOM: u16 = 0x0000;
    pub const ASCII: u16 = 0x0001;
    pub const BIGINT: u16 = 0x0002;
    pub const BLOB: u16 = 0x0003;
    pub const BOOLEAN: u16 = 0x0004;
    pub const COUNTER: u16 = 0x0005;
    pub const DECIMAL: u16 = 0x0006;
    pub const DOUBLE: u16 = 0x0007;
    pub const FLOAT: u16 = 0x0008;
    pub const INT: u16 = 0x0009;
    pub const TEXT: u16 = 0x000A;
    pub const TIMESTAMP: u16 = 0x000B;
    pub const UUID: u16 = 0x000C;
    pub const VARCHAR: u16 = 0x000D;
    pub const VARINT: u16 = 0x000E;
    pub const TIMEUUID: u16 = 0x000F;
    pub const INET: u16 = 0x0010;
    pub const DATE: u16 = 0x0011;
    pub const TIME: u16 = 0x0012;
    pub const SMALLINT: u16 = 0x0013;
    pub const TINYINT: u16 = 0x0014;
    pub const DURATION: u16 = 0x0015;
    pub const LIST: u16 = 0x0020;
    pub const MAP: u16 = 0x0021;
    pub const SET: u16 = 0x0022;
    pub const UDT: u16 = 0x0030;
    pub const TUPLE: u16 = 0x0031;
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Custom { class } => write!(f, "custom({})", class),
            DataType::Ascii => write!(f, "ascii"),
            DataType::Bigint => write!(f, "bigint"),
            DataType::Blob => write!(f, "blob"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Counter => write!(f, "counter"),
            DataType::Decimal => write!(f, "decimal"),
            DataType::Double => write!(f, "double"),
            DataType::Float => write!(f, "float"),
            DataType::Int => write!(f, "int"),
            DataType::Text => write!(f, "text"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Uuid => write!(f, "uuid"),
            DataType::Varchar => write!(f, "varchar"),
            DataType::Varint => write!(f, "varint"),
            DataType::Timeuuid => write!(f, "timeuuid"),
            DataType::Inet => write!(f, "inet"),
            DataType::Date => write!(f, "date"),
            DataType::Time => write!(f, "time"),
            DataType::Smallint => write!(f, "smallint"),
            DataType::Tinyint => write!(f, "tinyint"),
            DataType::Duration => write!(f, "duration"),
            DataType::List(element) => write!(f, "list<{}>", element),
            DataType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            DataType::Set(element) => write!(f, "set<{}>", element),
            DataType::Udt { keyspace, name, .. } => write!(f, "{}.{}", keyspace, name),
            DataType::Tuple(fields) => {
                write!(f, "tuple<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    field.fmt(f)?;
                }
                write!(f, ">")
            }
        }
    }
}

impl DataType {
    /// The `[short]` type code of this data type.
    pub fn code(&self) -> u16 {
        match self {
            DataType::Custom { .. } => type_codes::CUSTOM,
            DataType::Ascii => type_codes::ASCII,
            DataType::Bigint => type_codes::BIGINT,
            DataType::Blob => type_codes::BLOB,
            DataType::Boolean => type_codes::BOOLEAN,
            DataType::Counter => type_codes::COUNTER,
            DataType::Decimal => type_codes::DECIMAL,
            DataType::Double => type_codes::DOUBLE,
            DataType::Float => type_codes::FLOAT,
            DataType::Int => type_codes::INT,
            DataType::Text => type_codes::TEXT,
            DataType::Timestamp => type_codes::TIMESTAMP,
            DataType::Uuid => type_codes::UUID,
            DataType::Varchar => type_codes::VARCHAR,
            DataType::Varint => type_codes::VARINT,
            DataType::Timeuuid => type_codes::TIMEUUID,
            DataType::Inet => type_codes::INET,
            DataType::Date => type_codes::DATE,
            DataType::Time => type_codes::TIME,
            DataType::Smallint => type_codes::SMALLINT,
            DataType::Tinyint => type_codes::TINYINT,
            DataType::Duration => type_codes::DURATION,
            DataType::List(_) => type_codes::LIST,
            DataType::Map(..) => type_codes::MAP,
            DataType::Set(_) => type_codes::SET,
            DataType::Udt { .. } => type_codes::UDT,
            DataType::Tuple(_) => type_codes::TUPLE,
        }
    }

    fn check_version(&self, version: ProtocolVersion) -> Result<()> {
        let supported = match self {
            DataType::Text => version.supports_text_alias(),
            DataType::Date | DataType::Time | DataType::Smallint | DataType::Tinyint => version.supports_v4_types(),
            DataType::Duration => version.supports_duration(),
            DataType::Udt { .. } | DataType::Tuple(_) => version.supports_udt_and_tuple(),
            _ => true,
        };
        ensure!(supported, "data type {} is not supported in protocol {}", self, version);
        Ok(())
    }

    /// Read a data type descriptor, rejecting codes the version does not know.
    pub fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let code = primitives::read_short(start, payload).context("cannot read data type code")?;
        let data_type = match code {
            type_codes::CUSTOM => DataType::Custom {
                class: primitives::read_string(start, payload).context("cannot read custom type class name")?,
            },
            type_codes::ASCII => DataType::Ascii,
            type_codes::BIGINT => DataType::Bigint,
            type_codes::BLOB => DataType::Blob,
            type_codes::BOOLEAN => DataType::Boolean,
            type_codes::COUNTER => DataType::Counter,
            type_codes::DECIMAL => DataType::Decimal,
            type_codes::DOUBLE => DataType::Double,
            type_codes::FLOAT => DataType::Float,
            type_codes::INT => DataType::Int,
            type_codes::TEXT => DataType::Text,
            type_codes::TIMESTAMP => DataType::Timestamp,
            type_codes::UUID => DataType::Uuid,
            type_codes::VARCHAR => DataType::Varchar,
            type_codes::VARINT => DataType::Varint,
            type_codes::TIMEUUID => DataType::Timeuuid,
            type_codes::INET => DataType::Inet,
            type_codes::DATE => DataType::Date,
            type_codes::TIME => DataType::Time,
            type_codes::SMALLINT => DataType::Smallint,
            type_codes::TINYINT => DataType::Tinyint,
            type_codes::DURATION => DataType::Duration,
            type_codes::LIST => DataType::List(Box::new(
                DataType::read(start, payload, version).context("cannot read list element type")?,
            )),
            type_codes::MAP => {
                let key = DataType::read(start, payload, version).context("cannot read map key type")?;
                let value = DataType::read(start, payload, version).context("cannot read map value type")?;
                DataType::Map(Box::new(key), Box::new(value))
            }
            type_codes::SET => DataType::Set(Box::new(
                DataType::read(start, payload, version).context("cannot read set element type")?,
            )),
            type_codes::UDT => {
                let keyspace = primitives::read_string(start, payload).context("cannot read udt keyspace")?;
                let name = primitives::read_string(start, payload).context("cannot read udt name")?;
                let count = primitives::read_short(start, payload).context("cannot read udt field count")? as usize;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    let field_name = primitives::read_string(start, payload).context("cannot read udt field name")?;
                    let field_type = DataType::read(start, payload, version).context("cannot read udt field type")?;
                    fields.push((field_name, field_type));
                }
                DataType::Udt { keyspace, name, fields }
            }
            type_codes::TUPLE => {
                let count = primitives::read_short(start, payload).context("cannot read tuple field count")? as usize;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    fields.push(DataType::read(start, payload, version).context("cannot read tuple field type")?);
                }
                DataType::Tuple(fields)
            }
            code => bail!("unknown data type code: {:#06x}", code),
        };
        data_type.check_version(version)?;
        Ok(data_type)
    }

    /// Write this data type descriptor, rejecting shapes the version does not
    /// know.
    pub fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        self.check_version(version)?;
        primitives::write_short(self.code(), payload);
        match self {
            DataType::Custom { class } => primitives::write_string(class, payload)?,
            DataType::List(element) | DataType::Set(element) => element.write(payload, version)?,
            DataType::Map(key, value) => {
                key.write(payload, version)?;
                value.write(payload, version)?;
            }
            DataType::Udt { keyspace, name, fields } => {
                primitives::write_string(keyspace, payload)?;
                primitives::write_string(name, payload)?;
                ensure!(
                    fields.len() <= u16::MAX as usize,
                    "udt field count {} overflows the [short] prefix",
                    fields.len()
                );
                primitives::write_short(fields.len() as u16, payload);
                for (field_name, field_type) in fields {
                    primitives::write_string(field_name, payload)?;
                    field_type.write(payload, version)?;
                }
            }
            DataType::Tuple(fields) => {
                ensure!(
                    fields.len() <= u16::MAX as usize,
                    "tuple field count {} overflows the [short] prefix",
                    fields.len()
                );
                primitives::write_short(fields.len() as u16, payload);
                for field in fields {
                    field.write(payload, version)?;
                }
            }
            _ => (),
        }
        Ok(())
    }

    /// The encoded length of this descriptor, mirroring [`DataType::write`].
    pub fn encoded_len(&self) -> usize {
        2 + match self {
            DataType::Custom { class } => primitives::string_len(class),
            DataType::List(element) | DataType::Set(element) => element.encoded_len(),
            DataType::Map(key, value) => key.encoded_len() + value.encoded_len(),
            DataType::Udt { keyspace, name, fields } => {
                primitives::string_len(keyspace)
                    + primitives::string_len(name)
                    + 2
                    + fields
                        .iter()
                        .map(|(n, t)| primitives::string_len(n) + t.encoded_len())
                        .sum::<usize>()
            }
            DataType::Tuple(fields) => 2 + fields.iter().map(DataType::encoded_len).sum::<usize>(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data_type: DataType, version: ProtocolVersion) -> Vec<u8> {
        let mut payload = Vec::new();
        data_type.write(&mut payload, version).unwrap();
        assert_eq!(data_type.encoded_len(), payload.len());
        let mut start = 0;
        assert_eq!(DataType::read(&mut start, &payload, version).unwrap(), data_type);
        assert_eq!(start, payload.len());
        payload
    }

    #[test]
    fn primitive_round_trip() {
        round_trip(DataType::Int, ProtocolVersion::V3);
        round_trip(DataType::Varchar, ProtocolVersion::V4);
        round_trip(DataType::Duration, ProtocolVersion::V5);
        round_trip(DataType::Custom {
            class: "org.apache.cassandra.db.marshal.DateType".to_string(),
        }, ProtocolVersion::V4);
    }

    #[test]
    fn nested_collections_round_trip() {
        round_trip(
            DataType::Map(
                Box::new(DataType::Varchar),
                Box::new(DataType::List(Box::new(DataType::Int))),
            ),
            ProtocolVersion::V4,
        );
        round_trip(
            DataType::Tuple(vec![DataType::Uuid, DataType::Set(Box::new(DataType::Inet))]),
            ProtocolVersion::V3,
        );
    }

    #[test]
    fn udt_wire_form() {
        let udt = DataType::Udt {
            keyspace: "ks1".to_string(),
            name: "udt1".to_string(),
            fields: vec![
                ("f1".to_string(), DataType::Varchar),
                ("f2".to_string(), DataType::Int),
            ],
        };
        let payload = round_trip(udt, ProtocolVersion::V4);
        assert_eq!(
            payload,
            [
                0x00, 0x30, // udt
                0x00, 0x03, b'k', b's', b'1', // keyspace
                0x00, 0x04, b'u', b'd', b't', b'1', // name
                0x00, 0x02, // field count
                0x00, 0x02, b'f', b'1', 0x00, 0x0D, // f1: varchar
                0x00, 0x02, b'f', b'2', 0x00, 0x09, // f2: int
            ]
        );
    }

    #[test]
    fn version_gates() {
        assert!(DataType::Duration.write(&mut Vec::new(), ProtocolVersion::V4).is_err());
        assert!(DataType::Duration.write(&mut Vec::new(), ProtocolVersion::DseV1).is_ok());
        assert!(DataType::Smallint.write(&mut Vec::new(), ProtocolVersion::V3).is_err());
        assert!(DataType::Tuple(vec![]).write(&mut Vec::new(), ProtocolVersion::V2).is_err());
        assert!(DataType::Text.write(&mut Vec::new(), ProtocolVersion::V2).is_ok());
        assert!(DataType::Text.write(&mut Vec::new(), ProtocolVersion::V3).is_err());

        // reading gated codes fails the same way
        let mut payload = Vec::new();
        DataType::Duration.write(&mut payload, ProtocolVersion::V5).unwrap();
        let mut start = 0;
        assert!(DataType::read(&mut start, &payload, ProtocolVersion::V4).is_err());
    }

    #[test]
    fn unknown_code_is_rejected() {
        let mut start = 0;
        assert!(DataType::read(&mut start, &[0x00, 0x16], ProtocolVersion::V5).is_err());
    }
}
