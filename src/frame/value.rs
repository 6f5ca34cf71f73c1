// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the column value codecs: the conversion between
//! in-memory values and the byte content carried inside a `[bytes]` cell.
//!
//! Codecs produce and consume the cell *content*; the enclosing `[bytes]`
//! length (and with it the null marker -1) belongs to the frame and message
//! layers. Collections nest further length prefixes whose width depends on
//! the protocol version: 2 bytes for v2, 4 bytes from v3 on.

use super::{
    data_type::DataType,
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use std::{
    net::IpAddr,
    ops::Deref,
};
use uuid::Uuid;

/// A variable-length signed integer, kept as its minimal two's-complement
/// big-endian byte form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Varint(Vec<u8>);

impl Varint {
    /// Create a varint from two's-complement big-endian bytes, trimming any
    /// redundant sign-extension bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mut bytes = bytes;
        if bytes.is_empty() {
            bytes.push(0);
        }
        let sign = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
        let mut skip = 0;
        while skip + 1 < bytes.len() && bytes[skip] == sign && (bytes[skip + 1] & 0x80) == (sign & 0x80) {
            skip += 1;
        }
        bytes.drain(..skip);
        Varint(bytes)
    }

    /// Create a varint from a fixed-width integer.
    pub fn from_i64(value: i64) -> Self {
        Self::from_bytes(value.to_be_bytes().to_vec())
    }

    /// The minimal two's-complement big-endian bytes of this varint.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// This varint as an `i64`, if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        if self.0.len() > 8 {
            return None;
        }
        let sign = if self.0[0] & 0x80 != 0 { 0xFFu8 } else { 0x00 };
        let mut bytes = [sign; 8];
        bytes[8 - self.0.len()..].copy_from_slice(&self.0);
        Some(i64::from_be_bytes(bytes))
    }
}

impl Deref for Varint {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<i64> for Varint {
    fn from(value: i64) -> Self {
        Varint::from_i64(value)
    }
}

/// A value of the `duration` type: three signed vints. Only available from
/// v5 and in the DSE variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Duration {
    /// Number of months.
    pub months: i32,
    /// Number of days.
    pub days: i32,
    /// Number of nanoseconds.
    pub nanoseconds: i64,
}

/**
    A typed column value.

    Collections reject null elements; tuple and UDT fields are nullable and
    therefore wrapped in `Option`. Maps preserve entry order as read off the
    wire.
*/
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum CqlValue {
    Ascii(String),
    Bigint(i64),
    Blob(Vec<u8>),
    Boolean(bool),
    Counter(i64),
    Decimal {
        /// The decimal scale: the unscaled value is divided by 10^scale.
        scale: i32,
        /// The arbitrary-precision unscaled value.
        unscaled: Varint,
    },
    Double(f64),
    Float(f32),
    Int(i32),
    Timestamp(i64),
    Uuid(Uuid),
    Varchar(String),
    Varint(Varint),
    Timeuuid(Uuid),
    Inet(IpAddr),
    Date(u32),
    Time(i64),
    Smallint(i16),
    Tinyint(i8),
    Duration(Duration),
    List(Vec<CqlValue>),
    Set(Vec<CqlValue>),
    Map(Vec<(CqlValue, CqlValue)>),
    Tuple(Vec<Option<CqlValue>>),
    Udt(Vec<(String, Option<CqlValue>)>),
    Custom(Vec<u8>),
}

impl CqlValue {
    /// Encode this value as the content of a `[bytes]` cell of the given
    /// type. Fails when the value does not agree with the type or an integer
    /// is out of range for a narrowing type.
    pub fn encode(&self, data_type: &DataType, version: ProtocolVersion) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        self.encode_into(data_type, version, &mut content)?;
        Ok(content)
    }

    fn encode_into(&self, data_type: &DataType, version: ProtocolVersion, content: &mut Vec<u8>) -> Result<()> {
        match (self, data_type) {
            (CqlValue::Ascii(s), DataType::Ascii) => {
                ensure!(s.is_ascii(), "non-ASCII character in ascii value");
                content.extend(s.as_bytes());
            }
            (CqlValue::Varchar(s), DataType::Varchar | DataType::Text) => content.extend(s.as_bytes()),
            (CqlValue::Blob(b), DataType::Blob) => content.extend(b),
            (CqlValue::Custom(b), DataType::Custom { .. }) => content.extend(b),
            (CqlValue::Boolean(b), DataType::Boolean) => content.push(*b as u8),
            (CqlValue::Tinyint(i), DataType::Tinyint) => content.extend(i.to_be_bytes()),
            (CqlValue::Smallint(i), DataType::Smallint) => content.extend(i.to_be_bytes()),
            (CqlValue::Int(i), DataType::Int) => content.extend(i.to_be_bytes()),
            (CqlValue::Bigint(i), DataType::Bigint) => content.extend(i.to_be_bytes()),
            (CqlValue::Counter(i), DataType::Counter) => content.extend(i.to_be_bytes()),
            (CqlValue::Float(f), DataType::Float) => content.extend(f.to_be_bytes()),
            (CqlValue::Double(f), DataType::Double) => content.extend(f.to_be_bytes()),
            (CqlValue::Timestamp(i), DataType::Timestamp) => content.extend(i.to_be_bytes()),
            (CqlValue::Date(d), DataType::Date) => content.extend(d.to_be_bytes()),
            (CqlValue::Time(t), DataType::Time) => {
                ensure!(
                    (0..86_400_000_000_000).contains(t),
                    "time value {} is outside the nanoseconds-of-day range",
                    t
                );
                content.extend(t.to_be_bytes());
            }
            (CqlValue::Uuid(u), DataType::Uuid) | (CqlValue::Timeuuid(u), DataType::Timeuuid) => {
                content.extend(u.as_bytes())
            }
            (CqlValue::Varint(v), DataType::Varint) => content.extend(v.as_bytes()),
            (CqlValue::Decimal { scale, unscaled }, DataType::Decimal) => {
                content.extend(scale.to_be_bytes());
                content.extend(unscaled.as_bytes());
            }
            (CqlValue::Inet(addr), DataType::Inet) => match addr {
                IpAddr::V4(v4) => content.extend(v4.octets()),
                IpAddr::V6(v6) => content.extend(v6.octets()),
            },
            (CqlValue::Duration(d), DataType::Duration) => {
                primitives::write_vint(d.months as i64, content);
                primitives::write_vint(d.days as i64, content);
                primitives::write_vint(d.nanoseconds, content);
            }
            (CqlValue::List(elements), DataType::List(element_type))
            | (CqlValue::Set(elements), DataType::Set(element_type)) => {
                write_collection_length(elements.len(), version, content)?;
                for element in elements {
                    let element_content = element.encode(element_type, version)?;
                    write_element(&element_content, version, content)?;
                }
            }
            (CqlValue::Map(entries), DataType::Map(key_type, value_type)) => {
                write_collection_length(entries.len(), version, content)?;
                for (key, value) in entries {
                    let key_content = key.encode(key_type, version)?;
                    write_element(&key_content, version, content)?;
                    let value_content = value.encode(value_type, version)?;
                    write_element(&value_content, version, content)?;
                }
            }
            (CqlValue::Tuple(fields), DataType::Tuple(field_types)) => {
                ensure!(
                    fields.len() == field_types.len(),
                    "tuple value has {} fields but its type has {}",
                    fields.len(),
                    field_types.len()
                );
                for (field, field_type) in fields.iter().zip(field_types) {
                    let cell = field
                        .as_ref()
                        .map(|value| value.encode(field_type, version))
                        .transpose()?;
                    primitives::write_bytes(cell.as_deref(), content)?;
                }
            }
            (CqlValue::Udt(fields), DataType::Udt { fields: field_types, .. }) => {
                ensure!(
                    fields.len() == field_types.len(),
                    "udt value has {} fields but its type has {}",
                    fields.len(),
                    field_types.len()
                );
                for ((name, field), (type_name, field_type)) in fields.iter().zip(field_types) {
                    ensure!(
                        name == type_name,
                        "udt value field {} does not match type field {}",
                        name,
                        type_name
                    );
                    let cell = field
                        .as_ref()
                        .map(|value| value.encode(field_type, version))
                        .transpose()?;
                    primitives::write_bytes(cell.as_deref(), content)?;
                }
            }
            (value, data_type) => bail!("value {:?} does not match data type {}", value, data_type),
        }
        Ok(())
    }

    /// Decode a `[bytes]` cell content of the given type.
    pub fn decode(data_type: &DataType, content: &[u8], version: ProtocolVersion) -> Result<Self> {
        Ok(match data_type {
            DataType::Ascii => {
                ensure!(content.is_ascii(), "non-ASCII byte in ascii value");
                CqlValue::Ascii(String::from_utf8(content.to_vec()).context("cannot decode ascii value")?)
            }
            DataType::Varchar | DataType::Text => {
                CqlValue::Varchar(String::from_utf8(content.to_vec()).context("cannot decode varchar value")?)
            }
            DataType::Blob => CqlValue::Blob(content.to_vec()),
            DataType::Custom { .. } => CqlValue::Custom(content.to_vec()),
            DataType::Boolean => {
                ensure!(content.len() == 1, "boolean value must be 1 byte, got {}", content.len());
                CqlValue::Boolean(content[0] != 0)
            }
            DataType::Tinyint => CqlValue::Tinyint(i8::from_be_bytes(fixed(content, "tinyint")?)),
            DataType::Smallint => CqlValue::Smallint(i16::from_be_bytes(fixed(content, "smallint")?)),
            DataType::Int => CqlValue::Int(i32::from_be_bytes(fixed(content, "int")?)),
            DataType::Bigint => CqlValue::Bigint(i64::from_be_bytes(fixed(content, "bigint")?)),
            DataType::Counter => CqlValue::Counter(i64::from_be_bytes(fixed(content, "counter")?)),
            DataType::Float => CqlValue::Float(f32::from_be_bytes(fixed(content, "float")?)),
            DataType::Double => CqlValue::Double(f64::from_be_bytes(fixed(content, "double")?)),
            DataType::Timestamp => CqlValue::Timestamp(i64::from_be_bytes(fixed(content, "timestamp")?)),
            DataType::Date => CqlValue::Date(u32::from_be_bytes(fixed(content, "date")?)),
            DataType::Time => CqlValue::Time(i64::from_be_bytes(fixed(content, "time")?)),
            DataType::Uuid => CqlValue::Uuid(Uuid::from_bytes(fixed(content, "uuid")?)),
            DataType::Timeuuid => CqlValue::Timeuuid(Uuid::from_bytes(fixed(content, "timeuuid")?)),
            DataType::Varint => CqlValue::Varint(super::value::Varint::from_bytes(content.to_vec())),
            DataType::Decimal => {
                ensure!(content.len() >= 4, "decimal value must carry a 4-byte scale");
                let scale = i32::from_be_bytes([content[0], content[1], content[2], content[3]]);
                CqlValue::Decimal {
                    scale,
                    unscaled: super::value::Varint::from_bytes(content[4..].to_vec()),
                }
            }
            DataType::Inet => match content.len() {
                4 => {
                    let mut octets = [0u8; 4];
                    octets.copy_from_slice(content);
                    CqlValue::Inet(IpAddr::from(octets))
                }
                16 => {
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(content);
                    CqlValue::Inet(IpAddr::from(octets))
                }
                n => bail!("inet value must be 4 or 16 bytes, got {}", n),
            },
            DataType::Duration => {
                let mut start = 0;
                let months = primitives::read_vint(&mut start, content).context("cannot read duration months")?;
                let days = primitives::read_vint(&mut start, content).context("cannot read duration days")?;
                let nanoseconds =
                    primitives::read_vint(&mut start, content).context("cannot read duration nanoseconds")?;
                ensure!(start == content.len(), "duration value has trailing bytes");
                let months = i32::try_from(months).context("duration months out of range")?;
                let days = i32::try_from(days).context("duration days out of range")?;
                CqlValue::Duration(Duration {
                    months,
                    days,
                    nanoseconds,
                })
            }
            DataType::List(element_type) => {
                let (elements, read) = read_elements(element_type, content, version)?;
                ensure!(read == content.len(), "list value has trailing bytes");
                CqlValue::List(elements)
            }
            DataType::Set(element_type) => {
                let (elements, read) = read_elements(element_type, content, version)?;
                ensure!(read == content.len(), "set value has trailing bytes");
                CqlValue::Set(elements)
            }
            DataType::Map(key_type, value_type) => {
                let mut start = 0;
                let count = read_collection_length(&mut start, content, version)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key_content =
                        read_element(&mut start, content, version)?.context("null key in map value")?;
                    let key = CqlValue::decode(key_type, &key_content, version)?;
                    let value_content =
                        read_element(&mut start, content, version)?.context("null value in map value")?;
                    let value = CqlValue::decode(value_type, &value_content, version)?;
                    entries.push((key, value));
                }
                ensure!(start == content.len(), "map value has trailing bytes");
                CqlValue::Map(entries)
            }
            DataType::Tuple(field_types) => {
                let mut start = 0;
                let mut fields = Vec::with_capacity(field_types.len());
                for field_type in field_types {
                    let cell = primitives::read_bytes(&mut start, content).context("cannot read tuple field")?;
                    fields.push(
                        cell.map(|content| CqlValue::decode(field_type, &content, version))
                            .transpose()?,
                    );
                }
                ensure!(start == content.len(), "tuple value has trailing bytes");
                CqlValue::Tuple(fields)
            }
            DataType::Udt { fields: field_types, .. } => {
                // a udt value may omit trailing fields added after it was written
                let mut start = 0;
                let mut fields = Vec::with_capacity(field_types.len());
                for (name, field_type) in field_types {
                    if start == content.len() {
                        fields.push((name.clone(), None));
                        continue;
                    }
                    let cell = primitives::read_bytes(&mut start, content).context("cannot read udt field")?;
                    fields.push((
                        name.clone(),
                        cell.map(|content| CqlValue::decode(field_type, &content, version))
                            .transpose()?,
                    ));
                }
                ensure!(start == content.len(), "udt value has trailing bytes");
                CqlValue::Udt(fields)
            }
        })
    }
}

fn fixed<const N: usize>(content: &[u8], what: &'static str) -> Result<[u8; N]> {
    ensure!(
        content.len() == N,
        "{} value must be {} bytes, got {}",
        what,
        N,
        content.len()
    );
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(content);
    Ok(bytes)
}

fn write_collection_length(len: usize, version: ProtocolVersion, content: &mut Vec<u8>) -> Result<()> {
    if version.uses_int_collection_length() {
        ensure!(
            len <= i32::MAX as usize,
            "collection length {} overflows the [int] prefix",
            len
        );
        primitives::write_int(len as i32, content);
    } else {
        ensure!(
            len <= u16::MAX as usize,
            "collection length {} overflows the [short] prefix of protocol {}",
            len,
            version
        );
        primitives::write_short(len as u16, content);
    }
    Ok(())
}

fn read_collection_length(start: &mut usize, content: &[u8], version: ProtocolVersion) -> Result<usize> {
    if version.uses_int_collection_length() {
        let len = primitives::read_int(start, content).context("cannot read collection length")?;
        ensure!(len >= 0, "invalid negative collection length: {}", len);
        Ok(len as usize)
    } else {
        Ok(primitives::read_short(start, content).context("cannot read collection length")? as usize)
    }
}

fn write_element(element: &[u8], version: ProtocolVersion, content: &mut Vec<u8>) -> Result<()> {
    if version.uses_int_collection_length() {
        primitives::write_bytes(Some(element), content)
    } else {
        primitives::write_short_bytes(element, content)
    }
}

fn read_element(start: &mut usize, content: &[u8], version: ProtocolVersion) -> Result<Option<Vec<u8>>> {
    if version.uses_int_collection_length() {
        primitives::read_bytes(start, content).context("cannot read collection element")
    } else {
        Ok(Some(
            primitives::read_short_bytes(start, content).context("cannot read collection element")?,
        ))
    }
}

fn read_elements(
    element_type: &DataType,
    content: &[u8],
    version: ProtocolVersion,
) -> Result<(Vec<CqlValue>, usize)> {
    let mut start = 0;
    let count = read_collection_length(&mut start, content, version)?;
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        let element_content = read_element(&mut start, content, version)?.context("null element in collection")?;
        elements.push(CqlValue::decode(element_type, &element_content, version)?);
    }
    Ok((elements, start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: CqlValue, data_type: DataType, version: ProtocolVersion) {
        let content = value.encode(&data_type, version).unwrap();
        assert_eq!(CqlValue::decode(&data_type, &content, version).unwrap(), value);
    }

    #[test]
    fn fixed_width_integers() {
        round_trip(CqlValue::Int(i32::MIN), DataType::Int, ProtocolVersion::V4);
        round_trip(CqlValue::Bigint(-1), DataType::Bigint, ProtocolVersion::V4);
        round_trip(CqlValue::Smallint(i16::MAX), DataType::Smallint, ProtocolVersion::V4);
        round_trip(CqlValue::Tinyint(-128), DataType::Tinyint, ProtocolVersion::V4);
        assert_eq!(CqlValue::Int(1).encode(&DataType::Int, ProtocolVersion::V4).unwrap(), [0, 0, 0, 1]);
    }

    #[test]
    fn wrong_width_is_rejected() {
        assert!(CqlValue::decode(&DataType::Int, &[0, 0, 1], ProtocolVersion::V4).is_err());
        assert!(CqlValue::decode(&DataType::Bigint, &[0; 4], ProtocolVersion::V4).is_err());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        assert!(CqlValue::Int(1).encode(&DataType::Bigint, ProtocolVersion::V4).is_err());
        assert!(CqlValue::Varchar("x".into()).encode(&DataType::Int, ProtocolVersion::V4).is_err());
    }

    #[test]
    fn ascii_rejects_non_ascii() {
        assert!(CqlValue::Ascii("γειά".into()).encode(&DataType::Ascii, ProtocolVersion::V4).is_err());
        assert!(CqlValue::decode(&DataType::Ascii, "γ".as_bytes(), ProtocolVersion::V4).is_err());
        round_trip(CqlValue::Ascii("plain".into()), DataType::Ascii, ProtocolVersion::V4);
    }

    #[test]
    fn booleans() {
        assert_eq!(
            CqlValue::Boolean(true).encode(&DataType::Boolean, ProtocolVersion::V4).unwrap(),
            [1]
        );
        // any nonzero byte decodes as true
        assert_eq!(
            CqlValue::decode(&DataType::Boolean, &[0x02], ProtocolVersion::V4).unwrap(),
            CqlValue::Boolean(true)
        );
    }

    #[test]
    fn varint_normalisation() {
        assert_eq!(Varint::from_i64(0).as_bytes(), [0x00]);
        assert_eq!(Varint::from_i64(-1).as_bytes(), [0xFF]);
        assert_eq!(Varint::from_i64(127).as_bytes(), [0x7F]);
        assert_eq!(Varint::from_i64(128).as_bytes(), [0x00, 0x80]);
        assert_eq!(Varint::from_i64(-128).as_bytes(), [0x80]);
        assert_eq!(Varint::from_i64(-129).as_bytes(), [0xFF, 0x7F]);
        assert_eq!(Varint::from_i64(128).to_i64(), Some(128));
        assert_eq!(Varint::from_i64(-129).to_i64(), Some(-129));
        round_trip(CqlValue::Varint(Varint::from_i64(i64::MIN)), DataType::Varint, ProtocolVersion::V4);
    }

    #[test]
    fn decimal_carries_scale_then_unscaled() {
        let value = CqlValue::Decimal {
            scale: 2,
            unscaled: Varint::from_i64(12345),
        };
        let content = value.encode(&DataType::Decimal, ProtocolVersion::V4).unwrap();
        assert_eq!(content, [0, 0, 0, 2, 0x30, 0x39]);
        round_trip(value, DataType::Decimal, ProtocolVersion::V4);
    }

    #[test]
    fn inet_value_is_raw_octets() {
        let v4: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(
            CqlValue::Inet(v4).encode(&DataType::Inet, ProtocolVersion::V4).unwrap(),
            [127, 0, 0, 1]
        );
        let v6: IpAddr = "::1".parse().unwrap();
        round_trip(CqlValue::Inet(v6), DataType::Inet, ProtocolVersion::V4);
        assert!(CqlValue::decode(&DataType::Inet, &[1, 2, 3], ProtocolVersion::V4).is_err());
    }

    #[test]
    fn duration_is_three_vints() {
        let value = CqlValue::Duration(Duration {
            months: 1,
            days: 2,
            nanoseconds: 3,
        });
        let content = value.encode(&DataType::Duration, ProtocolVersion::V5).unwrap();
        assert_eq!(content, [0x02, 0x04, 0x06]);
        round_trip(value, DataType::Duration, ProtocolVersion::V5);
    }

    #[test]
    fn collections_use_int_lengths_from_v3() {
        let list = CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2)]);
        let data_type = DataType::List(Box::new(DataType::Int));
        let content = list.encode(&data_type, ProtocolVersion::V4).unwrap();
        assert_eq!(
            content,
            [0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 2]
        );
        round_trip(list, data_type, ProtocolVersion::V4);
    }

    #[test]
    fn collections_use_short_lengths_in_v2() {
        let list = CqlValue::List(vec![CqlValue::Int(1)]);
        let data_type = DataType::List(Box::new(DataType::Int));
        let content = list.encode(&data_type, ProtocolVersion::V2).unwrap();
        assert_eq!(content, [0, 1, 0, 4, 0, 0, 0, 1]);
        round_trip(list, data_type, ProtocolVersion::V2);
    }

    #[test]
    fn map_preserves_entry_order() {
        let map = CqlValue::Map(vec![
            (CqlValue::Varchar("b".into()), CqlValue::Int(2)),
            (CqlValue::Varchar("a".into()), CqlValue::Int(1)),
        ]);
        let data_type = DataType::Map(Box::new(DataType::Varchar), Box::new(DataType::Int));
        round_trip(map, data_type, ProtocolVersion::V4);
    }

    #[test]
    fn tuple_fields_are_nullable() {
        let tuple = CqlValue::Tuple(vec![Some(CqlValue::Int(1)), None]);
        let data_type = DataType::Tuple(vec![DataType::Int, DataType::Varchar]);
        let content = tuple.encode(&data_type, ProtocolVersion::V4).unwrap();
        assert_eq!(content, [0, 0, 0, 4, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
        round_trip(tuple, data_type, ProtocolVersion::V4);
    }

    #[test]
    fn udt_allows_missing_trailing_fields() {
        let data_type = DataType::Udt {
            keyspace: "ks1".into(),
            name: "udt1".into(),
            fields: vec![("f1".into(), DataType::Int), ("f2".into(), DataType::Varchar)],
        };
        let full = CqlValue::Udt(vec![
            ("f1".into(), Some(CqlValue::Int(7))),
            ("f2".into(), Some(CqlValue::Varchar("x".into()))),
        ]);
        round_trip(full, data_type.clone(), ProtocolVersion::V4);

        // value written before f2 was added to the type
        let content = CqlValue::Int(7).encode(&DataType::Int, ProtocolVersion::V4).unwrap();
        let mut cell = Vec::new();
        primitives::write_bytes(Some(content.as_slice()), &mut cell).unwrap();
        let decoded = CqlValue::decode(&data_type, &cell, ProtocolVersion::V4).unwrap();
        assert_eq!(
            decoded,
            CqlValue::Udt(vec![("f1".into(), Some(CqlValue::Int(7))), ("f2".into(), None)])
        );
    }
}
