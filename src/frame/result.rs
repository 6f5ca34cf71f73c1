// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the RESULT response and its five variants: Void,
//! Rows, SetKeyspace, Prepared and SchemaChange.

use super::{
    data_type::DataType,
    event::SchemaChange,
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};

/// The `[int]` result kinds.
pub mod result_kinds {
    #![allow(missing_docs)]
    pub const VOID: i32 = 0x0001;
    pub const ROWS: i32 = 0x0002;
    pub const SET_KEYSPACE: i32 = 0x0003;
    pub const PREPARED: i32 = 0x0004;
    pub const SCHEMA_CHANGE: i32 = 0x0005;
}

/// The flags of a rows/variables metadata block. The bitmap is always an
/// `[int]`; the two high bits are DSE continuous-paging metadata.
mod metadata_flags {
    pub const GLOBAL_TABLES_SPEC: i32 = 0x0001;
    pub const HAS_MORE_PAGES: i32 = 0x0002;
    pub const NO_METADATA: i32 = 0x0004;
    pub const METADATA_CHANGED: i32 = 0x0008;
    pub const CONTINUOUS_PAGING: i32 = 0x4000_0000;
    pub const LAST_CONTINUOUS_PAGE: i32 = 0x8000_0000_u32 as i32;
}

/// The definition of one column in a result or variables metadata block.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    /// The keyspace of the column's table.
    pub keyspace: String,
    /// The table of the column.
    pub table: String,
    /// The column name.
    pub name: String,
    /// The column type.
    pub data_type: DataType,
}

/// Whether every column shares one (keyspace, table) pair, letting the
/// metadata block write it once up front.
fn global_table_spec(columns: &[ColumnSpec]) -> Option<(&str, &str)> {
    let first = columns.first()?;
    columns
        .iter()
        .all(|c| c.keyspace == first.keyspace && c.table == first.table)
        .then(|| (first.keyspace.as_str(), first.table.as_str()))
}

/**
    The metadata block preceding the rows of a Rows result (and describing the
    result set of a Prepared result).

    `column_count` stands alone because the NO_METADATA mode announces how
    many cells each row carries while omitting the column specs; when specs
    are present it must match their number. The GLOBAL_TABLES_SPEC flag is
    derived: it is set whenever all column specs agree on keyspace and table.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct RowsMetadata {
    /// The number of columns in each row.
    pub column_count: i32,
    /// The paging state to resume the query with, when the result is one
    /// page of many.
    pub paging_state: Option<Vec<u8>>,
    /// The new result-metadata id announced when a prepared statement's
    /// result shape changed (v5/DSEv2).
    pub new_metadata_id: Option<Vec<u8>>,
    /// The column definitions; empty when the client asked to skip metadata.
    pub columns: Vec<ColumnSpec>,
    /// The continuous paging page number (DSE).
    pub continuous_page_number: Option<i32>,
    /// Whether this is the last continuous page (DSE).
    pub last_continuous_page: bool,
}

impl Default for RowsMetadata {
    fn default() -> Self {
        Self {
            column_count: 0,
            paging_state: None,
            new_metadata_id: None,
            columns: Vec::new(),
            continuous_page_number: None,
            last_continuous_page: false,
        }
    }
}

impl RowsMetadata {
    fn no_metadata(&self) -> bool {
        self.columns.is_empty() && self.column_count > 0
    }

    fn flags(&self) -> i32 {
        let mut flags = 0;
        if global_table_spec(&self.columns).is_some() {
            flags |= metadata_flags::GLOBAL_TABLES_SPEC;
        }
        if self.paging_state.is_some() {
            flags |= metadata_flags::HAS_MORE_PAGES;
        }
        if self.no_metadata() {
            flags |= metadata_flags::NO_METADATA;
        }
        if self.new_metadata_id.is_some() {
            flags |= metadata_flags::METADATA_CHANGED;
        }
        if self.continuous_page_number.is_some() {
            flags |= metadata_flags::CONTINUOUS_PAGING;
            if self.last_continuous_page {
                flags |= metadata_flags::LAST_CONTINUOUS_PAGE;
            }
        }
        flags
    }

    fn check(&self, version: ProtocolVersion) -> Result<()> {
        ensure!(
            self.columns.is_empty() || self.columns.len() as i32 == self.column_count,
            "metadata declares {} columns but carries {} specs",
            self.column_count,
            self.columns.len()
        );
        ensure!(
            self.new_metadata_id.is_none() || version.supports_result_metadata_id(),
            "the new result-metadata id is not supported in protocol {}",
            version
        );
        ensure!(
            self.continuous_page_number.is_none() || version.supports_continuous_paging(),
            "continuous paging metadata is not supported in protocol {}",
            version
        );
        Ok(())
    }

    pub(crate) fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        self.check(version)?;
        primitives::write_int(self.flags(), payload);
        primitives::write_int(self.column_count, payload);
        if let Some(paging_state) = &self.paging_state {
            primitives::write_bytes(Some(paging_state.as_slice()), payload)?;
        }
        if let Some(new_metadata_id) = &self.new_metadata_id {
            primitives::write_short_bytes(new_metadata_id, payload)?;
        }
        if let Some(page_number) = self.continuous_page_number {
            primitives::write_int(page_number, payload);
        }
        if !self.columns.is_empty() {
            if let Some((keyspace, table)) = global_table_spec(&self.columns) {
                primitives::write_string(keyspace, payload)?;
                primitives::write_string(table, payload)?;
                for column in &self.columns {
                    primitives::write_string(&column.name, payload)?;
                    column.data_type.write(payload, version)?;
                }
            } else {
                for column in &self.columns {
                    primitives::write_string(&column.keyspace, payload)?;
                    primitives::write_string(&column.table, payload)?;
                    primitives::write_string(&column.name, payload)?;
                    column.data_type.write(payload, version)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let flags = primitives::read_int(start, payload).context("cannot read rows metadata flags")?;
        let column_count = primitives::read_int(start, payload).context("cannot read column count")?;
        ensure!(column_count >= 0, "invalid negative column count: {}", column_count);
        let paging_state = if flags & metadata_flags::HAS_MORE_PAGES != 0 {
            primitives::read_bytes(start, payload).context("cannot read paging state")?
        } else {
            None
        };
        let new_metadata_id = if flags & metadata_flags::METADATA_CHANGED != 0 {
            ensure!(
                version.supports_result_metadata_id(),
                "the new result-metadata id is not supported in protocol {}",
                version
            );
            Some(primitives::read_short_bytes(start, payload).context("cannot read new result-metadata id")?)
        } else {
            None
        };
        let continuous_page_number = if flags & metadata_flags::CONTINUOUS_PAGING != 0 {
            ensure!(
                version.supports_continuous_paging(),
                "continuous paging metadata is not supported in protocol {}",
                version
            );
            Some(primitives::read_int(start, payload).context("cannot read continuous page number")?)
        } else {
            None
        };
        let last_continuous_page = flags & metadata_flags::LAST_CONTINUOUS_PAGE != 0;
        let mut columns = Vec::new();
        if flags & metadata_flags::NO_METADATA == 0 && column_count > 0 {
            if flags & metadata_flags::GLOBAL_TABLES_SPEC != 0 {
                let keyspace = primitives::read_string(start, payload).context("cannot read global keyspace")?;
                let table = primitives::read_string(start, payload).context("cannot read global table")?;
                for _ in 0..column_count {
                    columns.push(ColumnSpec {
                        keyspace: keyspace.clone(),
                        table: table.clone(),
                        name: primitives::read_string(start, payload).context("cannot read column name")?,
                        data_type: DataType::read(start, payload, version)?,
                    });
                }
            } else {
                for _ in 0..column_count {
                    columns.push(ColumnSpec {
                        keyspace: primitives::read_string(start, payload).context("cannot read column keyspace")?,
                        table: primitives::read_string(start, payload).context("cannot read column table")?,
                        name: primitives::read_string(start, payload).context("cannot read column name")?,
                        data_type: DataType::read(start, payload, version)?,
                    });
                }
            }
        }
        Ok(Self {
            column_count,
            paging_state,
            new_metadata_id,
            columns,
            continuous_page_number,
            last_continuous_page,
        })
    }

    pub(crate) fn encoded_len(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        let mut len = 4 + 4;
        if let Some(paging_state) = &self.paging_state {
            len += primitives::bytes_len(Some(paging_state.as_slice()));
        }
        if let Some(new_metadata_id) = &self.new_metadata_id {
            len += primitives::short_bytes_len(new_metadata_id);
        }
        if self.continuous_page_number.is_some() {
            len += 4;
        }
        if !self.columns.is_empty() {
            if let Some((keyspace, table)) = global_table_spec(&self.columns) {
                len += primitives::string_len(keyspace) + primitives::string_len(table);
                len += self
                    .columns
                    .iter()
                    .map(|c| primitives::string_len(&c.name) + c.data_type.encoded_len())
                    .sum::<usize>();
            } else {
                len += self
                    .columns
                    .iter()
                    .map(|c| {
                        primitives::string_len(&c.keyspace)
                            + primitives::string_len(&c.table)
                            + primitives::string_len(&c.name)
                            + c.data_type.encoded_len()
                    })
                    .sum::<usize>();
            }
        }
        Ok(len)
    }
}

/// A Rows result: metadata followed by the row cells, each an opaque
/// `[bytes]` to hand to the matching column value codec.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Rows {
    /// The result metadata.
    pub metadata: RowsMetadata,
    /// The rows, each `column_count` nullable cells.
    pub data: Vec<Vec<Option<Vec<u8>>>>,
}

impl Rows {
    fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        self.metadata.write(payload, version)?;
        ensure!(
            self.data.len() <= i32::MAX as usize,
            "row count {} overflows the [int] prefix",
            self.data.len()
        );
        primitives::write_int(self.data.len() as i32, payload);
        for row in &self.data {
            ensure!(
                row.len() as i32 == self.metadata.column_count,
                "row carries {} cells but the metadata declares {} columns",
                row.len(),
                self.metadata.column_count
            );
            for cell in row {
                primitives::write_bytes(cell.as_deref(), payload)?;
            }
        }
        Ok(())
    }

    fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let metadata = RowsMetadata::read(start, payload, version)?;
        let row_count = primitives::read_int(start, payload).context("cannot read row count")?;
        ensure!(row_count >= 0, "invalid negative row count: {}", row_count);
        let mut data = Vec::with_capacity(row_count as usize);
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(metadata.column_count as usize);
            for _ in 0..metadata.column_count {
                row.push(primitives::read_bytes(start, payload).context("cannot read row cell")?);
            }
            data.push(row);
        }
        Ok(Self { metadata, data })
    }

    fn encoded_len(&self, version: ProtocolVersion) -> Result<usize> {
        Ok(self.metadata.encoded_len(version)?
            + 4
            + self
                .data
                .iter()
                .flatten()
                .map(|cell| primitives::bytes_len(cell.as_deref()))
                .sum::<usize>())
    }
}

/// The bound-variables metadata of a Prepared result: the partition key
/// indices (v4+) and the variable definitions.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VariablesMetadata {
    /// Indices of the bound variables forming the partition key (v4+).
    pub pk_indices: Vec<u16>,
    /// The bound variable definitions.
    pub columns: Vec<ColumnSpec>,
}

impl VariablesMetadata {
    fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        let mut flags = 0;
        if global_table_spec(&self.columns).is_some() {
            flags |= metadata_flags::GLOBAL_TABLES_SPEC;
        }
        primitives::write_int(flags, payload);
        ensure!(
            self.columns.len() <= i32::MAX as usize,
            "variable count {} overflows the [int] prefix",
            self.columns.len()
        );
        primitives::write_int(self.columns.len() as i32, payload);
        if version.supports_pk_indices() {
            ensure!(
                self.pk_indices.len() <= i32::MAX as usize,
                "pk index count {} overflows the [int] prefix",
                self.pk_indices.len()
            );
            primitives::write_int(self.pk_indices.len() as i32, payload);
            for index in &self.pk_indices {
                primitives::write_short(*index, payload);
            }
        } else {
            ensure!(
                self.pk_indices.is_empty(),
                "partition key indices are not supported in protocol {}",
                version
            );
        }
        if let Some((keyspace, table)) = global_table_spec(&self.columns) {
            primitives::write_string(keyspace, payload)?;
            primitives::write_string(table, payload)?;
            for column in &self.columns {
                primitives::write_string(&column.name, payload)?;
                column.data_type.write(payload, version)?;
            }
        } else {
            for column in &self.columns {
                primitives::write_string(&column.keyspace, payload)?;
                primitives::write_string(&column.table, payload)?;
                primitives::write_string(&column.name, payload)?;
                column.data_type.write(payload, version)?;
            }
        }
        Ok(())
    }

    fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let flags = primitives::read_int(start, payload).context("cannot read variables metadata flags")?;
        let column_count = primitives::read_int(start, payload).context("cannot read variable count")?;
        ensure!(column_count >= 0, "invalid negative variable count: {}", column_count);
        let mut pk_indices = Vec::new();
        if version.supports_pk_indices() {
            let pk_count = primitives::read_int(start, payload).context("cannot read pk index count")?;
            ensure!(pk_count >= 0, "invalid negative pk index count: {}", pk_count);
            for _ in 0..pk_count {
                pk_indices.push(primitives::read_short(start, payload).context("cannot read pk index")?);
            }
        }
        let mut columns = Vec::with_capacity(column_count as usize);
        if flags & metadata_flags::GLOBAL_TABLES_SPEC != 0 {
            let keyspace = primitives::read_string(start, payload).context("cannot read global keyspace")?;
            let table = primitives::read_string(start, payload).context("cannot read global table")?;
            for _ in 0..column_count {
                columns.push(ColumnSpec {
                    keyspace: keyspace.clone(),
                    table: table.clone(),
                    name: primitives::read_string(start, payload).context("cannot read variable name")?,
                    data_type: DataType::read(start, payload, version)?,
                });
            }
        } else {
            for _ in 0..column_count {
                columns.push(ColumnSpec {
                    keyspace: primitives::read_string(start, payload).context("cannot read variable keyspace")?,
                    table: primitives::read_string(start, payload).context("cannot read variable table")?,
                    name: primitives::read_string(start, payload).context("cannot read variable name")?,
                    data_type: DataType::read(start, payload, version)?,
                });
            }
        }
        Ok(Self { pk_indices, columns })
    }

    fn encoded_len(&self, version: ProtocolVersion) -> usize {
        let mut len = 4 + 4;
        if version.supports_pk_indices() {
            len += 4 + 2 * self.pk_indices.len();
        }
        if let Some((keyspace, table)) = global_table_spec(&self.columns) {
            len += primitives::string_len(keyspace) + primitives::string_len(table);
            len += self
                .columns
                .iter()
                .map(|c| primitives::string_len(&c.name) + c.data_type.encoded_len())
                .sum::<usize>();
        } else {
            len += self
                .columns
                .iter()
                .map(|c| {
                    primitives::string_len(&c.keyspace)
                        + primitives::string_len(&c.table)
                        + primitives::string_len(&c.name)
                        + c.data_type.encoded_len()
                })
                .sum::<usize>();
        }
        len
    }
}

/// A Prepared result: the statement id, the metadata of its bound variables
/// and the metadata of its future result sets.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Prepared {
    /// The prepared statement id.
    pub id: Vec<u8>,
    /// The result-metadata id to echo in EXECUTE (v5/DSEv2).
    pub result_metadata_id: Option<Vec<u8>>,
    /// The bound variables metadata.
    pub variables: VariablesMetadata,
    /// The result set metadata of the prepared statement.
    pub metadata: RowsMetadata,
}

impl Prepared {
    fn check(&self, version: ProtocolVersion) -> Result<()> {
        if version.supports_result_metadata_id() {
            ensure!(
                self.result_metadata_id.is_some(),
                "protocol {} requires the result-metadata id in a Prepared result",
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

    fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        self.check(version)?;
        primitives::write_short_bytes(&self.id, payload)?;
        if let Some(result_metadata_id) = &self.result_metadata_id {
            primitives::write_short_bytes(result_metadata_id, payload)?;
        }
        self.variables.write(payload, version)?;
        self.metadata.write(payload, version)
    }

    fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let id = primitives::read_short_bytes(start, payload).context("cannot read prepared statement id")?;
        let result_metadata_id = if version.supports_result_metadata_id() {
            Some(primitives::read_short_bytes(start, payload).context("cannot read result-metadata id")?)
        } else {
            None
        };
        Ok(Self {
            id,
            result_metadata_id,
            variables: VariablesMetadata::read(start, payload, version)?,
            metadata: RowsMetadata::read(start, payload, version)?,
        })
    }

    fn encoded_len(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(primitives::short_bytes_len(&self.id)
            + self
                .result_metadata_id
                .as_deref()
                .map(primitives::short_bytes_len)
                .unwrap_or(0)
            + self.variables.encoded_len(version)
            + self.metadata.encoded_len(version)?)
    }
}

/// The RESULT response: an `[int]` kind followed by the kind's payload.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    /// A result carrying no information (writes, DDL acknowledged elsewhere).
    Void,
    /// A result set.
    Rows(Rows),
    /// The keyspace was switched by a USE statement.
    SetKeyspace(String),
    /// A statement was prepared.
    Prepared(Prepared),
    /// The query changed the schema.
    SchemaChange(SchemaChange),
}

impl QueryResult {
    /// The `[int]` kind of this result.
    pub fn kind(&self) -> i32 {
        match self {
            QueryResult::Void => result_kinds::VOID,
            QueryResult::Rows(_) => result_kinds::ROWS,
            QueryResult::SetKeyspace(_) => result_kinds::SET_KEYSPACE,
            QueryResult::Prepared(_) => result_kinds::PREPARED,
            QueryResult::SchemaChange(_) => result_kinds::SCHEMA_CHANGE,
        }
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_int(self.kind(), payload);
        match self {
            QueryResult::Void => Ok(()),
            QueryResult::Rows(rows) => rows.write(payload, version),
            QueryResult::SetKeyspace(keyspace) => primitives::write_string(keyspace, payload),
            QueryResult::Prepared(prepared) => prepared.write(payload, version),
            QueryResult::SchemaChange(change) => change.encode(version, payload),
        }
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        Ok(4 + match self {
            QueryResult::Void => 0,
            QueryResult::Rows(rows) => rows.encoded_len(version)?,
            QueryResult::SetKeyspace(keyspace) => primitives::string_len(keyspace),
            QueryResult::Prepared(prepared) => prepared.encoded_len(version)?,
            QueryResult::SchemaChange(change) => change.encoded_length(version)?,
        })
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let kind = primitives::read_int(start, payload).context("cannot read result kind")?;
        Ok(match kind {
            result_kinds::VOID => QueryResult::Void,
            result_kinds::ROWS => QueryResult::Rows(Rows::read(start, payload, version)?),
            result_kinds::SET_KEYSPACE => QueryResult::SetKeyspace(
                primitives::read_string(start, payload).context("cannot read new keyspace")?,
            ),
            result_kinds::PREPARED => QueryResult::Prepared(Prepared::read(start, payload, version)?),
            result_kinds::SCHEMA_CHANGE => {
                QueryResult::SchemaChange(SchemaChange::decode(start, payload, version)?)
            }
            kind => bail!("unknown result kind: {:#06x}", kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::event::{
        SchemaChangeTarget,
        SchemaChangeType,
    };

    fn round_trip(result: QueryResult, version: ProtocolVersion) -> Vec<u8> {
        let mut payload = Vec::new();
        result.encode(version, &mut payload).unwrap();
        assert_eq!(result.encoded_length(version).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(QueryResult::decode(&mut start, &payload, version).unwrap(), result);
        assert_eq!(start, payload.len());
        payload
    }

    fn sample_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec {
                keyspace: "ks1".into(),
                table: "t1".into(),
                name: "k".into(),
                data_type: DataType::Uuid,
            },
            ColumnSpec {
                keyspace: "ks1".into(),
                table: "t1".into(),
                name: "v".into(),
                data_type: DataType::List(Box::new(DataType::Varchar)),
            },
        ]
    }

    #[test]
    fn void_result() {
        let payload = round_trip(QueryResult::Void, ProtocolVersion::V4);
        assert_eq!(payload, [0, 0, 0, 1]);
    }

    #[test]
    fn set_keyspace_result() {
        round_trip(QueryResult::SetKeyspace("ks1".into()), ProtocolVersion::V3);
    }

    #[test]
    fn rows_with_global_table_spec() {
        let rows = Rows {
            metadata: RowsMetadata {
                column_count: 2,
                columns: sample_columns(),
                ..RowsMetadata::default()
            },
            data: vec![
                vec![Some(vec![0x11; 16]), Some(vec![0, 0, 0, 0])],
                vec![Some(vec![0x22; 16]), None],
            ],
        };
        let payload = round_trip(QueryResult::Rows(rows), ProtocolVersion::V4);
        // kind, then flags with GLOBAL_TABLES_SPEC set
        assert_eq!(&payload[4..8], &[0, 0, 0, 1]);
    }

    #[test]
    fn rows_with_per_column_specs() {
        let mut columns = sample_columns();
        columns[1].table = "t2".into();
        let rows = Rows {
            metadata: RowsMetadata {
                column_count: 2,
                columns,
                ..RowsMetadata::default()
            },
            data: vec![],
        };
        let payload = round_trip(QueryResult::Rows(rows), ProtocolVersion::V4);
        assert_eq!(&payload[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn rows_without_metadata() {
        let rows = Rows {
            metadata: RowsMetadata {
                column_count: 1,
                ..RowsMetadata::default()
            },
            data: vec![vec![Some(vec![0x01])]],
        };
        let payload = round_trip(QueryResult::Rows(rows), ProtocolVersion::V4);
        // NO_METADATA flag
        assert_eq!(&payload[4..8], &[0, 0, 0, 4]);
    }

    #[test]
    fn rows_with_paging_state() {
        let rows = Rows {
            metadata: RowsMetadata {
                column_count: 1,
                paging_state: Some(vec![0xCA, 0xFE]),
                ..RowsMetadata::default()
            },
            data: vec![],
        };
        round_trip(QueryResult::Rows(rows), ProtocolVersion::V3);
    }

    #[test]
    fn rows_with_new_metadata_id_is_gated() {
        let metadata = RowsMetadata {
            column_count: 1,
            new_metadata_id: Some(vec![0x0A, 0x0B]),
            ..RowsMetadata::default()
        };
        assert!(metadata.write(&mut Vec::new(), ProtocolVersion::V4).is_err());
        round_trip(
            QueryResult::Rows(Rows {
                metadata,
                data: vec![],
            }),
            ProtocolVersion::V5,
        );
    }

    #[test]
    fn continuous_paging_metadata_is_dse_only() {
        let metadata = RowsMetadata {
            column_count: 1,
            continuous_page_number: Some(3),
            last_continuous_page: true,
            ..RowsMetadata::default()
        };
        assert!(metadata.write(&mut Vec::new(), ProtocolVersion::V5).is_err());
        round_trip(
            QueryResult::Rows(Rows {
                metadata,
                data: vec![],
            }),
            ProtocolVersion::DseV1,
        );
    }

    #[test]
    fn prepared_result() {
        let prepared = Prepared {
            id: vec![0xAA; 16],
            result_metadata_id: None,
            variables: VariablesMetadata {
                pk_indices: vec![0],
                columns: sample_columns(),
            },
            metadata: RowsMetadata {
                column_count: 2,
                columns: sample_columns(),
                ..RowsMetadata::default()
            },
        };
        round_trip(QueryResult::Prepared(prepared.clone()), ProtocolVersion::V4);

        // v3 has no pk indices
        let prepared_v3 = Prepared {
            variables: VariablesMetadata {
                pk_indices: vec![],
                columns: sample_columns(),
            },
            ..prepared.clone()
        };
        round_trip(QueryResult::Prepared(prepared_v3), ProtocolVersion::V3);

        // v5 requires the result-metadata id
        assert!(QueryResult::Prepared(prepared.clone())
            .encode(ProtocolVersion::V5, &mut Vec::new())
            .is_err());
        let prepared_v5 = Prepared {
            result_metadata_id: Some(vec![0xBB; 16]),
            ..prepared
        };
        round_trip(QueryResult::Prepared(prepared_v5), ProtocolVersion::V5);
    }

    #[test]
    fn schema_change_result() {
        round_trip(
            QueryResult::SchemaChange(SchemaChange {
                change_type: SchemaChangeType::Created,
                target: SchemaChangeTarget::Table,
                keyspace: "ks1".into(),
                name: Some("t1".into()),
                arguments: None,
            }),
            ProtocolVersion::V4,
        );
    }

    #[test]
    fn unknown_result_kind_is_rejected() {
        let mut start = 0;
        assert!(QueryResult::decode(&mut start, &[0, 0, 0, 9], ProtocolVersion::V4).is_err());
    }
}
