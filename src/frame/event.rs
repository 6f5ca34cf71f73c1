// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the EVENT response pushed by the server on
//! registered streams, together with the schema-change payload it shares with
//! the RESULT message.

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
use std::{
    fmt,
    net::SocketAddr,
    str::FromStr,
};

/// The kinds of events a client can register for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Cluster topology changes (nodes joining, leaving or moving).
    TopologyChange,
    /// Node liveness changes (up/down).
    StatusChange,
    /// Schema changes.
    SchemaChange,
}

impl EventType {
    /// The `[string]` name of this event type.
    pub fn name(&self) -> &'static str {
        match self {
            EventType::TopologyChange => "TOPOLOGY_CHANGE",
            EventType::StatusChange => "STATUS_CHANGE",
            EventType::SchemaChange => "SCHEMA_CHANGE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "TOPOLOGY_CHANGE" => EventType::TopologyChange,
            "STATUS_CHANGE" => EventType::StatusChange,
            "SCHEMA_CHANGE" => EventType::SchemaChange,
            s => bail!("unknown event type: {}", s),
        })
    }
}

/// The kinds of topology changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TopologyChangeType {
    /// A node joined the cluster.
    NewNode,
    /// A node left the cluster.
    RemovedNode,
    /// A node changed token ownership.
    MovedNode,
}

impl TopologyChangeType {
    /// The `[string]` name of this change type.
    pub fn name(&self) -> &'static str {
        match self {
            TopologyChangeType::NewNode => "NEW_NODE",
            TopologyChangeType::RemovedNode => "REMOVED_NODE",
            TopologyChangeType::MovedNode => "MOVED_NODE",
        }
    }
}

impl fmt::Display for TopologyChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for TopologyChangeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "NEW_NODE" => TopologyChangeType::NewNode,
            "REMOVED_NODE" => TopologyChangeType::RemovedNode,
            "MOVED_NODE" => TopologyChangeType::MovedNode,
            s => bail!("unknown topology change type: {}", s),
        })
    }
}

/// The kinds of status changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusChangeType {
    /// The node is up.
    Up,
    /// The node is down.
    Down,
}

impl StatusChangeType {
    /// The `[string]` name of this change type.
    pub fn name(&self) -> &'static str {
        match self {
            StatusChangeType::Up => "UP",
            StatusChangeType::Down => "DOWN",
        }
    }
}

impl fmt::Display for StatusChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for StatusChangeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "UP" => StatusChangeType::Up,
            "DOWN" => StatusChangeType::Down,
            s => bail!("unknown status change type: {}", s),
        })
    }
}

/// The kinds of schema changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SchemaChangeType {
    /// The target was created.
    Created,
    /// The target was updated.
    Updated,
    /// The target was dropped.
    Dropped,
}

impl SchemaChangeType {
    /// The `[string]` name of this change type.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaChangeType::Created => "CREATED",
            SchemaChangeType::Updated => "UPDATED",
            SchemaChangeType::Dropped => "DROPPED",
        }
    }
}

impl fmt::Display for SchemaChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for SchemaChangeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "CREATED" => SchemaChangeType::Created,
            "UPDATED" => SchemaChangeType::Updated,
            "DROPPED" => SchemaChangeType::Dropped,
            s => bail!("unknown schema change type: {}", s),
        })
    }
}

/// What kind of schema object a schema change affects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SchemaChangeTarget {
    Keyspace,
    Table,
    Type,
    Function,
    Aggregate,
}

impl SchemaChangeTarget {
    /// The `[string]` name of this target.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaChangeTarget::Keyspace => "KEYSPACE",
            SchemaChangeTarget::Table => "TABLE",
            SchemaChangeTarget::Type => "TYPE",
            SchemaChangeTarget::Function => "FUNCTION",
            SchemaChangeTarget::Aggregate => "AGGREGATE",
        }
    }
}

impl fmt::Display for SchemaChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for SchemaChangeTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "KEYSPACE" => SchemaChangeTarget::Keyspace,
            "TABLE" => SchemaChangeTarget::Table,
            "TYPE" => SchemaChangeTarget::Type,
            "FUNCTION" => SchemaChangeTarget::Function,
            "AGGREGATE" => SchemaChangeTarget::Aggregate,
            s => bail!("unknown schema change target: {}", s),
        })
    }
}

/**
    A schema-change notification, shared between the EVENT message and the
    SchemaChange RESULT.

    The payload after change type and target depends on the target: a keyspace
    change carries the keyspace name only; table and type changes add the
    object name; function and aggregate changes (v4+) add the name and the
    signature argument types.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaChange {
    /// What happened to the target.
    pub change_type: SchemaChangeType,
    /// What kind of object changed.
    pub target: SchemaChangeTarget,
    /// The keyspace of the changed object.
    pub keyspace: String,
    /// The object name, absent for keyspace-level changes.
    pub name: Option<String>,
    /// The argument types of the changed function or aggregate.
    pub arguments: Option<Vec<String>>,
}

impl SchemaChange {
    fn check(&self, version: ProtocolVersion) -> Result<()> {
        match self.target {
            SchemaChangeTarget::Keyspace => {
                ensure!(self.name.is_none(), "a KEYSPACE schema change carries no object name");
                ensure!(self.arguments.is_none(), "a KEYSPACE schema change carries no arguments");
            }
            SchemaChangeTarget::Table | SchemaChangeTarget::Type => {
                ensure!(self.name.is_some(), "a {} schema change requires an object name", self.target);
                ensure!(self.arguments.is_none(), "a {} schema change carries no arguments", self.target);
            }
            SchemaChangeTarget::Function | SchemaChangeTarget::Aggregate => {
                ensure!(
                    version.supports_function_schema_changes(),
                    "schema change target {} is not supported in protocol {}",
                    self.target,
                    version
                );
                ensure!(self.name.is_some(), "a {} schema change requires an object name", self.target);
                ensure!(
                    self.arguments.is_some(),
                    "a {} schema change requires its argument types",
                    self.target
                );
            }
        }
        Ok(())
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        self.check(version)?;
        primitives::write_string(self.change_type.name(), payload)?;
        primitives::write_string(self.target.name(), payload)?;
        primitives::write_string(&self.keyspace, payload)?;
        if let Some(name) = &self.name {
            primitives::write_string(name, payload)?;
        }
        if let Some(arguments) = &self.arguments {
            primitives::write_string_list(arguments, payload)?;
        }
        Ok(())
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(primitives::string_len(self.change_type.name())
            + primitives::string_len(self.target.name())
            + primitives::string_len(&self.keyspace)
            + self.name.as_deref().map(primitives::string_len).unwrap_or(0)
            + self
                .arguments
                .as_deref()
                .map(primitives::string_list_len)
                .unwrap_or(0))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let change_type = primitives::read_string(start, payload)
            .context("cannot read schema change type")?
            .parse()?;
        let target: SchemaChangeTarget = primitives::read_string(start, payload)
            .context("cannot read schema change target")?
            .parse()?;
        let keyspace = primitives::read_string(start, payload).context("cannot read schema change keyspace")?;
        let (name, arguments) = match target {
            SchemaChangeTarget::Keyspace => (None, None),
            SchemaChangeTarget::Table | SchemaChangeTarget::Type => (
                Some(primitives::read_string(start, payload).context("cannot read schema change object name")?),
                None,
            ),
            SchemaChangeTarget::Function | SchemaChangeTarget::Aggregate => (
                Some(primitives::read_string(start, payload).context("cannot read schema change object name")?),
                Some(
                    primitives::read_string_list(start, payload)
                        .context("cannot read schema change argument types")?,
                ),
            ),
        };
        let change = Self {
            change_type,
            target,
            keyspace,
            name,
            arguments,
        };
        change.check(version)?;
        Ok(change)
    }
}

/// An EVENT message. Events are only sent on streams the client registered
/// for and always use stream id -1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A cluster topology change.
    TopologyChange {
        /// What happened.
        change_type: TopologyChangeType,
        /// The address of the concerned node.
        address: SocketAddr,
    },
    /// A node status change.
    StatusChange {
        /// What happened.
        change_type: StatusChangeType,
        /// The address of the concerned node.
        address: SocketAddr,
    },
    /// A schema change.
    SchemaChange(SchemaChange),
}

impl Event {
    /// The type of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            Event::TopologyChange { .. } => EventType::TopologyChange,
            Event::StatusChange { .. } => EventType::StatusChange,
            Event::SchemaChange(_) => EventType::SchemaChange,
        }
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_string(self.event_type().name(), payload)?;
        match self {
            Event::TopologyChange { change_type, address } => {
                primitives::write_string(change_type.name(), payload)?;
                primitives::write_inet(address, payload);
            }
            Event::StatusChange { change_type, address } => {
                primitives::write_string(change_type.name(), payload)?;
                primitives::write_inet(address, payload);
            }
            Event::SchemaChange(change) => change.encode(version, payload)?,
        }
        Ok(())
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::string_len(self.event_type().name())
            + match self {
                Event::TopologyChange { change_type, address } => {
                    primitives::string_len(change_type.name()) + primitives::inet_len(address)
                }
                Event::StatusChange { change_type, address } => {
                    primitives::string_len(change_type.name()) + primitives::inet_len(address)
                }
                Event::SchemaChange(change) => change.encoded_length(version)?,
            })
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let event_type: EventType = primitives::read_string(start, payload)
            .context("cannot read event type")?
            .parse()?;
        Ok(match event_type {
            EventType::TopologyChange => Event::TopologyChange {
                change_type: primitives::read_string(start, payload)
                    .context("cannot read topology change type")?
                    .parse()?,
                address: primitives::read_inet(start, payload).context("cannot read topology change node")?,
            },
            EventType::StatusChange => Event::StatusChange {
                change_type: primitives::read_string(start, payload)
                    .context("cannot read status change type")?
                    .parse()?,
                address: primitives::read_inet(start, payload).context("cannot read status change node")?,
            },
            EventType::SchemaChange => Event::SchemaChange(SchemaChange::decode(start, payload, version)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(event: Event, version: ProtocolVersion) {
        let mut payload = Vec::new();
        event.encode(version, &mut payload).unwrap();
        assert_eq!(event.encoded_length(version).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(Event::decode(&mut start, &payload, version).unwrap(), event);
        assert_eq!(start, payload.len());
    }

    #[test]
    fn topology_and_status_changes() {
        round_trip(
            Event::TopologyChange {
                change_type: TopologyChangeType::NewNode,
                address: "10.1.2.3:9042".parse().unwrap(),
            },
            ProtocolVersion::V3,
        );
        round_trip(
            Event::StatusChange {
                change_type: StatusChangeType::Down,
                address: "[2001:db8::2]:9042".parse().unwrap(),
            },
            ProtocolVersion::V4,
        );
    }

    #[test]
    fn schema_changes_per_target() {
        round_trip(
            Event::SchemaChange(SchemaChange {
                change_type: SchemaChangeType::Created,
                target: SchemaChangeTarget::Keyspace,
                keyspace: "ks1".into(),
                name: None,
                arguments: None,
            }),
            ProtocolVersion::V3,
        );
        round_trip(
            Event::SchemaChange(SchemaChange {
                change_type: SchemaChangeType::Updated,
                target: SchemaChangeTarget::Table,
                keyspace: "ks1".into(),
                name: Some("t1".into()),
                arguments: None,
            }),
            ProtocolVersion::V4,
        );
        round_trip(
            Event::SchemaChange(SchemaChange {
                change_type: SchemaChangeType::Dropped,
                target: SchemaChangeTarget::Function,
                keyspace: "ks1".into(),
                name: Some("f1".into()),
                arguments: Some(vec!["int".into(), "text".into()]),
            }),
            ProtocolVersion::V4,
        );
    }

    #[test]
    fn function_changes_are_gated_to_v4() {
        let change = SchemaChange {
            change_type: SchemaChangeType::Created,
            target: SchemaChangeTarget::Aggregate,
            keyspace: "ks1".into(),
            name: Some("agg".into()),
            arguments: Some(vec![]),
        };
        assert!(change.encode(ProtocolVersion::V3, &mut Vec::new()).is_err());
        assert!(change.encode(ProtocolVersion::V4, &mut Vec::new()).is_ok());
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let mut payload = Vec::new();
        primitives::write_string("KEYSPACE_CHANGE", &mut payload).unwrap();
        let mut start = 0;
        assert!(Event::decode(&mut start, &payload, ProtocolVersion::V4).is_err());
    }
}
