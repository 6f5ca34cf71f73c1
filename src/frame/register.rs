// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the REGISTER request.

use super::{
    event::EventType,
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};

/// The REGISTER request, asking the server to push the listed event types on
/// this connection. The body is a `[string list]` of event type names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Register {
    /// The event types to register for.
    pub event_types: Vec<EventType>,
}

impl Register {
    /// Register for every event type.
    pub fn all() -> Self {
        Self {
            event_types: vec![EventType::TopologyChange, EventType::StatusChange, EventType::SchemaChange],
        }
    }

    pub(crate) fn encode(&self, _version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        let names = self
            .event_types
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>();
        primitives::write_string_list(&names, payload)
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(2 + self
            .event_types
            .iter()
            .map(|t| primitives::string_len(t.name()))
            .sum::<usize>())
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        let names = primitives::read_string_list(start, payload).context("cannot read event type list")?;
        let event_types = names
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<_>>>()
            .context("cannot decode REGISTER event types")?;
        Ok(Self { event_types })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let register = Register::all();
        let mut payload = Vec::new();
        register.encode(ProtocolVersion::V4, &mut payload).unwrap();
        assert_eq!(register.encoded_length(ProtocolVersion::V4).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(
            Register::decode(&mut start, &payload, ProtocolVersion::V4).unwrap(),
            register
        );
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let mut payload = Vec::new();
        primitives::write_string_list(&["NODE_RESTART".to_string()], &mut payload).unwrap();
        let mut start = 0;
        assert!(Register::decode(&mut start, &payload, ProtocolVersion::V4).is_err());
    }
}
