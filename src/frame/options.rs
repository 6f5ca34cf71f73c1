// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the OPTIONS request and the READY response, the two
//! empty-bodied messages of the protocol.

use super::version::ProtocolVersion;
use anyhow::Result;

/// The OPTIONS message, asking the server which startup options it supports.
/// The body is empty.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Options;

impl Options {
    pub(crate) fn encode(&self, _version: ProtocolVersion, _payload: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(0)
    }

    pub(crate) fn decode(_start: &mut usize, _payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Options)
    }
}

/// The READY message, the server's answer to a successful STARTUP when no
/// authentication is required. The body is empty.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ready;

impl Ready {
    pub(crate) fn encode(&self, _version: ProtocolVersion, _payload: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(0)
    }

    pub(crate) fn decode(_start: &mut usize, _payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Ready)
    }
}
