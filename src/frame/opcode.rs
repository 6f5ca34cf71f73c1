// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the opcodes of the protocol messages.

use anyhow::{
    bail,
    Result,
};
use std::{
    convert::TryFrom,
    fmt,
};

/**
    An integer byte that distinguishes the actual message:
    - `0x00`: ERROR
    - `0x01`: STARTUP
    - `0x02`: READY
    - `0x03`: AUTHENTICATE
    - `0x05`: OPTIONS
    - `0x06`: SUPPORTED
    - `0x07`: QUERY
    - `0x08`: RESULT
    - `0x09`: PREPARE
    - `0x0A`: EXECUTE
    - `0x0B`: REGISTER
    - `0x0C`: EVENT
    - `0x0D`: BATCH
    - `0x0E`: AUTH_CHALLENGE
    - `0x0F`: AUTH_RESPONSE
    - `0x10`: AUTH_SUCCESS
    - `0xFF`: REVISE_REQUEST (DSE only)
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum OpCode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Event = 0x0C,
    Batch = 0x0D,
    AuthChallenge = 0x0E,
    AuthResponse = 0x0F,
    AuthSuccess = 0x10,
    Revise = 0xFF,
}

impl TryFrom<u8> for OpCode {
    type Error = anyhow::Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => OpCode::Error,
            0x01 => OpCode::Startup,
            0x02 => OpCode::Ready,
            0x03 => OpCode::Authenticate,
            0x05 => OpCode::Options,
            0x06 => OpCode::Supported,
            0x07 => OpCode::Query,
            0x08 => OpCode::Result,
            0x09 => OpCode::Prepare,
            0x0A => OpCode::Execute,
            0x0B => OpCode::Register,
            0x0C => OpCode::Event,
            0x0D => OpCode::Batch,
            0x0E => OpCode::AuthChallenge,
            0x0F => OpCode::AuthResponse,
            0x10 => OpCode::AuthSuccess,
            0xFF => OpCode::Revise,
            b => bail!("unknown opcode: {:#04x}", b),
        })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Error => "ERROR",
            OpCode::Startup => "STARTUP",
            OpCode::Ready => "READY",
            OpCode::Authenticate => "AUTHENTICATE",
            OpCode::Options => "OPTIONS",
            OpCode::Supported => "SUPPORTED",
            OpCode::Query => "QUERY",
            OpCode::Result => "RESULT",
            OpCode::Prepare => "PREPARE",
            OpCode::Execute => "EXECUTE",
            OpCode::Register => "REGISTER",
            OpCode::Event => "EVENT",
            OpCode::Batch => "BATCH",
            OpCode::AuthChallenge => "AUTH_CHALLENGE",
            OpCode::AuthResponse => "AUTH_RESPONSE",
            OpCode::AuthSuccess => "AUTH_SUCCESS",
            OpCode::Revise => "REVISE_REQUEST",
        };
        name.fmt(f)
    }
}

impl OpCode {
    /// Whether frames with this opcode may have their body compressed. The
    /// STARTUP message negotiates the compression algorithm and OPTIONS
    /// precedes it, so neither can ever be compressed.
    pub fn is_compressible(&self) -> bool {
        !matches!(self, OpCode::Startup | OpCode::Options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for byte in [0x00, 0x01, 0x07, 0x0D, 0x10, 0xFF] {
            let opcode = OpCode::try_from(byte).unwrap();
            assert_eq!(opcode as u8, byte);
        }
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(OpCode::try_from(0x04).is_err());
        assert!(OpCode::try_from(0x11).is_err());
    }

    #[test]
    fn startup_and_options_are_not_compressible() {
        assert!(!OpCode::Startup.is_compressible());
        assert!(!OpCode::Options.is_compressible());
        assert!(OpCode::Query.is_compressible());
        assert!(OpCode::Result.is_compressible());
    }
}
