// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the consistency levels of the protocol.

use anyhow::{
    bail,
    Result,
};
use std::{
    convert::TryFrom,
    fmt,
};

/**
    A consistency level specification, encoded on the wire as a `[short]`:
    - `0x0000`: ANY
    - `0x0001`: ONE
    - `0x0002`: TWO
    - `0x0003`: THREE
    - `0x0004`: QUORUM
    - `0x0005`: ALL
    - `0x0006`: LOCAL_QUORUM
    - `0x0007`: EACH_QUORUM
    - `0x0008`: SERIAL
    - `0x0009`: LOCAL_SERIAL
    - `0x000A`: LOCAL_ONE
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
    Serial = 0x0008,
    LocalSerial = 0x0009,
    LocalOne = 0x000A,
}

impl Default for Consistency {
    fn default() -> Self {
        Consistency::Quorum
    }
}

impl TryFrom<u16> for Consistency {
    type Error = anyhow::Error;

    fn try_from(short: u16) -> Result<Self> {
        Ok(match short {
            0x0000 => Consistency::Any,
            0x0001 => Consistency::One,
            0x0002 => Consistency::Two,
            0x0003 => Consistency::Three,
            0x0004 => Consistency::Quorum,
            0x0005 => Consistency::All,
            0x0006 => Consistency::LocalQuorum,
            0x0007 => Consistency::EachQuorum,
            0x0008 => Consistency::Serial,
            0x0009 => Consistency::LocalSerial,
            0x000A => Consistency::LocalOne,
            s => bail!("unknown consistency level: {:#06x}", s),
        })
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        };
        name.fmt(f)
    }
}

impl Consistency {
    /// Whether this is one of the two serial levels accepted for the
    /// SERIAL_CONSISTENCY query option.
    pub fn is_serial(&self) -> bool {
        matches!(self, Consistency::Serial | Consistency::LocalSerial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for short in 0x0000..=0x000Au16 {
            let consistency = Consistency::try_from(short).unwrap();
            assert_eq!(consistency as u16, short);
        }
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(Consistency::try_from(0x000B).is_err());
    }

    #[test]
    fn serial_levels() {
        assert!(Consistency::Serial.is_serial());
        assert!(Consistency::LocalSerial.is_serial());
        assert!(!Consistency::Quorum.is_serial());
    }
}
