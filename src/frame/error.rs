// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the ERROR response and its per-code payload tails.

use super::{
    consistency::Consistency,
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
    convert::TryFrom,
    fmt,
    net::IpAddr,
};

/**
    The `[int]` error codes of the ERROR message:
    - `0x0000`: Server error
    - `0x000A`: Protocol error
    - `0x0100`: Authentication error
    - `0x1000`: Unavailable exception
    - `0x1001`: Overloaded
    - `0x1002`: Is bootstrapping
    - `0x1003`: Truncate error
    - `0x1100`: Write timeout
    - `0x1200`: Read timeout
    - `0x1300`: Read failure
    - `0x1400`: Function failure
    - `0x1500`: Write failure
    - `0x2000`: Syntax error
    - `0x2100`: Unauthorized
    - `0x2200`: Invalid
    - `0x2300`: Config error
    - `0x2400`: Already exists
    - `0x2500`: Unprepared
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum ErrorCode {
    ServerError = 0x0000,
    ProtocolError = 0x000A,
    AuthenticationError = 0x0100,
    Unavailable = 0x1000,
    Overloaded = 0x1001,
    IsBootstrapping = 0x1002,
    TruncateError = 0x1003,
    WriteTimeout = 0x1100,
    ReadTimeout = 0x1200,
    ReadFailure = 0x1300,
    FunctionFailure = 0x1400,
    WriteFailure = 0x1500,
    SyntaxError = 0x2000,
    Unauthorized = 0x2100,
    Invalid = 0x2200,
    ConfigError = 0x2300,
    AlreadyExists = 0x2400,
    Unprepared = 0x2500,
}

impl TryFrom<i32> for ErrorCode {
    type Error = anyhow::Error;

    fn try_from(code: i32) -> Result<Self> {
        Ok(match code {
            0x0000 => ErrorCode::ServerError,
            0x000A => ErrorCode::ProtocolError,
            0x0100 => ErrorCode::AuthenticationError,
            0x1000 => ErrorCode::Unavailable,
            0x1001 => ErrorCode::Overloaded,
            0x1002 => ErrorCode::IsBootstrapping,
            0x1003 => ErrorCode::TruncateError,
            0x1100 => ErrorCode::WriteTimeout,
            0x1200 => ErrorCode::ReadTimeout,
            0x1300 => ErrorCode::ReadFailure,
            0x1400 => ErrorCode::FunctionFailure,
            0x1500 => ErrorCode::WriteFailure,
            0x2000 => ErrorCode::SyntaxError,
            0x2100 => ErrorCode::Unauthorized,
            0x2200 => ErrorCode::Invalid,
            0x2300 => ErrorCode::ConfigError,
            0x2400 => ErrorCode::AlreadyExists,
            0x2500 => ErrorCode::Unprepared,
            c => bail!("unknown error code: {:#06x}", c),
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The number of replicas that failed, reported either as a plain count
/// (before v5) or as a per-node reason map (v5+).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReasons {
    /// The failure count of pre-v5 wire forms.
    Count(i32),
    /// The per-node failure codes of v5+ wire forms, in wire order.
    ReasonMap(Vec<(IpAddr, u16)>),
}

impl FailureReasons {
    fn check(&self, version: ProtocolVersion) -> Result<()> {
        match self {
            FailureReasons::Count(_) => ensure!(
                !version.supports_reason_map(),
                "protocol {} reports failures as a reason map, not a count",
                version
            ),
            FailureReasons::ReasonMap(_) => ensure!(
                version.supports_reason_map(),
                "failure reason maps are not supported in protocol {}",
                version
            ),
        }
        Ok(())
    }

    fn write(&self, payload: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        self.check(version)?;
        match self {
            FailureReasons::Count(count) => {
                primitives::write_int(*count, payload);
                Ok(())
            }
            FailureReasons::ReasonMap(reasons) => primitives::write_reason_map(reasons, payload),
        }
    }

    fn read(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        if version.supports_reason_map() {
            Ok(FailureReasons::ReasonMap(primitives::read_reason_map(start, payload)?))
        } else {
            Ok(FailureReasons::Count(
                primitives::read_int(start, payload).context("cannot read failure count")?,
            ))
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            FailureReasons::Count(_) => 4,
            FailureReasons::ReasonMap(reasons) => primitives::reason_map_len(reasons),
        }
    }
}

/// The code-specific tail of an ERROR message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorDetails {
    /// No additional payload (server/protocol/auth/syntax/... errors).
    None,
    /// Not enough live replicas to achieve the consistency level.
    Unavailable {
        /// The consistency level of the failed query.
        consistency: Consistency,
        /// The number of replicas required.
        required: i32,
        /// The number of replicas alive.
        alive: i32,
    },
    /// The coordinator timed out waiting for replica reads.
    ReadTimeout {
        /// The consistency level of the failed query.
        consistency: Consistency,
        /// The number of replicas that answered.
        received: i32,
        /// The number of replicas required to answer.
        block_for: i32,
        /// Whether the replica asked for the data answered.
        data_present: bool,
    },
    /// The coordinator timed out waiting for replica writes.
    WriteTimeout {
        /// The consistency level of the failed query.
        consistency: Consistency,
        /// The number of replicas that acknowledged.
        received: i32,
        /// The number of replicas required to acknowledge.
        block_for: i32,
        /// The kind of write that timed out.
        write_type: String,
    },
    /// A replica-side read failure.
    ReadFailure {
        /// The consistency level of the failed query.
        consistency: Consistency,
        /// The number of replicas that answered.
        received: i32,
        /// The number of replicas required to answer.
        block_for: i32,
        /// The failing replicas.
        reasons: FailureReasons,
        /// Whether the replica asked for the data answered.
        data_present: bool,
    },
    /// A replica-side write failure.
    WriteFailure {
        /// The consistency level of the failed query.
        consistency: Consistency,
        /// The number of replicas that acknowledged.
        received: i32,
        /// The number of replicas required to acknowledge.
        block_for: i32,
        /// The failing replicas.
        reasons: FailureReasons,
        /// The kind of write that failed.
        write_type: String,
    },
    /// A user defined function failed during execution.
    FunctionFailure {
        /// The keyspace of the failing function.
        keyspace: String,
        /// The name of the failing function.
        function: String,
        /// The argument types of the failing function.
        arg_types: Vec<String>,
    },
    /// The keyspace or table to create already exists.
    AlreadyExists {
        /// The keyspace of the existing object.
        keyspace: String,
        /// The existing table, empty for a keyspace-level conflict.
        table: String,
    },
    /// The prepared statement id is unknown to the coordinator.
    Unprepared {
        /// The unknown prepared statement id.
        id: Vec<u8>,
    },
}

/**
    The ERROR response: an `[int]` code, a `[string]` message and a
    code-specific tail. The code and the details variant must agree; encode
    validates the pairing and decode derives it.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CqlError {
    /// The error code.
    pub code: ErrorCode,
    /// The human readable error message.
    pub message: String,
    /// The code-specific payload.
    pub details: ErrorDetails,
}

impl CqlError {
    /// Create an ERROR with no code-specific tail.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: ErrorDetails::None,
        }
    }

    fn check(&self, version: ProtocolVersion) -> Result<()> {
        let matches = match (&self.code, &self.details) {
            (ErrorCode::Unavailable, ErrorDetails::Unavailable { .. })
            | (ErrorCode::ReadTimeout, ErrorDetails::ReadTimeout { .. })
            | (ErrorCode::WriteTimeout, ErrorDetails::WriteTimeout { .. })
            | (ErrorCode::ReadFailure, ErrorDetails::ReadFailure { .. })
            | (ErrorCode::WriteFailure, ErrorDetails::WriteFailure { .. })
            | (ErrorCode::FunctionFailure, ErrorDetails::FunctionFailure { .. })
            | (ErrorCode::AlreadyExists, ErrorDetails::AlreadyExists { .. })
            | (ErrorCode::Unprepared, ErrorDetails::Unprepared { .. }) => true,
            (
                ErrorCode::ServerError
                | ErrorCode::ProtocolError
                | ErrorCode::AuthenticationError
                | ErrorCode::Overloaded
                | ErrorCode::IsBootstrapping
                | ErrorCode::TruncateError
                | ErrorCode::SyntaxError
                | ErrorCode::Unauthorized
                | ErrorCode::Invalid
                | ErrorCode::ConfigError,
                ErrorDetails::None,
            ) => true,
            _ => false,
        };
        ensure!(
            matches,
            "error details do not match error code {}",
            self.code
        );
        if let ErrorDetails::ReadFailure { reasons, .. } | ErrorDetails::WriteFailure { reasons, .. } = &self.details {
            reasons.check(version)?;
        }
        Ok(())
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        self.check(version)?;
        primitives::write_int(self.code as i32, payload);
        primitives::write_string(&self.message, payload)?;
        match &self.details {
            ErrorDetails::None => (),
            ErrorDetails::Unavailable {
                consistency,
                required,
                alive,
            } => {
                primitives::write_short(*consistency as u16, payload);
                primitives::write_int(*required, payload);
                primitives::write_int(*alive, payload);
            }
            ErrorDetails::ReadTimeout {
                consistency,
                received,
                block_for,
                data_present,
            } => {
                primitives::write_short(*consistency as u16, payload);
                primitives::write_int(*received, payload);
                primitives::write_int(*block_for, payload);
                primitives::write_byte(*data_present as u8, payload);
            }
            ErrorDetails::WriteTimeout {
                consistency,
                received,
                block_for,
                write_type,
            } => {
                primitives::write_short(*consistency as u16, payload);
                primitives::write_int(*received, payload);
                primitives::write_int(*block_for, payload);
                primitives::write_string(write_type, payload)?;
            }
            ErrorDetails::ReadFailure {
                consistency,
                received,
                block_for,
                reasons,
                data_present,
            } => {
                primitives::write_short(*consistency as u16, payload);
                primitives::write_int(*received, payload);
                primitives::write_int(*block_for, payload);
                reasons.write(payload, version)?;
                primitives::write_byte(*data_present as u8, payload);
            }
            ErrorDetails::WriteFailure {
                consistency,
                received,
                block_for,
                reasons,
                write_type,
            } => {
                primitives::write_short(*consistency as u16, payload);
                primitives::write_int(*received, payload);
                primitives::write_int(*block_for, payload);
                reasons.write(payload, version)?;
                primitives::write_string(write_type, payload)?;
            }
            ErrorDetails::FunctionFailure {
                keyspace,
                function,
                arg_types,
            } => {
                primitives::write_string(keyspace, payload)?;
                primitives::write_string(function, payload)?;
                primitives::write_string_list(arg_types, payload)?;
            }
            ErrorDetails::AlreadyExists { keyspace, table } => {
                primitives::write_string(keyspace, payload)?;
                primitives::write_string(table, payload)?;
            }
            ErrorDetails::Unprepared { id } => {
                primitives::write_short_bytes(id, payload)?;
            }
        }
        Ok(())
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(4
            + primitives::string_len(&self.message)
            + match &self.details {
                ErrorDetails::None => 0,
                ErrorDetails::Unavailable { .. } => 2 + 4 + 4,
                ErrorDetails::ReadTimeout { .. } => 2 + 4 + 4 + 1,
                ErrorDetails::WriteTimeout { write_type, .. } => 2 + 4 + 4 + primitives::string_len(write_type),
                ErrorDetails::ReadFailure { reasons, .. } => 2 + 4 + 4 + reasons.encoded_len() + 1,
                ErrorDetails::WriteFailure { reasons, write_type, .. } => {
                    2 + 4 + 4 + reasons.encoded_len() + primitives::string_len(write_type)
                }
                ErrorDetails::FunctionFailure {
                    keyspace,
                    function,
                    arg_types,
                } => {
                    primitives::string_len(keyspace)
                        + primitives::string_len(function)
                        + primitives::string_list_len(arg_types)
                }
                ErrorDetails::AlreadyExists { keyspace, table } => {
                    primitives::string_len(keyspace) + primitives::string_len(table)
                }
                ErrorDetails::Unprepared { id } => primitives::short_bytes_len(id),
            })
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let code =
            ErrorCode::try_from(primitives::read_int(start, payload).context("cannot read error code")?)?;
        let message = primitives::read_string(start, payload).context("cannot read error message")?;
        let read_consistency = |start: &mut usize| -> Result<Consistency> {
            Consistency::try_from(primitives::read_short(start, payload).context("cannot read error consistency")?)
        };
        let details = match code {
            ErrorCode::Unavailable => ErrorDetails::Unavailable {
                consistency: read_consistency(start)?,
                required: primitives::read_int(start, payload).context("cannot read required replica count")?,
                alive: primitives::read_int(start, payload).context("cannot read alive replica count")?,
            },
            ErrorCode::ReadTimeout => ErrorDetails::ReadTimeout {
                consistency: read_consistency(start)?,
                received: primitives::read_int(start, payload).context("cannot read received count")?,
                block_for: primitives::read_int(start, payload).context("cannot read blockfor count")?,
                data_present: primitives::read_byte(start, payload).context("cannot read data-present byte")? != 0,
            },
            ErrorCode::WriteTimeout => ErrorDetails::WriteTimeout {
                consistency: read_consistency(start)?,
                received: primitives::read_int(start, payload).context("cannot read received count")?,
                block_for: primitives::read_int(start, payload).context("cannot read blockfor count")?,
                write_type: primitives::read_string(start, payload).context("cannot read write type")?,
            },
            ErrorCode::ReadFailure => ErrorDetails::ReadFailure {
                consistency: read_consistency(start)?,
                received: primitives::read_int(start, payload).context("cannot read received count")?,
                block_for: primitives::read_int(start, payload).context("cannot read blockfor count")?,
                reasons: FailureReasons::read(start, payload, version)?,
                data_present: primitives::read_byte(start, payload).context("cannot read data-present byte")? != 0,
            },
            ErrorCode::WriteFailure => ErrorDetails::WriteFailure {
                consistency: read_consistency(start)?,
                received: primitives::read_int(start, payload).context("cannot read received count")?,
                block_for: primitives::read_int(start, payload).context("cannot read blockfor count")?,
                reasons: FailureReasons::read(start, payload, version)?,
                write_type: primitives::read_string(start, payload).context("cannot read write type")?,
            },
            ErrorCode::FunctionFailure => ErrorDetails::FunctionFailure {
                keyspace: primitives::read_string(start, payload).context("cannot read function keyspace")?,
                function: primitives::read_string(start, payload).context("cannot read function name")?,
                arg_types: primitives::read_string_list(start, payload).context("cannot read argument types")?,
            },
            ErrorCode::AlreadyExists => ErrorDetails::AlreadyExists {
                keyspace: primitives::read_string(start, payload).context("cannot read conflicting keyspace")?,
                table: primitives::read_string(start, payload).context("cannot read conflicting table")?,
            },
            ErrorCode::Unprepared => ErrorDetails::Unprepared {
                id: primitives::read_short_bytes(start, payload).context("cannot read unprepared id")?,
            },
            _ => ErrorDetails::None,
        };
        Ok(Self { code, message, details })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(error: CqlError, version: ProtocolVersion) -> Vec<u8> {
        let mut payload = Vec::new();
        error.encode(version, &mut payload).unwrap();
        assert_eq!(error.encoded_length(version).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(CqlError::decode(&mut start, &payload, version).unwrap(), error);
        assert_eq!(start, payload.len());
        payload
    }

    #[test]
    fn tailless_errors() {
        round_trip(
            CqlError::new(ErrorCode::SyntaxError, "line 1: no viable alternative"),
            ProtocolVersion::V3,
        );
        round_trip(CqlError::new(ErrorCode::Overloaded, "shedding"), ProtocolVersion::V5);
    }

    #[test]
    fn unavailable_tail() {
        round_trip(
            CqlError {
                code: ErrorCode::Unavailable,
                message: "cannot achieve consistency".to_string(),
                details: ErrorDetails::Unavailable {
                    consistency: Consistency::Quorum,
                    required: 3,
                    alive: 1,
                },
            },
            ProtocolVersion::V4,
        );
    }

    #[test]
    fn write_failure_uses_count_before_v5() {
        round_trip(
            CqlError {
                code: ErrorCode::WriteFailure,
                message: "replica failure".to_string(),
                details: ErrorDetails::WriteFailure {
                    consistency: Consistency::Quorum,
                    received: 2,
                    block_for: 3,
                    reasons: FailureReasons::Count(1),
                    write_type: "SIMPLE".to_string(),
                },
            },
            ProtocolVersion::V4,
        );
    }

    #[test]
    fn write_failure_uses_reason_map_from_v5() {
        let error = CqlError {
            code: ErrorCode::WriteFailure,
            message: "replica failure".to_string(),
            details: ErrorDetails::WriteFailure {
                consistency: Consistency::Quorum,
                received: 2,
                block_for: 3,
                reasons: FailureReasons::ReasonMap(vec![("192.168.1.1".parse().unwrap(), 0x0001)]),
                write_type: "SIMPLE".to_string(),
            },
        };
        let payload = round_trip(error.clone(), ProtocolVersion::V5);
        // code, message, cl, received, blockfor, then the reason map
        let tail = &payload[4 + 2 + 15 + 2 + 4 + 4..];
        assert_eq!(
            tail,
            [
                0x00, 0x00, 0x00, 0x01, // one entry
                0x04, 192, 168, 1, 1, // inetaddr
                0x00, 0x01, // failure code
                0x00, 0x06, b'S', b'I', b'M', b'P', b'L', b'E',
            ]
        );
        // a count where the version wants a reason map is a gate error
        assert!(error.encode(ProtocolVersion::V4, &mut Vec::new()).is_err());
    }

    #[test]
    fn read_failure_round_trip() {
        round_trip(
            CqlError {
                code: ErrorCode::ReadFailure,
                message: "replica failure".to_string(),
                details: ErrorDetails::ReadFailure {
                    consistency: Consistency::LocalQuorum,
                    received: 1,
                    block_for: 2,
                    reasons: FailureReasons::ReasonMap(vec![
                        ("10.0.0.1".parse().unwrap(), 0x0000),
                        ("10.0.0.2".parse().unwrap(), 0x0002),
                    ]),
                    data_present: true,
                },
            },
            ProtocolVersion::DseV2,
        );
    }

    #[test]
    fn unprepared_and_already_exists() {
        round_trip(
            CqlError {
                code: ErrorCode::Unprepared,
                message: "unknown id".to_string(),
                details: ErrorDetails::Unprepared { id: vec![0xAA; 16] },
            },
            ProtocolVersion::V4,
        );
        round_trip(
            CqlError {
                code: ErrorCode::AlreadyExists,
                message: "table exists".to_string(),
                details: ErrorDetails::AlreadyExists {
                    keyspace: "ks1".to_string(),
                    table: "t1".to_string(),
                },
            },
            ProtocolVersion::V4,
        );
    }

    #[test]
    fn mismatched_details_are_rejected() {
        let error = CqlError {
            code: ErrorCode::SyntaxError,
            message: "mismatch".to_string(),
            details: ErrorDetails::Unprepared { id: vec![1] },
        };
        assert!(error.encode(ProtocolVersion::V4, &mut Vec::new()).is_err());
    }

    #[test]
    fn unknown_code_is_rejected() {
        let mut payload = Vec::new();
        primitives::write_int(0x4200, &mut payload);
        primitives::write_string("?", &mut payload).unwrap();
        let mut start = 0;
        assert!(CqlError::decode(&mut start, &payload, ProtocolVersion::V4).is_err());
    }
}
