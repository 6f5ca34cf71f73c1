// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the message sum type tying every opcode to its codec.
//!
//! The exhaustive match in `encode`/`decode`/`encoded_length` is the codec
//! table: adding a variant without wiring its codec fails to compile.

use super::{
    auth_challenge::AuthChallenge,
    auth_response::AuthResponse,
    auth_success::AuthSuccess,
    authenticate::Authenticate,
    batch::Batch,
    error::CqlError,
    event::Event,
    execute::Execute,
    header::Direction,
    opcode::OpCode,
    options::{
        Options,
        Ready,
    },
    prepare::Prepare,
    query::Query,
    register::Register,
    result::QueryResult,
    revise::Revise,
    startup::Startup,
    supported::Supported,
    version::ProtocolVersion,
};
use anyhow::Result;
use derive_more::From;

/// A protocol message, the typed content of a frame body after the preamble.
#[derive(Clone, Debug, PartialEq, From)]
#[allow(missing_docs)]
pub enum Message {
    // requests
    Startup(Startup),
    Options(Options),
    Query(Query),
    Prepare(Prepare),
    Execute(Execute),
    Register(Register),
    Batch(Batch),
    AuthResponse(AuthResponse),
    Revise(Revise),
    // responses
    Error(CqlError),
    Ready(Ready),
    Authenticate(Authenticate),
    Supported(Supported),
    Result(QueryResult),
    Event(Event),
    AuthChallenge(AuthChallenge),
    AuthSuccess(AuthSuccess),
}

impl Default for Message {
    fn default() -> Self {
        Message::Options(Options)
    }
}

impl Message {
    /// The opcode identifying this message on the wire.
    pub fn opcode(&self) -> OpCode {
        match self {
            Message::Startup(_) => OpCode::Startup,
            Message::Options(_) => OpCode::Options,
            Message::Query(_) => OpCode::Query,
            Message::Prepare(_) => OpCode::Prepare,
            Message::Execute(_) => OpCode::Execute,
            Message::Register(_) => OpCode::Register,
            Message::Batch(_) => OpCode::Batch,
            Message::AuthResponse(_) => OpCode::AuthResponse,
            Message::Revise(_) => OpCode::Revise,
            Message::Error(_) => OpCode::Error,
            Message::Ready(_) => OpCode::Ready,
            Message::Authenticate(_) => OpCode::Authenticate,
            Message::Supported(_) => OpCode::Supported,
            Message::Result(_) => OpCode::Result,
            Message::Event(_) => OpCode::Event,
            Message::AuthChallenge(_) => OpCode::AuthChallenge,
            Message::AuthSuccess(_) => OpCode::AuthSuccess,
        }
    }

    /// Whether this message travels client-to-server or server-to-client.
    pub fn direction(&self) -> Direction {
        match self {
            Message::Startup(_)
            | Message::Options(_)
            | Message::Query(_)
            | Message::Prepare(_)
            | Message::Execute(_)
            | Message::Register(_)
            | Message::Batch(_)
            | Message::AuthResponse(_)
            | Message::Revise(_) => Direction::Request,
            Message::Error(_)
            | Message::Ready(_)
            | Message::Authenticate(_)
            | Message::Supported(_)
            | Message::Result(_)
            | Message::Event(_)
            | Message::AuthChallenge(_)
            | Message::AuthSuccess(_) => Direction::Response,
        }
    }

    /// Encode the message body for the given version.
    pub fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        match self {
            Message::Startup(m) => m.encode(version, payload),
            Message::Options(m) => m.encode(version, payload),
            Message::Query(m) => m.encode(version, payload),
            Message::Prepare(m) => m.encode(version, payload),
            Message::Execute(m) => m.encode(version, payload),
            Message::Register(m) => m.encode(version, payload),
            Message::Batch(m) => m.encode(version, payload),
            Message::AuthResponse(m) => m.encode(version, payload),
            Message::Revise(m) => m.encode(version, payload),
            Message::Error(m) => m.encode(version, payload),
            Message::Ready(m) => m.encode(version, payload),
            Message::Authenticate(m) => m.encode(version, payload),
            Message::Supported(m) => m.encode(version, payload),
            Message::Result(m) => m.encode(version, payload),
            Message::Event(m) => m.encode(version, payload),
            Message::AuthChallenge(m) => m.encode(version, payload),
            Message::AuthSuccess(m) => m.encode(version, payload),
        }
    }

    /// The exact byte length [`Message::encode`] will produce for the given
    /// version.
    pub fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        match self {
            Message::Startup(m) => m.encoded_length(version),
            Message::Options(m) => m.encoded_length(version),
            Message::Query(m) => m.encoded_length(version),
            Message::Prepare(m) => m.encoded_length(version),
            Message::Execute(m) => m.encoded_length(version),
            Message::Register(m) => m.encoded_length(version),
            Message::Batch(m) => m.encoded_length(version),
            Message::AuthResponse(m) => m.encoded_length(version),
            Message::Revise(m) => m.encoded_length(version),
            Message::Error(m) => m.encoded_length(version),
            Message::Ready(m) => m.encoded_length(version),
            Message::Authenticate(m) => m.encoded_length(version),
            Message::Supported(m) => m.encoded_length(version),
            Message::Result(m) => m.encoded_length(version),
            Message::Event(m) => m.encoded_length(version),
            Message::AuthChallenge(m) => m.encoded_length(version),
            Message::AuthSuccess(m) => m.encoded_length(version),
        }
    }

    /// Decode the message body identified by the given opcode.
    pub fn decode(
        opcode: OpCode,
        start: &mut usize,
        payload: &[u8],
        version: ProtocolVersion,
    ) -> Result<Self> {
        Ok(match opcode {
            OpCode::Startup => Message::Startup(Startup::decode(start, payload, version)?),
            OpCode::Options => Message::Options(Options::decode(start, payload, version)?),
            OpCode::Query => Message::Query(Query::decode(start, payload, version)?),
            OpCode::Prepare => Message::Prepare(Prepare::decode(start, payload, version)?),
            OpCode::Execute => Message::Execute(Execute::decode(start, payload, version)?),
            OpCode::Register => Message::Register(Register::decode(start, payload, version)?),
            OpCode::Batch => Message::Batch(Batch::decode(start, payload, version)?),
            OpCode::AuthResponse => Message::AuthResponse(AuthResponse::decode(start, payload, version)?),
            OpCode::Revise => Message::Revise(Revise::decode(start, payload, version)?),
            OpCode::Error => Message::Error(CqlError::decode(start, payload, version)?),
            OpCode::Ready => Message::Ready(Ready::decode(start, payload, version)?),
            OpCode::Authenticate => Message::Authenticate(Authenticate::decode(start, payload, version)?),
            OpCode::Supported => Message::Supported(Supported::decode(start, payload, version)?),
            OpCode::Result => Message::Result(QueryResult::decode(start, payload, version)?),
            OpCode::Event => Message::Event(Event::decode(start, payload, version)?),
            OpCode::AuthChallenge => Message::AuthChallenge(AuthChallenge::decode(start, payload, version)?),
            OpCode::AuthSuccess => Message::AuthSuccess(AuthSuccess::decode(start, payload, version)?),
        })
    }
}
