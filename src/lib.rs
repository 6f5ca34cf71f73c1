// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This crate implements decoder/encoder for a Cassandra frame and the associated protocol.
//! See `https://github.com/apache/cassandra/blob/trunk/doc/native_protocol_v5.spec` for more details.
//!
//! Supported protocol versions are OSS v3, v4 and v5 plus the DSE variants v1 and v2
//! (v2 is additionally recognized for legacy peers). The crate is a pure codec:
//! it owns no sockets, no sessions and no shared mutable state, so a configured
//! codec can be shared freely between threads.

#![warn(missing_docs)]
pub mod compression;
pub mod frame;

pub use compression::*;
pub use frame::*;
