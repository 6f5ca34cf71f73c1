// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the AUTH_RESPONSE request.

use super::{
    primitives,
    version::ProtocolVersion,
};
use anyhow::{
    Context,
    Result,
};

/// The AUTH_RESPONSE request carrying a SASL token. The body is one
/// `[bytes]`; the token may be null depending on the mechanism.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthResponse {
    /// The SASL token, interpretation depending on the authenticator in use.
    pub token: Option<Vec<u8>>,
}

impl AuthResponse {
    /// Create an AUTH_RESPONSE with the `PasswordAuthenticator` token shape:
    /// a NUL byte, the username, a NUL byte and the password.
    pub fn password(username: &str, password: &str) -> Self {
        let mut token = Vec::with_capacity(2 + username.len() + password.len());
        token.push(0);
        token.extend(username.as_bytes());
        token.push(0);
        token.extend(password.as_bytes());
        Self { token: Some(token) }
    }

    pub(crate) fn encode(&self, _version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        primitives::write_bytes(self.token.as_deref(), payload)
    }

    pub(crate) fn encoded_length(&self, _version: ProtocolVersion) -> Result<usize> {
        Ok(primitives::bytes_len(self.token.as_deref()))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            token: primitives::read_bytes(start, payload).context("cannot read SASL token")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        for token in [None, Some(Vec::new()), Some(vec![0xCA, 0xFE])] {
            let response = AuthResponse { token: token.clone() };
            let mut payload = Vec::new();
            response.encode(ProtocolVersion::V4, &mut payload).unwrap();
            assert_eq!(response.encoded_length(ProtocolVersion::V4).unwrap(), payload.len());
            let mut start = 0;
            assert_eq!(
                AuthResponse::decode(&mut start, &payload, ProtocolVersion::V4).unwrap(),
                response
            );
        }
    }

    #[test]
    fn password_token_shape() {
        let response = AuthResponse::password("cassandra", "cassandra");
        let token = response.token.unwrap();
        assert_eq!(token[0], 0);
        assert_eq!(&token[1..10], b"cassandra");
        assert_eq!(token[10], 0);
    }
}
