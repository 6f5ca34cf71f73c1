// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the DSE-only REVISE_REQUEST message used to steer
//! continuous paging sessions.

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
use std::convert::TryFrom;

/// The `[int]` revision kinds of a REVISE_REQUEST.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ReviseType {
    /// Stop the continuous paging session of the target stream.
    CancelContinuousPaging = 1,
    /// Ask for more continuous pages on the target stream (DSEv2).
    MoreContinuousPages = 2,
}

impl TryFrom<i32> for ReviseType {
    type Error = anyhow::Error;

    fn try_from(kind: i32) -> Result<Self> {
        Ok(match kind {
            1 => ReviseType::CancelContinuousPaging,
            2 => ReviseType::MoreContinuousPages,
            k => bail!("unknown revision type: {}", k),
        })
    }
}

/**
    The REVISE_REQUEST message: a revision type and the stream id of the
    continuous paging session it targets. The MORE_CONTINUOUS_PAGES revision
    (DSEv2 only) additionally carries how many further pages the client is
    ready for.
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Revise {
    /// What to do with the targeted session.
    pub revision_type: ReviseType,
    /// The stream id of the request that started the session.
    pub target_stream_id: i32,
    /// The number of additional pages requested (MORE_CONTINUOUS_PAGES).
    pub next_pages: Option<i32>,
}

impl Revise {
    /// Create a cancellation of the continuous paging session on the given
    /// stream.
    pub fn cancel(target_stream_id: i32) -> Self {
        Self {
            revision_type: ReviseType::CancelContinuousPaging,
            target_stream_id,
            next_pages: None,
        }
    }

    /// Ask for `next_pages` more pages on the given stream.
    pub fn more_pages(target_stream_id: i32, next_pages: i32) -> Self {
        Self {
            revision_type: ReviseType::MoreContinuousPages,
            target_stream_id,
            next_pages: Some(next_pages),
        }
    }

    fn check(&self, version: ProtocolVersion) -> Result<()> {
        ensure!(
            version.supports_revise_request(),
            "REVISE_REQUEST is not supported in protocol {}",
            version
        );
        match self.revision_type {
            ReviseType::CancelContinuousPaging => {
                ensure!(
                    self.next_pages.is_none(),
                    "a continuous paging cancellation carries no page count"
                );
            }
            ReviseType::MoreContinuousPages => {
                ensure!(
                    version.supports_more_pages_revision(),
                    "the MORE_CONTINUOUS_PAGES revision is not supported in protocol {}",
                    version
                );
                ensure!(
                    self.next_pages.is_some(),
                    "the MORE_CONTINUOUS_PAGES revision requires a page count"
                );
            }
        }
        Ok(())
    }

    pub(crate) fn encode(&self, version: ProtocolVersion, payload: &mut Vec<u8>) -> Result<()> {
        self.check(version)?;
        primitives::write_int(self.revision_type as i32, payload);
        primitives::write_int(self.target_stream_id, payload);
        if let Some(next_pages) = self.next_pages {
            primitives::write_int(next_pages, payload);
        }
        Ok(())
    }

    pub(crate) fn encoded_length(&self, version: ProtocolVersion) -> Result<usize> {
        self.check(version)?;
        Ok(4 + 4 + self.next_pages.map(|_| 4).unwrap_or(0))
    }

    pub(crate) fn decode(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> Result<Self> {
        let revision_type =
            ReviseType::try_from(primitives::read_int(start, payload).context("cannot read revision type")?)?;
        let target_stream_id =
            primitives::read_int(start, payload).context("cannot read revision target stream id")?;
        let next_pages = match revision_type {
            ReviseType::CancelContinuousPaging => None,
            ReviseType::MoreContinuousPages => {
                Some(primitives::read_int(start, payload).context("cannot read revision page count")?)
            }
        };
        let revise = Self {
            revision_type,
            target_stream_id,
            next_pages,
        };
        revise.check(version)?;
        Ok(revise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(revise: Revise, version: ProtocolVersion) {
        let mut payload = Vec::new();
        revise.encode(version, &mut payload).unwrap();
        assert_eq!(revise.encoded_length(version).unwrap(), payload.len());
        let mut start = 0;
        assert_eq!(Revise::decode(&mut start, &payload, version).unwrap(), revise);
        assert_eq!(start, payload.len());
    }

    #[test]
    fn cancel_round_trip() {
        round_trip(Revise::cancel(42), ProtocolVersion::DseV1);
        round_trip(Revise::cancel(42), ProtocolVersion::DseV2);
    }

    #[test]
    fn more_pages_requires_dse_v2() {
        let revise = Revise::more_pages(42, 4);
        assert!(revise.encode(ProtocolVersion::DseV1, &mut Vec::new()).is_err());
        round_trip(revise, ProtocolVersion::DseV2);
    }

    #[test]
    fn oss_versions_reject_revise() {
        assert!(Revise::cancel(1).encode(ProtocolVersion::V5, &mut Vec::new()).is_err());
    }

    #[test]
    fn unknown_revision_type_is_rejected() {
        let mut payload = Vec::new();
        primitives::write_int(3, &mut payload);
        primitives::write_int(1, &mut payload);
        let mut start = 0;
        assert!(Revise::decode(&mut start, &payload, ProtocolVersion::DseV2).is_err());
    }
}
