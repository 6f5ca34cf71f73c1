// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the body compression algorithms a client may
//! negotiate through the Startup message: LZ4 and Snappy.
//!
//! Compression applies to the full frame body (preamble included), never to
//! the header. The implementations carry no state, so they are freely
//! callable from concurrent encode/decode calls.

use anyhow::{
    anyhow,
    bail,
    ensure,
    Result,
};
use std::fmt;

/// A compression algorithm negotiable in the Startup options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompressionType {
    /// LZ4 block compression with a 4-byte big-endian decompressed-length
    /// prefix, as the server expects.
    Lz4,
    /// Snappy raw block compression, without any length preamble.
    Snappy,
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl std::str::FromStr for CompressionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "lz4" => CompressionType::Lz4,
            "snappy" => CompressionType::Snappy,
            s => bail!("unknown compression algorithm: {}", s),
        })
    }
}

impl CompressionType {
    /// The algorithm name used in the Startup COMPRESSION option.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionType::Lz4 => "lz4",
            CompressionType::Snappy => "snappy",
        }
    }
}

impl Compression for CompressionType {
    fn compress(&self, body: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::Lz4 => Lz4.compress(body),
            CompressionType::Snappy => Snappy.compress(body),
        }
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::Lz4 => Lz4.decompress(body),
            CompressionType::Snappy => Snappy.decompress(body),
        }
    }
}

/// A frame body compressor/decompressor. Implementations must be reentrant:
/// the frame codec calls them concurrently without serialization.
pub trait Compression: Send + Sync {
    /// Compress a frame body.
    fn compress(&self, body: &[u8]) -> Result<Vec<u8>>;
    /// Decompress a frame body.
    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>>;
}

/// The LZ4 block codec. The wire format prepends the decompressed length as a
/// 4-byte big-endian integer; a declared length of zero means the remainder
/// is a single pad byte and the body is empty.
#[derive(Copy, Clone, Debug, Default)]
pub struct Lz4;

impl Compression for Lz4 {
    fn compress(&self, body: &[u8]) -> Result<Vec<u8>> {
        ensure!(
            body.len() <= u32::MAX as usize,
            "body of {} bytes overflows the LZ4 length prefix",
            body.len()
        );
        let mut compressed = Vec::with_capacity(4 + body.len() / 2);
        compressed.extend((body.len() as u32).to_be_bytes());
        if body.is_empty() {
            // an empty LZ4 block is a lone zero token
            compressed.push(0x00);
        } else {
            compressed.extend(lz4_flex::block::compress(body));
        }
        Ok(compressed)
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        ensure!(body.len() >= 4, "cannot read LZ4 decompressed length: body too short");
        let decompressed_len = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as usize;
        if decompressed_len == 0 {
            ensure!(
                body.len() <= 5,
                "LZ4 body declares an empty payload but carries {} trailing bytes",
                body.len() - 4
            );
            return Ok(Vec::new());
        }
        let decompressed = lz4_flex::block::decompress(&body[4..], decompressed_len)
            .map_err(|e| anyhow!("cannot decompress LZ4 body: {}", e))?;
        ensure!(
            decompressed.len() == decompressed_len,
            "LZ4 body declares {} decompressed bytes but yields {}",
            decompressed_len,
            decompressed.len()
        );
        Ok(decompressed)
    }
}

/// The Snappy raw block codec.
#[derive(Copy, Clone, Debug, Default)]
pub struct Snappy;

impl Compression for Snappy {
    fn compress(&self, body: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(body)
            .map_err(|e| anyhow!("cannot compress Snappy body: {}", e))
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(body)
            .map_err(|e| anyhow!("cannot decompress Snappy body: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lz4_round_trip() {
        let body = b"SELECT * FROM system.local WHERE key = 'local' AND key = 'local'";
        let compressed = Lz4.compress(body).unwrap();
        assert_eq!(&compressed[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(Lz4.decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn lz4_empty_body_is_length_zero_plus_pad() {
        let compressed = Lz4.compress(&[]).unwrap();
        assert_eq!(compressed, [0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(Lz4.decompress(&compressed).unwrap(), Vec::<u8>::new());
        // the pad byte is optional on decode
        assert_eq!(Lz4.decompress(&[0, 0, 0, 0]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn lz4_length_mismatch_is_rejected() {
        let mut compressed = Lz4.compress(b"abcdef").unwrap();
        // tamper with the declared decompressed length
        compressed[3] = 0x03;
        assert!(Lz4.decompress(&compressed).is_err());
    }

    #[test]
    fn snappy_round_trip() {
        let body = b"system.peers_v2";
        let compressed = Snappy.compress(body).unwrap();
        assert_eq!(Snappy.decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn compression_type_names() {
        assert_eq!(CompressionType::Lz4.name(), "lz4");
        assert_eq!("snappy".parse::<CompressionType>().unwrap(), CompressionType::Snappy);
        assert!("gzip".parse::<CompressionType>().is_err());
    }
}
