// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements the notation types the protocol composes every
//! message from: `[short]`, `[int]`, `[long]`, `[string]`, `[long string]`,
//! `[bytes]`, `[short bytes]`, the string/bytes collections, `[uuid]`,
//! `[inetaddr]`, `[inet]`, the failure reason map and the variable-length
//! integers used by the `duration` type.
//!
//! Readers consume from a shared payload slice and advance a cursor, writers
//! append to a `Vec<u8>` sink, and each variable-sized notation has a paired
//! `*_len` function reporting exactly how many bytes its writer will emit.

use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use std::{
    collections::HashMap,
    net::{
        IpAddr,
        Ipv4Addr,
        Ipv6Addr,
        SocketAddr,
    },
};
use uuid::Uuid;

fn take<'a>(start: &mut usize, payload: &'a [u8], count: usize, what: &'static str) -> Result<&'a [u8]> {
    ensure!(
        payload.len() >= *start + count,
        "cannot read {}: unexpected end of buffer ({} bytes missing)",
        what,
        *start + count - payload.len()
    );
    let slice = &payload[*start..][..count];
    *start += count;
    Ok(slice)
}

/// Read a single byte.
pub fn read_byte(start: &mut usize, payload: &[u8]) -> Result<u8> {
    Ok(take(start, payload, 1, "[byte]")?[0])
}

/// Write a single byte.
pub fn write_byte(byte: u8, payload: &mut Vec<u8>) {
    payload.push(byte);
}

/// Read a `[short]`, an unsigned 16-bit big-endian integer.
pub fn read_short(start: &mut usize, payload: &[u8]) -> Result<u16> {
    let slice = take(start, payload, 2, "[short]")?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

/// Write a `[short]`.
pub fn write_short(short: u16, payload: &mut Vec<u8>) {
    payload.extend(short.to_be_bytes());
}

/// Read an `[int]`, a signed 32-bit big-endian integer.
pub fn read_int(start: &mut usize, payload: &[u8]) -> Result<i32> {
    let slice = take(start, payload, 4, "[int]")?;
    Ok(i32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Write an `[int]`.
pub fn write_int(int: i32, payload: &mut Vec<u8>) {
    payload.extend(int.to_be_bytes());
}

/// Read a `[long]`, a signed 64-bit big-endian integer.
pub fn read_long(start: &mut usize, payload: &[u8]) -> Result<i64> {
    let slice = take(start, payload, 8, "[long]")?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(slice);
    Ok(i64::from_be_bytes(bytes))
}

/// Write a `[long]`.
pub fn write_long(long: i64, payload: &mut Vec<u8>) {
    payload.extend(long.to_be_bytes());
}

/// Read a `[string]`: a `[short]` byte length followed by UTF-8 content.
pub fn read_string(start: &mut usize, payload: &[u8]) -> Result<String> {
    let len = read_short(start, payload).context("cannot read [string] length")? as usize;
    let slice = take(start, payload, len, "[string] content")?;
    Ok(String::from_utf8(slice.to_vec()).context("cannot decode [string] as UTF-8")?)
}

/// Write a `[string]`; fails if the UTF-8 length does not fit a `[short]`.
pub fn write_string(string: &str, payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        string.len() <= u16::MAX as usize,
        "[string] length {} overflows the [short] prefix",
        string.len()
    );
    write_short(string.len() as u16, payload);
    payload.extend(string.as_bytes());
    Ok(())
}

/// The encoded length of a `[string]`.
pub fn string_len(string: &str) -> usize {
    2 + string.len()
}

/// Read a `[long string]`: an `[int]` byte length followed by UTF-8 content.
pub fn read_long_string(start: &mut usize, payload: &[u8]) -> Result<String> {
    let len = read_int(start, payload).context("cannot read [long string] length")?;
    ensure!(len >= 0, "invalid negative [long string] length: {}", len);
    let slice = take(start, payload, len as usize, "[long string] content")?;
    Ok(String::from_utf8(slice.to_vec()).context("cannot decode [long string] as UTF-8")?)
}

/// Write a `[long string]`.
pub fn write_long_string(string: &str, payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        string.len() <= i32::MAX as usize,
        "[long string] length {} overflows the [int] prefix",
        string.len()
    );
    write_int(string.len() as i32, payload);
    payload.extend(string.as_bytes());
    Ok(())
}

/// The encoded length of a `[long string]`.
pub fn long_string_len(string: &str) -> usize {
    4 + string.len()
}

/// Read a `[string list]`: a `[short]` count followed by that many `[string]`.
pub fn read_string_list(start: &mut usize, payload: &[u8]) -> Result<Vec<String>> {
    let count = read_short(start, payload).context("cannot read [string list] length")? as usize;
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push(read_string(start, payload)?);
    }
    Ok(list)
}

/// Write a `[string list]`.
pub fn write_string_list(list: &[String], payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        list.len() <= u16::MAX as usize,
        "[string list] count {} overflows the [short] prefix",
        list.len()
    );
    write_short(list.len() as u16, payload);
    for string in list {
        write_string(string, payload)?;
    }
    Ok(())
}

/// The encoded length of a `[string list]`.
pub fn string_list_len(list: &[String]) -> usize {
    2 + list.iter().map(|s| string_len(s)).sum::<usize>()
}

/// Read a `[string map]`: a `[short]` count followed by that many key/value
/// `[string]` pairs.
pub fn read_string_map(start: &mut usize, payload: &[u8]) -> Result<HashMap<String, String>> {
    let count = read_short(start, payload).context("cannot read [string map] length")? as usize;
    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let key = read_string(start, payload).context("cannot read [string map] key")?;
        let value = read_string(start, payload).context("cannot read [string map] value")?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Write a `[string map]`. Iteration order is unspecified.
pub fn write_string_map(map: &HashMap<String, String>, payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        map.len() <= u16::MAX as usize,
        "[string map] count {} overflows the [short] prefix",
        map.len()
    );
    write_short(map.len() as u16, payload);
    for (key, value) in map {
        write_string(key, payload)?;
        write_string(value, payload)?;
    }
    Ok(())
}

/// The encoded length of a `[string map]`.
pub fn string_map_len(map: &HashMap<String, String>) -> usize {
    2 + map.iter().map(|(k, v)| string_len(k) + string_len(v)).sum::<usize>()
}

/// Read a `[string multimap]`: a `[short]` count followed by that many
/// (`[string]`, `[string list]`) pairs.
pub fn read_string_multimap(start: &mut usize, payload: &[u8]) -> Result<HashMap<String, Vec<String>>> {
    let count = read_short(start, payload).context("cannot read [string multimap] length")? as usize;
    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let key = read_string(start, payload).context("cannot read [string multimap] key")?;
        let values = read_string_list(start, payload).context("cannot read [string multimap] values")?;
        map.insert(key, values);
    }
    Ok(map)
}

/// Write a `[string multimap]`. Iteration order is unspecified.
pub fn write_string_multimap(map: &HashMap<String, Vec<String>>, payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        map.len() <= u16::MAX as usize,
        "[string multimap] count {} overflows the [short] prefix",
        map.len()
    );
    write_short(map.len() as u16, payload);
    for (key, values) in map {
        write_string(key, payload)?;
        write_string_list(values, payload)?;
    }
    Ok(())
}

/// The encoded length of a `[string multimap]`.
pub fn string_multimap_len(map: &HashMap<String, Vec<String>>) -> usize {
    2 + map.iter().map(|(k, v)| string_len(k) + string_list_len(v)).sum::<usize>()
}

/// Read a `[bytes]` value: an `[int]` length followed by content, where a
/// negative length encodes a null value.
pub fn read_bytes(start: &mut usize, payload: &[u8]) -> Result<Option<Vec<u8>>> {
    let len = read_int(start, payload).context("cannot read [bytes] length")?;
    if len < 0 {
        return Ok(None);
    }
    let slice = take(start, payload, len as usize, "[bytes] content")?;
    Ok(Some(slice.to_vec()))
}

/// Write a `[bytes]` value; `None` encodes as length -1.
pub fn write_bytes(bytes: Option<&[u8]>, payload: &mut Vec<u8>) -> Result<()> {
    match bytes {
        Some(bytes) => {
            ensure!(
                bytes.len() <= i32::MAX as usize,
                "[bytes] length {} overflows the [int] prefix",
                bytes.len()
            );
            write_int(bytes.len() as i32, payload);
            payload.extend(bytes);
        }
        None => write_int(-1, payload),
    }
    Ok(())
}

/// The encoded length of a `[bytes]` value.
pub fn bytes_len(bytes: Option<&[u8]>) -> usize {
    4 + bytes.map(<[u8]>::len).unwrap_or(0)
}

/// Read a `[short bytes]` value: a `[short]` length followed by content.
pub fn read_short_bytes(start: &mut usize, payload: &[u8]) -> Result<Vec<u8>> {
    let len = read_short(start, payload).context("cannot read [short bytes] length")? as usize;
    Ok(take(start, payload, len, "[short bytes] content")?.to_vec())
}

/// Write a `[short bytes]` value.
pub fn write_short_bytes(bytes: &[u8], payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        bytes.len() <= u16::MAX as usize,
        "[short bytes] length {} overflows the [short] prefix",
        bytes.len()
    );
    write_short(bytes.len() as u16, payload);
    payload.extend(bytes);
    Ok(())
}

/// The encoded length of a `[short bytes]` value.
pub fn short_bytes_len(bytes: &[u8]) -> usize {
    2 + bytes.len()
}

/// Read a `[bytes map]`: a `[short]` count followed by that many
/// (`[string]`, `[bytes]`) pairs. Null values decode as empty.
pub fn read_bytes_map(start: &mut usize, payload: &[u8]) -> Result<HashMap<String, Vec<u8>>> {
    let count = read_short(start, payload).context("cannot read [bytes map] length")? as usize;
    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let key = read_string(start, payload).context("cannot read [bytes map] key")?;
        let value = read_bytes(start, payload)
            .context("cannot read [bytes map] value")?
            .unwrap_or_default();
        map.insert(key, value);
    }
    Ok(map)
}

/// Write a `[bytes map]`. Iteration order is unspecified.
pub fn write_bytes_map(map: &HashMap<String, Vec<u8>>, payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        map.len() <= u16::MAX as usize,
        "[bytes map] count {} overflows the [short] prefix",
        map.len()
    );
    write_short(map.len() as u16, payload);
    for (key, value) in map {
        write_string(key, payload)?;
        write_bytes(Some(value.as_slice()), payload)?;
    }
    Ok(())
}

/// The encoded length of a `[bytes map]`.
pub fn bytes_map_len(map: &HashMap<String, Vec<u8>>) -> usize {
    2 + map
        .iter()
        .map(|(k, v)| string_len(k) + bytes_len(Some(v.as_slice())))
        .sum::<usize>()
}

/// The encoded length of a `[uuid]`.
pub const UUID_LEN: usize = 16;

/// Read a `[uuid]`: 16 raw bytes.
pub fn read_uuid(start: &mut usize, payload: &[u8]) -> Result<Uuid> {
    let slice = take(start, payload, UUID_LEN, "[uuid]")?;
    let mut bytes = [0u8; UUID_LEN];
    bytes.copy_from_slice(slice);
    Ok(Uuid::from_bytes(bytes))
}

/// Write a `[uuid]`.
pub fn write_uuid(uuid: &Uuid, payload: &mut Vec<u8>) {
    payload.extend(uuid.as_bytes());
}

/// Read an `[inetaddr]`: a one-byte length (4 or 16) followed by the raw
/// IPv4 or IPv6 octets.
pub fn read_inetaddr(start: &mut usize, payload: &[u8]) -> Result<IpAddr> {
    let len = read_byte(start, payload).context("cannot read [inetaddr] length")?;
    match len {
        4 => {
            let slice = take(start, payload, 4, "[inetaddr] IPv4 content")?;
            let mut octets = [0u8; 4];
            octets.copy_from_slice(slice);
            Ok(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let slice = take(start, payload, 16, "[inetaddr] IPv6 content")?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(slice);
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        n => bail!("invalid [inetaddr] length: {} (expected 4 or 16)", n),
    }
}

/// Write an `[inetaddr]`.
pub fn write_inetaddr(addr: &IpAddr, payload: &mut Vec<u8>) {
    match addr {
        IpAddr::V4(v4) => {
            payload.push(4);
            payload.extend(v4.octets());
        }
        IpAddr::V6(v6) => {
            payload.push(16);
            payload.extend(v6.octets());
        }
    }
}

/// The encoded length of an `[inetaddr]`.
pub fn inetaddr_len(addr: &IpAddr) -> usize {
    match addr {
        IpAddr::V4(_) => 1 + 4,
        IpAddr::V6(_) => 1 + 16,
    }
}

/// Read an `[inet]`: an `[inetaddr]` followed by an `[int]` port.
pub fn read_inet(start: &mut usize, payload: &[u8]) -> Result<SocketAddr> {
    let addr = read_inetaddr(start, payload)?;
    let port = read_int(start, payload).context("cannot read [inet] port")?;
    ensure!((0..=u16::MAX as i32).contains(&port), "invalid [inet] port: {}", port);
    Ok(SocketAddr::new(addr, port as u16))
}

/// Write an `[inet]`.
pub fn write_inet(inet: &SocketAddr, payload: &mut Vec<u8>) {
    write_inetaddr(&inet.ip(), payload);
    write_int(inet.port() as i32, payload);
}

/// The encoded length of an `[inet]`.
pub fn inet_len(inet: &SocketAddr) -> usize {
    inetaddr_len(&inet.ip()) + 4
}

/// Read a failure reason map (v5+): an `[int]` count followed by that many
/// (`[inetaddr]`, `[short]` failure code) entries, in wire order.
pub fn read_reason_map(start: &mut usize, payload: &[u8]) -> Result<Vec<(IpAddr, u16)>> {
    let count = read_int(start, payload).context("cannot read [reasonmap] length")?;
    ensure!(count >= 0, "invalid negative [reasonmap] length: {}", count);
    let mut reasons = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let addr = read_inetaddr(start, payload).context("cannot read [reasonmap] node")?;
        let code = read_short(start, payload).context("cannot read [reasonmap] failure code")?;
        reasons.push((addr, code));
    }
    Ok(reasons)
}

/// Write a failure reason map, preserving entry order.
pub fn write_reason_map(reasons: &[(IpAddr, u16)], payload: &mut Vec<u8>) -> Result<()> {
    ensure!(
        reasons.len() <= i32::MAX as usize,
        "[reasonmap] count {} overflows the [int] prefix",
        reasons.len()
    );
    write_int(reasons.len() as i32, payload);
    for (addr, code) in reasons {
        write_inetaddr(addr, payload);
        write_short(*code, payload);
    }
    Ok(())
}

/// The encoded length of a failure reason map.
pub fn reason_map_len(reasons: &[(IpAddr, u16)]) -> usize {
    4 + reasons.iter().map(|(addr, _)| inetaddr_len(addr) + 2).sum::<usize>()
}

/// The total encoded size of an `[unsigned vint]`, between 1 and 9 bytes.
pub fn unsigned_vint_len(value: u64) -> usize {
    let magnitude = (value | 1).leading_zeros() as i32;
    (9 - (magnitude - 1) / 7) as usize
}

/// Write an `[unsigned vint]`: the count of leading 1-bits in the first byte
/// encodes how many additional bytes follow, the remaining bits hold the
/// most significant part of the value.
pub fn write_unsigned_vint(value: u64, payload: &mut Vec<u8>) {
    let extra = unsigned_vint_len(value) - 1;
    if extra == 8 {
        payload.push(0xFF);
        payload.extend(value.to_be_bytes());
        return;
    }
    let flags = !(0xFFu8.checked_shr(extra as u32).unwrap_or(0));
    payload.push(flags | (value >> (8 * extra)) as u8);
    for i in (0..extra).rev() {
        payload.push((value >> (8 * i)) as u8);
    }
}

/// Read an `[unsigned vint]`.
pub fn read_unsigned_vint(start: &mut usize, payload: &[u8]) -> Result<u64> {
    let first = read_byte(start, payload).context("cannot read [unsigned vint]")?;
    let extra = first.leading_ones() as usize;
    let mut value = (first & 0xFFu8.checked_shr(extra as u32).unwrap_or(0)) as u64;
    for _ in 0..extra {
        let byte = read_byte(start, payload).context("cannot read [unsigned vint] continuation")?;
        value = (value << 8) | byte as u64;
    }
    Ok(value)
}

/// The total encoded size of a signed `[vint]`.
pub fn vint_len(value: i64) -> usize {
    unsigned_vint_len(zigzag(value))
}

/// Write a signed `[vint]` using zig-zag encoding.
pub fn write_vint(value: i64, payload: &mut Vec<u8>) {
    write_unsigned_vint(zigzag(value), payload);
}

/// Read a signed `[vint]`.
pub fn read_vint(start: &mut usize, payload: &[u8]) -> Result<i64> {
    let zigzagged = read_unsigned_vint(start, payload).context("cannot read [vint]")?;
    Ok(((zigzagged >> 1) as i64) ^ -((zigzagged & 1) as i64))
}

fn zigzag(value: i64) -> u64 {
    ((value >> 63) ^ (value << 1)) as u64
}
