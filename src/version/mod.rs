// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Version-specific tag codecs and the machinery they share
//!
//! Each version module maps the same internal flag sets and frame
//! types onto its own wire representation through static flag maps
//! and frame-identifier registries, so the differences between
//! versions stay in data rather than in control flow.

use crate::Error;
use crate::frame::{
    self, Frame, FrameFlags, FrameHeader, FramePayload, FrameType, PayloadKind, Unknown,
};
use crate::schema;
use crate::stream::{Scanner, Writer};
use crate::tag::Version;

pub(crate) mod v22;
pub(crate) mod v23;
pub(crate) mod v24;

/// Pairs of (wire bit, internal flag bit)
pub(crate) type FlagMap = &'static [(u16, u16)];

/// Maps wire flag bits to internal flags; unmapped wire bits
/// are ignored
pub(crate) fn decode_flags(map: FlagMap, wire: u16) -> u16 {
    map.iter()
        .filter(|(w, _)| wire & w != 0)
        .fold(0, |acc, (_, f)| acc | f)
}

/// Maps internal flags to wire flag bits; flags a version's map
/// does not carry are dropped
pub(crate) fn encode_flags(map: FlagMap, flags: u16) -> u16 {
    map.iter()
        .filter(|(_, f)| flags & f != 0)
        .fold(0, |acc, (w, _)| acc | w)
}

/// Pairs of (frame type, wire identifier) for one version
pub(crate) type Registry = &'static [(FrameType, &'static str)];

pub(crate) fn lookup_type(registry: Registry, id: &[u8]) -> FrameType {
    registry
        .iter()
        .find(|(_, s)| s.as_bytes() == id)
        .map(|(t, _)| *t)
        .unwrap_or(FrameType::Unknown)
}

pub(crate) fn lookup_id(registry: Registry, frame_type: FrameType) -> Option<&'static str> {
    registry
        .iter()
        .find(|(t, _)| *t == frame_type)
        .map(|(_, s)| *s)
}

/// Scans one carved frame region into a typed payload
///
/// Encrypted payloads cannot be interpreted and are carried as raw
/// bytes; compressed payloads are inflated first, checked against
/// the frame's data-length indicator.
pub(crate) fn decode_frame_payload(
    s: &mut Scanner,
    version: Version,
    header: &FrameHeader,
) -> Result<FramePayload, Error> {
    if header.flags.contains(FrameFlags::ENCRYPTED) {
        return Ok(FramePayload::Unknown(Unknown {
            data: s.consume_all().to_vec(),
        }));
    }

    if header.flags.contains(FrameFlags::COMPRESSED) {
        let inflated = inflate(s.consume_all(), header.data_length)?;
        s.replace(inflated);
    }

    if header.frame_type == FrameType::Unknown {
        log::warn!("unrecognised frame id \"{}\"", header.id);
    }

    let values = schema::scan_fields(s, version, schema::schema_for(header.frame_type, version))?;
    frame::payload_from_values(header.frame_type, values)
}

/// Emits one frame's payload into a fresh buffer, before compression
pub(crate) fn encode_frame_payload(version: Version, f: &Frame) -> Result<Vec<u8>, Error> {
    if f.header.flags.contains(FrameFlags::ENCRYPTED) {
        // encrypted payloads pass through as the raw bytes they
        // decoded to; this library cannot produce new ones
        return match &f.payload {
            FramePayload::Unknown(unknown) => Ok(unknown.data.clone()),
            _ => Err(Error::InvalidFrameFlags),
        };
    }

    if PayloadKind::of(f.header.frame_type) != f.payload.kind() {
        return Err(Error::InvalidFrameHeader);
    }

    let mut w = Writer::new();
    schema::emit_fields(
        &mut w,
        version,
        schema::schema_for(f.header.frame_type, version),
        &frame::payload_values(&f.payload),
    )?;
    Ok(w.into_vec())
}

pub(crate) fn inflate(data: &[u8], expected: Option<u32>) -> Result<Vec<u8>, Error> {
    let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(data)
        .map_err(|_| Error::InvalidCompressedData)?;

    match expected {
        Some(len) if len as usize != inflated.len() => Err(Error::InvalidCompressedData),
        _ => Ok(inflated),
    }
}

pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_maps() {
        const MAP: FlagMap = &[(1 << 15, 1 << 0), (1 << 7, 1 << 4)];

        assert_eq!(decode_flags(MAP, 0x8080), 0x11);
        assert_eq!(encode_flags(MAP, 0x11), 0x8080);

        // unmapped bits vanish in both directions
        assert_eq!(decode_flags(MAP, 0xFFFF), 0x11);
        assert_eq!(encode_flags(MAP, 0xFF11), 0x8080);
    }

    #[test]
    fn test_compression_roundtrip() {
        let data = b"a payload worth squeezing, squeezing, squeezing";
        let squeezed = deflate(data);
        assert_eq!(inflate(&squeezed, Some(data.len() as u32)).unwrap(), data);

        // a wrong data-length indicator is an error
        assert!(matches!(
            inflate(&squeezed, Some(3)),
            Err(Error::InvalidCompressedData)
        ));
        assert!(matches!(
            inflate(b"not zlib at all", None),
            Err(Error::InvalidCompressedData)
        ));
    }
}
