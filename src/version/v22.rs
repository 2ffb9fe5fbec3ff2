// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The ID3v2.2 codec
//!
//! The original layout: 3-character frame identifiers, 6-byte frame
//! headers with 24-bit big-endian sizes, no frame flags and no
//! extended header. Its header flag byte defines only
//! unsynchronization and a compression bit for which no scheme was
//! ever published, so compressed v2.2 tags are undecodable.

use super::{FlagMap, Registry, decode_flags, encode_flags, lookup_id, lookup_type};
use crate::Error;
use crate::frame::{Frame, FrameHeader, FrameId, FrameType};
use crate::stream::{Scanner, Writer};
use crate::tag::{Tag, TagFlags, Version};
use crate::unsync::{add_unsync, encode_syncsafe, remove_unsync};

const HEADER_FLAGS: FlagMap = &[(1 << 7, TagFlags::UNSYNC.bits())];

const COMPRESSION_BIT: u8 = 1 << 6;

const FRAME_IDS: Registry = &[
    (FrameType::PlayCount, "CNT"),
    (FrameType::Comment, "COM"),
    (FrameType::AudioEncryption, "CRA"),
    (FrameType::TextInvolvedPeople, "IPL"),
    (FrameType::AttachedPicture, "PIC"),
    (FrameType::Popularimeter, "POP"),
    (FrameType::LyricsSync, "SLT"),
    (FrameType::TempoCodes, "STC"),
    (FrameType::TextAlbumName, "TAL"),
    (FrameType::TextBpm, "TBP"),
    (FrameType::TextComposer, "TCM"),
    (FrameType::TextGenre, "TCO"),
    (FrameType::TextCompilationItunes, "TCP"),
    (FrameType::TextCopyright, "TCR"),
    (FrameType::TextDate, "TDA"),
    (FrameType::TextPlaylistDelay, "TDY"),
    (FrameType::TextEncodedBy, "TEN"),
    (FrameType::TextFileType, "TFT"),
    (FrameType::TextTime, "TIM"),
    (FrameType::TextMusicalKey, "TKE"),
    (FrameType::TextLanguage, "TLA"),
    (FrameType::TextLengthMs, "TLE"),
    (FrameType::TextMediaType, "TMT"),
    (FrameType::TextOriginalPerformer, "TOA"),
    (FrameType::TextOriginalFileName, "TOF"),
    (FrameType::TextOriginalLyricist, "TOL"),
    (FrameType::TextOriginalReleaseYear, "TOR"),
    (FrameType::TextOriginalAlbum, "TOT"),
    (FrameType::TextArtist, "TP1"),
    (FrameType::TextAlbumArtist, "TP2"),
    (FrameType::TextConductor, "TP3"),
    (FrameType::TextRemixer, "TP4"),
    (FrameType::TextPartOfSet, "TPA"),
    (FrameType::TextPublisher, "TPB"),
    (FrameType::TextIsrc, "TRC"),
    (FrameType::TextRecordingDates, "TRD"),
    (FrameType::TextTrackNumber, "TRK"),
    (FrameType::TextSize, "TSI"),
    (FrameType::TextEncodingSoftware, "TSS"),
    (FrameType::TextGroupDescription, "TT1"),
    (FrameType::TextSongTitle, "TT2"),
    (FrameType::TextSongSubtitle, "TT3"),
    (FrameType::TextLyricist, "TXT"),
    (FrameType::TextCustom, "TXX"),
    (FrameType::TextYear, "TYE"),
    (FrameType::UniqueFileId, "UFI"),
    (FrameType::LyricsUnsync, "ULT"),
    (FrameType::UrlAudioFile, "WAF"),
    (FrameType::UrlArtist, "WAR"),
    (FrameType::UrlAudioSource, "WAS"),
    (FrameType::UrlCommercial, "WCM"),
    (FrameType::UrlCopyright, "WCP"),
    (FrameType::UrlPublisher, "WPB"),
    (FrameType::UrlCustom, "WXX"),
];

/// Decodes a v2.2 tag's payload
pub(crate) fn decode(t: &mut Tag, flags: u8, s: &mut Scanner) -> Result<(), Error> {
    if flags & COMPRESSION_BIT != 0 {
        return Err(Error::InvalidHeader);
    }

    t.flags = TagFlags::from_bits(decode_flags(HEADER_FLAGS, flags.into()));

    if t.flags.contains(TagFlags::UNSYNC) {
        let unstuffed = remove_unsync(s.consume_all());
        s.replace(unstuffed);
    }

    while s.remaining() > 0 {
        match decode_frame(s)? {
            Some(frame) => t.frames.push(frame),
            None => {
                t.padding = (s.remaining() + 3) as u32;
                s.consume_all();
                break;
            }
        }
    }

    Ok(())
}

fn decode_frame(s: &mut Scanner) -> Result<Option<Frame>, Error> {
    let id = s.consume_array::<3>()?;
    if id[0] == 0 {
        return Ok(None);
    }

    let size_bytes = s.consume_array::<3>()?;
    let size = u32::from_be_bytes([0, size_bytes[0], size_bytes[1], size_bytes[2]]);
    if size == 0 {
        return Err(Error::InvalidFrameHeader);
    }

    let id = FrameId::from_wire(&id)?;
    let mut sub = s.consume_scanner(size as usize)?;

    let header = FrameHeader {
        frame_type: lookup_type(FRAME_IDS, id.as_bytes()),
        id,
        size,
        ..FrameHeader::default()
    };

    let payload = super::decode_frame_payload(&mut sub, Version::V2_2, &header)?;
    Ok(Some(Frame { header, payload }))
}

/// Encodes a complete v2.2 tag
pub(crate) fn encode(t: &mut Tag, w: &mut Writer) -> Result<(), Error> {
    let flags = encode_flags(HEADER_FLAGS, t.flags.bits()) as u8;
    w.store_bytes(&[b'I', b'D', b'3', 2, 0, flags, 0, 0, 0, 0]);
    let size_offset = 6;

    for frame in &t.frames {
        encode_frame(frame, w)?;
    }

    if t.padding > 0 {
        if t.padding < 4 {
            t.padding = 4;
        }
        w.store_zeros(t.padding as usize);
    }

    if t.flags.contains(TagFlags::UNSYNC) {
        let tail = w.split_off(10);
        w.store_bytes(&add_unsync(&tail));
    }

    t.size = (w.len() - 10) as u32;
    encode_syncsafe(t.size, w.slice_mut(size_offset, 4))
}

fn encode_frame(f: &Frame, w: &mut Writer) -> Result<(), Error> {
    let h = &f.header;

    let id = match lookup_id(FRAME_IDS, h.frame_type) {
        Some(id) => FrameId::from_wire(id.as_bytes())?,
        None if h.id.as_bytes().len() == 3 => h.id.clone(),
        None => return Err(Error::InvalidFrameHeader),
    };

    let payload = super::encode_frame_payload(Version::V2_2, f)?;
    if payload.len() >= 1 << 24 {
        return Err(Error::InvalidFrameHeader);
    }

    w.store_bytes(id.as_bytes());
    w.store_bytes(&(payload.len() as u32).to_be_bytes()[1..]);
    w.store_bytes(&payload);
    Ok(())
}
