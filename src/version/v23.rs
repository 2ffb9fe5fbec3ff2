// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The ID3v2.3 codec
//!
//! v2.3 keeps the 4-character frame identifiers but sizes its frames
//! with plain big-endian integers, assigns different frame flag bits,
//! and lays its extended header out as a fixed 6- or 10-byte block
//! whose CRC covers the frames but not the padding.

use super::{FlagMap, Registry, decode_flags, encode_flags, lookup_id, lookup_type};
use crate::Error;
use crate::frame::{Frame, FrameFlags, FrameHeader, FrameId, FrameType};
use crate::stream::{Scanner, Writer};
use crate::tag::{Tag, TagFlags, Version};
use crate::unsync::{add_unsync, encode_syncsafe, remove_unsync};

const HEADER_FLAGS: FlagMap = &[
    (1 << 7, TagFlags::UNSYNC.bits()),
    (1 << 6, TagFlags::EXTENDED.bits()),
    (1 << 5, TagFlags::EXPERIMENTAL.bits()),
];

const FRAME_FLAGS: FlagMap = &[
    (1 << 15, FrameFlags::DISCARD_ON_TAG_ALTER.bits()),
    (1 << 14, FrameFlags::DISCARD_ON_FILE_ALTER.bits()),
    (1 << 13, FrameFlags::READ_ONLY.bits()),
    (1 << 7, FrameFlags::COMPRESSED.bits()),
    (1 << 6, FrameFlags::ENCRYPTED.bits()),
    (1 << 5, FrameFlags::HAS_GROUP_ID.bits()),
];

const FRAME_IDS: Registry = &[
    (FrameType::AttachedPicture, "APIC"),
    (FrameType::AudioEncryption, "AENC"),
    (FrameType::Comment, "COMM"),
    (FrameType::EncryptionRegistration, "ENCR"),
    (FrameType::GroupIdRegistration, "GRID"),
    (FrameType::TextInvolvedPeople, "IPLS"),
    (FrameType::PlayCount, "PCNT"),
    (FrameType::Popularimeter, "POPM"),
    (FrameType::Private, "PRIV"),
    (FrameType::LyricsSync, "SYLT"),
    (FrameType::TempoCodes, "SYTC"),
    (FrameType::TextAlbumName, "TALB"),
    (FrameType::TextBpm, "TBPM"),
    (FrameType::TextCompilationItunes, "TCMP"),
    (FrameType::TextComposer, "TCOM"),
    (FrameType::TextGenre, "TCON"),
    (FrameType::TextCopyright, "TCOP"),
    (FrameType::TextDate, "TDAT"),
    (FrameType::TextPlaylistDelay, "TDLY"),
    (FrameType::TextEncodedBy, "TENC"),
    (FrameType::TextLyricist, "TEXT"),
    (FrameType::TextFileType, "TFLT"),
    (FrameType::TextTime, "TIME"),
    (FrameType::TextGroupDescription, "TIT1"),
    (FrameType::TextSongTitle, "TIT2"),
    (FrameType::TextSongSubtitle, "TIT3"),
    (FrameType::TextMusicalKey, "TKEY"),
    (FrameType::TextLanguage, "TLAN"),
    (FrameType::TextLengthMs, "TLEN"),
    (FrameType::TextMediaType, "TMED"),
    (FrameType::TextOriginalAlbum, "TOAL"),
    (FrameType::TextOriginalFileName, "TOFN"),
    (FrameType::TextOriginalLyricist, "TOLY"),
    (FrameType::TextOriginalPerformer, "TOPE"),
    (FrameType::TextOriginalReleaseYear, "TORY"),
    (FrameType::TextOwner, "TOWN"),
    (FrameType::TextArtist, "TPE1"),
    (FrameType::TextAlbumArtist, "TPE2"),
    (FrameType::TextConductor, "TPE3"),
    (FrameType::TextRemixer, "TPE4"),
    (FrameType::TextPartOfSet, "TPOS"),
    (FrameType::TextPublisher, "TPUB"),
    (FrameType::TextTrackNumber, "TRCK"),
    (FrameType::TextRecordingDates, "TRDA"),
    (FrameType::TextRadioStation, "TRSN"),
    (FrameType::TextRadioStationOwner, "TRSO"),
    (FrameType::TextSize, "TSIZ"),
    (FrameType::TextAlbumSortOrderItunes, "TSO2"),
    (FrameType::TextComposerSortOrderItunes, "TSOC"),
    (FrameType::TextIsrc, "TSRC"),
    (FrameType::TextEncodingSoftware, "TSSE"),
    (FrameType::TextCustom, "TXXX"),
    (FrameType::TextYear, "TYER"),
    (FrameType::UniqueFileId, "UFID"),
    (FrameType::TermsOfUse, "USER"),
    (FrameType::LyricsUnsync, "USLT"),
    (FrameType::UrlCommercial, "WCOM"),
    (FrameType::UrlCopyright, "WCOP"),
    (FrameType::UrlAudioFile, "WOAF"),
    (FrameType::UrlArtist, "WOAR"),
    (FrameType::UrlAudioSource, "WOAS"),
    (FrameType::UrlRadioStation, "WORS"),
    (FrameType::UrlPayment, "WPAY"),
    (FrameType::UrlPublisher, "WPUB"),
    (FrameType::UrlCustom, "WXXX"),
];

/// Decodes a v2.3 tag's payload
pub(crate) fn decode(t: &mut Tag, flags: u8, s: &mut Scanner) -> Result<(), Error> {
    t.flags = TagFlags::from_bits(decode_flags(HEADER_FLAGS, flags.into()));

    if t.flags.contains(TagFlags::UNSYNC) {
        let unstuffed = remove_unsync(s.consume_all());
        s.replace(unstuffed);
    }

    let declared_padding = match t.flags.contains(TagFlags::EXTENDED) {
        true => decode_extended_header(t, s).map_err(|e| match e {
            Error::IncompleteFrame => Error::InvalidHeader,
            e => e,
        })?,
        false => 0,
    };

    // unlike v2.4, the v2.3 CRC covers the frames but not the
    // padding, whose length the extended header declares
    if t.flags.contains(TagFlags::HAS_CRC) {
        let bytes = s.bytes();
        let frames_len = bytes
            .len()
            .checked_sub(declared_padding)
            .ok_or(Error::InvalidHeader)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&bytes[..frames_len]);
        if hasher.finalize() != t.crc {
            return Err(Error::FailedCrc);
        }
    }

    while s.remaining() > 0 {
        match decode_frame(s)? {
            Some(frame) => t.frames.push(frame),
            None => {
                t.padding = (s.remaining() + 4) as u32;
                s.consume_all();
                break;
            }
        }
    }

    Ok(())
}

fn decode_extended_header(t: &mut Tag, s: &mut Scanner) -> Result<usize, Error> {
    // the declared size excludes its own four bytes
    let ex_size = u32::from_be_bytes(s.consume_array()?);
    if ex_size != 6 && ex_size != 10 {
        return Err(Error::InvalidHeader);
    }

    let ex_flags = u16::from_be_bytes(s.consume_array()?);
    let padding = u32::from_be_bytes(s.consume_array()?) as usize;

    if ex_flags & (1 << 15) != 0 {
        if ex_size != 10 {
            return Err(Error::InvalidHeader);
        }
        t.flags.insert(TagFlags::HAS_CRC);
        t.crc = u32::from_be_bytes(s.consume_array()?);
    }

    Ok(padding)
}

fn decode_frame(s: &mut Scanner) -> Result<Option<Frame>, Error> {
    let id = s.consume_array::<4>()?;
    if id[0] == 0 {
        return Ok(None);
    }

    let size = u32::from_be_bytes(s.consume_array()?);
    if size == 0 {
        return Err(Error::InvalidFrameHeader);
    }

    let flag_bits = u16::from_be_bytes(s.consume_array()?);
    let flags = FrameFlags::from_bits(decode_flags(FRAME_FLAGS, flag_bits));
    let id = FrameId::from_wire(&id)?;

    let mut sub = s.consume_scanner(size as usize)?;

    let mut header = FrameHeader {
        frame_type: lookup_type(FRAME_IDS, id.as_bytes()),
        id,
        size,
        flags,
        ..FrameHeader::default()
    };

    // v2.3 extra header data runs decompressed-size, encryption,
    // grouping, in that order
    if flags.contains(FrameFlags::COMPRESSED) {
        header.data_length = Some(u32::from_be_bytes(sub.consume_array()?));
    }

    if flags.contains(FrameFlags::ENCRYPTED) {
        let method = sub.consume_byte()?;
        if !(0x80..=0xF0).contains(&method) {
            return Err(Error::InvalidEncryptMethod);
        }
        header.encrypt_method = Some(method);
    }

    if flags.contains(FrameFlags::HAS_GROUP_ID) {
        let group_id = sub.consume_byte()?;
        if !(0x80..=0xF0).contains(&group_id) {
            return Err(Error::InvalidGroupId);
        }
        header.group_id = Some(group_id);
    }

    let payload = super::decode_frame_payload(&mut sub, Version::V2_3, &header)?;
    Ok(Some(Frame { header, payload }))
}

/// Encodes a complete v2.3 tag
pub(crate) fn encode(t: &mut Tag, w: &mut Writer) -> Result<(), Error> {
    if t.flags.contains(TagFlags::HAS_CRC) {
        t.flags.insert(TagFlags::EXTENDED);
    }

    let flags = encode_flags(HEADER_FLAGS, t.flags.bits()) as u8;
    w.store_bytes(&[b'I', b'D', b'3', 3, 0, flags, 0, 0, 0, 0]);
    let size_offset = 6;

    // the extended header declares the padding length up front
    if t.padding > 0 && t.padding < 4 {
        t.padding = 4;
    }

    let mut crc_offset = None;
    if t.flags.contains(TagFlags::EXTENDED) {
        let has_crc = t.flags.contains(TagFlags::HAS_CRC);

        w.store_bytes(&(if has_crc { 10u32 } else { 6u32 }).to_be_bytes());
        w.store_bytes(&(if has_crc { 1u16 << 15 } else { 0 }).to_be_bytes());
        w.store_bytes(&t.padding.to_be_bytes());

        if has_crc {
            crc_offset = Some(w.len());
            w.store_zeros(4);
        }
    }

    let frames_offset = w.len();
    for frame in &t.frames {
        encode_frame(frame, w)?;
    }
    let frames_len = w.len() - frames_offset;

    if t.padding > 0 {
        w.store_zeros(t.padding as usize);
    }

    if let Some(crc_offset) = crc_offset {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&w.bytes_from(frames_offset)[..frames_len]);
        t.crc = hasher.finalize();
        w.slice_mut(crc_offset, 4).copy_from_slice(&t.crc.to_be_bytes());
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
    let flags = h.flags;

    let id = match lookup_id(FRAME_IDS, h.frame_type) {
        Some(id) => FrameId::from_wire(id.as_bytes())?,
        None if h.id.as_bytes().len() == 4 => h.id.clone(),
        None => return Err(Error::InvalidFrameHeader),
    };
    w.store_bytes(id.as_bytes());

    let size_offset = w.len();
    w.store_zeros(4);
    w.store_bytes(&encode_flags(FRAME_FLAGS, flags.bits()).to_be_bytes());

    let start_offset = w.len();

    let mut payload = super::encode_frame_payload(Version::V2_3, f)?;

    if flags.contains(FrameFlags::COMPRESSED) {
        if flags.contains(FrameFlags::ENCRYPTED) {
            let data_length = h.data_length.ok_or(Error::InvalidFrameFlags)?;
            w.store_bytes(&data_length.to_be_bytes());
        } else {
            w.store_bytes(&(payload.len() as u32).to_be_bytes());
            payload = super::deflate(&payload);
        }
    }

    if flags.contains(FrameFlags::ENCRYPTED) {
        let method = h.encrypt_method.ok_or(Error::InvalidEncryptMethod)?;
        if !(0x80..=0xF0).contains(&method) {
            return Err(Error::InvalidEncryptMethod);
        }
        w.store_byte(method);
    }

    if flags.contains(FrameFlags::HAS_GROUP_ID) {
        let group_id = h.group_id.ok_or(Error::InvalidGroupId)?;
        if !(0x80..=0xF0).contains(&group_id) {
            return Err(Error::InvalidGroupId);
        }
        w.store_byte(group_id);
    }

    w.store_bytes(&payload);

    let size = (w.len() - start_offset) as u32;
    w.slice_mut(size_offset, 4).copy_from_slice(&size.to_be_bytes());
    Ok(())
}
