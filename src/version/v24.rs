// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The ID3v2.4 codec, the reference revision
//!
//! v2.4 is the most capable layout: sync-safe frame sizes, per-frame
//! unsynchronization, data-length indicators, and an extended header
//! carrying update, CRC and restriction blocks.

use super::{FlagMap, Registry, decode_flags, encode_flags, lookup_id, lookup_type};
use crate::Error;
use crate::frame::{Frame, FrameFlags, FrameHeader, FrameId, FrameType};
use crate::stream::{Scanner, Writer};
use crate::tag::{Tag, TagFlags, Version};
use crate::unsync::{add_unsync, decode_syncsafe, encode_syncsafe, remove_unsync};

const HEADER_FLAGS: FlagMap = &[
    (1 << 7, TagFlags::UNSYNC.bits()),
    (1 << 6, TagFlags::EXTENDED.bits()),
    (1 << 5, TagFlags::EXPERIMENTAL.bits()),
    (1 << 4, TagFlags::FOOTER.bits()),
];

const EXTENDED_FLAGS: FlagMap = &[
    (1 << 6, TagFlags::IS_UPDATE.bits()),
    (1 << 5, TagFlags::HAS_CRC.bits()),
    (1 << 4, TagFlags::HAS_RESTRICTIONS.bits()),
];

const FRAME_FLAGS: FlagMap = &[
    (1 << 14, FrameFlags::DISCARD_ON_TAG_ALTER.bits()),
    (1 << 13, FrameFlags::DISCARD_ON_FILE_ALTER.bits()),
    (1 << 12, FrameFlags::READ_ONLY.bits()),
    (1 << 6, FrameFlags::HAS_GROUP_ID.bits()),
    (1 << 3, FrameFlags::COMPRESSED.bits()),
    (1 << 2, FrameFlags::ENCRYPTED.bits()),
    (1 << 1, FrameFlags::UNSYNCHRONIZED.bits()),
    (1 << 0, FrameFlags::HAS_DATA_LENGTH.bits()),
];

const FRAME_IDS: Registry = &[
    (FrameType::AttachedPicture, "APIC"),
    (FrameType::AudioEncryption, "AENC"),
    (FrameType::AudioSeekPointIndex, "ASPI"),
    (FrameType::Comment, "COMM"),
    (FrameType::EncryptionRegistration, "ENCR"),
    (FrameType::GroupIdRegistration, "GRID"),
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
    (FrameType::TextEncodingTime, "TDEN"),
    (FrameType::TextPlaylistDelay, "TDLY"),
    (FrameType::TextOriginalReleaseTime, "TDOR"),
    (FrameType::TextRecordingTime, "TDRC"),
    (FrameType::TextReleaseTime, "TDRL"),
    (FrameType::TextTaggingTime, "TDTG"),
    (FrameType::TextEncodedBy, "TENC"),
    (FrameType::TextLyricist, "TEXT"),
    (FrameType::TextFileType, "TFLT"),
    (FrameType::TextInvolvedPeople, "TIPL"),
    (FrameType::TextGroupDescription, "TIT1"),
    (FrameType::TextSongTitle, "TIT2"),
    (FrameType::TextSongSubtitle, "TIT3"),
    (FrameType::TextMusicalKey, "TKEY"),
    (FrameType::TextLanguage, "TLAN"),
    (FrameType::TextLengthMs, "TLEN"),
    (FrameType::TextMusicians, "TMCL"),
    (FrameType::TextMediaType, "TMED"),
    (FrameType::TextMood, "TMOO"),
    (FrameType::TextOriginalAlbum, "TOAL"),
    (FrameType::TextOriginalFileName, "TOFN"),
    (FrameType::TextOriginalLyricist, "TOLY"),
    (FrameType::TextOriginalPerformer, "TOPE"),
    (FrameType::TextOwner, "TOWN"),
    (FrameType::TextArtist, "TPE1"),
    (FrameType::TextAlbumArtist, "TPE2"),
    (FrameType::TextConductor, "TPE3"),
    (FrameType::TextRemixer, "TPE4"),
    (FrameType::TextPartOfSet, "TPOS"),
    (FrameType::TextProducedNotice, "TPRO"),
    (FrameType::TextPublisher, "TPUB"),
    (FrameType::TextTrackNumber, "TRCK"),
    (FrameType::TextRadioStation, "TRSN"),
    (FrameType::TextRadioStationOwner, "TRSO"),
    (FrameType::TextAlbumSortOrderItunes, "TSO2"),
    (FrameType::TextAlbumSortOrder, "TSOA"),
    (FrameType::TextComposerSortOrderItunes, "TSOC"),
    (FrameType::TextPerformerSortOrder, "TSOP"),
    (FrameType::TextTitleSortOrder, "TSOT"),
    (FrameType::TextIsrc, "TSRC"),
    (FrameType::TextEncodingSoftware, "TSSE"),
    (FrameType::TextSetSubtitle, "TSST"),
    (FrameType::TextCustom, "TXXX"),
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

/// Decodes a v2.4 tag's payload: extended header, frames, padding
pub(crate) fn decode(t: &mut Tag, flags: u8, s: &mut Scanner) -> Result<(), Error> {
    t.flags = TagFlags::from_bits(decode_flags(HEADER_FLAGS, flags.into()));

    // remove whole-tag unsynchronization before anything is parsed
    if t.flags.contains(TagFlags::UNSYNC) {
        let unstuffed = remove_unsync(s.consume_all());
        s.replace(unstuffed);
    }

    if t.flags.contains(TagFlags::EXTENDED) {
        decode_extended_header(t, s).map_err(|e| match e {
            Error::IncompleteFrame => Error::InvalidHeader,
            e => e,
        })?;
    }

    // the CRC covers the de-unsynchronized frames and padding
    if t.flags.contains(TagFlags::HAS_CRC) {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(s.bytes());
        if hasher.finalize() != t.crc {
            return Err(Error::FailedCrc);
        }
    }

    while s.remaining() > 0 {
        match decode_frame(t, s)? {
            Some(frame) => t.frames.push(frame),
            None => {
                // a zeroed leading id byte means the rest is padding
                t.padding = (s.remaining() + 4) as u32;
                s.consume_all();
                break;
            }
        }
    }

    Ok(())
}

fn decode_extended_header(t: &mut Tag, s: &mut Scanner) -> Result<(), Error> {
    let ex_size = decode_syncsafe(&s.consume_array::<4>()?)? as usize;

    // exactly one extended flag byte is defined
    if s.consume_byte()? != 1 {
        return Err(Error::InvalidHeader);
    }
    let ex_flags = s.consume_byte()?;
    t.flags
        .insert(TagFlags::from_bits(decode_flags(EXTENDED_FLAGS, ex_flags.into())));

    let mut consumed = 6;

    if t.flags.contains(TagFlags::IS_UPDATE) {
        // the update block is an empty data segment
        if s.consume_byte()? != 0 {
            return Err(Error::InvalidHeader);
        }
        consumed += 1;
    }

    if t.flags.contains(TagFlags::HAS_CRC) {
        // 5 sync-safe bytes hold the 32-bit CRC
        if s.consume_byte()? != 5 {
            return Err(Error::InvalidHeader);
        }
        t.crc = decode_syncsafe(s.consume_bytes(5)?).map_err(|_| Error::InvalidHeader)?;
        consumed += 6;
    }

    if t.flags.contains(TagFlags::HAS_RESTRICTIONS) {
        if s.consume_byte()? != 1 {
            return Err(Error::InvalidHeader);
        }
        t.restrictions = s.consume_byte()?;
        consumed += 2;
    }

    if consumed < ex_size {
        log::warn!(
            "skipping {} unrecognised extended header bytes",
            ex_size - consumed
        );
        s.skip(ex_size - consumed)?;
    }

    Ok(())
}

fn decode_frame(t: &Tag, s: &mut Scanner) -> Result<Option<Frame>, Error> {
    let id = s.consume_array::<4>()?;
    if id[0] == 0 {
        return Ok(None);
    }

    let size = decode_syncsafe(&s.consume_array::<4>()?)?;
    if size == 0 {
        return Err(Error::InvalidFrameHeader);
    }

    let flag_bits = u16::from_be_bytes(s.consume_array()?);
    let flags = FrameFlags::from_bits(decode_flags(FRAME_FLAGS, flag_bits));
    let id = FrameId::from_wire(&id)?;

    // carve off exactly this frame's payload
    let mut sub = s.consume_scanner(size as usize)?;

    if flags.contains(FrameFlags::UNSYNCHRONIZED) && !t.flags.contains(TagFlags::UNSYNC) {
        let unstuffed = remove_unsync(sub.consume_all());
        sub.replace(unstuffed);
    }

    let mut header = FrameHeader {
        frame_type: lookup_type(FRAME_IDS, id.as_bytes()),
        id,
        size,
        flags,
        ..FrameHeader::default()
    };

    if !flags.is_empty() {
        if flags.contains(FrameFlags::COMPRESSED) && !flags.contains(FrameFlags::HAS_DATA_LENGTH) {
            return Err(Error::InvalidFrameFlags);
        }

        if flags.contains(FrameFlags::HAS_GROUP_ID) {
            let group_id = sub.consume_byte()?;
            if !(0x80..=0xF0).contains(&group_id) {
                return Err(Error::InvalidGroupId);
            }
            header.group_id = Some(group_id);
        }

        if flags.contains(FrameFlags::ENCRYPTED) {
            let method = sub.consume_byte()?;
            if !(0x80..=0xF0).contains(&method) {
                return Err(Error::InvalidEncryptMethod);
            }
            header.encrypt_method = Some(method);
        }

        if flags.contains(FrameFlags::HAS_DATA_LENGTH) {
            header.data_length = Some(decode_syncsafe(&sub.consume_array::<4>()?)?);
        }
    }

    let payload = super::decode_frame_payload(&mut sub, Version::V2_4, &header)?;
    Ok(Some(Frame { header, payload }))
}

/// Encodes a complete v2.4 tag, back-patching every size field
/// once the region it covers has been staged
pub(crate) fn encode(t: &mut Tag, w: &mut Writer) -> Result<(), Error> {
    // any extended block implies the extended header itself
    if t.flags.contains(TagFlags::HAS_CRC)
        || t.flags.contains(TagFlags::HAS_RESTRICTIONS)
        || t.flags.contains(TagFlags::IS_UPDATE)
    {
        t.flags.insert(TagFlags::EXTENDED);
    }

    let flags = encode_flags(HEADER_FLAGS, t.flags.bits()) as u8;
    w.store_bytes(&[b'I', b'D', b'3', 4, 0, flags, 0, 0, 0, 0]);
    let size_offset = 6;

    let mut crc_offset = None;
    if t.flags.contains(TagFlags::EXTENDED) {
        let ex_flags = encode_flags(EXTENDED_FLAGS, t.flags.bits()) as u8;
        let ex_offset = w.len();
        w.store_bytes(&[0, 0, 0, 0, 1, ex_flags]);

        if t.flags.contains(TagFlags::IS_UPDATE) {
            w.store_byte(0);
        }

        if t.flags.contains(TagFlags::HAS_CRC) {
            crc_offset = Some(w.len() + 1);
            w.store_bytes(&[5, 0, 0, 0, 0, 0]);
        }

        if t.flags.contains(TagFlags::HAS_RESTRICTIONS) {
            w.store_bytes(&[1, t.restrictions]);
        }

        let ex_size = (w.len() - ex_offset) as u32;
        encode_syncsafe(ex_size, w.slice_mut(ex_offset, 4))?;
    }

    let frames_offset = w.len();
    for frame in &t.frames {
        encode_frame(t.flags, frame, w)?;
    }

    if t.padding > 0 {
        if t.padding < 4 {
            t.padding = 4;
        }
        w.store_zeros(t.padding as usize);
    }

    // CRC covers frames and padding, before unsynchronization
    if let Some(crc_offset) = crc_offset {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(w.bytes_from(frames_offset));
        t.crc = hasher.finalize();
        encode_syncsafe(t.crc, w.slice_mut(crc_offset, 5))?;
    }

    if t.flags.contains(TagFlags::UNSYNC) {
        let tail = w.split_off(10);
        w.store_bytes(&add_unsync(&tail));
    }

    t.size = (w.len() - 10) as u32;
    encode_syncsafe(t.size, w.slice_mut(size_offset, 4))
}

fn encode_frame(tag_flags: TagFlags, f: &Frame, w: &mut Writer) -> Result<(), Error> {
    let h = &f.header;

    let mut flags = h.flags;
    if flags.contains(FrameFlags::COMPRESSED) {
        flags.insert(FrameFlags::HAS_DATA_LENGTH);
    }

    // known types take their wire id from the registry, so a frame
    // decoded from an older tag re-encodes under its v2.4 id
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
    let mut data_length_offset = None;

    if !flags.is_empty() {
        if flags.contains(FrameFlags::HAS_GROUP_ID) {
            let group_id = h.group_id.ok_or(Error::InvalidGroupId)?;
            if !(0x80..=0xF0).contains(&group_id) {
                return Err(Error::InvalidGroupId);
            }
            w.store_byte(group_id);
        }

        if flags.contains(FrameFlags::ENCRYPTED) {
            let method = h.encrypt_method.ok_or(Error::InvalidEncryptMethod)?;
            if !(0x80..=0xF0).contains(&method) {
                return Err(Error::InvalidEncryptMethod);
            }
            w.store_byte(method);
        }

        if flags.contains(FrameFlags::HAS_DATA_LENGTH) {
            data_length_offset = Some(w.len());
            w.store_zeros(4);
        }
    }

    let mut payload = super::encode_frame_payload(Version::V2_4, f)?;

    // the data-length indicator records the payload's size before
    // compression and unsynchronization
    let data_length = match flags.contains(FrameFlags::ENCRYPTED) {
        true => h.data_length.unwrap_or(payload.len() as u32),
        false => payload.len() as u32,
    };
    if flags.contains(FrameFlags::COMPRESSED) && !flags.contains(FrameFlags::ENCRYPTED) {
        payload = super::deflate(&payload);
    }
    w.store_bytes(&payload);

    if let Some(offset) = data_length_offset {
        encode_syncsafe(data_length, w.slice_mut(offset, 4))?;
    }

    if flags.contains(FrameFlags::UNSYNCHRONIZED) && !tag_flags.contains(TagFlags::UNSYNC) {
        let tail = w.split_off(start_offset);
        w.store_bytes(&add_unsync(&tail));
    }

    let size = (w.len() - start_offset) as u32;
    encode_syncsafe(size, w.slice_mut(size_offset, 4))
}
