// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use id3_codec::Error;
use id3_codec::frame::{
    Frame, FrameFlags, FramePayload, FrameType, SyncedText, TempoSync, Text,
};
use id3_codec::tag::{Tag, TagFlags, Version, peek};
use id3_codec::text::Encoding;

fn encode(tag: &mut Tag) -> Vec<u8> {
    let mut output = Vec::new();
    tag.write_to(&mut output).unwrap();
    output
}

fn decode(bytes: &[u8]) -> Tag {
    let mut tag = Tag::default();
    let read = tag
        .read_from(&mut std::io::Cursor::new(bytes))
        .unwrap();
    assert_eq!(read, bytes.len() as u64);
    tag
}

fn roundtrip(tag: &mut Tag) -> Tag {
    decode(&encode(tag))
}

#[test]
fn test_empty_tag() {
    let data = [0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    let mut tag = decode(&data);
    assert_eq!(tag.version, Version::V2_4);
    assert!(tag.flags.is_empty());
    assert_eq!(tag.size, 0);
    assert!(tag.frames.is_empty());

    assert_eq!(encode(&mut tag), data);
}

#[test]
fn test_single_text_frame() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::text(FrameType::TextSongTitle, "Hello"));

    let encoded = encode(&mut tag);
    assert_eq!(
        encoded,
        [
            0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
            b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x06, 0x00, 0x00,
            0x03, 0x48, 0x65, 0x6C, 0x6C, 0x6F,
        ]
    );

    let decoded = decode(&encoded);
    assert_eq!(decoded.frames.len(), 1);
    assert_eq!(decoded.frames[0].header.frame_type, FrameType::TextSongTitle);
    assert_eq!(decoded.frames[0].header.id.as_str(), "TIT2");
    assert_eq!(decoded.frames[0].header.size, 6);
    assert!(matches!(
        &decoded.frames[0].payload,
        FramePayload::Text(Text { encoding: Encoding::Utf8, text }) if text == &["Hello"]
    ));
}

#[test]
fn test_padding() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::text(FrameType::TextAlbumName, "Album"));
    tag.padding = 100;

    let encoded = encode(&mut tag);
    assert!(encoded.ends_with(&[0; 100]));

    let mut decoded = decode(&encoded);
    assert_eq!(decoded.padding, 100);

    // re-encoding with the same padding is byte-identical
    assert_eq!(encode(&mut decoded), encoded);
}

#[test]
fn test_small_padding_promoted() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::play_count(3));
    tag.padding = 2;

    let decoded = roundtrip(&mut tag);
    assert_eq!(tag.padding, 4);
    assert_eq!(decoded.padding, 4);
}

#[test]
fn test_unsync_wire_form() {
    let mut tag = Tag::default();
    tag.flags.insert(TagFlags::UNSYNC);
    tag.frames.push(Frame::private("test", vec![0xFF, 0xE0]));

    let encoded = encode(&mut tag);

    // the payload's FF E0 pair must be stuffed on the wire
    assert!(encoded.windows(3).any(|w| w == [0xFF, 0x00, 0xE0]));

    // and no false sync pattern may survive after the header
    assert!(
        !encoded[10..]
            .windows(2)
            .any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0)
    );

    let decoded = decode(&encoded);
    assert!(decoded.flags.contains(TagFlags::UNSYNC));
    assert!(matches!(
        &decoded.frames[0].payload,
        FramePayload::Private(p) if p.data == [0xFF, 0xE0]
    ));
}

#[test]
fn test_frame_level_unsync() {
    let mut tag = Tag::default();
    let mut frame = Frame::private("test", vec![0xFF, 0xFF, 0xE5]);
    frame.header.flags.insert(FrameFlags::UNSYNCHRONIZED);
    tag.frames.push(frame);

    let encoded = encode(&mut tag);
    assert!(
        !encoded[20..]
            .windows(2)
            .any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0)
    );

    let decoded = decode(&encoded);
    assert!(matches!(
        &decoded.frames[0].payload,
        FramePayload::Private(p) if p.data == [0xFF, 0xFF, 0xE5]
    ));
}

#[test]
fn test_crc() {
    let mut tag = Tag::default();
    tag.flags.insert(TagFlags::HAS_CRC);
    tag.frames.push(Frame::text(FrameType::TextArtist, "Someone"));
    tag.padding = 16;

    let mut encoded = encode(&mut tag);

    // the CRC block implies the extended header
    assert!(tag.flags.contains(TagFlags::EXTENDED));
    assert_eq!(encoded[5], 0x40);

    let decoded = decode(&encoded);
    assert_eq!(decoded.crc, tag.crc);
    assert_eq!(decoded.frames.len(), 1);

    // flipping a payload byte must break validation
    let last = encoded.len() - 20;
    encoded[last] ^= 0x01;
    let mut corrupt = Tag::default();
    assert!(matches!(
        corrupt.read_from(&mut std::io::Cursor::new(&encoded)),
        Err(Error::FailedCrc)
    ));
}

#[test]
fn test_restrictions_and_update() {
    let mut tag = Tag::default();
    tag.flags.insert(TagFlags::HAS_RESTRICTIONS | TagFlags::IS_UPDATE);
    tag.restrictions = 0xB4;
    tag.frames.push(Frame::text(FrameType::TextSongTitle, "restricted"));

    let decoded = roundtrip(&mut tag);
    assert!(decoded.flags.contains(TagFlags::EXTENDED));
    assert!(decoded.flags.contains(TagFlags::IS_UPDATE));
    assert!(decoded.flags.contains(TagFlags::HAS_RESTRICTIONS));
    assert_eq!(decoded.restrictions, 0xB4);
    assert_eq!(decoded.frames[0].payload, tag.frames[0].payload);
}

#[test]
fn test_crc_with_unsync() {
    let mut tag = Tag::default();
    tag.flags.insert(TagFlags::HAS_CRC | TagFlags::UNSYNC);
    tag.frames.push(Frame::private("sync", vec![0xFF, 0xE0, 0xFF]));

    let decoded = roundtrip(&mut tag);
    assert_eq!(decoded.frames[0].payload, tag.frames[0].payload);
}

#[test]
fn test_synced_lyrics() {
    let sync = vec![
        SyncedText {
            text: "one".to_owned(),
            timestamp: 1000,
        },
        SyncedText {
            text: "two".to_owned(),
            timestamp: 2000,
        },
        SyncedText {
            text: "three".to_owned(),
            timestamp: 3000,
        },
    ];

    let mut tag = Tag::default();
    tag.frames.push(Frame::lyrics_sync("eng", "verse", sync.clone()));

    let encoded = encode(&mut tag);

    // timestamps are plain big-endian u32s on the wire
    assert!(encoded.windows(4).any(|w| w == 1000u32.to_be_bytes()));
    assert!(encoded.windows(4).any(|w| w == 3000u32.to_be_bytes()));

    let decoded = decode(&encoded);
    assert!(matches!(
        &decoded.frames[0].payload,
        FramePayload::LyricsSync(l)
            if l.sync == sync && l.language == "eng" && l.descriptor == "verse"
    ));
}

#[test]
fn test_frame_order_preserved() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::text(FrameType::TextTrackNumber, "7"));
    tag.frames.push(Frame::comment("eng", "", "a comment"));
    tag.frames.push(Frame::text(FrameType::TextSongTitle, "Title"));
    tag.frames.push(Frame::unique_file_id("db", vec![1, 2, 3]));
    tag.frames.push(Frame::text(FrameType::TextAlbumName, "Album"));

    let decoded = roundtrip(&mut tag);
    assert_eq!(
        decoded
            .frames
            .iter()
            .map(|f| f.header.frame_type)
            .collect::<Vec<_>>(),
        [
            FrameType::TextTrackNumber,
            FrameType::Comment,
            FrameType::TextSongTitle,
            FrameType::UniqueFileId,
            FrameType::TextAlbumName,
        ]
    );
}

#[test]
fn test_payload_variety_roundtrip() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::text_custom("mood", "sleepy"));
    tag.frames.push(Frame::url(FrameType::UrlArtist, "http://example.com/artist"));
    tag.frames.push(Frame::url_custom("homepage", "http://example.com"));
    tag.frames.push(Frame::lyrics_unsync("eng", "", "la la la"));
    tag.frames.push(Frame::terms_of_use("eng", "do not redistribute"));
    tag.frames.push(Frame::attached_picture("image/png", 3, "cover", vec![0x89, 0x50, 0x4E, 0x47]));
    tag.frames.push(Frame::play_count(0x1_0000_0001));
    tag.frames.push(Frame::popularimeter("me@example.com", 196, 42));
    tag.frames.push(Frame::group_id("owner", 0x85, vec![9]));
    tag.frames.push(Frame::encryption_registration("owner", 0xF0, vec![]));
    tag.frames.push(Frame::audio_encryption("owner", 0, 1024, vec![7, 7]));
    tag.frames.push(Frame::tempo_codes(vec![
        TempoSync { tempo: 120, timestamp: 0 },
        TempoSync { tempo: 300, timestamp: 60_000 },
    ]));

    let decoded = roundtrip(&mut tag);
    assert_eq!(decoded.frames.len(), tag.frames.len());
    for (decoded, original) in decoded.frames.iter().zip(&tag.frames) {
        assert_eq!(decoded.payload, original.payload);
        assert_eq!(decoded.header.frame_type, original.header.frame_type);
    }
}

#[test]
fn test_multi_string_text() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::new(
        FrameType::TextGenre,
        FramePayload::Text(Text {
            encoding: Encoding::Utf8,
            text: vec!["Rock".to_owned(), "Blues".to_owned()],
        }),
    ));

    // v2.4 keeps the strings separate
    let decoded = roundtrip(&mut tag);
    assert!(matches!(
        &decoded.frames[0].payload,
        FramePayload::Text(t) if t.text == ["Rock", "Blues"]
    ));

    // v2.3 collapses them into one
    tag.version = Version::V2_3;
    let decoded = roundtrip(&mut tag);
    assert!(matches!(
        &decoded.frames[0].payload,
        FramePayload::Text(t) if t.text == ["Rock/Blues"]
    ));
}

#[test]
fn test_utf16_strings() {
    let mut tag = Tag::default();
    let mut frame = Frame::comment("eng", "désc", "héllo wörld");
    match &mut frame.payload {
        FramePayload::Comment(c) => c.encoding = Encoding::Utf16,
        _ => unreachable!(),
    }
    tag.frames.push(frame);

    let decoded = roundtrip(&mut tag);
    assert_eq!(decoded.frames[0].payload, tag.frames[0].payload);
}

#[test]
fn test_compressed_frame() {
    let mut tag = Tag::default();
    let mut frame = Frame::lyrics_unsync("eng", "", &"text ".repeat(100));
    frame.header.flags.insert(FrameFlags::COMPRESSED);
    tag.frames.push(frame);

    let encoded = encode(&mut tag);

    let decoded = decode(&encoded);
    let header = &decoded.frames[0].header;
    assert!(header.flags.contains(FrameFlags::COMPRESSED));
    assert!(header.flags.contains(FrameFlags::HAS_DATA_LENGTH));
    assert!(header.data_length.is_some());
    assert_eq!(decoded.frames[0].payload, tag.frames[0].payload);
}

#[test]
fn test_grouped_frame() {
    let mut tag = Tag::default();
    let mut frame = Frame::text(FrameType::TextPublisher, "label");
    frame.header.flags.insert(FrameFlags::HAS_GROUP_ID);
    frame.header.group_id = Some(0x90);
    tag.frames.push(frame);

    let decoded = roundtrip(&mut tag);
    assert_eq!(decoded.frames[0].header.group_id, Some(0x90));
    assert_eq!(decoded.frames[0].payload, tag.frames[0].payload);
}

#[test]
fn test_invalid_group_id() {
    let mut tag = Tag::default();
    let mut frame = Frame::text(FrameType::TextPublisher, "label");
    frame.header.flags.insert(FrameFlags::HAS_GROUP_ID);
    frame.header.group_id = Some(0x10);
    tag.frames.push(frame);

    let mut sink = Vec::new();
    assert!(matches!(
        tag.write_to(&mut sink),
        Err(Error::InvalidGroupId)
    ));
}

#[test]
fn test_unknown_frame_preserved() {
    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0E,
        b'X', b'Y', b'Z', b'W', 0x00, 0x00, 0x00, 0x04, 0x00, 0x00,
        0xDE, 0xAD, 0xBE, 0xEF,
    ];

    let mut tag = decode(&data);
    assert_eq!(tag.frames[0].header.frame_type, FrameType::Unknown);
    assert_eq!(tag.frames[0].header.id.as_str(), "XYZW");
    assert!(matches!(
        &tag.frames[0].payload,
        FramePayload::Unknown(u) if u.data == [0xDE, 0xAD, 0xBE, 0xEF]
    ));

    assert_eq!(encode(&mut tag), data);
}

#[test]
fn test_seek_point_index_frame() {
    // ASPI has no structured payload here, but it is a registered
    // type, not an unrecognised vendor id
    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0E,
        b'A', b'S', b'P', b'I', 0x00, 0x00, 0x00, 0x04, 0x00, 0x00,
        0x00, 0x00, 0x10, 0x00,
    ];

    let mut tag = decode(&data);
    assert_eq!(
        tag.frames[0].header.frame_type,
        FrameType::AudioSeekPointIndex
    );
    assert!(matches!(
        &tag.frames[0].payload,
        FramePayload::Unknown(u) if u.data == [0x00, 0x00, 0x10, 0x00]
    ));

    assert_eq!(encode(&mut tag), data);
}

#[test]
fn test_decode_errors() {
    // a truncated header is not a tag
    let mut tag = Tag::default();
    assert!(matches!(
        tag.read_from(&mut std::io::Cursor::new(b"ID3\x04")),
        Err(Error::InvalidTag)
    ));

    // an undefined text encoding marker
    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C,
        b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x02, 0x00, 0x00,
        0x04, 0x41,
    ];
    assert!(matches!(
        tag.read_from(&mut std::io::Cursor::new(&data)),
        Err(Error::InvalidEncoding)
    ));

    // a zero-length frame
    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A,
        b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    assert!(matches!(
        tag.read_from(&mut std::io::Cursor::new(&data)),
        Err(Error::InvalidFrameHeader)
    ));

    // a frame size pointing past the end of the tag
    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C,
        b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x7F, 0x00, 0x00,
        0x03, 0x41,
    ];
    assert!(matches!(
        tag.read_from(&mut std::io::Cursor::new(&data)),
        Err(Error::IncompleteFrame)
    ));

    // an out-of-range picture type
    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x12,
        b'A', b'P', b'I', b'C', 0x00, 0x00, 0x00, 0x08, 0x00, 0x00,
        0x00, b'p', b'n', b'g', 0x00, 0x15, 0x00, 0xAA,
    ];
    assert!(matches!(
        tag.read_from(&mut std::io::Cursor::new(&data)),
        Err(Error::InvalidPictureType)
    ));
}

#[test]
fn test_failed_decode_leaves_tag_untouched() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::text(FrameType::TextSongTitle, "kept"));

    let data = [
        0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C,
        b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x02, 0x00, 0x00,
        0x04, 0x41,
    ];
    assert!(tag.read_from(&mut std::io::Cursor::new(&data)).is_err());

    // the failed read must not have clobbered the existing frames
    assert_eq!(tag.frames.len(), 1);
}

#[test]
fn test_v22_tag() {
    let data = [
        0x49, 0x44, 0x33, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09,
        b'T', b'T', b'2', 0x00, 0x00, 0x03, 0x00, b'H', b'i',
    ];

    let mut tag = decode(&data);
    assert_eq!(tag.version, Version::V2_2);
    assert_eq!(tag.frames[0].header.id.as_str(), "TT2");
    assert_eq!(tag.frames[0].header.frame_type, FrameType::TextSongTitle);
    assert!(matches!(
        &tag.frames[0].payload,
        FramePayload::Text(t) if t.encoding == Encoding::Iso8859_1 && t.text == ["Hi"]
    ));

    assert_eq!(encode(&mut tag), data);
}

#[test]
fn test_v22_picture_format() {
    // the v2.2 PIC frame's image format is a fixed 3-byte field
    let data = [
        0x49, 0x44, 0x33, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0E,
        b'P', b'I', b'C', 0x00, 0x00, 0x08,
        0x00, b'P', b'N', b'G', 0x03, 0x00, 0xAB, 0xCD,
    ];

    let mut tag = decode(&data);
    assert!(matches!(
        &tag.frames[0].payload,
        FramePayload::AttachedPicture(p)
            if p.mime_type == "PNG" && p.picture_type == 3 && p.data == [0xAB, 0xCD]
    ));

    assert_eq!(encode(&mut tag), data);
}

#[test]
fn test_v22_compression_rejected() {
    let data = [0x49, 0x44, 0x33, 0x02, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00];

    let mut tag = Tag::default();
    assert!(matches!(
        tag.read_from(&mut std::io::Cursor::new(&data)),
        Err(Error::InvalidHeader)
    ));
}

#[test]
fn test_v23_tag() {
    let mut tag = Tag::new(Version::V2_3);
    tag.frames.push(Frame::text(FrameType::TextYear, "1999"));
    tag.frames.push(Frame::comment("eng", "", "ok"));

    let encoded = encode(&mut tag);
    assert_eq!(encoded[3], 3);

    // v2.3 frame sizes are plain big-endian
    assert_eq!(&encoded[10..14], b"TYER");
    assert_eq!(&encoded[14..18], &5u32.to_be_bytes());

    let decoded = decode(&encoded);
    assert_eq!(decoded.version, Version::V2_3);
    assert_eq!(decoded.frames[0].header.frame_type, FrameType::TextYear);
    assert_eq!(decoded.frames[1].payload, tag.frames[1].payload);
}

#[test]
fn test_v23_extended_header_crc() {
    let mut tag = Tag::new(Version::V2_3);
    tag.flags.insert(TagFlags::HAS_CRC);
    tag.frames.push(Frame::text(FrameType::TextSongTitle, "checked"));
    tag.padding = 8;

    let mut encoded = encode(&mut tag);

    // size 10, CRC bit, declared padding, then the CRC itself
    assert_eq!(&encoded[10..14], &10u32.to_be_bytes());
    assert_eq!(&encoded[14..16], &0x8000u16.to_be_bytes());
    assert_eq!(&encoded[16..20], &8u32.to_be_bytes());
    assert_eq!(&encoded[20..24], &tag.crc.to_be_bytes());

    let decoded = decode(&encoded);
    assert_eq!(decoded.crc, tag.crc);
    assert_eq!(decoded.padding, 8);
    assert_eq!(decoded.frames[0].payload, tag.frames[0].payload);

    // flip a frame byte under the CRC
    encoded[30] ^= 0x01;
    let mut corrupt = Tag::default();
    assert!(matches!(
        corrupt.read_from(&mut std::io::Cursor::new(&encoded)),
        Err(Error::FailedCrc)
    ));
}

#[test]
fn test_cross_version_id_mapping() {
    // a frame decoded from a v2.2 tag re-encodes under its
    // version-appropriate 4-character id
    let data = [
        0x49, 0x44, 0x33, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09,
        b'T', b'T', b'2', 0x00, 0x00, 0x03, 0x00, b'H', b'i',
    ];

    let mut tag = decode(&data);
    tag.version = Version::V2_4;
    let encoded = encode(&mut tag);
    assert_eq!(&encoded[10..14], b"TIT2");
}

#[test]
fn test_v24_only_frame_rejected_in_v23() {
    let mut tag = Tag::new(Version::V2_3);
    tag.frames.push(Frame::text(FrameType::TextMood, "calm"));

    let mut sink = Vec::new();
    assert!(matches!(
        tag.write_to(&mut sink),
        Err(Error::InvalidFrameHeader)
    ));
}

#[test]
fn test_peek_sizes_a_read() {
    let mut tag = Tag::default();
    tag.frames.push(Frame::text(FrameType::TextSongTitle, "Peek"));
    let encoded = encode(&mut tag);

    let (version, size) = peek(&encoded[..10]).unwrap();
    assert_eq!(version, Version::V2_4);
    assert_eq!(size as usize + 10, encoded.len());
}
