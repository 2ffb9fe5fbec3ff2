// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Declarative frame payload layouts
//!
//! Every payload shape is described by a static, ordered list of
//! [`FieldKind`]s. One scanner walks the list to pull typed field
//! values out of a frame region, and one emitter walks it to write
//! them back, so bounds checks, terminator rules and the
//! encoding-dependency between fields live in exactly one place
//! for every frame kind.

use crate::frame::{FrameType, PayloadKind};
use crate::stream::{Scanner, Writer};
use crate::tag::Version;
use crate::text::{self, Encoding};
use crate::Error;

/// How a string field selects its encoding and length
#[derive(Copy, Clone, Debug)]
pub(crate) enum StringKind {
    /// The frame's current encoding, null-terminated unless final
    Scoped,
    /// Forced ISO-8859-1, null-terminated unless final
    Latin1,
    /// Fixed-length ISO-8859-1 with no terminator, such as a
    /// 3-byte language tag
    Fixed(usize),
}

/// The bounds class of a one-byte field
#[derive(Copy, Clone, Debug)]
pub(crate) enum ByteKind {
    Plain,
    PictureType,
    TimestampFormat,
    LyricContentType,
    GroupSymbol,
}

/// Enforces the static bounds table over one-byte fields
fn check_bounds(kind: ByteKind, value: u8) -> Result<(), Error> {
    let (min, max, err) = match kind {
        ByteKind::Plain => return Ok(()),
        ByteKind::PictureType => (0, 20, Error::InvalidPictureType),
        ByteKind::TimestampFormat => (1, 2, Error::InvalidTimeStampFormat),
        ByteKind::LyricContentType => (0, 8, Error::InvalidLyricContentType),
        ByteKind::GroupSymbol => (0x80, 0xF0, Error::InvalidGroupId),
    };

    (min..=max).contains(&value).then_some(()).ok_or(err)
}

/// One field in a payload layout
#[derive(Copy, Clone, Debug)]
pub(crate) enum FieldKind {
    /// An encoding marker byte; sets the encoding used by
    /// subsequent `Scoped` strings in the same frame
    Encoding,
    /// One byte, optionally range-checked
    Byte(ByteKind),
    /// Big-endian u16; the tempo form is one byte, plus a second
    /// added to the first when it reads 0xFF
    U16 { tempo: bool },
    /// Big-endian u32
    U32,
    /// Big-endian u64; the counter form spans all remaining frame
    /// bytes at any width, and emits the minimal width of at least 4
    U64 { counter: bool },
    /// An encoded string
    String(StringKind),
    /// The remaining frame bytes as encoded strings; multiple
    /// strings in v2.4, a single string in earlier versions
    StringList,
    /// The remaining frame bytes, uninterpreted
    Bytes,
    /// The remaining frame bytes as repetitions of an inner layout
    StructList(&'static [FieldKind]),
}

/// One scanned field value
#[derive(Clone, Debug)]
pub(crate) enum Value {
    Byte(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    String(String),
    StringList(Vec<String>),
    Bytes(Vec<u8>),
    Structs(Vec<Vec<Value>>),
}

const TEXT: &[FieldKind] = &[FieldKind::Encoding, FieldKind::StringList];

const TEXT_CUSTOM: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Scoped),
    FieldKind::String(StringKind::Scoped),
];

const URL: &[FieldKind] = &[FieldKind::String(StringKind::Latin1)];

const URL_CUSTOM: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Scoped),
    FieldKind::String(StringKind::Latin1),
];

const COMMENT: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Fixed(3)),
    FieldKind::String(StringKind::Scoped),
    FieldKind::String(StringKind::Scoped),
];

const LYRICS_SYNC: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Fixed(3)),
    FieldKind::Byte(ByteKind::TimestampFormat),
    FieldKind::Byte(ByteKind::LyricContentType),
    FieldKind::String(StringKind::Scoped),
    FieldKind::StructList(SYNCED_TEXT),
];

const SYNCED_TEXT: &[FieldKind] = &[FieldKind::String(StringKind::Scoped), FieldKind::U32];

const TEMPO_CODES: &[FieldKind] = &[
    FieldKind::Byte(ByteKind::TimestampFormat),
    FieldKind::StructList(TEMPO_SYNC),
];

const TEMPO_SYNC: &[FieldKind] = &[FieldKind::U16 { tempo: true }, FieldKind::U32];

const TERMS_OF_USE: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Fixed(3)),
    FieldKind::String(StringKind::Scoped),
];

const ATTACHED_PICTURE: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Latin1),
    FieldKind::Byte(ByteKind::PictureType),
    FieldKind::String(StringKind::Scoped),
    FieldKind::Bytes,
];

// the v2.2 PIC frame stores a fixed 3-character image format
// where later versions store a MIME type
const ATTACHED_PICTURE_V22: &[FieldKind] = &[
    FieldKind::Encoding,
    FieldKind::String(StringKind::Fixed(3)),
    FieldKind::Byte(ByteKind::PictureType),
    FieldKind::String(StringKind::Scoped),
    FieldKind::Bytes,
];

const UNIQUE_FILE_ID: &[FieldKind] = &[FieldKind::String(StringKind::Latin1), FieldKind::Bytes];

const PRIVATE: &[FieldKind] = &[FieldKind::String(StringKind::Latin1), FieldKind::Bytes];

const PLAY_COUNT: &[FieldKind] = &[FieldKind::U64 { counter: true }];

const POPULARIMETER: &[FieldKind] = &[
    FieldKind::String(StringKind::Latin1),
    FieldKind::Byte(ByteKind::Plain),
    FieldKind::U64 { counter: true },
];

const GROUP_ID: &[FieldKind] = &[
    FieldKind::String(StringKind::Latin1),
    FieldKind::Byte(ByteKind::GroupSymbol),
    FieldKind::Bytes,
];

const AUDIO_ENCRYPTION: &[FieldKind] = &[
    FieldKind::String(StringKind::Latin1),
    FieldKind::U16 { tempo: false },
    FieldKind::U16 { tempo: false },
    FieldKind::Bytes,
];

const UNKNOWN: &[FieldKind] = &[FieldKind::Bytes];

/// Looks up the payload layout for a frame type under a tag version
pub(crate) fn schema_for(frame_type: FrameType, version: Version) -> &'static [FieldKind] {
    match PayloadKind::of(frame_type) {
        PayloadKind::Text => TEXT,
        PayloadKind::TextCustom => TEXT_CUSTOM,
        PayloadKind::Url => URL,
        PayloadKind::UrlCustom => URL_CUSTOM,
        PayloadKind::Comment | PayloadKind::LyricsUnsync => COMMENT,
        PayloadKind::LyricsSync => LYRICS_SYNC,
        PayloadKind::TempoCodes => TEMPO_CODES,
        PayloadKind::TermsOfUse => TERMS_OF_USE,
        PayloadKind::AttachedPicture if version == Version::V2_2 => ATTACHED_PICTURE_V22,
        PayloadKind::AttachedPicture => ATTACHED_PICTURE,
        PayloadKind::UniqueFileId => UNIQUE_FILE_ID,
        PayloadKind::Private => PRIVATE,
        PayloadKind::PlayCount => PLAY_COUNT,
        PayloadKind::Popularimeter => POPULARIMETER,
        PayloadKind::GroupId | PayloadKind::EncryptionRegistration => GROUP_ID,
        PayloadKind::AudioEncryption => AUDIO_ENCRYPTION,
        PayloadKind::Unknown => UNKNOWN,
    }
}

/// Scans one frame region into field values, driven by its layout
pub(crate) fn scan_fields(
    s: &mut Scanner,
    version: Version,
    schema: &'static [FieldKind],
) -> Result<Vec<Value>, Error> {
    let mut encoding = Encoding::Iso8859_1;
    scan_with_state(s, version, schema, &mut encoding)
}

fn scan_with_state(
    s: &mut Scanner,
    version: Version,
    schema: &'static [FieldKind],
    encoding: &mut Encoding,
) -> Result<Vec<Value>, Error> {
    schema
        .iter()
        .map(|field| {
            Ok(match field {
                FieldKind::Encoding => {
                    let marker = s.consume_byte()?;
                    *encoding = Encoding::try_from(marker)?;
                    Value::Byte(marker)
                }
                FieldKind::Byte(kind) => {
                    let b = s.consume_byte()?;
                    check_bounds(*kind, b)?;
                    Value::Byte(b)
                }
                FieldKind::U16 { tempo: true } => {
                    let mut value = u16::from(s.consume_byte()?);
                    if value == 0xFF {
                        value += u16::from(s.consume_byte()?);
                    }
                    Value::U16(value)
                }
                FieldKind::U16 { tempo: false } => {
                    Value::U16(u16::from_be_bytes(s.consume_array()?))
                }
                FieldKind::U32 => Value::U32(u32::from_be_bytes(s.consume_array()?)),
                FieldKind::U64 { counter: true } => {
                    if s.remaining() < 4 {
                        return Err(Error::IncompleteFrame);
                    }
                    Value::U64(
                        s.consume_all()
                            .iter()
                            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
                    )
                }
                FieldKind::U64 { counter: false } => {
                    Value::U64(u64::from_be_bytes(s.consume_array()?))
                }
                FieldKind::String(StringKind::Scoped) => Value::String(s.consume_string(*encoding)?),
                FieldKind::String(StringKind::Latin1) => {
                    Value::String(s.consume_string(Encoding::Iso8859_1)?)
                }
                FieldKind::String(StringKind::Fixed(n)) => {
                    Value::String(s.consume_fixed_string(*n)?)
                }
                FieldKind::StringList => {
                    Value::StringList(s.consume_string_list(*encoding, version == Version::V2_4)?)
                }
                FieldKind::Bytes => Value::Bytes(s.consume_all().to_vec()),
                FieldKind::StructList(inner) => {
                    let mut structs = Vec::new();
                    while s.remaining() > 0 {
                        structs.push(scan_with_state(s, version, *inner, encoding)?);
                    }
                    Value::Structs(structs)
                }
            })
        })
        .collect()
}

/// Emits field values back into a staged frame region,
/// driven by the same layout that scanned them
pub(crate) fn emit_fields(
    w: &mut Writer,
    version: Version,
    schema: &'static [FieldKind],
    values: &[Value],
) -> Result<(), Error> {
    let mut encoding = Encoding::Iso8859_1;
    emit_with_state(w, version, schema, values, &mut encoding, true)
}

fn emit_with_state(
    w: &mut Writer,
    version: Version,
    schema: &'static [FieldKind],
    values: &[Value],
    encoding: &mut Encoding,
    top_level: bool,
) -> Result<(), Error> {
    if schema.len() != values.len() {
        return Err(Error::InvalidFrameHeader);
    }

    for (i, (field, value)) in schema.iter().zip(values).enumerate() {
        // a to-end string at the end of the frame needs no terminator
        let is_tail = top_level && i == schema.len() - 1;

        match (field, value) {
            (FieldKind::Encoding, Value::Byte(marker)) => {
                *encoding = Encoding::try_from(*marker)?;
                w.store_byte(*marker);
            }
            (FieldKind::Byte(kind), Value::Byte(b)) => {
                check_bounds(*kind, *b)?;
                w.store_byte(*b);
            }
            (FieldKind::U16 { tempo: true }, Value::U16(value)) => match *value {
                v @ 0..0xFF => w.store_byte(v as u8),
                v @ 0xFF..=0x1FE => {
                    w.store_byte(0xFF);
                    w.store_byte((v - 0xFF) as u8);
                }
                _ => return Err(Error::InvalidTempo),
            },
            (FieldKind::U16 { tempo: false }, Value::U16(value)) => {
                w.store_bytes(&value.to_be_bytes());
            }
            (FieldKind::U32, Value::U32(value)) => w.store_bytes(&value.to_be_bytes()),
            (FieldKind::U64 { counter: true }, Value::U64(value)) => {
                let width = usize::try_from((u64::BITS - value.leading_zeros()).div_ceil(8))
                    .unwrap_or_default()
                    .max(4);
                w.store_bytes(&value.to_be_bytes()[8 - width..]);
            }
            (FieldKind::U64 { counter: false }, Value::U64(value)) => {
                w.store_bytes(&value.to_be_bytes());
            }
            (FieldKind::String(kind), Value::String(s)) => {
                emit_string(w, *kind, s, *encoding, is_tail)?;
            }
            (FieldKind::StringList, Value::StringList(strings)) => {
                emit_string_list(w, version, strings, *encoding)?;
            }
            (FieldKind::Bytes, Value::Bytes(bytes)) => w.store_bytes(bytes),
            (FieldKind::StructList(inner), Value::Structs(structs)) => {
                for entry in structs {
                    emit_with_state(w, version, *inner, entry, encoding, false)?;
                }
            }
            _ => return Err(Error::InvalidFrameHeader),
        }
    }

    Ok(())
}

fn emit_string(
    w: &mut Writer,
    kind: StringKind,
    s: &str,
    encoding: Encoding,
    is_tail: bool,
) -> Result<(), Error> {
    match kind {
        StringKind::Fixed(n) => {
            let bytes = text::encode_string(s, Encoding::Iso8859_1)?;
            if bytes.len() != n {
                return Err(Error::InvalidEncodedString);
            }
            w.store_bytes(&bytes);
        }
        StringKind::Scoped | StringKind::Latin1 => {
            let encoding = match kind {
                StringKind::Latin1 => Encoding::Iso8859_1,
                _ => encoding,
            };
            w.store_bytes(&text::encode_string(s, encoding)?);
            if !is_tail {
                w.store_zeros(encoding.terminator_len());
            }
        }
    }

    Ok(())
}

fn emit_string_list(
    w: &mut Writer,
    version: Version,
    strings: &[String],
    encoding: Encoding,
) -> Result<(), Error> {
    match version {
        // v2.4 separates multiple strings with the encoding's terminator
        Version::V2_4 => {
            for (i, s) in strings.iter().enumerate() {
                if i > 0 {
                    w.store_zeros(encoding.terminator_len());
                }
                w.store_bytes(&text::encode_string(s, encoding)?);
            }
        }
        // earlier versions hold one string; extra values are joined
        // with "/", the ID3v2.3 convention for multiple entries
        _ => w.store_bytes(&text::encode_string(&strings.join("/"), encoding)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(bytes: &[u8], version: Version, schema: &'static [FieldKind]) -> Vec<Value> {
        scan_fields(&mut Scanner::new(bytes.to_vec()), version, schema).unwrap()
    }

    fn emit(version: Version, schema: &'static [FieldKind], values: &[Value]) -> Vec<u8> {
        let mut w = Writer::new();
        emit_fields(&mut w, version, schema, values).unwrap();
        w.into_vec()
    }

    #[test]
    fn test_text_scan() {
        // UTF-8 encoding marker plus two strings
        let values = scan(b"\x03one\0two", Version::V2_4, TEXT);
        assert!(matches!(&values[..], [Value::Byte(3), Value::StringList(s)]
            if s == &["one", "two"]));

        // earlier versions never split
        let values = scan(b"\x00one/two", Version::V2_3, TEXT);
        assert!(matches!(&values[..], [Value::Byte(0), Value::StringList(s)]
            if s == &["one/two"]));
    }

    #[test]
    fn test_text_emit() {
        let values = [Value::Byte(3), Value::StringList(vec!["one".into(), "two".into()])];
        assert_eq!(emit(Version::V2_4, TEXT, &values), b"\x03one\0two");
        assert_eq!(emit(Version::V2_3, TEXT, &values), b"\x03one/two");
    }

    #[test]
    fn test_bounds() {
        // encoding marker 4 is undefined
        assert!(matches!(
            scan_fields(&mut Scanner::new(vec![4]), Version::V2_4, TEXT),
            Err(Error::InvalidEncoding)
        ));

        // picture type 21 is out of range
        assert!(matches!(
            scan_fields(
                &mut Scanner::new(b"\x00image/png\0\x15\0".to_vec()),
                Version::V2_4,
                ATTACHED_PICTURE,
            ),
            Err(Error::InvalidPictureType)
        ));

        // timestamp format 0 is out of range
        assert!(matches!(
            scan_fields(
                &mut Scanner::new(b"\x00eng\x00\x01d\0".to_vec()),
                Version::V2_4,
                LYRICS_SYNC,
            ),
            Err(Error::InvalidTimeStampFormat)
        ));
    }

    #[test]
    fn test_counter_widths() {
        // counters may be wider than four bytes
        let values = scan(&[0x01, 0x00, 0x00, 0x00, 0x02], Version::V2_4, PLAY_COUNT);
        assert!(matches!(&values[..], [Value::U64(0x01_00_00_00_02)]));

        // but never narrower
        assert!(matches!(
            scan_fields(&mut Scanner::new(vec![0, 0, 5]), Version::V2_4, PLAY_COUNT),
            Err(Error::IncompleteFrame)
        ));

        // small values emit at the minimum four-byte width
        assert_eq!(
            emit(Version::V2_4, PLAY_COUNT, &[Value::U64(5)]),
            [0, 0, 0, 5]
        );
        assert_eq!(
            emit(Version::V2_4, PLAY_COUNT, &[Value::U64(0x01_00_00_00_02)]),
            [0x01, 0x00, 0x00, 0x00, 0x02]
        );
    }

    #[test]
    fn test_tempo_form() {
        let values = scan(&[0x02, 0xFF, 0x20, 0, 0, 0, 1], Version::V2_4, TEMPO_CODES);
        let Value::Structs(ref entries) = values[1] else {
            panic!("expected tempo entries");
        };
        assert!(matches!(&entries[0][..], [Value::U16(0x11F), Value::U32(1)]));

        let out = emit(Version::V2_4, TEMPO_CODES, &values);
        assert_eq!(out, [0x02, 0xFF, 0x20, 0, 0, 0, 1]);

        // 510 is the ceiling of the two-byte form
        let over = [
            Value::Byte(2),
            Value::Structs(vec![vec![Value::U16(511), Value::U32(0)]]),
        ];
        let mut w = Writer::new();
        assert!(matches!(
            emit_fields(&mut w, Version::V2_4, TEMPO_CODES, &over),
            Err(Error::InvalidTempo)
        ));
    }

    #[test]
    fn test_struct_list_scan() {
        // two synchronized lyric entries
        let values = scan(
            b"\x00eng\x02\x01intro\0one\0\x00\x00\x00\x0Atwo\0\x00\x00\x00\x14",
            Version::V2_4,
            LYRICS_SYNC,
        );
        let Value::Structs(ref entries) = values[5] else {
            panic!("expected sync entries");
        };
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[1][..], [Value::String(s), Value::U32(20)]
            if s == "two"));
    }
}
