// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! ID3v2 frames: headers, payload variants, and constructors
//!
//! A frame is one metadata record inside a tag, such as a song title
//! or an attached picture. Its wire identifier is version-specific
//! (3 characters in v2.2, 4 in v2.3/v2.4) so frames carry an abstract
//! [`FrameType`] and the codec maps it to the appropriate identifier
//! when encoding.

use crate::Error;
use crate::schema::Value;
use crate::text::Encoding;
use arrayvec::ArrayVec;

/// A frame's wire identifier: 3 or 4 ASCII uppercase letters or digits
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameId(ArrayVec<u8, 4>);

impl FrameId {
    /// Parses an identifier from its wire bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrameHeader`] unless the bytes are
    /// 3 or 4 ASCII uppercase letters or digits.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, Error> {
        if !(3..=4).contains(&bytes.len())
            || !bytes
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(Error::InvalidFrameHeader);
        }

        let mut id = ArrayVec::new();
        id.try_extend_from_slice(bytes)
            .map_err(|_| Error::InvalidFrameHeader)?;
        Ok(Self(id))
    }

    /// The identifier's characters
    pub fn as_str(&self) -> &str {
        str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The identifier's wire bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether no identifier has been assigned yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

/// A set of per-frame status and format flags
///
/// Not all flags are supported by all versions of the ID3 codec;
/// flags a version cannot represent are dropped when encoding to it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Frame should be discarded if the tag is altered
    pub const DISCARD_ON_TAG_ALTER: Self = Self(1 << 0);
    /// Frame should be discarded if the file is altered
    pub const DISCARD_ON_FILE_ALTER: Self = Self(1 << 1);
    /// Frame is read-only
    pub const READ_ONLY: Self = Self(1 << 2);
    /// Frame carries a group identifier byte
    pub const HAS_GROUP_ID: Self = Self(1 << 3);
    /// Frame payload is zlib-compressed
    pub const COMPRESSED: Self = Self(1 << 4);
    /// Frame payload is encrypted
    pub const ENCRYPTED: Self = Self(1 << 5);
    /// Frame payload is individually unsynchronized (v2.4 only)
    pub const UNSYNCHRONIZED: Self = Self(1 << 6);
    /// Frame carries a data-length indicator (v2.4 only)
    pub const HAS_DATA_LENGTH: Self = Self(1 << 7);

    /// A set with no flags raised
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether no flags are raised
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag in `other` is raised in ourself
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raises every flag in `other`
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Lowers every flag in `other`
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub(crate) const fn bits(self) -> u16 {
        self.0 as u16
    }

    pub(crate) fn from_bits(bits: u16) -> Self {
        Self(bits as u8)
    }
}

impl std::ops::BitOr for FrameFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FrameFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Data common to all ID3v2 frames
///
/// Decoding fills every field from the wire. Frame constructors
/// leave `id` empty and `size` zero; both are assigned by the codec
/// when the frame is encoded, so one frame value encodes correctly
/// under any tag version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    /// Version-specific wire identifier
    pub id: FrameId,
    /// Abstract frame type derived from the identifier
    pub frame_type: FrameType,
    /// Payload size in bytes, not including the frame header
    pub size: u32,
    /// Status and format flags
    pub flags: FrameFlags,
    /// Group identifier, present iff [`FrameFlags::HAS_GROUP_ID`];
    /// must lie in `0x80..=0xF0`
    pub group_id: Option<u8>,
    /// Encryption method, present iff [`FrameFlags::ENCRYPTED`];
    /// must lie in `0x80..=0xF0`
    pub encrypt_method: Option<u8>,
    /// Length of the payload before compression and unsynchronization,
    /// present iff [`FrameFlags::HAS_DATA_LENGTH`]
    pub data_length: Option<u32>,
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self {
            id: FrameId::default(),
            frame_type: FrameType::Unknown,
            size: 0,
            flags: FrameFlags::empty(),
            group_id: None,
            encrypt_method: None,
            data_length: None,
        }
    }
}

/// An abstract identifier for every frame kind this library knows
///
/// The doc comment of each variant names its v2.4 wire identifier.
/// Types absent from a given version's registry cannot be encoded
/// into a tag of that version.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum FrameType {
    /// APIC: attached picture
    AttachedPicture,
    /// AENC: audio encryption marker
    AudioEncryption,
    /// ASPI: audio seek point index, carried as opaque bytes
    AudioSeekPointIndex,
    /// COMM: full-text comment
    Comment,
    /// ENCR: encryption method registration
    EncryptionRegistration,
    /// GRID: group identification registration
    GroupIdRegistration,
    /// PCNT: play counter
    PlayCount,
    /// POPM: popularimeter
    Popularimeter,
    /// PRIV: private data
    Private,
    /// SYLT: synchronized lyrics
    LyricsSync,
    /// SYTC: synchronized tempo codes
    TempoCodes,
    /// USER: terms of use
    TermsOfUse,
    /// USLT: unsynchronized lyrics
    LyricsUnsync,
    /// UFID: unique file identifier
    UniqueFileId,
    /// TXXX: user-defined text
    TextCustom,
    /// WXXX: user-defined URL
    UrlCustom,

    // Text information frames, "T***"
    TextAlbumName,             // TALB
    TextBpm,                   // TBPM
    TextCompilationItunes,     // TCMP
    TextComposer,              // TCOM
    TextGenre,                 // TCON
    TextCopyright,             // TCOP
    TextDate,                  // TDAT (v2.3 and earlier)
    TextEncodingTime,          // TDEN
    TextPlaylistDelay,         // TDLY
    TextOriginalReleaseTime,   // TDOR
    TextRecordingTime,         // TDRC
    TextReleaseTime,           // TDRL
    TextTaggingTime,           // TDTG
    TextEncodedBy,             // TENC
    TextLyricist,              // TEXT
    TextFileType,              // TFLT
    TextTime,                  // TIME (v2.3 and earlier)
    TextInvolvedPeople,        // TIPL (IPLS in v2.3)
    TextGroupDescription,      // TIT1
    TextSongTitle,             // TIT2
    TextSongSubtitle,          // TIT3
    TextMusicalKey,            // TKEY
    TextLanguage,              // TLAN
    TextLengthMs,              // TLEN
    TextMusicians,             // TMCL
    TextMediaType,             // TMED
    TextMood,                  // TMOO
    TextOriginalAlbum,         // TOAL
    TextOriginalFileName,      // TOFN
    TextOriginalLyricist,      // TOLY
    TextOriginalPerformer,     // TOPE
    TextOriginalReleaseYear,   // TORY (v2.3 and earlier)
    TextOwner,                 // TOWN
    TextArtist,                // TPE1
    TextAlbumArtist,           // TPE2
    TextConductor,             // TPE3
    TextRemixer,               // TPE4
    TextPartOfSet,             // TPOS
    TextProducedNotice,        // TPRO
    TextPublisher,             // TPUB
    TextTrackNumber,           // TRCK
    TextRecordingDates,        // TRDA (v2.3 and earlier)
    TextRadioStation,          // TRSN
    TextRadioStationOwner,     // TRSO
    TextSize,                  // TSIZ (v2.3 and earlier)
    TextAlbumSortOrderItunes,  // TSO2
    TextAlbumSortOrder,        // TSOA
    TextComposerSortOrderItunes, // TSOC
    TextPerformerSortOrder,    // TSOP
    TextTitleSortOrder,        // TSOT
    TextIsrc,                  // TSRC
    TextEncodingSoftware,      // TSSE
    TextSetSubtitle,           // TSST
    TextYear,                  // TYER (v2.3 and earlier)

    // URL link frames, "W***"
    UrlCommercial,             // WCOM
    UrlCopyright,              // WCOP
    UrlAudioFile,              // WOAF
    UrlArtist,                 // WOAR
    UrlAudioSource,            // WOAS
    UrlRadioStation,           // WORS
    UrlPayment,                // WPAY
    UrlPublisher,              // WPUB

    /// Any frame whose identifier is unrecognised
    Unknown,
}

/// The payload shape shared by a family of frame types
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum PayloadKind {
    Text,
    TextCustom,
    Url,
    UrlCustom,
    Comment,
    LyricsUnsync,
    LyricsSync,
    TempoCodes,
    TermsOfUse,
    AttachedPicture,
    UniqueFileId,
    Private,
    PlayCount,
    Popularimeter,
    GroupId,
    EncryptionRegistration,
    AudioEncryption,
    Unknown,
}

impl PayloadKind {
    pub fn of(frame_type: FrameType) -> Self {
        use FrameType::*;

        match frame_type {
            AttachedPicture => Self::AttachedPicture,
            AudioEncryption => Self::AudioEncryption,
            AudioSeekPointIndex => Self::Unknown,
            Comment => Self::Comment,
            EncryptionRegistration => Self::EncryptionRegistration,
            GroupIdRegistration => Self::GroupId,
            PlayCount => Self::PlayCount,
            Popularimeter => Self::Popularimeter,
            Private => Self::Private,
            LyricsSync => Self::LyricsSync,
            TempoCodes => Self::TempoCodes,
            TermsOfUse => Self::TermsOfUse,
            LyricsUnsync => Self::LyricsUnsync,
            UniqueFileId => Self::UniqueFileId,
            TextCustom => Self::TextCustom,
            UrlCustom => Self::UrlCustom,
            UrlCommercial | UrlCopyright | UrlAudioFile | UrlArtist | UrlAudioSource
            | UrlRadioStation | UrlPayment | UrlPublisher => Self::Url,
            Unknown => Self::Unknown,
            _ => Self::Text,
        }
    }
}

/// Payload of any text information frame except `TXXX`
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Text {
    /// Encoding of the strings in `text`
    pub encoding: Encoding,
    /// The frame's strings; v2.4 tags may carry more than one,
    /// earlier versions join them with `/` when encoding
    pub text: Vec<String>,
}

/// Payload of a user-defined `TXXX` text frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TextCustom {
    /// Encoding of `description` and `text`
    pub encoding: Encoding,
    /// What the value describes
    pub description: String,
    /// The value itself
    pub text: String,
}

/// Payload of any URL link frame except `WXXX`
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Url {
    /// The linked URL, always ISO-8859-1
    pub url: String,
}

/// Payload of a user-defined `WXXX` URL frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlCustom {
    /// Encoding of `description`
    pub encoding: Encoding,
    /// What the link points at
    pub description: String,
    /// The linked URL, always ISO-8859-1
    pub url: String,
}

/// Payload of a `COMM` comment frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Comment {
    /// Encoding of `description` and `text`
    pub encoding: Encoding,
    /// 3-character ISO-639-2 language code
    pub language: String,
    /// Short content description
    pub description: String,
    /// The comment itself
    pub text: String,
}

/// Payload of a `USLT` unsynchronized lyrics frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LyricsUnsync {
    /// Encoding of `description` and `text`
    pub encoding: Encoding,
    /// 3-character ISO-639-2 language code
    pub language: String,
    /// Short content description
    pub description: String,
    /// The lyrics transcription
    pub text: String,
}

/// One timestamped entry in a `SYLT` frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SyncedText {
    /// The syllable, word or line sung at `timestamp`
    pub text: String,
    /// Position in the audio, in the frame's timestamp format
    pub timestamp: u32,
}

/// Payload of a `SYLT` synchronized lyrics frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LyricsSync {
    /// Encoding of `descriptor` and the entry texts
    pub encoding: Encoding,
    /// 3-character ISO-639-2 language code
    pub language: String,
    /// 1 for MPEG frame timestamps, 2 for milliseconds
    pub timestamp_format: u8,
    /// What the entries are: 0 other, 1 lyrics, up to 8 URLs
    pub content_type: u8,
    /// Short content descriptor
    pub descriptor: String,
    /// The timestamped entries, in playback order
    pub sync: Vec<SyncedText>,
}

/// One timestamped tempo change in a `SYTC` frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TempoSync {
    /// Beats per minute; 0 is "beat-free", 1 a single beat-stroke
    pub tempo: u16,
    /// Position in the audio, in the frame's timestamp format
    pub timestamp: u32,
}

/// Payload of a `SYTC` synchronized tempo codes frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TempoCodes {
    /// 1 for MPEG frame timestamps, 2 for milliseconds
    pub timestamp_format: u8,
    /// The tempo changes, in playback order
    pub tempo: Vec<TempoSync>,
}

/// Payload of a `USER` terms-of-use frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TermsOfUse {
    /// Encoding of `text`
    pub encoding: Encoding,
    /// 3-character ISO-639-2 language code
    pub language: String,
    /// The terms of use
    pub text: String,
}

/// Payload of an `APIC` attached picture frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AttachedPicture {
    /// Encoding of `description`
    pub encoding: Encoding,
    /// MIME type of `data`; a 3-character image format such as
    /// `PNG` in v2.2 tags
    pub mime_type: String,
    /// What the picture shows, from 0 (other) to 20 (publisher logo)
    pub picture_type: u8,
    /// Short content description
    pub description: String,
    /// The image file itself
    pub data: Vec<u8>,
}

/// Payload of a `UFID` unique file identifier frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UniqueFileId {
    /// Owner identifier, usually an email address or URL
    pub owner: String,
    /// The database's identifier for this file, up to 64 bytes
    pub identifier: Vec<u8>,
}

/// Payload of a `PRIV` private data frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Private {
    /// Owner identifier, usually an email address or URL
    pub owner: String,
    /// The private data
    pub data: Vec<u8>,
}

/// Payload of a `PCNT` play counter frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlayCount {
    /// Number of times the file has been played
    pub counter: u64,
}

/// Payload of a `POPM` popularimeter frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Popularimeter {
    /// Email address of the rating user
    pub email: String,
    /// Rating from 1 (worst) to 255 (best); 0 is unrated
    pub rating: u8,
    /// Number of times the file has been played
    pub counter: u64,
}

/// Payload of a `GRID` group identification registration frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupIdRegistration {
    /// Owner identifier of the grouping method
    pub owner: String,
    /// The group symbol being registered, in `0x80..=0xF0`
    pub symbol: u8,
    /// Optional group-dependent data
    pub data: Vec<u8>,
}

/// Payload of an `ENCR` encryption method registration frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncryptionRegistration {
    /// Owner identifier of the encryption method
    pub owner: String,
    /// The method symbol being registered, in `0x80..=0xF0`
    pub symbol: u8,
    /// Optional method-dependent data
    pub data: Vec<u8>,
}

/// Payload of an `AENC` audio encryption frame
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AudioEncryption {
    /// Owner identifier of the encryption scheme
    pub owner: String,
    /// Start of the unencrypted preview, in audio frames
    pub preview_start: u16,
    /// Length of the unencrypted preview, in audio frames
    pub preview_length: u16,
    /// Scheme-dependent encryption info
    pub data: Vec<u8>,
}

/// Payload of any frame whose identifier is unrecognised,
/// or whose contents are encrypted
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Unknown {
    /// The payload's raw bytes, preserved as-is
    pub data: Vec<u8>,
}

/// The payload of an ID3v2 frame
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum FramePayload {
    Text(Text),
    TextCustom(TextCustom),
    Url(Url),
    UrlCustom(UrlCustom),
    Comment(Comment),
    LyricsUnsync(LyricsUnsync),
    LyricsSync(LyricsSync),
    TempoCodes(TempoCodes),
    TermsOfUse(TermsOfUse),
    AttachedPicture(AttachedPicture),
    UniqueFileId(UniqueFileId),
    Private(Private),
    PlayCount(PlayCount),
    Popularimeter(Popularimeter),
    GroupId(GroupIdRegistration),
    EncryptionRegistration(EncryptionRegistration),
    AudioEncryption(AudioEncryption),
    Unknown(Unknown),
}

impl FramePayload {
    pub(crate) fn kind(&self) -> PayloadKind {
        match self {
            Self::Text(_) => PayloadKind::Text,
            Self::TextCustom(_) => PayloadKind::TextCustom,
            Self::Url(_) => PayloadKind::Url,
            Self::UrlCustom(_) => PayloadKind::UrlCustom,
            Self::Comment(_) => PayloadKind::Comment,
            Self::LyricsUnsync(_) => PayloadKind::LyricsUnsync,
            Self::LyricsSync(_) => PayloadKind::LyricsSync,
            Self::TempoCodes(_) => PayloadKind::TempoCodes,
            Self::TermsOfUse(_) => PayloadKind::TermsOfUse,
            Self::AttachedPicture(_) => PayloadKind::AttachedPicture,
            Self::UniqueFileId(_) => PayloadKind::UniqueFileId,
            Self::Private(_) => PayloadKind::Private,
            Self::PlayCount(_) => PayloadKind::PlayCount,
            Self::Popularimeter(_) => PayloadKind::Popularimeter,
            Self::GroupId(_) => PayloadKind::GroupId,
            Self::EncryptionRegistration(_) => PayloadKind::EncryptionRegistration,
            Self::AudioEncryption(_) => PayloadKind::AudioEncryption,
            Self::Unknown(_) => PayloadKind::Unknown,
        }
    }
}

/// One ID3v2 frame: a header plus a typed payload
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// Data common to all frames
    pub header: FrameHeader,
    /// The frame's typed contents
    pub payload: FramePayload,
}

impl Frame {
    /// Creates a frame of the given type around the given payload
    ///
    /// The payload's shape must belong to the frame type's family;
    /// encoding a mismatched pair fails with
    /// [`Error::InvalidFrameHeader`].
    pub fn new(frame_type: FrameType, payload: FramePayload) -> Self {
        Self {
            header: FrameHeader {
                frame_type,
                ..FrameHeader::default()
            },
            payload,
        }
    }

    /// Creates a text information frame, such as
    /// [`FrameType::TextSongTitle`]
    pub fn text(frame_type: FrameType, text: &str) -> Self {
        Self::new(
            frame_type,
            FramePayload::Text(Text {
                encoding: Encoding::Utf8,
                text: vec![text.to_owned()],
            }),
        )
    }

    /// Creates a user-defined `TXXX` text frame
    pub fn text_custom(description: &str, text: &str) -> Self {
        Self::new(
            FrameType::TextCustom,
            FramePayload::TextCustom(TextCustom {
                encoding: Encoding::Utf8,
                description: description.to_owned(),
                text: text.to_owned(),
            }),
        )
    }

    /// Creates a URL link frame, such as [`FrameType::UrlAudioFile`]
    pub fn url(frame_type: FrameType, url: &str) -> Self {
        Self::new(
            frame_type,
            FramePayload::Url(Url {
                url: url.to_owned(),
            }),
        )
    }

    /// Creates a user-defined `WXXX` URL frame
    pub fn url_custom(description: &str, url: &str) -> Self {
        Self::new(
            FrameType::UrlCustom,
            FramePayload::UrlCustom(UrlCustom {
                encoding: Encoding::Utf8,
                description: description.to_owned(),
                url: url.to_owned(),
            }),
        )
    }

    /// Creates a `COMM` comment frame
    pub fn comment(language: &str, description: &str, text: &str) -> Self {
        Self::new(
            FrameType::Comment,
            FramePayload::Comment(Comment {
                encoding: Encoding::Utf8,
                language: language.to_owned(),
                description: description.to_owned(),
                text: text.to_owned(),
            }),
        )
    }

    /// Creates a `USLT` unsynchronized lyrics frame
    pub fn lyrics_unsync(language: &str, description: &str, text: &str) -> Self {
        Self::new(
            FrameType::LyricsUnsync,
            FramePayload::LyricsUnsync(LyricsUnsync {
                encoding: Encoding::Utf8,
                language: language.to_owned(),
                description: description.to_owned(),
                text: text.to_owned(),
            }),
        )
    }

    /// Creates a `SYLT` synchronized lyrics frame with
    /// millisecond timestamps
    pub fn lyrics_sync(language: &str, descriptor: &str, sync: Vec<SyncedText>) -> Self {
        Self::new(
            FrameType::LyricsSync,
            FramePayload::LyricsSync(LyricsSync {
                encoding: Encoding::Utf8,
                language: language.to_owned(),
                timestamp_format: 2,
                content_type: 1,
                descriptor: descriptor.to_owned(),
                sync,
            }),
        )
    }

    /// Creates a `SYTC` synchronized tempo codes frame with
    /// millisecond timestamps
    pub fn tempo_codes(tempo: Vec<TempoSync>) -> Self {
        Self::new(
            FrameType::TempoCodes,
            FramePayload::TempoCodes(TempoCodes {
                timestamp_format: 2,
                tempo,
            }),
        )
    }

    /// Creates a `USER` terms-of-use frame
    pub fn terms_of_use(language: &str, text: &str) -> Self {
        Self::new(
            FrameType::TermsOfUse,
            FramePayload::TermsOfUse(TermsOfUse {
                encoding: Encoding::Utf8,
                language: language.to_owned(),
                text: text.to_owned(),
            }),
        )
    }

    /// Creates an `APIC` attached picture frame
    pub fn attached_picture(
        mime_type: &str,
        picture_type: u8,
        description: &str,
        data: Vec<u8>,
    ) -> Self {
        Self::new(
            FrameType::AttachedPicture,
            FramePayload::AttachedPicture(AttachedPicture {
                encoding: Encoding::Utf8,
                mime_type: mime_type.to_owned(),
                picture_type,
                description: description.to_owned(),
                data,
            }),
        )
    }

    /// Creates a `UFID` unique file identifier frame
    pub fn unique_file_id(owner: &str, identifier: Vec<u8>) -> Self {
        Self::new(
            FrameType::UniqueFileId,
            FramePayload::UniqueFileId(UniqueFileId {
                owner: owner.to_owned(),
                identifier,
            }),
        )
    }

    /// Creates a `PRIV` private data frame
    pub fn private(owner: &str, data: Vec<u8>) -> Self {
        Self::new(
            FrameType::Private,
            FramePayload::Private(Private {
                owner: owner.to_owned(),
                data,
            }),
        )
    }

    /// Creates a `PCNT` play counter frame
    pub fn play_count(counter: u64) -> Self {
        Self::new(
            FrameType::PlayCount,
            FramePayload::PlayCount(PlayCount { counter }),
        )
    }

    /// Creates a `POPM` popularimeter frame
    pub fn popularimeter(email: &str, rating: u8, counter: u64) -> Self {
        Self::new(
            FrameType::Popularimeter,
            FramePayload::Popularimeter(Popularimeter {
                email: email.to_owned(),
                rating,
                counter,
            }),
        )
    }

    /// Creates a `GRID` group identification registration frame
    pub fn group_id(owner: &str, symbol: u8, data: Vec<u8>) -> Self {
        Self::new(
            FrameType::GroupIdRegistration,
            FramePayload::GroupId(GroupIdRegistration {
                owner: owner.to_owned(),
                symbol,
                data,
            }),
        )
    }

    /// Creates an `ENCR` encryption method registration frame
    pub fn encryption_registration(owner: &str, symbol: u8, data: Vec<u8>) -> Self {
        Self::new(
            FrameType::EncryptionRegistration,
            FramePayload::EncryptionRegistration(EncryptionRegistration {
                owner: owner.to_owned(),
                symbol,
                data,
            }),
        )
    }

    /// Creates an `AENC` audio encryption frame
    pub fn audio_encryption(
        owner: &str,
        preview_start: u16,
        preview_length: u16,
        data: Vec<u8>,
    ) -> Self {
        Self::new(
            FrameType::AudioEncryption,
            FramePayload::AudioEncryption(AudioEncryption {
                owner: owner.to_owned(),
                preview_start,
                preview_length,
                data,
            }),
        )
    }

    /// The frame's common header
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Mutable access to the frame's common header
    pub fn header_mut(&mut self) -> &mut FrameHeader {
        &mut self.header
    }
}

/// Flattens a payload into scanner field values, in schema order
pub(crate) fn payload_values(payload: &FramePayload) -> Vec<Value> {
    match payload {
        FramePayload::Text(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::StringList(p.text.clone()),
        ],
        FramePayload::TextCustom(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.description.clone()),
            Value::String(p.text.clone()),
        ],
        FramePayload::Url(p) => vec![Value::String(p.url.clone())],
        FramePayload::UrlCustom(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.description.clone()),
            Value::String(p.url.clone()),
        ],
        FramePayload::Comment(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.language.clone()),
            Value::String(p.description.clone()),
            Value::String(p.text.clone()),
        ],
        FramePayload::LyricsUnsync(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.language.clone()),
            Value::String(p.description.clone()),
            Value::String(p.text.clone()),
        ],
        FramePayload::LyricsSync(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.language.clone()),
            Value::Byte(p.timestamp_format),
            Value::Byte(p.content_type),
            Value::String(p.descriptor.clone()),
            Value::Structs(
                p.sync
                    .iter()
                    .map(|e| vec![Value::String(e.text.clone()), Value::U32(e.timestamp)])
                    .collect(),
            ),
        ],
        FramePayload::TempoCodes(p) => vec![
            Value::Byte(p.timestamp_format),
            Value::Structs(
                p.tempo
                    .iter()
                    .map(|e| vec![Value::U16(e.tempo), Value::U32(e.timestamp)])
                    .collect(),
            ),
        ],
        FramePayload::TermsOfUse(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.language.clone()),
            Value::String(p.text.clone()),
        ],
        FramePayload::AttachedPicture(p) => vec![
            Value::Byte(p.encoding.into()),
            Value::String(p.mime_type.clone()),
            Value::Byte(p.picture_type),
            Value::String(p.description.clone()),
            Value::Bytes(p.data.clone()),
        ],
        FramePayload::UniqueFileId(p) => vec![
            Value::String(p.owner.clone()),
            Value::Bytes(p.identifier.clone()),
        ],
        FramePayload::Private(p) => {
            vec![Value::String(p.owner.clone()), Value::Bytes(p.data.clone())]
        }
        FramePayload::PlayCount(p) => vec![Value::U64(p.counter)],
        FramePayload::Popularimeter(p) => vec![
            Value::String(p.email.clone()),
            Value::Byte(p.rating),
            Value::U64(p.counter),
        ],
        FramePayload::GroupId(p) => vec![
            Value::String(p.owner.clone()),
            Value::Byte(p.symbol),
            Value::Bytes(p.data.clone()),
        ],
        FramePayload::EncryptionRegistration(p) => vec![
            Value::String(p.owner.clone()),
            Value::Byte(p.symbol),
            Value::Bytes(p.data.clone()),
        ],
        FramePayload::AudioEncryption(p) => vec![
            Value::String(p.owner.clone()),
            Value::U16(p.preview_start),
            Value::U16(p.preview_length),
            Value::Bytes(p.data.clone()),
        ],
        FramePayload::Unknown(p) => vec![Value::Bytes(p.data.clone())],
    }
}

/// Rebuilds a typed payload from scanner field values, in schema order
pub(crate) fn payload_from_values(
    frame_type: FrameType,
    values: Vec<Value>,
) -> Result<FramePayload, Error> {
    let v = &mut values.into_iter();

    Ok(match PayloadKind::of(frame_type) {
        PayloadKind::Text => FramePayload::Text(Text {
            encoding: take_encoding(v)?,
            text: take_string_list(v)?,
        }),
        PayloadKind::TextCustom => FramePayload::TextCustom(TextCustom {
            encoding: take_encoding(v)?,
            description: take_string(v)?,
            text: take_string(v)?,
        }),
        PayloadKind::Url => FramePayload::Url(Url {
            url: take_string(v)?,
        }),
        PayloadKind::UrlCustom => FramePayload::UrlCustom(UrlCustom {
            encoding: take_encoding(v)?,
            description: take_string(v)?,
            url: take_string(v)?,
        }),
        PayloadKind::Comment => FramePayload::Comment(Comment {
            encoding: take_encoding(v)?,
            language: take_string(v)?,
            description: take_string(v)?,
            text: take_string(v)?,
        }),
        PayloadKind::LyricsUnsync => FramePayload::LyricsUnsync(LyricsUnsync {
            encoding: take_encoding(v)?,
            language: take_string(v)?,
            description: take_string(v)?,
            text: take_string(v)?,
        }),
        PayloadKind::LyricsSync => FramePayload::LyricsSync(LyricsSync {
            encoding: take_encoding(v)?,
            language: take_string(v)?,
            timestamp_format: take_byte(v)?,
            content_type: take_byte(v)?,
            descriptor: take_string(v)?,
            sync: take_structs(v)?
                .into_iter()
                .map(|entry| {
                    let e = &mut entry.into_iter();
                    Ok(SyncedText {
                        text: take_string(e)?,
                        timestamp: take_u32(e)?,
                    })
                })
                .collect::<Result<_, Error>>()?,
        }),
        PayloadKind::TempoCodes => FramePayload::TempoCodes(TempoCodes {
            timestamp_format: take_byte(v)?,
            tempo: take_structs(v)?
                .into_iter()
                .map(|entry| {
                    let e = &mut entry.into_iter();
                    Ok(TempoSync {
                        tempo: take_u16(e)?,
                        timestamp: take_u32(e)?,
                    })
                })
                .collect::<Result<_, Error>>()?,
        }),
        PayloadKind::TermsOfUse => FramePayload::TermsOfUse(TermsOfUse {
            encoding: take_encoding(v)?,
            language: take_string(v)?,
            text: take_string(v)?,
        }),
        PayloadKind::AttachedPicture => FramePayload::AttachedPicture(AttachedPicture {
            encoding: take_encoding(v)?,
            mime_type: take_string(v)?,
            picture_type: take_byte(v)?,
            description: take_string(v)?,
            data: take_bytes(v)?,
        }),
        PayloadKind::UniqueFileId => FramePayload::UniqueFileId(UniqueFileId {
            owner: take_string(v)?,
            identifier: take_bytes(v)?,
        }),
        PayloadKind::Private => FramePayload::Private(Private {
            owner: take_string(v)?,
            data: take_bytes(v)?,
        }),
        PayloadKind::PlayCount => FramePayload::PlayCount(PlayCount {
            counter: take_u64(v)?,
        }),
        PayloadKind::Popularimeter => FramePayload::Popularimeter(Popularimeter {
            email: take_string(v)?,
            rating: take_byte(v)?,
            counter: take_u64(v)?,
        }),
        PayloadKind::GroupId => FramePayload::GroupId(GroupIdRegistration {
            owner: take_string(v)?,
            symbol: take_byte(v)?,
            data: take_bytes(v)?,
        }),
        PayloadKind::EncryptionRegistration => {
            FramePayload::EncryptionRegistration(EncryptionRegistration {
                owner: take_string(v)?,
                symbol: take_byte(v)?,
                data: take_bytes(v)?,
            })
        }
        PayloadKind::AudioEncryption => FramePayload::AudioEncryption(AudioEncryption {
            owner: take_string(v)?,
            preview_start: take_u16(v)?,
            preview_length: take_u16(v)?,
            data: take_bytes(v)?,
        }),
        PayloadKind::Unknown => FramePayload::Unknown(Unknown {
            data: take_bytes(v)?,
        }),
    })
}

type Values = std::vec::IntoIter<Value>;

fn take_byte(v: &mut Values) -> Result<u8, Error> {
    match v.next() {
        Some(Value::Byte(b)) => Ok(b),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_encoding(v: &mut Values) -> Result<Encoding, Error> {
    take_byte(v).and_then(Encoding::try_from)
}

fn take_u16(v: &mut Values) -> Result<u16, Error> {
    match v.next() {
        Some(Value::U16(u)) => Ok(u),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_u32(v: &mut Values) -> Result<u32, Error> {
    match v.next() {
        Some(Value::U32(u)) => Ok(u),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_u64(v: &mut Values) -> Result<u64, Error> {
    match v.next() {
        Some(Value::U64(u)) => Ok(u),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_string(v: &mut Values) -> Result<String, Error> {
    match v.next() {
        Some(Value::String(s)) => Ok(s),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_string_list(v: &mut Values) -> Result<Vec<String>, Error> {
    match v.next() {
        Some(Value::StringList(s)) => Ok(s),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_bytes(v: &mut Values) -> Result<Vec<u8>, Error> {
    match v.next() {
        Some(Value::Bytes(b)) => Ok(b),
        _ => Err(Error::InvalidFrameHeader),
    }
}

fn take_structs(v: &mut Values) -> Result<Vec<Vec<Value>>, Error> {
    match v.next() {
        Some(Value::Structs(s)) => Ok(s),
        _ => Err(Error::InvalidFrameHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ids() {
        assert_eq!(FrameId::from_wire(b"TIT2").unwrap().as_str(), "TIT2");
        assert_eq!(FrameId::from_wire(b"TT2").unwrap().as_str(), "TT2");

        for bad in [b"TIT@".as_slice(), b"ti t", b"TITLE", b"TI"] {
            assert!(matches!(
                FrameId::from_wire(bad),
                Err(Error::InvalidFrameHeader)
            ));
        }
    }

    #[test]
    fn test_flags() {
        let mut flags = FrameFlags::empty();
        assert!(flags.is_empty());

        flags.insert(FrameFlags::COMPRESSED | FrameFlags::HAS_DATA_LENGTH);
        assert!(flags.contains(FrameFlags::COMPRESSED));
        assert!(!flags.contains(FrameFlags::ENCRYPTED));

        flags.remove(FrameFlags::COMPRESSED);
        assert!(!flags.contains(FrameFlags::COMPRESSED));
        assert!(flags.contains(FrameFlags::HAS_DATA_LENGTH));
    }

    #[test]
    fn test_payload_value_roundtrip() {
        let frame = Frame::comment("eng", "note", "hello there");
        let values = payload_values(&frame.payload);
        let rebuilt = payload_from_values(FrameType::Comment, values).unwrap();
        assert_eq!(rebuilt, frame.payload);
    }

    #[test]
    fn test_payload_kinds() {
        assert_eq!(PayloadKind::of(FrameType::TextSongTitle), PayloadKind::Text);
        assert_eq!(PayloadKind::of(FrameType::TextYear), PayloadKind::Text);
        assert_eq!(PayloadKind::of(FrameType::UrlPayment), PayloadKind::Url);
        assert_eq!(
            PayloadKind::of(FrameType::TextCustom),
            PayloadKind::TextCustom
        );
        assert_eq!(PayloadKind::of(FrameType::Unknown), PayloadKind::Unknown);
    }
}
