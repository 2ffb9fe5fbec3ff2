// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Whole ID3v2 tags and the codec's public entry points
//!
//! A tag sits at the very start of a stream as a 10-byte header
//! followed by a size-delimited payload of frames:
//!
//! | Bytes | Field | Meaning |
//! |------:|------:|---------|
//! | 3     | `"ID3"` | file identifier |
//! | 1     | version | 2, 3, or 4 |
//! | 1     | revision | always 0 |
//! | 1     | flags | see [`TagFlags`] |
//! | 4     | size | payload length, sync-safe |

use crate::Error;
use crate::frame::Frame;
use crate::stream::{Scanner, Writer};
use crate::unsync::decode_syncsafe;
use crate::version;

/// An ID3v2 codec version
#[derive(Copy, Clone, Debug, Eq, Ord, PartialOrd, PartialEq)]
pub enum Version {
    /// ID3v2.2
    V2_2,
    /// ID3v2.3
    V2_3,
    /// ID3v2.4
    V2_4,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::V2_2 => "2.2".fmt(f),
            Self::V2_3 => "2.3".fmt(f),
            Self::V2_4 => "2.4".fmt(f),
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = Error;

    fn try_from(wire: u8) -> Result<Self, Error> {
        match wire {
            2 => Ok(Self::V2_2),
            3 => Ok(Self::V2_3),
            4 => Ok(Self::V2_4),
            _ => Err(Error::InvalidVersion),
        }
    }
}

/// A set of whole-tag flags
///
/// Not all flags are supported by all versions of the ID3 codec.
/// The extended flags ([`TagFlags::IS_UPDATE`], [`TagFlags::HAS_CRC`],
/// [`TagFlags::HAS_RESTRICTIONS`]) imply [`TagFlags::EXTENDED`],
/// which the encoder raises on its own whenever any of them is set.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TagFlags(u16);

impl TagFlags {
    /// The whole tag is unsynchronized on the wire
    pub const UNSYNC: Self = Self(1 << 0);
    /// An extended header follows the tag header
    pub const EXTENDED: Self = Self(1 << 1);
    /// The tag is experimental
    pub const EXPERIMENTAL: Self = Self(1 << 2);
    /// A footer copies the header at the end of the tag (v2.4)
    pub const FOOTER: Self = Self(1 << 3);
    /// The tag updates an earlier tag in the file (v2.4)
    pub const IS_UPDATE: Self = Self(1 << 4);
    /// The extended header carries a CRC-32 of the tag's contents
    pub const HAS_CRC: Self = Self(1 << 5);
    /// The extended header carries a restrictions byte (v2.4)
    pub const HAS_RESTRICTIONS: Self = Self(1 << 6);

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
        self.0
    }

    pub(crate) fn from_bits(bits: u16) -> Self {
        Self(bits)
    }
}

impl std::ops::BitOr for TagFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TagFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// An entire ID3 tag, including zero or more frames
///
/// Frame order is preserved exactly through a decode/encode
/// roundtrip. `size` and `crc` are derived fields: decoding fills
/// them from the wire and encoding recomputes them.
#[derive(Clone, Debug)]
pub struct Tag {
    /// ID3 codec version (2.2, 2.3, or 2.4)
    pub version: Version,
    /// Whole-tag flags
    pub flags: TagFlags,
    /// Payload size in bytes, not including the 10-byte header,
    /// as written on disk
    pub size: u32,
    /// Number of zero bytes of padding after the last frame;
    /// values of 1 through 3 are promoted to 4 when encoding
    pub padding: u32,
    /// CRC-32 of the tag's contents, valid iff [`TagFlags::HAS_CRC`]
    pub crc: u32,
    /// Tag restrictions byte, valid iff [`TagFlags::HAS_RESTRICTIONS`]
    /// (v2.4 only)
    pub restrictions: u8,
    /// The tag's frames, in on-disk order
    pub frames: Vec<Frame>,
}

impl Default for Tag {
    fn default() -> Self {
        Self::new(Version::V2_4)
    }
}

impl Tag {
    /// Creates an empty tag of the given version
    pub fn new(version: Version) -> Self {
        Self {
            version,
            flags: TagFlags::empty(),
            size: 0,
            padding: 0,
            crc: 0,
            restrictions: 0,
            frames: Vec::new(),
        }
    }

    /// Reads an ID3 tag from the start of the given stream
    ///
    /// Consumes exactly `10 + size` bytes from the stream and
    /// returns the count. On error the tag is left untouched;
    /// a partially decoded tag is never observable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] if the stream does not open
    /// with a well-formed 10-byte ID3 header, or any structural
    /// error from the tag's contents.
    ///
    /// # Example
    /// ```
    /// use id3_codec::tag::{Tag, Version};
    ///
    /// // a v2.4 tag holding one TIT2 frame: "Hello" in UTF-8
    /// let data: &[u8] = &[
    ///     0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
    ///     b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x06, 0x00, 0x00,
    ///     0x03, 0x48, 0x65, 0x6C, 0x6C, 0x6F,
    /// ];
    ///
    /// let mut tag = Tag::default();
    /// assert_eq!(tag.read_from(&mut std::io::Cursor::new(data)).unwrap(), 26);
    /// assert_eq!(tag.version, Version::V2_4);
    /// assert_eq!(tag.frames.len(), 1);
    /// ```
    pub fn read_from<R: std::io::Read>(&mut self, reader: &mut R) -> Result<u64, Error> {
        let mut header = [0; 10];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::InvalidTag,
            _ => Error::Io(e),
        })?;

        let (version, size) = parse_header(&header)?;

        let mut payload = vec![0; size as usize];
        reader.read_exact(&mut payload)?;
        let mut scanner = Scanner::new(payload);

        // decode into a fresh tag so no partial state survives an error
        let mut tag = Tag::new(version);
        match version {
            Version::V2_2 => version::v22::decode(&mut tag, header[5], &mut scanner),
            Version::V2_3 => version::v23::decode(&mut tag, header[5], &mut scanner),
            Version::V2_4 => version::v24::decode(&mut tag, header[5], &mut scanner),
        }?;
        tag.size = size;

        *self = tag;
        Ok(10 + u64::from(size))
    }

    /// Writes the tag to the given stream and returns the number
    /// of bytes written
    ///
    /// Encoding recomputes the tag's `size` and, when
    /// [`TagFlags::HAS_CRC`] is raised, its `crc`, storing both back
    /// into the tag as well as onto the wire.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the sink, or a structural error
    /// if a frame cannot be represented under the tag's version.
    pub fn write_to<W: std::io::Write>(&mut self, writer: &mut W) -> Result<u64, Error> {
        let mut staged = Writer::new();

        match self.version {
            Version::V2_2 => version::v22::encode(self, &mut staged),
            Version::V2_3 => version::v23::encode(self, &mut staged),
            Version::V2_4 => version::v24::encode(self, &mut staged),
        }?;

        staged.save(writer)
    }
}

/// Inspects the first 10 bytes of a buffer for an ID3 tag header
///
/// Returns the tag's version and its on-disk payload size; a caller
/// sizing a read should add the 10 header bytes. Nothing beyond the
/// first 10 bytes is examined.
///
/// # Errors
///
/// Returns [`Error::InvalidTag`] if the prefix is shorter than 10
/// bytes or does not open an ID3 tag, and [`Error::InvalidVersion`]
/// for versions outside 2.2 through 2.4.
///
/// # Example
/// ```
/// use id3_codec::tag::{peek, Version};
///
/// let prefix = [0x49, 0x44, 0x33, 0x03, 0x00, 0x00, 0x00, 0x00, 0x02, 0x01];
/// assert_eq!(peek(&prefix).unwrap(), (Version::V2_3, 0x101));
/// ```
pub fn peek(prefix: &[u8]) -> Result<(Version, u32), Error> {
    match prefix.first_chunk::<10>() {
        Some(header) => parse_header(header),
        None => Err(Error::InvalidTag),
    }
}

fn parse_header(header: &[u8; 10]) -> Result<(Version, u32), Error> {
    if &header[..3] != b"ID3" {
        return Err(Error::InvalidTag);
    }

    let version = Version::try_from(header[3])?;

    // the sub-minor revision must always be zero
    if header[4] != 0 {
        return Err(Error::InvalidTag);
    }

    let size = decode_syncsafe(&header[6..10])?;
    Ok((version, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek() {
        assert_eq!(
            peek(&[0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap(),
            (Version::V2_4, 0)
        );

        // trailing bytes beyond the header are ignored
        assert_eq!(
            peek(&[0x49, 0x44, 0x33, 0x02, 0x00, 0x80, 0x00, 0x00, 0x01, 0x00, 0xAB]).unwrap(),
            (Version::V2_2, 0x80)
        );

        assert!(matches!(peek(b"ID3"), Err(Error::InvalidTag)));
        assert!(matches!(
            peek(b"id3\x04\x00\x00\x00\x00\x00\x00"),
            Err(Error::InvalidTag)
        ));
        assert!(matches!(
            peek(b"ID3\x05\x00\x00\x00\x00\x00\x00"),
            Err(Error::InvalidVersion)
        ));
        assert!(matches!(
            peek(b"ID3\x04\x01\x00\x00\x00\x00\x00"),
            Err(Error::InvalidTag)
        ));
        assert!(matches!(
            peek(b"ID3\x04\x00\x00\x80\x00\x00\x00"),
            Err(Error::InvalidSyncCode)
        ));
    }

    #[test]
    fn test_tag_flags() {
        let mut flags = TagFlags::empty();
        flags.insert(TagFlags::HAS_CRC | TagFlags::UNSYNC);
        assert!(flags.contains(TagFlags::HAS_CRC));
        assert!(!flags.contains(TagFlags::EXTENDED));

        flags.remove(TagFlags::UNSYNC);
        assert!(!flags.contains(TagFlags::UNSYNC));
    }
}
