// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Encoded strings in the four ID3v2 character encodings

use crate::Error;
use encoding_rs::{UTF_16BE, UTF_16LE};

/// A text encoding, as selected by a frame's encoding marker byte
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Encoding {
    /// ISO-8859-1, one byte per code point
    #[default]
    Iso8859_1 = 0,
    /// UTF-16 with a leading byte-order mark
    Utf16 = 1,
    /// UTF-16 big-endian, without a byte-order mark
    Utf16Be = 2,
    /// UTF-8
    Utf8 = 3,
}

impl Encoding {
    /// Width of this encoding's string terminator, in bytes
    pub fn terminator_len(self) -> usize {
        match self {
            Self::Iso8859_1 | Self::Utf8 => 1,
            Self::Utf16 | Self::Utf16Be => 2,
        }
    }
}

impl TryFrom<u8> for Encoding {
    type Error = Error;

    fn try_from(marker: u8) -> Result<Self, Error> {
        match marker {
            0 => Ok(Self::Iso8859_1),
            1 => Ok(Self::Utf16),
            2 => Ok(Self::Utf16Be),
            3 => Ok(Self::Utf8),
            _ => Err(Error::InvalidEncoding),
        }
    }
}

impl From<Encoding> for u8 {
    fn from(encoding: Encoding) -> u8 {
        encoding as u8
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Iso8859_1 => "ISO-8859-1".fmt(f),
            Self::Utf16 => "UTF-16".fmt(f),
            Self::Utf16Be => "UTF-16BE".fmt(f),
            Self::Utf8 => "UTF-8".fmt(f),
        }
    }
}

/// Decodes a terminator-free byte run into a string
///
/// # Errors
///
/// Returns [`Error::InvalidEncodedString`] if the bytes do not conform
/// to the encoding: invalid UTF-8, an odd number of UTF-16 bytes,
/// a missing byte-order mark, or unpaired surrogates.
pub fn decode_string(bytes: &[u8], encoding: Encoding) -> Result<String, Error> {
    match encoding {
        Encoding::Iso8859_1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        Encoding::Utf8 => str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidEncodedString),
        Encoding::Utf16 => match bytes {
            [] => Ok(String::new()),
            [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, false),
            [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, true),
            _ => Err(Error::InvalidEncodedString),
        },
        Encoding::Utf16Be => decode_utf16(bytes, true),
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Result<String, Error> {
    if !bytes.len().is_multiple_of(2) {
        return Err(Error::InvalidEncodedString);
    }

    let (decoded, had_errors) = if big_endian {
        UTF_16BE.decode_without_bom_handling(bytes)
    } else {
        UTF_16LE.decode_without_bom_handling(bytes)
    };

    match had_errors {
        false => Ok(decoded.into_owned()),
        true => Err(Error::InvalidEncodedString),
    }
}

/// Encodes a string into bytes, without a terminator
///
/// UTF-16 with byte-order mark emits `FF FE` followed by
/// little-endian code units.
///
/// # Errors
///
/// Returns [`Error::InvalidEncodedString`] if the string contains
/// a character the encoding cannot represent.
pub fn encode_string(s: &str, encoding: Encoding) -> Result<Vec<u8>, Error> {
    match encoding {
        Encoding::Iso8859_1 => s
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| Error::InvalidEncodedString))
            .collect(),
        Encoding::Utf8 => Ok(s.as_bytes().to_vec()),
        Encoding::Utf16 => {
            let mut bytes = vec![0xFF, 0xFE];
            bytes.extend(s.encode_utf16().flat_map(u16::to_le_bytes));
            Ok(bytes)
        }
        Encoding::Utf16Be => Ok(s.encode_utf16().flat_map(u16::to_be_bytes).collect()),
    }
}

/// Returns the byte offset of the next string terminator, if any
///
/// Two-byte encodings are searched on code-unit boundaries.
pub(crate) fn find_terminator(bytes: &[u8], encoding: Encoding) -> Option<usize> {
    match encoding.terminator_len() {
        1 => bytes.iter().position(|&b| b == 0x00),
        _ => bytes
            .chunks_exact(2)
            .position(|pair| pair == [0x00, 0x00])
            .map(|i| i * 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        for marker in 0..=3 {
            assert_eq!(u8::from(Encoding::try_from(marker).unwrap()), marker);
        }
        assert!(matches!(Encoding::try_from(4), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_iso8859_1() {
        assert_eq!(
            decode_string(&[0x48, 0x69, 0xE9], Encoding::Iso8859_1).unwrap(),
            "Hié"
        );
        assert_eq!(
            encode_string("Hié", Encoding::Iso8859_1).unwrap(),
            [0x48, 0x69, 0xE9]
        );
        assert!(matches!(
            encode_string("日本", Encoding::Iso8859_1),
            Err(Error::InvalidEncodedString)
        ));
    }

    #[test]
    fn test_utf8() {
        assert_eq!(
            decode_string("héllo".as_bytes(), Encoding::Utf8).unwrap(),
            "héllo"
        );
        assert!(matches!(
            decode_string(&[0xC3], Encoding::Utf8),
            Err(Error::InvalidEncodedString)
        ));
    }

    #[test]
    fn test_utf16() {
        // little-endian with byte-order mark
        let le = encode_string("Hi", Encoding::Utf16).unwrap();
        assert_eq!(le, [0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00]);
        assert_eq!(decode_string(&le, Encoding::Utf16).unwrap(), "Hi");

        // big-endian with byte-order mark
        assert_eq!(
            decode_string(&[0xFE, 0xFF, 0x00, 0x48], Encoding::Utf16).unwrap(),
            "H"
        );

        // no byte-order mark at all
        assert!(matches!(
            decode_string(&[0x00, 0x48], Encoding::Utf16),
            Err(Error::InvalidEncodedString)
        ));

        // empty strings need no byte-order mark
        assert_eq!(decode_string(&[], Encoding::Utf16).unwrap(), "");
    }

    #[test]
    fn test_utf16be() {
        let be = encode_string("Hi", Encoding::Utf16Be).unwrap();
        assert_eq!(be, [0x00, 0x48, 0x00, 0x69]);
        assert_eq!(decode_string(&be, Encoding::Utf16Be).unwrap(), "Hi");

        assert!(matches!(
            decode_string(&[0x00], Encoding::Utf16Be),
            Err(Error::InvalidEncodedString)
        ));
    }

    #[test]
    fn test_find_terminator() {
        assert_eq!(find_terminator(b"abc\0def", Encoding::Utf8), Some(3));
        assert_eq!(find_terminator(b"abc", Encoding::Iso8859_1), None);

        // the 00 48 pair must not register as a terminator
        assert_eq!(
            find_terminator(&[0x00, 0x48, 0x00, 0x00], Encoding::Utf16Be),
            Some(2)
        );
    }
}
