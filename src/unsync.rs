// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sync-safe integers and the unsynchronization byte-stuffing transform
//!
//! Both exist to keep MPEG audio sync patterns (an `0xFF` byte followed
//! by a byte with its top three bits set) from occurring inside a tag.

use crate::Error;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

/// Decodes a big-endian sync-safe integer from the given bytes
///
/// Each input byte carries 7 payload bits in its low bits; a set
/// top bit is an error. Both the 4-byte (28-bit) form used by tag
/// and frame sizes and the 5-byte (35-bit) form used by the v2.4
/// extended header's CRC are accepted.
///
/// # Errors
///
/// Returns [`Error::InvalidSyncCode`] if any byte has its top bit set,
/// or if the decoded value does not fit in a `u32`.
///
/// # Example
/// ```
/// use id3_codec::unsync::decode_syncsafe;
///
/// assert_eq!(decode_syncsafe(&[0x00, 0x00, 0x02, 0x01]).unwrap(), 0x101);
/// assert!(decode_syncsafe(&[0x80, 0x00, 0x00, 0x00]).is_err());
/// ```
pub fn decode_syncsafe(bytes: &[u8]) -> Result<u32, Error> {
    let mut r = BitReader::endian(bytes, BigEndian);
    let mut value: u64 = 0;

    for _ in 0..bytes.len() {
        if r.read_bit()? {
            return Err(Error::InvalidSyncCode);
        }
        value = (value << 7) | u64::from(r.read::<7, u8>()?);
    }

    value.try_into().map_err(|_| Error::InvalidSyncCode)
}

/// Encodes a value as a big-endian sync-safe integer into the given bytes
///
/// The output slice's length selects the form: 4 bytes hold 28 bits,
/// 5 bytes hold 35 bits.
///
/// # Errors
///
/// Returns [`Error::InvalidSyncCode`] if the value does not fit
/// in 7 bits per output byte.
///
/// # Example
/// ```
/// use id3_codec::unsync::encode_syncsafe;
///
/// let mut bytes = [0; 4];
/// encode_syncsafe(0x101, &mut bytes).unwrap();
/// assert_eq!(bytes, [0x00, 0x00, 0x02, 0x01]);
/// assert!(encode_syncsafe(1 << 28, &mut bytes).is_err());
/// ```
pub fn encode_syncsafe(value: u32, bytes: &mut [u8]) -> Result<(), Error> {
    let bits = bytes.len() as u32 * 7;
    if bits < u64::BITS && u64::from(value) >= (1 << bits) {
        return Err(Error::InvalidSyncCode);
    }

    let len = bytes.len();
    let mut w = BitWriter::endian(bytes, BigEndian);
    for i in (0..len).rev() {
        w.write_bit(false)?;
        w.write::<7, u8>(((value >> (i * 7)) & 0x7F) as u8)?;
    }
    Ok(())
}

/// Reverses the unsynchronization transform
///
/// Whenever two consecutive input bytes are `FF 00`, only the `FF`
/// is emitted and the stuffed `00` is dropped.
pub fn remove_unsync(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());

    let mut i = 0;
    while i < input.len() {
        let b = input[i];
        output.push(b);
        i += 1;
        if b == 0xFF && input.get(i) == Some(&0x00) {
            i += 1;
        }
    }

    output
}

/// Applies the unsynchronization transform
///
/// A `00` byte is stuffed after every `FF` whose successor has its top
/// bit set, is itself `00`, or does not exist, so that the output
/// contains no false MPEG sync pattern and no ambiguous `FF 00` pair.
/// [`remove_unsync`] inverts this exactly.
///
/// # Example
/// ```
/// use id3_codec::unsync::{add_unsync, remove_unsync};
///
/// let stuffed = add_unsync(&[0x12, 0xFF, 0xE0]);
/// assert_eq!(stuffed, [0x12, 0xFF, 0x00, 0xE0]);
/// assert_eq!(remove_unsync(&stuffed), [0x12, 0xFF, 0xE0]);
/// ```
pub fn add_unsync(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());

    for (i, &b) in input.iter().enumerate() {
        output.push(b);
        if b == 0xFF
            && input
                .get(i + 1)
                .is_none_or(|next| *next & 0x80 != 0 || *next == 0x00)
        {
            output.push(0x00);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syncsafe_roundtrip() {
        for value in [0, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x101, (1 << 28) - 1] {
            let mut bytes = [0; 4];
            encode_syncsafe(value, &mut bytes).unwrap();
            assert!(bytes.iter().all(|b| b & 0x80 == 0));
            assert_eq!(decode_syncsafe(&bytes).unwrap(), value);
        }

        // 35-bit form used for the extended header CRC
        for value in [0, 0xDEADBEEF, u32::MAX] {
            let mut bytes = [0; 5];
            encode_syncsafe(value, &mut bytes).unwrap();
            assert!(bytes.iter().all(|b| b & 0x80 == 0));
            assert_eq!(decode_syncsafe(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_syncsafe_rejects() {
        assert!(matches!(
            encode_syncsafe(1 << 28, &mut [0; 4]),
            Err(Error::InvalidSyncCode)
        ));
        assert!(matches!(
            encode_syncsafe(u32::MAX, &mut [0; 4]),
            Err(Error::InvalidSyncCode)
        ));

        for bytes in [
            [0x80, 0x00, 0x00, 0x00],
            [0x00, 0xFF, 0x00, 0x00],
            [0x00, 0x00, 0x00, 0x80],
        ] {
            assert!(matches!(
                decode_syncsafe(&bytes),
                Err(Error::InvalidSyncCode)
            ));
        }
    }

    #[test]
    fn test_unsync_roundtrip() {
        let cases: &[&[u8]] = &[
            &[],
            &[0x00],
            &[0xFF],
            &[0xFF, 0x00],
            &[0xFF, 0xE0],
            &[0xFF, 0xFF, 0xFF],
            &[0xFF, 0x00, 0xE0],
            &[0x01, 0x02, 0x03],
            &[0xFF, 0x7F, 0xFF, 0x80, 0xFF],
        ];

        for case in cases {
            let stuffed = add_unsync(case);

            // no sync pattern may survive stuffing
            assert!(
                !stuffed
                    .windows(2)
                    .any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0)
            );

            assert_eq!(&remove_unsync(&stuffed), case);
        }
    }

    #[test]
    fn test_add_unsync() {
        assert_eq!(add_unsync(&[0xFF, 0xE0]), [0xFF, 0x00, 0xE0]);
        assert_eq!(add_unsync(&[0xFF, 0x7F]), [0xFF, 0x7F]);
        assert_eq!(add_unsync(&[0xFF]), [0xFF, 0x00]);
        assert_eq!(add_unsync(&[0xFF, 0x00]), [0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_remove_unsync() {
        assert_eq!(remove_unsync(&[0xFF, 0x00, 0xE0]), [0xFF, 0xE0]);
        assert_eq!(remove_unsync(&[0xFF, 0x00, 0x00]), [0xFF, 0x00]);
        assert_eq!(remove_unsync(&[0x00, 0xFF]), [0x00, 0xFF]);
    }
}
