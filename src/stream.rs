// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pull-mode scanning over a loaded tag region, and a staging
//! writer with back-patchable windows
//!
//! Many ID3v2 size fields cover regions whose lengths are unknown
//! until the region has been produced, and two of its transforms
//! (unsynchronization and frame compression) rewrite whole regions
//! in place. Both sides therefore work over contiguous byte buffers
//! rather than streaming through the underlying source or sink.

use crate::Error;
use crate::text::{self, Encoding};

/// A bounded cursor over one region of tag data
///
/// A tag-level scanner covers the whole payload after the 10-byte
/// header; [`Scanner::consume_scanner`] carves bounded sub-scanners
/// for individual frames. Every consuming operation fails with
/// [`Error::IncompleteFrame`] once the region is exhausted.
pub(crate) struct Scanner {
    buf: Vec<u8>,
    pos: usize,
}

impl Scanner {
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of unconsumed bytes remaining
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// View of the unconsumed region, without consuming it
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub fn consume_byte(&mut self) -> Result<u8, Error> {
        let b = *self.bytes().first().ok_or(Error::IncompleteFrame)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn consume_bytes(&mut self, n: usize) -> Result<&[u8], Error> {
        if self.remaining() < n {
            return Err(Error::IncompleteFrame);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    pub fn consume_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        self.consume_bytes(N)
            .map(|bytes| bytes.try_into().unwrap_or([0; N]))
    }

    /// Consumes and returns everything left in the region
    pub fn consume_all(&mut self) -> &[u8] {
        let start = self.pos;
        self.pos = self.buf.len();
        &self.buf[start..]
    }

    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        self.consume_bytes(n).map(|_| ())
    }

    /// Carves the next `n` bytes off into a bounded sub-scanner
    pub fn consume_scanner(&mut self, n: usize) -> Result<Scanner, Error> {
        self.consume_bytes(n).map(|bytes| Scanner::new(bytes.to_vec()))
    }

    /// Substitutes the unconsumed region, used after removing
    /// unsynchronization codes
    pub fn replace(&mut self, buf: Vec<u8>) {
        self.buf = buf;
        self.pos = 0;
    }

    /// Consumes a fixed-length ISO-8859-1 string with no terminator,
    /// such as a 3-byte language tag
    pub fn consume_fixed_string(&mut self, n: usize) -> Result<String, Error> {
        self.consume_bytes(n)
            .and_then(|bytes| text::decode_string(bytes, Encoding::Iso8859_1))
    }

    /// Consumes the next string in the given encoding
    ///
    /// Consumes up to and including the encoding's terminator if one
    /// is present, or the rest of the region if not.
    pub fn consume_string(&mut self, encoding: Encoding) -> Result<String, Error> {
        let start = self.pos;
        let (end, next) = match text::find_terminator(self.bytes(), encoding) {
            Some(i) => (start + i, start + i + encoding.terminator_len()),
            None => (self.buf.len(), self.buf.len()),
        };
        let s = text::decode_string(&self.buf[start..end], encoding)?;
        self.pos = next;
        Ok(s)
    }

    /// Consumes the remainder of the region as encoded strings
    ///
    /// When `multi` is set the region is split on the encoding's
    /// terminator; otherwise it holds a single string and anything
    /// after its terminator is discarded.
    pub fn consume_string_list(
        &mut self,
        encoding: Encoding,
        multi: bool,
    ) -> Result<Vec<String>, Error> {
        if multi {
            let mut strings = Vec::new();
            while self.remaining() > 0 {
                strings.push(self.consume_string(encoding)?);
            }
            Ok(strings)
        } else {
            let s = self.consume_string(encoding)?;
            self.consume_all();
            Ok(vec![s])
        }
    }
}

/// A grow-only staging buffer for one encoded tag
///
/// Sizes, CRCs and data-length fields are written as placeholders
/// and back-patched through [`Writer::slice_mut`] once the regions
/// they cover are staged; [`Writer::split_off`] lifts a staged tail
/// back out for in-place transforms like unsynchronization.
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Number of bytes staged so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn store_byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn store_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Mutable window over staged bytes, for back-patching
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.buf[offset..offset + len]
    }

    /// View of staged bytes from the given offset onward
    pub fn bytes_from(&self, offset: usize) -> &[u8] {
        &self.buf[offset..]
    }

    /// Removes and returns everything staged at or after `offset`
    pub fn split_off(&mut self, offset: usize) -> Vec<u8> {
        self.buf.split_off(offset)
    }

    /// Flushes the staged buffer to the given sink
    pub fn save<W: std::io::Write>(&self, sink: &mut W) -> Result<u64, Error> {
        sink.write_all(&self.buf)?;
        Ok(self.buf.len() as u64)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}
