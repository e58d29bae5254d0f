//! Compression and decompression streams.

use std::io::{ErrorKind, Read};

use flate2::bufread::MultiGzDecoder;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::io::{ComboReader, PeekRead, SourceCountRead};

#[allow(clippy::large_enum_variant)]
enum Decoder<'a, S: Read> {
    Raw(ComboReader<S>),
    Gzip(MultiGzDecoder<ComboReader<S>>),
    Zstd(ZstdDecoder<'a, ComboReader<S>>),
}

impl<'a, S: Read> Decoder<'a, S> {
    fn name(&self) -> &'static str {
        match self {
            Decoder::Raw(_) => "raw",
            Decoder::Gzip(_) => "gzip",
            Decoder::Zstd(_) => "zstd",
        }
    }
}

/// Decompression of Gzip and Zstd files.
pub struct Decompressor<'a, S: Read> {
    decoder: Decoder<'a, S>,
}

impl<'a, S: Read> Decompressor<'a, S> {
    fn new_impl(stream: S, allow_unknown: bool) -> std::io::Result<Self> {
        let mut stream = ComboReader::new(stream);
        let magic_bytes = stream.peek(4)?.to_vec();

        tracing::debug!(?magic_bytes, "decompressor analysis");

        let decoder = match magic_bytes.as_slice() {
            [0x1f, 0x8b, ..] => Decoder::Gzip(MultiGzDecoder::new(stream)),
            [0x28, 0xb5, 0x2f, 0xfd, ..] | [0x37, 0xa4, 0x30, 0xec, ..] => {
                Decoder::Zstd(ZstdDecoder::with_buffer(stream)?)
            }
            _ => {
                if allow_unknown {
                    Decoder::Raw(stream)
                } else {
                    return Err(ErrorKind::InvalidData.into());
                }
            }
        };
        tracing::debug!(decoder = decoder.name(), "decoder select");

        Ok(Self { decoder })
    }

    /// Open a compressed file.
    ///
    /// Returns error for unsupported compression formats.
    pub fn new(stream: S) -> std::io::Result<Self> {
        Self::new_impl(stream, false)
    }

    /// Open a compressed file or contents unchanged for unsupported formats.
    pub fn new_allow_unknown(stream: S) -> std::io::Result<Self> {
        Self::new_impl(stream, true)
    }

    /// Returns a reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        match &self.decoder {
            Decoder::Raw(stream) => stream.get_ref(),
            Decoder::Gzip(stream) => stream.get_ref().get_ref(),
            Decoder::Zstd(stream) => stream.get_ref().get_ref(),
        }
    }

    /// Returns a mutable reference to the wrapped stream.
    pub fn get_mut(&mut self) -> &mut S {
        match &mut self.decoder {
            Decoder::Raw(stream) => stream.get_mut(),
            Decoder::Gzip(stream) => stream.get_mut().get_mut(),
            Decoder::Zstd(stream) => stream.get_mut().get_mut(),
        }
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> S {
        match self.decoder {
            Decoder::Raw(stream) => stream.into_inner(),
            Decoder::Gzip(stream) => stream.into_inner().into_inner(),
            Decoder::Zstd(stream) => stream.finish().into_inner(),
        }
    }

    /// Returns the number of bytes read from the wrapped stream.
    pub fn raw_input_read_count(&self) -> u64 {
        match &self.decoder {
            Decoder::Raw(stream) => stream.source_read_count(),
            Decoder::Gzip(stream) => stream.get_ref().source_read_count(),
            Decoder::Zstd(stream) => stream.get_ref().source_read_count(),
        }
    }
}

impl<'a, S: Read> Read for Decompressor<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.decoder {
            Decoder::Raw(stream) => stream.read(buf),
            Decoder::Gzip(stream) => stream.read(buf),
            Decoder::Zstd(stream) => stream.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_raw_passthrough_on_unrecognized_magic() {
        let mut decompressor =
            Decompressor::new_allow_unknown(Cursor::new(b"WARC/1.1\r\n".to_vec())).unwrap();

        let mut buf = Vec::new();
        decompressor.read_to_end(&mut buf).unwrap();

        assert_eq!(buf, b"WARC/1.1\r\n");
    }

    #[test]
    fn test_new_rejects_unrecognized_magic() {
        let result = Decompressor::new(Cursor::new(b"WARC/1.1\r\n".to_vec()));
        assert!(result.is_err());
    }

    #[test]
    fn test_short_input_passthrough() {
        let mut decompressor =
            Decompressor::new_allow_unknown(Cursor::new(b"ab".to_vec())).unwrap();

        let mut buf = Vec::new();
        decompressor.read_to_end(&mut buf).unwrap();

        assert_eq!(buf, b"ab");
    }
}
