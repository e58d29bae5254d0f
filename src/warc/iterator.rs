//! [ArchiveIterator]: a fault-tolerant, filtering reader over a sequence of
//! WARC records.
use std::io::{BufRead, BufReader, Read};

use crate::compress::Decompressor;
use crate::header::{HeaderMap, HeaderParser};
use crate::io::BufReadMoreExt;

use super::header::HeaderMapExt;
use super::record::Record;
use super::record_type::{type_matches_filter, RecordType, ANY_TYPE};
use super::WARCError;

/// Default cap on the size of a single header line or block read while
/// scanning a record, mirroring the default used by the HTTP message reader.
const DEFAULT_HEADER_LIMIT: u64 = 1024 * 1024;

/// Bound on how many bytes [ArchiveIterator] scans, past a malformed record,
/// looking for the next `WARC/` boundary before giving up and treating the
/// stream as exhausted.
const DEFAULT_RESYNC_LIMIT: u64 = 64 * 1024 * 1024;

/// Iterates over the records of a WARC file, one at a time.
///
/// Unlike [WARCReader](super::WARCReader), `ArchiveIterator` never panics on
/// malformed input: a record with an unparsable header block, or a missing
/// or non-numeric `Content-Length`, is skipped, and the iterator resumes
/// scanning forward for the next line beginning with `WARC/`. A record whose
/// body is truncated by an early end of stream ends iteration without an
/// error, since that is indistinguishable from a complete, compliant file
/// when reading a live/partial capture.
///
/// Advancing the iterator (calling [Self::next_record] again) implicitly
/// drains whatever of the previous record's block was left unread, plus its
/// two-CRLF terminator, before scanning for the next record. This is what
/// lets each yielded [Record] borrow the iterator's underlying stream for
/// its block reader: the borrow checker enforces that a `Record` cannot
/// outlive the call that produced it, matching the fact that reading past
/// it silently discards whatever of its block was unread.
pub struct ArchiveIterator<'a, S: Read> {
    stream: Option<BufReader<Decompressor<'a, S>>>,
    record_type_filter: u16,
    parse_http: bool,
    header_limit: u64,
    resync_limit: u64,
    file_offset: u64,
    pending_body_remainder: u64,
    pending_terminator: bool,
    finished: bool,
}

impl<'a, S: Read> ArchiveIterator<'a, S> {
    /// Creates an `ArchiveIterator` over `stream`, auto-detecting gzip or
    /// zstd compression (or treating the stream as uncompressed WARC if
    /// neither magic is present).
    ///
    /// By default every record type is yielded and embedded HTTP headers are
    /// not eagerly parsed; use [Self::with_record_type_filter] and
    /// [Self::with_parse_http] to change either.
    pub fn new(stream: S) -> Result<Self, WARCError> {
        Ok(Self {
            stream: Some(BufReader::new(Decompressor::new_allow_unknown(stream)?)),
            record_type_filter: ANY_TYPE,
            parse_http: false,
            header_limit: DEFAULT_HEADER_LIMIT,
            resync_limit: DEFAULT_RESYNC_LIMIT,
            file_offset: 0,
            pending_body_remainder: 0,
            pending_terminator: false,
            finished: false,
        })
    }

    /// Restricts iteration to record types selected by `filter`, a bitmask
    /// built from [RecordType::bit] (see [super::ANY_TYPE] / [super::NO_TYPE]).
    ///
    /// Filtered-out records are still scanned and skipped, not yielded.
    pub fn with_record_type_filter(mut self, filter: u16) -> Self {
        self.record_type_filter = filter;
        self
    }

    /// Sets whether HTTP-bearing records have their embedded status line and
    /// headers eagerly parsed via [Record::parse_http] before being yielded.
    pub fn with_parse_http(mut self, parse_http: bool) -> Self {
        self.parse_http = parse_http;
        self
    }

    /// Sets the maximum size of a single header line, in bytes, before it is
    /// treated as malformed.
    pub fn with_header_limit(mut self, header_limit: u64) -> Self {
        self.header_limit = header_limit;
        self
    }

    /// Number of bytes read so far from the decompressed stream.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Reads the next record matching the configured type filter.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, whether cleanly (at
    /// a natural end of file) or because the stream was truncated or ran out
    /// of resynchronization budget after a malformed record.
    ///
    /// The returned [Record] borrows this iterator; it must be dropped (or
    /// go out of scope) before calling `next_record` again.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>, WARCError> {
        loop {
            if self.finished {
                return Ok(None);
            }

            self.drain_pending()?;

            if self.finished {
                return Ok(None);
            }

            let Some(version) = self.seek_boundary()? else {
                self.finished = true;
                return Ok(None);
            };

            match self.read_headers()? {
                Some((headers, content_length)) => {
                    self.pending_body_remainder = content_length;
                    self.pending_terminator = true;

                    let record_type =
                        RecordType::from_tag(headers.get_str("WARC-Type").unwrap_or(""));

                    if !type_matches_filter(self.record_type_filter, record_type) {
                        tracing::debug!(?record_type, "next_record: filtered out, skipping");
                        continue;
                    }

                    let stream: &mut dyn BufRead = self.stream.as_mut().unwrap();
                    let remaining: &mut u64 = &mut self.pending_body_remainder;
                    let body = Box::new(BoundedReader { stream, remaining });

                    let mut record = Record::from_parsed(version, headers, content_length, body);

                    if self.parse_http && record.is_http() {
                        record.parse_http()?;
                    }

                    return Ok(Some(record));
                }
                None => {
                    tracing::debug!("next_record: malformed header block, resynchronizing");
                    continue;
                }
            }
        }
    }

    /// Drains whatever remains of the previous record's block and its
    /// two-CRLF terminator.
    fn drain_pending(&mut self) -> Result<(), WARCError> {
        if self.pending_body_remainder > 0 {
            let expected = self.pending_body_remainder;
            let stream = self.stream.as_mut().unwrap();
            let n = std::io::copy(&mut stream.take(expected), &mut std::io::sink())?;
            self.file_offset += n;
            self.pending_body_remainder = 0;

            if n < expected {
                self.finished = true;
                return Ok(());
            }
        }

        if self.pending_terminator {
            self.pending_terminator = false;

            for _ in 0..2 {
                let mut line = Vec::new();
                let stream = self.stream.as_mut().unwrap();
                let n = stream.read_limit_until(b'\n', &mut line, self.header_limit)?;
                self.file_offset += n as u64;

                if line.is_empty() {
                    self.finished = true;
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Scans forward, line by line, until finding one beginning with
    /// `WARC/`, returning its trimmed text. Blank lines between records are
    /// silently consumed. Returns `None` on a clean EOF or once
    /// [Self::resync_limit] bytes have been scanned without a match.
    fn seek_boundary(&mut self) -> Result<Option<String>, WARCError> {
        let mut scanned = 0u64;

        loop {
            let mut line = Vec::new();
            let stream = self.stream.as_mut().unwrap();
            let n = stream.read_limit_until(b'\n', &mut line, self.header_limit)?;
            self.file_offset += n as u64;

            if line.is_empty() {
                return Ok(None);
            }

            if line.starts_with(b"WARC/") {
                let text = String::from_utf8_lossy(&line).trim().to_string();
                return Ok(Some(text));
            }

            scanned += n as u64;
            if scanned > self.resync_limit {
                return Ok(None);
            }
        }
    }

    /// Reads header lines up to the blank line terminating the header block
    /// and parses them, along with `Content-Length`.
    ///
    /// Returns `Ok(None)` (never an error) when the header block cannot be
    /// parsed, or `Content-Length` is missing or non-numeric: both cases are
    /// a request to resynchronize rather than a fatal error.
    fn read_headers(&mut self) -> Result<Option<(HeaderMap, u64)>, WARCError> {
        let mut header_buf = Vec::new();

        loop {
            let mut line = Vec::new();
            let stream = self.stream.as_mut().unwrap();
            let n = stream.read_limit_until(b'\n', &mut line, self.header_limit)?;
            self.file_offset += n as u64;

            if line.is_empty() {
                return Ok(None);
            }

            if is_blank_line(&line) {
                break;
            }

            header_buf.extend_from_slice(&line);
        }

        let headers = match HeaderParser::new().parse_header(&header_buf) {
            Ok(headers) => headers,
            Err(_) => return Ok(None),
        };

        match headers.get_parsed_required::<u64>("Content-Length") {
            Ok(content_length) => Ok(Some((headers, content_length))),
            Err(_) => Ok(None),
        }
    }
}

fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Adapts a shared `&mut dyn BufRead` into a view bounded by a remaining
/// byte count that lives in the owning [ArchiveIterator], so that the count
/// still reflects reality after the `Record` that wraps this reader is
/// dropped without being fully read.
struct BoundedReader<'b> {
    stream: &'b mut dyn BufRead,
    remaining: &'b mut u64,
}

impl<'b> Read for BoundedReader<'b> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if *self.remaining == 0 {
            return Ok(0);
        }

        let max = buf.len().min(*self.remaining as usize);
        let n = self.stream.read(&mut buf[..max])?;
        *self.remaining -= n as u64;
        Ok(n)
    }
}

impl<'b> BufRead for BoundedReader<'b> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        if *self.remaining == 0 {
            return Ok(&[]);
        }

        let buf = self.stream.fill_buf()?;
        let max = buf.len().min(*self.remaining as usize);
        Ok(&buf[..max])
    }

    fn consume(&mut self, amt: usize) {
        self.stream.consume(amt);
        *self.remaining -= amt as u64;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn record_bytes(warc_type: &str, content_type: Option<&str>, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"WARC/1.1\r\n");
        out.extend_from_slice(format!("WARC-Type: {}\r\n", warc_type).as_bytes());
        out.extend_from_slice(b"WARC-Record-ID: <urn:uuid:11111111-1111-7111-8111-111111111111>\r\n");
        out.extend_from_slice(b"WARC-Date: 2020-01-01T00:00:00Z\r\n");
        if let Some(content_type) = content_type {
            out.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n\r\n");
        out
    }

    #[test]
    fn test_reads_single_record() {
        let data = record_bytes("warcinfo", None, b"hello");
        let mut iter = ArchiveIterator::new(Cursor::new(data)).unwrap();

        let mut record = iter.next_record().unwrap().unwrap();
        assert_eq!(record.record_type(), RecordType::Warcinfo);

        let mut buf = Vec::new();
        record.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");

        drop(record);
        assert!(iter.next_record().unwrap().is_none());
    }

    #[test]
    fn test_two_concatenated_records() {
        let mut data = record_bytes("warcinfo", None, b"one");
        data.extend(record_bytes("resource", None, b"two"));

        let mut iter = ArchiveIterator::new(Cursor::new(data)).unwrap();

        let mut first = iter.next_record().unwrap().unwrap();
        let mut buf = Vec::new();
        first.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"one");
        drop(first);

        let mut second = iter.next_record().unwrap().unwrap();
        let mut buf = Vec::new();
        second.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"two");
        drop(second);

        assert!(iter.next_record().unwrap().is_none());
    }

    #[test]
    fn test_advancing_without_reading_drains_body() {
        let mut data = record_bytes("warcinfo", None, b"unread payload");
        data.extend(record_bytes("resource", None, b"next"));

        let mut iter = ArchiveIterator::new(Cursor::new(data)).unwrap();

        let first = iter.next_record().unwrap().unwrap();
        drop(first);

        let mut second = iter.next_record().unwrap().unwrap();
        let mut buf = Vec::new();
        second.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"next");
    }

    #[test]
    fn test_skips_corrupted_record_and_resyncs() {
        let mut data =
            b"WARC/1.1\r\nThis is not a valid header line\r\n\r\ngarbage body without framing\n"
                .to_vec();
        data.extend(record_bytes("resource", None, b"recovered"));

        let mut iter = ArchiveIterator::new(Cursor::new(data)).unwrap();

        let mut record = iter.next_record().unwrap().unwrap();
        assert_eq!(record.record_type(), RecordType::Resource);

        let mut buf = Vec::new();
        record.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"recovered");
    }

    #[test]
    fn test_truncated_stream_ends_iteration_without_error() {
        let mut data = record_bytes("warcinfo", None, b"full record");
        data.extend(record_bytes("resource", None, b"truncated body and more"));
        data.truncate(data.len() - 10);

        let mut iter = ArchiveIterator::new(Cursor::new(data)).unwrap();

        let first = iter.next_record().unwrap().unwrap();
        drop(first);

        let second = iter.next_record().unwrap();
        if let Some(mut record) = second {
            let mut buf = Vec::new();
            assert!(record.read_to_end(&mut buf).is_ok());
        }

        assert!(iter.next_record().unwrap().is_none());
    }

    #[test]
    fn test_record_type_filter() {
        let mut data = record_bytes("warcinfo", None, b"info");
        data.extend(record_bytes("resource", None, b"resource body"));

        let mut iter = ArchiveIterator::new(Cursor::new(data))
            .unwrap()
            .with_record_type_filter(RecordType::Resource.bit());

        let mut record = iter.next_record().unwrap().unwrap();
        assert_eq!(record.record_type(), RecordType::Resource);

        let mut buf = Vec::new();
        record.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"resource body");

        drop(record);
        assert!(iter.next_record().unwrap().is_none());
    }

    #[test]
    fn test_eager_http_parsing() {
        let http_body = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nbody text";
        let data = record_bytes("response", Some("application/http; msgtype=response"), http_body);

        let mut iter = ArchiveIterator::new(Cursor::new(data))
            .unwrap()
            .with_parse_http(true);

        let mut record = iter.next_record().unwrap().unwrap();
        assert!(record.http_parsed());
        assert_eq!(record.http_status_line(), Some("HTTP/1.1 200 OK"));

        let mut buf = Vec::new();
        record.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"body text");
    }
}
