//! The [Record] type: a single WARC record with lazily-parsed HTTP headers
//! and a bounded, forward-only view of its block.
use std::io::{BufRead, Read, Write};

use crate::header::{HeaderFormatter, HeaderMap, HeaderParser};
use crate::io::BufReadMoreExt;

use super::digest::{verify_base32_digest, DigestEngine};
use super::header::HeaderMapExt;
use super::record_type::RecordType;
use super::WARCError;

/// Default WARC version written by [Record::init_headers].
pub const DEFAULT_VERSION: &str = "WARC/1.1";

/// Default chunk size used by [Record::write] when streaming the block
/// without buffering it for a digest.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Maximum size of an embedded HTTP status line or header block read by
/// [Record::parse_http].
const HTTP_HEADER_LIMIT: u64 = 1024 * 1024;

/// A single WARC record.
///
/// `Record` is produced one of two ways:
///
/// - by [ArchiveIterator::next_record](super::ArchiveIterator::next_record),
///   which borrows the iterator's underlying stream for the block reader
///   (construction path A); or
/// - by [Record::new] followed by [Record::init_headers] and
///   [Record::set_bytes_content], for building a record to hand to
///   [Record::write] (construction path B).
///
/// The block is exposed as a `Read + BufRead` through the `Record` itself:
/// reading from it advances a cursor bounded by `Content-Length` and never
/// reads past the end of the block, regardless of how many bytes remain in
/// the underlying stream.
pub struct Record<'b> {
    version: String,
    record_type: RecordType,
    headers: HeaderMap,
    is_http: bool,
    http_parsed: bool,
    http_status_line: Option<String>,
    http_headers: Option<HeaderMap>,
    content_length: u64,
    payload_attached: bool,
    body: Box<dyn BufRead + 'b>,
}

impl Record<'static> {
    /// Creates an empty record for construction path B.
    ///
    /// Call [Self::init_headers] and [Self::set_bytes_content] before
    /// [Self::write].
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            record_type: RecordType::Unknown,
            headers: HeaderMap::new(),
            is_http: false,
            http_parsed: false,
            http_status_line: None,
            http_headers: None,
            content_length: 0,
            payload_attached: false,
            body: Box::new(std::io::empty()),
        }
    }
}

impl Default for Record<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b> Record<'b> {
    /// Constructs a record from an already-parsed header block and a bounded
    /// body reader, used by [ArchiveIterator::next_record](super::ArchiveIterator::next_record).
    pub(crate) fn from_parsed(
        version: String,
        headers: HeaderMap,
        content_length: u64,
        body: Box<dyn BufRead + 'b>,
    ) -> Self {
        let record_type = RecordType::from_tag(headers.get_str("WARC-Type").unwrap_or(""));
        let is_http = is_http_content_type(&headers);

        Self {
            version,
            record_type,
            headers,
            is_http,
            http_parsed: false,
            http_status_line: None,
            http_headers: None,
            content_length,
            payload_attached: true,
            body,
        }
    }

    /// Populates the canonical required WARC header fields: `WARC-Type`,
    /// `WARC-Record-ID`, `WARC-Date`, and `Content-Length`.
    ///
    /// `record_id` overrides the generated `WARC-Record-ID` value; when
    /// `None`, a fresh UUIDv7 URN is generated.
    pub fn init_headers(
        &mut self,
        content_length: u64,
        record_type: RecordType,
        record_id: Option<String>,
    ) -> &mut Self {
        self.version = DEFAULT_VERSION.to_string();
        self.record_type = record_type;
        self.content_length = content_length;
        self.headers = HeaderMap::new();

        self.headers
            .insert("WARC-Type", record_type.tag().unwrap_or("unknown"));

        let urn = record_id.unwrap_or_else(|| format!("<urn:uuid:{}>", crate::uuid::new_v7()));
        self.headers.insert("WARC-Record-ID", urn);

        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        self.headers.insert("WARC-Date", date);

        self.headers
            .insert("Content-Length", content_length.to_string());

        self
    }

    /// Attaches an in-memory payload, updating `Content-Length` and the
    /// `is_http` classification to match.
    pub fn set_bytes_content(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.content_length = bytes.len() as u64;
        self.headers
            .insert("Content-Length", self.content_length.to_string());
        self.is_http = is_http_content_type(&self.headers);
        self.http_parsed = false;
        self.http_status_line = None;
        self.http_headers = None;
        self.payload_attached = true;
        self.body = Box::new(std::io::Cursor::new(bytes));

        self
    }

    /// Returns the record type derived from `WARC-Type`.
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// Returns the WARC version line text, e.g. `"WARC/1.1"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the record's WARC header fields.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable view of the record's WARC header fields.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the `Content-Length` of the record's block.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Returns whether the record's `Content-Type` indicates an embedded
    /// HTTP message (`application/http`).
    pub fn is_http(&self) -> bool {
        self.is_http
    }

    /// Returns whether [Self::parse_http] has already run.
    pub fn http_parsed(&self) -> bool {
        self.http_parsed
    }

    /// Returns the parsed HTTP status/request line, if [Self::parse_http]
    /// has run.
    pub fn http_status_line(&self) -> Option<&str> {
        self.http_status_line.as_deref()
    }

    /// Returns the parsed HTTP headers, if [Self::parse_http] has run.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        self.http_headers.as_ref()
    }

    /// Parses the embedded HTTP status/request line and header block from
    /// the front of the block, leaving the block positioned at the start of
    /// the HTTP entity body.
    ///
    /// Idempotent: calling this a second time is a no-op. Returns
    /// [WARCError::UsageError] if the record is not HTTP-bearing
    /// ([Self::is_http] is false).
    pub fn parse_http(&mut self) -> Result<(), WARCError> {
        if !self.is_http {
            return Err(WARCError::UsageError {
                message: "parse_http called on a record whose Content-Type is not application/http"
                    .to_string(),
            });
        }

        if self.http_parsed {
            return Ok(());
        }

        let mut status_line_buf = Vec::new();
        self.body
            .read_limit_until(b'\n', &mut status_line_buf, HTTP_HEADER_LIMIT)?;
        let status_line = String::from_utf8_lossy(&status_line_buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        let mut header_buf = Vec::new();
        loop {
            let mut line = Vec::new();
            let n = self
                .body
                .read_limit_until(b'\n', &mut line, HTTP_HEADER_LIMIT)?;

            if n == 0 || is_blank_line(&line) {
                break;
            }

            header_buf.extend_from_slice(&line);
        }

        let headers = HeaderParser::new().parse_header(&header_buf).map_err(|error| {
            WARCError::MalformedHeader {
                offset: 0,
                source: Some(Box::new(error)),
            }
        })?;

        self.http_status_line = Some(status_line);
        self.http_headers = Some(headers);
        self.http_parsed = true;

        Ok(())
    }

    /// Reads and digests the remainder of the block, comparing it against
    /// the `WARC-Block-Digest` header.
    ///
    /// Destructive: this consumes whatever is left of the block reader. If
    /// [Self::parse_http] already ran, only the bytes after the HTTP header
    /// block are hashed. Returns `false` (not an error) if the header is
    /// missing or names an algorithm other than `sha1`.
    pub fn verify_block_digest(&mut self) -> Result<bool, WARCError> {
        let header_value = self.headers.get_str("WARC-Block-Digest").map(str::to_string);
        let computed = self.digest_remaining()?;

        Ok(verify_base32_digest(header_value.as_deref(), &computed))
    }

    /// Ensures [Self::parse_http] has run, then reads and digests the HTTP
    /// entity body, comparing it against the `WARC-Payload-Digest` header.
    ///
    /// Destructive in the same way as [Self::verify_block_digest]. Returns
    /// [WARCError::UsageError] if the record is not HTTP-bearing.
    pub fn verify_payload_digest(&mut self) -> Result<bool, WARCError> {
        if !self.is_http {
            return Err(WARCError::UsageError {
                message: "verify_payload_digest called on a record whose Content-Type is not application/http"
                    .to_string(),
            });
        }

        self.parse_http()?;

        let header_value = self
            .headers
            .get_str("WARC-Payload-Digest")
            .map(str::to_string);
        let computed = self.digest_remaining()?;

        Ok(verify_base32_digest(header_value.as_deref(), &computed))
    }

    fn digest_remaining(&mut self) -> Result<Vec<u8>, WARCError> {
        let mut engine = DigestEngine::sha1();
        let mut buf = [0u8; 8192];

        loop {
            let n = self.body.read(&mut buf)?;
            if n == 0 {
                break;
            }
            engine.update(&buf[..n]);
        }

        Ok(engine.finalize())
    }

    /// Writes the record's version line, headers, and block to `out`,
    /// followed by the mandatory two-CRLF record terminator. Returns the
    /// number of bytes written.
    ///
    /// When `checksum_data` is true, the block is buffered in memory so that
    /// `WARC-Block-Digest` (and, for HTTP-bearing records, `WARC-Payload-Digest`)
    /// can be computed and inserted before the header block is serialized,
    /// and `Content-Length` is recomputed from the buffered length. When
    /// false, the block is streamed through in chunks of `chunk_size` bytes
    /// without buffering or digesting it, and `Content-Length` must already
    /// be correct.
    ///
    /// Returns [WARCError::UsageError] if no payload has been attached via
    /// construction path A or [Self::set_bytes_content].
    pub fn write<W: Write>(
        &mut self,
        mut out: W,
        checksum_data: bool,
        chunk_size: usize,
    ) -> Result<u64, WARCError> {
        if !self.payload_attached {
            return Err(WARCError::UsageError {
                message: "write called on a record with no payload attached".to_string(),
            });
        }

        let mut total = 0u64;

        if checksum_data {
            let mut buf = Vec::new();
            self.body.read_to_end(&mut buf)?;

            let mut block_engine = DigestEngine::sha1();
            block_engine.update(&buf);
            self.headers.insert(
                "WARC-Block-Digest",
                format!("sha1:{}", block_engine.finalize_base32()),
            );

            if self.is_http {
                if let Some(offset) = find_http_body_offset(&buf) {
                    let mut payload_engine = DigestEngine::sha1();
                    payload_engine.update(&buf[offset..]);
                    self.headers.insert(
                        "WARC-Payload-Digest",
                        format!("sha1:{}", payload_engine.finalize_base32()),
                    );
                }
            }

            self.content_length = buf.len() as u64;
            self.headers
                .insert("Content-Length", self.content_length.to_string());

            total += self.write_header_block(&mut out)?;
            out.write_all(&buf)?;
            total += buf.len() as u64;
        } else {
            total += self.write_header_block(&mut out)?;

            let mut chunk = vec![0u8; chunk_size.max(1)];
            loop {
                let n = self.body.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                out.write_all(&chunk[..n])?;
                total += n as u64;
            }
        }

        out.write_all(b"\r\n\r\n")?;
        total += 4;

        Ok(total)
    }

    fn write_header_block<W: Write>(&self, mut out: W) -> Result<u64, WARCError> {
        let mut total = 0u64;

        out.write_all(self.version.as_bytes())?;
        out.write_all(b"\r\n")?;
        total += self.version.len() as u64 + 2;

        let formatted = HeaderFormatter::new()
            .format_header(&self.headers, &mut out)
            .map_err(|error| WARCError::MalformedHeader {
                offset: 0,
                source: Some(Box::new(error)),
            })?;
        total += formatted as u64;

        out.write_all(b"\r\n")?;
        total += 2;

        Ok(total)
    }
}

impl<'b> Read for Record<'b> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.body.read(buf)
    }
}

impl<'b> BufRead for Record<'b> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.body.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.body.consume(amt)
    }
}

fn is_http_content_type(headers: &HeaderMap) -> bool {
    headers
        .get_str("Content-Type")
        .map(|value| value.to_ascii_lowercase().starts_with("application/http"))
        .unwrap_or(false)
}

fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Finds the offset of the HTTP entity body within a buffered HTTP message,
/// i.e. the byte after the first blank line.
fn find_http_body_offset(buf: &[u8]) -> Option<usize> {
    if let Some(pos) = find_subslice(buf, b"\r\n\r\n") {
        return Some(pos + 4);
    }
    find_subslice(buf, b"\n\n").map(|pos| pos + 2)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_headers_and_set_bytes_content() {
        let mut record = Record::new();
        record.init_headers(0, RecordType::Warcinfo, None);
        record.set_bytes_content(b"hello".to_vec());

        assert_eq!(record.record_type(), RecordType::Warcinfo);
        assert_eq!(record.content_length(), 5);
        assert_eq!(record.headers().get_str("WARC-Type"), Some("warcinfo"));
        assert!(record.headers().contains_key("WARC-Record-ID"));
        assert!(record.headers().contains_key("WARC-Date"));
    }

    #[test]
    fn test_write_without_checksum() {
        let mut record = Record::new();
        record.init_headers(5, RecordType::Resource, Some("<urn:uuid:test>".to_string()));
        record.set_bytes_content(b"hello".to_vec());

        let mut out = Vec::new();
        let n = record.write(&mut out, false, DEFAULT_CHUNK_SIZE).unwrap();

        assert_eq!(n as usize, out.len());
        assert!(out.starts_with(b"WARC/1.1\r\n"));
        assert!(out.ends_with(b"hello\r\n\r\n"));
    }

    #[test]
    fn test_write_with_checksum_sets_block_digest() {
        let mut record = Record::new();
        record.init_headers(0, RecordType::Resource, Some("<urn:uuid:test>".to_string()));
        record.set_bytes_content(b"hello".to_vec());

        let mut out = Vec::new();
        record.write(&mut out, true, DEFAULT_CHUNK_SIZE).unwrap();

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("WARC-Block-Digest: sha1:"));
        assert!(text.contains("Content-Length: 5"));
    }

    #[test]
    fn test_write_without_payload_is_usage_error() {
        let mut record = Record::new();
        record.init_headers(0, RecordType::Resource, None);

        let mut out = Vec::new();
        let error = record.write(&mut out, false, DEFAULT_CHUNK_SIZE).unwrap_err();
        assert!(matches!(error, WARCError::UsageError { .. }));
    }

    #[test]
    fn test_parse_http_on_non_http_record_is_usage_error() {
        let mut record = Record::new();
        record.init_headers(0, RecordType::Resource, None);
        record.set_bytes_content(b"not http".to_vec());

        assert!(record.parse_http().is_err());
    }

    #[test]
    fn test_verify_block_digest_roundtrip() {
        let mut engine = DigestEngine::sha1();
        engine.update(b"hello");
        let digest = format!("sha1:{}", engine.finalize_base32());

        let mut record = Record::new();
        record.init_headers(5, RecordType::Resource, None);
        record
            .headers_mut()
            .insert("WARC-Block-Digest", digest);
        record.set_bytes_content(b"hello".to_vec());

        assert!(record.verify_block_digest().unwrap());
    }

    #[test]
    fn test_parse_http_and_verify_payload_digest() {
        let body = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\npayload bytes";
        let mut payload_engine = DigestEngine::sha1();
        payload_engine.update(b"payload bytes");
        let payload_digest = format!("sha1:{}", payload_engine.finalize_base32());

        let mut record = Record::new();
        record.init_headers(body.len() as u64, RecordType::Response, None);
        record
            .headers_mut()
            .insert("Content-Type", "application/http; msgtype=response");
        record
            .headers_mut()
            .insert("WARC-Payload-Digest", payload_digest);
        record.set_bytes_content(body.to_vec());

        record.parse_http().unwrap();
        assert_eq!(record.http_status_line(), Some("HTTP/1.1 200 OK"));
        assert!(record
            .http_headers()
            .unwrap()
            .get_str("Content-Type")
            .unwrap()
            .contains("text/plain"));

        assert!(record.verify_payload_digest().unwrap());
    }
}
