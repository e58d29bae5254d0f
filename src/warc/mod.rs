//! WARC file processing.
//!
//! [ArchiveIterator] streams [Record]s out of a (optionally gzip/zstd
//! compressed) WARC file one at a time, skipping past malformed records to
//! resynchronize on the next `WARC/1.x` version line. Each [Record] borrows
//! from the iterator's underlying stream, exposes its header block through a
//! [crate::header::HeaderMap], and can verify its block/payload digest or
//! lazily parse an embedded HTTP message.
mod digest;
mod header;
mod iterator;
mod record;
mod record_type;

pub use digest::*;
pub use header::*;
pub use iterator::*;
pub use record::*;
pub use record_type::*;

use thiserror::Error;

/// Errors during parsing or formatting of WARC files.
#[derive(Error, Debug)]
pub enum WARCError {
    /// Not a recognized WARC file.
    #[error("unknown format")]
    UnknownFormat,

    /// Header couldn't be parsed or formatted.
    #[error("malformed header")]
    MalformedHeader {
        /// Number of bytes read from the (uncompressed) input stream.
        offset: u64,
        /// Source of the error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The length of the record body does not correspond with the value in the header.
    #[error("wrong block length")]
    WrongBlockLength {
        /// ID of the record
        record_id: String,
    },

    /// Field contained an invalid value.
    #[error("invalid field value")]
    InvalidFieldValue {
        /// Name of the field.
        name: String,
        /// ID of the record.
        record_id: String,
        /// Source of the error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// End of the record is malformed.
    #[error("malformed footer")]
    MalformedFooter {
        /// Number of bytes read from the (uncompressed) input stream.
        offset: u64,
    },

    /// An operation was used outside of its documented preconditions, such as
    /// [Record::parse_http] on a record that isn't HTTP-bearing, or
    /// [Record::write] on a record with no payload attached.
    #[error("usage error: {message}")]
    UsageError {
        /// Description of the misuse.
        message: String,
    },

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
