//! WARC record type tags and filter masks.

/// The kind of a WARC record, derived from its `WARC-Type` field.
///
/// Each variant carries a distinct bit so that a plain `u16` can be used as a
/// filter mask selecting a subset of types in one `&` test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RecordType {
    /// `warcinfo`: information about the writer of the archive itself.
    Warcinfo = 2,
    /// `response`: a full scheme-specific response, such as an HTTP response.
    Response = 4,
    /// `resource`: a resource without full protocol response information.
    Resource = 8,
    /// `request`: a full scheme-specific request, such as an HTTP request.
    Request = 16,
    /// `metadata`: content created to further describe, explain, or accompany
    /// another record.
    Metadata = 32,
    /// `revisit`: the revisitation of content already archived.
    Revisit = 64,
    /// `conversion`: a transformation of another record's content.
    Conversion = 128,
    /// `continuation`: the continued content of a record split across files.
    Continuation = 256,
    /// A `WARC-Type` value not recognized as any of the above tags.
    Unknown = 512,
}

impl RecordType {
    /// Matches a `WARC-Type` field value (case-insensitively) to a
    /// [RecordType], mapping anything unrecognized to [RecordType::Unknown].
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("warcinfo") {
            Self::Warcinfo
        } else if tag.eq_ignore_ascii_case("response") {
            Self::Response
        } else if tag.eq_ignore_ascii_case("resource") {
            Self::Resource
        } else if tag.eq_ignore_ascii_case("request") {
            Self::Request
        } else if tag.eq_ignore_ascii_case("metadata") {
            Self::Metadata
        } else if tag.eq_ignore_ascii_case("revisit") {
            Self::Revisit
        } else if tag.eq_ignore_ascii_case("conversion") {
            Self::Conversion
        } else if tag.eq_ignore_ascii_case("continuation") {
            Self::Continuation
        } else {
            Self::Unknown
        }
    }

    /// Returns the canonical lowercase `WARC-Type` tag text for this type.
    ///
    /// [RecordType::Unknown] has no canonical tag text since its whole point
    /// is to stand in for a tag this enumeration doesn't know about; callers
    /// that need the original text should read it back from the record's
    /// header map rather than from this enum (see the open question in
    /// DESIGN.md).
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Warcinfo => Some("warcinfo"),
            Self::Response => Some("response"),
            Self::Resource => Some("resource"),
            Self::Request => Some("request"),
            Self::Metadata => Some("metadata"),
            Self::Revisit => Some("revisit"),
            Self::Conversion => Some("conversion"),
            Self::Continuation => Some("continuation"),
            Self::Unknown => None,
        }
    }

    /// Returns the distinct bit used to represent this type in a filter mask.
    pub fn bit(&self) -> u16 {
        *self as u16
    }
}

/// Filter mask selecting every record type, including [RecordType::Unknown].
///
/// Sentinel value; never appears on a real record.
pub const ANY_TYPE: u16 = 0xFFFF;

/// Filter mask selecting no record type at all.
///
/// Sentinel value; never appears on a real record.
pub const NO_TYPE: u16 = 0;

/// Returns whether `record_type` is selected by `filter`.
pub fn type_matches_filter(filter: u16, record_type: RecordType) -> bool {
    filter & record_type.bit() != 0
}
