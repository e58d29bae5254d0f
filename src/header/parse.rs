use crate::nomutil::NomParseError;

use super::HeaderMap;

/// Error occured parsing header.
pub type ParseError = crate::error::ParseError;

/// Decode header data into structures.
pub struct HeaderParser {}

impl HeaderParser {
    /// Creates a `HeaderParser` with the default configuration.
    pub fn new() -> Self {
        Self {}
    }

    /// Decode the given header data.
    ///
    /// Special decoding steps are performed:
    ///
    /// - Whitespace surrounding names and values are removed.
    /// - Folded lines are automatically unfolded.
    /// - Characters in quoted-string encoding is respected.
    pub fn parse_header(&self, input: &[u8]) -> Result<HeaderMap, ParseError> {
        super::pc::parse_fields(input)
            .map_err(|error| crate::error::ParseError(NomParseError::from_nom(input, &error)))
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}
