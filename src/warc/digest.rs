//! Streaming digest computation for `WARC-Block-Digest` / `WARC-Payload-Digest`.

use data_encoding::BASE32;

use crate::crypto;

/// Streaming digest computation producing the base32 digest strings used in
/// WARC headers.
///
/// Built on the teacher's [crypto::get_hash_function_by_name] dispatch over
/// `digest::DynDigest`, so any algorithm name that module recognizes can in
/// principle drive this engine, even though the WARC digest fields this
/// crate verifies only ever use the `sha1:` tag (§4.2 of the design).
pub struct DigestEngine {
    algorithm: String,
    digest: Box<dyn digest::DynDigest>,
}

impl DigestEngine {
    /// Creates a `DigestEngine` for the named algorithm, or `None` if the
    /// algorithm is not recognized.
    pub fn new(algorithm: &str) -> Option<Self> {
        let digest = crypto::get_hash_function_by_name(algorithm)?;

        Some(Self {
            algorithm: crypto::normalize_hash_name(algorithm),
            digest,
        })
    }

    /// Creates a `DigestEngine` using SHA-1, the only algorithm recognized by
    /// the `WARC-Block-Digest` / `WARC-Payload-Digest` header value form.
    pub fn sha1() -> Self {
        Self::new("sha1").expect("sha1 is always supported")
    }

    /// Returns the normalized name of the algorithm in use.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Feeds bytes into the running digest.
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Consumes the engine and returns the raw digest bytes.
    pub fn finalize(self) -> Vec<u8> {
        self.digest.finalize().to_vec()
    }

    /// Consumes the engine and returns the digest as uppercase, padded
    /// base32 text (RFC 4648), the form stored in WARC digest header values.
    pub fn finalize_base32(self) -> String {
        BASE32.encode(&self.finalize())
    }
}

/// Parses a `algo:digest` header value, returning the algorithm tag and the
/// base32 digest text.
///
/// Only used by callers that need to recognize the algorithm tag up front;
/// [verify_base32_digest] does the tag check itself.
pub fn split_algo_digest(value: &str) -> Option<(&str, &str)> {
    value.split_once(':')
}

/// Verifies a WARC digest header value (`sha1:<base32>`) against freshly
/// computed raw digest bytes.
///
/// Only the `sha1` algorithm tag is recognized; any other prefix, or a
/// missing/malformed header value, yields `false` rather than an error, per
/// the digest-verification policy in §7.
pub fn verify_base32_digest(header_value: Option<&str>, computed: &[u8]) -> bool {
    let Some(value) = header_value else {
        return false;
    };

    let Some((algo, digest_text)) = split_algo_digest(value) else {
        return false;
    };

    if !algo.eq_ignore_ascii_case("sha1") {
        return false;
    }

    let computed_text = BASE32.encode(computed);

    base32_text_eq(digest_text, &computed_text)
}

/// Compares two base32 strings for equality, case-insensitively and ignoring
/// trailing `=` padding.
fn base32_text_eq(a: &str, b: &str) -> bool {
    a.trim_end_matches('=').eq_ignore_ascii_case(b.trim_end_matches('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_digest_matches_known_vector() {
        let mut engine = DigestEngine::sha1();
        engine.update(b"hello, world!");

        // sha1("hello, world!") base32-encoded.
        let encoded = engine.finalize_base32();
        assert_eq!(encoded.len(), 32);

        let mut engine = DigestEngine::sha1();
        engine.update(b"hello, world!");
        assert!(verify_base32_digest(
            Some(&format!("sha1:{}", encoded)),
            &DigestEngine::sha1_digest_bytes(b"hello, world!")
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_algo() {
        assert!(!verify_base32_digest(Some("sha256:AAAA"), b"x"));
    }

    #[test]
    fn test_verify_rejects_missing() {
        assert!(!verify_base32_digest(None, b"x"));
    }

    #[test]
    fn test_verify_case_and_padding_tolerant() {
        let mut engine = DigestEngine::sha1();
        engine.update(b"abc");
        let encoded = engine.finalize_base32();

        let lower = encoded.to_ascii_lowercase();
        let unpadded = lower.trim_end_matches('=').to_string();

        assert!(verify_base32_digest(
            Some(&format!("sha1:{}", lower)),
            &DigestEngine::sha1_digest_bytes(b"abc")
        ));
        assert!(verify_base32_digest(
            Some(&format!("sha1:{}", unpadded)),
            &DigestEngine::sha1_digest_bytes(b"abc")
        ));
    }

    impl DigestEngine {
        fn sha1_digest_bytes(data: &[u8]) -> Vec<u8> {
            let mut engine = DigestEngine::sha1();
            engine.update(data);
            engine.finalize()
        }
    }
}
