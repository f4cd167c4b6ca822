#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Payload decoder for JSON tile manifests.
//!
//! A manifest is a JSON object whose `name` field labels the tile's entity:
//!
//! ```json
//! { "name": "Genesis Plaza", "version": 1 }
//! ```
//!
//! Decoding failures are classified from the `serde_json` error category: an
//! early end of input is a truncated stream, a well-formed document of the
//! wrong shape is a structural mismatch, and anything else falls into
//! [`DecodeErrorKind::Other`].

use landstream_core::{DecodeError, DecodeErrorKind};
use landstream_system_fetch::PayloadDecoder;
use serde::Deserialize;
use serde_json::error::Category;

/// Highest manifest version this decoder understands.
pub const SUPPORTED_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Manifest {
    name: String,
    #[serde(default = "default_version")]
    version: u32,
}

fn default_version() -> u32 {
    SUPPORTED_MANIFEST_VERSION
}

/// Decodes JSON manifests into entity names.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManifestDecoder;

impl PayloadDecoder for ManifestDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let manifest: Manifest = serde_json::from_slice(bytes).map_err(classify)?;

        if manifest.version > SUPPORTED_MANIFEST_VERSION {
            return Err(DecodeError::new(
                DecodeErrorKind::Structural,
                format!(
                    "unsupported manifest version {}; expected at most {SUPPORTED_MANIFEST_VERSION}",
                    manifest.version
                ),
            ));
        }

        let name = manifest.name.trim();
        if name.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorKind::Structural,
                "manifest name is blank",
            ));
        }
        Ok(name.to_owned())
    }
}

fn classify(error: serde_json::Error) -> DecodeError {
    let kind = match error.classify() {
        Category::Eof => DecodeErrorKind::Truncated,
        Category::Data => DecodeErrorKind::Structural,
        Category::Syntax | Category::Io => DecodeErrorKind::Other,
    };
    DecodeError::new(kind, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &str) -> Result<String, DecodeError> {
        ManifestDecoder.decode(payload.as_bytes())
    }

    #[test]
    fn decodes_name_from_manifest() {
        assert_eq!(
            decode(r#"{"name": "  Genesis Plaza ", "version": 1}"#),
            Ok("Genesis Plaza".to_owned())
        );
        assert_eq!(
            decode(r#"{"name": "Museum", "extra": [1, 2]}"#),
            Ok("Museum".to_owned())
        );
    }

    #[test]
    fn cut_off_stream_is_truncated() {
        let error = decode(r#"{"name": "Gene"#).expect_err("truncated");
        assert_eq!(error.kind(), DecodeErrorKind::Truncated);

        let error = decode("").expect_err("empty");
        assert_eq!(error.kind(), DecodeErrorKind::Truncated);
    }

    #[test]
    fn wrong_shape_is_structural() {
        for payload in [
            r#"{"title": "Plaza"}"#,
            r#"{"name": 42}"#,
            r#"{"name": "   "}"#,
            r#"{"name": "Plaza", "version": 9}"#,
        ] {
            let error = decode(payload).expect_err(payload);
            assert_eq!(error.kind(), DecodeErrorKind::Structural, "{payload}");
        }
    }

    #[test]
    fn binary_garbage_is_other() {
        let error = ManifestDecoder
            .decode(&[0x55, 0x6e, 0x69, 0x74, 0x79, 0x46, 0x53, 0x00])
            .expect_err("binary");
        assert_eq!(error.kind(), DecodeErrorKind::Other);
    }
}
