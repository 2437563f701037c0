//! Location codec for the persisted `video_url` field.
//!
//! The record store keeps a single string per video. On the wire it is either
//! `"<bucket>,<key>"` (an object that still needs a signed URL) or an absolute
//! `http(s)://` URL that is handed out as-is. Inside the service that string is
//! always handled as a [`PersistedLocation`].

use serde::{Deserialize, Serialize};
use tracing::warn;

const SEPARATOR: char = ',';

/// A `(bucket, key)` pair identifying one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl StorageLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Encode as the composite `bucket,key` field.
    pub fn encode(&self) -> String {
        format!("{}{}{}", self.bucket, SEPARATOR, self.key)
    }
}

/// Decoded form of the persisted location field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedLocation {
    /// No video has been stored yet, or the field could not be decoded.
    Absent,
    /// An object in storage that must be signed before it can be played.
    Unresolved(StorageLocation),
    /// Already a usable URL.
    Resolved(String),
}

impl PersistedLocation {
    /// Decode a raw field value.
    ///
    /// Malformed values are logged and decoded as `Absent` so historical bad
    /// rows never fail a read.
    pub fn decode(field: &str) -> Self {
        if field.is_empty() {
            return Self::Absent;
        }
        if field.starts_with("http") {
            return Self::Resolved(field.to_string());
        }
        match field.split_once(SEPARATOR) {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Self::Unresolved(StorageLocation::new(bucket, key))
            }
            _ => {
                warn!(field, "malformed video location, expected `bucket,key`");
                Self::Absent
            }
        }
    }

    /// Decode an optional column value.
    pub fn from_field(field: Option<&str>) -> Self {
        field.map_or(Self::Absent, Self::decode)
    }

    /// Wire form of this location, `None` when absent.
    pub fn encode(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Unresolved(location) => Some(location.encode()),
            Self::Resolved(url) => Some(url.clone()),
        }
    }
}

impl From<StorageLocation> for PersistedLocation {
    fn from(location: StorageLocation) -> Self {
        Self::Unresolved(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_gives_back_the_pair() {
        let location = StorageLocation::new("tubely-media", "landscape/AbC-_09.mp4");
        let field = location.encode();
        assert_eq!(field, "tubely-media,landscape/AbC-_09.mp4");
        assert_eq!(
            PersistedLocation::decode(&field),
            PersistedLocation::Unresolved(location)
        );
    }

    #[test]
    fn empty_field_is_absent() {
        assert_eq!(PersistedLocation::decode(""), PersistedLocation::Absent);
        assert_eq!(PersistedLocation::from_field(None), PersistedLocation::Absent);
    }

    #[test]
    fn absolute_urls_pass_through() {
        for url in [
            "https://tubely.s3.us-east-1.amazonaws.com/portrait/x.mp4",
            "http://localhost:8091/assets/x.mp4",
            "https://cdn.example.com/a,b",
        ] {
            assert_eq!(
                PersistedLocation::decode(url),
                PersistedLocation::Resolved(url.to_string())
            );
        }
    }

    #[test]
    fn splits_on_first_comma_only() {
        assert_eq!(
            PersistedLocation::decode("bucket,key,with,commas"),
            PersistedLocation::Unresolved(StorageLocation::new("bucket", "key,with,commas"))
        );
    }

    #[test]
    fn malformed_fields_decode_as_absent() {
        for field in ["no-separator", ",key-only", "bucket-only,", ","] {
            assert_eq!(PersistedLocation::decode(field), PersistedLocation::Absent, "{field}");
        }
    }

    #[test]
    fn encode_wire_forms() {
        assert_eq!(PersistedLocation::Absent.encode(), None);
        assert_eq!(
            PersistedLocation::from(StorageLocation::new("b", "k")).encode(),
            Some("b,k".to_string())
        );
        assert_eq!(
            PersistedLocation::Resolved("https://x".into()).encode(),
            Some("https://x".to_string())
        );
    }
}
