//! Wire types for the media resolution endpoint.
//!
//! This module models the JSON envelope returned by the resolution
//! endpoint, plus the audio format identifiers that go into the request.
//!
//! # Wire Format
//!
//! Request: `GET <resolve-base>?trackIdentifier=<id>&format=<FMT>`
//!
//! Response:
//! ```json
//! {
//!     "data": [{
//!         "errors": [{
//!             "code": "4",
//!             "message": "expired"
//!         }]
//!     }],
//!     "mediaURL": "https://..."
//! }
//! ```
//!
//! A non-empty `errors` list means the resolution failed; otherwise
//! `mediaURL` is the signed URI. A success envelope without `mediaURL`
//! is a protocol violation, distinct from a reported error.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::Deserialize;
use url::Url;
use veil::Redact;

use crate::error::{Error, Result};

/// Audio container format requested from the resolution endpoint.
///
/// Only `MP3` and `FLAC` are recognized locally; any other value is
/// passed through to the endpoint verbatim, as its behavior for
/// unrecognized values is service-defined.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Format {
    /// Lossy container (default)
    #[default]
    Mp3,

    /// Lossless container
    Flac,

    /// Service-defined value, forwarded unvalidated
    Other(String),
}

impl fmt::Display for Format {
    /// Formats the value exactly as it appears on the wire.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Mp3 => write!(f, "MP3"),
            Self::Flac => write!(f, "FLAC"),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

impl FromStr for Format {
    type Err = Infallible;

    /// Parses a format string; anything unrecognized becomes
    /// [`Format::Other`] and is forwarded as-is.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            _ if s.eq_ignore_ascii_case("MP3") => Self::Mp3,
            _ if s.eq_ignore_ascii_case("FLAC") => Self::Flac,
            _ => Self::Other(s.to_owned()),
        })
    }
}

/// Resolution response envelope.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Envelope {
    /// Per-request data entries, each possibly carrying errors
    #[serde(default)]
    pub data: Vec<Data>,

    /// Signed media URI, present on success
    #[serde(default, rename = "mediaURL")]
    pub media_url: Option<Url>,
}

/// Response data entry.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Data {
    /// Errors reported by the endpoint for this entry
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// Error reported by the resolution endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiError {
    /// Error code; arrives as a JSON string or number
    pub code: Code,

    /// Human-readable error description
    pub message: String,
}

impl fmt::Display for ApiError {
    /// Formats an error as `"{code}: {message}"`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Error code variant; the endpoint is inconsistent about its JSON type.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Code {
    Number(i64),
    Text(String),
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(code) => write!(f, "{code}"),
            Self::Text(code) => write!(f, "{code}"),
        }
    }
}

impl Envelope {
    /// Converts the envelope into a media location.
    ///
    /// `content_length` is the expected total size, taken from the track
    /// metadata rather than the response.
    ///
    /// # Errors
    ///
    /// * `Error::MediaResolution` - The endpoint reported errors;
    ///   aggregates all `code: message` pairs into one message
    /// * `Error::ProtocolViolation` - No errors were reported but the
    ///   media URL field is absent
    pub fn into_location(self, content_length: u64) -> Result<MediaLocation> {
        let errors = self
            .data
            .iter()
            .flat_map(|data| &data.errors)
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        if !errors.is_empty() {
            return Err(Error::media_resolution(errors.join(", ")));
        }

        let url = self
            .media_url
            .ok_or_else(|| Error::protocol_violation("response envelope has no media URL"))?;

        Ok(MediaLocation {
            url,
            content_length,
        })
    }
}

/// Signed, time-limited location of a media asset.
///
/// Created per playback attempt and discarded after the stream closes;
/// never cached across attempts, as locations expire server-side.
#[derive(Clone, Redact)]
pub struct MediaLocation {
    /// Signed URI (redacted in debug output)
    #[redact]
    pub url: Url,

    /// Expected total content length in bytes, from track metadata
    pub content_length: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn success_envelope_yields_location() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"data":[{"errors":[]}],"mediaURL":"https://x/y"}"#).unwrap();

        let location = envelope.into_location(2048).unwrap();
        assert_eq!(location.url.as_str(), "https://x/y");
        assert_eq!(location.content_length, 2048);
    }

    #[test]
    fn reported_errors_aggregate() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"data":[{"errors":[{"code":"4","message":"expired"}]}]}"#,
        )
        .unwrap();

        let err = envelope.into_location(0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MediaResolution);
        assert!(err.to_string().contains("4: expired"));
    }

    #[test]
    fn multiple_errors_join_with_commas() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"data":[{"errors":[
                {"code":"4","message":"expired"},
                {"code":2000,"message":"no rights"}
            ]}]}"#,
        )
        .unwrap();

        let err = envelope.into_location(0).unwrap_err();
        assert!(err.to_string().contains("4: expired, 2000: no rights"));
    }

    #[test]
    fn missing_media_url_is_protocol_violation() {
        let envelope: Envelope = serde_json::from_str(r#"{"data":[{"errors":[]}]}"#).unwrap();

        let err = envelope.into_location(0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProtocolViolation);
    }

    #[test]
    fn format_round_trips_on_the_wire() {
        assert_eq!("mp3".parse::<Format>().unwrap().to_string(), "MP3");
        assert_eq!("FLAC".parse::<Format>().unwrap().to_string(), "FLAC");

        // Unrecognized values pass through verbatim, not validated.
        assert_eq!("AAC_96".parse::<Format>().unwrap().to_string(), "AAC_96");
    }

    #[test]
    fn location_debug_redacts_signed_url() {
        let location = MediaLocation {
            url: "https://cdn.example.com/asset?token=secret".parse().unwrap(),
            content_length: 1,
        };
        assert!(!format!("{location:?}").contains("token=secret"));
    }
}
