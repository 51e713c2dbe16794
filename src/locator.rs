//! Media location resolution.
//!
//! Resolves an opaque track identifier into a time-limited, signed media
//! URI with a single call against the resolution endpoint. Upstream error
//! payloads surface as typed failures; nothing is retried here.

use url::Url;

use crate::{
    error::{Error, Result},
    http::Client,
    protocol::{Envelope, Format, MediaLocation},
};

/// Resolves track identifiers against the resolution endpoint.
///
/// Borrows the session's client handle; one locator serves one playback
/// attempt.
pub struct MediaLocator<'a> {
    client: &'a Client,
    base: &'a Url,
}

impl<'a> MediaLocator<'a> {
    #[must_use]
    pub fn new(client: &'a Client, base: &'a Url) -> Self {
        Self { client, base }
    }

    /// Resolves `identifier` into a signed media location.
    ///
    /// `format` goes onto the wire verbatim; unrecognized values are the
    /// endpoint's to judge. `content_length` is the expected total size
    /// from the track metadata and is carried through into the location.
    ///
    /// # Errors
    ///
    /// * `Error::MediaResolution` - The endpoint reported errors, or
    ///   returned no response body at all
    /// * `Error::ProtocolViolation` - The envelope parsed but carries no
    ///   media URL
    /// * `Error::Transport` - The request itself failed
    pub fn resolve(
        &self,
        identifier: &str,
        format: &Format,
        content_length: u64,
    ) -> Result<MediaLocation> {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("trackIdentifier", identifier)
            .append_pair("format", &format.to_string());

        trace!("resolving track {identifier} as {format}");
        let response = self.client.get(url).send()?;
        let body = response.text()?;

        let location = parse_body(&body, content_length)?;

        debug!("resolved track {identifier} to a signed location of {content_length} bytes");
        Ok(location)
    }
}

/// Turns a raw response body into a media location.
///
/// Separated from the transport so the failure surface is testable
/// without a server.
///
/// # Errors
///
/// * `Error::MediaResolution` - The body is empty, or the envelope
///   reports errors
/// * `Error::ProtocolViolation` - The body is not a valid envelope, or
///   carries no media URL
fn parse_body(body: &str, content_length: u64) -> Result<MediaLocation> {
    if body.is_empty() {
        return Err(Error::media_resolution("no response"));
    }

    let envelope: Envelope = serde_json::from_str(body)?;
    envelope.into_location(content_length)
}
