//! Byte-range transport for remote media content.
//!
//! Decryption works on 2 KiB blocks, so the stream layer never asks the
//! transport for arbitrary offsets: relocations are block-aligned and
//! expressed as half-open ranges (`bytes=<offset>-`). Sequential reads
//! continue on the same open response body; only a relocation opens a
//! new request.

use std::io::{self, Read};

use reqwest::{header::RANGE, StatusCode};
use url::Url;

use crate::{error::Error, pool::PooledClient};

/// Remote byte source supporting random access through half-open ranges.
pub trait RangeSource: Send + Sync {
    /// Opens a reader positioned at `offset`, yielding bytes up to the
    /// end of the content.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the request fails or the server does not
    /// honor the requested range.
    fn open_at(&mut self, offset: u64) -> io::Result<Box<dyn Read + Send>>;
}

/// HTTP implementation backed by a pooled client handle.
///
/// Owns the handle for the lifetime of the stream; dropping the source
/// releases the client back to its pool.
pub struct HttpRangeSource {
    client: PooledClient,
    url: Url,
}

impl HttpRangeSource {
    /// Creates a range source for the media at `url`.
    #[must_use]
    pub fn new(client: PooledClient, url: Url) -> Self {
        Self { client, url }
    }
}

impl RangeSource for HttpRangeSource {
    fn open_at(&mut self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        trace!("requesting media range {offset}-");

        let response = self
            .client
            .get(self.url.clone())
            .header(RANGE, format!("bytes={offset}-"))
            .send()
            .map_err(|e| io::Error::from(Error::from(e)))?;

        // Servers that ignore `Range` reply 200 with the full body, which
        // is only equivalent when reading from the start.
        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT && !(status == StatusCode::OK && offset == 0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("media transport returned {status} for range {offset}-"),
            ));
        }

        Ok(Box::new(response))
    }
}
