//! Blocking HTTP client for resolution calls and media range requests.
//!
//! This module provides a thin wrapper around `reqwest::blocking::Client`
//! that adds:
//! * Consistent timeouts and keep-alive settings
//! * A service-shaped `User-Agent` header
//!
//! All I/O in this crate is blocking from the caller's perspective: one
//! playback attempt runs on a dedicated execution context and suspends
//! until bytes arrive or an error occurs. Handles are reused across
//! sessions through [`crate::pool::ClientPool`].

use std::time::Duration;

use reqwest::blocking;
use url::Url;

use crate::{config::Config, error::Result};

/// Blocking HTTP client with consistent configuration.
pub struct Client {
    /// The underlying client; connection-pooled and cheap to reuse.
    inner: blocking::Client,
}

impl Client {
    /// Duration to keep idle connections alive.
    ///
    /// Prevents frequent reconnection overhead for subsequent range
    /// requests against the same media host.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for the connection to be established.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new client.
    ///
    /// No whole-request timeout is set: media streams stay open for the
    /// duration of playback and must not be cut off mid-stream.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration including the user agent
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails.
    pub fn new(config: &Config) -> Result<Self> {
        let inner = blocking::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { inner })
    }

    /// Builds a GET request for `url`.
    pub fn get(&self, url: Url) -> blocking::RequestBuilder {
        self.inner.get(url)
    }
}
