use url::Url;

use crate::{key::Key, protocol::Format};

/// Process-wide configuration for media acquisition.
///
/// The master secret and preferred format are supplied once at
/// configuration time and shared read-only across sessions.
#[derive(Clone, Debug)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,

    pub user_agent: String,

    /// 16-byte master secret; never transmitted.
    pub secret: Key,

    /// Preferred audio format, forwarded to the resolution endpoint.
    pub format: Format,

    /// Base URL of the resolution endpoint.
    pub resolve_base: Url,
}

impl Config {
    /// Builds the configuration from crate metadata and the supplied
    /// credentials.
    ///
    /// # Panics
    ///
    /// Panics when the crate name or version would produce an invalid
    /// `User-Agent` header.
    #[must_use]
    pub fn new(secret: Key, format: Format, resolve_base: Url) -> Self {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();

        // Additional `User-Agent` string checks on top of `reqwest::HeaderValue`.
        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
        {
            panic!("application name and/or version invalid (\"{app_name}\"; \"{app_version}\")");
        }

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };

        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name})");
        trace!("user agent: {user_agent}");

        Self {
            app_name,
            app_version,

            user_agent,

            secret,
            format,
            resolve_base,
        }
    }
}
