use std::{fmt, time::Duration};

use url::Url;

/// Metadata for one track, supplied by the external catalog layer.
///
/// Carries everything a playback session needs: the opaque identifier
/// (doubles as key-derivation salt), the expected content length, and
/// the optional preview sub-path. Cloning a track is the retry
/// capability: a failed session is abandoned and a fresh one started
/// from the same metadata.
#[derive(Clone, Debug)]
pub struct Track {
    identifier: String,
    title: String,
    artist: String,
    duration: Duration,
    file_size: u64,
    preview_url: Option<Url>,
    preview_only: bool,
}

impl Track {
    /// Creates a track record from its identifier and expected total
    /// content length in bytes.
    #[must_use]
    pub fn new(identifier: impl Into<String>, file_size: u64) -> Self {
        Self {
            identifier: identifier.into(),
            title: String::new(),
            artist: String::new(),
            duration: Duration::ZERO,
            file_size,
            preview_url: None,
            preview_only: false,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the time-limited preview clip URL.
    #[must_use]
    pub fn with_preview(mut self, url: Url) -> Self {
        self.preview_url = Some(url);
        self
    }

    /// Marks the track as having no protected variant available, so
    /// sessions take the preview sub-path.
    #[must_use]
    pub fn preview_only(mut self, preview_only: bool) -> Self {
        self.preview_only = preview_only;
        self
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Expected total content length in bytes, from the catalog metadata.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[must_use]
    pub fn preview_url(&self) -> Option<&Url> {
        self.preview_url.as_ref()
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.preview_only
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.artist.is_empty() && self.title.is_empty() {
            write!(f, "{}", self.identifier)
        } else {
            write!(f, "{}: \"{} - {}\"", self.identifier, self.artist, self.title)
        }
    }
}
