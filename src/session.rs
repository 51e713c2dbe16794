//! One playback attempt, from identifier to plaintext stream.
//!
//! A session ties the pipeline together: resolve the media location,
//! derive the track key, open the transport at offset 0 and wrap it in a
//! decrypting stream for the external container decoder. Tracks without a
//! protected variant take a simpler sub-path that opens the preview URI
//! directly with no decryption stage.
//!
//! Each playback attempt runs its own session on a dedicated execution
//! context; sessions share no decryption state. The pooled client handle
//! is acquired at session start and released when the stream closes,
//! regardless of success or failure.

use crate::{
    audio_file::AudioFile,
    cipher::{Plain, StripedCipher},
    config::Config,
    error::{Error, Result},
    key::Key,
    locator::MediaLocator,
    pool::{ClientPool, PooledClient},
    stream::DecryptingStream,
    track::Track,
    transport::HttpRangeSource,
};

/// Session for one playback attempt of one track.
pub struct TrackSession {
    /// Transport handle, held for the lifetime of the stream.
    client: PooledClient,

    config: Config,
}

impl TrackSession {
    /// Acquires a transport handle for one playback attempt.
    ///
    /// # Errors
    ///
    /// Returns error if no client handle can be acquired.
    pub fn new(pool: &ClientPool, config: Config) -> Result<Self> {
        Ok(Self {
            client: pool.acquire()?,
            config,
        })
    }

    /// Opens the track and returns the plaintext stream for the decoder.
    ///
    /// Consumes the session: one session serves one attempt. If resolution
    /// or key derivation fails, no transport request has been issued and
    /// the pooled handle is released immediately. A failed session aborts
    /// playback of this one track only; concurrent sessions and the master
    /// secret are unaffected.
    ///
    /// # Errors
    ///
    /// * `Error::MediaResolution` - The resolution endpoint reported errors
    /// * `Error::MissingPreview` - Preview sub-path without a preview URI
    /// * `Error::Transport` - The resolution call failed on the network
    pub fn start(self, track: &Track) -> Result<AudioFile> {
        if track.is_preview() {
            return self.start_preview(track);
        }

        let location = MediaLocator::new(&self.client, &self.config.resolve_base).resolve(
            track.identifier(),
            &self.config.format,
            track.file_size(),
        )?;

        let key = Key::for_track(track.identifier(), &self.config.secret);
        let codec = StripedCipher::new(key, track.identifier());

        debug!("starting protected stream for track {track}");
        let content_length = location.content_length;
        let source = HttpRangeSource::new(self.client, location.url);
        let stream = DecryptingStream::new(source, Box::new(codec), content_length);

        Ok(AudioFile::new(Box::new(stream), content_length))
    }

    /// Opens the unprotected preview clip directly, with no resolution
    /// call, no key derivation and no decryption stage.
    fn start_preview(self, track: &Track) -> Result<AudioFile> {
        let url = track
            .preview_url()
            .cloned()
            .ok_or_else(|| Error::missing_preview(format!("track {track} has no preview URI")))?;

        debug!("starting preview stream for track {track}");
        let source = HttpRangeSource::new(self.client, url);
        let stream = DecryptingStream::new(source, Box::new(Plain), track.file_size());

        Ok(AudioFile::new(Box::new(stream), track.file_size()))
    }
}
