//! Provides the `AudioFile` abstraction handed to container decoders.
//!
//! This module implements a unified interface for protected and preview
//! streams. Decryption, when needed, happens underneath in
//! [`DecryptingStream`](crate::stream::DecryptingStream); decoders see
//! plain seekable bytes either way.
//!
//! # Examples
//!
//! ```no_run
//! use std::io::{Read, Seek, SeekFrom};
//!
//! let mut audio = session.start(&track)?;
//!
//! audio.seek(SeekFrom::Start(1000))?;
//!
//! let mut buf = vec![0; 1024];
//! match audio.read(&mut buf) {
//!     Ok(n) => println!("Read {n} bytes"),
//!     Err(e) => eprintln!("Read error: {e}"),
//! }
//! ```

use std::{
    fmt,
    io::{Read, Seek},
};

use symphonia::core::io::MediaSource;

/// Combines Read and Seek traits for audio stream handling.
///
/// This trait requires thread-safety (Send + Sync) to enable:
/// * Safe sharing between threads
/// * Integration with media source consumers
pub trait ReadSeek: Read + Seek + Send + Sync {}

/// Blanket implementation for any type that implements both Read and Seek
impl<T: Read + Seek + Send + Sync> ReadSeek for T {}

/// A playable audio stream, either decrypted on the fly or passed through.
///
/// `AudioFile` is what a session hands to the external container decoder:
/// a seekable plaintext byte stream with a declared length.
pub struct AudioFile {
    /// The underlying stream implementation
    inner: Box<dyn ReadSeek>,

    /// The total size of the audio content in bytes
    byte_len: u64,
}

impl AudioFile {
    /// Wraps a stream for handoff to a container decoder.
    pub(crate) fn new(inner: Box<dyn ReadSeek>, byte_len: u64) -> Self {
        Self { inner, byte_len }
    }

    /// Total size of the audio content in bytes.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }
}

/// Shows the declared length only; the underlying stream may hold key
/// material and signed URLs.
impl fmt::Debug for AudioFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFile")
            .field("byte_len", &self.byte_len)
            .finish_non_exhaustive()
    }
}

/// Implements reading from the audio stream.
///
/// Delegates directly to the underlying stream, providing transparent
/// handling of protected and unprotected content.
impl Read for AudioFile {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Implements seeking within the audio stream.
///
/// Delegates directly to the underlying stream; seek targets at or
/// beyond the content length fail.
impl Seek for AudioFile {
    #[inline]
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Implements the `MediaSource` trait required by Symphonia for media
/// playback.
impl MediaSource for AudioFile {
    /// Byte-range transports are always seekable.
    #[inline]
    fn is_seekable(&self) -> bool {
        true
    }

    /// Returns the total size of the audio stream in bytes.
    ///
    /// Always known: the length is declared from track metadata when the
    /// session opens.
    #[inline]
    fn byte_len(&self) -> Option<u64> {
        Some(self.byte_len)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn debug_shows_only_the_length() {
        let audio = AudioFile::new(Box::new(Cursor::new(vec![0_u8; 4])), 4);
        assert!(format!("{audio:?}").contains("byte_len: 4"));
    }
}
