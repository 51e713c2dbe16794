//! Seekable decryption of protected media while streaming.
//!
//! This module exposes a remote ciphertext as a plaintext byte stream:
//! * Data is fetched and decoded in 2 KiB blocks as it's read
//! * Seeks relocate the transport with block-aligned range requests
//! * The block codec is applied transparently per block
//!
//! # Encryption Format
//!
//! Content is striped into 2 KiB blocks; even-indexed blocks are
//! ciphertext, odd-indexed blocks are plaintext (see [`crate::cipher`]).
//! Because decryption is a pure function of the block index, reading
//! sequentially and reading the same range via seeks yield byte-identical
//! output.
//!
//! # Buffering
//!
//! One decoded block is buffered at a time. Sequential reads continue on
//! the persistent transport reader across block boundaries; only a
//! relocation opens a new range request, always at the block-aligned
//! offset containing the target, never at the raw offset.
//!
//! # Examples
//!
//! ```rust
//! use dzmedia::stream::DecryptingStream;
//!
//! let mut stream = DecryptingStream::new(source, Box::new(codec), length);
//!
//! // Read and decrypt content
//! let mut buffer = Vec::new();
//! stream.read_to_end(&mut buffer)?;
//! ```

use std::{
    io::{self, Cursor, Read, Seek, SeekFrom},
    sync::{Mutex, PoisonError},
};

use crate::{
    cipher::{BlockCodec, BLOCK_SIZE},
    transport::RangeSource,
};

/// Streaming decryptor for protected content.
///
/// Implements `Read` and `Seek` over a byte-range transport, applying a
/// [`BlockCodec`] per 2 KiB block. The logical read cursor is tracked
/// independently of the transport's byte offset, which is recomputed on
/// every relocation.
pub struct DecryptingStream<S> {
    /// Source of remote bytes, opened per relocation.
    source: S,

    /// Persistent reader for sequential block fetches.
    ///
    /// Wrapped in a mutex only to satisfy the `Sync` bound of media
    /// sources; reads always come through `&mut self`.
    reader: Mutex<Option<Box<dyn Read + Send>>>,

    /// Byte offset the transport reader is positioned at.
    transport_pos: u64,

    /// Declared total content length in bytes, from track metadata.
    content_length: u64,

    /// Per-block transform (striped cipher or pass-through).
    codec: Box<dyn BlockCodec>,

    /// Decoded data buffer.
    ///
    /// Contains the current block (or less for the last block) of
    /// plaintext. Position tracks how much has been read.
    buffer: Cursor<Vec<u8>>,

    /// Current block number being processed; `None` before the first
    /// read or seek.
    block: Option<u64>,

    /// Whether the stream has been closed.
    closed: bool,
}

impl<S> DecryptingStream<S>
where
    S: RangeSource,
{
    /// Creates a stream over `source` with the given codec and declared
    /// content length.
    ///
    /// No transport request is issued until the first read or seek.
    #[must_use]
    pub fn new(source: S, codec: Box<dyn BlockCodec>, content_length: u64) -> Self {
        Self {
            source,
            reader: Mutex::new(None),
            transport_pos: 0,
            content_length,
            codec,
            buffer: Cursor::new(Vec::new()),
            block: None,
            closed: false,
        }
    }

    /// Declared total content length in bytes.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Logical read position within the plaintext.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.block
            .map_or(0, |block| block * BLOCK_SIZE as u64 + self.buffer.position())
    }

    /// Releases the transport connection unconditionally, even mid-read.
    ///
    /// Further reads and seeks fail. Dropping the stream has the same
    /// effect; `close` only makes the release explicit.
    pub fn close(&mut self) {
        *self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.buffer = Cursor::new(Vec::new());
        self.block = None;
        self.closed = true;
    }

    /// Calculates number of bytes in the buffer that have not been read yet.
    #[must_use]
    fn bytes_on_buffer(&self) -> u64 {
        let len = self.buffer.get_ref().len() as u64;

        // The buffer position can be beyond the buffer length if a position
        // beyond the buffer length is seeked to.
        len.saturating_sub(self.buffer.position())
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "stream is closed",
            ));
        }

        Ok(())
    }

    /// Fetches `block` from the transport and decodes it into the buffer.
    ///
    /// Reuses the open reader when the transport is already positioned at
    /// the block start; otherwise issues a new block-aligned range request
    /// and discards any buffered partial block.
    fn load_block(&mut self, block: u64) -> io::Result<()> {
        let start = block.checked_mul(BLOCK_SIZE as u64).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "block offset overflows")
        })?;

        // Only the final block may be shorter than the block size; never
        // consume bytes beyond the declared content length.
        let want = usize::try_from(u64::min(
            self.content_length.saturating_sub(start),
            BLOCK_SIZE as u64,
        ))
        .expect("block length fits usize");

        let mut buffer = vec![0; want];
        let mut length = 0;
        {
            let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);

            if reader.is_none() || self.transport_pos != start {
                *reader = Some(self.source.open_at(start)?);
                self.transport_pos = start;
            }

            if let Some(reader) = reader.as_mut() {
                while length < want {
                    let n = reader.read(&mut buffer[length..])?;
                    if n == 0 {
                        break;
                    }
                    length += n;
                }
            }
        }
        buffer.truncate(length);
        self.transport_pos = start + length as u64;

        self.codec.decrypt(block, &mut buffer)?;

        self.buffer = Cursor::new(buffer);
        self.block = Some(block);

        Ok(())
    }

    /// Relocates the logical cursor to `target`.
    ///
    /// `target` must lie within `0..content_length`.
    fn set_position(&mut self, target: u64) -> io::Result<u64> {
        self.check_open()?;

        if target >= self.content_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek to a position beyond the end of the content",
            ));
        }

        // The content is striped into blocks; decryption requires
        // whole-block alignment, so relocate to the block containing the
        // target and the offset within it.
        let block = target / BLOCK_SIZE as u64;
        let offset = target % BLOCK_SIZE as u64;

        if self.block != Some(block) {
            self.load_block(block)?;
        }

        // Set the offset position within the current block, and return the
        // target position in the plaintext stream.
        self.buffer.set_position(offset);
        Ok(target)
    }
}

impl<S> Read for DecryptingStream<S>
where
    S: RangeSource,
{
    /// Reads decrypted data from the stream.
    ///
    /// Requests spanning a block boundary are split internally so each
    /// block is decoded independently before concatenation. Returns fewer
    /// bytes than requested only at end-of-content.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;

        let mut bytes_read = 0;

        while bytes_read < buf.len() {
            // If the buffer is empty, load the block holding the cursor.
            if self.bytes_on_buffer() == 0 {
                let position = self.position();
                if position >= self.content_length {
                    break;
                }

                self.load_block(position / BLOCK_SIZE as u64)?;
                self.buffer.set_position(position % BLOCK_SIZE as u64);

                // Still empty: the transport delivered less than the
                // declared length.
                if self.bytes_on_buffer() == 0 {
                    warn!(
                        "content ended at {position} of {} declared bytes",
                        self.content_length
                    );
                    break;
                }
            }

            let n = self.buffer.read(&mut buf[bytes_read..])?;
            if n == 0 {
                break;
            }
            bytes_read += n;
        }

        Ok(bytes_read)
    }
}

impl<S> Seek for DecryptingStream<S>
where
    S: RangeSource,
{
    /// Seeks within the plaintext stream.
    ///
    /// Handles block boundary calculation, buffer management and
    /// relocation of the transport.
    ///
    /// Note that `SeekFrom::End(pos)` resolves to
    /// `content_length + pos - 1`: the end anchor is the last valid
    /// byte, not the end position, because targets at or beyond the
    /// content length are not addressable. `End(0)` therefore lands on
    /// the final byte rather than failing.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(pos) => pos,

            SeekFrom::End(pos) => self
                .content_length
                .checked_add_signed(pos)
                .and_then(|pos| pos.checked_sub(1))
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "invalid seek to a negative or overflowing position",
                    )
                })?,

            SeekFrom::Current(pos) => {
                self.position().checked_add_signed(pos).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "invalid seek to a negative or overflowing position",
                    )
                })?
            }
        };

        self.set_position(target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cipher::{Plain, StripedCipher},
        key::Key,
    };

    /// In-memory range source recording the offsets requested.
    struct MemorySource {
        data: Vec<u8>,
        requests: Arc<Mutex<Vec<u64>>>,
    }

    impl RangeSource for MemorySource {
        fn open_at(&mut self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
            self.requests.lock().unwrap().push(offset);
            let offset = usize::try_from(offset).unwrap().min(self.data.len());
            Ok(Box::new(Cursor::new(self.data[offset..].to_vec())))
        }
    }

    fn plaintext(len: usize) -> Vec<u8> {
        (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
    }

    fn codec() -> StripedCipher {
        let key = Key::for_track("123456", &"0123456789abcdef".parse().unwrap());
        StripedCipher::new(key, "123456")
    }

    /// Builds an encrypted fixture and a decrypting stream over it.
    fn stream(
        len: usize,
    ) -> (
        DecryptingStream<MemorySource>,
        Vec<u8>,
        Arc<Mutex<Vec<u64>>>,
    ) {
        let clear = plaintext(len);

        let mut data = clear.clone();
        for (index, chunk) in data.chunks_mut(BLOCK_SIZE).enumerate() {
            codec().encrypt(index as u64, chunk).unwrap();
        }

        let requests = Arc::new(Mutex::new(Vec::new()));
        let source = MemorySource {
            data,
            requests: Arc::clone(&requests),
        };

        let stream = DecryptingStream::new(source, Box::new(codec()), len as u64);
        (stream, clear, requests)
    }

    #[test]
    fn sequential_read_decrypts_everything() {
        // Three full blocks plus a partial final block with an unaligned tail.
        let (mut stream, clear, requests) = stream(3 * BLOCK_SIZE + 907);

        let mut output = Vec::new();
        stream.read_to_end(&mut output).unwrap();
        assert_eq!(output, clear);

        // One connection serves the whole sequential read.
        assert_eq!(*requests.lock().unwrap(), vec![0]);
    }

    #[test]
    fn reads_split_across_block_boundaries() {
        let (mut stream, clear, _) = stream(2 * BLOCK_SIZE);

        // One read spanning the even/odd boundary.
        stream.seek(SeekFrom::Start(2000)).unwrap();
        let mut buf = vec![0; 100];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, &clear[2000..2100]);
    }

    #[test]
    fn seek_partition_equals_sequential_read() {
        let len = 2 * BLOCK_SIZE + 500;
        let (mut stream, clear, _) = stream(len);

        // Read the tail first, then the head, then the middle.
        let mut tail = vec![0; 500];
        stream.seek(SeekFrom::Start(2 * BLOCK_SIZE as u64)).unwrap();
        stream.read_exact(&mut tail).unwrap();

        let mut head = vec![0; BLOCK_SIZE];
        stream.seek(SeekFrom::Start(0)).unwrap();
        stream.read_exact(&mut head).unwrap();

        let mut middle = vec![0; BLOCK_SIZE];
        stream.read_exact(&mut middle).unwrap();

        let mut output = head;
        output.extend(middle);
        output.extend(tail);
        assert_eq!(output, clear);
    }

    #[test]
    fn relocations_are_block_aligned() {
        let (mut stream, clear, requests) = stream(3 * BLOCK_SIZE);

        stream.seek(SeekFrom::Start(5000)).unwrap();
        let mut buf = vec![0; 10];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, &clear[5000..5010]);

        // 5000 lies in block 2; the range request starts at its offset.
        assert_eq!(*requests.lock().unwrap(), vec![2 * BLOCK_SIZE as u64]);
    }

    #[test]
    fn seek_beyond_content_fails() {
        let (mut stream, _, _) = stream(BLOCK_SIZE);

        let err = stream
            .seek(SeekFrom::Start(BLOCK_SIZE as u64))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = stream.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn seek_from_end_addresses_the_last_byte() {
        let (mut stream, clear, _) = stream(BLOCK_SIZE + 100);

        let position = stream.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(position, BLOCK_SIZE as u64 + 99);

        let mut buf = [0; 1];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], clear[clear.len() - 1]);
    }

    #[test]
    fn rewind_after_end_of_stream_resumes() {
        let (mut stream, clear, _) = stream(BLOCK_SIZE + 10);

        let mut output = Vec::new();
        stream.read_to_end(&mut output).unwrap();
        assert_eq!(output, clear);

        // Reading past the end yields nothing further.
        let mut buf = [0; 16];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);

        stream.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = [0; 10];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, clear[..10]);
    }

    #[test]
    fn short_content_ends_the_stream() {
        // Transport delivers less than the declared length.
        let clear = plaintext(100);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let source = MemorySource {
            data: clear.clone(),
            requests,
        };

        let mut stream = DecryptingStream::new(source, Box::new(Plain), 500);
        let mut output = Vec::new();
        stream.read_to_end(&mut output).unwrap();
        assert_eq!(output, clear);
    }

    #[test]
    fn close_releases_the_transport() {
        let (mut stream, _, _) = stream(BLOCK_SIZE);

        let mut buf = [0; 16];
        stream.read_exact(&mut buf).unwrap();

        stream.close();
        assert!(stream.read(&mut buf).is_err());
        assert!(stream.seek(SeekFrom::Start(0)).is_err());
    }

    #[test]
    fn preview_content_passes_through() {
        let clear = plaintext(3000);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let source = MemorySource {
            data: clear.clone(),
            requests,
        };

        let mut stream = DecryptingStream::new(source, Box::new(Plain), 3000);
        let mut output = Vec::new();
        stream.read_to_end(&mut output).unwrap();
        assert_eq!(output, clear);
    }
}
