//! Block-layer transforms for striped media encryption.
//!
//! Protected content is divided into 2 KiB blocks with alternating
//! encryption: even-indexed blocks (0, 2, 4, ...) are Blowfish CBC
//! ciphertext, odd-indexed blocks are plaintext pass-through. Because
//! blocks are fetched out of order under seeking, the cipher state is
//! re-created for every block with the same fixed IV instead of chaining
//! across blocks.
//!
//! The IV is derived from the track identifier: its first 8 bytes,
//! zero-padded. The exact primitive is behind the [`BlockCodec`] trait so
//! the stream logic stays independent of it.
//!
//! # Partial blocks
//!
//! The final block of a stream may be shorter than 2 KiB. Only its largest
//! 8-byte-aligned prefix runs through the cipher; the remaining tail passes
//! through unchanged, so no padding handling can consume bytes beyond the
//! declared content length.

use std::io;

use blowfish::{
    cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit},
    Blowfish,
};
use cbc::cipher::block_padding::NoPadding;

use crate::key::Key;

/// Size of each content block in bytes (2 KiB).
pub const BLOCK_SIZE: usize = 2 * 1024;

/// Size of one cipher block in bytes (Blowfish).
const CIPHER_BLOCK_SIZE: usize = 8;

/// Stripe period: every other content block is ciphertext.
const STRIPE_PERIOD: u64 = 2;

/// Stateless per-block transform applied by the decrypting stream.
///
/// Implementations must be pure functions of the block index and input
/// bytes: decryption must not depend on call history, so that seeking
/// and sequential reads yield byte-identical output.
pub trait BlockCodec: Send + Sync {
    /// Transforms one block of ciphertext into plaintext, in place.
    ///
    /// `block` is the index of the 2 KiB block within the content;
    /// `data` holds only the bytes actually present.
    fn decrypt(&self, block: u64, data: &mut [u8]) -> io::Result<()>;

    /// Transforms one block of plaintext into ciphertext, in place.
    ///
    /// Inverse of [`decrypt`](Self::decrypt) for the same block index.
    fn encrypt(&self, block: u64, data: &mut [u8]) -> io::Result<()>;
}

/// Pass-through codec for unencrypted content, e.g. preview clips.
pub struct Plain;

impl BlockCodec for Plain {
    fn decrypt(&self, _block: u64, _data: &mut [u8]) -> io::Result<()> {
        Ok(())
    }

    fn encrypt(&self, _block: u64, _data: &mut [u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Blowfish CBC codec with striping.
///
/// Even-indexed blocks are transformed with a track-specific key and an
/// identifier-derived IV; odd-indexed blocks are returned unchanged.
pub struct StripedCipher {
    /// Track-specific key, see [`Key::for_track`].
    key: Key,

    /// Fixed IV, re-used for every encrypted block.
    iv: [u8; CIPHER_BLOCK_SIZE],
}

impl StripedCipher {
    /// Creates a codec for one track.
    ///
    /// # Arguments
    ///
    /// * `key` - Derived track key
    /// * `identifier` - Track identifier the IV is derived from
    #[must_use]
    pub fn new(key: Key, identifier: &str) -> Self {
        Self {
            key,
            iv: Self::iv_for(identifier),
        }
    }

    /// Derives the IV: the first 8 bytes of the identifier, zero-padded.
    fn iv_for(identifier: &str) -> [u8; CIPHER_BLOCK_SIZE] {
        let bytes = identifier.as_bytes();
        let mut iv = [0; CIPHER_BLOCK_SIZE];
        let len = usize::min(bytes.len(), CIPHER_BLOCK_SIZE);
        iv[..len].copy_from_slice(&bytes[..len]);
        iv
    }

    /// Whether the block at `block` is ciphertext.
    fn is_striped(block: u64) -> bool {
        block % STRIPE_PERIOD == 0
    }

    /// Largest prefix of `data` the cipher can process.
    fn aligned_len(data: &[u8]) -> usize {
        data.len() - data.len() % CIPHER_BLOCK_SIZE
    }
}

impl BlockCodec for StripedCipher {
    fn decrypt(&self, block: u64, data: &mut [u8]) -> io::Result<()> {
        if !Self::is_striped(block) {
            return Ok(());
        }

        let aligned = Self::aligned_len(data);
        if aligned == 0 {
            return Ok(());
        }

        // The state of the cipher is reset on each block.
        let cipher = cbc::Decryptor::<Blowfish>::new_from_slices(&*self.key, &self.iv)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        // The aligned prefix is a multiple of the cipher block size, so
        // no padding is necessary.
        cipher
            .decrypt_padded_mut::<NoPadding>(&mut data[..aligned])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        Ok(())
    }

    fn encrypt(&self, block: u64, data: &mut [u8]) -> io::Result<()> {
        if !Self::is_striped(block) {
            return Ok(());
        }

        let aligned = Self::aligned_len(data);
        if aligned == 0 {
            return Ok(());
        }

        let cipher = cbc::Encryptor::<Blowfish>::new_from_slices(&*self.key, &self.iv)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        cipher
            .encrypt_padded_mut::<NoPadding>(&mut data[..aligned], aligned)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> StripedCipher {
        let key = Key::for_track("123456", &"0123456789abcdef".parse().unwrap());
        StripedCipher::new(key, "123456")
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
    }

    #[test]
    fn even_block_round_trips() {
        let codec = codec();
        let plaintext = pattern(BLOCK_SIZE);

        let mut data = plaintext.clone();
        codec.encrypt(0, &mut data).unwrap();
        assert_ne!(data, plaintext);

        codec.decrypt(0, &mut data).unwrap();
        assert_eq!(data, plaintext);
    }

    #[test]
    fn partial_final_block_round_trips() {
        let codec = codec();
        let plaintext = pattern(907);

        let mut data = plaintext.clone();
        codec.encrypt(2, &mut data).unwrap();
        // The sub-cipher-block tail passes through unchanged.
        assert_eq!(&data[904..], &plaintext[904..]);
        assert_ne!(&data[..904], &plaintext[..904]);

        codec.decrypt(2, &mut data).unwrap();
        assert_eq!(data, plaintext);
    }

    #[test]
    fn odd_blocks_pass_through() {
        let codec = codec();
        let plaintext = pattern(BLOCK_SIZE);

        let mut data = plaintext.clone();
        codec.decrypt(1, &mut data).unwrap();
        assert_eq!(data, plaintext);

        codec.encrypt(3, &mut data).unwrap();
        assert_eq!(data, plaintext);
    }

    #[test]
    fn tiny_final_block_passes_through() {
        let codec = codec();
        let plaintext = pattern(5);

        let mut data = plaintext.clone();
        codec.decrypt(0, &mut data).unwrap();
        assert_eq!(data, plaintext);
    }

    #[test]
    fn iv_derives_from_identifier() {
        assert_eq!(StripedCipher::iv_for("123456"), *b"123456\x00\x00");
        assert_eq!(StripedCipher::iv_for("123456789"), *b"12345678");

        let key = Key::for_track("1", &Key::default());
        let one = StripedCipher::new(key, "1");
        let two = StripedCipher::new(key, "2");

        let mut first = pattern(BLOCK_SIZE);
        let mut second = pattern(BLOCK_SIZE);
        one.encrypt(0, &mut first).unwrap();
        two.encrypt(0, &mut second).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn decryption_ignores_call_history() {
        let codec = codec();
        let mut blocks = Vec::new();
        for index in [0_u64, 2, 4] {
            let mut data = pattern(BLOCK_SIZE);
            codec.encrypt(index, &mut data).unwrap();
            blocks.push(data);
        }

        // Decrypting out of order yields the same plaintext.
        for block in [2_usize, 0, 1] {
            let mut data = blocks[block].clone();
            codec.decrypt(0, &mut data).unwrap();
            assert_eq!(data, pattern(BLOCK_SIZE));
        }
    }
}
