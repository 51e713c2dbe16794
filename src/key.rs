//! Track key derivation for protected media content.
//!
//! Each track is encrypted with its own 16-byte key, derived locally from
//! the track identifier and a process-wide master secret. No network
//! round-trip is involved beyond the identity lookup itself:
//!
//! 1. Hash the track identifier with MD5 and render it as lowercase hex
//!    (32 ASCII bytes).
//! 2. Fold the two 16-byte halves of the hex digest onto the master secret:
//!    `key[i] = hex[i] ^ hex[i + 16] ^ secret[i]`.
//!
//! The derivation is deterministic: the same `(identifier, secret)` pair
//! always yields the same key. Keys are recomputed per session and never
//! persisted.
//!
//! # Security
//!
//! No master secret is included in this code. The secret must be provided
//! externally, see [`crate::secret`].

use std::{ops::Deref, str::FromStr};

use md5::{Digest, Md5};
use veil::Redact;

use crate::error::Error;

/// Length of decryption keys in bytes.
pub const KEY_LENGTH: usize = 16;

/// Raw key bytes.
pub type RawKey = [u8; KEY_LENGTH];

/// Validated decryption key.
///
/// Used both for the master secret and for derived per-track keys.
/// Ensures keys are exactly 16 bytes, as required by the block cipher.
/// The raw bytes are redacted from debug output.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Redact)]
pub struct Key(#[redact(fixed = 3)] RawKey);

impl Key {
    /// Derives the track-specific decryption key.
    ///
    /// Pure function of the identifier and the master secret; always
    /// returns exactly [`KEY_LENGTH`] bytes.
    ///
    /// # Arguments
    ///
    /// * `identifier` - Opaque track identifier, doubles as salt material
    /// * `secret` - Process-wide master secret
    #[must_use]
    pub fn for_track(identifier: &str, secret: &Self) -> Self {
        let track_hash = format!("{:x}", Md5::digest(identifier.as_bytes()));
        let track_hash = track_hash.as_bytes();

        let mut key = RawKey::default();
        for i in 0..KEY_LENGTH {
            key[i] = track_hash[i] ^ track_hash[i + KEY_LENGTH] ^ secret[i];
        }
        Self(key)
    }
}

impl From<RawKey> for Key {
    fn from(raw: RawKey) -> Self {
        Self(raw)
    }
}

impl FromStr for Key {
    type Err = Error;

    /// Parses a string into a key.
    ///
    /// The string must be exactly 16 bytes long, as required by the
    /// block cipher and the service's key schedule.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfRange` if the string length isn't exactly
    /// 16 bytes.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let len = s.len();
        if len != KEY_LENGTH {
            return Err(Error::out_of_range(format!(
                "key length is {len} but should be {KEY_LENGTH}",
            )));
        }

        let bytes = s.as_bytes();
        let mut key = [0; KEY_LENGTH];
        key.copy_from_slice(bytes);

        Ok(Self(key))
    }
}

impl Deref for Key {
    type Target = RawKey;

    /// Provides read-only access to the raw key bytes.
    ///
    /// This allows using the key with cryptographic functions that expect
    /// byte arrays while maintaining key encapsulation.
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let secret: Key = "0123456789abcdef".parse().unwrap();
        let first = Key::for_track("12345", &secret);
        let second = Key::for_track("12345", &secret);
        assert_eq!(first, second);
    }

    #[test]
    fn derivation_matches_reference_vector() {
        // MD5("T1") = ce499dea30cfce118f4fe85da0227e83; with an all-zero
        // secret the key is the XOR of the two hex digest halves.
        let key = Key::for_track("T1", &Key::default());
        let expected: RawKey = [
            0x5b, 0x03, 0x00, 0x5f, 0x5c, 0x5c, 0x50, 0x05, 0x52, 0x00, 0x51, 0x54, 0x54, 0x00,
            0x09, 0x02,
        ];
        assert_eq!(*key, expected);
    }

    #[test]
    fn distinct_identifiers_yield_distinct_keys() {
        let secret: Key = "0123456789abcdef".parse().unwrap();
        assert_ne!(Key::for_track("1", &secret), Key::for_track("2", &secret));
    }

    #[test]
    fn parses_only_exact_length() {
        assert!("1234567890123456".parse::<Key>().is_ok());
        assert!("12345".parse::<Key>().is_err());
        assert!("12345678901234567".parse::<Key>().is_err());
    }

    #[test]
    fn debug_redacts_key_material() {
        let key: Key = "1234567890123456".parse().unwrap();
        assert!(format!("{key:?}").contains("***"));
    }
}
