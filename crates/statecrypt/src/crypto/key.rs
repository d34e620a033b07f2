//! [`RawKey`]: a 32-byte AES-256 key parsed from configuration.

use std::fmt;

use common::EncryptionError;
use zeroize::Zeroize;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Length of the hex form of a key.
pub const HEX_KEY_LEN: usize = KEY_LEN * 2;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which key material lives in RAM.
#[derive(Clone)]
pub struct RawKey(Box<[u8; KEY_LEN]>);

impl RawKey {
    /// Parse a key from exactly 64 lowercase hexadecimal characters.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Configuration`] for any other input,
    /// including uppercase hex.
    pub fn parse_hex(hex_key: &str) -> Result<Self, EncryptionError> {
        let well_formed = hex_key.len() == HEX_KEY_LEN
            && hex_key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !well_formed {
            return Err(EncryptionError::Configuration(
                "key was not a hex string representing 32 bytes, must match [0-9a-f]{64}".into(),
            ));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        hex::decode_to_slice(hex_key, &mut buf[..])
            .map_err(|e| EncryptionError::Configuration(format!("key is not valid hex: {e}")))?;
        Ok(Self(buf))
    }

    /// Wrap raw key bytes produced by a key provider.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Configuration`] if `bytes` is not exactly
    /// [`KEY_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncryptionError> {
        if bytes.len() != KEY_LEN {
            return Err(EncryptionError::Configuration(format!(
                "key provider returned {} bytes, expected {KEY_LEN}",
                bytes.len()
            )));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Zeroize for RawKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for RawKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("RawKey([REDACTED])")
    }
}
