//! AES-256-CFB encryption and decryption with an appended SHA-256 tag.
//!
//! **Layout:** `iv (16 bytes) || cfb(plaintext || sha256(plaintext))`.
//! CFB is a stream mode, so the encrypted body is exactly
//! `plaintext.len() + TAG_LEN` bytes long.
//!
//! **Integrity:** the tag is a plain hash, not a MAC, and is only meaningful
//! because it is encrypted together with the plaintext. A fresh random IV is
//! generated for every call; IVs are never reused under the same key.

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use common::EncryptionError;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::envelope::Envelope;
use super::key::RawKey;

/// AES block size, and therefore the IV length (16 bytes = 128 bits).
pub const BLOCK_SIZE: usize = 16;

/// Byte length of the SHA-256 integrity tag.
pub const TAG_LEN: usize = 32;

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// Encrypt `plaintext` under `key` with a fresh random IV.
///
/// # Errors
///
/// Returns [`EncryptionError::Crypto`] if the OS randomness source fails or
/// the cipher cannot be constructed. No partial output is ever produced.
pub fn seal(plaintext: &[u8], key: &RawKey) -> Result<Envelope, EncryptionError> {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| EncryptionError::Crypto(format!("failed to generate initial vector: {e}")))?;

    let cipher = Aes256CfbEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| EncryptionError::Crypto(format!("failed to construct cipher: {e}")))?;

    let tag = Sha256::digest(plaintext);
    let mut body = Vec::with_capacity(plaintext.len() + TAG_LEN);
    body.extend_from_slice(plaintext);
    body.extend_from_slice(&tag);

    cipher.encrypt(&mut body);
    Ok(Envelope { iv, body })
}

/// Decrypt an [`Envelope`] under `key` and verify its integrity tag.
///
/// # Errors
///
/// Returns [`EncryptionError::Format`] if the body is too short to hold a
/// tag, [`EncryptionError::Crypto`] if the cipher cannot be constructed and
/// [`EncryptionError::Integrity`] if the recomputed tag differs (wrong key or
/// tampered data).
pub fn open(envelope: &Envelope, key: &RawKey) -> Result<Vec<u8>, EncryptionError> {
    if envelope.body.len() < TAG_LEN {
        return Err(EncryptionError::Format(
            "ciphertext too short, did not contain integrity hash".into(),
        ));
    }

    let cipher = Aes256CfbDec::new_from_slices(key.as_bytes(), &envelope.iv)
        .map_err(|e| EncryptionError::Crypto(format!("failed to construct cipher: {e}")))?;

    let mut body = envelope.body.clone();
    cipher.decrypt(&mut body);

    let split = body.len() - TAG_LEN;
    let computed = Sha256::digest(&body[..split]);
    let tag_read = &body[split..];

    if !bool::from(computed.as_slice().ct_eq(tag_read)) {
        let position = computed
            .iter()
            .zip(tag_read)
            .position(|(a, b)| a != b)
            .unwrap_or(0);
        return Err(EncryptionError::Integrity { position });
    }

    body.truncate(split);
    Ok(body)
}
