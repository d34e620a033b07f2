//! Detection, validation and (de)serialisation of the `{"crypted":"…"}` envelope.
//!
//! Two checks with deliberately different strictness are used:
//!
//! - [`is_encrypted`] only looks at the prefix and decides whether the data
//!   should be treated as an envelope at all.
//! - [`is_syntactically_valid`] requires the exact shape
//!   `{"crypted":"<one or more lowercase hex chars>"}` with nothing after it.
//!
//! Data that passes the first check but fails the second is a hard
//! [`EncryptionError::Format`] error, never a plaintext passthrough.

use common::EncryptionError;

use super::cipher::BLOCK_SIZE;

/// Literal text every envelope starts with.
pub const PREFIX: &[u8] = br#"{"crypted":""#;

/// Literal text every envelope ends with.
pub const SUFFIX: &[u8] = br#""}"#;

/// Classification of persisted state bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified<'a> {
    /// Legacy unencrypted state.
    Plaintext(&'a [u8]),
    /// Data that claims to be an envelope. It may still fail to parse.
    Envelope(&'a [u8]),
}

/// Classify `data` using the permissive prefix check.
pub fn classify(data: &[u8]) -> Classified<'_> {
    if is_encrypted(data) {
        Classified::Envelope(data)
    } else {
        Classified::Plaintext(data)
    }
}

/// Returns `true` if `data` begins with `{"crypted":"`.
pub fn is_encrypted(data: &[u8]) -> bool {
    data.starts_with(PREFIX)
}

/// Returns `true` only if `data` is exactly `{"crypted":"<lowercase hex>"}`.
pub fn is_syntactically_valid(data: &[u8]) -> bool {
    hex_payload(data).is_some()
}

fn hex_payload(data: &[u8]) -> Option<&[u8]> {
    let inner = data.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let lower_hex = !inner.is_empty()
        && inner
            .iter()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    lower_hex.then_some(inner)
}

/// Extract and hex-decode the payload of a strictly valid envelope.
///
/// # Errors
///
/// Returns [`EncryptionError::Format`] if `data` is not strictly valid or the
/// hex payload does not decode completely (odd length).
pub fn decode(data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let payload = hex_payload(data).ok_or_else(|| {
        EncryptionError::Format(
            "ciphertext contains invalid characters, possibly cut off or garbled".into(),
        )
    })?;
    hex::decode(payload)
        .map_err(|e| EncryptionError::Format(format!("ciphertext did not fully decode: {e}")))
}

/// Hex-encode `ciphertext` and wrap it in the envelope literals.
pub fn encode(ciphertext: &[u8]) -> Vec<u8> {
    let hex = hex::encode(ciphertext);
    let mut out = Vec::with_capacity(PREFIX.len() + hex.len() + SUFFIX.len());
    out.extend_from_slice(PREFIX);
    out.extend_from_slice(hex.as_bytes());
    out.extend_from_slice(SUFFIX);
    out
}

/// A decoded envelope: the IV and the encrypted `plaintext || tag` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: [u8; BLOCK_SIZE],
    pub body: Vec<u8>,
}

impl Envelope {
    /// Parse a strictly valid envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Format`] if the envelope is malformed or the
    /// decoded payload is too short to contain an IV.
    pub fn parse(data: &[u8]) -> Result<Self, EncryptionError> {
        let raw = decode(data)?;
        if raw.len() < BLOCK_SIZE {
            return Err(EncryptionError::Format(
                "ciphertext too short, did not contain initial vector".into(),
            ));
        }
        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(&raw[..BLOCK_SIZE]);
        Ok(Self {
            iv,
            body: raw[BLOCK_SIZE..].to_vec(),
        })
    }

    /// Serialise to the canonical `{"crypted":"…"}` text.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(BLOCK_SIZE + self.body.len());
        raw.extend_from_slice(&self.iv);
        raw.extend_from_slice(&self.body);
        encode(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_check_is_permissive() {
        assert!(is_encrypted(br#"{"crypted":""#));
        assert!(is_encrypted(br#"{"crypted":"ZZ not hex at all"#));
        assert!(!is_encrypted(br#"{"version":4}"#));
        assert!(!is_encrypted(br#" {"crypted":"00"}"#));
        assert!(!is_encrypted(b""));
    }

    #[test]
    fn strict_check_requires_exact_shape() {
        assert!(is_syntactically_valid(br#"{"crypted":"00ff"}"#));
        assert!(!is_syntactically_valid(br#"{"crypted":""}"#));
        assert!(!is_syntactically_valid(br#"{"crypted":"00FF"}"#));
        assert!(!is_syntactically_valid(br#"{"crypted":"00ff"} "#));
        assert!(!is_syntactically_valid(br#"{"crypted":"00ff""#));
        assert!(!is_syntactically_valid(br#"{"crypted": "00ff"}"#));
    }

    #[test]
    fn classify_splits_on_prefix() {
        assert_eq!(
            classify(br#"{"version":4}"#),
            Classified::Plaintext(br#"{"version":4}"#)
        );
        assert!(matches!(classify(br#"{"crypted":"zz"}"#), Classified::Envelope(_)));
    }

    #[test]
    fn encode_wraps_lowercase_hex() {
        assert_eq!(encode(&[0x00, 0xAB, 0x10]), br#"{"crypted":"00ab10"}"#.to_vec());
        assert_eq!(decode(br#"{"crypted":"00ab10"}"#).unwrap(), vec![0x00, 0xAB, 0x10]);
    }

    #[test]
    fn odd_length_hex_is_format_error() {
        let err = decode(br#"{"crypted":"abc"}"#).unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::Format);
    }

    #[test]
    fn garbled_envelope_is_format_error() {
        let err = decode(br#"{"crypted":"xyz"}"#).unwrap_err();
        assert!(err.to_string().contains("possibly cut off or garbled"));
    }

    #[test]
    fn parse_requires_initial_vector() {
        let short = encode(&[0u8; BLOCK_SIZE - 1]);
        let err = Envelope::parse(&short).unwrap_err();
        assert!(err.to_string().contains("did not contain initial vector"));

        let exact = encode(&[1u8; BLOCK_SIZE]);
        let env = Envelope::parse(&exact).unwrap();
        assert_eq!(env.iv, [1u8; BLOCK_SIZE]);
        assert!(env.body.is_empty());
        assert_eq!(env.to_bytes(), exact);
    }
}
