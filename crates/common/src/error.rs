//! Common error types shared across crates.

use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Top-level error type for state encryption.
///
/// Every variant maps to a stable [`ErrorKind`] so that callers can branch on
/// the failure class without matching on message text:
/// - [`EncryptionError::Configuration`] → `configuration_error`
/// - [`EncryptionError::Schema`] → `schema_error`
/// - [`EncryptionError::Format`] → `format_error`
/// - [`EncryptionError::Crypto`] → `crypto_error`
/// - [`EncryptionError::Integrity`] → `integrity_error`
/// - [`EncryptionError::KeyProvider`] → `key_provider_error`
#[derive(Debug, Clone, Error)]
pub enum EncryptionError {
    /// A parameter is missing or malformed, or a name could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The configuration body failed structural validation.
    #[error("schema error: {0}")]
    Schema(Diagnostics),

    /// The encrypted envelope is not well-formed (garbled, truncated, bad hex).
    #[error("format error: {0}")]
    Format(String),

    /// The cipher could not be constructed or the randomness source failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The integrity tag of the decrypted payload did not match.
    #[error("integrity error: hash of decrypted payload did not match at position {position}")]
    Integrity {
        /// Index of the first differing tag byte.
        position: usize,
    },

    /// A key provider failed to produce key material.
    #[error("key provider error: {0}")]
    KeyProvider(String),
}

/// Machine-readable classification of an [`EncryptionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Schema,
    Format,
    Crypto,
    Integrity,
    KeyProvider,
}

impl ErrorKind {
    /// Short snake_case code, stable across releases.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::Schema => "schema_error",
            ErrorKind::Format => "format_error",
            ErrorKind::Crypto => "crypto_error",
            ErrorKind::Integrity => "integrity_error",
            ErrorKind::KeyProvider => "key_provider_error",
        }
    }
}

impl EncryptionError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncryptionError::Configuration(_) => ErrorKind::Configuration,
            EncryptionError::Schema(_) => ErrorKind::Schema,
            EncryptionError::Format(_) => ErrorKind::Format,
            EncryptionError::Crypto(_) => ErrorKind::Crypto,
            EncryptionError::Integrity { .. } => ErrorKind::Integrity,
            EncryptionError::KeyProvider(_) => ErrorKind::KeyProvider,
        }
    }
}

impl From<Diagnostics> for EncryptionError {
    fn from(diags: Diagnostics) -> Self {
        EncryptionError::Schema(diags)
    }
}
