//! The pluggable seams: key providers, methods and the definitions that build them.
//!
//! A *definition* is a named template. It exposes a [`DefinitionSchema`] and a
//! `configure` step that turns a validated body (plus the key providers
//! resolved so far) into a ready-to-use instance. Construction and
//! configuration are separate so that each can be tested on its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use common::{Diagnostics, EncryptionError};

use crate::schema::{BodyContent, DefinitionSchema};

type KeyFn = dyn Fn() -> Result<Vec<u8>, EncryptionError> + Send + Sync;

/// A zero-argument source of raw key material.
///
/// Invoking [`KeyProvider::key`] may block on I/O. Nothing is cached: each
/// call re-runs the underlying source, so callers that need memoisation must
/// add it themselves.
#[derive(Clone)]
pub struct KeyProvider(Arc<KeyFn>);

impl KeyProvider {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Vec<u8>, EncryptionError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Produce the key material.
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying source reports.
    pub fn key(&self) -> Result<Vec<u8>, EncryptionError> {
        (self.0)()
    }
}

impl fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyProvider(..)")
    }
}

/// Result of a decryption that distinguishes legacy unencrypted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrypted {
    /// The input was not an encrypted envelope and was passed through as-is.
    Plaintext(Vec<u8>),
    /// The input was an envelope; this is the recovered plaintext.
    Encrypted(Vec<u8>),
}

impl Decrypted {
    pub fn was_encrypted(&self) -> bool {
        matches!(self, Decrypted::Encrypted(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Decrypted::Plaintext(bytes) | Decrypted::Encrypted(bytes) => bytes,
        }
    }
}

/// A bound encryption method, ready to encrypt and decrypt.
///
/// Implementations hold only immutable configuration, so one instance may be
/// shared between threads without locking.
#[cfg_attr(test, mockall::automock)]
pub trait Method: Send + Sync {
    /// Encrypt `plaintext`. Must fail rather than return unencrypted output.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError>;

    /// Decrypt `data`, reporting whether it was encrypted at all.
    fn decrypt_detailed(&self, data: &[u8]) -> Result<Decrypted, EncryptionError>;

    /// Decrypt `data` into plaintext.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.decrypt_detailed(data).map(Decrypted::into_bytes)
    }
}

/// A named template for key providers.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProviderDefinition: Send + Sync {
    fn schema(&self) -> DefinitionSchema;

    /// Build a [`KeyProvider`] from a validated body.
    ///
    /// `key_providers` holds every provider resolved before this one, keyed
    /// by `<type>.<name>`.
    fn configure(
        &self,
        body: &BodyContent,
        key_providers: &HashMap<String, KeyProvider>,
    ) -> Result<KeyProvider, Diagnostics>;
}

/// A named template for encryption methods.
#[cfg_attr(test, mockall::automock)]
pub trait MethodDefinition: Send + Sync {
    fn schema(&self) -> DefinitionSchema;

    /// Build a bound [`Method`] from a validated body and the resolved key
    /// providers, keyed by `<type>.<name>`.
    fn configure(
        &self,
        body: &BodyContent,
        key_providers: &HashMap<String, KeyProvider>,
    ) -> Result<Arc<dyn Method>, Diagnostics>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn key_provider_is_invoked_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = KeyProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![7u8; 32])
        });
        assert_eq!(provider.key().unwrap(), vec![7u8; 32]);
        assert_eq!(provider.clone().key().unwrap().len(), 32);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn key_provider_debug_hides_material() {
        let provider = KeyProvider::new(|| Ok(vec![0xAB; 32]));
        assert_eq!(format!("{provider:?}"), "KeyProvider(..)");
    }

    #[test]
    fn decrypted_reports_origin() {
        let passthrough = Decrypted::Plaintext(b"{}".to_vec());
        assert!(!passthrough.was_encrypted());
        assert_eq!(passthrough.into_bytes(), b"{}");

        let decrypted = Decrypted::Encrypted(b"{\"a\":1}".to_vec());
        assert!(decrypted.was_encrypted());
        assert_eq!(decrypted.into_bytes(), b"{\"a\":1}");
    }
}
