//! `client-side/AES256-CFB/SHA256`: the reference state encryption method.
//!
//! Configuration accepts either a literal `key` (64 lowercase hex characters)
//! or a `key_provider` reference. The key is *not* validated when the method
//! is configured; it is parsed on every call, so a malformed key surfaces as
//! [`EncryptionError::Configuration`] on first use.
//!
//! Decryption accepts legacy unencrypted state: anything that does not start
//! with `{"crypted":"` is returned unchanged and a warning is logged. This is
//! the only fallback. Encryption never falls back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use common::{Diagnostic, Diagnostics, EncryptionError};
use tracing::warn;

use crate::crypto::{self, envelope, Classified, Envelope, RawKey};
use crate::definition::{Decrypted, KeyProvider, Method, MethodDefinition};
use crate::schema::{BodyContent, BodySchema, DefinitionSchema};

/// Registry name of this method.
pub const NAME: &str = "client-side/AES256-CFB/SHA256";

const KEY_ATTR: &str = "key";
const KEY_PROVIDER_ATTR: &str = "key_provider";

/// Where the bound method gets its key from.
#[derive(Clone)]
enum KeySource {
    /// The `key` parameter as configured, not yet validated.
    Parameter(String),
    Provider(KeyProvider),
    Missing,
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Parameter(_) => f.write_str("Parameter([REDACTED])"),
            KeySource::Provider(provider) => f.debug_tuple("Provider").field(provider).finish(),
            KeySource::Missing => f.write_str("Missing"),
        }
    }
}

/// Definition for [`Aes256CfbSha256Method`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256CfbSha256Definition;

impl MethodDefinition for Aes256CfbSha256Definition {
    fn schema(&self) -> DefinitionSchema {
        DefinitionSchema::new(BodySchema::new().optional(KEY_ATTR).optional(KEY_PROVIDER_ATTR))
            .key_provider_field(KEY_PROVIDER_ATTR)
    }

    fn configure(
        &self,
        body: &BodyContent,
        key_providers: &HashMap<String, KeyProvider>,
    ) -> Result<Arc<dyn Method>, Diagnostics> {
        let source = match (body.attribute(KEY_ATTR), body.attribute(KEY_PROVIDER_ATTR)) {
            (Some(_), Some(reference)) => {
                return Err(Diagnostic::error(
                    "Conflicting key sources",
                    format!("Set either {KEY_ATTR:?} or {KEY_PROVIDER_ATTR:?}, not both."),
                )
                .with_subject(reference.range.clone())
                .into());
            }
            (Some(key), None) => KeySource::Parameter(key.value.clone()),
            (None, Some(reference)) => match key_providers.get(&reference.value) {
                Some(provider) => KeySource::Provider(provider.clone()),
                None => {
                    return Err(Diagnostic::error(
                        "Unknown key provider",
                        format!("No key provider {:?} has been configured.", reference.value),
                    )
                    .with_subject(reference.range.clone())
                    .into());
                }
            },
            (None, None) => KeySource::Missing,
        };
        Ok(Arc::new(Aes256CfbSha256Method { source }))
    }
}

/// A bound AES-256-CFB method with SHA-256 integrity tag.
#[derive(Debug, Clone)]
pub struct Aes256CfbSha256Method {
    source: KeySource,
}

impl Aes256CfbSha256Method {
    /// Bind directly to a hex key parameter. The key is validated per call.
    pub fn with_key(hex_key: impl Into<String>) -> Self {
        Self {
            source: KeySource::Parameter(hex_key.into()),
        }
    }

    /// Bind to a key provider. The provider must yield exactly 32 bytes.
    pub fn with_key_provider(provider: KeyProvider) -> Self {
        Self {
            source: KeySource::Provider(provider),
        }
    }

    fn key(&self) -> Result<RawKey, EncryptionError> {
        match &self.source {
            KeySource::Parameter(hex_key) => RawKey::parse_hex(hex_key),
            KeySource::Provider(provider) => RawKey::from_slice(&provider.key()?),
            KeySource::Missing => Err(EncryptionError::Configuration(
                "configuration for AES256 needs the parameter 'key' set to a 32 byte \
                 lower case hexadecimal value"
                    .into(),
            )),
        }
    }
}

impl Method for Aes256CfbSha256Method {
    /// Encrypt state into `{"crypted":"<hex(iv || cfb(plaintext || sha256))>"}`.
    ///
    /// Fails if encryption is not possible so that unencrypted state is never
    /// written.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let key = self.key()?;
        let sealed = crypto::seal(plaintext, &key)?;
        Ok(sealed.to_bytes())
    }

    fn decrypt_detailed(&self, data: &[u8]) -> Result<Decrypted, EncryptionError> {
        match envelope::classify(data) {
            Classified::Plaintext(plain) => {
                warn!("found unencrypted state, transparently reading it anyway");
                Ok(Decrypted::Plaintext(plain.to_vec()))
            }
            Classified::Envelope(data) => {
                let key = self.key()?;
                let sealed = Envelope::parse(data)?;
                crypto::open(&sealed, &key).map(Decrypted::Encrypted)
            }
        }
    }
}
