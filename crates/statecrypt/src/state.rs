//! [`StateEncryption`]: the entry point used when reading and writing state.
//!
//! Writes always go through the primary binding. Reads try the primary and,
//! if that fails with a key-related error, retry with the fallback binding so
//! that state encrypted under a previous key stays readable while keys are
//! being rotated.

use anyhow::{Context, Result};
use common::{EncryptionError, ErrorKind};
use tracing::{info, warn};

use crate::binding::{bind, Binding};
use crate::config::{EnvConfig, FALLBACK_VAR, PRIMARY_VAR};
use crate::registry::Registry;

/// Primary binding plus an optional decryption-only fallback.
#[derive(Debug, Clone)]
pub struct StateEncryption {
    primary: Binding,
    fallback: Option<Binding>,
}

impl StateEncryption {
    pub fn new(primary: Binding, fallback: Option<Binding>) -> Self {
        Self { primary, fallback }
    }

    /// Load configuration from the environment and bind it against `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing, malformed or fails to bind.
    pub fn from_env(registry: &Registry) -> Result<Self> {
        let cfg = EnvConfig::from_env()?;
        Self::from_config(registry, &cfg)
    }

    /// Bind an already loaded [`EnvConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error carrying the binding diagnostics if either
    /// configuration is malformed or fails to bind.
    pub fn from_config(registry: &Registry, cfg: &EnvConfig) -> Result<Self> {
        let primary_cfg = cfg
            .primary()
            .map_err(EncryptionError::from)
            .with_context(|| format!("invalid {PRIMARY_VAR} configuration"))?;
        let primary = bind(registry, &primary_cfg)
            .map_err(EncryptionError::from)
            .with_context(|| format!("failed to bind {PRIMARY_VAR} configuration"))?;
        log_warnings(&primary, PRIMARY_VAR);

        let fallback = match cfg
            .fallback()
            .map_err(EncryptionError::from)
            .with_context(|| format!("invalid {FALLBACK_VAR} configuration"))?
        {
            Some(fallback_cfg) => {
                let binding = bind(registry, &fallback_cfg)
                    .map_err(EncryptionError::from)
                    .with_context(|| format!("failed to bind {FALLBACK_VAR} configuration"))?;
                log_warnings(&binding, FALLBACK_VAR);
                Some(binding)
            }
            None => None,
        };

        info!(
            method = %primary.method_name(),
            fallback = fallback.is_some(),
            "state encryption configured"
        );
        Ok(Self::new(primary, fallback))
    }

    /// Encrypt state with the primary binding. Never falls back.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.primary.encrypt(plaintext)
    }

    /// Decrypt state, retrying with the fallback binding on key-related errors.
    ///
    /// If both attempts fail, the primary error is returned.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let err = match self.primary.decrypt(data) {
            Ok(plaintext) => return Ok(plaintext),
            Err(err) => err,
        };
        let Some(fallback) = &self.fallback else {
            return Err(err);
        };
        if !matches!(
            err.kind(),
            ErrorKind::Integrity | ErrorKind::Configuration | ErrorKind::KeyProvider
        ) {
            return Err(err);
        }

        match fallback.decrypt(data) {
            Ok(plaintext) => {
                info!(
                    method = %fallback.method_name(),
                    "state decrypted with fallback configuration"
                );
                Ok(plaintext)
            }
            Err(fallback_err) => {
                warn!(error = %fallback_err, "fallback decryption failed");
                Err(err)
            }
        }
    }
}

fn log_warnings(binding: &Binding, source: &str) {
    for diag in binding.diagnostics().iter() {
        warn!(
            source,
            summary = %diag.summary,
            detail = %diag.detail,
            "encryption configuration warning"
        );
    }
}
