//! Encryption configuration loaded from environment variables.
//!
//! Two variables are read at startup, each holding a JSON document in the
//! [`EncryptionConfig`] shape:
//!
//! - `STATE_ENCRYPTION`: **required**, used for encryption and decryption.
//! - `STATE_ENCRYPTION_FALLBACK`: optional, used for decryption only, so
//!   that state written under a previous key stays readable during rotation.

use std::fmt;

use anyhow::{Context, Result};
use common::Diagnostics;
use serde::Deserialize;

use crate::binding::EncryptionConfig;

/// Name of the primary configuration variable.
pub const PRIMARY_VAR: &str = "STATE_ENCRYPTION";

/// Name of the decryption-only fallback configuration variable.
pub const FALLBACK_VAR: &str = "STATE_ENCRYPTION_FALLBACK";

/// Raw encryption configuration as read from the environment.
#[derive(Clone, Deserialize)]
pub struct EnvConfig {
    /// JSON for the primary configuration. **Required.**
    pub state_encryption: String,

    /// JSON for the fallback configuration.
    #[serde(default)]
    pub state_encryption_fallback: Option<String>,
}

impl EnvConfig {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `STATE_ENCRYPTION` is absent or empty, or if
    /// `STATE_ENCRYPTION_FALLBACK` is set but empty.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build encryption configuration from environment")?;

        let c: EnvConfig = cfg
            .try_deserialize()
            .context("failed to deserialise encryption configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.state_encryption, PRIMARY_VAR)?;
        if let Some(fallback) = &self.state_encryption_fallback {
            ensure_non_empty(fallback, FALLBACK_VAR)?;
        }
        Ok(())
    }

    /// Parse the primary configuration.
    pub fn primary(&self) -> Result<EncryptionConfig, Diagnostics> {
        EncryptionConfig::from_json(&self.state_encryption, PRIMARY_VAR)
    }

    /// Parse the fallback configuration, if one is set.
    pub fn fallback(&self) -> Result<Option<EncryptionConfig>, Diagnostics> {
        self.state_encryption_fallback
            .as_deref()
            .map(|text| EncryptionConfig::from_json(text, FALLBACK_VAR))
            .transpose()
    }
}

impl fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The JSON may embed a static key; never print it.
        f.debug_struct("EnvConfig")
            .field("state_encryption", &"[REDACTED]")
            .field(
                "state_encryption_fallback",
                &self.state_encryption_fallback.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHOD_ONLY: &str =
        r#"{"method": {"type": "client-side/AES256-CFB/SHA256", "config": {"key": "00"}}}"#;

    #[test]
    fn validate_rejects_empty_primary() {
        let cfg = EnvConfig {
            state_encryption: "  ".into(),
            state_encryption_fallback: None,
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("STATE_ENCRYPTION"));
    }

    #[test]
    fn validate_rejects_empty_fallback() {
        let cfg = EnvConfig {
            state_encryption: METHOD_ONLY.into(),
            state_encryption_fallback: Some(String::new()),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_primary_and_fallback() {
        let cfg = EnvConfig {
            state_encryption: METHOD_ONLY.into(),
            state_encryption_fallback: None,
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.primary().is_ok());
        assert!(cfg.fallback().unwrap().is_none());

        let cfg = EnvConfig {
            state_encryption_fallback: Some("{".into()),
            ..cfg
        };
        let diags = cfg.fallback().unwrap_err();
        let subject = diags.iter().next().unwrap().subject.clone().unwrap();
        assert_eq!(subject.filename, FALLBACK_VAR);
    }

    #[test]
    fn from_env_reads_state_encryption() {
        // Single test owns these variables so parallel tests cannot race on them.
        std::env::set_var(PRIMARY_VAR, METHOD_ONLY);
        std::env::remove_var(FALLBACK_VAR);
        let cfg = EnvConfig::from_env().unwrap();
        assert_eq!(cfg.state_encryption, METHOD_ONLY);
        assert!(cfg.state_encryption_fallback.is_none());
        assert!(cfg.primary().is_ok());

        std::env::set_var(FALLBACK_VAR, METHOD_ONLY);
        let cfg = EnvConfig::from_env().unwrap();
        assert_eq!(cfg.state_encryption_fallback.as_deref(), Some(METHOD_ONLY));

        std::env::set_var(PRIMARY_VAR, "");
        assert!(EnvConfig::from_env().is_err());

        std::env::remove_var(PRIMARY_VAR);
        std::env::remove_var(FALLBACK_VAR);
        assert!(EnvConfig::from_env().is_err());
    }

    #[test]
    fn debug_redacts_json() {
        let cfg = EnvConfig {
            state_encryption: METHOD_ONLY.into(),
            state_encryption_fallback: None,
        };
        assert!(!format!("{cfg:?}").contains("client-side"));
    }
}
