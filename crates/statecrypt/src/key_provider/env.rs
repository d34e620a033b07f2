//! `env`: hex key material read from an environment variable on every call.

use std::collections::HashMap;

use common::{Diagnostic, Diagnostics, EncryptionError};
use tracing::debug;

use super::decode_key_material;
use crate::definition::{KeyProvider, KeyProviderDefinition};
use crate::schema::{BodyContent, BodySchema, DefinitionSchema};

/// Registry name of this key provider.
pub const NAME: &str = "env";

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvKeyProviderDefinition;

impl KeyProviderDefinition for EnvKeyProviderDefinition {
    fn schema(&self) -> DefinitionSchema {
        DefinitionSchema::new(BodySchema::new().required("variable"))
    }

    fn configure(
        &self,
        body: &BodyContent,
        _key_providers: &HashMap<String, KeyProvider>,
    ) -> Result<KeyProvider, Diagnostics> {
        let variable = match body.attribute("variable") {
            Some(attr) if !attr.value.trim().is_empty() => attr.value.clone(),
            other => {
                let range = other.map_or_else(|| body.range().clone(), |a| a.range.clone());
                return Err(Diagnostic::error(
                    "Invalid variable name",
                    "The \"variable\" argument must name a non-empty environment variable.",
                )
                .with_subject(range)
                .into());
            }
        };

        Ok(KeyProvider::new(move || {
            debug!(variable = %variable, "reading key material from environment");
            let value = std::env::var(&variable).map_err(|e| {
                EncryptionError::KeyProvider(format!(
                    "failed to read environment variable {variable}: {e}"
                ))
            })?;
            decode_key_material(&value, &format!("environment variable {variable}"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Body;
    use common::ErrorKind;

    fn configure(variable: &str) -> Result<KeyProvider, Diagnostics> {
        let def = EnvKeyProviderDefinition;
        let content = Body::from_attributes([("variable", variable)])
            .content(&def.schema().body)
            .unwrap();
        def.configure(&content, &HashMap::new())
    }

    #[test]
    fn reads_variable_on_each_call() {
        let var = "STATECRYPT_TEST_ENV_KEY_READS";
        std::env::set_var(var, "01".repeat(32));
        let provider = configure(var).unwrap();
        assert_eq!(provider.key().unwrap(), vec![0x01; 32]);

        std::env::set_var(var, "02".repeat(32));
        assert_eq!(provider.key().unwrap(), vec![0x02; 32]);
        std::env::remove_var(var);
    }

    #[test]
    fn missing_variable_is_key_provider_error() {
        let provider = configure("STATECRYPT_TEST_ENV_KEY_MISSING").unwrap();
        let err = provider.key().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyProvider);
        assert!(err.to_string().contains("STATECRYPT_TEST_ENV_KEY_MISSING"));
    }

    #[test]
    fn empty_variable_name_rejected() {
        assert!(configure("  ").is_err());
    }
}
