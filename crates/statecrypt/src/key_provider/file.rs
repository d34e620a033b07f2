//! `file`: hex key material read from a file on every call.

use std::collections::HashMap;
use std::path::PathBuf;

use common::{Diagnostic, Diagnostics, EncryptionError};
use tracing::debug;

use super::decode_key_material;
use crate::definition::{KeyProvider, KeyProviderDefinition};
use crate::schema::{BodyContent, BodySchema, DefinitionSchema};

/// Registry name of this key provider.
pub const NAME: &str = "file";

#[derive(Debug, Clone, Copy, Default)]
pub struct FileKeyProviderDefinition;

impl KeyProviderDefinition for FileKeyProviderDefinition {
    fn schema(&self) -> DefinitionSchema {
        DefinitionSchema::new(BodySchema::new().required("path"))
    }

    fn configure(
        &self,
        body: &BodyContent,
        _key_providers: &HashMap<String, KeyProvider>,
    ) -> Result<KeyProvider, Diagnostics> {
        let path = match body.attribute("path") {
            Some(attr) if !attr.value.trim().is_empty() => PathBuf::from(&attr.value),
            other => {
                let range = other.map_or_else(|| body.range().clone(), |a| a.range.clone());
                return Err(Diagnostic::error(
                    "Invalid path",
                    "The \"path\" argument must name a key file.",
                )
                .with_subject(range)
                .into());
            }
        };

        Ok(KeyProvider::new(move || {
            debug!(path = %path.display(), "reading key material from file");
            let text = std::fs::read_to_string(&path).map_err(|e| {
                EncryptionError::KeyProvider(format!(
                    "failed to read key file {}: {e}",
                    path.display()
                ))
            })?;
            decode_key_material(&text, &format!("key file {}", path.display()))
        }))
    }
}
