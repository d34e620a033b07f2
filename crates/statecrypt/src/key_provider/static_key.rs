//! `static`: a key written directly into the configuration.

use std::collections::HashMap;

use common::{Diagnostic, Diagnostics};

use crate::crypto::RawKey;
use crate::definition::{KeyProvider, KeyProviderDefinition};
use crate::schema::{BodyContent, BodySchema, DefinitionSchema};

/// Registry name of this key provider.
pub const NAME: &str = "static";

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticKeyProviderDefinition;

impl KeyProviderDefinition for StaticKeyProviderDefinition {
    fn schema(&self) -> DefinitionSchema {
        DefinitionSchema::new(BodySchema::new().required("key"))
    }

    fn configure(
        &self,
        body: &BodyContent,
        _key_providers: &HashMap<String, KeyProvider>,
    ) -> Result<KeyProvider, Diagnostics> {
        let attr = body.attribute("key").ok_or_else(|| {
            Diagnostics::from(
                Diagnostic::error("Missing required argument", "The argument \"key\" is required.")
                    .with_subject(body.range().clone()),
            )
        })?;
        let key = RawKey::parse_hex(&attr.value).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error("Invalid key", e.to_string()).with_subject(attr.range.clone()),
            )
        })?;
        Ok(KeyProvider::new(move || Ok(key.as_bytes().to_vec())))
    }
}
