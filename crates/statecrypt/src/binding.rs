//! Turning a declarative [`EncryptionConfig`] into a ready-to-use [`Binding`].
//!
//! # Resolution order
//!
//! 1. Key providers, in declaration order. Each one is addressed as
//!    `<type>.<name>` and may reference providers declared before it.
//! 2. The method, which receives every resolved key provider.
//!
//! Each step looks up the definition by name, validates the body against the
//! definition's schema, checks key provider references and finally calls
//! `configure`. Resolution stops at the first step that reports errors.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use common::{Diagnostic, Diagnostics, EncryptionError, Pos, SourceRange};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::definition::{Decrypted, KeyProvider, Method};
use crate::registry::{Registry, RegistryError};
use crate::schema::{Body, BodyContent, DefinitionSchema};

/// A `key_provider "<type>" "<name>" { ... }` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProviderConfig {
    pub type_name: String,
    pub name: String,
    pub body: Body,
    pub range: SourceRange,
}

impl KeyProviderConfig {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>, body: Body) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            body,
            range: SourceRange::default(),
        }
    }

    /// The `<type>.<name>` address other definitions use to reference this provider.
    pub fn address(&self) -> String {
        format!("{}.{}", self.type_name, self.name)
    }
}

/// A `method "<type>" { ... }` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodConfig {
    pub type_name: String,
    pub body: Body,
    pub range: SourceRange,
}

impl MethodConfig {
    pub fn new(type_name: impl Into<String>, body: Body) -> Self {
        Self {
            type_name: type_name.into(),
            body,
            range: SourceRange::default(),
        }
    }
}

/// A complete encryption configuration: one method plus its key providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    pub key_providers: Vec<KeyProviderConfig>,
    pub method: MethodConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    key_providers: Vec<RawKeyProvider>,
    method: RawMethod,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKeyProvider {
    #[serde(rename = "type")]
    type_name: String,
    name: String,
    #[serde(default = "empty_object")]
    config: Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMethod {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default = "empty_object")]
    config: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl EncryptionConfig {
    pub fn new(method: MethodConfig) -> Self {
        Self {
            key_providers: Vec::new(),
            method,
        }
    }

    pub fn with_key_provider(mut self, key_provider: KeyProviderConfig) -> Self {
        self.key_providers.push(key_provider);
        self
    }

    /// Parse the JSON form of a configuration:
    ///
    /// ```json
    /// {
    ///   "key_providers": [{"type": "static", "name": "main", "config": {"key": "…"}}],
    ///   "method": {"type": "client-side/AES256-CFB/SHA256", "config": {"key_provider": "static.main"}}
    /// }
    /// ```
    ///
    /// `source` names the origin (file or environment variable) in diagnostics.
    pub fn from_json(text: &str, source: &str) -> Result<Self, Diagnostics> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|e| {
            let pos = Pos {
                line: e.line(),
                column: e.column(),
                byte: 0,
            };
            Diagnostics::from(
                Diagnostic::error("Invalid encryption configuration", e.to_string()).with_subject(
                    SourceRange {
                        filename: source.to_owned(),
                        start: pos,
                        end: pos,
                    },
                ),
            )
        })?;

        let range = SourceRange::in_source(source);
        let mut diags = Diagnostics::new();
        let mut key_providers = Vec::with_capacity(raw.key_providers.len());
        for kp in raw.key_providers {
            match Body::from_json(&kp.config, source) {
                Ok(body) => key_providers.push(KeyProviderConfig {
                    type_name: kp.type_name,
                    name: kp.name,
                    body,
                    range: range.clone(),
                }),
                Err(d) => diags.extend(d),
            }
        }
        let method_body = match Body::from_json(&raw.method.config, source) {
            Ok(body) => Some(body),
            Err(d) => {
                diags.extend(d);
                None
            }
        };

        match method_body {
            Some(body) if !diags.has_errors() => Ok(Self {
                key_providers,
                method: MethodConfig {
                    type_name: raw.method.type_name,
                    body,
                    range,
                },
            }),
            _ => Err(diags),
        }
    }
}

/// A bound method together with the key providers it was resolved against.
#[derive(Clone)]
pub struct Binding {
    method_name: String,
    method: Arc<dyn Method>,
    key_providers: HashMap<String, KeyProvider>,
    diagnostics: Diagnostics,
}

impl Binding {
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn method(&self) -> &Arc<dyn Method> {
        &self.method
    }

    /// Look up a resolved key provider by its `<type>.<name>` address.
    pub fn key_provider(&self, address: &str) -> Option<&KeyProvider> {
        self.key_providers.get(address)
    }

    /// Warnings produced while binding. Never contains errors.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.method.encrypt(plaintext)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.method.decrypt(data)
    }

    pub fn decrypt_detailed(&self, data: &[u8]) -> Result<Decrypted, EncryptionError> {
        self.method.decrypt_detailed(data)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addresses: Vec<&str> = self.key_providers.keys().map(String::as_str).collect();
        addresses.sort_unstable();
        f.debug_struct("Binding")
            .field("method", &self.method_name)
            .field("key_providers", &addresses)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// Resolve `config` against `registry`.
///
/// # Errors
///
/// Returns error diagnostics for unknown definition names, schema violations,
/// duplicate or dangling key provider references, and anything a definition's
/// `configure` rejects.
pub fn bind(registry: &Registry, config: &EncryptionConfig) -> Result<Binding, Diagnostics> {
    let mut resolved: HashMap<String, KeyProvider> = HashMap::new();
    let mut referenced: HashSet<String> = HashSet::new();

    for kp in &config.key_providers {
        let address = kp.address();
        if resolved.contains_key(&address) {
            return Err(Diagnostic::error(
                "Duplicate key provider",
                format!("A key provider named {address:?} was already declared."),
            )
            .with_subject(kp.range.clone())
            .into());
        }

        let def = registry
            .key_provider(&kp.type_name)
            .map_err(|e| unknown_definition(e, registry.key_provider_names(), &kp.range))?;
        let schema = def.schema();
        let content = kp.body.content(&schema.body)?;
        check_references(&schema, &content, &resolved, &mut referenced)?;
        let provider = def.configure(&content, &resolved)?;

        debug!(key_provider = %address, "key provider configured");
        resolved.insert(address, provider);
    }

    let method_cfg = &config.method;
    let def = registry
        .method(&method_cfg.type_name)
        .map_err(|e| unknown_definition(e, registry.method_names(), &method_cfg.range))?;
    let schema = def.schema();
    let content = method_cfg.body.content(&schema.body)?;
    check_references(&schema, &content, &resolved, &mut referenced)?;
    let method = def.configure(&content, &resolved)?;

    let mut diagnostics = Diagnostics::new();
    for kp in &config.key_providers {
        let address = kp.address();
        if !referenced.contains(&address) {
            diagnostics.push(
                Diagnostic::warning(
                    "Unused key provider",
                    format!("The key provider {address:?} is declared but never referenced."),
                )
                .with_subject(kp.range.clone()),
            );
        }
    }

    debug!(
        method = %method_cfg.type_name,
        key_providers = resolved.len(),
        "encryption method bound"
    );
    Ok(Binding {
        method_name: method_cfg.type_name.clone(),
        method,
        key_providers: resolved,
        diagnostics,
    })
}

fn unknown_definition(
    err: RegistryError,
    available: Vec<&str>,
    range: &SourceRange,
) -> Diagnostics {
    let summary = match &err {
        RegistryError::NotFound { kind, .. } => format!("Unknown {kind} type"),
        _ => "Invalid definition name".to_owned(),
    };
    Diagnostic::error(summary, format!("{err}. Available: {}.", available.join(", ")))
        .with_subject(range.clone())
        .into()
}

fn check_references(
    schema: &DefinitionSchema,
    content: &BodyContent,
    resolved: &HashMap<String, KeyProvider>,
    referenced: &mut HashSet<String>,
) -> Result<(), Diagnostics> {
    for field in &schema.key_provider_fields {
        let Some(attr) = content.attribute(field) else {
            continue;
        };
        if !resolved.contains_key(&attr.value) {
            return Err(Diagnostic::error(
                "Unknown key provider",
                format!(
                    "No key provider {:?} has been configured; key providers must be \
                     declared before they are referenced.",
                    attr.value
                ),
            )
            .with_subject(attr.range.clone())
            .into());
        }
        referenced.insert(attr.value.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{
        KeyProviderDefinition, MethodDefinition, MockKeyProviderDefinition, MockMethod,
        MockMethodDefinition,
    };
    use crate::method::aes_cfb_sha256;
    use crate::schema::BodySchema;
    use common::Severity;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn static_main() -> KeyProviderConfig {
        KeyProviderConfig::new("static", "main", Body::from_attributes([("key", KEY)]))
    }

    fn aes_with_provider(address: &str) -> MethodConfig {
        MethodConfig::new(
            aes_cfb_sha256::NAME,
            Body::from_attributes([("key_provider", address)]),
        )
    }

    fn first_summary(diags: &Diagnostics) -> String {
        diags.iter().next().map(|d| d.summary.clone()).unwrap_or_default()
    }

    #[test]
    fn binds_builtin_method_to_static_provider() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(aes_with_provider("static.main"))
            .with_key_provider(static_main());
        let binding = bind(&registry, &config).unwrap();
        assert_eq!(binding.method_name(), aes_cfb_sha256::NAME);
        assert!(binding.diagnostics().is_empty());
        assert_eq!(binding.key_provider("static.main").unwrap().key().unwrap().len(), 32);

        let encrypted = binding.encrypt(br#"{"version":4}"#).unwrap();
        assert!(binding.decrypt_detailed(&encrypted).unwrap().was_encrypted());
        assert_eq!(binding.decrypt(&encrypted).unwrap(), br#"{"version":4}"#);
    }

    #[test]
    fn binds_inline_key_parameter() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(MethodConfig::new(
            aes_cfb_sha256::NAME,
            Body::from_attributes([("key", KEY)]),
        ));
        let binding = bind(&registry, &config).unwrap();
        let encrypted = binding.encrypt(b"{}").unwrap();
        assert_eq!(binding.decrypt(&encrypted).unwrap(), b"{}");
    }

    #[test]
    fn unused_key_provider_is_warning() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(MethodConfig::new(
            aes_cfb_sha256::NAME,
            Body::from_attributes([("key", KEY)]),
        ))
        .with_key_provider(static_main());
        let binding = bind(&registry, &config).unwrap();
        let diags = binding.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().severity, Severity::Warning);
        assert!(!diags.has_errors());
    }

    #[test]
    fn unknown_method_is_diagnostic() {
        let registry = Registry::with_builtins().unwrap();
        let mut config = EncryptionConfig::new(MethodConfig::new("rot13", Body::default()));
        config.method.range = SourceRange::in_source("main.tf");
        let diags = bind(&registry, &config).unwrap_err();
        assert_eq!(first_summary(&diags), "Unknown method type");
        let diag = diags.iter().next().unwrap();
        assert!(diag.detail.contains(aes_cfb_sha256::NAME));
        assert_eq!(diag.subject, Some(SourceRange::in_source("main.tf")));
    }

    #[test]
    fn unknown_key_provider_type_is_diagnostic() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(aes_with_provider("vault.main"))
            .with_key_provider(KeyProviderConfig::new("vault", "main", Body::default()));
        let diags = bind(&registry, &config).unwrap_err();
        assert_eq!(first_summary(&diags), "Unknown key provider type");
    }

    #[test]
    fn dangling_reference_is_diagnostic() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(aes_with_provider("static.other"))
            .with_key_provider(static_main());
        let diags = bind(&registry, &config).unwrap_err();
        assert_eq!(first_summary(&diags), "Unknown key provider");
    }

    #[test]
    fn duplicate_key_provider_is_diagnostic() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(aes_with_provider("static.main"))
            .with_key_provider(static_main())
            .with_key_provider(static_main());
        let diags = bind(&registry, &config).unwrap_err();
        assert_eq!(first_summary(&diags), "Duplicate key provider");
    }

    #[test]
    fn invalid_static_key_stops_resolution() {
        let registry = Registry::with_builtins().unwrap();
        let config = EncryptionConfig::new(aes_with_provider("static.main")).with_key_provider(
            KeyProviderConfig::new("static", "main", Body::from_attributes([("key", "short")])),
        );
        let diags = bind(&registry, &config).unwrap_err();
        assert_eq!(first_summary(&diags), "Invalid key");
    }

    #[test]
    fn schema_violation_skips_configure() {
        let mut def = MockMethodDefinition::new();
        def.expect_schema()
            .returning(|| DefinitionSchema::new(BodySchema::new().required("key")));
        def.expect_configure().times(0);

        let mut registry = Registry::new();
        registry.register_method("mock", Arc::new(def)).unwrap();
        let config = EncryptionConfig::new(MethodConfig::new(
            "mock",
            Body::from_attributes([("colour", "blue")]),
        ));
        let diags = bind(&registry, &config).unwrap_err();
        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Unsupported argument", "Missing required argument"]);
    }

    #[test]
    fn later_definitions_see_earlier_providers() {
        let mut first = MockKeyProviderDefinition::new();
        first.expect_schema().returning(DefinitionSchema::default);
        first
            .expect_configure()
            .times(1)
            .returning(|_, _| Ok(KeyProvider::new(|| Ok(vec![3u8; 32]))));

        let mut second = MockKeyProviderDefinition::new();
        second.expect_schema().returning(|| {
            DefinitionSchema::new(BodySchema::new().required("wraps")).key_provider_field("wraps")
        });
        second
            .expect_configure()
            .withf(|body, providers| {
                body.value("wraps") == Some("inner.a") && providers.contains_key("inner.a")
            })
            .times(1)
            .returning(|_, providers| Ok(providers["inner.a"].clone()));

        let mut method_def = MockMethodDefinition::new();
        method_def.expect_schema().returning(|| {
            DefinitionSchema::new(BodySchema::new().required("source")).key_provider_field("source")
        });
        method_def
            .expect_configure()
            .withf(|_, providers| providers.len() == 2)
            .times(1)
            .returning(|_, _| {
                let mut method = MockMethod::new();
                method.expect_encrypt().returning(|p| Ok(p.to_vec()));
                let method: Arc<dyn Method> = Arc::new(method);
                Ok(method)
            });

        let key_providers: Vec<(String, Arc<dyn KeyProviderDefinition>)> = vec![
            ("inner".into(), Arc::new(first)),
            ("outer".into(), Arc::new(second)),
        ];
        let methods: Vec<(String, Arc<dyn MethodDefinition>)> =
            vec![("identity".into(), Arc::new(method_def))];
        let registry = Registry::from_definitions(key_providers, methods).unwrap();

        let config = EncryptionConfig::new(MethodConfig::new(
            "identity",
            Body::from_attributes([("source", "outer.b")]),
        ))
        .with_key_provider(KeyProviderConfig::new("inner", "a", Body::default()))
        .with_key_provider(KeyProviderConfig::new(
            "outer",
            "b",
            Body::from_attributes([("wraps", "inner.a")]),
        ));

        let binding = bind(&registry, &config).unwrap();
        assert!(binding.diagnostics().is_empty());
        assert_eq!(binding.key_provider("outer.b").unwrap().key().unwrap(), vec![3u8; 32]);
        assert_eq!(binding.encrypt(b"x").unwrap(), b"x");
    }

    #[test]
    fn from_json_parses_full_config() {
        let text = format!(
            r#"{{
                "key_providers": [{{"type": "static", "name": "main", "config": {{"key": "{KEY}"}}}}],
                "method": {{"type": "{}", "config": {{"key_provider": "static.main"}}}}
            }}"#,
            aes_cfb_sha256::NAME
        );
        let config = EncryptionConfig::from_json(&text, "STATE_ENCRYPTION").unwrap();
        assert_eq!(config.key_providers.len(), 1);
        assert_eq!(config.key_providers[0].address(), "static.main");
        assert_eq!(config.method.type_name, aes_cfb_sha256::NAME);

        let registry = Registry::with_builtins().unwrap();
        assert!(bind(&registry, &config).is_ok());
    }

    #[test]
    fn from_json_reports_position_of_syntax_errors() {
        let diags =
            EncryptionConfig::from_json("{\n  \"method\": ", "STATE_ENCRYPTION").unwrap_err();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid encryption configuration");
        let subject = diag.subject.as_ref().unwrap();
        assert_eq!(subject.filename, "STATE_ENCRYPTION");
        assert_eq!(subject.start.line, 2);
    }

    #[test]
    fn from_json_rejects_unknown_fields_and_bad_bodies() {
        let extra = r#"{"method": {"type": "x"}, "extra": 1}"#;
        assert!(EncryptionConfig::from_json(extra, "src").is_err());
        let null_key = r#"{"method": {"type": "x", "config": {"key": null}}}"#;
        let diags = EncryptionConfig::from_json(null_key, "src").unwrap_err();
        assert_eq!(first_summary(&diags), "Unsupported value");
    }
}
