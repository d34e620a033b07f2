//! Catalog of key provider and method definitions, keyed by name.
//!
//! A [`Registry`] is assembled once at startup from an explicit list of
//! definitions and is read-only afterwards. Lookups take `&self` and need no
//! locking, so a single registry can be shared by reference across threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use common::EncryptionError;
use thiserror::Error;

use crate::definition::{KeyProviderDefinition, MethodDefinition};
use crate::key_provider::{env, file, static_key};
use crate::method::aes_cfb_sha256;

/// Which half of the registry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    KeyProvider,
    Method,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::KeyProvider => f.write_str("key provider"),
            DefinitionKind::Method => f.write_str("method"),
        }
    }
}

/// Errors from registry construction and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A definition was registered under an empty name.
    #[error("{0} name must not be empty")]
    EmptyName(DefinitionKind),

    /// A definition with this name already exists. The first registration wins.
    #[error("{kind} {name:?} is already registered")]
    Duplicate { kind: DefinitionKind, name: String },

    /// No definition is registered under this name.
    #[error("unknown {kind}: {name}")]
    NotFound { kind: DefinitionKind, name: String },
}

impl From<RegistryError> for EncryptionError {
    fn from(err: RegistryError) -> Self {
        EncryptionError::Configuration(err.to_string())
    }
}

/// Name → definition catalog for key providers and methods.
#[derive(Clone, Default)]
pub struct Registry {
    key_providers: HashMap<String, Arc<dyn KeyProviderDefinition>>,
    methods: HashMap<String, Arc<dyn MethodDefinition>>,
}

impl Registry {
    /// Create an empty [`Registry`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from explicit definition lists.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] encountered; no partially built
    /// registry is returned.
    pub fn from_definitions<K, M>(key_providers: K, methods: M) -> Result<Self, RegistryError>
    where
        K: IntoIterator<Item = (String, Arc<dyn KeyProviderDefinition>)>,
        M: IntoIterator<Item = (String, Arc<dyn MethodDefinition>)>,
    {
        let mut registry = Self::new();
        for (name, def) in key_providers {
            registry.register_key_provider(name, def)?;
        }
        for (name, def) in methods {
            registry.register_method(name, def)?;
        }
        Ok(registry)
    }

    /// A registry holding the built-in key providers (`static`, `env`,
    /// `file`) and the AES-CFB-SHA256 method.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in names collide, which is a programming error.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let key_providers: Vec<(String, Arc<dyn KeyProviderDefinition>)> = vec![
            (
                static_key::NAME.to_owned(),
                Arc::new(static_key::StaticKeyProviderDefinition),
            ),
            (env::NAME.to_owned(), Arc::new(env::EnvKeyProviderDefinition)),
            (file::NAME.to_owned(), Arc::new(file::FileKeyProviderDefinition)),
        ];
        let methods: Vec<(String, Arc<dyn MethodDefinition>)> = vec![(
            aes_cfb_sha256::NAME.to_owned(),
            Arc::new(aes_cfb_sha256::Aes256CfbSha256Definition),
        )];
        Self::from_definitions(key_providers, methods)
    }

    /// Register a key provider definition under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] or [`RegistryError::Duplicate`];
    /// the registry is left unchanged in both cases.
    pub fn register_key_provider(
        &mut self,
        name: impl Into<String>,
        def: Arc<dyn KeyProviderDefinition>,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.key_providers, DefinitionKind::KeyProvider, name.into(), def)
    }

    /// Register a method definition under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] or [`RegistryError::Duplicate`];
    /// the registry is left unchanged in both cases.
    pub fn register_method(
        &mut self,
        name: impl Into<String>,
        def: Arc<dyn MethodDefinition>,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.methods, DefinitionKind::Method, name.into(), def)
    }

    /// Look up a key provider definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `name` is not registered.
    pub fn key_provider(
        &self,
        name: &str,
    ) -> Result<Arc<dyn KeyProviderDefinition>, RegistryError> {
        self.key_providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: DefinitionKind::KeyProvider,
                name: name.to_owned(),
            })
    }

    /// Look up a method definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `name` is not registered.
    pub fn method(&self, name: &str) -> Result<Arc<dyn MethodDefinition>, RegistryError> {
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: DefinitionKind::Method,
                name: name.to_owned(),
            })
    }

    /// Registered key provider names, sorted.
    pub fn key_provider_names(&self) -> Vec<&str> {
        sorted_names(&self.key_providers)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        sorted_names(&self.methods)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("key_providers", &self.key_provider_names())
            .field("methods", &self.method_names())
            .finish()
    }
}

fn insert_unique<D: ?Sized>(
    map: &mut HashMap<String, Arc<D>>,
    kind: DefinitionKind,
    name: String,
    def: Arc<D>,
) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::EmptyName(kind));
    }
    if map.contains_key(&name) {
        return Err(RegistryError::Duplicate { kind, name });
    }
    map.insert(name, def);
    Ok(())
}

fn sorted_names<D: ?Sized>(map: &HashMap<String, Arc<D>>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}
