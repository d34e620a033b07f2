//! `statecrypt`: pluggable at-rest encryption for persisted infrastructure state.
//!
//! # Flow
//!
//! 1. Assemble a [`Registry`] of key provider and method definitions.
//! 2. Parse an [`EncryptionConfig`] (see [`EnvConfig`] for the environment form).
//! 3. [`bind`] the configuration against the registry to get a [`Binding`].
//! 4. Call `encrypt` / `decrypt` on the binding, or wrap a primary and
//!    fallback binding in [`StateEncryption`].
//!
//! # Security invariants
//!
//! - Encryption is fail-closed: an error never yields unencrypted output.
//! - The only silent degradation is reading legacy unencrypted state, which
//!   is always logged at `warn`.
//! - Key material is never logged or printed by `Debug` implementations.

pub mod binding;
pub mod config;
pub mod crypto;
pub mod definition;
pub mod key_provider;
pub mod method;
pub mod registry;
pub mod schema;
pub mod state;

pub use binding::{bind, Binding, EncryptionConfig, KeyProviderConfig, MethodConfig};
pub use common::{Diagnostic, Diagnostics, EncryptionError, ErrorKind, Severity, SourceRange};
pub use crate::config::EnvConfig;
pub use definition::{Decrypted, KeyProvider, KeyProviderDefinition, Method, MethodDefinition};
pub use registry::{Registry, RegistryError};
pub use state::StateEncryption;
