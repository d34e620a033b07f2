//! Error taxonomy and configuration diagnostics shared across `statecrypt` crates.

pub mod diagnostics;
pub mod error;

pub use diagnostics::{Diagnostic, Diagnostics, Pos, Severity, SourceRange};
pub use error::{EncryptionError, ErrorKind};
