//! Built-in key providers.
//!
//! | name     | attribute  | key material                                  |
//! |----------|------------|-----------------------------------------------|
//! | `static` | `key`      | the attribute itself, 64 lowercase hex chars  |
//! | `env`    | `variable` | hex text read from the environment variable   |
//! | `file`   | `path`     | hex text read from the file, whitespace-trimmed |
//!
//! `env` and `file` re-read their source on every call, so a rotated key is
//! picked up without rebinding.

pub mod env;
pub mod file;
pub mod static_key;

use common::EncryptionError;

/// Decode hex key material read from an external source.
fn decode_key_material(text: &str, origin: &str) -> Result<Vec<u8>, EncryptionError> {
    hex::decode(text.trim()).map_err(|e| {
        EncryptionError::KeyProvider(format!("{origin} does not contain hex key material: {e}"))
    })
}
