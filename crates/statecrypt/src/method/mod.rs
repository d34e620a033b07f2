//! Built-in encryption methods.

pub mod aes_cfb_sha256;

pub use aes_cfb_sha256::{Aes256CfbSha256Definition, Aes256CfbSha256Method};
