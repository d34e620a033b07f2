//! AES-256-CFB state encryption primitives with a SHA-256 integrity tag.
//!
//! This module is intentionally free of registry and configuration logic.
//! It provides the key type, the envelope codec and the low-level
//! seal/open operations used by the method layer.
//!
//! # Envelope format
//!
//! ```text
//! {"crypted":"<lowercase-hex(iv || cfb(plaintext || sha256(plaintext)))>"}
//! ```
//!
//! The envelope is a single JSON object with no whitespace, so it can be
//! stored wherever plain JSON state used to live.

pub mod cipher;
pub mod envelope;
pub mod key;

pub use cipher::{open, seal, BLOCK_SIZE, TAG_LEN};
pub use envelope::{Classified, Envelope};
pub use key::{RawKey, KEY_LEN};
