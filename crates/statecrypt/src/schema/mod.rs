//! Definition schemas and configuration bodies.
//!
//! # Responsibilities
//!
//! - Describe the structural shape every key provider and method accepts
//!   ([`DefinitionSchema`], [`BodySchema`]).
//! - Hold a parsed but not yet validated configuration body ([`Body`]) and
//!   validate it against a schema, producing a [`BodyContent`] or a set of
//!   [`Diagnostics`](common::Diagnostics).
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** This module must not import anything from
//!   `crate::crypto`.
//! - Validation is purely structural: values are never interpreted here.

pub mod body;

pub use body::{Attribute, Block, Body, BodyContent};

/// An attribute a body may (or must) contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    pub name: String,
    pub required: bool,
}

/// A nested block type a body may contain, with the labels it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeaderSchema {
    pub type_name: String,
    pub label_names: Vec<String>,
}

/// Structural description of a configuration body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodySchema {
    pub attributes: Vec<AttributeSchema>,
    pub blocks: Vec<BlockHeaderSchema>,
}

impl BodySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required attribute.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(AttributeSchema {
            name: name.into(),
            required: true,
        });
        self
    }

    /// Declare an optional attribute.
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(AttributeSchema {
            name: name.into(),
            required: false,
        });
        self
    }

    /// Declare a nested block type and the labels each instance carries.
    pub fn block<I, S>(mut self, type_name: impl Into<String>, label_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocks.push(BlockHeaderSchema {
            type_name: type_name.into(),
            label_names: label_names.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub(crate) fn block_header(&self, type_name: &str) -> Option<&BlockHeaderSchema> {
        self.blocks.iter().find(|b| b.type_name == type_name)
    }
}

/// The schema a key provider or method definition exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionSchema {
    pub body: BodySchema,
    /// Attributes whose value references another key provider by its
    /// `<type>.<name>` address. Binding checks the reference resolves.
    pub key_provider_fields: Vec<String>,
}

impl DefinitionSchema {
    pub fn new(body: BodySchema) -> Self {
        Self {
            body,
            key_provider_fields: Vec::new(),
        }
    }

    /// Mark `name` as a key provider reference.
    pub fn key_provider_field(mut self, name: impl Into<String>) -> Self {
        self.key_provider_fields.push(name.into());
        self
    }
}
