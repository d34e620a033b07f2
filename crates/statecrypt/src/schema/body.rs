//! Parsed configuration bodies and their validation against a [`BodySchema`].

use std::collections::BTreeMap;

use common::{Diagnostic, Diagnostics, SourceRange};
use serde_json::Value;

use super::BodySchema;

/// A single `name = value` pair from a configuration body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub range: SourceRange,
}

/// A nested block, e.g. `key_provider "static" "main" { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub type_name: String,
    pub labels: Vec<String>,
    pub body: Body,
    pub range: SourceRange,
}

/// A configuration body as handed over by the configuration parser.
///
/// Nothing has been checked yet: attributes may repeat or be unknown to the
/// definition that will consume them. Call [`Body::content`] to validate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
    pub range: SourceRange,
}

impl Body {
    /// Build a body holding only string attributes.
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(name, value)| Attribute {
                    name: name.into(),
                    value: value.into(),
                    range: SourceRange::default(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Convert a JSON object into a body.
    ///
    /// Scalars become attributes (numbers and booleans in their JSON text
    /// form), objects become unlabelled nested blocks and arrays of objects
    /// become repeated blocks. `source` names the origin in diagnostics.
    pub fn from_json(value: &Value, source: &str) -> Result<Self, Diagnostics> {
        let range = SourceRange::in_source(source);
        let object = value.as_object().ok_or_else(|| {
            Diagnostics::from(
                Diagnostic::error(
                    "Invalid configuration body",
                    "A configuration body must be a JSON object.",
                )
                .with_subject(range.clone()),
            )
        })?;

        let mut body = Body {
            range: range.clone(),
            ..Body::default()
        };
        let mut diags = Diagnostics::new();

        for (name, v) in object {
            let scalar = match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            if let Some(value) = scalar {
                body.attributes.push(Attribute {
                    name: name.clone(),
                    value,
                    range: range.clone(),
                });
                continue;
            }

            // An empty list is zero blocks, not an error.
            let items: Option<Vec<&Value>> = match v {
                Value::Object(_) => Some(vec![v]),
                Value::Array(items) if items.iter().all(Value::is_object) => {
                    Some(items.iter().collect())
                }
                _ => None,
            };
            let Some(items) = items else {
                diags.push(
                    Diagnostic::error(
                        "Unsupported value",
                        format!(
                            "The value of {name:?} must be a string, number, boolean, \
                             object or list of objects."
                        ),
                    )
                    .with_subject(range.clone()),
                );
                continue;
            };
            for item in items {
                match Body::from_json(item, source) {
                    Ok(nested) => body.blocks.push(Block {
                        type_name: name.clone(),
                        labels: Vec::new(),
                        body: nested,
                        range: range.clone(),
                    }),
                    Err(nested_diags) => diags.extend(nested_diags),
                }
            }
        }

        if diags.has_errors() {
            return Err(diags);
        }
        Ok(body)
    }

    /// Validate this body against `schema`.
    ///
    /// Every problem found is reported, not just the first one.
    ///
    /// # Errors
    ///
    /// Returns error diagnostics for unsupported or duplicate attributes,
    /// missing required attributes, unsupported block types and blocks with
    /// the wrong number of labels.
    pub fn content(&self, schema: &BodySchema) -> Result<BodyContent, Diagnostics> {
        let mut diags = Diagnostics::new();
        let mut attributes = BTreeMap::new();

        for attr in &self.attributes {
            if schema.attribute(&attr.name).is_none() {
                diags.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named {:?} is not expected here.", attr.name),
                    )
                    .with_subject(attr.range.clone()),
                );
                continue;
            }
            if attributes.contains_key(&attr.name) {
                diags.push(
                    Diagnostic::error(
                        "Duplicate argument",
                        format!("The argument {:?} was already set.", attr.name),
                    )
                    .with_subject(attr.range.clone()),
                );
                continue;
            }
            attributes.insert(attr.name.clone(), attr.clone());
        }

        for expected in schema.attributes.iter().filter(|a| a.required) {
            if !attributes.contains_key(&expected.name) {
                diags.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!(
                            "The argument {:?} is required, but no definition was found.",
                            expected.name
                        ),
                    )
                    .with_subject(self.range.clone()),
                );
            }
        }

        let mut blocks = Vec::new();
        for block in &self.blocks {
            match schema.block_header(&block.type_name) {
                None => diags.push(
                    Diagnostic::error(
                        "Unsupported block type",
                        format!("Blocks of type {:?} are not expected here.", block.type_name),
                    )
                    .with_subject(block.range.clone()),
                ),
                Some(header) if header.label_names.len() != block.labels.len() => diags.push(
                    Diagnostic::error(
                        "Wrong number of block labels",
                        format!(
                            "A {:?} block expects {} label(s), found {}.",
                            block.type_name,
                            header.label_names.len(),
                            block.labels.len()
                        ),
                    )
                    .with_subject(block.range.clone()),
                ),
                Some(_) => blocks.push(block.clone()),
            }
        }

        if diags.has_errors() {
            return Err(diags);
        }
        Ok(BodyContent {
            attributes,
            blocks,
            range: self.range.clone(),
        })
    }
}

/// A body that passed validation against its schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyContent {
    attributes: BTreeMap<String, Attribute>,
    blocks: Vec<Block>,
    range: SourceRange,
}

impl BodyContent {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Shorthand for the value of attribute `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|a| a.value.as_str())
    }

    pub fn blocks_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.type_name == type_name)
    }

    pub fn range(&self) -> &SourceRange {
        &self.range
    }
}
