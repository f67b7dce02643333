//! Content object mapper
//!
//! Turns raw JSON into [`ContentNode`] trees and back. Decoding reads the
//! shared node fields itself and hands everything else to the decoder the
//! [`TypeRegistry`] holds for the node's `type` tag.
//!
//! [`ContentMapper::parse_document`] also resolves a freshly decoded tree
//! against its source file: every node is stamped with the file path and
//! relative figure sources are rewritten to tree paths. The tree is rebuilt
//! rather than patched in place, so no half-resolved node is ever shared.

use crate::error::ParseError;
use crate::registry::TypeRegistry;
use isaac_model::{is_external_reference, ContentBody, ContentNode, TreePath};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Bare strings in node lists become nodes of this type
const TEXT_NODE_TYPE: &str = "content";

/// Helpers handed to a [`BodyDecoder`](crate::BodyDecoder)
#[derive(Debug)]
pub struct DecodeContext<'a> {
    mapper: &'a ContentMapper,
    origin: &'a str,
}

impl DecodeContext<'_> {
    /// File being decoded, for error messages
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &str {
        self.origin
    }

    /// Decode one nested node
    ///
    /// # Errors
    /// Propagates the nested node's [`ParseError`].
    pub fn node(&self, field: &str, value: Value) -> Result<ContentNode, ParseError> {
        match value {
            Value::String(text) => Ok(text_node(text)),
            Value::Object(_) => self.mapper.decode_value(value, self.origin),
            other => Err(ParseError::invalid_field(
                self.origin,
                field,
                format!("expected object, got {}", kind_name(&other)),
            )),
        }
    }

    /// Decode an optional list of nested nodes; `null` or absent is empty
    ///
    /// # Errors
    /// Returns [`ParseError::InvalidField`] if the value is not an array.
    pub fn node_list(&self, field: &str, value: Option<Value>) -> Result<Vec<ContentNode>, ParseError> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| self.node(field, item))
                .collect(),
            Some(other) => Err(ParseError::invalid_field(
                self.origin,
                field,
                format!("expected array, got {}", kind_name(&other)),
            )),
        }
    }

    /// Deserialize the leftover fields into a typed body
    ///
    /// # Errors
    /// Returns [`ParseError::InvalidField`] naming the body on mismatch.
    pub fn typed<T: DeserializeOwned>(&self, fields: Map<String, Value>) -> Result<T, ParseError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|err| ParseError::invalid_field(self.origin, "body", err))
    }
}

fn text_node(text: String) -> ContentNode {
    ContentNode::new(TEXT_NODE_TYPE).with_value(text)
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Polymorphic JSON mapper for content nodes
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct ContentMapper {
    registry: Arc<TypeRegistry>,
    strict: bool,
}

impl Default for ContentMapper {
    fn default() -> Self {
        Self::new(TypeRegistry::with_defaults())
    }
}

impl ContentMapper {
    /// Create new mapper; unknown type tags are rejected
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            strict: true,
        }
    }

    /// With strict mode toggled; non-strict mode decodes unknown types generically
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Registry in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Whether unknown type tags are errors
    #[inline]
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Decode a JSON string
    ///
    /// # Errors
    /// Returns [`ParseError`] for malformed JSON or content.
    pub fn decode_str(&self, json: &str, origin: &str) -> Result<ContentNode, ParseError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| ParseError::syntax(origin, err))?;
        self.decode_value(value, origin)
    }

    /// Decode a parsed JSON value
    ///
    /// # Errors
    /// Returns [`ParseError`] if the value is not a well-formed content node.
    pub fn decode_value(&self, value: Value, origin: &str) -> Result<ContentNode, ParseError> {
        let Value::Object(mut fields) = value else {
            return Err(ParseError::syntax(origin, "content node must be a JSON object"));
        };
        let ctx = DecodeContext {
            mapper: self,
            origin,
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind,
            None | Some(Value::Null) => {
                return Err(ParseError::MissingType {
                    path: origin.to_string(),
                })
            }
            Some(other) => {
                return Err(ParseError::invalid_field(
                    origin,
                    "type",
                    format!("expected non-empty string, got {other}"),
                ))
            }
        };

        let mut node = ContentNode::new(kind);
        node.id = take_string(&mut fields, "id", origin)?;
        node.title = take_string(&mut fields, "title", origin)?;
        node.value = take_string(&mut fields, "value", origin)?;
        node.encoding = take_string(&mut fields, "encoding", origin)?;
        node.layout = take_string(&mut fields, "layout", origin)?;
        node.author = take_string(&mut fields, "author", origin)?;
        node.attribution = take_string(&mut fields, "attribution", origin)?;
        node.canonical_source_file = take_string(&mut fields, "canonicalSourceFile", origin)?;
        node.tags = take_string_set(&mut fields, "tags", origin)?;
        node.related_content = take_string_set(&mut fields, "relatedContent", origin)?;
        node.published = match fields.remove("published") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(flag),
            Some(other) => {
                return Err(ParseError::invalid_field(
                    origin,
                    "published",
                    format!("expected boolean, got {}", kind_name(&other)),
                ))
            }
        };
        node.children = ctx.node_list("children", fields.remove("children"))?;

        node.body = match self.registry.get(&node.kind) {
            Some(decoder) => decoder.decode(fields, &ctx)?,
            None if self.strict => {
                return Err(ParseError::UnknownType {
                    path: origin.to_string(),
                    kind: node.kind,
                })
            }
            None => {
                tracing::debug!("Decoding unregistered type '{}' in {} generically", node.kind, origin);
                ContentBody::Generic(fields.into_iter().collect())
            }
        };

        Ok(node)
    }

    /// Encode a node as a JSON value
    ///
    /// # Errors
    /// Returns the serializer error; not expected for well-formed nodes.
    pub fn encode(&self, node: &ContentNode) -> Result<Value, serde_json::Error> {
        serde_json::to_value(node)
    }

    /// Encode a node as a JSON string
    ///
    /// # Errors
    /// Returns the serializer error; not expected for well-formed nodes.
    pub fn encode_string(&self, node: &ContentNode) -> Result<String, serde_json::Error> {
        serde_json::to_string(node)
    }

    /// Decode one file of a version tree and resolve it against its path
    ///
    /// # Errors
    /// Returns [`ParseError`] if the bytes are not a content document.
    pub fn parse_document(&self, bytes: &[u8], source: &TreePath) -> Result<ContentNode, ParseError> {
        let origin = source.to_string();
        let text = std::str::from_utf8(bytes).map_err(|err| ParseError::syntax(&origin, err))?;
        let node = self.decode_str(text, &origin)?;
        Ok(resolve_against(node, source))
    }
}

/// Stamp the source file on every node and resolve relative figure sources
#[must_use]
pub fn resolve_against(node: ContentNode, source: &TreePath) -> ContentNode {
    let file = source.to_string();
    node.map_tree(&mut |mut n: ContentNode| {
        n.canonical_source_file = Some(file.clone());
        if let ContentBody::Figure(figure) = &mut n.body {
            let resolved = figure
                .src
                .as_deref()
                .filter(|src| !is_external_reference(src))
                .map(|src| source.resolve_sibling(src));
            match resolved {
                Some(Ok(path)) => figure.src = Some(path.to_string()),
                Some(Err(err)) => tracing::warn!(
                    "Cannot resolve figure source {:?} in {}: {}",
                    figure.src,
                    file,
                    err
                ),
                None => {}
            }
        }
        n
    })
}

fn take_string(
    fields: &mut Map<String, Value>,
    field: &str,
    origin: &str,
) -> Result<Option<String>, ParseError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => Err(ParseError::invalid_field(
            origin,
            field,
            format!("expected string, got {}", kind_name(&other)),
        )),
    }
}

fn take_string_set(
    fields: &mut Map<String, Value>,
    field: &str,
    origin: &str,
) -> Result<BTreeSet<String>, ParseError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(ParseError::invalid_field(
                    origin,
                    field,
                    format!("expected string item, got {}", kind_name(&other)),
                )),
            })
            .collect(),
        Some(other) => Err(ParseError::invalid_field(
            origin,
            field,
            format!("expected array, got {}", kind_name(&other)),
        )),
    }
}
