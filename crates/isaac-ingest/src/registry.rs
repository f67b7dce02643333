//! Content type registry
//!
//! Maps a node's `type` tag to the [`BodyDecoder`] that builds its typed
//! body. New content types are added by registering a tag; the mapper
//! itself never changes.

use crate::error::{ParseError, RegistryError};
use crate::mapper::DecodeContext;
use isaac_model::{ChoiceBody, ContentBody, FigureBody, QuantityBody, QuestionBody};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Builds the type-specific body of a node
///
/// `fields` holds every JSON field the shared node fields did not consume.
pub trait BodyDecoder: Send + Sync + Debug + 'static {
    /// Decode the body
    ///
    /// # Errors
    /// Returns [`ParseError`] if a field has the wrong shape.
    fn decode(
        &self,
        fields: Map<String, Value>,
        ctx: &DecodeContext<'_>,
    ) -> Result<ContentBody, ParseError>;
}

/// Keeps every extra field verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDecoder;

impl BodyDecoder for GenericDecoder {
    fn decode(
        &self,
        fields: Map<String, Value>,
        _ctx: &DecodeContext<'_>,
    ) -> Result<ContentBody, ParseError> {
        Ok(ContentBody::Generic(fields.into_iter().collect()))
    }
}

/// `image` / `figure`
#[derive(Debug, Clone, Copy, Default)]
pub struct FigureDecoder;

impl BodyDecoder for FigureDecoder {
    fn decode(
        &self,
        fields: Map<String, Value>,
        ctx: &DecodeContext<'_>,
    ) -> Result<ContentBody, ParseError> {
        ctx.typed::<FigureBody>(fields).map(ContentBody::Figure)
    }
}

/// Question types: hints, choices and an optional answer; other fields are kept
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionDecoder;

impl BodyDecoder for QuestionDecoder {
    fn decode(
        &self,
        mut fields: Map<String, Value>,
        ctx: &DecodeContext<'_>,
    ) -> Result<ContentBody, ParseError> {
        let hints = ctx.node_list("hints", fields.remove("hints"))?;
        let choices = ctx.node_list("choices", fields.remove("choices"))?;
        let answer = match fields.remove("answer") {
            None | Some(Value::Null) => None,
            Some(value) => Some(Box::new(ctx.node("answer", value)?)),
        };
        Ok(ContentBody::Question(QuestionBody {
            hints,
            choices,
            answer,
            extra: fields.into_iter().collect(),
        }))
    }
}

/// `choice` and its formula variants
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceDecoder;

impl BodyDecoder for ChoiceDecoder {
    fn decode(
        &self,
        fields: Map<String, Value>,
        ctx: &DecodeContext<'_>,
    ) -> Result<ContentBody, ParseError> {
        ctx.typed::<ChoiceBody>(fields).map(ContentBody::Choice)
    }
}

/// `quantity`
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantityDecoder;

impl BodyDecoder for QuantityDecoder {
    fn decode(
        &self,
        fields: Map<String, Value>,
        ctx: &DecodeContext<'_>,
    ) -> Result<ContentBody, ParseError> {
        ctx.typed::<QuantityBody>(fields).map(ContentBody::Quantity)
    }
}

const GENERIC_TYPES: &[&str] = &[
    "content",
    "page",
    "concept",
    "isaacConceptPage",
    "isaacQuestionPage",
    "isaacFastTrackQuestionPage",
    "isaacTopicSummaryPage",
    "isaacEventPage",
    "isaacPageFragment",
    "isaacPod",
    "isaacWildcard",
    "isaacFeaturedProfile",
    "glossaryTerm",
    "codeSnippet",
    "video",
    "anvilApp",
    "emailTemplate",
    "notification",
];

const FIGURE_TYPES: &[&str] = &["image", "figure"];

const QUESTION_TYPES: &[&str] = &[
    "question",
    "choiceQuestion",
    "isaacQuestion",
    "isaacMultiChoiceQuestion",
    "isaacNumericQuestion",
    "isaacSymbolicQuestion",
    "isaacSymbolicLogicQuestion",
    "isaacSymbolicChemistryQuestion",
    "isaacStringMatchQuestion",
    "isaacItemQuestion",
    "isaacParsonsQuestion",
];

const CHOICE_TYPES: &[&str] = &[
    "choice",
    "formula",
    "logicFormula",
    "chemicalFormula",
    "stringChoice",
    "item",
    "parsonsItem",
];

const QUANTITY_TYPES: &[&str] = &["quantity"];

/// Registry of content type tags
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    decoders: BTreeMap<String, Arc<dyn BodyDecoder>>,
}

impl TypeRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in Isaac content type
    #[must_use]
    pub fn with_defaults() -> Self {
        let groups: [(&[&str], Arc<dyn BodyDecoder>); 5] = [
            (GENERIC_TYPES, Arc::new(GenericDecoder) as Arc<dyn BodyDecoder>),
            (FIGURE_TYPES, Arc::new(FigureDecoder) as Arc<dyn BodyDecoder>),
            (QUESTION_TYPES, Arc::new(QuestionDecoder) as Arc<dyn BodyDecoder>),
            (CHOICE_TYPES, Arc::new(ChoiceDecoder) as Arc<dyn BodyDecoder>),
            (QUANTITY_TYPES, Arc::new(QuantityDecoder) as Arc<dyn BodyDecoder>),
        ];
        let mut registry = Self::new();
        for (tags, decoder) in groups {
            for tag in tags {
                registry.decoders.insert((*tag).to_string(), Arc::clone(&decoder));
            }
        }
        registry
    }

    /// Register a decoder for a type tag
    ///
    /// # Errors
    /// - [`RegistryError::EmptyType`] for a blank tag
    /// - [`RegistryError::DuplicateType`] if the tag is already registered
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        decoder: impl BodyDecoder,
    ) -> Result<(), RegistryError> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(RegistryError::EmptyType);
        }
        if self.decoders.contains_key(&tag) {
            return Err(RegistryError::DuplicateType(tag));
        }
        self.decoders.insert(tag, Arc::new(decoder));
        Ok(())
    }

    /// Decoder for a tag
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn BodyDecoder>> {
        self.decoders.get(tag)
    }

    /// Whether a tag is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Registered tags, sorted
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.decoders.keys().map(String::as_str).collect()
    }

    /// Number of registered tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_each_tag_once() {
        let registry = TypeRegistry::with_defaults();
        let expected = GENERIC_TYPES.len()
            + FIGURE_TYPES.len()
            + QUESTION_TYPES.len()
            + CHOICE_TYPES.len()
            + QUANTITY_TYPES.len();
        assert_eq!(registry.len(), expected);
        for tag in ["page", "figure", "image", "isaacNumericQuestion", "quantity"] {
            assert!(registry.contains(tag), "{tag}");
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = TypeRegistry::with_defaults();
        assert_eq!(
            registry.register("page", GenericDecoder),
            Err(RegistryError::DuplicateType("page".to_string()))
        );
        assert_eq!(registry.register("  ", GenericDecoder), Err(RegistryError::EmptyType));
        assert!(registry.register("isaacCard", GenericDecoder).is_ok());
        assert!(registry.contains("isaacCard"));
    }

    #[test]
    fn tags_are_sorted() {
        let mut registry = TypeRegistry::new();
        assert!(registry.is_empty());
        registry.register("page", GenericDecoder).unwrap();
        registry.register("figure", FigureDecoder).unwrap();
        assert_eq!(registry.tags(), vec!["figure", "page"]);
        assert!(registry.get("figure").is_some());
        assert!(registry.get("video").is_none());
    }
}
