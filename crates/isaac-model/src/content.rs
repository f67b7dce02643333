//! Polymorphic content nodes
//!
//! A [`ContentNode`] carries the fields every content type shares plus a
//! typed [`ContentBody`] chosen by the node's `type` tag. Nodes nest through
//! `children` and through the body (question hints, choices and answers).
//!
//! Nodes serialize to the same flat JSON shape the content repository uses,
//! with the body's fields inlined next to the common ones.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// One resolved unit of educational content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Stable id; `None` for anonymous fragments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Type tag (`page`, `question`, `figure`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Ids of other content this node links to; may name nodes that do not exist
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub related_content: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,

    /// File the node was loaded from; assigned during ingest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_source_file: Option<String>,

    /// Type-specific fields
    #[serde(flatten)]
    pub body: ContentBody,
}

/// Type-specific part of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentBody {
    /// `image` and `figure` nodes
    Figure(FigureBody),

    /// Question types
    Question(QuestionBody),

    /// `choice` nodes
    Choice(ChoiceBody),

    /// `quantity` choices with units
    Quantity(QuantityBody),

    /// Every other registered type; unrecognized fields are kept verbatim
    Generic(BTreeMap<String, Value>),
}

impl Default for ContentBody {
    fn default() -> Self {
        Self::Generic(BTreeMap::new())
    }
}

/// Fields of `image` / `figure` nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureBody {
    /// Asset location; relative references are rewritten to tree paths on ingest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    /// Fields not named above, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fields of question nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestionBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<ContentNode>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ContentNode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Box<ContentNode>>,

    /// Fields not named above (`significantFigures`, `requireUnits`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fields of `choice` nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceBody {
    #[serde(default)]
    pub correct: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fields of `quantity` nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityBody {
    #[serde(default)]
    pub correct: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ContentBody {
    /// Nodes nested inside the body, in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
        let (hints, choices, answer): (&[ContentNode], &[ContentNode], Option<&ContentNode>) =
            match self {
                Self::Question(q) => (&q.hints, &q.choices, q.answer.as_deref()),
                _ => (&[], &[], None),
            };
        hints.iter().chain(choices.iter()).chain(answer)
    }

    /// Rebuild the body with every nested node passed through `f`
    #[must_use]
    pub fn map_nodes<F>(self, f: &mut F) -> Self
    where
        F: FnMut(ContentNode) -> ContentNode,
    {
        match self {
            Self::Question(q) => Self::Question(QuestionBody {
                hints: q.hints.into_iter().map(&mut *f).collect(),
                choices: q.choices.into_iter().map(&mut *f).collect(),
                answer: q.answer.map(|a| Box::new(f(*a))),
                extra: q.extra,
            }),
            other => other,
        }
    }
}

impl ContentNode {
    /// Empty node of the given type
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            title: None,
            value: None,
            encoding: None,
            layout: None,
            author: None,
            attribution: None,
            tags: BTreeSet::new(),
            related_content: BTreeSet::new(),
            published: None,
            children: Vec::new(),
            canonical_source_file: None,
            body: ContentBody::default(),
        }
    }

    /// With id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With value text
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// With a tag added
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// With a related content id added
    #[must_use]
    pub fn with_related(mut self, id: impl Into<String>) -> Self {
        self.related_content.insert(id.into());
        self
    }

    /// With a child appended
    #[must_use]
    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }

    /// With body
    #[must_use]
    pub fn with_body(mut self, body: ContentBody) -> Self {
        self.body = body;
        self
    }

    /// Id if set
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Direct descendants: children first, then body nodes
    pub fn nested(&self) -> impl Iterator<Item = &ContentNode> {
        self.children.iter().chain(self.body.nodes())
    }

    /// This node and every descendant, depth-first pre-order
    #[must_use]
    pub fn flatten(&self) -> Vec<&ContentNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            let nested: Vec<&ContentNode> = node.nested().collect();
            stack.extend(nested.into_iter().rev());
        }
        out
    }

    /// Rebuild the tree bottom-up, applying `f` to every node after its descendants
    #[must_use]
    pub fn map_tree<F>(self, f: &mut F) -> Self
    where
        F: FnMut(ContentNode) -> ContentNode,
    {
        let mut node = self;
        let children = std::mem::take(&mut node.children);
        node.children = children.into_iter().map(|c| c.map_tree(f)).collect();
        let body = std::mem::take(&mut node.body);
        node.body = body.map_nodes(&mut |n: ContentNode| n.map_tree(f));
        f(node)
    }

    /// Asset reference of figure nodes
    #[must_use]
    pub fn asset_src(&self) -> Option<&str> {
        match &self.body {
            ContentBody::Figure(figure) => figure.src.as_deref(),
            _ => None,
        }
    }

    /// Units declared by a quantity node
    #[must_use]
    pub fn units(&self) -> Option<&str> {
        match &self.body {
            ContentBody::Quantity(quantity) => quantity.units.as_deref(),
            _ => None,
        }
    }

    /// Not explicitly unpublished
    #[inline]
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.published != Some(false)
    }

    /// Drop unpublished descendants; `None` if this node itself is unpublished
    #[must_use]
    pub fn prune_unpublished(self) -> Option<Self> {
        if !self.is_published() {
            return None;
        }
        let mut node = self;
        node.children = std::mem::take(&mut node.children)
            .into_iter()
            .filter_map(Self::prune_unpublished)
            .collect();
        if let ContentBody::Question(q) = &mut node.body {
            q.hints = std::mem::take(&mut q.hints)
                .into_iter()
                .filter_map(Self::prune_unpublished)
                .collect();
            q.choices = std::mem::take(&mut q.choices)
                .into_iter()
                .filter_map(Self::prune_unpublished)
                .collect();
            q.answer = q.answer.take().and_then(|a| a.prune_unpublished().map(Box::new));
        }
        Some(node)
    }

    /// Titles and values of all descendants, space separated
    #[must_use]
    pub fn descendant_text(&self) -> String {
        let mut parts = Vec::new();
        for node in self.flatten().into_iter().skip(1) {
            parts.extend(node.title.as_deref());
            parts.extend(node.value.as_deref());
        }
        parts.join(" ")
    }

    /// Structural equality ignoring which file each node was loaded from
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.kind == other.kind && self.without_provenance() == other.without_provenance()
    }

    fn without_provenance(&self) -> Self {
        self.clone().map_tree(&mut |mut n: ContentNode| {
            n.canonical_source_file = None;
            n
        })
    }

    /// Blake3 fingerprint of the serialized node
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        serde_json::to_value(self)
            .map(|value| ContentHash::of_json(&value))
            .unwrap_or_default()
    }
}
