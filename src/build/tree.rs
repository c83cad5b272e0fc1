//! Typed content tree for one Notion page.
//!
//! The tree is a closed set of node kinds rather than loosely-typed visitor
//! fodder: the link rewriter and the asset downloader are two independent
//! traversals over the same type, and the cache serializes it as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of a page's content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Block id, dashed UUID form.
    pub id: String,

    /// Canonical URI of the block (`https://www.notion.so/<bare-id>`).
    #[serde(default)]
    pub uri: String,

    #[serde(flatten)]
    pub kind: NodeKind,

    /// Property values. Keyed by raw property id on tree nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Vec<RichTextSegment>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

/// What a node is.
///
/// Only the kinds the pipeline transforms are distinguished; every other
/// block becomes a `Container` that merely carries children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Text-bearing block (paragraph, heading, list item, ...).
    Text {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        title: Vec<RichTextSegment>,
    },

    /// Image block. `source` may be an `attachment:` locator until the
    /// asset pass resolves it.
    Image { source: String },

    /// A block that embeds another page. `target` holds the remote URI of
    /// the referenced page until the link pass rewrites it.
    PageReference { target: String },

    /// Structural block with no content of its own.
    Container,
}

/// A run of rich text with its formatting marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextSegment {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl RichTextSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }
}

/// An inline formatting mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mark", rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Strikethrough,
    Code,
    /// Inline hyperlink.
    Link { target: String },
    /// Inline mention of a page.
    PageMention { uri: String },
}

/// Concatenated plain text of a sequence of segments.
pub fn plain_text(segments: &[RichTextSegment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}
