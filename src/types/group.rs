//! Semantic types, semantic groups and proximity clusters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::core::Rect;
use crate::error::LvrError;

/// Closed set of semantic types a node or group can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Heading,
    Navigation,
    Content,
    Interactive,
    Media,
    List,
    Table,
    Form,
    Section,
    Container,
    Group,
    Structural,
}

impl SemanticType {
    pub const fn all() -> [SemanticType; 12] {
        [
            SemanticType::Heading,
            SemanticType::Navigation,
            SemanticType::Content,
            SemanticType::Interactive,
            SemanticType::Media,
            SemanticType::List,
            SemanticType::Table,
            SemanticType::Form,
            SemanticType::Section,
            SemanticType::Container,
            SemanticType::Group,
            SemanticType::Structural,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Heading => "heading",
            SemanticType::Navigation => "navigation",
            SemanticType::Content => "content",
            SemanticType::Interactive => "interactive",
            SemanticType::Media => "media",
            SemanticType::List => "list",
            SemanticType::Table => "table",
            SemanticType::Form => "form",
            SemanticType::Section => "section",
            SemanticType::Container => "container",
            SemanticType::Group => "group",
            SemanticType::Structural => "structural",
        }
    }

    /// Types that always open their own group.
    pub fn is_structurally_significant(&self) -> bool {
        matches!(
            self,
            SemanticType::Section
                | SemanticType::Navigation
                | SemanticType::Container
                | SemanticType::Group
        )
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = LvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SemanticType::all()
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| LvrError::config(format!("Unknown semantic type: {s}")))
    }
}

/// A classified, bounded cluster of elements representing one UI region.
///
/// `id` is local to the snapshot that produced it and is never a valid key
/// across snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticGroup {
    pub id: String,
    #[serde(rename = "type")]
    pub group_type: SemanticType,
    pub bounds: Rect,
    pub importance: f64,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub element_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SemanticGroup>,
}

impl SemanticGroup {
    pub fn new(id: impl Into<String>, group_type: SemanticType, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            group_type,
            bounds,
            importance: 0.0,
            depth: 0,
            label: String::new(),
            element_count: 1,
            children: Vec::new(),
        }
    }

    /// Total number of groups in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(group) = stack.pop() {
            count += 1;
            stack.extend(group.children.iter());
        }
        count
    }
}

/// Walk a forest of groups in pre-order with an explicit stack.
pub fn flatten_groups(groups: &[SemanticGroup]) -> Vec<&SemanticGroup> {
    let mut out = Vec::new();
    let mut stack: Vec<&SemanticGroup> = groups.iter().rev().collect();
    while let Some(group) = stack.pop() {
        out.push(group);
        stack.extend(group.children.iter().rev());
    }
    out
}

/// A proximity cluster of same-type nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    pub id: String,
    #[serde(rename = "type")]
    pub group_type: SemanticType,
    pub bounds: Rect,
    /// Indices into the flattened element list the cluster was built from.
    pub members: Vec<usize>,
    pub importance: f64,
}
