//! Snapshot types produced by the element extractor.
//!
//! A [`Snapshot`] is the unit of comparison: one captured structural
//! description of a page. The extractor that produces it lives outside this
//! crate; here it is only data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::core::Rect;
use super::group::{SemanticGroup, SemanticType};
use crate::classify::classify_type;
use crate::error::{LvrError, Result};
use crate::viewport::Viewport;

/// One rendered element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualNode {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    /// Remaining `aria-*` attributes, keyed without the `aria-` prefix.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aria_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub is_interactive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_index: Option<i32>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ComputedStyle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VisualNode>,
}

fn default_visible() -> bool {
    true
}

impl Default for VisualNode {
    fn default() -> Self {
        Self::new("div", Rect::default())
    }
}

impl Drop for VisualNode {
    // Unlinks descendants one level at a time so dropping a deep tree
    // never recurses.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl VisualNode {
    pub fn new(tag_name: impl Into<String>, rect: Rect) -> Self {
        Self {
            tag_name: tag_name.into(),
            class_name: String::new(),
            id: None,
            rect,
            text: None,
            role: None,
            aria_label: None,
            aria_attributes: BTreeMap::new(),
            is_interactive: false,
            tab_index: None,
            is_visible: true,
            style: None,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_children(mut self, children: Vec<VisualNode>) -> Self {
        self.children = children;
        self
    }

    /// Lowercased tag name.
    pub fn tag(&self) -> String {
        self.tag_name.to_ascii_lowercase()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name.split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c.eq_ignore_ascii_case(class))
    }

    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn dom_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn role_lower(&self) -> Option<String> {
        self.role
            .as_deref()
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty())
    }

    pub fn is_hidden(&self) -> bool {
        if !self.is_visible {
            return true;
        }
        self.style.as_ref().is_some_and(|style| {
            style
                .display
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case("none"))
                || style
                    .visibility
                    .as_deref()
                    .is_some_and(|v| v.eq_ignore_ascii_case("hidden"))
        })
    }

    pub fn opacity(&self) -> f64 {
        self.style
            .as_ref()
            .and_then(|s| s.opacity)
            .map(|o| o.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }

    pub fn has_accessibility_info(&self) -> bool {
        self.role_lower().is_some() || self.aria_label.is_some() || !self.aria_attributes.is_empty()
    }
}

/// Subset of computed CSS captured for each element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
}

impl ComputedStyle {
    /// Named properties in a fixed order, rendered as strings for diffing.
    pub fn entries(&self) -> [(&'static str, Option<String>); 10] {
        [
            ("display", self.display.clone()),
            ("visibility", self.visibility.clone()),
            ("opacity", self.opacity.map(|v| v.to_string())),
            ("position", self.position.clone()),
            ("zIndex", self.z_index.clone()),
            ("overflow", self.overflow.clone()),
            ("color", self.color.clone()),
            ("backgroundColor", self.background_color.clone()),
            ("fontSize", self.font_size.map(|v| v.to_string())),
            ("fontWeight", self.font_weight.clone()),
        ]
    }

    pub fn is_scrollable(&self) -> bool {
        self.overflow.as_deref().is_some_and(|o| {
            o.split_whitespace()
                .any(|part| part.eq_ignore_ascii_case("scroll") || part.eq_ignore_ascii_case("auto"))
        })
    }

    /// Stable one-line fingerprint of all captured properties.
    pub fn fingerprint(&self) -> String {
        self.entries()
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name}:{v}")))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// One captured snapshot of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub viewport: Viewport,
    pub elements: Vec<VisualNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_groups: Option<Vec<SemanticGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<LayoutStatistics>,
}

/// One element of a flattened snapshot, in document order.
#[derive(Debug, Clone, Copy)]
pub struct FlatElement<'a> {
    /// Position in the flattened, unfiltered document order.
    pub index: usize,
    pub depth: usize,
    pub node: &'a VisualNode,
}

/// Counts describing one snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStatistics {
    pub total_elements: usize,
    pub interactive_elements: usize,
    pub text_elements: usize,
    pub max_depth: usize,
    #[serde(default)]
    pub by_type: BTreeMap<SemanticType, usize>,
    #[serde(default)]
    pub by_role: BTreeMap<String, usize>,
}

impl Snapshot {
    pub fn new(url: impl Into<String>, viewport: Viewport, elements: Vec<VisualNode>) -> Self {
        Self {
            url: url.into(),
            timestamp: None,
            viewport,
            elements,
            semantic_groups: None,
            statistics: None,
        }
    }

    /// Parse and validate a snapshot from JSON.
    ///
    /// `children` may nest arbitrarily deep; the parser grows its stack on
    /// the heap instead of stopping at serde_json's recursion limit.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let snapshot = Snapshot::deserialize(serde_stacker::Deserializer::new(&mut de))?;
        de.end()?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<()> {
        if self.viewport.is_empty() {
            return Err(LvrError::invalid_snapshot(format!(
                "snapshot of '{}' has an empty viewport ({})",
                self.url, self.viewport
            )));
        }
        for element in self.flatten() {
            if element.node.tag_name.trim().is_empty() {
                return Err(LvrError::invalid_snapshot(format!(
                    "element {} has no tagName",
                    element.index
                )));
            }
            if !element.node.rect.is_well_formed() {
                return Err(LvrError::invalid_snapshot(format!(
                    "element {} ({}) has a malformed rect {:?}",
                    element.index, element.node.tag_name, element.node.rect
                )));
            }
        }
        Ok(())
    }

    /// Every element, including nested children, in pre-order.
    pub fn flatten(&self) -> Vec<FlatElement<'_>> {
        self.flatten_where(|_| true)
    }

    /// Pre-order walk that drops any node rejected by `keep` together with
    /// its subtree. Indices still count the dropped nodes.
    pub fn flatten_where<F>(&self, keep: F) -> Vec<FlatElement<'_>>
    where
        F: Fn(&VisualNode) -> bool,
    {
        let mut out = Vec::new();
        let mut index = 0usize;
        let mut stack: Vec<(&VisualNode, usize, bool)> =
            self.elements.iter().rev().map(|n| (n, 0, true)).collect();

        while let Some((node, depth, parent_kept)) = stack.pop() {
            let kept = parent_kept && keep(node);
            if kept {
                out.push(FlatElement { index, depth, node });
            }
            index += 1;
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1, kept));
            }
        }
        out
    }

    pub fn compute_statistics(&self) -> LayoutStatistics {
        let mut stats = LayoutStatistics::default();
        for element in self.flatten() {
            let node = element.node;
            stats.total_elements += 1;
            stats.max_depth = stats.max_depth.max(element.depth);
            if node.is_interactive {
                stats.interactive_elements += 1;
            }
            if node.trimmed_text().is_some() {
                stats.text_elements += 1;
            }
            *stats.by_type.entry(classify_type(node)).or_default() += 1;
            if let Some(role) = node.role_lower() {
                *stats.by_role.entry(role).or_default() += 1;
            }
        }
        stats
    }
}
