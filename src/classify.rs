//! Semantic classification of raw elements.
//!
//! Classification is a fixed-priority rule cascade where the first match wins:
//! specific tags and roles outrank the generic content-length heuristic.
//! Importance is a sum of independent contributions clamped to `[0, 100]`.
//! Both are pure functions of the node (and viewport), so repeated crawls of
//! the same page always produce the same scores.

use serde::{Deserialize, Serialize};

use crate::types::{SemanticType, VisualNode};
use crate::viewport::Viewport;

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const NAV_ROLES: &[&str] = &["navigation", "menu", "menubar"];
const NAV_CLASS_HINTS: &[&str] = &["nav", "menu", "breadcrumb"];
const FORM_TAGS: &[&str] = &["form", "fieldset"];
const FORM_ROLES: &[&str] = &["form", "search"];
const INTERACTIVE_TAGS: &[&str] = &["button", "a", "input", "textarea", "select"];
const INTERACTIVE_ROLES: &[&str] = &["button", "link", "textbox", "checkbox", "radio"];
const MEDIA_TAGS: &[&str] = &[
    "img", "video", "audio", "picture", "svg", "canvas", "iframe", "embed", "object",
];
const LIST_TAGS: &[&str] = &["ul", "ol", "dl", "li", "dt", "dd"];
const LIST_ROLES: &[&str] = &["list", "listitem"];
const TABLE_TAGS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr", "td", "th", "caption"];
const TABLE_ROLES: &[&str] = &["table", "grid", "row", "cell", "columnheader", "rowheader"];
const CONTENT_TAGS: &[&str] = &[
    "p", "article", "section", "main", "aside", "blockquote", "pre", "figure", "figcaption",
    "header", "footer", "address",
];
const LANDMARK_TAGS: &[&str] = &["section", "article", "main", "header", "footer", "aside"];
const LANDMARK_ROLES: &[&str] = &["region", "main", "banner", "contentinfo", "complementary"];
const EMPHASIS_CLASS_HINTS: &[&str] = &["primary", "main", "hero"];

/// Text longer than this (in characters) makes an otherwise generic node content.
pub const CONTENT_TEXT_LENGTH: usize = 20;

/// Result of classifying one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub semantic_type: SemanticType,
    pub importance: f64,
}

/// Bonus sizes for the importance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportanceWeights {
    /// Maximum bonus for covering the whole viewport.
    pub area_bonus: f64,
    /// Maximum bonus for sitting at the very top of the viewport.
    pub position_bonus: f64,
    /// Bonus for each of: a role, an aria-label, `tabIndex == 0`.
    pub accessibility_bonus: f64,
    pub id_bonus: f64,
    /// Bonus for `primary`/`main`/`hero` in the class name.
    pub emphasis_bonus: f64,
    /// Multiplier applied to invisible nodes.
    pub hidden_factor: f64,
}

impl Default for ImportanceWeights {
    fn default() -> Self {
        Self {
            area_bonus: 20.0,
            position_bonus: 10.0,
            accessibility_bonus: 5.0,
            id_bonus: 5.0,
            emphasis_bonus: 10.0,
            hidden_factor: 0.1,
        }
    }
}

pub fn base_importance(semantic_type: SemanticType) -> f64 {
    match semantic_type {
        SemanticType::Heading => 80.0,
        SemanticType::Navigation => 70.0,
        SemanticType::Form => 65.0,
        SemanticType::Interactive => 60.0,
        SemanticType::Media => 50.0,
        SemanticType::Section => 50.0,
        SemanticType::Table => 45.0,
        SemanticType::Content => 40.0,
        SemanticType::List => 40.0,
        SemanticType::Group => 35.0,
        SemanticType::Container => 30.0,
        SemanticType::Structural => 20.0,
    }
}

pub fn classify(node: &VisualNode, viewport: &Viewport) -> Classification {
    classify_with(node, viewport, &ImportanceWeights::default())
}

pub fn classify_with(
    node: &VisualNode,
    viewport: &Viewport,
    weights: &ImportanceWeights,
) -> Classification {
    let semantic_type = classify_type(node);
    Classification {
        semantic_type,
        importance: importance(node, semantic_type, viewport, weights),
    }
}

/// First-match-wins rule cascade.
pub fn classify_type(node: &VisualNode) -> SemanticType {
    let tag = node.tag();
    let tag = tag.as_str();
    let role = node.role_lower();
    let role = role.as_deref();
    let class = node.class_name.to_ascii_lowercase();

    if HEADING_TAGS.contains(&tag) || role == Some("heading") {
        return SemanticType::Heading;
    }
    if tag == "nav"
        || role.is_some_and(|r| NAV_ROLES.contains(&r))
        || NAV_CLASS_HINTS.iter().any(|hint| class.contains(hint))
    {
        return SemanticType::Navigation;
    }
    if FORM_TAGS.contains(&tag) || role.is_some_and(|r| FORM_ROLES.contains(&r)) {
        return SemanticType::Form;
    }
    if INTERACTIVE_TAGS.contains(&tag) || role.is_some_and(|r| INTERACTIVE_ROLES.contains(&r)) {
        return SemanticType::Interactive;
    }
    if MEDIA_TAGS.contains(&tag) || role == Some("img") {
        return SemanticType::Media;
    }
    if LIST_TAGS.contains(&tag) || role.is_some_and(|r| LIST_ROLES.contains(&r)) {
        return SemanticType::List;
    }
    if TABLE_TAGS.contains(&tag) || role.is_some_and(|r| TABLE_ROLES.contains(&r)) {
        return SemanticType::Table;
    }
    let text_len = node.trimmed_text().map(|t| t.chars().count()).unwrap_or(0);
    if CONTENT_TAGS.contains(&tag) || text_len > CONTENT_TEXT_LENGTH {
        return SemanticType::Content;
    }
    SemanticType::Structural
}

/// Refine a cascade result into the type a group built from this node carries.
///
/// Only generic results (`content`, `structural`) are refined: landmarks
/// become `section`, explicit groupings become `group`, and generic nodes
/// with at least two children become `container`.
pub fn group_type(node: &VisualNode, classified: SemanticType) -> SemanticType {
    if !matches!(classified, SemanticType::Content | SemanticType::Structural) {
        return classified;
    }
    let tag = node.tag();
    let role = node.role_lower();
    if LANDMARK_TAGS.contains(&tag.as_str())
        || role.as_deref().is_some_and(|r| LANDMARK_ROLES.contains(&r))
    {
        return SemanticType::Section;
    }
    if role.as_deref() == Some("group") || tag == "details" {
        return SemanticType::Group;
    }
    if node.children.len() >= 2 {
        return SemanticType::Container;
    }
    classified
}

pub fn importance(
    node: &VisualNode,
    semantic_type: SemanticType,
    viewport: &Viewport,
    weights: &ImportanceWeights,
) -> f64 {
    let mut score = base_importance(semantic_type);

    let viewport_area = viewport.area();
    if viewport_area > 0.0 {
        let ratio = (node.rect.area() / viewport_area).clamp(0.0, 1.0);
        score += ratio * weights.area_bonus;
    }

    let viewport_height = viewport.height as f64;
    if viewport_height > 0.0 && node.rect.y < viewport_height {
        let fraction = (node.rect.y.max(0.0) / viewport_height).clamp(0.0, 1.0);
        score += (1.0 - fraction) * weights.position_bonus;
    }

    if node.role_lower().is_some() {
        score += weights.accessibility_bonus;
    }
    if node.aria_label.as_deref().is_some_and(|l| !l.trim().is_empty()) {
        score += weights.accessibility_bonus;
    }
    if node.tab_index == Some(0) {
        score += weights.accessibility_bonus;
    }
    if node.dom_id().is_some() {
        score += weights.id_bonus;
    }
    let class = node.class_name.to_ascii_lowercase();
    if EMPHASIS_CLASS_HINTS.iter().any(|hint| class.contains(hint)) {
        score += weights.emphasis_bonus;
    }

    if node.is_hidden() {
        score *= weights.hidden_factor;
    }
    let opacity = node.opacity();
    if opacity < 1.0 {
        score *= opacity;
    }

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComputedStyle, Rect};

    fn node(tag: &str) -> VisualNode {
        VisualNode::new(tag, Rect::new(0.0, 800.0, 0.0, 0.0))
    }

    fn vp() -> Viewport {
        Viewport {
            width: 1000,
            height: 800,
        }
    }

    #[test]
    fn cascade_precedence() {
        assert_eq!(classify_type(&node("h2")), SemanticType::Heading);
        // heading role outranks the interactive tag
        assert_eq!(
            classify_type(&node("a").with_role("heading")),
            SemanticType::Heading
        );
        assert_eq!(classify_type(&node("nav")), SemanticType::Navigation);
        assert_eq!(
            classify_type(&node("div").with_class("site-navbar")),
            SemanticType::Navigation
        );
        // nav class hint outranks the link tag
        assert_eq!(
            classify_type(&node("a").with_class("menu-item")),
            SemanticType::Navigation
        );
        assert_eq!(classify_type(&node("form")), SemanticType::Form);
        assert_eq!(classify_type(&node("input")), SemanticType::Interactive);
        assert_eq!(
            classify_type(&node("span").with_role("checkbox")),
            SemanticType::Interactive
        );
        assert_eq!(classify_type(&node("img")), SemanticType::Media);
        assert_eq!(classify_type(&node("li")), SemanticType::List);
        assert_eq!(classify_type(&node("td")), SemanticType::Table);
        assert_eq!(classify_type(&node("p")), SemanticType::Content);
        assert_eq!(classify_type(&node("div")), SemanticType::Structural);
    }

    #[test]
    fn long_text_makes_generic_nodes_content() {
        let short = node("span").with_text("exactly twenty chars");
        assert_eq!("exactly twenty chars".chars().count(), 20);
        assert_eq!(classify_type(&short), SemanticType::Structural);
        let long = node("span").with_text("twenty-one characters");
        assert_eq!(classify_type(&long), SemanticType::Content);
        // a list item with long text stays a list item
        let li = node("li").with_text("a list entry with plenty of text");
        assert_eq!(classify_type(&li), SemanticType::List);
    }

    #[test]
    fn base_scores_range_from_heading_to_structural() {
        let off_screen = vp();
        let heading = classify(&node("h1"), &off_screen);
        let div = classify(&node("div"), &off_screen);
        assert!((heading.importance - 80.0).abs() < 1e-9, "{heading:?}");
        assert!((div.importance - 20.0).abs() < 1e-9, "{div:?}");
    }

    #[test]
    fn importance_bonuses_add_up_and_clamp() {
        let viewport = vp();
        let mut full = VisualNode::new("h1", Rect::new(0.0, 0.0, 1000.0, 800.0))
            .with_class("hero-title")
            .with_id("title")
            .with_role("heading");
        full.aria_label = Some("Title".to_string());
        full.tab_index = Some(0);
        // 80 + 20 + 10 + 15 + 5 + 10 = 140 -> 100
        assert_eq!(classify(&full, &viewport).importance, 100.0);

        let half_way = VisualNode::new("div", Rect::new(0.0, 400.0, 100.0, 80.0));
        // 20 + 0.01 * 20 + 0.5 * 10
        let score = classify(&half_way, &viewport).importance;
        assert!((score - 25.2).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn hidden_and_transparent_nodes_are_scaled_down() {
        let viewport = vp();
        let mut hidden = node("h1");
        hidden.is_visible = false;
        assert!((classify(&hidden, &viewport).importance - 8.0).abs() < 1e-9);

        let faded = node("h1").with_style(ComputedStyle {
            opacity: Some(0.5),
            ..ComputedStyle::default()
        });
        assert!((classify(&faded, &viewport).importance - 40.0).abs() < 1e-9);
    }

    #[test]
    fn classification_is_deterministic() {
        let viewport = vp();
        let n = VisualNode::new("button", Rect::new(10.0, 20.0, 120.0, 40.0))
            .with_class("btn primary")
            .with_text("Sign up");
        let first = classify(&n, &viewport);
        for _ in 0..10 {
            assert_eq!(classify(&n, &viewport), first);
        }
    }

    #[test]
    fn group_type_refines_generic_nodes_only() {
        assert_eq!(
            group_type(&node("section"), SemanticType::Content),
            SemanticType::Section
        );
        assert_eq!(
            group_type(&node("div").with_role("region"), SemanticType::Structural),
            SemanticType::Section
        );
        assert_eq!(
            group_type(&node("div").with_role("group"), SemanticType::Structural),
            SemanticType::Group
        );
        let wrapper = node("div").with_children(vec![node("span"), node("span")]);
        assert_eq!(
            group_type(&wrapper, SemanticType::Structural),
            SemanticType::Container
        );
        assert_eq!(
            group_type(&node("ul"), SemanticType::List),
            SemanticType::List
        );
    }
}
