//! Hierarchical semantic grouping of a classified element tree.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

use crate::classify::{classify_with, group_type, ImportanceWeights};
use crate::types::{Rect, SemanticGroup, SemanticType, Snapshot, VisualNode};
use crate::viewport::Viewport;

/// Maximum characters of text carried into a group label.
const LABEL_TEXT_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupBuilderConfig {
    /// A node whose importance is strictly above this opens its own group.
    pub significance_importance: f64,
    /// A node with at least this many children opens its own group.
    pub min_children: usize,
    /// Groups are never nested deeper than this; deeper nodes are absorbed.
    pub max_depth: usize,
    pub importance: ImportanceWeights,
}

impl Default for GroupBuilderConfig {
    fn default() -> Self {
        Self {
            significance_importance: 30.0,
            min_children: 3,
            max_depth: 32,
            importance: ImportanceWeights::default(),
        }
    }
}

struct Draft {
    group_type: SemanticType,
    bounds: Rect,
    importance: f64,
    depth: usize,
    label: String,
    element_count: usize,
    parent: Option<usize>,
}

/// Build the semantic group hierarchy for a list of root nodes.
///
/// Walks depth-first with an explicit stack. A node opens a group when its
/// group type is structurally significant, its importance is above
/// `significance_importance`, or it has at least `min_children` children.
/// Any other node is absorbed by its nearest ancestor group, whose bounds grow
/// to cover it. Top-level nodes always open a group. Roots and siblings are
/// sorted by importance, descending; ties keep document order.
pub fn build_groups(
    roots: &[VisualNode],
    viewport: &Viewport,
    config: &GroupBuilderConfig,
) -> Vec<SemanticGroup> {
    let mut drafts: Vec<Draft> = Vec::new();
    let mut stack: Vec<(&VisualNode, Option<usize>)> =
        roots.iter().rev().map(|n| (n, None)).collect();

    while let Some((node, ancestor)) = stack.pop() {
        let classification = classify_with(node, viewport, &config.importance);
        let kind = group_type(node, classification.semantic_type);
        let significant = kind.is_structurally_significant()
            || classification.importance > config.significance_importance
            || node.children.len() >= config.min_children;

        let owner = match ancestor {
            None => open_group(&mut drafts, node, kind, classification.importance, None),
            Some(parent) if significant && drafts[parent].depth + 1 < config.max_depth => {
                open_group(&mut drafts, node, kind, classification.importance, Some(parent))
            }
            Some(parent) => {
                let draft = &mut drafts[parent];
                draft.bounds = draft.bounds.union(&node.rect);
                draft.element_count += 1;
                parent
            }
        };

        for child in node.children.iter().rev() {
            stack.push((child, Some(owner)));
        }
    }

    let groups = assemble(drafts);
    debug!(groups = groups.len(), "built semantic groups");
    groups
}

/// Groups carried by the snapshot, or freshly built ones when it has none.
pub fn snapshot_groups<'a>(
    snapshot: &'a Snapshot,
    config: &GroupBuilderConfig,
) -> Cow<'a, [SemanticGroup]> {
    match snapshot.semantic_groups.as_deref() {
        Some(groups) if !groups.is_empty() => Cow::Borrowed(groups),
        _ => Cow::Owned(build_groups(&snapshot.elements, &snapshot.viewport, config)),
    }
}

fn open_group(
    drafts: &mut Vec<Draft>,
    node: &VisualNode,
    group_type: SemanticType,
    importance: f64,
    parent: Option<usize>,
) -> usize {
    let depth = parent.map(|p| drafts[p].depth + 1).unwrap_or(0);
    drafts.push(Draft {
        group_type,
        bounds: node.rect,
        importance,
        depth,
        label: label_for(node),
        element_count: 1,
        parent,
    });
    drafts.len() - 1
}

/// Turn the arena into owned trees bottom-up.
///
/// Drafts are created in pre-order, so every parent has a lower index than
/// its children and walking backwards finishes children first.
fn assemble(mut drafts: Vec<Draft>) -> Vec<SemanticGroup> {
    let mut children: Vec<Vec<SemanticGroup>> = (0..drafts.len()).map(|_| Vec::new()).collect();
    let mut roots = Vec::new();

    for index in (0..drafts.len()).rev() {
        let mut kids = std::mem::take(&mut children[index]);
        kids.reverse();
        sort_by_importance(&mut kids);

        let draft = &drafts[index];
        let group = SemanticGroup {
            id: format!("group-{}", index + 1),
            group_type: draft.group_type,
            bounds: draft.bounds,
            importance: draft.importance,
            depth: draft.depth,
            label: draft.label.clone(),
            element_count: draft.element_count,
            children: kids,
        };
        let parent = draft.parent;

        match parent {
            Some(parent) => {
                let parent_draft = &mut drafts[parent];
                parent_draft.bounds = parent_draft.bounds.union(&group.bounds);
                parent_draft.element_count += group.element_count;
                children[parent].push(group);
            }
            None => roots.push(group),
        }
    }

    roots.reverse();
    sort_by_importance(&mut roots);
    roots
}

fn sort_by_importance(groups: &mut [SemanticGroup]) {
    // sort_by is stable, so equal importance keeps document order
    groups.sort_by(|a, b| b.importance.total_cmp(&a.importance));
}

fn label_for(node: &VisualNode) -> String {
    if let Some(text) = node.trimmed_text() {
        return text.chars().take(LABEL_TEXT_LEN).collect();
    }
    if let Some(label) = node.aria_label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        return label.to_string();
    }
    match node.classes().next() {
        Some(class) => format!("{}.{}", node.tag(), class),
        None => node.tag(),
    }
}
