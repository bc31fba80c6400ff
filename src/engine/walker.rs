//! Text segment enumeration over a PageModel
//!
//! Produces the working set for one scan pass: every text node that is
//! visible prose, not already marked, and not inside live input. The
//! sequence is lazy and restartable; callers materialize it in full before
//! mutating the tree, because rewriting during traversal would invalidate
//! the walk.

use crate::dom::{NodeData, NodeId, PageModel, NON_PROSE_TAGS};

// ==================== TYPE DEFINITIONS ====================

/// One matchable run of text, addressed by its node handle
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub node: NodeId,
    pub text: String,
}

// ==================== MAIN IMPLEMENTATION ====================

/// Lazy preorder sequence of accepted text segments under `root`
pub fn text_segments<'a>(
    page: &'a PageModel,
    root: NodeId,
) -> impl Iterator<Item = TextSegment> + 'a {
    page.descendants(root).filter_map(move |node| {
        if !accepts(page, node) {
            return None;
        }
        Some(TextSegment {
            node,
            text: page.text_content(node),
        })
    })
}

/// Snapshot of the full segment list, taken before any mutation begins
pub fn collect_text_segments(page: &PageModel, root: NodeId) -> Vec<TextSegment> {
    text_segments(page, root).collect()
}

/// Acceptance policy for one visited node, checked in order:
/// parentless text, non-prose parents, already-marked regions, editable
/// regions, and whitespace-only runs are all rejected.
fn accepts(page: &PageModel, node: NodeId) -> bool {
    let text = match page.data(node) {
        NodeData::Text(text) => text,
        NodeData::Element { .. } => return false,
    };

    let parent = match page.parent_element(node) {
        Some(parent) => parent,
        None => return false,
    };

    if let Some(tag) = page.tag(parent) {
        if NON_PROSE_TAGS.contains(&tag) {
            return false;
        }
    }

    if page.in_marker_context(node) {
        return false;
    }

    if page.in_editable_context(node) {
        return false;
    }

    !text.trim().is_empty()
}

// ==================== TESTS ====================
