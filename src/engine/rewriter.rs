//! Rewriter - materializes resolved matches as marker wrappers
//!
//! A segment plus its non-overlapping match list becomes an ordered run of
//! plain text and marker wrappers; the original node is replaced in place by
//! that run. The inverse unwinds every marker back to plain text and merges
//! adjacent runs, so a scan pass can always start from a clean tree.
//!
//! The part builder is pure and shared with the WASM facade: Rust computes
//! the render plan, the content script materializes it against the live DOM.

use serde::{Deserialize, Serialize};

use crate::dom::{MarkerClass, NodeData, NodeId, PageModel};
use crate::engine::color::{hex_to_rgba, HIGHLIGHT_ALPHA};
use crate::engine::matcher::{MatchKind, MatchSpan};

// ==================== TYPE DEFINITIONS ====================

/// Fixed styling shared by every highlight wrapper (fill color is per-slot)
pub const HIGHLIGHT_BASE_STYLE: &str = "border-radius: 2px; padding: 1px 2px; margin: 0 1px";

/// Fixed de-emphasis styling for negative wrappers
pub const NEGATIVE_STYLE: &str = "opacity: 0.3; text-decoration: line-through; color: #888";

/// One piece of a rewritten segment, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part", rename_all = "lowercase")]
pub enum SegmentPart {
    Plain {
        text: String,
    },
    Marked {
        text: String,
        class: MarkerClass,
        style: String,
    },
}

impl SegmentPart {
    pub fn text(&self) -> &str {
        match self {
            SegmentPart::Plain { text } => text,
            SegmentPart::Marked { text, .. } => text,
        }
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// Inline style for one match kind
pub fn marker_style(kind: &MatchKind) -> String {
    match kind {
        MatchKind::Highlight { color } => format!(
            "background-color: {}; {}",
            hex_to_rgba(color, HIGHLIGHT_ALPHA),
            HIGHLIGHT_BASE_STYLE
        ),
        MatchKind::Negative => NEGATIVE_STYLE.to_string(),
    }
}

/// Build the replacement run for a segment. `matches` must be sorted and
/// non-overlapping (the matcher's output contract). The concatenation of all
/// part texts equals `text` exactly; marked texts are sliced from the
/// original segment, never taken from the span, so no character can drift.
pub fn segment_parts(text: &str, matches: &[MatchSpan]) -> Vec<SegmentPart> {
    let mut parts = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;

    for span in matches {
        if span.start > cursor {
            parts.push(SegmentPart::Plain {
                text: text[cursor..span.start].to_string(),
            });
        }
        let class = match span.kind {
            MatchKind::Highlight { .. } => MarkerClass::Highlight,
            MatchKind::Negative => MarkerClass::Negative,
        };
        parts.push(SegmentPart::Marked {
            text: text[span.start..span.end].to_string(),
            class,
            style: marker_style(&span.kind),
        });
        cursor = span.end;
    }

    if cursor < text.len() {
        parts.push(SegmentPart::Plain {
            text: text[cursor..].to_string(),
        });
    }
    parts
}

/// Replace a text segment in place by its rewritten run.
/// No-op for an empty match list, non-text nodes, and detached nodes.
pub fn apply_matches(page: &mut PageModel, segment: NodeId, matches: &[MatchSpan]) {
    if matches.is_empty() {
        return;
    }
    let text = match page.data(segment) {
        NodeData::Text(text) => text.clone(),
        NodeData::Element { .. } => return,
    };

    let mut replacements = Vec::new();
    for part in segment_parts(&text, matches) {
        match part {
            SegmentPart::Plain { text } => replacements.push(page.text(&text)),
            SegmentPart::Marked { text, class, style } => {
                let wrapper = page.marker_element(class, &style);
                let inner = page.text(&text);
                page.append_child(wrapper, inner);
                replacements.push(wrapper);
            }
        }
    }
    page.replace_with_sequence(segment, replacements);
}

/// Unwind every marker under `root` to a plain text node holding its current
/// text content, then merge adjacent text runs. Idempotent: with no markers
/// present this is a no-op.
pub fn remove_all_markers(page: &mut PageModel, root: NodeId) {
    for marker in page.collect_markers(root) {
        let parent = page.parent(marker);
        let content = page.text_content(marker);
        let replacement = page.text(&content);
        if page.replace_with_sequence(marker, vec![replacement]) {
            if let Some(parent) = parent {
                page.normalize(parent);
            }
        }
    }
}

// ==================== TESTS ====================
