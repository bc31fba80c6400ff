//! PageModel - Arena-backed stand-in for the page DOM
//!
//! The engine never walks a live browser tree. Hosts mirror the region they
//! want scanned into a `PageModel`, the engine rewrites it, and the content
//! script applies the resulting parts back to the real page.
//!
//! Nodes are `NodeId` handles into a flat arena. A node replaced out of the
//! tree stays in the arena as a detached entry until the model is rebuilt;
//! handles are never reused within one model, so a snapshot of handles taken
//! before a mutation pass stays valid throughout it.

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Handle into the page arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Wrapper classes produced by the rewriter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerClass {
    Highlight,
    Negative,
}

impl MarkerClass {
    /// CSS class name the content script attaches to the wrapper element
    pub fn class_name(&self) -> &'static str {
        match self {
            MarkerClass::Highlight => "markcore-hl",
            MarkerClass::Negative => "markcore-neg",
        }
    }
}

/// Element tags whose text is never prose (scripts, styles, form controls)
pub const NON_PROSE_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "textarea", "input", "select",
];

/// Node payload: an element or a run of text
#[derive(Debug, Clone)]
pub enum NodeData {
    Element {
        tag: String,
        marker: Option<MarkerClass>,
        editable: bool,
        style: Option<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed page tree plus the page identity reported by `getPageInfo`
#[derive(Debug, Clone)]
pub struct PageModel {
    nodes: Vec<Node>,
    root: NodeId,
    pub title: String,
    pub url: String,
}

// =============================================================================
// PageModel
// =============================================================================

impl PageModel {
    /// Create an empty page with a `body` root
    pub fn new() -> Self {
        let mut page = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            title: String::new(),
            url: String::new(),
        };
        page.root = page.element("body");
        page
    }

    /// Create an empty page carrying a title and URL
    pub fn with_location(title: &str, url: &str) -> Self {
        let mut page = Self::new();
        page.title = title.to_string();
        page.url = url.to_string();
        page
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached element node
    pub fn element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            marker: None,
            editable: false,
            style: None,
        })
    }

    /// Create a detached element marked as user-editable content
    pub fn editable_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            marker: None,
            editable: true,
            style: None,
        })
    }

    /// Create a detached marker wrapper (`span` carrying a marker class)
    pub fn marker_element(&mut self, class: MarkerClass, style: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: "span".to_string(),
            marker: Some(class),
            editable: false,
            style: Some(style.to_string()),
        })
    }

    /// Create a detached text node
    pub fn text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Text(content.to_string()))
    }

    /// Attach a detached node as the last child of `parent`.
    /// Ignored when `parent` is a text node.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if matches!(self.nodes[parent.0].data, NodeData::Text(_)) {
            return;
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Text(_))
    }

    /// Lowercase tag of an element node
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Marker class of a wrapper element, if any
    pub fn marker(&self, id: NodeId) -> Option<MarkerClass> {
        match &self.nodes[id.0].data {
            NodeData::Element { marker, .. } => *marker,
            NodeData::Text(_) => None,
        }
    }

    pub fn is_marker(&self, id: NodeId) -> bool {
        self.marker(id).is_some()
    }

    /// Inline style attached to an element, if any
    pub fn style(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { style, .. } => style.as_deref(),
            NodeData::Text(_) => None,
        }
    }

    /// Nearest ancestor that is an element (the node's rendering context)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if self.is_element(parent) {
            Some(parent)
        } else {
            self.parent_element(parent)
        }
    }

    /// True when the node sits inside an existing marker wrapper
    pub fn in_marker_context(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.is_marker(node) {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// True when the node sits inside user-editable content.
    /// Editability is inherited, so the whole ancestor chain is consulted.
    pub fn in_editable_context(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if let NodeData::Element { editable: true, .. } = self.nodes[node.0].data {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Text content of a subtree: the node's own text, or the concatenation
    /// of every descendant text run in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element { .. } => {
                let mut out = String::new();
                for child in self.descendants(id) {
                    if let NodeData::Text(text) = &self.nodes[child.0].data {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    /// Preorder iterator over the descendants of `root` (root excluded)
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack = Vec::new();
        stack.extend(self.nodes[root.0].children.iter().rev());
        Descendants { page: self, stack }
    }

    /// Every marker wrapper under `root`, in document order
    pub fn collect_markers(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|&id| self.is_marker(id))
            .collect()
    }

    /// Atomically replace `target` in its parent by a run of detached nodes.
    /// The target is detached; its handle stays valid but points outside the
    /// tree. Returns false when the target has no parent.
    pub fn replace_with_sequence(&mut self, target: NodeId, replacements: Vec<NodeId>) -> bool {
        let parent = match self.nodes[target.0].parent {
            Some(p) => p,
            None => return false,
        };
        let position = match self.nodes[parent.0].children.iter().position(|&c| c == target) {
            Some(p) => p,
            None => return false,
        };
        for &node in &replacements {
            self.nodes[node.0].parent = Some(parent);
        }
        self.nodes[target.0].parent = None;
        self.nodes[parent.0]
            .children
            .splice(position..=position, replacements);
        true
    }

    /// Merge adjacent text children of `parent` into single runs
    pub fn normalize(&mut self, parent: NodeId) {
        let children = self.nodes[parent.0].children.clone();
        let mut merged: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let run = match (&self.nodes[child.0].data, merged.last()) {
                (NodeData::Text(text), Some(&prev)) if self.is_text(prev) => {
                    Some((prev, text.clone()))
                }
                _ => None,
            };
            match run {
                Some((prev, text)) => {
                    if let NodeData::Text(existing) = &mut self.nodes[prev.0].data {
                        existing.push_str(&text);
                    }
                    self.nodes[child.0].parent = None;
                }
                None => merged.push(child),
            }
        }
        self.nodes[parent.0].children = merged;
    }
}

impl Default for PageModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Preorder traversal handle returned by [`PageModel::descendants`]
pub struct Descendants<'a> {
    page: &'a PageModel,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.page.nodes[id.0].children.iter().rev());
        Some(id)
    }
}

// =============================================================================
// Tests
// =============================================================================
