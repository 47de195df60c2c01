//! Classification of parsed elements into renderable nodes.
//!
//! Each recognized tag maps to one [`NodeKind`]; unrecognized wrapper tags
//! are flattened away with their children re-parented to the nearest
//! recognized ancestor. The resulting [`RenderNode`] tree mirrors the element
//! tree and is the unit later pipeline stages operate on.

use crate::layout::Anchor;
use crate::markup::Element;
use crate::resource::PreparedImage;
use crate::style::{BUTTON_BACKGROUND, BUTTON_PADDING, Color, Insets, Styled};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Minimum height injected into spacer nodes without an explicit `height`.
pub const SPACER_MIN_HEIGHT: f32 = 10.0;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("markup contains no renderable content")]
    NoRenderableContent,
}

/// Identity of a render node. Two nodes are the same node only if their ids
/// match; node equality is never structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque handle to a platform widget allocated during the instantiate
/// stage. The host maps handles to concrete widgets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetHandle(pub u64);

/// Semantic kind of a render node, one variant per recognized tag.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container,
    Heading { level: Option<u32> },
    Text,
    Image { src: Option<String> },
    /// Carries the action payload dispatched when the button is activated.
    Button { action: Option<String> },
    Spacer,
}

impl NodeKind {
    /// Total mapping from tag name to node kind; unknown tags are `None`.
    pub fn from_tag(element: &Element) -> Option<NodeKind> {
        match element.name.as_str() {
            "re-body" | "re-main" | "re-block" => Some(NodeKind::Container),
            "re-heading" => Some(NodeKind::Heading { level: element.level() }),
            "re-text" => Some(NodeKind::Text),
            "re-image" => Some(NodeKind::Image {
                src: element.attribute("src").filter(|s| !s.is_empty()).map(String::from),
            }),
            "re-button" => Some(NodeKind::Button { action: element.href().map(String::from) }),
            "re-spacer" => Some(NodeKind::Spacer),
            _ => None,
        }
    }
}

/// One renderable node, owning its children and a reference to its source
/// element. Later stages attach per-run data: the instantiated widget
/// handle, prepared image bytes and compiled anchors.
#[derive(Debug)]
pub struct RenderNode {
    id: NodeId,
    pub kind: NodeKind,
    pub element: Arc<Element>,
    pub children: Vec<RenderNode>,
    pub widget: Option<WidgetHandle>,
    pub image: Option<PreparedImage>,
    pub anchors: Vec<Anchor>,
    min_height: Option<f32>,
}

impl PartialEq for RenderNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RenderNode {
    fn new(kind: NodeKind, element: Arc<Element>) -> Self {
        RenderNode {
            id: NodeId::next(),
            kind,
            element,
            children: Vec::new(),
            widget: None,
            image: None,
            anchors: Vec::new(),
            min_height: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Explicit height attribute, falling back to any injected minimum
    /// (spacers default to [`SPACER_MIN_HEIGHT`]).
    pub fn effective_height(&self) -> Option<f32> {
        self.element.height().or(self.min_height)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::node_count).sum::<usize>()
    }

    pub fn find(&self, id: NodeId) -> Option<&RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Background with the button brand default applied when unset.
    /// Non-button nodes never receive a default.
    pub fn resolved_background(&self) -> Option<Color> {
        self.element.background_color().or(match self.kind {
            NodeKind::Button { .. } => Some(BUTTON_BACKGROUND),
            _ => None,
        })
    }

    /// Content padding with the button default applied when unset.
    pub fn resolved_padding(&self) -> Option<Insets> {
        self.element.padding().or(match self.kind {
            NodeKind::Button { .. } => Some(BUTTON_PADDING),
            _ => None,
        })
    }
}

/// Builds a render tree from an element tree.
///
/// Depth-first walk; the first recognized element becomes the render root,
/// and any later recognized element without a recognized ancestor is
/// attached beneath it. Zero recognized elements is the "no renderable
/// content" condition, distinct from a parse failure.
pub fn classify(root: &Arc<Element>) -> Result<RenderNode, ClassifyError> {
    let mut top_level = Vec::new();
    visit(root, &mut top_level);

    let mut nodes = top_level.into_iter();
    let mut render_root = nodes.next().ok_or(ClassifyError::NoRenderableContent)?;
    render_root.children.extend(nodes);
    Ok(render_root)
}

fn visit(element: &Arc<Element>, out: &mut Vec<RenderNode>) {
    match NodeKind::from_tag(element) {
        Some(kind) => {
            let mut node = RenderNode::new(kind, Arc::clone(element));
            if matches!(node.kind, NodeKind::Spacer) && element.height().is_none() {
                node.min_height = Some(SPACER_MIN_HEIGHT);
            }
            for child in &element.children {
                visit(child, &mut node.children);
            }
            out.push(node);
        }
        None => {
            for child in &element.children {
                visit(child, out);
            }
        }
    }
}

/// First explicitly-set background color found on the chain of first
/// children starting at the root. Hosts use this to style fullscreen
/// surfaces and the close affordance.
pub fn effective_background(root: &RenderNode) -> Option<Color> {
    let mut node = Some(root);
    while let Some(current) = node {
        if let Some(color) = current.element.background_color() {
            return Some(color);
        }
        node = current.children.first();
    }
    None
}
