//! Compiles render nodes into declarative anchor relationships.
//!
//! The compiler never resolves absolute geometry. For each node it emits an
//! ordered set of edge-to-edge relationships against its parent and previous
//! sibling; the host's geometry solver realizes them. Horizontal placement of
//! fixed-width nodes follows the *parent's* alignment attribute for every
//! node kind.

use crate::events::DisplayMode;
use crate::node::{NodeId, NodeKind, RenderNode};
use crate::style::{Align, Styled};

/// A single declarative constraint consumed by the external geometry solver.
/// Offsets follow screen convention: positive pushes toward the trailing /
/// bottom direction, so trailing and bottom attachments carry negative
/// offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// Fixed width in layout units.
    Width(f32),
    /// Fixed height in layout units.
    Height(f32),
    /// Derived height preserving the source image's aspect ratio.
    AspectHeight { width: f32, ratio: f32 },
    /// Derived width preserving the source image's aspect ratio.
    AspectWidth { height: f32, ratio: f32 },
    /// Horizontal center tied to the parent's horizontal center.
    CenterX,
    /// Vertical center tied to the host's vertical center (surface only).
    CenterY,
    /// Leading edge tied to the parent's leading edge.
    LeadingToParent(f32),
    /// Trailing edge tied to the parent's trailing edge.
    TrailingToParent(f32),
    /// Top edge tied to the parent's top edge.
    TopToParent(f32),
    /// Top edge tied to the bottom edge of the previous sibling.
    TopToSibling { sibling: NodeId, offset: f32 },
    /// Bottom edge tied to the parent's bottom edge.
    BottomToParent(f32),
    /// The surface's bottom edge tied to the content's bottom (surface only).
    BottomToContent,
}

/// Emits the anchor set for one non-root node.
pub fn compile(
    node: &RenderNode,
    parent: &RenderNode,
    previous: Option<&RenderNode>,
    is_last: bool,
) -> Vec<Anchor> {
    let parent_padding = parent.element.padding().unwrap_or_default();
    let self_margin = node.element.margin().unwrap_or_default();
    let mut anchors = Vec::new();

    // Aspect-ratio inference comes first: it only applies to prepared image
    // nodes with exactly one explicit dimension.
    if let NodeKind::Image { .. } = node.kind {
        if let Some(image) = &node.image {
            let ratio = image.aspect_ratio();
            match (node.element.width(), node.element.height()) {
                (Some(width), None) => anchors.push(Anchor::AspectHeight { width, ratio }),
                (None, Some(height)) => anchors.push(Anchor::AspectWidth { height, ratio }),
                _ => {}
            }
        }
    }

    match node.element.width() {
        Some(width) => {
            anchors.push(Anchor::Width(width));
            match parent.element.align() {
                Some(Align::Center) => anchors.push(Anchor::CenterX),
                Some(Align::Right) => anchors.push(Anchor::TrailingToParent(
                    -(parent_padding.right + self_margin.right),
                )),
                _ => anchors
                    .push(Anchor::LeadingToParent(parent_padding.left + self_margin.left)),
            }
        }
        None => {
            anchors.push(Anchor::LeadingToParent(parent_padding.left + self_margin.left));
            anchors
                .push(Anchor::TrailingToParent(-(parent_padding.right + self_margin.right)));
        }
    }

    if let Some(height) = node.effective_height() {
        anchors.push(Anchor::Height(height));
    }

    match previous {
        Some(sibling) => {
            let sibling_margin = sibling.element.margin().unwrap_or_default();
            anchors.push(Anchor::TopToSibling {
                sibling: sibling.id(),
                offset: sibling_margin.bottom + self_margin.top,
            });
        }
        None => anchors.push(Anchor::TopToParent(parent_padding.top + self_margin.top)),
    }

    if is_last {
        anchors.push(Anchor::BottomToParent(-(self_margin.bottom + parent_padding.bottom)));
    }

    anchors
}

/// Anchors pinning the render root inside the banner surface.
pub fn compile_root() -> Vec<Anchor> {
    vec![Anchor::TopToParent(0.0), Anchor::LeadingToParent(0.0), Anchor::TrailingToParent(0.0)]
}

/// Anchors placing the banner surface inside the host, per display mode.
/// Fullscreen pins all four edges; the other modes hug the content height.
pub fn compile_surface(mode: DisplayMode) -> Vec<Anchor> {
    match mode {
        DisplayMode::Fullscreen => vec![
            Anchor::TopToParent(0.0),
            Anchor::LeadingToParent(0.0),
            Anchor::TrailingToParent(0.0),
            Anchor::BottomToParent(0.0),
        ],
        DisplayMode::Center => vec![
            Anchor::CenterY,
            Anchor::LeadingToParent(0.0),
            Anchor::TrailingToParent(0.0),
            Anchor::BottomToContent,
        ],
        DisplayMode::Top | DisplayMode::Notification => vec![
            Anchor::TopToParent(0.0),
            Anchor::LeadingToParent(0.0),
            Anchor::TrailingToParent(0.0),
            Anchor::BottomToContent,
        ],
    }
}

/// Attaches compiled anchors to every node of the tree, parent before
/// children and siblings in document order.
pub fn compile_tree(root: &mut RenderNode) {
    root.anchors = compile_root();
    compile_children(root);
}

fn compile_children(parent: &mut RenderNode) {
    let last = parent.children.len().saturating_sub(1);
    for index in 0..parent.children.len() {
        let anchors = {
            let previous = if index > 0 { Some(&parent.children[index - 1]) } else { None };
            compile(&parent.children[index], parent, previous, index == last)
        };
        parent.children[index].anchors = anchors;
    }
    for child in &mut parent.children {
        compile_children(child);
    }
}
