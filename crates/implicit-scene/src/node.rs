//! Implicit node trees
//!
//! The wire shape is tagged on `kind`, e.g. `{"kind":"circle","x":0,"y":0,"r":10}`.

use serde::{Deserialize, Serialize};

/// A node of the implicit-surface tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImplicitNode {
    /// Circle centred at (x, y)
    Circle { x: f64, y: f64, r: f64 },
    /// Axis-aligned rectangle with top-left corner (x, y)
    Rect { x: f64, y: f64, w: f64, h: f64 },
    /// Intersection of all children
    And { children: Vec<ImplicitNode> },
    /// Union of all children
    Or { children: Vec<ImplicitNode> },
    /// Complement of the target
    Not { target: Box<ImplicitNode> },
    /// Target shifted by (dx, dy)
    Translate {
        dx: f64,
        dy: f64,
        target: Box<ImplicitNode>,
    },
    /// Target grown (positive) or shrunk (negative) by `how_much`
    Modulate {
        how_much: f64,
        target: Box<ImplicitNode>,
    },
    /// Evaluation boundary hint for the renderer
    Break { target: Box<ImplicitNode> },
    /// Target rasterized and treated as a fixed field
    Freeze { target: Box<ImplicitNode> },
}

impl ImplicitNode {
    /// Short name of the node kind, as it appears on the wire
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Circle { .. } => "circle",
            Self::Rect { .. } => "rect",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Not { .. } => "not",
            Self::Translate { .. } => "translate",
            Self::Modulate { .. } => "modulate",
            Self::Break { .. } => "break",
            Self::Freeze { .. } => "freeze",
        }
    }

    /// Depth of the tree (a leaf has depth 1)
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Circle { .. } | Self::Rect { .. } => 1,
            Self::And { children } | Self::Or { children } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Not { target }
            | Self::Translate { target, .. }
            | Self::Modulate { target, .. }
            | Self::Break { target }
            | Self::Freeze { target } => 1 + target.depth(),
        }
    }

    /// Number of circles and rectangles in the tree
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Circle { .. } | Self::Rect { .. } => 1,
            Self::And { children } | Self::Or { children } => {
                children.iter().map(Self::leaf_count).sum()
            }
            Self::Not { target }
            | Self::Translate { target, .. }
            | Self::Modulate { target, .. }
            | Self::Break { target }
            | Self::Freeze { target } => target.leaf_count(),
        }
    }
}

/// Circle of radius `r` centred at (`x`, `y`)
#[inline]
#[must_use]
pub fn circle(x: f64, y: f64, r: f64) -> ImplicitNode {
    ImplicitNode::Circle { x, y, r }
}

/// Rectangle with top-left corner (`x`, `y`)
#[inline]
#[must_use]
pub fn rect(x: f64, y: f64, w: f64, h: f64) -> ImplicitNode {
    ImplicitNode::Rect { x, y, w, h }
}

/// Intersection
#[must_use]
pub fn and(children: impl IntoIterator<Item = ImplicitNode>) -> ImplicitNode {
    ImplicitNode::And {
        children: children.into_iter().collect(),
    }
}

/// Union
#[must_use]
pub fn or(children: impl IntoIterator<Item = ImplicitNode>) -> ImplicitNode {
    ImplicitNode::Or {
        children: children.into_iter().collect(),
    }
}

/// Complement
#[inline]
#[must_use]
pub fn not(target: ImplicitNode) -> ImplicitNode {
    ImplicitNode::Not {
        target: Box::new(target),
    }
}

/// `a` with `b` cut out of it: `and(a, not(b))`
#[must_use]
pub fn subtract(a: ImplicitNode, b: ImplicitNode) -> ImplicitNode {
    and([a, not(b)])
}

/// Grow or shrink the target's boundary
#[inline]
#[must_use]
pub fn modulate(how_much: f64, target: ImplicitNode) -> ImplicitNode {
    ImplicitNode::Modulate {
        how_much,
        target: Box::new(target),
    }
}

/// Shift the target
#[inline]
#[must_use]
pub fn translate(dx: f64, dy: f64, target: ImplicitNode) -> ImplicitNode {
    ImplicitNode::Translate {
        dx,
        dy,
        target: Box::new(target),
    }
}

#[inline]
#[must_use]
pub fn break_here(target: ImplicitNode) -> ImplicitNode {
    ImplicitNode::Break {
        target: Box::new(target),
    }
}

#[inline]
#[must_use]
pub fn freeze(target: ImplicitNode) -> ImplicitNode {
    ImplicitNode::Freeze {
        target: Box::new(target),
    }
}

/// Round off convex corners by growing, freezing and shrinking back
#[must_use]
pub fn smooth_outer(how_much: f64, target: ImplicitNode) -> ImplicitNode {
    modulate(-how_much, freeze(modulate(how_much, target)))
}

/// Round off concave corners by shrinking, freezing and growing back
#[must_use]
pub fn smooth_inner(how_much: f64, target: ImplicitNode) -> ImplicitNode {
    modulate(how_much, freeze(modulate(-how_much, target)))
}
