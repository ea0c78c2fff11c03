//! Scene assembly: shapes, figures and scenes

use crate::node::ImplicitNode;
use serde::{Deserialize, Serialize};

/// Unit used when a scene does not name one
pub const DEFAULT_UNIT: &str = "px";

/// RGB color, serialized as `[r, g, b]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Self = Self(0, 0, 0);
}

/// Stroke style for outlined shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
}

/// How a shape is drawn: `"filled"` or `{"line": "solid"}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    #[default]
    Filled,
    Line(LineStyle),
}

/// An implicit tree with its presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub implicit: ImplicitNode,
    pub color: Color,
    pub draw_mode: DrawMode,
}

/// A group of shapes rendered into one output figure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub shapes: Vec<Shape>,
}

/// Everything a single render request draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub figures: Vec<Figure>,
    pub unit: String,
    pub simplify: bool,
}

/// Partial shape options; missing fields keep their defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeOptions {
    pub color: Option<Color>,
    pub draw_mode: Option<DrawMode>,
}

impl ShapeOptions {
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = Some(draw_mode);
        self
    }
}

/// Partial scene options; missing fields keep their defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    pub unit: Option<String>,
    pub simplify: Option<bool>,
}

impl SceneOptions {
    #[inline]
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = Some(simplify);
        self
    }
}

/// Wrap a tree into a shape, black and filled unless `opts` says otherwise
#[must_use]
pub fn shape(implicit: ImplicitNode, opts: Option<ShapeOptions>) -> Shape {
    let opts = opts.unwrap_or_default();
    Shape {
        implicit,
        color: opts.color.unwrap_or(Color::BLACK),
        draw_mode: opts.draw_mode.unwrap_or_default(),
    }
}

#[must_use]
pub fn figure(shapes: impl IntoIterator<Item = Shape>) -> Figure {
    Figure {
        shapes: shapes.into_iter().collect(),
    }
}

/// Assemble a scene, in pixels with simplification on unless `opts` says otherwise
#[must_use]
pub fn scene(figures: impl IntoIterator<Item = Figure>, opts: Option<SceneOptions>) -> Scene {
    let opts = opts.unwrap_or_default();
    Scene {
        figures: figures.into_iter().collect(),
        unit: opts.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        simplify: opts.simplify.unwrap_or(true),
    }
}

/// One figure holding one default shape
#[must_use]
pub fn singleton_scene(implicit: ImplicitNode) -> Scene {
    scene([figure([shape(implicit, None)])], None)
}
