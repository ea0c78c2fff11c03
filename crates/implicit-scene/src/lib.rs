//! Implicit Scene - values describing what the renderer should draw
//!
//! A scene is a plain recursive value:
//! - `ImplicitNode` trees built from circles, rectangles and combinators
//! - `Shape`s pairing a tree with a color and draw mode
//! - `Figure`s grouping shapes, and a `Scene` grouping figures
//!
//! Every builder here is a stateless value constructor. The same builders
//! back the `implicit` module that scene scripts import in the sandbox.
//!
//! # Example
//!
//! ```rust
//! use implicit_scene::{circle, singleton_scene, subtract};
//!
//! let ring = subtract(circle(0.0, 0.0, 20.0), circle(0.0, 0.0, 10.0));
//! let scene = singleton_scene(ring);
//! assert_eq!(scene.figures.len(), 1);
//! ```

#![warn(unreachable_pub)]

pub mod node;
pub mod render;
pub mod scene;

pub use node::{
    and, break_here, circle, freeze, modulate, not, or, rect, smooth_inner, smooth_outer,
    subtract, translate, ImplicitNode,
};
pub use render::{RenderRequest, RenderResult, RenderedFigure};
pub use scene::{
    figure, scene, shape, singleton_scene, Color, DrawMode, Figure, LineStyle, Scene,
    SceneOptions, Shape, ShapeOptions, DEFAULT_UNIT,
};
