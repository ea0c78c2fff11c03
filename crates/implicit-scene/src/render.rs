//! Render endpoint request and response bodies

use serde::{Deserialize, Serialize};

/// Body of `POST /api/process`
///
/// `scene` is whatever the script exported as its default value; it is
/// forwarded untouched so the renderer is the one judging its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub source: String,
    pub scene: serde_json::Value,
}

impl RenderRequest {
    #[inline]
    #[must_use]
    pub fn new(source: impl Into<String>, scene: serde_json::Value) -> Self {
        Self {
            source: source.into(),
            scene,
        }
    }
}

/// One drawable figure returned by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFigure {
    pub svg: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Successful render response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    pub figures: Vec<RenderedFigure>,
    /// Profiling data from the renderer; opaque to this side
    #[serde(default)]
    pub perf: serde_json::Value,
}
