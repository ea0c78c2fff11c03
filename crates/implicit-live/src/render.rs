//! Render client
//!
//! One `POST <endpoint>/api/process` per scene. Non-success statuses carry a
//! plain-text reason that is shown to the user as-is.

use crate::config::RenderConfig;
use crate::error::{ConfigError, RenderFailure};
use async_trait::async_trait;
use implicit_diagnostics::ErrorRecord;
use implicit_scene::{RenderRequest, RenderResult, RenderedFigure};
use serde::Deserialize;

/// Path of the processing endpoint, relative to the configured base URL
pub const PROCESS_PATH: &str = "/api/process";

/// Turns a scene into drawable figures
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    /// Render one request
    ///
    /// # Errors
    /// - `RenderFailure::Rejected` when the service refused or was unreachable
    /// - `RenderFailure::Protocol` when a success body cannot be parsed
    async fn render(&self, request: &RenderRequest) -> Result<RenderResult, RenderFailure>;
}

/// Success bodies: current servers send `{figures, perf}`, older ones a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RenderBody {
    Full(RenderResult),
    Figures(Vec<RenderedFigure>),
}

impl From<RenderBody> for RenderResult {
    fn from(body: RenderBody) -> Self {
        match body {
            RenderBody::Full(result) => result,
            RenderBody::Figures(figures) => Self {
                figures,
                perf: serde_json::Value::Null,
            },
        }
    }
}

/// Parse a success body
///
/// # Errors
/// `RenderFailure::Protocol` when the body matches neither accepted shape.
pub fn parse_render_body(body: &str) -> Result<RenderResult, RenderFailure> {
    serde_json::from_str::<RenderBody>(body)
        .map(RenderResult::from)
        .map_err(|e| RenderFailure::Protocol {
            reason: e.to_string(),
            body: body.to_string(),
        })
}

/// HTTP render client
#[derive(Debug, Clone)]
pub struct HttpRenderClient {
    client: reqwest::Client,
    url: String,
}

impl HttpRenderClient {
    /// Build a client for the configured endpoint
    ///
    /// # Errors
    /// `ConfigError::HttpClient` if the underlying client cannot be built.
    pub fn new(config: &RenderConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}{PROCESS_PATH}", config.endpoint.trim_end_matches('/')),
        })
    }

    /// Full URL requests are posted to
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SceneRenderer for HttpRenderClient {
    async fn render(&self, request: &RenderRequest) -> Result<RenderResult, RenderFailure> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.url, error = %e, "render request failed");
                RenderFailure::Rejected(ErrorRecord::unpositioned(e.to_string()))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RenderFailure::Rejected(ErrorRecord::unpositioned(e.to_string())))?;

        if !status.is_success() {
            tracing::debug!(%status, "render endpoint rejected scene");
            return Err(RenderFailure::Rejected(ErrorRecord::unpositioned(body)));
        }

        parse_render_body(&body)
    }
}
