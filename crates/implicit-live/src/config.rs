//! Application configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration:
//!
//! ```toml
//! [compiler]
//! target = "rhai"
//! strict_null_checks = true
//!
//! [sandbox]
//! max_contexts = 4
//! timeout_ms = 10000
//!
//! [render]
//! endpoint = "http://localhost:8080"
//!
//! [store]
//! tick_ms = 16
//!
//! [pipeline]
//! fence_stale_results = true
//! ```

use crate::error::ConfigError;
use implicit_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Target accepted by the script compiler
pub const RHAI_TARGET: &str = "rhai";

/// Options handed to the compilation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Output language; only `"rhai"` is supported
    pub target: String,
    /// Report uses of undefined variables as semantic diagnostics
    pub strict_null_checks: bool,
}

impl CompilerOptions {
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_strict_null_checks(mut self, strict: bool) -> Self {
        self.strict_null_checks = strict;
        self
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: RHAI_TARGET.to_string(),
            strict_null_checks: true,
        }
    }
}

/// Render endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Base URL; requests go to `<endpoint>/api/process`
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl RenderConfig {
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// State store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Coalescing window for change notifications
    pub tick_ms: u64,
    /// Buffered notifications per subscriber
    pub notification_capacity: usize,
}

impl StoreConfig {
    #[inline]
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[inline]
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            notification_capacity: 64,
        }
    }
}

/// Pipeline controller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Drop publishes from submissions a newer one has overtaken
    pub fence_stale_results: bool,
}

impl PipelineConfig {
    #[inline]
    #[must_use]
    pub fn with_fencing(mut self, fence: bool) -> Self {
        self.fence_stale_results = fence;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fence_stale_results: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub compiler: CompilerOptions,
    pub sandbox: SandboxConfig,
    pub render: RenderConfig,
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io`, `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    #[inline]
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.sandbox = sandbox;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sandbox.max_contexts == 0 {
            return Err(ConfigError::Invalid("sandbox.max_contexts must be at least 1".into()));
        }
        if self.sandbox.timeout_ms == 0 {
            return Err(ConfigError::Invalid("sandbox.timeout_ms must be at least 1".into()));
        }
        if self.render.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("render.endpoint must not be empty".into()));
        }
        if self.store.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "store.notification_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [sandbox]
            max_contexts = 2

            [render]
            endpoint = "http://render.local:9000"

            [pipeline]
            fence_stale_results = false
            "#,
        )
        .unwrap();

        assert_eq!(config.sandbox.max_contexts, 2);
        assert_eq!(config.sandbox.max_idle, 1);
        assert_eq!(config.render.endpoint, "http://render.local:9000");
        assert_eq!(config.render.timeout_ms, 30_000);
        assert!(!config.pipeline.fence_stale_results);
        assert_eq!(config.store.tick(), Duration::from_millis(16));
        assert_eq!(config.compiler.target, "rhai");
    }

    #[test]
    fn zero_pool_is_rejected() {
        let result = AppConfig::from_toml_str("[sandbox]\nmax_contexts = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let config = AppConfig::new().with_render(RenderConfig::default().with_endpoint(" "));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("[sandbox\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("implicit-live.toml");
        std::fs::write(&path, "[store]\ntick_ms = 5\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.store.tick_ms, 5);
    }
}
