//! Sandbox configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool sizing, response timeout and interpreter ceilings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum contexts executing at once; further requests wait
    pub max_contexts: usize,
    /// Idle contexts kept for reuse
    pub max_idle: usize,
    /// How long to wait for a context's response
    pub timeout_ms: u64,
    /// Interpreter operation budget per execution
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl SandboxConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_max_contexts(mut self, max: usize) -> Self {
        self.max_contexts = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_idle(mut self, max: usize) -> Self {
        self.max_idle = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_operations(mut self, max: u64) -> Self {
        self.max_operations = max;
        self
    }

    /// Response timeout as a `Duration`
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_contexts: 4,
            max_idle: 1,
            timeout_ms: 10_000,
            max_operations: 5_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_function_expr_depth: 32,
            max_string_size: 1 << 20,
            max_array_size: 100_000,
            max_map_size: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SandboxConfig::new();
        assert_eq!(config.max_idle, 1);
        assert_eq!(config.max_contexts, 4);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn builder() {
        let config = SandboxConfig::new()
            .with_max_contexts(2)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.max_contexts, 2);
        assert_eq!(config.timeout_ms, 250);
    }
}
