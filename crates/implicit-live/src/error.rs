//! Error types for the live pipeline
//!
//! Anything a user can fix in their source is published as an
//! [`ErrorBundle`](implicit_diagnostics::ErrorBundle), not returned here.
//! These enums cover configuration, I/O and protocol bugs.

use crate::stage::PipelineStage;
use implicit_diagnostics::ErrorRecord;
use implicit_sandbox::SandboxError;

/// Compilation service errors
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Compiler options name a target this compiler cannot emit
    #[error("unsupported compile target '{0}', only 'rhai' is available")]
    UnsupportedTarget(String),

    /// Compiler worker failed before producing diagnostics
    #[error("compiler worker failed: {0}")]
    Worker(String),
}

/// Render client failures
#[derive(Debug, thiserror::Error)]
pub enum RenderFailure {
    /// Endpoint unreachable or answered with a non-success status
    #[error("render rejected: {}", .0.message)]
    Rejected(ErrorRecord),

    /// Success status with a body that is not a render result
    #[error("render protocol mismatch: {reason}")]
    Protocol {
        /// Parse failure description
        reason: String,
        /// Body as received
        body: String,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`AppConfig`](crate::config::AppConfig)
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but make no sense together
    #[error("invalid config: {0}")]
    Invalid(String),

    /// HTTP client could not be built
    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

/// Pipeline errors
///
/// Returned from [`submit`](crate::pipeline::PipelineController::submit) only
/// when the pipeline itself is broken; the next submission may still succeed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Compilation service failed
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// Sandbox infrastructure failed
    #[error("sandbox failed: {0}")]
    Sandbox(#[from] SandboxError),

    /// Render endpoint spoke an unexpected protocol
    #[error("render protocol mismatch: {reason}")]
    Protocol { reason: String },

    /// Stage machine bug
    #[error("illegal stage transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: PipelineStage,
        to: PipelineStage,
    },
}
