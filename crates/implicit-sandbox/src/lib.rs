//! Implicit Sandbox - isolated execution of emitted scene scripts
//!
//! Emitted code runs in an [`ExecutionContext`]: a dedicated thread owning its
//! own script engine, reached only through message passing. The engine can
//! import exactly one module, `implicit`, and has no file, network or process
//! capabilities. The isolation is best-effort (same process heap), not a
//! hard security boundary.
//!
//! A [`ContextPool`] amortizes context creation by keeping idle contexts for
//! reuse, bounds the number of concurrently executing contexts, and
//! translates raw outcomes into [`SandboxResult`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! use implicit_sandbox::{ContextPool, ModuleExecutor, SandboxConfig, SandboxResult};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ContextPool::new(SandboxConfig::default());
//! let result = pool
//!     .execute("import \"implicit\" as i;\ni::circle(0, 0, 10)")
//!     .await?;
//! assert!(matches!(result, SandboxResult::Ok { .. }));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod module;
pub mod pool;
pub mod protocol;

pub use config::SandboxConfig;
pub use context::{ContextId, ExecutionContext};
pub use engine::SOURCE_NAME;
pub use error::SandboxError;
pub use module::{
    AmbientDeclarations, EXPORTED_FUNCTIONS, IMPLICIT_MODULE, MAX_VARIADIC_ARGS, VARIADIC_FUNCTIONS,
};
pub use pool::{ContextPool, Execution, ModuleExecutor, PoolStats};
pub use protocol::{
    Exports, Fault, Outcome, SandboxRequest, SandboxResponse, SandboxResult, WireError,
    DEFAULT_EXPORT,
};
