//! Implicit Live - edit a scene script, see it rendered
//!
//! Every edit is a submission that travels through:
//! - **Compile**: [`CompilationService`] produces emitted code and diagnostics
//! - **Execute**: a [`ModuleExecutor`](implicit_sandbox::ModuleExecutor) runs the code in an isolated context
//! - **Render**: a [`SceneRenderer`] turns the exported scene into figures
//! - **Publish**: the [`StateStore`] records each step as a new immutable snapshot
//!
//! The [`PipelineController`] orchestrates these steps. A failure at any stage
//! is published as an error bundle and ends that submission only; the last
//! successful figures stay available as `prev_ok`.
//!
//! # Example
//!
//! ```rust,ignore
//! use implicit_live::{AppConfig, PipelineController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PipelineController::from_config(&AppConfig::default())?;
//! let report = pipeline
//!     .submit("import \"implicit\" as i;\ni::circle(0, 0, 10)")
//!     .await?;
//! println!("{:?}", report.stage);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod stage;
pub mod store;

pub use compiler::{Compilation, CompilationService, ScriptCompiler};
pub use config::{AppConfig, CompilerOptions, PipelineConfig, RenderConfig, StoreConfig};
pub use error::{CompileError, ConfigError, PipelineError, RenderFailure};
pub use pipeline::{PipelineController, SubmissionReport, MISSING_DEFAULT_EXPORT};
pub use render::{parse_render_body, HttpRenderClient, SceneRenderer, PROCESS_PATH};
pub use stage::{BlockReason, PipelineStage};
pub use store::{ApplicationState, DebugInfo, Output, StateStore, Transition, DEFAULT_SOURCE};
