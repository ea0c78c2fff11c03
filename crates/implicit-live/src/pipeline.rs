//! Pipeline controller
//!
//! Drives one submission through Compile -> Execute -> Render -> Publish,
//! publishing to the [`StateStore`] at every stage. Each stage failure a
//! user can fix is published as an [`ErrorBundle`] and ends that submission
//! only; the controller stays ready for the next one.
//!
//! Submissions are never queued behind each other. With fencing on, every
//! publish first checks that no newer submission has started; a stale
//! submission stops and reports [`PipelineStage::Superseded`].

use crate::compiler::{CompilationService, ScriptCompiler};
use crate::config::{AppConfig, PipelineConfig};
use crate::error::{ConfigError, PipelineError, RenderFailure};
use crate::render::{HttpRenderClient, SceneRenderer};
use crate::stage::{validate_transition, BlockReason, PipelineStage};
use crate::store::{DebugInfo, Output, StateStore, Transition};
use implicit_diagnostics::{classify_diagnostics, ErrorBundle, ErrorRecord};
use implicit_sandbox::{AmbientDeclarations, ContextPool, ModuleExecutor, SandboxError, SandboxResult};
use implicit_scene::RenderRequest;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::Instrument;

/// Runtime message for a script without a trailing scene value
pub const MISSING_DEFAULT_EXPORT: &str = "module has no default export";

/// How a submission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    /// Sequence number, increasing per submission
    pub seq: u64,
    /// Terminal stage reached
    pub stage: PipelineStage,
    /// Whether the submission's final output or errors reached the store
    pub published: bool,
}

/// Orchestrates the pipeline over pluggable services
pub struct PipelineController {
    compiler: Arc<dyn CompilationService>,
    executor: Arc<dyn ModuleExecutor>,
    renderer: Arc<dyn SceneRenderer>,
    store: StateStore,
    config: PipelineConfig,
    latest: AtomicU64,
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("config", &self.config)
            .field("latest", &self.latest)
            .finish_non_exhaustive()
    }
}

impl PipelineController {
    /// Create a controller over the given services
    #[must_use]
    pub fn new(
        compiler: Arc<dyn CompilationService>,
        executor: Arc<dyn ModuleExecutor>,
        renderer: Arc<dyn SceneRenderer>,
        store: StateStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            compiler,
            executor,
            renderer,
            store,
            config,
            latest: AtomicU64::new(0),
        }
    }

    /// Wire up the shipped services from configuration
    ///
    /// # Errors
    /// `ConfigError` if the configuration is invalid or the HTTP client fails.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let compiler = ScriptCompiler::new(config.compiler.clone(), AmbientDeclarations::implicit())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let executor = ContextPool::new(config.sandbox.clone());
        let renderer = HttpRenderClient::new(&config.render)?;
        let store = StateStore::new(&config.store);

        Ok(Self::new(
            Arc::new(compiler),
            Arc::new(executor),
            Arc::new(renderer),
            store,
            config.pipeline.clone(),
        ))
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Sequence number of the newest submission
    #[must_use]
    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Run one submission to its terminal stage
    ///
    /// # Errors
    /// Only for broken collaborators (compiler worker, sandbox infrastructure,
    /// render protocol) or a stage machine bug.
    pub async fn submit(&self, source: &str) -> Result<SubmissionReport, PipelineError> {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let span = tracing::info_span!("submission", seq);
        self.run(seq, source).instrument(span).await
    }

    async fn run(&self, seq: u64, source: &str) -> Result<SubmissionReport, PipelineError> {
        let mut sub = Submission::new(self, seq);

        // Clear the slate so the UI shows recomputation started
        self.store.apply(Transition::Source(source.to_string()));
        self.store.apply_errors(ErrorBundle::empty());

        sub.advance(PipelineStage::Compiling)?;
        let compilation = self.compiler.compile(source).await?;
        if sub.is_stale() {
            return sub.supersede();
        }

        if compilation.has_diagnostics() {
            let bundle = ErrorBundle::compile(
                classify_diagnostics(source, &compilation.syntax),
                classify_diagnostics(source, &compilation.semantic),
            );
            tracing::info!(
                syntax = bundle.syntax.len(),
                semantic = bundle.semantic.len(),
                "compilation reported diagnostics, not executing"
            );
            sub.publish(Transition::Errors(bundle));
            return sub.finish(PipelineStage::Blocked(BlockReason::Diagnostics));
        }

        sub.advance(PipelineStage::Executing)?;
        let executed = self.executor.execute(&compilation.emitted).await;
        if sub.is_stale() {
            return sub.supersede();
        }

        let exports = match executed {
            Ok(SandboxResult::Ok { exports }) => exports,
            Ok(SandboxResult::Err { error }) => {
                tracing::info!(line = error.line, col = error.col, "execution failed");
                sub.publish(Transition::Errors(ErrorBundle::runtime(error)));
                return sub.finish(PipelineStage::Blocked(BlockReason::Runtime));
            }
            Err(SandboxError::Unclassified { message }) => {
                tracing::warn!(%message, "execution failed without a position, no error published");
                return sub.finish(PipelineStage::Blocked(BlockReason::Runtime));
            }
            Err(err) => match err.user_record() {
                Some(record) => {
                    tracing::warn!(error = %err, "execution did not complete");
                    sub.publish(Transition::Errors(ErrorBundle::runtime(record)));
                    return sub.finish(PipelineStage::Blocked(BlockReason::Runtime));
                }
                None => return Err(err.into()),
            },
        };

        let Some(scene) = exports.default_export().cloned() else {
            sub.publish(Transition::Errors(ErrorBundle::runtime(ErrorRecord::unpositioned(
                MISSING_DEFAULT_EXPORT,
            ))));
            return sub.finish(PipelineStage::Blocked(BlockReason::Runtime));
        };

        sub.publish(Transition::Debug(DebugInfo {
            emitted: compilation.emitted.clone(),
            default_export: Some(scene.clone()),
        }));

        sub.advance(PipelineStage::Rendering)?;
        let rendered = self.renderer.render(&RenderRequest::new(source, scene)).await;
        if sub.is_stale() {
            return sub.supersede();
        }

        match rendered {
            Ok(result) => {
                tracing::info!(figures = result.figures.len(), "render complete");
                sub.publish(Transition::Output(Output::Ok {
                    figures: result.figures,
                }));
                // A render without perf data clears the previous render's
                self.store.apply(Transition::Perf(result.perf));
                sub.finish(PipelineStage::Ready)
            }
            Err(RenderFailure::Rejected(record)) => {
                tracing::info!(message = %record.message, "render rejected");
                sub.publish(Transition::Errors(ErrorBundle::runtime(record)));
                sub.finish(PipelineStage::Blocked(BlockReason::Render))
            }
            Err(RenderFailure::Protocol { reason, body }) => {
                tracing::error!(%reason, body_len = body.len(), "render response is not a render result");
                Err(PipelineError::Protocol { reason })
            }
        }
    }
}

/// Progress of one submission
struct Submission<'a> {
    controller: &'a PipelineController,
    seq: u64,
    stage: PipelineStage,
    published: bool,
}

impl<'a> Submission<'a> {
    fn new(controller: &'a PipelineController, seq: u64) -> Self {
        Self {
            controller,
            seq,
            stage: PipelineStage::Idle,
            published: false,
        }
    }

    fn advance(&mut self, to: PipelineStage) -> Result<(), PipelineError> {
        validate_transition(self.stage, to)?;
        tracing::info!(from = ?self.stage, to = ?to, "stage");
        self.stage = to;
        Ok(())
    }

    /// A newer submission started and fencing is on
    fn is_stale(&self) -> bool {
        self.controller.config.fence_stale_results && self.controller.latest_seq() != self.seq
    }

    fn publish(&mut self, transition: Transition) {
        self.controller.store.apply(transition);
        self.published = true;
    }

    fn supersede(mut self) -> Result<SubmissionReport, PipelineError> {
        tracing::warn!(
            latest = self.controller.latest_seq(),
            stage = ?self.stage,
            "newer submission started, dropping stale result"
        );
        self.advance(PipelineStage::Superseded)?;
        Ok(self.report())
    }

    fn finish(mut self, to: PipelineStage) -> Result<SubmissionReport, PipelineError> {
        self.advance(to)?;
        Ok(self.report())
    }

    fn report(&self) -> SubmissionReport {
        SubmissionReport {
            seq: self.seq,
            stage: self.stage,
            published: self.published,
        }
    }
}
