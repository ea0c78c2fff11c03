//! Subcommand implementations.
//!
//! Each command returns data; printing and exit codes belong to `main`.

use anyhow::{Context, Result};
use implicit_diagnostics::{classify_diagnostics, ErrorBundle};
use implicit_live::{
    AppConfig, ApplicationState, CompilationService, PipelineController, PipelineStage,
    RenderConfig, ScriptCompiler, SubmissionReport,
};
use implicit_sandbox::{AmbientDeclarations, ContextPool, ModuleExecutor, SandboxResponse};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default poll interval of `watch`
pub const DEFAULT_POLL: Duration = Duration::from_millis(250);

/// Resolve configuration from an optional file and flag overrides
///
/// # Errors
/// Fails if the file cannot be read or the result does not validate.
pub fn load_config(path: Option<&Path>, endpoint: Option<&str>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(endpoint) = endpoint {
        let render = RenderConfig {
            endpoint: endpoint.to_string(),
            ..config.render.clone()
        };
        config = config.with_render(render);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Read a script file
///
/// # Errors
/// Fails if the file cannot be read.
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Result of `run`
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: SubmissionReport,
    pub state: ApplicationState,
}

impl RunOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.report.stage == PipelineStage::Ready
    }
}

/// One submission through the full pipeline
///
/// # Errors
/// Fails on configuration problems or pipeline infrastructure errors.
pub async fn run(config: &AppConfig, source: &str) -> Result<RunOutput> {
    let pipeline = PipelineController::from_config(config)?;
    let report = pipeline.submit(source).await?;
    info!(seq = report.seq, stage = ?report.stage, "submission finished");

    Ok(RunOutput {
        report,
        state: ApplicationState::clone(&pipeline.store().current()),
    })
}

/// Result of `check`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutput {
    /// Compilation reported problems; nothing ran
    Diagnostics(ErrorBundle),
    /// The module ran; exports or a runtime error
    Executed(SandboxResponse),
}

impl CheckOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Executed(SandboxResponse::Ok { .. }))
    }
}

/// Compile and execute without rendering
///
/// # Errors
/// Fails on configuration problems or when the sandbox itself breaks.
pub async fn check(config: &AppConfig, source: &str) -> Result<CheckOutput> {
    let compiler = ScriptCompiler::new(config.compiler.clone(), AmbientDeclarations::implicit())?;
    let compilation = compiler.compile(source).await?;

    if compilation.has_diagnostics() {
        return Ok(CheckOutput::Diagnostics(ErrorBundle::compile(
            classify_diagnostics(source, &compilation.syntax),
            classify_diagnostics(source, &compilation.semantic),
        )));
    }

    let pool = ContextPool::new(config.sandbox.clone());
    let result = pool.execute(&compilation.emitted).await;
    pool.shutdown();

    Ok(CheckOutput::Executed(result?.into()))
}

/// Poll `path` and submit every change until ctrl-c
///
/// # Errors
/// Fails on configuration problems or if the file disappears at start.
pub async fn watch(config: &AppConfig, path: PathBuf, poll: Duration) -> Result<()> {
    let pipeline = Arc::new(PipelineController::from_config(config)?);
    let mut notifications = pipeline.store().subscribe();
    let mut ticker = tokio::time::interval(poll);
    let mut last: Option<String> = None;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    read_source(&path)?;
    info!(path = %path.display(), "watching");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let source = match read_source(&path) {
                    Ok(source) => source,
                    Err(e) => {
                        warn!(error = %e, "skipping poll");
                        continue;
                    }
                };
                if last.as_deref() == Some(source.as_str()) {
                    continue;
                }
                last = Some(source.clone());

                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    match pipeline.submit(&source).await {
                        Ok(report) => debug!(seq = report.seq, stage = ?report.stage, "submitted"),
                        Err(e) => warn!(error = %e, "submission failed"),
                    }
                });
            }
            received = notifications.recv() => {
                match received {
                    Ok(state) => log_state(&state),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "notifications lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }

    Ok(())
}

fn log_state(state: &ApplicationState) {
    match state.output.errors() {
        None => info!(figures = state.prev_ok.len(), "rendered"),
        Some(errors) if errors.is_empty() => debug!("working"),
        Some(errors) => {
            for (kind, record) in errors.iter() {
                warn!(?kind, line = record.line, col = record.col, "{}", record.message);
            }
        }
    }
}
