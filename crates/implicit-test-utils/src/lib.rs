//! Testing utilities for the implicit-live workspace
//!
//! Shared fixtures, fake services and pipeline builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use implicit_diagnostics::{Diagnostic, ErrorRecord};
use implicit_live::{
    AppConfig, Compilation, CompilationService, CompileError, PipelineConfig, PipelineController,
    RenderFailure, SceneRenderer, ScriptCompiler, StateStore,
};
use implicit_sandbox::{
    AmbientDeclarations, ContextPool, Exports, ModuleExecutor, SandboxConfig, SandboxError,
    SandboxResult,
};
use implicit_scene::{RenderRequest, RenderResult, RenderedFigure};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Exports `circle(0, 0, 10)` as its default value
pub const CIRCLE_SOURCE: &str = "import \"implicit\" as i;\ni::circle(0, 0, 10)";

/// Throws at line 3, column 10
pub const THROWING_SOURCE: &str =
    "import \"implicit\" as i;\nlet r = -1;\n         throw \"radius must be positive\";";

/// Fails to parse
pub const SYNTAX_ERROR_SOURCE: &str = "let x = ;";

pub fn figure(svg: &str) -> RenderedFigure {
    RenderedFigure {
        svg: svg.to_string(),
        left: 0.0,
        top: 0.0,
        width: 100.0,
        height: 100.0,
    }
}

/// Compiler answering from a table, clean for anything else
#[derive(Debug, Default)]
pub struct FakeCompiler {
    canned: Mutex<HashMap<String, Compilation>>,
    calls: Mutex<Vec<String>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `diagnostics` as syntax errors for `source`
    pub fn with_syntax(self, source: &str, diagnostics: Vec<Diagnostic>) -> Self {
        self.canned.lock().insert(
            source.to_string(),
            Compilation {
                emitted: source.to_string(),
                syntax: diagnostics,
                semantic: Vec::new(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompilationService for FakeCompiler {
    async fn compile(&self, source: &str) -> Result<Compilation, CompileError> {
        self.calls.lock().push(source.to_string());
        let canned = self.canned.lock().get(source).cloned();
        Ok(canned.unwrap_or_else(|| Compilation::clean(source)))
    }
}

/// Executor exporting the code it was given as the default value
#[derive(Debug, Default)]
pub struct EchoExecutor {
    calls: Mutex<usize>,
}

impl EchoExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ModuleExecutor for EchoExecutor {
    async fn execute(&self, code: &str) -> Result<SandboxResult, SandboxError> {
        *self.calls.lock() += 1;
        let mut exports = Exports::new();
        exports.insert("default", serde_json::Value::String(code.to_string()));
        Ok(SandboxResult::Ok { exports })
    }
}

/// How a fake renderer answers
#[derive(Debug, Clone)]
pub enum RenderReply {
    Figures(Vec<RenderedFigure>),
    /// Non-success status with this body
    Reject(String),
    /// Success status with an unparsable body
    Malformed(String),
}

impl RenderReply {
    fn answer(&self) -> Result<RenderResult, RenderFailure> {
        match self {
            Self::Figures(figures) => Ok(RenderResult {
                figures: figures.clone(),
                perf: serde_json::Value::Null,
            }),
            Self::Reject(body) => Err(RenderFailure::Rejected(ErrorRecord::unpositioned(
                body.clone(),
            ))),
            Self::Malformed(body) => Err(RenderFailure::Protocol {
                reason: "expected a render result".to_string(),
                body: body.clone(),
            }),
        }
    }
}

/// Renderer that records every request and answers with a fixed reply
#[derive(Debug)]
pub struct RecordingRenderer {
    reply: Mutex<RenderReply>,
    requests: Mutex<Vec<RenderRequest>>,
}

impl RecordingRenderer {
    pub fn new(reply: RenderReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with one figure whose svg is `"ok"`
    pub fn succeeding() -> Self {
        Self::new(RenderReply::Figures(vec![figure("ok")]))
    }

    pub fn set_reply(&self, reply: RenderReply) {
        *self.reply.lock() = reply;
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl SceneRenderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderResult, RenderFailure> {
        self.requests.lock().push(request.clone());
        let reply = self.reply.lock().clone();
        reply.answer()
    }
}

/// Renderer that waits a per-source delay, then returns one figure whose
/// svg is the request's source
#[derive(Debug, Default)]
pub struct DelayedRenderer {
    delays: HashMap<String, Duration>,
}

impl DelayedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, source: &str, delay: Duration) -> Self {
        self.delays.insert(source.to_string(), delay);
        self
    }
}

#[async_trait]
impl SceneRenderer for DelayedRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderResult, RenderFailure> {
        if let Some(delay) = self.delays.get(&request.source) {
            tokio::time::sleep(*delay).await;
        }
        Ok(RenderResult {
            figures: vec![figure(&request.source)],
            perf: serde_json::Value::Null,
        })
    }
}

/// Pipeline over the real compiler and sandbox with a fake renderer
pub fn setup_pipeline(
    renderer: Arc<dyn SceneRenderer>,
    pipeline: PipelineConfig,
) -> PipelineController {
    let config = AppConfig::default();
    let compiler = ScriptCompiler::new(config.compiler.clone(), AmbientDeclarations::implicit())
        .expect("default compiler options are valid");
    let executor: Arc<dyn ModuleExecutor> =
        Arc::new(ContextPool::new(SandboxConfig::default().with_max_contexts(4)));

    PipelineController::new(
        Arc::new(compiler),
        executor,
        renderer,
        StateStore::new(&config.store),
        pipeline,
    )
}

/// Pipeline with every service supplied by the caller
pub fn pipeline_with(
    compiler: Arc<dyn CompilationService>,
    executor: Arc<dyn ModuleExecutor>,
    renderer: Arc<dyn SceneRenderer>,
    pipeline: PipelineConfig,
) -> PipelineController {
    PipelineController::new(compiler, executor, renderer, StateStore::default(), pipeline)
}
