//! Pipeline scenarios over the real compiler and sandbox.
//!
//! Tenet: every stage failure is published as an error bundle, ends that
//! submission only, and never clears the last good figures.

use implicit_diagnostics::{Diagnostic, ErrorRecord};
use implicit_live::{BlockReason, Output, PipelineConfig, PipelineStage};
use implicit_test_utils::{
    figure, pipeline_with, setup_pipeline, EchoExecutor, FakeCompiler, RecordingRenderer,
    RenderReply, CIRCLE_SOURCE, SYNTAX_ERROR_SOURCE, THROWING_SOURCE,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn circle_scene_is_sent_to_the_renderer() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());

    let report = pipeline.submit(CIRCLE_SOURCE).await.unwrap();

    assert_eq!(report.stage, PipelineStage::Ready);
    let requests = renderer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        serde_json::to_value(&requests[0]).unwrap(),
        json!({
            "source": CIRCLE_SOURCE,
            "scene": {"kind": "circle", "x": 0.0, "y": 0.0, "r": 10.0}
        })
    );

    let state = pipeline.store().current();
    assert_eq!(state.output, Output::Ok { figures: vec![figure("ok")] });
    assert_eq!(state.prev_ok, vec![figure("ok")]);
    assert_eq!(state.debug.as_ref().unwrap().emitted, CIRCLE_SOURCE);
}

#[tokio::test]
async fn syntax_diagnostic_is_classified_and_render_skipped() {
    let source = "let s = \"abc;";
    let compiler = FakeCompiler::new().with_syntax(
        source,
        vec![Diagnostic::new(5, 3, "Unterminated string literal.")],
    );
    let executor = Arc::new(EchoExecutor::new());
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = pipeline_with(
        Arc::new(compiler),
        executor.clone(),
        renderer.clone(),
        PipelineConfig::default(),
    );

    let report = pipeline.submit(source).await.unwrap();

    assert_eq!(report.stage, PipelineStage::Blocked(BlockReason::Diagnostics));
    assert_eq!(executor.calls(), 0);
    assert_eq!(renderer.calls(), 0);
    let errors = pipeline.store().current().output.errors().cloned().unwrap();
    assert_eq!(
        errors.syntax,
        vec![ErrorRecord::new("Unterminated string literal.", 1, 6)]
    );
}

#[tokio::test]
async fn real_parse_errors_abort_before_rendering() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());

    let report = pipeline.submit(SYNTAX_ERROR_SOURCE).await.unwrap();

    assert_eq!(report.stage, PipelineStage::Blocked(BlockReason::Diagnostics));
    assert_eq!(renderer.calls(), 0);
    let errors = pipeline.store().current().output.errors().cloned().unwrap();
    assert_eq!(errors.syntax.len(), 1);
    assert_eq!(errors.syntax[0].line, 1);
}

#[tokio::test]
async fn runtime_throw_is_published_with_its_position() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());

    let report = pipeline.submit(THROWING_SOURCE).await.unwrap();

    assert_eq!(report.stage, PipelineStage::Blocked(BlockReason::Runtime));
    assert_eq!(renderer.calls(), 0);
    let errors = pipeline.store().current().output.errors().cloned().unwrap();
    assert_eq!(
        errors.runtime,
        vec![ErrorRecord::new("radius must be positive", 3, 10)]
    );
}

#[tokio::test]
async fn rejected_render_keeps_previous_figures() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());
    pipeline.submit(CIRCLE_SOURCE).await.unwrap();

    renderer.set_reply(RenderReply::Reject("out of memory".into()));
    let report = pipeline.submit(CIRCLE_SOURCE).await.unwrap();

    assert_eq!(report.stage, PipelineStage::Blocked(BlockReason::Render));
    let state = pipeline.store().current();
    assert_eq!(
        state.output.errors().unwrap().runtime,
        vec![ErrorRecord::unpositioned("out of memory")]
    );
    assert_eq!(state.prev_ok, vec![figure("ok")]);
}

#[tokio::test]
async fn foreign_import_is_a_semantic_error() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());

    let report = pipeline.submit("import \"fs\" as fs;\n1").await.unwrap();

    assert_eq!(report.stage, PipelineStage::Blocked(BlockReason::Diagnostics));
    assert_eq!(renderer.calls(), 0);
    let errors = pipeline.store().current().output.errors().cloned().unwrap();
    assert_eq!(
        errors.semantic,
        vec![ErrorRecord::new(
            "Cannot find module 'fs'. Only the 'implicit' module can be imported.",
            1,
            8
        )]
    );
}

#[tokio::test]
async fn failed_submission_does_not_block_the_next() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());

    pipeline.submit(THROWING_SOURCE).await.unwrap();
    let report = pipeline.submit(CIRCLE_SOURCE).await.unwrap();

    assert_eq!(report.stage, PipelineStage::Ready);
    assert!(pipeline.store().current().output.is_ok());
}

#[tokio::test]
async fn every_submission_extends_history() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer, PipelineConfig::default());

    pipeline.submit(CIRCLE_SOURCE).await.unwrap();
    let after_first = pipeline.store().history_len();
    pipeline.submit(CIRCLE_SOURCE).await.unwrap();

    assert!(after_first > 0);
    assert_eq!(pipeline.store().history_len(), after_first * 2);
}

#[tokio::test]
async fn commented_out_import_does_not_block_rendering() {
    let renderer = Arc::new(RecordingRenderer::succeeding());
    let pipeline = setup_pipeline(renderer.clone(), PipelineConfig::default());

    let report = pipeline
        .submit("// import \"fs\" as fs;\nimport \"implicit\" as i;\ni::circle(0, 0, 10)")
        .await
        .unwrap();

    assert_eq!(report.stage, PipelineStage::Ready);
    assert_eq!(renderer.calls(), 1);
}
