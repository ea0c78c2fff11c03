//! Property tests for diagnostic classification.
//!
//! - Positions are the unique 1-based (line, col) for the offset.
//! - Nested messages always resolve to the innermost text.
//! - Classification is pure: the same input always yields the same record.

use implicit_diagnostics::{
    classify_diagnostic, classify_diagnostics, classify_stack_trace, Diagnostic, ErrorRecord,
    StackTraceClass,
};
use proptest::prelude::*;

fn source_and_offset() -> impl Strategy<Value = (String, usize)> {
    "[a-z ;=\\n]{0,80}".prop_flat_map(|source| {
        let len = source.len();
        (Just(source), 0..=len)
    })
}

fn nest(diagnostic: Diagnostic, depth: usize) -> Diagnostic {
    (0..depth).fold(diagnostic, |inner, _| {
        Diagnostic::nested(inner.offset, inner.length, inner)
    })
}

proptest! {
    #[test]
    fn position_counts_line_breaks((source, offset) in source_and_offset(), length in 0usize..8) {
        let record = classify_diagnostic(&source, &Diagnostic::new(offset, length, "msg"));

        let before = &source[..offset];
        let breaks = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);

        prop_assert_eq!(record.line, breaks + 1);
        prop_assert_eq!(record.col, offset - line_start + 1);
        prop_assert_eq!(record.message, "msg");
    }

    #[test]
    fn nested_messages_unwrap_to_innermost(
        (source, offset) in source_and_offset(),
        depth in 0usize..6,
        text in "[A-Za-z .']{1,40}",
    ) {
        let diagnostic = nest(Diagnostic::new(offset, 1, text.clone()), depth);
        let record = classify_diagnostic(&source, &diagnostic);
        prop_assert_eq!(record.message, text);
    }

    #[test]
    fn classification_is_idempotent((source, offset) in source_and_offset(), depth in 0usize..4) {
        let diagnostic = nest(Diagnostic::new(offset, 2, "same"), depth);
        let first = classify_diagnostic(&source, &diagnostic);
        let second = classify_diagnostic(&source, &diagnostic);
        prop_assert_eq!(&first, &second);

        let batch = classify_diagnostics(&source, &[diagnostic.clone(), diagnostic]);
        prop_assert_eq!(&batch[0], &first);
        prop_assert_eq!(&batch[1], &first);
    }

    #[test]
    fn trace_frames_round_trip(line in 1usize..10_000, col in 1usize..500, message in "[a-z ]{1,30}") {
        let message = message.trim().to_string();
        prop_assume!(!message.is_empty() && !message.contains("at "));
        let trace = format!("{message}\n    at eval:{line}:{col}");
        prop_assert_eq!(
            classify_stack_trace(&trace),
            StackTraceClass::Classified(ErrorRecord::new(message, line, col))
        );
    }
}

#[test]
fn scenario_unterminated_string() {
    let source = "let x = \"oops;";
    let diagnostic = Diagnostic::new(5, 3, "Unterminated string literal.");
    assert_eq!(
        classify_diagnostics(source, &[diagnostic]),
        vec![ErrorRecord::new("Unterminated string literal.", 1, 6)]
    );
}

#[test]
fn scenario_runtime_trace() {
    let trace = "radius must be positive\n    at eval:3:10";
    assert_eq!(
        classify_stack_trace(trace),
        StackTraceClass::Classified(ErrorRecord::new("radius must be positive", 3, 10))
    );
}
