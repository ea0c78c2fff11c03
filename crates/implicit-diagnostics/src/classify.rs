//! Classification of raw failures into [`ErrorRecord`]s

use crate::diagnostic::Diagnostic;
use crate::line_index::LineIndex;
use crate::record::ErrorRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `at <file>:<line>:<col>`, optionally as `at <name> (<file>:<line>:<col>)`
static FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bat\s+(?:[^\s()]+\s+\()?([^\s()]+?):(\d+):(\d+)\)?").expect("frame pattern")
});

/// Result of decoding a free-text stack trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackTraceClass {
    /// A frame position was found
    Classified(ErrorRecord),
    /// No frame carried a position; the failure cannot be pinned to the source
    Unclassified,
}

impl StackTraceClass {
    #[inline]
    #[must_use]
    pub fn into_record(self) -> Option<ErrorRecord> {
        match self {
            Self::Classified(record) => Some(record),
            Self::Unclassified => None,
        }
    }
}

/// Normalize one diagnostic against `source`
///
/// Prefer [`classify_diagnostics`] for batches; this builds a fresh index.
#[must_use]
pub fn classify_diagnostic(source: &str, diagnostic: &Diagnostic) -> ErrorRecord {
    classify_with(&LineIndex::new(source), diagnostic)
}

/// Normalize a batch of diagnostics sharing one line index
#[must_use]
pub fn classify_diagnostics(source: &str, diagnostics: &[Diagnostic]) -> Vec<ErrorRecord> {
    let index = LineIndex::new(source);
    diagnostics
        .iter()
        .map(|diagnostic| classify_with(&index, diagnostic))
        .collect()
}

fn classify_with(index: &LineIndex<'_>, diagnostic: &Diagnostic) -> ErrorRecord {
    let (line, col) = index.position(diagnostic.offset);
    ErrorRecord::new(diagnostic.innermost_message(), line, col)
}

/// Decode a sandbox stack trace
///
/// The message is the first line that is not a frame. The position comes
/// from the last frame in the trace that carries one.
#[must_use]
pub fn classify_stack_trace(stack: &str) -> StackTraceClass {
    let Some(frame) = FRAME.captures_iter(stack).last() else {
        return StackTraceClass::Unclassified;
    };

    let (Ok(line), Ok(col)) = (frame[2].parse::<usize>(), frame[3].parse::<usize>()) else {
        return StackTraceClass::Unclassified;
    };

    let message = stack
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !FRAME.is_match(l))
        .unwrap_or_default();

    StackTraceClass::Classified(ErrorRecord::new(message, line, col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unterminated_string_on_single_line() {
        let source = "let s = \"abc;";
        let diag = Diagnostic::new(5, 3, "Unterminated string literal.");
        assert_eq!(
            classify_diagnostic(source, &diag),
            ErrorRecord::new("Unterminated string literal.", 1, 6)
        );
    }

    #[test]
    fn batch_matches_single() {
        let source = "a\nbb\nccc";
        let diags = vec![Diagnostic::new(0, 1, "x"), Diagnostic::new(6, 1, "y")];
        let batch = classify_diagnostics(source, &diags);
        let single: Vec<_> = diags.iter().map(|d| classify_diagnostic(source, d)).collect();
        assert_eq!(batch, single);
        assert_eq!(batch[1], ErrorRecord::new("y", 3, 2));
    }

    #[test]
    fn trace_with_plain_frame() {
        let trace = "boom\n    at eval:3:10";
        assert_eq!(
            classify_stack_trace(trace),
            StackTraceClass::Classified(ErrorRecord::new("boom", 3, 10))
        );
    }

    #[test]
    fn trace_prefers_last_frame() {
        let trace = "bad radius\n    at make_ring (eval:7:4)\n    at circle (eval:2:12)";
        let record = classify_stack_trace(trace).into_record().unwrap();
        assert_eq!((record.line, record.col), (2, 12));
        assert_eq!(record.message, "bad radius");
    }

    #[test]
    fn trace_with_url_file() {
        let trace = "TypeError: x is undefined\n    at http://localhost:8080/runworker.js:31:9";
        let record = classify_stack_trace(trace).into_record().unwrap();
        assert_eq!((record.line, record.col), (31, 9));
        assert_eq!(record.message, "TypeError: x is undefined");
    }

    #[test]
    fn trace_without_frames_is_unclassified() {
        assert_eq!(classify_stack_trace("out of stack"), StackTraceClass::Unclassified);
        assert_eq!(classify_stack_trace(""), StackTraceClass::Unclassified);
    }
}
