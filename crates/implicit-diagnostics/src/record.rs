//! Normalized error records and their per-category bundle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Parse failure reported by the compiler
    Syntax,
    /// Type or name-resolution failure reported by the compiler
    Semantic,
    /// Failure while executing emitted code
    Runtime,
    /// Render endpoint rejected the request or was unreachable
    Network,
}

impl ErrorKind {
    /// Whether errors of this kind are known before any code runs
    #[inline]
    #[must_use]
    pub fn is_compile_time(&self) -> bool {
        matches!(self, Self::Syntax | Self::Semantic)
    }
}

/// An error ready for display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    /// 1-based, 0 when unknown
    pub line: usize,
    /// 1-based, 0 when unknown
    pub col: usize,
}

impl ErrorRecord {
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            message: message.into(),
            line,
            col,
        }
    }

    /// Record without a source position (e.g. a rejected render request)
    #[inline]
    #[must_use]
    pub fn unpositioned(message: impl Into<String>) -> Self {
        Self::new(message, 0, 0)
    }

    /// Whether the record points into the source
    #[inline]
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_position() {
            write!(f, "{}:{}: {}", self.line, self.col, self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Errors grouped by category
///
/// Network failures land in `runtime`, alongside sandbox failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBundle {
    pub syntax: Vec<ErrorRecord>,
    pub semantic: Vec<ErrorRecord>,
    pub runtime: Vec<ErrorRecord>,
}

impl ErrorBundle {
    /// Empty bundle (the "clear slate")
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bundle of compiler findings
    #[inline]
    #[must_use]
    pub fn compile(syntax: Vec<ErrorRecord>, semantic: Vec<ErrorRecord>) -> Self {
        Self {
            syntax,
            semantic,
            runtime: Vec::new(),
        }
    }

    /// Bundle holding a single runtime or network record
    #[inline]
    #[must_use]
    pub fn runtime(record: ErrorRecord) -> Self {
        Self {
            runtime: vec![record],
            ..Self::default()
        }
    }

    /// Add a record under its kind's category
    pub fn push(&mut self, kind: ErrorKind, record: ErrorRecord) {
        match kind {
            ErrorKind::Syntax => self.syntax.push(record),
            ErrorKind::Semantic => self.semantic.push(record),
            ErrorKind::Runtime | ErrorKind::Network => self.runtime.push(record),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.syntax.len() + self.semantic.len() + self.runtime.len()
    }

    /// Iterate records with the category they were filed under
    pub fn iter(&self) -> impl Iterator<Item = (ErrorKind, &ErrorRecord)> {
        self.syntax
            .iter()
            .map(|r| (ErrorKind::Syntax, r))
            .chain(self.semantic.iter().map(|r| (ErrorKind::Semantic, r)))
            .chain(self.runtime.iter().map(|r| (ErrorKind::Runtime, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle() {
        let bundle = ErrorBundle::empty();
        assert!(bundle.is_empty());
        assert_eq!(bundle.iter().count(), 0);
    }

    #[test]
    fn network_records_file_as_runtime() {
        let mut bundle = ErrorBundle::empty();
        bundle.push(ErrorKind::Network, ErrorRecord::unpositioned("out of memory"));
        bundle.push(ErrorKind::Syntax, ErrorRecord::new("bad", 1, 2));

        assert_eq!(bundle.runtime.len(), 1);
        assert_eq!(bundle.syntax.len(), 1);
        assert_eq!(bundle.total(), 2);

        let kinds: Vec<_> = bundle.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![ErrorKind::Syntax, ErrorKind::Runtime]);
    }

    #[test]
    fn record_display() {
        assert_eq!(ErrorRecord::new("boom", 3, 10).to_string(), "3:10: boom");
        assert_eq!(ErrorRecord::unpositioned("down").to_string(), "down");
    }

    #[test]
    fn compile_time_kinds() {
        assert!(ErrorKind::Syntax.is_compile_time());
        assert!(ErrorKind::Semantic.is_compile_time());
        assert!(!ErrorKind::Runtime.is_compile_time());
        assert!(!ErrorKind::Network.is_compile_time());
    }
}
