//! Compiler diagnostics

use serde::{Deserialize, Serialize};

/// A compile-time finding at a byte range of the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Byte offset into the source text
    pub offset: usize,
    pub length: usize,
    pub message: DiagnosticMessage,
}

/// Either a message or another diagnostic carrying it
///
/// Chains come from e.g. overload resolution; only the innermost text is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticMessage {
    Text(String),
    Nested(Box<Diagnostic>),
}

impl Diagnostic {
    /// Create diagnostic with a plain message
    #[inline]
    #[must_use]
    pub fn new(offset: usize, length: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            message: DiagnosticMessage::Text(message.into()),
        }
    }

    /// Create diagnostic whose message is carried by `inner`
    #[inline]
    #[must_use]
    pub fn nested(offset: usize, length: usize, inner: Diagnostic) -> Self {
        Self {
            offset,
            length,
            message: DiagnosticMessage::Nested(Box::new(inner)),
        }
    }

    /// Innermost message text, whatever the nesting depth
    #[must_use]
    pub fn innermost_message(&self) -> &str {
        let mut current = self;
        loop {
            match &current.message {
                DiagnosticMessage::Text(text) => return text,
                DiagnosticMessage::Nested(inner) => current = inner,
            }
        }
    }

    /// Number of nested levels above the message text
    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let DiagnosticMessage::Nested(inner) = &current.message {
            depth += 1;
            current = inner;
        }
        depth
    }
}
