//! Messages exchanged with execution contexts
//!
//! A request is the emitted code string itself. Wire format of a response:
//! - `{"status":"ok","exports":{...}}`
//! - `{"status":"err","error":{"line_num":3,"col_num":10,"message":"..."}}`

use crate::error::SandboxError;
use implicit_diagnostics::{classify_stack_trace, ErrorRecord, StackTraceClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name under which a script's trailing value is exported
pub const DEFAULT_EXPORT: &str = "default";

/// Bindings a script left behind, as JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exports(BTreeMap<String, serde_json::Value>);

impl Exports {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.0.insert(name.into(), value);
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// The `default` export, if the script produced one
    #[inline]
    #[must_use]
    pub fn default_export(&self) -> Option<&serde_json::Value> {
        self.get(DEFAULT_EXPORT)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for Exports {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Request message: the code to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SandboxRequest(pub String);

impl SandboxRequest {
    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SandboxRequest {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

/// Result of one execution, as seen by callers of the pool
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxResult {
    Ok { exports: Exports },
    Err { error: ErrorRecord },
}

impl SandboxResult {
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Positioned error as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub line_num: usize,
    pub col_num: usize,
    pub message: String,
}

/// Response message of an execution context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SandboxResponse {
    Ok { exports: Exports },
    Err { error: WireError },
}

impl From<SandboxResult> for SandboxResponse {
    fn from(result: SandboxResult) -> Self {
        match result {
            SandboxResult::Ok { exports } => Self::Ok { exports },
            SandboxResult::Err { error } => Self::Err {
                error: WireError {
                    line_num: error.line,
                    col_num: error.col,
                    message: error.message,
                },
            },
        }
    }
}

impl From<SandboxResponse> for SandboxResult {
    fn from(response: SandboxResponse) -> Self {
        match response {
            SandboxResponse::Ok { exports } => Self::Ok { exports },
            SandboxResponse::Err { error } => Self::Err {
                error: ErrorRecord::new(error.message, error.line_num, error.col_num),
            },
        }
    }
}

/// An uncaught failure inside a context
///
/// `position` is the structured channel; `trace` is the free-text fallback
/// in `<message>\n    at <source>:<line>:<col>` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
    pub position: Option<(usize, usize)>,
    pub trace: String,
}

impl Fault {
    /// Fault with nothing to locate it by
    #[must_use]
    pub fn unpositioned(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            trace: message.clone(),
            message,
            position: None,
        }
    }

    /// Structured position first, trace decoding second
    #[must_use]
    pub fn classify(&self) -> StackTraceClass {
        match self.position {
            Some((line, col)) => {
                StackTraceClass::Classified(ErrorRecord::new(self.message.clone(), line, col))
            }
            None => classify_stack_trace(&self.trace),
        }
    }
}

/// What a context reports, before classification
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Exports),
    Faulted(Fault),
}

impl Outcome {
    /// Translate into a caller-facing result
    ///
    /// # Errors
    /// `SandboxError::Unclassified` when a fault cannot be pinned to the source.
    pub fn into_result(self) -> Result<SandboxResult, SandboxError> {
        match self {
            Self::Completed(exports) => Ok(SandboxResult::Ok { exports }),
            Self::Faulted(fault) => match fault.classify() {
                StackTraceClass::Classified(error) => Ok(SandboxResult::Err { error }),
                StackTraceClass::Unclassified => {
                    tracing::warn!(trace = %fault.trace, "dropping sandbox failure without a source position");
                    Err(SandboxError::Unclassified {
                        message: fault.message,
                    })
                }
            },
        }
    }
}
