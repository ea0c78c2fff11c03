//! Implicit Diagnostics - one error shape for every failure a user can fix
//!
//! Failures reach the editor from four places:
//! - syntax diagnostics from the compiler
//! - semantic diagnostics from the compiler
//! - runtime failures from the execution sandbox
//! - rejected render requests
//!
//! All of them normalize to an [`ErrorRecord`] (`message`, 1-based `line`
//! and `col`, or `0/0` when no position is known) and are grouped by
//! category into an [`ErrorBundle`].
//!
//! Classification is pure and total: it never fails and classifying the same
//! input twice yields the same record.

#![warn(unreachable_pub)]

pub mod classify;
pub mod diagnostic;
pub mod line_index;
pub mod record;

pub use classify::{
    classify_diagnostic, classify_diagnostics, classify_stack_trace, StackTraceClass,
};
pub use diagnostic::{Diagnostic, DiagnosticMessage};
pub use line_index::LineIndex;
pub use record::{ErrorBundle, ErrorKind, ErrorRecord};
