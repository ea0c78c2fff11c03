//! Per-submission stage machine
//!
//! ```text
//! Idle -> Compiling -> Executing -> Rendering -> Ready
//!            |            |            |
//!            v            v            v
//!         Blocked      Blocked      Blocked
//! ```
//!
//! Any non-terminal stage may also move to `Superseded` when a newer
//! submission makes the remaining work pointless.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Why a submission stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Diagnostics,
    Runtime,
    Render,
}

/// Where a submission is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Compiling,
    Executing,
    Rendering,
    Ready,
    Blocked(BlockReason),
    Superseded,
}

impl PipelineStage {
    /// Whether the submission is finished
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        allowed_transitions(*self).is_empty()
    }
}

/// Validates a stage transition.
///
/// # Errors
/// `PipelineError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: PipelineStage, to: PipelineStage) -> Result<(), PipelineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: PipelineStage) -> Vec<PipelineStage> {
    use PipelineStage::{Blocked, Compiling, Executing, Idle, Ready, Rendering, Superseded};
    match from {
        Idle => vec![Compiling],
        Compiling => vec![Executing, Blocked(BlockReason::Diagnostics), Superseded],
        Executing => vec![Rendering, Blocked(BlockReason::Runtime), Superseded],
        Rendering => vec![Ready, Blocked(BlockReason::Render), Superseded],
        Ready | Blocked(_) | Superseded => vec![],
    }
}

fn allowed(from: PipelineStage, to: PipelineStage) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_allowed() {
        let path = [
            PipelineStage::Idle,
            PipelineStage::Compiling,
            PipelineStage::Executing,
            PipelineStage::Rendering,
            PipelineStage::Ready,
        ];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn each_stage_blocks_with_its_own_reason() {
        assert!(validate_transition(
            PipelineStage::Compiling,
            PipelineStage::Blocked(BlockReason::Diagnostics)
        )
        .is_ok());
        assert!(validate_transition(
            PipelineStage::Compiling,
            PipelineStage::Blocked(BlockReason::Runtime)
        )
        .is_err());
        assert!(validate_transition(
            PipelineStage::Rendering,
            PipelineStage::Blocked(BlockReason::Render)
        )
        .is_ok());
    }

    #[test]
    fn cannot_skip_execution() {
        let result = validate_transition(PipelineStage::Compiling, PipelineStage::Rendering);
        assert!(matches!(
            result,
            Err(PipelineError::IllegalTransition {
                from: PipelineStage::Compiling,
                to: PipelineStage::Rendering,
            })
        ));
    }

    #[test]
    fn terminal_stages() {
        assert!(PipelineStage::Ready.is_terminal());
        assert!(PipelineStage::Superseded.is_terminal());
        assert!(PipelineStage::Blocked(BlockReason::Render).is_terminal());
        assert!(!PipelineStage::Idle.is_terminal());
        assert!(!PipelineStage::Executing.is_terminal());
    }
}
