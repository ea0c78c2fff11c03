//! Execution contexts
//!
//! Each context is a dedicated OS thread owning one engine. Callers reach
//! it only through a job channel; results come back over a oneshot.

use crate::config::SandboxConfig;
use crate::engine::{build_engine, evaluate};
use crate::error::SandboxError;
use crate::protocol::{Outcome, SandboxRequest};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use ulid::Ulid;

/// Unique context identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub Ulid);

impl ContextId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Work sent to a context
#[derive(Debug)]
struct Job {
    request: SandboxRequest,
    reply: oneshot::Sender<Outcome>,
}

/// Handle to a running context
///
/// Dropping the handle closes the job channel and the thread exits once
/// its current job, if any, finishes.
#[derive(Debug)]
pub struct ExecutionContext {
    id: ContextId,
    sender: mpsc::Sender<Job>,
    cancel: Arc<AtomicBool>,
    served: usize,
}

impl ExecutionContext {
    /// Start a context thread
    ///
    /// # Errors
    /// `SandboxError::Spawn` if the thread cannot be created.
    pub fn spawn(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let id = ContextId::new();
        let (sender, receiver) = mpsc::channel(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let config = config.clone();
        let engine_cancel = Arc::clone(&cancel);
        std::thread::Builder::new()
            .name(format!("sandbox-{id}"))
            .spawn(move || context_loop(id, &config, engine_cancel, receiver))
            .map_err(|e| SandboxError::Spawn(e.to_string()))?;

        Ok(Self {
            id,
            sender,
            cancel,
            served: 0,
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Jobs answered so far
    #[inline]
    #[must_use]
    pub fn served(&self) -> usize {
        self.served
    }

    /// Run code and wait for its outcome
    ///
    /// # Errors
    /// `SandboxError::ContextLost` if the thread is gone.
    pub async fn run(&mut self, code: &str) -> Result<Outcome, SandboxError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Job {
                request: SandboxRequest::from(code),
                reply,
            })
            .await
            .map_err(|_| SandboxError::ContextLost(self.id))?;

        let outcome = response
            .await
            .map_err(|_| SandboxError::ContextLost(self.id))?;
        self.served += 1;
        Ok(outcome)
    }

    /// Abort whatever the context is running
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn context_loop(
    id: ContextId,
    config: &SandboxConfig,
    cancel: Arc<AtomicBool>,
    mut receiver: mpsc::Receiver<Job>,
) {
    let engine = build_engine(config, cancel);
    tracing::debug!(context = %id, "execution context started");

    while let Some(job) = receiver.blocking_recv() {
        let outcome = evaluate(&engine, job.request.code());
        if job.reply.send(outcome).is_err() {
            tracing::debug!(context = %id, "caller stopped waiting, outcome dropped");
        }
    }

    tracing::debug!(context = %id, "execution context stopped");
}
