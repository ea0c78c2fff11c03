//! Context pool for sandboxed execution
//!
//! Provides context reuse and bounded concurrency:
//! - Context acquisition (reuse an idle one or spawn)
//! - At most `max_contexts` executions at once; further requests wait
//! - Contexts that time out or fail are discarded, never reused
//! - Pool statistics and monitoring

use crate::config::SandboxConfig;
use crate::context::{ContextId, ExecutionContext};
use crate::error::SandboxError;
use crate::protocol::{Outcome, SandboxResult};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Runs emitted code and reports its exports or a positioned error
#[async_trait]
pub trait ModuleExecutor: Send + Sync {
    /// Execute `code` in an isolated context
    ///
    /// # Errors
    /// Failures that carry no user-facing record (see [`SandboxError`]).
    async fn execute(&self, code: &str) -> Result<SandboxResult, SandboxError>;
}

/// A result together with the context that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub context: ContextId,
    pub result: SandboxResult,
}

/// Pool statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStats {
    /// Total contexts spawned
    pub total_created: usize,
    /// Acquisitions served by an idle context
    pub reused: usize,
    /// Executions that produced an outcome
    pub executions: usize,
    /// Contexts dropped after a timeout or failure
    pub discarded: usize,
    /// Currently executing contexts
    pub active_count: usize,
    /// Idle contexts held for reuse
    pub idle_count: usize,
}

impl PoolStats {
    /// Share of acquisitions that reused a context
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reuse_rate(&self) -> f64 {
        let acquisitions = self.total_created + self.reused;
        if acquisitions == 0 {
            0.0
        } else {
            self.reused as f64 / acquisitions as f64
        }
    }
}

/// Context pool
#[derive(Debug)]
pub struct ContextPool {
    config: SandboxConfig,
    /// Idle contexts (LIFO)
    idle: Mutex<Vec<ExecutionContext>>,
    /// Executing contexts and when they started
    active: DashMap<ContextId, Instant>,
    /// Admission; waiters queue here
    permits: Semaphore,
    stats: Mutex<PoolStats>,
}

impl ContextPool {
    /// Create new context pool
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        let permits = Semaphore::new(config.max_contexts.max(1));
        Self {
            config,
            idle: Mutex::new(Vec::new()),
            active: DashMap::new(),
            permits,
            stats: Mutex::new(PoolStats::default()),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Execute and report which context ran the code
    ///
    /// # Errors
    /// - `SandboxError::Timeout` if no response arrives in time
    /// - `SandboxError::Unclassified` if the failure has no source position
    /// - `SandboxError::Closed` after [`shutdown`](Self::shutdown)
    /// - `SandboxError::ContextLost` / `SandboxError::Spawn` on infrastructure failure
    pub async fn execute_traced(&self, code: &str) -> Result<Execution, SandboxError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SandboxError::Closed)?;

        let mut lease = Lease::new(self, self.acquire()?);
        let id = lease.id;
        let started = Instant::now();

        let waited = tokio::time::timeout(self.config.timeout(), lease.run(code)).await;
        match waited {
            Ok(Ok(outcome)) => {
                tracing::debug!(context = %id, elapsed = ?started.elapsed(), "execution finished");
                lease.release();
                let result = outcome.into_result()?;
                Ok(Execution {
                    context: id,
                    result,
                })
            }
            Ok(Err(err)) => {
                tracing::warn!(context = %id, error = %err, "execution context failed");
                lease.discard();
                Err(err)
            }
            Err(_) => {
                tracing::warn!(context = %id, timeout_ms = self.config.timeout_ms, "execution timed out, discarding context");
                lease.discard();
                Err(SandboxError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                })
            }
        }
    }

    /// Stop admitting work and drop idle contexts
    ///
    /// Executions already running finish; their contexts are not kept.
    pub fn shutdown(&self) {
        self.permits.close();
        let mut idle = self.idle.lock();
        idle.clear();
        self.stats.lock().idle_count = 0;
        tracing::debug!("sandbox pool shut down");
    }

    /// Get pool statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    /// Get active context count
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Acquire a context (reuse or spawn)
    fn acquire(&self) -> Result<ExecutionContext, SandboxError> {
        let reused = self.idle.lock().pop();

        let context = match reused {
            Some(context) => {
                self.stats.lock().reused += 1;
                context
            }
            None => {
                let context = ExecutionContext::spawn(&self.config)?;
                tracing::debug!(context = %context.id(), "spawned execution context");
                self.stats.lock().total_created += 1;
                context
            }
        };

        self.active.insert(context.id(), Instant::now());
        self.refresh_counts();
        Ok(context)
    }

    /// Release a context back to the pool
    fn release(&self, context: ExecutionContext) {
        self.active.remove(&context.id());
        {
            let mut idle = self.idle.lock();
            if !self.permits.is_closed() && idle.len() < self.config.max_idle {
                idle.push(context);
            }
            // Else: drop context, its thread exits
        }
        self.stats.lock().executions += 1;
        self.refresh_counts();
    }

    fn discard(&self, context: ExecutionContext) {
        context.cancel();
        self.active.remove(&context.id());
        self.stats.lock().discarded += 1;
        self.refresh_counts();
    }

    fn refresh_counts(&self) {
        let idle = self.idle.lock().len();
        let mut stats = self.stats.lock();
        stats.idle_count = idle;
        stats.active_count = self.active.len();
    }
}

/// A context checked out of the pool
///
/// A lease dropped before it is released (the caller's future was dropped
/// mid-execution) discards its context.
struct Lease<'a> {
    pool: &'a ContextPool,
    id: ContextId,
    context: Option<ExecutionContext>,
}

impl<'a> Lease<'a> {
    fn new(pool: &'a ContextPool, context: ExecutionContext) -> Self {
        Self {
            pool,
            id: context.id(),
            context: Some(context),
        }
    }

    async fn run(&mut self, code: &str) -> Result<Outcome, SandboxError> {
        match self.context.as_mut() {
            Some(context) => context.run(code).await,
            None => Err(SandboxError::ContextLost(self.id)),
        }
    }

    fn release(mut self) {
        if let Some(context) = self.context.take() {
            self.pool.release(context);
        }
    }

    fn discard(mut self) {
        if let Some(context) = self.context.take() {
            self.pool.discard(context);
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            tracing::debug!(context = %self.id, "execution abandoned, discarding context");
            self.pool.discard(context);
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

#[async_trait]
impl ModuleExecutor for ContextPool {
    async fn execute(&self, code: &str) -> Result<SandboxResult, SandboxError> {
        self.execute_traced(code).await.map(|execution| execution.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const CIRCLE: &str = "import \"implicit\" as i;\ni::circle(0, 0, 10)";

    #[tokio::test]
    async fn context_pool_reuse() {
        let pool = ContextPool::new(SandboxConfig::default());

        let first = pool.execute_traced(CIRCLE).await.unwrap();
        let second = pool.execute_traced(CIRCLE).await.unwrap();

        assert_eq!(first.context, second.context);
        assert!(first.result.is_ok());
    }

    #[tokio::test]
    async fn context_pool_stats() {
        let pool = ContextPool::new(SandboxConfig::default());

        pool.execute(CIRCLE).await.unwrap();
        pool.execute(CIRCLE).await.unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.executions, 2);
        assert_eq!(stats.active_count, 0);
        assert_eq!(stats.idle_count, 1);
        assert!((stats.reuse_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn idle_contexts_are_capped() {
        let pool = ContextPool::new(SandboxConfig::default().with_max_idle(0));

        let first = pool.execute_traced(CIRCLE).await.unwrap();
        let second = pool.execute_traced(CIRCLE).await.unwrap();

        assert_ne!(first.context, second.context);
        assert_eq!(pool.stats().idle_count, 0);
    }

    #[tokio::test]
    async fn timed_out_context_is_discarded() {
        let config = SandboxConfig::default()
            .with_timeout(Duration::from_millis(50))
            .with_max_operations(0);
        let pool = ContextPool::new(config);

        let result = pool.execute("loop {}").await;
        assert!(matches!(result, Err(SandboxError::Timeout { timeout_ms: 50 })));

        let stats = pool.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.idle_count, 0);

        // A fresh context serves the next request
        let next = pool.execute("1 + 1").await.unwrap();
        assert!(next.is_ok());
        assert_eq!(pool.stats().total_created, 2);
    }

    #[tokio::test]
    async fn abandoned_execution_is_not_left_active() {
        let config = SandboxConfig::default()
            .with_timeout(Duration::from_secs(30))
            .with_max_operations(0);
        let pool = ContextPool::new(config);

        let abandoned = tokio::time::timeout(Duration::from_millis(50), pool.execute("loop {}")).await;
        assert!(abandoned.is_err());

        assert_eq!(pool.active_count(), 0);
        let stats = pool.stats();
        assert_eq!(stats.active_count, 0);
        assert_eq!(stats.discarded, 1);

        // The permit came back with the lease
        assert!(pool.execute("1 + 1").await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_work() {
        let pool = ContextPool::new(SandboxConfig::default());
        pool.execute(CIRCLE).await.unwrap();

        pool.shutdown();

        assert!(matches!(pool.execute(CIRCLE).await, Err(SandboxError::Closed)));
        assert_eq!(pool.stats().idle_count, 0);
    }
}
