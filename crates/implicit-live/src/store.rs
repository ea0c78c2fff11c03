//! Application state store
//!
//! Holds one immutable current snapshot plus the append-only history of the
//! snapshots it replaced. Every transition builds a new snapshot from a copy
//! of the current one; nothing is mutated in place once published.
//!
//! Change notifications are coalesced: the first transition after a quiet
//! period schedules one notification a tick later, and transitions landing
//! before that tick ride along with it. Subscribers always receive the
//! snapshot that is current when the tick fires.

use crate::config::StoreConfig;
use implicit_diagnostics::ErrorBundle;
use implicit_scene::RenderedFigure;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Source shown before the user has typed anything
pub const DEFAULT_SOURCE: &str = "import \"implicit\" as i;\ni::circle(0, 0, 100)";

/// What the output pane shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Output {
    Ok { figures: Vec<RenderedFigure> },
    Err { errors: ErrorBundle },
}

impl Output {
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Errors shown, if any
    #[must_use]
    pub fn errors(&self) -> Option<&ErrorBundle> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { errors } => Some(errors),
        }
    }
}

/// Intermediate values exposed for debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub emitted: String,
    pub default_export: Option<serde_json::Value>,
}

/// Immutable snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationState {
    pub source: String,
    pub output: Output,
    /// Figures of the last successful render
    pub prev_ok: Vec<RenderedFigure>,
    pub debug: Option<DebugInfo>,
    pub perf: Option<serde_json::Value>,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            output: Output::Ok {
                figures: Vec::new(),
            },
            prev_ok: Vec::new(),
            debug: None,
            perf: None,
        }
    }
}

/// A change to the application state
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Source(String),
    Output(Output),
    Errors(ErrorBundle),
    Debug(DebugInfo),
    Perf(serde_json::Value),
}

impl ApplicationState {
    /// Snapshot after `transition`, leaving `self` untouched
    #[must_use]
    pub fn transitioned(&self, transition: Transition) -> Self {
        let mut next = self.clone();
        match transition {
            Transition::Source(source) => next.source = source,
            Transition::Output(output) => {
                if let Output::Ok { figures } = &output {
                    next.prev_ok.clone_from(figures);
                }
                next.output = output;
            }
            Transition::Errors(errors) => next.output = Output::Err { errors },
            Transition::Debug(debug) => next.debug = Some(debug),
            Transition::Perf(perf) => next.perf = (!perf.is_null()).then_some(perf),
        }
        next
    }
}

#[derive(Debug)]
struct Snapshots {
    current: Arc<ApplicationState>,
    history: Vec<Arc<ApplicationState>>,
}

#[derive(Debug)]
struct StoreInner {
    snapshots: Mutex<Snapshots>,
    dirty: AtomicBool,
    notify: broadcast::Sender<Arc<ApplicationState>>,
    sent: AtomicU64,
    tick: Duration,
}

impl StoreInner {
    fn flush(&self) {
        self.dirty.store(false, Ordering::Release);
        let current = Arc::clone(&self.snapshots.lock().current);
        // No subscribers is fine
        let _ = self.notify.send(current);
        self.sent.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared handle to the state store
#[derive(Debug, Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

impl StateStore {
    /// Store starting from the default state
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_initial(ApplicationState::default(), config)
    }

    /// Store starting from `initial`
    #[must_use]
    pub fn with_initial(initial: ApplicationState, config: &StoreConfig) -> Self {
        let (notify, _) = broadcast::channel(config.notification_capacity.max(1));
        Self {
            inner: Arc::new(StoreInner {
                snapshots: Mutex::new(Snapshots {
                    current: Arc::new(initial),
                    history: Vec::new(),
                }),
                dirty: AtomicBool::new(false),
                notify,
                sent: AtomicU64::new(0),
                tick: config.tick(),
            }),
        }
    }

    /// Apply a transition and return the new current snapshot
    pub fn apply(&self, transition: Transition) -> Arc<ApplicationState> {
        let next = {
            let mut snapshots = self.inner.snapshots.lock();
            let next = Arc::new(snapshots.current.transitioned(transition));
            let previous = std::mem::replace(&mut snapshots.current, Arc::clone(&next));
            snapshots.history.push(previous);
            next
        };
        self.mark_dirty();
        next
    }

    pub fn apply_source(&self, source: impl Into<String>) -> Arc<ApplicationState> {
        self.apply(Transition::Source(source.into()))
    }

    pub fn apply_output(&self, output: Output) -> Arc<ApplicationState> {
        self.apply(Transition::Output(output))
    }

    pub fn apply_errors(&self, errors: ErrorBundle) -> Arc<ApplicationState> {
        self.apply(Transition::Errors(errors))
    }

    pub fn apply_debug(&self, debug: DebugInfo) -> Arc<ApplicationState> {
        self.apply(Transition::Debug(debug))
    }

    /// Current snapshot
    #[must_use]
    pub fn current(&self) -> Arc<ApplicationState> {
        Arc::clone(&self.inner.snapshots.lock().current)
    }

    /// Superseded snapshots, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<Arc<ApplicationState>> {
        self.inner.snapshots.lock().history.clone()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.inner.snapshots.lock().history.len()
    }

    /// Receive coalesced change notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ApplicationState>> {
        self.inner.notify.subscribe()
    }

    /// Notifications emitted so far
    #[must_use]
    pub fn notifications_sent(&self) -> u64 {
        self.inner.sent.load(Ordering::Relaxed)
    }

    fn mark_dirty(&self) {
        if self.inner.dirty.swap(true, Ordering::AcqRel) {
            tracing::debug!("state change coalesced into pending notification");
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    tokio::time::sleep(inner.tick).await;
                    inner.flush();
                });
            }
            // Outside a runtime there is no tick to wait for
            Err(_) => self.inner.flush(),
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}
