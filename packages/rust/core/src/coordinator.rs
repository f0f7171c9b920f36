//! Named background tasks with observable lifecycle.
//!
//! The [`TaskCoordinator`] owns a registry of [`TaskRecord`]s, one per task
//! name. Work is executed on Tokio tasks, gated by a semaphore so at most
//! `pool_size` run at once; the rest wait in `Pending`. Readers poll with
//! [`TaskCoordinator::status`] / [`TaskCoordinator::status_all`] and always see
//! whole records: every mutation happens under the registry write lock.
//!
//! Lifecycle per submission: `Pending → Active → Finished | Failed`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use plugsync_shared::{PlugsyncError, Result};

/// Highest progress a running task may report; 100 is reserved for `Finished`.
const MAX_ACTIVE_PROGRESS: u8 = 99;

// ---------------------------------------------------------------------------
// TaskState / TaskRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created or queued, not yet dispatched to a worker.
    Pending,
    Active,
    Finished,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one task.
#[derive(Debug)]
pub struct TaskRecord<T> {
    pub id: String,
    pub state: TaskState,
    /// 0–100; only `Finished` records carry 100.
    pub progress: u8,
    pub message: String,
    pub result: Option<Arc<T>>,
    pub error: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl<T> TaskRecord<T> {
    fn pending(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: TaskState::Pending,
            progress: 0,
            message: String::new(),
            result: None,
            error: None,
            submitted_at: None,
            started_at: None,
            finished_at: None,
        }
    }
}

// Results are shared, so snapshots never require `T: Clone`.
impl<T> Clone for TaskRecord<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            state: self.state,
            progress: self.progress,
            message: self.message.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            submitted_at: self.submitted_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry internals
// ---------------------------------------------------------------------------

struct Slot<T> {
    record: TaskRecord<T>,
    /// Id of the submission currently owning the record; `None` when idle.
    run: Option<u64>,
}

impl<T> Slot<T> {
    fn in_flight(&self) -> bool {
        self.run.is_some()
    }
}

struct Shared<T> {
    registry: RwLock<HashMap<String, Slot<T>>>,
    permits: Arc<Semaphore>,
    settled: Notify,
    next_run: AtomicU64,
}

impl<T: Send + Sync + 'static> Shared<T> {
    async fn drive<F, Fut>(self: Arc<Self>, name: String, run: u64, work: F)
    where
        F: FnOnce(ProgressHandle<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            self.settle(
                &name,
                run,
                Err("coordinator shut down before the task started".into()),
            );
            return;
        };

        if !self.start(&name, run) {
            return;
        }

        let handle = ProgressHandle {
            shared: Arc::clone(&self),
            name: name.clone(),
            run,
        };

        // A separate Tokio task turns a panic in `work` into a JoinError.
        let outcome = match tokio::spawn(async move { work(handle).await }).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.to_string()),
            Err(join_err) => Err(PlugsyncError::WorkerFault(panic_message(join_err)).to_string()),
        };

        self.settle(&name, run, outcome);
        drop(permit);
    }

    fn start(&self, name: &str, run: u64) -> bool {
        let mut registry = self.registry.write();
        let Some(slot) = registry.get_mut(name) else {
            return false;
        };
        if slot.run != Some(run) {
            return false;
        }

        slot.record.state = TaskState::Active;
        slot.record.started_at = Some(Utc::now());
        info!(task = name, run, "task started");
        true
    }

    fn settle(&self, name: &str, run: u64, outcome: std::result::Result<T, String>) {
        {
            let mut registry = self.registry.write();
            let Some(slot) = registry.get_mut(name) else {
                return;
            };
            if slot.run != Some(run) {
                return;
            }

            let record = &mut slot.record;
            match outcome {
                Ok(value) => {
                    record.state = TaskState::Finished;
                    record.progress = 100;
                    record.result = Some(Arc::new(value));
                    record.error = None;
                    info!(task = name, run, "task finished");
                }
                Err(error) => {
                    warn!(task = name, run, %error, "task failed");
                    record.state = TaskState::Failed;
                    record.result = None;
                    record.error = Some(error);
                }
            }
            record.finished_at = Some(Utc::now());
            slot.run = None;
        }

        self.settled.notify_waiters();
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "worker was cancelled".into();
    }

    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".into()
    }
}

// ---------------------------------------------------------------------------
// ProgressHandle
// ---------------------------------------------------------------------------

/// Write access to one running task's progress and message.
///
/// Updates are ignored once the task has settled, and progress never moves
/// backwards within a run.
pub struct ProgressHandle<T> {
    shared: Arc<Shared<T>>,
    name: String,
    run: u64,
}

impl<T> ProgressHandle<T> {
    pub fn task_name(&self) -> &str {
        &self.name
    }

    /// Report progress in percent (values above 99 are held at 99 until finish).
    pub fn set_progress(&self, percent: u8) {
        self.update(Some(percent), None);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.update(None, Some(message.into()));
    }

    /// Update progress and message together.
    pub fn report(&self, percent: u8, message: impl Into<String>) {
        self.update(Some(percent), Some(message.into()));
    }

    fn update(&self, percent: Option<u8>, message: Option<String>) {
        let mut registry = self.shared.registry.write();
        let Some(slot) = registry.get_mut(&self.name) else {
            return;
        };
        if slot.run != Some(self.run) || slot.record.state != TaskState::Active {
            return;
        }

        if let Some(percent) = percent {
            let percent = percent.min(MAX_ACTIVE_PROGRESS);
            slot.record.progress = slot.record.progress.max(percent);
        }
        if let Some(message) = message {
            slot.record.message = message;
        }
    }
}

// ---------------------------------------------------------------------------
// TaskCoordinator
// ---------------------------------------------------------------------------

/// Registry and bounded executor for named background tasks.
///
/// Cloning yields another handle to the same registry.
pub struct TaskCoordinator<T> {
    shared: Arc<Shared<T>>,
    pool_size: usize,
}

impl<T> Clone for TaskCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            pool_size: self.pool_size,
        }
    }
}

impl<T: Send + Sync + 'static> TaskCoordinator<T> {
    /// Create a coordinator running at most `pool_size` tasks at once (min 1).
    pub fn new(pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(HashMap::new()),
                permits: Arc::new(Semaphore::new(pool_size)),
                settled: Notify::new(),
                next_run: AtomicU64::new(1),
            }),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Queue `work` under `name`.
    ///
    /// Fails with [`PlugsyncError::AlreadyRunning`] while an earlier submission
    /// of the same name is queued or active. Otherwise the record is replaced
    /// by a fresh `Pending` one and the work is scheduled.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F, Fut>(&self, name: &str, work: F) -> Result<()>
    where
        F: FnOnce(ProgressHandle<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let run = self.shared.next_run.fetch_add(1, Ordering::Relaxed);
        {
            let mut registry = self.shared.registry.write();
            if registry.get(name).is_some_and(Slot::in_flight) {
                return Err(PlugsyncError::already_running(name));
            }

            let mut record = TaskRecord::pending(name);
            record.submitted_at = Some(Utc::now());
            registry.insert(
                name.to_string(),
                Slot {
                    record,
                    run: Some(run),
                },
            );
        }
        debug!(task = name, run, "task queued");

        let shared = Arc::clone(&self.shared);
        tokio::spawn(shared.drive(name.to_string(), run, work));
        Ok(())
    }

    /// Latest committed snapshot of a task.
    pub fn status(&self, name: &str) -> Option<TaskRecord<T>> {
        self.shared
            .registry
            .read()
            .get(name)
            .map(|slot| slot.record.clone())
    }

    /// Snapshots of every task, ordered by name.
    pub fn status_all(&self) -> BTreeMap<String, TaskRecord<T>> {
        self.shared
            .registry
            .read()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.record.clone()))
            .collect()
    }

    /// Whether a submission of `name` is queued or active.
    pub fn is_in_flight(&self, name: &str) -> bool {
        self.shared
            .registry
            .read()
            .get(name)
            .is_some_and(Slot::in_flight)
    }

    /// Re-create the record for `name` at `Pending` with no work attached.
    pub fn reset(&self, name: &str) -> Result<()> {
        let mut registry = self.shared.registry.write();
        if registry.get(name).is_some_and(Slot::in_flight) {
            return Err(PlugsyncError::already_running(name));
        }
        registry.insert(
            name.to_string(),
            Slot {
                record: TaskRecord::pending(name),
                run: None,
            },
        );
        debug!(task = name, "task reset");
        Ok(())
    }

    /// Remove an idle record from the registry, returning its last snapshot.
    pub fn evict(&self, name: &str) -> Result<Option<TaskRecord<T>>> {
        let mut registry = self.shared.registry.write();
        if registry.get(name).is_some_and(Slot::in_flight) {
            return Err(PlugsyncError::already_running(name));
        }
        Ok(registry.remove(name).map(|slot| slot.record))
    }

    /// Wait until `name` has no submission in flight and return its snapshot.
    /// Returns `None` for unknown names.
    pub async fn wait(&self, name: &str) -> Option<TaskRecord<T>> {
        loop {
            // Registered before the check so a settle in between still wakes us.
            let settled = self.shared.settled.notified();
            {
                let registry = self.shared.registry.read();
                match registry.get(name) {
                    None => return None,
                    Some(slot) if !slot.in_flight() => return Some(slot.record.clone()),
                    Some(_) => {}
                }
            }
            settled.await;
        }
    }

    /// Stop dispatching: queued submissions fail, active ones run to completion.
    pub fn shutdown(&self) {
        self.shared.permits.close();
        info!("task coordinator shut down");
    }
}
