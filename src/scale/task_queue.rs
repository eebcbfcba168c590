//! Async Task Queue
//!
//! In-memory priority queue with a single sequential worker. Tasks are not
//! durable; they exist only as long as the process. The worker stops itself
//! once the queue drains and is restarted lazily on the next enqueue.
//!
//! Every task walks the full lifecycle: `Pending` while queued, `Processing`
//! while the worker holds it, then `Completed` or `Failed`. Terminal items
//! stay inspectable through [`TaskQueue::task_status`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default priority when the caller does not specify one (lower = first).
pub const DEFAULT_TASK_PRIORITY: u8 = 5;

/// Artificial per-task processing delay, the queue's only "work".
const SIMULATED_WORK_MS: u64 = 50;

// == Task Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

// == Work Item ==
/// One queued unit of background work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: u64,
    pub task_type: String,
    pub data: Value,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// Lower number = more urgent
    pub priority: u8,
}

// == Queue State ==
#[derive(Debug, Default)]
struct QueueState {
    queue: Vec<WorkItem>,
    /// The item the worker is executing right now
    current: Option<WorkItem>,
    /// Terminal items, in completion order
    finished: Vec<WorkItem>,
    worker_running: bool,
    next_id: u64,
    completed: u64,
    failed: u64,
}

// == Task Queue ==
/// Priority queue processed by at most one worker at a time.
///
/// The queue is re-sorted by priority on every enqueue, so a task enqueued
/// mid-run can be served before an older, lower-priority one still waiting.
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // == Enqueue ==
    /// Appends a task and ensures the worker loop is running.
    ///
    /// Returns the task id.
    pub async fn enqueue(
        self: &Arc<Self>,
        task_type: impl Into<String>,
        data: Value,
        priority: u8,
    ) -> u64 {
        let id = {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let id = state.next_id;

            state.queue.push(WorkItem {
                id,
                task_type: task_type.into(),
                data,
                status: TaskStatus::Pending,
                created_at: Utc::now(),
                priority,
            });
            // Stable sort keeps enqueue order within a priority level
            state.queue.sort_by_key(|item| item.priority);

            if !state.worker_running {
                state.worker_running = true;
                let queue = Arc::clone(self);
                tokio::spawn(async move { queue.worker_loop().await });
            }
            id
        };

        debug!(id, priority, "task enqueued");
        id
    }

    // == Inline Execution ==
    /// Runs a task to completion on the caller, bypassing the queue and the
    /// worker. Used when asynchronous processing is disabled; the lifecycle
    /// and counters are the same as for queued tasks.
    pub async fn run_inline(
        &self,
        task_type: impl Into<String>,
        data: Value,
        priority: u8,
    ) -> u64 {
        let item = {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            WorkItem {
                id: state.next_id,
                task_type: task_type.into(),
                data,
                status: TaskStatus::Processing,
                created_at: Utc::now(),
                priority,
            }
        };

        let id = item.id;
        let result = Self::run(&item).await;
        self.finish(item, result).await;
        id
    }

    // == Worker Loop ==
    /// Processes exactly one task at a time, in priority order, then stops
    /// once the queue is empty.
    async fn worker_loop(self: Arc<Self>) {
        loop {
            let item = {
                let mut state = self.state.lock().await;
                if state.queue.is_empty() {
                    state.worker_running = false;
                    debug!("task queue drained; worker stopping");
                    return;
                }
                let mut item = state.queue.remove(0);
                item.status = TaskStatus::Processing;
                state.current = Some(item.clone());
                item
            };

            debug!(id = item.id, task_type = %item.task_type, "processing task");
            let result = Self::run(&item).await;
            self.finish(item, result).await;
        }
    }

    // == Dispatch ==
    /// Simulated execution: a fixed artificial delay, then dispatch on the
    /// task type. An unrecognized type is the failure path.
    async fn run(item: &WorkItem) -> Result<(), String> {
        tokio::time::sleep(Duration::from_millis(SIMULATED_WORK_MS)).await;

        match item.task_type.as_str() {
            "send_email" | "generate_report" | "sync_data" | "cleanup" => Ok(()),
            other => Err(format!("unknown task type: {}", other)),
        }
    }

    /// Records the terminal status and clears the in-flight slot.
    async fn finish(&self, mut item: WorkItem, result: Result<(), String>) {
        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                item.status = TaskStatus::Completed;
                state.completed += 1;
                info!(id = item.id, task_type = %item.task_type, "task completed");
            }
            Err(err) => {
                item.status = TaskStatus::Failed;
                state.failed += 1;
                warn!(id = item.id, task_type = %item.task_type, error = %err, "task failed");
            }
        }
        // Inline tasks never occupied the worker's slot
        if state.current.as_ref().is_some_and(|c| c.id == item.id) {
            state.current = None;
        }
        state.finished.push(item);
    }

    // == Introspection ==
    /// Number of tasks still waiting (excludes the one being processed).
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn completed_count(&self) -> u64 {
        self.state.lock().await.completed
    }

    pub async fn failed_count(&self) -> u64 {
        self.state.lock().await.failed
    }

    /// Status of a task anywhere in its lifecycle; `None` for unknown ids.
    pub async fn task_status(&self, id: u64) -> Option<TaskStatus> {
        let state = self.state.lock().await;
        if let Some(current) = &state.current {
            if current.id == id {
                return Some(current.status);
            }
        }
        state
            .queue
            .iter()
            .chain(state.finished.iter())
            .find(|item| item.id == id)
            .map(|item| item.status)
    }

    /// Ids of waiting tasks in the order the worker will serve them.
    pub async fn pending_order(&self) -> Vec<u64> {
        self.state
            .lock()
            .await
            .queue
            .iter()
            .map(|item| item.id)
            .collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_enqueue_assigns_increasing_ids() {
        let queue = Arc::new(TaskQueue::new());

        let id1 = queue.enqueue("send_email", json!({}), 5).await;
        let id2 = queue.enqueue("sync_data", json!({}), 5).await;
        assert!(id2 > id1);
    }

    #[tokio::test]
    async fn test_priority_order() {
        let queue = Arc::new(TaskQueue::new());

        // Enqueue a blocker first so the worker is busy with it while we
        // inspect the waiting order.
        queue.enqueue("send_email", json!({}), 0).await;
        let low = queue.enqueue("sync_data", json!({}), 9).await;
        let high = queue.enqueue("generate_report", json!({}), 1).await;

        let order = queue.pending_order().await;
        let low_pos = order.iter().position(|id| *id == low);
        let high_pos = order.iter().position(|id| *id == high);
        // Both may already be processed on a slow test machine; only assert
        // when both are still waiting
        if let (Some(low_pos), Some(high_pos)) = (low_pos, high_pos) {
            assert!(high_pos < low_pos, "higher priority should be served first");
        }

        // Everything eventually completes
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(queue.completed_count().await, 3);
        assert_eq!(queue.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_status_lifecycle_to_completed() {
        let queue = Arc::new(TaskQueue::new());

        let id = queue.enqueue("send_email", json!({"to": "x"}), 5).await;

        // Directly after enqueue the task is waiting or already picked up
        let early = queue.task_status(id).await.unwrap();
        assert!(matches!(early, TaskStatus::Pending | TaskStatus::Processing));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(queue.task_status(id).await, Some(TaskStatus::Completed));
        assert_eq!(queue.completed_count().await, 1);
        assert_eq!(queue.failed_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_task_type_fails() {
        let queue = Arc::new(TaskQueue::new());

        let id = queue.enqueue("no_such_task", json!({}), 5).await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(queue.task_status(id).await, Some(TaskStatus::Failed));
        assert_eq!(queue.failed_count().await, 1);
        assert_eq!(queue.completed_count().await, 0);
        // A failed task never blocks the queue
        assert_eq!(queue.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_worker() {
        let queue = Arc::new(TaskQueue::new());

        let bad = queue.enqueue("no_such_task", json!({}), 1).await;
        let good = queue.enqueue("cleanup", json!({}), 5).await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(queue.task_status(bad).await, Some(TaskStatus::Failed));
        assert_eq!(queue.task_status(good).await, Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn test_worker_restarts_after_drain() {
        let queue = Arc::new(TaskQueue::new());

        queue.enqueue("send_email", json!({}), 5).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(queue.completed_count().await, 1);

        // Worker has stopped; a new enqueue must restart it
        queue.enqueue("sync_data", json!({}), 5).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(queue.completed_count().await, 2);
    }

    #[tokio::test]
    async fn test_run_inline_completes_on_the_caller() {
        let queue = Arc::new(TaskQueue::new());

        let id = queue.run_inline("cleanup", json!({}), 5).await;

        // No waiting: the caller observed the terminal status directly
        assert_eq!(queue.task_status(id).await, Some(TaskStatus::Completed));
        assert_eq!(queue.pending_count().await, 0);
        assert_eq!(queue.completed_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_has_no_status() {
        let queue = Arc::new(TaskQueue::new());
        assert_eq!(queue.task_status(999).await, None);
    }
}
