//! Offline Module
//!
//! Durable storage and replay of mutating requests that failed while the
//! client was offline.

mod queue;
mod storage;

pub use queue::{OfflineQueue, ReplayOutcome, ReplayReport};
pub use storage::{FormStore, JsonFileFormStore, MemoryFormStore, QueuedForm, QueuedFormDraft};
