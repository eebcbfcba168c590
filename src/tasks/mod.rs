//! Background Tasks Module
//!
//! Long-running maintenance tasks spawned by the composition root.

mod sweep;

pub use sweep::spawn_sweep_task;
