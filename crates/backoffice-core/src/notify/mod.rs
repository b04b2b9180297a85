//! Transient notifications for surfacing operation results to the user.
//!
//! This module provides the `NotificationQueue`: callers enqueue a record
//! describing how an operation went, and the queue removes it again after a
//! fixed lifetime (2 seconds by default) or when the user dismisses it.
//!
//! Timers go through the `Scheduler` capability: `TokioScheduler` in
//! production, `ManualScheduler` for a simulated clock.

pub mod queue;
pub mod record;
pub mod scheduler;

pub use queue::NotificationQueue;
pub use record::{NotificationId, NotificationKind, NotificationRecord};
pub use scheduler::{ManualScheduler, ManualTimer, Scheduler, Task, TokioScheduler};
