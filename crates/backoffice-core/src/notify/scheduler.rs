use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Deferred work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay, unless cancelled first.
///
/// `schedule_after` must never run the task before returning; callers may
/// hold locks the task needs.
pub trait Scheduler: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn schedule_after(&self, delay: Duration, task: Task) -> Self::Handle;

    /// Cancel a pending task. Cancelling a task that already ran is a no-op.
    fn cancel(&self, handle: Self::Handle);
}

/// Timers as tokio tasks sleeping on the runtime clock.
#[derive(Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime the caller is running on
    pub fn current() -> Result<Self> {
        let runtime = Handle::try_current().context("Notification timers need a tokio runtime")?;
        Ok(Self::new(runtime))
    }
}

impl Scheduler for TokioScheduler {
    type Handle = AbortHandle;

    fn schedule_after(&self, delay: Duration, task: Task) -> AbortHandle {
        self.runtime
            .spawn(async move {
                tokio::time::sleep(delay).await;
                task();
            })
            .abort_handle()
    }

    fn cancel(&self, handle: AbortHandle) {
        handle.abort();
    }
}

/// Handle to a task on a [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManualTimer {
    deadline: Duration,
    seq: u64,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<ManualTimer, Task>,
}

/// Simulated clock: tasks run only when [`ManualScheduler::advance`] moves
/// time past their deadline.
///
/// Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time elapsed on the simulated clock
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks still waiting
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Move the clock forward, running every task that comes due in
    /// deadline order (ties in scheduling order).
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            // The lock is released before the task runs: tasks may schedule or cancel.
            let task = {
                let mut state = self.lock();
                let due = state
                    .pending
                    .keys()
                    .next()
                    .copied()
                    .filter(|timer| timer.deadline <= target);
                due.and_then(|timer| {
                    state.now = timer.deadline;
                    state.pending.remove(&timer)
                })
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        let mut state = self.lock();
        if state.now < target {
            state.now = target;
        }
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualTimer;

    fn schedule_after(&self, delay: Duration, task: Task) -> ManualTimer {
        let mut state = self.lock();
        let timer = ManualTimer {
            deadline: state.now + delay,
            seq: state.next_seq,
        };
        state.next_seq += 1;
        state.pending.insert(timer, task);
        timer
    }

    fn cancel(&self, handle: ManualTimer) {
        self.lock().pending.remove(&handle);
    }
}
