use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use super::{NotificationId, NotificationKind, NotificationRecord, Scheduler, TokioScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Expired,
    Dismissed,
}

struct QueueState<H> {
    /// Oldest first
    records: Vec<NotificationRecord>,
    /// Pending expiry timer per active record
    timers: HashMap<NotificationId, H>,
    last_id: u64,
}

impl<H> QueueState<H> {
    /// Strictly increasing, so ids never repeat while the process lives
    fn next_id(&mut self, now_micros: i64) -> NotificationId {
        let candidate = u64::try_from(now_micros).unwrap_or(0);
        let id = candidate.max(self.last_id + 1);
        self.last_id = id;
        NotificationId(id)
    }
}

struct Inner<S: Scheduler> {
    scheduler: S,
    lifetime: Duration,
    state: Mutex<QueueState<S::Handle>>,
    updates: watch::Sender<Vec<NotificationRecord>>,
}

impl<S: Scheduler> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, QueueState<S::Handle>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &QueueState<S::Handle>) {
        self.updates.send_replace(state.records.clone());
    }

    /// The single removal path for both expiry and dismissal
    fn remove(&self, id: NotificationId, cause: Removal) -> Option<NotificationRecord> {
        let (record, timer) = {
            let mut state = self.lock();
            let position = state.records.iter().position(|r| r.id == id)?;
            let record = state.records.remove(position);
            let timer = state.timers.remove(&id);
            self.publish(&state);
            (record, timer)
        };

        if cause == Removal::Dismissed {
            if let Some(timer) = timer {
                self.scheduler.cancel(timer);
            }
        }
        debug!(id = %id, cause = ?cause, "Notification removed");
        Some(record)
    }
}

impl<S: Scheduler> Drop for Inner<S> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in state.timers.drain() {
            self.scheduler.cancel(timer);
        }
    }
}

/// Transient notifications that remove themselves after a fixed lifetime.
///
/// Cheap to clone; clones share the same collection. Expiry timers only hold
/// a weak reference, so dropping the last clone cancels whatever is pending.
pub struct NotificationQueue<S: Scheduler = TokioScheduler> {
    inner: Arc<Inner<S>>,
}

impl<S: Scheduler> Clone for NotificationQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Scheduler> NotificationQueue<S> {
    pub fn new(scheduler: S, lifetime: Duration) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                scheduler,
                lifetime,
                state: Mutex::new(QueueState {
                    records: Vec::new(),
                    timers: HashMap::new(),
                    last_id: 0,
                }),
                updates,
            }),
        }
    }

    /// Add a notification and schedule its removal after the lifetime.
    pub fn enqueue(&self, kind: NotificationKind, message: impl Into<String>) -> NotificationId {
        let mut state = self.inner.lock();
        let id = state.next_id(Utc::now().timestamp_micros());
        state.records.push(NotificationRecord {
            id,
            kind,
            message: message.into(),
        });

        // Scheduled under the lock so an early firing can't miss the timer entry
        let weak = Arc::downgrade(&self.inner);
        let timer = self.inner.scheduler.schedule_after(
            self.inner.lifetime,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(id, Removal::Expired);
                }
            }),
        );
        state.timers.insert(id, timer);
        self.inner.publish(&state);

        debug!(id = %id, kind = %kind, "Notification enqueued");
        id
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Error, message)
    }

    /// Remove a notification before it expires. Unknown ids are ignored.
    pub fn dismiss(&self, id: NotificationId) {
        self.inner.remove(id, Removal::Dismissed);
    }

    /// Active notifications, oldest first
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.inner.lock().records.clone()
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.inner.lock().records.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Watch the active collection; the receiver sees every change.
    ///
    /// Don't keep a borrow of the receiver alive while calling back into the
    /// queue: publishing waits for outstanding borrows.
    pub fn subscribe(&self) -> watch::Receiver<Vec<NotificationRecord>> {
        self.inner.updates.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::notify::ManualScheduler;

    const LIFETIME: Duration = Duration::from_millis(2_000);

    fn queue() -> (NotificationQueue<ManualScheduler>, ManualScheduler) {
        let clock = ManualScheduler::new();
        (NotificationQueue::new(clock.clone(), LIFETIME), clock)
    }

    // -------------------------------------------------------------------------
    // Enqueue Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_enqueue_adds_one_record() {
        let (queue, _clock) = queue();
        let before = queue.snapshot();

        let id = queue.enqueue(NotificationKind::Success, "Saved");

        let after = queue.snapshot();
        assert_eq!(after.len(), before.len() + 1);
        let record = after.last().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.kind, NotificationKind::Success);
        assert_eq!(record.message, "Saved");
        assert!(!before.iter().any(|r| r.id == id));
    }

    #[test]
    fn test_burst_ids_are_unique_and_ordered() {
        let (queue, _clock) = queue();
        let ids: Vec<NotificationId> = (0..1_000).map(|i| queue.info(format!("n{}", i))).collect();

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_id_handles_same_instant_and_clock_going_back() {
        let mut state: QueueState<()> = QueueState {
            records: Vec::new(),
            timers: HashMap::new(),
            last_id: 0,
        };
        assert_eq!(state.next_id(1_000), NotificationId(1_000));
        assert_eq!(state.next_id(1_000), NotificationId(1_001));
        assert_eq!(state.next_id(900), NotificationId(1_002));
        assert_eq!(state.next_id(5_000), NotificationId(5_000));
        assert_eq!(state.next_id(-5), NotificationId(5_001));
    }

    #[test]
    fn test_snapshot_is_oldest_first() {
        let (queue, _clock) = queue();
        queue.info("first");
        queue.warning("second");
        queue.error("third");

        let messages: Vec<_> = queue.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reading_does_not_mutate() {
        let (queue, clock) = queue();
        queue.info("hello");

        let first = queue.snapshot();
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
        assert_eq!(queue.snapshot(), first);
        assert_eq!(clock.pending(), 1);
    }

    // -------------------------------------------------------------------------
    // Expiry Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_record_expires_after_lifetime() {
        let (queue, clock) = queue();
        let id = queue.enqueue(NotificationKind::Success, "Saved");

        clock.advance(Duration::from_millis(1_000));
        assert!(queue.contains(id));

        clock.advance(Duration::from_millis(1_100));
        assert!(!queue.contains(id));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_record_present_until_exact_deadline() {
        let (queue, clock) = queue();
        let id = queue.info("boundary");

        clock.advance(LIFETIME - Duration::from_millis(1));
        assert!(queue.contains(id));

        clock.advance(Duration::from_millis(1));
        assert!(!queue.contains(id));
    }

    #[test]
    fn test_records_expire_independently() {
        let (queue, clock) = queue();
        let early = queue.info("early");
        clock.advance(Duration::from_millis(500));
        let late = queue.info("late");

        clock.advance(Duration::from_millis(1_500));
        assert!(!queue.contains(early));
        assert!(queue.contains(late));

        clock.advance(Duration::from_millis(500));
        assert!(queue.is_empty());
    }

    // -------------------------------------------------------------------------
    // Dismiss Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_dismiss_removes_only_that_record() {
        let (queue, _clock) = queue();
        let a = queue.info("a");
        let b = queue.info("b");
        let c = queue.info("c");

        queue.dismiss(b);

        let ids: Vec<_> = queue.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_dismiss_twice_is_noop() {
        let (queue, _clock) = queue();
        let a = queue.info("a");
        let b = queue.info("b");

        queue.dismiss(a);
        let after_first = queue.snapshot();
        queue.dismiss(a);
        assert_eq!(queue.snapshot(), after_first);
        assert!(queue.contains(b));
    }

    #[test]
    fn test_dismiss_unknown_id_is_noop() {
        let (queue, _clock) = queue();
        queue.info("a");

        queue.dismiss(NotificationId(42));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_dismiss_cancels_timer() {
        let (queue, clock) = queue();
        let id = queue.info("a");
        assert_eq!(clock.pending(), 1);

        queue.dismiss(id);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_dismiss_after_expiry_is_noop() {
        let (queue, clock) = queue();
        let id = queue.info("a");
        clock.advance(LIFETIME);

        queue.dismiss(id);
        assert!(queue.is_empty());
        assert_eq!(clock.pending(), 0);
    }

    // -------------------------------------------------------------------------
    // Lifecycle Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_dropping_queue_cancels_pending_timers() {
        let (queue, clock) = queue();
        queue.info("a");
        queue.info("b");
        assert_eq!(clock.pending(), 2);

        drop(queue);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_clones_share_collection() {
        let (queue, clock) = queue();
        let other = queue.clone();
        let id = other.success("from clone");

        assert!(queue.contains(id));
        drop(other);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_subscribe_sees_changes() {
        let (queue, clock) = queue();
        let mut updates = queue.subscribe();
        assert!(updates.borrow_and_update().is_empty());

        let id = queue.error("Failed to save");
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update()[0].id, id);

        clock.advance(LIFETIME);
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_queue_expires_records() {
        let queue = NotificationQueue::new(TokioScheduler::current().unwrap(), LIFETIME);
        let id = queue.success("Saved");

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(queue.contains(id));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(!queue.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_queue_dismiss_before_expiry() {
        let queue = NotificationQueue::new(TokioScheduler::current().unwrap(), LIFETIME);
        let kept = queue.info("kept");
        let dismissed = queue.info("dismissed");

        queue.dismiss(dismissed);
        assert!(!queue.contains(dismissed));
        assert!(queue.contains(kept));

        tokio::time::sleep(LIFETIME + Duration::from_millis(1)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_observes_drain() {
        let queue = NotificationQueue::new(TokioScheduler::current().unwrap(), LIFETIME);
        let mut updates = queue.subscribe();
        queue.info("a");
        queue.info("b");

        let drained = updates.wait_for(|records| records.is_empty()).await.is_ok();
        assert!(drained);
        assert!(queue.is_empty());
    }
}
