//! PendingQueue - FIFO buffer of entries awaiting their delay threshold
//!
//! A single mutex guards the buffer. It is held only while entries are
//! pushed or the due prefix is moved out; sends happen after release.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::{SessionId, SharedSession};

use crate::clock::Clock;

/// A queued (session, message, enqueue-time) triple
pub struct QueueEntry<M> {
    /// Clock instant at insertion
    pub enqueued_at: Instant,
    /// Target session
    pub session: SharedSession<M>,
    /// Opaque payload
    pub message: M,
}

impl<M> QueueEntry<M> {
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Age of the entry at `now` (zero if `now` precedes insertion)
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

impl<M: fmt::Debug> fmt::Debug for QueueEntry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("enqueued_at", &self.enqueued_at)
            .field("session", self.session.id())
            .field("message", &self.message)
            .finish()
    }
}

struct State<M> {
    entries: VecDeque<QueueEntry<M>>,
    closed: bool,
}

/// FIFO of pending entries
pub struct PendingQueue<M> {
    state: Mutex<State<M>>,
}

impl<M> PendingQueue<M> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: VecDeque::new(),
                closed: false,
            }),
        }
    }

    // Nothing panics while the lock is held, so a poisoned lock still
    // guards a consistent buffer.
    fn lock(&self) -> MutexGuard<'_, State<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry at the tail
    ///
    /// Returns the new length, or gives the entry back if the queue is closed.
    pub fn push(&self, entry: QueueEntry<M>) -> Result<usize, QueueEntry<M>> {
        let mut state = self.lock();
        if state.closed {
            return Err(entry);
        }
        state.entries.push_back(entry);
        Ok(state.entries.len())
    }

    /// Stamp with `clock` and append, both under the lock
    ///
    /// Stamping inside the critical section keeps enqueue times
    /// non-decreasing along the queue when producers race.
    pub fn stamp_and_push(
        &self,
        clock: &dyn Clock,
        session: SharedSession<M>,
        message: M,
    ) -> Result<usize, QueueEntry<M>> {
        let mut state = self.lock();
        let entry = QueueEntry {
            enqueued_at: clock.now(),
            session,
            message,
        };
        if state.closed {
            return Err(entry);
        }
        state.entries.push_back(entry);
        Ok(state.entries.len())
    }

    /// Move out the due prefix of the queue
    ///
    /// Pops head entries while their age at `now` is at least `threshold`
    /// and stops at the first younger head, so a due entry behind a young
    /// one waits for it.
    pub fn take_due(&self, now: Instant, threshold: Duration) -> Vec<QueueEntry<M>> {
        let mut state = self.lock();
        let mut due = Vec::new();
        while state
            .entries
            .front()
            .is_some_and(|head| head.age(now) >= threshold)
        {
            due.extend(state.entries.pop_front());
        }
        due
    }

    /// Remove every entry regardless of age
    pub fn take_all(&self) -> Vec<QueueEntry<M>> {
        self.lock().entries.drain(..).collect()
    }

    /// Stop accepting new entries; queued ones stay
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Age of the oldest entry
    pub fn oldest_age(&self, now: Instant) -> Option<Duration> {
        self.lock().entries.front().map(|head| head.age(now))
    }
}

impl<M> Default for PendingQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}
