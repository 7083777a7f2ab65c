//! DispatchHandle - producer side of a running dispatcher

use std::sync::Arc;

use tracing::{debug, trace};

use contracts::SharedSession;

use crate::dispatcher::Shared;

/// Why an enqueue call did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    MissingSession,
    MissingMessage,
    /// The dispatcher has been shut down
    Stopped,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::MissingSession => "missing_session",
            IgnoreReason::MissingMessage => "missing_message",
            IgnoreReason::Stopped => "stopped",
        }
    }
}

/// Result of an enqueue call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Entry appended; `pending` is the queue length right after
    Accepted { pending: usize },
    Ignored(IgnoreReason),
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueOutcome::Accepted { .. })
    }
}

/// Cloneable handle used by producers to queue messages
///
/// Enqueue never blocks on sends; it only takes the queue lock long
/// enough to stamp and append.
pub struct DispatchHandle<M> {
    shared: Arc<Shared<M>>,
}

impl<M> Clone for DispatchHandle<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: Send + 'static> DispatchHandle<M> {
    pub(crate) fn new(shared: Arc<Shared<M>>) -> Self {
        Self { shared }
    }

    /// Queue `message` for `session`
    ///
    /// A missing session or message is a no-op, as is any call after
    /// shutdown. Neither is an error.
    pub fn enqueue(&self, session: Option<SharedSession<M>>, message: Option<M>) -> EnqueueOutcome {
        let (session, message) = match (session, message) {
            (None, _) => return self.ignore(IgnoreReason::MissingSession),
            (Some(_), None) => return self.ignore(IgnoreReason::MissingMessage),
            (Some(session), Some(message)) => (session, message),
        };

        let session_id = session.id().clone();
        match self
            .shared
            .queue
            .stamp_and_push(self.shared.clock.as_ref(), session, message)
        {
            Ok(pending) => {
                self.shared.metrics.inc_enqueued_count();
                self.shared.metrics.set_pending(pending);
                observability::record_enqueued(pending);
                trace!(session = %session_id, pending, "Message queued");
                EnqueueOutcome::Accepted { pending }
            }
            Err(_rejected) => self.ignore(IgnoreReason::Stopped),
        }
    }

    /// Queue a message for a session that is known to be present
    pub fn submit(&self, session: SharedSession<M>, message: M) -> EnqueueOutcome {
        self.enqueue(Some(session), Some(message))
    }

    pub fn pending_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queue.is_closed()
    }

    fn ignore(&self, reason: IgnoreReason) -> EnqueueOutcome {
        self.shared.metrics.inc_ignored_count();
        observability::record_ignored(reason.as_str());
        debug!(reason = reason.as_str(), "Enqueue ignored");
        EnqueueOutcome::Ignored(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::dispatcher::DispatcherBuilder;
    use crate::sessions::LogSession;
    use contracts::{SchedulerConfig, ShutdownPolicy};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_handle_clones_share_one_queue() {
        let clock = Arc::new(ManualClock::new());
        let mut dispatcher = DispatcherBuilder::new(SchedulerConfig::default())
            .with_clock(clock.clone())
            .build::<String>()
            .unwrap();
        let session: SharedSession<String> = Arc::new(LogSession::new("log"));

        let a = dispatcher.handle();
        let b = a.clone();
        assert_eq!(
            a.submit(Arc::clone(&session), "one".into()),
            EnqueueOutcome::Accepted { pending: 1 }
        );
        clock.advance(Duration::from_millis(5));
        assert_eq!(
            b.submit(Arc::clone(&session), "two".into()),
            EnqueueOutcome::Accepted { pending: 2 }
        );
        assert_eq!(dispatcher.pending_len(), 2);

        let report = dispatcher.shutdown(ShutdownPolicy::Retain).await.unwrap();
        assert_eq!(report.pending, 2);
        assert!(a.is_closed());
        assert_eq!(
            b.submit(session, "three".into()),
            EnqueueOutcome::Ignored(IgnoreReason::Stopped)
        );
        assert_eq!(dispatcher.metrics().ignored_count(), 1);
    }

    #[test]
    fn test_ignore_reason_labels() {
        assert_eq!(IgnoreReason::MissingSession.as_str(), "missing_session");
        assert_eq!(IgnoreReason::MissingMessage.as_str(), "missing_message");
        assert_eq!(IgnoreReason::Stopped.as_str(), "stopped");
    }
}
