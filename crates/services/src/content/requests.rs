//! In-flight bookkeeping for content requests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tutor_core::model::ContentKey;

/// Caller side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by a resolution to abandon a stuck remote call.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A linked handle/signal pair.
    #[must_use]
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_, signal) = Self::pair();
        signal
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the paired handle cancels. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Issued by [`RequestTracker::begin`]. The key stays in flight until the
/// ticket is finished or dropped.
#[derive(Debug)]
pub struct RequestTicket<'a> {
    tracker: &'a RequestTracker,
    key: ContentKey,
    generation: u64,
}

impl RequestTicket<'_> {
    #[must_use]
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// Releases the key. Returns `true` if no newer request was issued since
    /// this one began.
    pub fn finish(self) -> bool {
        let latest = self.tracker.lock().latest == self.generation;
        latest
    }
}

impl Drop for RequestTicket<'_> {
    fn drop(&mut self) {
        let mut state = self.tracker.lock();
        if state.in_flight.get(&self.key) == Some(&self.generation) {
            state.in_flight.remove(&self.key);
        }
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    latest: u64,
    in_flight: HashMap<ContentKey, u64>,
}

/// Last-request-wins bookkeeping for one kind of content.
///
/// Re-triggering a key that is still in flight is refused. A request that
/// finishes after a newer one was issued is reported as stale.
#[derive(Debug, Default)]
pub struct RequestTracker {
    state: Mutex<TrackerState>,
}

impl RequestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request for `key`, or `None` if one is already in flight.
    pub fn begin(&self, key: ContentKey) -> Option<RequestTicket<'_>> {
        let mut state = self.lock();
        if state.in_flight.contains_key(&key) {
            return None;
        }
        state.latest += 1;
        let generation = state.latest;
        state.in_flight.insert(key.clone(), generation);
        Some(RequestTicket {
            tracker: self,
            key,
            generation,
        })
    }

    #[must_use]
    pub fn is_in_flight(&self, key: &ContentKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tutor_core::model::{LessonId, ProgrammingLanguage};

    fn key(topic: &str) -> ContentKey {
        ContentKey::new(ProgrammingLanguage::Python, LessonId::new(topic))
    }

    #[test]
    fn same_key_cannot_be_retriggered_while_in_flight() {
        let tracker = RequestTracker::new();
        let ticket = tracker.begin(key("intro")).unwrap();
        assert!(tracker.begin(key("intro")).is_none());
        assert!(tracker.is_in_flight(&key("intro")));

        assert!(ticket.finish());
        assert!(!tracker.is_in_flight(&key("intro")));
        assert!(tracker.begin(key("intro")).is_some());
    }

    #[test]
    fn older_request_is_stale_once_a_newer_one_begins() {
        let tracker = RequestTracker::new();
        let older = tracker.begin(key("intro")).unwrap();
        let newer = tracker.begin(key("loops")).unwrap();

        assert!(newer.finish());
        assert!(!older.finish());
    }

    #[test]
    fn dropped_ticket_releases_its_key() {
        let tracker = RequestTracker::new();
        let abandoned = tracker.begin(key("loops")).unwrap();
        drop(abandoned);
        assert!(!tracker.is_in_flight(&key("loops")));

        let retry = tracker.begin(key("loops")).unwrap();
        assert!(retry.finish());
    }

    #[tokio::test]
    async fn cancel_signal_fires_once_cancelled() {
        let (handle, signal) = CancelSignal::pair();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());
        signal.cancelled().await;
    }

    #[tokio::test]
    async fn never_signal_stays_pending() {
        let signal = CancelSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }
}
