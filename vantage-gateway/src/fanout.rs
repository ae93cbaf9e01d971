use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use vantage_metrics::Counters;

struct Inner<T> {
    subscribers: HashMap<u64, mpsc::Sender<T>>,
    next_id: u64,
    venue_task: Option<tokio::task::JoinHandle<()>>,
}

/// Fans one venue stream out to N client-owned bounded queues: subscribes
/// once to the underlying venue stream, then fans out messages to every
/// subscribed client via non-blocking sends. On client slowness, drops or
/// disconnects that client only — the venue stream is never back-pressured.
///
/// Ref-counted: the venue-subscription task is spawned lazily on the first
/// subscriber and cancelled once the last one leaves.
pub struct FanOut<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for FanOut<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Default for FanOut<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FanOut<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { subscribers: HashMap::new(), next_id: 0, venue_task: None })),
        }
    }

    /// Register a new subscriber with a bounded queue of the given
    /// capacity (at least 1).
    pub fn subscribe(&self, capacity: usize) -> (u64, mpsc::Receiver<T>) {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        inner.subscribers.insert(id, tx);
        (id, rx)
    }

    /// Drop one subscriber, returning the remaining subscriber count so the
    /// caller can decide whether to cancel the venue subscription.
    pub fn unsubscribe(&self, id: u64) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.remove(&id);
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    pub fn has_venue_task(&self) -> bool {
        self.inner.lock().venue_task.is_some()
    }

    pub fn set_venue_task(&self, handle: tokio::task::JoinHandle<()>) {
        self.inner.lock().venue_task = Some(handle);
    }

    /// Abort and forget the venue-subscription task. Called once the
    /// subscriber count reaches zero.
    pub fn cancel_venue_task(&self) {
        if let Some(handle) = self.inner.lock().venue_task.take() {
            handle.abort();
        }
    }

    /// Take the venue-subscription task out, if any, for a coordinated
    /// process shutdown that closes the venue connection last. A concurrent
    /// [`Self::cancel_venue_task`] after this becomes a no-op rather than
    /// double-aborting.
    pub fn take_venue_task(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.inner.lock().venue_task.take()
    }
}

impl<T: Clone> FanOut<T> {
    /// Non-blocking fan-out of one venue item to every live subscriber. A
    /// full or closed queue disconnects that subscriber only; the venue
    /// stream this is called from is never blocked.
    pub fn publish(&self, item: T, counters: &Counters, stream: &'static str) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|_, tx| match tx.try_send(item.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(stream, "client queue full, disconnecting slow subscriber");
                counters.gateway_client_dropped(stream);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

/// One [`FanOut`] per distinct subscription key (e.g. the symbol list a
/// price stream was opened with), so two clients asking for the same
/// symbols share one venue subscription while disjoint requests each get
/// their own.
pub struct KeyedFanOut<K, T> {
    by_key: Mutex<HashMap<K, FanOut<T>>>,
}

impl<K, T> Default for KeyedFanOut<K, T> {
    fn default() -> Self {
        Self { by_key: Mutex::new(HashMap::new()) }
    }
}

impl<K: std::hash::Hash + Eq + Clone, T> KeyedFanOut<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the [`FanOut`] for `key`, creating it (via `spawn`) if this is
    /// the first subscriber for that key. `spawn` receives the new, empty
    /// `FanOut` and is expected to register its venue task on it.
    pub fn get_or_spawn(&self, key: K, spawn: impl FnOnce(&FanOut<T>)) -> FanOut<T> {
        let mut by_key = self.by_key.lock();
        if let Some(existing) = by_key.get(&key) {
            return existing.clone();
        }
        let fanout = FanOut::new();
        spawn(&fanout);
        by_key.insert(key, fanout.clone());
        fanout
    }

    /// Drop `key`'s entry entirely once its `FanOut` has no subscribers
    /// left, cancelling the venue task that fed it.
    pub fn retire_if_empty(&self, key: &K) {
        let mut by_key = self.by_key.lock();
        if let Some(fanout) = by_key.get(key) {
            if fanout.subscriber_count() == 0 {
                fanout.cancel_venue_task();
                by_key.remove(key);
            }
        }
    }

    /// Take every live entry's venue task for a coordinated process
    /// shutdown, leaving the entries themselves in place (any still-live
    /// client subscription keeps reading from a channel whose sender is
    /// about to be dropped when the aborted task unwinds).
    pub fn drain_venue_tasks(&self) -> Vec<tokio::task::JoinHandle<()>> {
        self.by_key.lock().values().filter_map(FanOut::take_venue_task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use vantage_metrics::{Counters, VecSink};

    #[tokio::test]
    async fn a_full_subscriber_queue_is_dropped_without_blocking_the_publisher() {
        let fanout: FanOut<i32> = FanOut::new();
        let (id, mut rx) = fanout.subscribe(1);
        let counters = Counters::new(StdArc::new(VecSink::default()));

        fanout.publish(1, &counters, "price");
        fanout.publish(2, &counters, "price"); // queue already full, subscriber dropped

        assert_eq!(fanout.subscriber_count(), 0);
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);

        let _ = id;
    }

    #[test]
    fn unsubscribe_reports_the_remaining_count() {
        let fanout: FanOut<i32> = FanOut::new();
        let (a, _rx_a) = fanout.subscribe(4);
        let (_b, _rx_b) = fanout.subscribe(4);
        assert_eq!(fanout.unsubscribe(a), 1);
    }
}
