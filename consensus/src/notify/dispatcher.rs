//! Single-consumer event queue.
//!
//! Producers enqueue whole batches while they still hold the chain lock. One worker thread
//! delivers each event to every subscriber under the subscriber list's read lock, so
//! `unsubscribe`, which takes the write lock, returns only once no delivery to the removed
//! observer is in flight.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::events::{ChainEvent, ChainObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

enum Message {
    Events(Vec<ChainEvent>),
    Sync(Sender<()>),
    Shutdown,
}

type Subscribers = Arc<RwLock<Vec<(SubscriptionId, Arc<dyn ChainObserver>)>>>;

pub struct Dispatcher {
    sender: Sender<Message>,
    subscribers: Subscribers,
    pending: Arc<AtomicUsize>,
    next_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        let subscribers: Subscribers = Arc::new(RwLock::new(Vec::new()));
        let pending = Arc::new(AtomicUsize::new(0));
        let worker = {
            let subscribers = subscribers.clone();
            let pending = pending.clone();
            std::thread::Builder::new()
                .name("chain-events".into())
                .spawn(move || Self::run(receiver, subscribers, pending))
                .map_err(|err| warn!("failed to spawn event thread: {err}"))
                .ok()
        };
        Self { sender, subscribers, pending, next_id: AtomicU64::new(0), worker: Mutex::new(worker) }
    }

    fn run(receiver: Receiver<Message>, subscribers: Subscribers, pending: Arc<AtomicUsize>) {
        for message in receiver {
            match message {
                Message::Events(events) => {
                    for event in events {
                        {
                            let subscribers = subscribers.read();
                            trace!("delivering {} to {} subscribers", event.kind(), subscribers.len());
                            for (_, observer) in subscribers.iter() {
                                event.deliver(observer.as_ref());
                            }
                        }
                        pending.fetch_sub(1, Ordering::AcqRel);
                    }
                }
                Message::Sync(done) => {
                    let _ = done.send(());
                }
                Message::Shutdown => break,
            }
        }
        debug!("event dispatcher stopped");
    }

    pub fn subscribe(&self, observer: Arc<dyn ChainObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, observer));
        id
    }

    /// Removes a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Queues `events` behind everything queued so far.
    pub fn enqueue(&self, events: Vec<ChainEvent>) {
        if events.is_empty() {
            return;
        }
        let count = events.len();
        self.pending.fetch_add(count, Ordering::AcqRel);
        if self.sender.send(Message::Events(events)).is_err() {
            self.pending.fetch_sub(count, Ordering::AcqRel);
            warn!("event dispatcher is gone, dropped {count} events");
        }
    }

    /// Blocks until every event queued before this call has been delivered.
    pub fn sync(&self) {
        let (done_tx, done_rx) = bounded(1);
        if self.sender.send(Message::Sync(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// Events queued but not yet delivered.
    pub fn pending_callbacks(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Delivers what is queued, then stops the worker. Later events are dropped.
    pub fn shutdown(&self) {
        if let Some(worker) = self.worker.lock().take() {
            let _ = self.sender.send(Message::Shutdown);
            if worker.join().is_err() {
                warn!("event dispatcher thread panicked");
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::Hash;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Hash>>,
    }

    impl ChainObserver for Recorder {
        fn tip_updated(&self, new_tip: &Hash, _fork_point: &Hash) {
            self.seen.lock().push(*new_tip);
        }
    }

    struct Slow;

    impl ChainObserver for Slow {
        fn tip_updated(&self, _new_tip: &Hash, _fork_point: &Hash) {
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn tip(n: u64) -> ChainEvent {
        ChainEvent::TipUpdated { new_tip: Hash::from_le_u64([n, 0, 0, 0]), fork_point: Hash::zeroed() }
    }

    #[test]
    fn test_events_arrive_in_queue_order() {
        let dispatcher = Dispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe(recorder.clone());

        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let batch: Vec<_> = (0..25).map(|i| tip(p * 100 + i)).collect();
                batch
            })
            .collect();
        for batch in producers {
            dispatcher.enqueue(batch);
        }
        dispatcher.sync();
        assert_eq!(dispatcher.pending_callbacks(), 0);

        let seen = recorder.seen.lock().clone();
        let expected: Vec<_> = (0..4u64).flat_map(|p| (0..25).map(move |i| Hash::from_le_u64([p * 100 + i, 0, 0, 0]))).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let dispatcher = Dispatcher::new();
        let recorder = Arc::new(Recorder::default());
        let slow: Arc<dyn ChainObserver> = Arc::new(Slow);
        dispatcher.subscribe(slow);
        let id = dispatcher.subscribe(recorder.clone());

        dispatcher.enqueue((0..10).map(tip).collect());
        assert!(dispatcher.unsubscribe(id));
        let delivered = recorder.seen.lock().len();
        dispatcher.sync();
        // At most the event in flight when unsubscribe returned
        assert!(recorder.seen.lock().len() <= delivered + 1);
        assert!(!dispatcher.unsubscribe(id));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let dispatcher = Dispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe(recorder.clone());
        dispatcher.enqueue((0..5).map(tip).collect());
        dispatcher.shutdown();
        assert_eq!(recorder.seen.lock().len(), 5);
        dispatcher.enqueue(vec![tip(9)]);
        dispatcher.sync();
    }
}
