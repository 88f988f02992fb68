//! Publish/subscribe fan-out for store events
//!
//! Subscribers are registered either as plain callbacks or as async
//! handlers. `notify` runs all of them concurrently on a tokio runtime and
//! blocks the caller until every one has finished, so callers never see a
//! partially delivered event.

use crate::error::{AssetError, Result};
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::any::Any;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use uuid::Uuid;

/// Identifier returned on subscription, used to unsubscribe later
pub type SubscriberId = String;

/// A plain subscriber. Runs on the runtime's blocking pool, so it may do
/// blocking work without stalling async subscribers.
pub trait Subscriber<E>: Send + Sync {
    fn handle(&self, event: &E) -> anyhow::Result<()>;
}

impl<E, F> Subscriber<E> for F
where
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &E) -> anyhow::Result<()> {
        self(event)
    }
}

/// A subscriber that suspends cooperatively instead of blocking
#[async_trait]
pub trait AsyncSubscriber<E>: Send + Sync {
    async fn handle(&self, event: Arc<E>) -> anyhow::Result<()>;
}

enum Registered<E> {
    Blocking(Arc<dyn Subscriber<E>>),
    Async(Arc<dyn AsyncSubscriber<E>>),
}

impl<E> Clone for Registered<E> {
    fn clone(&self) -> Self {
        match self {
            Registered::Blocking(s) => Registered::Blocking(Arc::clone(s)),
            Registered::Async(s) => Registered::Async(Arc::clone(s)),
        }
    }
}

impl<E> Registered<E> {
    fn data_ptr(&self) -> *const () {
        match self {
            Registered::Blocking(s) => Arc::as_ptr(s) as *const (),
            Registered::Async(s) => Arc::as_ptr(s) as *const (),
        }
    }
}

/// What happened to one subscriber during a `notify` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
    TimedOut,
}

impl Delivery {
    fn from_join(joined: std::result::Result<anyhow::Result<()>, JoinError>) -> Self {
        match joined {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(e)) => Delivery::Failed(format!("{:#}", e)),
            Err(e) if e.is_panic() => {
                Delivery::Failed(format!("subscriber panicked: {}", panic_message(e.into_panic())))
            }
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Per-subscriber outcomes of a single `notify` call
#[derive(Debug, Clone, Default)]
pub struct NotifyReport {
    pub outcomes: Vec<(SubscriberId, Delivery)>,
}

impl NotifyReport {
    /// Number of subscribers that completed successfully
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, d)| *d == Delivery::Delivered)
            .count()
    }

    /// Subscribers that failed or timed out
    pub fn failures(&self) -> impl Iterator<Item = &(SubscriberId, Delivery)> {
        self.outcomes
            .iter()
            .filter(|(_, d)| *d != Delivery::Delivered)
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn outcome(&self, id: &str) -> Option<&Delivery> {
        self.outcomes
            .iter()
            .find(|(sid, _)| sid == id)
            .map(|(_, d)| d)
    }
}

/// Runtime that notifiers dispatch on.
///
/// Dropping it shuts the runtime down in the background without waiting
/// for in-flight subscribers, so the last owner may be released from inside
/// an async context (a host running its own `#[tokio::main]`, for example).
pub struct NotifyRuntime {
    /// Taken on drop
    runtime: Option<Runtime>,
    handle: Handle,
}

impl NotifyRuntime {
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Drop for NotifyRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            trace!("Shutting down notification runtime");
            runtime.shutdown_background();
        }
    }
}

/// Build the multi-threaded runtime notifiers dispatch on.
///
/// One runtime is normally shared by every store of a manager.
pub fn build_runtime(worker_threads: usize) -> Result<Arc<NotifyRuntime>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name("asset-notify")
        .enable_all()
        .build()
        .map_err(|e| AssetError::Runtime(e.to_string()))?;

    Ok(Arc::new(NotifyRuntime {
        handle: runtime.handle().clone(),
        runtime: Some(runtime),
    }))
}

/// Ordered set of subscribers for events of type `E`
pub struct Notifier<E> {
    subscribers: Vec<(SubscriberId, Registered<E>)>,
    runtime: Arc<NotifyRuntime>,
    /// Upper bound on a whole `notify` batch; `None` waits indefinitely
    timeout: Option<Duration>,
}

impl<E: Send + Sync + 'static> Notifier<E> {
    pub fn new(runtime: Arc<NotifyRuntime>) -> Self {
        Self {
            subscribers: Vec::new(),
            runtime,
            timeout: None,
        }
    }

    /// Bound each `notify` batch by `timeout`.
    ///
    /// Async subscribers still running at the deadline are cancelled. Plain
    /// subscribers run on the blocking pool and cannot be interrupted: they
    /// keep running detached after being reported `TimedOut`, each holding a
    /// blocking-pool thread until it returns. A subscriber that times out on
    /// every event therefore accumulates threads.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// See `with_timeout` for how timed-out subscribers behave
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Register a plain subscriber.
    /// Registering the same `Arc` twice returns the id it already has.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber<E>>) -> SubscriberId {
        self.register(Registered::Blocking(subscriber))
    }

    /// Register an async subscriber.
    /// Registering the same `Arc` twice returns the id it already has.
    pub fn subscribe_async(&mut self, subscriber: Arc<dyn AsyncSubscriber<E>>) -> SubscriberId {
        self.register(Registered::Async(subscriber))
    }

    fn register(&mut self, subscriber: Registered<E>) -> SubscriberId {
        let ptr = subscriber.data_ptr();
        if let Some((id, _)) = self.subscribers.iter().find(|(_, s)| s.data_ptr() == ptr) {
            trace!("Subscriber {} already registered", id);
            return id.clone();
        }

        let id = Uuid::new_v4().to_string();
        self.subscribers.push((id.clone(), subscriber));
        id
    }

    /// Remove a subscriber by id.
    /// Returns true if a subscriber was removed, false if the id was not found
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `event` to every subscriber and wait for all of them.
    ///
    /// A subscriber that returns an error, panics or exceeds the timeout is
    /// recorded in the report and logged; it never stops delivery to the
    /// others and never reaches the caller.
    ///
    /// Blocks the calling thread, so it must not be called from a task
    /// running on this notifier's own runtime.
    pub fn notify(&self, event: E) -> NotifyReport {
        if self.subscribers.is_empty() {
            return NotifyReport::default();
        }

        let subscribers = self.subscribers.clone();
        let event = Arc::new(event);
        let timeout = self.timeout;
        let (tx, rx) = channel();

        self.runtime.handle().spawn(async move {
            let report = dispatch(subscribers, event, timeout).await;
            let _ = tx.send(report);
        });

        match rx.recv() {
            Ok(report) => {
                for (id, delivery) in report.failures() {
                    warn!("Subscriber {} was not notified cleanly: {:?}", id, delivery);
                }
                debug!(
                    "Notified {}/{} subscribers",
                    report.delivered(),
                    report.outcomes.len()
                );
                report
            }
            Err(_) => {
                warn!("Notification batch was dropped before completing");
                NotifyReport::default()
            }
        }
    }
}

async fn dispatch<E: Send + Sync + 'static>(
    subscribers: Vec<(SubscriberId, Registered<E>)>,
    event: Arc<E>,
    timeout: Option<Duration>,
) -> NotifyReport {
    let deadline = timeout.map(|t| Instant::now() + t);

    let pending: Vec<(SubscriberId, JoinHandle<anyhow::Result<()>>)> = subscribers
        .into_iter()
        .map(|(id, subscriber)| {
            let event = Arc::clone(&event);
            let handle = match subscriber {
                Registered::Blocking(s) => tokio::task::spawn_blocking(move || s.handle(&event)),
                Registered::Async(s) => tokio::spawn(async move { s.handle(event).await }),
            };
            (id, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(pending.len());
    for (id, mut handle) in pending {
        let delivery = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => Delivery::from_join(joined),
                Err(_) => {
                    // Blocking work cannot be interrupted; it finishes detached
                    handle.abort();
                    Delivery::TimedOut
                }
            },
            None => Delivery::from_join(handle.await),
        };
        outcomes.push((id, delivery));
    }

    NotifyReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Barrier, Mutex};
    use tokio::sync::oneshot;

    fn runtime() -> Arc<NotifyRuntime> {
        build_runtime(2).expect("runtime")
    }

    fn counter_subscriber(count: Arc<AtomicUsize>) -> Arc<dyn Subscriber<u32>> {
        Arc::new(move |_: &u32| -> anyhow::Result<()> {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    struct AsyncCounter {
        count: AtomicUsize,
        last: AtomicUsize,
    }

    #[async_trait]
    impl AsyncSubscriber<u32> for AsyncCounter {
        async fn handle(&self, event: Arc<u32>) -> anyhow::Result<()> {
            tokio::task::yield_now().await;
            self.last.store(*event as usize, Ordering::SeqCst);
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier: Notifier<u32> = Notifier::new(runtime());
        let report = notifier.notify(1);
        assert!(report.outcomes.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_every_subscriber_called_once() {
        let mut notifier = Notifier::new(runtime());
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        notifier.subscribe(counter_subscriber(a.clone()));
        notifier.subscribe(counter_subscriber(b.clone()));

        let report = notifier.notify(7);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(report.delivered(), 2);
    }

    #[test]
    fn test_failing_subscriber_does_not_abort_batch() {
        let mut notifier = Notifier::new(runtime());
        let count = Arc::new(AtomicUsize::new(0));
        let failing: Arc<dyn Subscriber<u32>> = Arc::new(|_: &u32| -> anyhow::Result<()> { Err(anyhow!("boom")) });
        let failing_id = notifier.subscribe(failing);
        let ok_id = notifier.subscribe(counter_subscriber(count.clone()));

        let report = notifier.notify(1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report.outcome(&ok_id), Some(&Delivery::Delivered));
        assert!(matches!(report.outcome(&failing_id), Some(Delivery::Failed(msg)) if msg.contains("boom")));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_panicking_subscriber_is_contained() {
        let mut notifier = Notifier::new(runtime());
        let count = Arc::new(AtomicUsize::new(0));
        let panicking: Arc<dyn Subscriber<u32>> = Arc::new(|_: &u32| -> anyhow::Result<()> { panic!("subscriber exploded") });
        let panicking_id = notifier.subscribe(panicking);
        notifier.subscribe(counter_subscriber(count.clone()));

        let report = notifier.notify(1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(matches!(
            report.outcome(&panicking_id),
            Some(Delivery::Failed(msg)) if msg.contains("subscriber exploded")
        ));
    }

    #[test]
    fn test_async_and_plain_subscribers_mixed() {
        let mut notifier = Notifier::new(runtime());
        let plain = Arc::new(AtomicUsize::new(0));
        let async_sub = Arc::new(AsyncCounter {
            count: AtomicUsize::new(0),
            last: AtomicUsize::new(0),
        });
        notifier.subscribe(counter_subscriber(plain.clone()));
        notifier.subscribe_async(async_sub.clone());

        let report = notifier.notify(42);

        assert_eq!(plain.load(Ordering::SeqCst), 1);
        assert_eq!(async_sub.count.load(Ordering::SeqCst), 1);
        assert_eq!(async_sub.last.load(Ordering::SeqCst), 42);
        assert_eq!(report.delivered(), 2);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut notifier = Notifier::new(runtime());
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = counter_subscriber(count.clone());

        let first = notifier.subscribe(subscriber.clone());
        let second = notifier.subscribe(subscriber);
        assert_eq!(first, second);
        assert_eq!(notifier.len(), 1);

        notifier.notify(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut notifier = Notifier::new(runtime());
        let count = Arc::new(AtomicUsize::new(0));
        let id = notifier.subscribe(counter_subscriber(count.clone()));

        assert!(notifier.unsubscribe(&id));
        assert!(!notifier.unsubscribe(&id));
        assert!(notifier.is_empty());

        notifier.notify(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_slow_subscriber_times_out() {
        let mut notifier = Notifier::new(runtime()).with_timeout(Duration::from_millis(50));
        let count = Arc::new(AtomicUsize::new(0));
        let slow: Arc<dyn Subscriber<u32>> = Arc::new(|_: &u32| -> anyhow::Result<()> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        let slow_id = notifier.subscribe(slow);
        let fast_id = notifier.subscribe(counter_subscriber(count.clone()));

        let report = notifier.notify(1);

        assert_eq!(report.outcome(&slow_id), Some(&Delivery::TimedOut));
        assert_eq!(report.outcome(&fast_id), Some(&Delivery::Delivered));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_subscribers_run_concurrently() {
        const SUBSCRIBERS: usize = 3;
        // A serial dispatch would never get past the barrier; the timeout
        // turns that into TimedOut outcomes instead of a hung test.
        let mut notifier = Notifier::new(runtime()).with_timeout(Duration::from_secs(5));
        let barrier = Arc::new(Barrier::new(SUBSCRIBERS));
        for _ in 0..SUBSCRIBERS {
            let barrier = barrier.clone();
            notifier.subscribe(Arc::new(move |_: &u32| -> anyhow::Result<()> {
                barrier.wait();
                Ok(())
            }));
        }

        let report = notifier.notify(1);

        assert_eq!(report.delivered(), SUBSCRIBERS);
        assert!(report.is_clean());
    }

    struct Handshake {
        to_plain: mpsc::Sender<()>,
        from_plain: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl AsyncSubscriber<u32> for Handshake {
        async fn handle(&self, _event: Arc<u32>) -> anyhow::Result<()> {
            let reply = self.from_plain.lock().unwrap().take();
            self.to_plain.send(())?;
            match reply {
                Some(reply) => Ok(reply.await?),
                None => Err(anyhow!("handshake already used")),
            }
        }
    }

    #[test]
    fn test_async_and_plain_subscribers_run_concurrently() {
        let mut notifier = Notifier::new(runtime()).with_timeout(Duration::from_secs(5));
        let (to_plain, plain_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = oneshot::channel();

        let handshake = Arc::new(Handshake {
            to_plain,
            from_plain: Mutex::new(Some(reply_rx)),
        });
        let plain_rx = Mutex::new(plain_rx);
        let reply_tx = Mutex::new(Some(reply_tx));
        let plain: Arc<dyn Subscriber<u32>> = Arc::new(move |_: &u32| -> anyhow::Result<()> {
            plain_rx
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))?;
            match reply_tx.lock().unwrap().take() {
                Some(reply) => reply.send(()).map_err(|_| anyhow!("async side went away")),
                None => Err(anyhow!("handshake already used")),
            }
        });

        let async_id = notifier.subscribe_async(handshake);
        let plain_id = notifier.subscribe(plain);

        let report = notifier.notify(1);

        assert_eq!(report.outcome(&async_id), Some(&Delivery::Delivered));
        assert_eq!(report.outcome(&plain_id), Some(&Delivery::Delivered));
    }

    struct AsyncFailing {
        panics: bool,
    }

    #[async_trait]
    impl AsyncSubscriber<u32> for AsyncFailing {
        async fn handle(&self, _event: Arc<u32>) -> anyhow::Result<()> {
            tokio::task::yield_now().await;
            if self.panics {
                panic!("async subscriber exploded");
            }
            Err(anyhow!("async boom"))
        }
    }

    #[test]
    fn test_failing_async_subscribers_are_contained() {
        let mut notifier = Notifier::new(runtime());
        let count = Arc::new(AtomicUsize::new(0));
        let failing_id = notifier.subscribe_async(Arc::new(AsyncFailing { panics: false }));
        let panicking_id = notifier.subscribe_async(Arc::new(AsyncFailing { panics: true }));
        let ok_id = notifier.subscribe(counter_subscriber(count.clone()));

        let report = notifier.notify(1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report.outcome(&ok_id), Some(&Delivery::Delivered));
        assert!(matches!(
            report.outcome(&failing_id),
            Some(Delivery::Failed(msg)) if msg.contains("async boom")
        ));
        assert!(matches!(
            report.outcome(&panicking_id),
            Some(Delivery::Failed(msg)) if msg.contains("async subscriber exploded")
        ));
        assert_eq!(report.failures().count(), 2);
    }

    #[tokio::test]
    async fn test_runtime_dropped_inside_async_context() {
        let mut notifier = Notifier::new(runtime());
        let count = Arc::new(AtomicUsize::new(0));
        notifier.subscribe(counter_subscriber(count.clone()));

        let report = notifier.notify(1);
        assert_eq!(report.delivered(), 1);

        drop(notifier);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
