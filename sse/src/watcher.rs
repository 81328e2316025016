//! Background task that drains the notification queue into the counter table.
//!
//! ```text
//! Notifier ──► NotificationQueue ──► drain() ──► CounterTable::increment()
//!                                      │
//!                                 sleep(interval)
//! ```
//!
//! Each call to `Watcher::spawn` creates a new generation with its own stop
//! flag, so a watcher that is still winding down after `request_stop` can
//! never be revived by a later restart.

use crate::counter::CounterTable;
use events::{NotificationQueue, QueueError};
use log::*;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Upper bound on notifications applied in one cycle, so a flooding producer
/// cannot keep the loop from seeing its stop flag.
const MAX_DRAIN_PER_CYCLE: usize = 1024;

/// Lifecycle of a watcher generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl WatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => WatcherState::Running,
            2 => WatcherState::Stopping,
            3 => WatcherState::Stopped,
            _ => WatcherState::Idle,
        }
    }
}

/// Stop flag and observable state shared between a controller and its task.
#[derive(Debug)]
pub(crate) struct WatcherSignal {
    stop: AtomicBool,
    state: AtomicU8,
}

impl WatcherSignal {
    fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            state: AtomicU8::new(WatcherState::Idle as u8),
        }
    }

    pub(crate) fn state(&self) -> WatcherState {
        WatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WatcherState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Handle to one running watcher generation.
pub(crate) struct Watcher {
    signal: Arc<WatcherSignal>,
}

impl Watcher {
    /// Spawns the drain task on `runtime` and returns immediately.
    pub(crate) fn spawn(
        runtime: &Handle,
        queue: Arc<dyn NotificationQueue>,
        counters: Arc<CounterTable>,
        interval: Duration,
    ) -> Self {
        let signal = Arc::new(WatcherSignal::new());
        signal.set_state(WatcherState::Running);

        // The JoinHandle is dropped on purpose: stopping never joins.
        runtime.spawn(drain(queue, counters, Arc::clone(&signal), interval));

        Self { signal }
    }

    /// Raises the stop flag. Does not wait for the task to exit.
    pub(crate) fn request_stop(&self) {
        self.signal.stop.store(true, Ordering::Release);
        let _ = self.signal.state.compare_exchange(
            WatcherState::Running as u8,
            WatcherState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn signal(&self) -> Arc<WatcherSignal> {
        Arc::clone(&self.signal)
    }
}

async fn drain(
    queue: Arc<dyn NotificationQueue>,
    counters: Arc<CounterTable>,
    signal: Arc<WatcherSignal>,
    interval: Duration,
) {
    info!("Start notify watch task");

    let mut closed_reported = false;

    while !signal.should_stop() {
        for _ in 0..MAX_DRAIN_PER_CYCLE {
            if signal.should_stop() {
                break;
            }
            match queue.try_dequeue().await {
                Ok(Some(notification)) => {
                    let value = counters.increment(notification.clone());
                    trace!("Counted {:?} (now {})", notification, value);
                    closed_reported = false;
                }
                Ok(None) => break,
                Err(QueueError::Clock(msg)) => {
                    debug!("Notification queue clock error, retrying: {}", msg);
                    break;
                }
                Err(QueueError::Closed) => {
                    if closed_reported {
                        debug!("Notification queue still closed");
                    } else {
                        warn!("Notification queue closed while the watcher is running");
                        closed_reported = true;
                    }
                    break;
                }
                Err(e @ QueueError::Other(_)) => {
                    error!("Unexpected notification queue error, continuing: {}", e);
                    break;
                }
            }
        }

        tokio::time::sleep(interval).await;
    }

    signal.set_state(WatcherState::Stopped);
    info!("Stop notify watch task");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use events::{EventCategory, Notification};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU64;
    use std::sync::{Mutex, OnceLock};

    const INTERVAL: Duration = Duration::from_millis(10);

    /// Queue replaying a fixed script of results, then reporting empty.
    struct ScriptedQueue {
        script: Mutex<VecDeque<Result<Option<Notification>, QueueError>>>,
    }

    impl ScriptedQueue {
        fn new(script: Vec<Result<Option<Notification>, QueueError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl NotificationQueue for ScriptedQueue {
        async fn try_dequeue(&self) -> Result<Option<Notification>, QueueError> {
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    /// Never runs dry; raises the watcher's stop flag on the `stop_at`-th dequeue.
    struct FloodQueue {
        dequeued: AtomicU64,
        stop_at: u64,
        signal: OnceLock<Arc<WatcherSignal>>,
    }

    #[async_trait]
    impl NotificationQueue for FloodQueue {
        async fn try_dequeue(&self) -> Result<Option<Notification>, QueueError> {
            let dequeued = self.dequeued.fetch_add(1, Ordering::AcqRel) + 1;
            if dequeued == self.stop_at {
                if let Some(signal) = self.signal.get() {
                    signal.stop.store(true, Ordering::Release);
                }
            }
            Ok(Some(Notification::Category(EventCategory::Log)))
        }
    }

    async fn wait_for_state(signal: &WatcherSignal, expected: WatcherState) {
        for _ in 0..100 {
            if signal.state() == expected {
                return;
            }
            tokio::time::sleep(INTERVAL).await;
        }
        panic!("watcher never reached {:?}", expected);
    }

    #[tokio::test]
    async fn test_drains_queue_into_counters() {
        let (notifier, queue) = events::channel();
        let counters = Arc::new(CounterTable::new());

        notifier.notify(EventCategory::Schedule);
        notifier.notify(EventCategory::Control);
        notifier.notify(EventCategory::Schedule);

        let watcher = Watcher::spawn(&Handle::current(), queue, Arc::clone(&counters), INTERVAL);
        tokio::time::sleep(INTERVAL * 5).await;

        assert_eq!(counters.snapshot(), [1, 2, 0, 0]);

        watcher.request_stop();
        wait_for_state(&watcher.signal(), WatcherState::Stopped).await;
    }

    #[tokio::test]
    async fn test_request_stop_moves_through_stopping_to_stopped() {
        let (_notifier, queue) = events::channel();
        let counters = Arc::new(CounterTable::new());

        let watcher = Watcher::spawn(&Handle::current(), queue, counters, INTERVAL);
        let signal = watcher.signal();
        assert_eq!(signal.state(), WatcherState::Running);

        watcher.request_stop();
        assert_ne!(signal.state(), WatcherState::Running);

        wait_for_state(&signal, WatcherState::Stopped).await;
    }

    #[tokio::test]
    async fn test_transient_and_unclassified_errors_do_not_stop_the_loop() {
        let queue = Arc::new(ScriptedQueue::new(vec![
            Err(QueueError::Clock("time moved backwards".to_string())),
            Ok(Some(Notification::Category(EventCategory::Log))),
            Err(QueueError::Closed),
            Err(QueueError::Other("disk on fire".into())),
            Ok(Some(Notification::from_tag("content"))),
        ]));
        let counters = Arc::new(CounterTable::new());

        let watcher = Watcher::spawn(&Handle::current(), queue, Arc::clone(&counters), INTERVAL);
        tokio::time::sleep(INTERVAL * 10).await;

        assert_eq!(watcher.signal().state(), WatcherState::Running);
        assert_eq!(counters.snapshot(), [0, 0, 1, 1]);

        watcher.request_stop();
        wait_for_state(&watcher.signal(), WatcherState::Stopped).await;
    }

    #[tokio::test]
    async fn test_stop_is_honoured_in_the_middle_of_a_drain() {
        let queue = Arc::new(FloodQueue {
            dequeued: AtomicU64::new(0),
            stop_at: 10,
            signal: OnceLock::new(),
        });
        let counters = Arc::new(CounterTable::new());

        // The current-thread runtime only runs the task once this test yields.
        let watcher = Watcher::spawn(
            &Handle::current(),
            Arc::clone(&queue) as Arc<dyn NotificationQueue>,
            Arc::clone(&counters),
            INTERVAL,
        );
        let _ = queue.signal.set(watcher.signal());

        wait_for_state(&watcher.signal(), WatcherState::Stopped).await;

        assert_eq!(queue.dequeued.load(Ordering::Acquire), 10);
        assert_eq!(counters.get(EventCategory::Log), 10);
    }
}
