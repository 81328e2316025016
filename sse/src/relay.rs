use crate::connection::SessionRegistry;
use crate::counter::{CounterTable, Snapshot};
use crate::error::Error;
use crate::session::{SessionConfig, StreamSession};
use crate::watcher::{Watcher, WatcherSignal, WatcherState};
use events::NotificationQueue;
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

pub const DEFAULT_WATCHER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Sleep between two drains of the notification queue.
    pub watcher_interval: Duration,
    /// Settings handed to every session the relay opens.
    pub session: SessionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            watcher_interval: DEFAULT_WATCHER_INTERVAL,
            session: SessionConfig::default(),
        }
    }
}

#[derive(Default)]
struct WatcherSlot {
    current: Option<Watcher>,
    // Kept after `term` so the winding-down state stays observable.
    last: Option<Arc<WatcherSignal>>,
}

/// Owns the counter table and the watcher lifecycle, and opens streaming sessions.
///
/// Construct one per process and share it behind an `Arc`. At most one
/// watcher runs at a time: `start` while running and `term` while stopped are
/// both no-ops. Counters live as long as the relay, so a restart keeps them.
pub struct Relay {
    counters: Arc<CounterTable>,
    watcher: Mutex<WatcherSlot>,
    sessions: Arc<SessionRegistry>,
    shutdown: watch::Sender<bool>,
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            counters: Arc::new(CounterTable::new()),
            watcher: Mutex::new(WatcherSlot::default()),
            sessions: Arc::new(SessionRegistry::new()),
            shutdown,
            config,
        }
    }

    /// Starts draining `queue` in the background and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, queue: Arc<dyn NotificationQueue>) -> Result<(), Error> {
        let mut slot = self.lock_watcher();
        if slot.current.is_some() {
            warn!("Notify watch task is already running");
            return Ok(());
        }
        if self.is_shutting_down() {
            warn!("Relay is shutting down, not starting the notify watch task");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let watcher = Watcher::spawn(
            &runtime,
            queue,
            Arc::clone(&self.counters),
            self.config.watcher_interval,
        );
        slot.last = Some(watcher.signal());
        slot.current = Some(watcher);

        Ok(())
    }

    /// Asks the watcher to stop and forgets it. Fire-and-forget: this never
    /// waits for the task to exit, so it cannot hang on a frozen clock.
    pub fn term(&self) {
        Self::stop_current(&mut self.lock_watcher());
    }

    fn stop_current(slot: &mut WatcherSlot) {
        if let Some(watcher) = slot.current.take() {
            info!("Stopping notify watch task");
            watcher.request_stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_watcher().current.is_some()
    }

    /// State of the most recently started watcher, `Idle` if none was started.
    pub fn watcher_state(&self) -> WatcherState {
        self.lock_watcher()
            .last
            .as_ref()
            .map(|signal| signal.state())
            .unwrap_or(WatcherState::Idle)
    }

    pub fn counters(&self) -> &CounterTable {
        &self.counters
    }

    pub fn snapshot(&self) -> Snapshot {
        self.counters.snapshot()
    }

    /// Opens a streaming session whose baseline is the current counter state.
    /// `count` bounds the number of real events; `None` or `Some(0)` is unbounded.
    pub fn open_session(&self, count: Option<u64>) -> StreamSession {
        let registration = self.sessions.register(count);
        info!(
            "Opened event stream session {} (count: {:?}, {} active)",
            registration.id().as_str(),
            count,
            self.sessions.len()
        );

        StreamSession::new(
            Arc::clone(&self.counters),
            count,
            self.config.session.clone(),
            self.shutdown.subscribe(),
            registration,
        )
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Stops the watcher and ends every open session. Sessions opened
    /// afterwards end on their first poll.
    pub fn shutdown(&self) {
        // A concurrent `start` either sees the flag or is stopped here.
        {
            let mut slot = self.lock_watcher();
            self.shutdown.send_replace(true);
            Self::stop_current(&mut slot);
        }
        info!(
            "Relay shut down, closing {} event stream session(s)",
            self.sessions.len()
        );
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn lock_watcher(&self) -> MutexGuard<'_, WatcherSlot> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
