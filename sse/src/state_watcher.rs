//! Turns "some stored state changed" into notifications.
//!
//! Producers that cannot call `Notifier::notify` at the moment of change (for
//! example a separate process appending rows to a database) can be watched
//! instead: a probe reads the current state on a timer and every observed
//! change becomes one notification.

use crate::error::Error;
use events::{EventCategory, Notifier};
use log::*;
use std::fmt::Display;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Background task polling a state probe and notifying on change.
///
/// The first successful probe only records the baseline. Dropping the
/// watcher stops it as well; `stop` additionally waits for the task to exit.
pub struct StateWatcher {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl StateWatcher {
    /// Spawns the watcher. The probe runs on the runtime's worker threads, so
    /// it should be quick; errors it returns are logged and skipped.
    pub fn spawn<T, E, F>(
        notifier: Notifier,
        category: EventCategory,
        interval: Duration,
        mut probe: F,
    ) -> Result<Self, Error>
    where
        T: PartialEq + Send + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = runtime.spawn(async move {
            debug!("Start state watcher for {}", category);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<T> = None;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {}
                }

                let current = match probe() {
                    Ok(current) => current,
                    Err(e) => {
                        warn!("State probe for {} failed: {}", category, e);
                        continue;
                    }
                };

                match &last {
                    Some(previous) if *previous != current => {
                        debug!("State change detected for {}", category);
                        notifier.notify(category);
                    }
                    _ => {}
                }
                last = Some(current);
            }

            debug!("Stop state watcher for {}", category);
        });

        Ok(Self { stop, task })
    }

    /// Stops the watcher and waits for its task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            error!("State watcher task failed: {}", e);
        }
    }
}
