use config::Config;
use events::{ChannelQueue, Notifier};
use log::info;
use sse::{Relay, StateWatcher};
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Builds the process-wide relay and the in-process queue feeding it, and
/// starts the watcher. Must run inside the tokio runtime.
pub fn init_relay(config: &Config) -> Result<(Arc<Relay>, Notifier, Arc<ChannelQueue>), sse::Error> {
    let relay_config = config.relay_config();
    info!(
        "Relay config: watcher_interval={:?}, poll_interval={:?}, heartbeat_cycles={}, \
         prime_with_heartbeat={}",
        relay_config.watcher_interval,
        relay_config.session.poll_interval,
        relay_config.session.heartbeat_cycles,
        relay_config.session.prime_with_heartbeat,
    );

    let relay = Arc::new(Relay::new(relay_config));
    let (notifier, queue) = events::channel();
    relay.start(queue.clone())?;

    Ok((relay, notifier, queue))
}

/// Spawns one state watcher per `--watch` target. A target counts as changed
/// when its length or modification time differs from the previous check.
pub fn init_file_watchers(
    config: &Config,
    notifier: &Notifier,
) -> Result<Vec<StateWatcher>, sse::Error> {
    config
        .watch
        .iter()
        .map(|target| {
            info!("Watching {} for {} changes", target.path.display(), target.category);
            let path = target.path.clone();
            StateWatcher::spawn(
                notifier.clone(),
                target.category,
                config.watch_interval(),
                move || {
                    std::fs::metadata(&path)
                        .and_then(|metadata| Ok((metadata.len(), metadata.modified()?)))
                        .map_err(|e| format!("{}: {}", path.display(), e))
                },
            )
        })
        .collect()
}

// Service-level state shared with every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, relay: &Arc<Relay>) -> Self {
        Self {
            relay: Arc::clone(relay),
            config: app_config,
        }
    }

    pub fn relay_ref(&self) -> &Relay {
        self.relay.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use events::{EventCategory, Notification, NotificationQueue};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_relay_starts_watcher_fed_by_notifier() {
        let config = Config::try_parse_from(["event_relay", "--watcher-interval-ms", "10"]).unwrap();

        let (relay, notifier, _queue) = init_relay(&config).unwrap();
        assert!(relay.is_running());

        notifier.notify(EventCategory::Control);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(relay.snapshot().get(EventCategory::Control), 1);

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_app_state_shares_one_relay() {
        let config = Config::try_parse_from(["event_relay"]).unwrap();
        let (relay, _notifier, _queue) = init_relay(&config).unwrap();

        let app_state = AppState::new(config, &relay);
        let cloned = app_state.clone();

        assert!(Arc::ptr_eq(&app_state.relay, &cloned.relay));
        assert!(std::ptr::eq(app_state.relay_ref(), relay.as_ref()));

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_file_watcher_notifies_when_file_grows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "first line\n").unwrap();

        let target = format!("log={}", path.display());
        let config = Config::try_parse_from([
            "event_relay",
            "--watch",
            target.as_str(),
            "--watch-interval-ms",
            "10",
        ])
        .unwrap();
        let (notifier, queue) = events::channel();

        let watchers = init_file_watchers(&config, &notifier).unwrap();
        assert_eq!(watchers.len(), 1);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "second line").unwrap();
        drop(file);
        tokio::time::sleep(Duration::from_millis(100)).await;

        for watcher in watchers {
            watcher.stop().await;
        }

        assert_eq!(
            queue.try_dequeue().await.unwrap(),
            Some(Notification::Category(EventCategory::Log))
        );
    }

    #[tokio::test]
    async fn test_file_watcher_survives_missing_file() {
        let dir = TempDir::new().unwrap();
        let target = format!("control={}", dir.path().join("control.json").display());
        let config = Config::try_parse_from([
            "event_relay",
            "--watch",
            target.as_str(),
            "--watch-interval-ms",
            "10",
        ])
        .unwrap();
        let (notifier, queue) = events::channel();

        let watchers = init_file_watchers(&config, &notifier).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        for watcher in watchers {
            watcher.stop().await;
        }

        assert_eq!(queue.try_dequeue().await.unwrap(), None);
    }
}
