//! Per-client streaming session.
//!
//! A session keeps a private baseline copy of the counter table and, once per
//! poll interval, compares it against the live table. Every category whose
//! counter moved yields exactly one frame no matter how far it moved, which is
//! what coalesces bursts. Idle polls accumulate towards a heartbeat frame so
//! the transport gets a chance to notice a client that has gone away.
//!
//! `poll_once` is the whole state machine and never sleeps; `into_stream`
//! wraps it with the timer and the shutdown signal.

use crate::connection::{Registration, SessionId};
use crate::counter::{CounterTable, Snapshot};
use crate::message::Frame;
use async_stream::stream;
use events::EventCategory;
use futures::Stream;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_HEARTBEAT_CYCLES: u32 = 100;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time between two looks at the counter table.
    pub poll_interval: Duration,
    /// Idle polls, counted since the last heartbeat, before the next heartbeat frame
    /// is sent. Polls that yield events neither count nor reset. Zero disables heartbeats.
    pub heartbeat_cycles: u32,
    /// Send one heartbeat as soon as the stream opens, so proxies flush headers.
    pub prime_with_heartbeat: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_cycles: DEFAULT_HEARTBEAT_CYCLES,
            prime_with_heartbeat: false,
        }
    }
}

pub struct StreamSession {
    counters: Arc<CounterTable>,
    baseline: Snapshot,
    quota: Option<u64>,
    emitted: u64,
    idle_cycles: u32,
    finished: bool,
    config: SessionConfig,
    shutdown: watch::Receiver<bool>,
    registration: Registration,
}

impl StreamSession {
    /// `count` of `None` or `Some(0)` means the session never ends on its own.
    pub(crate) fn new(
        counters: Arc<CounterTable>,
        count: Option<u64>,
        config: SessionConfig,
        shutdown: watch::Receiver<bool>,
        registration: Registration,
    ) -> Self {
        let baseline = counters.snapshot();
        Self {
            counters,
            baseline,
            quota: count.filter(|&count| count > 0),
            emitted: 0,
            idle_cycles: 0,
            finished: false,
            config,
            shutdown,
            registration,
        }
    }

    pub fn id(&self) -> &SessionId {
        self.registration.id()
    }

    /// Real (non-heartbeat) frames emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Runs one poll iteration against the live counters without sleeping.
    ///
    /// Categories are examined in `EventCategory::ALL` order. When the quota is
    /// reached the session finishes right after that frame and the remaining
    /// categories are not examined.
    pub fn poll_once(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }

        for category in EventCategory::ALL {
            let current = self.counters.get(category);
            if current == self.baseline.get(category) {
                continue;
            }

            debug!("notify event: {}", category);
            frames.push(Frame::Event(category));
            self.baseline.set(category, current);
            self.emitted += 1;

            if self.quota.is_some_and(|quota| self.emitted >= quota) {
                debug!(
                    "Session {} reached its quota of {} events",
                    self.id().as_str(),
                    self.emitted
                );
                self.finished = true;
                return frames;
            }
        }

        if frames.is_empty() {
            self.idle_cycles += 1;
            if self.config.heartbeat_cycles > 0 && self.idle_cycles >= self.config.heartbeat_cycles
            {
                self.idle_cycles = 0;
                frames.push(Frame::Heartbeat);
            }
        }

        frames
    }

    /// Sleeps one poll interval, then polls. Returns `None` once the session
    /// is finished or the relay is shutting down.
    pub async fn next_frames(&mut self) -> Option<Vec<Frame>> {
        if self.finished {
            return None;
        }

        let interval = self.config.poll_interval;
        let stopping = tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            // An error means the relay itself is gone, which ends the session too.
            _ = self.shutdown.wait_for(|stopping| *stopping) => true,
        };

        if stopping {
            debug!("Session {} ended by relay shutdown", self.id().as_str());
            self.finished = true;
            return None;
        }

        Some(self.poll_once())
    }

    /// Turns the session into a lazy, non-restartable stream of frames.
    /// Dropping the stream (e.g. on client disconnect) ends the session.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send + 'static {
        let mut session = self;
        stream! {
            if session.config.prime_with_heartbeat {
                yield Frame::Heartbeat;
            }

            while let Some(frames) = session.next_frames().await {
                for frame in frames {
                    yield frame;
                }
            }

            debug!(
                "Event stream {} closed after {} events",
                session.id().as_str(),
                session.emitted
            );
        }
    }
}
