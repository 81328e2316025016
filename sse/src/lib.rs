//! Server-Sent Events (SSE) relay for state-change notifications.
//!
//! This crate turns fire-and-forget category signals from any worker into a
//! live `text/event-stream` per connected client.
//!
//! # Architecture
//!
//! - **Counter table**: one monotonically increasing counter per event
//!   category plus a catch-all slot. Written only by the watcher, read by
//!   every session through atomics, so no lock is involved.
//! - **Watcher**: a single background task draining the injected
//!   `NotificationQueue` and bumping counters. Started and stopped through
//!   the relay; stopping is fire-and-forget.
//! - **Sessions**: one per client. Each keeps a private baseline and polls
//!   the counter table, so there is no per-client channel and no fan-out.
//! - **Ephemeral events**: clients that connect late see nothing that
//!   happened before they connected. Bursts between two polls are coalesced.
//!
//! # Message Flow
//!
//! 1. A worker calls `Notifier::notify(EventCategory::Log)`
//! 2. The watcher dequeues it within one watcher interval and increments the
//!    `log` counter
//! 3. Every open session sees the counter differ from its baseline on its
//!    next poll and yields `data: log\n\n`
//! 4. After enough idle polls a session yields `data: dummy\n\n` so a dead
//!    client is noticed by the transport
//!
//! # Example
//!
//! ```rust,ignore
//! use sse::{Relay, RelayConfig};
//! use std::sync::Arc;
//!
//! let relay = Arc::new(Relay::new(RelayConfig::default()));
//! let (notifier, queue) = events::channel();
//! relay.start(queue)?;
//!
//! // In a worker
//! notifier.notify(events::EventCategory::Schedule);
//!
//! // In an HTTP handler
//! let frames = relay.open_session(Some(2)).into_stream();
//! ```
//!
//! # Modules
//!
//! - `counter`: CounterTable and its point-in-time Snapshot
//! - `watcher`: the queue drain task and its lifecycle states
//! - `relay`: Relay, the lifecycle controller and session factory
//! - `session`: StreamSession, the per-client polling state machine
//! - `connection`: registry of active sessions
//! - `message`: wire frames
//! - `state_watcher`: notify on changes of externally stored state

pub mod connection;
pub mod counter;
pub mod error;
pub mod message;
pub mod relay;
pub mod session;
pub mod state_watcher;
pub mod watcher;

pub use counter::{CounterTable, Snapshot};
pub use error::Error;
pub use message::Frame;
pub use relay::{Relay, RelayConfig};
pub use session::{SessionConfig, StreamSession};
pub use state_watcher::StateWatcher;
pub use watcher::WatcherState;
