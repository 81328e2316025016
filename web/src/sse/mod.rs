//! Event stream HTTP handler for the web layer.
//!
//! Only the Axum handler lives here. Sessions, counters and the watcher are
//! in the `sse` crate.

pub(crate) mod handler;
