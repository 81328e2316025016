//! Error types for the `events` crate.

use std::fmt;

/// Errors a `NotificationQueue` can report while being drained.
///
/// The watcher classifies these to decide how loudly to log; none of them
/// stop the drain loop on their own.
#[derive(Debug)]
pub enum QueueError {
    /// The host clock moved in a way the queue could not handle (seen when
    /// tests freeze or warp time). Transient.
    Clock(String),

    /// The queue was closed, usually because the process is shutting down.
    Closed,

    /// Anything the queue implementation could not classify.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Clock(msg) => write!(f, "Queue clock error: {}", msg),
            QueueError::Closed => write!(f, "Queue is closed"),
            QueueError::Other(err) => write!(f, "Queue error: {}", err),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Returned when a wire tag does not name a known category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown event category: {}", self.0)
    }
}

impl std::error::Error for ParseCategoryError {}
