//! Event categories and the notification queue shared by producers and the relay.
//!
//! This crate provides the producer-facing half of the event relay: the closed
//! set of categories a worker can signal, and the queue that carries those
//! signals to the relay's watcher task.
//!
//! # Architecture
//!
//! - **EventCategory**: Closed enum of the state-change categories clients can subscribe to
//! - **Notification**: A single queued tag; unrecognized tags are kept so they can be
//!   counted in the catch-all slot instead of being rejected
//! - **NotificationQueue**: Trait the watcher drains; implemented here by `ChannelQueue`
//! - **Notifier**: Cloneable producer handle, fire-and-forget
//!
//! This crate has no dependencies on internal crates, so any worker can signal
//! events without pulling in the HTTP or streaming layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod error;
pub mod queue;

pub use error::{ParseCategoryError, QueueError};
pub use queue::{channel, ChannelQueue, NotificationQueue, Notifier};

/// State-change categories that can be signalled to connected clients.
///
/// The declaration order is the order in which streaming sessions examine
/// categories, and each variant's ordinal is its counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Control,
    Schedule,
    Log,
}

impl EventCategory {
    /// Every known category in slot order.
    pub const ALL: [EventCategory; 3] = [
        EventCategory::Control,
        EventCategory::Schedule,
        EventCategory::Log,
    ];

    /// Number of known categories.
    pub const COUNT: usize = Self::ALL.len();

    /// Counter slot used for this category.
    pub fn index(self) -> usize {
        match self {
            EventCategory::Control => 0,
            EventCategory::Schedule => 1,
            EventCategory::Log => 2,
        }
    }

    /// Wire identifier, as sent in `data:` frames.
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Control => "control",
            EventCategory::Schedule => "schedule",
            EventCategory::Log => "log",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = ParseCategoryError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "control" => Ok(EventCategory::Control),
            "schedule" => Ok(EventCategory::Schedule),
            "log" => Ok(EventCategory::Log),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

/// Counter slot reserved for tags outside the known set.
pub const UNKNOWN_INDEX: usize = EventCategory::COUNT;

/// A single message carried by a `NotificationQueue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Category(EventCategory),
    /// A tag no known category matches. Bridges from other processes may
    /// forward raw tags; these are counted in the catch-all slot.
    Unrecognized(String),
}

impl Notification {
    /// Builds a notification from a raw wire tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag.parse::<EventCategory>() {
            Ok(category) => Notification::Category(category),
            Err(_) => Notification::Unrecognized(tag.to_string()),
        }
    }

    /// Counter slot this notification increments.
    pub fn index(&self) -> usize {
        match self {
            Notification::Category(category) => category.index(),
            Notification::Unrecognized(_) => UNKNOWN_INDEX,
        }
    }

    pub fn category(&self) -> Option<EventCategory> {
        match self {
            Notification::Category(category) => Some(*category),
            Notification::Unrecognized(_) => None,
        }
    }
}

impl From<EventCategory> for Notification {
    fn from(category: EventCategory) -> Self {
        Notification::Category(category)
    }
}
