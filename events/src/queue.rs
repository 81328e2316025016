use crate::error::QueueError;
use crate::{EventCategory, Notification};
use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

/// FIFO of notifications drained by the relay's watcher.
///
/// Implementations must preserve enqueue order and must never block in
/// `try_dequeue`; an empty queue is reported as `Ok(None)`.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Removes the oldest pending notification, if any, without waiting for one.
    async fn try_dequeue(&self) -> Result<Option<Notification>, QueueError>;
}

/// Channel-backed queue for producers living in the same process as the relay.
pub struct ChannelQueue {
    receiver: Mutex<UnboundedReceiver<Notification>>,
}

impl ChannelQueue {
    /// Closes the queue. Notifications already enqueued can still be drained;
    /// after that the queue reports `QueueError::Closed`.
    pub async fn close(&self) {
        self.receiver.lock().await.close();
    }
}

#[async_trait]
impl NotificationQueue for ChannelQueue {
    async fn try_dequeue(&self) -> Result<Option<Notification>, QueueError> {
        let mut receiver = self.receiver.lock().await;
        match receiver.try_recv() {
            Ok(notification) => Ok(Some(notification)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(QueueError::Closed),
        }
    }
}

/// Producer handle. Cheap to clone; hand one to every worker that signals events.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: UnboundedSender<Notification>,
}

impl Notifier {
    /// Enqueue one notification for `category`. There is no acknowledgement:
    /// if the queue is gone the notification is dropped and a warning logged.
    pub fn notify(&self, category: EventCategory) {
        self.send(Notification::Category(category));
    }

    /// Enqueue a raw wire tag, as received from a bridge to another process.
    /// Tags outside the known set are still delivered and counted as unknown.
    pub fn notify_tag(&self, tag: &str) {
        self.send(Notification::from_tag(tag));
    }

    fn send(&self, notification: Notification) {
        trace!("Enqueue notification: {:?}", notification);
        if let Err(e) = self.sender.send(notification) {
            warn!("Failed to enqueue notification {:?}: queue is closed", e.0);
        }
    }
}

/// Creates a connected producer handle and queue.
pub fn channel() -> (Notifier, Arc<ChannelQueue>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Notifier { sender },
        Arc::new(ChannelQueue {
            receiver: Mutex::new(receiver),
        }),
    )
}
