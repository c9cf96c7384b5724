//! Outbound message queue contract.
//!
//! From the engine's point of view the queue is append-only; ordering and
//! backpressure belong to the implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{GeotrackError, Result};
use crate::message::OutboundMessage;

/// Sink for finished messages.
#[async_trait]
pub trait OutboundQueue: Send + Sync {
    /// Hand a message to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`GeotrackError::QueueError`] if the queue no longer accepts
    /// messages.
    async fn enqueue(&self, message: OutboundMessage) -> Result<()>;
}

/// Queue backed by a bounded tokio channel.
///
/// A full channel suspends `enqueue` until the consumer catches up.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    sender: mpsc::Sender<OutboundMessage>,
}

impl ChannelQueue {
    /// Create a queue and the receiver its consumer drains.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl OutboundQueue for ChannelQueue {
    async fn enqueue(&self, message: OutboundMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|e| GeotrackError::QueueError(format!("consumer gone, dropped {}", e.0.kind())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBuilder;

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let (queue, mut rx) = ChannelQueue::new(4);
        queue.enqueue(MessageBuilder::waypoint_list(&[])).await.unwrap();
        queue
            .enqueue(MessageBuilder::waypoint_list(&[]))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().kind(), "waypoints");
        assert_eq!(rx.recv().await.unwrap().kind(), "waypoints");
    }

    #[tokio::test]
    async fn test_closed_receiver_is_queue_error() {
        let (queue, rx) = ChannelQueue::new(1);
        drop(rx);
        let err = queue
            .enqueue(MessageBuilder::waypoint_list(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, GeotrackError::QueueError(_)));
    }
}
