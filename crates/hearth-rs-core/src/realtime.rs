//! Realtime change-feed seam and an in-process broadcast implementation.
//!
//! A transport bridge (or an embedded store) publishes row inserts into a
//! `ChangeFeedBus`; each subscription only yields rows of its thread.

use crate::error::StoreError;
use async_trait::async_trait;
use hearth_rs_protocol::{ChangeEvent, MessageRow, ThreadId};
use log::{debug, warn};
use tokio::sync::broadcast;

/// Source of realtime insert notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to inserts for one thread.
    async fn subscribe(&self, thread_id: &ThreadId) -> Result<ChangeStream, StoreError>;
}

/// Live subscription scoped to one thread.
#[derive(Debug)]
pub struct ChangeStream {
    thread_id: ThreadId,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeStream {
    pub fn new(thread_id: ThreadId, receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            thread_id,
            receiver,
        }
    }

    /// Next inserted row for this thread; `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<MessageRow> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.thread_id == self.thread_id => return Some(event.row),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "change feed lagged (thread_id={}, skipped={})",
                        self.thread_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Broadcast-backed change feed.
#[derive(Clone, Debug)]
pub struct ChangeFeedBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeedBus {
    /// Create a new feed with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("change feed initialized (buffer={})", buffer);
        Self { sender }
    }

    /// Publish an insert; returns how many subscriptions received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

#[async_trait]
impl ChangeFeed for ChangeFeedBus {
    async fn subscribe(&self, thread_id: &ThreadId) -> Result<ChangeStream, StoreError> {
        debug!("change feed subscription opened (thread_id={})", thread_id);
        Ok(ChangeStream::new(thread_id.clone(), self.sender.subscribe()))
    }
}
