//! Durable store seam for threads and messages.

mod rest;

pub use rest::RestChatStore;

use crate::error::StoreError;
use crate::window::HistoryWindow;
use async_trait::async_trait;
use hearth_rs_protocol::{MessageRow, ThreadId, UserId};

/// Remote store the coordinator persists to and loads history from.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Look up the thread owned by `user_id` with the given label.
    ///
    /// `Ok(None)` means the query ran and found nothing; errors mean the
    /// store could not be asked.
    async fn find_thread(
        &self,
        user_id: &UserId,
        label: &str,
    ) -> Result<Option<ThreadId>, StoreError>;

    /// Messages of a thread created inside `window`, oldest first.
    async fn load_history(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        window: &HistoryWindow,
    ) -> Result<Vec<MessageRow>, StoreError>;

    /// Insert one message row.
    async fn insert_message(&self, row: &MessageRow) -> Result<(), StoreError>;
}
