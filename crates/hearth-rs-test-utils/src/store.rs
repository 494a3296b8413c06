use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::generator::Gate;
use hearth_rs_core::{ChangeFeedBus, ChatStore, HistoryWindow, StoreError};
use hearth_rs_protocol::{ChangeEvent, MessageRow, ThreadId, UserId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Build a stored row for `thread_id`.
pub fn row(
    id: &str,
    thread_id: &str,
    role: &str,
    content: &str,
    created_at: DateTime<Utc>,
) -> MessageRow {
    MessageRow {
        id: id.to_string(),
        thread_id: Some(ThreadId::new(thread_id)),
        user_id: None,
        content: content.to_string(),
        role: role.to_string(),
        created_at,
    }
}

#[derive(Default)]
struct StoreState {
    threads: Vec<(UserId, String, ThreadId)>,
    rows: Vec<MessageRow>,
    inserted: Vec<MessageRow>,
    lookups: usize,
    history_loads: usize,
    failing_lookups: usize,
    unreachable: bool,
    failing_inserts: bool,
    history_error: Option<StoreError>,
    lookup_gate: Option<Gate>,
}

/// In-memory `ChatStore` that optionally echoes inserts over a change feed.
#[derive(Clone, Default)]
pub struct MemoryChatStore {
    state: Arc<Mutex<StoreState>>,
    feed: Option<ChangeFeedBus>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(self, user_id: &str, label: &str, thread_id: &str) -> Self {
        self.add_thread(user_id, label, thread_id);
        self
    }

    pub fn with_rows(self, rows: Vec<MessageRow>) -> Self {
        self.state.lock().rows.extend(rows);
        self
    }

    /// Publish every successful insert on `feed`, like a realtime backend.
    pub fn with_feed(mut self, feed: ChangeFeedBus) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn failing_inserts(self) -> Self {
        self.state.lock().failing_inserts = true;
        self
    }

    /// Every thread lookup fails with a transport error.
    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }

    /// The next `count` thread lookups fail with a transport error.
    pub fn failing_lookups(self, count: usize) -> Self {
        self.state.lock().failing_lookups = count;
        self
    }

    /// The first thread lookup waits until the returned gate is released.
    pub fn gated_lookup(self) -> (Self, Gate) {
        let gate = Gate::default();
        self.state.lock().lookup_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn failing_history(self, error: StoreError) -> Self {
        self.state.lock().history_error = Some(error);
        self
    }

    pub fn add_thread(&self, user_id: &str, label: &str, thread_id: &str) {
        self.state.lock().threads.push((
            user_id.to_string(),
            label.to_string(),
            ThreadId::new(thread_id),
        ));
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn inserted(&self) -> Vec<MessageRow> {
        self.state.lock().inserted.clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.state.lock().lookups
    }

    pub fn history_count(&self) -> usize {
        self.state.lock().history_loads
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn find_thread(
        &self,
        user_id: &UserId,
        label: &str,
    ) -> Result<Option<ThreadId>, StoreError> {
        let gate = self.state.lock().lookup_gate.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let mut state = self.state.lock();
        state.lookups += 1;
        if state.unreachable {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        if state.failing_lookups > 0 {
            state.failing_lookups -= 1;
            return Err(StoreError::Transport("connection reset".to_string()));
        }
        Ok(state
            .threads
            .iter()
            .find(|(user, thread_label, _)| user == user_id && thread_label == label)
            .map(|(_, _, thread_id)| thread_id.clone()))
    }

    async fn load_history(
        &self,
        _user_id: &UserId,
        thread_id: &ThreadId,
        window: &HistoryWindow,
    ) -> Result<Vec<MessageRow>, StoreError> {
        let mut state = self.state.lock();
        state.history_loads += 1;
        if let Some(err) = state.history_error.clone() {
            return Err(err);
        }
        let mut rows: Vec<MessageRow> = state
            .rows
            .iter()
            .chain(state.inserted.iter())
            .filter(|row| row.thread_id.as_ref() == Some(thread_id))
            .filter(|row| window.contains(row.created_at))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.created_at);
        Ok(rows)
    }

    async fn insert_message(&self, row: &MessageRow) -> Result<(), StoreError> {
        {
            let mut state = self.state.lock();
            if state.failing_inserts {
                return Err(StoreError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            state.inserted.push(row.clone());
        }
        if let (Some(feed), Some(thread_id)) = (&self.feed, &row.thread_id) {
            feed.publish(ChangeEvent {
                thread_id: thread_id.clone(),
                row: row.clone(),
            });
        }
        Ok(())
    }
}
