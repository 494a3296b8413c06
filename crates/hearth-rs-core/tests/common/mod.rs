#![allow(dead_code)]

use hearth_rs_core::{ChangeFeedBus, ChatSession, ResponseGenerator, RetryPolicy, SessionOptions};
use hearth_rs_protocol::{Message, Role, SessionEvent};
use hearth_rs_test_utils::{MemoryChatStore, RecordingSink, row};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const USER: &str = "u-1";
pub const THREAD: &str = "t-1";

pub fn options() -> SessionOptions {
    SessionOptions {
        retry: RetryPolicy {
            attempts: 2,
            backoff: Duration::ZERO,
        },
        ..SessionOptions::default()
    }
}

pub fn store() -> MemoryChatStore {
    MemoryChatStore::new().with_thread(USER, "primary", THREAD)
}

pub fn session(
    store: MemoryChatStore,
    feed: ChangeFeedBus,
    generator: impl ResponseGenerator + 'static,
) -> (ChatSession, Arc<Mutex<Vec<SessionEvent>>>) {
    let (sink, events) = RecordingSink::new();
    let session = ChatSession::new(
        Arc::new(store),
        Arc::new(feed),
        Arc::new(generator),
        Arc::new(sink),
        options(),
    );
    (session, events)
}

/// Publish a marker row and wait until the feed task merged it, so every
/// earlier feed event has been handled.
pub async fn drain_feed(session: &ChatSession, feed: &ChangeFeedBus, marker: &str) {
    let marker_row = row(marker, THREAD, "assistant", "marker", chrono::Utc::now());
    feed.publish(hearth_rs_protocol::ChangeEvent {
        thread_id: hearth_rs_protocol::ThreadId::new(THREAD),
        row: marker_row,
    });
    wait_until(|| session.messages().iter().any(|m| m.id == marker)).await;
}

pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub fn count(messages: &[Message], role: Role, content: &str) -> usize {
    messages
        .iter()
        .filter(|m| m.role == role && m.content == content)
        .count()
}

pub fn is_sorted(messages: &[Message]) -> bool {
    messages
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp)
}
