//! Hearth session coordinator and the adapters it talks to.
//!
//! The coordinator (`ChatSession`) depends only on three seams:
//! `ChatStore` for durable threads and messages, `ChangeFeed` for realtime
//! inserts, and `ResponseGenerator` for replies. `RestChatStore` and
//! `WebhookClient` are the HTTP implementations used by the binary.

pub mod error;
pub mod events;
pub mod extract;
pub mod generator;
#[cfg(test)]
mod http_stub;
pub mod notice;
pub mod realtime;
pub mod retry;
pub mod session;
pub mod store;
pub mod window;

pub use error::{GenerateError, SessionError, StoreError};
pub use events::EventBus;
pub use extract::{Extraction, extract};
pub use generator::{ResponseGenerator, WebhookClient};
pub use notice::FailureKind;
pub use realtime::{ChangeFeed, ChangeFeedBus, ChangeStream};
pub use retry::{RetryPolicy, with_retry};
pub use session::{ChatSession, ReplyKind, SendOutcome, SessionOptions};
pub use store::{ChatStore, RestChatStore};
pub use window::HistoryWindow;
