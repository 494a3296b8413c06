//! Chat session coordinator.
//!
//! A `ChatSession` owns the visible message list for one signed-in user and
//! keeps it consistent across three writers: local sends, the history window
//! loaded at sign-in, and realtime inserts pushed by the change feed. Store
//! writes are spawned and never block the conversation; the responder call is
//! the only suspension point a send waits on.

mod timeline;

use crate::error::SessionError;
use crate::extract::{Extraction, extract};
use crate::generator::ResponseGenerator;
use crate::notice::{self, FailureKind};
use crate::realtime::ChangeFeed;
use crate::retry::{RetryPolicy, with_retry};
use crate::store::ChatStore;
use crate::window::HistoryWindow;
use hearth_rs_config::HearthConfig;
use hearth_rs_protocol::{
    ChatMode, EventSink, Message, MessageRow, SessionEvent, SessionId, SessionState, ThreadId,
    ThreadUnavailable, UserId, WebhookRequest,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use timeline::Timeline;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

/// Settings that shape one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Label of the thread resolved at sign-in.
    pub thread_label: String,
    /// Initial responder mode.
    pub mode: ChatMode,
    /// Retry applied to thread lookup and history loads.
    pub retry: RetryPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            thread_label: "primary".to_string(),
            mode: ChatMode::Production,
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &HearthConfig) -> Self {
        Self {
            thread_label: config.session.thread_label.clone(),
            mode: config.session.mode,
            retry: RetryPolicy::from(&config.backend.retry),
        }
    }
}

/// How the reply in a `SendOutcome` came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// The responder produced content.
    Generated,
    /// The responder answered with an empty body.
    NoContent,
    /// The exchange failed; the reply carries the notice for this category.
    Failed(FailureKind),
}

/// Result of a completed send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// The user message shown in the list, `None` for silent sends.
    pub user: Option<Message>,
    /// Assistant reply or failure notice.
    pub reply: Message,
    pub kind: ReplyKind,
}

struct SessionCore {
    epoch: u64,
    user_id: Option<UserId>,
    thread_id: Option<ThreadId>,
    state: SessionState,
    timeline: Timeline,
    session_id: SessionId,
    mode: ChatMode,
    sending: Option<u64>,
    feed_task: Option<JoinHandle<()>>,
}

impl SessionCore {
    fn set_state(&mut self, state: SessionState, events: &mut Vec<SessionEvent>) {
        if self.state == state {
            return;
        }
        debug!(
            "session state changed (session_id={}, from={:?}, to={:?})",
            self.session_id, self.state, state
        );
        self.state = state.clone();
        events.push(SessionEvent::StateChanged {
            session_id: self.session_id,
            state,
        });
    }

    fn messages_changed(&self, events: &mut Vec<SessionEvent>) {
        events.push(SessionEvent::MessagesChanged {
            session_id: self.session_id,
            thread_id: self.thread_id.clone(),
            messages: self.timeline.snapshot(),
        });
    }

    fn stop_feed(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
    }
}

struct Inner {
    store: Arc<dyn ChatStore>,
    feed: Arc<dyn ChangeFeed>,
    generator: Arc<dyn ResponseGenerator>,
    events: Arc<dyn EventSink>,
    options: SessionOptions,
    core: Mutex<SessionCore>,
    writes: Mutex<JoinSet<()>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.core.get_mut().stop_feed();
    }
}

/// Clears the busy marker when a send finishes, unless the session was reset.
struct SendGuard<'a> {
    inner: &'a Inner,
    epoch: u64,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        let mut core = self.inner.core.lock();
        if core.sending == Some(self.epoch) {
            core.sending = None;
        }
    }
}

/// Handle to the coordinator; clones share the same session.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn ChatStore>,
        feed: Arc<dyn ChangeFeed>,
        generator: Arc<dyn ResponseGenerator>,
        events: Arc<dyn EventSink>,
        options: SessionOptions,
    ) -> Self {
        let core = SessionCore {
            epoch: 0,
            user_id: None,
            thread_id: None,
            state: SessionState::Uninitialized,
            timeline: Timeline::default(),
            session_id: Uuid::new_v4(),
            mode: options.mode,
            sending: None,
            feed_task: None,
        };
        Self {
            inner: Arc::new(Inner {
                store,
                feed,
                generator,
                events,
                options,
                core: Mutex::new(core),
                writes: Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// Run `f` under the session lock and publish the events it queued once
    /// the lock is released.
    fn update<R>(&self, f: impl FnOnce(&mut SessionCore, &mut Vec<SessionEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock();
            f(&mut core, &mut events)
        };
        for event in events {
            self.inner.events.emit(event);
        }
        result
    }

    /// Start a session for `user_id`: resolve the thread, subscribe to its
    /// feed and load today's history.
    ///
    /// Any previous session is torn down first. Returns the state reached,
    /// which is `ThreadUnavailable` when the thread could not be resolved.
    pub async fn sign_in(&self, user_id: impl Into<UserId>) -> Result<SessionState, SessionError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(SessionError::SignedOut);
        }
        let epoch = self.update(|core, events| {
            core.stop_feed();
            core.epoch += 1;
            core.user_id = Some(user_id.clone());
            core.thread_id = None;
            core.sending = None;
            let had_messages = !core.timeline.is_empty();
            core.timeline.clear();
            if had_messages {
                core.messages_changed(events);
            }
            core.set_state(SessionState::ResolvingThread, events);
            core.epoch
        });
        info!(
            "signing in (user_id={}, label={})",
            user_id, self.inner.options.thread_label
        );
        match self.attach(epoch, &user_id).await {
            Ok(_) => Ok(self.state()),
            Err(SessionError::ThreadUnavailable(reason)) => {
                Ok(SessionState::ThreadUnavailable(reason))
            }
            Err(err) => Err(err),
        }
    }

    /// End the session, dropping the list and discarding in-flight replies.
    pub fn sign_out(&self) {
        self.update(|core, events| {
            if core.user_id.is_none() && core.state == SessionState::Uninitialized {
                return;
            }
            info!(
                "signing out (session_id={}, user_id={})",
                core.session_id,
                core.user_id.as_deref().unwrap_or_default()
            );
            core.stop_feed();
            core.epoch += 1;
            core.user_id = None;
            core.thread_id = None;
            core.sending = None;
            core.timeline.clear();
            core.messages_changed(events);
            core.set_state(SessionState::Uninitialized, events);
        });
    }

    /// Re-resolve the thread after it was unavailable.
    pub async fn retry_thread(&self) -> Result<ThreadId, SessionError> {
        let (epoch, user_id, thread_id) = self.update(|core, events| -> Result<_, SessionError> {
            let user_id = core.user_id.clone().ok_or(SessionError::SignedOut)?;
            let available = !matches!(core.state, SessionState::ThreadUnavailable(_));
            let thread_id = core.thread_id.clone().filter(|_| available);
            if thread_id.is_none() {
                core.set_state(SessionState::ResolvingThread, events);
            }
            Ok((core.epoch, user_id, thread_id))
        })?;
        match thread_id {
            Some(thread_id) => Ok(thread_id),
            None => self.attach(epoch, &user_id).await,
        }
    }

    /// Resolve the thread, subscribe to its feed, merge its history and go
    /// `Ready`. Results are dropped if the session moved on meanwhile.
    async fn attach(&self, epoch: u64, user_id: &UserId) -> Result<ThreadId, SessionError> {
        let thread_id = match self.lookup(user_id).await {
            Ok(thread_id) => thread_id,
            Err(reason) => return Err(self.mark_unavailable(epoch, reason)),
        };

        let current = self.update(|core, events| {
            if core.epoch != epoch {
                return false;
            }
            core.stop_feed();
            core.thread_id = Some(thread_id.clone());
            // A send that attached on its own may already be past this point.
            if matches!(
                core.state,
                SessionState::ResolvingThread | SessionState::ThreadUnavailable(_)
            ) {
                core.set_state(SessionState::LoadingHistory, events);
            }
            true
        });
        if !current {
            return Err(SessionError::SignedOut);
        }
        info!("thread resolved (user_id={}, thread_id={})", user_id, thread_id);

        self.subscribe(epoch, &thread_id).await;

        let window = HistoryWindow::today();
        let history = with_retry(self.inner.options.retry, "history load", || {
            self.inner.store.load_history(user_id, &thread_id, &window)
        })
        .await
        .unwrap_or_else(|err| {
            warn!(
                "history load failed, starting empty (thread_id={}, error={})",
                thread_id, err
            );
            Vec::new()
        });
        let loaded = history.len();

        let current = self.update(|core, events| {
            if core.epoch != epoch {
                return false;
            }
            let messages = history
                .into_iter()
                .filter(|row| belongs_to(row, &thread_id))
                .map(message_from_row);
            if core.timeline.extend(messages) {
                core.messages_changed(events);
            }
            if core.state == SessionState::LoadingHistory {
                core.set_state(SessionState::Ready, events);
            }
            true
        });
        if !current {
            return Err(SessionError::SignedOut);
        }
        debug!("history merged (thread_id={}, rows={})", thread_id, loaded);
        Ok(thread_id)
    }

    /// Look up the labelled thread for `user_id` without touching the session.
    async fn lookup(&self, user_id: &UserId) -> Result<ThreadId, ThreadUnavailable> {
        let label = self.inner.options.thread_label.as_str();
        let lookup = with_retry(self.inner.options.retry, "thread lookup", || {
            self.inner.store.find_thread(user_id, label)
        })
        .await;
        match lookup {
            Ok(Some(thread_id)) => Ok(thread_id),
            Ok(None) => {
                warn!("no thread found (user_id={}, label={})", user_id, label);
                Err(ThreadUnavailable::NotFound)
            }
            Err(err) => {
                warn!(
                    "thread lookup failed (user_id={}, label={}, error={})",
                    user_id, label, err
                );
                Err(ThreadUnavailable::Unreachable(err.to_string()))
            }
        }
    }

    fn mark_unavailable(&self, epoch: u64, reason: ThreadUnavailable) -> SessionError {
        self.update(|core, events| {
            if core.epoch != epoch {
                return SessionError::SignedOut;
            }
            core.stop_feed();
            core.thread_id = None;
            core.set_state(SessionState::ThreadUnavailable(reason.clone()), events);
            SessionError::ThreadUnavailable(reason)
        })
    }

    async fn subscribe(&self, epoch: u64, thread_id: &ThreadId) {
        let mut stream = match self.inner.feed.subscribe(thread_id).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(
                    "realtime subscription failed, continuing without it (thread_id={}, error={})",
                    thread_id, err
                );
                return;
            }
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(row) = stream.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ChatSession { inner }.merge_row(Some(epoch), row);
            }
        });
        let stale = self.update(|core, _| {
            if core.epoch != epoch {
                return Some(task);
            }
            core.stop_feed();
            core.feed_task = Some(task);
            None
        });
        if let Some(task) = stale {
            task.abort();
        }
    }

    /// Send a visible user message and append the reply.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, SessionError> {
        self.exchange(text, true).await
    }

    /// Send without touching the visible list; the reply is only returned.
    pub async fn send_silent(&self, text: &str) -> Result<SendOutcome, SessionError> {
        self.exchange(text, false).await
    }

    async fn exchange(&self, text: &str, visible: bool) -> Result<SendOutcome, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let claimed = self.update(|core, events| -> Result<_, SessionError> {
            let user_id = core.user_id.clone().ok_or(SessionError::SignedOut)?;
            if core.sending.is_some() {
                return Err(SessionError::Busy);
            }
            core.sending = Some(core.epoch);
            let available = !matches!(core.state, SessionState::ThreadUnavailable(_));
            let thread_id = core.thread_id.clone().filter(|_| available);
            if thread_id.is_none() && visible {
                core.set_state(SessionState::ResolvingThread, events);
            }
            Ok((core.epoch, user_id, thread_id, core.mode))
        })?;
        let (epoch, user_id, thread_id, mode) = claimed;
        let _guard = SendGuard {
            inner: &self.inner,
            epoch,
        };

        let thread_id = match thread_id {
            Some(thread_id) => thread_id,
            None if visible => {
                info!("thread missing at send, resolving again (user_id={})", user_id);
                self.attach(epoch, &user_id).await?
            }
            // Attaching would merge history into the visible list.
            None => {
                info!("thread missing at silent send, looking it up (user_id={})", user_id);
                self.lookup(&user_id)
                    .await
                    .map_err(SessionError::ThreadUnavailable)?
            }
        };

        let user_message = Message::user(text);
        let session_id = self.update(|core, events| {
            if core.epoch != epoch {
                return Err(SessionError::SignedOut);
            }
            if visible {
                core.timeline.insert(user_message.clone());
                core.messages_changed(events);
            } else {
                core.timeline.reserve(&user_message.id);
            }
            if core.thread_id.as_ref() == Some(&thread_id) {
                core.set_state(SessionState::Sending, events);
            }
            Ok(core.session_id)
        })?;
        self.persist(&thread_id, &user_id, &user_message);

        info!(
            "sending message (session_id={}, thread_id={}, mode={}, silent={}, message_len={})",
            session_id,
            thread_id,
            mode.as_str(),
            !visible,
            text.len()
        );
        let request = WebhookRequest {
            user_id: user_id.clone(),
            thread_id: thread_id.clone(),
            message: text.to_string(),
        };
        let (reply, kind) = match self.inner.generator.generate(mode, &request).await {
            Ok(body) => match extract(&body) {
                Extraction::Content(content) => {
                    (Message::assistant(content), ReplyKind::Generated)
                }
                Extraction::Empty => {
                    warn!("responder returned an empty body (session_id={})", session_id);
                    (Message::assistant(notice::NO_RESPONSE), ReplyKind::NoContent)
                }
            },
            Err(err) => {
                let kind = FailureKind::from(&err);
                warn!(
                    "response generation failed (session_id={}, kind={:?}, error={})",
                    session_id, kind, err
                );
                (Message::assistant(kind.notice()), ReplyKind::Failed(kind))
            }
        };

        self.update(|core, events| {
            if core.epoch != epoch {
                info!(
                    "discarding reply for ended session (session_id={}, message_id={})",
                    session_id, reply.id
                );
                return Err(SessionError::SignedOut);
            }
            if visible && core.timeline.insert(reply.clone()) {
                core.messages_changed(events);
            }
            if core.state == SessionState::Sending {
                core.set_state(SessionState::Ready, events);
            }
            Ok(())
        })?;
        if visible && kind == ReplyKind::Generated {
            self.persist(&thread_id, &user_id, &reply);
        }

        Ok(SendOutcome {
            user: visible.then_some(user_message),
            reply,
            kind,
        })
    }

    /// Append a local assistant message; nothing is persisted or sent.
    pub fn inject_assistant(&self, text: &str) -> Result<Message, SessionError> {
        let message = Message::assistant(text);
        self.update(|core, events| {
            if core.user_id.is_none() {
                return Err(SessionError::SignedOut);
            }
            core.timeline.insert(message.clone());
            core.messages_changed(events);
            Ok(())
        })?;
        Ok(message)
    }

    /// Merge a row delivered by the change feed. Returns whether the list
    /// changed.
    pub fn merge_remote(&self, row: MessageRow) -> bool {
        self.merge_row(None, row)
    }

    fn merge_row(&self, epoch: Option<u64>, row: MessageRow) -> bool {
        self.update(|core, events| {
            if epoch.is_some_and(|epoch| epoch != core.epoch) {
                return false;
            }
            let Some(thread_id) = core.thread_id.as_ref() else {
                debug!("dropping realtime row without active thread (message_id={})", row.id);
                return false;
            };
            if !belongs_to(&row, thread_id) {
                debug!(
                    "dropping realtime row for another thread (message_id={}, thread_id={})",
                    row.id, thread_id
                );
                return false;
            }
            let changed = core.timeline.insert(message_from_row(row));
            if changed {
                core.messages_changed(events);
            }
            changed
        })
    }

    /// Switch the responder endpoint. A real change issues a new session id.
    pub fn set_mode(&self, mode: ChatMode) -> bool {
        self.update(|core, events| {
            if core.mode == mode {
                return false;
            }
            core.mode = mode;
            core.session_id = Uuid::new_v4();
            info!(
                "chat mode changed (session_id={}, mode={})",
                core.session_id,
                mode.as_str()
            );
            events.push(SessionEvent::ModeChanged {
                session_id: core.session_id,
                mode,
            });
            true
        })
    }

    fn persist(&self, thread_id: &ThreadId, user_id: &str, message: &Message) {
        let row = message.to_row(thread_id, user_id);
        let store = Arc::clone(&self.inner.store);
        let mut writes = self.inner.writes.lock();
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            match store.insert_message(&row).await {
                Ok(()) => debug!(
                    "message persisted (message_id={}, thread_id={})",
                    row.id,
                    row.thread_id.as_ref().map(ThreadId::as_str).unwrap_or_default()
                ),
                Err(err) => warn!(
                    "failed to persist message (message_id={}, thread_id={}, error={})",
                    row.id,
                    row.thread_id.as_ref().map(ThreadId::as_str).unwrap_or_default(),
                    err
                ),
            }
        });
    }

    /// Wait for every spawned store write to finish.
    pub async fn settle(&self) {
        let mut writes = std::mem::take(&mut *self.inner.writes.lock());
        while writes.join_next().await.is_some() {}
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.core.lock().timeline.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.core.lock().timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.core.lock().timeline.is_empty()
    }

    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state.clone()
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.inner.core.lock().thread_id.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.inner.core.lock().user_id.clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.inner.core.lock().session_id
    }

    pub fn mode(&self) -> ChatMode {
        self.inner.core.lock().mode
    }

    /// True while a send is outstanding.
    pub fn is_busy(&self) -> bool {
        self.inner.core.lock().sending.is_some()
    }
}

fn belongs_to(row: &MessageRow, thread_id: &ThreadId) -> bool {
    row.thread_id.as_ref().is_none_or(|id| id == thread_id)
}

fn message_from_row(row: MessageRow) -> Message {
    if !matches!(row.role.as_str(), "user" | "assistant") {
        debug!(
            "unknown role treated as assistant (message_id={}, role={})",
            row.id, row.role
        );
    }
    Message::from(row)
}
