//! Send path integration tests.

mod common;

use chrono::Duration;
use common::{THREAD, USER, count, drain_feed, session, store};
use hearth_rs_core::notice::NO_RESPONSE;
use hearth_rs_core::{
    ChangeFeedBus, FailureKind, GenerateError, HistoryWindow, ReplyKind, SessionError,
};
use hearth_rs_protocol::{ChatMode, Role, SessionEvent, SessionState, ThreadId, ThreadUnavailable};
use hearth_rs_test_utils::{
    FailingGenerator, FixedGenerator, GatedGenerator, MemoryChatStore, RecordingGenerator, row,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn reply_is_extracted_appended_and_persisted() {
    let store = store();
    let (generator, calls) = RecordingGenerator::new(r#"{"output":"I'm here for you."}"#);
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), generator);
    assert_eq!(session.sign_in(USER).await, Ok(SessionState::Ready));

    let outcome = session.send("I feel anxious today").await.expect("send");
    session.settle().await;

    assert_eq!(outcome.kind, ReplyKind::Generated);
    assert_eq!(outcome.reply.content, "I'm here for you.");
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "I feel anxious today");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "I'm here for you.");

    let inserted = store.inserted();
    assert_eq!(inserted.len(), 2);
    assert_eq!(inserted[0].id, messages[0].id);
    assert_eq!(inserted[1].id, messages[1].id);
    assert_eq!(inserted[0].user_id.as_deref(), Some(USER));
    assert_eq!(inserted[1].role, "assistant");

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, ChatMode::Production);
    assert_eq!(calls[0].1.user_id, USER);
    assert_eq!(calls[0].1.thread_id, ThreadId::new(THREAD));
    assert_eq!(calls[0].1.message, "I feel anxious today");
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn echoed_insert_does_not_duplicate_the_optimistic_entry() {
    let feed = ChangeFeedBus::new(16);
    let store = store().with_feed(feed.clone());
    let (session, _) = session(store, feed.clone(), FixedGenerator::new("hi back"));
    session.sign_in(USER).await.expect("sign in");

    session.send("hello").await.expect("send");
    session.settle().await;
    drain_feed(&session, &feed, "marker-1").await;

    let messages = session.messages();
    assert_eq!(count(&messages, Role::User, "hello"), 1);
    assert_eq!(count(&messages, Role::Assistant, "hi back"), 1);
    assert_eq!(messages.len(), 3);
}

#[tokio::test]
async fn silent_send_never_changes_the_visible_list() {
    let feed = ChangeFeedBus::new(16);
    let store = store().with_feed(feed.clone());
    let (session, _) = session(store.clone(), feed.clone(), FixedGenerator::new("pong"));
    session.sign_in(USER).await.expect("sign in");
    session.inject_assistant("Good morning!").expect("inject");
    let before = session.messages();

    let outcome = session.send_silent("ping").await.expect("silent send");
    session.settle().await;
    drain_feed(&session, &feed, "marker-1").await;

    assert_eq!(outcome.user, None);
    assert_eq!(outcome.reply.content, "pong");
    let after: Vec<_> = session
        .messages()
        .into_iter()
        .filter(|m| m.id != "marker-1")
        .collect();
    assert_eq!(after, before);
    let inserted = store.inserted();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].content, "ping");
}

#[tokio::test]
async fn silent_send_failure_stays_hidden() {
    let (session, _) = session(
        store(),
        ChangeFeedBus::new(16),
        FailingGenerator::new(GenerateError::Status(500)),
    );
    session.sign_in(USER).await.expect("sign in");

    let outcome = session.send_silent("ping").await.expect("silent send");

    assert_eq!(outcome.kind, ReplyKind::Failed(FailureKind::ServerFault));
    assert!(session.is_empty());
}

#[tokio::test]
async fn silent_send_without_a_thread_leaves_history_for_the_next_send() {
    let start = HistoryWindow::today().start;
    let store = MemoryChatStore::new().with_rows(vec![row(
        "h-1",
        THREAD,
        "user",
        "earlier",
        start + Duration::seconds(10),
    )]);
    let (generator, calls) = RecordingGenerator::new("pong");
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), generator);
    session.sign_in(USER).await.expect("sign in");

    assert_eq!(
        session.send_silent("ping").await,
        Err(SessionError::ThreadUnavailable(ThreadUnavailable::NotFound))
    );
    assert!(!session.is_busy());

    store.add_thread(USER, "primary", THREAD);
    let outcome = session.send_silent("ping").await.expect("silent send");

    assert_eq!(outcome.reply.content, "pong");
    assert!(session.is_empty());
    assert_eq!(store.history_count(), 0);
    assert_eq!(calls.lock()[0].1.thread_id, ThreadId::new(THREAD));
    assert_eq!(
        session.state(),
        SessionState::ThreadUnavailable(ThreadUnavailable::NotFound)
    );

    session.send("hello").await.expect("send");
    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].id, "h-1");
    assert_eq!(count(&messages, Role::User, "ping"), 0);
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn timeout_becomes_a_notice_that_is_not_persisted() {
    let store = store();
    let (session, _) = session(
        store.clone(),
        ChangeFeedBus::new(16),
        FailingGenerator::new(GenerateError::Timeout),
    );
    session.sign_in(USER).await.expect("sign in");

    let outcome = session.send("are you there?").await.expect("send");
    session.settle().await;

    assert_eq!(outcome.kind, ReplyKind::Failed(FailureKind::Timeout));
    assert_eq!(outcome.reply.content, FailureKind::Timeout.notice());
    assert_eq!(outcome.reply.role, Role::Assistant);
    assert_eq!(session.len(), 2);
    let inserted = store.inserted();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].content, "are you there?");
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn rejection_status_selects_its_notice() {
    for (status, kind) in [
        (503, FailureKind::ServerFault),
        (404, FailureKind::EndpointMissing),
        (429, FailureKind::RateLimited),
        (403, FailureKind::Forbidden),
    ] {
        let (session, _) = session(
            store(),
            ChangeFeedBus::new(16),
            FailingGenerator::new(GenerateError::Status(status)),
        );
        session.sign_in(USER).await.expect("sign in");

        let outcome = session.send("hello").await.expect("send");

        assert_eq!(outcome.kind, ReplyKind::Failed(kind));
        assert_eq!(session.messages()[1].content, kind.notice());
    }
}

#[tokio::test]
async fn empty_body_shows_the_no_response_advisory() {
    let store = store();
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), FixedGenerator::new("  "));
    session.sign_in(USER).await.expect("sign in");

    let outcome = session.send("hello").await.expect("send");
    session.settle().await;

    assert_eq!(outcome.kind, ReplyKind::NoContent);
    assert_eq!(outcome.reply.content, NO_RESPONSE);
    assert_eq!(store.inserted().len(), 1);
}

#[tokio::test]
async fn persistence_failure_keeps_the_conversation() {
    let store = store().failing_inserts();
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), FixedGenerator::new("ok"));
    session.sign_in(USER).await.expect("sign in");

    let outcome = session.send("hello").await.expect("send");
    session.settle().await;

    assert_eq!(outcome.kind, ReplyKind::Generated);
    assert_eq!(session.len(), 2);
    assert!(store.inserted().is_empty());
}

#[tokio::test]
async fn message_text_is_sent_and_stored_as_typed() {
    let store = store();
    let (generator, calls) = RecordingGenerator::new("ok");
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), generator);
    session.sign_in(USER).await.expect("sign in");
    let text = "  - slept badly\n  - skipped lunch\n";

    session.send(text).await.expect("send");
    session.settle().await;

    assert_eq!(session.messages()[0].content, text);
    assert_eq!(store.inserted()[0].content, text);
    assert_eq!(calls.lock()[0].1.message, text);
}

#[tokio::test]
async fn rejects_blank_input_and_signed_out_sends() {
    let (generator, calls) = RecordingGenerator::new("unused");
    let (session, _) = session(store(), ChangeFeedBus::new(16), generator);

    assert_eq!(session.send("hello").await, Err(SessionError::SignedOut));
    session.sign_in(USER).await.expect("sign in");
    assert_eq!(session.send("   \n").await, Err(SessionError::EmptyMessage));
    assert!(session.is_empty());
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn missing_thread_blocks_send_without_calling_the_responder() {
    let store = MemoryChatStore::new();
    let (generator, calls) = RecordingGenerator::new("unused");
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), generator);

    assert_eq!(
        session.sign_in(USER).await,
        Ok(SessionState::ThreadUnavailable(ThreadUnavailable::NotFound))
    );
    let err = session.send("hello").await.unwrap_err();

    assert_eq!(err, SessionError::ThreadUnavailable(ThreadUnavailable::NotFound));
    assert_eq!(
        err.to_string(),
        "I couldn't find your conversation. Please sign out and back in, or try again shortly."
    );
    assert!(calls.lock().is_empty());
    assert!(session.is_empty());
    assert_eq!(store.lookup_count(), 2);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn send_resolves_a_thread_that_appeared_later() {
    let store = MemoryChatStore::new();
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), FixedGenerator::new("hey"));
    session.sign_in(USER).await.expect("sign in");
    store.add_thread(USER, "primary", THREAD);

    let outcome = session.send("hello").await.expect("send");

    assert_eq!(outcome.kind, ReplyKind::Generated);
    assert_eq!(session.thread_id(), Some(ThreadId::new(THREAD)));
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn second_send_while_outstanding_is_busy() {
    let (generator, gate) = GatedGenerator::new("done");
    let (session, _) = session(store(), ChangeFeedBus::new(16), generator);
    session.sign_in(USER).await.expect("sign in");

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.send("first").await })
    };
    gate.entered().await;

    assert!(session.is_busy());
    assert_eq!(session.state(), SessionState::Sending);
    assert_eq!(session.send("second").await, Err(SessionError::Busy));

    gate.release();
    let outcome = first.await.expect("join").expect("send");
    assert_eq!(outcome.reply.content, "done");
    assert!(!session.is_busy());
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn slow_sign_in_does_not_mask_an_outstanding_send() {
    let (store, lookup) = store().gated_lookup();
    let (generator, reply) = GatedGenerator::new("done");
    let (session, _) = session(store, ChangeFeedBus::new(16), generator);

    let signing_in = {
        let session = session.clone();
        tokio::spawn(async move { session.sign_in(USER).await })
    };
    lookup.entered().await;
    let sending = {
        let session = session.clone();
        tokio::spawn(async move { session.send("hello").await })
    };
    reply.entered().await;
    assert_eq!(session.state(), SessionState::Sending);

    lookup.release();
    let state = signing_in.await.expect("join").expect("sign in");

    assert_eq!(state, SessionState::Sending);
    assert_eq!(session.state(), SessionState::Sending);
    assert!(session.is_busy());

    reply.release();
    let outcome = sending.await.expect("join").expect("send");
    assert_eq!(outcome.reply.content, "done");
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn sign_out_discards_a_late_reply() {
    let store = store();
    let (generator, gate) = GatedGenerator::new("too late");
    let (session, _) = session(store.clone(), ChangeFeedBus::new(16), generator);
    session.sign_in(USER).await.expect("sign in");

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.send("hello").await })
    };
    gate.entered().await;
    session.sign_out();
    gate.release();

    assert_eq!(pending.await.expect("join"), Err(SessionError::SignedOut));
    session.settle().await;
    assert!(session.is_empty());
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(!session.is_busy());
    assert_eq!(store.inserted().len(), 1);
}

#[tokio::test]
async fn mode_switch_targets_test_endpoint_and_reissues_session_id() {
    let (generator, calls) = RecordingGenerator::new("ok");
    let (session, events) = session(store(), ChangeFeedBus::new(16), generator);
    session.sign_in(USER).await.expect("sign in");
    let original = session.session_id();

    assert!(!session.set_mode(ChatMode::Production));
    assert_eq!(session.session_id(), original);

    assert!(session.set_mode(ChatMode::Test));
    let switched = session.session_id();
    assert_ne!(switched, original);
    assert!(events.lock().contains(&SessionEvent::ModeChanged {
        session_id: switched,
        mode: ChatMode::Test,
    }));

    session.send("hello").await.expect("send");
    assert_eq!(calls.lock()[0].0, ChatMode::Test);
    assert_eq!(session.mode(), ChatMode::Test);
}
