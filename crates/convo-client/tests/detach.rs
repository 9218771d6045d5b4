//! A session switch or a cancel detaches the in-flight exchange: late events
//! are dropped.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeStore, ScriptedChat, content, done, metadata};
use convo::{Message, Role, SessionId};
use convo_client::controller::{SendOptions, SendOutcome, SessionController};
use tokio::time::sleep;

#[tokio::test(flavor = "multi_thread")]
async fn late_events_after_a_switch_never_reach_the_new_transcript() {
    common::init_logging();
    let store = Arc::new(FakeStore::new());
    store.seed_session(
        "s-other",
        Some("older conversation"),
        vec![Message::user("older question")],
    );
    let (chat, tx) = ScriptedChat::streaming();
    let controller = Arc::new(
        SessionController::connect(store.clone(), Arc::new(chat), None)
            .await
            .unwrap(),
    );

    let send_task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.send("Hello", None, SendOptions::default()).await })
    };

    // Let the exchange start streaming into the original session.
    tx.unbounded_send(metadata("gpt-x")).unwrap();
    tx.unbounded_send(content("partial")).unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.transcript().await.len(), 2);
    assert!(controller.is_busy().await);

    controller
        .switch_session(&SessionId::from("s-other"))
        .await
        .unwrap();
    assert_eq!(controller.active_session().await.as_str(), "s-other");
    assert!(!controller.is_busy().await);

    // The old exchange keeps delivering; none of it may land. The detached
    // receiver may already be gone, so the sends are best-effort.
    let _ = tx.unbounded_send(content(" more"));
    let _ = tx.unbounded_send(done(5));
    drop(tx);
    assert_eq!(send_task.await.unwrap(), SendOutcome::Completed);

    let transcript = controller.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].content, "older question");
    assert_eq!(transcript[0].role, Role::User);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_detaches_the_exchange_and_keeps_partial_output() {
    common::init_logging();
    let store = Arc::new(FakeStore::new());
    let (chat, tx) = ScriptedChat::streaming();
    let controller = Arc::new(
        SessionController::connect(store, Arc::new(chat), None)
            .await
            .unwrap(),
    );

    let send_task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.send("Hello", None, SendOptions::default()).await })
    };
    tx.unbounded_send(metadata("gpt-x")).unwrap();
    tx.unbounded_send(content("partial")).unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(controller.is_busy().await);

    assert!(controller.cancel().await);
    assert!(!controller.is_busy().await);
    // Cancelling while idle is a no-op.
    assert!(!controller.cancel().await);

    // The detached stream keeps delivering; nothing may land. The detached
    // receiver may already be gone, so the sends are best-effort.
    let _ = tx.unbounded_send(content(" more"));
    let _ = tx.unbounded_send(done(5));
    drop(tx);
    assert_eq!(send_task.await.unwrap(), SendOutcome::Completed);

    let transcript = controller.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "Hello");
    assert_eq!(transcript[1].role, Role::Assistant);
    assert_eq!(transcript[1].content, "partial");
}

#[tokio::test(flavor = "multi_thread")]
async fn a_new_send_is_allowed_after_detaching_the_old_exchange() {
    common::init_logging();
    let store = Arc::new(FakeStore::new());
    store.seed_session("s-other", None, Vec::new());
    let (chat, old_tx) = ScriptedChat::streaming();
    let chat = Arc::new(chat);
    let controller = Arc::new(
        SessionController::connect(store, chat.clone(), None)
            .await
            .unwrap(),
    );

    let send_task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.send("Hello", None, SendOptions::default()).await })
    };
    old_tx.unbounded_send(metadata("gpt-x")).unwrap();
    sleep(Duration::from_millis(50)).await;

    controller
        .switch_session(&SessionId::from("s-other"))
        .await
        .unwrap();

    // The controller is idle on the new session even though the old stream
    // is still open, so a new exchange may start right away.
    assert!(!controller.is_busy().await);
    let new_tx = chat.push_stream();
    let second_task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.send("again", None, SendOptions::default()).await })
    };
    new_tx.unbounded_send(metadata("gpt-x")).unwrap();
    new_tx.unbounded_send(content("fresh answer")).unwrap();
    new_tx.unbounded_send(done(2)).unwrap();
    assert_eq!(second_task.await.unwrap(), SendOutcome::Completed);

    // The detached stream finally closes; its result is discarded. The
    // detached receiver may already be gone, so the send is best-effort.
    let _ = old_tx.unbounded_send(content("stale"));
    drop(old_tx);
    assert_eq!(send_task.await.unwrap(), SendOutcome::Completed);

    let transcript = controller.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "again");
    assert_eq!(transcript[1].content, "fresh answer");
}
