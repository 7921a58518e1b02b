//! # sendMessage Tests

use super::*;
use crate::chat::completion::{FALLBACK_NO_REPLY, FALLBACK_UNREACHABLE};
use lib_core::dto::{AI_AUTHOR_ID, AI_AUTHOR_NAME, MAX_MESSAGE_CHARS};

fn typing(status: bool) -> ServerEvent {
    ServerEvent::AiTyping {
        status,
        name: AI_AUTHOR_NAME.to_string(),
    }
}

#[tokio::test]
async fn test_human_message_gets_ai_reply_for_everyone() {
    // Arrange
    let completion = ScriptedCompletion::replying("Hello human");
    let pipeline = pipeline(setup_store().await, completion.clone());
    let (mut alice, mut alice_rx) = connect(&pipeline, "a").await;
    let (_bob, mut bob_rx) = connect(&pipeline, "b").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    // Act
    let outcome = pipeline.send_message(&mut alice, send("hi", "user1")).await.unwrap();

    // Assert
    let reply = outcome.reply.expect("reply expected");
    assert_eq!(reply.text, "Hello human");
    assert_eq!(reply.author.id, AI_AUTHOR_ID);
    assert_eq!(reply.author.name, AI_AUTHOR_NAME);

    assert_eq!(received_texts(&drain(&mut alice_rx)), vec!["hi", "Hello human"]);
    assert_eq!(received_texts(&drain(&mut bob_rx)), vec!["hi", "Hello human"]);
    assert_eq!(pipeline.store().count_messages().await.unwrap(), 2);
    assert_eq!(completion.calls(), vec![vec![ChatTurn::user("hi")]]);
}

#[tokio::test]
async fn test_typing_bracket_only_for_sender() {
    // Arrange
    let pipeline = pipeline(setup_store().await, ScriptedCompletion::replying("yo"));
    let (mut alice, mut alice_rx) = connect(&pipeline, "a").await;
    let (_bob, mut bob_rx) = connect(&pipeline, "b").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    // Act
    let outcome = pipeline.send_message(&mut alice, send("hi", "user1")).await.unwrap();

    // Assert
    let reply = outcome.reply.unwrap();
    assert_eq!(
        drain(&mut alice_rx),
        vec![
            ServerEvent::ReceiveMessage(outcome.message.clone()),
            typing(true),
            typing(false),
            ServerEvent::ReceiveMessage(reply.clone()),
        ]
    );
    assert_eq!(
        drain(&mut bob_rx),
        vec![
            ServerEvent::ReceiveMessage(outcome.message),
            ServerEvent::ReceiveMessage(reply),
        ]
    );
}

#[tokio::test]
async fn test_ai_like_names_get_no_reply() {
    for name in ["AI Helper", "Kaitlyn", "mAIn", "AI Agent"] {
        // Arrange
        let completion = ScriptedCompletion::replying("should not appear");
        let pipeline = pipeline(setup_store().await, completion.clone());
        let (mut session, mut rx) = connect(&pipeline, "a").await;
        drain(&mut rx);

        // Act
        let outcome = pipeline.send_message(&mut session, send("hello", name)).await.unwrap();

        // Assert
        assert!(outcome.reply.is_none(), "{} got a reply", name);
        assert_eq!(drain(&mut rx), vec![ServerEvent::ReceiveMessage(outcome.message)]);
        assert!(completion.calls().is_empty());
        assert_eq!(session.memory().turns(), &[ChatTurn::user("hello")]);
        assert_eq!(pipeline.store().count_messages().await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_long_text_truncated_but_remembered_in_full() {
    let completion = ScriptedCompletion::replying("ok");
    let pipeline = pipeline(setup_store().await, completion.clone());
    let (mut session, mut rx) = connect(&pipeline, "a").await;
    drain(&mut rx);
    let text = "é".repeat(10_000);

    let outcome = pipeline.send_message(&mut session, send(&text, "user1")).await.unwrap();

    assert_eq!(outcome.message.text.chars().count(), MAX_MESSAGE_CHARS);
    let stored = pipeline.store().recent_messages(1).await.unwrap();
    assert_eq!(stored[0].text.chars().count(), MAX_MESSAGE_CHARS);
    assert_eq!(received_texts(&drain(&mut rx))[0].chars().count(), MAX_MESSAGE_CHARS);
    assert_eq!(session.memory().turns()[0].content, text);
    assert_eq!(completion.calls()[0][0].content, text);
}

#[tokio::test]
async fn test_missing_text_or_author_rejected() {
    let frames = [
        r#"{"event":"sendMessage","data":{"user":{"_id":"","name":""}}}"#,
        r#"{"event":"sendMessage","data":{"text":null,"user":{"_id":"x","name":"user1"}}}"#,
        r#"{"event":"sendMessage","data":{"text":"","user":{"_id":"x","name":"user1"}}}"#,
        r#"{"event":"sendMessage","data":{"text":"hi","user":{"_id":"","name":"user1"}}}"#,
        r#"{"event":"sendMessage","data":{"text":"hi","user":{"_id":"x","name":""}}}"#,
    ];

    for frame in frames {
        // Arrange
        let completion = ScriptedCompletion::replying("should not appear");
        let pipeline = pipeline(setup_store().await, completion.clone());
        let (mut alice, mut alice_rx) = connect(&pipeline, "a").await;
        let (_bob, mut bob_rx) = connect(&pipeline, "b").await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // Act
        pipeline.handle_frame(&mut alice, frame).await;

        // Assert
        let events = drain(&mut alice_rx);
        assert_eq!(events.len(), 1, "{}", frame);
        assert!(matches!(events[0], ServerEvent::SendError { .. }), "{}", frame);
        assert!(drain(&mut bob_rx).is_empty());
        assert!(alice.memory().is_empty());
        assert!(completion.calls().is_empty());
        assert_eq!(pipeline.store().count_messages().await.unwrap(), 0);
        assert!(alice.is_alive());
    }
}

#[tokio::test]
async fn test_empty_text_send_returns_invalid_input() {
    let pipeline = pipeline(setup_store().await, ScriptedCompletion::replying("?"));
    let (mut session, _rx) = connect(&pipeline, "a").await;

    let result = pipeline.send_message(&mut session, send("", "user1")).await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_numeric_text_through_frame() {
    let pipeline = pipeline(setup_store().await, ScriptedCompletion::replying("ok"));
    let (mut session, mut rx) = connect(&pipeline, "a").await;
    drain(&mut rx);

    pipeline
        .handle_frame(
            &mut session,
            r#"{"event":"sendMessage","data":{"text":42,"user":{"_id":"x","name":"user1"}}}"#,
        )
        .await;

    assert_eq!(received_texts(&drain(&mut rx)), vec!["42", "ok"]);
}

#[tokio::test]
async fn test_completion_failures_post_fallbacks() {
    let cases: [(fn() -> CompletionError, &str); 3] = [
        (|| CompletionError::Transport("connection refused".to_string()), FALLBACK_UNREACHABLE),
        (|| CompletionError::InvalidBody("expected value".to_string()), FALLBACK_UNREACHABLE),
        (|| CompletionError::EmptyResponse { status: 200 }, FALLBACK_NO_REPLY),
    ];

    for (make, expected) in cases {
        // Arrange
        let pipeline = pipeline(setup_store().await, FailingCompletion::new(make));
        let (mut session, mut rx) = connect(&pipeline, "a").await;
        drain(&mut rx);

        // Act
        let outcome = pipeline.send_message(&mut session, send("hi", "user1")).await.unwrap();

        // Assert
        let reply = outcome.reply.unwrap();
        assert_eq!(reply.text, expected);
        assert_eq!(reply.author, Author::ai());
        let events = drain(&mut rx);
        assert_eq!(received_texts(&events), vec!["hi", expected]);
        assert_eq!(events.iter().filter(|e| **e == typing(false)).count(), 1);
        assert!(!events.iter().any(|e| matches!(e, ServerEvent::SendError { .. })));
        assert_eq!(pipeline.store().count_messages().await.unwrap(), 2);
        assert_eq!(session.memory().turns()[1], ChatTurn::assistant(expected));
    }
}

#[tokio::test]
async fn test_persist_failure_broadcasts_nothing() {
    // Arrange
    let store = Arc::new(FlakyStore::new().await);
    let completion = ScriptedCompletion::replying("hi");
    let pipeline = pipeline(store.clone(), completion.clone());
    let (mut alice, mut alice_rx) = connect(&pipeline, "a").await;
    let (_bob, mut bob_rx) = connect(&pipeline, "b").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);
    store.allow_inserts(0);

    // Act
    let result = pipeline.send_message(&mut alice, send("hello", "user1")).await;

    // Assert
    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    let events = drain(&mut alice_rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::SendError { .. }));
    assert!(drain(&mut bob_rx).is_empty());
    assert!(alice.memory().is_empty());
    assert!(completion.calls().is_empty());
    assert!(alice.is_alive());
}

#[tokio::test]
async fn test_reply_persist_failure_suppresses_reply() {
    // Arrange
    let store = Arc::new(FlakyStore::new().await);
    let pipeline = pipeline(store.clone(), ScriptedCompletion::replying("lost reply"));
    let (mut alice, mut alice_rx) = connect(&pipeline, "a").await;
    let (_bob, mut bob_rx) = connect(&pipeline, "b").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);
    store.allow_inserts(1);

    // Act
    let result = pipeline.send_message(&mut alice, send("hello", "user1")).await;

    // Assert
    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    let events = drain(&mut alice_rx);
    assert_eq!(received_texts(&events), vec!["hello"]);
    assert!(matches!(events.last(), Some(ServerEvent::SendError { .. })));
    assert_eq!(received_texts(&drain(&mut bob_rx)), vec!["hello"]);
    assert_eq!(alice.memory().turns(), &[ChatTurn::user("hello")]);
    assert_eq!(pipeline.store().count_messages().await.unwrap(), 1);
}

#[tokio::test]
async fn test_everything_broadcast_is_stored() {
    let pipeline = pipeline(setup_store().await, ScriptedCompletion::replying("ack"));
    let (mut alice, mut alice_rx) = connect(&pipeline, "a").await;
    let (mut bob, mut bob_rx) = connect(&pipeline, "b").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    pipeline.send_message(&mut alice, send("one", "user1")).await.unwrap();
    pipeline.send_message(&mut bob, send("two", "user2")).await.unwrap();
    pipeline.send_message(&mut alice, send("three", "Kaitlyn")).await.unwrap();

    let broadcast_ids: Vec<String> = drain(&mut bob_rx)
        .into_iter()
        .filter_map(|event| match event {
            ServerEvent::ReceiveMessage(message) => Some(message.id),
            _ => None,
        })
        .collect();
    let stored_ids: Vec<String> = pipeline
        .store()
        .recent_messages(100)
        .await
        .unwrap()
        .into_iter()
        .map(|message| message.id)
        .collect();

    assert_eq!(broadcast_ids.len(), 5);
    assert_eq!(broadcast_ids, stored_ids);
}

#[tokio::test]
async fn test_sender_gone_reply_still_broadcast() {
    // Arrange
    let pipeline = pipeline(setup_store().await, ScriptedCompletion::replying("still here"));
    let (mut alice, alice_rx) = connect(&pipeline, "a").await;
    let (_bob, mut bob_rx) = connect(&pipeline, "b").await;
    drain(&mut bob_rx);
    drop(alice_rx);

    // Act
    let outcome = pipeline.send_message(&mut alice, send("hi", "user1")).await.unwrap();

    // Assert
    assert!(outcome.reply.is_some());
    assert_eq!(received_texts(&drain(&mut bob_rx)), vec!["hi", "still here"]);
    assert_eq!(pipeline.store().count_messages().await.unwrap(), 2);
}
