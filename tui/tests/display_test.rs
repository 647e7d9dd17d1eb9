//! Display state tests
//!
//! Drive a real `ChatController` over an in-process session and check what
//! ends up on screen.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use gigi_core::{
    ChatController, ConnectionState, InProcessConnector, Message, Notice, SessionSettings,
    StreamingSession, END_MARKER, ERROR_MARKER,
};
use gigi_tui::display::{DisplayState, LOADING_TEXT, NOTICE_TTL};
use gigi_tui::markdown::line_text;

fn screen(display: &DisplayState, width: usize) -> Vec<String> {
    display
        .conversation_lines(width)
        .iter()
        .map(line_text)
        .collect()
}

#[test]
fn test_blank_assistant_messages_hidden() {
    let mut chat = ChatController::new();
    chat.seed_history(vec![
        Message::user("hi"),
        Message::assistant("   "),
        Message::user("anyone?"),
        Message::assistant("hello"),
    ]);

    let mut display = DisplayState::new();
    display.sync(&mut chat, ConnectionState::Open);

    let labels: Vec<_> = display.messages.iter().map(|m| m.label()).collect();
    assert_eq!(labels, vec!["You", "You", "Gigi"]);
    assert_eq!(
        screen(&display, 40),
        vec!["You", "hi", "", "You", "anyone?", "", "Gigi", "hello", ""]
    );
}

#[tokio::test]
async fn test_streaming_turn_on_screen() {
    let (connector, mut remotes) = InProcessConnector::new();
    let (session, mut events) = StreamingSession::start(
        "ws://gigi.test",
        Arc::new(connector),
        SessionSettings::default(),
    );
    let remote = remotes.recv().await.unwrap();
    session
        .subscribe_state()
        .wait_for(|s| *s == ConnectionState::Open)
        .await
        .unwrap();

    let mut chat = ChatController::new();
    let mut display = DisplayState::new();
    chat.submit(&session, "2+2?").await;

    // Placeholder is hidden, indicator shown
    display.sync(&mut chat, session.state());
    assert!(display.loading);
    assert_eq!(
        screen(&display, 40),
        vec!["You", "2+2?", "", LOADING_TEXT]
    );

    remote.push("4").await;
    chat.apply(events.recv().await.unwrap());
    display.sync(&mut chat, session.state());
    assert_eq!(
        screen(&display, 40),
        vec!["You", "2+2?", "", "Gigi", "4", "", LOADING_TEXT]
    );

    remote.push(END_MARKER).await;
    chat.apply(events.recv().await.unwrap());
    display.sync(&mut chat, session.state());
    assert!(!display.loading);
    assert_eq!(display.connection, ConnectionState::Open);
}

#[tokio::test]
async fn test_error_marker_becomes_toast() {
    let (connector, mut remotes) = InProcessConnector::new();
    let (session, mut events) = StreamingSession::start(
        "ws://gigi.test",
        Arc::new(connector),
        SessionSettings::default(),
    );
    let remote = remotes.recv().await.unwrap();
    session
        .subscribe_state()
        .wait_for(|s| *s == ConnectionState::Open)
        .await
        .unwrap();

    let mut chat = ChatController::new();
    let mut display = DisplayState::new();
    chat.submit(&session, "hi").await;

    remote.push(ERROR_MARKER).await;
    chat.apply(events.recv().await.unwrap());
    display.sync(&mut chat, session.state());

    let toast = display.current_notification().expect("toast shown");
    assert_eq!(toast.notice, Notice::GenerationFailed);
    assert_eq!(toast.message(), "Error generating response.");

    // Notices are drained, so a second sync does not duplicate the toast
    display.sync(&mut chat, session.state());
    assert_eq!(display.notifications.len(), 1);

    display.update(NOTICE_TTL + Duration::from_millis(1));
    assert!(display.current_notification().is_none());
}

#[tokio::test]
async fn test_late_history_does_not_replace_live_turn() {
    let (connector, mut remotes) = InProcessConnector::new();
    let (session, mut events) = StreamingSession::start(
        "ws://gigi.test",
        Arc::new(connector),
        SessionSettings::default(),
    );
    let remote = remotes.recv().await.unwrap();
    session
        .subscribe_state()
        .wait_for(|s| *s == ConnectionState::Open)
        .await
        .unwrap();

    let mut chat = ChatController::new();
    let mut display = DisplayState::new();
    chat.submit(&session, "new question").await;
    remote.push("fresh").await;
    chat.apply(events.recv().await.unwrap());

    // The history request was slower than the user
    let seeded = chat.seed_history(vec![
        Message::user("old question"),
        Message::assistant("old answer"),
    ]);
    assert!(!seeded);

    display.sync(&mut chat, session.state());
    assert_eq!(
        screen(&display, 40),
        vec!["You", "new question", "", "Gigi", "fresh", "", LOADING_TEXT]
    );
}
