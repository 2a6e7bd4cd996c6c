use super::*;
use crate::{
    channel::{ChannelEvent, ChannelState},
    test_support::{drain, notices, Harness},
};

const START: &str = r#"{"type":"story_start","data":{"dialog":"Once upon a time."}}"#;

#[tokio::test]
async fn start_sends_start_story_when_open() {
    let mut harness = Harness::open();

    assert_eq!(harness.session.start(), ActionOutcome::Sent);
    assert_eq!(harness.sent(), vec![ClientAction::StartStory]);
}

#[tokio::test(start_paused = true)]
async fn choose_sends_one_frame_and_logs_one_entry() {
    let mut harness = Harness::open();
    harness.frame(START);
    harness.settle_reveals().await;
    let before = harness.session.view().log().len();

    let outcome = harness.session.handle_action(UserAction::Choose("Open the door".into()));

    assert_eq!(outcome, ActionOutcome::Sent);
    let sent = harness.sent();
    assert_eq!(sent, vec![ClientAction::choose("Open the door")]);
    assert_eq!(
        sent[0].encode().expect("encode"),
        r#"{"action":"next","selected_choice":"Open the door"}"#
    );

    let entries = harness.session.view().log().entries();
    assert_eq!(entries.len(), before + 1);
    let last = entries.last().expect("entry");
    assert_eq!(last.kind, LogKind::Choice);
    assert!(last.text.contains("Open the door"));
}

#[tokio::test]
async fn next_and_start_on_closed_channel_send_nothing_and_notify_once() {
    let mut harness = Harness::new(ChannelState::Closed);
    harness.session.handle_channel_event(ChannelEvent::Closed);
    let mut events = harness.session.subscribe_events();

    assert_eq!(harness.session.next(), ActionOutcome::Refused);
    assert_eq!(notices(&drain(&mut events)), vec![CONNECTION_LOST_NOTICE.to_string()]);

    assert_eq!(harness.session.start(), ActionOutcome::Refused);
    assert_eq!(notices(&drain(&mut events)), vec![NO_CONNECTION_NOTICE.to_string()]);

    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn choose_on_closed_channel_still_records_the_choice() {
    let mut harness = Harness::new(ChannelState::Closed);
    let mut events = harness.session.subscribe_events();

    assert_eq!(harness.session.choose("Run"), ActionOutcome::Refused);

    assert!(harness.sent().is_empty());
    assert_eq!(harness.session.view().log().len(), 1);
    assert_eq!(notices(&drain(&mut events)), vec![CONNECTION_LOST_NOTICE.to_string()]);
}

#[tokio::test]
async fn nothing_is_sent_after_close_until_reopened() {
    let mut harness = Harness::open();
    harness.state.send_replace(ChannelState::Closed);
    harness.session.handle_channel_event(ChannelEvent::Closed);

    assert_eq!(harness.session.start(), ActionOutcome::Refused);
    assert_eq!(harness.session.next(), ActionOutcome::Refused);
    assert!(harness.sent().is_empty());

    harness.state.send_replace(ChannelState::Open);
    harness.session.handle_channel_event(ChannelEvent::Opened);

    assert_eq!(harness.session.start(), ActionOutcome::Sent);
    assert_eq!(harness.sent(), vec![ClientAction::StartStory]);
}

#[tokio::test]
async fn disabled_controls_ignore_actions_without_notice() {
    let mut harness = Harness::open();
    let mut events = harness.session.subscribe_events();

    assert_eq!(harness.session.next(), ActionOutcome::Ignored);
    assert!(harness.sent().is_empty());
    assert!(notices(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn actions_are_sent_during_a_running_reveal() {
    let mut harness = Harness::open();
    harness.frame(START);
    assert!(harness.session.staged.is_some(), "reveal still running");

    assert_eq!(harness.session.next(), ActionOutcome::Sent);
    assert_eq!(harness.session.start(), ActionOutcome::Ignored);
    assert_eq!(harness.sent(), vec![ClientAction::next()]);
}
