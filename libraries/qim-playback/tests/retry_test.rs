//! Failure handling: backoff retries, skipping, and cancellation

mod common;

use common::{audio_url, create_test_items, Harness};
use qim_playback::{
    EngineConfig, EngineEvent, FailureKind, PlayTicket, PlayerState, RepeatMode, ResourceEvent,
    TimerKind,
};

#[test]
fn test_two_retries_then_skip() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(3), 0);

    harness.fail_current();
    assert_eq!(harness.engine.state(), PlayerState::Error);
    assert!(harness.engine.is_playing());

    // First retry after 1s
    harness.advance_ms(999);
    assert_eq!(harness.engine.state(), PlayerState::Error);
    harness.advance_ms(1);
    assert_eq!(harness.engine.state(), PlayerState::Loading);

    // Second retry after 2s
    harness.fail_current();
    harness.advance_ms(1999);
    assert_eq!(harness.engine.state(), PlayerState::Error);
    harness.advance_ms(1);
    assert_eq!(harness.engine.state(), PlayerState::Loading);

    // Out of retries: move on
    harness.fail_current();
    assert_eq!(harness.engine.current_index(), 1);
    assert_eq!(harness.engine.state(), PlayerState::Loading);

    assert_eq!(
        harness.resource.sources(),
        vec![audio_url(1), audio_url(1), audio_url(1), audio_url(2)]
    );

    let events = harness.events();
    assert!(events.contains(&EngineEvent::RetryScheduled {
        index: 0,
        attempt: 1,
        delay_ms: 1000
    }));
    assert!(events.contains(&EngineEvent::RetryScheduled {
        index: 0,
        attempt: 2,
        delay_ms: 2000
    }));
    assert!(events.contains(&EngineEvent::ItemSkipped {
        index: 0,
        reference: "2:1".to_string(),
        attempts: 2
    }));
}

#[test]
fn test_exhausted_last_item_finishes() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 0,
        ..EngineConfig::default()
    });
    harness.play_all(create_test_items(2), 1);

    harness.fail_current();

    assert_eq!(harness.engine.state(), PlayerState::Finished);
    assert!(!harness.engine.is_playing());
    assert_eq!(harness.finished_count(), 1);
}

#[test]
fn test_exhausted_item_under_repeat_item_does_not_loop() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 1,
        ..EngineConfig::default()
    });
    harness.engine.set_repeat_mode(RepeatMode::Item);
    harness.play_all(create_test_items(3), 1);

    harness.fail_current();
    harness.advance_ms(1000);
    harness.fail_current();

    assert_eq!(harness.engine.state(), PlayerState::Finished);
    assert_eq!(harness.resource.sources().len(), 2);
}

#[test]
fn test_retry_success_continues_normally() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(2), 0);

    harness.fail_current();
    harness.advance_ms(1000);
    harness.play_through();

    assert_eq!(harness.engine.current_index(), 1);
    assert_eq!(harness.engine.state(), PlayerState::Loading);
}

#[test]
fn test_stop_cancels_pending_retry() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(2), 0);
    harness.fail_current();
    assert!(harness.clock.pending_kinds().contains(&TimerKind::Retry));

    harness.engine.stop();
    assert!(!harness.clock.pending_kinds().contains(&TimerKind::Retry));

    let plays = harness.resource.plays();
    harness.advance_ms(10_000);
    assert_eq!(harness.engine.state(), PlayerState::Idle);
    assert_eq!(harness.resource.plays(), plays);
}

#[test]
fn test_pause_cancels_pending_retry() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(2), 0);
    harness.fail_current();

    harness.engine.pause();
    harness.advance_ms(10_000);
    assert_eq!(harness.engine.state(), PlayerState::Paused);

    harness.engine.resume();
    assert_eq!(harness.engine.state(), PlayerState::Loading);
    assert_eq!(harness.resource.sources().len(), 2);
}

#[test]
fn test_resume_after_failure_mid_item_reloads() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(2), 0);
    harness.start_current();
    harness.fail_current();

    harness.engine.pause();
    harness.engine.resume();

    // The failed source is not resumed in place
    assert_eq!(harness.engine.state(), PlayerState::Loading);
    assert_eq!(harness.resource.sources(), vec![audio_url(1), audio_url(1)]);
    assert_eq!(harness.resource.plays(), 2);

    harness.start_current();
    assert_eq!(harness.engine.state(), PlayerState::Playing);
}

#[test]
fn test_stop_resets_retry_budget() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 1,
        ..EngineConfig::default()
    });
    harness.play_all(create_test_items(2), 0);
    harness.fail_current();
    harness.advance_ms(1000);

    harness.engine.stop();
    harness.play_all(create_test_items(2), 0);
    harness.fail_current();

    // Budget restored: a retry, not a skip
    assert_eq!(harness.engine.state(), PlayerState::Error);
    assert_eq!(harness.engine.current_index(), 0);
}

#[test]
fn test_exhausted_address_is_skipped_on_revisit() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 1,
        ..EngineConfig::default()
    });
    harness.engine.set_repeat_mode(RepeatMode::All);
    harness.play_all(create_test_items(2), 0);

    harness.fail_current();
    harness.advance_ms(1000);
    harness.fail_current();
    assert_eq!(harness.engine.current_index(), 1);

    // Wraps back onto the broken address: skipped without another retry
    harness.play_through();
    assert_eq!(harness.engine.current_index(), 0);
    harness.fail_current();
    assert_eq!(harness.engine.current_index(), 1);
    assert_eq!(harness.engine.state(), PlayerState::Loading);
}

#[test]
fn test_duplicate_failure_signal_counts_once() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(2), 0);

    let ticket = harness.resource.last_ticket();
    harness
        .engine
        .handle_resource_event(ResourceEvent::media_failure(ticket, "decode error"));
    harness
        .engine
        .handle_resource_event(ResourceEvent::media_failure(ticket, "network error"));

    let retries = harness
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::RetryScheduled { .. }))
        .count();
    assert_eq!(retries, 1);
}

#[test]
fn test_stale_failure_after_switch_is_ignored() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(3), 0);
    let abandoned = harness.resource.last_ticket();

    harness.engine.next();
    harness
        .engine
        .handle_resource_event(ResourceEvent::media_failure(abandoned, "aborted"));

    assert_eq!(harness.engine.state(), PlayerState::Loading);
    assert!(!harness
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::RetryScheduled { .. })));
}

#[test]
fn test_interruption_is_not_a_failure() {
    let mut harness = Harness::new();
    harness.play_all(create_test_items(2), 0);
    harness.start_current();

    let ticket = harness.resource.last_ticket();
    harness.engine.handle_resource_event(ResourceEvent::Failed {
        ticket,
        kind: FailureKind::Interrupted,
        message: "The play() request was interrupted".to_string(),
    });

    assert_eq!(harness.engine.state(), PlayerState::Playing);
    assert_eq!(harness.clock.pending_kinds(), vec![TimerKind::DebounceRearm]);
}

#[test]
fn test_all_items_exhausted_under_repeat_all_finishes() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 1,
        ..EngineConfig::default()
    });
    harness.engine.set_repeat_mode(RepeatMode::All);
    harness.play_all(create_test_items(2), 0);

    for _ in 0..2 {
        harness.fail_current();
        harness.advance_ms(1000);
        harness.fail_current();
    }

    assert_eq!(harness.engine.state(), PlayerState::Finished);
    assert!(!harness.engine.is_playing());
    assert_eq!(harness.finished_count(), 1);

    // Nothing left to act on
    let plays = harness.resource.plays();
    for _ in 0..100 {
        harness.fail_current();
        harness.advance_ms(5000);
    }
    assert_eq!(harness.resource.plays(), plays);
    assert_eq!(harness.finished_count(), 1);
}

#[test]
fn test_all_items_failing_under_shuffle_finishes() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 0,
        ..EngineConfig::default()
    });
    harness.engine.set_shuffle(true);
    harness.engine.set_repeat_mode(RepeatMode::All);
    harness.play_all(create_test_items(3), 0);

    for _ in 0..10 {
        harness.fail_current();
    }

    assert_eq!(harness.engine.state(), PlayerState::Finished);
    assert_eq!(harness.resource.plays(), 3);
    assert_eq!(harness.finished_count(), 1);
}

#[test]
fn test_playable_item_resets_skip_lap() {
    let mut harness = Harness::with_config(EngineConfig {
        max_retries: 0,
        ..EngineConfig::default()
    });
    harness.engine.set_repeat_mode(RepeatMode::All);
    harness.play_all(create_test_items(3), 0);

    // Two dead items around one that plays, for several laps
    for _ in 0..3 {
        harness.fail_current();
        harness.play_through();
        harness.fail_current();
    }

    assert_eq!(harness.engine.state(), PlayerState::Loading);
    assert_eq!(harness.engine.current_index(), 0);
    assert_eq!(harness.finished_count(), 0);
}

fn deliver_late_signals(harness: &mut Harness, ticket: PlayTicket) {
    harness.engine.handle_resource_event(ResourceEvent::Started(ticket));
    harness.engine.handle_resource_event(ResourceEvent::Ended(ticket));
    harness
        .engine
        .handle_resource_event(ResourceEvent::media_failure(ticket, "network error"));
}

#[test]
fn test_signals_from_before_stop_are_discarded() {
    let mut harness = Harness::with_config(EngineConfig {
        debounce_ms: 0,
        ..EngineConfig::default()
    });
    harness.play_all(create_test_items(3), 0);
    let ticket = harness.resource.last_ticket();

    harness.engine.stop();
    harness.clear_snapshots();
    let calls = harness.resource.calls().len();

    deliver_late_signals(&mut harness, ticket);

    assert_eq!(harness.engine.state(), PlayerState::Idle);
    assert!(!harness.engine.is_playing());
    assert!(harness.events().is_empty());
    assert_eq!(harness.clock.pending(), 0);
    assert_eq!(harness.resource.calls().len(), calls);
}

#[test]
fn test_signals_from_before_cleanup_are_discarded() {
    let mut harness = Harness::with_config(EngineConfig {
        debounce_ms: 0,
        ..EngineConfig::default()
    });
    harness.play_all(create_test_items(3), 0);
    harness.start_current();
    let ticket = harness.resource.last_ticket();

    harness.engine.cleanup();
    harness.clear_snapshots();
    let calls = harness.resource.calls().len();

    deliver_late_signals(&mut harness, ticket);
    harness.advance_ms(10_000);

    assert!(harness.engine.is_released());
    assert_eq!(harness.engine.state(), PlayerState::Idle);
    assert!(harness.events().is_empty());
    assert_eq!(harness.clock.pending(), 0);
    assert_eq!(harness.resource.calls().len(), calls);
}
