//! Integration tests for broadcast results and history.

use std::time::{Duration, SystemTime};

use proptest::prelude::*;
use rust_broadcast::config::DEFAULT_HISTORY_CAPACITY;
use rust_broadcast::registry::SessionRegistry;
use rust_broadcast::result::aggregate_output;
use rust_broadcast::{
    BroadcastHistory, BroadcastId, BroadcastResult, BroadcastState, NewSession, OverallStatus,
    Session, SessionResult, SessionType,
};

fn sessions(n: usize) -> Vec<Session> {
    let mut registry = SessionRegistry::new();
    for i in 0..n {
        registry.register(NewSession::new(format!("host-{i}"), SessionType::Local));
    }
    registry.list()
}

fn broadcast(id: &str, results: Vec<SessionResult>) -> BroadcastResult {
    BroadcastResult::new(
        BroadcastId::from(id),
        "true",
        SystemTime::now(),
        results,
        BroadcastState::Completed,
        false,
    )
}

#[test]
fn default_capacity_keeps_last_thousand() {
    let session = &sessions(1)[0];
    let mut history = BroadcastHistory::default();
    assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);

    for i in 0..=DEFAULT_HISTORY_CAPACITY {
        history.push(broadcast(
            &format!("b-{i}"),
            vec![SessionResult::completed(session, "", 0, Duration::ZERO)],
        ));
    }

    assert_eq!(history.len(), 1000);
    assert_eq!(history.evicted(), 1);
    assert_eq!(history.total_pushed(), 1001);
    assert!(history.get(&BroadcastId::from("b-0")).is_none());
    assert_eq!(
        history.recent(1)[0].broadcast_id,
        BroadcastId::from("b-1000")
    );
    assert_eq!(
        history.iter().next().map(|r| r.broadcast_id.as_str()),
        Some("b-1")
    );
}

#[test]
fn get_returns_newest_match() {
    let session = &sessions(1)[0];
    let mut history = BroadcastHistory::new(10);
    history.push(broadcast(
        "group-1",
        vec![SessionResult::completed(session, "old", 0, Duration::ZERO)],
    ));
    history.push(broadcast(
        "group-1",
        vec![SessionResult::completed(session, "new", 0, Duration::ZERO)],
    ));

    let latest = history.get(&BroadcastId::from("group-1")).unwrap();
    assert_eq!(latest.results[0].output, "new");
}

#[test]
fn restore_keeps_newest_entries() {
    let session = &sessions(1)[0];
    let entries: Vec<_> = (0..5)
        .map(|i| {
            broadcast(
                &format!("b-{i}"),
                vec![SessionResult::completed(session, "", 0, Duration::ZERO)],
            )
        })
        .collect();

    let history = BroadcastHistory::restore(entries, 3);
    let ids: Vec<_> = history.iter().map(|r| r.broadcast_id.to_string()).collect();
    assert_eq!(ids, ["b-2", "b-3", "b-4"]);
}

#[test]
fn skipped_sessions_and_the_average() {
    let s = sessions(3);
    let results = vec![
        SessionResult::completed(&s[0], "", 0, Duration::from_millis(100)),
        SessionResult::completed(&s[1], "", 1, Duration::from_millis(300)),
        SessionResult::skipped(&s[2]),
    ];

    let included = BroadcastResult::new(
        BroadcastId::from("x"),
        "ls",
        SystemTime::now(),
        results.clone(),
        BroadcastState::Completed,
        false,
    );
    assert_eq!(included.summary.failed_sessions, 2);
    assert_eq!(
        included.summary.average_execution_time,
        Duration::from_nanos(400_000_000 / 3)
    );

    let excluded = BroadcastResult::new(
        BroadcastId::from("x"),
        "ls",
        SystemTime::now(),
        results,
        BroadcastState::Completed,
        true,
    );
    assert_eq!(
        excluded.summary.average_execution_time,
        Duration::from_millis(200)
    );
}

#[test]
fn aggregated_output_skips_skipped_sessions() {
    let s = sessions(3);
    let results = vec![
        SessionResult::completed(&s[0], "up 3 days", 0, Duration::ZERO),
        SessionResult::failed(&s[1], "connection lost", Duration::ZERO),
        SessionResult::skipped(&s[2]),
    ];

    let text = aggregate_output(&results);
    assert!(text.contains("=== host-0 ===\nup 3 days\n"));
    assert!(text.contains("=== host-1 ===\n"));
    assert!(!text.contains("host-2"));
}

fn exit_codes() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(prop_oneof![3 => Just(0), 1 => 1..128i32], 1..20)
}

proptest! {
    #[test]
    fn summary_totals_are_consistent(codes in exit_codes()) {
        let s = sessions(codes.len());
        let results: Vec<_> = s
            .iter()
            .zip(&codes)
            .map(|(session, code)| SessionResult::completed(session, "", *code, Duration::from_millis(10)))
            .collect();
        let result = broadcast("p", results);
        let summary = result.summary;

        let ok = codes.iter().filter(|c| **c == 0).count();
        prop_assert_eq!(summary.total_sessions, codes.len());
        prop_assert_eq!(summary.successful_sessions, ok);
        prop_assert_eq!(summary.successful_sessions + summary.failed_sessions, summary.total_sessions);

        let expected = if ok == codes.len() {
            OverallStatus::Success
        } else if ok == 0 {
            OverallStatus::Failed
        } else {
            OverallStatus::Partial
        };
        prop_assert_eq!(result.overall_status, expected);
        prop_assert_eq!(summary.average_execution_time, Duration::from_millis(10));
    }
}
