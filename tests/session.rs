use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use echemplot::error::InvariantViolation;
use echemplot::render::RebuildReason;
use echemplot::{
    ConnectionState, ConnectionStatus, EchemPlotConfig, LiveSession, RenderUpdate,
    TransportEvent,
};

fn session(max_points: usize) -> LiveSession {
    let cfg = EchemPlotConfig {
        max_points,
        ..EchemPlotConfig::default()
    };
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    LiveSession::with_clock(&cfg, ConnectionStatus::new(), Arc::new(move || at))
}

fn point(technique: &str, x: f64, y: f64) -> String {
    format!(r#"{{"type":"data_point","technique":"{technique}","x":{x},"y":{y}}}"#)
}

fn feed(s: &mut LiveSession, frames: &[String]) {
    for f in frames {
        s.handle_frame(f);
    }
}

fn mixed_stream() -> Vec<String> {
    let mut frames = vec![r#"{"type":"technique_change","technique":{"text":"CV"}}"#.to_string()];
    frames.extend((0..6).map(|i| point("CV", i as f64 * 0.1, i as f64)));
    frames.push(r#"{"type":"technique_change","technique":"OCV"}"#.to_string());
    frames.extend((0..4).map(|i| point("OCV", i as f64, 0.5)));
    frames.push(r#"{"type":"data_point","technique":{"text":"CV"},"x":9,"y":9}"#.to_string());
    frames
}

#[test]
fn ocv_run_reaches_every_consumer() {
    let mut s = session(1000);
    let update = s.handle_frame(r#"{"type":"technique_change","technique":{"text":"OCV"}}"#);
    assert_matches!(
        update,
        RenderUpdate::Rebuild { reason: RebuildReason::Refresh, .. }
    );
    assert!(s.threads().is_empty());

    let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
    let ys = [0.1, 0.2, 0.3, 0.4, 0.5];
    for (x, y) in xs.iter().zip(ys) {
        s.handle_frame(&point("OCV", *x, y));
    }

    let threads = s.threads().threads();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].title, "OCV-1");
    assert_eq!(threads[0].len(), 5);

    let series = s.series().get("OCV").unwrap();
    assert_eq!(series.x().iter().copied().collect::<Vec<_>>(), xs);
    assert_eq!(series.y().iter().copied().collect::<Vec<_>>(), ys);

    let ids: Vec<u64> = s.table().view().iter().map(|r| r.sequence).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(
        s.status().active_technique().as_deref(),
        Some("OCV")
    );
    assert_eq!(s.check_invariants(), Ok(()));
}

#[test]
fn counts_agree_with_and_without_eviction() {
    let mut roomy = session(1000);
    let mut tight = session(3);
    let frames = mixed_stream();
    feed(&mut roomy, &frames);
    feed(&mut tight, &frames);

    assert_eq!(roomy.check_invariants(), Ok(()));
    assert_eq!(tight.check_invariants(), Ok(()));

    assert_eq!(roomy.series().total_points(), roomy.threads().total_samples());
    assert_eq!(tight.threads().total_samples(), 11);
    assert_eq!(tight.table().len(), 11);
    assert_eq!(tight.series().get("CV").unwrap().len(), 3);
    assert_eq!(tight.series().get("CV").unwrap().appended(), 7);
    assert_ne!(tight.series().total_points(), tight.threads().total_samples());

    let titles: Vec<&str> = tight.threads().threads().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["CV-1", "OCV-2", "CV-3"]);
}

#[test]
fn table_cap_is_part_of_the_count_rule() {
    let mut cfg = EchemPlotConfig::default();
    cfg.table.max_rows = Some(4);
    let mut s = LiveSession::new(&cfg, ConnectionStatus::new());
    feed(&mut s, &mixed_stream());
    assert_eq!(s.table().len(), 4);
    assert_eq!(s.check_invariants(), Ok(()));
}

#[test]
fn reset_then_replay_matches_a_fresh_session() {
    let frames = mixed_stream();
    let mut fresh = session(5);
    feed(&mut fresh, &frames);

    let mut reused = session(5);
    feed(&mut reused, &frames);
    reused.click_table_row(0);
    let update = reused.reset();
    assert_matches!(update, RenderUpdate::Rebuild { reason: RebuildReason::Reset, .. });
    assert!(reused.series().is_empty());
    assert!(reused.threads().is_empty());
    assert!(reused.table().is_empty());
    assert!(reused.selection().is_none());
    assert_eq!(reused.status().active_technique(), None);

    feed(&mut reused, &frames);
    assert_eq!(reused.series(), fresh.series());
    assert_eq!(reused.threads(), fresh.threads());
    assert_eq!(reused.table(), fresh.table());
}

#[test]
fn reset_keeps_connection_state() {
    let mut s = session(10);
    s.handle_transport_event(TransportEvent::StateChanged(ConnectionState::Connecting));
    s.handle_transport_event(TransportEvent::StateChanged(ConnectionState::Connected));
    s.reset();
    assert_eq!(s.status().state(), ConnectionState::Connected);
}

#[test]
fn both_technique_shapes_share_series_and_thread() {
    let mut s = session(100);
    s.handle_frame(r#"{"type":"data_point","technique":{"text":"PEIS"},"x":1,"y":2}"#);
    s.handle_frame(r#"{"type":"data_point","technique":"PEIS","x":2,"y":3}"#);
    s.handle_frame(r#"{"type":"data_point","technique":{"text":"PEIS"},"x":3,"y":4}"#);

    assert_eq!(s.series().len(), 1);
    assert_eq!(s.series().get("PEIS").unwrap().len(), 3);
    assert_eq!(s.threads().len(), 1);
    assert_eq!(s.threads().threads()[0].len(), 3);
}

#[test]
fn malformed_frames_are_counted_and_skipped() {
    let mut s = session(100);
    assert_eq!(s.handle_frame("garbage"), RenderUpdate::Idle);
    s.handle_frame(r#"{"type":"data_point","technique":"CV","x":"1","y":0}"#);
    s.handle_frame(r#"{"type":"status_report"}"#);
    s.handle_frame(&point("CV", 1.0, 1.0));

    let snap = s.status().snapshot();
    assert_eq!(snap.dropped_frames, 2);
    assert_eq!(s.table().len(), 1);
    assert_eq!(s.table().view()[0].sequence, 1);
}

#[test]
fn chart_and_table_clicks_select_the_same_sample() {
    let mut s = session(100);
    feed(&mut s, &mixed_stream());

    let picked = s.click_chart("OCV", 2.0, 0.5, Some(9));
    assert_eq!(s.table().highlighted(), Some(&picked));
    let sample = s.selected_sample().unwrap();
    assert_eq!((sample.sequence, sample.x), (9, 2.0));

    // the table lists by id, so row 8 of page one is sample 9
    let from_table = s.click_table_row(8).unwrap();
    assert_eq!(from_table, picked);
    assert_eq!(s.selection(), Some(&picked));

    // a click past the last row of the page changes nothing
    assert!(s.click_table_row(999).is_none());
    assert_eq!(s.selection(), Some(&picked));
    assert_eq!(s.table().highlighted(), Some(&picked));

    s.clear_selection();
    assert!(s.selection().is_none());
    assert!(s.table().highlighted().is_none());
}

#[test]
fn thread_display_controls_leave_data_alone() {
    let mut s = session(100);
    feed(&mut s, &mixed_stream());
    let series_before = s.series().clone();

    assert!(s.reorder_threads(2, 0));
    assert!(s.select_thread(2));
    assert!(!s.select_thread(99));
    s.handle_frame(&point("CV", 10.0, 10.0));

    assert_eq!(s.threads().get(3).map(|t| t.len()), Some(2));
    assert_eq!(s.threads().selected_id(), Some(2));
    assert_eq!(series_before.get("OCV"), s.series().get("OCV"));
    assert_eq!(s.check_invariants(), Ok(()));
}

#[test]
fn transport_events_drive_status() {
    let mut s = session(100);
    let rx = s.status().subscribe();

    s.handle_transport_event(TransportEvent::StateChanged(ConnectionState::Connecting));
    s.handle_transport_event(TransportEvent::StateChanged(ConnectionState::Connected));
    s.handle_transport_event(TransportEvent::Frame(
        r#"{"type":"connection_established","message":"hello"}"#.to_string(),
    ));
    s.handle_transport_event(TransportEvent::FrameDropped {
        reason: "binary frame is not UTF-8".to_string(),
    });
    s.handle_transport_event(TransportEvent::StateChanged(ConnectionState::Disconnected));
    s.handle_transport_event(TransportEvent::ReconnectScheduled {
        attempt: 1,
        delay: Duration::from_millis(2000),
    });
    s.handle_transport_event(TransportEvent::RetriesExhausted { attempts: 5 });

    let snap = s.status().snapshot();
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert_eq!(snap.last_ack.as_deref(), Some("hello"));
    assert_eq!(snap.dropped_frames, 1);
    assert_eq!(snap.reconnect_attempt, 1);
    assert!(snap.retries_exhausted);

    let seen: Vec<ConnectionState> = rx.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected
        ]
    );
}

#[test]
fn invariant_violation_is_reported() {
    let err = InvariantViolation::TableThreadMismatch {
        table: 1,
        threads: 2,
    };
    assert_eq!(
        err.to_string(),
        "table holds 1 rows but threads hold 2 samples"
    );
}
