use std::net::TcpListener as StdListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use echemplot::transport::{Notifier, ReconnectPolicy, TransportChannel, TransportEvent};
use echemplot::ConnectionState;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

const HELLO: &str = r#"{"type":"connection_established","message":"Connected to mock data stream"}"#;

/// Websocket server on a loopback port. Each client gets `HELLO`; with
/// `close_after_hello` the server then closes the socket.
fn spawn_server(close_after_hello: bool) -> String {
    let listener = StdListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    if ws.send(Message::text(HELLO)).await.is_err() {
                        return;
                    }
                    if close_after_hello {
                        let _ = ws.close(None).await;
                    }
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });
    });
    format!("ws://127.0.0.1:{port}/ws")
}

fn refused_url() -> String {
    let listener = StdListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{port}/ws")
}

/// Collect events until `done` matches one, or fail after five seconds.
fn collect_until(
    rx: &Receiver<TransportEvent>,
    done: impl Fn(&TransportEvent) -> bool,
) -> Vec<TransportEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(event) => {
                let stop = done(&event);
                seen.push(event);
                if stop {
                    return seen;
                }
            }
            Err(e) => panic!("no matching event ({e:?}); saw {seen:?}"),
        }
    }
}

fn policy(delay_ms: u64, max_attempts: Option<u32>) -> ReconnectPolicy {
    ReconnectPolicy {
        delay: Duration::from_millis(delay_ms),
        max_attempts,
        ..ReconnectPolicy::default()
    }
}

#[test]
fn frames_arrive_after_connecting() {
    let url = spawn_server(false);
    let (tx, rx) = channel();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();
    let notify: Notifier = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let transport = TransportChannel::spawn(url, policy(50, Some(2)), tx, Some(notify)).unwrap();
    transport.connect().unwrap();

    let events = collect_until(&rx, |e| matches!(e, TransportEvent::Frame(_)));
    assert_eq!(
        events,
        vec![
            TransportEvent::StateChanged(ConnectionState::Connecting),
            TransportEvent::StateChanged(ConnectionState::Connected),
            TransportEvent::Frame(HELLO.to_string()),
        ]
    );
    transport.shutdown();
    // one wake per event, including the final disconnect
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![TransportEvent::StateChanged(
        ConnectionState::Disconnected
    )]);
    assert_eq!(wakes.load(Ordering::SeqCst), 4);
}

#[test]
fn deliberate_disconnect_does_not_reconnect() {
    let url = spawn_server(false);
    let (tx, rx) = channel();
    let transport = TransportChannel::spawn(url, policy(20, None), tx, None).unwrap();
    transport.connect().unwrap();
    collect_until(&rx, |e| matches!(e, TransportEvent::Frame(_)));

    transport.disconnect().unwrap();
    collect_until(&rx, |e| {
        *e == TransportEvent::StateChanged(ConnectionState::Disconnected)
    });
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(200)),
        Err(RecvTimeoutError::Timeout)
    );
    transport.shutdown();
}

#[test]
fn server_close_schedules_reconnect() {
    let url = spawn_server(true);
    let (tx, rx) = channel();
    let transport = TransportChannel::spawn(url, policy(20, Some(3)), tx, None).unwrap();
    transport.connect().unwrap();

    let first = collect_until(&rx, |e| matches!(e, TransportEvent::ReconnectScheduled { .. }));
    assert!(first.contains(&TransportEvent::StateChanged(ConnectionState::Connected)));
    assert_eq!(
        first.last(),
        Some(&TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(20),
        })
    );

    // a successful reconnect refills the budget, so the count starts over
    let second = collect_until(&rx, |e| matches!(e, TransportEvent::ReconnectScheduled { .. }));
    assert!(second.contains(&TransportEvent::StateChanged(ConnectionState::Connected)));
    assert!(second.contains(&TransportEvent::Frame(HELLO.to_string())));
    assert_eq!(
        second.last(),
        Some(&TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(20),
        })
    );
    transport.shutdown();
}

#[test]
fn refused_dial_exhausts_budget() {
    let (tx, rx) = channel();
    let transport = TransportChannel::spawn(refused_url(), policy(10, Some(2)), tx, None).unwrap();
    transport.connect().unwrap();

    let events = collect_until(&rx, |e| matches!(e, TransportEvent::RetriesExhausted { .. }));
    let attempts: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            TransportEvent::ReconnectScheduled { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(
        events.last(),
        Some(&TransportEvent::RetriesExhausted { attempts: 2 })
    );
    let dials = events
        .iter()
        .filter(|e| **e == TransportEvent::StateChanged(ConnectionState::Connecting))
        .count();
    assert_eq!(dials, 3);
    assert!(!events.contains(&TransportEvent::StateChanged(ConnectionState::Connected)));

    // a manual connect starts a fresh budget
    transport.connect().unwrap();
    let again = collect_until(&rx, |e| matches!(e, TransportEvent::ReconnectScheduled { .. }));
    assert_eq!(
        again.last(),
        Some(&TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(10),
        })
    );
    transport.shutdown();
}

#[test]
fn disconnect_cancels_pending_reconnect() {
    let (tx, rx) = channel();
    let transport = TransportChannel::spawn(refused_url(), policy(300, Some(5)), tx, None).unwrap();
    transport.connect().unwrap();
    let first = collect_until(&rx, |e| matches!(e, TransportEvent::ReconnectScheduled { .. }));
    assert_eq!(
        first.last(),
        Some(&TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(300),
        })
    );

    transport.disconnect().unwrap();
    // well past the armed delay: the timer must not dial again
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(700)),
        Err(RecvTimeoutError::Timeout)
    );

    // and the cancelled attempt does not count against the next connect
    transport.connect().unwrap();
    let again = collect_until(&rx, |e| matches!(e, TransportEvent::ReconnectScheduled { .. }));
    assert_eq!(
        again,
        vec![
            TransportEvent::StateChanged(ConnectionState::Connecting),
            TransportEvent::StateChanged(ConnectionState::Disconnected),
            TransportEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_millis(300),
            },
        ]
    );
    transport.shutdown();
}

#[test]
fn stalled_handshake_counts_as_failed_dial() {
    // accepts TCP but never answers the upgrade request
    let listener = StdListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let stalled = ReconnectPolicy {
        dial_timeout: Duration::from_millis(150),
        ..policy(20, Some(1))
    };
    let (tx, rx) = channel();
    let transport = TransportChannel::spawn(url, stalled, tx, None).unwrap();
    transport.connect().unwrap();

    let started = Instant::now();
    let events = collect_until(&rx, |e| matches!(e, TransportEvent::RetriesExhausted { .. }));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(
        events,
        vec![
            TransportEvent::StateChanged(ConnectionState::Connecting),
            TransportEvent::StateChanged(ConnectionState::Disconnected),
            TransportEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_millis(20),
            },
            TransportEvent::StateChanged(ConnectionState::Connecting),
            TransportEvent::StateChanged(ConnectionState::Disconnected),
            TransportEvent::RetriesExhausted { attempts: 1 },
        ]
    );
    transport.shutdown();
    drop(listener);
}
