//! Push transport integration tests
//!
//! Driven through the registry with a scripted HTTP fake on Tokio's paused
//! clock, so backoff timings are asserted in exact virtual time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use tokio::time::{sleep, Instant};

use aetherlink::{HostEnv, StreamRegistry};
use common::{test_config, FakeHttp, Recorder, StreamAttempt};

fn push_registry(http: Arc<FakeHttp>) -> StreamRegistry {
    StreamRegistry::new(
        http,
        Arc::new(aetherlink::StaticToken(None)),
        test_config(),
        HostEnv {
            restricted_network: false,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn connected_then_message_delivered_once_each() {
    let http = FakeHttp::new();
    http.push_stream(StreamAttempt::Chunks(vec![
        "event: connected\ndata: {\"playerId\":\"p1\",\"serverSessionId\":\"s1\"}\n\n".to_string(),
        "event: message\ndata: {\"id\":5}\n\n".to_string(),
    ]));

    let registry = push_registry(Arc::clone(&http));
    let recorder = Recorder::new();
    let _handle = registry.open("p1", recorder.subscriber()).unwrap();

    sleep(Duration::from_millis(10)).await;

    assert_eq!(
        recorder.connected(),
        vec![("p1".to_string(), None)]
    );
    assert_eq!(
        recorder.events(),
        vec![("message".to_string(), json!({"id": 5}))]
    );
    // The stream ended after delivering, so exactly one failure cycle
    assert_eq!(recorder.error_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn error_fires_once_per_cycle_across_failed_reconnects() {
    let http = FakeHttp::new();
    http.push_stream(StreamAttempt::Chunks(vec![
        "event: message\ndata: {\"n\":1}\n\n".to_string(),
    ]));
    http.push_stream(StreamAttempt::Status(500));
    http.push_stream(StreamAttempt::Status(500));
    http.push_stream(StreamAttempt::Chunks(vec![
        "event: message\ndata: {\"n\":2}\n\n".to_string(),
    ]));

    let registry = push_registry(Arc::clone(&http));
    let recorder = Recorder::new();
    let _handle = registry.open("p1", recorder.subscriber()).unwrap();

    // Reconnect delays: 5000, 7500, 11250 ms of virtual time
    sleep(Duration::from_millis(30_000)).await;

    assert!(http.stream_requests() >= 4);
    assert_eq!(recorder.event_count(), 2);
    // One error when the healthy stream dropped, none for the dead
    // reconnect attempts, one more when the second healthy stream dropped
    assert_eq!(recorder.error_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_while_streams_are_short_lived() {
    let http = FakeHttp::new();
    for n in 1..=4 {
        http.push_stream(StreamAttempt::Chunks(vec![format!(
            "event: message\ndata: {{\"n\":{}}}\n\n",
            n
        )]));
    }

    let registry = push_registry(Arc::clone(&http));
    let recorder = Recorder::new();
    let _handle = registry.open("p1", recorder.subscriber()).unwrap();

    sleep(Duration::from_millis(30_000)).await;

    let times = http.request_times();
    assert!(times.len() >= 4);
    let gap1 = times[1] - times[0];
    let gap2 = times[2] - times[1];
    let gap3 = times[3] - times[2];

    // Streams delivered but died instantly, so the delay keeps growing
    assert!(gap1 >= Duration::from_millis(4_900) && gap1 <= Duration::from_millis(5_200));
    assert!(gap2 >= Duration::from_millis(7_400) && gap2 <= Duration::from_millis(7_700));
    assert!(gap3 >= Duration::from_millis(11_100) && gap3 <= Duration::from_millis(11_500));
}

#[tokio::test(start_paused = true)]
async fn stable_stream_resets_backoff() {
    let http = FakeHttp::new();
    http.push_stream(StreamAttempt::Status(500));
    http.push_stream(StreamAttempt::Status(500));
    let live = http.live_stream();

    let registry = push_registry(Arc::clone(&http));
    let recorder = Recorder::new();
    let _handle = registry.open("p1", recorder.subscriber()).unwrap();

    // Two failures grow the backoff (5000 then 7500 ms); the live stream
    // starts at t=12500
    sleep(Duration::from_millis(13_000)).await;
    assert_eq!(http.stream_requests(), 3);

    live.send(Bytes::from("event: message\ndata: {\"n\":1}\n\n"))
        .unwrap();

    // Hold the stream open past the stable threshold before dropping it
    sleep(Duration::from_millis(15_000)).await;
    let dropped_at = Instant::now();
    drop(live);

    sleep(Duration::from_millis(10_000)).await;

    let times = http.request_times();
    assert_eq!(times.len(), 4);
    // The delivered-and-stable stream reset the delay to its initial value
    let gap = times[3] - dropped_at;
    assert!(gap >= Duration::from_millis(4_900) && gap <= Duration::from_millis(5_200));
}

#[tokio::test(start_paused = true)]
async fn close_stops_all_network_activity() {
    let http = FakeHttp::new();
    let live = http.live_stream();

    let registry = push_registry(Arc::clone(&http));
    let recorder = Recorder::new();
    let handle = registry.open("p1", recorder.subscriber()).unwrap();

    sleep(Duration::from_millis(10)).await;
    live.send(Bytes::from("event: message\ndata: {\"n\":1}\n\n"))
        .unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(recorder.event_count(), 1);

    handle.close();
    assert_eq!(registry.connection_count(), 0);
    sleep(Duration::from_millis(60_000)).await;

    // No reconnects were attempted and the reader is gone
    assert_eq!(http.stream_requests(), 1);
    assert!(live
        .send(Bytes::from("event: message\ndata: {\"n\":2}\n\n"))
        .is_err());
    assert_eq!(recorder.event_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn multiline_data_arrives_joined() {
    let http = FakeHttp::new();
    http.push_stream(StreamAttempt::Chunks(vec![
        "event: note\ndata: first\ndata: second\n\n".to_string(),
    ]));

    let registry = push_registry(Arc::clone(&http));
    let recorder = Recorder::new();
    let _handle = registry.open("p1", recorder.subscriber()).unwrap();

    sleep(Duration::from_millis(10)).await;

    // Unparseable text is preserved raw, newline-joined
    assert_eq!(
        recorder.raw_events(),
        vec![("note".to_string(), "first\nsecond".to_string())]
    );
}
