//! Scripted HTTP fake shared by the transport integration tests
//!
//! Each request pops the next scripted attempt; an exhausted script hangs
//! forever, leaving the transport visibly idle for assertions.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use aetherlink::http::{HttpClient, HttpError, HttpResult, JsonResponse, StreamResponse};

/// One scripted response to a streaming GET
pub enum StreamAttempt {
    /// Non-success response with no body
    Status(u16),
    /// Body that yields these chunks, then ends cleanly
    Chunks(Vec<String>),
    /// Body fed live from a channel; ends when the sender drops
    Live(mpsc::UnboundedReceiver<Bytes>),
}

/// One scripted response to a long-poll GET
pub enum PollAttempt {
    /// 200 with this JSON body
    Json(Value),
    /// Non-success status with no body
    Status(u16),
    /// Transport-level failure
    Error,
    /// Never resolves; the test aborts it via pause or close
    Hang,
}

#[derive(Default)]
pub struct FakeHttp {
    stream_script: Mutex<VecDeque<StreamAttempt>>,
    poll_script: Mutex<VecDeque<PollAttempt>>,
    stream_requests: AtomicUsize,
    poll_requests: AtomicUsize,
    poll_urls: Mutex<Vec<String>>,
    request_times: Mutex<Vec<Instant>>,
}

impl FakeHttp {
    pub fn new() -> Arc<FakeHttp> {
        Arc::new(FakeHttp::default())
    }

    pub fn push_stream(&self, attempt: StreamAttempt) {
        self.stream_script.lock().unwrap().push_back(attempt);
    }

    pub fn push_poll(&self, attempt: PollAttempt) {
        self.poll_script.lock().unwrap().push_back(attempt);
    }

    /// Open a live stream attempt, returning the chunk sender
    pub fn live_stream(&self) -> mpsc::UnboundedSender<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_stream(StreamAttempt::Live(rx));
        tx
    }

    pub fn stream_requests(&self) -> usize {
        self.stream_requests.load(Ordering::SeqCst)
    }

    pub fn poll_requests(&self) -> usize {
        self.poll_requests.load(Ordering::SeqCst)
    }

    pub fn poll_urls(&self) -> Vec<String> {
        self.poll_urls.lock().unwrap().clone()
    }

    /// Instants at which requests arrived, in order, across both shapes
    pub fn request_times(&self) -> Vec<Instant> {
        self.request_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get_json(&self, url: &str, _bearer: Option<&str>) -> HttpResult<JsonResponse> {
        self.poll_requests.fetch_add(1, Ordering::SeqCst);
        self.poll_urls.lock().unwrap().push(url.to_string());
        self.request_times.lock().unwrap().push(Instant::now());

        let attempt = self.poll_script.lock().unwrap().pop_front();
        match attempt {
            Some(PollAttempt::Json(body)) => Ok(JsonResponse {
                status: 200,
                body: Some(body),
            }),
            Some(PollAttempt::Status(status)) => Ok(JsonResponse { status, body: None }),
            Some(PollAttempt::Error) => Err(HttpError::Request("refused".to_string())),
            Some(PollAttempt::Hang) | None => std::future::pending().await,
        }
    }

    async fn get_stream(&self, _url: &str, _bearer: Option<&str>) -> HttpResult<StreamResponse> {
        self.stream_requests.fetch_add(1, Ordering::SeqCst);
        self.request_times.lock().unwrap().push(Instant::now());

        let attempt = self.stream_script.lock().unwrap().pop_front();
        match attempt {
            Some(StreamAttempt::Status(status)) => Ok(StreamResponse { status, body: None }),
            Some(StreamAttempt::Chunks(chunks)) => {
                let chunks: Vec<HttpResult<Bytes>> =
                    chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
                Ok(StreamResponse {
                    status: 200,
                    body: Some(Box::pin(futures_util::stream::iter(chunks))),
                })
            }
            Some(StreamAttempt::Live(rx)) => {
                let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv()
                        .await
                        .map(|bytes| (Ok::<Bytes, HttpError>(bytes), rx))
                });
                Ok(StreamResponse {
                    status: 200,
                    body: Some(Box::pin(stream)),
                })
            }
            None => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct RecorderInner {
    connected: Mutex<Vec<(String, Option<u64>)>>,
    events: Mutex<Vec<(String, Value)>>,
    raw_events: Mutex<Vec<(String, String)>>,
    errors: Mutex<Vec<String>>,
}

/// Records everything one subscriber receives
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder::default()
    }

    /// Build a subscriber wired to this recorder
    pub fn subscriber(&self) -> aetherlink::Subscriber {
        let connected = Arc::clone(&self.inner);
        let events = Arc::clone(&self.inner);
        let errors = Arc::clone(&self.inner);

        aetherlink::Subscriber::new()
            .on_connected(move |info| {
                connected
                    .connected
                    .lock()
                    .unwrap()
                    .push((info.player_id.clone(), info.last_event_id));
            })
            .on_event(move |name, payload| match payload {
                aetherlink::EventPayload::Json(value) => {
                    events
                        .events
                        .lock()
                        .unwrap()
                        .push((name.to_string(), value.clone()));
                }
                aetherlink::EventPayload::Raw(text) => {
                    events
                        .raw_events
                        .lock()
                        .unwrap()
                        .push((name.to_string(), text.clone()));
                }
            })
            .on_error(move |error| {
                errors.errors.lock().unwrap().push(error.to_string());
            })
    }

    pub fn connected(&self) -> Vec<(String, Option<u64>)> {
        self.inner.connected.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.inner.events.lock().unwrap().clone()
    }

    pub fn raw_events(&self) -> Vec<(String, String)> {
        self.inner.raw_events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.errors.lock().unwrap().clone()
    }

    pub fn connected_count(&self) -> usize {
        self.inner.connected.lock().unwrap().len()
    }

    pub fn event_count(&self) -> usize {
        self.inner.events.lock().unwrap().len()
    }

    pub fn error_count(&self) -> usize {
        self.inner.errors.lock().unwrap().len()
    }
}

/// A config pointing at the fake server
pub fn test_config() -> aetherlink::StreamConfig {
    aetherlink::StreamConfig::new("http://stream.test/")
}
