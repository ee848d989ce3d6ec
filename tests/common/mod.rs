//! Local HTTP fixture for download tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_RANGE, RANGE};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

/// How the fixture answers a `Range` request
#[derive(Debug, Clone, Copy)]
pub enum RangeMode {
    Honor,
    /// Always answer 200 with the full body
    Ignore,
    /// Always answer with this status and no body
    Status(u16),
    /// First request sends `cut` bytes then drops the connection; later ones honor ranges
    InterruptOnce { cut: usize },
    /// Sends `cut` bytes of a 200 body, then nothing more
    Stall { cut: usize },
}

#[derive(Clone)]
pub struct Fixture {
    pub body: Arc<Vec<u8>>,
    pub mode: RangeMode,
    /// Body bytes handed to the client, across all requests
    pub served: Arc<AtomicU64>,
    pub requests: Arc<AtomicUsize>,
    pub ranges: Arc<Mutex<Vec<Option<String>>>>,
    pub paths: Arc<Mutex<Vec<String>>>,
    interrupted: Arc<AtomicBool>,
}

impl Fixture {
    pub fn new(body: Vec<u8>, mode: RangeMode) -> Self {
        Self {
            body: Arc::new(body),
            mode,
            served: Arc::new(AtomicU64::new(0)),
            requests: Arc::new(AtomicUsize::new(0)),
            ranges: Arc::new(Mutex::new(Vec::new())),
            paths: Arc::new(Mutex::new(Vec::new())),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn ranges(&self) -> Vec<Option<String>> {
        self.ranges.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// Bind on an ephemeral port and serve in the background
    pub async fn spawn(&self) -> SocketAddr {
        let app = Router::new().fallback(serve).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

/// Deterministic payload spanning several transfer chunks
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn requested_start(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RANGE)?.to_str().ok()?;
    let spec = value.strip_prefix("bytes=")?;
    let (start, _) = spec.split_once('-')?;
    start.parse().ok()
}

fn full(fx: &Fixture) -> Response {
    fx.served.fetch_add(fx.body.len() as u64, Ordering::SeqCst);
    (StatusCode::OK, fx.body.as_ref().clone()).into_response()
}

fn partial(fx: &Fixture, start: u64) -> Response {
    let total = fx.body.len() as u64;
    if start >= total {
        return (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(CONTENT_RANGE, format!("bytes */{total}"))],
        )
            .into_response();
    }
    let slice = fx.body[start as usize..].to_vec();
    fx.served.fetch_add(slice.len() as u64, Ordering::SeqCst);
    (
        StatusCode::PARTIAL_CONTENT,
        [(CONTENT_RANGE, format!("bytes {}-{}/{}", start, total - 1, total))],
        slice,
    )
        .into_response()
}

fn honor(fx: &Fixture, headers: &HeaderMap) -> Response {
    match requested_start(headers) {
        Some(start) => partial(fx, start),
        None => full(fx),
    }
}

async fn serve(State(fx): State<Fixture>, uri: Uri, headers: HeaderMap) -> Response {
    fx.requests.fetch_add(1, Ordering::SeqCst);
    fx.paths.lock().unwrap().push(uri.path().to_string());
    fx.ranges.lock().unwrap().push(
        headers
            .get(RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    match fx.mode {
        RangeMode::Honor => honor(&fx, &headers),
        RangeMode::Ignore => full(&fx),
        RangeMode::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        RangeMode::InterruptOnce { cut } => {
            if fx.interrupted.swap(true, Ordering::SeqCst) {
                return honor(&fx, &headers);
            }
            let head = fx.body[..cut].to_vec();
            fx.served.fetch_add(head.len() as u64, Ordering::SeqCst);
            let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
                Ok(head),
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "fixture cut")),
            ];
            (StatusCode::OK, Body::from_stream(futures::stream::iter(chunks))).into_response()
        }
        RangeMode::Stall { cut } => {
            let head = fx.body[..cut].to_vec();
            fx.served.fetch_add(head.len() as u64, Ordering::SeqCst);
            let stream = futures::stream::iter([Ok::<_, std::io::Error>(head)])
                .chain(futures::stream::pending());
            (StatusCode::OK, Body::from_stream(stream)).into_response()
        }
    }
}
