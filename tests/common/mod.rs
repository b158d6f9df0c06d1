//! Test doubles: an in-process Riak HTTP node and a counting transport.

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use riak_http::{Client, ClientConfig, Transport};

/// Key that makes the mock node answer 503
pub const UNAVAILABLE_KEY: &str = "unavailable";

#[derive(Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    headers: Vec<(String, String)>,
    version: u64,
}

#[derive(Default)]
struct NodeState {
    objects: HashMap<(String, String), StoredObject>,
    requests: usize,
    last_put_headers: HeaderMap,
}

/// Minimal Riak HTTP node backed by a map
pub struct MockRiak {
    pub addr: SocketAddr,
    state: Arc<Mutex<NodeState>>,
}

impl MockRiak {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(NodeState::default()));

        let server_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| handle(state.clone(), req));
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn client(&self, bucket: &str) -> Client {
        self.client_with_limit(bucket, 20)
    }

    pub fn client_with_limit(&self, bucket: &str, limit: usize) -> Client {
        let config = ClientConfig::new(bucket)
            .with_host(self.addr.ip().to_string())
            .with_port(self.addr.port())
            .with_concurrency_limit(limit);
        Client::with_config(config).unwrap()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Raw stored body, as the node received it
    pub fn stored_body(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    /// Header value the node received on the most recent PUT
    pub fn last_put_header(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let value = state.last_put_headers.get(name)?;
        Some(value.to_str().ok()?.to_string())
    }
}

fn respond(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

fn object_response(bucket: &str, status: StatusCode, object: &StoredObject) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(status)
        .header("content-type", object.content_type.as_str())
        .header("x-riak-vclock", format!("a85hYGBgzGDKBVIcR4M2cgczH7HPYEpkzGNlsP/VfYYvCwA={}", object.version))
        .header("etag", format!("\"v{}\"", object.version))
        .header("server", "MochiWeb/1.1 WebMachine/1.10.0 (never breaks eye contact)");

    let mut links = vec![format!("</buckets/{}>; rel=\"up\"", bucket)];
    for (name, value) in &object.headers {
        if name == "link" {
            links.push(value.clone());
        } else {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    builder = builder.header("link", links.join(", "));

    builder.body(Full::new(object.body.clone())).unwrap()
}

fn index_matches(index: &str, value: &str, start: &str, end: Option<&str>) -> bool {
    match end {
        None => value == start,
        Some(end) if index.ends_with("_int") => {
            match (value.parse::<i64>(), start.parse::<i64>(), end.parse::<i64>()) {
                (Ok(v), Ok(s), Ok(e)) => s <= v && v <= e,
                _ => false,
            }
        }
        Some(end) => start <= value && value <= end,
    }
}

async fn handle(
    state: Arc<Mutex<NodeState>>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();
    let headers = req.headers().clone();
    let body = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let mut state = state.lock().unwrap();
    state.requests += 1;

    let response = match segments.as_slice() {
        ["buckets", _, "keys", key] if *key == UNAVAILABLE_KEY => {
            respond(StatusCode::SERVICE_UNAVAILABLE, Bytes::new())
        }
        ["buckets", bucket, "keys", key] => {
            let id = (bucket.to_string(), key.to_string());
            match method {
                Method::GET => match state.objects.get(&id) {
                    Some(object) => object_response(bucket, StatusCode::OK, object),
                    None => respond(StatusCode::NOT_FOUND, Bytes::from_static(b"not found\n")),
                },
                Method::PUT => {
                    state.last_put_headers = headers.clone();
                    let version = state.objects.get(&id).map(|o| o.version + 1).unwrap_or(1);
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let kept = headers
                        .iter()
                        .filter(|(name, _)| {
                            let name = name.as_str();
                            name == "link" || name.starts_with("x-riak-meta-") || name.starts_with("x-riak-index-")
                        })
                        .filter_map(|(name, value)| {
                            Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
                        })
                        .collect();
                    let object = StoredObject {
                        body,
                        content_type,
                        headers: kept,
                        version,
                    };
                    let response = if query.contains("returnbody=true") {
                        object_response(bucket, StatusCode::OK, &object)
                    } else {
                        respond(StatusCode::NO_CONTENT, Bytes::new())
                    };
                    state.objects.insert(id, object);
                    response
                }
                Method::DELETE => match state.objects.remove(&id) {
                    Some(_) => respond(StatusCode::NO_CONTENT, Bytes::new()),
                    None => respond(StatusCode::NOT_FOUND, Bytes::new()),
                },
                _ => respond(StatusCode::METHOD_NOT_ALLOWED, Bytes::new()),
            }
        }
        ["buckets", bucket, "index", index, terms @ ..] if !terms.is_empty() && terms.len() <= 2 => {
            let header = format!("x-riak-index-{}", index);
            let mut keys: Vec<String> = state
                .objects
                .iter()
                .filter(|((b, _), _)| b.as_str() == *bucket)
                .filter(|(_, object)| {
                    object.headers.iter().any(|(name, value)| {
                        *name == header && index_matches(index, value, terms[0], terms.get(1).copied())
                    })
                })
                .map(|((_, key), _)| key.clone())
                .collect();
            keys.sort();

            let json = serde_json::json!({ "keys": keys }).to_string();
            let mut response = respond(StatusCode::OK, Bytes::from(json));
            response
                .headers_mut()
                .insert("content-type", HeaderValue::from_static("application/json"));
            response
        }
        _ => respond(StatusCode::BAD_REQUEST, Bytes::new()),
    };

    Ok(response)
}

/// Transport stub that records how many exchanges overlap.
///
/// GET answers with a JSON body naming the requested key, PUT echoes the
/// request body, DELETE answers 204. A key listed in `failing` answers 500.
#[derive(Default)]
pub struct CountingTransport {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    total: AtomicUsize,
    finished: AtomicUsize,
    failing: Vec<String>,
    delay: Duration,
}

impl CountingTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Exchanges that ran to the end of their delay
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Shares one counting transport between a client and the test body
#[derive(Clone)]
pub struct SharedTransport(pub Arc<CountingTransport>);

#[async_trait]
impl Transport for SharedTransport {
    async fn send(&self, request: Request<Bytes>) -> riak_http::Result<Response<Bytes>> {
        let counter = &self.0;
        let now = counter.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counter.max_in_flight.fetch_max(now, Ordering::SeqCst);
        counter.total.fetch_add(1, Ordering::SeqCst);

        // Later keys finish first so completion order differs from input order
        let key = request.uri().path().rsplit('/').next().unwrap_or_default().to_string();
        let stagger = key.parse::<u64>().map(|n| 20u64.saturating_sub(n)).unwrap_or(0);
        tokio::time::sleep(counter.delay + Duration::from_millis(stagger)).await;

        counter.in_flight.fetch_sub(1, Ordering::SeqCst);
        counter.finished.fetch_add(1, Ordering::SeqCst);

        if counter.failing.contains(&key) {
            return Ok(Response::builder().status(500).body(Bytes::new()).unwrap());
        }

        let mut headers = HeaderMap::new();
        headers.insert("x-riak-vclock", HeaderValue::from_static("a:1"));
        let response = match *request.method() {
            Method::GET => {
                headers.insert("content-type", HeaderValue::from_static("application/json"));
                Response::builder()
                    .status(200)
                    .body(Bytes::from(serde_json::json!({ "key": key }).to_string()))
            }
            Method::PUT => {
                if let Some(ct) = request.headers().get("content-type") {
                    headers.insert("content-type", ct.clone());
                }
                Response::builder().status(200).body(request.body().clone())
            }
            _ => Response::builder().status(204).body(Bytes::new()),
        };

        let mut response = response.unwrap();
        response.headers_mut().extend(headers);
        Ok(response)
    }
}

pub fn stub_client(transport: &Arc<CountingTransport>, limit: usize) -> Client {
    let config = ClientConfig::new("stub")
        .with_host("127.0.0.1")
        .with_port(8098)
        .with_concurrency_limit(limit);
    Client::with_transport(config, SharedTransport(transport.clone())).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
