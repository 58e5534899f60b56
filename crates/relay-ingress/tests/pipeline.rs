//! End-to-end pipeline tests.
//!
//! Each test runs a real ingress server and a real fake-subscriber
//! server on ephemeral ports, entirely in-process, and drives traffic
//! through them with a plain hyper client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::sync::watch;

use relay_dispatch::Dispatcher;
use relay_ingress::{Ingress, IngressServer};
use relay_registry::{ControlPlaneError, TriggerDescriptor, TriggerPage, TriggerRegistry, TriggerSource};

const DEFAULT_TTL: i64 = 10;

/// In-memory control plane serving one fixed page.
struct StaticSource {
    triggers: Vec<TriggerDescriptor>,
}

impl TriggerSource for StaticSource {
    async fn list(&self, _page: Option<String>) -> Result<TriggerPage, ControlPlaneError> {
        Ok(TriggerPage {
            triggers: self.triggers.clone(),
            continue_token: None,
        })
    }
}

/// What the fake subscriber saw for one delivery.
#[derive(Debug, Clone)]
struct Delivery {
    headers: http::HeaderMap,
    body: Bytes,
}

struct FakeSubscriber {
    addr: SocketAddr,
    deliveries: Arc<std::sync::Mutex<Vec<Delivery>>>,
    hits: Arc<AtomicUsize>,
}

impl FakeSubscriber {
    /// Spawn a subscriber that answers every POST with the given
    /// status, headers, and body.
    async fn spawn(
        status: u16,
        reply_headers: Vec<(&'static str, &'static str)>,
        reply_body: &'static [u8],
    ) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let deliveries = Arc::new(std::sync::Mutex::new(Vec::new()));
        let hits = Arc::new(AtomicUsize::new(0));

        let deliveries_task = deliveries.clone();
        let hits_task = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let deliveries = deliveries_task.clone();
                let hits = hits_task.clone();
                let reply_headers = reply_headers.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                        let deliveries = deliveries.clone();
                        let hits = hits.clone();
                        let reply_headers = reply_headers.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            let headers = req.headers().clone();
                            let body = req.into_body().collect().await.unwrap().to_bytes();
                            deliveries.lock().unwrap().push(Delivery { headers, body });

                            let mut response = hyper::Response::builder().status(status);
                            for (name, value) in &reply_headers {
                                response = response.header(*name, *value);
                            }
                            Ok::<_, hyper::Error>(
                                response
                                    .body(Full::new(Bytes::from_static(reply_body)))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            deliveries,
            hits,
        }
    }

    fn uri(&self) -> String {
        format!("http://{}/", self.addr)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

fn trigger(
    ns: &str,
    name: &str,
    filter_type: &str,
    filter_source: &str,
    subscriber: &str,
) -> TriggerDescriptor {
    TriggerDescriptor {
        namespace: ns.to_string(),
        name: name.to_string(),
        filter_type: Some(filter_type.to_string()),
        filter_source: Some(filter_source.to_string()),
        subscriber_uri: Some(subscriber.to_string()),
    }
}

/// Prewarm a registry from the given triggers and start an ingress
/// server on an ephemeral port.
async fn start_broker(triggers: Vec<TriggerDescriptor>) -> (SocketAddr, watch::Sender<bool>) {
    let registry = Arc::new(TriggerRegistry::new());
    let warm = registry
        .prewarm(&StaticSource { triggers })
        .await
        .expect("prewarm");

    let ingress = Arc::new(Ingress::new(registry, Dispatcher::new(), DEFAULT_TTL));
    let server = IngressServer::bind("127.0.0.1:0".parse().unwrap(), ingress)
        .await
        .expect("bind");
    let addr = server.local_addr().expect("local addr");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move { server.serve(warm, shutdown_rx).await });

    (addr, shutdown_tx)
}

/// POST an event to the broker with an explicit trigger host.
async fn post_event(
    addr: SocketAddr,
    host: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &'static [u8],
) -> (http::StatusCode, http::HeaderMap, Bytes) {
    let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build_http();

    let mut request = http::Request::post(format!("http://{addr}{path}"))
        .header(http::header::HOST, host);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = request.body(Full::new(Bytes::from_static(body))).unwrap();

    let response = client.request(request).await.expect("broker reachable");
    let (parts, body) = response.into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    (parts.status, parts.headers, body)
}

#[tokio::test]
async fn matching_event_is_dispatched_with_decremented_ttl() {
    // Scenario A.
    let subscriber = FakeSubscriber::spawn(202, vec![], b"").await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "dev.example.foo",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, _, _) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[
            ("ce-eventtype", "dev.example.foo"),
            ("ce-source", "any-source"),
            ("relay-ttl", "5"),
        ],
        b"{\"n\":1}",
    )
    .await;

    assert_eq!(status, http::StatusCode::ACCEPTED);
    assert_eq!(subscriber.hits(), 1);
    let deliveries = subscriber.deliveries();
    assert_eq!(deliveries[0].headers.get("relay-ttl").unwrap(), "4");
    assert_eq!(
        deliveries[0].headers.get("ce-eventtype").unwrap(),
        "dev.example.foo"
    );
    assert_eq!(&deliveries[0].body[..], b"{\"n\":1}");
}

#[tokio::test]
async fn non_matching_event_is_accepted_but_not_dispatched() {
    // Scenario B.
    let subscriber = FakeSubscriber::spawn(202, vec![], b"").await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "dev.example.foo",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, _, _) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[("ce-eventtype", "dev.example.bar")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::ACCEPTED);
    assert_eq!(subscriber.hits(), 0);
}

#[tokio::test]
async fn unknown_trigger_is_rejected() {
    // Scenario C.
    let subscriber = FakeSubscriber::spawn(202, vec![], b"").await;
    let (addr, _shutdown) = start_broker(vec![]).await;

    let (status, headers, body) = post_event(
        addr,
        "ghost.default",
        "/",
        &[("ce-eventtype", "dev.example.foo")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "trigger not found");
    assert_eq!(subscriber.hits(), 0);
}

#[tokio::test]
async fn failing_subscriber_rejects_the_caller_without_retry() {
    // Scenario D.
    let subscriber = FakeSubscriber::spawn(500, vec![], b"boom").await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "Any",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, _, _) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[("ce-eventtype", "dev.example.foo")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(subscriber.hits(), 1);
}

#[tokio::test]
async fn subscriber_reply_is_surfaced_to_the_caller() {
    // Scenario E.
    let subscriber = FakeSubscriber::spawn(
        202,
        vec![
            ("ce-eventtype", "dev.example.reply"),
            ("ce-source", "subscriber"),
            ("content-type", "text/plain"),
        ],
        b"reply-payload",
    )
    .await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "Any",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, headers, body) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[("ce-eventtype", "dev.example.foo")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::ACCEPTED);
    assert_eq!(&body[..], b"reply-payload");
    assert_eq!(headers.get("ce-eventtype").unwrap(), "dev.example.reply");
    assert_eq!(headers.get("ce-source").unwrap(), "subscriber");
}

#[tokio::test]
async fn exhausted_ttl_is_silently_dropped() {
    let subscriber = FakeSubscriber::spawn(202, vec![], b"").await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "Any",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, _, _) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[("ce-eventtype", "dev.example.foo"), ("relay-ttl", "1")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::ACCEPTED);
    assert_eq!(subscriber.hits(), 0);
}

#[tokio::test]
async fn missing_ttl_is_reset_to_default_and_forwarded() {
    let subscriber = FakeSubscriber::spawn(202, vec![], b"").await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "Any",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, _, _) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[("ce-eventtype", "dev.example.foo")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::ACCEPTED);
    assert_eq!(subscriber.hits(), 1);
    let deliveries = subscriber.deliveries();
    assert_eq!(deliveries[0].headers.get("relay-ttl").unwrap(), "10");
}

#[tokio::test]
async fn wrong_path_and_method_are_rejected() {
    let (addr, _shutdown) = start_broker(vec![]).await;

    let (status, _, _) = post_event(addr, "t.default", "/events", &[], b"").await;
    assert_eq!(status, http::StatusCode::NOT_FOUND);

    let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build_http();
    let request = http::Request::get(format!("http://{addr}/"))
        .header(http::header::HOST, "t.default")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = client.request(request).await.unwrap();
    assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn malformed_host_is_rejected_with_structured_error() {
    let (addr, _shutdown) = start_broker(vec![]).await;

    let (status, _, body) = post_event(
        addr,
        "single-label",
        "/",
        &[("ce-eventtype", "dev.example.foo")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "bad host");
}

#[tokio::test]
async fn event_without_type_header_is_rejected() {
    let subscriber = FakeSubscriber::spawn(202, vec![], b"").await;
    let (addr, _shutdown) = start_broker(vec![trigger(
        "default",
        "foo-trigger",
        "Any",
        "Any",
        &subscriber.uri(),
    )])
    .await;

    let (status, _, body) = post_event(
        addr,
        "foo-trigger.default",
        "/",
        &[("ce-source", "sensor")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "malformed event");
    assert_eq!(subscriber.hits(), 0);
}

#[tokio::test]
async fn trigger_without_subscriber_is_rejected() {
    let (addr, _shutdown) = start_broker(vec![TriggerDescriptor {
        namespace: "default".to_string(),
        name: "not-ready".to_string(),
        filter_type: Some("Any".to_string()),
        filter_source: Some("Any".to_string()),
        subscriber_uri: None,
    }])
    .await;

    let (status, _, body) = post_event(
        addr,
        "not-ready.default",
        "/",
        &[("ce-eventtype", "dev.example.foo")],
        b"",
    )
    .await;

    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "trigger has no subscriber");
}

#[tokio::test]
async fn server_shuts_down_on_signal() {
    let registry = Arc::new(TriggerRegistry::new());
    let warm = registry
        .prewarm(&StaticSource { triggers: vec![] })
        .await
        .unwrap();
    let ingress = Arc::new(Ingress::new(registry, Dispatcher::new(), DEFAULT_TTL));
    let server = IngressServer::bind("127.0.0.1:0".parse().unwrap(), ingress)
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { server.serve(warm, shutdown_rx).await });

    shutdown_tx.send(true).unwrap();
    let result = task.await.unwrap();
    assert!(result.is_ok());
}
