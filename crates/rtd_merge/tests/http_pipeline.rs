use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::{any, post};
use axum::Router;
use rtd_merge::{
    build_app, AppError, CancellationToken, HttpPostSource, MergeError, PipelineConfig, Source,
    SourceError,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

const REQUEST_BODY: &str = r#"{"userIds":{"haloId":"TEST"}}"#;

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    content_type: Option<String>,
    body: Vec<u8>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

async fn capture(State(log): State<Log>, method: Method, headers: HeaderMap, body: Bytes) -> &'static str {
    log.lock().unwrap().push(Seen {
        method,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: body.to_vec(),
    });
    r#"{"somekey":"somevalue"}"#
}

async fn teapot() -> (StatusCode, &'static str) {
    (StatusCode::IM_A_TEAPOT, r#"{"error":"nope"}"#)
}

async fn garbage() -> &'static str {
    "invalid json"
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "{}"
}

/// Spawn the upstream on a random port. The handle keeps it alive.
async fn spawn() -> (String, Log, tokio::task::JoinHandle<()>) {
    let log = Log::default();
    let app = Router::new()
        .route("/rtd", any(capture))
        .route("/teapot", post(teapot))
        .route("/garbage", post(garbage))
        .route("/slow", post(slow))
        .with_state(log.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), log, handle)
}

fn config(url: String, template: &str) -> PipelineConfig {
    PipelineConfig {
        url,
        request_body: REQUEST_BODY.into(),
        template: template.into(),
        ..Default::default()
    }
}

// ── Source ───────────────────────────────────────────────────────

#[tokio::test]
async fn source_posts_fixed_body_as_json() {
    let (base, log, _h) = spawn().await;
    let source = HttpPostSource::new(format!("{base}/rtd"), REQUEST_BODY, reqwest::Client::new());

    let mut body = source.get_stream(&CancellationToken::new()).await.unwrap();
    let mut data = String::new();
    body.read_to_string(&mut data).await.unwrap();
    assert_eq!(data, r#"{"somekey":"somevalue"}"#);

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1, "exactly one exchange");
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(seen[0].body, REQUEST_BODY.as_bytes());
}

#[tokio::test]
async fn source_cancellation_aborts_pending_exchange() {
    let (base, _log, _h) = spawn().await;
    let source = HttpPostSource::new(format!("{base}/slow"), "{}", reqwest::Client::new());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = source.get_stream(&cancel).await.err().unwrap();
    assert!(matches!(err, SourceError::Cancelled), "got: {err}");
    assert!(started.elapsed() < Duration::from_secs(2), "cancel must be prompt");
}

// ── Full pipeline ────────────────────────────────────────────────

#[tokio::test]
async fn pipeline_wraps_upstream_payload() {
    let (base, log, _h) = spawn().await;
    let mut app = build_app(&config(format!("{base}/rtd"), r#"{"outerkey": %s}"#), Vec::new()).unwrap();

    app.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(
        String::from_utf8(app.into_output()).unwrap(),
        "{\n \"outerkey\": {\n  \"somekey\": \"somevalue\"\n }\n}"
    );
}

#[tokio::test]
async fn pipeline_ignores_error_status_when_body_is_json() {
    let (base, _log, _h) = spawn().await;
    let mut app = build_app(&config(format!("{base}/teapot"), "%s"), Vec::new()).unwrap();

    app.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        String::from_utf8(app.into_output()).unwrap(),
        "{\n \"error\": \"nope\"\n}"
    );
}

#[tokio::test]
async fn pipeline_rejects_non_json_body_without_output() {
    let (base, _log, _h) = spawn().await;
    let mut app = build_app(&config(format!("{base}/garbage"), "%s"), Vec::new()).unwrap();

    let err = app.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, AppError::Merge(MergeError::InvalidJson)), "got: {err}");
    assert_eq!(err.to_string(), "failed to merge: invalid json");
    assert!(app.into_output().is_empty());
}

#[tokio::test]
async fn pipeline_reports_unreachable_upstream() {
    // Grab a free port, then close it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut app = build_app(&config(format!("http://{addr}/rtd"), "%s"), Vec::new()).unwrap();
    let err = app.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, AppError::Source(SourceError::Exchange(_))), "got: {err}");
    assert!(err.to_string().starts_with("failed to obtain source stream: exchange failed: "));
    assert!(app.into_output().is_empty());
}

#[tokio::test]
async fn pipeline_honours_client_deadline() {
    let (base, _log, _h) = spawn().await;
    let cfg = PipelineConfig {
        timeout_ms: 100,
        ..config(format!("{base}/slow"), "%s")
    };
    let mut app = build_app(&cfg, Vec::new()).unwrap();

    let started = Instant::now();
    let err = app.run(&CancellationToken::new()).await.unwrap_err();

    match err {
        AppError::Source(SourceError::Exchange(e)) => assert!(e.is_timeout(), "not a timeout: {e}"),
        other => panic!("expected exchange timeout, got: {other}"),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
}
