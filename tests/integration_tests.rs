//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: HTTP responses → poll engine → rendered output

use accessctl::api::{ApiClient, ConnectorSource, LogKind, LogSource, Resource};
use accessctl::engine::{BackoffPolicy, PollConfig, PollEngine, StopReason};
use accessctl::error::Error;
use accessctl::http::{HttpClient, HttpClientConfig};
use accessctl::output::{DelimitedWriter, JsonLinesWriter, MemorySink};
use accessctl::state::{CursorTracker, PollCursor, StartMode};
use accessctl::types::BackoffType;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> Arc<ApiClient> {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .no_rate_limit()
        .build();
    Arc::new(ApiClient::new(HttpClient::with_config(config).unwrap()).with_page_size(50))
}

/// Serve one canned response per connection, in order
async fn raw_server(responses: Vec<String>) -> Arc<ApiClient> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    let config = HttpClientConfig::builder()
        .base_url(format!("http://{addr}"))
        .max_retries(0)
        .no_rate_limit()
        .build();
    Arc::new(ApiClient::new(HttpClient::with_config(config).unwrap()))
}

fn json_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn fast_poll() -> PollConfig {
    PollConfig::with_interval(Duration::from_millis(50))
        .slice(Duration::from_millis(10))
        .backoff(BackoffPolicy::new(
            BackoffType::Exponential,
            Duration::from_millis(10),
            Duration::from_millis(100),
        ))
}

fn engine(config: PollConfig, mode: &StartMode) -> PollEngine {
    PollEngine::new(config, CursorTracker::initialize(mode, 0))
}

// ============================================================================
// Log Tail
// ============================================================================

#[tokio::test]
async fn test_log_tail_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logs/access"))
        .and(query_param("from", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "e1", "ts": 1000, "user": "alice"},
                {"id": "e2", "ts": 2000, "user": "bob"}
            ],
            "meta": {"next_cursor": "c1"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // The next page repeats the boundary event
    Mock::given(method("GET"))
        .and(path("/api/v1/logs/access"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "e2", "ts": 2000, "user": "bob"},
                {"id": "e3", "ts": 3000, "user": "carol"}
            ],
            "meta": {"next_cursor": "c2"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let mut source = LogSource::new(api_for(&server), LogKind::Access);
    let mut sink = JsonLinesWriter::new(Vec::new()).with_fields(vec!["id".into(), "user".into()]);
    let mut engine = engine(
        fast_poll().max_items(Some(3)),
        &StartMode::Resume("1000".to_string()),
    );

    let summary = engine
        .run(&mut source, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::LimitReached);
    assert_eq!(summary.items_emitted, 3);
    assert_eq!(summary.duplicates_skipped, 1);
    assert_eq!(
        summary.final_cursor,
        PollCursor::Token {
            token: "c2".to_string(),
            position: Some(3000)
        }
    );
    assert_eq!(summary.final_cursor.resume_value().as_deref(), Some("c2"));

    let output = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(
        output,
        concat!(
            "{\"id\":\"e1\",\"user\":\"alice\"}\n",
            "{\"id\":\"e2\",\"user\":\"bob\"}\n",
            "{\"id\":\"e3\",\"user\":\"carol\"}\n"
        )
    );
}

#[tokio::test]
async fn test_log_tail_cancels_promptly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logs/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "meta": {"next_cursor": null}
        })))
        .mount(&server)
        .await;

    let mut source = LogSource::new(api_for(&server), LogKind::Admin);
    let mut sink = MemorySink::new();
    let config = PollConfig::with_interval(Duration::from_secs(60)).slice(Duration::from_millis(50));
    let mut engine = engine(config, &StartMode::FromNow);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = engine.run(&mut source, &mut sink, &cancel).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.polls, 1);
    assert!(sink.items.is_empty());
}

#[tokio::test]
async fn test_log_tail_recovers_from_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logs/access"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logs/access"))
        .and(query_param("from", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "e1", "ts": 600}],
            "meta": {"next_cursor": "n"}
        })))
        .mount(&server)
        .await;

    let mut source = LogSource::new(api_for(&server), LogKind::Access);
    let mut sink = MemorySink::new();
    let mut engine = engine(
        fast_poll().max_items(Some(1)),
        &StartMode::Resume("500".to_string()),
    );

    let summary = engine
        .run(&mut source, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.transient_failures, 2);
    assert_eq!(sink.ids(), vec!["e1"]);
    assert_eq!(engine.state().consecutive_failures, 0);
}

#[tokio::test]
async fn test_log_tail_survives_connection_reset_mid_body() {
    let cut_short = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 500\r\n\r\n{\"data\":[".to_string();
    let api = raw_server(vec![
        cut_short,
        json_response(r#"{"data":[{"id":"e1","ts":1000}],"meta":{"next_cursor":"c1"}}"#),
    ])
    .await;

    let mut source = LogSource::new(api, LogKind::Access);
    let mut sink = MemorySink::new();
    let mut engine = engine(fast_poll().max_items(Some(1)), &StartMode::FromStart);

    let summary = engine
        .run(&mut source, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.transient_failures, 1);
    assert_eq!(summary.stop_reason, StopReason::LimitReached);
    assert_eq!(sink.ids(), vec!["e1"]);
}

#[tokio::test]
async fn test_log_tail_unauthorized_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logs/access"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&server)
        .await;

    let mut source = LogSource::new(api_for(&server), LogKind::Access);
    let mut sink = MemorySink::new();
    let mut engine = engine(fast_poll(), &StartMode::FromNow);

    let err = engine
        .run(&mut source, &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    assert_eq!(err.exit_code(), accessctl::error::EXIT_FATAL);
    assert_eq!(engine.cursor(), &PollCursor::Position(0));
}

#[tokio::test]
async fn test_log_tail_malformed_response_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logs/access"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let mut source = LogSource::new(api_for(&server), LogKind::Access);
    let mut sink = MemorySink::new();
    let mut engine = engine(fast_poll(), &StartMode::FromStart);

    let err = engine
        .run(&mut source, &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}

// ============================================================================
// Connector Tail
// ============================================================================

#[tokio::test]
async fn test_connector_tail_prints_status_changes_only() {
    let server = MockServer::start().await;
    let snapshot = json!({
        "objects": [
            {"name": "dc-1", "status": "ok", "last_checkin": "2024-01-01T00:00:00Z"},
            {"name": "dc-2", "status": "ok", "last_checkin": "2024-01-01T00:00:00Z"}
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/connectors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/connectors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [
                {"name": "dc-1", "status": "down", "last_checkin": "2024-01-01T00:05:00Z"},
                {"name": "dc-2", "status": "ok", "last_checkin": "2024-01-01T00:00:00Z"}
            ]
        })))
        .mount(&server)
        .await;

    let mut source = ConnectorSource::new(api_for(&server));
    let mut sink = MemorySink::new();
    let mut engine = engine(fast_poll().max_items(Some(3)), &StartMode::FromStart);

    let summary = engine
        .run(&mut source, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    let statuses: Vec<String> = sink
        .records
        .iter()
        .map(|r| format!("{}={}", r["name"].as_str().unwrap(), r["status"].as_str().unwrap()))
        .collect();
    assert_eq!(statuses, vec!["dc-1=ok", "dc-2=ok", "dc-1=down"]);
    assert!(summary.duplicates_skipped >= 3);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_catalog_listing_as_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/certificates"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [
                {"cn": "intranet.example.com", "expires": "2025-01-01", "issuer": {"name": "CA, Inc."}},
                {"cn": "wiki.example.com", "expires": "2025-06-01", "issuer": {"name": "LE"}}
            ],
            "meta": {"next": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let http = HttpClient::with_auth(
        config,
        accessctl::auth::AuthConfig::Bearer {
            token: "secret".to_string(),
        },
    )
    .unwrap();
    let api = ApiClient::new(http);

    let mut sink = DelimitedWriter::new(
        Vec::new(),
        ',',
        vec!["cn".into(), "issuer.name".into()],
        true,
    );
    let count = api.list(Resource::Certificates, &mut sink).await.unwrap();

    assert_eq!(count, 2);
    let output = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(
        output,
        "cn,issuer.name\nintranet.example.com,\"CA, Inc.\"\nwiki.example.com,LE\n"
    );
}
