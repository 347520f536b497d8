//! Gateway, prober, sync and mirror behaviour against a mock middleware.

use matriz_core::config::Timeouts;
use matriz_core::dispatch::bridge;
use matriz_core::gateway::{Gateway, GatewayError, GatewayErrorKind, HttpGateway};
use matriz_core::mirror::MirrorReader;
use matriz_core::prober::{HealthProber, ProbeEvent, ProbeTick};
use matriz_core::sync::{SyncDriver, SyncEvent, SyncStatus, SyncTarget};
use matriz_core::{MasterIdentity, Subsystem, SubsystemState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> Arc<dyn Gateway> {
    Arc::new(HttpGateway::new(server.uri()).unwrap_or_else(|e| panic!("http client: {e}")))
}

async fn mount_json(server: &MockServer, verb: &str, route: &str, status: u16, body: serde_json::Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

// ── Prober ────────────────────────────────────────────────────────

#[tokio::test]
async fn probe_reads_status_and_master_identity() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "GET",
        "/api/system-status",
        200,
        json!({"middleware": "up", "app1": "down", "hospital": "up"}),
    )
    .await;
    mount_json(
        &server,
        "GET",
        "/health",
        200,
        json!({"status": "Middleware OK", "master_actual": "mysql-replica1:3306"}),
    )
    .await;

    let prober = HealthProber::new(gateway(&server), Timeouts::default());
    let report = prober
        .probe()
        .await
        .unwrap_or_else(|e| panic!("Expected report, got Err: {e}"));

    assert_eq!(report.snapshot.state(Subsystem::Middleware), SubsystemState::Up);
    assert_eq!(report.snapshot.state(Subsystem::App1), SubsystemState::Down);
    assert_eq!(report.snapshot.state(Subsystem::Hospital), SubsystemState::Up);
    assert_eq!(
        report.master,
        Some(MasterIdentity("mysql-replica1:3306".to_string()))
    );
}

#[tokio::test]
async fn probe_without_master_field_reports_unknown() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/system-status", 200, json!({"middleware": "up"})).await;
    mount_json(&server, "GET", "/health", 200, json!({"status": "Middleware OK"})).await;

    let prober = HealthProber::new(gateway(&server), Timeouts::default());
    let report = prober
        .probe()
        .await
        .unwrap_or_else(|e| panic!("Expected report, got Err: {e}"));
    assert_eq!(report.master, Some(MasterIdentity::unknown()));
    assert_eq!(report.snapshot.state(Subsystem::App1), SubsystemState::Down);
}

#[tokio::test]
async fn slow_status_endpoint_fails_the_tick() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/system-status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"middleware": "up"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let timeouts = Timeouts {
        status: Duration::from_millis(200),
        ..Timeouts::default()
    };
    let prober = HealthProber::new(gateway(&server), timeouts);
    let (bridge, mut queue) = bridge::<ProbeEvent>();

    assert_eq!(prober.tick(&bridge), ProbeTick::Started);
    assert_eq!(prober.tick(&bridge), ProbeTick::Skipped);

    let event = tokio::time::timeout(Duration::from_secs(3), queue.recv())
        .await
        .unwrap_or_else(|_| panic!("probe did not finish"))
        .unwrap_or_else(|| panic!("queue closed"));
    match event {
        ProbeEvent::Failed(reason) => assert_eq!(reason, "middleware did not answer in time"),
        other => panic!("Expected Failed, got: {other:?}"),
    }
}

// ── Gateway error taxonomy ────────────────────────────────────────

#[tokio::test]
async fn error_payload_on_server_error_is_an_application_error() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "GET",
        "/api/externo/hospital/citas",
        500,
        json!({"error": "db offline"}),
    )
    .await;

    let reader = MirrorReader::new(gateway(&server), Duration::from_secs(3));
    let err = reader
        .remote_appointments()
        .await
        .expect_err("hospital offline");
    assert_eq!(err.kind(), GatewayErrorKind::Application);
    assert_eq!(err.to_string(), "db offline");
}

#[tokio::test]
async fn plain_server_error_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/local/lists"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let reader = MirrorReader::new(gateway(&server), Duration::from_secs(3));
    let err = reader.local_lists().await.expect_err("bad gateway");
    match err {
        GatewayError::Protocol { status, message, .. } => {
            assert_eq!(status, Some(502));
            assert!(message.contains("Bad Gateway"));
        }
        other => panic!("Expected Protocol, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/local/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let reader = MirrorReader::new(gateway(&server), Duration::from_secs(3));
    let err = reader.local_items().await.expect_err("not json");
    assert_eq!(err.kind(), GatewayErrorKind::Protocol);
}

#[tokio::test]
async fn unreachable_middleware_is_a_network_error() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap_or(59999);
    let gateway: Arc<dyn Gateway> = Arc::new(
        HttpGateway::new(format!("http://127.0.0.1:{port}"))
            .unwrap_or_else(|e| panic!("http client: {e}")),
    );

    let err = gateway
        .get("/api/system-status", &[], Duration::from_secs(1))
        .await
        .expect_err("nothing listening");
    assert_eq!(err.kind(), GatewayErrorKind::Network);
    assert_eq!(err.user_message(), "middleware unreachable");
}

// ── Sync driver ───────────────────────────────────────────────────

#[tokio::test]
async fn sync_partial_failure_still_attempts_every_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sync/app1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "App1 offline"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/sync/hospital"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "Hospital synced", "citas": 3})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let driver = SyncDriver::new(gateway(&server), Duration::from_secs(5));
    let report = driver.run_tick().await;

    assert_eq!(report.status(), SyncStatus::Reconnecting);
    assert_eq!(report.failed_targets(), vec![SyncTarget::App1]);
    server.verify().await;
}

#[tokio::test]
async fn sync_success_signals_mirror_refresh() {
    let server = MockServer::start().await;
    mount_json(&server, "POST", "/api/sync/app1", 200, json!({"status": "App1 synced", "lists": 1, "items": 4})).await;
    mount_json(&server, "POST", "/api/sync/hospital", 200, json!({"status": "Hospital synced", "citas": 2})).await;

    let driver = SyncDriver::new(gateway(&server), Duration::from_secs(5));
    let (bridge, mut queue) = bridge::<SyncEvent>();
    driver.tick(&bridge);

    let mut events = Vec::new();
    while events.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(3), queue.recv())
            .await
            .unwrap_or_else(|_| panic!("sync did not finish"))
            .unwrap_or_else(|| panic!("queue closed"));
        events.push(event);
    }
    assert!(matches!(events[0], SyncEvent::Status(SyncStatus::Synced(_))));
    assert_eq!(events[1], SyncEvent::MirrorStale);
}

// ── Mirror reader ─────────────────────────────────────────────────

#[tokio::test]
async fn mirror_reads_are_idempotent() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "GET",
        "/api/local/lists",
        200,
        json!([{"id": 1, "name": "Weekly"}, {"id": 2, "name": "Party"}]),
    )
    .await;
    mount_json(
        &server,
        "GET",
        "/api/local/items",
        200,
        json!([{"id": 10, "description": "Milk", "list_id": 1, "completed": 0}]),
    )
    .await;
    mount_json(
        &server,
        "GET",
        "/api/local/citas",
        200,
        json!([{"id": 5, "paciente": "Luis", "descripcion": "X-ray", "fecha": "2026-02-10"}]),
    )
    .await;

    let reader = MirrorReader::new(gateway(&server), Duration::from_secs(3));
    let first = reader.read_local().await;
    let second = reader.read_local().await;

    assert!(first.failures().is_empty());
    assert_eq!(first, second);
    let items = first.items.unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert!(!items[0].completed);
}

#[tokio::test]
async fn remote_items_are_filtered_by_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/externo/app1/items"))
        .and(query_param("list_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "i1", "description": "Bread", "list_id": "7", "completed": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let reader = MirrorReader::new(gateway(&server), Duration::from_secs(3));
    let items = reader
        .remote_items("7")
        .await
        .unwrap_or_else(|e| panic!("Expected items, got Err: {e}"));
    assert_eq!(items.len(), 1);
    assert!(items[0].completed);
    server.verify().await;
}
