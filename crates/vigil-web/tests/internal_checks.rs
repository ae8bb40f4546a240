//! Internal debug endpoints, compiled only with the `internal-checks`
//! feature: `cargo test --features internal-checks`.

#![cfg(feature = "internal-checks")]

use vigil_http::StatusCode;
use vigil_web::accesslog::AccessLog;
use vigil_web::api::{ApiDispatch, ApiVersion, HostHandle};
use vigil_web::config::WebConfig;
use vigil_web::engine::WebEngine;
use vigil_web::slot::ClientState;
use vigil_web::testing::{run_request, MockTransport};

struct ChartApi;

impl ApiDispatch for ChartApi {
    fn dispatch(
        &self,
        _host: &HostHandle,
        _version: ApiVersion,
        _path: &str,
        state: &mut ClientState,
    ) -> StatusCode {
        state.response.data.reset();
        state.response.code = StatusCode::NOT_FOUND;
        StatusCode::NOT_FOUND
    }

    fn toggle_chart_debug(&self, _host: &HostHandle, chart: &str) -> Option<bool> {
        (chart == "system.cpu").then_some(true)
    }
}

fn engine() -> WebEngine {
    WebEngine::new(WebConfig::default())
        .with_api(Box::new(ChartApi))
        .with_access_log(AccessLog::disabled())
}

#[test]
fn exit_latches_the_engine_flag() {
    let engine = engine();
    let mut client = engine.new_client(
        MockTransport::script(&[b"GET /exit HTTP/1.1\r\n\r\n"]),
        "peer".into(),
        1,
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"ok, will do...");
    assert!(engine.exit_requested());
}

#[test]
fn requests_after_exit_are_denied() {
    let engine = engine();
    engine.request_exit();

    let mut client = engine.new_client(
        MockTransport::script(&[b"GET /index.html HTTP/1.1\r\n\r\n"]),
        "peer".into(),
        1,
    );
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 403 Forbidden\r\n"));
}

#[test]
fn debug_toggles_a_known_chart() {
    let engine = engine();
    let mut client = engine.new_client(
        MockTransport::script(&[b"GET /debug/system.cpu HTTP/1.1\r\n\r\n"]),
        "peer".into(),
        1,
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"), "header: {header}");
    assert_eq!(body, b"Chart has now debug enabled: system.cpu");
}

#[test]
fn debug_unknown_chart_is_404() {
    let engine = engine();
    let mut client = engine.new_client(
        MockTransport::script(&[b"GET /debug/not.a.chart HTTP/1.1\r\n\r\n"]),
        "peer".into(),
        1,
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(body, b"Chart is not found: not.a.chart");
}

#[test]
fn debug_without_chart_is_400() {
    let engine = engine();
    let mut client = engine.new_client(
        MockTransport::script(&[b"GET /debug HTTP/1.1\r\n\r\n"]),
        "peer".into(),
        1,
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"debug which chart?\r\n");
}

#[test]
fn mirror_echoes_the_request() {
    let engine = engine();
    let mut client = engine.new_client(
        MockTransport::script(&[b"GET /mirror HTTP/1.1\r\n\r\n"]),
        "peer".into(),
        1,
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    // the receive buffer comes back as the body
    assert_eq!(body, b"GET /mirror HTTP/1.1\r\n\r\n");
}
