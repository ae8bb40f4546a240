//! End-to-end engine tests over a scripted transport: full requests in,
//! full wire responses out.

use std::io::Read as _;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use vigil_http::chunked::decode_chunked;
use vigil_http::{ContentType, StatusCode};
use vigil_web::accesslog::{AccessLog, LogFormat};
use vigil_web::api::{
    ApiDispatch, ApiVersion, Capability, DenyCapabilities, HostHandle, StaticHostRegistry,
};
use vigil_web::config::WebConfig;
use vigil_web::connection::WebClient;
use vigil_web::engine::WebEngine;
use vigil_web::slot::ClientState;
use vigil_web::testing::{run_request, MockTransport};

/// Test API: a couple of endpoints exercising body shapes.
struct TestApi;

impl ApiDispatch for TestApi {
    fn dispatch(
        &self,
        _host: &HostHandle,
        version: ApiVersion,
        path: &str,
        state: &mut ClientState,
    ) -> StatusCode {
        match (version, path) {
            (ApiVersion::V2, "info") => {
                state.response.data.reset();
                state.response.data.content_type = ContentType::Json;
                state.response.data.no_cacheable();
                let body = serde_json::json!({
                    "agent": "vigil",
                    "api": 2,
                })
                .to_string();
                state.response.data.push_str(&body);
                state.response.code = StatusCode::OK;
                StatusCode::OK
            }
            (ApiVersion::V2, "big") => {
                state.response.data.reset();
                state.response.data.content_type = ContentType::PlainText;
                state.response.data.push_bytes(&b"x".repeat(10 * 1024));
                state.response.code = StatusCode::OK;
                StatusCode::OK
            }
            (ApiVersion::V2, "huge") => {
                state.response.data.reset();
                state.response.data.content_type = ContentType::OctetStream;
                let body: Vec<u8> = (0..40_960u32).map(|i| (i % 251) as u8).collect();
                state.response.data.push_bytes(&body);
                state.response.code = StatusCode::OK;
                StatusCode::OK
            }
            (ApiVersion::V2, "empty") => {
                state.response.data.reset();
                state.response.code = StatusCode::OK;
                StatusCode::OK
            }
            (ApiVersion::V1, "echo") => {
                let payload = std::mem::take(&mut state.payload);
                state.response.data.reset();
                state.response.data.content_type = ContentType::PlainText;
                state.response.data.push_bytes(&payload);
                state.response.code = StatusCode::OK;
                StatusCode::OK
            }
            _ => {
                state.response.data.reset();
                state.response.data.content_type = ContentType::Html;
                state.response.data.push_str("Unknown API endpoint.");
                state.response.code = StatusCode::NOT_FOUND;
                StatusCode::NOT_FOUND
            }
        }
    }
}

fn engine() -> WebEngine {
    engine_with(WebConfig::default())
}

fn engine_with(config: WebConfig) -> WebEngine {
    WebEngine::new(config)
        .with_api(Box::new(TestApi))
        .with_access_log(AccessLog::disabled())
}

fn client_for(engine: &WebEngine, request: &[u8]) -> WebClient<MockTransport> {
    engine.new_client(MockTransport::script(&[request]), "198.51.100.7".into(), 40123)
}

fn gunzip(wire: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(wire)
        .read_to_end(&mut out)
        .unwrap();
    out
}

// ===== plain responses =====

#[test]
fn plain_get_keep_alive_small_body() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/info HTTP/1.1\r\nHost: h\r\nConnection: keep-alive\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"), "header: {header}");
    assert!(header.contains("Connection: keep-alive\r\n"));
    assert!(header.contains(&format!("Content-Length: {}\r\n", body.len())));
    assert!(header.contains("Content-Type: application/json; charset=utf-8\r\n"));
    assert!(header.contains("Access-Control-Allow-Origin: *\r\n"));

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["api"], 2);

    // the slot survived for the next request on the same socket
    assert!(!client.is_dead());
    assert_eq!(client.state.use_count, 1);
}

#[test]
fn connection_close_by_default() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /api/v2/info HTTP/1.1\r\nHost: h\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.contains("Connection: close\r\n"));
    assert!(client.is_dead());
}

#[test]
fn keep_alive_slot_serves_second_request() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/info HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
    );
    run_request(&engine, &mut client);
    assert_eq!(client.state.use_count, 1);

    client
        .transport_mut()
        .push_read(b"GET /api/v2/info HTTP/1.1\r\nConnection: keep-alive\r\n\r\n");
    client.transport_mut().written.clear();
    run_request(&engine, &mut client);

    assert_eq!(client.state.use_count, 2);
    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[test]
fn origin_is_echoed_in_cors_header() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/info HTTP/1.1\r\nOrigin: https://dash.example\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.contains("Access-Control-Allow-Origin: https://dash.example\r\n"));
    assert!(header.contains("Access-Control-Allow-Credentials: true\r\n"));
}

#[test]
fn partial_reads_assemble_one_request() {
    let engine = engine();
    let reads: [&[u8]; 4] = [
        b"GET /api",
        b"/v2/info HTT",
        b"P/1.1\r\nConnection: keep-al",
        b"ive\r\n\r\n",
    ];
    let transport = MockTransport::script(&reads);
    let mut client = engine.new_client(transport, "peer".into(), 1);
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(!client.is_dead());
}

#[test]
fn blocked_writes_finish_eventually() {
    let engine = engine();
    let mut transport = MockTransport::script(&[b"GET /api/v2/big HTTP/1.1\r\n\r\n"]);
    transport.write_limit = Some(512);
    let mut client = engine.new_client(transport, "peer".into(), 1);
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body.len(), 10 * 1024);
}

// ===== gzip + chunked =====

#[test]
fn gzip_chunked_round_trip() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/big HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.contains("Content-Encoding: gzip\r\n"));
    assert!(header.contains("Transfer-Encoding: chunked\r\n"));
    assert!(!header.contains("Content-Length:"));

    // at least one chunk header of the form {hex}\r\n
    let first_line_end = body.windows(2).position(|w| w == b"\r\n").unwrap();
    assert!(
        body[..first_line_end]
            .iter()
            .all(|b| b.is_ascii_hexdigit()),
        "first chunk header is not hex"
    );

    // terminated by the chunked trailer
    assert!(body.ends_with(b"\r\n0\r\n\r\n"));

    let compressed = decode_chunked(&body).unwrap();
    assert_eq!(gunzip(&compressed), b"x".repeat(10 * 1024));
}

#[test]
fn gzip_large_body_uses_multiple_chunks() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/huge HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (_, body) = client.transport().split_response();
    // 40960 source bytes compress in 16384-byte rounds: 3 chunks
    let chunk_count = count_chunks(&body);
    assert!(chunk_count >= 2, "expected multiple chunks, got {chunk_count}");

    let expected: Vec<u8> = (0..40_960u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(gunzip(&decode_chunked(&body).unwrap()), expected);
}

#[test]
fn gzip_disabled_by_configuration() {
    let engine = engine_with(WebConfig::default().with_gzip(false));
    let mut client = client_for(
        &engine,
        b"GET /api/v2/info HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(!header.contains("Content-Encoding"));
    assert!(!header.contains("Transfer-Encoding"));
    assert!(header.contains("Content-Length:"));
}

#[test]
fn gzip_empty_body_still_terminates() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/empty HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.contains("Transfer-Encoding: chunked\r\n"));
    assert!(body.ends_with(b"\r\n0\r\n\r\n"));
    assert_eq!(gunzip(&decode_chunked(&body).unwrap()), b"");
}

fn count_chunks(mut body: &[u8]) -> usize {
    let mut count = 0;
    loop {
        let line_end = body.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(
            std::str::from_utf8(&body[..line_end]).unwrap().trim(),
            16,
        )
        .unwrap();
        body = &body[line_end + 2..];
        if size == 0 {
            return count;
        }
        count += 1;
        body = &body[size + 2..];
    }
}

// ===== parse failures =====

#[test]
fn unsupported_method_is_400() {
    let engine = engine();
    let mut client = client_for(&engine, b"PATCH /x HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"HTTP method requested is not supported...\r\n");
    assert!(client.is_dead());
}

#[test]
fn excess_request_data_is_400() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET / HTTP/1.1\r\n\r\nEXTRA");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"Excess data in request.\r\n");
}

#[test]
fn malformed_url_is_400() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /bad%zz HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"Malformed URL...\r\n");
}

#[test]
fn oversized_request_is_400() {
    let engine = engine_with(WebConfig::default().with_max_request_size(128));
    let mut filler = Vec::from(&b"GET / HTTP/1.1\r\nX-Filler: "[..]);
    filler.extend_from_slice(&b"a".repeat(512));
    let mut client = client_for(&engine, &filler);
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(
        String::from_utf8_lossy(&body).starts_with("Received request is too big"),
        "body: {}",
        String::from_utf8_lossy(&body)
    );
}

#[test]
fn slow_client_is_closed_without_response() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET / HTT");
    client.handle_read_ready(&engine);
    assert!(!client.is_dead());

    // the buffer never advances again; the attempt bound trips
    for _ in 0..engine.config.max_header_fetch_tries + 2 {
        client.process_request(&engine);
        if client.is_dead() {
            break;
        }
    }

    assert!(client.is_dead());
    assert!(client.transport().written.is_empty(), "no response expected");
}

#[test]
fn request_timeout_is_504() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /incomplete HTT");
    client.handle_read_ready(&engine);

    // backdate the request past its deadline
    client.state.timings.timeout = Duration::from_millis(10);
    client.state.timings.tv_in = Some(Instant::now() - Duration::from_secs(2));

    assert!(client.check_timeout(&engine));
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 504 Gateway Timeout\r\n"), "header: {header}");
    assert_eq!(body, b"Query timeout exceeded");
}

// ===== OPTIONS, DNT, policy headers =====

#[test]
fn options_preflight() {
    let engine = engine();
    let mut client = client_for(&engine, b"OPTIONS / HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(header.contains("Access-Control-Allow-Methods: GET, OPTIONS\r\n"));
    assert!(header.contains("Access-Control-Max-Age: 1209600\r\n"));
    assert!(header.contains("x-auth-token"));
    assert!(!header.contains("Cache-Control:"));
    assert_eq!(body, b"OK");
}

#[test]
fn dnt_tk_header_when_respected() {
    let engine = engine_with(WebConfig::default().with_respect_do_not_track(true));
    let mut client = client_for(&engine, b"GET /api/v2/info HTTP/1.1\r\nDNT: 1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.contains("Tk: N\r\n"));
}

#[test]
fn no_tk_header_by_default() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /api/v2/info HTTP/1.1\r\nDNT: 1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(!header.contains("Tk:"));
}

#[test]
fn x_frame_options_emitted_when_configured() {
    let engine = engine_with(WebConfig::default().with_x_frame_options("SAMEORIGIN"));
    let mut client = client_for(&engine, b"GET /api/v2/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.contains("X-Frame-Options: SAMEORIGIN\r\n"));
}

#[test]
fn cache_control_for_error_responses() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /api/v2/nope HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(header.contains("Cache-Control: no-cache, no-store, must-revalidate\r\n"));
    assert!(header.contains("Pragma: no-cache\r\n"));
}

// ===== keep-alive body-length rule =====

#[test]
fn unknown_body_length_disables_keep_alive() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"GET /api/v2/empty HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    // the Connection header was already serialized before the length
    // decision, but the slot still closes
    assert!(!header.contains("Content-Length:"));
    assert!(client.is_dead());
}

// ===== routing =====

#[test]
fn post_payload_reaches_the_handler() {
    let engine = engine();
    let mut client = client_for(
        &engine,
        b"POST /api/v1/echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello vigil",
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"hello vigil");
}

#[test]
fn api_without_version_is_400() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /api HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"Which API version?");
}

#[test]
fn unsupported_api_version_is_404() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /api/v9/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(body, b"Unsupported API version: v9");
}

#[test]
fn version_prefix_recurses_into_api() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /v2/api/v2/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[test]
fn duplicate_version_prefixes_are_400() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /v1/v2/index.html HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"Multiple dashboard versions given at the URL.");
}

// ===== host switch =====

fn engine_with_child() -> WebEngine {
    let mut hosts = StaticHostRegistry::new("parent");
    hosts.add_host(
        "child-1",
        "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0",
        "node-1",
    );
    WebEngine::new(WebConfig::default())
        .with_api(Box::new(TestApi))
        .with_hosts(Box::new(hosts))
        .with_access_log(AccessLog::disabled())
}

#[test]
fn host_switch_routes_into_child() {
    let engine = engine_with_child();
    let mut client = client_for(&engine, b"GET /host/child-1/api/v2/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"), "header: {header}");
}

#[test]
fn host_switch_by_node_id() {
    let engine = engine_with_child();
    let mut client = client_for(&engine, b"GET /node/node-1/api/v2/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[test]
fn host_guid_lookup_is_case_insensitive() {
    let engine = engine_with_child();
    let mut client = client_for(
        &engine,
        b"GET /host/0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0/api/v2/info HTTP/1.1\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"), "header: {header}");
}

#[test]
fn host_without_trailing_path_redirects() {
    let engine = engine_with_child();
    let mut client = client_for(&engine, b"GET /host/child-1 HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 301 Moved Permanently\r\n"));
    assert!(header.contains("Location: child-1/\r\n"));
}

#[test]
fn unknown_host_is_404_with_escaped_name() {
    let engine = engine_with_child();
    let mut client = client_for(&engine, b"GET /host/no%3Cb%3Edy/api HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(
        body,
        b"This agent does not maintain a database for host: no&lt;b&gt;dy".as_slice()
    );
}

// ===== capability gating =====

#[test]
fn netdata_conf_is_served_when_allowed() {
    let engine = engine();
    let mut client = client_for(&engine, b"GET /netdata.conf HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(header.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(String::from_utf8_lossy(&body).contains("vigil configuration"));
}

#[test]
fn netdata_conf_is_gated() {
    let engine = engine_with(WebConfig::default()).with_access_policy(Box::new(
        DenyCapabilities::new(vec![Capability::NetdataConf]),
    ));
    let mut client = client_for(&engine, b"GET /netdata.conf HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 403 Forbidden\r\n"));
    assert_eq!(body, b"You are not allowed to access this resource.");
}

#[test]
fn full_denial_is_403_for_everything() {
    let engine = engine_with(WebConfig::default()).with_access_policy(Box::new(
        DenyCapabilities::new(vec![
            Capability::Dashboard,
            Capability::Registry,
            Capability::Badges,
            Capability::Mgmt,
            Capability::Stream,
            Capability::NetdataConf,
        ]),
    ));
    let mut client = client_for(&engine, b"GET /api/v2/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 403 Forbidden\r\n"));
}

// ===== TLS upgrade =====

#[test]
fn plain_transport_is_upgraded_when_policy_requires_tls() {
    let engine = engine_with(WebConfig::default().with_tls_policy(true, false, true));
    let mut client = client_for(
        &engine,
        b"GET /index.html HTTP/1.1\r\nHost: agent.example\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(
        header.starts_with("HTTP/1.1 301 Moved Permanently\r\n"),
        "header: {header}"
    );
    assert!(header.contains("Location: https://agent.example/index.html\r\n"));
    assert!(String::from_utf8_lossy(&body).contains("Redirecting"));
}

#[test]
fn local_transport_is_never_upgraded() {
    let engine = engine_with(WebConfig::default().with_tls_policy(true, true, true));
    let mut transport = MockTransport::script(&[b"GET /api/v2/info HTTP/1.1\r\n\r\n"]);
    transport.local = true;
    let mut client = engine.new_client(transport, "local".into(), 0);
    run_request(&engine, &mut client);

    let (header, _) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
}

// ===== access log =====

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn access_log_records_the_request() {
    let capture = SharedBuf::default();
    let engine = WebEngine::new(WebConfig::default())
        .with_api(Box::new(TestApi))
        .with_access_log(AccessLog::to_writer(
            Box::new(capture.clone()),
            LogFormat::Line,
        ));

    let mut client = client_for(&engine, b"GET /api/v2/info HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(log.contains("'DATA'"), "log: {log}");
    assert!(log.contains("200 '/api/v2/info'"));
    assert!(log.contains("'[198.51.100.7]:40123'"));
}

#[test]
fn access_log_sanitizes_control_characters() {
    let capture = SharedBuf::default();
    let engine = WebEngine::new(WebConfig::default())
        .with_api(Box::new(TestApi))
        .with_access_log(AccessLog::to_writer(
            Box::new(capture.clone()),
            LogFormat::Line,
        ));

    // %0d%0a decodes to CRLF in the path; the raw URL keeps the
    // escapes, so inject the control characters via a tab
    let mut client = client_for(&engine, b"GET /x\ty HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(log.contains("'/x y'"), "log: {log}");
}

// ===== streaming ingest =====

#[test]
fn stream_ingest_hands_the_socket_over() {
    struct AcceptIngest;
    impl vigil_web::api::StreamIngest for AcceptIngest {
        fn spawn_receiver(&self, state: &mut ClientState) -> StatusCode {
            // the receiver answers on the socket itself
            state.response.data.reset();
            state.response.code = StatusCode::OK;
            StatusCode::OK
        }
    }

    let engine = WebEngine::new(WebConfig::default())
        .with_ingest(Box::new(AcceptIngest))
        .with_access_log(AccessLog::disabled());

    let mut client = client_for(
        &engine,
        b"STREAM key=abc&hostname=child-9 HTTP/1.1\r\nUser-Agent: child-agent\r\n\r\n",
    );
    client.handle_read_ready(&engine);

    // the engine writes nothing; the receiver owns the connection now
    assert!(client.is_dead());
    assert!(client.transport().written.is_empty());
    assert_eq!(client.state.response.code, StatusCode::OK);
    assert_eq!(
        client.state.headers.user_agent.as_deref(),
        Some("child-agent")
    );
    assert_eq!(
        client.state.url_query_string_decoded.as_str_lossy(),
        "key=abc&hostname=child-9"
    );
}

#[test]
fn stream_denied_by_capability_is_403() {
    let engine = engine_with(WebConfig::default()).with_access_policy(Box::new(
        DenyCapabilities::new(vec![Capability::Stream]),
    ));
    let mut client = client_for(&engine, b"STREAM key=abc HTTP/1.1\r\n\r\n");
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 403 Forbidden\r\n"));
    assert_eq!(body, b"You are not allowed to access this resource.");
}

#[test]
fn stream_refused_on_plain_transport_under_force_tls() {
    let engine = engine_with(WebConfig::default().with_tls_policy(true, true, false));
    let mut client = client_for(
        &engine,
        b"STREAM key=abc&hostname=child-9&x=1 HTTP/1.1\r\n\r\n",
    );
    run_request(&engine, &mut client);

    let (header, body) = client.transport().split_response();
    assert!(header.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, b"HTTP method requested is not supported...\r\n");
}
