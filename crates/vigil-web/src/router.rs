//! URL dispatch.
//!
//! The first path segment selects the surface: the versioned JSON API,
//! the host switch, a dashboard version prefix (which recurses on the
//! remainder), the configuration dump, the gated internal endpoints,
//! and finally the static file service as the fallthrough.

use vigil_http::{ContentType, DashboardVersion, StatusCode};

use crate::api::{ApiVersion, Capability, HostHandle};
use crate::engine::WebEngine;
use crate::slot::ClientState;
use crate::staticfiles;

/// Take the next path token, skipping consecutive separators.
fn next_token<'a>(rest: &mut &'a str, separators: &[char]) -> Option<&'a str> {
    let s = rest.trim_start_matches(|c| separators.contains(&c));
    if s.is_empty() {
        *rest = "";
        return None;
    }
    match s.find(|c| separators.contains(&c)) {
        Some(i) => {
            let token = &s[..i];
            *rest = &s[i + 1..];
            Some(token)
        }
        None => {
            *rest = "";
            Some(s)
        }
    }
}

/// Route a decoded path. Recurses for version prefixes and the host
/// switch; everything unrecognized falls through to the static file
/// service with the full remaining path.
pub(crate) fn process_url(
    engine: &WebEngine,
    state: &mut ClientState,
    host: &HostHandle,
    path: &str,
) -> StatusCode {
    if engine.exit_requested() {
        return state.permission_denied();
    }

    // keep a copy of the path in case it ends up served as a file
    let filename = path.to_string();

    let mut rest = path;
    if let Some(token) = next_token(&mut rest, &['/', '?']) {
        if token == "api" {
            return api_request(engine, state, host, rest);
        }

        if token == "host" || token == "node" {
            return switch_host(engine, state, host, rest, token == "node");
        }

        if let Some(version) = DashboardVersion::from_segment(token) {
            if state.path_flags.version.is_some() {
                return state.multiple_versions_bad_request();
            }
            state.path_flags.version = Some(version);
            return process_url(engine, state, host, rest);
        }

        if token == "netdata.conf" {
            if !engine.access.allows(Capability::NetdataConf, state) {
                return state.permission_denied();
            }
            state.response.data.content_type = ContentType::PlainText;
            state.response.data.reset();
            engine.config_dump.generate(&mut state.response.data);
            state.response.code = StatusCode::OK;
            return StatusCode::OK;
        }

        #[cfg(feature = "internal-checks")]
        {
            if token == "exit" {
                return internal::exit(engine, state);
            }
            if token == "debug" {
                return internal::debug(engine, state, host, rest);
            }
            if token == "mirror" {
                return internal::mirror(engine, state);
            }
        }
    }

    state.response.data.reset();
    let code = staticfiles::serve_path(engine, state, &filename);
    state.response.code = code;
    code
}

/// `/api/{v1|v2}/...`: tokenize the version and hand over to the
/// dispatch seam.
fn api_request(
    engine: &WebEngine,
    state: &mut ClientState,
    host: &HostHandle,
    path: &str,
) -> StatusCode {
    let mut rest = path;
    match next_token(&mut rest, &['/']) {
        Some("v2") => {
            let code = engine.api.dispatch(host, ApiVersion::V2, rest, state);
            state.response.code = code;
            code
        }
        Some("v1") => {
            let code = engine.api.dispatch(host, ApiVersion::V1, rest, state);
            state.response.code = code;
            code
        }
        Some(other) => {
            state.response.data.reset();
            state.response.data.content_type = ContentType::Html;
            state.response.data.push_str("Unsupported API version: ");
            state.response.data.push_html_escaped(other);
            state.response.code = StatusCode::NOT_FOUND;
            StatusCode::NOT_FOUND
        }
        None => {
            state.response.data.reset();
            state.response.data.push_str("Which API version?");
            state.response.code = StatusCode::BAD_REQUEST;
            StatusCode::BAD_REQUEST
        }
    }
}

/// `/host/{name}/...` and `/node/{id}/...`: resolve the next segment to
/// a host and recurse into routing with the remainder.
///
/// Only one level deep: the current host must still be the local one.
/// The identifier is tried in an order depending on the entry point
/// (`node` prefers node-ids), and a GUID that failed verbatim is
/// retried in lowercase when it parses as a UUID.
fn switch_host(
    engine: &WebEngine,
    state: &mut ClientState,
    host: &HostHandle,
    path: &str,
    by_node: bool,
) -> StatusCode {
    if *host != engine.hosts.localhost() {
        state.response.data.reset();
        state.response.data.push_str("Nesting of hosts is not allowed.");
        state.response.code = StatusCode::BAD_REQUEST;
        return StatusCode::BAD_REQUEST;
    }

    let s = path.trim_start_matches('/');
    let (token, remainder) = match s.find('/') {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };

    if !token.is_empty() {
        let hosts = engine.hosts.as_ref();
        let found = if by_node {
            hosts
                .find_by_node_id(token)
                .or_else(|| hosts.find_by_hostname(token))
                .or_else(|| hosts.find_by_guid(token))
        } else {
            hosts
                .find_by_hostname(token)
                .or_else(|| hosts.find_by_guid(token))
                .or_else(|| hosts.find_by_node_id(token))
        };

        // a GUID may merely have the wrong case
        let found = found.or_else(|| {
            uuid::Uuid::parse_str(token)
                .ok()
                .and_then(|u| hosts.find_by_guid(&u.as_hyphenated().to_string()))
        });

        if let Some(target) = found {
            let Some(remainder) = remainder else {
                return staticfiles::append_slash_to_url_and_redirect(state);
            };

            let new_path = format!("/{remainder}");
            state.url_path_decoded.reset();
            state.url_path_decoded.push_str(&new_path);
            return process_url(engine, state, &target, &new_path);
        }
    }

    state.response.data.reset();
    state.response.data.content_type = ContentType::Html;
    state
        .response
        .data
        .push_str("This agent does not maintain a database for host: ");
    state.response.data.push_html_escaped(token);
    state.response.code = StatusCode::NOT_FOUND;
    StatusCode::NOT_FOUND
}

#[cfg(feature = "internal-checks")]
mod internal {
    //! Debug endpoints, compiled in only for internal builds and still
    //! gated by the configuration capability at runtime.

    use super::{next_token, Capability, ClientState, ContentType, HostHandle, StatusCode, WebEngine};

    pub(super) fn exit(engine: &WebEngine, state: &mut ClientState) -> StatusCode {
        if !engine.access.allows(Capability::NetdataConf, state) {
            return state.permission_denied();
        }

        state.response.data.content_type = ContentType::PlainText;
        state.response.data.reset();
        if engine.request_exit() {
            state.response.data.push_str("I am doing it already");
        } else {
            state.response.data.push_str("ok, will do...");
        }
        log::error!("web request to exit received");

        state.response.code = StatusCode::OK;
        StatusCode::OK
    }

    pub(super) fn debug(
        engine: &WebEngine,
        state: &mut ClientState,
        host: &HostHandle,
        path: &str,
    ) -> StatusCode {
        if !engine.access.allows(Capability::NetdataConf, state) {
            return state.permission_denied();
        }

        let mut rest = path;
        let Some(chart) = next_token(&mut rest, &['&']).filter(|t| !t.is_empty()) else {
            state.response.data.reset();
            state.response.data.push_str("debug which chart?\r\n");
            state.response.code = StatusCode::BAD_REQUEST;
            return StatusCode::BAD_REQUEST;
        };

        match engine.api.toggle_chart_debug(host, chart) {
            Some(enabled) => {
                state.response.data.reset();
                state.response.data.content_type = ContentType::Html;
                state.response.data.push_str("Chart has now debug ");
                state
                    .response
                    .data
                    .push_str(if enabled { "enabled" } else { "disabled" });
                state.response.data.push_str(": ");
                state.response.data.push_html_escaped(chart);
                state.response.code = StatusCode::OK;
                StatusCode::OK
            }
            None => {
                state.response.data.reset();
                state.response.data.content_type = ContentType::Html;
                state.response.data.push_str("Chart is not found: ");
                state.response.data.push_html_escaped(chart);
                state.response.code = StatusCode::NOT_FOUND;
                StatusCode::NOT_FOUND
            }
        }
    }

    pub(super) fn mirror(engine: &WebEngine, state: &mut ClientState) -> StatusCode {
        if !engine.access.allows(Capability::NetdataConf, state) {
            return state.permission_denied();
        }

        // echo the receive buffer back as-is, NUL bytes sanitized
        state.response.data.replace_char(b'\0', b' ');
        state.response.code = StatusCode::OK;
        StatusCode::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_skips_consecutive_separators() {
        let mut rest = "//api///v1/data?after=-10";
        assert_eq!(next_token(&mut rest, &['/', '?']), Some("api"));
        assert_eq!(next_token(&mut rest, &['/', '?']), Some("v1"));
        assert_eq!(next_token(&mut rest, &['/', '?']), Some("data"));
        assert_eq!(next_token(&mut rest, &['/', '?']), Some("after=-10"));
        assert_eq!(next_token(&mut rest, &['/', '?']), None);
    }

    #[test]
    fn tokenizer_empty_input() {
        let mut rest = "";
        assert_eq!(next_token(&mut rest, &['/']), None);
        let mut rest = "///";
        assert_eq!(next_token(&mut rest, &['/']), None);
    }
}
