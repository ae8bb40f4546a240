//! Seams to the engine's external collaborators.
//!
//! The router only ever asks these narrow questions: "may this client
//! do X", "which host is this", "handle this API call", "take over this
//! ingest socket", "dump the configuration". The concrete handlers live
//! elsewhere in the agent; the defaults here are just enough to run the
//! engine standalone and in tests.

use std::collections::HashMap;

use vigil_http::{StatusCode, WebBuffer};

use crate::slot::ClientState;

/// Access capabilities gating URL surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Dashboard,
    Registry,
    Badges,
    Mgmt,
    Stream,
    NetdataConf,
}

impl Capability {
    /// The capabilities any data or OPTIONS request may enter with.
    pub const ANY_WEB: [Capability; 5] = [
        Capability::Dashboard,
        Capability::Registry,
        Capability::Badges,
        Capability::Mgmt,
        Capability::NetdataConf,
    ];
}

/// Boolean capability queries resolved by the agent's access control.
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, capability: Capability, client: &ClientState) -> bool;
}

/// Allow everything; the default for standalone use.
#[derive(Debug, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allows(&self, _capability: Capability, _client: &ClientState) -> bool {
        true
    }
}

/// Deny-list policy used in tests and minimal deployments.
#[derive(Debug, Default)]
pub struct DenyCapabilities {
    denied: Vec<Capability>,
}

impl DenyCapabilities {
    #[must_use]
    pub fn new(denied: Vec<Capability>) -> Self {
        Self { denied }
    }
}

impl AccessPolicy for DenyCapabilities {
    fn allows(&self, capability: Capability, _client: &ClientState) -> bool {
        !self.denied.contains(&capability)
    }
}

/// Opaque handle to a host in the metrics database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostHandle(pub String);

/// Host lookup by the three identifiers the URL surface accepts.
pub trait HostRegistry: Send + Sync {
    fn localhost(&self) -> HostHandle;
    fn find_by_node_id(&self, token: &str) -> Option<HostHandle>;
    fn find_by_hostname(&self, token: &str) -> Option<HostHandle>;
    fn find_by_guid(&self, token: &str) -> Option<HostHandle>;
}

/// In-memory registry: the local host plus any statically registered
/// children.
#[derive(Debug)]
pub struct StaticHostRegistry {
    localhost: HostHandle,
    by_node_id: HashMap<String, HostHandle>,
    by_hostname: HashMap<String, HostHandle>,
    by_guid: HashMap<String, HostHandle>,
}

impl StaticHostRegistry {
    #[must_use]
    pub fn new(localhost_name: impl Into<String>) -> Self {
        let localhost = HostHandle(localhost_name.into());
        let mut registry = Self {
            localhost: localhost.clone(),
            by_node_id: HashMap::new(),
            by_hostname: HashMap::new(),
            by_guid: HashMap::new(),
        };
        registry
            .by_hostname
            .insert(registry.localhost.0.clone(), localhost);
        registry
    }

    /// Register a child host reachable through the host switch.
    pub fn add_host(&mut self, hostname: &str, guid: &str, node_id: &str) {
        let handle = HostHandle(hostname.to_string());
        self.by_hostname.insert(hostname.to_string(), handle.clone());
        self.by_guid.insert(guid.to_string(), handle.clone());
        self.by_node_id.insert(node_id.to_string(), handle);
    }
}

impl HostRegistry for StaticHostRegistry {
    fn localhost(&self) -> HostHandle {
        self.localhost.clone()
    }

    fn find_by_node_id(&self, token: &str) -> Option<HostHandle> {
        self.by_node_id.get(token).cloned()
    }

    fn find_by_hostname(&self, token: &str) -> Option<HostHandle> {
        self.by_hostname.get(token).cloned()
    }

    fn find_by_guid(&self, token: &str) -> Option<HostHandle> {
        self.by_guid.get(token).cloned()
    }
}

/// Versioned JSON API selected by `/api/v1/...` or `/api/v2/...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

/// The versioned JSON API dispatch seam.
///
/// Implementations must reset `state.response.data` before writing the
/// response body into it; on entry it still holds the raw request.
pub trait ApiDispatch: Send + Sync {
    fn dispatch(
        &self,
        host: &HostHandle,
        version: ApiVersion,
        path: &str,
        state: &mut ClientState,
    ) -> StatusCode;

    /// Toggle chart-level debugging, for the internal `debug` endpoint.
    /// `None` means the chart does not exist.
    fn toggle_chart_debug(&self, _host: &HostHandle, _chart: &str) -> Option<bool> {
        None
    }
}

/// Placeholder API that knows no endpoints.
#[derive(Debug, Default)]
pub struct NoApi;

impl ApiDispatch for NoApi {
    fn dispatch(
        &self,
        _host: &HostHandle,
        _version: ApiVersion,
        _path: &str,
        state: &mut ClientState,
    ) -> StatusCode {
        state.response.data.reset();
        state.response.data.content_type = vigil_http::ContentType::Html;
        state.response.data.push_str("Unknown API endpoint.");
        state.response.code = StatusCode::NOT_FOUND;
        StatusCode::NOT_FOUND
    }
}

/// The streaming-ingest seam. On success the implementation takes over
/// the socket; the engine sends nothing further on this connection.
pub trait StreamIngest: Send + Sync {
    fn spawn_receiver(&self, state: &mut ClientState) -> StatusCode;
}

/// Ingest disabled; children are turned away.
#[derive(Debug, Default)]
pub struct DisabledIngest;

impl StreamIngest for DisabledIngest {
    fn spawn_receiver(&self, state: &mut ClientState) -> StatusCode {
        state.response.data.reset();
        state.response.data.push_str("streaming is not enabled");
        state.response.code = StatusCode::SERVICE_UNAVAILABLE;
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Configuration dump source for the `netdata.conf` endpoint.
pub trait ConfigSource: Send + Sync {
    fn generate(&self, out: &mut WebBuffer);
}

/// Serve a fixed configuration rendering.
#[derive(Debug)]
pub struct StaticConfigDump(pub String);

impl Default for StaticConfigDump {
    fn default() -> Self {
        Self("# vigil configuration\n".to_string())
    }
}

impl ConfigSource for StaticConfigDump {
    fn generate(&self, out: &mut WebBuffer) {
        out.push_str(&self.0);
    }
}
