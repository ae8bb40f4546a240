//! The engine: configuration, collaborator seams, and shared counters
//! wired together.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::accesslog::AccessLog;
use crate::api::{
    AccessPolicy, AllowAll, ApiDispatch, ConfigSource, DisabledIngest, HostRegistry, NoApi,
    StaticConfigDump, StaticHostRegistry, StreamIngest,
};
use crate::config::WebConfig;
use crate::connection::WebClient;
use crate::slot::ClientState;
use crate::transport::Transport;

/// One engine serves all connections of a listener set.
pub struct WebEngine {
    pub config: WebConfig,
    pub hosts: Box<dyn HostRegistry>,
    pub api: Box<dyn ApiDispatch>,
    pub access: Box<dyn AccessPolicy>,
    pub ingest: Box<dyn StreamIngest>,
    pub config_dump: Box<dyn ConfigSource>,
    pub access_log: AccessLog,

    ids: AtomicU64,
    exit_requested: AtomicBool,
    memory_accounting: Arc<AtomicUsize>,
}

impl WebEngine {
    #[must_use]
    pub fn new(config: WebConfig) -> Self {
        Self {
            config,
            hosts: Box::new(StaticHostRegistry::new("localhost")),
            api: Box::new(NoApi),
            access: Box::new(AllowAll),
            ingest: Box::new(DisabledIngest),
            config_dump: Box::new(StaticConfigDump::default()),
            access_log: AccessLog::to_stderr(),
            ids: AtomicU64::new(1),
            exit_requested: AtomicBool::new(false),
            memory_accounting: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_hosts(mut self, hosts: Box<dyn HostRegistry>) -> Self {
        self.hosts = hosts;
        self
    }

    #[must_use]
    pub fn with_api(mut self, api: Box<dyn ApiDispatch>) -> Self {
        self.api = api;
        self
    }

    #[must_use]
    pub fn with_access_policy(mut self, access: Box<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_ingest(mut self, ingest: Box<dyn StreamIngest>) -> Self {
        self.ingest = ingest;
        self
    }

    #[must_use]
    pub fn with_config_dump(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.config_dump = source;
        self
    }

    #[must_use]
    pub fn with_access_log(mut self, log: AccessLog) -> Self {
        self.access_log = log;
        self
    }

    /// Build a client slot for an accepted transport.
    pub fn new_client<T: Transport>(&self, transport: T, peer_ip: String, peer_port: u16) -> WebClient<T> {
        let mut state = ClientState::new(
            self.ids.fetch_add(1, Ordering::Relaxed),
            peer_ip,
            peer_port,
            Arc::clone(&self.memory_accounting),
        );
        state.timings.timeout = self.config.timeout;
        state.policy.tls_force = self.config.tls_force;
        state.policy.tls_default = self.config.tls_default;
        state.policy.corkable = transport.is_corkable();

        WebClient::new(transport, state)
    }

    /// Latch the exit flag (the internal `exit` endpoint). Returns the
    /// previous value.
    pub fn request_exit(&self) -> bool {
        self.exit_requested.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    /// Process-wide slot memory counter.
    #[must_use]
    pub fn memory_accounting(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.memory_accounting)
    }
}

impl std::fmt::Debug for WebEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
