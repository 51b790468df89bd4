use std::sync::Arc;
use std::time::Duration;

use super::Session;
use crate::config::RetryChangePolicy;
use crate::config::ZkConfig;
use crate::runtime::ClientId;
use crate::runtime::CoordinationRuntime;
use crate::watch::EventStream;
use crate::Result;

pub struct SessionBuilder {
    runtime: Arc<dyn CoordinationRuntime>,
    servers: String,
    recv_timeout: Duration,
    retry_policy: RetryChangePolicy,
}

impl SessionBuilder {
    /// Create a new builder with default session settings
    pub fn new(runtime: Arc<dyn CoordinationRuntime>) -> Self {
        Self::from_config(runtime, &ZkConfig::default())
    }

    /// Takes servers, timeout and retry policy from a loaded configuration
    pub fn from_config(
        runtime: Arc<dyn CoordinationRuntime>,
        config: &ZkConfig,
    ) -> Self {
        Self {
            runtime,
            servers: config.session.servers.clone(),
            recv_timeout: config.session.recv_timeout(),
            retry_policy: config.retry_change,
        }
    }

    /// Set the comma separated `host:port` list (default: localhost:2181)
    pub fn servers(
        mut self,
        servers: impl Into<String>,
    ) -> Self {
        self.servers = servers.into();
        self
    }

    /// Set the requested session timeout (default: 5s)
    pub fn recv_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Bound `retry_change` loops (default: unbounded)
    pub fn retry_policy(
        mut self,
        policy: RetryChangePolicy,
    ) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn dial(self) -> Result<(Session, EventStream)> {
        Session::open(self.runtime, &self.servers, self.recv_timeout, None, self.retry_policy)
    }

    pub fn redial(
        self,
        client_id: ClientId,
    ) -> Result<(Session, EventStream)> {
        Session::open(
            self.runtime,
            &self.servers,
            self.recv_timeout,
            Some(client_id),
            self.retry_policy,
        )
    }
}
