use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_RECV_TIMEOUT_MS;
use crate::constants::DEFAULT_SERVERS;
use crate::Error;
use crate::Result;

/// Parameters used when dialing the ensemble
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    /// Comma separated `host:port` list
    ///
    /// Default: `localhost:2181`
    #[serde(default = "default_servers")]
    pub servers: String,

    /// Requested session timeout; the ensemble may negotiate a different one
    ///
    /// Default: 5000
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            recv_timeout_ms: default_recv_timeout_ms(),
        }
    }
}

impl SessionConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.servers.split(',').all(|s| s.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(
                "session.servers must list at least one host:port".into(),
            )));
        }
        if self.recv_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "session.recv_timeout_ms must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_servers() -> String {
    DEFAULT_SERVERS.to_string()
}
fn default_recv_timeout_ms() -> u64 {
    DEFAULT_RECV_TIMEOUT_MS
}
