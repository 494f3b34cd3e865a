//! Runtime configuration for a game server instance.

use crate::error::SessionError;
use crate::liveness::DEFAULT_SDK_PORT;
use shared::{DEFAULT_PORT, MAX_PLAYERS};
use std::time::Duration;

pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind the UDP socket to
    pub host: String,
    pub port: u16,
    /// Period between two liveness reports
    pub health_interval: Duration,
    /// Port of the orchestrator sidecar on localhost
    pub sdk_port: u16,
    /// Run without an orchestrator
    pub local: bool,
    pub max_players: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.health_interval.is_zero() {
            return Err(SessionError::Config(
                "health interval must be greater than zero".to_string(),
            ));
        }
        if self.max_players == 0 {
            return Err(SessionError::Config(
                "at least one player slot is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            sdk_port: DEFAULT_SDK_PORT,
            local: false,
            max_players: MAX_PLAYERS,
        }
    }
}
