//! Error types for the game server.
//!
//! Registry errors are answered on the wire and never end the session.
//! [`SessionError`] is reserved for failures that stop the process.

use std::io;

use thiserror::Error;

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// All player slots are taken.
    #[error("game is already full")]
    GameFull,

    /// The address already belongs to a registered player.
    #[error("address already registered as {nick}")]
    AlreadyRegistered { nick: String },
}

/// Failure talking to the fleet orchestrator.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("{call} request failed: {source}")]
    Request {
        call: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{call} rejected with status {status}")]
    Status { call: &'static str, status: u16 },
}

/// Fatal errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    #[error("orchestration failure: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
