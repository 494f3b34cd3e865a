//! # Game Server Library
//!
//! This library implements the session layer of a small real-time arcade
//! game. A single instance accepts UDP datagrams from up to four clients,
//! registers them as players and keeps every client's view of the player
//! list in sync.
//!
//! ## Core Responsibilities
//!
//! ### Player Registry
//! The [`registry`] module owns the authoritative list of players. It
//! enforces the player cap, keeps one player per address and hands out
//! unique nicks (`john`, `john1`, `john2`, ...).
//!
//! ### Protocol Dispatch
//! The [`dispatcher`] module interprets client commands (`SIGNUP`,
//! `DISCONNECT`, `EXIT`, `UNHEALTHY`, anything else is echoed) and decides
//! what goes back to the sender and what is broadcast to every player.
//! Every membership change broadcasts a full `GS` snapshot so that all
//! clients converge after each event.
//!
//! ### Orchestration
//! Instances run under a fleet orchestrator that expects a ready call at
//! startup, periodic health reports and a shutdown call at the end. The
//! [`liveness`] module talks to the orchestrator sidecar and the [`health`]
//! module runs the periodic reporting on its own task.
//!
//! ## Architecture Design
//!
//! ### Single Receive Loop
//! Frames are processed strictly one at a time in arrival order by the
//! [`session`] loop. The registry is only ever touched from this loop and
//! needs no locking.
//!
//! ### Concurrent Health Ticker
//! The only state shared between the receive loop and the ticker is the
//! [`health::HealthSwitch`], an atomic one-way flag. A failed health report
//! is fatal and ends the session with an error.
//!
//! ### Best-Effort Delivery
//! Replies and broadcasts never abort the loop. A broadcast attempts every
//! player even when some of them are unreachable.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::liveness::LocalLiveness;
//! use server::network::UdpTransport;
//! use server::registry::PlayerRegistry;
//! use server::session::Session;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = UdpTransport::bind("0.0.0.0:7654").await?;
//!     let session = Session::new(
//!         transport,
//!         Arc::new(LocalLiveness),
//!         PlayerRegistry::default(),
//!         Duration::from_secs(2),
//!     );
//!
//!     // Serves until EXIT, the last player leaving, or a fatal error
//!     session.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod liveness;
pub mod network;
pub mod registry;
pub mod session;

pub use config::ServerConfig;
pub use error::{OrchestrationError, RegistryError, SessionError};
pub use session::Session;
