//! The session loop: transport in, dispatcher, transport out.

use crate::dispatcher::{Dispatch, ProtocolDispatcher};
use crate::error::SessionError;
use crate::health::{spawn_liveness_ticker, HealthSwitch};
use crate::liveness::LivenessSignal;
use crate::network::{send_to_all, Transport};
use crate::registry::PlayerRegistry;
use log::{debug, error, info, warn};
use shared::MAX_FRAME_SIZE;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One running game server instance.
///
/// Frames are handled one at a time in arrival order while a separate task
/// reports liveness. The session ends on `EXIT`, when the last player
/// disconnects, on a receive error or on a failed health report.
pub struct Session<T, L: ?Sized> {
    transport: T,
    signal: Arc<L>,
    dispatcher: ProtocolDispatcher,
    health: HealthSwitch,
    health_interval: Duration,
}

impl<T, L> Session<T, L>
where
    T: Transport,
    L: LivenessSignal + ?Sized + 'static,
{
    /// Builds a session serving `registry` over `transport`.
    ///
    /// `health_interval` is the period between two liveness reports. It is
    /// checked when the session starts: `run` fails with
    /// `SessionError::Config` before contacting the orchestrator if it is
    /// zero.
    pub fn new(
        transport: T,
        signal: Arc<L>,
        registry: PlayerRegistry,
        health_interval: Duration,
    ) -> Self {
        let health = HealthSwitch::new();
        Self {
            transport,
            signal,
            dispatcher: ProtocolDispatcher::new(registry, health.clone()),
            health,
            health_interval,
        }
    }

    /// Handle on the switch that silences liveness reports.
    ///
    /// This is the same switch an `UNHEALTHY` command turns off.
    pub fn health_switch(&self) -> HealthSwitch {
        self.health.clone()
    }

    /// Starts health reporting, signals readiness and serves until the
    /// session ends. Once ready, the orchestrator is asked to shut the
    /// instance down on the way out, whatever the reason. A failed `ready()`
    /// ends the session before any frame is read and skips the shutdown.
    pub async fn run(self) -> Result<(), SessionError> {
        let Session {
            transport,
            signal,
            mut dispatcher,
            health,
            health_interval,
        } = self;

        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let ticker = spawn_liveness_ticker(
            Arc::clone(&signal),
            health.clone(),
            health_interval,
            fatal_tx,
        )?;

        if let Err(e) = signal.ready().await {
            health.stop();
            ticker.abort();
            return Err(e.into());
        }
        info!("Server started successfully");

        let result = serve(&transport, &mut dispatcher, &mut fatal_rx).await;

        health.stop();
        ticker.abort();
        drop(transport);

        match &result {
            Ok(()) => info!("Session finished"),
            Err(e) => error!("Session failed: {}", e),
        }

        if let Err(e) = signal.shutdown().await {
            warn!("Could not shut down game server: {}", e);
        }

        result
    }
}

async fn serve<T>(
    transport: &T,
    dispatcher: &mut ProtocolDispatcher,
    fatal_rx: &mut mpsc::UnboundedReceiver<SessionError>,
) -> Result<(), SessionError>
where
    T: Transport + ?Sized,
{
    let mut buffer = [0u8; MAX_FRAME_SIZE];

    loop {
        let (len, sender) = tokio::select! {
            Some(fatal) = fatal_rx.recv() => return Err(fatal),
            received = transport.recv_frame(&mut buffer) => received?,
        };

        let frame = &buffer[..len];
        debug!(
            "Received packet from {}: {}",
            sender,
            String::from_utf8_lossy(frame).trim()
        );

        let dispatch = dispatcher.dispatch_frame(frame, sender);
        deliver(transport, dispatcher, sender, &dispatch).await;

        if dispatch.terminate {
            return Ok(());
        }
    }
}

/// Sends the reply, then the broadcast. Delivery is best-effort.
async fn deliver<T>(
    transport: &T,
    dispatcher: &ProtocolDispatcher,
    sender: SocketAddr,
    dispatch: &Dispatch,
) where
    T: Transport + ?Sized,
{
    if let Some(reply) = &dispatch.reply {
        if let Err(e) = transport.send_frame(&reply.encode(), sender).await {
            warn!("Failed to reply to {}: {}", sender, e);
        }
    }

    if let Some(broadcast) = &dispatch.broadcast {
        let recipients = dispatcher.registry().addrs();
        let report = send_to_all(transport, &broadcast.encode(), &recipients).await;
        if !report.is_complete() {
            warn!(
                "Game state reached {} of {} players",
                report.delivered,
                recipients.len()
            );
        }
    }
}
