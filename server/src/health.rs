//! Periodic liveness reporting to the fleet orchestrator.
//!
//! The ticker runs on its own task and is silenced through a [`HealthSwitch`]
//! shared with the receive loop. Turning the switch off is one-way: once
//! stopped, the ticker never resumes.

use crate::error::SessionError;
use crate::liveness::LivenessSignal;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Shared on/off flag for the liveness ticker.
#[derive(Debug, Clone)]
pub struct HealthSwitch {
    active: Arc<AtomicBool>,
    stopped: Arc<Notify>,
}

impl HealthSwitch {
    /// Creates a switch in the active state.
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(Notify::new()),
        }
    }

    /// Whether health reports should still be sent.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stops the ticker. Returns true only for the call that flipped the
    /// switch; later calls are no-ops.
    pub fn stop(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if was_active {
            // notify_one stores a permit, so a ticker that is busy
            // reporting still sees the stop on its next wait.
            self.stopped.notify_one();
        }
        was_active
    }

    async fn wait_stopped(&self) {
        self.stopped.notified().await
    }
}

impl Default for HealthSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the liveness ticker.
///
/// Health is reported immediately and then once per `period` until the
/// switch is stopped. A failed report is fatal: it is forwarded on `fatal_tx`
/// and the ticker exits without retrying. A report that fails after the
/// switch was stopped is only logged.
///
/// Returns `SessionError::Config` for a zero `period`.
pub fn spawn_liveness_ticker<L>(
    signal: Arc<L>,
    switch: HealthSwitch,
    period: Duration,
    fatal_tx: mpsc::UnboundedSender<SessionError>,
) -> Result<JoinHandle<()>, SessionError>
where
    L: LivenessSignal + ?Sized + 'static,
{
    if period.is_zero() {
        return Err(SessionError::Config(
            "health interval must be greater than zero".to_string(),
        ));
    }

    Ok(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = switch.wait_stopped() => break,
                _ = ticker.tick() => {}
            }

            if !switch.is_active() {
                break;
            }

            if let Err(e) = signal.health().await {
                // Stopped while the report was in flight: not an orchestrator fault.
                if !switch.stop() {
                    debug!("Health ping failed after pings were disabled: {}", e);
                    break;
                }
                error!("Could not send health ping: {}", e);
                let _ = fatal_tx.send(SessionError::Orchestration(e));
                return;
            }
            debug!("Health ping sent");
        }

        info!("Stopped health pings");
    }))
}
