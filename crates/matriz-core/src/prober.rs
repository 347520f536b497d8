//! Periodic health probe.
//!
//! One probe reads `/api/system-status` and then, independently, the active
//! master identity from `/health`. Only one probe may be outstanding; a tick
//! arriving while one is in flight is skipped, not queued. Failed probes
//! produce no snapshot, so whatever the UI last applied stays on screen.

use crate::config::Timeouts;
use crate::dispatch::DispatchBridge;
use crate::gateway::{Gateway, GatewayError};
use crate::{MasterIdentity, StatusSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SYSTEM_STATUS_PATH: &str = "/api/system-status";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub snapshot: StatusSnapshot,
    pub master: Option<MasterIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Report(ProbeReport),
    /// The tick's snapshot was dropped. Carries a short reason for the
    /// activity log only; indicators must not react to it.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTick {
    Started,
    Skipped,
}

/// Holds the prober's in-flight flag for the lifetime of one probe.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct HealthProber {
    gateway: Arc<dyn Gateway>,
    timeouts: Timeouts,
    in_flight: Arc<AtomicBool>,
}

impl HealthProber {
    pub fn new(gateway: Arc<dyn Gateway>, timeouts: Timeouts) -> Self {
        Self {
            gateway,
            timeouts,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_probing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one probe inline, ignoring the in-flight guard.
    pub async fn probe(&self) -> Result<ProbeReport, GatewayError> {
        run_probe(self.gateway.as_ref(), self.timeouts).await
    }

    /// Scheduler entry point: starts a background probe unless one is still
    /// running. The result reaches the UI only through `bridge`.
    pub fn tick<E>(&self, bridge: &DispatchBridge<E>) -> ProbeTick
    where
        E: From<ProbeEvent> + Send + 'static,
    {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("probe_skipped: previous probe still in flight");
            return ProbeTick::Skipped;
        };
        let gateway = self.gateway.clone();
        let timeouts = self.timeouts;
        let bridge = bridge.clone();
        tokio::spawn(async move {
            // The next tick may start only once this outcome is queued.
            match run_probe(gateway.as_ref(), timeouts).await {
                Ok(report) => {
                    debug!(up = report.snapshot.up_count(), "probe_applied");
                    bridge.dispatch(ProbeEvent::Report(report));
                }
                Err(err) => {
                    warn!(timed_out = err.is_timeout(), "probe_failed: {err}");
                    bridge.dispatch(ProbeEvent::Failed(err.user_message()));
                }
            }
            drop(guard);
        });
        ProbeTick::Started
    }
}

async fn run_probe(
    gateway: &dyn Gateway,
    timeouts: Timeouts,
) -> Result<ProbeReport, GatewayError> {
    let body = gateway.get(SYSTEM_STATUS_PATH, &[], timeouts.status).await?;
    let snapshot = StatusSnapshot::from_value(&body).ok_or_else(|| {
        GatewayError::protocol(SYSTEM_STATUS_PATH, "system status body is not an object")
    })?;

    let master = match gateway.get(HEALTH_PATH, &[], timeouts.identity).await {
        Ok(body) => Some(MasterIdentity::from_health(&body)),
        Err(err) => {
            debug!("master_identity_unavailable: {err}");
            None
        }
    };

    Ok(ProbeReport { snapshot, master })
}
