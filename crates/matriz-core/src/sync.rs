//! Periodic remote-to-local synchronization.
//!
//! Every tick asks the middleware to pull each federated application into
//! the local mirror. Targets run concurrently and independently: one
//! failing target never stops the others. The tick is `Synced` only when
//! every target succeeded.

use crate::dispatch::DispatchBridge;
use crate::gateway::{application_error, Gateway, GatewayError};
use chrono::{DateTime, Local};
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SYNC_APP1_PATH: &str = "/api/sync/app1";
pub const SYNC_HOSPITAL_PATH: &str = "/api/sync/hospital";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncTarget {
    App1,
    Hospital,
}

impl SyncTarget {
    pub const ALL: [SyncTarget; 2] = [SyncTarget::App1, SyncTarget::Hospital];

    pub fn path(&self) -> &'static str {
        match self {
            SyncTarget::App1 => SYNC_APP1_PATH,
            SyncTarget::Hospital => SYNC_HOSPITAL_PATH,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTarget::App1 => "app1",
            SyncTarget::Hospital => "hospital",
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the middleware said about one sync, e.g.
/// `{"status": "App1 synced", "lists": 3, "items": 12}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReceipt {
    pub status: Option<String>,
    pub counts: BTreeMap<String, u64>,
}

impl SyncReceipt {
    /// Lenient: unknown shapes give an empty receipt, never an error.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        let status = map
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string);
        let counts = map
            .iter()
            .filter_map(|(key, value)| value.as_u64().map(|count| (key.clone(), count)))
            .collect();
        Self { status, counts }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: SyncTarget,
    pub result: Result<SyncReceipt, GatewayError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Synced(DateTime<Local>),
    Reconnecting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTickReport {
    pub outcomes: Vec<TargetOutcome>,
    pub completed_at: DateTime<Local>,
}

impl SyncTickReport {
    pub fn status(&self) -> SyncStatus {
        if self.outcomes.iter().all(|outcome| outcome.result.is_ok()) {
            SyncStatus::Synced(self.completed_at)
        } else {
            SyncStatus::Reconnecting
        }
    }

    pub fn failed_targets(&self) -> Vec<SyncTarget> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .map(|outcome| outcome.target)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    TargetFailed { target: SyncTarget, reason: String },
    Status(SyncStatus),
    /// Advisory: the local mirror may have changed. Sent after every
    /// fully successful tick, whether or not any record actually moved.
    MirrorStale,
}

#[derive(Clone)]
pub struct SyncDriver {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
}

impl SyncDriver {
    pub fn new(gateway: Arc<dyn Gateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn run_tick(&self) -> SyncTickReport {
        let gateway = self.gateway.as_ref();
        let timeout = self.timeout;
        let outcomes = join_all(SyncTarget::ALL.iter().map(|target| async move {
            TargetOutcome {
                target: *target,
                result: sync_target(gateway, *target, timeout).await,
            }
        }))
        .await;
        SyncTickReport {
            outcomes,
            completed_at: Local::now(),
        }
    }

    /// Scheduler entry point. Runs one tick in the background and reports
    /// through `bridge`.
    pub fn tick<E>(&self, bridge: &DispatchBridge<E>)
    where
        E: From<SyncEvent> + Send + 'static,
    {
        let driver = self.clone();
        let bridge = bridge.clone();
        tokio::spawn(async move {
            let report = driver.run_tick().await;
            for event in tick_events(&report) {
                bridge.dispatch(event);
            }
        });
    }
}

/// Events for one finished tick, in dispatch order.
pub fn tick_events(report: &SyncTickReport) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(receipt) => {
                debug!(
                    sync_target = %outcome.target,
                    status = receipt.status.as_deref().unwrap_or(""),
                    counts = ?receipt.counts,
                    "sync_target_ok"
                );
            }
            Err(err) => {
                warn!(sync_target = %outcome.target, "sync_target_failed: {err}");
                events.push(SyncEvent::TargetFailed {
                    target: outcome.target,
                    reason: err.user_message(),
                });
            }
        }
    }
    let status = report.status();
    if let SyncStatus::Synced(at) = &status {
        info!(at = %at.format("%H:%M:%S"), "sync_tick_complete");
        events.push(SyncEvent::Status(status));
        events.push(SyncEvent::MirrorStale);
    } else {
        events.push(SyncEvent::Status(status));
    }
    events
}

async fn sync_target(
    gateway: &dyn Gateway,
    target: SyncTarget,
    timeout: Duration,
) -> Result<SyncReceipt, GatewayError> {
    let body = gateway.post(target.path(), timeout).await?;
    if let Some(err) = application_error(target.path(), &body) {
        return Err(err);
    }
    Ok(SyncReceipt::from_value(&body))
}
