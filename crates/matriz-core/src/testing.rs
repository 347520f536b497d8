use crate::gateway::{Gateway, GatewayError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

/// In-memory [`Gateway`] answering from a per-path script.
///
/// Paths registered with [`ScriptedGateway::hold`] block until the test
/// calls [`ScriptedGateway::release`], which makes in-flight calls
/// observable.
pub struct ScriptedGateway {
    responses: Mutex<HashMap<String, Result<Value, GatewayError>>>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    held: Mutex<HashSet<String>>,
    gate: Semaphore,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(HashSet::new()),
            gate: Semaphore::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn respond(&self, path: &str, response: Result<Value, GatewayError>) {
        self.responses
            .lock()
            .expect("responses")
            .insert(path.to_string(), response);
    }

    pub fn hold(&self, path: &str) {
        self.held.lock().expect("held").insert(path.to_string());
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .filter(|(called, _)| called == path)
            .count()
    }

    pub fn params_for(&self, path: &str) -> Vec<Vec<(String, String)>> {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .filter(|(called, _)| called == path)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn answer(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, GatewayError> {
        self.calls.lock().expect("calls").push((
            path.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let held = self.held.lock().expect("held").contains(path);
        if held {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        let response = self
            .responses
            .lock()
            .expect("responses")
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(refused(path)));
        self.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        _timeout: Duration,
    ) -> Result<Value, GatewayError> {
        self.answer(path, params).await
    }

    async fn post(&self, path: &str, _timeout: Duration) -> Result<Value, GatewayError> {
        self.answer(path, &[]).await
    }
}

pub fn refused(path: &str) -> GatewayError {
    GatewayError::Network {
        path: path.to_string(),
        message: "connection refused".to_string(),
        timed_out: false,
    }
}
