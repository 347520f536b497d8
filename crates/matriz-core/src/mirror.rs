//! Collection reads from the middleware.
//!
//! Local-mirror reads back the Local DB view; the remote reads back the App 1
//! and Hospital views. Every call returns the whole collection for its kind
//! and has no side effects, so repeating it is always safe.

use crate::gateway::{application_error, Gateway, GatewayError};
use crate::{Appointment, ShoppingItem, ShoppingList};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const LOCAL_LISTS_PATH: &str = "/api/local/lists";
pub const LOCAL_ITEMS_PATH: &str = "/api/local/items";
pub const LOCAL_APPOINTMENTS_PATH: &str = "/api/local/citas";
pub const REMOTE_LISTS_PATH: &str = "/api/externo/app1/lists";
pub const REMOTE_ITEMS_PATH: &str = "/api/externo/app1/items";
pub const REMOTE_APPOINTMENTS_PATH: &str = "/api/externo/hospital/citas";

/// The three local tables, each read on its own. One failed read never
/// hides the other two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSnapshot {
    pub lists: Result<Vec<ShoppingList>, GatewayError>,
    pub items: Result<Vec<ShoppingItem>, GatewayError>,
    pub appointments: Result<Vec<Appointment>, GatewayError>,
}

impl MirrorSnapshot {
    pub fn failures(&self) -> Vec<&GatewayError> {
        [
            self.lists.as_ref().err(),
            self.items.as_ref().err(),
            self.appointments.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Clone)]
pub struct MirrorReader {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
}

impl MirrorReader {
    pub fn new(gateway: Arc<dyn Gateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn local_lists(&self) -> Result<Vec<ShoppingList>, GatewayError> {
        self.collection(LOCAL_LISTS_PATH, &[]).await
    }

    pub async fn local_items(&self) -> Result<Vec<ShoppingItem>, GatewayError> {
        self.collection(LOCAL_ITEMS_PATH, &[]).await
    }

    pub async fn local_appointments(&self) -> Result<Vec<Appointment>, GatewayError> {
        self.collection(LOCAL_APPOINTMENTS_PATH, &[]).await
    }

    /// Reads all three local tables concurrently.
    pub async fn read_local(&self) -> MirrorSnapshot {
        let (lists, items, appointments) = tokio::join!(
            self.local_lists(),
            self.local_items(),
            self.local_appointments()
        );
        MirrorSnapshot {
            lists,
            items,
            appointments,
        }
    }

    pub async fn remote_lists(&self) -> Result<Vec<ShoppingList>, GatewayError> {
        self.collection(REMOTE_LISTS_PATH, &[]).await
    }

    pub async fn remote_items(&self, list_id: &str) -> Result<Vec<ShoppingItem>, GatewayError> {
        self.collection(REMOTE_ITEMS_PATH, &[("list_id", list_id)])
            .await
    }

    pub async fn remote_appointments(&self) -> Result<Vec<Appointment>, GatewayError> {
        self.collection(REMOTE_APPOINTMENTS_PATH, &[]).await
    }

    async fn collection<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, GatewayError> {
        let body = self.gateway.get(path, params, self.timeout).await?;
        let records = decode_collection(path, body)?;
        debug!(path, count = records.len(), "collection_read");
        Ok(records)
    }
}

fn decode_collection<T: DeserializeOwned>(path: &str, body: Value) -> Result<Vec<T>, GatewayError> {
    if let Some(err) = application_error(path, &body) {
        return Err(err);
    }
    if !body.is_array() {
        return Err(GatewayError::protocol(path, "expected a JSON array"));
    }
    serde_json::from_value(body)
        .map_err(|err| GatewayError::protocol(path, format!("unexpected record shape: {err}")))
}
