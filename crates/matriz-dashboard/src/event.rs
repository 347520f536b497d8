use crate::view::ViewTicket;
use matriz_core::gateway::GatewayError;
use matriz_core::mirror::MirrorSnapshot;
use matriz_core::prober::ProbeEvent;
use matriz_core::sync::SyncEvent;
use matriz_core::{Appointment, ShoppingItem, ShoppingList};

/// Everything background work may hand to the presentation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Probe(ProbeEvent),
    /// A probe tick found the previous probe still running.
    ProbeSkipped,
    Sync(SyncEvent),
    Loaded {
        ticket: ViewTicket,
        payload: ViewPayload,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewPayload {
    Lists(Result<Vec<ShoppingList>, GatewayError>),
    Items(Result<Vec<ShoppingItem>, GatewayError>),
    Appointments(Result<Vec<Appointment>, GatewayError>),
    Mirror(MirrorSnapshot),
}

impl From<ProbeEvent> for UiEvent {
    fn from(event: ProbeEvent) -> Self {
        UiEvent::Probe(event)
    }
}

impl From<SyncEvent> for UiEvent {
    fn from(event: SyncEvent) -> Self {
        UiEvent::Sync(event)
    }
}
