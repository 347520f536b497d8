use crate::event::{UiEvent, ViewPayload};
use matriz_core::dispatch::DispatchBridge;
use matriz_core::mirror::MirrorReader;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorTab {
    Shopping,
    Hospital,
}

impl MirrorTab {
    pub fn next(self) -> Self {
        match self {
            MirrorTab::Shopping => MirrorTab::Hospital,
            MirrorTab::Hospital => MirrorTab::Shopping,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MirrorTab::Shopping => "Shopping (App 1)",
            MirrorTab::Hospital => "Appointments (Hospital)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveView {
    Home,
    Lists,
    Items { list_id: String, list_name: String },
    Hospital,
    LocalMirror { tab: MirrorTab },
}

impl ActiveView {
    pub fn title(&self) -> String {
        match self {
            ActiveView::Home => "Home".to_string(),
            ActiveView::Lists => "App 1 - Shopping lists".to_string(),
            ActiveView::Items { list_name, .. } => format!("App 1 - Items of '{list_name}'"),
            ActiveView::Hospital => "App 2 - Hospital appointments".to_string(),
            ActiveView::LocalMirror { .. } => "Local DB".to_string(),
        }
    }

    pub fn is_local_mirror(&self) -> bool {
        matches!(self, ActiveView::LocalMirror { .. })
    }

    /// The on-demand fetch that fills this view, if any.
    pub fn fetch(&self) -> Option<Fetch> {
        match self {
            ActiveView::Home => None,
            ActiveView::Lists => Some(Fetch::RemoteLists),
            ActiveView::Items { list_id, .. } => Some(Fetch::RemoteItems {
                list_id: list_id.clone(),
            }),
            ActiveView::Hospital => Some(Fetch::RemoteAppointments),
            ActiveView::LocalMirror { .. } => Some(Fetch::LocalMirror),
        }
    }
}

/// Identifies the view state a fetch was issued for. A result is applied
/// only while its ticket is still the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket {
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    RemoteLists,
    RemoteItems { list_id: String },
    RemoteAppointments,
    LocalMirror,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: ViewTicket,
    pub fetch: Fetch,
}

/// Runs view fetches off the presentation loop and hands the results back
/// through the dispatch bridge.
#[derive(Clone)]
pub struct ViewController {
    reader: MirrorReader,
    bridge: DispatchBridge<UiEvent>,
}

impl ViewController {
    pub fn new(reader: MirrorReader, bridge: DispatchBridge<UiEvent>) -> Self {
        Self { reader, bridge }
    }

    pub fn issue(&self, request: FetchRequest) {
        let reader = self.reader.clone();
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            let FetchRequest { ticket, fetch } = request;
            debug!(generation = ticket.generation, ?fetch, "view_fetch_started");
            let payload = load(&reader, fetch).await;
            bridge.dispatch(UiEvent::Loaded { ticket, payload });
        });
    }

    pub fn issue_all(&self, requests: Vec<FetchRequest>) {
        for request in requests {
            self.issue(request);
        }
    }
}

async fn load(reader: &MirrorReader, fetch: Fetch) -> ViewPayload {
    match fetch {
        Fetch::RemoteLists => ViewPayload::Lists(reader.remote_lists().await),
        Fetch::RemoteItems { list_id } => ViewPayload::Items(reader.remote_items(&list_id).await),
        Fetch::RemoteAppointments => ViewPayload::Appointments(reader.remote_appointments().await),
        Fetch::LocalMirror => ViewPayload::Mirror(reader.read_local().await),
    }
}
