use crate::event::{UiEvent, ViewPayload};
use crate::view::{ActiveView, FetchRequest, MirrorTab, ViewTicket};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use matriz_core::gateway::GatewayError;
use matriz_core::mirror::MirrorSnapshot;
use matriz_core::prober::{ProbeEvent, ProbeReport};
use matriz_core::sync::{SyncEvent, SyncStatus};
use matriz_core::{
    Appointment, MasterIdentity, ShoppingItem, ShoppingList, StatusSnapshot, Subsystem,
    SubsystemState,
};
use std::collections::VecDeque;
use tracing::debug;

pub const EVENT_LOG_CAPACITY: usize = 50;

/// One table's worth of view data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel<T> {
    pub rows: Option<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            rows: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> Panel<T> {
    fn begin(&mut self) {
        self.loading = true;
    }

    /// Replaces the whole collection.
    fn fill(&mut self, rows: Vec<T>) {
        self.rows = Some(rows);
        self.loading = false;
        self.error = None;
    }

    /// Empties the panel. Only a surfaced failure shows its message.
    fn fail(&mut self, message: String, surface: bool) {
        self.rows = None;
        self.loading = false;
        self.error = surface.then_some(message);
    }

    pub fn len(&self) -> usize {
        self.rows.as_ref().map(Vec::len).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncFooter {
    Starting,
    Synced(DateTime<Local>),
    Reconnecting,
}

impl SyncFooter {
    pub fn text(&self) -> String {
        match self {
            SyncFooter::Starting => "Starting automatic sync...".to_string(),
            SyncFooter::Synced(at) => format!("Synced: {}", at.format("%H:%M:%S")),
            SyncFooter::Reconnecting => "Reconnecting...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct MirrorTables {
    pub lists: Panel<ShoppingList>,
    pub items: Panel<ShoppingItem>,
    pub appointments: Panel<Appointment>,
}

pub struct App {
    pub view: ActiveView,
    generation: u64,
    /// `None` until the first probe lands.
    pub indicators: Option<StatusSnapshot>,
    pub master: Option<MasterIdentity>,
    pub footer: SyncFooter,
    pub log: VecDeque<LogLine>,
    pub lists: Panel<ShoppingList>,
    pub items: Panel<ShoppingItem>,
    pub appointments: Panel<Appointment>,
    pub mirror: MirrorTables,
    pub selected: usize,
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            view: ActiveView::Home,
            generation: 0,
            indicators: None,
            master: None,
            footer: SyncFooter::Starting,
            log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
            lists: Panel::default(),
            items: Panel::default(),
            appointments: Panel::default(),
            mirror: MirrorTables::default(),
            selected: 0,
            should_quit: false,
        }
    }

    pub fn ticket(&self) -> ViewTicket {
        ViewTicket {
            generation: self.generation,
        }
    }

    pub fn indicator(&self, subsystem: Subsystem) -> Option<SubsystemState> {
        self.indicators
            .as_ref()
            .map(|snapshot| snapshot.state(subsystem))
    }

    pub fn mirror_title(&self) -> String {
        match &self.master {
            Some(master) => format!("Local DB - [{master}]"),
            None => "Local DB - [Searching...]".to_string(),
        }
    }

    pub fn push_log(&mut self, text: impl Into<String>) {
        if self.log.len() == EVENT_LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogLine {
            at: Local::now(),
            text: text.into(),
        });
    }

    /// Switches view and returns the fetch that fills it.
    pub fn navigate(&mut self, view: ActiveView) -> Vec<FetchRequest> {
        debug!(view = %view.title(), "navigate");
        self.view = view;
        self.selected = 0;
        self.reload()
    }

    /// Re-issues the current view's fetch. Any result still in flight for
    /// an older request is dropped when it arrives.
    pub fn reload(&mut self) -> Vec<FetchRequest> {
        self.generation += 1;
        let Some(fetch) = self.view.fetch() else {
            return Vec::new();
        };
        match &self.view {
            ActiveView::Home => {}
            ActiveView::Lists => self.lists.begin(),
            ActiveView::Items { .. } => self.items.begin(),
            ActiveView::Hospital => self.appointments.begin(),
            ActiveView::LocalMirror { .. } => {
                self.mirror.lists.begin();
                self.mirror.items.begin();
                self.mirror.appointments.begin();
            }
        }
        vec![FetchRequest {
            ticket: self.ticket(),
            fetch,
        }]
    }

    pub fn apply(&mut self, event: UiEvent) -> Vec<FetchRequest> {
        match event {
            UiEvent::Probe(event) => {
                self.apply_probe(event);
                Vec::new()
            }
            UiEvent::ProbeSkipped => {
                self.push_log("Health probe skipped: previous probe still running");
                Vec::new()
            }
            UiEvent::Sync(event) => self.apply_sync(event),
            UiEvent::Loaded { ticket, payload } => {
                self.apply_loaded(ticket, payload);
                Vec::new()
            }
        }
    }

    fn apply_probe(&mut self, event: ProbeEvent) {
        match event {
            ProbeEvent::Report(ProbeReport { snapshot, master }) => {
                if let Some(previous) = &self.indicators {
                    let changes: Vec<String> = snapshot
                        .iter()
                        .filter(|(subsystem, state)| previous.state(*subsystem) != *state)
                        .map(|(subsystem, state)| format!("{} is {state}", subsystem.label()))
                        .collect();
                    for change in changes {
                        self.push_log(change);
                    }
                }
                self.indicators = Some(snapshot);
                if let Some(master) = master {
                    if self.master.as_ref() != Some(&master) {
                        self.push_log(format!("Active master: {master}"));
                    }
                    self.master = Some(master);
                }
            }
            ProbeEvent::Failed(reason) => {
                self.push_log(format!("Health probe failed: {reason}"));
            }
        }
    }

    fn apply_sync(&mut self, event: SyncEvent) -> Vec<FetchRequest> {
        match event {
            SyncEvent::TargetFailed { target, reason } => {
                self.push_log(format!("Sync {target} failed: {reason}"));
                Vec::new()
            }
            SyncEvent::Status(SyncStatus::Synced(at)) => {
                if !matches!(self.footer, SyncFooter::Synced(_)) {
                    self.push_log("Sync complete");
                }
                self.footer = SyncFooter::Synced(at);
                Vec::new()
            }
            SyncEvent::Status(SyncStatus::Reconnecting) => {
                self.footer = SyncFooter::Reconnecting;
                Vec::new()
            }
            SyncEvent::MirrorStale => {
                if self.view.is_local_mirror() {
                    self.reload()
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn apply_loaded(&mut self, ticket: ViewTicket, payload: ViewPayload) {
        if ticket != self.ticket() {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "view_result_dropped"
            );
            return;
        }
        match payload {
            ViewPayload::Lists(result) => {
                if let Some(message) = settle(&mut self.lists, result, false) {
                    self.push_log(format!("Could not load lists: {message}"));
                }
            }
            ViewPayload::Items(result) => {
                if let Some(message) = settle(&mut self.items, result, false) {
                    self.push_log(format!("Could not load items: {message}"));
                }
            }
            ViewPayload::Appointments(result) => {
                if let Some(message) = settle(&mut self.appointments, result, true) {
                    self.push_log(format!("Hospital error: {message}"));
                }
            }
            ViewPayload::Mirror(MirrorSnapshot {
                lists,
                items,
                appointments,
            }) => {
                let failures = [
                    settle(&mut self.mirror.lists, lists, false),
                    settle(&mut self.mirror.items, items, false),
                    settle(&mut self.mirror.appointments, appointments, false),
                ];
                for message in failures.into_iter().flatten() {
                    self.push_log(format!("Local DB read failed: {message}"));
                }
            }
        }
        self.clamp_selection();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<FetchRequest> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('1') => self.navigate(ActiveView::Home),
            KeyCode::Char('2') => self.navigate(ActiveView::Lists),
            KeyCode::Char('3') => self.navigate(ActiveView::Hospital),
            KeyCode::Char('4') => self.navigate(ActiveView::LocalMirror {
                tab: MirrorTab::Shopping,
            }),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                Vec::new()
            }
            KeyCode::Enter => self.open_selected_list(),
            KeyCode::Esc | KeyCode::Backspace => {
                if matches!(self.view, ActiveView::Items { .. }) {
                    self.navigate(ActiveView::Lists)
                } else {
                    Vec::new()
                }
            }
            KeyCode::Tab => {
                if let ActiveView::LocalMirror { tab } = self.view {
                    self.view = ActiveView::LocalMirror { tab: tab.next() };
                    self.selected = 0;
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn open_selected_list(&mut self) -> Vec<FetchRequest> {
        if self.view != ActiveView::Lists {
            return Vec::new();
        }
        let Some(list) = self
            .lists
            .rows
            .as_ref()
            .and_then(|rows| rows.get(self.selected))
            .cloned()
        else {
            return Vec::new();
        };
        self.navigate(ActiveView::Items {
            list_id: list.id,
            list_name: list.name,
        })
    }

    fn visible_rows(&self) -> usize {
        match &self.view {
            ActiveView::Home => 0,
            ActiveView::Lists => self.lists.len(),
            ActiveView::Items { .. } => self.items.len(),
            ActiveView::Hospital => self.appointments.len(),
            ActiveView::LocalMirror {
                tab: MirrorTab::Shopping,
            } => self.mirror.lists.len(),
            ActiveView::LocalMirror {
                tab: MirrorTab::Hospital,
            } => self.mirror.appointments.len(),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let rows = self.visible_rows();
        if rows == 0 {
            self.selected = 0;
            return;
        }
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, rows as isize - 1) as usize;
    }

    fn clamp_selection(&mut self) {
        let rows = self.visible_rows();
        if self.selected >= rows {
            self.selected = rows.saturating_sub(1);
        }
    }
}

/// Applies one fetch result to its panel and returns the failure text, if any.
fn settle<T>(
    panel: &mut Panel<T>,
    result: Result<Vec<T>, GatewayError>,
    surface: bool,
) -> Option<String> {
    match result {
        Ok(rows) => {
            panel.fill(rows);
            None
        }
        Err(err) => {
            let message = err.user_message();
            panel.fail(message.clone(), surface);
            Some(message)
        }
    }
}
