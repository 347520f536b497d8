use crate::app::{App, Panel, SyncFooter};
use crate::theme::{self, icons};
use crate::view::{ActiveView, MirrorTab};
use matriz_core::{Appointment, ShoppingItem, ShoppingList, Subsystem};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

const NAV_TITLES: [&str; 4] = ["1 Home", "2 App 1 lists", "3 Hospital", "4 Local DB"];

pub fn render(f: &mut Frame, app: &App) {
    let area = f.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_indicators(f, app, layout[0]);
    render_nav(f, app, layout[1]);
    match &app.view {
        ActiveView::Home => render_home(f, app, layout[2]),
        ActiveView::Lists => render_lists(f, app, &app.lists, "App 1 - Shopping lists", layout[2]),
        ActiveView::Items { list_name, .. } => render_items(
            f,
            app,
            &app.items,
            &format!("Items of '{list_name}' (Esc: back)"),
            layout[2],
        ),
        ActiveView::Hospital => render_appointments(
            f,
            app,
            &app.appointments,
            "App 2 - Hospital appointments",
            layout[2],
        ),
        ActiveView::LocalMirror { tab } => render_mirror(f, app, *tab, layout[2]),
    }
    render_footer(f, app, layout[3]);
}

fn render_indicators(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for subsystem in Subsystem::ALL {
        let state = app.indicator(subsystem);
        spans.push(Span::styled(
            format!("{} ", icons::INDICATOR),
            Style::default().fg(theme::indicator_color(state)),
        ));
        spans.push(Span::raw(subsystem.label()));
        spans.push(Span::raw("    "));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled("Casa Matriz - Control Panel", theme::HEADER_STYLE));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_nav(f: &mut Frame, app: &App, area: Rect) {
    let selected = match app.view {
        ActiveView::Home => 0,
        ActiveView::Lists | ActiveView::Items { .. } => 1,
        ActiveView::Hospital => 2,
        ActiveView::LocalMirror { .. } => 3,
    };
    let tabs = Tabs::new(NAV_TITLES.to_vec())
        .block(Block::default().borders(Borders::ALL))
        .select(selected)
        .style(Style::default().fg(theme::MUTED))
        .highlight_style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn render_home(f: &mut Frame, app: &App, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    let welcome = vec![
        Line::from(Span::styled(
            "Welcome to the Casa Matriz control panel",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Health is checked every few seconds and both applications are"),
        Line::from("synchronized into the local database automatically."),
        Line::from(vec![
            Span::styled("1-4", Color::Cyan),
            Span::raw(" views  "),
            Span::styled("r", Color::Cyan),
            Span::raw(" reload  "),
            Span::styled("q", Color::Cyan),
            Span::raw(" quit"),
        ]),
    ];
    f.render_widget(
        Paragraph::new(welcome)
            .block(Block::default().borders(Borders::ALL).title("Home"))
            .wrap(Wrap { trim: true }),
        layout[0],
    );

    let lines: Vec<Line> = app
        .log
        .iter()
        .rev()
        .map(|line| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", line.at.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(line.text.as_str()),
            ])
        })
        .collect();
    let log = if lines.is_empty() {
        Paragraph::new(Line::from(Span::styled(
            "No events yet.",
            Style::default().fg(Color::DarkGray),
        )))
    } else {
        Paragraph::new(lines)
    };
    f.render_widget(
        log.block(Block::default().borders(Borders::ALL).title("Activity")),
        layout[1],
    );
}

/// Shared empty, loading and error states. Returns `true` when the panel
/// still needs its table drawn.
fn render_placeholder<T>(f: &mut Frame, panel: &Panel<T>, title: &str, area: Rect) -> bool {
    let message = match (&panel.rows, &panel.error) {
        (_, Some(error)) => Some(Span::styled(format!("Error: {error}"), Color::Red)),
        (None, None) if panel.loading => Some(Span::styled("Loading...", Color::Yellow)),
        (None, None) => Some(Span::styled("No data. Press r to load.", Color::DarkGray)),
        (Some(rows), None) if rows.is_empty() => {
            Some(Span::styled("Nothing to show.", Color::DarkGray))
        }
        (Some(_), None) => None,
    };
    let Some(message) = message else {
        return true;
    };
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    f.render_widget(
        Paragraph::new(Line::from(message))
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
    false
}

fn panel_title<T>(panel: &Panel<T>, title: &str) -> String {
    if panel.loading {
        format!("{title} (refreshing)")
    } else {
        title.to_string()
    }
}

fn render_table(
    f: &mut Frame,
    header: Vec<&'static str>,
    rows: Vec<Row>,
    widths: &[Constraint],
    title: String,
    selected: Option<usize>,
    area: Rect,
) {
    let table = Table::new(rows, widths.to_vec())
        .header(Row::new(header).style(theme::HEADER_STYLE))
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(theme::SELECTED_STYLE);
    let mut state = TableState::default().with_selected(selected);
    f.render_stateful_widget(table, area, &mut state);
}

fn render_lists(f: &mut Frame, app: &App, panel: &Panel<ShoppingList>, title: &str, area: Rect) {
    if !render_placeholder(f, panel, title, area) {
        return;
    }
    let rows = panel
        .rows
        .iter()
        .flatten()
        .enumerate()
        .map(|(idx, list)| {
            Row::new(vec![Cell::from(list.id.clone()), Cell::from(list.name.clone())])
                .style(theme::zebra_row_style(idx))
        })
        .collect();
    render_table(
        f,
        vec!["ID", "Name"],
        rows,
        &[Constraint::Length(8), Constraint::Min(10)],
        panel_title(panel, title),
        Some(app.selected),
        area,
    );
}

fn render_items(f: &mut Frame, app: &App, panel: &Panel<ShoppingItem>, title: &str, area: Rect) {
    if !render_placeholder(f, panel, title, area) {
        return;
    }
    let rows = panel
        .rows
        .iter()
        .flatten()
        .enumerate()
        .map(|(idx, item)| {
            let (icon, color) = if item.completed {
                (icons::DONE, theme::OK)
            } else {
                (icons::PENDING, theme::MUTED)
            };
            Row::new(vec![
                Cell::from(item.id.clone()),
                Cell::from(Span::styled(icon, color)),
                Cell::from(item.description.clone()),
                Cell::from(item.list_id.clone()),
            ])
            .style(theme::zebra_row_style(idx))
        })
        .collect();
    render_table(
        f,
        vec!["ID", "Done", "Description", "List"],
        rows,
        &[
            Constraint::Length(8),
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(6),
        ],
        panel_title(panel, title),
        items_cursor(app),
        area,
    );
}

/// The Local DB shopping tab shows items beside the lists; only the lists
/// table carries the cursor there.
fn items_cursor(app: &App) -> Option<usize> {
    matches!(app.view, ActiveView::Items { .. }).then_some(app.selected)
}

fn render_appointments(
    f: &mut Frame,
    app: &App,
    panel: &Panel<Appointment>,
    title: &str,
    area: Rect,
) {
    if !render_placeholder(f, panel, title, area) {
        return;
    }
    let rows = panel
        .rows
        .iter()
        .flatten()
        .enumerate()
        .map(|(idx, appointment)| {
            Row::new(vec![
                Cell::from(appointment.id.clone()),
                Cell::from(appointment.patient.clone()),
                Cell::from(appointment.reason.clone()),
                Cell::from(appointment.date.clone()),
            ])
            .style(theme::zebra_row_style(idx))
        })
        .collect();
    render_table(
        f,
        vec!["ID", "Patient", "Reason", "Date"],
        rows,
        &[
            Constraint::Length(8),
            Constraint::Percentage(30),
            Constraint::Min(10),
            Constraint::Length(20),
        ],
        panel_title(panel, title),
        Some(app.selected),
        area,
    );
}

fn render_mirror(f: &mut Frame, app: &App, tab: MirrorTab, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let selected = match tab {
        MirrorTab::Shopping => 0,
        MirrorTab::Hospital => 1,
    };
    let tabs = Tabs::new(vec![MirrorTab::Shopping.title(), MirrorTab::Hospital.title()])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(app.mirror_title(), theme::HEADER_STYLE)),
        )
        .select(selected)
        .style(Style::default().fg(theme::MUTED))
        .highlight_style(Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, layout[0]);

    match tab {
        MirrorTab::Shopping => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(layout[1]);
            render_lists(f, app, &app.mirror.lists, "Lists (Tab: switch)", halves[0]);
            render_items(f, app, &app.mirror.items, "Items", halves[1]);
        }
        MirrorTab::Hospital => {
            render_appointments(
                f,
                app,
                &app.mirror.appointments,
                "Appointments (Tab: switch)",
                layout[1],
            );
        }
    }
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let synced = match app.footer {
        SyncFooter::Starting => None,
        SyncFooter::Synced(_) => Some(true),
        SyncFooter::Reconnecting => Some(false),
    };
    let footer = Paragraph::new(Line::from(format!(" {}", app.footer.text())))
        .style(theme::footer_style(synced));
    f.render_widget(footer, area);
}
