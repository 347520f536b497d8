use matriz_core::SubsystemState;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED: Color = Color::Rgb(146, 131, 116);
pub const ACCENT: Color = Color::Rgb(131, 165, 152);
pub const OK: Color = Color::Rgb(40, 167, 69);
pub const CRITICAL: Color = Color::Rgb(220, 53, 69);
pub const UNKNOWN: Color = Color::Rgb(108, 117, 125);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub mod icons {
    pub const INDICATOR: &str = "●";
    pub const DONE: &str = "x";
    pub const PENDING: &str = ".";
}

/// Grey until a probe has reported.
pub fn indicator_color(state: Option<SubsystemState>) -> Color {
    match state {
        Some(SubsystemState::Up) => OK,
        Some(SubsystemState::Down) => CRITICAL,
        None => UNKNOWN,
    }
}

pub fn footer_style(synced: Option<bool>) -> Style {
    let bg = match synced {
        Some(true) => OK,
        Some(false) => CRITICAL,
        None => UNKNOWN,
    };
    Style::new().bg(bg).fg(Color::White).add_modifier(Modifier::BOLD)
}
