//! Dusk palette for the dashboard. Styles are named for what they mark.

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders},
};

const NIGHT: Color = Color::Rgb(16, 20, 30);
const PANEL: Color = Color::Rgb(24, 30, 44);
const RULE: Color = Color::Rgb(52, 62, 86);
const INK: Color = Color::Rgb(222, 226, 236);
const MUTED: Color = Color::Rgb(120, 130, 156);
/// Titles and the upcoming prayer.
pub const ACCENT: Color = Color::Rgb(214, 176, 92);
/// Anything happening now: playback, the countdown, status messages.
const LIVE: Color = Color::Rgb(230, 142, 76);
const OK: Color = Color::Rgb(104, 170, 140);
const ALERT: Color = Color::Rgb(206, 96, 96);

pub fn screen() -> Style {
    Style::default().fg(INK).bg(NIGHT)
}

pub fn muted() -> Style {
    Style::default().fg(MUTED)
}

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn highlight() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn live() -> Style {
    Style::default().fg(LIVE)
}

pub fn ok() -> Style {
    Style::default().fg(OK)
}

pub fn alert() -> Style {
    Style::default().fg(ALERT)
}

pub fn label() -> Style {
    Style::default().fg(INK).add_modifier(Modifier::BOLD)
}

/// Rounded, titled panel. An `active` panel has a lit border.
pub fn panel(title: &str, active: bool) -> Block<'_> {
    Block::default()
        .title(Span::styled(format!(" {} ", title), accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if active { live() } else { Style::default().fg(RULE) })
        .style(Style::default().fg(INK).bg(PANEL))
}
