use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::audio::PlaybackState;
use crate::tui::theme;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    state: PlaybackState,
    enabled: bool,
    notice: Option<&str>,
) {
    let playing = state == PlaybackState::Playing;
    let block = theme::panel("Azan", playing);

    let state_span = match state {
        PlaybackState::Playing => {
            Span::styled("▶ playing", theme::live().add_modifier(Modifier::BOLD))
        }
        PlaybackState::Loading => Span::styled("… loading", theme::accent()),
        PlaybackState::Idle => Span::styled("■ idle", theme::muted()),
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  ", theme::muted()), state_span]),
    ];

    lines.push(if enabled {
        Line::from(Span::styled("  enabled", theme::ok()))
    } else {
        Line::from(Span::styled(
            "  turned off (miqat prefs --azan on)",
            theme::muted(),
        ))
    });

    if let Some(msg) = notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", msg), theme::alert())));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
