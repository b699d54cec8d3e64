use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::tui::theme;

pub fn render(frame: &mut Frame, area: Rect, message: Option<&str>) {
    let hints = [
        ("[p]", " play  "),
        ("[s]", " stop  "),
        ("[r]", " refresh  "),
        ("[Esc]", " quit"),
    ];

    let mut spans = Vec::new();
    if let Some(msg) = message {
        spans.push(Span::styled(msg, theme::live()));
        spans.push(Span::styled("   ", theme::muted()));
    }
    for (key, label) in &hints {
        spans.push(Span::styled(*key, theme::accent()));
        spans.push(Span::styled(*label, theme::muted()));
    }

    let line = Line::from(spans);
    let paragraph = Paragraph::new(line).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
