use chrono::Local;
use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::tui::theme;

pub fn render(frame: &mut Frame, area: Rect, location: &str, method: &str) {
    let today = Local::now();
    let gregorian_str = today.format("%A, %b %d, %Y").to_string();

    let title_line = Line::from(vec![
        Span::styled("  مِيقَات  ", theme::highlight()),
        Span::styled("miqat", theme::accent()),
    ]);

    let date_line = Line::from(vec![
        Span::styled(location, theme::live()),
        Span::styled("  ·  ", theme::muted()),
        Span::styled(&gregorian_str, theme::muted()),
        Span::styled("  ·  ", theme::muted()),
        Span::styled(method, theme::muted()),
    ]);

    let text = vec![title_line, Line::from(""), date_line];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::highlight())
        .style(theme::screen());

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
