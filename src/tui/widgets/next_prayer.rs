use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::prayer_times::CountdownTick;
use crate::tui::theme;
use crate::utils::format::format_remaining;

pub fn render(frame: &mut Frame, area: Rect, tick: Option<&CountdownTick>) {
    let block = theme::panel("Next Prayer", false);

    let content: Vec<Line> = match tick {
        None => vec![
            Line::from(""),
            Line::from(Span::styled("  No data", theme::muted())),
        ],
        Some(tick) => {
            let name = tick.prayer.display_name().to_uppercase();
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("  {}", name),
                    theme::highlight(),
                )),
                Line::from(""),
                Line::from(vec![
                    Span::styled("  in  ", theme::muted()),
                    Span::styled(
                        format_remaining(&tick.remaining),
                        theme::live().add_modifier(Modifier::BOLD),
                    ),
                ]),
            ]
        }
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}
