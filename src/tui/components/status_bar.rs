//! # StatusBar Component
//!
//! Single-line bar under the composer: connection status on the left,
//! send progress for every in-flight submission in the middle, quick-reply
//! hints on the right. A pending delete confirmation takes over the whole
//! line until answered.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::core::state::{App, Status};
use crate::tui::component::Component;

const BAR_SEGMENTS: u8 = 10;

pub struct StatusBar<'a> {
    pub app: &'a App,
}

/// Textual progress bar, one segment per ten percent.
fn progress_bar(percent: u8) -> String {
    let filled = (percent / 10).min(BAR_SEGMENTS);
    let mut bar = String::new();
    for i in 0..BAR_SEGMENTS {
        bar.push(if i < filled { '▰' } else { '▱' });
    }
    bar
}

impl<'a> Component for StatusBar<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        if self.app.confirm_delete.is_some() {
            let prompt = Paragraph::new(Line::from(Span::styled(
                "Delete this message? (y/n)",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            frame.render_widget(prompt, area);
            return;
        }

        let mut spans: Vec<Span<'static>> = Vec::new();
        match self.app.status {
            Status::Online => {
                spans.push(Span::styled("● Online", Style::default().fg(Color::Green)));
            }
            Status::Processing => {
                spans.push(Span::styled(
                    "◌ Processing",
                    Style::default().fg(Color::Yellow),
                ));
            }
        }

        for progress in &self.app.progress {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("{} {:>3}%", progress_bar(progress.percent), progress.percent),
                Style::default().fg(Color::Yellow),
            ));
        }

        for (i, reply) in self.app.quick_replies.iter().enumerate() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("M-{}", i + 1),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!(" {reply}"),
                Style::default().fg(Color::Cyan),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
