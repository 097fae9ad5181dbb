//! # Toast overlay
//!
//! Transient notifications stacked in the top-right corner, drawn over the
//! transcript. Expiry is the reducer's job (`Action::Tick`); this component
//! just draws whatever is currently alive.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::core::state::{Severity, Toast};
use crate::tui::component::Component;

const MAX_VISIBLE: usize = 4;
const MAX_WIDTH: u16 = 44;

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
        Severity::Achievement => Color::Magenta,
    }
}

pub struct Toasts<'a> {
    pub toasts: &'a [Toast],
}

impl<'a> Component for Toasts<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let visible = self.toasts.iter().rev().take(MAX_VISIBLE).rev();
        for (i, toast) in visible.enumerate() {
            let y = area.y + i as u16;
            if y >= area.y + area.height {
                break;
            }
            let width = (toast.text.width() as u16 + 2).min(MAX_WIDTH).min(area.width);
            let x = area.x + area.width - width;
            let rect = Rect::new(x, y, width, 1);
            let line = Line::from(Span::styled(
                format!(" {} ", toast.text),
                Style::default()
                    .fg(Color::Black)
                    .bg(severity_color(toast.severity)),
            ))
            .right_aligned();
            frame.render_widget(Paragraph::new(line), rect);
        }
    }
}
