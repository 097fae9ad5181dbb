//! # Turn Component
//!
//! Renders one transcript row: a user turn, an AI turn, a day separator,
//! or a typing indicator. Transient, created fresh each frame by the
//! transcript view; selection and theme come in as props.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Padding, Paragraph, Widget, Wrap};

use crate::core::config::Theme;
use crate::core::transcript::Message;
use crate::tui::markdown;

/// Horizontal padding (per side) inside a turn's border.
const CONTENT_PAD_H: u16 = 1;
/// Borders (1 left + 1 right) plus padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Top + bottom border.
const VERTICAL_OVERHEAD: u16 = 2;

const USER_COLOR: Color = Color::Green;
const AI_COLOR: Color = Color::Blue;

#[derive(Clone)]
pub enum Turn<'a> {
    User(&'a Message),
    Ai(&'a Message),
    /// Owned label: separators are derived per frame by the projection.
    DaySeparator(String),
    UserTyping,
    AiTyping,
}

impl<'a> Turn<'a> {
    /// Predict the rendered height without rendering, so the transcript view
    /// can size its scroll canvas. Wrapping options match ratatui's
    /// `Paragraph` so predicted and actual heights agree.
    pub fn calculate_height(&self, width: u16) -> u16 {
        match self {
            Turn::DaySeparator(_) | Turn::UserTyping | Turn::AiTyping => 1,
            Turn::User(msg) => {
                let mut lines = wrapped_line_count(&msg.user_text, width);
                if msg.attachment.is_some() {
                    lines += 1;
                }
                lines + VERTICAL_OVERHEAD
            }
            Turn::Ai(msg) => {
                let visible = msg.visible_ai_text().unwrap_or("");
                // Markdown layout shifts as the reveal runs; measuring the
                // rendered lines keeps the height honest mid-reveal
                let text = markdown::render(visible, AI_COLOR, Theme::Dark);
                let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
                if content_width == 0 {
                    return 1;
                }
                let lines: u16 = text
                    .lines
                    .iter()
                    .map(|line| {
                        let flat: String =
                            line.spans.iter().map(|s| s.content.as_ref()).collect();
                        wrapped_line_count(&flat, width).max(1)
                    })
                    .sum();
                lines.max(1) + VERTICAL_OVERHEAD
            }
        }
    }
}

fn wrapped_line_count(content: &str, width: u16) -> u16 {
    let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
    if content_width == 0 {
        return 1;
    }
    let content = content.trim_end();
    if content.is_empty() {
        return 1;
    }
    let options = textwrap::Options::new(content_width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace);
    textwrap::wrap(content, options).len().max(1) as u16
}

/// Props for rendering a turn.
#[derive(Clone)]
pub struct TurnView<'a> {
    pub turn: Turn<'a>,
    pub is_selected: bool,
    pub theme: Theme,
}

impl<'a> Widget for TurnView<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        match self.turn {
            Turn::DaySeparator(label) => {
                let line = Line::from(Span::styled(
                    format!("── {label} ──"),
                    Style::default().fg(Color::DarkGray),
                ))
                .centered();
                Paragraph::new(line).render(area, buf);
            }
            Turn::UserTyping => {
                typing_line("you are typing", USER_COLOR).render(area, buf);
            }
            Turn::AiTyping => {
                typing_line("ai is typing", AI_COLOR).render(area, buf);
            }
            Turn::User(msg) => {
                let mut title = format!("you · {}", msg.timestamp.format("%H:%M:%S"));
                if msg.edited {
                    title.push_str(" · edited");
                }
                let mut lines = vec![Line::from(Span::styled(
                    msg.user_text.clone(),
                    Style::default().fg(USER_COLOR),
                ))];
                if let Some(attachment) = &msg.attachment {
                    lines.push(Line::from(Span::styled(
                        format!("⎘ {}", attachment.name),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                render_bordered(area, buf, &title, USER_COLOR, lines.into(), self.is_selected);
            }
            Turn::Ai(msg) => {
                let title = format!("ai · {}", msg.timestamp.format("%H:%M:%S"));
                let visible = msg.visible_ai_text().unwrap_or("");
                let text = markdown::render(visible, AI_COLOR, self.theme);
                render_bordered(area, buf, &title, AI_COLOR, text, self.is_selected);
            }
        }
    }
}

fn typing_line(label: &str, color: Color) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        format!("· · · {label}"),
        Style::default().fg(color).add_modifier(Modifier::ITALIC),
    )))
}

fn render_bordered(
    area: Rect,
    buf: &mut ratatui::buffer::Buffer,
    title: &str,
    accent: Color,
    text: ratatui::text::Text<'static>,
    is_selected: bool,
) {
    let border_style = if is_selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(accent).add_modifier(Modifier::DIM)
    };

    let block = Block::bordered()
        .title(title.to_string())
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(border_style)
        .title_style(border_style)
        .padding(Padding::horizontal(CONTENT_PAD_H));

    let inner = block.inner(area);
    block.render(area, buf);

    Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .render(inner, buf);
}
