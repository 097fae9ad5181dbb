//! # InputBox Component
//!
//! The composer: a bordered multi-line text field with a character limit,
//! a `/attach <path>` command for file uploads, and a brief border flash
//! when a message is sent. Editing an existing message reuses the same box
//! with a different title.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Maximum message length, matching the backend's input limit.
pub const MAX_INPUT_CHARS: usize = 500;
/// How long the border flashes after a send.
const FLASH_MS: u64 = 300;

const ATTACH_COMMAND: &str = "/attach ";

/// High-level events emitted by the input box.
#[derive(Debug, PartialEq)]
pub enum InputEvent {
    /// Enter on a non-empty buffer.
    Submit {
        text: String,
        attachment: Option<PathBuf>,
    },
    /// An `/attach` command staged a file for the next message.
    AttachmentAdded(String),
    /// An `/attach` command named a file that doesn't exist.
    AttachmentInvalid(String),
    /// Buffer content changed (drives the typing indicator).
    Changed,
}

pub struct InputBox {
    buffer: String,
    /// File staged by `/attach`, consumed by the next submit.
    attachment: Option<PathBuf>,
    flash_until: Option<Instant>,
    /// Props set by the event loop each frame.
    pub editing: bool,
    pub dimmed: bool,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            attachment: None,
            flash_until: None,
            editing: false,
            dimmed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.chars().take(MAX_INPUT_CHARS).collect();
    }

    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    pub fn flash(&mut self) {
        self.flash_until = Some(Instant::now() + Duration::from_millis(FLASH_MS));
    }

    fn push_text(&mut self, text: &str) -> bool {
        let mut changed = false;
        for c in text.chars() {
            if self.buffer.chars().count() >= MAX_INPUT_CHARS {
                break;
            }
            self.buffer.push(c);
            changed = true;
        }
        changed
    }

    fn submit(&mut self) -> Option<InputEvent> {
        let trimmed = self.buffer.trim();
        if trimmed.is_empty() {
            // A staged file goes out on its own; at least one of text and
            // attachment must be present
            if self.attachment.is_some() {
                self.buffer.clear();
                return Some(InputEvent::Submit {
                    text: String::new(),
                    attachment: self.attachment.take(),
                });
            }
            return None;
        }

        if let Some(raw_path) = trimmed.strip_prefix(ATTACH_COMMAND) {
            let path = PathBuf::from(raw_path.trim());
            let display = path.display().to_string();
            self.buffer.clear();
            if path.is_file() {
                self.attachment = Some(path);
                return Some(InputEvent::AttachmentAdded(display));
            }
            return Some(InputEvent::AttachmentInvalid(display));
        }

        let text = std::mem::take(&mut self.buffer);
        Some(InputEvent::Submit {
            text,
            attachment: self.attachment.take(),
        })
    }

    /// Height needed to show the full wrapped buffer, borders included.
    pub fn calculate_height(&self, width: u16) -> u16 {
        let content_width = width.saturating_sub(2);
        if content_width == 0 || self.buffer.is_empty() {
            return 3;
        }
        let options = textwrap::Options::new(content_width as usize)
            .break_words(true)
            .word_separator(textwrap::WordSeparator::AsciiSpace);
        let lines = textwrap::wrap(&self.buffer, options).len().max(1) as u16;
        lines + 2
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<InputEvent> {
        match event {
            TuiEvent::InputChar(c) => {
                let mut tmp = [0u8; 4];
                self.push_text(c.encode_utf8(&mut tmp))
                    .then_some(InputEvent::Changed)
            }
            TuiEvent::Paste(data) => self.push_text(data).then_some(InputEvent::Changed),
            TuiEvent::Backspace => {
                self.buffer.pop().map(|_| InputEvent::Changed)
            }
            TuiEvent::Submit => self.submit(),
            _ => None,
        }
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let title = if self.editing {
            "Edit message · Enter to save · Esc to cancel".to_string()
        } else if let Some(path) = &self.attachment {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("Message · ⎘ {name}")
        } else {
            "Message".to_string()
        };

        let flashing = self.flash_until.is_some_and(|until| until > Instant::now());
        let border_style = if flashing {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if self.dimmed {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };

        let count = format!("{}/{MAX_INPUT_CHARS}", self.buffer.chars().count());
        let count_style = if self.buffer.chars().count() >= MAX_INPUT_CHARS {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::bordered()
            .title(title)
            .title_bottom(Line::styled(count, count_style).right_aligned())
            .border_style(border_style);
        let inner = block.inner(area);

        let paragraph = Paragraph::new(self.buffer.as_str())
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        // Cursor sits after the last character of the wrapped buffer
        if !self.dimmed && inner.width > 0 {
            let options = textwrap::Options::new(inner.width as usize)
                .break_words(true)
                .word_separator(textwrap::WordSeparator::AsciiSpace);
            let wrapped = textwrap::wrap(&self.buffer, options);
            let (row, col) = match wrapped.last() {
                Some(last) if !self.buffer.ends_with(' ') => {
                    (wrapped.len() as u16 - 1, last.chars().count() as u16)
                }
                Some(_) => (wrapped.len() as u16 - 1, 0),
                None => (0, 0),
            };
            let y = inner.y + row.min(inner.height.saturating_sub(1));
            let x = inner.x + col.min(inner.width.saturating_sub(1));
            frame.set_cursor_position((x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(input: &mut InputBox, text: &str) {
        for c in text.chars() {
            input.handle_event(&TuiEvent::InputChar(c));
        }
    }

    #[test]
    fn typing_and_submitting_round_trips() {
        let mut input = InputBox::new();
        type_str(&mut input, "hello");
        let event = input.handle_event(&TuiEvent::Submit).unwrap();
        assert_eq!(
            event,
            InputEvent::Submit {
                text: "hello".to_string(),
                attachment: None
            }
        );
        assert!(input.is_empty());
    }

    #[test]
    fn empty_submit_emits_nothing() {
        let mut input = InputBox::new();
        assert!(input.handle_event(&TuiEvent::Submit).is_none());
        type_str(&mut input, "   ");
        assert!(input.handle_event(&TuiEvent::Submit).is_none());
    }

    #[test]
    fn input_is_capped_at_the_character_limit() {
        let mut input = InputBox::new();
        let long: String = "x".repeat(MAX_INPUT_CHARS + 50);
        input.handle_event(&TuiEvent::Paste(long));
        assert_eq!(input.buffer.chars().count(), MAX_INPUT_CHARS);
        // Further keystrokes are swallowed without a Changed event
        assert!(input.handle_event(&TuiEvent::InputChar('y')).is_none());
    }

    #[test]
    fn attach_command_with_missing_file_reports_invalid() {
        let mut input = InputBox::new();
        type_str(&mut input, "/attach /no/such/file.txt");
        let event = input.handle_event(&TuiEvent::Submit).unwrap();
        assert!(matches!(event, InputEvent::AttachmentInvalid(p) if p.contains("file.txt")));
        assert!(input.is_empty());
        assert!(input.attachment.is_none());
    }

    #[test]
    fn staged_attachment_rides_along_with_the_next_submit() {
        let mut input = InputBox::new();
        input.attachment = Some(PathBuf::from("/tmp/notes.txt"));
        type_str(&mut input, "see attached");
        let event = input.handle_event(&TuiEvent::Submit).unwrap();
        match event {
            InputEvent::Submit { text, attachment } => {
                assert_eq!(text, "see attached");
                assert_eq!(attachment, Some(PathBuf::from("/tmp/notes.txt")));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(input.attachment.is_none());
    }

    #[test]
    fn staged_attachment_submits_without_text() {
        let mut input = InputBox::new();
        input.attachment = Some(PathBuf::from("/tmp/notes.txt"));
        let event = input.handle_event(&TuiEvent::Submit).unwrap();
        assert_eq!(
            event,
            InputEvent::Submit {
                text: String::new(),
                attachment: Some(PathBuf::from("/tmp/notes.txt")),
            }
        );
        assert!(input.attachment.is_none());
        // With neither text nor file there is still nothing to send
        assert!(input.handle_event(&TuiEvent::Submit).is_none());
    }

    #[test]
    fn backspace_removes_the_last_character() {
        let mut input = InputBox::new();
        type_str(&mut input, "héllo");
        input.handle_event(&TuiEvent::Backspace);
        assert_eq!(input.buffer, "héll");
        // Backspace on empty emits nothing
        input.buffer.clear();
        assert!(input.handle_event(&TuiEvent::Backspace).is_none());
    }

    #[test]
    fn height_grows_with_wrapped_content() {
        let mut input = InputBox::new();
        assert_eq!(input.calculate_height(20), 3);
        type_str(&mut input, "a sentence long enough to wrap a few times");
        assert!(input.calculate_height(20) > 3);
    }
}
