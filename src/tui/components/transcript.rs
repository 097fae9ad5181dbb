//! # TranscriptView Component
//!
//! Scrollable conversation view. Projects the transcript store into rows,
//! appends live typing indicators, and renders everything into a
//! `ScrollView` that sticks to the bottom until the user scrolls away.
//!
//! `TranscriptView` is transient (created each frame); `TranscriptState`
//! persists in `TuiState` and owns scroll position and selection.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::config::Theme;
use crate::core::transcript::{Row, Transcript};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::turn::{Turn, TurnView};
use crate::tui::event::TuiEvent;

/// Scroll and selection state, persisted across frames.
pub struct TranscriptState {
    pub scroll_state: ScrollViewState,
    /// Auto-follow new content until the user scrolls up.
    pub stick_to_bottom: bool,
    /// Selected message index (into `Transcript::messages`) in cursor mode.
    pub selected: Option<usize>,
    /// Row heights from the last render, for selection scrolling.
    row_heights: Vec<u16>,
    /// Message index each row belongs to (None for separators/typing rows).
    row_messages: Vec<Option<usize>>,
    viewport_height: u16,
}

impl Default for TranscriptState {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            stick_to_bottom: true,
            selected: None,
            row_heights: Vec::new(),
            row_messages: Vec::new(),
            viewport_height: 0,
        }
    }

    fn total_height(&self) -> u16 {
        self.row_heights.iter().sum()
    }

    /// Re-engage auto-follow when a scroll-down lands at the bottom.
    fn repin_if_at_bottom(&mut self) {
        let max_y = self.total_height().saturating_sub(self.viewport_height);
        if self.scroll_state.offset().y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position { x: 0, y: max_y });
        }
    }

    /// Move the selection to the previous user-authored message.
    pub fn select_previous(&mut self, transcript: &Transcript) {
        let count = transcript.len();
        if count == 0 {
            return;
        }
        let next = match self.selected {
            None => count - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.selected = Some(next);
        self.scroll_to_selected();
    }

    /// Move the selection to the next message, if any.
    pub fn select_next(&mut self, transcript: &Transcript) {
        if let Some(i) = self.selected
            && i + 1 < transcript.len()
        {
            self.selected = Some(i + 1);
            self.scroll_to_selected();
        }
    }

    /// Scroll so the selected message's rows are visible.
    fn scroll_to_selected(&mut self) {
        let Some(selected) = self.selected else { return };
        let mut y: u16 = 0;
        let mut top: Option<u16> = None;
        let mut bottom: u16 = 0;
        for (height, message) in self.row_heights.iter().zip(&self.row_messages) {
            if *message == Some(selected) {
                top.get_or_insert(y);
                bottom = y + height;
            }
            y += height;
        }
        let Some(top) = top else { return };

        let offset = self.scroll_state.offset().y;
        if top < offset {
            self.scroll_state.set_offset(Position { x: 0, y: top });
            self.stick_to_bottom = false;
        } else if bottom > offset + self.viewport_height {
            let y = bottom.saturating_sub(self.viewport_height);
            self.scroll_state.set_offset(Position { x: 0, y });
            let max_y = self.total_height().saturating_sub(self.viewport_height);
            self.stick_to_bottom = y >= max_y;
        }
    }
}

impl EventHandler for TranscriptState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollToBottom => {
                self.stick_to_bottom = true;
            }
            _ => {}
        }
        None
    }
}

/// The per-frame view over the transcript.
pub struct TranscriptView<'a> {
    pub state: &'a mut TranscriptState,
    pub transcript: &'a Transcript,
    pub show_user_typing: bool,
    pub show_ai_typing: bool,
    pub theme: Theme,
}

impl<'a> TranscriptView<'a> {
    /// The projected rows plus any live typing indicators at the bottom.
    fn rows(&self) -> Vec<Turn<'a>> {
        let mut turns: Vec<Turn<'a>> = self
            .transcript
            .rows()
            .into_iter()
            .map(|row| match row {
                Row::DaySeparator(label) => Turn::DaySeparator(label),
                Row::UserTurn(msg) => Turn::User(msg),
                Row::AiTurn(msg) => Turn::Ai(msg),
            })
            .collect();
        if self.show_user_typing {
            turns.push(Turn::UserTyping);
        }
        if self.show_ai_typing {
            turns.push(Turn::AiTyping);
        }
        turns
    }
}

impl<'a> Component for TranscriptView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // scrollbar column

        let turns = self.rows();

        // Heights recomputed each frame: the reveal animation changes AI turn
        // heights constantly, so caching buys nothing here
        self.state.row_heights = turns
            .iter()
            .map(|t| t.calculate_height(content_width))
            .collect();
        self.state.row_messages = turns
            .iter()
            .map(|t| match t {
                Turn::User(m) | Turn::Ai(m) => self
                    .transcript
                    .messages()
                    .iter()
                    .position(|other| other.id == m.id),
                _ => None,
            })
            .collect();
        self.state.viewport_height = area.height;

        let total_height = self.state.total_height();
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height.max(1)))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y: u16 = 0;
        for (i, turn) in turns.iter().enumerate() {
            let height = self.state.row_heights[i];
            let selected =
                self.state.selected.is_some() && self.state.row_messages[i] == self.state.selected;
            let rect = Rect::new(0, y, content_width, height);
            scroll_view.render_widget(
                TurnView {
                    turn: turn.clone(),
                    is_selected: selected,
                    theme: self.theme,
                },
                rect,
            );
            y += height;
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}
