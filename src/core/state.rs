//! # Application State
//!
//! Single mutable state owned by the event loop. Layout:
//!
//! ```text
//! App
//! ├── transcript          conversation store (source of truth)
//! ├── status              Online | Processing
//! ├── toasts              transient notifications with expiry
//! ├── progress            per-submission send progress bars
//! ├── in_flight           submission ids awaiting a backend reply
//! ├── user_typing_until   local typing indicator deadline
//! ├── quick_replies       suggestion chips for the latest reply
//! ├── pending_quick_replies  chips held back until their reveal finishes
//! ├── seen_achievements   achievements already announced
//! ├── editing             message currently being edited, if any
//! ├── confirm_delete      message awaiting delete confirmation, if any
//! ├── avatar_url          user avatar from preferences
//! ├── theme               Dark | Light
//! └── should_quit         event loop exit flag
//! ```
//!
//! Mutation happens only inside [`update`](super::action::update); the TUI
//! reads this state to draw and never writes it directly.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::core::config::{ResolvedConfig, Theme};
use crate::core::transcript::{MessageId, Transcript};

/// How long a toast stays on screen.
pub const TOAST_TTL_MS: u64 = 3000;
/// How long the "you are typing" indicator lingers after the last keystroke.
pub const USER_TYPING_TIMEOUT_MS: u64 = 2000;
/// Progress bar increment per tick.
pub const PROGRESS_STEP: u8 = 10;
/// Progress bar tick interval.
pub const PROGRESS_TICK_MS: u64 = 200;

/// Connection/activity indicator shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Online,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
    Achievement,
}

/// A transient notification, dropped once `expires_at` passes.
#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

/// Send progress for one in-flight submission. Each submission owns its own
/// bar so concurrent sends never fight over a shared counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub submission: u64,
    pub percent: u8,
}

pub struct App {
    pub transcript: Transcript,
    pub status: Status,
    pub toasts: Vec<Toast>,
    pub progress: Vec<ProgressState>,
    pub in_flight: HashSet<u64>,
    next_submission: u64,
    pub user_typing_until: Option<Instant>,
    pub quick_replies: Vec<String>,
    pub pending_quick_replies: Vec<(MessageId, Vec<String>)>,
    /// Achievement names already shown, so only newly unlocked ones toast.
    pub seen_achievements: HashSet<String>,
    pub achievements_seeded: bool,
    pub editing: Option<MessageId>,
    pub confirm_delete: Option<MessageId>,
    pub avatar_url: Option<String>,
    pub theme: Theme,
    pub should_quit: bool,
}

impl App {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            transcript: Transcript::new(),
            status: Status::Online,
            toasts: Vec::new(),
            progress: Vec::new(),
            in_flight: HashSet::new(),
            next_submission: 0,
            user_typing_until: None,
            quick_replies: Vec::new(),
            pending_quick_replies: Vec::new(),
            seen_achievements: HashSet::new(),
            achievements_seeded: false,
            editing: None,
            confirm_delete: None,
            avatar_url: None,
            theme: config.theme,
            should_quit: false,
        }
    }

    /// Allocate a submission id and mark it in flight. Status flips to
    /// Processing until every in-flight submission settles.
    pub fn begin_submission(&mut self) -> u64 {
        self.next_submission += 1;
        let id = self.next_submission;
        self.in_flight.insert(id);
        self.status = Status::Processing;
        id
    }

    /// Settle a submission: drop its progress bar and, when it was the last
    /// one in flight, return the status to Online.
    pub fn finish_submission(&mut self, submission: u64) {
        self.in_flight.remove(&submission);
        self.progress.retain(|p| p.submission != submission);
        if self.in_flight.is_empty() {
            self.status = Status::Online;
        }
    }

    pub fn push_toast(&mut self, text: impl Into<String>, severity: Severity, now: Instant) {
        self.toasts.push(Toast {
            text: text.into(),
            severity,
            expires_at: now + Duration::from_millis(TOAST_TTL_MS),
        });
    }

    /// Whether the local typing indicator is still live at `now`.
    pub fn user_typing(&self, now: Instant) -> bool {
        self.user_typing_until.is_some_and(|until| until > now)
    }

    /// Whether an AI reply is pending (drives the "AI is typing" row).
    pub fn ai_typing(&self) -> bool {
        !self.in_flight.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_app() -> App {
    App::from_config(&ResolvedConfig::default())
}
