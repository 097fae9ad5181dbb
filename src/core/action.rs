//! # Actions and the Reducer
//!
//! Every state change flows through [`update`]: the TUI event loop and every
//! background task (submission, reveal, relay, pollers) send [`Action`]s over
//! a channel, and the loop applies them here. `update` mutates [`App`] and
//! returns [`Effect`]s for the loop to execute, so the state transition logic
//! stays synchronous and testable while all I/O happens outside.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use log::warn;

use crate::backend::types::{AchievementRecord, MessageRecord, PreferenceRecord};
use crate::core::state::{App, ProgressState, Severity, USER_TYPING_TIMEOUT_MS};
use crate::core::transcript::{parse_timestamp, Attachment, MessageId};
use crate::relay::ExchangeEvent;

/// Everything that can happen. Background tasks produce these; only the
/// event loop consumes them.
#[derive(Debug)]
pub enum Action {
    /// The composer submitted a message (Enter), optionally with a file.
    Submit {
        text: String,
        attachment: Option<PathBuf>,
    },
    /// A quick-reply chip was chosen by index.
    QuickReply(usize),
    /// A keystroke landed in the composer.
    InputActivity,
    /// Periodic housekeeping from the event loop.
    Tick(Instant),
    /// One step of a submission's progress bar.
    ProgressTick { submission: u64 },
    ChatSucceeded {
        submission: u64,
        message_id: MessageId,
        reply: String,
        quick_replies: Vec<String>,
    },
    ChatFailed {
        submission: u64,
        error: String,
    },
    /// The typewriter task advanced to `chars` visible characters.
    RevealStep { id: MessageId, chars: usize },
    RevealDone(MessageId),
    HistoryLoaded(Vec<MessageRecord>),
    HistoryFailed(String),
    PreferencesLoaded(PreferenceRecord),
    BeginEdit(MessageId),
    CancelEdit,
    SaveEdit { id: MessageId, text: String },
    EditSucceeded { id: MessageId, text: String },
    EditFailed { id: MessageId, error: String },
    RequestDelete(MessageId),
    ConfirmDelete,
    AbortDelete,
    DeleteSucceeded(MessageId),
    DeleteFailed { id: MessageId, error: String },
    /// A completed exchange arrived on the real-time channel.
    RelayExchange(ExchangeEvent),
    AchievementsLoaded(Vec<AchievementRecord>),
    /// A toast from anywhere (pollers, relay status, ...).
    Notify { text: String, severity: Severity },
    ToggleTheme,
    Quit,
}

/// Side effects the event loop executes after a state transition. The
/// reducer never performs I/O itself.
#[derive(Debug)]
pub enum Effect {
    /// POST the message to the backend in a background task.
    SpawnSubmit {
        submission: u64,
        message_id: MessageId,
        text: String,
        attachment: Option<PathBuf>,
    },
    /// Start the progress ticker for a submission.
    StartProgress { submission: u64 },
    /// Start (or restart) the typewriter reveal for a reply.
    StartReveal { id: MessageId, text: String },
    /// Broadcast a completed exchange to other sessions.
    PublishExchange(ExchangeEvent),
    SpawnEdit { id: MessageId, text: String },
    SpawnDelete(MessageId),
    /// Re-fetch achievements after a completed exchange.
    CheckAchievements,
    SaveTheme(crate::core::config::Theme),
}

/// Apply one action to the state, returning effects to execute.
pub fn update(app: &mut App, action: Action) -> Vec<Effect> {
    let now = Instant::now();
    match action {
        Action::Submit { text, attachment } => submit(app, text, attachment, now),

        Action::QuickReply(index) => match app.quick_replies.get(index).cloned() {
            Some(text) => submit(app, text, None, now),
            None => Vec::new(),
        },

        Action::InputActivity => {
            app.user_typing_until = Some(now + Duration::from_millis(USER_TYPING_TIMEOUT_MS));
            Vec::new()
        }

        Action::Tick(now) => {
            app.toasts.retain(|t| t.expires_at > now);
            if app.user_typing_until.is_some_and(|until| until <= now) {
                app.user_typing_until = None;
            }
            Vec::new()
        }

        Action::ProgressTick { submission } => {
            if app.in_flight.contains(&submission)
                && let Some(pos) = app.progress.iter().position(|p| p.submission == submission)
            {
                let p = &mut app.progress[pos];
                p.percent = (p.percent + crate::core::state::PROGRESS_STEP).min(100);
                // The bar auto-hides once full, even before the reply lands
                if p.percent >= 100 {
                    app.progress.remove(pos);
                }
            }
            Vec::new()
        }

        Action::ChatSucceeded {
            submission,
            message_id,
            reply,
            quick_replies,
        } => {
            app.finish_submission(submission);
            let Some(msg) = app.transcript.get_mut(message_id) else {
                // Deleted while in flight; nothing to attach the reply to
                return Vec::new();
            };
            msg.ai_text = Some(reply.clone());
            msg.revealed_chars = Some(0);
            let event = ExchangeEvent {
                user_message: msg.user_text.clone(),
                ai_response: reply.clone(),
                timestamp: Local::now().format("%H:%M:%S").to_string(),
                avatar: app.avatar_url.clone(),
            };
            if !quick_replies.is_empty() {
                app.pending_quick_replies.push((message_id, quick_replies));
            }
            vec![
                Effect::PublishExchange(event),
                Effect::StartReveal {
                    id: message_id,
                    text: reply,
                },
                Effect::CheckAchievements,
            ]
        }

        Action::ChatFailed { submission, error } => {
            app.finish_submission(submission);
            app.push_toast(error, Severity::Error, now);
            Vec::new()
        }

        Action::RevealStep { id, chars } => {
            // Steps for a deleted message are silent no-ops
            if let Some(msg) = app.transcript.get_mut(id) {
                msg.revealed_chars = Some(chars);
            }
            Vec::new()
        }

        Action::RevealDone(id) => {
            if let Some(msg) = app.transcript.get_mut(id) {
                msg.revealed_chars = None;
            }
            if let Some(pos) = app.pending_quick_replies.iter().position(|(p, _)| *p == id) {
                app.quick_replies = app.pending_quick_replies.remove(pos).1;
            }
            Vec::new()
        }

        Action::HistoryLoaded(records) => {
            for record in records {
                app.transcript.push_record(record);
            }
            Vec::new()
        }

        Action::HistoryFailed(error) => {
            app.push_toast(format!("Could not load history: {error}"), Severity::Error, now);
            Vec::new()
        }

        Action::PreferencesLoaded(prefs) => {
            app.avatar_url = prefs.avatar;
            Vec::new()
        }

        Action::BeginEdit(id) => {
            if id.server_id().is_none() {
                app.push_toast("Message not yet delivered", Severity::Info, now);
            } else if app.transcript.get(id).is_some() {
                app.editing = Some(id);
            }
            Vec::new()
        }

        Action::CancelEdit => {
            app.editing = None;
            Vec::new()
        }

        // The edit session stays open until the backend confirms, so a
        // failed save leaves the user in the editor to retry
        Action::SaveEdit { id, text } => {
            let text = text.trim().to_string();
            if text.is_empty() {
                app.push_toast("Message cannot be empty", Severity::Error, now);
                return Vec::new();
            }
            if id.server_id().is_none() {
                app.editing = None;
                return Vec::new();
            }
            vec![Effect::SpawnEdit { id, text }]
        }

        Action::EditSucceeded { id, text } => {
            if let Some(msg) = app.transcript.get_mut(id) {
                msg.user_text = text;
                msg.edited = true;
            }
            if app.editing == Some(id) {
                app.editing = None;
            }
            app.push_toast("Message updated", Severity::Success, now);
            Vec::new()
        }

        Action::EditFailed { id, error } => {
            warn!("Edit of {} failed: {}", id, error);
            app.push_toast(error, Severity::Error, now);
            Vec::new()
        }

        Action::RequestDelete(id) => {
            if id.server_id().is_none() {
                app.push_toast("Message not yet delivered", Severity::Info, now);
            } else if app.transcript.get(id).is_some() {
                app.confirm_delete = Some(id);
            }
            Vec::new()
        }

        Action::ConfirmDelete => match app.confirm_delete.take() {
            Some(id) => vec![Effect::SpawnDelete(id)],
            None => Vec::new(),
        },

        Action::AbortDelete => {
            app.confirm_delete = None;
            Vec::new()
        }

        Action::DeleteSucceeded(id) => {
            app.transcript.remove(id);
            app.push_toast("Message deleted", Severity::Success, now);
            Vec::new()
        }

        Action::DeleteFailed { id, error } => {
            warn!("Delete of {} failed: {}", id, error);
            app.push_toast(error, Severity::Error, now);
            Vec::new()
        }

        Action::RelayExchange(event) => {
            app.transcript.push_relayed(
                event.user_message,
                event.ai_response,
                parse_timestamp(&event.timestamp),
                event.avatar,
            );
            Vec::new()
        }

        Action::AchievementsLoaded(records) => {
            let seeded = app.achievements_seeded;
            for record in records {
                if app.seen_achievements.insert(record.name.clone()) && seeded {
                    app.push_toast(
                        format!("Achievement unlocked: {}", record.name),
                        Severity::Achievement,
                        now,
                    );
                }
            }
            app.achievements_seeded = true;
            Vec::new()
        }

        Action::Notify { text, severity } => {
            app.push_toast(text, severity, now);
            Vec::new()
        }

        Action::ToggleTheme => {
            app.theme = app.theme.toggled();
            vec![Effect::SaveTheme(app.theme)]
        }

        Action::Quit => {
            app.should_quit = true;
            Vec::new()
        }
    }
}

/// Shared submit path for composer input and quick replies: optimistic
/// append, clear suggestions, start progress, hand off to a background POST.
fn submit(app: &mut App, text: String, attachment: Option<PathBuf>, now: Instant) -> Vec<Effect> {
    let text = text.trim().to_string();
    if text.is_empty() && attachment.is_none() {
        return Vec::new();
    }

    let stored_attachment = attachment.as_deref().map(|path| Attachment {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string()),
        url: None,
    });

    let message_id =
        app.transcript
            .push_optimistic(text.clone(), stored_attachment, app.avatar_url.clone());
    app.quick_replies.clear();
    app.user_typing_until = None;

    let submission = app.begin_submission();
    app.progress.push(ProgressState {
        submission,
        percent: 0,
    });
    app.push_toast("Message sent", Severity::Success, now);

    vec![
        Effect::SpawnSubmit {
            submission,
            message_id,
            text,
            attachment,
        },
        Effect::StartProgress { submission },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{test_app, Status};
    use crate::core::transcript::Row;

    fn history_record(id: i64, user: &str, ai: &str) -> MessageRecord {
        MessageRecord {
            id,
            user_message: user.to_string(),
            ai_response: ai.to_string(),
            timestamp: "10:00:00".to_string(),
            edited: false,
            file_url: None,
            file_name: None,
            avatar: None,
        }
    }

    /// Submits and returns (submission id, message id) pulled from the
    /// SpawnSubmit effect.
    fn submit_text(app: &mut App, text: &str) -> (u64, MessageId) {
        let effects = update(
            app,
            Action::Submit {
                text: text.to_string(),
                attachment: None,
            },
        );
        effects
            .iter()
            .find_map(|e| match e {
                Effect::SpawnSubmit {
                    submission,
                    message_id,
                    ..
                } => Some((*submission, *message_id)),
                _ => None,
            })
            .expect("submit should spawn a backend call")
    }

    // ========================================================================
    // Submission
    // ========================================================================

    #[test]
    fn submit_renders_exactly_one_optimistic_turn() {
        let mut app = test_app();
        submit_text(&mut app, "hello there");

        assert_eq!(app.transcript.len(), 1);
        let rows = app.transcript.rows();
        let user_turns = rows
            .iter()
            .filter(|r| matches!(r, Row::UserTurn(_)))
            .count();
        let ai_turns = rows.iter().filter(|r| matches!(r, Row::AiTurn(_))).count();
        assert_eq!(user_turns, 1);
        assert_eq!(ai_turns, 0);
        assert_eq!(app.status, Status::Processing);
        assert!(app.ai_typing());
        assert_eq!(app.progress.len(), 1);
    }

    #[test]
    fn attachment_only_submit_is_accepted() {
        let mut app = test_app();
        let effects = update(
            &mut app,
            Action::Submit {
                text: String::new(),
                attachment: Some(PathBuf::from("/tmp/notes.txt")),
            },
        );
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::SpawnSubmit { text, attachment, .. }
                if text.is_empty() && attachment.is_some()
        )));
        let msg = app.transcript.last().unwrap();
        assert_eq!(msg.attachment.as_ref().unwrap().name, "notes.txt");
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut app = test_app();
        let effects = update(
            &mut app,
            Action::Submit {
                text: "   ".to_string(),
                attachment: None,
            },
        );
        assert!(effects.is_empty());
        assert!(app.transcript.is_empty());
        assert_eq!(app.status, Status::Online);
    }

    #[test]
    fn concurrent_submissions_each_track_their_own_progress() {
        let mut app = test_app();
        let (first, _) = submit_text(&mut app, "one");
        let (second, _) = submit_text(&mut app, "two");

        for _ in 0..3 {
            update(&mut app, Action::ProgressTick { submission: first });
        }
        update(&mut app, Action::ProgressTick { submission: second });

        let pct = |s| {
            app.progress
                .iter()
                .find(|p| p.submission == s)
                .unwrap()
                .percent
        };
        assert_eq!(pct(first), 30);
        assert_eq!(pct(second), 10);
    }

    #[test]
    fn progress_hides_itself_once_full() {
        let mut app = test_app();
        let (submission, _) = submit_text(&mut app, "slow");
        for _ in 0..9 {
            update(&mut app, Action::ProgressTick { submission });
        }
        assert_eq!(app.progress[0].percent, 90);

        update(&mut app, Action::ProgressTick { submission });
        assert!(app.progress.is_empty());
        // Late ticks after the bar is gone are no-ops, and the submission
        // itself is still awaiting its reply
        update(&mut app, Action::ProgressTick { submission });
        assert!(app.progress.is_empty());
        assert_eq!(app.status, Status::Processing);
    }

    // ========================================================================
    // Reply arrival and reveal
    // ========================================================================

    #[test]
    fn success_publishes_starts_reveal_and_checks_achievements() {
        let mut app = test_app();
        let (submission, message_id) = submit_text(&mut app, "Hi! ,");

        let effects = update(
            &mut app,
            Action::ChatSucceeded {
                submission,
                message_id,
                reply: "Hello back".to_string(),
                quick_replies: vec!["Tell me more".to_string()],
            },
        );

        assert_eq!(app.status, Status::Online);
        assert!(app.progress.is_empty());
        assert!(effects.iter().any(|e| matches!(e, Effect::PublishExchange(_))));
        assert!(effects.iter().any(
            |e| matches!(e, Effect::StartReveal { id, text } if *id == message_id && text == "Hello back")
        ));
        assert!(effects.iter().any(|e| matches!(e, Effect::CheckAchievements)));

        // Reply attached but nothing revealed yet
        let msg = app.transcript.get(message_id).unwrap();
        assert_eq!(msg.revealed_chars, Some(0));
        assert_eq!(msg.visible_ai_text(), Some(""));

        // Quick replies held back until the reveal completes
        assert!(app.quick_replies.is_empty());
        update(&mut app, Action::RevealStep { id: message_id, chars: 5 });
        assert_eq!(
            app.transcript.get(message_id).unwrap().visible_ai_text(),
            Some("Hello")
        );
        update(&mut app, Action::RevealDone(message_id));
        assert_eq!(app.quick_replies, vec!["Tell me more"]);
        assert!(
            app.transcript
                .get(message_id)
                .unwrap()
                .revealed_chars
                .is_none()
        );
    }

    #[test]
    fn failure_returns_online_and_keeps_the_user_turn() {
        let mut app = test_app();
        let (submission, message_id) = submit_text(&mut app, "hello");

        update(
            &mut app,
            Action::ChatFailed {
                submission,
                error: "backend error (HTTP 500): boom".to_string(),
            },
        );

        assert_eq!(app.status, Status::Online);
        assert!(app.progress.is_empty());
        let msg = app.transcript.get(message_id).unwrap();
        assert_eq!(msg.user_text, "hello");
        assert!(msg.ai_text.is_none());
        assert!(app.toasts.iter().any(|t| t.severity == Severity::Error));
    }

    #[test]
    fn reply_for_a_deleted_message_is_dropped() {
        let mut app = test_app();
        let (submission, message_id) = submit_text(&mut app, "hello");
        app.transcript.remove(message_id);

        let effects = update(
            &mut app,
            Action::ChatSucceeded {
                submission,
                message_id,
                reply: "orphan".to_string(),
                quick_replies: vec![],
            },
        );
        assert!(effects.is_empty());
        assert_eq!(app.status, Status::Online);
    }

    #[test]
    fn reveal_step_for_unknown_message_is_a_no_op() {
        let mut app = test_app();
        update(
            &mut app,
            Action::RevealStep {
                id: MessageId::Local(99),
                chars: 3,
            },
        );
        assert!(app.transcript.is_empty());
    }

    // ========================================================================
    // Quick replies
    // ========================================================================

    #[test]
    fn quick_reply_submits_the_chip_text_and_clears_chips() {
        let mut app = test_app();
        app.quick_replies = vec!["Yes please".to_string(), "No thanks".to_string()];

        let effects = update(&mut app, Action::QuickReply(1));
        assert!(effects.iter().any(
            |e| matches!(e, Effect::SpawnSubmit { text, .. } if text == "No thanks")
        ));
        assert!(app.quick_replies.is_empty());
        assert_eq!(app.transcript.last().unwrap().user_text, "No thanks");
    }

    #[test]
    fn quick_reply_out_of_range_is_ignored() {
        let mut app = test_app();
        app.quick_replies = vec!["only one".to_string()];
        assert!(update(&mut app, Action::QuickReply(5)).is_empty());
        assert!(app.transcript.is_empty());
    }

    // ========================================================================
    // Edit and delete
    // ========================================================================

    #[test]
    fn edit_round_trip_updates_text_and_marks_edited() {
        let mut app = test_app();
        update(
            &mut app,
            Action::HistoryLoaded(vec![history_record(1, "helo", "hi")]),
        );
        let id = MessageId::Server(1);

        update(&mut app, Action::BeginEdit(id));
        assert_eq!(app.editing, Some(id));

        let effects = update(
            &mut app,
            Action::SaveEdit {
                id,
                text: "hello".to_string(),
            },
        );
        // Session stays open until the backend confirms
        assert_eq!(app.editing, Some(id));
        assert!(effects.iter().any(
            |e| matches!(e, Effect::SpawnEdit { id: i, text } if *i == id && text == "hello")
        ));

        update(
            &mut app,
            Action::EditSucceeded {
                id,
                text: "hello".to_string(),
            },
        );
        assert!(app.editing.is_none());
        let msg = app.transcript.get(id).unwrap();
        assert_eq!(msg.user_text, "hello");
        assert!(msg.edited);
    }

    #[test]
    fn failed_or_empty_edit_save_keeps_the_session_open() {
        let mut app = test_app();
        update(
            &mut app,
            Action::HistoryLoaded(vec![history_record(1, "helo", "hi")]),
        );
        let id = MessageId::Server(1);
        update(&mut app, Action::BeginEdit(id));

        // Empty text is rejected before any network call
        assert!(
            update(
                &mut app,
                Action::SaveEdit {
                    id,
                    text: "   ".to_string(),
                },
            )
            .is_empty()
        );
        assert_eq!(app.editing, Some(id));
        assert!(app.toasts.iter().any(|t| t.severity == Severity::Error));

        // A backend failure leaves the editor open to retry
        update(
            &mut app,
            Action::EditFailed {
                id,
                error: "backend error (HTTP 500): boom".to_string(),
            },
        );
        assert_eq!(app.editing, Some(id));
        assert_eq!(app.transcript.get(id).unwrap().user_text, "helo");
    }

    #[test]
    fn local_messages_cannot_be_edited_or_deleted() {
        let mut app = test_app();
        let (_, message_id) = submit_text(&mut app, "unconfirmed");

        update(&mut app, Action::BeginEdit(message_id));
        assert!(app.editing.is_none());

        update(&mut app, Action::RequestDelete(message_id));
        assert!(app.confirm_delete.is_none());
        assert!(app.toasts.iter().any(|t| t.severity == Severity::Info));
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = test_app();
        update(
            &mut app,
            Action::HistoryLoaded(vec![history_record(1, "bye", "farewell")]),
        );
        let id = MessageId::Server(1);

        update(&mut app, Action::RequestDelete(id));
        assert_eq!(app.confirm_delete, Some(id));

        // Aborting leaves the message alone
        update(&mut app, Action::AbortDelete);
        assert!(app.confirm_delete.is_none());
        assert!(update(&mut app, Action::ConfirmDelete).is_empty());

        update(&mut app, Action::RequestDelete(id));
        let effects = update(&mut app, Action::ConfirmDelete);
        assert!(effects.iter().any(|e| matches!(e, Effect::SpawnDelete(i) if *i == id)));

        update(&mut app, Action::DeleteSucceeded(id));
        assert!(app.transcript.is_empty());
    }

    // ========================================================================
    // Relay
    // ========================================================================

    #[test]
    fn own_exchange_echoed_by_the_relay_appears_twice() {
        let mut app = test_app();
        let (submission, message_id) = submit_text(&mut app, "hola");
        let effects = update(
            &mut app,
            Action::ChatSucceeded {
                submission,
                message_id,
                reply: "¡hola!".to_string(),
                quick_replies: vec![],
            },
        );

        // Feed our own published event back, as the broadcast channel does
        let event = effects
            .into_iter()
            .find_map(|e| match e {
                Effect::PublishExchange(ev) => Some(ev),
                _ => None,
            })
            .unwrap();
        update(&mut app, Action::RelayExchange(event));

        let copies = app
            .transcript
            .messages()
            .iter()
            .filter(|m| m.user_text == "hola")
            .count();
        assert_eq!(copies, 2);
    }

    #[test]
    fn relayed_exchange_is_fully_revealed_immediately() {
        let mut app = test_app();
        update(
            &mut app,
            Action::RelayExchange(ExchangeEvent {
                user_message: "from elsewhere".to_string(),
                ai_response: "a reply".to_string(),
                timestamp: "12:00:00".to_string(),
                avatar: None,
            }),
        );
        let msg = app.transcript.last().unwrap();
        assert_eq!(msg.visible_ai_text(), Some("a reply"));
    }

    // ========================================================================
    // Housekeeping
    // ========================================================================

    #[test]
    fn tick_expires_toasts_and_typing_indicator() {
        let mut app = test_app();
        let now = Instant::now();
        app.push_toast("hi", Severity::Info, now);
        update(&mut app, Action::InputActivity);
        assert!(app.user_typing(Instant::now()));

        let later = now + Duration::from_secs(10);
        update(&mut app, Action::Tick(later));
        assert!(app.toasts.is_empty());
        assert!(app.user_typing_until.is_none());
    }

    #[test]
    fn achievements_first_load_is_silent_then_new_ones_toast() {
        let mut app = test_app();
        let first = AchievementRecord {
            name: "First Chat".to_string(),
            description: "Sent your first message".to_string(),
        };
        update(&mut app, Action::AchievementsLoaded(vec![first.clone()]));
        assert!(app.toasts.is_empty());

        let second = AchievementRecord {
            name: "Chatterbox".to_string(),
            description: "Sent 100 messages".to_string(),
        };
        update(
            &mut app,
            Action::AchievementsLoaded(vec![first, second]),
        );
        assert_eq!(app.toasts.len(), 1);
        assert!(app.toasts[0].text.contains("Chatterbox"));
        assert_eq!(app.toasts[0].severity, Severity::Achievement);
    }

    #[test]
    fn toggle_theme_persists() {
        let mut app = test_app();
        let before = app.theme;
        let effects = update(&mut app, Action::ToggleTheme);
        assert_ne!(app.theme, before);
        assert!(effects.iter().any(|e| matches!(e, Effect::SaveTheme(t) if *t == app.theme)));
    }
}
