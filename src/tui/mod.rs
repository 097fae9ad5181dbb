//! # TUI Adapter
//!
//! The ratatui-specific layer: terminal I/O, rendering, and translation of
//! keyboard events into `core::Action` values. This is the only module that
//! knows about ratatui and crossterm; the core never touches the terminal.
//!
//! ## Redraw Strategy
//!
//! The event loop redraws conditionally. While something animates (a reveal
//! in progress, a live progress bar, toasts) it polls on a short timeout and
//! redraws each pass; idle, it sleeps up to 250ms and redraws only on input
//! or background actions.
//!
//! ## Input Modes
//!
//! - **Input**: keystrokes go to the composer. Esc switches to Cursor.
//! - **Cursor**: Up/Down select past messages, `e` edits, `d` deletes,
//!   `q` quits. Typing switches back to Input and forwards the key.

mod component;
mod components;
mod event;
pub mod markdown;

use std::collections::HashMap;
use std::io::stdout;
use std::iter;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use log::info;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use tokio::task::AbortHandle;

use crate::backend::BackendClient;
use crate::core::action::{Action, Effect, update};
use crate::core::config::{self, ResolvedConfig};
use crate::core::state::{App, Severity};
use crate::core::transcript::MessageId;
use crate::pollers;
use crate::relay::RelayClient;
use crate::reveal;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::{InputBox, InputEvent, StatusBar, Toasts, TranscriptState, TranscriptView};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Navigate messages with arrow keys. Typing auto-switches to Input.
    Cursor,
    /// Text editing in the composer. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state, separate from core business state.
pub struct TuiState {
    pub transcript: TranscriptState,
    pub input_box: InputBox,
    pub input_mode: InputMode,
    /// Draft stashed while editing an existing message.
    edit_stash: Option<String>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            transcript: TranscriptState::new(),
            input_box: InputBox::new(),
            // User expects to type immediately
            input_mode: InputMode::Input,
            edit_stash: None,
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Abort handles for running typewriter reveals, one per message. Restarting
/// a reveal aborts the previous task; a finished reveal is forgotten so the
/// map doesn't grow with the transcript.
struct RevealTasks {
    handles: HashMap<MessageId, AbortHandle>,
}

impl RevealTasks {
    fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    fn start(&mut self, id: MessageId, handle: AbortHandle) {
        if let Some(previous) = self.handles.insert(id, handle) {
            previous.abort();
        }
    }

    fn finish(&mut self, id: MessageId) {
        self.handles.remove(&id);
    }

    fn abort_all(self) {
        for handle in self.handles.into_values() {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.handles.len()
    }
}

/// Run the periodic `Tick` and report whether it removed anything that is
/// currently on screen, so the loop repaints one more time after the last
/// toast or typing row expires.
fn tick_housekeeping(app: &mut App) -> bool {
    let toasts = app.toasts.len();
    let typing = app.user_typing_until.is_some();
    update(app, Action::Tick(Instant::now()));
    toasts != app.toasts.len() || typing != app.user_typing_until.is_some()
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            // Non-blinking: continuous redraws reset the blink timer anyway
            SetCursorStyle::SteadyBlock,
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let client = BackendClient::new(config.backend_url.clone());
    let mut app = App::from_config(&config);
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();

    let relay = RelayClient::spawn(config.relay_url.clone(), tx.clone());
    pollers::fetch_history(client.clone(), tx.clone());
    pollers::fetch_preferences(client.clone(), tx.clone());
    pollers::check_achievements(client.clone(), tx.clone());
    pollers::spawn_task_poller(client.clone(), tx.clone());

    let mut reveal_tasks = RevealTasks::new();
    let mut needs_redraw = true; // Force first frame

    loop {
        tui.input_box.editing = app.editing.is_some();
        tui.input_box.dimmed = matches!(tui.input_mode, InputMode::Cursor);

        let now = Instant::now();
        let animating = app.ai_typing()
            || !app.toasts.is_empty()
            || app.user_typing(now)
            || app
                .transcript
                .messages()
                .iter()
                .any(|m| m.revealed_chars.is_some());
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| draw(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        let timeout = if animating {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(250)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        for event in first_event
            .into_iter()
            .chain(iter::from_fn(poll_event_immediate))
        {
            if matches!(event, TuiEvent::Resize) {
                continue;
            }

            if matches!(event, TuiEvent::ForceQuit) {
                update(&mut app, Action::Quit);
                continue;
            }

            if matches!(event, TuiEvent::ToggleTheme) {
                let effects = update(&mut app, Action::ToggleTheme);
                run_effects(effects, &client, &relay, &tx, &mut reveal_tasks);
                continue;
            }

            if let TuiEvent::QuickReply(index) = event {
                let effects = update(&mut app, Action::QuickReply(index));
                run_effects(effects, &client, &relay, &tx, &mut reveal_tasks);
                continue;
            }

            // Mouse wheel and paging always go to the transcript
            if matches!(
                event,
                TuiEvent::ScrollUp
                    | TuiEvent::ScrollDown
                    | TuiEvent::ScrollPageUp
                    | TuiEvent::ScrollPageDown
                    | TuiEvent::ScrollToBottom
            ) {
                tui.transcript.handle_event(&event);
                continue;
            }

            match tui.input_mode {
                InputMode::Input => handle_input_mode(
                    event,
                    &mut app,
                    &mut tui,
                    &client,
                    &relay,
                    &tx,
                    &mut reveal_tasks,
                ),
                InputMode::Cursor => handle_cursor_mode(
                    event,
                    &mut app,
                    &mut tui,
                    &client,
                    &relay,
                    &tx,
                    &mut reveal_tasks,
                ),
            }
        }

        // Housekeeping: toast expiry and the typing indicator timeout. An
        // expired item must repaint once more or it stays on screen
        if tick_housekeeping(&mut app) {
            needs_redraw = true;
        }

        // Actions from background tasks (submissions, reveals, relay, pollers)
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            if let Action::RevealDone(id) = &action {
                reveal_tasks.finish(*id);
            }
            let effects = update(&mut app, action);
            run_effects(effects, &client, &relay, &tx, &mut reveal_tasks);
        }

        // Edit session over (saved or cancelled): bring the stashed draft back
        if app.editing.is_none()
            && let Some(draft) = tui.edit_stash.take()
        {
            tui.input_box.set_text(&draft);
        }

        if app.should_quit {
            break;
        }
    }

    reveal_tasks.abort_all();
    ratatui::restore();
    Ok(())
}

fn handle_input_mode(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    client: &BackendClient,
    relay: &RelayClient,
    tx: &mpsc::Sender<Action>,
    reveal_tasks: &mut RevealTasks,
) {
    match event {
        TuiEvent::Escape => {
            if app.editing.is_some() {
                // The stashed draft comes back via the loop's session check
                update(app, Action::CancelEdit);
            } else {
                tui.input_mode = InputMode::Cursor;
                tui.transcript.select_previous(&app.transcript);
            }
        }
        // Arrow keys scroll the view while composing
        TuiEvent::CursorUp => {
            tui.transcript.handle_event(&TuiEvent::ScrollUp);
        }
        TuiEvent::CursorDown => {
            tui.transcript.handle_event(&TuiEvent::ScrollDown);
        }
        other => {
            let Some(input_event) = tui.input_box.handle_event(&other) else {
                return;
            };
            match input_event {
                InputEvent::Submit { text, attachment } => {
                    let action = match app.editing {
                        Some(id) => {
                            // Keep the text on screen; the session only closes
                            // once the backend accepts the edit
                            tui.input_box.set_text(&text);
                            Action::SaveEdit { id, text }
                        }
                        None => {
                            tui.input_box.flash();
                            Action::Submit { text, attachment }
                        }
                    };
                    let effects = update(app, action);
                    run_effects(effects, client, relay, tx, reveal_tasks);
                }
                InputEvent::AttachmentAdded(path) => {
                    update(
                        app,
                        Action::Notify {
                            text: format!("Attached {path}"),
                            severity: Severity::Info,
                        },
                    );
                }
                InputEvent::AttachmentInvalid(path) => {
                    update(
                        app,
                        Action::Notify {
                            text: format!("No such file: {path}"),
                            severity: Severity::Error,
                        },
                    );
                }
                InputEvent::Changed => {
                    update(app, Action::InputActivity);
                }
            }
        }
    }
}

fn handle_cursor_mode(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    client: &BackendClient,
    relay: &RelayClient,
    tx: &mpsc::Sender<Action>,
    reveal_tasks: &mut RevealTasks,
) {
    let selected_id = tui
        .transcript
        .selected
        .and_then(|i| app.transcript.messages().get(i))
        .map(|m| m.id);

    // A pending delete prompt captures y/n before anything else
    if app.confirm_delete.is_some() {
        match event {
            TuiEvent::InputChar('y') => {
                let effects = update(app, Action::ConfirmDelete);
                run_effects(effects, client, relay, tx, reveal_tasks);
            }
            TuiEvent::InputChar('n') | TuiEvent::Escape => {
                update(app, Action::AbortDelete);
            }
            _ => {}
        }
        return;
    }

    match event {
        TuiEvent::Escape => {
            tui.input_mode = InputMode::Input;
            tui.transcript.selected = None;
        }
        TuiEvent::CursorUp => tui.transcript.select_previous(&app.transcript),
        TuiEvent::CursorDown => tui.transcript.select_next(&app.transcript),
        TuiEvent::InputChar('e') => {
            let Some(id) = selected_id else { return };
            update(app, Action::BeginEdit(id));
            if app.editing == Some(id)
                && let Some(msg) = app.transcript.get(id)
            {
                tui.edit_stash = Some(tui.input_box.take_text());
                tui.input_box.set_text(&msg.user_text);
                tui.input_mode = InputMode::Input;
            }
        }
        TuiEvent::InputChar('d') => {
            let Some(id) = selected_id else { return };
            update(app, Action::RequestDelete(id));
        }
        TuiEvent::InputChar('q') => {
            update(app, Action::Quit);
        }
        // Typing switches back to the composer and forwards the key
        TuiEvent::InputChar(_) | TuiEvent::Paste(_) => {
            tui.input_mode = InputMode::Input;
            tui.transcript.selected = None;
            if tui.input_box.handle_event(&event).is_some() {
                update(app, Action::InputActivity);
            }
        }
        TuiEvent::Submit => {
            tui.input_mode = InputMode::Input;
            tui.transcript.selected = None;
        }
        _ => {}
    }
}

fn run_effects(
    effects: Vec<Effect>,
    client: &BackendClient,
    relay: &RelayClient,
    tx: &mpsc::Sender<Action>,
    reveal_tasks: &mut RevealTasks,
) {
    for effect in effects {
        match effect {
            Effect::SpawnSubmit {
                submission,
                message_id,
                text,
                attachment,
            } => spawn_submit(client.clone(), tx.clone(), submission, message_id, text, attachment),
            Effect::StartProgress { submission } => spawn_progress_ticker(tx.clone(), submission),
            Effect::StartReveal { id, text } => {
                reveal_tasks.start(id, reveal::spawn(id, text, tx.clone()));
            }
            Effect::PublishExchange(event) => relay.publish(event),
            Effect::SpawnEdit { id, text } => spawn_edit(client.clone(), tx.clone(), id, text),
            Effect::SpawnDelete(id) => spawn_delete(client.clone(), tx.clone(), id),
            Effect::CheckAchievements => pollers::check_achievements(client.clone(), tx.clone()),
            Effect::SaveTheme(theme) => config::save_theme(theme),
        }
    }
}

fn draw(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};

    let input_height = tui.input_box.calculate_height(frame.area().width).min(8);
    let layout = Layout::vertical([Min(1), Length(input_height), Length(1)]);
    let [transcript_area, input_area, status_area] = layout.areas(frame.area());

    let mut view = TranscriptView {
        state: &mut tui.transcript,
        transcript: &app.transcript,
        show_user_typing: app.user_typing(Instant::now()),
        show_ai_typing: app.ai_typing(),
        theme: app.theme,
    };
    view.render(frame, transcript_area);

    tui.input_box.render(frame, input_area);

    let mut status_bar = StatusBar { app };
    status_bar.render(frame, status_area);

    let mut toasts = Toasts { toasts: &app.toasts };
    toasts.render(frame, transcript_area);
}

fn spawn_submit(
    client: BackendClient,
    tx: mpsc::Sender<Action>,
    submission: u64,
    message_id: MessageId,
    text: String,
    attachment: Option<PathBuf>,
) {
    info!("Spawning chat submission {} ({})", submission, message_id);
    tokio::spawn(async move {
        let action = match client.chat(&text, attachment.as_deref()).await {
            Ok(reply) => Action::ChatSucceeded {
                submission,
                message_id,
                reply: reply.response,
                quick_replies: reply.quick_replies,
            },
            Err(e) => Action::ChatFailed {
                submission,
                error: e.to_string(),
            },
        };
        let _ = tx.send(action);
    });
}

/// Drive one submission's progress bar. The reducer ignores ticks for
/// settled submissions, so a reply landing early is harmless.
fn spawn_progress_ticker(tx: mpsc::Sender<Action>, submission: u64) {
    use crate::core::state::{PROGRESS_STEP, PROGRESS_TICK_MS};
    tokio::spawn(async move {
        for _ in 0..(100 / PROGRESS_STEP) {
            tokio::time::sleep(Duration::from_millis(PROGRESS_TICK_MS)).await;
            if tx.send(Action::ProgressTick { submission }).is_err() {
                return;
            }
        }
    });
}

fn spawn_edit(client: BackendClient, tx: mpsc::Sender<Action>, id: MessageId, text: String) {
    tokio::spawn(async move {
        let Some(server_id) = id.server_id() else { return };
        let action = match client.edit_message(server_id, &text).await {
            Ok(()) => Action::EditSucceeded { id, text },
            Err(e) => Action::EditFailed {
                id,
                error: e.to_string(),
            },
        };
        let _ = tx.send(action);
    });
}

fn spawn_delete(client: BackendClient, tx: mpsc::Sender<Action>, id: MessageId) {
    tokio::spawn(async move {
        let Some(server_id) = id.server_id() else { return };
        let action = match client.delete_message(server_id).await {
            Ok(()) => Action::DeleteSucceeded(id),
            Err(e) => Action::DeleteFailed {
                id,
                error: e.to_string(),
            },
        };
        let _ = tx.send(action);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_app;

    // ========================================================================
    // Housekeeping Redraws
    // ========================================================================

    #[test]
    fn expired_toast_requests_one_more_repaint() {
        let mut app = test_app();
        let long_ago = Instant::now() - Duration::from_secs(10);
        app.push_toast("stale", Severity::Info, long_ago);

        assert!(tick_housekeeping(&mut app));
        assert!(app.toasts.is_empty());
        // Nothing left to expire, nothing to repaint
        assert!(!tick_housekeeping(&mut app));
    }

    #[test]
    fn expired_typing_indicator_requests_one_more_repaint() {
        let mut app = test_app();
        app.user_typing_until = Some(Instant::now() - Duration::from_millis(1));

        assert!(tick_housekeeping(&mut app));
        assert!(app.user_typing_until.is_none());
    }

    #[test]
    fn live_items_do_not_force_a_repaint() {
        let mut app = test_app();
        app.push_toast("fresh", Severity::Info, Instant::now());
        app.user_typing_until = Some(Instant::now() + Duration::from_secs(5));

        assert!(!tick_housekeeping(&mut app));
        assert_eq!(app.toasts.len(), 1);
    }

    // ========================================================================
    // Reveal Task Handles
    // ========================================================================

    #[tokio::test]
    async fn restarting_a_reveal_aborts_the_previous_task() {
        let mut tasks = RevealTasks::new();
        let id = MessageId::Local(1);

        let first = tokio::spawn(std::future::pending::<()>());
        tasks.start(id, first.abort_handle());
        tasks.start(id, tokio::spawn(std::future::pending::<()>()).abort_handle());

        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(tasks.len(), 1);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn finished_reveals_are_forgotten() {
        let mut tasks = RevealTasks::new();
        for n in 0..3 {
            let id = MessageId::Local(n);
            tasks.start(id, tokio::spawn(std::future::pending::<()>()).abort_handle());
            tasks.finish(id);
        }
        assert_eq!(tasks.len(), 0);
        tasks.abort_all();
    }
}
