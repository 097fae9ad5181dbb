use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use std::time::Duration;

/// TUI-specific input events, one abstraction above crossterm.
#[derive(Debug, PartialEq)]
pub enum TuiEvent {
    /// Ctrl+C: quit regardless of mode.
    ForceQuit,
    /// Enter.
    Submit,
    Escape,
    InputChar(char),
    /// Bracketed paste, newlines preserved.
    Paste(String),
    Backspace,
    /// Arrow keys: message selection in cursor mode.
    CursorUp,
    CursorDown,
    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    /// End key: jump to the latest message and re-enable follow.
    ScrollToBottom,
    /// Alt+1..Alt+9 picks a quick-reply chip.
    QuickReply(usize),
    /// Ctrl+T flips dark/light.
    ToggleTheme,
    Resize,
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: Duration) -> Option<TuiEvent> {
    if !event::poll(timeout).ok()? {
        return None;
    }
    translate(event::read().ok()?)
}

/// Poll without blocking, for draining a burst of events before redrawing.
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(Duration::ZERO)
}

fn translate(event: Event) -> Option<TuiEvent> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::ForceQuit),
            (KeyModifiers::CONTROL, KeyCode::Char('t')) => Some(TuiEvent::ToggleTheme),
            // Ctrl+J inserts a newline (what Ctrl+Enter sends in most terminals)
            (KeyModifiers::CONTROL, KeyCode::Char('j')) => Some(TuiEvent::InputChar('\n')),
            (KeyModifiers::ALT, KeyCode::Char(c @ '1'..='9')) => {
                Some(TuiEvent::QuickReply(c as usize - '1' as usize))
            }
            (_, KeyCode::Char(c)) => Some(TuiEvent::InputChar(c)),
            (_, KeyCode::Backspace) => Some(TuiEvent::Backspace),
            (_, KeyCode::Enter) => Some(TuiEvent::Submit),
            (_, KeyCode::Esc) => Some(TuiEvent::Escape),
            (_, KeyCode::Up) => Some(TuiEvent::CursorUp),
            (_, KeyCode::Down) => Some(TuiEvent::CursorDown),
            (_, KeyCode::PageUp) => Some(TuiEvent::ScrollPageUp),
            (_, KeyCode::PageDown) => Some(TuiEvent::ScrollPageDown),
            (_, KeyCode::End) => Some(TuiEvent::ScrollToBottom),
            _ => None,
        },
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(TuiEvent::ScrollUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::ScrollDown),
            _ => None,
        },
        Event::Paste(data) => Some(TuiEvent::Paste(data)),
        Event::Resize(_, _) => Some(TuiEvent::Resize),
        _ => None,
    }
}
