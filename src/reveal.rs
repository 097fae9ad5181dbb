//! # Typewriter reveal
//!
//! Replies appear one character at a time. A spawned task walks the reply's
//! cadence and sends a `RevealStep` per character, then `RevealDone`; the
//! transcript's reveal cursor is the only state, so aborting the task (new
//! submission, quit) just freezes the text until the reducer finishes it.

use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::core::action::Action;
use crate::core::transcript::MessageId;

/// Pause after most characters.
const CHAR_DELAY: Duration = Duration::from_millis(10);
/// Longer pause after sentence punctuation, for a breathing rhythm.
const PUNCT_DELAY: Duration = Duration::from_millis(50);

fn is_pause_char(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?')
}

/// The reveal schedule for a reply: for each character, the visible prefix
/// length once it appears and the pause that follows it.
pub fn cadence(text: &str) -> Vec<(usize, Duration)> {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let delay = if is_pause_char(c) {
                PUNCT_DELAY
            } else {
                CHAR_DELAY
            };
            (i + 1, delay)
        })
        .collect()
}

/// Start revealing `text` for message `id`. The returned handle aborts the
/// pacing task; the reveal cursor stays wherever it was.
pub fn spawn(id: MessageId, text: String, actions: Sender<Action>) -> AbortHandle {
    let task = tokio::spawn(async move {
        for (chars, delay) in cadence(&text) {
            if actions.send(Action::RevealStep { id, chars }).is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
        }
        let _ = actions.send(Action::RevealDone(id));
    });
    task.abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_per_character_with_growing_prefix() {
        let steps = cadence("héllo");
        assert_eq!(steps.len(), 5);
        assert_eq!(steps.first().unwrap().0, 1);
        assert_eq!(steps.last().unwrap().0, 5);
    }

    #[test]
    fn punctuation_pauses_longer() {
        let steps = cadence("Hi! ,");
        // 'H' and 'i' and the space get the short delay
        assert_eq!(steps[0].1, CHAR_DELAY);
        assert_eq!(steps[1].1, CHAR_DELAY);
        assert_eq!(steps[3].1, CHAR_DELAY);
        // '!' and ',' get the long one
        assert_eq!(steps[2].1, PUNCT_DELAY);
        assert_eq!(steps[4].1, PUNCT_DELAY);
        assert!(PUNCT_DELAY > CHAR_DELAY);
    }

    #[test]
    fn empty_reply_has_no_steps() {
        assert!(cadence("").is_empty());
    }
}
