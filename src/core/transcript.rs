//! # Transcript Store
//!
//! The in-memory source of truth for the conversation. Every rendered view
//! (turn rows, edit drafts, relay payloads) is a projection of this store;
//! nothing is ever read back out of rendered output.
//!
//! Messages are keyed by [`MessageId`]: `Server` ids come from the backend
//! (history rows), `Local` ids are optimistic placeholders assigned here for
//! messages the backend has not yet confirmed. Edit and delete only apply to
//! `Server` ids.

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone};

use crate::backend::types::MessageRecord;

/// Identity of one exchange turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Backend-assigned id (from `/history`), eligible for edit/delete.
    Server(i64),
    /// Session-local placeholder for an optimistic or relay-delivered message.
    Local(u64),
}

impl MessageId {
    /// The backend id, if this message has been confirmed.
    pub fn server_id(&self) -> Option<i64> {
        match self {
            MessageId::Server(id) => Some(*id),
            MessageId::Local(_) => None,
        }
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "srv:{id}"),
            MessageId::Local(n) => write!(f, "local:{n}"),
        }
    }
}

/// Where a message entered this session from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Typed into this session's composer.
    Composer,
    /// Loaded from `/history` at startup.
    History,
    /// Delivered by the real-time channel from another session (or our own
    /// echo; the channel broadcasts to all subscribers including the sender).
    Relay,
}

/// A file reference attached to a message. `url` is only populated once the
/// server has acknowledged the upload (history rows); optimistic attachments
/// carry the name alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub url: Option<String>,
}

/// One exchange turn: the user's text and, once available, the AI's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub user_text: String,
    /// Absent until the backend reply arrives.
    pub ai_text: Option<String>,
    pub attachment: Option<Attachment>,
    pub timestamp: DateTime<Local>,
    pub edited: bool,
    pub avatar_url: Option<String>,
    pub origin: Origin,
    /// While the typewriter reveal is running: number of characters of
    /// `ai_text` currently visible. `None` = fully revealed.
    pub revealed_chars: Option<usize>,
}

impl Message {
    /// The currently visible portion of the AI reply: the revealed prefix
    /// during a typewriter run, or the full text afterwards.
    pub fn visible_ai_text(&self) -> Option<&str> {
        let text = self.ai_text.as_deref()?;
        match self.revealed_chars {
            None => Some(text),
            Some(n) => {
                let end = text
                    .char_indices()
                    .nth(n)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                Some(&text[..end])
            }
        }
    }
}

/// One projected transcript row. Separators are derived, not stored: the
/// projection emits exactly one per distinct calendar day, in order.
#[derive(Debug, PartialEq)]
pub enum Row<'a> {
    DaySeparator(String),
    UserTurn(&'a Message),
    AiTurn(&'a Message),
}

/// Append-only ordered store of messages, keyed by id.
#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_local_id: u64,
}

/// Display label for a calendar day separator.
pub fn day_label(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Parse a backend display timestamp. History rows carry `%H:%M:%S` (taken
/// as today); relay events and older backends may carry a full datetime.
/// Unparseable input falls back to now; a display string, not an ordering key.
pub fn parse_timestamp(raw: &str) -> DateTime<Local> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        && let Some(local) = Local.from_local_datetime(&dt).single()
    {
        return local;
    }
    if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
        let today = Local::now().date_naive();
        if let Some(local) = Local.from_local_datetime(&today.and_time(t)).single() {
            return local;
        }
    }
    Local::now()
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn new_local_id(&mut self) -> MessageId {
        self.next_local_id += 1;
        MessageId::Local(self.next_local_id)
    }

    /// Append an optimistic user turn from the composer. The AI side is
    /// filled in later by the reducer when the backend reply arrives.
    pub fn push_optimistic(
        &mut self,
        user_text: String,
        attachment: Option<Attachment>,
        avatar_url: Option<String>,
    ) -> MessageId {
        let id = self.new_local_id();
        self.messages.push(Message {
            id,
            user_text,
            ai_text: None,
            attachment,
            timestamp: Local::now(),
            edited: false,
            avatar_url,
            origin: Origin::Composer,
            revealed_chars: None,
        });
        id
    }

    /// Append a completed exchange delivered by the real-time channel. No
    /// deduplication against the optimistic copy is attempted.
    pub fn push_relayed(
        &mut self,
        user_text: String,
        ai_text: String,
        timestamp: DateTime<Local>,
        avatar_url: Option<String>,
    ) -> MessageId {
        let id = self.new_local_id();
        self.messages.push(Message {
            id,
            user_text,
            ai_text: Some(ai_text),
            attachment: None,
            timestamp,
            edited: false,
            avatar_url,
            origin: Origin::Relay,
            revealed_chars: None,
        });
        id
    }

    /// Append a persisted exchange loaded from `/history`.
    pub fn push_record(&mut self, record: MessageRecord) {
        let attachment = record.file_name.map(|name| Attachment {
            name,
            url: record.file_url,
        });
        self.messages.push(Message {
            id: MessageId::Server(record.id),
            user_text: record.user_message,
            ai_text: Some(record.ai_response),
            attachment,
            timestamp: parse_timestamp(&record.timestamp),
            edited: record.edited,
            avatar_url: record.avatar,
            origin: Origin::History,
            revealed_chars: None,
        });
    }

    /// Remove a message. Returns true if it existed.
    pub fn remove(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Project the store into ordered rows: a separator whenever the calendar
    /// day changes, then a user turn, then (once the reply exists) an AI turn.
    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::with_capacity(self.messages.len() * 2);
        let mut last_day: Option<String> = None;
        for msg in &self.messages {
            let day = day_label(&msg.timestamp);
            if last_day.as_deref() != Some(day.as_str()) {
                rows.push(Row::DaySeparator(day.clone()));
                last_day = Some(day);
            }
            rows.push(Row::UserTurn(msg));
            if msg.ai_text.is_some() {
                rows.push(Row::AiTurn(msg));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: i64, ts: &str) -> MessageRecord {
        MessageRecord {
            id,
            user_message: format!("user {id}"),
            ai_response: format!("ai {id}"),
            timestamp: ts.to_string(),
            edited: false,
            file_url: None,
            file_name: None,
            avatar: None,
        }
    }

    #[test]
    fn optimistic_push_assigns_unique_local_ids() {
        let mut t = Transcript::new();
        let a = t.push_optimistic("one".into(), None, None);
        let b = t.push_optimistic("two".into(), None, None);
        assert_ne!(a, b);
        assert!(matches!(a, MessageId::Local(_)));
        assert!(a.server_id().is_none());
    }

    #[test]
    fn optimistic_message_has_no_ai_turn_row() {
        let mut t = Transcript::new();
        t.push_optimistic("hello".into(), None, None);
        let rows = t.rows();
        // Separator for today + the user turn, nothing else
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], Row::DaySeparator(_)));
        assert!(matches!(rows[1], Row::UserTurn(m) if m.user_text == "hello"));
    }

    #[test]
    fn one_separator_per_distinct_day_in_order() {
        let mut t = Transcript::new();
        t.push_record(record(1, "2024-03-01 09:00:00"));
        t.push_record(record(2, "2024-03-01 17:30:00"));
        t.push_record(record(3, "2024-03-02 08:00:00"));

        let rows = t.rows();
        let separators: Vec<&str> = rows
            .iter()
            .filter_map(|r| match r {
                Row::DaySeparator(label) => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(separators, vec!["2024-03-01", "2024-03-02"]);
    }

    #[test]
    fn history_rows_project_user_and_ai_turns() {
        let mut t = Transcript::new();
        t.push_record(record(1, "2024-03-01 09:00:00"));
        let rows = t.rows();
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[1], Row::UserTurn(m) if m.id == MessageId::Server(1)));
        assert!(matches!(rows[2], Row::AiTurn(m) if m.ai_text.as_deref() == Some("ai 1")));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut t = Transcript::new();
        t.push_record(record(1, "10:00:00"));
        assert!(t.remove(MessageId::Server(1)));
        assert!(!t.remove(MessageId::Server(1)));
        assert!(t.is_empty());
    }

    #[test]
    fn visible_ai_text_respects_reveal_cursor() {
        let mut t = Transcript::new();
        let id = t.push_optimistic("q".into(), None, None);
        let msg = t.get_mut(id).unwrap();
        msg.ai_text = Some("héllo".to_string());
        msg.revealed_chars = Some(2);
        // Prefix counts characters, not bytes (é is two bytes)
        assert_eq!(t.get(id).unwrap().visible_ai_text(), Some("hé"));

        let msg = t.get_mut(id).unwrap();
        msg.revealed_chars = None;
        assert_eq!(t.get(id).unwrap().visible_ai_text(), Some("héllo"));
    }

    #[test]
    fn visible_ai_text_cursor_past_end_is_full_text() {
        let mut t = Transcript::new();
        let id = t.push_optimistic("q".into(), None, None);
        let msg = t.get_mut(id).unwrap();
        msg.ai_text = Some("ok".to_string());
        msg.revealed_chars = Some(10);
        assert_eq!(t.get(id).unwrap().visible_ai_text(), Some("ok"));
    }

    #[test]
    fn parse_timestamp_accepts_time_only_and_full_datetime() {
        let full = parse_timestamp("2024-03-01 09:15:00");
        assert_eq!(day_label(&full), "2024-03-01");

        let time_only = parse_timestamp("09:15:00");
        assert_eq!(day_label(&time_only), day_label(&Local::now()));

        // Garbage falls back to roughly now
        let fallback = parse_timestamp("not a time");
        assert!(Local::now().signed_duration_since(fallback) < Duration::seconds(5));
    }
}
