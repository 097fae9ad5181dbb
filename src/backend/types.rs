use serde::{Deserialize, Serialize};

/// One persisted exchange as returned by `GET /history`, ascending by time.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: i64,
    pub user_message: String,
    pub ai_response: String,
    /// Display timestamp, `%H:%M:%S` for same-day rows. Older backends may
    /// send a full `%Y-%m-%d %H:%M:%S`; both are accepted by the transcript.
    pub timestamp: String,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Successful `POST /chat` body.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

/// Error payload carried by every non-2xx response.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// `POST /edit_message` request body.
#[derive(Serialize, Debug)]
pub struct EditRequest<'a> {
    pub message_id: i64,
    pub new_message: &'a str,
}

/// `POST /delete_message` request body.
#[derive(Serialize, Debug)]
pub struct DeleteMessageRequest {
    pub message_id: i64,
}

/// `POST /delete_task` request body.
#[derive(Serialize, Debug)]
pub struct DeleteTaskRequest {
    pub task_id: i64,
}

/// One scheduled reminder from `GET /tasks`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: i64,
    pub description: String,
    /// `%Y-%m-%d %H:%M` local time.
    pub scheduled_time: String,
}

/// One unlocked achievement from `GET /achievements`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AchievementRecord {
    pub name: String,
    pub description: String,
}

/// Current preference record from `GET /preferences`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PreferenceRecord {
    pub model: String,
    pub tone: String,
    pub language: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Fields for the multipart `POST /preferences` form.
#[derive(Debug, Clone, Default)]
pub struct PreferenceUpdate {
    pub model: String,
    pub tone: String,
    pub language: String,
    pub bio: String,
    /// Optional path to a profile picture to upload.
    pub profile_picture: Option<std::path::PathBuf>,
}

/// `POST /preferences` acknowledgment.
#[derive(Deserialize, Debug, Clone)]
pub struct PreferenceSaved {
    pub success: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contract test: history rows deserialize from the backend's exact shape.
    #[test]
    fn message_record_deserializes_full_row() {
        let json = r#"{
            "id": 7,
            "user_message": "hola",
            "ai_response": "¡Hola! ¿En qué puedo ayudarte?",
            "timestamp": "14:03:22",
            "edited": true,
            "file_url": "/static/uploads/notes.txt",
            "file_name": "notes.txt",
            "avatar": "/static/uploads/me.png"
        }"#;
        let rec: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.id, 7);
        assert!(rec.edited);
        assert_eq!(rec.file_name.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn message_record_tolerates_missing_optionals() {
        let json = r#"{"id":1,"user_message":"a","ai_response":"b","timestamp":"09:00:00"}"#;
        let rec: MessageRecord = serde_json::from_str(json).unwrap();
        assert!(!rec.edited);
        assert!(rec.file_url.is_none());
        assert!(rec.avatar.is_none());
    }

    #[test]
    fn chat_reply_quick_replies_default_empty() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert!(reply.quick_replies.is_empty());

        let reply: ChatReply =
            serde_json::from_str(r#"{"response":"hi","quick_replies":["Tell me more"]}"#).unwrap();
        assert_eq!(reply.quick_replies, vec!["Tell me more"]);
    }

    /// Contract test: edit/delete bodies serialize to the exact wire shape.
    #[test]
    fn edit_and_delete_requests_serialize() {
        let edit = EditRequest {
            message_id: 3,
            new_message: "fixed",
        };
        assert_eq!(
            serde_json::to_string(&edit).unwrap(),
            r#"{"message_id":3,"new_message":"fixed"}"#
        );

        let del = DeleteMessageRequest { message_id: 3 };
        assert_eq!(serde_json::to_string(&del).unwrap(), r#"{"message_id":3}"#);

        let task = DeleteTaskRequest { task_id: 9 };
        assert_eq!(serde_json::to_string(&task).unwrap(), r#"{"task_id":9}"#);
    }
}
