use std::fmt;
use std::path::Path;

use log::debug;
use reqwest::multipart;

use super::types::{
    AchievementRecord, ChatReply, DeleteMessageRequest, DeleteTaskRequest, EditRequest, ErrorBody,
    MessageRecord, PreferenceRecord, PreferenceSaved, PreferenceUpdate, TaskRecord,
};

/// Errors that can occur talking to the backend.
/// Variants carry enough info to determine retryability (future use).
#[derive(Debug)]
pub enum BackendError {
    /// Network-level failure (timeout, DNS, connection refused). Retryable.
    Network(String),
    /// The backend returned a non-2xx response with an error payload.
    Api { status: u16, message: String },
    /// Failed to parse the backend's response. Not retryable.
    Parse(String),
    /// Local I/O failure reading an attachment. Not retryable.
    Io(std::io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Network(msg) => write!(f, "network error: {msg}"),
            BackendError::Api { status, message } => {
                write!(f, "backend error (HTTP {status}): {message}")
            }
            BackendError::Parse(msg) => write!(f, "parse error: {msg}"),
            BackendError::Io(e) => write!(f, "attachment error: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Parse(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// HTTP client for the chat backend. Cheap to clone (reqwest's client is an
/// `Arc` internally); one instance is shared by the event loop and every
/// spawned task.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-2xx response to `BackendError::Api`, extracting the
    /// `{"error": ...}` payload when present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// `GET /history`: the full persisted conversation, ascending by time.
    pub async fn history(&self) -> Result<Vec<MessageRecord>, BackendError> {
        let response = self.http.get(self.url("/history")).send().await?;
        let records = Self::check(response).await?.json().await?;
        Ok(records)
    }

    /// `POST /chat`: submit a message and optional file attachment as a
    /// multipart form, mirroring the browser's FormData submission.
    pub async fn chat(
        &self,
        message: &str,
        attachment: Option<&Path>,
    ) -> Result<ChatReply, BackendError> {
        let mut form = multipart::Form::new().text("message", message.to_string());

        if let Some(path) = attachment {
            let bytes = tokio::fs::read(path).await.map_err(BackendError::Io)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            debug!("Attaching file {} ({} bytes)", file_name, bytes.len());
            form = form.part("file", multipart::Part::bytes(bytes).file_name(file_name));
        }

        let response = self
            .http
            .post(self.url("/chat"))
            .multipart(form)
            .send()
            .await?;
        let reply = Self::check(response).await?.json().await?;
        Ok(reply)
    }

    /// `POST /edit_message`: replace a message's text server-side.
    pub async fn edit_message(
        &self,
        message_id: i64,
        new_message: &str,
    ) -> Result<(), BackendError> {
        let body = EditRequest {
            message_id,
            new_message,
        };
        let response = self
            .http
            .post(self.url("/edit_message"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// `POST /delete_message`: remove a message server-side.
    pub async fn delete_message(&self, message_id: i64) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.url("/delete_message"))
            .json(&DeleteMessageRequest { message_id })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// `GET /tasks`: pending scheduled reminders.
    pub async fn tasks(&self) -> Result<Vec<TaskRecord>, BackendError> {
        let response = self.http.get(self.url("/tasks")).send().await?;
        let tasks = Self::check(response).await?.json().await?;
        Ok(tasks)
    }

    /// `POST /delete_task`: acknowledge a fired reminder.
    pub async fn delete_task(&self, task_id: i64) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.url("/delete_task"))
            .json(&DeleteTaskRequest { task_id })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// `GET /achievements`: achievements unlocked so far.
    pub async fn achievements(&self) -> Result<Vec<AchievementRecord>, BackendError> {
        let response = self.http.get(self.url("/achievements")).send().await?;
        let achievements = Self::check(response).await?.json().await?;
        Ok(achievements)
    }

    /// `GET /preferences`: current model/tone/language/avatar/bio record.
    pub async fn preferences(&self) -> Result<PreferenceRecord, BackendError> {
        let response = self.http.get(self.url("/preferences")).send().await?;
        let prefs = Self::check(response).await?.json().await?;
        Ok(prefs)
    }

    /// `POST /preferences`: save preferences as a multipart form, with an
    /// optional profile picture upload.
    pub async fn save_preferences(
        &self,
        update: &PreferenceUpdate,
    ) -> Result<PreferenceSaved, BackendError> {
        let mut form = multipart::Form::new()
            .text("model", update.model.clone())
            .text("tone", update.tone.clone())
            .text("language", update.language.clone())
            .text("bio", update.bio.clone());

        if let Some(path) = &update.profile_picture {
            let bytes = tokio::fs::read(path).await.map_err(BackendError::Io)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "avatar".to_string());
            form = form.part(
                "profile_picture",
                multipart::Part::bytes(bytes).file_name(file_name),
            );
        }

        let response = self
            .http
            .post(self.url("/preferences"))
            .multipart(form)
            .send()
            .await?;
        let saved = Self::check(response).await?.json().await?;
        Ok(saved)
    }
}
