//! # Background fetchers
//!
//! One-shot and periodic backend fetches that run off the event loop and
//! report back as actions: conversation history and preferences at startup,
//! a reminder poll every minute, and achievement checks after each exchange.

use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use log::{info, warn};

use crate::backend::types::TaskRecord;
use crate::backend::BackendClient;
use crate::core::action::Action;
use crate::core::state::Severity;

const TASK_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Fetch the persisted conversation once, at startup.
pub fn fetch_history(client: BackendClient, actions: Sender<Action>) {
    tokio::spawn(async move {
        let action = match client.history().await {
            Ok(records) => {
                info!("Loaded {} history rows", records.len());
                Action::HistoryLoaded(records)
            }
            Err(e) => Action::HistoryFailed(e.to_string()),
        };
        let _ = actions.send(action);
    });
}

/// Fetch preferences once, at startup. Failure is non-fatal; the avatar
/// just stays unset.
pub fn fetch_preferences(client: BackendClient, actions: Sender<Action>) {
    tokio::spawn(async move {
        match client.preferences().await {
            Ok(prefs) => {
                let _ = actions.send(Action::PreferencesLoaded(prefs));
            }
            Err(e) => warn!("Could not load preferences: {}", e),
        }
    });
}

/// Fetch achievements once. Used at startup (seeds the known set silently)
/// and after each completed exchange (new entries toast).
pub fn check_achievements(client: BackendClient, actions: Sender<Action>) {
    tokio::spawn(async move {
        match client.achievements().await {
            Ok(records) => {
                let _ = actions.send(Action::AchievementsLoaded(records));
            }
            Err(e) => warn!("Could not check achievements: {}", e),
        }
    });
}

/// Poll scheduled reminders every minute. Each due task produces a toast and
/// is acknowledged server-side so it fires once.
pub fn spawn_task_poller(client: BackendClient, actions: Sender<Action>) {
    tokio::spawn(async move {
        loop {
            match client.tasks().await {
                Ok(tasks) => {
                    for task in due_tasks(Local::now(), &tasks) {
                        let sent = actions.send(Action::Notify {
                            text: format!("Reminder: {}", task.description),
                            severity: Severity::Info,
                        });
                        if sent.is_err() {
                            return;
                        }
                        if let Err(e) = client.delete_task(task.id).await {
                            warn!("Could not acknowledge reminder {}: {}", task.id, e);
                        }
                    }
                }
                Err(e) => warn!("Reminder poll failed: {}", e),
            }
            tokio::time::sleep(TASK_POLL_INTERVAL).await;
        }
    });
}

/// The tasks whose scheduled time has passed. Rows with an unparseable
/// schedule are skipped rather than fired forever.
pub fn due_tasks(now: DateTime<Local>, tasks: &[TaskRecord]) -> Vec<&TaskRecord> {
    tasks
        .iter()
        .filter(|task| match parse_schedule(&task.scheduled_time) {
            Some(when) => when <= now,
            None => {
                warn!(
                    "Task {} has unparseable schedule '{}'",
                    task.id, task.scheduled_time
                );
                false
            }
        })
        .collect()
}

fn parse_schedule(raw: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").ok()?;
    Local.from_local_datetime(&naive).single()
}
