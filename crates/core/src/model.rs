use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// Display format used for due dates in listings and reminder bodies.
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub date: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: i64,
        category: impl Into<String>,
        title: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            title: title.into(),
            date,
        }
    }

    /// Identifier shared with the notification runtime.
    pub fn reminder_identifier(&self) -> String {
        self.id.to_string()
    }

    pub fn formatted_date(&self) -> String {
        format_local(self.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub id: i64,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
    Unscheduled,
    Scheduled,
    Fired,
    Cancelled,
}

impl ReminderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderState::Unscheduled => "unscheduled",
            ReminderState::Scheduled => "scheduled",
            ReminderState::Fired => "fired",
            ReminderState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReminderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReminderState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unscheduled" => Ok(ReminderState::Unscheduled),
            "scheduled" => Ok(ReminderState::Scheduled),
            "fired" => Ok(ReminderState::Fired),
            "cancelled" | "canceled" => Ok(ReminderState::Cancelled),
            other => Err(anyhow!(
                "Unknown reminder state '{}': expected unscheduled|scheduled|fired|cancelled",
                other
            )),
        }
    }
}

/// A one-shot local notification registered for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub task_id: i64,
    pub identifier: String,
    pub category: String,
    pub title: String,
    pub fire_at: DateTime<Utc>,
    pub state: ReminderState,
}

impl Reminder {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            identifier: task.reminder_identifier(),
            category: task.category.clone(),
            title: task.title.clone(),
            fire_at: task.date,
            state: ReminderState::Scheduled,
        }
    }

    pub fn body(&self) -> String {
        format!("{} · {}", self.category, format_local(self.fire_at))
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) {}",
            self.identifier,
            self.title,
            self.body(),
            self.state
        )
    }
}

fn format_local(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format(DATE_DISPLAY_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reminder_copies_task_payload() {
        let date = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let task = Task::new(7, "work", "Send invoice", date);
        let reminder = Reminder::for_task(&task);

        assert_eq!(reminder.identifier, "7");
        assert_eq!(reminder.title, "Send invoice");
        assert_eq!(reminder.fire_at, date);
        assert_eq!(reminder.state, ReminderState::Scheduled);
        assert!(reminder.body().starts_with("work · "));
        assert!(reminder.body().ends_with(&task.formatted_date()));
    }

    #[test]
    fn formatted_date_has_minute_precision() {
        let date = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 45).unwrap();
        let task = Task::new(0, "home", "Water plants", date);
        let formatted = task.formatted_date();
        assert_eq!(formatted.len(), "2025-03-01 09:30".len());
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[13..14], ":");
    }

    #[test]
    fn reminder_state_parsing_accepts_both_spellings() {
        assert_eq!(
            "canceled".parse::<ReminderState>().unwrap(),
            ReminderState::Cancelled
        );
        assert!("pending".parse::<ReminderState>().is_err());
    }
}
