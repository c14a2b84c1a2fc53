// Data model for tasks

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Calendar date as entered; not validated
    pub due_date: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl Task {
    /// Build a fresh incomplete task with a newly generated id.
    ///
    /// Callers are expected to have validated `name` and `due_date` already.
    pub(crate) fn new(name: &str, due_date: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            due_date: due_date.to_string(),
            completed: false,
            priority: Priority::Medium,
        }
    }

    /// Parsed due date, or `None` when the stored text is not a recognizable date
    pub fn due(&self) -> Option<NaiveDate> {
        parse_due_date(&self.due_date)
    }
}

/// Generate a task id.
///
/// UUIDv7 ids are time-ordered and stay unique across calls within the same millisecond.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Parse a due date string.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, and RFC 3339 timestamps (date part only).
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}
