// View projection: completion filter plus due-date ordering

use crate::task::Task;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Which tasks a view retains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

/// Due-date ordering of a view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl TaskFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.completed,
            TaskFilter::Incomplete => !task.completed,
        }
    }
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl std::fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFilter::All => write!(f, "all"),
            TaskFilter::Completed => write!(f, "completed"),
            TaskFilter::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "completed" | "done" => Ok(TaskFilter::Completed),
            "incomplete" | "open" => Ok(TaskFilter::Incomplete),
            other => Err(format!("unknown filter '{}' (expected all, completed, incomplete)", other)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortOrder::Ascending),
            "descending" | "desc" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order '{}' (expected ascending, descending)", other)),
        }
    }
}

/// Order two parsed due dates; unparseable dates rank after every valid one
fn compare_due(a: &Option<NaiveDate>, b: &Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Project `tasks` through `filter`, then order by due date.
///
/// The sort is stable in both directions, so tasks with equal due dates keep
/// their collection order. Tasks whose due date does not parse sort last when
/// ascending and first when descending.
pub fn project(tasks: &[Task], filter: TaskFilter, order: SortOrder) -> Vec<Task> {
    let mut keyed: Vec<(Option<NaiveDate>, &Task)> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .map(|task| (task.due(), task))
        .collect();

    match order {
        SortOrder::Ascending => keyed.sort_by(|(a, _), (b, _)| compare_due(a, b)),
        SortOrder::Descending => keyed.sort_by(|(a, _), (b, _)| compare_due(b, a)),
    }

    keyed.into_iter().map(|(_, task)| task.clone()).collect()
}
