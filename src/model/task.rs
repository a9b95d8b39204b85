use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};

/// Titles longer than this are rejected
pub const TITLE_MAX_CHARS: usize = 70;

/// Largest real-world UTC offset is ±14h
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TodoError::validation(
                "priority",
                format!("\"{}\" is not a valid choice (low, medium, high).", other),
            )),
        }
    }
}

/// A stored task
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    /// Owning user; fixed at creation
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Incomplete with a due time strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now)
    }

    /// Substring match over title and description; `needle` is lower-case.
    pub fn mentions(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Fields accepted when creating a task. The owner comes from the caller.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_at: Option<DateTime<Utc>>,
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_at.is_none()
            && self.completed.is_none()
    }
}

/// Trim a title and check it is non-empty and short enough.
pub fn normalize_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TodoError::validation(
            "title",
            "Title cannot be empty or just whitespace.",
        ));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(TodoError::validation(
            "title",
            format!(
                "Ensure this field has no more than {} characters.",
                TITLE_MAX_CHARS
            ),
        ));
    }
    Ok(title.to_string())
}

/// Column a task list is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    DueAt,
    Priority,
    Title,
    Completed,
}

/// `created_at` / `-created_at` style ordering. Always made total by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrdering {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for TaskOrdering {
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for TaskOrdering {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let key = match name {
            "created_at" => SortKey::CreatedAt,
            "due_at" | "due_date" => SortKey::DueAt,
            "priority" => SortKey::Priority,
            "title" => SortKey::Title,
            "completed" | "status" => SortKey::Completed,
            _ => {
                return Err(TodoError::validation(
                    "ordering",
                    format!(
                        "\"{}\" is not a valid ordering (created_at, due_at, priority, title, completed).",
                        s
                    ),
                ))
            }
        };
        Ok(Self { key, descending })
    }
}

/// List filters. Every field narrows; `None` means "don't care".
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring over title and description
    pub search: Option<String>,
    pub ordering: TaskOrdering,
}

/// Half-open UTC interval `[start, end)` covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The local day that contains `now`, in `now`'s own offset.
    pub fn containing(now: DateTime<FixedOffset>) -> Self {
        let offset_secs = i64::from(now.offset().local_minus_utc());
        let to_utc = |local: NaiveDateTime| (local - Duration::seconds(offset_secs)).and_utc();

        let midnight = now.date_naive().and_time(NaiveTime::MIN);
        Self {
            start: to_utc(midnight),
            end: to_utc(midnight + Duration::days(1)),
        }
    }
}

pub fn is_valid_utc_offset(minutes: i32) -> bool {
    (-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&minutes)
}

/// Offset for a caller-supplied `utc_offset` (minutes east of UTC).
pub fn utc_offset(minutes: i32) -> Result<FixedOffset> {
    if !is_valid_utc_offset(minutes) {
        return Err(TodoError::validation(
            "utc_offset",
            format!(
                "Offset must be between -{0} and {0} minutes.",
                MAX_UTC_OFFSET_MINUTES
            ),
        ));
    }
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| TodoError::validation("utc_offset", "Invalid offset."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(due_at: Option<DateTime<Utc>>, completed: bool) -> Task {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        Task {
            id: 1,
            owner_id: 1,
            title: "buy milk".to_string(),
            description: None,
            priority: Priority::Medium,
            due_at,
            completed,
            completed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_overdue_requires_due_date_in_past_and_incomplete() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let yesterday = now - Duration::days(1);

        assert!(task(Some(yesterday), false).is_overdue(now));
        assert!(!task(Some(yesterday), true).is_overdue(now));
        assert!(!task(None, false).is_overdue(now));
        // strictly before
        assert!(!task(Some(now), false).is_overdue(now));
    }

    #[test]
    fn test_mentions_folds_unicode_case() {
        let mut t = task(None, false);
        t.title = "Straße fegen".to_string();
        t.description = Some("Vor dem ÜBERGANG".to_string());
        assert!(t.mentions("straße"));
        assert!(t.mentions("übergang"));
        assert!(!t.mentions("garten"));
        t.description = None;
        assert!(!t.mentions("übergang"));
    }

    #[test]
    fn test_day_window_utc() {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 10, 15, 30, 0)
            .unwrap()
            .fixed_offset();
        let window = DayWindow::containing(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_day_window_follows_caller_offset() {
        // 02:00 UTC on the 10th is still the 9th in New York (-05:00)
        let offset = utc_offset(-300).unwrap();
        let now = Utc
            .with_ymd_and_hms(2025, 3, 10, 2, 0, 0)
            .unwrap()
            .with_timezone(&offset);
        let window = DayWindow::containing(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 9, 5, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 10, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  buy milk ").unwrap(), "buy milk");
        assert!(matches!(normalize_title(""), Err(TodoError::Validation(_))));
        assert!(matches!(normalize_title("   \t"), Err(TodoError::Validation(_))));
        assert!(normalize_title(&"x".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(normalize_title(&"x".repeat(TITLE_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn test_parse_ordering() {
        assert_eq!(
            "-due_at".parse::<TaskOrdering>().unwrap(),
            TaskOrdering {
                key: SortKey::DueAt,
                descending: true
            }
        );
        assert_eq!(
            "priority".parse::<TaskOrdering>().unwrap(),
            TaskOrdering {
                key: SortKey::Priority,
                descending: false
            }
        );
        assert!("owner".parse::<TaskOrdering>().is_err());
        assert_eq!(TaskOrdering::default().key, SortKey::CreatedAt);
        assert!(TaskOrdering::default().descending);
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::Low < Priority::High);
    }

    #[test]
    fn test_utc_offset_range() {
        assert!(utc_offset(840).is_ok());
        assert!(utc_offset(-840).is_ok());
        assert!(utc_offset(841).is_err());
    }
}
