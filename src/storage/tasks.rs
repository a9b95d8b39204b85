//! Task rows. Every function takes the owner id; there is no unscoped query.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{from_millis, from_millis_opt, to_millis};
use crate::error::{Result, TodoError};
use crate::model::task::SortKey;
use crate::model::{DayWindow, NewTask, Priority, Task, TaskFilter, TaskOrdering};

const TASK_COLUMNS: &str = "id, owner_id, title, description, priority, due_at, completed, \
     completed_at, created_at, updated_at";

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: TodoError| FromSqlError::Other(Box::new(e)))
    }
}

/// Due-date restriction applied on top of a [`TaskFilter`]
#[derive(Debug, Clone, Copy)]
pub enum DueScope {
    Any,
    /// Incomplete and due strictly before the instant
    OverdueAt(DateTime<Utc>),
    /// Due inside the window, completed or not
    DueWithin(DayWindow),
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: row.get(4)?,
        due_at: from_millis_opt(row.get(5)?)?,
        completed: row.get(6)?,
        completed_at: from_millis_opt(row.get(7)?)?,
        created_at: from_millis(row.get(8)?)?,
        updated_at: from_millis(row.get(9)?)?,
    })
}

/// Insert a new, incomplete task for `owner_id`.
pub fn insert_task(
    conn: &Connection,
    owner_id: i64,
    new: &NewTask,
    now: DateTime<Utc>,
) -> Result<Task> {
    let now_ms = to_millis(now);
    conn.execute(
        "INSERT INTO tasks (owner_id, title, description, priority, due_at, completed, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
        params![
            owner_id,
            new.title,
            new.description,
            new.priority.unwrap_or_default(),
            new.due_at.map(to_millis),
            now_ms
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_task(conn, owner_id, id)?
        .ok_or_else(|| TodoError::not_found("Task vanished after insert."))
}

/// The task with `id`, only if `owner_id` owns it.
pub fn find_task(conn: &Connection, owner_id: i64, id: i64) -> Result<Option<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = ?1 AND owner_id = ?2",
        TASK_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![id, owner_id], row_to_task)
        .optional()?)
}

/// Write back every mutable column of `task`, stamping `updated_at`.
/// Returns false when no row owned by `owner_id` matched.
pub fn update_task(
    conn: &Connection,
    owner_id: i64,
    task: &Task,
    now: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tasks
         SET title = ?1, description = ?2, priority = ?3, due_at = ?4,
             completed = ?5, completed_at = ?6, updated_at = ?7
         WHERE id = ?8 AND owner_id = ?9",
        params![
            task.title,
            task.description,
            task.priority,
            task.due_at.map(to_millis),
            task.completed,
            task.completed_at.map(to_millis),
            to_millis(now),
            task.id,
            owner_id
        ],
    )?;
    Ok(changed > 0)
}

/// Returns false when no row owned by `owner_id` matched.
pub fn delete_task(conn: &Connection, owner_id: i64, id: i64) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(removed > 0)
}

/// Tasks of `owner_id` matching `scope` and `filter`, in the filter's order.
pub fn list_tasks(
    conn: &Connection,
    owner_id: i64,
    scope: DueScope,
    filter: &TaskFilter,
) -> Result<Vec<Task>> {
    let mut sql = format!("SELECT {} FROM tasks WHERE owner_id = ?", TASK_COLUMNS);
    let mut args: Vec<Value> = vec![Value::Integer(owner_id)];

    match scope {
        DueScope::Any => {}
        DueScope::OverdueAt(now) => {
            sql.push_str(" AND due_at IS NOT NULL AND due_at < ? AND completed = 0");
            args.push(Value::Integer(to_millis(now)));
        }
        DueScope::DueWithin(window) => {
            sql.push_str(" AND due_at IS NOT NULL AND due_at >= ? AND due_at < ?");
            args.push(Value::Integer(to_millis(window.start)));
            args.push(Value::Integer(to_millis(window.end)));
        }
    }

    if let Some(completed) = filter.completed {
        sql.push_str(" AND completed = ?");
        args.push(Value::Integer(i64::from(completed)));
    }
    if let Some(priority) = filter.priority {
        sql.push_str(" AND priority = ?");
        args.push(Value::Text(priority.as_str().to_string()));
    }

    sql.push_str(&order_clause(filter.ordering));

    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params_from_iter(args.iter()), row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    // SQLite's LIKE only folds ASCII, so search is matched here
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    Ok(match needle {
        Some(needle) => tasks.into_iter().filter(|t| t.mentions(&needle)).collect(),
        None => tasks,
    })
}

/// `ORDER BY` for a whitelisted key. Undated tasks always sort last; `id`
/// makes the order total.
fn order_clause(ordering: TaskOrdering) -> String {
    let dir = if ordering.descending { "DESC" } else { "ASC" };
    let key = match ordering.key {
        SortKey::CreatedAt => format!("created_at {}", dir),
        SortKey::DueAt => format!("due_at IS NULL, due_at {}", dir),
        SortKey::Priority => format!(
            "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END {}",
            dir
        ),
        SortKey::Title => format!("title COLLATE NOCASE {}", dir),
        SortKey::Completed => format!("completed {}", dir),
    };
    format!(" ORDER BY {}, id {}", key, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::seed_user;
    use crate::storage::{lock, open_in_memory};
    use chrono::{Duration, TimeZone};

    fn new_task(title: &str, due_at: Option<DateTime<Utc>>) -> NewTask {
        NewTask {
            title: title.to_string(),
            due_at,
            ..Default::default()
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_insert_defaults() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

        let task = insert_task(&conn, ada.id, &new_task("buy milk", None), now).unwrap();
        assert_eq!(task.owner_id, ada.id);
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn test_other_owner_cannot_see_or_touch() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let bob = seed_user(&conn, "bob");
        let now = Utc::now();
        let task = insert_task(&conn, ada.id, &new_task("secret", None), now).unwrap();

        assert!(find_task(&conn, bob.id, task.id).unwrap().is_none());
        assert!(!update_task(&conn, bob.id, &task, now).unwrap());
        assert!(!delete_task(&conn, bob.id, task.id).unwrap());
        assert!(list_tasks(&conn, bob.id, DueScope::Any, &TaskFilter::default())
            .unwrap()
            .is_empty());
        assert!(find_task(&conn, ada.id, task.id).unwrap().is_some());
    }

    #[test]
    fn test_default_order_is_newest_first() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

        insert_task(&conn, ada.id, &new_task("first", None), t0).unwrap();
        insert_task(&conn, ada.id, &new_task("second", None), t0 + Duration::minutes(1)).unwrap();
        // same timestamp as "second": id breaks the tie
        insert_task(&conn, ada.id, &new_task("third", None), t0 + Duration::minutes(1)).unwrap();

        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &TaskFilter::default()).unwrap();
        assert_eq!(titles(&tasks), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_due_ordering_puts_undated_last() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

        insert_task(&conn, ada.id, &new_task("undated", None), now).unwrap();
        insert_task(&conn, ada.id, &new_task("later", Some(now + Duration::days(2))), now).unwrap();
        insert_task(&conn, ada.id, &new_task("sooner", Some(now + Duration::days(1))), now).unwrap();

        let asc = TaskFilter {
            ordering: "due_at".parse().unwrap(),
            ..Default::default()
        };
        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &asc).unwrap();
        assert_eq!(titles(&tasks), vec!["sooner", "later", "undated"]);

        let desc = TaskFilter {
            ordering: "-due_at".parse().unwrap(),
            ..Default::default()
        };
        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &desc).unwrap();
        assert_eq!(titles(&tasks), vec!["later", "sooner", "undated"]);
    }

    #[test]
    fn test_filters_narrow() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let now = Utc::now();

        let mut done = insert_task(&conn, ada.id, &new_task("Write report", None), now).unwrap();
        done.completed = true;
        done.completed_at = Some(now);
        update_task(&conn, ada.id, &done, now).unwrap();
        insert_task(
            &conn,
            ada.id,
            &NewTask {
                title: "Call plumber".to_string(),
                description: Some("about the 50% discount".to_string()),
                priority: Some(Priority::High),
                due_at: None,
            },
            now,
        )
        .unwrap();

        let open = TaskFilter {
            completed: Some(false),
            ..Default::default()
        };
        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &open).unwrap();
        assert_eq!(titles(&tasks), vec!["Call plumber"]);

        let high = TaskFilter {
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert_eq!(list_tasks(&conn, ada.id, DueScope::Any, &high).unwrap().len(), 1);

        let search = TaskFilter {
            search: Some("REPORT".to_string()),
            ..Default::default()
        };
        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &search).unwrap();
        assert_eq!(titles(&tasks), vec!["Write report"]);

        // wildcard characters are matched literally
        let percent = TaskFilter {
            search: Some("50%".to_string()),
            ..Default::default()
        };
        assert_eq!(list_tasks(&conn, ada.id, DueScope::Any, &percent).unwrap().len(), 1);
        let underscore = TaskFilter {
            search: Some("_".to_string()),
            ..Default::default()
        };
        assert!(list_tasks(&conn, ada.id, DueScope::Any, &underscore)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_overdue_scope() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        insert_task(&conn, ada.id, &new_task("late", Some(now - Duration::days(1))), now).unwrap();
        insert_task(&conn, ada.id, &new_task("due now", Some(now)), now).unwrap();
        insert_task(&conn, ada.id, &new_task("undated", None), now).unwrap();
        let mut done =
            insert_task(&conn, ada.id, &new_task("late but done", Some(now - Duration::days(2))), now)
                .unwrap();
        done.completed = true;
        update_task(&conn, ada.id, &done, now).unwrap();

        let tasks =
            list_tasks(&conn, ada.id, DueScope::OverdueAt(now), &TaskFilter::default()).unwrap();
        assert_eq!(titles(&tasks), vec!["late"]);
    }

    #[test]
    fn test_due_within_scope_is_half_open() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let window = DayWindow::containing(now.fixed_offset());

        insert_task(&conn, ada.id, &new_task("midnight", Some(window.start)), now).unwrap();
        insert_task(&conn, ada.id, &new_task("tomorrow", Some(window.end)), now).unwrap();
        insert_task(&conn, ada.id, &new_task("undated", None), now).unwrap();
        let mut done = insert_task(&conn, ada.id, &new_task("done today", Some(now)), now).unwrap();
        done.completed = true;
        update_task(&conn, ada.id, &done, now).unwrap();

        let tasks =
            list_tasks(&conn, ada.id, DueScope::DueWithin(window), &TaskFilter::default()).unwrap();
        let mut got = titles(&tasks);
        got.sort();
        assert_eq!(got, vec!["done today", "midnight"]);
    }

    #[test]
    fn test_update_and_delete() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(1);

        let mut task = insert_task(&conn, ada.id, &new_task("draft", None), t0).unwrap();
        task.title = "final".to_string();
        task.description = Some("notes".to_string());
        assert!(update_task(&conn, ada.id, &task, t1).unwrap());

        let stored = find_task(&conn, ada.id, task.id).unwrap().unwrap();
        assert_eq!(stored.title, "final");
        assert_eq!(stored.description.as_deref(), Some("notes"));
        assert_eq!(stored.created_at, t0);
        assert_eq!(stored.updated_at, t1);

        assert!(delete_task(&conn, ada.id, task.id).unwrap());
        assert!(!delete_task(&conn, ada.id, task.id).unwrap());
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = seed_user(&conn, "ada");
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        insert_task(&conn, ada.id, &new_task("Über den Wolken", None), now).unwrap();
        let mut noted = new_task("Groceries", None);
        noted.description = Some("ÆBLER and milk".to_string());
        insert_task(&conn, ada.id, &noted, now).unwrap();
        insert_task(&conn, ada.id, &new_task("Unrelated", None), now).unwrap();

        let search = |text: &str| TaskFilter {
            search: Some(text.to_string()),
            ..Default::default()
        };
        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &search("über")).unwrap();
        assert_eq!(titles(&tasks), vec!["Über den Wolken"]);
        let tasks = list_tasks(&conn, ada.id, DueScope::Any, &search("  æbler ")).unwrap();
        assert_eq!(titles(&tasks), vec!["Groceries"]);
    }
}
