//! Task query service
//!
//! Owner-scoped task operations shared by every front end (today only the
//! HTTP API). Each function takes the caller's owner id explicitly and
//! delegates persistence to `storage::tasks`.
//!
//! ## Ownership guard
//!
//! Every per-id operation goes through [`owned_task`], which answers
//! `NotFound` both for ids that do not exist and for ids owned by someone
//! else. The two cases produce the same error and message.
//!
//! ```text
//! handler ──> operations::tasks (owner, ...) ──> storage::tasks (owner_id, ...)
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::Connection;

use crate::error::{Result, TodoError};
use crate::model::task::normalize_title;
use crate::model::{DayWindow, NewTask, Task, TaskFilter, TaskPatch};
use crate::storage::tasks::{self, DueScope};

pub const TASK_NOT_FOUND: &str = "No Task matches the given query.";

/// Warning attached to create/update responses when the due time has passed
pub const PAST_DUE_WARNING: &str = "Warning: Due date is in the past.";

/// Load `id` if `owner_id` owns it; otherwise `NotFound`.
pub fn owned_task(conn: &Connection, owner_id: i64, id: i64) -> Result<Task> {
    tasks::find_task(conn, owner_id, id)?.ok_or_else(|| TodoError::not_found(TASK_NOT_FOUND))
}

/// All of the owner's tasks matching `filter`, in the filter's order.
pub fn list(conn: &Connection, owner_id: i64, filter: &TaskFilter) -> Result<Vec<Task>> {
    tasks::list_tasks(conn, owner_id, DueScope::Any, filter)
}

pub fn get(conn: &Connection, owner_id: i64, id: i64) -> Result<Task> {
    owned_task(conn, owner_id, id)
}

/// Create a task for `owner_id`. New tasks always start incomplete.
pub fn create(conn: &Connection, owner_id: i64, new: NewTask, now: DateTime<Utc>) -> Result<Task> {
    let new = NewTask {
        title: normalize_title(&new.title)?,
        ..new
    };
    let task = tasks::insert_task(conn, owner_id, &new, now)?;
    tracing::debug!(owner_id, task_id = task.id, "task created");
    Ok(task)
}

/// Apply only the provided fields. Id and owner are not patchable.
pub fn update(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> Result<Task> {
    let mut task = owned_task(conn, owner_id, id)?;
    if patch.is_empty() {
        return Ok(task);
    }

    if let Some(title) = patch.title {
        task.title = normalize_title(&title)?;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due_at) = patch.due_at {
        task.due_at = due_at;
    }
    if let Some(completed) = patch.completed {
        set_completed(&mut task, completed, now);
    }

    save(conn, owner_id, &task, now)?;
    tracing::debug!(owner_id, task_id = id, "task updated");
    owned_task(conn, owner_id, id)
}

/// Remove the task, returning what was deleted. Not idempotent: a second
/// call fails with `NotFound`.
pub fn delete(conn: &Connection, owner_id: i64, id: i64) -> Result<Task> {
    let task = owned_task(conn, owner_id, id)?;
    if !tasks::delete_task(conn, owner_id, id)? {
        return Err(TodoError::not_found(TASK_NOT_FOUND));
    }
    tracing::debug!(owner_id, task_id = id, "task deleted");
    Ok(task)
}

/// Flip `completed` and return the updated task.
pub fn toggle_complete(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Task> {
    let mut task = owned_task(conn, owner_id, id)?;
    let completed = !task.completed;
    set_completed(&mut task, completed, now);
    save(conn, owner_id, &task, now)?;
    tracing::debug!(owner_id, task_id = id, completed, "task toggled");
    owned_task(conn, owner_id, id)
}

/// Incomplete tasks due strictly before `now`.
pub fn overdue(
    conn: &Connection,
    owner_id: i64,
    now: DateTime<Utc>,
    filter: &TaskFilter,
) -> Result<Vec<Task>> {
    tasks::list_tasks(conn, owner_id, DueScope::OverdueAt(now), filter)
}

/// Tasks due on the caller-local day containing `now`, completed or not.
pub fn today(
    conn: &Connection,
    owner_id: i64,
    now: DateTime<FixedOffset>,
    filter: &TaskFilter,
) -> Result<Vec<Task>> {
    let window = DayWindow::containing(now);
    tasks::list_tasks(conn, owner_id, DueScope::DueWithin(window), filter)
}

/// `Some(warning)` when the task has a due time before `now`.
pub fn due_warning(task: &Task, now: DateTime<Utc>) -> Option<&'static str> {
    task.due_at
        .filter(|due| *due < now)
        .map(|_| PAST_DUE_WARNING)
}

/// Becoming completed stamps `completed_at`; becoming incomplete clears it.
fn set_completed(task: &mut Task, completed: bool, now: DateTime<Utc>) {
    if completed && !task.completed {
        task.completed_at = Some(now);
    } else if !completed {
        task.completed_at = None;
    }
    task.completed = completed;
}

fn save(conn: &Connection, owner_id: i64, task: &Task, now: DateTime<Utc>) -> Result<()> {
    // The row can disappear between the guard and the write (last write wins).
    if !tasks::update_task(conn, owner_id, task, now)? {
        return Err(TodoError::not_found(TASK_NOT_FOUND));
    }
    Ok(())
}
