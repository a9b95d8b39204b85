//! Task API handlers
//!
//! Every handler runs behind `require_token`; the owner is always the
//! authenticated caller and never comes from the request.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, MessageResponse, SUCCESS};
use crate::api::auth::AuthUser;
use crate::api::error::bad_body;
use crate::api::state::AppState;
use crate::error::{Result, TodoError};
use crate::model::task::utc_offset;
use crate::model::{NewTask, Priority, Task, TaskFilter, TaskOrdering, TaskPatch, User};
use crate::operations::tasks::{self as ops, TASK_NOT_FOUND};
use crate::storage;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Query string accepted by the list, overdue and today endpoints.
///
/// Values stay strings here so bad input surfaces as a field-keyed 400.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    /// Minutes east of UTC for "today"
    pub utc_offset: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TaskListQuery {
    pub fn filter(&self) -> Result<TaskFilter> {
        let completed = match present(&self.completed) {
            None => None,
            Some("true" | "True" | "1") => Some(true),
            Some("false" | "False" | "0") => Some(false),
            Some(other) => {
                return Err(TodoError::validation(
                    "completed",
                    format!("\"{}\" is not a valid boolean.", other),
                ))
            }
        };
        Ok(TaskFilter {
            completed,
            priority: present(&self.priority)
                .map(str::parse::<Priority>)
                .transpose()?,
            search: present(&self.search).map(str::to_string),
            ordering: present(&self.ordering)
                .map(str::parse::<TaskOrdering>)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Caller's offset, falling back to the configured default.
    pub fn offset(&self, state: &AppState) -> Result<FixedOffset> {
        match present(&self.utc_offset) {
            None => state.default_offset(),
            Some(raw) => {
                let minutes = raw.parse::<i32>().map_err(|_| {
                    TodoError::validation("utc_offset", "A valid integer is required.")
                })?;
                utc_offset(minutes)
            }
        }
    }
}

/// Create task request. Unknown fields such as `owner` or `id` are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_at: Option<DateTime<Utc>>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title,
            description: blank_to_none(req.description),
            priority: req.priority,
            due_at: req.due_at,
        }
    }
}

/// Partial update; `null` clears `description` / `due_at`.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: req.title,
            description: req.description.map(blank_to_none),
            priority: req.priority,
            due_at: req.due_at,
            completed: req.completed,
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

impl From<&User> for OwnerResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
        }
    }
}

/// Task as rendered by the API
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OwnerResponse,
}

impl TaskResponse {
    fn new(task: Task, owner: &User, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: task.is_overdue(now),
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            due_at: task.due_at,
            completed: task.completed,
            completed_at: task.completed_at,
            created_at: task.created_at,
            updated_at: task.updated_at,
            owner: OwnerResponse::from(owner),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskEnvelope {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub task: TaskResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

impl TaskEnvelope {
    fn new(message: Option<&str>, task: Task, owner: &User, now: DateTime<Utc>) -> Self {
        Self {
            status: SUCCESS,
            message: message.map(str::to_string),
            task: TaskResponse::new(task, owner, now),
            warning: None,
        }
    }

    fn with_warning(mut self, warning: Option<&'static str>) -> Self {
        self.warning = warning;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub status: &'static str,
    pub count: usize,
    pub tasks: Vec<TaskResponse>,
}

impl TaskListResponse {
    fn new(tasks: Vec<Task>, owner: &User, now: DateTime<Utc>) -> Self {
        let tasks: Vec<TaskResponse> = tasks
            .into_iter()
            .map(|task| TaskResponse::new(task, owner, now))
            .collect();
        Self {
            status: SUCCESS,
            count: tasks.len(),
            tasks,
        }
    }
}

/// Non-numeric ids are just another id that matches nothing.
fn task_id(raw: &str) -> Result<i64> {
    raw.parse().map_err(|_| TodoError::not_found(TASK_NOT_FOUND))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/tasks/
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>> {
    let filter = query.filter()?;
    let conn = storage::lock(&state.db)?;
    let tasks = ops::list(&conn, auth.user.id, &filter)?;
    Ok(Json(TaskListResponse::new(tasks, &auth.user, Utc::now())))
}

/// POST /api/tasks/
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskEnvelope>)> {
    let Json(req) = payload.map_err(bad_body)?;
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let task = ops::create(&conn, auth.user.id, req.into(), now)?;

    let warning = ops::due_warning(&task, now);
    let body = TaskEnvelope::new(Some("Task created successfully."), task, &auth.user, now)
        .with_warning(warning);
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /api/tasks/{id}/
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>> {
    let id = task_id(&id)?;
    let conn = storage::lock(&state.db)?;
    let task = ops::get(&conn, auth.user.id, id)?;
    Ok(Json(TaskEnvelope::new(None, task, &auth.user, Utc::now())))
}

/// PATCH (or PUT) /api/tasks/{id}/
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskEnvelope>> {
    let id = task_id(&id)?;
    let Json(req) = payload.map_err(bad_body)?;
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let task = ops::update(&conn, auth.user.id, id, req.into(), now)?;

    let warning = ops::due_warning(&task, now);
    let body = TaskEnvelope::new(Some("Task updated successfully."), task, &auth.user, now)
        .with_warning(warning);
    Ok(Json(body))
}

/// DELETE /api/tasks/{id}/
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = task_id(&id)?;
    let conn = storage::lock(&state.db)?;
    let task = ops::delete(&conn, auth.user.id, id)?;
    Ok(Json(MessageResponse::new(format!(
        "Task '{}' deleted successfully.",
        task.title
    ))))
}

/// POST /api/tasks/{id}/complete/
pub async fn toggle_complete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>> {
    let id = task_id(&id)?;
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let task = ops::toggle_complete(&conn, auth.user.id, id, now)?;

    let message = if task.completed {
        "Task marked as completed."
    } else {
        "Task marked as incomplete."
    };
    Ok(Json(TaskEnvelope::new(Some(message), task, &auth.user, now)))
}

/// GET /api/tasks/overdue/
pub async fn overdue_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>> {
    let filter = query.filter()?;
    let now = Utc::now();
    let conn = storage::lock(&state.db)?;
    let tasks = ops::overdue(&conn, auth.user.id, now, &filter)?;
    Ok(Json(TaskListResponse::new(tasks, &auth.user, now)))
}

/// GET /api/tasks/today/
pub async fn today_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>> {
    let filter = query.filter()?;
    let local_now = AppState::local_now(query.offset(&state)?);
    let conn = storage::lock(&state.db)?;
    let tasks = ops::today(&conn, auth.user.id, local_now, &filter)?;
    Ok(Json(TaskListResponse::new(
        tasks,
        &auth.user,
        local_now.with_timezone(&Utc),
    )))
}
