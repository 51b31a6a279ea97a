//! Task service: internal work items.
//!
//! DESIGN
//! ======
//! Writes validate input into a full `Task` value first (`new_task`,
//! `apply_task_patch`), then persist the whole row. Ownership checks run on
//! the stored row before any change is applied.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::access;
use crate::services::filter::{self, ListFilter, ListParams, Listable, SortKey, SortValue};
use crate::services::profile::Profile;
use crate::services::record::{
    Priority, RecordError, decode_enum, double_option, ensure_active_member, free_text, parse_enum,
    parse_optional_timestamp, required_line,
};

pub const TASK_SORT_KEYS: &[SortKey] =
    &[SortKey::CreatedAt, SortKey::UpdatedAt, SortKey::Title, SortKey::Priority, SortKey::DueAt];

const TASK_COLUMNS: &str = "id, organization_id, title, description, status, priority, assignee_id, reporter_id, \
                            due_at, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [Self::Todo, Self::InProgress, Self::Review, Self::Done];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|status| status.as_str() == normalized)
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        self != Self::Done
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee_id: Option<Uuid>,
    pub reporter_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn task_from_row(row: &PgRow) -> Result<Task, RecordError> {
    Ok(Task {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: decode_enum("task status", row.try_get("status")?, TaskStatus::from_str)?,
        priority: decode_enum("priority", row.try_get("priority")?, Priority::from_str)?,
        assignee_id: row.try_get("assignee_id")?,
        reporter_id: row.try_get("reporter_id")?,
        due_at: row.try_get("due_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Listable for Task {
    type Status = TaskStatus;

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.title, &self.description]
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn assignee_id(&self) -> Option<Uuid> {
        self.assignee_id
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::UpdatedAt => SortValue::Time(Some(self.updated_at)),
            SortKey::Title => SortValue::Text(&self.title),
            SortKey::Priority => SortValue::Rank(Some(self.priority.rank())),
            SortKey::DueAt => SortValue::Time(self.due_at),
            SortKey::CreatedAt | SortKey::ScheduledAt => SortValue::Time(Some(self.created_at)),
        }
    }
}

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<String>>,
}

/// Build a validated task reported by `actor`.
pub(crate) fn new_task(actor: &Profile, input: TaskInput, now: OffsetDateTime) -> Result<Task, RecordError> {
    Ok(Task {
        id: Uuid::new_v4(),
        organization_id: actor.organization_id,
        title: required_line("title", &input.title)?,
        description: free_text("description", input.description.as_deref().unwrap_or_default())?,
        status: match input.status.as_deref() {
            Some(raw) => parse_enum("status", raw, TaskStatus::from_str)?,
            None => TaskStatus::Todo,
        },
        priority: match input.priority.as_deref() {
            Some(raw) => parse_enum("priority", raw, Priority::from_str)?,
            None => Priority::Medium,
        },
        assignee_id: input.assignee_id,
        reporter_id: Some(actor.id),
        due_at: parse_optional_timestamp("due_at", input.due_at.as_deref())?,
        created_at: now,
        updated_at: now,
    })
}

/// Apply a partial update onto a copy of `task`.
pub(crate) fn apply_task_patch(task: &Task, patch: TaskPatch, now: OffsetDateTime) -> Result<Task, RecordError> {
    let mut next = task.clone();
    if let Some(title) = patch.title.as_deref() {
        next.title = required_line("title", title)?;
    }
    if let Some(description) = patch.description.as_deref() {
        next.description = free_text("description", description)?;
    }
    if let Some(status) = patch.status.as_deref() {
        next.status = parse_enum("status", status, TaskStatus::from_str)?;
    }
    if let Some(priority) = patch.priority.as_deref() {
        next.priority = parse_enum("priority", priority, Priority::from_str)?;
    }
    if let Some(assignee_id) = patch.assignee_id {
        next.assignee_id = assignee_id;
    }
    if let Some(due_at) = patch.due_at {
        next.due_at = parse_optional_timestamp("due_at", due_at.as_deref())?;
    }
    next.updated_at = now;
    Ok(next)
}

// =============================================================================
// QUERIES
// =============================================================================

/// List the organization's tasks, filtered and sorted in memory.
///
/// # Errors
///
/// Returns `Invalid` for bad list parameters or a database error.
pub async fn list_tasks(pool: &PgPool, organization_id: Uuid, params: &ListParams) -> Result<Vec<Task>, RecordError> {
    params.reject("tasks", &["direction", "folder"])?;
    let list_filter = ListFilter::parse(params, TaskStatus::from_str, TASK_SORT_KEYS)?;
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE organization_id = $1 ORDER BY created_at DESC, id");
    let rows = sqlx::query(&query).bind(organization_id).fetch_all(pool).await?;
    let tasks = rows.iter().map(task_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(filter::apply(tasks, &list_filter))
}

/// Fetch one task of the organization.
///
/// # Errors
///
/// Returns `NotFound` if the task does not exist in the organization.
pub async fn get_task(pool: &PgPool, organization_id: Uuid, task_id: Uuid) -> Result<Task, RecordError> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND organization_id = $2");
    let row = sqlx::query(&query)
        .bind(task_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("task"))?;
    task_from_row(&row)
}

/// Create a task reported by `actor`.
///
/// # Errors
///
/// Returns `Invalid` for bad input or an assignee outside the organization,
/// or a database error.
pub async fn create_task(pool: &PgPool, actor: &Profile, input: TaskInput) -> Result<Task, RecordError> {
    let task = new_task(actor, input, OffsetDateTime::now_utc())?;
    if let Some(assignee_id) = task.assignee_id {
        ensure_active_member(pool, actor.organization_id, assignee_id, "assignee_id").await?;
    }

    sqlx::query(
        "INSERT INTO tasks (id, organization_id, title, description, status, priority, assignee_id, reporter_id, \
                            due_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(task.id)
    .bind(task.organization_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(task.assignee_id)
    .bind(task.reporter_id)
    .bind(task.due_at)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(pool)
    .await?;

    info!(task_id = %task.id, organization_id = %task.organization_id, reporter_id = %actor.id, "task created");
    Ok(task)
}

/// Apply a partial update to a task the actor may modify.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, `Invalid`, or a database error.
pub async fn update_task(pool: &PgPool, actor: &Profile, task_id: Uuid, patch: TaskPatch) -> Result<Task, RecordError> {
    let current = get_task(pool, actor.organization_id, task_id).await?;
    if !access::can_modify_record(actor, current.assignee_id, current.reporter_id) {
        return Err(RecordError::Forbidden("edit this task"));
    }

    let next = apply_task_patch(&current, patch, OffsetDateTime::now_utc())?;
    if next.assignee_id != current.assignee_id {
        if let Some(assignee_id) = next.assignee_id {
            ensure_active_member(pool, actor.organization_id, assignee_id, "assignee_id").await?;
        }
    }

    sqlx::query(
        "UPDATE tasks
         SET title = $3, description = $4, status = $5, priority = $6, assignee_id = $7, due_at = $8, updated_at = $9
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(next.id)
    .bind(next.organization_id)
    .bind(&next.title)
    .bind(&next.description)
    .bind(next.status.as_str())
    .bind(next.priority.as_str())
    .bind(next.assignee_id)
    .bind(next.due_at)
    .bind(next.updated_at)
    .execute(pool)
    .await?;

    info!(%task_id, updated_by = %actor.id, status = next.status.as_str(), "task updated");
    Ok(next)
}

/// Delete a task the actor may delete.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, or a database error.
pub async fn delete_task(pool: &PgPool, actor: &Profile, task_id: Uuid) -> Result<(), RecordError> {
    let current = get_task(pool, actor.organization_id, task_id).await?;
    if !access::can_delete_record(actor, current.reporter_id) {
        return Err(RecordError::Forbidden("delete this task"));
    }

    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND organization_id = $2")
        .bind(task_id)
        .bind(actor.organization_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RecordError::NotFound("task"));
    }

    info!(%task_id, deleted_by = %actor.id, "task deleted");
    Ok(())
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
