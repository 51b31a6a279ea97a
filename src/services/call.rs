//! Call log service.
//!
//! Calls have no reporter. The assignee is the agent handling the call and
//! defaults to the caller on create, so ownership checks run against the
//! assignee alone and only staff may delete a call.

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
    RecordError, decode_enum, double_option, ensure_active_member, free_text, optional_line, parse_enum,
    parse_optional_timestamp, required_line,
};

/// `title` sorts by contact name.
pub const CALL_SORT_KEYS: &[SortKey] = &[SortKey::CreatedAt, SortKey::UpdatedAt, SortKey::Title, SortKey::ScheduledAt];

const MAX_PHONE_LEN: usize = 32;

const CALL_COLUMNS: &str = "id, organization_id, contact_name, phone_number, direction, status, duration_seconds, \
                            notes, assignee_id, scheduled_at, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Scheduled,
    Completed,
    Missed,
    Cancelled,
}

impl CallStatus {
    pub const ALL: [CallStatus; 4] = [Self::Scheduled, Self::Completed, Self::Missed, Self::Cancelled];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Missed => "missed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|status| status.as_str() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub contact_name: String,
    pub phone_number: Option<String>,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub duration_seconds: i32,
    pub notes: String,
    pub assignee_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn call_from_row(row: &PgRow) -> Result<Call, RecordError> {
    Ok(Call {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        contact_name: row.try_get("contact_name")?,
        phone_number: row.try_get("phone_number")?,
        direction: decode_enum("call direction", row.try_get("direction")?, CallDirection::from_str)?,
        status: decode_enum("call status", row.try_get("status")?, CallStatus::from_str)?,
        duration_seconds: row.try_get("duration_seconds")?,
        notes: row.try_get("notes")?,
        assignee_id: row.try_get("assignee_id")?,
        scheduled_at: row.try_get("scheduled_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Listable for Call {
    type Status = CallStatus;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.contact_name.as_str(), self.notes.as_str()];
        fields.extend(self.phone_number.as_deref());
        fields
    }

    fn status(&self) -> CallStatus {
        self.status
    }

    fn assignee_id(&self) -> Option<Uuid> {
        self.assignee_id
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::UpdatedAt => SortValue::Time(Some(self.updated_at)),
            SortKey::Title => SortValue::Text(&self.contact_name),
            SortKey::ScheduledAt => SortValue::Time(self.scheduled_at),
            _ => SortValue::Time(Some(self.created_at)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallInput {
    pub contact_name: String,
    pub phone_number: Option<String>,
    pub direction: Option<String>,
    pub status: Option<String>,
    pub duration_seconds: Option<i32>,
    pub notes: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallPatch {
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    pub direction: Option<String>,
    pub status: Option<String>,
    pub duration_seconds: Option<i32>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_at: Option<Option<String>>,
}

fn duration(value: i32) -> Result<i32, RecordError> {
    if value < 0 {
        return Err(RecordError::Invalid("duration_seconds must be zero or greater".to_owned()));
    }
    Ok(value)
}

fn phone_number(value: Option<&str>) -> Result<Option<String>, RecordError> {
    let Some(phone) = optional_line("phone_number", value)? else {
        return Ok(None);
    };
    let well_formed = phone.len() <= MAX_PHONE_LEN
        && phone.chars().any(|c| c.is_ascii_digit())
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
    if !well_formed {
        return Err(RecordError::Invalid("phone_number is not a valid phone number".to_owned()));
    }
    Ok(Some(phone))
}

pub(crate) fn new_call(actor: &Profile, input: CallInput, now: OffsetDateTime) -> Result<Call, RecordError> {
    Ok(Call {
        id: Uuid::new_v4(),
        organization_id: actor.organization_id,
        contact_name: required_line("contact_name", &input.contact_name)?,
        phone_number: phone_number(input.phone_number.as_deref())?,
        direction: match input.direction.as_deref() {
            Some(raw) => parse_enum("direction", raw, CallDirection::from_str)?,
            None => CallDirection::Outbound,
        },
        status: match input.status.as_deref() {
            Some(raw) => parse_enum("status", raw, CallStatus::from_str)?,
            None => CallStatus::Scheduled,
        },
        duration_seconds: duration(input.duration_seconds.unwrap_or(0))?,
        notes: free_text("notes", input.notes.as_deref().unwrap_or_default())?,
        assignee_id: Some(input.assignee_id.unwrap_or(actor.id)),
        scheduled_at: parse_optional_timestamp("scheduled_at", input.scheduled_at.as_deref())?,
        created_at: now,
        updated_at: now,
    })
}

pub(crate) fn apply_call_patch(call: &Call, patch: CallPatch, now: OffsetDateTime) -> Result<Call, RecordError> {
    let mut next = call.clone();
    if let Some(name) = patch.contact_name.as_deref() {
        next.contact_name = required_line("contact_name", name)?;
    }
    if let Some(phone) = patch.phone_number {
        next.phone_number = phone_number(phone.as_deref())?;
    }
    if let Some(direction) = patch.direction.as_deref() {
        next.direction = parse_enum("direction", direction, CallDirection::from_str)?;
    }
    if let Some(status) = patch.status.as_deref() {
        next.status = parse_enum("status", status, CallStatus::from_str)?;
    }
    if let Some(seconds) = patch.duration_seconds {
        next.duration_seconds = duration(seconds)?;
    }
    if let Some(notes) = patch.notes.as_deref() {
        next.notes = free_text("notes", notes)?;
    }
    if let Some(assignee_id) = patch.assignee_id {
        next.assignee_id = assignee_id;
    }
    if let Some(scheduled_at) = patch.scheduled_at {
        next.scheduled_at = parse_optional_timestamp("scheduled_at", scheduled_at.as_deref())?;
    }
    next.updated_at = now;
    Ok(next)
}

/// List calls. Besides the shared filters, `direction` narrows by
/// inbound/outbound. Calls carry no priority, so a `priority` filter is
/// rejected.
///
/// # Errors
///
/// Returns `Invalid` for bad list parameters or a database error.
pub async fn list_calls(pool: &PgPool, organization_id: Uuid, params: &ListParams) -> Result<Vec<Call>, RecordError> {
    params.reject("calls", &["priority", "folder"])?;
    let list_filter = ListFilter::parse(params, CallStatus::from_str, CALL_SORT_KEYS)?;
    let direction = params
        .direction
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|raw| parse_enum("direction", raw, CallDirection::from_str))
        .transpose()?;

    let query = format!("SELECT {CALL_COLUMNS} FROM calls WHERE organization_id = $1 ORDER BY created_at DESC, id");
    let rows = sqlx::query(&query).bind(organization_id).fetch_all(pool).await?;
    let mut calls = rows.iter().map(call_from_row).collect::<Result<Vec<_>, _>>()?;
    if let Some(direction) = direction {
        calls.retain(|call| call.direction == direction);
    }
    Ok(filter::apply(calls, &list_filter))
}

/// # Errors
///
/// Returns `NotFound` if the call does not exist in the organization.
pub async fn get_call(pool: &PgPool, organization_id: Uuid, call_id: Uuid) -> Result<Call, RecordError> {
    let query = format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = $1 AND organization_id = $2");
    let row = sqlx::query(&query)
        .bind(call_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("call"))?;
    call_from_row(&row)
}

/// # Errors
///
/// Returns `Invalid` for bad input, or a database error.
pub async fn create_call(pool: &PgPool, actor: &Profile, input: CallInput) -> Result<Call, RecordError> {
    let call = new_call(actor, input, OffsetDateTime::now_utc())?;
    if let Some(assignee_id) = call.assignee_id.filter(|id| *id != actor.id) {
        ensure_active_member(pool, actor.organization_id, assignee_id, "assignee_id").await?;
    }

    sqlx::query(
        "INSERT INTO calls (id, organization_id, contact_name, phone_number, direction, status, duration_seconds,
                            notes, assignee_id, scheduled_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(call.id)
    .bind(call.organization_id)
    .bind(&call.contact_name)
    .bind(&call.phone_number)
    .bind(call.direction.as_str())
    .bind(call.status.as_str())
    .bind(call.duration_seconds)
    .bind(&call.notes)
    .bind(call.assignee_id)
    .bind(call.scheduled_at)
    .bind(call.created_at)
    .bind(call.updated_at)
    .execute(pool)
    .await?;

    info!(call_id = %call.id, organization_id = %call.organization_id, direction = call.direction.as_str(), "call logged");
    Ok(call)
}

/// # Errors
///
/// Returns `NotFound`, `Forbidden`, `Invalid`, or a database error.
pub async fn update_call(pool: &PgPool, actor: &Profile, call_id: Uuid, patch: CallPatch) -> Result<Call, RecordError> {
    let current = get_call(pool, actor.organization_id, call_id).await?;
    if !access::can_modify_record(actor, current.assignee_id, None) {
        return Err(RecordError::Forbidden("edit this call"));
    }

    let next = apply_call_patch(&current, patch, OffsetDateTime::now_utc())?;
    if next.assignee_id != current.assignee_id {
        if let Some(assignee_id) = next.assignee_id {
            ensure_active_member(pool, actor.organization_id, assignee_id, "assignee_id").await?;
        }
    }

    sqlx::query(
        "UPDATE calls
         SET contact_name = $3, phone_number = $4, direction = $5, status = $6, duration_seconds = $7,
             notes = $8, assignee_id = $9, scheduled_at = $10, updated_at = $11
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(next.id)
    .bind(next.organization_id)
    .bind(&next.contact_name)
    .bind(&next.phone_number)
    .bind(next.direction.as_str())
    .bind(next.status.as_str())
    .bind(next.duration_seconds)
    .bind(&next.notes)
    .bind(next.assignee_id)
    .bind(next.scheduled_at)
    .bind(next.updated_at)
    .execute(pool)
    .await?;

    info!(%call_id, updated_by = %actor.id, status = next.status.as_str(), "call updated");
    Ok(next)
}

/// # Errors
///
/// Returns `NotFound`, `Forbidden`, or a database error.
pub async fn delete_call(pool: &PgPool, actor: &Profile, call_id: Uuid) -> Result<(), RecordError> {
    get_call(pool, actor.organization_id, call_id).await?;
    if !access::can_delete_record(actor, None) {
        return Err(RecordError::Forbidden("delete this call"));
    }

    let result = sqlx::query("DELETE FROM calls WHERE id = $1 AND organization_id = $2")
        .bind(call_id)
        .bind(actor.organization_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RecordError::NotFound("call"));
    }

    info!(%call_id, deleted_by = %actor.id, "call deleted");
    Ok(())
}

#[cfg(test)]
#[path = "call_test.rs"]
mod tests;
