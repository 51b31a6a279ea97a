//! Ticket service: customer support requests.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::access;
use crate::services::auth::normalize_email;
use crate::services::filter::{self, ListFilter, ListParams, Listable, SortKey, SortValue};
use crate::services::profile::Profile;
use crate::services::record::{
    Priority, RecordError, decode_enum, double_option, ensure_active_member, free_text, optional_line, parse_enum,
    required_line,
};

/// `title` sorts by subject.
pub const TICKET_SORT_KEYS: &[SortKey] = &[SortKey::CreatedAt, SortKey::UpdatedAt, SortKey::Title, SortKey::Priority];

const TICKET_COLUMNS: &str = "id, organization_id, subject, description, status, priority, customer_name, \
                              customer_email, assignee_id, reporter_id, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
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
pub struct Ticket {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub reporter_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, RecordError> {
    Ok(Ticket {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        subject: row.try_get("subject")?,
        description: row.try_get("description")?,
        status: decode_enum("ticket status", row.try_get("status")?, TicketStatus::from_str)?,
        priority: decode_enum("priority", row.try_get("priority")?, Priority::from_str)?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        assignee_id: row.try_get("assignee_id")?,
        reporter_id: row.try_get("reporter_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Listable for Ticket {
    type Status = TicketStatus;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.subject.as_str(), self.description.as_str()];
        fields.extend(self.customer_name.as_deref());
        fields.extend(self.customer_email.as_deref());
        fields
    }

    fn status(&self) -> TicketStatus {
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
            SortKey::Title => SortValue::Text(&self.subject),
            SortKey::Priority => SortValue::Rank(Some(self.priority.rank())),
            _ => SortValue::Time(Some(self.created_at)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketInput {
    pub subject: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
}

/// Blank clears the address; anything else must look like an email.
fn customer_email(value: Option<&str>) -> Result<Option<String>, RecordError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => normalize_email(raw)
            .map(Some)
            .ok_or_else(|| RecordError::Invalid("customer_email is not a valid address".to_owned())),
    }
}

pub(crate) fn new_ticket(actor: &Profile, input: TicketInput, now: OffsetDateTime) -> Result<Ticket, RecordError> {
    Ok(Ticket {
        id: Uuid::new_v4(),
        organization_id: actor.organization_id,
        subject: required_line("subject", &input.subject)?,
        description: free_text("description", input.description.as_deref().unwrap_or_default())?,
        status: match input.status.as_deref() {
            Some(raw) => parse_enum("status", raw, TicketStatus::from_str)?,
            None => TicketStatus::Open,
        },
        priority: match input.priority.as_deref() {
            Some(raw) => parse_enum("priority", raw, Priority::from_str)?,
            None => Priority::Medium,
        },
        customer_name: optional_line("customer_name", input.customer_name.as_deref())?,
        customer_email: customer_email(input.customer_email.as_deref())?,
        assignee_id: input.assignee_id,
        reporter_id: Some(actor.id),
        created_at: now,
        updated_at: now,
    })
}

pub(crate) fn apply_ticket_patch(ticket: &Ticket, patch: TicketPatch, now: OffsetDateTime) -> Result<Ticket, RecordError> {
    let mut next = ticket.clone();
    if let Some(subject) = patch.subject.as_deref() {
        next.subject = required_line("subject", subject)?;
    }
    if let Some(description) = patch.description.as_deref() {
        next.description = free_text("description", description)?;
    }
    if let Some(status) = patch.status.as_deref() {
        next.status = parse_enum("status", status, TicketStatus::from_str)?;
    }
    if let Some(priority) = patch.priority.as_deref() {
        next.priority = parse_enum("priority", priority, Priority::from_str)?;
    }
    if let Some(name) = patch.customer_name {
        next.customer_name = optional_line("customer_name", name.as_deref())?;
    }
    if let Some(email) = patch.customer_email {
        next.customer_email = customer_email(email.as_deref())?;
    }
    if let Some(assignee_id) = patch.assignee_id {
        next.assignee_id = assignee_id;
    }
    next.updated_at = now;
    Ok(next)
}

/// # Errors
///
/// Returns `Invalid` for bad list parameters or a database error.
pub async fn list_tickets(pool: &PgPool, organization_id: Uuid, params: &ListParams) -> Result<Vec<Ticket>, RecordError> {
    params.reject("tickets", &["direction", "folder"])?;
    let list_filter = ListFilter::parse(params, TicketStatus::from_str, TICKET_SORT_KEYS)?;
    let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE organization_id = $1 ORDER BY created_at DESC, id");
    let rows = sqlx::query(&query).bind(organization_id).fetch_all(pool).await?;
    let tickets = rows.iter().map(ticket_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(filter::apply(tickets, &list_filter))
}

/// # Errors
///
/// Returns `NotFound` if the ticket does not exist in the organization.
pub async fn get_ticket(pool: &PgPool, organization_id: Uuid, ticket_id: Uuid) -> Result<Ticket, RecordError> {
    let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 AND organization_id = $2");
    let row = sqlx::query(&query)
        .bind(ticket_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("ticket"))?;
    ticket_from_row(&row)
}

/// # Errors
///
/// Returns `Invalid` for bad input, or a database error.
pub async fn create_ticket(pool: &PgPool, actor: &Profile, input: TicketInput) -> Result<Ticket, RecordError> {
    let ticket = new_ticket(actor, input, OffsetDateTime::now_utc())?;
    if let Some(assignee_id) = ticket.assignee_id {
        ensure_active_member(pool, actor.organization_id, assignee_id, "assignee_id").await?;
    }

    sqlx::query(
        "INSERT INTO tickets (id, organization_id, subject, description, status, priority, customer_name,
                              customer_email, assignee_id, reporter_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(ticket.id)
    .bind(ticket.organization_id)
    .bind(&ticket.subject)
    .bind(&ticket.description)
    .bind(ticket.status.as_str())
    .bind(ticket.priority.as_str())
    .bind(&ticket.customer_name)
    .bind(&ticket.customer_email)
    .bind(ticket.assignee_id)
    .bind(ticket.reporter_id)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .execute(pool)
    .await?;

    info!(ticket_id = %ticket.id, organization_id = %ticket.organization_id, reporter_id = %actor.id, "ticket created");
    Ok(ticket)
}

/// # Errors
///
/// Returns `NotFound`, `Forbidden`, `Invalid`, or a database error.
pub async fn update_ticket(
    pool: &PgPool,
    actor: &Profile,
    ticket_id: Uuid,
    patch: TicketPatch,
) -> Result<Ticket, RecordError> {
    let current = get_ticket(pool, actor.organization_id, ticket_id).await?;
    if !access::can_modify_record(actor, current.assignee_id, current.reporter_id) {
        return Err(RecordError::Forbidden("edit this ticket"));
    }

    let next = apply_ticket_patch(&current, patch, OffsetDateTime::now_utc())?;
    if next.assignee_id != current.assignee_id {
        if let Some(assignee_id) = next.assignee_id {
            ensure_active_member(pool, actor.organization_id, assignee_id, "assignee_id").await?;
        }
    }

    sqlx::query(
        "UPDATE tickets
         SET subject = $3, description = $4, status = $5, priority = $6, customer_name = $7,
             customer_email = $8, assignee_id = $9, updated_at = $10
         WHERE id = $1 AND organization_id = $2",
    )
    .bind(next.id)
    .bind(next.organization_id)
    .bind(&next.subject)
    .bind(&next.description)
    .bind(next.status.as_str())
    .bind(next.priority.as_str())
    .bind(&next.customer_name)
    .bind(&next.customer_email)
    .bind(next.assignee_id)
    .bind(next.updated_at)
    .execute(pool)
    .await?;

    info!(%ticket_id, updated_by = %actor.id, status = next.status.as_str(), "ticket updated");
    Ok(next)
}

/// # Errors
///
/// Returns `NotFound`, `Forbidden`, or a database error.
pub async fn delete_ticket(pool: &PgPool, actor: &Profile, ticket_id: Uuid) -> Result<(), RecordError> {
    let current = get_ticket(pool, actor.organization_id, ticket_id).await?;
    if !access::can_delete_record(actor, current.reporter_id) {
        return Err(RecordError::Forbidden("delete this ticket"));
    }

    let result = sqlx::query("DELETE FROM tickets WHERE id = $1 AND organization_id = $2")
        .bind(ticket_id)
        .bind(actor.organization_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RecordError::NotFound("ticket"));
    }

    info!(%ticket_id, deleted_by = %actor.id, "ticket deleted");
    Ok(())
}

#[cfg(test)]
#[path = "ticket_test.rs"]
mod tests;
