//! Direct messages between members of one organization.
//!
//! A message is visible only to its sender and recipient. Anyone else gets
//! `NotFound`, never `Forbidden`.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::filter::{self, ListFilter, ListParams, Listable, SortKey, SortValue};
use crate::services::profile::Profile;
use crate::services::record::{MAX_LINE_LEN, MAX_TEXT_LEN, RecordError, decode_enum, ensure_active_member, parse_enum};

/// `title` sorts by subject.
pub const MESSAGE_SORT_KEYS: &[SortKey] = &[SortKey::CreatedAt, SortKey::Title];

const MESSAGE_COLUMNS: &str = "id, organization_id, sender_id, recipient_id, subject, body, status, created_at, read_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
    Archived,
}

impl MessageStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Archived => "archived",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Folder {
    #[default]
    Inbox,
    Sent,
    All,
}

impl Folder {
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "sent" => Some(Self::Sent),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn includes(self, message: &Message, profile_id: Uuid) -> bool {
        match self {
            Self::Inbox => message.recipient_id == profile_id,
            Self::Sent => message.sender_id == profile_id,
            Self::All => message.recipient_id == profile_id || message.sender_id == profile_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub status: MessageStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
}

impl Message {
    fn involves(&self, profile_id: Uuid) -> bool {
        self.sender_id == profile_id || self.recipient_id == profile_id
    }
}

fn message_from_row(row: &PgRow) -> Result<Message, RecordError> {
    Ok(Message {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        sender_id: row.try_get("sender_id")?,
        recipient_id: row.try_get("recipient_id")?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        status: decode_enum("message status", row.try_get("status")?, MessageStatus::from_str)?,
        created_at: row.try_get("created_at")?,
        read_at: row.try_get("read_at")?,
    })
}

impl Listable for Message {
    type Status = MessageStatus;

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.subject, &self.body]
    }

    fn status(&self) -> MessageStatus {
        self.status
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::Title => SortValue::Text(&self.subject),
            _ => SortValue::Time(Some(self.created_at)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    pub recipient_id: Uuid,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub(crate) fn compose(sender: &Profile, input: NewMessage, now: OffsetDateTime) -> Result<Message, RecordError> {
    if input.recipient_id == sender.id {
        return Err(RecordError::Invalid("you cannot send a message to yourself".to_owned()));
    }
    let subject = input.subject.as_deref().map(str::trim).unwrap_or_default();
    if subject.chars().count() > MAX_LINE_LEN {
        return Err(RecordError::Invalid(format!("subject must be at most {MAX_LINE_LEN} characters")));
    }
    if input.body.trim().is_empty() {
        return Err(RecordError::Invalid("body is required".to_owned()));
    }
    if input.body.chars().count() > MAX_TEXT_LEN {
        return Err(RecordError::Invalid(format!("body must be at most {MAX_TEXT_LEN} characters")));
    }

    Ok(Message {
        id: Uuid::new_v4(),
        organization_id: sender.organization_id,
        sender_id: sender.id,
        recipient_id: input.recipient_id,
        subject: subject.to_owned(),
        body: input.body,
        status: MessageStatus::Unread,
        created_at: now,
        read_at: None,
    })
}

/// `read_at` records the first time the recipient read the message and is
/// never moved or cleared afterwards.
pub(crate) fn read_at_after(current: Option<OffsetDateTime>, status: MessageStatus, now: OffsetDateTime) -> Option<OffsetDateTime> {
    match (current, status) {
        (None, MessageStatus::Read) => Some(now),
        (current, _) => current,
    }
}

/// List the caller's messages in one folder (`inbox` by default).
///
/// # Errors
///
/// Returns `Invalid` for bad list parameters or a database error.
pub async fn list_messages(pool: &PgPool, actor: &Profile, params: &ListParams) -> Result<Vec<Message>, RecordError> {
    params.reject("messages", &["priority", "assignee_id", "direction"])?;
    let list_filter = ListFilter::parse(params, MessageStatus::from_str, MESSAGE_SORT_KEYS)?;
    let folder = match params.folder.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Folder::default(),
        Some(raw) => parse_enum("folder", raw, Folder::from_str)?,
    };

    let query = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE organization_id = $1 AND (sender_id = $2 OR recipient_id = $2)
         ORDER BY created_at DESC, id"
    );
    let rows = sqlx::query(&query)
        .bind(actor.organization_id)
        .bind(actor.id)
        .fetch_all(pool)
        .await?;
    let mut messages = rows.iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;
    messages.retain(|message| folder.includes(message, actor.id));
    Ok(filter::apply(messages, &list_filter))
}

/// # Errors
///
/// Returns `NotFound` unless the caller sent or received the message.
pub async fn get_message(pool: &PgPool, actor: &Profile, message_id: Uuid) -> Result<Message, RecordError> {
    let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 AND organization_id = $2");
    let row = sqlx::query(&query)
        .bind(message_id)
        .bind(actor.organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RecordError::NotFound("message"))?;
    let message = message_from_row(&row)?;
    if !message.involves(actor.id) {
        return Err(RecordError::NotFound("message"));
    }
    Ok(message)
}

/// # Errors
///
/// Returns `Invalid` for an empty body, a self-addressed message, or a
/// recipient that is not an active member; otherwise a database error.
pub async fn send_message(pool: &PgPool, actor: &Profile, input: NewMessage) -> Result<Message, RecordError> {
    let message = compose(actor, input, OffsetDateTime::now_utc())?;
    ensure_active_member(pool, actor.organization_id, message.recipient_id, "recipient_id").await?;

    sqlx::query(
        "INSERT INTO messages (id, organization_id, sender_id, recipient_id, subject, body, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(message.id)
    .bind(message.organization_id)
    .bind(message.sender_id)
    .bind(message.recipient_id)
    .bind(&message.subject)
    .bind(&message.body)
    .bind(message.status.as_str())
    .bind(message.created_at)
    .execute(pool)
    .await?;

    info!(message_id = %message.id, sender_id = %message.sender_id, recipient_id = %message.recipient_id, "message sent");
    Ok(message)
}

/// Mark a message read, unread or archived. Recipient only.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden` for the sender, `Invalid` for an unknown
/// status, or a database error.
pub async fn set_message_status(
    pool: &PgPool,
    actor: &Profile,
    message_id: Uuid,
    update: StatusUpdate,
) -> Result<Message, RecordError> {
    let status = parse_enum("status", &update.status, MessageStatus::from_str)?;
    let mut message = get_message(pool, actor, message_id).await?;
    if message.recipient_id != actor.id {
        return Err(RecordError::Forbidden("change the status of a message you did not receive"));
    }

    message.read_at = read_at_after(message.read_at, status, OffsetDateTime::now_utc());
    message.status = status;

    sqlx::query("UPDATE messages SET status = $3, read_at = $4 WHERE id = $1 AND organization_id = $2")
        .bind(message.id)
        .bind(message.organization_id)
        .bind(message.status.as_str())
        .bind(message.read_at)
        .execute(pool)
        .await?;

    info!(%message_id, status = status.as_str(), "message status changed");
    Ok(message)
}

/// # Errors
///
/// Returns `NotFound` unless the caller sent or received the message.
pub async fn delete_message(pool: &PgPool, actor: &Profile, message_id: Uuid) -> Result<(), RecordError> {
    get_message(pool, actor, message_id).await?;

    let result = sqlx::query("DELETE FROM messages WHERE id = $1 AND organization_id = $2")
        .bind(message_id)
        .bind(actor.organization_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RecordError::NotFound("message"));
    }

    info!(%message_id, deleted_by = %actor.id, "message deleted");
    Ok(())
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
