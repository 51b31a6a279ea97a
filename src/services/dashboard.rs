//! Dashboard summary: per-status counts for the entity modules the caller
//! can open, plus a few personal counters.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::access::{self, ModuleGrant, ModuleKey};
use crate::services::call::CallStatus;
use crate::services::profile::Profile;
use crate::services::record::RecordError;
use crate::services::task::TaskStatus;
use crate::services::ticket::TicketStatus;

pub type StatusCounts = BTreeMap<&'static str, i64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<StatusCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickets: Option<StatusCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calls: Option<StatusCounts>,
    /// Open tasks assigned to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_open_tasks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_messages: Option<i64>,
}

/// Fold `(status, count)` rows into a map with every known status present.
/// Rows for statuses outside `known` are dropped.
pub(crate) fn fold_counts(known: &[&'static str], rows: Vec<(String, i64)>) -> StatusCounts {
    let mut counts: StatusCounts = known.iter().map(|status| (*status, 0)).collect();
    for (status, count) in rows {
        if let Some(slot) = counts.get_mut(status.as_str()) {
            *slot += count;
        }
    }
    counts
}

async fn count_by_status(
    pool: &PgPool,
    table: &'static str,
    organization_id: Uuid,
) -> Result<Vec<(String, i64)>, RecordError> {
    let query = format!("SELECT status, COUNT(*) AS n FROM {table} WHERE organization_id = $1 GROUP BY status");
    let rows = sqlx::query(&query).bind(organization_id).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<(String, i64), RecordError> { Ok((row.try_get("status")?, row.try_get("n")?)) })
        .collect()
}

/// Build the summary for `actor`. Sections for modules the actor cannot open
/// are left out.
///
/// # Errors
///
/// Returns a database error if any count query fails.
pub async fn summary(pool: &PgPool, actor: &Profile, grants: &[ModuleGrant]) -> Result<DashboardSummary, RecordError> {
    let can = |key| access::can_access_module(actor, key, grants);
    let org = actor.organization_id;
    let mut out = DashboardSummary::default();

    if can(ModuleKey::Tasks) {
        let known = TaskStatus::ALL.map(TaskStatus::as_str);
        out.tasks = Some(fold_counts(&known, count_by_status(pool, "tasks", org).await?));

        let open: Vec<&str> = TaskStatus::ALL.into_iter().filter(|s| s.is_open()).map(TaskStatus::as_str).collect();
        let mine: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE organization_id = $1 AND assignee_id = $2 AND status = ANY($3)",
        )
        .bind(org)
        .bind(actor.id)
        .bind(&open)
        .fetch_one(pool)
        .await?;
        out.my_open_tasks = Some(mine);
    }
    if can(ModuleKey::Tickets) {
        let known = TicketStatus::ALL.map(TicketStatus::as_str);
        out.tickets = Some(fold_counts(&known, count_by_status(pool, "tickets", org).await?));
    }
    if can(ModuleKey::Calls) {
        let known = CallStatus::ALL.map(CallStatus::as_str);
        out.calls = Some(fold_counts(&known, count_by_status(pool, "calls", org).await?));
    }
    if can(ModuleKey::Messages) {
        let unread: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE organization_id = $1 AND recipient_id = $2 AND status = 'unread'",
        )
        .bind(org)
        .bind(actor.id)
        .fetch_one(pool)
        .await?;
        out.unread_messages = Some(unread);
    }

    Ok(out)
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
