//! In-memory list filtering and sorting.
//!
//! DESIGN
//! ======
//! List endpoints fetch an organization's rows once and narrow them here:
//! substring search, enum matches, assignee match, then a stable sort and
//! an optional cap. Per-tenant lists are small, so this stays simple and is
//! fully testable without a database.
//!
//! Nulls always sort last, whichever direction is requested.

use std::cmp::Ordering;

use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::record::{Priority, RecordError, parse_enum};

/// Upper bound for the `limit` query parameter.
pub const MAX_LIST_LIMIT: usize = 500;

// =============================================================================
// RAW PARAMETERS
// =============================================================================

/// Query-string parameters accepted by every list endpoint. Each entity
/// rejects the fields that do not apply to it via [`ListParams::reject`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub direction: Option<String>,
    pub assignee_id: Option<String>,
    pub folder: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<usize>,
}

impl ListParams {
    /// Fail on any of `fields` that is set, so filters an entity lacks are
    /// reported instead of silently matching nothing.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` naming the first unsupported field present.
    pub fn reject(&self, entity: &str, fields: &[&str]) -> Result<(), RecordError> {
        for &field in fields {
            let value = match field {
                "priority" => &self.priority,
                "direction" => &self.direction,
                "assignee_id" => &self.assignee_id,
                "folder" => &self.folder,
                _ => continue,
            };
            if non_blank(value.as_ref()).is_some() {
                return Err(RecordError::Invalid(format!("{entity} cannot be filtered by {field}")));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TYPED FILTER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    Title,
    Priority,
    DueAt,
    ScheduledAt,
}

impl SortKey {
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            "title" => Some(Self::Title),
            "priority" => Some(Self::Priority),
            "due_at" => Some(Self::DueAt),
            "scheduled_at" => Some(Self::ScheduledAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    Any,
    Unassigned,
    Profile(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter<S> {
    /// Lowercased search needle.
    pub search: Option<String>,
    pub status: Option<S>,
    pub priority: Option<Priority>,
    pub assignee: AssigneeFilter,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl<S> Default for ListFilter<S> {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            priority: None,
            assignee: AssigneeFilter::Any,
            sort: SortKey::CreatedAt,
            order: SortOrder::Desc,
            limit: None,
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).map(str::trim).filter(|v| !v.is_empty())
}

impl<S> ListFilter<S> {
    /// Validate raw parameters against an entity's status parser and the sort
    /// keys it supports.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for unknown enum values, unsupported sort keys,
    /// malformed assignee ids, or an out-of-range limit.
    pub fn parse(
        params: &ListParams,
        parse_status: fn(&str) -> Option<S>,
        sort_keys: &[SortKey],
    ) -> Result<Self, RecordError> {
        let search = non_blank(params.q.as_ref()).map(str::to_lowercase);

        let status = non_blank(params.status.as_ref())
            .map(|raw| parse_enum("status", raw, parse_status))
            .transpose()?;

        let priority = non_blank(params.priority.as_ref())
            .map(|raw| parse_enum("priority", raw, Priority::from_str))
            .transpose()?;

        let assignee = match non_blank(params.assignee_id.as_ref()) {
            None => AssigneeFilter::Any,
            Some(raw) if raw.eq_ignore_ascii_case("unassigned") => AssigneeFilter::Unassigned,
            Some(raw) => Uuid::parse_str(raw)
                .map(AssigneeFilter::Profile)
                .map_err(|_| RecordError::Invalid(format!("assignee_id is not a valid id: {raw:?}")))?,
        };

        let sort = match non_blank(params.sort.as_ref()) {
            None => SortKey::CreatedAt,
            Some(raw) => SortKey::from_str(raw)
                .filter(|key| sort_keys.contains(key))
                .ok_or_else(|| RecordError::Invalid(format!("cannot sort by {raw:?}")))?,
        };

        let order = match non_blank(params.order.as_ref()).map(str::to_ascii_lowercase).as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => return Err(RecordError::Invalid(format!("order must be asc or desc, got {other:?}"))),
        };

        let limit = match params.limit {
            None => None,
            Some(0) => return Err(RecordError::Invalid("limit must be at least 1".to_owned())),
            Some(n) => Some(n.min(MAX_LIST_LIMIT)),
        };

        Ok(Self { search, status, priority, assignee, sort, order, limit })
    }
}

// =============================================================================
// LISTABLE ROWS
// =============================================================================

/// A comparable value extracted from a row for sorting.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    Time(Option<OffsetDateTime>),
    Text(&'a str),
    Rank(Option<u8>),
}

/// Row types that list endpoints can filter and sort in memory.
pub trait Listable {
    type Status: Copy + PartialEq;

    /// Text fields searched by `q`.
    fn search_fields(&self) -> Vec<&str>;
    fn status(&self) -> Self::Status;
    fn priority(&self) -> Option<Priority> {
        None
    }
    fn assignee_id(&self) -> Option<Uuid> {
        None
    }
    fn sort_value(&self, key: SortKey) -> SortValue<'_>;
}

fn matches<T: Listable>(row: &T, filter: &ListFilter<T::Status>) -> bool {
    if let Some(needle) = filter.search.as_deref() {
        let hit = row
            .search_fields()
            .into_iter()
            .any(|field| field.to_lowercase().contains(needle));
        if !hit {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if row.status() != status {
            return false;
        }
    }
    if let Some(priority) = filter.priority {
        if row.priority() != Some(priority) {
            return false;
        }
    }
    match filter.assignee {
        AssigneeFilter::Any => true,
        AssigneeFilter::Unassigned => row.assignee_id().is_none(),
        AssigneeFilter::Profile(id) => row.assignee_id() == Some(id),
    }
}

fn compare_options<V: Ord>(a: Option<V>, b: Option<V>, order: SortOrder) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
    }
}

pub(crate) fn compare_values(a: &SortValue<'_>, b: &SortValue<'_>, order: SortOrder) -> Ordering {
    match (a, b) {
        (SortValue::Time(a), SortValue::Time(b)) => compare_options(*a, *b, order),
        (SortValue::Rank(a), SortValue::Rank(b)) => compare_options(*a, *b, order),
        (SortValue::Text(a), SortValue::Text(b)) => {
            let a = Some(a.to_lowercase()).filter(|v| !v.is_empty());
            let b = Some(b.to_lowercase()).filter(|v| !v.is_empty());
            compare_options(a, b, order)
        }
        _ => Ordering::Equal,
    }
}

/// Filter, sort and cap `rows`.
#[must_use]
pub fn apply<T: Listable>(rows: Vec<T>, filter: &ListFilter<T::Status>) -> Vec<T> {
    let mut kept: Vec<T> = rows.into_iter().filter(|row| matches(row, filter)).collect();
    kept.sort_by(|a, b| compare_values(&a.sort_value(filter.sort), &b.sort_value(filter.sort), filter.order));
    if let Some(limit) = filter.limit {
        kept.truncate(limit);
    }
    kept
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
