use super::*;
use crate::services::access::Role;
use crate::state::test_helpers::{dummy_profile, test_app_state};
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2026-03-01 12:00 UTC);

fn input(title: &str) -> TaskInput {
    TaskInput { title: title.into(), ..TaskInput::default() }
}

fn sample_task(reporter: &Profile) -> Task {
    new_task(reporter, input("Ship release notes"), NOW).unwrap()
}

// =============================================================================
// Status
// =============================================================================

#[test]
fn task_status_round_trips_strings() {
    for status in TaskStatus::ALL {
        assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(TaskStatus::from_str(" In_Progress "), Some(TaskStatus::InProgress));
    assert_eq!(TaskStatus::from_str("blocked"), None);
}

#[test]
fn only_done_is_closed() {
    assert!(TaskStatus::Todo.is_open());
    assert!(TaskStatus::Review.is_open());
    assert!(!TaskStatus::Done.is_open());
}

// =============================================================================
// new_task
// =============================================================================

#[test]
fn new_task_applies_defaults() {
    let reporter = dummy_profile(Role::Member);
    let task = sample_task(&reporter);
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.reporter_id, Some(reporter.id));
    assert_eq!(task.organization_id, reporter.organization_id);
    assert_eq!(task.created_at, NOW);
    assert_eq!(task.updated_at, NOW);
    assert!(task.description.is_empty());
}

#[test]
fn new_task_trims_title_and_parses_fields() {
    let reporter = dummy_profile(Role::Member);
    let task = new_task(
        &reporter,
        TaskInput {
            title: "  Renew certificates ".into(),
            status: Some("review".into()),
            priority: Some("URGENT".into()),
            due_at: Some("2026-03-05T09:00:00Z".into()),
            ..TaskInput::default()
        },
        NOW,
    )
    .unwrap();
    assert_eq!(task.title, "Renew certificates");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.priority, Priority::Urgent);
    assert_eq!(task.due_at, Some(datetime!(2026-03-05 09:00 UTC)));
}

#[test]
fn new_task_rejects_blank_or_long_title() {
    let reporter = dummy_profile(Role::Member);
    assert_eq!(new_task(&reporter, input("   "), NOW).unwrap_err().to_string(), "title is required");
    assert!(new_task(&reporter, input(&"x".repeat(201)), NOW).is_err());
}

#[test]
fn new_task_rejects_unknown_enums_and_bad_dates() {
    let reporter = dummy_profile(Role::Member);
    let bad_status = TaskInput { status: Some("blocked".into()), ..input("t") };
    assert_eq!(new_task(&reporter, bad_status, NOW).unwrap_err().to_string(), "unknown status: \"blocked\"");
    let bad_due = TaskInput { due_at: Some("tomorrow".into()), ..input("t") };
    assert!(matches!(new_task(&reporter, bad_due, NOW), Err(RecordError::Invalid(_))));
}

// =============================================================================
// apply_task_patch
// =============================================================================

#[test]
fn patch_changes_only_given_fields() {
    let reporter = dummy_profile(Role::Member);
    let task = sample_task(&reporter);
    let later = datetime!(2026-03-02 08:00 UTC);
    let patch = TaskPatch { status: Some("done".into()), ..TaskPatch::default() };
    let next = apply_task_patch(&task, patch, later).unwrap();
    assert_eq!(next.status, TaskStatus::Done);
    assert_eq!(next.title, task.title);
    assert_eq!(next.created_at, task.created_at);
    assert_eq!(next.updated_at, later);
}

#[test]
fn patch_clears_nullable_fields_on_explicit_null() {
    let reporter = dummy_profile(Role::Member);
    let mut task = sample_task(&reporter);
    task.assignee_id = Some(reporter.id);
    task.due_at = Some(NOW);

    let patch: TaskPatch = serde_json::from_str(r#"{"assignee_id":null,"due_at":null}"#).unwrap();
    let next = apply_task_patch(&task, patch, NOW).unwrap();
    assert_eq!(next.assignee_id, None);
    assert_eq!(next.due_at, None);

    let untouched: TaskPatch = serde_json::from_str(r#"{"title":"Renamed"}"#).unwrap();
    let next = apply_task_patch(&task, untouched, NOW).unwrap();
    assert_eq!(next.assignee_id, Some(reporter.id));
    assert_eq!(next.title, "Renamed");
}

#[test]
fn patch_rejects_blank_title() {
    let reporter = dummy_profile(Role::Member);
    let task = sample_task(&reporter);
    let patch = TaskPatch { title: Some(" ".into()), ..TaskPatch::default() };
    assert!(apply_task_patch(&task, patch, NOW).is_err());
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn list_filter_by_status_and_priority_sorting() {
    let reporter = dummy_profile(Role::Member);
    let mut low = new_task(&reporter, TaskInput { priority: Some("low".into()), ..input("Low") }, NOW).unwrap();
    low.status = TaskStatus::Done;
    let high = new_task(&reporter, TaskInput { priority: Some("high".into()), ..input("High") }, NOW).unwrap();
    let urgent = new_task(&reporter, TaskInput { priority: Some("urgent".into()), ..input("Urgent") }, NOW).unwrap();

    let params = ListParams { sort: Some("priority".into()), ..ListParams::default() };
    let filter = ListFilter::parse(&params, TaskStatus::from_str, TASK_SORT_KEYS).unwrap();
    let titles: Vec<String> = filter::apply(vec![low.clone(), high.clone(), urgent.clone()], &filter)
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, ["Urgent", "High", "Low"]);

    let params = ListParams { status: Some("done".into()), ..ListParams::default() };
    let filter = ListFilter::parse(&params, TaskStatus::from_str, TASK_SORT_KEYS).unwrap();
    let done = filter::apply(vec![low, high, urgent], &filter);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].title, "Low");
}

#[test]
fn list_rejects_scheduled_at_sort() {
    let params = ListParams { sort: Some("scheduled_at".into()), ..ListParams::default() };
    assert!(ListFilter::parse(&params, TaskStatus::from_str, TASK_SORT_KEYS).is_err());
}

#[test]
fn task_serializes_enums_and_times() {
    let reporter = dummy_profile(Role::Member);
    let mut task = sample_task(&reporter);
    task.status = TaskStatus::InProgress;
    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["priority"], "medium");
    assert_eq!(json["due_at"], serde_json::Value::Null);
    assert_eq!(json["created_at"], "2026-03-01T12:00:00Z");
}

// =============================================================================
// Service entry points that fail before the database
// =============================================================================

#[tokio::test]
async fn list_tasks_validates_params_first() {
    let state = test_app_state();
    let params = ListParams { order: Some("sideways".into()), ..ListParams::default() };
    let err = list_tasks(&state.pool, Uuid::new_v4(), &params).await.unwrap_err();
    assert!(matches!(err, RecordError::Invalid(_)));

    let params = ListParams { direction: Some("outbound".into()), ..ListParams::default() };
    let err = list_tasks(&state.pool, Uuid::new_v4(), &params).await.unwrap_err();
    assert_eq!(err.to_string(), "tasks cannot be filtered by direction");
}

#[tokio::test]
async fn create_task_validates_input_first() {
    let state = test_app_state();
    let reporter = dummy_profile(Role::Member);
    let err = create_task(&state.pool, &reporter, input("")).await.unwrap_err();
    assert!(matches!(err, RecordError::Invalid(_)));
}

// =============================================================================
// Live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn task_lifecycle_against_live_db() {
    let pool = crate::state::test_helpers::live_pool().await;
    let (organization_id, member) = crate::state::test_helpers::seed_live_org(&pool, Role::Member).await;

    let created = create_task(
        &pool,
        &member,
        TaskInput { assignee_id: Some(member.id), ..input("Live task") },
    )
    .await
    .unwrap();

    let listed = list_tasks(&pool, organization_id, &ListParams::default()).await.unwrap();
    assert!(listed.iter().any(|t| t.id == created.id));

    let patch = TaskPatch { status: Some("in_progress".into()), ..TaskPatch::default() };
    let updated = update_task(&pool, &member, created.id, patch).await.unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);

    let stranger = TaskPatch { assignee_id: Some(Some(Uuid::new_v4())), ..TaskPatch::default() };
    assert!(matches!(update_task(&pool, &member, created.id, stranger).await, Err(RecordError::Invalid(_))));

    delete_task(&pool, &member, created.id).await.unwrap();
    assert!(matches!(get_task(&pool, organization_id, created.id).await, Err(RecordError::NotFound("task"))));
}
