use super::*;
use crate::services::access::Role;
use crate::state::test_helpers::{dummy_profile, test_app_state};

#[test]
fn fold_counts_fills_missing_statuses_with_zero() {
    let known = TaskStatus::ALL.map(TaskStatus::as_str);
    let counts = fold_counts(&known, vec![("todo".into(), 3), ("done".into(), 1), ("bogus".into(), 9)]);
    assert_eq!(counts.len(), 4);
    assert_eq!(counts["todo"], 3);
    assert_eq!(counts["in_progress"], 0);
    assert_eq!(counts["done"], 1);
    assert!(!counts.contains_key("bogus"));
}

#[test]
fn empty_summary_serializes_to_empty_object() {
    let json = serde_json::to_value(DashboardSummary::default()).unwrap();
    assert_eq!(json, serde_json::json!({}));
}

#[tokio::test]
async fn summary_without_grants_skips_every_query() {
    let state = test_app_state();
    let member = dummy_profile(Role::Member);
    let summary = summary(&state.pool, &member, &[]).await.unwrap();
    assert_eq!(summary, DashboardSummary::default());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn summary_counts_against_live_db() {
    use crate::services::task::{TaskInput, create_task};

    let pool = crate::state::test_helpers::live_pool().await;
    let (_, member) = crate::state::test_helpers::seed_live_org(&pool, Role::Member).await;
    create_task(&pool, &member, TaskInput { title: "Mine".into(), assignee_id: Some(member.id), ..TaskInput::default() })
        .await
        .unwrap();

    let grants = crate::services::module::load_grants(&pool, member.organization_id).await.unwrap();
    let summary = summary(&pool, &member, &grants).await.unwrap();
    assert_eq!(summary.tasks.unwrap()["todo"], 1);
    assert_eq!(summary.my_open_tasks, Some(1));
    assert_eq!(summary.unread_messages, Some(0));
}
