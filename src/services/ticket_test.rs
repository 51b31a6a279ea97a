use super::*;
use crate::services::access::Role;
use crate::state::test_helpers::{dummy_profile, test_app_state};
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2026-04-10 15:30 UTC);

fn input(subject: &str) -> TicketInput {
    TicketInput { subject: subject.into(), ..TicketInput::default() }
}

#[test]
fn ticket_status_parses_known_values_only() {
    for status in TicketStatus::ALL {
        assert_eq!(TicketStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(TicketStatus::from_str("pending"), None);
}

#[test]
fn new_ticket_defaults_to_open_medium() {
    let reporter = dummy_profile(Role::Member);
    let ticket = new_ticket(&reporter, input("Printer on fire"), NOW).unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.priority, Priority::Medium);
    assert_eq!(ticket.reporter_id, Some(reporter.id));
    assert_eq!(ticket.customer_email, None);
}

#[test]
fn new_ticket_normalizes_customer_fields() {
    let reporter = dummy_profile(Role::Member);
    let ticket = new_ticket(
        &reporter,
        TicketInput {
            customer_name: Some("  Dana Smith ".into()),
            customer_email: Some(" Dana@Customer.IO ".into()),
            ..input("Refund request")
        },
        NOW,
    )
    .unwrap();
    assert_eq!(ticket.customer_name.as_deref(), Some("Dana Smith"));
    assert_eq!(ticket.customer_email.as_deref(), Some("dana@customer.io"));
}

#[test]
fn new_ticket_rejects_malformed_customer_email() {
    let reporter = dummy_profile(Role::Member);
    let bad = TicketInput { customer_email: Some("dana at customer".into()), ..input("x") };
    let err = new_ticket(&reporter, bad, NOW).unwrap_err();
    assert_eq!(err.to_string(), "customer_email is not a valid address");
}

#[test]
fn new_ticket_requires_subject() {
    let reporter = dummy_profile(Role::Member);
    assert_eq!(new_ticket(&reporter, input(""), NOW).unwrap_err().to_string(), "subject is required");
}

#[test]
fn patch_clears_customer_email_and_keeps_others() {
    let reporter = dummy_profile(Role::Member);
    let ticket = new_ticket(
        &reporter,
        TicketInput { customer_email: Some("a@b.co".into()), customer_name: Some("A".into()), ..input("x") },
        NOW,
    )
    .unwrap();

    let patch: TicketPatch = serde_json::from_str(r#"{"customer_email":null,"status":"resolved"}"#).unwrap();
    let next = apply_ticket_patch(&ticket, patch, NOW).unwrap();
    assert_eq!(next.customer_email, None);
    assert_eq!(next.customer_name.as_deref(), Some("A"));
    assert_eq!(next.status, TicketStatus::Resolved);
}

#[test]
fn search_covers_customer_fields() {
    let reporter = dummy_profile(Role::Member);
    let with_customer = new_ticket(
        &reporter,
        TicketInput { customer_name: Some("Globex Corp".into()), ..input("Login broken") },
        NOW,
    )
    .unwrap();
    let other = new_ticket(&reporter, input("Invoice question"), NOW).unwrap();

    let params = ListParams { q: Some("GLOBEX".into()), ..ListParams::default() };
    let filter = ListFilter::parse(&params, TicketStatus::from_str, TICKET_SORT_KEYS).unwrap();
    let hits = filter::apply(vec![with_customer.clone(), other], &filter);
    assert_eq!(hits, vec![with_customer]);
}

#[test]
fn title_sort_orders_by_subject() {
    let reporter = dummy_profile(Role::Member);
    let b = new_ticket(&reporter, input("beta"), NOW).unwrap();
    let a = new_ticket(&reporter, input("Alpha"), NOW).unwrap();
    let params = ListParams { sort: Some("title".into()), order: Some("asc".into()), ..ListParams::default() };
    let filter = ListFilter::parse(&params, TicketStatus::from_str, TICKET_SORT_KEYS).unwrap();
    let subjects: Vec<String> = filter::apply(vec![b, a], &filter).into_iter().map(|t| t.subject).collect();
    assert_eq!(subjects, ["Alpha", "beta"]);
}

#[test]
fn due_at_is_not_a_ticket_sort_key() {
    let params = ListParams { sort: Some("due_at".into()), ..ListParams::default() };
    assert!(ListFilter::parse(&params, TicketStatus::from_str, TICKET_SORT_KEYS).is_err());
}

#[tokio::test]
async fn create_ticket_validates_before_db() {
    let state = test_app_state();
    let reporter = dummy_profile(Role::Member);
    let bad = TicketInput { priority: Some("critical".into()), ..input("x") };
    let err = create_ticket(&state.pool, &reporter, bad).await.unwrap_err();
    assert_eq!(err.to_string(), "unknown priority: \"critical\"");
}

#[tokio::test]
async fn list_tickets_rejects_direction_filter() {
    let state = test_app_state();
    let params = ListParams { direction: Some("inbound".into()), ..ListParams::default() };
    let err = list_tickets(&state.pool, Uuid::new_v4(), &params).await.unwrap_err();
    assert_eq!(err.to_string(), "tickets cannot be filtered by direction");
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn member_cannot_edit_unrelated_ticket_against_live_db() {
    let pool = crate::state::test_helpers::live_pool().await;
    let (organization_id, manager) = crate::state::test_helpers::seed_live_org(&pool, Role::Manager).await;
    let created = create_ticket(&pool, &manager, input("Escalation")).await.unwrap();

    let mut outsider = dummy_profile(Role::Member);
    outsider.organization_id = organization_id;
    let patch = TicketPatch { status: Some("closed".into()), ..TicketPatch::default() };
    assert!(matches!(
        update_ticket(&pool, &outsider, created.id, patch).await,
        Err(RecordError::Forbidden(_))
    ));
    assert!(matches!(delete_ticket(&pool, &outsider, created.id).await, Err(RecordError::Forbidden(_))));

    delete_ticket(&pool, &manager, created.id).await.unwrap();
    assert!(matches!(delete_ticket(&pool, &manager, created.id).await, Err(RecordError::NotFound(_))));
}
