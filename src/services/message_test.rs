use super::*;
use crate::services::access::Role;
use crate::state::test_helpers::{dummy_profile, test_app_state};
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2026-07-04 18:00 UTC);

fn note(to: Uuid, body: &str) -> NewMessage {
    NewMessage { recipient_id: to, subject: Some("Hello".into()), body: body.into() }
}

#[test]
fn compose_builds_unread_message() {
    let sender = dummy_profile(Role::Member);
    let recipient = Uuid::new_v4();
    let message = compose(&sender, note(recipient, "See you at standup"), NOW).unwrap();
    assert_eq!(message.sender_id, sender.id);
    assert_eq!(message.recipient_id, recipient);
    assert_eq!(message.status, MessageStatus::Unread);
    assert_eq!(message.read_at, None);
}

#[test]
fn compose_rejects_self_and_empty_body() {
    let sender = dummy_profile(Role::Member);
    assert_eq!(
        compose(&sender, note(sender.id, "hi"), NOW).unwrap_err().to_string(),
        "you cannot send a message to yourself"
    );
    assert_eq!(
        compose(&sender, note(Uuid::new_v4(), "   "), NOW).unwrap_err().to_string(),
        "body is required"
    );
}

#[test]
fn compose_allows_missing_subject() {
    let sender = dummy_profile(Role::Member);
    let input = NewMessage { subject: None, ..note(Uuid::new_v4(), "ping") };
    assert_eq!(compose(&sender, input, NOW).unwrap().subject, "");
}

#[test]
fn read_at_is_set_once() {
    let first = datetime!(2026-07-04 18:05 UTC);
    let later = datetime!(2026-07-05 08:00 UTC);
    let read = read_at_after(None, MessageStatus::Read, first);
    assert_eq!(read, Some(first));
    assert_eq!(read_at_after(read, MessageStatus::Read, later), Some(first));
    assert_eq!(read_at_after(read, MessageStatus::Unread, later), Some(first));
    assert_eq!(read_at_after(None, MessageStatus::Archived, later), None);
}

#[test]
fn folder_selects_direction() {
    let me = dummy_profile(Role::Member);
    let other = Uuid::new_v4();
    let mut incoming = compose(&me, note(other, "x"), NOW).unwrap();
    incoming.sender_id = other;
    incoming.recipient_id = me.id;
    let outgoing = compose(&me, note(other, "y"), NOW).unwrap();

    assert!(Folder::Inbox.includes(&incoming, me.id));
    assert!(!Folder::Inbox.includes(&outgoing, me.id));
    assert!(Folder::Sent.includes(&outgoing, me.id));
    assert!(Folder::All.includes(&incoming, me.id) && Folder::All.includes(&outgoing, me.id));
    assert_eq!(Folder::from_str("trash"), None);
}

#[tokio::test]
async fn list_messages_rejects_unknown_folder_before_db() {
    let state = test_app_state();
    let me = dummy_profile(Role::Member);
    let params = ListParams { folder: Some("trash".into()), ..ListParams::default() };
    let err = list_messages(&state.pool, &me, &params).await.unwrap_err();
    assert_eq!(err.to_string(), "unknown folder: \"trash\"");
}

#[tokio::test]
async fn list_messages_rejects_task_style_filters() {
    let state = test_app_state();
    let me = dummy_profile(Role::Member);

    let by_priority = ListParams { priority: Some("high".into()), ..ListParams::default() };
    let err = list_messages(&state.pool, &me, &by_priority).await.unwrap_err();
    assert_eq!(err.to_string(), "messages cannot be filtered by priority");

    let by_assignee = ListParams { assignee_id: Some(Uuid::new_v4().to_string()), ..ListParams::default() };
    let err = list_messages(&state.pool, &me, &by_assignee).await.unwrap_err();
    assert_eq!(err.to_string(), "messages cannot be filtered by assignee_id");

    let by_direction = ListParams { direction: Some("inbound".into()), ..ListParams::default() };
    assert!(matches!(list_messages(&state.pool, &me, &by_direction).await, Err(RecordError::Invalid(_))));
}

#[tokio::test]
async fn set_status_rejects_unknown_status_before_db() {
    let state = test_app_state();
    let me = dummy_profile(Role::Member);
    let update = StatusUpdate { status: "starred".into() };
    assert!(matches!(
        set_message_status(&state.pool, &me, Uuid::new_v4(), update).await,
        Err(RecordError::Invalid(_))
    ));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn message_flow_against_live_db() {
    let pool = crate::state::test_helpers::live_pool().await;
    let (_, sender) = crate::state::test_helpers::seed_live_org(&pool, Role::Member).await;
    let (_, outsider) = crate::state::test_helpers::seed_live_org(&pool, Role::Member).await;

    // Recipients must belong to the sender's organization.
    assert!(matches!(
        send_message(&pool, &sender, note(outsider.id, "hi")).await,
        Err(RecordError::Invalid(_))
    ));

    let recipient_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO profiles (id, organization_id, email, full_name, password_hash)
         VALUES ($1, $2, $3, 'Recipient', 'x')",
    )
    .bind(recipient_id)
    .bind(sender.organization_id)
    .bind(format!("{recipient_id}@example.com"))
    .execute(&pool)
    .await
    .unwrap();
    let recipient = crate::services::profile::get_profile(&pool, sender.organization_id, recipient_id)
        .await
        .unwrap();

    let sent = send_message(&pool, &sender, note(recipient.id, "hello")).await.unwrap();

    let inbox = list_messages(&pool, &recipient, &ListParams::default()).await.unwrap();
    assert_eq!(inbox.iter().map(|m| m.id).collect::<Vec<_>>(), vec![sent.id]);
    assert!(list_messages(&pool, &sender, &ListParams::default()).await.unwrap().is_empty());

    let by_sender = set_message_status(&pool, &sender, sent.id, StatusUpdate { status: "read".into() }).await;
    assert!(matches!(by_sender, Err(RecordError::Forbidden(_))));

    let read = set_message_status(&pool, &recipient, sent.id, StatusUpdate { status: "read".into() })
        .await
        .unwrap();
    assert!(read.read_at.is_some());

    assert!(matches!(get_message(&pool, &outsider, sent.id).await, Err(RecordError::NotFound(_))));
    delete_message(&pool, &sender, sent.id).await.unwrap();
    assert!(matches!(delete_message(&pool, &recipient, sent.id).await, Err(RecordError::NotFound(_))));
}
