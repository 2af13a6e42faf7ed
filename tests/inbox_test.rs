//! Inbox aggregation: one latest visible message per conversation, fallback
//! when the newest is removed, recency ordering across conversations.

mod common;

use common::harness;

#[tokio::test]
async fn inbox_surfaces_exactly_the_newest_visible_message() {
    let h = harness();
    let u1 = h.directory.add_user("ada");
    let u2 = h.directory.add_user("grace");
    let conv = h.service.create_conversation(&[u1, u2], u1).await.unwrap();

    h.service.create_message(u1, conv.id, "older").await.unwrap();
    let newer = h.service.create_message(u1, conv.id, "newer").await.unwrap();

    let inbox = h.service.list_inbox(u2).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].conversation_id, conv.id);
    assert_eq!(inbox[0].message_id, newer.id);
    assert_eq!(inbox[0].content, "newer");
}

#[tokio::test]
async fn inbox_falls_back_when_the_newest_is_removed() {
    let h = harness();
    let u1 = h.directory.add_user("ada");
    let u2 = h.directory.add_user("grace");
    let conv = h.service.create_conversation(&[u1, u2], u1).await.unwrap();

    let m1 = h.service.create_message(u1, conv.id, "first").await.unwrap();
    let m2 = h.service.create_message(u1, conv.id, "second").await.unwrap();

    // Removing the newest message surfaces the next-latest visible one.
    h.service.delete_message(u2, m2.id).await.unwrap();
    let inbox = h.service.list_inbox(u2).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message_id, m1.id);

    // Removing the last visible message drops the conversation entirely.
    h.service.delete_message(u2, m1.id).await.unwrap();
    assert!(h.service.list_inbox(u2).await.unwrap().is_empty());

    // The other participant's inbox never noticed.
    let for_u1 = h.service.list_inbox(u1).await.unwrap();
    assert_eq!(for_u1[0].message_id, m2.id);
}

#[tokio::test]
async fn conversations_without_visible_messages_are_omitted() {
    let h = harness();
    let u1 = h.directory.add_user("ada");
    let u2 = h.directory.add_user("grace");
    h.service.create_conversation(&[u1, u2], u1).await.unwrap();

    assert!(h.service.list_inbox(u1).await.unwrap().is_empty());
    assert!(h.service.list_inbox(u2).await.unwrap().is_empty());
}

#[tokio::test]
async fn inbox_entries_sort_by_recency_across_conversations() {
    let h = harness();
    let u1 = h.directory.add_user("ada");
    let u2 = h.directory.add_user("grace");
    let u3 = h.directory.add_user("edsger");

    let with_u2 = h.service.create_conversation(&[u1, u2], u1).await.unwrap();
    let with_u3 = h.service.create_conversation(&[u1, u3], u1).await.unwrap();

    h.service.create_message(u2, with_u2.id, "earliest").await.unwrap();
    h.service.create_message(u3, with_u3.id, "middle").await.unwrap();
    h.service.create_message(u2, with_u2.id, "latest").await.unwrap();

    let inbox = h.service.list_inbox(u1).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].conversation_id, with_u2.id);
    assert_eq!(inbox[0].content, "latest");
    assert_eq!(inbox[1].conversation_id, with_u3.id);
    assert_eq!(inbox[1].content, "middle");
}

#[tokio::test]
async fn inbox_resolves_sender_and_other_participants() {
    let h = harness();
    let u1 = h.directory.add_user("ada");
    let u2 = h.directory.add_user("grace");
    let u3 = h.directory.add_user("edsger");

    let conv = h.service.create_conversation(&[u1, u2, u3], u1).await.unwrap();
    h.service.create_message(u2, conv.id, "hello").await.unwrap();

    let inbox = h.service.list_inbox(u1).await.unwrap();
    let entry = &inbox[0];
    assert_eq!(entry.sender.display_name, "grace");

    let mut others: Vec<&str> = entry
        .other_participants
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    others.sort();
    assert_eq!(others, ["edsger", "grace"]);
}

#[tokio::test]
async fn inbox_degrades_to_id_summary_for_vanished_users() {
    let h = harness();
    let u1 = h.directory.add_user("ada");
    let u2 = h.directory.add_user("grace");
    let conv = h.service.create_conversation(&[u1, u2], u1).await.unwrap();
    h.service.create_message(u2, conv.id, "bye").await.unwrap();

    // Account deleted after the fact; the inbox must not fail.
    h.directory.remove(u2);

    let inbox = h.service.list_inbox(u1).await.unwrap();
    assert_eq!(inbox[0].sender.display_name, u2.to_string());
    assert_eq!(inbox[0].sender.id, u2);
}
