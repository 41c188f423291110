mod common;

use std::{collections::HashSet, sync::Arc, time::Duration};

use badgerexchange::{
    messages::open_thread,
    store::{canonical_pair, conversation_key},
    AppError,
};

use common::{file_store, listing, remove_db, store, user};
use tokio::sync::Barrier;

#[tokio::test]
async fn resolving_twice_returns_the_same_thread() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;

    let first = store.resolve_conversation(&lamp.id, &buyer.id, &seller.id).await.unwrap();
    let second = store.resolve_conversation(&lamp.id, &seller.id, &buyer.id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.participant_ids, canonical_pair(&seller.id, &buyer.id));
    assert_eq!(first.id, conversation_key(&lamp.id, &first.participant_ids).to_string());
    assert_eq!(store.conversations_for(&buyer.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_contacts_create_one_thread() {
    let (store, path) = file_store("concurrent-contact", 8).await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;

    let start = Arc::new(Barrier::new(32));
    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let (store, start, listing_id) = (store.clone(), start.clone(), lamp.id.clone());
            let (a, b) = if i % 2 == 0 {
                (buyer.id.clone(), seller.id.clone())
            } else {
                (seller.id.clone(), buyer.id.clone())
            };
            tokio::spawn(async move {
                start.wait().await;
                store.resolve_conversation(&listing_id, &a, &b).await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(store.conversations_for(&seller.id).await.unwrap().len(), 1);
    assert_eq!(store.conversations_for(&buyer.id).await.unwrap().len(), 1);

    drop(store);
    remove_db(&path);
}

#[tokio::test]
async fn threads_are_per_listing() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let rug = listing(&store, &seller, "Woven rug, five by seven", &["decor"]).await;

    let a = store.resolve_conversation(&lamp.id, &buyer.id, &seller.id).await.unwrap();
    let b = store.resolve_conversation(&rug.id, &buyer.id, &seller.id).await.unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn cannot_talk_to_yourself() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;

    let result = store.resolve_conversation(&lamp.id, &seller.id, &seller.id).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn sellers_cannot_message_their_own_listing() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;

    let result = open_thread(&store, &seller.id, &lamp.id).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(store.conversations_for(&seller.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn sold_listings_take_no_new_contact() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    store.mark_sold(&seller.id, &lamp.id).await.unwrap();

    let result = open_thread(&store, &buyer.id, &lamp.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn open_thread_finds_the_existing_conversation() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;

    let first = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();
    store.send_message(&buyer.id, &first.id, "is this still available?").await.unwrap();
    let again = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(store.messages(&buyer.id, &again.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn messages_come_back_in_send_order() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    store.send_message(&buyer.id, &convo.id, "hi!").await.unwrap();
    store.send_message(&seller.id, &convo.id, "  hello  ").await.unwrap();
    let last = store.send_message(&buyer.id, &convo.id, "can I pick it up today?").await.unwrap();

    let messages = store.messages(&seller.id, &convo.id).await.unwrap();
    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["hi!", "hello", "can I pick it up today?"]);
    assert_eq!(messages[1].sender_id, seller.id);

    let convo = store.conversation(&buyer.id, &convo.id).await.unwrap();
    assert_eq!(convo.last_message_at, last.created_at);
}

#[tokio::test]
async fn blank_and_oversized_messages_are_rejected() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    let blank = store.send_message(&buyer.id, &convo.id, "   ").await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    let huge = "a".repeat(2001);
    let oversized = store.send_message(&buyer.id, &convo.id, &huge).await;
    assert!(matches!(oversized, Err(AppError::BadRequest(_))));

    assert!(store.messages(&buyer.id, &convo.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn outsiders_cannot_read_or_write() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let outsider = user(&store, "Mike", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    assert!(matches!(
        store.messages(&outsider.id, &convo.id).await,
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        store.send_message(&outsider.id, &convo.id, "let me in").await,
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        store.delete_conversation(&outsider.id, &convo.id).await,
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        store.watch_thread(&outsider.id, &convo.id).await,
        Err(AppError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let store = store().await;
    let buyer = user(&store, "Bucky", &[]).await;

    assert!(matches!(
        store.send_message(&buyer.id, "nope", "hello").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn inbox_puts_latest_activity_first() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let rug = listing(&store, &seller, "Woven rug, five by seven", &["decor"]).await;

    let lamp_convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();
    let rug_convo = open_thread(&store, &buyer.id, &rug.id).await.unwrap();
    store.send_message(&buyer.id, &lamp_convo.id, "still have the lamp?").await.unwrap();

    let inbox = store.inbox(&seller.id).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].conversation.id, lamp_convo.id);
    assert_eq!(inbox[0].other_participant.id, buyer.id);
    assert_eq!(inbox[0].last_message.as_ref().unwrap().text, "still have the lamp?");
    assert_eq!(inbox[1].conversation.id, rug_convo.id);
    assert!(inbox[1].last_message.is_none());
}

#[tokio::test]
async fn inbox_shows_only_the_newest_message() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    store.send_message(&buyer.id, &convo.id, "is it still available?").await.unwrap();
    store.send_message(&seller.id, &convo.id, "yes!").await.unwrap();
    let last = store.send_message(&buyer.id, &convo.id, "great, see you at the union").await.unwrap();

    let inbox = store.inbox(&buyer.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].last_message.as_ref(), Some(&last));
    assert_eq!(inbox[0].other_participant.id, seller.id);
}

#[tokio::test]
async fn inbox_skips_threads_about_deleted_listings() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    store.delete_listing(&seller.id, &lamp.id).await.unwrap();
    assert!(store.inbox(&buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_removes_thread_and_messages() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();
    store.send_message(&buyer.id, &convo.id, "hi!").await.unwrap();

    store.delete_conversation(&seller.id, &convo.id).await.unwrap();

    assert!(matches!(
        store.conversation(&buyer.id, &convo.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(store.conversations_for(&buyer.id).await.unwrap().is_empty());

    // contacting again starts over with the same key
    let fresh = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();
    assert_eq!(fresh.id, convo.id);
    assert!(store.messages(&buyer.id, &fresh.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn watchers_see_new_messages() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;
    let convo = open_thread(&store, &buyer.id, &lamp.id).await.unwrap();

    let mut thread = store.watch_thread(&seller.id, &convo.id).await.unwrap();
    let initial = thread.next().await.unwrap().unwrap();
    assert!(initial.is_empty());

    store.send_message(&buyer.id, &convo.id, "hi!").await.unwrap();
    let updated = tokio::time::timeout(Duration::from_secs(5), thread.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].text, "hi!");
}

#[tokio::test]
async fn inbox_watchers_see_new_threads() {
    let store = store().await;
    let seller = user(&store, "Jane", &[]).await;
    let buyer = user(&store, "Bucky", &[]).await;
    let lamp = listing(&store, &seller, "Desk lamp, warm light", &["decor"]).await;

    let mut inbox = store.watch_inbox(&seller.id);
    assert!(inbox.next().await.unwrap().unwrap().is_empty());

    open_thread(&store, &buyer.id, &lamp.id).await.unwrap();
    let updated = tokio::time::timeout(Duration::from_secs(5), inbox.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].listing.id, lamp.id);
}
