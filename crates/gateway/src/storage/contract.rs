//! Black-box behaviour shared by every persistent backend
//!
//! Each backend's test module calls these runners with a constructor that
//! yields a fresh, empty store.

use super::{MessageStore, StoreError, WebhookStore};
use crate::models::{Message, MessageQuery, MessageStatus, WebhookConfig};

fn sample(id: &str, status: MessageStatus, created_at: i64) -> Message {
    Message::builder(id)
        .from("sender@example.com")
        .to("recipient@example.com")
        .subject(format!("Subject {}", id))
        .status(status)
        .created_at(created_at)
        .last_event_at(created_at)
        .build()
}

fn full_message() -> Message {
    Message::builder("full-msg")
        .from("sender@example.com")
        .to("recipient@example.com")
        .subject("Test Subject")
        .html_body("<html><body>Hello</body></html>")
        .text_body("Hello")
        .status(MessageStatus::Processed)
        .transport_response("250 OK")
        .created_at(1_700_000_000)
        .last_event_at(1_700_000_001)
        .opens_count(5)
        .clicks_count(2)
        .build()
}

pub fn run_message_store_contract<S, F>(factory: F)
where
    S: MessageStore,
    F: Fn() -> S,
{
    save_and_get_by_id(&factory());
    get_missing_id_is_empty(&factory());
    upsert_is_idempotent(&factory());
    upsert_replaces_status_and_keeps_fields(&factory());
    save_requires_id(&factory());
    filter_by_status(&factory());
    limit_and_offset(&factory());
    default_limit(&factory());
    list_newest_first(&factory());
    long_ids_round_trip(&factory());
    close_is_idempotent(&factory());
}

fn save_and_get_by_id(store: &dyn MessageStore) {
    let msg = sample("test-123", MessageStatus::Processed, 1_700_000_000);
    store.save(&msg).unwrap();

    let got = store.get(&MessageQuery::by_id("test-123")).unwrap();
    assert_eq!(got, vec![msg]);
}

fn get_missing_id_is_empty(store: &dyn MessageStore) {
    let got = store.get(&MessageQuery::by_id("does-not-exist")).unwrap();
    assert!(got.is_empty());
    assert_eq!(store.find(&"does-not-exist".into()).unwrap(), None);
}

fn upsert_is_idempotent(store: &dyn MessageStore) {
    let msg = sample("upsert-1", MessageStatus::Processed, 1_700_000_000);
    store.save(&msg).unwrap();
    store.save(&msg).unwrap();

    let got = store.get(&MessageQuery::by_id("upsert-1")).unwrap();
    assert_eq!(got, vec![msg]);
    assert_eq!(store.get(&MessageQuery::all()).unwrap().len(), 1);
}

fn upsert_replaces_status_and_keeps_fields(store: &dyn MessageStore) {
    let msg = full_message();
    store.save(&msg).unwrap();

    let mut delivered = msg.clone();
    delivered.status = MessageStatus::Delivered;
    delivered.last_event_at = 1_700_000_100;
    store.save(&delivered).unwrap();

    let got = store.get(&MessageQuery::by_id("full-msg")).unwrap();
    assert_eq!(got.len(), 1);
    let got = &got[0];
    assert_eq!(got.status, MessageStatus::Delivered);
    assert_eq!(got.last_event_at, 1_700_000_100);
    assert_eq!(got.subject, msg.subject);
    assert_eq!(got.html_body, msg.html_body);
    assert_eq!(got.text_body, msg.text_body);
    assert_eq!(got.transport_response, msg.transport_response);
    assert_eq!(got.created_at, msg.created_at);
    assert_eq!(got.opens_count, 5);
    assert_eq!(got.clicks_count, 2);
}

fn save_requires_id(store: &dyn MessageStore) {
    let msg = sample("", MessageStatus::Processed, 1);
    let err = store.save(&msg).unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument { .. }), "got {:?}", err);
}

fn filter_by_status(store: &dyn MessageStore) {
    let statuses = [
        MessageStatus::Processed,
        MessageStatus::Delivered,
        MessageStatus::Bounce,
        MessageStatus::Delivered,
        MessageStatus::Deferred,
        MessageStatus::Delivered,
    ];
    for (i, status) in statuses.iter().enumerate() {
        store.save(&sample(&format!("msg-{}", i), *status, i as i64)).unwrap();
    }

    let got = store
        .get(&MessageQuery::all().with_status(MessageStatus::Delivered))
        .unwrap();
    assert_eq!(got.len(), 3);
    assert!(got.iter().all(|m| m.status == MessageStatus::Delivered));

    let got = store
        .get(&MessageQuery::all().with_status(MessageStatus::Dropped))
        .unwrap();
    assert!(got.is_empty());
}

fn limit_and_offset(store: &dyn MessageStore) {
    for i in 0..5 {
        store
            .save(&sample(&format!("limit-{}", i), MessageStatus::Processed, i))
            .unwrap();
    }

    let got = store.get(&MessageQuery::all().with_limit(3)).unwrap();
    assert_eq!(got.len(), 3);

    let rest = store
        .get(&MessageQuery::all().with_limit(3).with_offset(3))
        .unwrap();
    assert_eq!(rest.len(), 2);
    assert!(rest.iter().all(|m| !got.contains(m)));

    let past_end = store.get(&MessageQuery::all().with_offset(10)).unwrap();
    assert!(past_end.is_empty());

    let far_past_end = store.get(&MessageQuery::all().with_offset(usize::MAX)).unwrap();
    assert!(far_past_end.is_empty());
    let unbounded = store.get(&MessageQuery::all().with_limit(usize::MAX)).unwrap();
    assert_eq!(unbounded.len(), 5);
}

fn default_limit(store: &dyn MessageStore) {
    for i in 0..105 {
        store
            .save(&sample(&format!("bulk-{:03}", i), MessageStatus::Processed, i))
            .unwrap();
    }
    assert_eq!(store.get(&MessageQuery::all()).unwrap().len(), 100);
}

fn list_newest_first(store: &dyn MessageStore) {
    store.save(&sample("old", MessageStatus::Processed, 10)).unwrap();
    store.save(&sample("new", MessageStatus::Processed, 30)).unwrap();
    store.save(&sample("mid", MessageStatus::Processed, 20)).unwrap();

    let ids: Vec<String> = store
        .get(&MessageQuery::all())
        .unwrap()
        .into_iter()
        .map(|m| m.id.0)
        .collect();
    assert_eq!(ids, ["new", "mid", "old"]);
}

fn long_ids_round_trip(store: &dyn MessageStore) {
    // multi-byte ids grow sixfold when percent-encoded
    let accented = "é".repeat(60);
    let plain = "x".repeat(400);
    let shared_a = format!("{}a", "é".repeat(40));
    let shared_b = format!("{}b", "é".repeat(40));

    let ids = [&accented, &plain, &shared_a, &shared_b];
    for (i, id) in ids.iter().enumerate() {
        store
            .save(&sample(id, MessageStatus::Delivered, i as i64))
            .unwrap();
    }

    for id in ids {
        let got = store.get(&MessageQuery::by_id(id.as_str())).unwrap();
        assert_eq!(got.len(), 1, "lookup of {}", id);
        assert_eq!(&got[0].id.0, id);
    }
    assert_eq!(store.get(&MessageQuery::all()).unwrap().len(), 4);
}

fn close_is_idempotent(store: &dyn MessageStore) {
    store.close().unwrap();
    store.close().unwrap();
    assert!(store.save(&sample("late", MessageStatus::Processed, 1)).is_err());
}

pub fn run_webhook_store_contract<S, F>(factory: F)
where
    S: WebhookStore,
    F: Fn() -> S,
{
    create_and_get(&factory());
    create_rejects_duplicate(&factory());
    create_requires_id(&factory());
    missing_id_is_not_found(&factory());
    update_replaces_fields(&factory());
    list_and_list_enabled(&factory());
    delete_removes(&factory());
    long_webhook_id(&factory());
    close_registry_is_idempotent(&factory());
}

fn hook(id: &str, created_at: i64) -> WebhookConfig {
    let mut hook = WebhookConfig::with_id(
        id,
        format!("http://localhost/{}", id),
        [MessageStatus::Delivered, MessageStatus::Bounce],
    );
    hook.created_at = created_at;
    hook.updated_at = created_at;
    hook
}

fn create_and_get(store: &dyn WebhookStore) {
    let mut h = hook("wh_1", 100);
    h.secret = Some("s3cret".into());
    store.create(&h).unwrap();
    assert_eq!(store.get("wh_1").unwrap(), h);
}

fn create_rejects_duplicate(store: &dyn WebhookStore) {
    let original = hook("wh_dup", 100);
    store.create(&original).unwrap();

    let mut other = hook("wh_dup", 200);
    other.url = "http://localhost/other".into();
    let err = store.create(&other).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "got {:?}", err);
    assert_eq!(store.get("wh_dup").unwrap().url, original.url);
}

fn create_requires_id(store: &dyn WebhookStore) {
    let err = store.create(&hook("", 1)).unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument { .. }), "got {:?}", err);
}

fn missing_id_is_not_found(store: &dyn WebhookStore) {
    assert!(store.get("nope").unwrap_err().is_not_found());
    assert!(store.update(&hook("nope", 1)).unwrap_err().is_not_found());
    assert!(store.delete("nope").unwrap_err().is_not_found());
}

fn update_replaces_fields(store: &dyn WebhookStore) {
    let mut h = hook("wh_up", 100);
    store.create(&h).unwrap();

    h.url = "http://localhost/changed".into();
    h.events = [MessageStatus::Dropped].into_iter().collect();
    h.secret = Some("new-secret".into());
    h.enabled = false;
    h.updated_at = 150;
    store.update(&h).unwrap();

    assert_eq!(store.get("wh_up").unwrap(), h);
}

fn list_and_list_enabled(store: &dyn WebhookStore) {
    store.create(&hook("wh_a", 100)).unwrap();
    store.create(&hook("wh_b", 300)).unwrap();
    let mut disabled = hook("wh_c", 200);
    disabled.enabled = false;
    store.create(&disabled).unwrap();

    let ids: Vec<String> = store.list().unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, ["wh_b", "wh_c", "wh_a"]);

    let enabled: Vec<String> = store
        .list_enabled()
        .unwrap()
        .into_iter()
        .map(|h| h.id)
        .collect();
    assert_eq!(enabled, ["wh_b", "wh_a"]);
}

fn delete_removes(store: &dyn WebhookStore) {
    store.create(&hook("wh_del", 100)).unwrap();
    store.delete("wh_del").unwrap();
    assert!(store.get("wh_del").unwrap_err().is_not_found());
    assert!(store.list().unwrap().is_empty());
}

fn long_webhook_id(store: &dyn WebhookStore) {
    let id = format!("wh_{}", "ü".repeat(80));
    store.create(&hook(&id, 1)).unwrap();
    assert_eq!(store.get(&id).unwrap().id, id);
    assert!(matches!(
        store.create(&hook(&id, 2)).unwrap_err(),
        StoreError::AlreadyExists { .. }
    ));
}

fn close_registry_is_idempotent(store: &dyn WebhookStore) {
    store.close().unwrap();
    store.close().unwrap();
}
