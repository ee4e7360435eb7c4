#![cfg(not(target_arch = "wasm32"))]

use firebase_rs_stores::firestore::{
    data_from_json, limit, order_by, query, where_field, DocumentData, FilterOperator, Firestore,
    FirestoreSettings, OrderDirection,
};
use firebase_rs_stores::stores::{
    collection_store, CollectionStore, CollectionStoreOptions, StoreContext, StoreErrorCode,
    StorePhase,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

type Captured = Arc<Mutex<Vec<Option<Vec<DocumentData>>>>>;

fn data(value: Value) -> DocumentData {
    data_from_json(value).unwrap()
}

fn seed(firestore: &Firestore, path: &str, value: Value) {
    firestore.doc(path).unwrap().set(data(value)).unwrap();
}

fn names(documents: &[DocumentData]) -> Vec<String> {
    documents
        .iter()
        .map(|document| {
            document
                .get("name")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

fn capture(store: &CollectionStore) -> (Captured, firebase_rs_stores::util::Unsubscribe) {
    let values: Captured = Arc::new(Mutex::new(Vec::new()));
    let captured = values.clone();
    let unsubscribe = store.subscribe(move |value| captured.lock().unwrap().push(value.clone()));
    (values, unsubscribe)
}

#[tokio::test]
async fn emits_documents_with_id_and_reference() {
    let firestore = Firestore::new();
    seed(&firestore, "rooms/a", json!({ "name": "a" }));
    seed(&firestore, "rooms/b", json!({ "name": "b" }));

    let store = CollectionStore::new(&firestore, "rooms", CollectionStoreOptions::default()).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    let documents = store.get().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(names(&documents), ["a", "b"]);

    let meta = store.meta();
    assert_eq!(
        meta.first.unwrap().get("name").and_then(|v| v.as_str()),
        Some("a")
    );
    assert_eq!(
        meta.last.unwrap().get("name").and_then(|v| v.as_str()),
        Some("b")
    );

    let first = &documents[0];
    assert_eq!(first.get("id").and_then(|v| v.as_str()), Some("a"));
    let reference = first.get("ref").and_then(|v| v.as_reference()).unwrap();
    assert_eq!(reference, &firestore.doc("rooms/a").unwrap());
}

#[tokio::test]
async fn disabled_injection_leaves_documents_untouched() {
    let firestore = Firestore::new();
    seed(&firestore, "rooms/a", json!({ "name": "a" }));

    let options = CollectionStoreOptions::default()
        .with_id_field(None)
        .with_ref_field(Some(""));
    let store = CollectionStore::new(&firestore, "rooms", options).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    assert_eq!(store.get(), Some(vec![data(json!({ "name": "a" }))]));
}

#[tokio::test]
async fn custom_id_field() {
    let firestore = Firestore::new();
    seed(&firestore, "rooms/a", json!({ "name": "a" }));

    let options = CollectionStoreOptions::default()
        .with_id_field(Some("key"))
        .with_ref_field(None);
    let store = CollectionStore::new(&firestore, "rooms", options).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    assert_eq!(
        store.get(),
        Some(vec![data(json!({ "key": "a", "name": "a" }))])
    );
}

#[tokio::test]
async fn empty_result_is_an_empty_vector() {
    let firestore = Firestore::new();
    let store = CollectionStore::new(&firestore, "rooms", CollectionStoreOptions::default()).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    assert_eq!(store.get(), Some(Vec::new()));
    assert!(store.meta().is_empty());
    assert!(!store.loading());
}

#[tokio::test]
async fn start_with_covers_only_the_first_empty_result() {
    let firestore = Firestore::new();
    let options = CollectionStoreOptions::default()
        .with_start_with(vec![data(json!({ "name": "placeholder" }))]);
    let store = CollectionStore::new(&firestore, "rooms", options).unwrap();
    let (values, _unsubscribe) = capture(&store);
    sleep(Duration::from_millis(20)).await;

    assert_eq!(names(&store.get().unwrap()), ["placeholder"]);

    seed(&firestore, "rooms/a", json!({ "name": "a" }));
    assert_eq!(names(&store.get().unwrap()), ["a"]);

    firestore.doc("rooms/a").unwrap().delete().unwrap();
    assert_eq!(store.get(), Some(Vec::new()));
    assert_eq!(store.meta().first, None);
    assert_eq!(values.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn updates_follow_writes() {
    let firestore = Firestore::new();
    seed(&firestore, "rooms/a", json!({ "name": "a" }));
    let store = CollectionStore::new(&firestore, "rooms", CollectionStoreOptions::default()).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    seed(&firestore, "rooms/c", json!({ "name": "c" }));
    seed(&firestore, "other/x", json!({ "name": "x" }));

    assert_eq!(names(&store.get().unwrap()), ["a", "c"]);
    assert_eq!(
        store.meta().last.unwrap().get("name").and_then(|v| v.as_str()),
        Some("c")
    );
}

#[tokio::test]
async fn query_builder_filters_and_orders() {
    let firestore = Firestore::new();
    seed(&firestore, "posts/1", json!({ "name": "zeta", "published": true }));
    seed(&firestore, "posts/2", json!({ "name": "alpha", "published": true }));
    seed(&firestore, "posts/3", json!({ "name": "draft", "published": false }));

    let options = CollectionStoreOptions::default().with_query(|_| {
        vec![
            where_field("published", FilterOperator::Equal, true),
            order_by("name", OrderDirection::Ascending),
        ]
    });
    let store = CollectionStore::new(&firestore, "posts", options).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    assert_eq!(names(&store.get().unwrap()), ["alpha", "zeta"]);
    assert_eq!(store.reference().id(), "posts");
}

#[tokio::test]
async fn listens_to_an_existing_query() {
    let firestore = Firestore::new();
    seed(&firestore, "scores/a", json!({ "name": "a", "points": 3 }));
    seed(&firestore, "scores/b", json!({ "name": "b", "points": 9 }));
    seed(&firestore, "scores/c", json!({ "name": "c", "points": 5 }));

    let scores = firestore.collection("scores").unwrap();
    let top = query(
        &scores,
        [order_by("points", OrderDirection::Descending), limit(2)],
    )
    .unwrap();
    let store = CollectionStore::new(&firestore, top, CollectionStoreOptions::default()).unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;

    assert_eq!(names(&store.get().unwrap()), ["b", "c"]);
    assert_eq!(store.reference(), &scores);
}

#[tokio::test]
async fn timeout_emits_start_with_or_empty() {
    let firestore = Firestore::with_settings(FirestoreSettings {
        snapshot_latency: Duration::from_millis(1_000),
    });
    let store = CollectionStore::new(
        &firestore,
        "rooms",
        CollectionStoreOptions::default().with_max_wait(Duration::from_millis(5)),
    )
    .unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(40)).await;

    assert_eq!(store.get(), Some(Vec::new()));
    assert!(store.error().unwrap().is_timeout());
    assert!(!store.loading());
}

#[tokio::test]
async fn empty_result_after_timeout_still_gets_start_with() {
    let firestore = Firestore::with_settings(FirestoreSettings {
        snapshot_latency: Duration::from_millis(40),
    });
    let options = CollectionStoreOptions::default()
        .with_max_wait(Duration::from_millis(5))
        .with_start_with(vec![data(json!({ "name": "placeholder" }))]);
    let store = CollectionStore::new(&firestore, "rooms", options).unwrap();
    let (values, _unsubscribe) = capture(&store);

    sleep(Duration::from_millis(20)).await;
    assert!(store.error().unwrap().is_timeout());
    assert_eq!(names(&store.get().unwrap()), ["placeholder"]);

    sleep(Duration::from_millis(60)).await;
    assert!(store.error().is_none());
    assert_eq!(names(&store.get().unwrap()), ["placeholder"]);
    assert_eq!(values.lock().unwrap().len(), 3);

    seed(&firestore, "rooms/a", json!({ "name": "a" }));
    firestore.doc("rooms/a").unwrap().delete().unwrap();
    assert_eq!(store.get(), Some(Vec::new()));
}

#[tokio::test]
async fn once_mode_stops_after_the_first_result() {
    let firestore = Firestore::new();
    seed(&firestore, "rooms/a", json!({ "name": "a" }));
    let store = CollectionStore::new(
        &firestore,
        "rooms",
        CollectionStoreOptions::default().with_once(true),
    )
    .unwrap();
    let (values, _unsubscribe) = capture(&store);
    sleep(Duration::from_millis(20)).await;

    assert_eq!(firestore.listener_count(), 0);
    assert_eq!(store.phase(), StorePhase::Closed);

    seed(&firestore, "rooms/b", json!({ "name": "b" }));
    assert_eq!(values.lock().unwrap().len(), 2);
    assert_eq!(names(&store.get().unwrap()), ["a"]);
}

#[tokio::test]
async fn permission_errors_emit_an_empty_vector() {
    let firestore = Firestore::new();
    let store = CollectionStore::new(&firestore, "vault", CollectionStoreOptions::default()).unwrap();
    seed(&firestore, "vault/a", json!({ "name": "a" }));
    let (values, _unsubscribe) = capture(&store);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(names(&store.get().unwrap()), ["a"]);

    firestore.deny_reads("vault").unwrap();
    assert_eq!(store.get(), Some(Vec::new()));
    let error = store.error().unwrap();
    assert_eq!(error.code, StoreErrorCode::Listener);
    assert_eq!(firestore.listener_count(), 0);

    seed(&firestore, "vault/b", json!({ "name": "b" }));
    assert_eq!(values.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn context_settings_apply_to_collection_stores() {
    let firestore = Firestore::new();
    seed(&firestore, "rooms/a", json!({ "name": "a" }));
    let settings = firebase_rs_stores::stores::StoreSettings::from_json_str(
        r#"{ "id_field": null, "ref_field": null }"#,
    )
    .unwrap();
    let context = StoreContext::new(firestore).with_settings(settings);

    let store = collection_store(&context, "rooms").unwrap();
    let _unsubscribe = store.subscribe(|_| {});
    sleep(Duration::from_millis(20)).await;
    assert_eq!(store.get(), Some(vec![data(json!({ "name": "a" }))]));
}
