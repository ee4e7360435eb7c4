#![cfg(target_arch = "wasm32")]

use firebase_rs_stores::firestore::{data_from_json, Firestore, FirestoreSettings};
use firebase_rs_stores::platform::runtime::sleep;
use firebase_rs_stores::stores::{DocStore, DocStoreOptions};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test(async)]
async fn doc_store_receives_the_first_snapshot() {
    let firestore = Firestore::new();
    let reference = firestore.doc("users/ada").unwrap();
    reference
        .set(data_from_json(json!({ "name": "Ada" })).unwrap())
        .unwrap();

    let store = DocStore::new(&firestore, &reference, DocStoreOptions::default()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = seen.clone();
    let unsubscribe = store.subscribe(move |value| captured.lock().unwrap().push(value.is_some()));

    sleep(Duration::from_millis(20)).await;
    assert!(!store.loading());
    assert_eq!(seen.lock().unwrap().as_slice(), &[false, true]);

    unsubscribe();
    assert_eq!(firestore.listener_count(), 0);
}

#[wasm_bindgen_test(async)]
async fn doc_store_times_out_on_wasm_timers() {
    let firestore = Firestore::with_settings(FirestoreSettings {
        snapshot_latency: Duration::from_millis(500),
    });
    let store = DocStore::new(
        &firestore,
        "users/ada",
        DocStoreOptions::default().with_max_wait(Duration::from_millis(5)),
    )
    .unwrap();
    let _unsubscribe = store.subscribe(|_| {});

    sleep(Duration::from_millis(50)).await;
    assert!(!store.loading());
    assert!(store.error().unwrap().is_timeout());
}
