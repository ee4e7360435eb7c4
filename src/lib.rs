//! Reactive stores over Firestore realtime listeners.
//!
//! [`stores::DocStore`] and [`stores::CollectionStore`] turn the push-based
//! `on_snapshot` API into subscribable values with `loading`, `error` and
//! timeout fallback semantics. The [`firestore`] module provides the
//! in-process realtime database the stores listen to, and [`performance`]
//! records the optional start-up traces.
//!
//! ```
//! use firebase_rs_stores::firestore::{data_from_json, Firestore};
//! use firebase_rs_stores::stores::{doc_store, StoreContext};
//! use serde_json::json;
//!
//! let context = StoreContext::new(Firestore::new());
//! let reference = context.firestore().doc("users/ada").unwrap();
//! reference.set(data_from_json(json!({ "name": "Ada" })).unwrap()).unwrap();
//!
//! let user = doc_store(&context, &reference).unwrap();
//! assert!(user.loading());
//! assert_eq!(user.get(), None);
//! ```

pub mod firestore;
pub mod performance;
pub mod platform;
pub mod stores;
pub mod util;
