//! Reactive document and collection stores.
//!
//! A store wraps one realtime listener and exposes its latest value through
//! `subscribe`/`get`, together with `loading()` and `error()` flags. Stores
//! are lazy: nothing is attached until the first subscriber arrives, and the
//! listener is detached again when the last subscriber leaves.
//!
//! ```
//! use firebase_rs_stores::firestore::Firestore;
//! use firebase_rs_stores::stores::{CollectionStore, CollectionStoreOptions};
//!
//! let firestore = Firestore::new();
//! let posts = CollectionStore::new(&firestore, "posts", CollectionStoreOptions::default()).unwrap();
//! assert!(posts.loading());
//! assert!(posts.meta().is_empty());
//! ```
mod collection;
mod context;
mod document;
mod error;
mod lifecycle;
mod options;
mod readable;

#[doc(inline)]
pub use collection::{CollectionMeta, CollectionStore, CollectionTarget};

#[doc(inline)]
pub use context::{collection_store, doc_store, StoreContext};

#[doc(inline)]
pub use document::{DocStore, DocTarget};

#[doc(inline)]
pub use error::{StoreError, StoreErrorCode, StoreResult};

#[doc(inline)]
pub use lifecycle::{StorePhase, StoreState};

#[doc(inline)]
pub use options::{
    CollectionStoreOptions, DocStoreOptions, QueryFn, StoreSettings, DEFAULT_ID_FIELD,
    DEFAULT_MAX_WAIT, DEFAULT_REF_FIELD,
};

#[doc(inline)]
pub use readable::Readable;
