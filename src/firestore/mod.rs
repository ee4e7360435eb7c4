pub mod api;
pub mod error;
pub mod model;
pub(crate) mod query_evaluator;
pub mod value;

pub use api::{
    limit, limit_to_last, order_by, query, where_field, CollectionReference, DocumentReference,
    DocumentSnapshot, FilterOperator, Firestore, FirestoreSettings, ListenerRegistration,
    OrderDirection, Query, QueryConstraint, QuerySnapshot,
};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use value::{data_from_json, data_to_json, DocumentData, FirestoreValue, ValueKind};
