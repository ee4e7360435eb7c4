mod database;
mod listener;
mod query;
mod reference;
mod snapshot;

pub use database::{Firestore, FirestoreSettings};
pub use listener::ListenerRegistration;
pub use query::{
    limit, limit_to_last, order_by, query, where_field, FieldFilter, FilterOperator, LimitType,
    OrderBy, OrderDirection, Query, QueryConstraint, QueryDefinition, QuerySnapshot,
};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::DocumentSnapshot;
