mod json;
mod value;

pub use json::{data_from_json, data_to_json};
pub use value::{DocumentData, FirestoreValue, ValueKind};
