use crate::firestore::value::{DocumentData, FirestoreValue};

use super::reference::DocumentReference;

/// Point-in-time view of a single document.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    reference: DocumentReference,
    data: Option<DocumentData>,
}

impl DocumentSnapshot {
    pub fn new(reference: DocumentReference, data: Option<DocumentData>) -> Self {
        Self { reference, data }
    }

    /// Returns whether the document exists.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the document fields if the snapshot contains data.
    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.data.as_ref().and_then(|data| data.get(field))
    }

    pub fn into_data(self) -> Option<DocumentData> {
        self.data
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::api::Firestore;
    use crate::firestore::value::data_from_json;
    use serde_json::json;

    #[test]
    fn snapshot_reports_existence() {
        let firestore = Firestore::new();
        let reference = firestore.doc("posts/first").unwrap();
        let missing = DocumentSnapshot::new(reference.clone(), None);
        assert!(!missing.exists());
        assert_eq!(missing.id(), "first");

        let present = DocumentSnapshot::new(
            reference,
            Some(data_from_json(json!({ "title": "hello" })).unwrap()),
        );
        assert_eq!(present.get("title").and_then(|v| v.as_str()), Some("hello"));
    }
}
