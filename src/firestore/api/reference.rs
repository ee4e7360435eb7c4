use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{self, Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};
use crate::firestore::value::DocumentData;

use super::database::Firestore;
use super::listener::ListenerRegistration;
use super::query::{Query, QuerySnapshot};
use super::snapshot::DocumentSnapshot;

#[derive(Clone)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "Invalid collection reference. Collection references must have an odd number of segments, but {} has {}.",
                path,
                path.len()
            )));
        }
        Ok(Self { firestore, path })
    }

    /// Returns the Firestore instance that created this collection reference.
    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// The full resource path of the collection (e.g. `rooms/eros/messages`).
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The last segment of the collection path.
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns the document that logically contains this collection, if any.
    pub fn parent(&self) -> Option<DocumentReference> {
        if self.path.len() < 3 {
            return None;
        }
        DocumentReference::new(self.firestore.clone(), self.path.without_last()).ok()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, an auto-ID is generated.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = document_id
            .map(str::to_string)
            .unwrap_or_else(generate_auto_id);
        if id.is_empty() || id.contains('/') {
            return Err(invalid_argument(
                "Document ID must be non-empty and cannot contain '/'.",
            ));
        }
        DocumentReference::new(self.firestore.clone(), self.path.child([id]))
    }

    /// Writes `data` to a new document with an auto-generated ID.
    pub fn add(&self, data: DocumentData) -> FirestoreResult<DocumentReference> {
        let reference = self.doc(None)?;
        reference.set(data)?;
        Ok(reference)
    }

    /// Creates a query that targets this collection.
    pub fn query(&self) -> Query {
        Query::new(self.firestore.clone(), self.path.clone())
    }

    /// Attaches a realtime listener to every document of the collection.
    pub fn on_snapshot<N, E>(&self, next: N, error: E) -> ListenerRegistration
    where
        N: Fn(QuerySnapshot) + Send + Sync + 'static,
        E: Fn(FirestoreError) + Send + Sync + 'static,
    {
        self.query().on_snapshot(next, error)
    }
}

impl PartialEq for CollectionReference {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl fmt::Debug for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionReference({})", self.path)
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionReference({})", self.path)
    }
}

#[derive(Clone)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self::from_key(firestore, key))
    }

    pub(crate) fn from_key(firestore: Firestore, key: DocumentKey) -> Self {
        Self { firestore, key }
    }

    /// Returns the Firestore instance that created this document reference.
    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// The full resource path to the document.
    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    /// The parent collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.key.collection_path(),
        }
    }

    /// Returns a reference to a subcollection rooted at this document.
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let sub_path = ResourcePath::from_string(path)?;
        let full_path = self.key.path().child(sub_path.iter().cloned());
        CollectionReference::new(self.firestore.clone(), full_path)
    }

    /// Replaces the document contents, creating it when missing.
    pub fn set(&self, data: DocumentData) -> FirestoreResult<()> {
        self.firestore.set_document(&self.key, data);
        Ok(())
    }

    /// Merges `data` into an existing document.
    pub fn update(&self, data: DocumentData) -> FirestoreResult<()> {
        self.firestore.update_document(&self.key, data)
    }

    pub fn delete(&self) -> FirestoreResult<()> {
        self.firestore.delete_document(&self.key);
        Ok(())
    }

    /// Reads the current document contents.
    pub fn get(&self) -> FirestoreResult<DocumentSnapshot> {
        self.firestore.get_document(&self.key)
    }

    /// Attaches a realtime listener to this document.
    ///
    /// `next` receives the current snapshot shortly after registration and a
    /// fresh snapshot after every write. `error` is invoked at most once, after
    /// which the listener is gone.
    pub fn on_snapshot<N, E>(&self, next: N, error: E) -> ListenerRegistration
    where
        N: Fn(DocumentSnapshot) + Send + Sync + 'static,
        E: Fn(FirestoreError) + Send + Sync + 'static,
    {
        self.firestore.listen_document(self.key.clone(), next, error)
    }
}

impl PartialEq for DocumentReference {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Debug for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentReference({})", self.key.path())
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentReference({})", self.key.path())
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(20)
        .collect()
}
