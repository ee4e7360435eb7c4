use std::fmt;
use std::sync::Arc;

use crate::firestore::{
    query, CollectionReference, DocumentData, DocumentSnapshot, Firestore, FirestoreResult,
    FirestoreValue, ListenerRegistration, Query,
};
use crate::performance::Performance;
use crate::stores::error::StoreError;
use crate::stores::lifecycle::{
    start_trace, CoreConfig, SnapshotSink, StoreCore, StorePhase, StoreState,
};
use crate::stores::options::CollectionStoreOptions;
use crate::stores::readable::Readable;
use crate::util::{NextFn, Unsubscribe};

/// What a [`CollectionStore`] listens to.
#[derive(Clone, Debug)]
pub enum CollectionTarget {
    Path(String),
    Collection(CollectionReference),
    Query(Query),
}

impl From<&str> for CollectionTarget {
    fn from(path: &str) -> Self {
        CollectionTarget::Path(path.to_string())
    }
}

impl From<String> for CollectionTarget {
    fn from(path: String) -> Self {
        CollectionTarget::Path(path)
    }
}

impl From<CollectionReference> for CollectionTarget {
    fn from(reference: CollectionReference) -> Self {
        CollectionTarget::Collection(reference)
    }
}

impl From<&CollectionReference> for CollectionTarget {
    fn from(reference: &CollectionReference) -> Self {
        CollectionTarget::Collection(reference.clone())
    }
}

impl From<Query> for CollectionTarget {
    fn from(query: Query) -> Self {
        CollectionTarget::Query(query)
    }
}

/// First and last entry of the most recently emitted result set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionMeta {
    pub first: Option<DocumentData>,
    pub last: Option<DocumentData>,
}

impl CollectionMeta {
    fn from_documents(documents: Option<&Vec<DocumentData>>) -> Self {
        let documents = documents.map(Vec::as_slice).unwrap_or_default();
        Self {
            first: documents.first().cloned(),
            last: documents.last().cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

/// Reactive view of the documents matched by a collection or query.
///
/// Each emitted entry is the document data plus an id field and a reference
/// field (`"id"` and `"ref"` unless configured otherwise). After the first
/// emission the value is always a vector, empty when nothing matches.
#[derive(Clone)]
pub struct CollectionStore {
    collection: CollectionReference,
    query: Query,
    core: Arc<StoreCore<Vec<DocumentData>, CollectionMeta>>,
}

impl CollectionStore {
    pub fn new(
        firestore: &Firestore,
        target: impl Into<CollectionTarget>,
        options: CollectionStoreOptions,
    ) -> FirestoreResult<Self> {
        Self::build(firestore, None, target.into(), options)
    }

    pub(crate) fn build(
        firestore: &Firestore,
        performance: Option<&Performance>,
        target: CollectionTarget,
        options: CollectionStoreOptions,
    ) -> FirestoreResult<Self> {
        let base = match target {
            CollectionTarget::Path(path) => firestore.collection(&path)?.query(),
            CollectionTarget::Collection(reference) => reference.query(),
            CollectionTarget::Query(query) => query,
        };
        let collection = base.collection();
        let query = match &options.query {
            Some(build) => query(base, build(&collection))?,
            None => base,
        };

        let label = collection.path().canonical_string();
        let trace = start_trace(performance, options.trace_id.as_deref(), &label);
        let id_field = options.id_field.filter(|field| !field.is_empty());
        let ref_field = options.ref_field.filter(|field| !field.is_empty());

        let listened = query.clone();
        let listen = Box::new(
            move |sink: SnapshotSink<Vec<DocumentData>, CollectionMeta>| -> ListenerRegistration {
                let on_error = sink.clone();
                let id_field = id_field.clone();
                let ref_field = ref_field.clone();
                listened.on_snapshot(
                    move |snapshot| {
                        let documents: Vec<DocumentData> = snapshot
                            .into_iter()
                            .map(|document| {
                                with_injected_fields(
                                    document,
                                    id_field.as_deref(),
                                    ref_field.as_deref(),
                                )
                            })
                            .collect();
                        sink.next((!documents.is_empty()).then_some(documents));
                    },
                    move |err| on_error.fail(err),
                )
            },
        );

        let core = StoreCore::new(
            CoreConfig {
                label,
                max_wait: options.max_wait,
                once: options.once,
                log: options.log,
                fallback: options.start_with,
                vacant: Some(Vec::new()),
                derive_meta: CollectionMeta::from_documents,
                trace,
            },
            listen,
        );
        Ok(Self {
            collection,
            query,
            core,
        })
    }

    pub fn subscribe<F>(&self, run: F) -> Unsubscribe
    where
        F: Fn(&Option<Vec<DocumentData>>) + Send + Sync + 'static,
    {
        self.core.subscribe(Arc::new(run))
    }

    pub fn get(&self) -> Option<Vec<DocumentData>> {
        self.core.state().value.clone()
    }

    pub fn meta(&self) -> CollectionMeta {
        self.core.state().meta.clone()
    }

    pub fn loading(&self) -> bool {
        self.core.state().loading
    }

    pub fn error(&self) -> Option<StoreError> {
        self.core.state().error.clone()
    }

    pub fn state(&self) -> Arc<StoreState<Vec<DocumentData>, CollectionMeta>> {
        self.core.state()
    }

    pub fn phase(&self) -> StorePhase {
        self.core.phase()
    }

    /// The collection the store reads from, even when it listens to a query.
    pub fn reference(&self) -> &CollectionReference {
        &self.collection
    }

    /// The query actually listened to, after any configured constraints.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn firestore(&self) -> &Firestore {
        self.collection.firestore()
    }
}

impl Readable for CollectionStore {
    type Value = Vec<DocumentData>;

    fn subscribe_with(&self, run: NextFn<Option<Vec<DocumentData>>>) -> Unsubscribe {
        self.core.subscribe(run)
    }

    fn get(&self) -> Option<Vec<DocumentData>> {
        CollectionStore::get(self)
    }
}

impl fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionStore")
            .field("query", &self.query)
            .field("phase", &self.phase())
            .finish()
    }
}

fn with_injected_fields(
    document: DocumentSnapshot,
    id_field: Option<&str>,
    ref_field: Option<&str>,
) -> DocumentData {
    let mut entry = DocumentData::new();
    if let Some(field) = id_field {
        entry.insert(field.to_string(), FirestoreValue::from_string(document.id()));
    }
    let reference = document.reference().clone();
    entry.extend(document.into_data().unwrap_or_default());
    if let Some(field) = ref_field {
        entry.insert(field.to_string(), FirestoreValue::from_reference(reference));
    }
    entry
}
