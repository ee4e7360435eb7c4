use std::fmt;
use std::sync::Arc;

use crate::firestore::{
    DocumentData, DocumentReference, Firestore, FirestoreResult, ListenerRegistration,
};
use crate::performance::Performance;
use crate::stores::error::StoreError;
use crate::stores::lifecycle::{
    start_trace, CoreConfig, SnapshotSink, StoreCore, StorePhase, StoreState,
};
use crate::stores::options::DocStoreOptions;
use crate::stores::readable::Readable;
use crate::util::{NextFn, Unsubscribe};

/// What a [`DocStore`] listens to: a document path or an existing reference.
#[derive(Clone, Debug)]
pub enum DocTarget {
    Path(String),
    Reference(DocumentReference),
}

impl From<&str> for DocTarget {
    fn from(path: &str) -> Self {
        DocTarget::Path(path.to_string())
    }
}

impl From<String> for DocTarget {
    fn from(path: String) -> Self {
        DocTarget::Path(path)
    }
}

impl From<DocumentReference> for DocTarget {
    fn from(reference: DocumentReference) -> Self {
        DocTarget::Reference(reference)
    }
}

impl From<&DocumentReference> for DocTarget {
    fn from(reference: &DocumentReference) -> Self {
        DocTarget::Reference(reference.clone())
    }
}

/// Reactive view of a single document.
///
/// The realtime listener is attached when the first subscriber arrives and
/// detached when the last one leaves. Until the first snapshot (or the
/// timeout) the store reports `loading() == true` and a `None` value.
///
/// ```
/// use firebase_rs_stores::firestore::Firestore;
/// use firebase_rs_stores::stores::{DocStore, DocStoreOptions};
///
/// let firestore = Firestore::new();
/// let store = DocStore::new(&firestore, "users/ada", DocStoreOptions::default()).unwrap();
/// assert!(store.loading());
/// assert_eq!(store.reference().id(), "ada");
/// ```
#[derive(Clone)]
pub struct DocStore {
    reference: DocumentReference,
    core: Arc<StoreCore<DocumentData, ()>>,
}

impl DocStore {
    /// Creates a store for `target`. Fails when a path does not name a document.
    pub fn new(
        firestore: &Firestore,
        target: impl Into<DocTarget>,
        options: DocStoreOptions,
    ) -> FirestoreResult<Self> {
        Self::build(firestore, None, target.into(), options)
    }

    pub(crate) fn build(
        firestore: &Firestore,
        performance: Option<&Performance>,
        target: DocTarget,
        options: DocStoreOptions,
    ) -> FirestoreResult<Self> {
        let reference = match target {
            DocTarget::Path(path) => firestore.doc(&path)?,
            DocTarget::Reference(reference) => reference,
        };
        let label = reference.path().canonical_string();
        let trace = start_trace(performance, options.trace_id.as_deref(), &label);

        let listened = reference.clone();
        let listen = Box::new(move |sink: SnapshotSink<DocumentData, ()>| -> ListenerRegistration {
            let on_error = sink.clone();
            listened.on_snapshot(
                move |snapshot| sink.next(snapshot.into_data()),
                move |err| on_error.fail(err),
            )
        });

        let core = StoreCore::new(
            CoreConfig {
                label,
                max_wait: options.max_wait,
                once: options.once,
                log: options.log,
                fallback: options.start_with,
                vacant: None,
                derive_meta: |_| (),
                trace,
            },
            listen,
        );
        Ok(Self { reference, core })
    }

    /// Registers `run`; it is called immediately with the current value and
    /// after every update until the returned closure is called.
    pub fn subscribe<F>(&self, run: F) -> Unsubscribe
    where
        F: Fn(&Option<DocumentData>) + Send + Sync + 'static,
    {
        self.core.subscribe(Arc::new(run))
    }

    /// Current document data, `None` while loading or when absent.
    pub fn get(&self) -> Option<DocumentData> {
        self.core.state().value.clone()
    }

    pub fn loading(&self) -> bool {
        self.core.state().loading
    }

    pub fn error(&self) -> Option<StoreError> {
        self.core.state().error.clone()
    }

    pub fn state(&self) -> Arc<StoreState<DocumentData, ()>> {
        self.core.state()
    }

    pub fn phase(&self) -> StorePhase {
        self.core.phase()
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    pub fn firestore(&self) -> &Firestore {
        self.reference.firestore()
    }
}

impl Readable for DocStore {
    type Value = DocumentData;

    fn subscribe_with(&self, run: NextFn<Option<DocumentData>>) -> Unsubscribe {
        self.core.subscribe(run)
    }

    fn get(&self) -> Option<DocumentData> {
        DocStore::get(self)
    }
}

impl fmt::Debug for DocStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocStore")
            .field("reference", &self.reference)
            .field("phase", &self.phase())
            .finish()
    }
}
