use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::firestore::error::{not_found, permission_denied, FirestoreError, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};
use crate::firestore::query_evaluator::apply_query_to_documents;
use crate::firestore::value::DocumentData;
use crate::platform::runtime;

use super::listener::ListenerRegistration;
use super::query::{Query, QueryDefinition, QuerySnapshot};
use super::reference::{CollectionReference, DocumentReference};
use super::snapshot::DocumentSnapshot;

/// Tunables for the in-process Firestore instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirestoreSettings {
    /// Delay before a freshly registered listener receives its first snapshot.
    pub snapshot_latency: Duration,
}

/// Handle to an in-process realtime document database.
///
/// Cloning is cheap; every clone observes the same documents and listeners.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    settings: FirestoreSettings,
    documents: Mutex<BTreeMap<DocumentKey, DocumentData>>,
    denied_reads: Mutex<Vec<ResourcePath>>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener_id: AtomicU64,
}

impl fmt::Debug for Firestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firestore")
            .field("settings", &self.inner.settings)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

type DocumentListenerCallback = Arc<dyn Fn(DocumentSnapshot) + Send + Sync>;
type QueryListenerCallback = Arc<dyn Fn(QuerySnapshot) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(FirestoreError) + Send + Sync>;

#[derive(Clone)]
enum ListenerKind {
    Document {
        key: DocumentKey,
        next: DocumentListenerCallback,
    },
    Query {
        definition: QueryDefinition,
        next: QueryListenerCallback,
    },
}

impl ListenerKind {
    fn watched_path(&self) -> &ResourcePath {
        match self {
            ListenerKind::Document { key, .. } => key.path(),
            ListenerKind::Query { definition, .. } => &definition.collection_path,
        }
    }

    fn covers(&self, changed: &DocumentKey) -> bool {
        match self {
            ListenerKind::Document { key, .. } => key == changed,
            ListenerKind::Query { definition, .. } => definition.matches(changed),
        }
    }
}

struct Listener {
    kind: ListenerKind,
    error: ErrorCallback,
    active: bool,
}

enum Activation {
    Deliver(ListenerKind),
    Reject(ErrorCallback, FirestoreError),
}

impl Default for Firestore {
    fn default() -> Self {
        Self::new()
    }
}

impl Firestore {
    pub fn new() -> Self {
        Self::with_settings(FirestoreSettings::default())
    }

    pub fn with_settings(settings: FirestoreSettings) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                settings,
                documents: Mutex::new(BTreeMap::new()),
                denied_reads: Mutex::new(Vec::new()),
                listeners: Mutex::new(HashMap::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn settings(&self) -> &FirestoreSettings {
        &self.inner.settings
    }

    /// Creates a `CollectionReference` pointing at `path` (e.g. `"rooms/eros/messages"`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference` pointing at `path`.
    ///
    /// The path must contain an even number of segments (collection/doc pairs).
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }

    /// Rejects reads below `path`.
    ///
    /// Listeners already attached below the path are terminated with a
    /// `permission-denied` error, mirroring how the backend cancels a listen
    /// target when security rules stop matching.
    pub fn deny_reads(&self, path: &str) -> FirestoreResult<()> {
        let prefix = ResourcePath::from_string(path)?;
        self.inner.denied_reads.lock().unwrap().push(prefix.clone());

        let rejected: Vec<ErrorCallback> = {
            let mut listeners = self.inner.listeners.lock().unwrap();
            let ids: Vec<u64> = listeners
                .iter()
                .filter(|(_, listener)| prefix.is_prefix_of(listener.kind.watched_path()))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| listeners.remove(&id))
                .map(|listener| listener.error)
                .collect()
        };

        for error in rejected {
            error(read_denied(&prefix));
        }
        Ok(())
    }

    /// Lifts a rule previously installed with [`Firestore::deny_reads`].
    pub fn allow_reads(&self, path: &str) -> FirestoreResult<()> {
        let prefix = ResourcePath::from_string(path)?;
        self.inner
            .denied_reads
            .lock()
            .unwrap()
            .retain(|denied| denied != &prefix);
        Ok(())
    }

    /// Number of realtime listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().unwrap().len()
    }

    pub(crate) fn listen_document<N, E>(
        &self,
        key: DocumentKey,
        next: N,
        error: E,
    ) -> ListenerRegistration
    where
        N: Fn(DocumentSnapshot) + Send + Sync + 'static,
        E: Fn(FirestoreError) + Send + Sync + 'static,
    {
        self.register_listener(
            ListenerKind::Document {
                key,
                next: Arc::new(next),
            },
            Arc::new(error),
        )
    }

    pub(crate) fn listen_query<N, E>(
        &self,
        definition: QueryDefinition,
        next: N,
        error: E,
    ) -> ListenerRegistration
    where
        N: Fn(QuerySnapshot) + Send + Sync + 'static,
        E: Fn(FirestoreError) + Send + Sync + 'static,
    {
        self.register_listener(
            ListenerKind::Query {
                definition,
                next: Arc::new(next),
            },
            Arc::new(error),
        )
    }

    fn register_listener(&self, kind: ListenerKind, error: ErrorCallback) -> ListenerRegistration {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().unwrap().insert(
            id,
            Listener {
                kind,
                error,
                active: false,
            },
        );

        let firestore = self.clone();
        let latency = self.inner.settings.snapshot_latency;
        runtime::spawn_detached(async move {
            runtime::sleep(latency).await;
            firestore.activate_listener(id);
        });

        ListenerRegistration::new(self.clone(), id)
    }

    pub(crate) fn remove_listener(&self, id: u64) -> bool {
        self.inner.listeners.lock().unwrap().remove(&id).is_some()
    }

    fn activate_listener(&self, id: u64) {
        let activation = {
            let mut listeners = self.inner.listeners.lock().unwrap();
            let Some(listener) = listeners.get_mut(&id) else {
                log::debug!("listener {id} detached before its first snapshot");
                return;
            };
            match self.check_read(listener.kind.watched_path()) {
                Ok(()) => {
                    listener.active = true;
                    Activation::Deliver(listener.kind.clone())
                }
                Err(err) => {
                    let error = listener.error.clone();
                    listeners.remove(&id);
                    Activation::Reject(error, err)
                }
            }
        };

        match activation {
            Activation::Deliver(kind) => self.deliver(&kind),
            Activation::Reject(error, err) => error(err),
        }
    }

    fn deliver(&self, kind: &ListenerKind) {
        match kind {
            ListenerKind::Document { key, next } => next(self.document_snapshot(key)),
            ListenerKind::Query { definition, next } => next(self.query_snapshot(definition)),
        }
    }

    fn dispatch_listeners(&self, changed: &DocumentKey) {
        let targets: Vec<ListenerKind> = {
            let listeners = self.inner.listeners.lock().unwrap();
            listeners
                .values()
                .filter(|listener| listener.active && listener.kind.covers(changed))
                .map(|listener| listener.kind.clone())
                .collect()
        };

        for kind in targets {
            self.deliver(&kind);
        }
    }

    fn check_read(&self, path: &ResourcePath) -> FirestoreResult<()> {
        let denied = self.inner.denied_reads.lock().unwrap();
        match denied.iter().find(|prefix| prefix.is_prefix_of(path)) {
            Some(prefix) => Err(read_denied(prefix)),
            None => Ok(()),
        }
    }

    fn document_snapshot(&self, key: &DocumentKey) -> DocumentSnapshot {
        let data = self.inner.documents.lock().unwrap().get(key).cloned();
        DocumentSnapshot::new(DocumentReference::from_key(self.clone(), key.clone()), data)
    }

    fn query_snapshot(&self, definition: &QueryDefinition) -> QuerySnapshot {
        let candidates: Vec<DocumentSnapshot> = {
            let documents = self.inner.documents.lock().unwrap();
            documents
                .iter()
                .filter(|(key, _)| definition.matches(key))
                .map(|(key, data)| {
                    DocumentSnapshot::new(
                        DocumentReference::from_key(self.clone(), key.clone()),
                        Some(data.clone()),
                    )
                })
                .collect()
        };
        let documents = apply_query_to_documents(candidates, definition);
        QuerySnapshot::new(
            Query::from_definition(self.clone(), definition.clone()),
            documents,
        )
    }

    pub(crate) fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        self.check_read(key.path())?;
        Ok(self.document_snapshot(key))
    }

    pub(crate) fn run_query(&self, definition: &QueryDefinition) -> FirestoreResult<QuerySnapshot> {
        self.check_read(&definition.collection_path)?;
        Ok(self.query_snapshot(definition))
    }

    pub(crate) fn set_document(&self, key: &DocumentKey, data: DocumentData) {
        self.inner
            .documents
            .lock()
            .unwrap()
            .insert(key.clone(), data);
        self.dispatch_listeners(key);
    }

    pub(crate) fn update_document(
        &self,
        key: &DocumentKey,
        data: DocumentData,
    ) -> FirestoreResult<()> {
        {
            let mut documents = self.inner.documents.lock().unwrap();
            let existing = documents.get_mut(key).ok_or_else(|| {
                not_found(format!("No document to update: {}", key.path()))
            })?;
            existing.extend(data);
        }
        self.dispatch_listeners(key);
        Ok(())
    }

    pub(crate) fn delete_document(&self, key: &DocumentKey) {
        let removed = self.inner.documents.lock().unwrap().remove(key).is_some();
        if removed {
            self.dispatch_listeners(key);
        }
    }
}

fn read_denied(prefix: &ResourcePath) -> FirestoreError {
    permission_denied(format!(
        "Missing or insufficient permissions to read {prefix}"
    ))
}
