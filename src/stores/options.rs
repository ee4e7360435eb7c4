use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::firestore::{CollectionReference, DocumentData, QueryConstraint};
use crate::stores::error::{invalid_argument, StoreResult};

pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_ID_FIELD: &str = "id";
pub const DEFAULT_REF_FIELD: &str = "ref";

/// Builds the constraints a collection store composes into its query.
pub type QueryFn = Arc<dyn Fn(&CollectionReference) -> Vec<QueryConstraint> + Send + Sync>;

/// Options accepted by [`DocStore`](crate::stores::DocStore).
#[derive(Clone, Debug, PartialEq)]
pub struct DocStoreOptions {
    /// Emitted instead of `None` when the first snapshot finds no document.
    ///
    /// A timeout before that first snapshot also emits this value (with the
    /// timeout error), so subscribers see the fallback rather than `None`.
    pub start_with: Option<DocumentData>,
    /// How long to wait for the first snapshot. Zero disables the timeout.
    pub max_wait: Duration,
    /// Detach the listener after the first snapshot.
    pub once: bool,
    /// Log every emitted value at info level.
    pub log: bool,
    /// Name of the performance trace measuring time to first value.
    pub trace_id: Option<String>,
}

impl Default for DocStoreOptions {
    fn default() -> Self {
        Self {
            start_with: None,
            max_wait: DEFAULT_MAX_WAIT,
            once: false,
            log: false,
            trace_id: None,
        }
    }
}

impl DocStoreOptions {
    pub fn with_start_with(mut self, data: DocumentData) -> Self {
        self.start_with = Some(data);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

/// Options accepted by [`CollectionStore`](crate::stores::CollectionStore).
#[derive(Clone)]
pub struct CollectionStoreOptions {
    pub start_with: Option<Vec<DocumentData>>,
    pub max_wait: Duration,
    pub once: bool,
    pub log: bool,
    pub trace_id: Option<String>,
    /// Field that receives each document's id. `None` or `""` skips it.
    pub id_field: Option<String>,
    /// Field that receives each document's reference. `None` or `""` skips it.
    pub ref_field: Option<String>,
    pub query: Option<QueryFn>,
}

impl Default for CollectionStoreOptions {
    fn default() -> Self {
        Self {
            start_with: None,
            max_wait: DEFAULT_MAX_WAIT,
            once: false,
            log: false,
            trace_id: None,
            id_field: Some(DEFAULT_ID_FIELD.to_string()),
            ref_field: Some(DEFAULT_REF_FIELD.to_string()),
            query: None,
        }
    }
}

impl fmt::Debug for CollectionStoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionStoreOptions")
            .field("start_with", &self.start_with)
            .field("max_wait", &self.max_wait)
            .field("once", &self.once)
            .field("log", &self.log)
            .field("trace_id", &self.trace_id)
            .field("id_field", &self.id_field)
            .field("ref_field", &self.ref_field)
            .field("query", &self.query.is_some())
            .finish()
    }
}

impl CollectionStoreOptions {
    pub fn with_start_with(mut self, documents: Vec<DocumentData>) -> Self {
        self.start_with = Some(documents);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_id_field(mut self, field: Option<&str>) -> Self {
        self.id_field = field.map(str::to_string);
        self
    }

    pub fn with_ref_field(mut self, field: Option<&str>) -> Self {
        self.ref_field = field.map(str::to_string);
        self
    }

    pub fn with_query<F>(mut self, build: F) -> Self
    where
        F: Fn(&CollectionReference) -> Vec<QueryConstraint> + Send + Sync + 'static,
    {
        self.query = Some(Arc::new(build));
        self
    }
}

/// Crate-wide defaults for stores built through a
/// [`StoreContext`](crate::stores::StoreContext).
///
/// Every field is optional when deserializing; `null` for `id_field` or
/// `ref_field` disables that injection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub max_wait_ms: u64,
    pub once: bool,
    pub log: bool,
    pub id_field: Option<String>,
    pub ref_field: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_wait_ms: DEFAULT_MAX_WAIT.as_millis() as u64,
            once: false,
            log: false,
            id_field: Some(DEFAULT_ID_FIELD.to_string()),
            ref_field: Some(DEFAULT_REF_FIELD.to_string()),
        }
    }
}

impl StoreSettings {
    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| invalid_argument(format!("Invalid store settings: {err}")))
    }

    pub fn doc_options(&self) -> DocStoreOptions {
        DocStoreOptions {
            max_wait: Duration::from_millis(self.max_wait_ms),
            once: self.once,
            log: self.log,
            ..DocStoreOptions::default()
        }
    }

    pub fn collection_options(&self) -> CollectionStoreOptions {
        CollectionStoreOptions {
            max_wait: Duration::from_millis(self.max_wait_ms),
            once: self.once,
            log: self.log,
            id_field: self.id_field.clone(),
            ref_field: self.ref_field.clone(),
            ..CollectionStoreOptions::default()
        }
    }
}
