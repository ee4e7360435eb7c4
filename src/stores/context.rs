use crate::firestore::{Firestore, FirestoreResult};
use crate::performance::Performance;
use crate::stores::collection::{CollectionStore, CollectionTarget};
use crate::stores::document::{DocStore, DocTarget};
use crate::stores::options::{CollectionStoreOptions, DocStoreOptions, StoreSettings};

/// Bundles the handles every store needs so callers pass one value around.
///
/// Stores built through a context start traces on its [`Performance`]
/// recorder (when one is set) and take their default options from its
/// [`StoreSettings`].
#[derive(Clone, Debug)]
pub struct StoreContext {
    firestore: Firestore,
    performance: Option<Performance>,
    settings: StoreSettings,
}

impl StoreContext {
    pub fn new(firestore: Firestore) -> Self {
        Self {
            firestore,
            performance: None,
            settings: StoreSettings::default(),
        }
    }

    pub fn with_performance(mut self, performance: Performance) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn with_settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn performance(&self) -> Option<&Performance> {
        self.performance.as_ref()
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Document options seeded from the context settings.
    pub fn doc_options(&self) -> DocStoreOptions {
        self.settings.doc_options()
    }

    /// Collection options seeded from the context settings.
    pub fn collection_options(&self) -> CollectionStoreOptions {
        self.settings.collection_options()
    }

    pub fn doc_store(
        &self,
        target: impl Into<DocTarget>,
        options: DocStoreOptions,
    ) -> FirestoreResult<DocStore> {
        DocStore::build(
            &self.firestore,
            self.performance.as_ref(),
            target.into(),
            options,
        )
    }

    pub fn collection_store(
        &self,
        target: impl Into<CollectionTarget>,
        options: CollectionStoreOptions,
    ) -> FirestoreResult<CollectionStore> {
        CollectionStore::build(
            &self.firestore,
            self.performance.as_ref(),
            target.into(),
            options,
        )
    }
}

/// Creates a [`DocStore`] with the context's defaults.
pub fn doc_store(context: &StoreContext, target: impl Into<DocTarget>) -> FirestoreResult<DocStore> {
    context.doc_store(target, context.doc_options())
}

/// Creates a [`CollectionStore`] with the context's defaults.
pub fn collection_store(
    context: &StoreContext,
    target: impl Into<CollectionTarget>,
) -> FirestoreResult<CollectionStore> {
    context.collection_store(target, context.collection_options())
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn settings_seed_store_options() {
        let settings = StoreSettings::from_json_str(
            r#"{ "max_wait_ms": 40, "once": true, "id_field": "key" }"#,
        )
        .unwrap();
        let context = StoreContext::new(Firestore::new()).with_settings(settings);

        let doc = context.doc_options();
        assert_eq!(doc.max_wait, Duration::from_millis(40));
        assert!(doc.once);

        let collection = context.collection_options();
        assert_eq!(collection.id_field.as_deref(), Some("key"));
        assert_eq!(collection.ref_field.as_deref(), Some("ref"));
    }

    #[test]
    fn helpers_resolve_targets_on_the_context_firestore() {
        let context = StoreContext::new(Firestore::new());
        let doc = doc_store(&context, "users/ada").unwrap();
        assert_eq!(doc.reference().path().canonical_string(), "users/ada");

        let posts = collection_store(&context, "users/ada/posts").unwrap();
        assert_eq!(posts.reference().id(), "posts");
        assert!(doc_store(&context, "users").is_err());
    }
}
