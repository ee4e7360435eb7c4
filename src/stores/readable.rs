use crate::util::{NextFn, Unsubscribe};

/// Common surface of [`DocStore`](crate::stores::DocStore) and
/// [`CollectionStore`](crate::stores::CollectionStore).
pub trait Readable {
    type Value: Clone + Send + Sync + 'static;

    /// Registers `run`; it is called immediately with the current value and
    /// after every update until the returned closure is called.
    fn subscribe_with(&self, run: NextFn<Option<Self::Value>>) -> Unsubscribe;

    /// Current value without subscribing.
    fn get(&self) -> Option<Self::Value>;
}
