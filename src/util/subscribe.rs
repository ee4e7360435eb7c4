use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub type NextFn<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;

/// One-shot closure returned by `subscribe`; calling it removes the subscriber.
pub type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

pub type SubscriberId = u64;

/// Ordered set of value callbacks.
///
/// `notify` works on a copy of the callback list taken under the lock, so a
/// callback may add or remove subscribers (including itself) while it runs.
/// A subscriber removed during a round still sees that round.
pub struct SubscriberSet<T> {
    subscribers: Mutex<Vec<(SubscriberId, NextFn<T>)>>,
    next_id: AtomicU64,
}

impl<T> SubscriberSet<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `callback`; returns its id and the subscriber count after insertion.
    pub fn add(&self, callback: NextFn<T>) -> (SubscriberId, usize) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.push((id, callback));
        (id, subscribers.len())
    }

    /// Removes `id`; returns the remaining count, or `None` if `id` was unknown.
    pub fn remove(&self, id: SubscriberId) -> Option<usize> {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        (subscribers.len() != before).then_some(subscribers.len())
    }

    pub fn notify(&self, value: &T) {
        let snapshot: Vec<NextFn<T>> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in snapshot {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_counts_and_ignores_unknown_ids() {
        let set: SubscriberSet<u32> = SubscriberSet::new();
        let (first, count) = set.add(Arc::new(|_| {}));
        assert_eq!(count, 1);
        let (_, count) = set.add(Arc::new(|_| {}));
        assert_eq!(count, 2);
        assert_eq!(set.remove(first), Some(1));
        assert_eq!(set.remove(first), None);
    }

    #[test]
    fn notify_tolerates_removal_from_callback() {
        let set: Arc<SubscriberSet<u32>> = Arc::new(SubscriberSet::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let id_slot = Arc::new(Mutex::new(None));
        let (set_ref, slot, log) = (set.clone(), id_slot.clone(), seen.clone());
        let (id, _) = set.add(Arc::new(move |value: &u32| {
            log.lock().unwrap().push(*value);
            if let Some(id) = *slot.lock().unwrap() {
                set_ref.remove(id);
            }
        }));
        *id_slot.lock().unwrap() = Some(id);

        set.notify(&1);
        set.notify(&2);
        assert_eq!(seen.lock().unwrap().as_slice(), &[1]);
        assert!(set.is_empty());
    }
}
