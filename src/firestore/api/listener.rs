use std::fmt;

use super::database::Firestore;

/// RAII-style listener registration; dropping the handle detaches the
/// underlying listener.
pub struct ListenerRegistration {
    firestore: Firestore,
    id: Option<u64>,
}

impl ListenerRegistration {
    pub(crate) fn new(firestore: Firestore, id: u64) -> Self {
        Self {
            firestore,
            id: Some(id),
        }
    }

    /// Stops the listener. Snapshots are no longer delivered once this returns.
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if !self.firestore.remove_listener(id) {
                log::debug!("listener {id} was already terminated by the backend");
            }
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .finish()
    }
}
