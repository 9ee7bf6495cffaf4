use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::state::runtime::snapshot::runtime_snapshot::RuntimeSnapshot;

/// Single-writer cell holding an `Arc` to the current snapshot.
///
/// The lock is only held for the pointer clone (readers) or for
/// clone-mutate-swap (the writer), never across I/O.
pub struct RuntimeSnapshotRepository<T> {
    state: RwLock<Arc<RuntimeSnapshot<T>>>,
}

impl<T> Default for RuntimeSnapshotRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RuntimeSnapshotRepository<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(RuntimeSnapshot::default())),
        }
    }

    /// Return the shared Arc snapshot (zero cost).
    pub async fn get(&self) -> Arc<RuntimeSnapshot<T>> {
        self.state.read().await.clone()
    }

    /// Mutate a copy of the snapshot, then replace the Arc pointer.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut RuntimeSnapshot<T>) -> R,
    {
        let mut guard = self.state.write().await;

        // Cheap: the payload itself sits behind its own Arc
        let mut next = (**guard).clone();
        let result = f(&mut next);

        *guard = Arc::new(next);
        result
    }
}
