//! Deduplicated observer storage shared by the client, participants and streams

use std::sync::Arc;

use parking_lot::Mutex;

/// Lock-guarded set of observer handles
///
/// Handles are compared by pointer identity, so the same `Arc` is stored at
/// most once. The lock is only held to mutate or copy the list; notification
/// always happens on a [`snapshot`](Self::snapshot) taken outside of it.
pub struct ObserverRegistry<T: ?Sized> {
    observers: Mutex<Vec<Arc<T>>>,
}

impl<T: ?Sized> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer. Returns `false` if it was already registered.
    pub fn add(&self, observer: Arc<T>) -> bool {
        let mut observers = self.observers.lock();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            tracing::debug!("Adding duplicate observer");
            return false;
        }
        observers.push(observer);
        true
    }

    /// Unregister an observer. Removing an absent observer is a no-op.
    pub fn remove(&self, observer: &Arc<T>) -> bool {
        let mut observers = self.observers.lock();
        match observers.iter().position(|o| Arc::ptr_eq(o, observer)) {
            Some(pos) => {
                observers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Copy of the current observers, in registration order
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.observers.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for ObserverRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}
