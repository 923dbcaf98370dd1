use std::sync::Arc;

use parking_lot::Mutex;

/// Observer of qualified names resolved through the environment.
pub trait ResolutionListener: Send + Sync {
    /// `resolved` is false when the name produced a problem or a missing type.
    fn on_qualified_name(&self, compound_name: &[String], resolved: bool);
}

/// Shared, thread-safe listener list. Cloning yields another handle to the same list.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<Vec<Arc<dyn ResolutionListener>>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn ResolutionListener>) {
        self.listeners.lock().push(listener);
    }

    /// Removes `listener` (compared by pointer). Returns whether it was registered.
    pub fn remove(&self, listener: &Arc<dyn ResolutionListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, compound_name: &[String], resolved: bool) {
        // Snapshot so a listener may register others without deadlocking.
        let listeners: Vec<_> = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_qualified_name(compound_name, resolved);
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
