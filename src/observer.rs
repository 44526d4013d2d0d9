//! Listener registry used to push list changes to UI bindings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Registry<A> {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, Listener<A>)>>,
}

/// A set of callbacks notified with a value of type `A`.
///
/// Cloning shares the same listener set.
pub struct Observers<A> {
    registry: Arc<Registry<A>>,
}

impl<A> Clone for Observers<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<A: 'static> Default for Observers<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Observers<A> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener. It stays registered until the guard is dropped or
    /// [`ListenerGuard::unsubscribe`] is called.
    pub fn on<F>(&self, listener: F) -> ListenerGuard
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.registry.listeners.write() {
            listeners.push((id, Arc::new(listener)));
        }

        let weak: Weak<Registry<A>> = Arc::downgrade(&self.registry);
        ListenerGuard {
            remove: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    if let Ok(mut listeners) = registry.listeners.write() {
                        listeners.retain(|(existing, _)| *existing != id);
                    }
                }
            })),
        }
    }

    /// Call every registered listener with `value`.
    ///
    /// Listeners are snapshotted first, so a listener may register or remove
    /// listeners without deadlocking.
    pub fn emit(&self, value: &A) {
        let listeners: Vec<Listener<A>> = match self.registry.listeners.read() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };

        for listener in listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.registry
            .listeners
            .read()
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration handle returned by [`Observers::on`]. Removes the listener on drop.
#[must_use = "dropping the guard removes the listener immediately"]
pub struct ListenerGuard {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerGuard {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}
