use crate::runtime::ReactiveRuntime;
use crate::signal::WatchGuard;
use std::sync::{Arc, PoisonError, RwLock};

/// A thread-safe container for a view's state.
///
/// Unlike a [`Signal`](crate::Signal), a store is meant for several fields
/// changed together: `update` mutates in place and notifies once.
pub struct Store<T> {
    state: Arc<RwLock<T>>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            state: Arc::new(RwLock::new(initial)),
            id,
            runtime,
        }
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> T {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Update the state using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut *state);
        }
        self.runtime.notify(self.id);
    }

    /// Set a new state value.
    pub fn set(&self, new_state: T) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = new_state;
        self.runtime.notify(self.id);
    }

    /// Subscribe to state changes.
    ///
    /// The callback gets a snapshot taken after each update.
    pub fn subscribe<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let state = Arc::clone(&self.state);
        let observer_id = self.runtime.subscribe(self.id, move || {
            let snapshot = state.read().unwrap_or_else(PoisonError::into_inner).clone();
            callback(&snapshot);
        });

        WatchGuard::new(observer_id, &self.runtime)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.runtime.subscriber_count(self.id)
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&*state)
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            id: self.id,
            runtime: Arc::clone(&self.runtime),
        }
    }
}
