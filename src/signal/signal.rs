use crate::runtime::{ReactiveRuntime, RuntimeInner};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

/// A reactive value holder: caches the latest value and pushes every new
/// value to its subscribers.
///
/// `set` always notifies, even when the new value equals the old one.
///
/// ```
/// use profile_views::Signal;
/// use std::sync::{Arc, Mutex};
///
/// let name = Signal::new("junegunn".to_string());
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let seen_clone = seen.clone();
///
/// let guard = name.subscribe(move |n| seen_clone.lock().unwrap().push(n));
/// name.set("gaearon".to_string());
/// guard.unsubscribe();
/// name.set("benlesh".to_string());
///
/// assert_eq!(*seen.lock().unwrap(), vec!["gaearon".to_string()]);
/// ```
#[derive(Clone)]
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
    _dependencies: Arc<Mutex<Vec<WatchGuard>>>,
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal bound to the current runtime.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            value: Arc::new(RwLock::new(initial)),
            id,
            runtime,
            _dependencies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, new_value: T) {
        self.replace_silently(new_value);
        self.notify();
    }

    /// Store a value without notifying anyone.
    pub(crate) fn replace_silently(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
    }

    /// Run every subscriber against the value currently stored.
    pub(crate) fn notify(&self) {
        self.runtime.notify(self.id);
    }

    /// Update the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *value);
        drop(value); // Release the write lock before notifying
        self.runtime.notify(self.id);
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of live subscriptions on this signal.
    pub fn subscriber_count(&self) -> usize {
        self.runtime.subscriber_count(self.id)
    }

    /// Subscribe to values set after this call.
    pub fn subscribe<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let value = Arc::clone(&self.value);
        let observer_id = self.runtime.subscribe(self.id, move || {
            let val = value.read().unwrap_or_else(PoisonError::into_inner).clone();
            callback(val);
        });

        WatchGuard::new(observer_id, &self.runtime)
    }

    /// Call `callback` with the current value now, then on every change.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let callback_clone = Arc::clone(&callback);
        let guard = self.subscribe(move |val| callback_clone(val));

        callback(self.get());
        guard
    }

    /// Create a derived signal by applying a function to this signal's value.
    ///
    /// The derived signal stops following the source once every clone of it
    /// has been dropped.
    pub fn map<U, F>(&self, f: F) -> Signal<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let derived = Signal::new(self.with(&f));
        let target = Arc::downgrade(&derived.value);
        let target_id = derived.id;
        let runtime = Arc::clone(&derived.runtime);

        let guard = self.subscribe(move |value| {
            if let Some(target) = target.upgrade() {
                *target.write().unwrap_or_else(PoisonError::into_inner) = f(&value);
                runtime.notify(target_id);
            }
        });

        // Keep the subscription alive as long as the derived signal
        derived
            ._dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(guard);
        derived
    }
}

/// RAII subscription handle. Dropping it unsubscribes.
#[must_use = "dropping a WatchGuard unsubscribes immediately"]
pub struct WatchGuard {
    observer_id: usize,
    runtime: Weak<RwLock<RuntimeInner>>,
}

impl WatchGuard {
    pub(crate) fn new(observer_id: usize, runtime: &ReactiveRuntime) -> Self {
        Self {
            observer_id,
            runtime: Arc::downgrade(&runtime.inner()),
        }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            let runtime = runtime.read().unwrap_or_else(PoisonError::into_inner);
            runtime.remove_observer(self.observer_id);
        }
    }
}
