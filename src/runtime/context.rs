use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Callback registered against a source.
pub(crate) type Callback = Arc<dyn Fn() + Send + Sync>;

/// Subscriber registry (one per runtime).
struct ReactiveContext {
    // Map from source ID to the observers subscribed to it, in subscription order
    subscribers: HashMap<usize, Vec<usize>>,
    // Map from observer ID to the source it listens to
    observer_source: HashMap<usize, usize>,
    // Map from observer ID to the callback
    observers: HashMap<usize, Callback>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            observer_source: HashMap::new(),
            observers: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.subscribers.clear();
        self.observer_source.clear();
        self.observers.clear();
    }
}

/// Inner runtime state that can be shared.
///
/// Handles such as `WatchGuard` keep a `Weak` to this so dropping them after
/// the runtime is gone is a no-op.
pub struct RuntimeInner {
    context: Mutex<ReactiveContext>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            context: Mutex::new(ReactiveContext::new()),
        }
    }

    /// Remove an observer and its callback. Unknown IDs are ignored.
    pub fn remove_observer(&self, observer_id: usize) {
        let mut ctx = self.context.lock().unwrap_or_else(PoisonError::into_inner);
        ctx.observers.remove(&observer_id);

        if let Some(source_id) = ctx.observer_source.remove(&observer_id) {
            if let Some(list) = ctx.subscribers.get_mut(&source_id) {
                list.retain(|id| *id != observer_id);
                if list.is_empty() {
                    ctx.subscribers.remove(&source_id);
                }
            }
        }
    }

    fn clear(&self) {
        let mut ctx = self.context.lock().unwrap_or_else(PoisonError::into_inner);
        ctx.clear();
    }
}

/// Reactive runtime owning the subscriber registry for signals.
///
/// Supports both a global runtime (default) and scoped runtimes for isolation.
/// A signal binds to the runtime that is current when it is created and keeps
/// using it afterwards, so values pushed from spawned tasks reach the same
/// subscribers.
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use profile_views::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use profile_views::runtime::ReactiveRuntime;
/// use profile_views::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// // Runtime and all its state is dropped here
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    inner: Arc<RwLock<RuntimeInner>>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(vec![]) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            inner: Arc::new(RwLock::new(RuntimeInner::new())),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// The runtime is dropped when the function returns, unless a signal
    /// created inside still holds it.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(Self::global)
        })
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// ```
    /// use profile_views::runtime::ReactiveRuntime;
    /// use profile_views::Signal;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime.clone(), || {
    ///     let signal = Signal::new(42);
    ///     let _guard = signal.subscribe(|_| {});
    ///     assert_eq!(signal.subscriber_count(), 1);
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Drop every subscription and reset the ID counter.
    pub fn clear(&self) {
        let inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    /// Get a reference to the inner runtime state.
    pub fn inner(&self) -> Arc<RwLock<RuntimeInner>> {
        Arc::clone(&self.inner)
    }

    /// Generate the next unique ID for a source or observer.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register `callback` to run whenever `source_id` is notified.
    ///
    /// Returns the observer ID to pass to [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, source_id: usize, callback: F) -> usize
    where
        F: Fn() + Send + Sync + 'static,
    {
        let observer_id = self.next_id();
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ctx = inner.context.lock().unwrap_or_else(PoisonError::into_inner);

        ctx.observers.insert(observer_id, Arc::new(callback));
        ctx.observer_source.insert(observer_id, source_id);
        ctx.subscribers.entry(source_id).or_default().push(observer_id);

        observer_id
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, observer_id: usize) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.remove_observer(observer_id);
    }

    /// Run every callback subscribed to `source_id`.
    ///
    /// Callbacks are collected first and invoked with no lock held, so a
    /// callback may set other signals or unsubscribe itself. An observer
    /// removed by an earlier callback in the same pass is skipped.
    pub fn notify(&self, source_id: usize) {
        let observer_ids = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let ctx = inner.context.lock().unwrap_or_else(PoisonError::into_inner);
            match ctx.subscribers.get(&source_id) {
                Some(ids) => ids.clone(),
                None => return,
            }
        };

        for observer_id in observer_ids {
            let callback = {
                let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
                let ctx = inner.context.lock().unwrap_or_else(PoisonError::into_inner);
                ctx.observers.get(&observer_id).cloned()
            };

            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Number of live subscriptions on `source_id`.
    pub fn subscriber_count(&self, source_id: usize) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let ctx = inner.context.lock().unwrap_or_else(PoisonError::into_inner);
        ctx.subscribers.get(&source_id).map_or(0, Vec::len)
    }
}
