use super::{Signal, SwitchMap, WatchGuard};

/// A push-based sequence a view can observe.
pub trait Observable<T>: Send + Sync {
    /// The value available right now, if any.
    fn current(&self) -> Option<T>;

    /// Subscribe to values pushed after this call.
    fn subscribe_boxed(&self, callback: Box<dyn Fn(T) + Send + Sync>) -> WatchGuard;
}

impl<T: Clone + Send + Sync + 'static> Observable<T> for Signal<T> {
    fn current(&self) -> Option<T> {
        Some(self.get())
    }

    fn subscribe_boxed(&self, callback: Box<dyn Fn(T) + Send + Sync>) -> WatchGuard {
        self.subscribe(callback)
    }
}

impl<U, E> Observable<U> for SwitchMap<U, E>
where
    U: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn current(&self) -> Option<U> {
        self.output().get()
    }

    fn subscribe_boxed(&self, callback: Box<dyn Fn(U) + Send + Sync>) -> WatchGuard {
        self.output().subscribe(move |value| {
            if let Some(value) = value {
                callback(value);
            }
        })
    }
}

/// View-local state that follows an [`Observable`].
///
/// Construction reads the source's current value synchronously, so the first
/// render already has it, then subscribes for later pushes. Dropping the
/// adapter unsubscribes; its state is never written afterwards.
pub struct Observed<T> {
    state: Signal<Option<T>>,
    _guard: WatchGuard,
}

impl<T: Clone + Send + Sync + 'static> Observed<T> {
    pub fn new<O>(source: &O) -> Self
    where
        O: Observable<T> + ?Sized,
    {
        let state = Signal::new(source.current());
        let target = state.clone();
        let guard = source.subscribe_boxed(Box::new(move |value: T| target.set(Some(value))));

        Self {
            state,
            _guard: guard,
        }
    }

    /// Latest observed value.
    pub fn get(&self) -> Option<T> {
        self.state.get()
    }

    /// The state signal, for hosts that re-render on change.
    pub fn state(&self) -> &Signal<Option<T>> {
        &self.state
    }
}
