use super::{Signal, WatchGuard};
use futures::future::{self, FutureExt};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Emit `first`, then everything `rest` yields.
pub fn start_with<'a, T, S>(first: T, rest: S) -> BoxStream<'a, T>
where
    T: Send + 'a,
    S: Stream<Item = T> + Send + 'a,
{
    stream::once(future::ready(first)).chain(rest).boxed()
}

/// Hold back every `Ok` item by `delay`. Errors pass through undelayed.
pub fn delay_values<'a, T, E, S>(source: S, delay: Duration) -> BoxStream<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
    S: Stream<Item = Result<T, E>> + Send + 'a,
{
    source
        .then(move |item| async move {
            if item.is_ok() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            item
        })
        .boxed()
}

struct SwitchState<E> {
    // Held while bumping the generation and while writing an item, never
    // across a notification.
    emit: Mutex<()>,
    generation: AtomicU64,
    terminated: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    error: Mutex<Option<Arc<E>>>,
    source_guard: Mutex<Option<WatchGuard>>,
}

impl<E> SwitchState<E> {
    fn is_current(&self, generation: u64) -> bool {
        !self.terminated.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    fn next_generation(&self) -> u64 {
        let _emit = self.emit.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Write `item` if `generation` is still the latest, then notify.
    ///
    /// Returns whether `generation` is still the latest afterwards; a
    /// subscriber may have pushed a new source value during the notification.
    fn emit<U>(&self, target: &Signal<Option<U>>, generation: u64, item: U) -> bool
    where
        U: Clone + Send + Sync + 'static,
    {
        {
            let _emit = self.emit.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_current(generation) {
                return false;
            }
            target.replace_silently(Some(item));
        }
        target.notify();
        self.is_current(generation)
    }

    /// Keep `task` as the in-flight inner stream, or abort it if a newer
    /// generation already started.
    fn install_task(&self, generation: u64, task: JoinHandle<()>) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_current(generation) {
            *slot = Some(task);
        } else {
            task.abort();
        }
    }

    fn abort_task(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }

    /// Stop for good: no further emissions, no further inner streams.
    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.next_generation();
        self.abort_task();
        let guard = self
            .source_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(guard);
    }

    fn fail(&self, error: E)
    where
        E: Display,
    {
        warn!(error = %error, "switch_map inner stream failed, terminating");
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(error));
        self.terminate();
    }
}

/// Result of [`Signal::switch_map`]: follows the inner stream of the latest
/// source value only.
///
/// Every new source value supersedes the previous inner stream: its task is
/// aborted and a generation counter keeps any late item from being written.
/// Items the new inner stream has ready immediately are emitted before the
/// source's `set` returns. An `Err` item terminates the whole operator; the
/// error is kept in [`error`](Self::error) and nothing is emitted afterwards.
///
/// Must be created and fed from within a tokio runtime.
pub struct SwitchMap<U, E> {
    output: Signal<Option<U>>,
    state: Arc<SwitchState<E>>,
}

impl<U, E> SwitchMap<U, E>
where
    U: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Latest emitted value; `None` before the first emission.
    pub fn output(&self) -> &Signal<Option<U>> {
        &self.output
    }

    /// The error that terminated the operator, if any.
    pub fn error(&self) -> Option<Arc<E>> {
        self.state
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the operator stopped, by error or by [`dispose`](Self::dispose).
    pub fn is_terminated(&self) -> bool {
        self.state.terminated.load(Ordering::SeqCst)
    }

    /// Number of inner streams started so far (plus one per termination).
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::SeqCst)
    }

    /// Unsubscribe from the source and abort the in-flight inner stream.
    pub fn dispose(&self) {
        self.state.terminate();
    }
}

impl<U, E> Drop for SwitchMap<U, E> {
    fn drop(&mut self) {
        self.state.terminate();
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Map every value to an inner stream and follow only the latest one.
    ///
    /// The current value is mapped right away.
    pub fn switch_map<U, E, S, F>(&self, f: F) -> SwitchMap<U, E>
    where
        U: Clone + Send + Sync + 'static,
        E: Display + Send + Sync + 'static,
        S: Stream<Item = Result<U, E>> + Send + 'static,
        F: Fn(T) -> S + Send + Sync + 'static,
    {
        let output = Signal::new(None);
        let state = Arc::new(SwitchState {
            emit: Mutex::new(()),
            generation: AtomicU64::new(0),
            terminated: AtomicBool::new(false),
            task: Mutex::new(None),
            error: Mutex::new(None),
            source_guard: Mutex::new(None),
        });

        let target = output.clone();
        let shared = Arc::clone(&state);
        let guard = self.watch(move |value| {
            if shared.terminated.load(Ordering::SeqCst) {
                return;
            }
            let generation = shared.next_generation();
            shared.abort_task();
            debug!(generation, "switch_map starting inner stream");

            let mut inner = Box::pin(f(value));

            // Emit whatever is ready right now
            loop {
                match inner.next().now_or_never() {
                    Some(Some(Ok(item))) => {
                        if !shared.emit(&target, generation, item) {
                            return;
                        }
                    }
                    Some(Some(Err(error))) => {
                        if shared.is_current(generation) {
                            shared.fail(error);
                        }
                        return;
                    }
                    Some(None) => return,
                    None => break,
                }
            }

            let task_state = Arc::clone(&shared);
            let task_target = target.clone();
            let task = tokio::spawn(async move {
                while let Some(item) = inner.next().await {
                    match item {
                        Ok(item) => {
                            if !task_state.emit(&task_target, generation, item) {
                                return;
                            }
                        }
                        Err(error) => {
                            if task_state.is_current(generation) {
                                task_state.fail(error);
                            }
                            return;
                        }
                    }
                }
            });
            shared.install_task(generation, task);
        });

        // A terminal error during the initial drain leaves the guard unused
        if state.terminated.load(Ordering::SeqCst) {
            drop(guard);
        } else {
            *state
                .source_guard
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(guard);
        }

        SwitchMap { output, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ReactiveRuntime;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    struct Boom;

    impl Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    fn scoped<R>(f: impl FnOnce() -> R) -> R {
        ReactiveRuntime::with_runtime(ReactiveRuntime::new(), f)
    }

    #[tokio::test]
    async fn ready_items_are_emitted_synchronously() {
        let (source, mapped) = scoped(|| {
            let source = Signal::new(1);
            let mapped = source.switch_map(|n: i32| stream::iter(vec![Ok::<_, Boom>(n * 10)]));
            (source, mapped)
        });

        assert_eq!(mapped.output().get(), Some(10));
        source.set(2);
        assert_eq!(mapped.output().get(), Some(20));
        assert_eq!(mapped.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_inner_stream_never_emits() {
        let (tx_first, rx_first) = oneshot::channel::<i32>();
        let receivers = Arc::new(Mutex::new(vec![rx_first]));

        let (source, mapped) = scoped(|| {
            let source = Signal::new(0);
            let receivers = Arc::clone(&receivers);
            let mapped = source.switch_map(move |n: i32| {
                let pending = receivers.lock().unwrap().pop();
                let inner = async move {
                    match pending {
                        Some(rx) => Ok::<_, Boom>(rx.await.unwrap_or(-1)),
                        None => Ok(n),
                    }
                };
                start_with(Ok(-100), stream::once(inner))
            });
            (source, mapped)
        });

        assert_eq!(mapped.output().get(), Some(-100));
        source.set(5);
        assert_eq!(mapped.output().get(), Some(5));

        tokio::time::sleep(Duration::from_millis(10)).await;

        // The aborted first stream dropped its receiver
        assert!(tx_first.send(99).is_err());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(mapped.output().get(), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_items_arrive_after_delay() {
        let mapped = scoped(|| {
            let source = Signal::new(3);
            source.switch_map(|n: i32| {
                start_with(
                    Ok::<_, Boom>(0),
                    delay_values(stream::once(async move { Ok(n) }), Duration::from_secs(1)),
                )
            })
        });

        assert_eq!(mapped.output().get(), Some(0));
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(mapped.output().get(), Some(0));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(mapped.output().get(), Some(3));
    }

    #[tokio::test]
    async fn error_terminates_and_keeps_last_value() {
        let (source, mapped) = scoped(|| {
            let source = Signal::new(1);
            let mapped = source.switch_map(|n: i32| {
                let item = if n < 0 { Err(Boom) } else { Ok(n) };
                stream::iter(vec![item])
            });
            (source, mapped)
        });

        source.set(-1);
        assert!(mapped.is_terminated());
        assert_eq!(mapped.error().map(|e| e.to_string()), Some("boom".into()));
        assert_eq!(source.subscriber_count(), 0);

        source.set(7);
        assert_eq!(mapped.output().get(), Some(1));
    }

    #[tokio::test]
    async fn reentrant_set_from_output_subscriber_keeps_latest() {
        let (source, mapped) = scoped(|| {
            let source = Signal::new(0);
            let mapped = source.switch_map(|n: i32| {
                stream::iter(vec![Ok::<_, Boom>(n), Ok(n * 100)])
            });
            (source, mapped)
        });

        let redirected = Arc::new(AtomicBool::new(false));
        let _redirect = {
            let source = source.clone();
            let redirected = Arc::clone(&redirected);
            mapped.output().subscribe(move |value| {
                if value == Some(1) && !redirected.swap(true, Ordering::SeqCst) {
                    source.set(2);
                }
            })
        };

        source.set(1);

        assert!(redirected.load(Ordering::SeqCst));
        assert_eq!(source.get(), 2);
        assert_eq!(mapped.output().get(), Some(200));
        assert_eq!(mapped.generation(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_generation_cannot_replace_newer_task() {
        // Every live inner stream holds a clone
        let live = Arc::new(());
        let (source, mapped) = scoped(|| {
            let source = Signal::new(0);
            let live = Arc::clone(&live);
            let mapped = source.switch_map(move |n: i32| {
                let held = Arc::clone(&live);
                let lookup = stream::once(async move {
                    let _held = held;
                    Ok(n * 100)
                });
                start_with(Ok::<_, Boom>(n), delay_values(lookup, Duration::from_secs(1)))
            });
            (source, mapped)
        });

        let redirected = Arc::new(AtomicBool::new(false));
        let _redirect = {
            let source = source.clone();
            let redirected = Arc::clone(&redirected);
            mapped.output().subscribe(move |value| {
                if value == Some(1) && !redirected.swap(true, Ordering::SeqCst) {
                    source.set(2);
                }
            })
        };

        source.set(1);
        assert_eq!(mapped.output().get(), Some(2));

        // Disposing must reach the task of the newest generation
        mapped.dispose();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(Arc::strong_count(&live), 1);
        assert_eq!(mapped.output().get(), Some(2));
    }

    #[tokio::test]
    async fn dispose_unsubscribes_from_source() {
        let (source, mapped) = scoped(|| {
            let source = Signal::new(1);
            let mapped = source.switch_map(|n: i32| stream::iter(vec![Ok::<_, Boom>(n)]));
            (source, mapped)
        });

        assert_eq!(source.subscriber_count(), 1);
        mapped.dispose();
        assert_eq!(source.subscriber_count(), 0);
        source.set(2);
        assert_eq!(mapped.output().get(), Some(1));
    }
}
