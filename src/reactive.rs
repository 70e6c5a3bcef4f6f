//! Selector view built from composed streams.
//!
//! The selection lives in a [`Signal`]. The detail pane follows
//! `selection.switch_map(lookup)`, where each lookup stream starts with a
//! loading placeholder and then yields the profile after an artificial
//! delay. Switching drops the previous lookup, so only the latest selection
//! can ever reach the pane.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info};

use crate::client::{Profile, ProfileSource};
use crate::config::{ErrorPolicy, Settings};
use crate::error::{Error, Result};
use crate::markup::{DetailPane, ViewTree};
use crate::signal::{delay_values, start_with, Observed, Signal, SwitchMap, WatchGuard};
use crate::view::{ChangeCallback, SelectorView};

/// Value flowing out of the detail pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    Loaded(Profile),
    /// Only produced under [`ErrorPolicy::Surface`].
    Failed(String),
}

impl From<DetailState> for DetailPane {
    fn from(state: DetailState) -> Self {
        match state {
            DetailState::Loading => DetailPane::Loading,
            DetailState::Loaded(profile) => DetailPane::Loaded(Some(profile)),
            DetailState::Failed(message) => DetailPane::Failed(message),
        }
    }
}

/// One lookup: `Loading` right away, then the profile after `delay`.
pub fn detail_stream(
    source: Arc<dyn ProfileSource>,
    name: String,
    delay: Duration,
    policy: ErrorPolicy,
) -> BoxStream<'static, Result<DetailState>> {
    let lookup = stream::once(async move { source.fetch(&name).await });
    let loaded = delay_values(lookup, delay).map(move |result| match (result, policy) {
        (Ok(profile), _) => Ok(DetailState::Loaded(profile)),
        (Err(e), ErrorPolicy::Surface) => Ok(DetailState::Failed(e.to_string())),
        (Err(e), ErrorPolicy::Terminate) => Err(e),
    });
    start_with(Ok(DetailState::Loading), loaded)
}

// Field order is drop order: adapters first, then the pipeline.
struct Mounted {
    active: Observed<String>,
    detail: Observed<DetailState>,
    pipeline: SwitchMap<DetailState, Error>,
}

/// Selector whose detail pane is derived from the selection.
///
/// Clicks push names into a [`Signal`]; `switch_map` turns the latest name
/// into a detail stream and drops the lookup of any earlier name.
pub struct ReactiveView {
    names: Vec<String>,
    active_name: Signal<String>,
    source: Arc<dyn ProfileSource>,
    delay: Duration,
    policy: ErrorPolicy,
    mounted: Mutex<Option<Mounted>>,
    unmounted: AtomicBool,
}

impl ReactiveView {
    /// Create an unmounted view. The selection starts at the first
    /// configured name; nothing is fetched until mount.
    pub fn new(source: Arc<dyn ProfileSource>, settings: &Settings) -> Self {
        Self {
            names: settings.names.clone(),
            active_name: Signal::new(settings.default_name().to_string()),
            source,
            delay: settings.reactive_delay(),
            policy: settings.error_policy,
            mounted: Mutex::new(None),
            unmounted: AtomicBool::new(false),
        }
    }

    /// The selection holder clicks push into.
    pub fn active_name(&self) -> &Signal<String> {
        &self.active_name
    }

    /// Latest detail value seen by the view; `None` before mount.
    pub fn detail(&self) -> Option<DetailState> {
        self.with_mounted(|m| m.detail.get()).flatten()
    }

    /// The error that stopped the pipeline, if it stopped.
    pub fn pipeline_error(&self) -> Option<Arc<Error>> {
        self.with_mounted(|m| m.pipeline.error()).flatten()
    }

    /// Whether [`SelectorView::unmount`] ran.
    pub fn is_unmounted(&self) -> bool {
        self.unmounted.load(Ordering::SeqCst)
    }

    fn with_mounted<R>(&self, f: impl FnOnce(&Mounted) -> R) -> Option<R> {
        let mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        mounted.as_ref().map(f)
    }
}

impl SelectorView for ReactiveView {
    fn mount(&self) {
        if self.is_unmounted() {
            return;
        }
        let mut mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        if mounted.is_some() {
            return;
        }
        info!(name = %self.active_name.get(), "Mounting reactive view");

        let source = Arc::clone(&self.source);
        let delay = self.delay;
        let policy = self.policy;
        let pipeline = self.active_name.switch_map(move |name: String| {
            debug!(name = %name, "Selection changed");
            detail_stream(Arc::clone(&source), name, delay, policy)
        });

        *mounted = Some(Mounted {
            active: Observed::new(&self.active_name),
            detail: Observed::new(&pipeline),
            pipeline,
        });
    }

    fn select_name(&self, name: &str) {
        if self.is_unmounted() {
            debug!(name, "Ignoring selection after unmount");
            return;
        }
        self.active_name.set(name.to_string());
    }

    fn render(&self) -> ViewTree {
        let rendered = self.with_mounted(|m| {
            let active = m.active.get().unwrap_or_else(|| self.active_name.get());
            let detail = m.detail.get().map_or(DetailPane::Loading, DetailPane::from);
            (active, detail)
        });
        let (active, detail) =
            rendered.unwrap_or_else(|| (self.active_name.get(), DetailPane::Loading));
        ViewTree::new(&self.names, &active, detail)
    }

    fn subscribe(&self, on_change: ChangeCallback) -> Vec<WatchGuard> {
        self.with_mounted(|m| {
            let on_active = Arc::clone(&on_change);
            let on_detail = Arc::clone(&on_change);
            vec![
                m.active.state().subscribe(move |_| on_active()),
                m.detail.state().subscribe(move |_| on_detail()),
            ]
        })
        .unwrap_or_default()
    }

    fn unmount(&self) {
        info!("Unmounting reactive view");
        self.unmounted.store(true, Ordering::SeqCst);
        let mounted = self
            .mounted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(mounted);
    }
}
