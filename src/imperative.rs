//! Selector view driven by explicit state assignments.
//!
//! Every click writes the selection and the loading flag, starts a lookup,
//! and writes the result when it settles. Lookups are never cancelled when a
//! newer click comes in, so a slow stale response can overwrite a newer
//! profile.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{Profile, ProfileSource};
use crate::config::Settings;
use crate::markup::{DetailPane, ViewTree};
use crate::signal::WatchGuard;
use crate::store::Store;
use crate::view::{ChangeCallback, SelectorView};

/// Whether the detail pane is waiting on a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Loading,
    Loaded,
}

/// Everything the imperative view renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImperativeState {
    pub active_name: String,
    /// Last profile a lookup returned. Kept when a later lookup fails.
    pub detail: Option<Profile>,
    pub status: FetchStatus,
}

/// Selector that assigns its state by hand on every click.
///
/// Each click starts a lookup and whichever lookup finishes last wins, so a
/// slow response for an old name can replace a newer one. Unmounting stops
/// pending lookups from writing.
pub struct ImperativeView {
    names: Vec<String>,
    store: Store<ImperativeState>,
    source: Arc<dyn ProfileSource>,
    mounted: AtomicBool,
    teardown: CancellationToken,
}

impl ImperativeView {
    /// Create an unmounted view selecting the first configured name.
    pub fn new(source: Arc<dyn ProfileSource>, settings: &Settings) -> Self {
        Self {
            names: settings.names.clone(),
            store: Store::new(ImperativeState {
                active_name: settings.default_name().to_string(),
                detail: None,
                status: FetchStatus::Loading,
            }),
            source,
            mounted: AtomicBool::new(false),
            teardown: CancellationToken::new(),
        }
    }

    /// Snapshot of the three state fields.
    pub fn state(&self) -> ImperativeState {
        self.store.get()
    }

    /// Whether [`SelectorView::unmount`] ran.
    pub fn is_unmounted(&self) -> bool {
        self.teardown.is_cancelled()
    }
}

impl SelectorView for ImperativeView {
    fn mount(&self) {
        if self.mounted.swap(true, Ordering::SeqCst) || self.is_unmounted() {
            return;
        }
        let initial = self.store.read(|s| s.active_name.clone());
        info!(name = %initial, "Mounting imperative view");
        self.select_name(&initial);
    }

    fn select_name(&self, name: &str) {
        if self.is_unmounted() {
            debug!(name, "Ignoring selection after unmount");
            return;
        }

        self.store.update(|s| {
            s.active_name = name.to_string();
            s.status = FetchStatus::Loading;
        });

        let store = self.store.clone();
        let source = Arc::clone(&self.source);
        let teardown = self.teardown.clone();
        let name = name.to_string();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = teardown.cancelled() => return,
                result = source.fetch(&name) => result,
            };

            match result {
                Ok(profile) => store.update(|s| s.detail = Some(profile)),
                // The previous profile (if any) stays in place
                Err(e) => warn!(name = %name, error = %e, "Profile lookup failed"),
            }

            // Settles whatever the outcome
            store.update(|s| s.status = FetchStatus::Loaded);
        });
    }

    fn render(&self) -> ViewTree {
        self.store.read(|s| {
            let detail = match s.status {
                FetchStatus::Loading => DetailPane::Loading,
                FetchStatus::Loaded => DetailPane::Loaded(s.detail.clone()),
            };
            ViewTree::new(&self.names, &s.active_name, detail)
        })
    }

    fn subscribe(&self, on_change: ChangeCallback) -> Vec<WatchGuard> {
        vec![self.store.subscribe(move |_| on_change())]
    }

    fn unmount(&self) {
        info!("Unmounting imperative view");
        self.teardown.cancel();
    }
}

impl Drop for ImperativeView {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}
