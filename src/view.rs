//! What a host needs from a selector view.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::markup::ViewTree;
use crate::signal::WatchGuard;

/// Re-render hook passed to [`SelectorView::subscribe`].
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// A clickable list of names with a profile pane.
///
/// Implementations spawn tokio tasks, so calls must come from within a tokio
/// runtime.
pub trait SelectorView: Send + Sync {
    /// First render. Only the first call has an effect.
    fn mount(&self);

    /// Click on `name`.
    fn select_name(&self, name: &str);

    fn render(&self) -> ViewTree;

    /// Call `on_change` whenever the rendered tree may have changed.
    fn subscribe(&self, on_change: ChangeCallback) -> Vec<WatchGuard>;

    /// Tear down. In-flight lookups never touch the view afterwards.
    fn unmount(&self);
}

/// Wait until `view` renders something other than the loading pane.
///
/// Returns `None` if that does not happen within `limit`.
pub async fn settled(view: &dyn SelectorView, limit: Duration) -> Option<ViewTree> {
    let changed = Arc::new(Notify::new());
    let notifier = Arc::clone(&changed);
    let _guards = view.subscribe(Arc::new(move || notifier.notify_one()));

    tokio::time::timeout(limit, async {
        loop {
            let tree = view.render();
            if !tree.is_loading() {
                return tree;
            }
            changed.notified().await;
        }
    })
    .await
    .ok()
}
