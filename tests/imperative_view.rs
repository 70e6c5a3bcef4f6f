mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{profile, ScriptedSource};
use profile_views::{settled, FetchStatus, ImperativeView, SelectorView, Settings};

const LIMIT: Duration = Duration::from_secs(5);

fn view(source: &Arc<ScriptedSource>) -> ImperativeView {
    ImperativeView::new(source.clone(), &Settings::default())
}

async fn drain_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn mount_fetches_default_exactly_once() {
    let source = ScriptedSource::new();
    let view = view(&source);
    view.mount();

    let tree = settled(&view, LIMIT).await.expect("initial lookup settles");
    assert_eq!(source.calls(), vec!["junegunn".to_string()]);
    assert_eq!(tree.handle(), Some("junegunn"));
    assert_eq!(view.state().detail, Some(profile("junegunn")));
}

#[tokio::test(start_paused = true)]
async fn selection_writes_state_before_the_lookup_settles() {
    let source = ScriptedSource::new();
    source.hold("gaearon");
    let view = view(&source);
    view.mount();
    settled(&view, LIMIT).await.expect("initial lookup settles");

    view.select_name("gaearon");
    let state = view.state();
    assert_eq!(state.active_name, "gaearon");
    assert_eq!(state.status, FetchStatus::Loading);
    // The previous profile is still stored while loading
    assert_eq!(state.detail, Some(profile("junegunn")));

    source.release("gaearon");
    let tree = settled(&view, LIMIT).await.expect("lookup settles");
    assert_eq!(tree.handle(), Some("gaearon"));
}

// Current behavior, not intended behavior: a failed lookup still flips the
// status to loaded and renders whatever profile was stored before.
#[tokio::test(start_paused = true)]
async fn failed_lookup_is_reported_as_loaded_with_stale_profile() {
    let source = ScriptedSource::new();
    source.fail("gaearon");
    let view = view(&source);
    view.mount();
    settled(&view, LIMIT).await.expect("initial lookup settles");

    view.select_name("gaearon");
    let tree = settled(&view, LIMIT).await.expect("failure settles");

    assert_eq!(view.state().status, FetchStatus::Loaded);
    assert_eq!(tree.active_name(), Some("gaearon"));
    assert_eq!(tree.handle(), Some("junegunn"));
}

// Current behavior, not intended behavior: a first lookup that fails leaves a
// loaded pane with no profile in it.
#[tokio::test(start_paused = true)]
async fn failed_first_lookup_renders_an_empty_loaded_pane() {
    let source = ScriptedSource::new();
    source.fail("junegunn");
    let view = view(&source);
    view.mount();

    let tree = settled(&view, LIMIT).await.expect("failure settles");
    assert_eq!(view.state().detail, None);
    assert_eq!(tree.handle(), Some(""));
    assert_eq!(tree.image_src(), None);
    assert!(tree.to_html().contains("<div class=\"detail\">name: </div>"));
}

// Current behavior, not intended behavior: no cancellation, so a stale
// response that lands last overwrites the newer profile.
#[tokio::test(start_paused = true)]
async fn stale_response_can_overwrite_a_newer_one() {
    let source = ScriptedSource::new();
    source.hold("junegunn");
    let view = view(&source);
    view.mount();

    view.select_name("gaearon");
    let tree = settled(&view, LIMIT).await.expect("lookup settles");
    assert_eq!(tree.handle(), Some("gaearon"));

    source.release("junegunn");
    drain_tasks().await;

    let state = view.state();
    assert_eq!(state.active_name, "gaearon");
    assert_eq!(state.detail, Some(profile("junegunn")));
    assert_eq!(view.render().handle(), Some("junegunn"));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_view_abandons_lookups() {
    let source = ScriptedSource::new();
    source.hold("junegunn");
    let view = view(&source);
    view.mount();

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    let _guards = view.subscribe(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    drop(view);
    source.release("junegunn");
    drain_tasks().await;

    assert_eq!(changes.load(Ordering::SeqCst), 0);
    assert_eq!(source.calls_for("junegunn"), 1);
}
