//! # profile-views
//!
//! Two ways of wiring a view to an asynchronous profile lookup, side by side.
//!
//! ## Views
//!
//! - [`ImperativeView`] - selection, profile and loading flag kept in a
//!   [`Store`] and assigned by hand on every click
//! - [`ReactiveView`] - selection kept in a [`Signal`], the detail pane
//!   derived with [`Signal::switch_map`] so only the latest lookup is shown
//!
//! Both render the same [`ViewTree`] and implement [`SelectorView`].
//!
//! ## Primitives
//!
//! - `Signal<T>` - latest-value holder with subscribe/unsubscribe
//! - `Observed<T>` - view state that drains a source's current value, then
//!   follows it
//! - `SwitchMap<U, E>` - follow the inner stream of the latest value only
//! - `Store<T>` - whole-state container for the imperative view

pub mod client;
pub mod config;
pub mod error;
pub mod imperative;
pub mod markup;
pub mod reactive;
pub mod runtime;
pub mod signal;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use client::{GithubClient, Profile, ProfileSource};
pub use config::{ErrorPolicy, Settings};
pub use error::{Error, Result};
pub use imperative::{FetchStatus, ImperativeState, ImperativeView};
pub use markup::{DetailPane, ViewTree};
pub use reactive::{DetailState, ReactiveView};
pub use signal::{Observable, Observed, Signal, SwitchMap, WatchGuard};
pub use store::Store;
pub use view::{settled, SelectorView};
