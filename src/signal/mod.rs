//! Push-based reactive primitives.
//!
//! This module provides the building blocks the views are made of:
//! - Signals: latest-value holders with subscribe/unsubscribe
//! - Observed: view-local state that follows a signal or pipeline
//! - Switch-map: follow only the inner stream of the latest value

mod observed;
mod signal;
mod switch;

pub use observed::{Observable, Observed};
pub use signal::{Signal, WatchGuard};
pub use switch::{delay_values, start_with, SwitchMap};
