//! Runtime support for reactive primitives.
//!
//! This module provides the subscriber registry behind every signal and the
//! scoped runtimes used to isolate it.

mod context;

pub use context::{ReactiveRuntime, RuntimeInner};
