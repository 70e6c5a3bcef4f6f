//! Coarse-grained state containers.
//!
//! A store holds a whole view's state and notifies once per update.

mod store;

pub use store::Store;
