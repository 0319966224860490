//! Session and group registries.
//!
//! These are plain in-memory tables owned by the engine. They do no locking
//! of their own; the engine wraps each one in a lock and never holds it
//! across a suspension point.

mod group;
mod session;

pub use group::{Group, GroupRegistry, GroupSpec, GroupUpdate};
pub use session::SessionRegistry;
