//! Utility modules.

pub mod timeout;

pub use timeout::TimeoutExt;
