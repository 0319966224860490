//! Mock executor support for testing.
//!
//! This module provides a scripted [`SessionExecutor`](crate::executor::SessionExecutor)
//! so broadcasts can be tested without reaching a real endpoint. It includes:
//!
//! - [`MockExecutor`]: per-session scripted responses
//! - [`MockResponse`]: output, exit code, delay, error or hang
//! - [`fixtures`]: ready-made session descriptions
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use rust_broadcast::mock::{MockExecutor, MockResponse};
//! use rust_broadcast::types::SessionId;
//!
//! let executor = MockExecutor::new()
//!     .respond(SessionId::new(1), MockResponse::success("ok"))
//!     .respond(
//!         SessionId::new(2),
//!         MockResponse::output("boom", 1).delay(Duration::from_millis(20)),
//!     );
//! ```

mod executor;
pub mod fixtures;

pub use executor::{MockCall, MockExecutor, MockResponse};
