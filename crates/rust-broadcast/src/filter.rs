//! Session filters.
//!
//! Filters are pure predicates over a [`Session`](crate::types::Session).
//! They are evaluated once, when a group is created, to compute its initial
//! membership.
//!
//! # Example
//!
//! ```
//! use rust_broadcast::filter::{Filter, FilterEvaluator, FilterOperator};
//! use rust_broadcast::registry::SessionRegistry;
//! use rust_broadcast::types::{NewSession, SessionType};
//!
//! let mut sessions = SessionRegistry::new();
//! let web = sessions.register(NewSession::new("web-1", SessionType::Remote).tag("dev"));
//! sessions.register(NewSession::new("db-1", SessionType::Vm).tag("dev"));
//!
//! let evaluator = FilterEvaluator::default();
//! let filters = [
//!     Filter::tag(FilterOperator::Contains, "dev"),
//!     Filter::session_type(FilterOperator::Equals, "vm").negated(),
//! ];
//! let members = evaluator.resolve_membership(&filters, sessions.iter());
//! assert_eq!(members.into_iter().collect::<Vec<_>>(), vec![web]);
//! ```

mod cache;
mod eval;
mod predicate;

pub use cache::{CacheStats, DEFAULT_CACHE_SIZE, RegexCache};
pub use eval::FilterEvaluator;
pub use predicate::{Filter, FilterOperator, FilterType};
