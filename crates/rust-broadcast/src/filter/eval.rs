//! Filter evaluation.

use std::collections::BTreeSet;

use tracing::debug;

use super::cache::RegexCache;
use super::predicate::{Filter, FilterOperator, FilterType};
use crate::types::{Session, SessionId};

/// Evaluates filters against sessions.
///
/// Regex filters are compiled through a shared [`RegexCache`]. A pattern that
/// fails to compile is a non-match, never an error.
#[derive(Debug, Default)]
pub struct FilterEvaluator {
    cache: RegexCache,
}

impl FilterEvaluator {
    /// Create an evaluator with a regex cache of the given size.
    #[must_use]
    pub fn new(cache_size: usize) -> Self {
        Self {
            cache: RegexCache::new(cache_size),
        }
    }

    /// Get the regex cache.
    #[must_use]
    pub const fn cache(&self) -> &RegexCache {
        &self.cache
    }

    /// Check whether `session` satisfies `filter`.
    #[must_use]
    pub fn matches(&self, session: &Session, filter: &Filter) -> bool {
        let raw = match filter.filter_type {
            FilterType::Tag => session
                .tags
                .iter()
                .any(|tag| self.string_test(tag, filter.operator, &filter.value)),
            FilterType::Name => self.string_test(&session.name, filter.operator, &filter.value),
            FilterType::Type => self.string_test(
                session.session_type.as_str(),
                filter.operator,
                &filter.value,
            ),
            FilterType::Environment => Self::environment_test(session, &filter.value),
            FilterType::Regex => self.regex(&filter.value).is_some_and(|re| {
                re.is_match(&session.name) || session.tags.iter().any(|tag| re.is_match(tag))
            }),
        };
        raw != filter.negate
    }

    /// Check whether `session` satisfies every filter.
    ///
    /// An empty filter list is never satisfied.
    #[must_use]
    pub fn matches_all(&self, session: &Session, filters: &[Filter]) -> bool {
        !filters.is_empty() && filters.iter().all(|f| self.matches(session, f))
    }

    /// Compute group membership from filters.
    ///
    /// An empty filter list yields an empty set: a group without filters
    /// starts with no members, not with every session.
    pub fn resolve_membership<'a, I>(&self, filters: &[Filter], sessions: I) -> BTreeSet<SessionId>
    where
        I: IntoIterator<Item = &'a Session>,
    {
        if filters.is_empty() {
            return BTreeSet::new();
        }
        sessions
            .into_iter()
            .filter(|session| self.matches_all(session, filters))
            .map(|session| session.id)
            .collect()
    }

    fn string_test(&self, subject: &str, operator: FilterOperator, value: &str) -> bool {
        match operator {
            FilterOperator::Equals => subject == value,
            FilterOperator::Contains => subject.contains(value),
            FilterOperator::StartsWith => subject.starts_with(value),
            FilterOperator::EndsWith => subject.ends_with(value),
            FilterOperator::Matches => self.regex(value).is_some_and(|re| re.is_match(subject)),
        }
    }

    fn environment_test(session: &Session, spec: &str) -> bool {
        match spec.split_once('=') {
            Some((key, value)) => session.environment.get(key).is_some_and(|v| v == value),
            None => session.environment.contains_key(spec),
        }
    }

    fn regex(&self, pattern: &str) -> Option<std::sync::Arc<regex::Regex>> {
        match self.cache.get_or_compile(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                debug!(pattern, error = %e, "Invalid filter pattern treated as non-match");
                None
            }
        }
    }
}
