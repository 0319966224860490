//! Broadcast execution.
//!
//! A broadcast resolves a [`BroadcastTarget`] to a list of active sessions,
//! registers a cancellation token, runs one unit of work per session with
//! the chosen [`Strategy`], and collects one
//! [`SessionResult`](crate::result::SessionResult) per session in target
//! order.
//!
//! Per-session failures (non-zero exit, executor error, timeout,
//! cancellation) are recorded in the results. Only target resolution can
//! fail a broadcast as a whole.

mod cancel;
mod strategy;
mod unit;

pub use cancel::{CancellationRegistry, Registration};
pub use strategy::Strategy;

pub(crate) use unit::run_unit;

use crate::config::Settings;
use crate::types::{BroadcastId, GroupId, SessionId};

/// What a broadcast is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastTarget {
    /// Every member of a stored group, with the group's settings.
    Group(GroupId),
    /// An ad-hoc list of sessions.
    Sessions {
        /// Target sessions, in execution order. Unknown IDs are dropped.
        ids: Vec<SessionId>,
        /// Settings for this broadcast. Engine defaults when `None`.
        settings: Option<Settings>,
        /// Explicit broadcast ID. Generated when `None`.
        broadcast_id: Option<BroadcastId>,
    },
}

impl BroadcastTarget {
    /// Target a group.
    #[must_use]
    pub const fn group(id: GroupId) -> Self {
        Self::Group(id)
    }

    /// Target a list of sessions with default settings.
    pub fn sessions(ids: impl IntoIterator<Item = SessionId>) -> Self {
        Self::Sessions {
            ids: ids.into_iter().collect(),
            settings: None,
            broadcast_id: None,
        }
    }

    /// Use `settings` for a session-list target. Ignored for groups.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        if let Self::Sessions { settings: s, .. } = &mut self {
            *s = Some(settings);
        }
        self
    }

    /// Use an explicit broadcast ID for a session-list target. Ignored for
    /// groups, which always use the group ID.
    #[must_use]
    pub fn with_broadcast_id(mut self, id: impl Into<BroadcastId>) -> Self {
        if let Self::Sessions { broadcast_id, .. } = &mut self {
            *broadcast_id = Some(id.into());
        }
        self
    }

    /// Short description used in errors and log events.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Group(id) => format!("group {id}"),
            Self::Sessions { ids, .. } => format!("{} listed session(s)", ids.len()),
        }
    }
}

impl From<GroupId> for BroadcastTarget {
    fn from(id: GroupId) -> Self {
        Self::Group(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_only_touch_session_targets() {
        let target = BroadcastTarget::group(GroupId::new(1))
            .with_settings(Settings::sequential())
            .with_broadcast_id("x");
        assert_eq!(target, BroadcastTarget::Group(GroupId::new(1)));

        let target = BroadcastTarget::sessions([SessionId::new(1)])
            .with_settings(Settings::sequential())
            .with_broadcast_id("deploy-1");
        match target {
            BroadcastTarget::Sessions {
                ids,
                settings,
                broadcast_id,
            } => {
                assert_eq!(ids, vec![SessionId::new(1)]);
                assert!(!settings.unwrap().parallel_execution);
                assert_eq!(broadcast_id.unwrap().as_str(), "deploy-1");
            }
            BroadcastTarget::Group(_) => panic!("expected session target"),
        }
    }

    #[test]
    fn describe_targets() {
        assert_eq!(BroadcastTarget::group(GroupId::new(4)).describe(), "group group-4");
        assert_eq!(
            BroadcastTarget::sessions([SessionId::new(1), SessionId::new(2)]).describe(),
            "2 listed session(s)"
        );
    }
}
