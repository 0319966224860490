//! Session groups.
//!
//! A group's membership is computed from its filters once, at creation.
//! After that it changes only through explicit add/remove calls, an update
//! that carries a new filter list, or the cascade when a session is removed.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::session::SessionRegistry;
use crate::config::Settings;
use crate::filter::{Filter, FilterEvaluator};
use crate::types::{GroupId, SessionId};

/// A named set of sessions with its own broadcast settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Registry-assigned ID.
    pub id: GroupId,
    /// Group name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Member sessions, ordered by ID.
    pub member_ids: BTreeSet<SessionId>,
    /// Filters the membership was derived from.
    pub filters: Vec<Filter>,
    /// Settings used when broadcasting to this group.
    pub settings: Settings,
    /// When the group was created.
    pub created_at: SystemTime,
    /// When the group was last broadcast to.
    pub last_used: Option<SystemTime>,
}

impl Group {
    /// Get member count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    /// Check if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    /// Check if a session is a member.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.member_ids.contains(&id)
    }
}

/// Fields for creating a group.
#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    /// Group name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Membership filters.
    pub filters: Vec<Filter>,
    /// Broadcast settings. The engine fills in its default settings when
    /// this is `None`; a bare registry uses [`Settings::default`].
    pub settings: Option<Settings>,
}

impl GroupSpec {
    /// Start a group spec with no filters and no explicit settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Replace all filters.
    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters = filters.into_iter().collect();
        self
    }

    /// Set the broadcast settings.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// A partial update merged into an existing group.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement filters. Membership is re-resolved when present.
    pub filters: Option<Vec<Filter>>,
    /// Replacement settings.
    pub settings: Option<Settings>,
}

impl GroupUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the filters.
    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters = Some(filters.into_iter().collect());
        self
    }

    /// Replace the settings.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// The table of session groups.
#[derive(Debug, Default, Clone)]
pub struct GroupRegistry {
    groups: BTreeMap<GroupId, Group>,
    next_id: u64,
}

impl GroupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from previously stored groups.
    ///
    /// Like [`SessionRegistry::restore`], numbering resumes at `next_id` or
    /// after the highest restored ID, whichever is larger.
    #[must_use]
    pub fn restore(groups: Vec<Group>, next_id: u64) -> Self {
        let next_id = groups
            .iter()
            .map(|g| g.id.as_u64())
            .max()
            .unwrap_or(0)
            .max(next_id.saturating_sub(1));
        Self {
            groups: groups.into_iter().map(|g| (g.id, g)).collect(),
            next_id,
        }
    }

    /// The ID the next created group will receive.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id + 1
    }

    /// Create a group, resolving its membership against `sessions`.
    pub fn create(
        &mut self,
        spec: GroupSpec,
        sessions: &SessionRegistry,
        evaluator: &FilterEvaluator,
    ) -> GroupId {
        self.next_id += 1;
        let id = GroupId::new(self.next_id);
        let member_ids = evaluator.resolve_membership(&spec.filters, sessions.iter());
        self.groups.insert(
            id,
            Group {
                id,
                name: spec.name,
                description: spec.description,
                member_ids,
                filters: spec.filters,
                settings: spec.settings.unwrap_or_default(),
                created_at: SystemTime::now(),
                last_used: None,
            },
        );
        id
    }

    /// Merge `update` into a group. Returns `false` if the ID is unknown.
    pub fn update(
        &mut self,
        id: GroupId,
        update: GroupUpdate,
        sessions: &SessionRegistry,
        evaluator: &FilterEvaluator,
    ) -> bool {
        let Some(group) = self.groups.get_mut(&id) else {
            return false;
        };
        if let Some(name) = update.name {
            group.name = name;
        }
        if let Some(description) = update.description {
            group.description = description;
        }
        if let Some(settings) = update.settings {
            group.settings = settings;
        }
        if let Some(filters) = update.filters {
            group.member_ids = evaluator.resolve_membership(&filters, sessions.iter());
            group.filters = filters;
        }
        true
    }

    /// Add registered sessions to a group.
    ///
    /// IDs not present in `sessions` are ignored. Returns `false` if the
    /// group is unknown.
    pub fn add_sessions(
        &mut self,
        id: GroupId,
        ids: &[SessionId],
        sessions: &SessionRegistry,
    ) -> bool {
        let Some(group) = self.groups.get_mut(&id) else {
            return false;
        };
        group
            .member_ids
            .extend(ids.iter().copied().filter(|sid| sessions.contains(*sid)));
        true
    }

    /// Remove sessions from a group. Returns `false` if the group is unknown.
    pub fn remove_sessions(&mut self, id: GroupId, ids: &[SessionId]) -> bool {
        let Some(group) = self.groups.get_mut(&id) else {
            return false;
        };
        for sid in ids {
            group.member_ids.remove(sid);
        }
        true
    }

    /// Delete a group.
    pub fn delete(&mut self, id: GroupId) -> Option<Group> {
        self.groups.remove(&id)
    }

    /// Drop a session from every group. Returns how many groups changed.
    pub fn purge_session(&mut self, session: SessionId) -> usize {
        self.groups
            .values_mut()
            .map(|g| g.member_ids.remove(&session))
            .filter(|removed| *removed)
            .count()
    }

    /// Record a broadcast to the group.
    pub fn touch(&mut self, id: GroupId, now: SystemTime) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.last_used = Some(now);
        }
    }

    /// Get a group.
    #[must_use]
    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Iterate over groups in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Get all groups in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Group> {
        self.groups.values().cloned().collect()
    }

    /// Get group count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;
    use crate::types::{NewSession, SessionType};

    fn fleet() -> (SessionRegistry, [SessionId; 3]) {
        let mut sessions = SessionRegistry::new();
        let a = sessions.register(NewSession::new("dev-A", SessionType::Local).tag("dev"));
        let b = sessions.register(NewSession::new("dev-B", SessionType::Local).tag("dev"));
        let x = sessions.register(NewSession::new("prod-X", SessionType::Remote).tag("prod"));
        (sessions, [a, b, x])
    }

    #[test]
    fn create_resolves_filters_once() {
        let (mut sessions, [a, b, _]) = fleet();
        let eval = FilterEvaluator::default();
        let mut groups = GroupRegistry::new();

        let id = groups.create(
            GroupSpec::new("dev").filter(Filter::tag(FilterOperator::Contains, "dev")),
            &sessions,
            &eval,
        );
        assert_eq!(
            groups.get(id).unwrap().member_ids,
            BTreeSet::from([a, b])
        );

        // A later matching session does not join automatically.
        sessions.register(NewSession::new("dev-C", SessionType::Local).tag("dev"));
        assert_eq!(groups.get(id).unwrap().len(), 2);
    }

    #[test]
    fn create_without_filters_is_empty() {
        let (sessions, _) = fleet();
        let mut groups = GroupRegistry::new();
        let id = groups.create(GroupSpec::new("manual"), &sessions, &FilterEvaluator::default());
        assert!(groups.get(id).unwrap().is_empty());
    }

    #[test]
    fn add_ignores_unknown_sessions() {
        let (sessions, [a, _, x]) = fleet();
        let mut groups = GroupRegistry::new();
        let id = groups.create(GroupSpec::new("manual"), &sessions, &FilterEvaluator::default());

        assert!(groups.add_sessions(id, &[a, SessionId::new(77), x], &sessions));
        assert_eq!(groups.get(id).unwrap().member_ids, BTreeSet::from([a, x]));

        assert!(groups.remove_sessions(id, &[a]));
        assert_eq!(groups.get(id).unwrap().member_ids, BTreeSet::from([x]));

        assert!(!groups.add_sessions(GroupId::new(9), &[a], &sessions));
    }

    #[test]
    fn update_with_filters_reresolves() {
        let (sessions, [a, b, x]) = fleet();
        let eval = FilterEvaluator::default();
        let mut groups = GroupRegistry::new();
        let id = groups.create(
            GroupSpec::new("g").filter(Filter::tag(FilterOperator::Equals, "dev")),
            &sessions,
            &eval,
        );

        assert!(groups.update(id, GroupUpdate::new().name("renamed"), &sessions, &eval));
        let group = groups.get(id).unwrap();
        assert_eq!(group.name, "renamed");
        assert_eq!(group.member_ids, BTreeSet::from([a, b]));

        let prod = [Filter::tag(FilterOperator::Equals, "prod")];
        assert!(groups.update(id, GroupUpdate::new().filters(prod), &sessions, &eval));
        assert_eq!(groups.get(id).unwrap().member_ids, BTreeSet::from([x]));
    }

    #[test]
    fn purge_session_cascades() {
        let (sessions, [a, b, _]) = fleet();
        let eval = FilterEvaluator::default();
        let mut groups = GroupRegistry::new();
        let dev = Filter::tag(FilterOperator::Equals, "dev");
        let g1 = groups.create(GroupSpec::new("one").filter(dev.clone()), &sessions, &eval);
        let g2 = groups.create(GroupSpec::new("two").filter(dev), &sessions, &eval);

        assert_eq!(groups.purge_session(a), 2);
        assert_eq!(groups.get(g1).unwrap().member_ids, BTreeSet::from([b]));
        assert_eq!(groups.get(g2).unwrap().member_ids, BTreeSet::from([b]));
        assert_eq!(groups.purge_session(a), 0);
    }

    #[test]
    fn touch_sets_last_used() {
        let (sessions, _) = fleet();
        let mut groups = GroupRegistry::new();
        let id = groups.create(GroupSpec::new("g"), &sessions, &FilterEvaluator::default());
        assert!(groups.get(id).unwrap().last_used.is_none());

        groups.touch(id, SystemTime::UNIX_EPOCH);
        assert_eq!(groups.get(id).unwrap().last_used, Some(SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn restore_continues_ids() {
        let (sessions, _) = fleet();
        let eval = FilterEvaluator::default();
        let mut groups = GroupRegistry::new();
        let first = groups.create(GroupSpec::new("g"), &sessions, &eval);

        let mut restored = GroupRegistry::restore(groups.list(), 0);
        let second = restored.create(GroupSpec::new("h"), &sessions, &eval);
        assert!(second > first);
        assert!(restored.delete(first).is_some());
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn restore_after_deleting_newest_group() {
        let (sessions, _) = fleet();
        let eval = FilterEvaluator::default();
        let mut groups = GroupRegistry::new();
        groups.create(GroupSpec::new("g"), &sessions, &eval);
        let newest = groups.create(GroupSpec::new("h"), &sessions, &eval);
        groups.delete(newest);

        let mut restored = GroupRegistry::restore(groups.list(), groups.next_id());
        let fresh = restored.create(GroupSpec::new("i"), &sessions, &eval);
        assert!(fresh > newest);
    }
}
