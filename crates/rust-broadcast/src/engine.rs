//! The broadcast engine.
//!
//! [`BroadcastEngine`] owns the session and group registries, the history
//! ring, the cancellation table and the injected executor. Every table sits
//! behind its own lock. Locks are taken in the order sessions, groups,
//! history, and none is held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::broadcast::{BroadcastTarget, CancellationRegistry, Strategy, run_unit};
use crate::config::{EngineConfig, Settings};
use crate::error::{BroadcastError, Result};
use crate::executor::SessionExecutor;
use crate::filter::FilterEvaluator;
use crate::history::BroadcastHistory;
use crate::metrics::BroadcastMetrics;
use crate::registry::{Group, GroupRegistry, GroupSpec, GroupUpdate, SessionRegistry};
use crate::result::{BroadcastResult, BroadcastState, SessionResult};
use crate::stats::{EngineStats, GroupStats};
use crate::store::{SNAPSHOT_VERSION, SharedStore, Snapshot, Store};
use crate::types::{BroadcastId, GroupId, NewSession, Session, SessionId, SessionUpdate};

#[cfg(feature = "metrics")]
use crate::metrics::prometheus_export::PrometheusMetrics;

/// A resolved broadcast, ready to run.
struct Plan {
    broadcast_id: BroadcastId,
    group: Option<GroupId>,
    sessions: Vec<Session>,
    settings: Settings,
}

/// Sends commands to groups of sessions.
///
/// # Example
///
/// ```ignore
/// use rust_broadcast::prelude::*;
/// use rust_broadcast::mock::MockExecutor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> rust_broadcast::Result<()> {
/// let engine = BroadcastEngine::new(MockExecutor::new());
/// let web = engine.register_session(NewSession::new("web-1", SessionType::Remote).tag("web"));
/// let group = engine.create_group(
///     GroupSpec::new("web").filter(Filter::tag(FilterOperator::Equals, "web")),
/// );
///
/// let result = engine.broadcast(BroadcastTarget::group(group), "uptime").await?;
/// assert!(result.is_success());
/// assert_eq!(result.results[0].session_id, web);
/// # Ok(())
/// # }
/// ```
pub struct BroadcastEngine<E: SessionExecutor> {
    executor: E,
    config: EngineConfig,
    evaluator: FilterEvaluator,
    sessions: RwLock<SessionRegistry>,
    groups: RwLock<GroupRegistry>,
    history: RwLock<BroadcastHistory>,
    cancellations: CancellationRegistry,
    metrics: BroadcastMetrics,
    store: Option<SharedStore>,
    revision: AtomicU64,
    next_broadcast: AtomicU64,
    #[cfg(feature = "metrics")]
    prometheus: Option<PrometheusMetrics>,
}

impl<E: SessionExecutor> BroadcastEngine<E> {
    /// Create an engine with default configuration and no store.
    pub fn new(executor: E) -> Self {
        Self::build(executor, EngineConfig::default(), None, None)
    }

    /// Create an engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Config`] if the configuration is invalid.
    pub fn with_config(executor: E, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(executor, config, None, None))
    }

    /// Create an engine that restores from and saves to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the store holds
    /// a snapshot that cannot be read.
    pub fn with_store(executor: E, config: EngineConfig, store: impl Store + 'static) -> Result<Self> {
        config.validate()?;
        let snapshot = store.load()?;
        if let Some(snapshot) = &snapshot {
            info!(
                sessions = snapshot.sessions.len(),
                groups = snapshot.groups.len(),
                history = snapshot.history.len(),
                "Restored engine state"
            );
        }
        Ok(Self::build(executor, config, Some(SharedStore::new(store)), snapshot))
    }

    fn build(
        executor: E,
        config: EngineConfig,
        store: Option<SharedStore>,
        snapshot: Option<Snapshot>,
    ) -> Self {
        let snapshot = snapshot.unwrap_or_default();
        let next_session = snapshot.resume_session_id();
        let next_group = snapshot.resume_group_id();
        let next_broadcast = snapshot.resume_broadcast_id();
        Self {
            executor,
            evaluator: FilterEvaluator::new(config.regex_cache_size),
            sessions: RwLock::new(SessionRegistry::restore(snapshot.sessions, next_session)),
            groups: RwLock::new(GroupRegistry::restore(snapshot.groups, next_group)),
            history: RwLock::new(BroadcastHistory::restore(
                snapshot.history,
                config.history_capacity,
            )),
            config,
            cancellations: CancellationRegistry::new(),
            metrics: BroadcastMetrics::new(),
            store,
            revision: AtomicU64::new(0),
            next_broadcast: AtomicU64::new(next_broadcast),
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Record broadcasts into Prometheus metrics as well.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_prometheus(mut self, metrics: PrometheusMetrics) -> Self {
        self.prometheus = Some(metrics);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Get the filter evaluator.
    #[must_use]
    pub const fn filter_evaluator(&self) -> &FilterEvaluator {
        &self.evaluator
    }

    /// Get the engine's lifetime metrics.
    #[must_use]
    pub const fn metrics(&self) -> &BroadcastMetrics {
        &self.metrics
    }

    // Sessions

    /// Register a session.
    pub fn register_session(&self, session: NewSession) -> SessionId {
        let id = self.sessions_mut().register(session);
        debug!(session = %id, "Session registered");
        self.persist();
        id
    }

    /// Update a session. Returns `false` if the ID is unknown.
    pub fn update_session(&self, id: SessionId, update: SessionUpdate) -> bool {
        let updated = self.sessions_mut().update(id, update);
        if updated {
            self.persist();
        }
        updated
    }

    /// Remove a session and drop it from every group.
    pub fn remove_session(&self, id: SessionId) -> Option<Session> {
        let removed = {
            let mut sessions = self.sessions_mut();
            let removed = sessions.remove(id)?;
            let groups = self.groups_mut().purge_session(id);
            debug!(session = %id, groups, "Session removed");
            removed
        };
        self.persist();
        Some(removed)
    }

    /// Get a session.
    #[must_use]
    pub fn get_session(&self, id: SessionId) -> Option<Session> {
        self.sessions().get(id).cloned()
    }

    /// List sessions in registration order.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<Session> {
        self.sessions().list()
    }

    // Groups

    /// Create a group. Membership is resolved from the spec's filters
    /// against the sessions registered right now.
    ///
    /// A spec without settings gets the configured default settings.
    pub fn create_group(&self, mut spec: GroupSpec) -> GroupId {
        if spec.settings.is_none() {
            spec.settings = Some(self.config.default_settings.clone());
        }
        let id = {
            let sessions = self.sessions();
            let mut groups = self.groups_mut();
            let id = groups.create(spec, &sessions, &self.evaluator);
            debug!(
                group = %id,
                members = groups.get(id).map_or(0, Group::len),
                "Group created"
            );
            id
        };
        self.persist();
        id
    }

    /// Update a group. A new filter list re-resolves membership.
    ///
    /// Returns `false` if the ID is unknown.
    pub fn update_group(&self, id: GroupId, update: GroupUpdate) -> bool {
        let updated = {
            let sessions = self.sessions();
            self.groups_mut()
                .update(id, update, &sessions, &self.evaluator)
        };
        if updated {
            self.persist();
        }
        updated
    }

    /// Add registered sessions to a group. Unknown session IDs are ignored.
    ///
    /// Returns `false` if the group is unknown.
    pub fn add_sessions_to_group(&self, id: GroupId, session_ids: &[SessionId]) -> bool {
        let added = {
            let sessions = self.sessions();
            self.groups_mut().add_sessions(id, session_ids, &sessions)
        };
        if added {
            self.persist();
        }
        added
    }

    /// Remove sessions from a group. Returns `false` if the group is unknown.
    pub fn remove_sessions_from_group(&self, id: GroupId, session_ids: &[SessionId]) -> bool {
        let removed = self.groups_mut().remove_sessions(id, session_ids);
        if removed {
            self.persist();
        }
        removed
    }

    /// Delete a group.
    pub fn delete_group(&self, id: GroupId) -> Option<Group> {
        let deleted = self.groups_mut().delete(id);
        if deleted.is_some() {
            self.persist();
        }
        deleted
    }

    /// Get a group.
    #[must_use]
    pub fn get_group(&self, id: GroupId) -> Option<Group> {
        self.groups().get(id).cloned()
    }

    /// List groups in creation order.
    #[must_use]
    pub fn list_groups(&self) -> Vec<Group> {
        self.groups().list()
    }

    // Broadcasting

    /// Send `command` to every active session of `target`.
    ///
    /// Failures of individual sessions are reported in the result.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::UnknownGroup`] if a group target does not
    /// exist, and [`BroadcastError::NoActiveSessions`] if the target has no
    /// active session. Nothing is executed or archived in either case.
    pub async fn broadcast(&self, target: BroadcastTarget, command: &str) -> Result<BroadcastResult> {
        let plan = match self.resolve(&target) {
            Ok(plan) => plan,
            Err(e) => {
                debug!(broadcast_target = %target.describe(), error = %e, "Broadcast rejected");
                self.metrics.preflight_failed();
                #[cfg(feature = "metrics")]
                if let Some(prometheus) = &self.prometheus {
                    prometheus.preflight_failed();
                }
                return Err(e);
            }
        };

        let strategy = Strategy::from_settings(&plan.settings);
        let span = info_span!(
            "broadcast",
            broadcast_id = %plan.broadcast_id,
            sessions = plan.sessions.len(),
            strategy = %strategy,
        );
        Ok(self
            .execute_plan(plan, strategy, command)
            .instrument(span)
            .await)
    }

    async fn execute_plan(&self, plan: Plan, strategy: Strategy, command: &str) -> BroadcastResult {
        if plan.settings.log_commands {
            info!(command, "Broadcast started");
        } else {
            info!("Broadcast started");
        }
        self.metrics.broadcast_started();
        #[cfg(feature = "metrics")]
        if let Some(prometheus) = &self.prometheus {
            prometheus.broadcast_started();
        }

        let start_time = SystemTime::now();
        let registration = self.cancellations.register(plan.broadcast_id.clone());
        let results = strategy
            .run(
                &self.executor,
                &plan.sessions,
                command,
                plan.settings.timeout,
                registration.token(),
            )
            .await;
        let state = if registration.token().is_cancelled() {
            BroadcastState::Cancelled
        } else {
            BroadcastState::Completed
        };
        drop(registration);

        let mut result = BroadcastResult::new(
            plan.broadcast_id,
            command,
            start_time,
            results,
            state,
            self.config.exclude_skipped_from_average,
        );
        if plan.settings.aggregate_output {
            result = result.with_aggregated_output();
        }

        self.metrics.broadcast_finished(&result);
        #[cfg(feature = "metrics")]
        if let Some(prometheus) = &self.prometheus {
            prometheus.record(&result);
        }
        info!(
            status = result.overall_status.as_str(),
            successful = result.summary.successful_sessions,
            failed = result.summary.failed_sessions,
            cancelled = result.is_cancelled(),
            "Broadcast finished"
        );

        self.archive(plan.group, &result).await;
        result
    }

    fn resolve(&self, target: &BroadcastTarget) -> Result<Plan> {
        let sessions = self.sessions();
        let plan = match target {
            BroadcastTarget::Group(id) => {
                let groups = self.groups();
                let group = groups
                    .get(*id)
                    .ok_or(BroadcastError::UnknownGroup { id: *id })?;
                Plan {
                    broadcast_id: BroadcastId::from(*id),
                    group: Some(*id),
                    sessions: sessions.active_in_order(&group.member_ids),
                    settings: group.settings.clone(),
                }
            }
            BroadcastTarget::Sessions {
                ids,
                settings,
                broadcast_id,
            } => Plan {
                broadcast_id: broadcast_id.clone().unwrap_or_else(|| self.next_broadcast_id()),
                group: None,
                sessions: sessions.active_in_order(ids),
                settings: settings
                    .clone()
                    .unwrap_or_else(|| self.config.default_settings.clone()),
            },
        };

        if plan.sessions.is_empty() {
            return Err(BroadcastError::no_active_sessions(target.describe()));
        }
        Ok(plan)
    }

    fn next_broadcast_id(&self) -> BroadcastId {
        let n = self.next_broadcast.fetch_add(1, Ordering::Relaxed);
        BroadcastId::new(format!("broadcast-{n}"))
    }

    async fn archive(&self, group: Option<GroupId>, result: &BroadcastResult) {
        if let Some(id) = group {
            self.groups_mut().touch(id, result.end_time);
        }
        self.history_mut().push(result.clone());

        let Some(store) = self.store.clone() else {
            return;
        };
        let (revision, snapshot) = self.revisioned_snapshot();
        let saved =
            tokio::task::spawn_blocking(move || store.save_revision(revision, &snapshot)).await;
        match saved {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to save engine state"),
            Err(e) => warn!(error = %e, "State save task failed"),
        }
    }

    /// Cancel a running broadcast.
    ///
    /// Running units report `failed` with error `"cancelled"`; sequential
    /// units not yet started are skipped. Returns `false` if no broadcast
    /// with that ID is running.
    pub fn cancel_broadcast(&self, id: &BroadcastId) -> bool {
        let cancelled = self.cancellations.cancel(id);
        if cancelled {
            info!(broadcast_id = %id, "Broadcast cancellation requested");
        }
        cancelled
    }

    /// Check if a broadcast with the given ID is running.
    #[must_use]
    pub fn is_broadcast_running(&self, id: &BroadcastId) -> bool {
        self.cancellations.is_running(id)
    }

    /// Number of broadcasts running right now.
    #[must_use]
    pub fn active_broadcasts(&self) -> usize {
        self.cancellations.len()
    }

    /// Check whether `target`'s settings ask for confirmation before running.
    ///
    /// The engine never prompts. Callers that honour the setting should ask
    /// before calling [`broadcast`](Self::broadcast).
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::UnknownGroup`] for an unknown group target.
    pub fn requires_confirmation(&self, target: &BroadcastTarget) -> Result<bool> {
        match target {
            BroadcastTarget::Group(id) => self
                .groups()
                .get(*id)
                .map(|g| g.settings.confirm_before_execution)
                .ok_or(BroadcastError::UnknownGroup { id: *id }),
            BroadcastTarget::Sessions { settings, .. } => Ok(settings
                .as_ref()
                .unwrap_or(&self.config.default_settings)
                .confirm_before_execution),
        }
    }

    /// Run `command` on a single session without archiving the result.
    ///
    /// Uses the default settings' timeout and ignores the session's status.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::UnknownSession`] if the session does not
    /// exist.
    pub async fn test_command(&self, id: SessionId, command: &str) -> Result<SessionResult> {
        let session = self
            .get_session(id)
            .ok_or(BroadcastError::UnknownSession { id })?;
        debug!(session = %id, "Test command");
        let token = CancellationToken::new();
        Ok(run_unit(
            &self.executor,
            &session,
            command,
            self.config.default_settings.timeout,
            &token,
        )
        .await)
    }

    // Queries

    /// Up to `limit` archived broadcasts, newest first.
    #[must_use]
    pub fn get_history(&self, limit: usize) -> Vec<BroadcastResult> {
        self.history().recent(limit)
    }

    /// The newest archived broadcast with the given ID.
    #[must_use]
    pub fn get_broadcast(&self, id: &BroadcastId) -> Option<BroadcastResult> {
        self.history().get(id).cloned()
    }

    /// Drop every archived broadcast.
    pub fn clear_history(&self) {
        self.history_mut().clear();
        self.persist();
    }

    /// Collect engine statistics.
    #[must_use]
    pub fn get_stats(&self) -> EngineStats {
        let sessions = self.sessions();
        let groups = self.groups();
        let history = self.history();
        EngineStats::collect(
            &sessions,
            &groups,
            &history,
            self.cancellations.len(),
            self.metrics.snapshot(),
        )
    }

    /// Collect statistics for one group.
    #[must_use]
    pub fn group_stats(&self, id: GroupId) -> Option<GroupStats> {
        let groups = self.groups();
        let group = groups.get(id)?;
        Some(GroupStats::collect(group, &self.history()))
    }

    // Persistence

    /// Build a snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.revisioned_snapshot().1
    }

    /// Snapshot the state and number it. Revisions follow the order in
    /// which the tables were changed, since they are taken under the read
    /// locks.
    fn revisioned_snapshot(&self) -> (u64, Snapshot) {
        let sessions = self.sessions();
        let groups = self.groups();
        let history = self.history();
        let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            sessions: sessions.list(),
            groups: groups.list(),
            history: history.iter().cloned().collect(),
            next_session_id: sessions.next_id(),
            next_group_id: groups.next_id(),
            next_broadcast_id: self.next_broadcast.load(Ordering::Relaxed),
        };
        (revision, snapshot)
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let (revision, snapshot) = self.revisioned_snapshot();
        if let Err(e) = store.save_revision(revision, &snapshot) {
            warn!(error = %e, "Failed to save engine state");
        }
    }

    // Lock helpers. Poisoning is recovered: every mutation leaves the
    // tables consistent before any call that could panic.

    fn sessions(&self) -> RwLockReadGuard<'_, SessionRegistry> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_mut(&self) -> RwLockWriteGuard<'_, SessionRegistry> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn groups(&self) -> RwLockReadGuard<'_, GroupRegistry> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn groups_mut(&self) -> RwLockWriteGuard<'_, GroupRegistry> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self) -> RwLockReadGuard<'_, BroadcastHistory> {
        self.history.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn history_mut(&self) -> RwLockWriteGuard<'_, BroadcastHistory> {
        self.history.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: SessionExecutor> std::fmt::Debug for BroadcastEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastEngine")
            .field("sessions", &self.sessions().len())
            .field("groups", &self.groups().len())
            .field("history", &self.history().len())
            .field("active_broadcasts", &self.cancellations.len())
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::filter::{Filter, FilterOperator};
    use crate::mock::{MockExecutor, MockResponse, fixtures};
    use crate::result::ResultStatus;
    use crate::store::MemoryStore;
    use crate::types::SessionStatus;

    fn dev_prod(engine: &BroadcastEngine<MockExecutor>) -> Vec<SessionId> {
        fixtures::dev_prod_fleet()
            .into_iter()
            .map(|s| engine.register_session(s))
            .collect()
    }

    #[tokio::test]
    async fn dev_group_broadcast_runs_dev_only() {
        let engine = BroadcastEngine::new(MockExecutor::new());
        let ids = dev_prod(&engine);
        let group = engine.create_group(
            GroupSpec::new("dev").filter(Filter::tag(FilterOperator::Contains, "dev")),
        );

        let result = engine
            .broadcast(BroadcastTarget::group(group), "uptime")
            .await
            .unwrap();

        let targeted: Vec<_> = result.results.iter().map(|r| r.session_id).collect();
        assert_eq!(targeted, vec![ids[0], ids[1]]);
        assert!(result.is_success());
        assert_eq!(result.broadcast_id.as_str(), group.to_string());
        assert!(engine.get_group(group).unwrap().last_used.is_some());
        assert_eq!(engine.get_history(10).len(), 1);
    }

    #[tokio::test]
    async fn preflight_errors_archive_nothing() {
        let engine = BroadcastEngine::new(MockExecutor::new());
        let err = engine
            .broadcast(BroadcastTarget::group(GroupId::new(42)), "ls")
            .await
            .unwrap_err();
        assert!(matches!(err, BroadcastError::UnknownGroup { .. }));

        let empty = engine.create_group(GroupSpec::new("empty"));
        let err = engine
            .broadcast(BroadcastTarget::group(empty), "ls")
            .await
            .unwrap_err();
        assert!(matches!(err, BroadcastError::NoActiveSessions { .. }));

        assert!(engine.get_history(10).is_empty());
        assert_eq!(engine.executor().call_count(), 0);
        assert_eq!(engine.metrics().snapshot().preflight_failures, 2);
    }

    #[tokio::test]
    async fn inactive_sessions_are_not_targeted() {
        let engine = BroadcastEngine::new(MockExecutor::new());
        let ids = dev_prod(&engine);
        engine.update_session(ids[0], SessionUpdate::new().status(SessionStatus::Inactive));

        let result = engine
            .broadcast(BroadcastTarget::sessions(ids.clone()), "ls")
            .await
            .unwrap();
        assert_eq!(result.results.len(), 2);
        assert!(result.get(ids[0]).is_none());
        assert!(result.broadcast_id.as_str().starts_with("broadcast-"));
    }

    #[tokio::test]
    async fn remove_session_cascades_into_groups() {
        let engine = BroadcastEngine::new(MockExecutor::new());
        let ids = dev_prod(&engine);
        let group = engine.create_group(
            GroupSpec::new("dev").filter(Filter::tag(FilterOperator::Equals, "dev")),
        );

        assert!(engine.remove_session(ids[0]).is_some());
        assert!(!engine.get_group(group).unwrap().contains(ids[0]));
        assert!(engine.remove_session(ids[0]).is_none());
    }

    #[tokio::test]
    async fn test_command_is_not_archived() {
        let engine = BroadcastEngine::new(MockExecutor::new());
        let ids = dev_prod(&engine);

        let result = engine.test_command(ids[2], "hostname").await.unwrap();
        assert_eq!(result.status, ResultStatus::Success);
        assert!(engine.get_history(10).is_empty());

        let err = engine.test_command(SessionId::new(99), "x").await.unwrap_err();
        assert!(matches!(err, BroadcastError::UnknownSession { .. }));
    }

    #[tokio::test]
    async fn aggregate_output_follows_settings() {
        let ids_engine = BroadcastEngine::new(
            MockExecutor::new().default_response(MockResponse::success("hello")),
        );
        let ids = dev_prod(&ids_engine);

        let result = ids_engine
            .broadcast(
                BroadcastTarget::sessions(ids).with_settings(Settings::default().aggregate_output(true)),
                "echo hello",
            )
            .await
            .unwrap();
        let aggregated = result.aggregated_output.unwrap();
        assert!(aggregated.contains("=== dev-A ===\nhello"));
        assert!(aggregated.contains("=== prod-X ===\nhello"));
    }

    #[test]
    fn requires_confirmation_reads_settings() {
        let engine = BroadcastEngine::new(MockExecutor::new());
        let group = engine.create_group(
            GroupSpec::new("careful").settings(Settings::default().confirm_before_execution(true)),
        );
        assert!(engine.requires_confirmation(&BroadcastTarget::group(group)).unwrap());
        assert!(!engine.requires_confirmation(&BroadcastTarget::sessions(Vec::new())).unwrap());
        assert!(engine.requires_confirmation(&BroadcastTarget::group(GroupId::new(9))).is_err());
    }

    #[test]
    fn new_groups_take_configured_defaults() {
        let defaults = Settings::sequential().stop_on_first_error(true);
        let engine = BroadcastEngine::with_config(
            MockExecutor::new(),
            EngineConfig::new().default_settings(defaults.clone()),
        )
        .unwrap();

        let plain = engine.create_group(GroupSpec::new("plain"));
        assert_eq!(engine.get_group(plain).unwrap().settings, defaults);

        let explicit = engine.create_group(GroupSpec::new("explicit").settings(Settings::default()));
        assert_eq!(engine.get_group(explicit).unwrap().settings, Settings::default());
    }

    #[tokio::test]
    async fn state_survives_restart_through_store() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let engine = BroadcastEngine::with_store(
            MockExecutor::new(),
            EngineConfig::default(),
            store.clone(),
        )
        .unwrap();
        let ids = dev_prod(&engine);
        let group = engine.create_group(
            GroupSpec::new("dev").filter(Filter::tag(FilterOperator::Equals, "dev")),
        );
        engine
            .broadcast(BroadcastTarget::group(group), "ls")
            .await
            .unwrap();

        let restored = BroadcastEngine::with_store(
            MockExecutor::new(),
            EngineConfig::default(),
            store,
        )
        .unwrap();
        assert_eq!(restored.list_sessions().len(), 3);
        assert_eq!(restored.get_group(group).unwrap().len(), 2);
        assert_eq!(restored.get_history(10).len(), 1);

        let next = restored.register_session(fixtures::tagged("new", &[]));
        assert!(next > ids[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_reflect_history() {
        let engine = BroadcastEngine::new(
            MockExecutor::new().default_response(MockResponse::success("").delay(Duration::from_millis(20))),
        );
        let ids = dev_prod(&engine);
        engine
            .broadcast(BroadcastTarget::sessions(ids), "ls")
            .await
            .unwrap();

        let stats = engine.get_stats();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_broadcasts, 1);
        assert_eq!(stats.success_rate, Some(1.0));
        assert_eq!(stats.active_broadcasts, 0);
        assert!(stats.average_execution_time >= Duration::from_millis(20));
        assert_eq!(stats.metrics.sessions_executed, 3);
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn prometheus_records_broadcasts() {
        let registry = prometheus::Registry::new();
        let metrics = PrometheusMetrics::new(&registry).unwrap();
        let engine = BroadcastEngine::new(MockExecutor::new()).with_prometheus(metrics.clone());
        let ids = dev_prod(&engine);

        engine
            .broadcast(BroadcastTarget::sessions(ids), "ls")
            .await
            .unwrap();
        let _ = engine
            .broadcast(BroadcastTarget::group(GroupId::new(7)), "ls")
            .await;

        assert_eq!(metrics.broadcasts_with_status("success"), 1);
        assert_eq!(metrics.broadcasts_with_status("rejected"), 1);
        assert_eq!(metrics.active_broadcasts(), 0);
    }
}
