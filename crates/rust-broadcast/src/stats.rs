//! Engine-wide and per-group statistics.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::history::BroadcastHistory;
use crate::metrics::MetricsSnapshot;
use crate::registry::{Group, GroupRegistry, SessionRegistry};
use crate::result::mean;
use crate::types::{BroadcastId, GroupId};

/// A point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Registered sessions.
    pub total_sessions: usize,
    /// Registered sessions with `active` status.
    pub active_sessions: usize,
    /// Stored groups.
    pub total_groups: usize,
    /// Broadcasts retained in history.
    pub total_broadcasts: usize,
    /// Successful sessions over all retained broadcasts.
    pub success_rate: Option<f64>,
    /// Mean of the retained broadcasts' average execution times.
    pub average_execution_time: Duration,
    /// Broadcasts running right now.
    pub active_broadcasts: usize,
    /// Lifetime counters.
    pub metrics: MetricsSnapshot,
}

impl EngineStats {
    pub(crate) fn collect(
        sessions: &SessionRegistry,
        groups: &GroupRegistry,
        history: &BroadcastHistory,
        active_broadcasts: usize,
        metrics: MetricsSnapshot,
    ) -> Self {
        let averages: Vec<Duration> = history
            .iter()
            .map(|r| r.summary.average_execution_time)
            .collect();
        Self {
            total_sessions: sessions.len(),
            active_sessions: sessions.iter().filter(|s| s.is_active()).count(),
            total_groups: groups.len(),
            total_broadcasts: history.len(),
            success_rate: history.success_rate(),
            average_execution_time: mean(&averages),
            active_broadcasts,
            metrics,
        }
    }
}

/// Statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// The group.
    pub group_id: GroupId,
    /// Current member count.
    pub member_count: usize,
    /// Retained broadcasts that targeted the group.
    pub broadcasts: usize,
    /// Successful sessions over those broadcasts.
    pub success_rate: Option<f64>,
    /// When the group was last broadcast to.
    pub last_used: Option<SystemTime>,
}

impl GroupStats {
    pub(crate) fn collect(group: &Group, history: &BroadcastHistory) -> Self {
        let id = BroadcastId::from(group.id);
        let (broadcasts, ok, total) = history
            .iter()
            .filter(|r| r.broadcast_id == id)
            .fold((0, 0, 0), |(n, ok, total), r| {
                (
                    n + 1,
                    ok + r.summary.successful_sessions,
                    total + r.summary.total_sessions,
                )
            });
        Self {
            group_id: group.id,
            member_count: group.len(),
            broadcasts,
            success_rate: (total > 0).then(|| ok as f64 / total as f64),
            last_used: group.last_used,
        }
    }
}
