//! Dashboard aggregates over every team.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capacity::{ratio, CapacitySnapshot, TeamLoad};
use crate::config::EngineConfig;
use crate::models::AssignmentState;

/// Summary figures shown on the capacity dashboard.
///
/// Always recomputed from a fresh snapshot; never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_capacity: f64,
    pub total_planned: f64,
    pub average_utilization: f64,
    pub over_capacity_teams: Vec<Uuid>,
    pub teams: Vec<TeamLoad>,
    /// Assignment count per lifecycle state, `Done` included.
    pub state_counts: BTreeMap<String, u64>,
    /// Active assignments placed while inventory reported a shortage.
    pub shortage_count: u64,
}

pub fn summarize(
    snapshot: &CapacitySnapshot,
    state_counts: &[(AssignmentState, u64)],
    config: &EngineConfig,
) -> DashboardSummary {
    let teams: Vec<TeamLoad> = snapshot
        .teams
        .iter()
        .map(|team| snapshot.load(team, config))
        .collect();

    let total_capacity = teams.iter().fold(0.0, |acc, t| acc + t.daily_capacity);
    let total_planned = teams.iter().fold(0.0, |acc, t| acc + t.planned_hours);
    let over_capacity_teams = teams
        .iter()
        .filter(|t| t.over_capacity)
        .map(|t| t.team_id)
        .collect();

    let mut counts: BTreeMap<String, u64> = AssignmentState::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for (state, count) in state_counts {
        *counts.entry(state.as_str().to_string()).or_default() += count;
    }

    let shortage_count = snapshot
        .assignments
        .iter()
        .filter(|a| a.is_active() && a.shortage)
        .count() as u64;

    DashboardSummary {
        total_capacity,
        total_planned,
        average_utilization: ratio(total_planned, total_capacity),
        over_capacity_teams,
        teams,
        state_counts: counts,
        shortage_count,
    }
}
