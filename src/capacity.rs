//! Capacity calculator.
//!
//! Pure functions over a [`CapacitySnapshot`]. Nothing here touches the
//! store; callers load a snapshot under the store lock and compute from it,
//! so every figure derived from one snapshot is mutually consistent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{Assignment, Hanger, Team};

/// Teams, hangers and active assignments read in one lock hold.
#[derive(Debug, Clone, Default)]
pub struct CapacitySnapshot {
    pub teams: Vec<Team>,
    /// Hangers referenced by `assignments`, keyed by id.
    pub hangers: HashMap<Uuid, Hanger>,
    /// Assignments that are not `Done`.
    pub assignments: Vec<Assignment>,
}

impl CapacitySnapshot {
    pub fn team(&self, team_id: Uuid) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    pub fn load(&self, team: &Team, config: &EngineConfig) -> TeamLoad {
        team_load(team, &self.assignments, &self.hangers, config)
    }
}

/// Capacity figures for one team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamLoad {
    pub team_id: Uuid,
    pub team_name: String,
    pub daily_capacity: f64,
    pub planned_hours: f64,
    pub remaining_hours: f64,
    pub utilization: f64,
    pub over_capacity: bool,
    pub active_assignments: usize,
}

/// Labor-hours a team can absorb per day.
///
/// An explicit positive `daily_hours` wins. Otherwise headcount is used,
/// floored at the default crew size so an empty roster still has capacity.
pub fn daily_capacity(team: &Team, config: &EngineConfig) -> f64 {
    match team.daily_hours {
        Some(hours) if hours > 0.0 => hours,
        _ => team.members.len().max(config.default_crew_size) as f64 * config.hours_per_member,
    }
}

/// Estimate for a referenced hanger; missing hangers count the default.
pub fn hanger_hours(hanger: Option<&Hanger>, config: &EngineConfig) -> f64 {
    hanger
        .map(|h| h.estimate(config.default_hanger_hours))
        .unwrap_or(config.default_hanger_hours)
}

/// Sum of hanger estimates over the team's assignments that are not `Done`.
pub fn planned_hours(
    team: &Team,
    assignments: &[Assignment],
    hangers: &HashMap<Uuid, Hanger>,
    config: &EngineConfig,
) -> f64 {
    assignments
        .iter()
        .filter(|a| a.team_id == team.id && a.is_active())
        .map(|a| hanger_hours(hangers.get(&a.hanger_id), config))
        // `sum` starts from -0.0; idle teams must report 0.0.
        .fold(0.0, |acc, hours| acc + hours)
}

/// `planned / capacity`, or 0 when capacity is 0.
pub fn ratio(planned: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        planned / capacity
    } else {
        0.0
    }
}

pub fn utilization(
    team: &Team,
    assignments: &[Assignment],
    hangers: &HashMap<Uuid, Hanger>,
    config: &EngineConfig,
) -> f64 {
    ratio(
        planned_hours(team, assignments, hangers, config),
        daily_capacity(team, config),
    )
}

pub fn is_over_capacity(
    team: &Team,
    assignments: &[Assignment],
    hangers: &HashMap<Uuid, Hanger>,
    config: &EngineConfig,
) -> bool {
    planned_hours(team, assignments, hangers, config) > daily_capacity(team, config)
}

pub fn team_load(
    team: &Team,
    assignments: &[Assignment],
    hangers: &HashMap<Uuid, Hanger>,
    config: &EngineConfig,
) -> TeamLoad {
    let daily_capacity = daily_capacity(team, config);
    let planned_hours = planned_hours(team, assignments, hangers, config);
    let active_assignments = assignments
        .iter()
        .filter(|a| a.team_id == team.id && a.is_active())
        .count();

    TeamLoad {
        team_id: team.id,
        team_name: team.name.clone(),
        daily_capacity,
        planned_hours,
        remaining_hours: (daily_capacity - planned_hours).max(0.0),
        utilization: ratio(planned_hours, daily_capacity),
        over_capacity: planned_hours > daily_capacity,
        active_assignments,
    }
}
