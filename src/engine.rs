//! The assignment engine.
//!
//! Sole authority for creating, moving, advancing and cancelling
//! assignments. Every mutation runs inside one store write transaction, so
//! the "one active assignment per hanger" rule and the `Done` terminal state
//! hold under concurrent callers. Capacity is advisory: placements past a
//! team's daily capacity succeed and carry a warning.
//!
//! Inventory shortage lookups run after the transaction commits, outside the
//! store lock, bounded by [`EngineConfig::shortage_timeout`].

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::capacity::{self, TeamLoad};
use crate::config::EngineConfig;
use crate::dashboard::{self, DashboardSummary};
use crate::db::{rows, Database};
use crate::models::*;
use crate::shortage::ShortageEvaluator;

/// Engine errors. All are returned verbatim and never retried internally.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Hanger {hanger_id} is not part of package {package_id}")]
    NotInPackage { hanger_id: Uuid, package_id: Uuid },

    #[error("Hanger {hanger_id} is already held by assignment {assignment_id}")]
    AlreadyAssigned { hanger_id: Uuid, assignment_id: Uuid },

    #[error("Assignment {id} is {state} and cannot {action}")]
    InvalidState {
        id: Uuid,
        state: AssignmentState,
        action: &'static str,
    },

    #[error("Assignment {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: AssignmentState,
        to: AssignmentState,
    },

    #[error("Assignment {id} is done and can no longer change")]
    Immutable { id: Uuid },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

#[derive(Clone)]
pub struct AssignmentEngine {
    db: Database,
    shortages: Arc<dyn ShortageEvaluator>,
    config: EngineConfig,
}

impl AssignmentEngine {
    pub fn new(db: Database, shortages: Arc<dyn ShortageEvaluator>, config: EngineConfig) -> Self {
        Self {
            db,
            shortages,
            config,
        }
    }

    /// The entity store backing this engine.
    pub fn store(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ============================================================
    // Placement
    // ============================================================

    /// Place a hanger on a team in the `Assigned` state.
    pub async fn assign(
        &self,
        hanger_id: Uuid,
        team_id: Uuid,
        package_id: Uuid,
    ) -> Result<AssignmentOutcome, EngineError> {
        self.place(hanger_id, team_id, package_id, AssignmentState::Assigned)
            .await
    }

    /// Place a hanger on a team's backlog in the `Queued` state.
    pub async fn enqueue(
        &self,
        hanger_id: Uuid,
        team_id: Uuid,
        package_id: Uuid,
    ) -> Result<AssignmentOutcome, EngineError> {
        self.place(hanger_id, team_id, package_id, AssignmentState::Queued)
            .await
    }

    async fn place(
        &self,
        hanger_id: Uuid,
        team_id: Uuid,
        package_id: Uuid,
        state: AssignmentState,
    ) -> Result<AssignmentOutcome, EngineError> {
        let mut outcome = self.db.write(|tx| {
            place_hanger(tx, &self.config, hanger_id, team_id, package_id, state)
        })?;

        tracing::info!(
            assignment = %outcome.assignment.id,
            hanger = %hanger_id,
            team = %team_id,
            state = %state,
            "Placed hanger"
        );
        if outcome.over_capacity_warning {
            tracing::warn!(
                team = %team_id,
                projected = outcome.projected_hours,
                capacity = outcome.daily_capacity,
                "Placement pushes team over capacity"
            );
        }

        outcome.assignment.shortage = self
            .record_shortage(outcome.assignment.id, hanger_id)
            .await;
        Ok(outcome)
    }

    /// Place every hanger of a package that is not already held on a team.
    ///
    /// Hangers with an active assignment are skipped, not moved.
    pub async fn assign_package(
        &self,
        package_id: Uuid,
        team_id: Uuid,
    ) -> Result<PackagePlacement, EngineError> {
        let mut placement = self
            .db
            .write(|tx| place_package(tx, &self.config, package_id, team_id))?;

        tracing::info!(
            package = %package_id,
            team = %team_id,
            placed = placement.assignments.len(),
            skipped = placement.skipped_hanger_ids.len(),
            "Placed package"
        );
        if placement.over_capacity_warning {
            tracing::warn!(
                team = %team_id,
                projected = placement.projected_hours,
                capacity = placement.daily_capacity,
                "Package placement pushes team over capacity"
            );
        }

        let mut lookups = JoinSet::new();
        for (idx, assignment) in placement.assignments.iter().enumerate() {
            let engine = self.clone();
            let (id, hanger_id) = (assignment.id, assignment.hanger_id);
            lookups.spawn(async move { (idx, engine.record_shortage(id, hanger_id).await) });
        }
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((idx, shortage)) => placement.assignments[idx].shortage = shortage,
                Err(e) => tracing::warn!("Shortage lookup task failed: {}", e),
            }
        }

        Ok(placement)
    }

    /// Ask inventory about a hanger and stamp the answer on the assignment.
    ///
    /// Errors and timeouts are logged and reported as no shortage.
    async fn record_shortage(&self, assignment_id: Uuid, hanger_id: Uuid) -> bool {
        let lookup = tokio::time::timeout(
            self.config.shortage_timeout,
            self.shortages.has_shortage(hanger_id),
        )
        .await;

        let shortage = match lookup {
            Ok(Ok(shortage)) => shortage,
            Ok(Err(e)) => {
                tracing::warn!(hanger = %hanger_id, "Shortage lookup failed: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!(
                    hanger = %hanger_id,
                    timeout_ms = self.config.shortage_timeout.as_millis() as u64,
                    "Shortage lookup timed out"
                );
                false
            }
        };

        if !shortage {
            return false;
        }

        match self
            .db
            .write(|tx| rows::update_assignment_shortage(tx, assignment_id, true))
        {
            // Zero rows: the assignment was cancelled while inventory answered.
            Ok(updated) => updated > 0,
            Err(e) => {
                tracing::warn!(assignment = %assignment_id, "Failed to store shortage flag: {}", e);
                false
            }
        }
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Move an `Assigned` or `InProgress` assignment to another team.
    pub fn move_assignment(
        &self,
        assignment_id: Uuid,
        team_id: Uuid,
    ) -> Result<AssignmentOutcome, EngineError> {
        let (outcome, from) = self
            .db
            .write(|tx| move_to_team(tx, &self.config, assignment_id, team_id))?;

        tracing::info!(
            assignment = %assignment_id,
            from = %from,
            to = %team_id,
            "Moved assignment"
        );
        if outcome.over_capacity_warning {
            tracing::warn!(
                team = %team_id,
                projected = outcome.projected_hours,
                capacity = outcome.daily_capacity,
                "Move pushes team over capacity"
            );
        }

        Ok(outcome)
    }

    /// Advance an assignment one step along Queued → Assigned → InProgress → Done.
    pub fn advance_state(
        &self,
        assignment_id: Uuid,
        next: AssignmentState,
    ) -> Result<Assignment, EngineError> {
        let assignment = self
            .db
            .write(|tx| advance(tx, assignment_id, next))?;

        tracing::info!(assignment = %assignment_id, state = %next, "Advanced assignment");
        Ok(assignment)
    }

    /// Withdraw a `Queued` or `Assigned` assignment, deleting it.
    pub fn cancel(&self, assignment_id: Uuid) -> Result<(), EngineError> {
        self.db.write(|tx| cancel_in(tx, assignment_id))?;

        tracing::info!(assignment = %assignment_id, "Cancelled assignment");
        Ok(())
    }

    // ============================================================
    // Read-only views
    // ============================================================

    pub fn team_load(&self, team_id: Uuid) -> Result<TeamLoad, EngineError> {
        self.db.read(|conn| load_for_team(conn, &self.config, team_id))
    }

    /// Evaluate placing a package on a team without changing anything.
    pub fn preview_placement(
        &self,
        package_id: Uuid,
        team_id: Uuid,
    ) -> Result<PlacementPreview, EngineError> {
        self.db
            .read(|conn| preview(conn, &self.config, package_id, team_id))
    }

    pub fn dashboard(&self) -> Result<DashboardSummary, EngineError> {
        self.db.read(|conn| summarize_all(conn, &self.config))
    }
}

// ============================================================
// Transaction bodies
// ============================================================

fn require_team(conn: &Connection, team_id: Uuid) -> Result<Team, EngineError> {
    rows::fetch_team(conn, team_id)?.ok_or_else(|| EngineError::not_found("Team", team_id))
}

fn require_package(conn: &Connection, package_id: Uuid) -> Result<Package, EngineError> {
    rows::fetch_package(conn, package_id)?
        .ok_or_else(|| EngineError::not_found("Package", package_id))
}

fn require_assignment(conn: &Connection, assignment_id: Uuid) -> Result<Assignment, EngineError> {
    rows::fetch_assignment(conn, assignment_id)?
        .ok_or_else(|| EngineError::not_found("Assignment", assignment_id))
}

/// Planned hours and capacity of `team`, read live.
fn team_hours(
    conn: &Connection,
    config: &EngineConfig,
    team: &Team,
) -> Result<(f64, f64), EngineError> {
    let snapshot = rows::load_snapshot(conn, Some(team.id))?;
    let planned = capacity::planned_hours(team, &snapshot.assignments, &snapshot.hangers, config);
    Ok((planned, capacity::daily_capacity(team, config)))
}

fn new_assignment(
    package: &Package,
    hanger_id: Uuid,
    team_id: Uuid,
    state: AssignmentState,
) -> Assignment {
    let now = Utc::now();
    Assignment {
        id: Uuid::new_v4(),
        project_id: package.project_id,
        package_id: package.id,
        hanger_id,
        team_id,
        state,
        shortage: false,
        created_at: now,
        updated_at: now,
    }
}

fn insert_checked(conn: &Connection, assignment: &Assignment) -> Result<(), EngineError> {
    match rows::insert_assignment(conn, assignment) {
        Ok(()) => Ok(()),
        Err(e) if is_constraint_violation(&e) => {
            match rows::fetch_active_assignment_for_hanger(conn, assignment.hanger_id)? {
                Some(existing) => Err(EngineError::AlreadyAssigned {
                    hanger_id: assignment.hanger_id,
                    assignment_id: existing.id,
                }),
                None => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn place_hanger(
    conn: &Connection,
    config: &EngineConfig,
    hanger_id: Uuid,
    team_id: Uuid,
    package_id: Uuid,
    state: AssignmentState,
) -> Result<AssignmentOutcome, EngineError> {
    let hanger =
        rows::fetch_hanger(conn, hanger_id)?.ok_or_else(|| EngineError::not_found("Hanger", hanger_id))?;
    let team = require_team(conn, team_id)?;
    let package = require_package(conn, package_id)?;

    // The assignment takes the package's project; it must be the hanger's.
    if hanger.project_id != package.project_id || !package.hanger_ids.contains(&hanger_id) {
        return Err(EngineError::NotInPackage {
            hanger_id,
            package_id,
        });
    }

    if let Some(existing) = rows::fetch_active_assignment_for_hanger(conn, hanger_id)? {
        return Err(EngineError::AlreadyAssigned {
            hanger_id,
            assignment_id: existing.id,
        });
    }

    let (planned, daily_capacity) = team_hours(conn, config, &team)?;
    let projected_hours = planned + hanger.estimate(config.default_hanger_hours);

    let assignment = new_assignment(&package, hanger_id, team_id, state);
    insert_checked(conn, &assignment)?;

    Ok(AssignmentOutcome {
        assignment,
        over_capacity_warning: projected_hours > daily_capacity,
        projected_hours,
        daily_capacity,
    })
}

fn place_package(
    conn: &Connection,
    config: &EngineConfig,
    package_id: Uuid,
    team_id: Uuid,
) -> Result<PackagePlacement, EngineError> {
    let package = require_package(conn, package_id)?;
    let team = require_team(conn, team_id)?;

    let (planned, daily_capacity) = team_hours(conn, config, &team)?;
    let mut projected_hours = planned;
    let mut assignments = Vec::new();
    let mut skipped_hanger_ids = Vec::new();

    for &hanger_id in &package.hanger_ids {
        if rows::fetch_active_assignment_for_hanger(conn, hanger_id)?.is_some() {
            skipped_hanger_ids.push(hanger_id);
            continue;
        }

        let hanger = rows::fetch_hanger(conn, hanger_id)?;
        projected_hours += capacity::hanger_hours(hanger.as_ref(), config);

        let assignment = new_assignment(&package, hanger_id, team_id, AssignmentState::Assigned);
        insert_checked(conn, &assignment)?;
        assignments.push(assignment);
    }

    Ok(PackagePlacement {
        package_id,
        team_id,
        assignments,
        skipped_hanger_ids,
        over_capacity_warning: projected_hours > daily_capacity,
        projected_hours,
        daily_capacity,
    })
}

fn move_to_team(
    conn: &Connection,
    config: &EngineConfig,
    assignment_id: Uuid,
    team_id: Uuid,
) -> Result<(AssignmentOutcome, Uuid), EngineError> {
    let mut assignment = require_assignment(conn, assignment_id)?;
    if !assignment.state.is_movable() {
        return Err(EngineError::InvalidState {
            id: assignment_id,
            state: assignment.state,
            action: "move",
        });
    }
    let team = require_team(conn, team_id)?;

    let from = assignment.team_id;
    let now = Utc::now();
    rows::update_assignment_team(conn, assignment_id, team_id, now)?;
    assignment.team_id = team_id;
    assignment.updated_at = now;

    // Read after the update so the moved hanger is counted on its new team.
    let (projected_hours, daily_capacity) = team_hours(conn, config, &team)?;

    Ok((
        AssignmentOutcome {
            assignment,
            over_capacity_warning: projected_hours > daily_capacity,
            projected_hours,
            daily_capacity,
        },
        from,
    ))
}

fn advance(
    conn: &Connection,
    assignment_id: Uuid,
    next: AssignmentState,
) -> Result<Assignment, EngineError> {
    let mut assignment = require_assignment(conn, assignment_id)?;
    if assignment.state == AssignmentState::Done {
        return Err(EngineError::Immutable { id: assignment_id });
    }
    if !assignment.state.can_advance_to(next) {
        return Err(EngineError::InvalidTransition {
            id: assignment_id,
            from: assignment.state,
            to: next,
        });
    }

    let now = Utc::now();
    rows::update_assignment_state(conn, assignment_id, next, now)?;
    assignment.state = next;
    assignment.updated_at = now;
    Ok(assignment)
}

fn cancel_in(conn: &Connection, assignment_id: Uuid) -> Result<(), EngineError> {
    let assignment = require_assignment(conn, assignment_id)?;
    if !assignment.state.is_cancellable() {
        return Err(EngineError::InvalidState {
            id: assignment_id,
            state: assignment.state,
            action: "cancel",
        });
    }
    rows::delete_assignment(conn, assignment_id)?;
    Ok(())
}

fn load_for_team(
    conn: &Connection,
    config: &EngineConfig,
    team_id: Uuid,
) -> Result<TeamLoad, EngineError> {
    let snapshot = rows::load_snapshot(conn, Some(team_id))?;
    let team = snapshot
        .team(team_id)
        .ok_or_else(|| EngineError::not_found("Team", team_id))?;
    Ok(snapshot.load(team, config))
}

fn preview(
    conn: &Connection,
    config: &EngineConfig,
    package_id: Uuid,
    team_id: Uuid,
) -> Result<PlacementPreview, EngineError> {
    let package = require_package(conn, package_id)?;
    let team = require_team(conn, team_id)?;
    let (planned_hours, daily_capacity) = team_hours(conn, config, &team)?;

    let mut added_hours = 0.0;
    let mut placeable_hangers = 0;
    for &hanger_id in &package.hanger_ids {
        if rows::fetch_active_assignment_for_hanger(conn, hanger_id)?.is_some() {
            continue;
        }
        let hanger = rows::fetch_hanger(conn, hanger_id)?;
        added_hours += capacity::hanger_hours(hanger.as_ref(), config);
        placeable_hangers += 1;
    }

    let projected_hours = planned_hours + added_hours;
    Ok(PlacementPreview {
        package_id,
        team_id,
        daily_capacity,
        planned_hours,
        added_hours,
        projected_hours,
        projected_utilization: capacity::ratio(projected_hours, daily_capacity),
        placeable_hangers,
        would_exceed: projected_hours > daily_capacity,
    })
}

fn summarize_all(conn: &Connection, config: &EngineConfig) -> Result<DashboardSummary, EngineError> {
    let snapshot = rows::load_snapshot(conn, None)?;
    let state_counts = rows::count_assignments_by_state(conn)?;
    Ok(dashboard::summarize(&snapshot, &state_counts, config))
}
