use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Binding of one hanger to one team.
///
/// Only the assignment engine creates, moves or cancels assignments. Once an
/// assignment reaches [`AssignmentState::Done`] it is kept for history but no
/// longer counts toward its team's planned hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub package_id: Uuid,
    pub hanger_id: Uuid,
    pub team_id: Uuid,
    pub state: AssignmentState,
    /// Inventory reported missing material when the hanger was placed.
    /// Informational only.
    pub shortage: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// The lifecycle state of an assignment.
///
/// - `Queued`: Tentatively placed on a crew's backlog
/// - `Assigned`: Placed on a crew, not yet started
/// - `InProgress`: Crew is working the hanger
/// - `Done`: Terminal; retained for history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Queued,
    Assigned,
    InProgress,
    Done,
}

impl AssignmentState {
    pub const ALL: [AssignmentState; 4] = [
        Self::Queued,
        Self::Assigned,
        Self::InProgress,
        Self::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "assigned" => Some(Self::Assigned),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Anything short of `Done` holds the hanger and counts toward capacity.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Done)
    }

    /// The only state reachable from this one, if any.
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Queued => Some(Self::Assigned),
            Self::Assigned => Some(Self::InProgress),
            Self::InProgress => Some(Self::Done),
            Self::Done => None,
        }
    }

    pub fn can_advance_to(&self, next: Self) -> bool {
        self.successor() == Some(next)
    }

    /// States a crew can be swapped in.
    pub fn is_movable(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }

    /// States an assignment can be withdrawn from.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Queued | Self::Assigned)
    }
}

impl std::fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for placing a hanger on a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignInput {
    pub hanger_id: Uuid,
    pub team_id: Uuid,
    pub package_id: Uuid,
    /// Place on the team's backlog (`Queued`) instead of `Assigned`.
    #[serde(default)]
    pub queue: bool,
}

/// Input for moving an assignment to another team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAssignmentInput {
    pub team_id: Uuid,
}

/// Input for advancing an assignment along its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceStateInput {
    pub state: AssignmentState,
}

/// Input for placing every free hanger of a package on a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignPackageInput {
    pub team_id: Uuid,
}

/// Filter for listing assignments. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentFilter {
    pub team_id: Option<Uuid>,
    pub hanger_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub state: Option<AssignmentState>,
    /// Only assignments that are not `Done`.
    #[serde(default)]
    pub active_only: bool,
}

/// Result of a placement (`assign`, `enqueue` or `move`).
///
/// Capacity is advisory: a placement that pushes the team past its daily
/// capacity still succeeds, with `over_capacity_warning` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub assignment: Assignment,
    pub over_capacity_warning: bool,
    /// Team planned hours including this assignment.
    pub projected_hours: f64,
    pub daily_capacity: f64,
}

/// Result of placing a whole package on a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePlacement {
    pub package_id: Uuid,
    pub team_id: Uuid,
    pub assignments: Vec<Assignment>,
    /// Hangers left alone because they already had an active assignment.
    pub skipped_hanger_ids: Vec<Uuid>,
    pub over_capacity_warning: bool,
    pub projected_hours: f64,
    pub daily_capacity: f64,
}

/// Read-only evaluation of placing a package on a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementPreview {
    pub package_id: Uuid,
    pub team_id: Uuid,
    pub daily_capacity: f64,
    pub planned_hours: f64,
    /// Hours of the package's hangers that are not actively assigned anywhere.
    pub added_hours: f64,
    pub projected_hours: f64,
    pub projected_utilization: f64,
    pub placeable_hangers: usize,
    pub would_exceed: bool,
}
