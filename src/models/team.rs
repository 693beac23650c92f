use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A crew that hangers are assigned to.
///
/// Capacity is never stored. It is derived on every read from `daily_hours`
/// when that is set and positive, otherwise from the member count (see
/// [`crate::capacity::daily_capacity`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    /// Ordered member identities. May be empty.
    pub members: Vec<String>,
    /// Explicit labor-hours available per day.
    pub daily_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeamInput {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub daily_hours: Option<f64>,
}

/// Input for updating a team. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTeamInput {
    pub name: Option<String>,
    pub members: Option<Vec<String>>,
    pub daily_hours: Option<f64>,
    /// Drop an explicit `daily_hours` so capacity falls back to headcount.
    #[serde(default)]
    pub clear_daily_hours: bool,
}
