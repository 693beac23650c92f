use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of physical fabrication work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hanger {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Shop tag printed on the hanger drawing.
    pub tag: String,
    /// Estimated labor-hours. `None` means the configured default applies.
    pub est_hours: Option<f64>,
    /// Hours actually spent, recorded by the shop floor on completion.
    pub actual_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Hanger {
    /// Estimated hours, falling back to `default_hours` when unset.
    pub fn estimate(&self, default_hours: f64) -> f64 {
        self.est_hours.unwrap_or(default_hours)
    }
}

/// Input for creating a new hanger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHangerInput {
    pub project_id: Uuid,
    pub tag: String,
    pub est_hours: Option<f64>,
}

/// Input for recording the hours a hanger actually took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActualHoursInput {
    pub actual_hours: f64,
}
