use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named bundle of hangers sharing a location.
///
/// `state` is a free-text status owned by the UI (e.g. "detailing",
/// "released", "on site"). The engine never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub state: String,
    pub level: Option<String>,
    pub zone: Option<String>,
    /// Member hangers in drawing order. Never empty.
    pub hanger_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageInput {
    pub project_id: Uuid,
    pub name: String,
    /// Initial status. Defaults to `"new"`.
    pub state: Option<String>,
    pub level: Option<String>,
    pub zone: Option<String>,
    pub hanger_ids: Vec<Uuid>,
}

/// Input for updating a package's status and location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePackageInput {
    pub state: Option<String>,
    pub level: Option<String>,
    pub zone: Option<String>,
}
