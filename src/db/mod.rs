pub(crate) mod rows;
mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::capacity::CapacitySnapshot;
use crate::models::*;

/// A rejected store request: missing parent, bad hours, malformed package.
///
/// Carried inside `anyhow::Error`; callers downcast to tell it apart from
/// storage failures.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The entity store.
///
/// A single SQLite connection behind one mutex. Every read and every write
/// holds the lock for its whole duration, so readers always observe whole
/// transactions and writers are serialized.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "crewcap")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("crewcap.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    /// Run `f` against a consistent view of the store.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.conn.lock().expect("database lock poisoned");
        f(&conn)
    }

    /// Run `f` inside a transaction while holding the writer lock.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls it
    /// back when the transaction is dropped.
    pub fn write<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        Ok(self.read(rows::fetch_projects)?)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.read(|conn| rows::fetch_project(conn, id))?)
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Deletes the project with its hangers, packages and assignments.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Team operations
    // ============================================================

    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        Ok(self.read(rows::fetch_teams)?)
    }

    pub fn get_team(&self, id: Uuid) -> Result<Option<Team>> {
        Ok(self.read(|conn| rows::fetch_team(conn, id))?)
    }

    pub fn create_team(&self, input: CreateTeamInput) -> Result<Team> {
        if let Some(hours) = input.daily_hours {
            validate_hours("daily_hours", hours)?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO teams (id, name, members, daily_hours, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                serde_json::to_string(&input.members)?,
                input.daily_hours,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Team {
            id,
            name: input.name,
            members: input.members,
            daily_hours: input.daily_hours,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_team(&self, id: Uuid, input: UpdateTeamInput) -> Result<Option<Team>> {
        if let Some(hours) = input.daily_hours {
            validate_hours("daily_hours", hours)?;
        }

        self.write(|tx| {
            let Some(existing) = rows::fetch_team(tx, id)? else {
                return Ok(None);
            };

            let now = Utc::now();
            let name = input.name.unwrap_or(existing.name);
            let members = input.members.unwrap_or(existing.members);
            let daily_hours = if input.clear_daily_hours {
                None
            } else {
                input.daily_hours.or(existing.daily_hours)
            };

            tx.execute(
                "UPDATE teams SET name = ?, members = ?, daily_hours = ?, updated_at = ? WHERE id = ?",
                (
                    &name,
                    serde_json::to_string(&members)?,
                    daily_hours,
                    now.to_rfc3339(),
                    id.to_string(),
                ),
            )?;

            Ok(Some(Team {
                id,
                name,
                members,
                daily_hours,
                created_at: existing.created_at,
                updated_at: now,
            }))
        })
    }

    /// Deletes a team that no assignment (active or historical) references.
    pub fn delete_team(&self, id: Uuid) -> Result<bool> {
        self.write(|tx| {
            if rows::count_team_assignments(tx, id)? > 0 {
                anyhow::bail!(ValidationError::new("Team has assignments and cannot be deleted"));
            }
            let rows = tx.execute("DELETE FROM teams WHERE id = ?", [id.to_string()])?;
            Ok(rows > 0)
        })
    }

    // ============================================================
    // Hanger operations
    // ============================================================

    pub fn get_hangers(&self, project_id: Option<Uuid>) -> Result<Vec<Hanger>> {
        Ok(self.read(|conn| rows::fetch_hangers(conn, project_id))?)
    }

    pub fn get_hanger(&self, id: Uuid) -> Result<Option<Hanger>> {
        Ok(self.read(|conn| rows::fetch_hanger(conn, id))?)
    }

    pub fn create_hanger(&self, input: CreateHangerInput) -> Result<Hanger> {
        if let Some(hours) = input.est_hours {
            validate_hours("est_hours", hours)?;
        }

        self.write(|tx| {
            rows::fetch_project(tx, input.project_id)?
                .ok_or_else(|| ValidationError::new("Project not found"))?;

            let id = Uuid::new_v4();
            let now = Utc::now();

            tx.execute(
                "INSERT INTO hangers (id, project_id, tag, est_hours, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    input.project_id.to_string(),
                    &input.tag,
                    input.est_hours,
                    now.to_rfc3339(),
                ),
            )?;

            Ok(Hanger {
                id,
                project_id: input.project_id,
                tag: input.tag,
                est_hours: input.est_hours,
                actual_hours: None,
                created_at: now,
            })
        })
    }

    /// Records the hours a hanger actually took. Capacity sums are unaffected.
    pub fn record_actual_hours(&self, id: Uuid, actual_hours: f64) -> Result<Option<Hanger>> {
        validate_hours("actual_hours", actual_hours)?;

        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE hangers SET actual_hours = ? WHERE id = ?",
                (actual_hours, id.to_string()),
            )?;
            if rows == 0 {
                return Ok(None);
            }
            Ok(rows::fetch_hanger(tx, id)?)
        })
    }

    // ============================================================
    // Package operations
    // ============================================================

    pub fn get_packages(&self, project_id: Option<Uuid>) -> Result<Vec<Package>> {
        Ok(self.read(|conn| rows::fetch_packages(conn, project_id))?)
    }

    pub fn get_package(&self, id: Uuid) -> Result<Option<Package>> {
        Ok(self.read(|conn| rows::fetch_package(conn, id))?)
    }

    pub fn create_package(&self, input: CreatePackageInput) -> Result<Package> {
        if input.hanger_ids.is_empty() {
            anyhow::bail!(ValidationError::new("Package must contain at least one hanger"));
        }
        let mut seen = HashSet::new();
        if !input.hanger_ids.iter().all(|id| seen.insert(*id)) {
            anyhow::bail!(ValidationError::new("Package must not list a hanger twice"));
        }

        self.write(|tx| {
            rows::fetch_project(tx, input.project_id)?
                .ok_or_else(|| ValidationError::new("Project not found"))?;

            for hanger_id in &input.hanger_ids {
                let hanger = rows::fetch_hanger(tx, *hanger_id)?
                    .ok_or_else(|| ValidationError(format!("Hanger {} not found", hanger_id)))?;
                if hanger.project_id != input.project_id {
                    anyhow::bail!(ValidationError(format!(
                        "Hanger {} must belong to the package's project",
                        hanger_id
                    )));
                }
            }

            let id = Uuid::new_v4();
            let now = Utc::now();
            let state = input.state.unwrap_or_else(|| "new".to_string());

            tx.execute(
                "INSERT INTO packages (id, project_id, name, state, level, zone, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    input.project_id.to_string(),
                    &input.name,
                    &state,
                    &input.level,
                    &input.zone,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ),
            )?;

            for (position, hanger_id) in input.hanger_ids.iter().enumerate() {
                tx.execute(
                    "INSERT INTO package_hangers (package_id, hanger_id, position) VALUES (?, ?, ?)",
                    (id.to_string(), hanger_id.to_string(), position as i64),
                )?;
            }

            Ok(Package {
                id,
                project_id: input.project_id,
                name: input.name,
                state,
                level: input.level,
                zone: input.zone,
                hanger_ids: input.hanger_ids,
                created_at: now,
                updated_at: now,
            })
        })
    }

    pub fn update_package(&self, id: Uuid, input: UpdatePackageInput) -> Result<Option<Package>> {
        self.write(|tx| {
            let Some(existing) = rows::fetch_package(tx, id)? else {
                return Ok(None);
            };

            let now = Utc::now();
            let state = input.state.unwrap_or(existing.state);
            let level = input.level.or(existing.level);
            let zone = input.zone.or(existing.zone);

            tx.execute(
                "UPDATE packages SET state = ?, level = ?, zone = ?, updated_at = ? WHERE id = ?",
                (&state, &level, &zone, now.to_rfc3339(), id.to_string()),
            )?;

            Ok(Some(Package {
                state,
                level,
                zone,
                updated_at: now,
                ..existing
            }))
        })
    }

    // ============================================================
    // Assignment queries (mutation goes through the engine)
    // ============================================================

    pub fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        Ok(self.read(|conn| rows::fetch_assignment(conn, id))?)
    }

    pub fn get_assignments(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>> {
        Ok(self.read(|conn| rows::query_assignments(conn, filter))?)
    }

    pub fn get_active_assignment_for_hanger(&self, hanger_id: Uuid) -> Result<Option<Assignment>> {
        Ok(self.read(|conn| rows::fetch_active_assignment_for_hanger(conn, hanger_id))?)
    }

    // ============================================================
    // Capacity snapshots
    // ============================================================

    /// All teams, active assignments and referenced hangers in one read.
    pub fn capacity_snapshot(&self) -> Result<CapacitySnapshot> {
        Ok(self.read(|conn| rows::load_snapshot(conn, None))?)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn validate_hours(field: &str, hours: f64) -> Result<()> {
    if !hours.is_finite() || hours < 0.0 {
        anyhow::bail!(ValidationError(format!(
            "{} must be a non-negative number of hours",
            field
        )));
    }
    Ok(())
}
