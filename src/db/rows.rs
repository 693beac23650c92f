//! Connection-level queries shared by [`super::Database`] and the engine.
//!
//! Every function takes a borrowed connection (or transaction) so callers
//! decide the lock and transaction scope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::capacity::CapacitySnapshot;
use crate::models::*;

const PROJECT_COLUMNS: &str = "id, name, description, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, members, daily_hours, created_at, updated_at";
const HANGER_COLUMNS: &str = "id, project_id, tag, est_hours, actual_hours, created_at";
const PACKAGE_COLUMNS: &str = "id, project_id, name, state, level, zone, created_at, updated_at";
const ASSIGNMENT_COLUMNS: &str =
    "id, project_id, package_id, hanger_id, team_id, state, shortage, created_at, updated_at";

// ============================================================
// Row mapping
// ============================================================

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    let members_json: String = row.get(2)?;
    Ok(Team {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        members: serde_json::from_str(&members_json).unwrap_or_default(),
        daily_hours: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn hanger_from_row(row: &Row<'_>) -> rusqlite::Result<Hanger> {
    Ok(Hanger {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        tag: row.get(2)?,
        est_hours: row.get(3)?,
        actual_hours: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

/// Maps a package row; `hanger_ids` is filled in separately.
fn package_from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        state: row.get(3)?,
        level: row.get(4)?,
        zone: row.get(5)?,
        hanger_ids: Vec::new(),
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        package_id: parse_uuid(row.get::<_, String>(2)?),
        hanger_id: parse_uuid(row.get::<_, String>(3)?),
        team_id: parse_uuid(row.get::<_, String>(4)?),
        state: AssignmentState::from_str(&row.get::<_, String>(5)?)
            .unwrap_or(AssignmentState::Assigned),
        shortage: row.get::<_, i32>(6)? != 0,
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

// ============================================================
// Projects
// ============================================================

pub(crate) fn fetch_projects(conn: &Connection) -> rusqlite::Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"
    ))?;
    let projects = stmt
        .query_map([], project_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projects)
}

pub(crate) fn fetch_project(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Project>> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
        [id.to_string()],
        project_from_row,
    )
    .optional()
}

// ============================================================
// Teams
// ============================================================

pub(crate) fn fetch_teams(conn: &Connection) -> rusqlite::Result<Vec<Team>> {
    let mut stmt = conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY name"))?;
    let teams = stmt
        .query_map([], team_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(teams)
}

pub(crate) fn fetch_team(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Team>> {
    conn.query_row(
        &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?"),
        [id.to_string()],
        team_from_row,
    )
    .optional()
}

// ============================================================
// Hangers
// ============================================================

pub(crate) fn fetch_hangers(
    conn: &Connection,
    project_id: Option<Uuid>,
) -> rusqlite::Result<Vec<Hanger>> {
    let hangers = match project_id {
        Some(project_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HANGER_COLUMNS} FROM hangers WHERE project_id = ? ORDER BY tag"
            ))?;
            let rows = stmt
                .query_map([project_id.to_string()], hanger_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {HANGER_COLUMNS} FROM hangers ORDER BY tag"))?;
            let rows = stmt
                .query_map([], hanger_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(hangers)
}

pub(crate) fn fetch_hanger(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Hanger>> {
    conn.query_row(
        &format!("SELECT {HANGER_COLUMNS} FROM hangers WHERE id = ?"),
        [id.to_string()],
        hanger_from_row,
    )
    .optional()
}

// ============================================================
// Packages
// ============================================================

pub(crate) fn fetch_package_hanger_ids(
    conn: &Connection,
    package_id: Uuid,
) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT hanger_id FROM package_hangers WHERE package_id = ? ORDER BY position",
    )?;
    let ids = stmt
        .query_map([package_id.to_string()], |row| {
            Ok(parse_uuid(row.get::<_, String>(0)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub(crate) fn fetch_package(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Package>> {
    let package = conn
        .query_row(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?"),
            [id.to_string()],
            package_from_row,
        )
        .optional()?;

    match package {
        Some(mut package) => {
            package.hanger_ids = fetch_package_hanger_ids(conn, package.id)?;
            Ok(Some(package))
        }
        None => Ok(None),
    }
}

pub(crate) fn fetch_packages(
    conn: &Connection,
    project_id: Option<Uuid>,
) -> rusqlite::Result<Vec<Package>> {
    let mut packages = match project_id {
        Some(project_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PACKAGE_COLUMNS} FROM packages WHERE project_id = ? ORDER BY name"
            ))?;
            let rows = stmt
                .query_map([project_id.to_string()], package_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY name"))?;
            let rows = stmt
                .query_map([], package_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    for package in &mut packages {
        package.hanger_ids = fetch_package_hanger_ids(conn, package.id)?;
    }
    Ok(packages)
}

// ============================================================
// Assignments
// ============================================================

pub(crate) fn fetch_assignment(
    conn: &Connection,
    id: Uuid,
) -> rusqlite::Result<Option<Assignment>> {
    conn.query_row(
        &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?"),
        [id.to_string()],
        assignment_from_row,
    )
    .optional()
}

pub(crate) fn fetch_active_assignment_for_hanger(
    conn: &Connection,
    hanger_id: Uuid,
) -> rusqlite::Result<Option<Assignment>> {
    conn.query_row(
        &format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE hanger_id = ? AND state != 'done'"
        ),
        [hanger_id.to_string()],
        assignment_from_row,
    )
    .optional()
}

pub(crate) fn query_assignments(
    conn: &Connection,
    filter: &AssignmentFilter,
) -> rusqlite::Result<Vec<Assignment>> {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(team_id) = filter.team_id {
        clauses.push("team_id = ?");
        params.push(Box::new(team_id.to_string()));
    }
    if let Some(hanger_id) = filter.hanger_id {
        clauses.push("hanger_id = ?");
        params.push(Box::new(hanger_id.to_string()));
    }
    if let Some(package_id) = filter.package_id {
        clauses.push("package_id = ?");
        params.push(Box::new(package_id.to_string()));
    }
    if let Some(project_id) = filter.project_id {
        clauses.push("project_id = ?");
        params.push(Box::new(project_id.to_string()));
    }
    if let Some(state) = filter.state {
        clauses.push("state = ?");
        params.push(Box::new(state.as_str().to_string()));
    }
    if filter.active_only {
        clauses.push("state != 'done'");
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments{where_clause} ORDER BY created_at, id"
    );

    let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let assignments = stmt
        .query_map(params_ref.as_slice(), assignment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assignments)
}

pub(crate) fn insert_assignment(conn: &Connection, a: &Assignment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO assignments (id, project_id, package_id, hanger_id, team_id, state, shortage, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            a.id.to_string(),
            a.project_id.to_string(),
            a.package_id.to_string(),
            a.hanger_id.to_string(),
            a.team_id.to_string(),
            a.state.as_str(),
            a.shortage as i32,
            a.created_at.to_rfc3339(),
            a.updated_at.to_rfc3339(),
        ),
    )?;
    Ok(())
}

pub(crate) fn update_assignment_team(
    conn: &Connection,
    id: Uuid,
    team_id: Uuid,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE assignments SET team_id = ?, updated_at = ? WHERE id = ?",
        (team_id.to_string(), now.to_rfc3339(), id.to_string()),
    )
}

pub(crate) fn update_assignment_state(
    conn: &Connection,
    id: Uuid,
    state: AssignmentState,
    now: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE assignments SET state = ?, updated_at = ? WHERE id = ?",
        (state.as_str(), now.to_rfc3339(), id.to_string()),
    )
}

/// Stamps the shortage flag. Rows cancelled meanwhile are left alone.
pub(crate) fn update_assignment_shortage(
    conn: &Connection,
    id: Uuid,
    shortage: bool,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE assignments SET shortage = ? WHERE id = ?",
        (shortage as i32, id.to_string()),
    )
}

pub(crate) fn delete_assignment(conn: &Connection, id: Uuid) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM assignments WHERE id = ?", [id.to_string()])
}

pub(crate) fn count_team_assignments(conn: &Connection, team_id: Uuid) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM assignments WHERE team_id = ?",
        [team_id.to_string()],
        |row| row.get(0),
    )
}

pub(crate) fn count_assignments_by_state(
    conn: &Connection,
) -> rusqlite::Result<Vec<(AssignmentState, u64)>> {
    let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM assignments GROUP BY state")?;
    let counts = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(counts
        .into_iter()
        .filter_map(|(state, count)| {
            AssignmentState::from_str(&state).map(|s| (s, count.max(0) as u64))
        })
        .collect())
}

// ============================================================
// Capacity snapshots
// ============================================================

/// Loads teams, active assignments and the hangers they reference.
///
/// With `team_id` set only that team and its assignments are loaded.
pub(crate) fn load_snapshot(
    conn: &Connection,
    team_id: Option<Uuid>,
) -> rusqlite::Result<CapacitySnapshot> {
    let teams = match team_id {
        Some(id) => fetch_team(conn, id)?.into_iter().collect(),
        None => fetch_teams(conn)?,
    };

    let assignments = query_assignments(
        conn,
        &AssignmentFilter {
            team_id,
            active_only: true,
            ..Default::default()
        },
    )?;

    let sql = match team_id {
        Some(_) => format!(
            "SELECT {} FROM hangers h JOIN assignments a ON a.hanger_id = h.id
             WHERE a.state != 'done' AND a.team_id = ?",
            prefixed(HANGER_COLUMNS, "h")
        ),
        None => format!(
            "SELECT {} FROM hangers h JOIN assignments a ON a.hanger_id = h.id
             WHERE a.state != 'done'",
            prefixed(HANGER_COLUMNS, "h")
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let hangers: HashMap<Uuid, Hanger> = match team_id {
        Some(id) => stmt
            .query_map([id.to_string()], hanger_from_row)?
            .map(|h| h.map(|h| (h.id, h)))
            .collect::<Result<_, _>>()?,
        None => stmt
            .query_map([], hanger_from_row)?
            .map(|h| h.map(|h| (h.id, h)))
            .collect::<Result<_, _>>()?,
    };

    tracing::debug!(
        teams = teams.len(),
        assignments = assignments.len(),
        "Loaded capacity snapshot"
    );

    Ok(CapacitySnapshot {
        teams,
        hangers,
        assignments,
    })
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================
// Parsing helpers
// ============================================================

pub(crate) fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
