use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use crew_capacity::config::EngineConfig;
use crew_capacity::db::Database;
use crew_capacity::engine::{AssignmentEngine, EngineError};
use crew_capacity::models::*;
use crew_capacity::shortage::{FlaggedShortages, NoShortages, ShortageError, ShortageEvaluator};
use reqwest::StatusCode;
use speculate2::speculate;
use tokio_test::block_on;
use uuid::Uuid;

struct FailingInventory;

#[async_trait]
impl ShortageEvaluator for FailingInventory {
    async fn has_shortage(&self, _hanger_id: Uuid) -> Result<bool, ShortageError> {
        Err(ShortageError::Status(StatusCode::SERVICE_UNAVAILABLE))
    }
}

struct SlowInventory;

#[async_trait]
impl ShortageEvaluator for SlowInventory {
    async fn has_shortage(&self, _hanger_id: Uuid) -> Result<bool, ShortageError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(true)
    }
}

/// Inventory that withdraws the assignment while it is being asked about it.
#[derive(Default)]
struct CancellingInventory {
    engine: OnceLock<AssignmentEngine>,
}

#[async_trait]
impl ShortageEvaluator for CancellingInventory {
    async fn has_shortage(&self, hanger_id: Uuid) -> Result<bool, ShortageError> {
        if let Some(engine) = self.engine.get() {
            let held = engine.store().get_active_assignment_for_hanger(hanger_id).ok().flatten();
            if let Some(assignment) = held {
                engine.cancel(assignment.id).ok();
            }
        }
        Ok(true)
    }
}

struct Fixture {
    engine: AssignmentEngine,
    project: Project,
}

impl Fixture {
    fn new(shortages: Arc<dyn ShortageEvaluator>) -> Self {
        let config = EngineConfig {
            shortage_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        Self::with_config(shortages, config)
    }

    fn with_config(shortages: Arc<dyn ShortageEvaluator>, config: EngineConfig) -> Self {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let project = db
            .create_project(CreateProjectInput {
                name: "Tower A".to_string(),
                description: None,
            })
            .expect("Failed to create project");

        Self {
            engine: AssignmentEngine::new(db, shortages, config),
            project,
        }
    }

    fn team(&self, name: &str, members: usize, daily_hours: Option<f64>) -> Team {
        self.engine
            .store()
            .create_team(CreateTeamInput {
                name: name.to_string(),
                members: (0..members).map(|i| format!("{}-{}", name, i)).collect(),
                daily_hours,
            })
            .expect("Failed to create team")
    }

    fn hanger(&self, tag: &str, est_hours: Option<f64>) -> Hanger {
        self.engine
            .store()
            .create_hanger(CreateHangerInput {
                project_id: self.project.id,
                tag: tag.to_string(),
                est_hours,
            })
            .expect("Failed to create hanger")
    }

    fn package(&self, hangers: &[&Hanger]) -> Package {
        self.engine
            .store()
            .create_package(CreatePackageInput {
                project_id: self.project.id,
                name: "Level 2".to_string(),
                state: None,
                level: None,
                zone: None,
                hanger_ids: hangers.iter().map(|h| h.id).collect(),
            })
            .expect("Failed to create package")
    }

    fn assign(&self, hanger: &Hanger, team: &Team, package: &Package) -> AssignmentOutcome {
        block_on(self.engine.assign(hanger.id, team.id, package.id)).expect("Assign failed")
    }
}

speculate! {
    before {
        let fx = Fixture::new(Arc::new(NoShortages));
    }

    describe "assign" {
        it "tracks planned hours and warns past capacity" {
            let team = fx.team("Crew A", 2, Some(16.0));
            let h1 = fx.hanger("H-1", Some(6.0));
            let h2 = fx.hanger("H-2", Some(8.0));
            let h3 = fx.hanger("H-3", Some(5.0));
            let package = fx.package(&[&h1, &h2, &h3]);

            let first = fx.assign(&h1, &team, &package);
            assert!(!first.over_capacity_warning);
            assert_eq!(first.projected_hours, 6.0);

            let second = fx.assign(&h2, &team, &package);
            assert!(!second.over_capacity_warning);
            assert_eq!(second.projected_hours, 14.0);

            let third = fx.assign(&h3, &team, &package);
            assert!(third.over_capacity_warning);
            assert_eq!(third.projected_hours, 19.0);
            assert_eq!(third.daily_capacity, 16.0);

            let load = fx.engine.team_load(team.id).expect("Load failed");
            assert_eq!(load.planned_hours, 19.0);
            assert!(load.over_capacity);
            assert_eq!(load.remaining_hours, 0.0);
            assert_eq!(load.active_assignments, 3);
        }

        it "floors headcount capacity at the default crew size" {
            let team = fx.team("Crew B", 2, None);
            let load = fx.engine.team_load(team.id).expect("Load failed");

            assert_eq!(load.daily_capacity, 24.0);
            assert_eq!(load.planned_hours, 0.0);
            assert_eq!(load.utilization, 0.0);
        }

        it "counts the default estimate for unestimated hangers" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", None);
            let package = fx.package(&[&hanger]);

            let outcome = fx.assign(&hanger, &team, &package);
            assert_eq!(outcome.projected_hours, 2.0);
            assert_eq!(outcome.assignment.state, AssignmentState::Assigned);
        }

        it "refuses a hanger that is already held" {
            let a = fx.team("Crew A", 3, None);
            let b = fx.team("Crew B", 3, None);
            let hanger = fx.hanger("H-1", Some(4.0));
            let package = fx.package(&[&hanger]);
            let held = fx.assign(&hanger, &a, &package);

            let err = block_on(fx.engine.assign(hanger.id, b.id, package.id))
                .expect_err("Double assignment accepted");

            match err {
                EngineError::AlreadyAssigned { hanger_id, assignment_id } => {
                    assert_eq!(hanger_id, hanger.id);
                    assert_eq!(assignment_id, held.assignment.id);
                }
                other => panic!("Unexpected error: {}", other),
            }
            assert_eq!(fx.engine.team_load(b.id).expect("Load failed").planned_hours, 0.0);
        }

        it "reports missing entities" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", None);
            let package = fx.package(&[&hanger]);

            let err = block_on(fx.engine.assign(Uuid::new_v4(), team.id, package.id)).expect_err("Unknown hanger");
            assert!(matches!(err, EngineError::NotFound { entity: "Hanger", .. }));

            let err = block_on(fx.engine.assign(hanger.id, Uuid::new_v4(), package.id)).expect_err("Unknown team");
            assert!(matches!(err, EngineError::NotFound { entity: "Team", .. }));

            let err = block_on(fx.engine.assign(hanger.id, team.id, Uuid::new_v4())).expect_err("Unknown package");
            assert!(matches!(err, EngineError::NotFound { entity: "Package", .. }));
        }

        it "refuses a hanger from another project" {
            let team = fx.team("Crew A", 3, None);
            let other = fx.engine.store().create_project(CreateProjectInput {
                name: "Tower B".to_string(),
                description: None,
            }).expect("Failed to create project");
            let foreign = fx.engine.store().create_hanger(CreateHangerInput {
                project_id: other.id,
                tag: "B-1".to_string(),
                est_hours: Some(4.0),
            }).expect("Failed to create hanger");
            let local = fx.hanger("H-1", None);
            let package = fx.package(&[&local]);

            let err = block_on(fx.engine.assign(foreign.id, team.id, package.id))
                .expect_err("Foreign hanger accepted");
            assert!(matches!(err, EngineError::NotInPackage { hanger_id, .. } if hanger_id == foreign.id));

            assert!(fx.engine.store().get_active_assignment_for_hanger(foreign.id).expect("Query failed").is_none());
            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").active_assignments, 0);
        }

        it "refuses a hanger the package does not list" {
            let team = fx.team("Crew A", 3, None);
            let listed = fx.hanger("H-1", None);
            let unlisted = fx.hanger("H-2", None);
            let package = fx.package(&[&listed]);

            let err = block_on(fx.engine.enqueue(unlisted.id, team.id, package.id))
                .expect_err("Unlisted hanger accepted");
            assert!(matches!(err, EngineError::NotInPackage { package_id, .. } if package_id == package.id));
            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").active_assignments, 0);
        }

        it "lets a hanger be placed again once its assignment is done" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", Some(3.0));
            let package = fx.package(&[&hanger]);
            let first = fx.assign(&hanger, &team, &package);

            fx.engine.advance_state(first.assignment.id, AssignmentState::InProgress).expect("Advance failed");
            fx.engine.advance_state(first.assignment.id, AssignmentState::Done).expect("Advance failed");

            let second = fx.assign(&hanger, &team, &package);
            assert_ne!(second.assignment.id, first.assignment.id);
            assert_eq!(second.projected_hours, 3.0);
        }
    }

    describe "enqueue" {
        it "places the hanger on the backlog and counts its hours" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", Some(7.0));
            let package = fx.package(&[&hanger]);

            let outcome = block_on(fx.engine.enqueue(hanger.id, team.id, package.id)).expect("Enqueue failed");

            assert_eq!(outcome.assignment.state, AssignmentState::Queued);
            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").planned_hours, 7.0);
        }
    }

    describe "advance_state" {
        it "walks the lifecycle one step at a time" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", Some(4.0));
            let package = fx.package(&[&hanger]);
            let queued = block_on(fx.engine.enqueue(hanger.id, team.id, package.id)).expect("Enqueue failed");
            let id = queued.assignment.id;

            let err = fx.engine.advance_state(id, AssignmentState::Done).expect_err("Skipped states");
            assert!(matches!(err, EngineError::InvalidTransition { from: AssignmentState::Queued, to: AssignmentState::Done, .. }));

            for next in [AssignmentState::Assigned, AssignmentState::InProgress, AssignmentState::Done] {
                let advanced = fx.engine.advance_state(id, next).expect("Advance failed");
                assert_eq!(advanced.state, next);
            }

            let stored = fx.engine.store().get_assignment(id).expect("Query failed").expect("Assignment missing");
            assert_eq!(stored.state, AssignmentState::Done);
        }

        it "rejects going backwards" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", None);
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &team, &package);
            fx.engine.advance_state(outcome.assignment.id, AssignmentState::InProgress).expect("Advance failed");

            let err = fx.engine
                .advance_state(outcome.assignment.id, AssignmentState::Assigned)
                .expect_err("Backwards transition accepted");
            assert!(matches!(err, EngineError::InvalidTransition { .. }));
        }

        it "freezes done assignments and releases their hours" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", Some(6.0));
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &team, &package);
            let id = outcome.assignment.id;

            fx.engine.advance_state(id, AssignmentState::InProgress).expect("Advance failed");
            fx.engine.advance_state(id, AssignmentState::Done).expect("Advance failed");

            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").planned_hours, 0.0);

            let err = fx.engine.advance_state(id, AssignmentState::Done).expect_err("Done changed");
            assert!(matches!(err, EngineError::Immutable { .. }));

            let other = fx.team("Crew B", 3, None);
            let err = fx.engine.move_assignment(id, other.id).expect_err("Done moved");
            assert!(matches!(err, EngineError::InvalidState { state: AssignmentState::Done, .. }));

            let err = fx.engine.cancel(id).expect_err("Done cancelled");
            assert!(matches!(err, EngineError::InvalidState { state: AssignmentState::Done, .. }));
        }

        it "reports an unknown assignment" {
            let err = fx.engine
                .advance_state(Uuid::new_v4(), AssignmentState::Assigned)
                .expect_err("Unknown assignment advanced");
            assert!(matches!(err, EngineError::NotFound { entity: "Assignment", .. }));
        }
    }

    describe "move_assignment" {
        it "shifts hours between teams" {
            let a = fx.team("Crew A", 3, None);
            let b = fx.team("Crew B", 3, None);
            let h1 = fx.hanger("H-1", Some(5.0));
            let h2 = fx.hanger("H-2", Some(3.0));
            let package = fx.package(&[&h1, &h2]);
            fx.assign(&h1, &a, &package);
            let moving = fx.assign(&h2, &a, &package);

            let outcome = fx.engine.move_assignment(moving.assignment.id, b.id).expect("Move failed");

            assert_eq!(outcome.assignment.team_id, b.id);
            assert_eq!(outcome.projected_hours, 3.0);
            assert_eq!(fx.engine.team_load(a.id).expect("Load failed").planned_hours, 5.0);
            assert_eq!(fx.engine.team_load(b.id).expect("Load failed").planned_hours, 3.0);
        }

        it "keeps the lifecycle state of an in-progress assignment" {
            let a = fx.team("Crew A", 3, None);
            let b = fx.team("Crew B", 3, None);
            let hanger = fx.hanger("H-1", Some(2.0));
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &a, &package);
            fx.engine.advance_state(outcome.assignment.id, AssignmentState::InProgress).expect("Advance failed");

            let moved = fx.engine.move_assignment(outcome.assignment.id, b.id).expect("Move failed");
            assert_eq!(moved.assignment.state, AssignmentState::InProgress);
        }

        it "warns when the destination goes over capacity" {
            let a = fx.team("Crew A", 3, None);
            let small = fx.team("Crew S", 0, Some(4.0));
            let hanger = fx.hanger("H-1", Some(6.0));
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &a, &package);

            let moved = fx.engine.move_assignment(outcome.assignment.id, small.id).expect("Move failed");
            assert!(moved.over_capacity_warning);
            assert_eq!(moved.daily_capacity, 4.0);
        }

        it "refuses queued assignments" {
            let a = fx.team("Crew A", 3, None);
            let b = fx.team("Crew B", 3, None);
            let hanger = fx.hanger("H-1", None);
            let package = fx.package(&[&hanger]);
            let queued = block_on(fx.engine.enqueue(hanger.id, a.id, package.id)).expect("Enqueue failed");

            let err = fx.engine.move_assignment(queued.assignment.id, b.id).expect_err("Queued moved");
            assert!(matches!(err, EngineError::InvalidState { state: AssignmentState::Queued, .. }));
        }

        it "reports an unknown assignment" {
            let team = fx.team("Crew A", 3, None);
            let err = fx.engine.move_assignment(Uuid::new_v4(), team.id).expect_err("Unknown assignment moved");
            assert!(matches!(err, EngineError::NotFound { entity: "Assignment", .. }));
        }

        it "refuses an unknown destination team" {
            let a = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", None);
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &a, &package);

            let err = fx.engine.move_assignment(outcome.assignment.id, Uuid::new_v4()).expect_err("Moved to nowhere");
            assert!(matches!(err, EngineError::NotFound { entity: "Team", .. }));
            assert_eq!(fx.engine.team_load(a.id).expect("Load failed").active_assignments, 1);
        }
    }

    describe "cancel" {
        it "removes assigned work and frees the hanger" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", Some(4.0));
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &team, &package);

            fx.engine.cancel(outcome.assignment.id).expect("Cancel failed");

            assert!(fx.engine.store().get_assignment(outcome.assignment.id).expect("Query failed").is_none());
            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").planned_hours, 0.0);
            fx.assign(&hanger, &team, &package);
        }

        it "withdraws a queued assignment" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", Some(5.0));
            let package = fx.package(&[&hanger]);
            let queued = block_on(fx.engine.enqueue(hanger.id, team.id, package.id)).expect("Enqueue failed");
            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").planned_hours, 5.0);

            fx.engine.cancel(queued.assignment.id).expect("Cancel failed");

            assert!(fx.engine.store().get_assignment(queued.assignment.id).expect("Query failed").is_none());
            assert!(fx.engine.store().get_active_assignment_for_hanger(hanger.id).expect("Query failed").is_none());
            assert_eq!(fx.engine.team_load(team.id).expect("Load failed").planned_hours, 0.0);

            let again = fx.assign(&hanger, &team, &package);
            assert_eq!(again.assignment.state, AssignmentState::Assigned);
        }

        it "reports an unknown assignment" {
            let err = fx.engine.cancel(Uuid::new_v4()).expect_err("Unknown assignment cancelled");
            assert!(matches!(err, EngineError::NotFound { entity: "Assignment", .. }));
        }

        it "refuses work already in progress" {
            let team = fx.team("Crew A", 3, None);
            let hanger = fx.hanger("H-1", None);
            let package = fx.package(&[&hanger]);
            let outcome = fx.assign(&hanger, &team, &package);
            fx.engine.advance_state(outcome.assignment.id, AssignmentState::InProgress).expect("Advance failed");

            let err = fx.engine.cancel(outcome.assignment.id).expect_err("In-progress cancelled");
            assert!(matches!(err, EngineError::InvalidState { state: AssignmentState::InProgress, .. }));
        }
    }

    describe "assign_package" {
        it "places free hangers and skips held ones" {
            let a = fx.team("Crew A", 3, None);
            let b = fx.team("Crew B", 3, None);
            let h1 = fx.hanger("H-1", Some(4.0));
            let h2 = fx.hanger("H-2", Some(6.0));
            let h3 = fx.hanger("H-3", None);
            let package = fx.package(&[&h1, &h2, &h3]);
            fx.assign(&h2, &b, &package);

            let placement = block_on(fx.engine.assign_package(package.id, a.id)).expect("Package placement failed");

            assert_eq!(placement.assignments.len(), 2);
            assert_eq!(placement.skipped_hanger_ids, vec![h2.id]);
            assert_eq!(placement.projected_hours, 6.0);
            assert!(!placement.over_capacity_warning);
            assert_eq!(fx.engine.team_load(b.id).expect("Load failed").planned_hours, 6.0);
        }

        it "warns when the package overflows the team" {
            let team = fx.team("Crew A", 0, Some(5.0));
            let h1 = fx.hanger("H-1", Some(4.0));
            let h2 = fx.hanger("H-2", Some(4.0));
            let package = fx.package(&[&h1, &h2]);

            let placement = block_on(fx.engine.assign_package(package.id, team.id)).expect("Package placement failed");
            assert!(placement.over_capacity_warning);
            assert_eq!(placement.projected_hours, 8.0);
        }
    }

    describe "preview_placement" {
        it "projects the load without placing anything" {
            let team = fx.team("Crew A", 0, Some(10.0));
            let held = fx.hanger("H-0", Some(3.0));
            let h1 = fx.hanger("H-1", Some(4.0));
            let h2 = fx.hanger("H-2", Some(5.0));
            let other = fx.package(&[&held]);
            let package = fx.package(&[&h1, &h2]);
            fx.assign(&held, &team, &other);

            let preview = fx.engine.preview_placement(package.id, team.id).expect("Preview failed");

            assert_eq!(preview.planned_hours, 3.0);
            assert_eq!(preview.added_hours, 9.0);
            assert_eq!(preview.projected_hours, 12.0);
            assert_eq!(preview.placeable_hangers, 2);
            assert!(preview.would_exceed);
            assert!((preview.projected_utilization - 1.2).abs() < 1e-9);

            let filter = AssignmentFilter { package_id: Some(package.id), ..Default::default() };
            assert!(fx.engine.store().get_assignments(&filter).expect("Query failed").is_empty());
        }
    }

    describe "dashboard" {
        it "rolls up every team" {
            let a = fx.team("Crew A", 0, Some(10.0));
            let b = fx.team("Crew B", 0, Some(10.0));
            let h1 = fx.hanger("H-1", Some(12.0));
            let h2 = fx.hanger("H-2", Some(4.0));
            let h3 = fx.hanger("H-3", Some(1.0));
            let package = fx.package(&[&h1, &h2, &h3]);
            fx.assign(&h1, &a, &package);
            fx.assign(&h2, &b, &package);
            let done = fx.assign(&h3, &b, &package);
            fx.engine.advance_state(done.assignment.id, AssignmentState::InProgress).expect("Advance failed");
            fx.engine.advance_state(done.assignment.id, AssignmentState::Done).expect("Advance failed");

            let summary = fx.engine.dashboard().expect("Dashboard failed");

            assert_eq!(summary.total_capacity, 20.0);
            assert_eq!(summary.total_planned, 16.0);
            assert!((summary.average_utilization - 0.8).abs() < 1e-9);
            assert_eq!(summary.over_capacity_teams, vec![a.id]);
            assert_eq!(summary.teams.len(), 2);
            assert_eq!(summary.state_counts["assigned"], 2);
            assert_eq!(summary.state_counts["done"], 1);
            assert_eq!(summary.state_counts["queued"], 0);
        }

        it "is empty without teams" {
            let summary = fx.engine.dashboard().expect("Dashboard failed");
            assert_eq!(summary.total_capacity, 0.0);
            assert_eq!(summary.average_utilization, 0.0);
            assert!(summary.teams.is_empty());
        }
    }
}

mod shortages {
    use super::*;

    #[tokio::test]
    async fn records_a_reported_shortage() {
        let inventory = FlaggedShortages::new();
        let fx = Fixture::new(Arc::new(inventory.clone()));
        let team = fx.team("Crew A", 3, None);
        let short = fx.hanger("H-1", Some(2.0));
        let stocked = fx.hanger("H-2", Some(2.0));
        let package = fx.package(&[&short, &stocked]);
        inventory.flag(short.id);

        let outcome = fx.engine.assign(short.id, team.id, package.id).await.expect("Assign failed");
        assert!(outcome.assignment.shortage);
        let stored = fx.engine.store().get_assignment(outcome.assignment.id).expect("Query failed").expect("Missing");
        assert!(stored.shortage);

        let outcome = fx.engine.assign(stocked.id, team.id, package.id).await.expect("Assign failed");
        assert!(!outcome.assignment.shortage);

        assert_eq!(fx.engine.dashboard().expect("Dashboard failed").shortage_count, 1);
    }

    #[tokio::test]
    async fn package_placement_flags_each_hanger() {
        let inventory = FlaggedShortages::new();
        let fx = Fixture::new(Arc::new(inventory.clone()));
        let team = fx.team("Crew A", 3, None);
        let h1 = fx.hanger("H-1", None);
        let h2 = fx.hanger("H-2", None);
        let package = fx.package(&[&h1, &h2]);
        inventory.flag(h2.id);

        let placement = fx.engine.assign_package(package.id, team.id).await.expect("Placement failed");
        let flagged: Vec<Uuid> = placement
            .assignments
            .iter()
            .filter(|a| a.shortage)
            .map(|a| a.hanger_id)
            .collect();
        assert_eq!(flagged, vec![h2.id]);
    }

    #[tokio::test]
    async fn shortage_is_not_reported_for_a_withdrawn_assignment() {
        let inventory = Arc::new(CancellingInventory::default());
        let fx = Fixture::new(inventory.clone());
        let _ = inventory.engine.set(fx.engine.clone());
        let team = fx.team("Crew A", 3, None);
        let hanger = fx.hanger("H-1", None);
        let package = fx.package(&[&hanger]);

        let outcome = fx.engine.assign(hanger.id, team.id, package.id).await.expect("Assign failed");

        assert!(!outcome.assignment.shortage);
        assert!(fx.engine.store().get_assignment(outcome.assignment.id).expect("Query failed").is_none());
    }

    #[tokio::test]
    async fn failed_lookup_counts_as_no_shortage() {
        let fx = Fixture::new(Arc::new(FailingInventory));
        let team = fx.team("Crew A", 3, None);
        let hanger = fx.hanger("H-1", None);
        let package = fx.package(&[&hanger]);

        let outcome = fx.engine.assign(hanger.id, team.id, package.id).await.expect("Assign failed");
        assert!(!outcome.assignment.shortage);
    }

    #[tokio::test]
    async fn slow_lookup_times_out_as_no_shortage() {
        let fx = Fixture::new(Arc::new(SlowInventory));
        let team = fx.team("Crew A", 3, None);
        let hanger = fx.hanger("H-1", None);
        let package = fx.package(&[&hanger]);

        let started = std::time::Instant::now();
        let outcome = fx.engine.assign(hanger.id, team.id, package.id).await.expect("Assign failed");

        assert!(!outcome.assignment.shortage);
        assert!(started.elapsed() < Duration::from_secs(2));
        let stored = fx.engine.store().get_assignment(outcome.assignment.id).expect("Query failed").expect("Missing");
        assert!(!stored.shortage);
    }
}

mod configuration {
    use super::*;

    #[test]
    fn default_hanger_hours_follow_the_config() {
        let config = EngineConfig {
            default_hanger_hours: 3.5,
            ..Default::default()
        };
        let fx = Fixture::with_config(Arc::new(NoShortages), config);
        let team = fx.team("Crew A", 3, None);
        let hanger = fx.hanger("H-1", None);
        let package = fx.package(&[&hanger]);

        let outcome = fx.assign(&hanger, &team, &package);
        assert_eq!(outcome.projected_hours, 3.5);
    }
}
