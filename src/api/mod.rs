mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::AssignmentEngine;

pub fn create_router(engine: AssignmentEngine) -> Router {
    let api = Router::new()
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        // Teams
        .route("/teams", get(handlers::list_teams).post(handlers::create_team))
        .route(
            "/teams/{id}",
            get(handlers::get_team)
                .put(handlers::update_team)
                .delete(handlers::delete_team),
        )
        .route("/teams/{id}/load", get(handlers::get_team_load))
        .route("/teams/{id}/assignments", get(handlers::list_team_assignments))
        // Hangers
        .route(
            "/hangers",
            get(handlers::list_hangers).post(handlers::create_hanger),
        )
        .route("/hangers/{id}", get(handlers::get_hanger))
        .route("/hangers/{id}/actual-hours", put(handlers::record_actual_hours))
        // Packages
        .route(
            "/packages",
            get(handlers::list_packages).post(handlers::create_package),
        )
        .route(
            "/packages/{id}",
            get(handlers::get_package).put(handlers::update_package),
        )
        .route("/packages/{id}/assign", post(handlers::assign_package))
        .route("/packages/{id}/preview", get(handlers::preview_placement))
        // Assignments
        .route(
            "/assignments",
            get(handlers::list_assignments).post(handlers::create_assignment),
        )
        .route(
            "/assignments/{id}",
            get(handlers::get_assignment).delete(handlers::cancel_assignment),
        )
        .route("/assignments/{id}/move", post(handlers::move_assignment))
        .route("/assignments/{id}/advance", post(handlers::advance_assignment))
        // Dashboard
        .route("/dashboard", get(handlers::get_dashboard))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(engine)
}
