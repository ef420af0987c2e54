use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Clinic-wide opening hours (one row per weekday)
        .route("/hours", get(handlers::list_clinic_hours))
        .route("/hours", post(handlers::create_clinic_hours))
        .route("/hours/{hours_id}", put(handlers::update_clinic_hours))
        .route("/hours/{hours_id}", delete(handlers::delete_clinic_hours))
        // Per-veterinarian weekly availability
        .route("/schedules", post(handlers::create_vet_schedule))
        .route("/schedules/vets/{vet_id}", get(handlers::list_vet_schedules))
        .route("/schedules/{schedule_id}", put(handlers::update_vet_schedule))
        .route("/schedules/{schedule_id}", delete(handlers::delete_vet_schedule))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
