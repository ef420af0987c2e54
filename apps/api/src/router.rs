use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use clinic_cell::router::clinic_routes;
use medical_record_cell::router::medical_record_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "VetDesk API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/clinic", clinic_routes(state.clone()))
        .nest("/medical-records", medical_record_routes(state))
}
