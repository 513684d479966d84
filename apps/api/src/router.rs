use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use documentation_cell::router::documentation_routes;
use patient_cell::router::patient_routes;
use time_block_cell::router::time_block_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Carebook API is running!" }))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/time-blocks", time_block_routes(state.clone()))
        .nest("/documentation", documentation_routes(state.clone()))
}
