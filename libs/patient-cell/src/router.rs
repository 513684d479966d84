use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn patient_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_patient))
        .route("/search", get(handlers::search_patients))
        .route("/{patient_id}", get(handlers::get_patient))
        .route("/{patient_id}", put(handlers::update_patient))
        .route("/{patient_id}", delete(handlers::delete_patient))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
