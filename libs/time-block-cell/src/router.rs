use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn time_block_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_time_block))
        .route("/", get(handlers::list_time_blocks))
        .route("/{block_id}", get(handlers::get_time_block))
        .route("/{block_id}", put(handlers::update_time_block))
        .route("/{block_id}", delete(handlers::delete_time_block))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
