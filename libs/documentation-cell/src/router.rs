use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn documentation_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Note templates
        .route("/templates", post(handlers::create_template))
        .route("/templates", get(handlers::list_templates))
        .route("/templates/{template_id}", get(handlers::get_template))
        .route("/templates/{template_id}", put(handlers::update_template))
        .route("/templates/{template_id}", delete(handlers::delete_template))

        // Transcripts
        .route("/transcripts", post(handlers::create_transcript))
        .route("/transcripts", get(handlers::list_transcripts))
        .route("/transcripts/{transcript_id}", get(handlers::get_transcript))
        .route("/transcripts/{transcript_id}", put(handlers::update_transcript))
        .route("/transcripts/{transcript_id}", delete(handlers::delete_transcript))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
