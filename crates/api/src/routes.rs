//! Router for the counter API.

use axum::routing::get;
use axum::Router;

use crate::handlers::{counter_status, get_counter, increment_counter, AppState};

/// Build the application router.
///
/// The counter routes are served both under `/api` and at the root.
pub fn router(state: AppState) -> Router {
    let counter_routes = Router::new()
        .route("/counter", get(get_counter).post(increment_counter))
        .route("/counter/status", get(counter_status));

    Router::new()
        .nest("/api", counter_routes.clone())
        .merge(counter_routes)
        .with_state(state)
}
