/// API routes and handlers
pub mod attendance;
pub mod auth;
pub mod courses;
pub mod resources;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(courses::routes())
        .merge(attendance::routes())
        .merge(resources::routes())
}
