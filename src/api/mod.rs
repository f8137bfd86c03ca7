/// API routes and handlers
pub mod admin;
pub mod health;
pub mod quiz;
pub mod reactions;
pub mod voices;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(voices::routes())
        .merge(reactions::routes())
        .merge(quiz::routes())
        .merge(admin::routes())
}
