pub mod admin;
pub mod auth;
pub mod health;
pub mod pages;
pub mod sitemap;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(pages::routes())
        .merge(sitemap::routes())
        .merge(auth::routes())
        .merge(admin::routes())
        .fallback(pages::not_found)
        .with_state(state)
}
