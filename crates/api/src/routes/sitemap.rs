use advisory_site_core::sitemap::build_sitemap;
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use chrono::Utc;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/sitemap.xml", get(sitemap))
}

async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let xml = build_sitemap(&state.config().site_url, Utc::now().date_naive());
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml)
}
