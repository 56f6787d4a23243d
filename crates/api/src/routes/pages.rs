//! Public pages. Every page renders, whatever state the content store is in.

use advisory_site_core::content::services::{find_service, SERVICES};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tera::Context;

use crate::error::ApiResult;
use crate::pages::{Page, PLACEHOLDER_IMAGE_PATH, PLACEHOLDER_IMAGE_SVG};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/services", get(services))
        .route("/services/{slug}", get(service_detail))
        .route("/insights", get(insights))
        .route("/contact", get(contact))
        .route(PLACEHOLDER_IMAGE_PATH, get(placeholder_image))
}

async fn render(state: &AppState, page: Page, extra: Context) -> ApiResult<Html<String>> {
    let content = state.site().site_content().await;
    Ok(Html(state.pages().render_page(page, &content, extra)?))
}

async fn home(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let insights = state.site().active_insights().await;
    let mut extra = Context::new();
    extra.insert("services", SERVICES);
    extra.insert("insights", insights.as_slice());
    render(&state, Page::Home, extra).await
}

async fn about(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render(&state, Page::About, Context::new()).await
}

async fn services(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let mut extra = Context::new();
    extra.insert("services", SERVICES);
    render(&state, Page::Services, extra).await
}

async fn service_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Response> {
    let Some(service) = find_service(&slug) else {
        return not_found(State(state)).await;
    };
    let mut extra = Context::new();
    extra.insert("service", service);
    Ok(render(&state, Page::ServiceDetail, extra).await?.into_response())
}

async fn insights(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let insights = state.site().active_insights().await;
    let mut extra = Context::new();
    extra.insert("insights", insights.as_slice());
    render(&state, Page::Insights, extra).await
}

async fn contact(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render(&state, Page::Contact, Context::new()).await
}

async fn placeholder_image() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        PLACEHOLDER_IMAGE_SVG,
    )
}

/// Fallback for unknown paths.
pub async fn not_found(State(state): State<AppState>) -> ApiResult<Response> {
    let html = render(&state, Page::NotFound, Context::new()).await?;
    Ok((StatusCode::NOT_FOUND, html).into_response())
}
