//! Admin dashboard and its JSON API. Every handler requires a session.

use advisory_site_core::admin::types::{
    ContentRow, ContentUpdate, DocumentDeletion, DocumentListing, InsightInput, Upload,
};
use advisory_site_core::content::model::{ContentEntry, Insight, UploadedDocument};
use advisory_site_core::content::validate::{ValidationErrors, MAX_DOCUMENT_BYTES};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::session::AdminSession;
use crate::state::AppState;

/// Request bodies may carry a full-size document plus form overhead.
const BODY_LIMIT: usize = MAX_DOCUMENT_BYTES + 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/api/content", get(list_content))
        .route("/admin/api/content/{section}", put(save_content))
        .route(
            "/admin/api/documents",
            get(list_documents).post(upload_document),
        )
        .route("/admin/api/documents/{name}", delete(delete_document))
        .route("/admin/api/insights", get(list_insights).post(create_insight))
        .route(
            "/admin/api/insights/{id}",
            put(update_insight).delete(delete_insight),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

#[derive(Serialize)]
struct DashboardView<'a> {
    actor: &'a str,
    rows: Vec<ContentRow>,
    documents: Vec<DocumentListing>,
    insights: Vec<Insight>,
}

async fn dashboard(session: AdminSession, State(state): State<AppState>) -> ApiResult<Html<String>> {
    let admin = state.admin();
    let (rows, documents, insights) = tokio::try_join!(
        admin.list_content(),
        admin.list_documents(),
        admin.list_insights(),
    )?;
    let view = DashboardView {
        actor: session.actor(),
        rows,
        documents,
        insights,
    };
    Ok(Html(state.pages().render_dashboard(&view)?))
}

async fn list_content(
    _session: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ContentRow>>> {
    Ok(Json(state.admin().list_content().await?))
}

async fn save_content(
    session: AdminSession,
    State(state): State<AppState>,
    Path(section): Path<String>,
    Json(update): Json<ContentUpdate>,
) -> ApiResult<Json<ContentEntry>> {
    let entry = state
        .admin()
        .save_content(session.actor(), &section, &update.text)
        .await?;
    Ok(Json(entry))
}

async fn list_documents(
    _session: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<DocumentListing>>> {
    Ok(Json(state.admin().list_documents().await?))
}

async fn upload_document(
    session: AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadedDocument>)> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
            upload = Some(Upload {
                filename,
                content_type,
                bytes,
            });
        }
    }
    let upload = upload.ok_or_else(|| ValidationErrors::single("file", "Choose a file to upload"))?;

    let document = state.admin().upload_document(session.actor(), upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn delete_document(
    session: AdminSession,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<DocumentDeletion>> {
    let deletion = state.admin().delete_document(session.actor(), &name).await?;
    Ok(Json(deletion))
}

async fn list_insights(
    _session: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Insight>>> {
    Ok(Json(state.admin().list_insights().await?))
}

async fn create_insight(
    session: AdminSession,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Insight>)> {
    let (input, image) = read_insight_form(multipart).await?;
    let insight = state
        .admin()
        .create_insight(session.actor(), input, image)
        .await?;
    Ok((StatusCode::CREATED, Json(insight)))
}

async fn update_insight(
    session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<Insight>> {
    let (input, image) = read_insight_form(multipart).await?;
    let insight = state
        .admin()
        .update_insight(session.actor(), id, input, image)
        .await?;
    Ok(Json(insight))
}

async fn delete_insight(
    session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.admin().delete_insight(session.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ValidationErrors::single("file", "File is too large").into();
    }
    ApiError::BadRequest(format!("Multipart error: {err}"))
}

fn checkbox(value: &str) -> bool {
    matches!(value.trim(), "true" | "on" | "1" | "yes")
}

/// Insight fields plus an optional `image` file from a multipart form.
async fn read_insight_form(mut multipart: Multipart) -> ApiResult<(InsightInput, Option<Upload>)> {
    let mut input = InsightInput::default();
    let mut image = None;
    let mut errors = ValidationErrors::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
            // Browsers send an empty part when no file was chosen.
            if !filename.is_empty() || !bytes.is_empty() {
                image = Some(Upload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => input.title = value,
            "description" => input.description = value,
            "image_url" => input.image_url = Some(value),
            "document_filename" => input.document_filename = Some(value),
            "document_url" => input.document_url = Some(value),
            "display_order" => match value.trim().parse() {
                Ok(order) => input.display_order = order,
                Err(_) => errors.push("display_order", "Display order must be a whole number"),
            },
            "is_active" => input.is_active = checkbox(&value),
            _ => {}
        }
    }

    errors.into_result()?;
    Ok((input, image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        assert!(checkbox("on"));
        assert!(checkbox("true"));
        assert!(!checkbox("false"));
        assert!(!checkbox(""));
    }
}
