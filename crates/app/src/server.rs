use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use pdf_reports_core::{Document, FetchError, Folder, FolderIndexer, IndexError, ScanRequest, SearchResult};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub type SharedIndexer = Arc<FolderIndexer>;

pub fn router(indexer: SharedIndexer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/", get(banner))
        .route("/api/folders", get(list_folders))
        .route("/api/search", get(search))
        .route("/api/pdf/:folder/:filename", get(fetch_pdf))
        .route("/api/pdf-info/:folder/:filename", get(pdf_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(indexer)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    cutoff: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    cutoff: Option<String>,
}

/// Query parameters become a validated `ScanRequest` before the core is
/// involved; a malformed cutoff is a 400, never a silent default.
fn parse_request(query: Option<String>, cutoff: Option<&str>) -> Result<ScanRequest, ApiError> {
    let cutoff = match cutoff {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| ApiError::BadRequest("invalid cutoff datetime format".to_string()))?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    Ok(ScanRequest { query, cutoff })
}

async fn banner() -> Json<serde_json::Value> {
    Json(json!({ "message": "PDF Reports Management API" }))
}

async fn list_folders(
    State(indexer): State<SharedIndexer>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Folder>>, ApiError> {
    let request = parse_request(None, params.cutoff.as_deref())?;
    let folders = blocking(move || indexer.list_folders(request.cutoff)).await??;
    Ok(Json(folders))
}

async fn search(
    State(indexer): State<SharedIndexer>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let request = parse_request(params.q, params.cutoff.as_deref())?;
    let results = blocking(move || {
        let query = request.query.unwrap_or_default();
        indexer.search(&query, request.cutoff)
    })
    .await??;
    Ok(Json(results))
}

async fn fetch_pdf(
    State(indexer): State<SharedIndexer>,
    Path((folder, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = blocking({
        let folder = folder.clone();
        let filename = filename.clone();
        move || indexer.fetch_document_bytes(&folder, &filename)
    })
    .await??;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn pdf_info(
    State(indexer): State<SharedIndexer>,
    Path((folder, filename)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    let document = blocking(move || indexer.document_info(&folder, &filename)).await??;
    Ok(Json(document))
}

/// Scanning is blocking filesystem work; keep it off the async workers.
async fn blocking<T: Send + 'static>(
    work: impl FnOnce() -> T + Send + 'static,
) -> Result<T, ApiError> {
    tokio::task::spawn_blocking(work).await.map_err(|join_error| {
        error!(%join_error, "blocking task failed");
        ApiError::Internal
    })
}

enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl From<IndexError> for ApiError {
    fn from(error: IndexError) -> Self {
        error!(%error, "scan failed");
        ApiError::Internal
    }
}

impl From<FetchError> for ApiError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NotFound { .. } | FetchError::NotPdf { .. } => {
                ApiError::NotFound(error.to_string())
            }
            // Surfaced as not-found, never resolved.
            FetchError::TraversalRejected { .. } => {
                warn!(%error, "traversal attempt rejected");
                ApiError::NotFound("document not found".to_string())
            }
            FetchError::Io(source) => {
                error!(error = %source, "serving document failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
