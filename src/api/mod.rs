use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::db::BlobStore;
use crate::error::AppError;
use crate::models::{BlobEntry, SaveVersionRequest, VersionMeta};
use crate::services::{
    ApplyStats, ConflictReport, ConflictService, ExportService, ExportStats, ImportService,
    ImportStats, PreflightReport, SOLVER_RESULTS_FILE, VersionService, preflight,
};
use crate::state::AppState;

#[derive(Deserialize)]
struct FileQueryParams {
    file: Option<String>,
}

#[derive(Serialize)]
struct SaveFileResponse {
    filename: String,
    bytes: usize,
    /// Import stats when the filename is one of the relational documents;
    /// other files are stored and materialized only.
    imported: Option<ImportStats>,
}

#[derive(Serialize)]
struct RestoreResponse {
    restored: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync/export", post(run_export))
        .route("/sync/import", post(run_import))
        .route("/sync/results", post(apply_results))
        .route("/conflicts", get(check_conflicts))
        .route("/preflight", get(run_preflight))
        .route("/files", get(list_files))
        .route("/files/{filename}", get(get_file).put(save_file))
        .route("/versions", get(list_versions).post(save_version))
        .route("/versions/{id}/restore", post(restore_version))
        .route("/versions/{id}/artifact", get(download_artifact))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn run_export(State(state): State<AppState>) -> Result<Json<ExportStats>, AppError> {
    let service = ExportService::new(state.db.clone(), state.data_dir.clone());
    let stats = service.export_all().await?;
    Ok(Json(stats))
}

async fn run_import(State(state): State<AppState>) -> Result<Json<ImportStats>, AppError> {
    let service = ImportService::new(state.db.clone(), state.import_lock.clone());
    let stats = service.import_all().await?;
    Ok(Json(stats))
}

async fn apply_results(
    State(state): State<AppState>,
    Query(params): Query<FileQueryParams>,
) -> Result<Json<ApplyStats>, AppError> {
    let filename = params.file.as_deref().unwrap_or(SOLVER_RESULTS_FILE);
    let service = ImportService::new(state.db.clone(), state.import_lock.clone());
    let stats = service.apply_solver_results(filename).await?;
    Ok(Json(stats))
}

async fn check_conflicts(
    State(state): State<AppState>,
    Query(params): Query<FileQueryParams>,
) -> Result<Json<ConflictReport>, AppError> {
    let filename = params.file.as_deref().unwrap_or(SOLVER_RESULTS_FILE);
    let service = ConflictService::new(state.db.clone());
    let report = service.check(filename).await?;
    Ok(Json(report))
}

async fn run_preflight(State(state): State<AppState>) -> Result<Json<PreflightReport>, AppError> {
    let report = preflight::run(&state.db).await?;
    Ok(Json(report))
}

async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<BlobEntry>>, AppError> {
    let blobs = BlobStore::new(state.db.clone());
    Ok(Json(blobs.list().await?))
}

async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let blobs = BlobStore::new(state.db.clone());
    let content = blobs.get(&filename).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], content))
}

/// Stores an uploaded document, mirrors it to the data directory and,
/// when it is one of the relational documents, syncs its table at once.
async fn save_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<Json<SaveFileResponse>, AppError> {
    let blobs = BlobStore::new(state.db.clone());
    blobs.put(&filename, &body).await?;
    tokio::fs::write(state.data_dir.join(&filename), &body).await?;

    let service = ImportService::new(state.db.clone(), state.import_lock.clone());
    let imported = service.import_table(&filename).await?;

    Ok(Json(SaveFileResponse {
        filename,
        bytes: body.len(),
        imported,
    }))
}

async fn list_versions(State(state): State<AppState>) -> Result<Json<Vec<VersionMeta>>, AppError> {
    let service = VersionService::new(state.db.clone(), state.renderer.clone(), state.data_dir.clone());
    Ok(Json(service.list().await?))
}

async fn save_version(
    State(state): State<AppState>,
    Json(req): Json<SaveVersionRequest>,
) -> Result<Json<VersionMeta>, AppError> {
    let service = VersionService::new(state.db.clone(), state.renderer.clone(), state.data_dir.clone());
    let meta = service
        .save(&req.name, &req.description, req.created_by.as_deref())
        .await?;
    Ok(Json(meta))
}

async fn restore_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RestoreResponse>, AppError> {
    let service = VersionService::new(state.db.clone(), state.renderer.clone(), state.data_dir.clone());
    service.restore(&id).await?;
    Ok(Json(RestoreResponse { restored: id }))
}

async fn download_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = VersionService::new(state.db.clone(), state.renderer.clone(), state.data_dir.clone());
    let (name, bytes) = service.artifact(&id).await?;

    let attachment = format!("attachment; filename=\"{}.pdf\"", attachment_name(&name));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment),
        ],
        bytes,
    ))
}

/// Keeps the download filename header-safe.
fn attachment_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
