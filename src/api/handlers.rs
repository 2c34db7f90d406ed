//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::path::PathBuf;
use std::sync::{Arc, MutexGuard};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PortfolioError, PortfolioResult};
use crate::excel::{ProcedureExporter, ProcedureRow, ProjectImporter};
use crate::portfolio::{
    filter_procedures, filter_projects, procedure_entries, procedure_stats, status_selection,
    summarize, PortfolioSummary, ProcedureFilter, ProcedureStats, ProjectFilter,
};
use crate::store::{JsonStore, ProjectStore};
use crate::types::{procedure_count, Project};

use super::server::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a library error
pub fn status_for(error: &PortfolioError) -> StatusCode {
    match error {
        PortfolioError::Validation(_) => StatusCode::BAD_REQUEST,
        PortfolioError::Import(_) | PortfolioError::EmptyImport => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

fn from_error(error: PortfolioError) -> Response {
    failure(status_for(&error), error.to_string())
}

fn respond<T: Serialize>(result: PortfolioResult<T>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse::ok(data)).into_response(),
        Err(e) => from_error(e),
    }
}

fn lock_store(state: &AppState) -> PortfolioResult<MutexGuard<'_, JsonStore>> {
    state
        .store
        .lock()
        .map_err(|_| PortfolioError::Store("Store lock poisoned".to_string()))
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Afpa Portfolio API Server".to_string(),
        version: state.version.clone(),
        description: "HTTP API for the Afpa procurement portfolio".to_string(),
        endpoints: vec![
            endpoint("GET", "/health", "Health check endpoint"),
            endpoint("GET", "/version", "Get server version"),
            endpoint("GET", "/api/v1/projects", "List projects (search, status, buyer)"),
            endpoint("GET", "/api/v1/projects/:id", "Get one project"),
            endpoint("PUT", "/api/v1/projects/:id", "Create or replace a project"),
            endpoint("GET", "/api/v1/procedures", "List procedures (search, type, buyer)"),
            endpoint("POST", "/api/v1/import", "Import an Excel workbook into the store"),
            endpoint("GET", "/api/v1/export", "Download the procedures workbook"),
            endpoint("GET", "/api/v1/summary", "Portfolio totals and breakdowns"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["projects", "procedures", "import", "export", "summary"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

/// `status` value listing every project
const ALL_STATUSES: &str = "*";

/// Project list query; `status` may be comma separated
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub buyer: Option<String>,
}

impl ProjectQuery {
    /// Comma-separated statuses; `*` keeps every status, no status hides
    /// finished and abandoned projects
    fn filter(self, projects: &[Project]) -> ProjectFilter {
        let requested = self.status.unwrap_or_default();
        let show_all = requested.trim() == ALL_STATUSES;
        let statuses = requested
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty() && part != ALL_STATUSES)
            .collect();

        ProjectFilter {
            search: self.search.unwrap_or_default(),
            statuses: status_selection(projects, statuses, show_all),
            buyer: self.buyer.filter(|b| !b.is_empty()),
        }
    }
}

/// GET /api/v1/projects - List projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> Response {
    let result = lock_store(&state).and_then(|store| store.fetch_all()).map(|all| {
        let filter = query.filter(&all);
        filter_projects(&all, &filter)
            .into_iter()
            .cloned()
            .collect::<Vec<Project>>()
    });
    respond(result)
}

/// GET /api/v1/projects/:id - One project
pub async fn get_project(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match lock_store(&state).and_then(|store| store.fetch(&id)) {
        Ok(Some(project)) => Json(ApiResponse::ok(project)).into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, format!("Project '{}' not found", id)),
        Err(e) => from_error(e),
    }
}

/// Upsert response
#[derive(Serialize, Default)]
pub struct SaveResponse {
    pub id: String,
    pub procedures: usize,
}

/// PUT /api/v1/projects/:id - Create or replace a project
pub async fn put_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut project): Json<Project>,
) -> Response {
    if project.id.is_empty() {
        project.id = id.clone();
    }
    if project.id != id {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("Body ID '{}' does not match path ID '{}'", project.id, id),
        );
    }
    project.assign_missing_procedure_ids();

    let result = lock_store(&state).and_then(|mut store| store.upsert(&project));
    respond(result.map(|id| SaveResponse {
        id,
        procedures: project.procedures.len(),
    }))
}

/// Procedure list query
#[derive(Debug, Default, Deserialize)]
pub struct ProcedureQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub procedure_type: Option<String>,
    pub buyer: Option<String>,
}

/// GET /api/v1/procedures - List procedures as report rows
pub async fn list_procedures(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProcedureQuery>,
) -> Response {
    let filter = ProcedureFilter {
        search: query.search.unwrap_or_default(),
        procedure_type: query.procedure_type.filter(|t| !t.is_empty()),
        buyer: query.buyer.filter(|b| !b.is_empty()),
    };
    let result = lock_store(&state).and_then(|store| store.fetch_all()).map(|all| {
        filter_procedures(&all, &filter)
            .into_iter()
            .map(|entry| ProcedureRow::new(entry.project, entry.procedure))
            .collect::<Vec<ProcedureRow>>()
    });
    respond(result)
}

/// Import request
#[derive(Deserialize)]
pub struct ImportRequest {
    pub excel_path: String,
    #[serde(default)]
    pub replace: bool,
}

/// Import response
#[derive(Serialize, Default)]
pub struct ImportResponse {
    pub imported: bool,
    pub excel_path: String,
    pub projects: usize,
    pub procedures: usize,
}

/// POST /api/v1/import - Import an Excel workbook into the store
pub async fn import_excel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Response {
    let path = PathBuf::from(&req.excel_path);
    let result = ProjectImporter::new(&path).import().and_then(|projects| {
        let mut store = lock_store(&state)?;
        if req.replace {
            store.clear()?;
        }
        let saved = store.bulk_upsert(&projects)?;
        Ok(ImportResponse {
            imported: true,
            excel_path: req.excel_path.clone(),
            projects: saved,
            procedures: procedure_count(&projects),
        })
    });
    respond(result)
}

/// GET /api/v1/export - Download the procedures workbook
pub async fn export(State(state): State<Arc<AppState>>) -> Response {
    let result = lock_store(&state)
        .and_then(|store| store.fetch_all())
        .and_then(|projects| ProcedureExporter::new(&projects).to_buffer());

    match result {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", state.config.export_file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => from_error(e),
    }
}

/// Summary response
#[derive(Serialize)]
pub struct SummaryResponse {
    pub portfolio: PortfolioSummary,
    pub procedures: ProcedureStats,
}

/// GET /api/v1/summary - Portfolio totals and breakdowns
pub async fn summary(State(state): State<Arc<AppState>>) -> Response {
    let result = lock_store(&state).and_then(|store| store.fetch_all()).map(|all| {
        let entries = procedure_entries(&all);
        SummaryResponse {
            portfolio: summarize(&all),
            procedures: procedure_stats(&entries),
        }
    });
    respond(result)
}
