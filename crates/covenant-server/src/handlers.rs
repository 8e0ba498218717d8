//! HTTP request handlers.
//!
//! Document upload and extraction, stored obligation management, and issue
//! filing and management, using axum. The store is locked per operation and
//! never held across an await.

use covenant_documents::{try_extract_pages, DocumentError, DocumentKind};
use covenant_domain::traits::{LlmProvider, ObligationStore};
use covenant_domain::{
    Issue, IssueUpdate, Obligation, ObligationId, ObligationPage, ObligationQuery,
    ObligationSet, ObligationUpdate, Pagination,
};
use covenant_extractor::{ExtractionMetadata, Extractor, ExtractorError};
use covenant_store::{SqliteStore, StoreError};
use covenant_tracker::{IssueFiling, ObligationIssueService, TrackerError, TrackerRegistry};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

/// Largest accepted upload (25 MiB)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Largest accepted page size for paginated listings
pub const MAX_PAGE_SIZE: usize = 100;

/// Shared application state
pub struct AppState<L: LlmProvider> {
    /// Extraction pipeline
    pub extractor: Arc<Extractor<L>>,
    /// Obligation store
    pub store: Arc<Mutex<SqliteStore>>,
    /// Issue tracker backends
    pub trackers: Arc<TrackerRegistry>,
}

impl<L: LlmProvider> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            store: Arc::clone(&self.store),
            trackers: Arc::clone(&self.trackers),
        }
    }
}

impl<L: LlmProvider + 'static> AppState<L> {
    /// Assemble state from its parts
    pub fn new(extractor: Extractor<L>, store: SqliteStore, trackers: TrackerRegistry) -> Self {
        Self {
            extractor: Arc::new(extractor),
            store: Arc::new(Mutex::new(store)),
            trackers: Arc::new(trackers),
        }
    }

    fn store(&self) -> MutexGuard<'_, SqliteStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed or unsupported request
    BadRequest(String),
    /// Resource does not exist
    NotFound(String),
    /// Request conflicts with the resource's state
    Conflict(String),
    /// Document could not be read
    Unprocessable(String),
    /// Extraction run failed
    Extraction(ExtractorError),
    /// Database failure
    Store(StoreError),
    /// Issue tracker failure
    Tracker(TrackerError),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Extraction(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Tracker(e @ TrackerError::Unsupported { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Tracker(e @ TrackerError::Config(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Tracker(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<ExtractorError> for AppError {
    fn from(e: ExtractorError) -> Self {
        AppError::Extraction(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<TrackerError> for AppError {
    fn from(e: TrackerError) -> Self {
        AppError::Tracker(e)
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::Unsupported(_) => AppError::BadRequest(e.to_string()),
            DocumentError::Pdf(_) | DocumentError::Docx(_) => AppError::Unprocessable(e.to_string()),
        }
    }
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

fn check_paging(page: usize, page_size: usize) -> Result<(), AppError> {
    if page == 0 {
        return Err(AppError::BadRequest("page must be at least 1".to_string()));
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<ObligationId, AppError> {
    ObligationId::from_string(raw).map_err(AppError::BadRequest)
}

fn obligation_not_found(id: ObligationId) -> AppError {
    AppError::NotFound(format!("Obligation with ID {} not found", id))
}

/// Query of `POST /upload-document`
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Original file name, recorded as the source document
    pub filename: Option<String>,
    /// Page of the merged result to return
    #[serde(default = "default_page")]
    pub page: usize,
    /// Parties per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Response of `POST /upload-document`
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Original file name
    pub filename: Option<String>,
    /// Chunks the document was split into
    pub total_chunks: usize,
    /// Obligations in the merged result
    pub total_obligations: usize,
    /// Records written to the store
    pub stored: usize,
    /// Page returned
    pub current_page: usize,
    /// Total pages of parties
    pub total_pages: usize,
    /// Parties per page
    pub page_size: usize,
    /// This page of the merged result
    pub obligations: ObligationSet,
    /// Navigation flags
    pub pagination: Pagination,
    /// Run statistics
    pub metadata: ExtractionMetadata,
}

/// Query naming the issue tracker backend
#[derive(Debug, Default, Deserialize)]
pub struct ToolParams {
    /// Backend name; the configured default when absent
    pub project_tool: Option<String>,
}

/// Query of `GET /obligations`
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Page number, 1-indexed
    #[serde(default = "default_page")]
    pub page: usize,
    /// Items per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Case-insensitive party filter
    pub party_name: Option<String>,
}

/// Response of `POST /create-issues`
#[derive(Debug, Serialize)]
pub struct CreateIssuesResponse {
    /// Summary line
    pub message: String,
    /// Backend the issues went to
    pub backend: String,
    /// Issues created
    pub success_count: usize,
    /// Obligations that could not be filed
    pub failed_count: usize,
    /// One entry per obligation
    pub results: Vec<IssueFiling>,
}

/// Response of `POST /obligations/{id}/issue`
#[derive(Debug, Serialize, Deserialize)]
pub struct FileIssueResponse {
    /// Obligation the issue belongs to
    pub obligation_id: ObligationId,
    /// False when the obligation already had an issue
    pub created: bool,
    /// Key of the issue
    pub issue_id: String,
    /// The new issue
    pub issue: Option<Issue>,
}

/// Response of `GET /issues`
#[derive(Debug, Serialize, Deserialize)]
pub struct IssueListResponse {
    /// Backend that answered
    pub backend: String,
    /// Issues; empty when the backend cannot list
    pub issues: Vec<Issue>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Model serving extractions
    pub model: String,
    /// Obligations currently stored
    pub stored_obligations: usize,
}

/// POST /upload-document - Extract obligations from a PDF or DOCX
///
/// The body is the raw document; `Content-Type` picks the reader.
async fn upload_document<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    check_paging(params.page, params.page_size)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if DocumentKind::from_content_type(&content_type).is_none() {
        return Err(AppError::BadRequest(format!(
            "Only PDF and DOCX files are supported. Got: {}",
            content_type
        )));
    }

    info!(
        filename = params.filename.as_deref().unwrap_or("<unnamed>"),
        bytes = body.len(),
        %content_type,
        "Received document"
    );

    // Reader panics on malformed files map to 422
    let pages = tokio::task::spawn_blocking(move || try_extract_pages(&body, &content_type))
        .await
        .map_err(|e| {
            if e.is_panic() {
                AppError::Unprocessable("Document reader could not parse the file".to_string())
            } else {
                AppError::Internal(format!("Document reader failed: {}", e))
            }
        })??;

    let output = state.extractor.extract_pages(&pages).await?;
    let stored = state
        .store()
        .store_results(&output.results, params.filename.as_deref())?;

    let merged = output.merged().cloned().unwrap_or_default();
    let total_pages = Pagination::total_pages(merged.parties.len(), params.page_size);
    let page = params.page.min(total_pages);
    let parties = merged
        .parties
        .into_iter()
        .skip((page - 1) * params.page_size)
        .take(params.page_size)
        .collect();

    Ok(Json(UploadResponse {
        filename: params.filename,
        total_chunks: output.metadata.total_chunks,
        total_obligations: output.metadata.total_obligations,
        stored: stored.len(),
        current_page: page,
        total_pages,
        page_size: params.page_size,
        obligations: ObligationSet::new(parties),
        pagination: Pagination::new(page, total_pages),
        metadata: output.metadata,
    }))
}

/// POST /create-issues - File every obligation of extraction results
async fn create_issues<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Query(tool): Query<ToolParams>,
    Json(results): Json<Vec<ObligationSet>>,
) -> Result<Json<CreateIssuesResponse>, AppError> {
    let handle = state.trackers.resolve(tool.project_tool.as_deref())?;
    let service = ObligationIssueService::new(handle);
    let filings = service.file_all(&results).await;

    let success_count = filings.iter().filter(|f| f.outcome.is_created()).count();
    Ok(Json(CreateIssuesResponse {
        message: format!(
            "Created {} issues in the project management tool",
            success_count
        ),
        backend: service.backend().to_string(),
        success_count,
        failed_count: filings.len() - success_count,
        results: filings,
    }))
}

/// GET /obligations - List stored obligations
async fn list_obligations<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ObligationPage>, AppError> {
    check_paging(params.page, params.page_size)?;
    let query = ObligationQuery {
        page: params.page,
        page_size: params.page_size,
        party_name: params.party_name.filter(|p| !p.trim().is_empty()),
    };
    Ok(Json(state.store().list(&query)?))
}

/// GET /obligations/{id}
async fn get_obligation<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Obligation>, AppError> {
    let id = parse_id(&raw_id)?;
    let obligation = state.store().get(id)?;
    obligation.map(Json).ok_or_else(|| obligation_not_found(id))
}

/// PUT /obligations/{id} - Partial update
///
/// The text of an obligation that already has an issue cannot change.
async fn update_obligation<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(raw_id): Path<String>,
    Json(update): Json<ObligationUpdate>,
) -> Result<Json<Obligation>, AppError> {
    let id = parse_id(&raw_id)?;
    if update.is_empty() {
        return Err(AppError::BadRequest("No update data provided".to_string()));
    }

    let mut store = state.store();
    let current = store.get(id)?.ok_or_else(|| obligation_not_found(id))?;
    let text_changes = update
        .obligation_text
        .as_ref()
        .is_some_and(|text| *text != current.obligation_text);
    if current.issue_id.is_some() && text_changes {
        return Err(AppError::Conflict(
            "Cannot modify obligation text after an issue has been created".to_string(),
        ));
    }

    let updated = store
        .update(id, &update)?
        .ok_or_else(|| obligation_not_found(id))?;
    info!(%id, "Updated obligation");
    Ok(Json(updated))
}

/// DELETE /obligations/{id}
async fn delete_obligation<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&raw_id)?;
    if state.store().delete(id)? {
        info!(%id, "Deleted obligation");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(obligation_not_found(id))
    }
}

/// POST /obligations/{id}/issue - File one stored obligation
///
/// An obligation that already has an issue is returned as is.
async fn file_obligation_issue<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(raw_id): Path<String>,
    Query(tool): Query<ToolParams>,
) -> Result<(StatusCode, Json<FileIssueResponse>), AppError> {
    let id = parse_id(&raw_id)?;
    let record = state.store().get(id)?.ok_or_else(|| obligation_not_found(id))?;

    if let Some(existing) = record.issue_id.clone() {
        return Ok((
            StatusCode::OK,
            Json(FileIssueResponse {
                obligation_id: id,
                created: false,
                issue_id: existing,
                issue: None,
            }),
        ));
    }

    let handle = state.trackers.resolve(tool.project_tool.as_deref())?;
    let issue = ObligationIssueService::new(handle)
        .file_record(&record)
        .await?;
    state.store().set_issue_id(id, &issue.key)?;
    info!(%id, key = %issue.key, "Filed issue for obligation");

    Ok((
        StatusCode::CREATED,
        Json(FileIssueResponse {
            obligation_id: id,
            created: true,
            issue_id: issue.key.clone(),
            issue: Some(issue),
        }),
    ))
}

/// GET /issues - List issues of a backend that supports listing
async fn list_issues<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Query(tool): Query<ToolParams>,
) -> Result<Json<IssueListResponse>, AppError> {
    let handle = state.trackers.resolve(tool.project_tool.as_deref())?;
    let issues = match handle.search() {
        Some(search) => search.list_issues().await?,
        None => {
            warn!(backend = handle.name(), "Backend cannot list issues");
            Vec::new()
        }
    };
    Ok(Json(IssueListResponse {
        backend: handle.name().to_string(),
        issues,
    }))
}

/// GET /issues/{id}
async fn get_issue<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(issue_id): Path<String>,
    Query(tool): Query<ToolParams>,
) -> Result<Json<Issue>, AppError> {
    let handle = state.trackers.resolve(tool.project_tool.as_deref())?;
    handle
        .tracker()
        .get_issue(&issue_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", issue_id)))
}

/// PUT /issues/{id} - Partial update, including a status transition
async fn update_issue<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(issue_id): Path<String>,
    Query(tool): Query<ToolParams>,
    Json(update): Json<IssueUpdate>,
) -> Result<Json<Issue>, AppError> {
    if update.is_empty() {
        return Err(AppError::BadRequest("No update data provided".to_string()));
    }
    let handle = state.trackers.resolve(tool.project_tool.as_deref())?;
    handle
        .tracker()
        .update_issue(&issue_id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", issue_id)))
}

/// DELETE /issues/{id}
async fn delete_issue<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
    Path(issue_id): Path<String>,
    Query(tool): Query<ToolParams>,
) -> Result<StatusCode, AppError> {
    let handle = state.trackers.resolve(tool.project_tool.as_deref())?;
    if handle.tracker().delete_issue(&issue_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Issue {} not found", issue_id)))
    }
}

/// GET /health
async fn health_check<L: LlmProvider + 'static>(
    State(state): State<AppState<L>>,
) -> Result<Json<HealthCheckResponse>, AppError> {
    let stored_obligations = state.store().count()?;
    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        model: state.extractor.model_name().to_string(),
        stored_obligations,
    }))
}

/// Create the axum router with all routes
pub fn create_router<L: LlmProvider + 'static>(state: AppState<L>) -> AxumRouter {
    AxumRouter::new()
        .route("/upload-document", post(upload_document::<L>))
        .route("/create-issues", post(create_issues::<L>))
        .route("/obligations", get(list_obligations::<L>))
        .route(
            "/obligations/:id",
            get(get_obligation::<L>)
                .put(update_obligation::<L>)
                .delete(delete_obligation::<L>),
        )
        .route("/obligations/:id/issue", post(file_obligation_issue::<L>))
        .route("/issues", get(list_issues::<L>))
        .route(
            "/issues/:id",
            get(get_issue::<L>)
                .put(update_issue::<L>)
                .delete(delete_issue::<L>),
        )
        .route("/health", get(health_check::<L>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_extractor::ExtractorConfig;
    use covenant_llm::MockProvider;
    use covenant_tracker::TrackerConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt; // for oneshot

    fn create_test_state() -> AppState<MockProvider> {
        AppState::new(
            Extractor::new(MockProvider::new("null"), ExtractorConfig::default().without_delays()),
            SqliteStore::open(":memory:").unwrap(),
            TrackerRegistry::new(TrackerConfig::default()),
        )
    }

    #[test]
    fn test_check_paging() {
        assert!(check_paging(1, 10).is_ok());
        assert!(check_paging(0, 10).is_err());
        assert!(check_paging(1, 0).is_err());
        assert!(check_paging(1, 101).is_err());
    }

    #[test]
    fn test_document_error_status() {
        let unsupported: AppError = DocumentError::Unsupported("text/plain".into()).into();
        assert_eq!(unsupported.into_response().status(), StatusCode::BAD_REQUEST);

        let broken: AppError = DocumentError::Pdf("bad xref".into()).into();
        assert_eq!(
            broken.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_tracker_error_status() {
        let unsupported = AppError::Tracker(TrackerError::Unsupported {
            requested: "trello".into(),
            supported: "jira, mock".into(),
        });
        assert_eq!(unsupported.into_response().status(), StatusCode::BAD_REQUEST);

        let down = AppError::Tracker(TrackerError::Communication("refused".into()));
        assert_eq!(down.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_obligation_id() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .uri("/obligations/not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
