pub mod error;
pub mod session;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, routing::post, Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{info, warn};

use partnerdesk_agent::{AgentRelay, Message};
use partnerdesk_core::{
    aggregate, daily_volume, default_window, prepare, recent_interactions, AgentEvent, AppConfig,
    DailyVolume, DatasetKind, MetricsSummary, PricingRate, DEFAULT_RECENT_LIMIT,
};
use partnerdesk_storage::{
    delete_objects, list_objects, publish, BackupOutcome, CatalogError, Notice, ObjectStatusCache,
    ObjectStore,
};

use crate::error::AppError;
use crate::session::{expired_cookie, session_cookie, session_token, SessionRegistry};
use crate::snapshot::MetricsSnapshot;

pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ObjectStore>,
    pub relay: AgentRelay,
    pub status: ObjectStatusCache,
    pub metrics: MetricsSnapshot,
    pub sessions: SessionRegistry,
    pub pricing: PricingRate,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn ObjectStore>, relay: AgentRelay) -> Self {
        let status = ObjectStatusCache::new(Duration::from_secs(config.status_ttl_secs));
        let pricing = config.pricing.normalized();
        Self {
            config,
            store,
            relay,
            status,
            metrics: MetricsSnapshot::default(),
            sessions: SessionRegistry::new(),
            pricing,
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<String, AppError> {
        session_token(headers)
            .filter(|token| self.sessions.contains(token))
            .ok_or_else(AppError::unauthorized)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_ui))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/api/files/status", get(handle_file_status))
        .route(
            "/api/upload/:kind",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/objects", get(handle_list_objects))
        .route("/api/objects/delete", post(handle_delete_objects))
        .route("/api/chat", get(handle_chat_history).post(handle_chat))
        .route("/api/metrics", get(handle_metrics))
        .with_state(state)
}

async fn serve_ui() -> Html<&'static str> {
    Html(include_str!("../../../ui/index.html"))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    authenticated: bool,
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if !state.config.password_matches(&body.password) {
        warn!("login_rejected");
        return Err(AppError::Unauthorized(
            "Password incorrect. Please try again.".to_string(),
        ));
    }
    let token = state.sessions.create();
    info!(active_sessions = state.sessions.len(), "login");
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token));
    Ok((
        headers,
        Json(LoginResponse {
            authenticated: true,
        }),
    )
        .into_response())
}

async fn handle_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if state.sessions.remove(&token) {
            info!(active_sessions = state.sessions.len(), "logout");
        }
    }
    let mut out = HeaderMap::new();
    out.insert(header::SET_COOKIE, expired_cookie());
    (
        out,
        Json(LoginResponse {
            authenticated: false,
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct FileStatus {
    kind: DatasetKind,
    label: &'static str,
    key: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct FileStatusResponse {
    bucket: String,
    files: Vec<FileStatus>,
}

async fn handle_file_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<FileStatusResponse>, AppError> {
    state.authorize(&headers)?;
    let mut files = Vec::with_capacity(DatasetKind::ALL.len());
    for kind in DatasetKind::ALL {
        let key = kind.destination_key(&state.config.keys).to_string();
        let status = state.status.status(state.store.as_ref(), &key).await;
        files.push(FileStatus {
            kind,
            label: kind.label(),
            key,
            status,
        });
    }
    Ok(Json(FileStatusResponse {
        bucket: state.store.bucket().to_string(),
        files,
    }))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    kind: DatasetKind,
    filename: Option<String>,
    destination: String,
    rows: usize,
    columns: Vec<String>,
    backup: BackupOutcome,
    bytes_written: usize,
    notices: Vec<Notice>,
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    AxumPath(kind): AxumPath<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    state.authorize(&headers)?;
    let kind = DatasetKind::from_str(&kind)
        .ok_or_else(|| AppError::bad_request(format!("unknown dataset {kind}")))?;
    let upload = extract_file(&mut multipart).await?;
    info!(
        kind = kind.as_str(),
        filename = upload.filename.as_deref().unwrap_or("-"),
        bytes = upload.data.len(),
        "upload_received"
    );
    let data = upload.data;
    let prepared = task::spawn_blocking(move || prepare(kind, &data))
        .await
        .map_err(AppError::internal)?
        .map_err(|err| {
            AppError::bad_request(format!(
                "An error occurred with the {} file: {err}",
                kind.label()
            ))
        })?;
    let destination = kind.destination_key(&state.config.keys).to_string();
    let report = publish(state.store.as_ref(), Bytes::from(prepared.csv), &destination)
        .await
        .map_err(AppError::operation)?;
    state.status.invalidate(&destination);
    Ok(Json(UploadResponse {
        kind,
        filename: upload.filename,
        destination,
        rows: prepared.rows,
        columns: prepared.columns,
        backup: report.backup,
        bytes_written: report.bytes_written,
        notices: report.notices,
    }))
}

struct UploadedFile {
    data: Vec<u8>,
    filename: Option<String>,
}

async fn extract_file(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(AppError::bad_request)?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field.bytes().await.map_err(AppError::bad_request)?;
            return Ok(UploadedFile {
                data: data.to_vec(),
                filename,
            });
        }
    }
    Err(AppError::bad_request("missing file"))
}

#[derive(Debug, Serialize)]
struct ObjectListResponse {
    bucket: String,
    keys: Vec<String>,
}

async fn handle_list_objects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ObjectListResponse>, AppError> {
    state.authorize(&headers)?;
    let keys = list_objects(state.store.as_ref())
        .await
        .map_err(AppError::operation)?;
    Ok(Json(ObjectListResponse {
        bucket: state.store.bucket().to_string(),
        keys,
    }))
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    keys: Vec<String>,
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    deleted: usize,
    message: String,
}

async fn handle_delete_objects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.authorize(&headers)?;
    if !body.confirm {
        return Err(AppError::bad_request(
            "Deleting files is permanent and cannot be undone; confirm to proceed.",
        ));
    }
    let deleted = delete_objects(state.store.as_ref(), &body.keys)
        .await
        .map_err(|err| match err {
            CatalogError::EmptySelection => AppError::bad_request(err),
            other => AppError::operation(other),
        })?;
    for key in &body.keys {
        state.status.invalidate(key);
    }
    Ok(Json(DeleteResponse {
        deleted,
        message: format!("Successfully deleted {deleted} files."),
    }))
}

#[derive(Debug, Serialize)]
struct ChatHistoryResponse {
    session_id: String,
    available: bool,
    backend: Option<&'static str>,
    messages: Vec<Message>,
}

async fn handle_chat_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ChatHistoryResponse>, AppError> {
    let token = state.authorize(&headers)?;
    let (id, messages) = state
        .sessions
        .history(&token)
        .ok_or_else(AppError::unauthorized)?;
    Ok(Json(ChatHistoryResponse {
        session_id: id.to_string(),
        available: state.relay.is_available(),
        backend: state.relay.backend(),
        messages,
    }))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: Message,
    messages: Vec<Message>,
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let token = state.authorize(&headers)?;
    let prompt = body.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::bad_request("prompt must not be empty"));
    }
    let mut turn = state
        .sessions
        .checkout(&token)
        .ok_or_else(|| AppError::bad_request("the agent is still answering the previous prompt"))?;
    let reply = state.relay.send(turn.chat_mut(), prompt).await;
    Ok(Json(ChatResponse {
        session_id: turn.chat().id().to_string(),
        reply,
        messages: turn.chat().messages().to_vec(),
    }))
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    window_days: i64,
    pricing: PricingRate,
    summary: MetricsSummary,
    daily_volume: Vec<DailyVolume>,
    recent: Vec<AgentEvent>,
}

async fn handle_metrics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MetricsResponse>, AppError> {
    state.authorize(&headers)?;
    let events = state.metrics.events();
    let window = default_window();
    let summary = aggregate(&events, Utc::now(), window, &state.pricing);
    Ok(Json(MetricsResponse {
        window_days: window.num_days(),
        pricing: state.pricing,
        summary,
        daily_volume: daily_volume(&events),
        recent: recent_interactions(&events, DEFAULT_RECENT_LIMIT),
    }))
}
