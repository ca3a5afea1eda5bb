//! HTTP surface of the gateway.
//!
//! All endpoints are `POST` with JSON bodies, mirroring the tool-call shape
//! LLM runtimes emit. The chunked-download trio is the substantial part;
//! the rest are thin forwards that validate required fields, call the Dooray
//! API, and wrap the upstream envelope in `{"dooray_response": ...}`.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use dooray_api::DoorayClient;
use dooray_transfer::{ChunkPayload, DownloadStarted, FileLocator, TransferManager};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::GatewayError;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<DoorayClient>,
    pub transfer: Arc<TransferManager>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Chunked download core
        .route("/mcp/drive/files/start-download", post(start_download))
        .route("/mcp/drive/files/get-chunk", post(get_chunk))
        .route("/mcp/drive/files/cleanup-session", post(cleanup_session))
        // Pass-through forwards
        .route("/mcp/common/members/list", post(members_list))
        .route("/mcp/common/members/get", post(members_get))
        .route("/mcp/drive/list", post(drive_list))
        .route("/mcp/drive/get", post(drive_get))
        .route("/mcp/drive/files/list", post(drive_files_list))
        .route("/mcp/drive/files/metadata", post(drive_file_metadata))
        .route("/mcp/messenger/send", post(messenger_send))
        .route("/mcp/project/list", post(project_list))
        .with_state(state)
}

fn require(value: Option<String>, field: &'static str) -> Result<String, GatewayError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GatewayError::MissingField { field }),
    }
}

fn forward<T: serde::Serialize>(response: T) -> Json<Value> {
    Json(json!({ "dooray_response": response }))
}

// --- Chunked download core ---

#[derive(Debug, Deserialize)]
struct StartDownloadRequest {
    drive_id: Option<String>,
    file_id: Option<String>,
}

async fn start_download(
    State(state): State<AppState>,
    Json(req): Json<StartDownloadRequest>,
) -> Result<Json<DownloadStarted>, GatewayError> {
    let locator = FileLocator {
        drive_id: require(req.drive_id, "drive_id")?,
        file_id: require(req.file_id, "file_id")?,
    };
    Ok(Json(state.transfer.start_download(locator).await?))
}

#[derive(Debug, Deserialize)]
struct GetChunkRequest {
    session_id: Option<String>,
    chunk_index: Option<i64>,
}

async fn get_chunk(
    State(state): State<AppState>,
    Json(req): Json<GetChunkRequest>,
) -> Result<Json<ChunkPayload>, GatewayError> {
    let session_id = require(req.session_id, "session_id")?;
    let chunk_index = req
        .chunk_index
        .ok_or(GatewayError::MissingField {
            field: "chunk_index",
        })?;
    Ok(Json(state.transfer.read_chunk(&session_id, chunk_index).await?))
}

#[derive(Debug, Deserialize)]
struct CleanupRequest {
    session_id: Option<String>,
}

async fn cleanup_session(
    State(state): State<AppState>,
    Json(req): Json<CleanupRequest>,
) -> Result<Json<Value>, GatewayError> {
    let session_id = require(req.session_id, "session_id")?;
    // Idempotent: cleaning an unknown or already-gone session still reports
    // success.
    state.transfer.cleanup(&session_id);
    Ok(Json(json!({ "cleaned": true })))
}

// --- Pass-through forwards ---

async fn members_list(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    Ok(forward(state.client.get_members().await?))
}

#[derive(Debug, Deserialize)]
struct MemberGetRequest {
    member_id: Option<String>,
}

async fn members_get(
    State(state): State<AppState>,
    Json(req): Json<MemberGetRequest>,
) -> Result<Json<Value>, GatewayError> {
    let member_id = require(req.member_id, "member_id")?;
    Ok(forward(state.client.get_member(&member_id).await?))
}

#[derive(Debug, Deserialize)]
struct DriveListRequest {
    #[serde(rename = "type")]
    drive_type: Option<String>,
}

async fn drive_list(
    State(state): State<AppState>,
    Json(req): Json<DriveListRequest>,
) -> Result<Json<Value>, GatewayError> {
    let drive_type = req.drive_type.unwrap_or_else(|| "private".to_string());
    Ok(forward(state.client.get_drives(&drive_type).await?))
}

#[derive(Debug, Deserialize)]
struct DriveGetRequest {
    drive_id: Option<String>,
}

async fn drive_get(
    State(state): State<AppState>,
    Json(req): Json<DriveGetRequest>,
) -> Result<Json<Value>, GatewayError> {
    let drive_id = require(req.drive_id, "drive_id")?;
    Ok(forward(state.client.get_drive(&drive_id).await?))
}

async fn drive_files_list(
    State(state): State<AppState>,
    Json(req): Json<DriveGetRequest>,
) -> Result<Json<Value>, GatewayError> {
    let drive_id = require(req.drive_id, "drive_id")?;
    Ok(forward(state.client.get_drive_files(&drive_id).await?))
}

#[derive(Debug, Deserialize)]
struct FileMetadataRequest {
    drive_id: Option<String>,
    file_id: Option<String>,
}

async fn drive_file_metadata(
    State(state): State<AppState>,
    Json(req): Json<FileMetadataRequest>,
) -> Result<Json<Value>, GatewayError> {
    let drive_id = require(req.drive_id, "drive_id")?;
    let file_id = require(req.file_id, "file_id")?;
    Ok(forward(state.client.get_drive_file(&drive_id, &file_id).await?))
}

#[derive(Debug, Deserialize)]
struct MessengerSendRequest {
    recipient_id: Option<String>,
    message: Option<String>,
}

async fn messenger_send(
    State(state): State<AppState>,
    Json(req): Json<MessengerSendRequest>,
) -> Result<Json<Value>, GatewayError> {
    let recipient_id = require(req.recipient_id, "recipient_id")?;
    let message = require(req.message, "message")?;
    Ok(forward(
        state.client.send_direct_message(&recipient_id, &message).await?,
    ))
}

async fn project_list(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    Ok(forward(state.client.get_projects().await?))
}
