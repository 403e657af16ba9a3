//! Record Routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use record_editor::{ManualEntry, RecordPatch};
use record_store::{Record, RecordId, RecordOrigin};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{ApiError, AppState};

/// Query parameters for the records endpoint
#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    /// Only the most recent `limit` records, still in history order
    pub limit: Option<usize>,
    /// Only feed or only manual records
    pub origin: Option<RecordOrigin>,
}

/// Response for the records endpoint
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub data: Vec<Record>,
    pub meta: RecordsMeta,
}

#[derive(Debug, Serialize)]
pub struct RecordsMeta {
    pub count: usize,
    pub total: usize,
}

/// List records in insertion order
pub async fn list(State(state): State<Arc<AppState>>, Query(params): Query<RecordQuery>) -> Json<RecordsResponse> {
    let all = state.editor.list();
    let total = all.len();

    let mut data: Vec<Record> = match params.origin {
        Some(origin) => all.into_iter().filter(|r| r.origin() == origin).collect(),
        None => all,
    };
    if let Some(limit) = params.limit {
        let skip = data.len().saturating_sub(limit);
        data.drain(..skip);
    }

    Json(RecordsResponse {
        meta: RecordsMeta {
            count: data.len(),
            total,
        },
        data,
    })
}

pub async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Record>, ApiError> {
    Ok(Json(state.editor.get(&RecordId::from(id))?))
}

/// Manual add
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<ManualEntry>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let record = state.editor.create(entry).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Partial edit
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<Record>, ApiError> {
    Ok(Json(state.editor.update(&RecordId::from(id), patch).await?))
}

/// Idempotent delete
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.editor.delete(&RecordId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Confirmation token for delete-all
#[derive(Debug, Serialize)]
pub struct DeleteAllToken {
    pub token: String,
    pub expires_in_seconds: u64,
}

/// First step of delete-all
pub async fn request_delete_all(State(state): State<Arc<AppState>>) -> Json<DeleteAllToken> {
    let token = state.confirmations.issue();
    info!("Delete-all requested, awaiting confirmation");
    Json(DeleteAllToken {
        token,
        expires_in_seconds: state.confirmations.ttl().as_secs(),
    })
}

#[derive(Debug, Deserialize)]
pub struct DeleteAllQuery {
    pub confirm: Option<String>,
}

/// Second step of delete-all
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteAllQuery>,
) -> Result<StatusCode, ApiError> {
    state.confirmations.consume(params.confirm.as_deref())?;
    state.editor.delete_all().await?;
    info!("All records deleted");
    Ok(StatusCode::NO_CONTENT)
}
