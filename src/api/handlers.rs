use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::store::{BulkReport, FeedInfo, FeedItem, ItemPatch, NewItem};

use super::error::ApiResult;
use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub item_count: usize,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    /// Seconds since process start.
    pub uptime: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub path: String,
}

/// Regenerate the artifact after a successful mutation. A publish failure
/// is logged, not surfaced: the document is already saved and the next
/// write will bring the artifact back in sync.
async fn publish_after_mutation(state: &AppState) {
    if let Err(e) = state.publisher.regenerate().await {
        tracing::error!(error = %e, "Failed to regenerate feed after mutation");
    }
}

/// Liveness probe with basic store stats
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let doc = state.store.load().into_document();
    Json(HealthResponse {
        status: "healthy",
        item_count: doc.items.len(),
        last_modified: doc.metadata.last_modified,
        uptime: state.uptime_secs(),
    })
}

/// List all items in storage order
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<FeedItem>> {
    Json(state.store.items())
}

/// Fetch a single item by id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FeedItem>> {
    let item = state.store.item(id)?;
    Ok(Json(item))
}

/// Create an item and republish the feed
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<NewItem>,
) -> ApiResult<(StatusCode, Json<FeedItem>)> {
    let item = state.store.create_item(payload).await?;
    publish_after_mutation(&state).await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Partially update an item and republish the feed
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemPatch>,
) -> ApiResult<Json<FeedItem>> {
    let item = state.store.update_item(id, payload).await?;
    publish_after_mutation(&state).await;
    Ok(Json(item))
}

/// Delete an item and republish the feed
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FeedItem>> {
    let item = state.store.delete_item(id).await?;
    publish_after_mutation(&state).await;
    Ok(Json(item))
}

/// Import a batch of items; invalid entries are reported, not fatal
pub async fn bulk_import(
    State(state): State<AppState>,
    Json(payload): Json<Vec<NewItem>>,
) -> ApiResult<Json<BulkReport>> {
    let report = state.store.bulk_import(payload).await?;
    if report.added_count > 0 {
        publish_after_mutation(&state).await;
    }
    Ok(Json(report))
}

/// Current feed-level metadata
pub async fn get_feed_info(State(state): State<AppState>) -> Json<FeedInfo> {
    Json(state.store.feed_info())
}

/// Partially update feed-level metadata and republish the feed
pub async fn update_feed_info(
    State(state): State<AppState>,
    Json(payload): Json<FeedInfo>,
) -> ApiResult<Json<FeedInfo>> {
    let info = state.store.update_feed_info(payload).await?;
    publish_after_mutation(&state).await;
    Ok(Json(info))
}

/// Force a rebuild of the XML artifact
pub async fn regenerate(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    state.publisher.regenerate().await?;
    Ok(Json(StatusResponse {
        status: "regenerated",
    }))
}

/// Write a timestamped snapshot of the document
pub async fn backup(State(state): State<AppState>) -> ApiResult<Json<BackupResponse>> {
    let path = state.store.backup().await?;
    Ok(Json(BackupResponse {
        path: path.display().to_string(),
    }))
}
