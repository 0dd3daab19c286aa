use axum::{
    extract::{Multipart, Path, Query, State},
    response::Response,
    Json,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{created_response, no_content_response, read_upload, xlsx_attachment, IdList};
use crate::{
    entities::item,
    errors::ServiceError,
    services::{
        code_generator::{next_sequence_no, ItemDraft, ItemPatch},
        items::ItemFilter,
        spreadsheet, BulkResult,
    },
    ApiResponse, ApiResult, AppState,
};

const EXPORT_SHEET: &str = "Items";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastNoResponse {
    /// Highest sequence number in use, absent when the registry is empty.
    pub last_no: Option<i64>,
    /// Number the next auto-numbered create will try.
    pub next_no: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastCodeResponse {
    pub last_code: Option<String>,
}

/// List items
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemFilter),
    responses(
        (status = 200, description = "Items matching the filter", body = ApiResponse<Vec<item::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> ApiResult<Vec<item::Model>> {
    let items = state.services.items.list_items(&filter).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// Create an item with the next sequence number
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = ItemDraft,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<item::Model>),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sequence or code already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(draft): Json<ItemDraft>,
) -> Result<Response, ServiceError> {
    let created = state.services.items.create_item(draft).await?;
    Ok(created_response(created))
}

/// Current maximum sequence number
#[utoipa::path(
    get,
    path = "/api/v1/items/last-no",
    responses(
        (status = 200, description = "Last and next sequence number", body = ApiResponse<LastNoResponse>)
    ),
    tag = "items"
)]
pub async fn last_no(State(state): State<AppState>) -> ApiResult<LastNoResponse> {
    let last_no = state.services.items.last_sequence_no().await?;
    Ok(Json(ApiResponse::success(LastNoResponse {
        last_no,
        next_no: next_sequence_no(last_no),
    })))
}

/// Greatest electronic code
#[utoipa::path(
    get,
    path = "/api/v1/items/last-code",
    responses(
        (status = 200, description = "Greatest electronic code", body = ApiResponse<LastCodeResponse>)
    ),
    tag = "items"
)]
pub async fn last_code(State(state): State<AppState>) -> ApiResult<LastCodeResponse> {
    let last_code = state.services.items.last_code().await?;
    Ok(Json(ApiResponse::success(LastCodeResponse { last_code })))
}

/// Download the filtered item list as xlsx
#[utoipa::path(
    get,
    path = "/api/v1/items/export",
    params(ItemFilter),
    responses(
        (status = 200, description = "Workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>)
    ),
    tag = "items"
)]
pub async fn export_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Result<Response, ServiceError> {
    let items = state.services.items.list_items(&filter).await?;
    let bytes = spreadsheet::export(&items, EXPORT_SHEET)?;
    info!(rows = items.len(), "Items exported");
    Ok(xlsx_attachment(bytes, "items"))
}

/// Import items from an xlsx upload
#[utoipa::path(
    post,
    path = "/api/v1/items/import",
    request_body(content = super::common::WorkbookUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-row import outcome", body = ApiResponse<BulkResult>),
        (status = 400, description = "Unreadable workbook", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn import_items(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<BulkResult> {
    let bytes = read_upload(multipart).await?;
    let result = spreadsheet::import_items(&state.services.items, &bytes).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Create many items, best effort
#[utoipa::path(
    post,
    path = "/api/v1/items/bulk",
    request_body = Vec<ItemDraft>,
    responses(
        (status = 200, description = "Per-row outcome", body = ApiResponse<BulkResult>)
    ),
    tag = "items"
)]
pub async fn bulk_create_items(
    State(state): State<AppState>,
    Json(drafts): Json<Vec<ItemDraft>>,
) -> ApiResult<BulkResult> {
    let result = state.services.items.create_many(drafts).await;
    Ok(Json(ApiResponse::success(result)))
}

/// Delete many items, best effort
#[utoipa::path(
    post,
    path = "/api/v1/items/bulk-delete",
    request_body = IdList,
    responses(
        (status = 200, description = "Per-id outcome", body = ApiResponse<BulkResult>)
    ),
    tag = "items"
)]
pub async fn bulk_delete_items(
    State(state): State<AppState>,
    Json(body): Json<IdList>,
) -> ApiResult<BulkResult> {
    let result = state.services.items.delete_many(body.ids).await;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item", body = ApiResponse<item::Model>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<item::Model> {
    let item = state.services.items.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Patch an item; classification edits re-derive the electronic code
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = ItemPatch,
    responses(
        (status = 200, description = "Updated item", body = ApiResponse<item::Model>),
        (status = 400, description = "Invalid patch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch or duplicate code", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ItemPatch>,
) -> ApiResult<item::Model> {
    let item = state.services.items.update_item(id, patch).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.items.delete_item(id).await?;
    Ok(no_content_response())
}
