use axum::{
    extract::{Multipart, Path, Query, State},
    response::Response,
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::common::{created_response, no_content_response, read_upload, xlsx_attachment, IdList};
use crate::{
    entities::bom_line,
    errors::ServiceError,
    services::{
        bom::{BomFilter, BomLineDraft, BomLinePatch, SelectCodeRequest, SetParentRequest},
        spreadsheet, BulkResult,
    },
    ApiResponse, ApiResult, AppState,
};

const EXPORT_SHEET: &str = "BOM";

/// List BOM lines
#[utoipa::path(
    get,
    path = "/api/v1/boms",
    params(BomFilter),
    responses(
        (status = 200, description = "BOM lines matching the filter", body = ApiResponse<Vec<bom_line::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn list_lines(
    State(state): State<AppState>,
    Query(filter): Query<BomFilter>,
) -> ApiResult<Vec<bom_line::Model>> {
    let lines = state.services.bom.list_lines(&filter).await?;
    Ok(Json(ApiResponse::success(lines)))
}

/// Create a BOM line
#[utoipa::path(
    post,
    path = "/api/v1/boms",
    request_body = BomLineDraft,
    responses(
        (status = 201, description = "BOM line created", body = ApiResponse<bom_line::Model>),
        (status = 400, description = "Missing code or name", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn create_line(
    State(state): State<AppState>,
    Json(draft): Json<BomLineDraft>,
) -> Result<Response, ServiceError> {
    let line = state.services.bom.create_line(draft).await?;
    Ok(created_response(line))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms/bulk",
    request_body = Vec<BomLineDraft>,
    responses(
        (status = 200, description = "Per-row outcome", body = ApiResponse<BulkResult>)
    ),
    tag = "boms"
)]
pub async fn bulk_create_lines(
    State(state): State<AppState>,
    Json(drafts): Json<Vec<BomLineDraft>>,
) -> ApiResult<BulkResult> {
    let result = state.services.bom.create_many(drafts).await;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/export",
    params(BomFilter),
    responses(
        (status = 200, description = "Workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>)
    ),
    tag = "boms"
)]
pub async fn export_lines(
    State(state): State<AppState>,
    Query(filter): Query<BomFilter>,
) -> Result<Response, ServiceError> {
    let lines = state.services.bom.list_lines(&filter).await?;
    let bytes = spreadsheet::export(&lines, EXPORT_SHEET)?;
    info!(rows = lines.len(), "BOM lines exported");
    Ok(xlsx_attachment(bytes, "bom"))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms/import",
    request_body(content = super::common::WorkbookUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-row import outcome", body = ApiResponse<BulkResult>),
        (status = 400, description = "Unreadable workbook", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn import_lines(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<BulkResult> {
    let bytes = read_upload(multipart).await?;
    let result = spreadsheet::import_bom_lines(&state.services.bom, &bytes).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms/bulk-delete",
    request_body = IdList,
    responses(
        (status = 200, description = "Per-id outcome", body = ApiResponse<BulkResult>)
    ),
    tag = "boms"
)]
pub async fn bulk_delete_lines(
    State(state): State<AppState>,
    Json(body): Json<IdList>,
) -> ApiResult<BulkResult> {
    let result = state.services.bom.delete_many(body.ids).await;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}",
    params(("id" = Uuid, Path, description = "BOM line id")),
    responses(
        (status = 200, description = "BOM line", body = ApiResponse<bom_line::Model>),
        (status = 404, description = "BOM line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn get_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<bom_line::Model> {
    let line = state.services.bom.get_line(id).await?;
    Ok(Json(ApiResponse::success(line)))
}

#[utoipa::path(
    put,
    path = "/api/v1/boms/{id}",
    params(("id" = Uuid, Path, description = "BOM line id")),
    request_body = BomLinePatch,
    responses(
        (status = 200, description = "Updated BOM line", body = ApiResponse<bom_line::Model>),
        (status = 404, description = "BOM line not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn update_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<BomLinePatch>,
) -> ApiResult<bom_line::Model> {
    let line = state.services.bom.update_line(id, patch).await?;
    Ok(Json(ApiResponse::success(line)))
}

/// Delete a BOM line; children pointing at its code are not touched
#[utoipa::path(
    delete,
    path = "/api/v1/boms/{id}",
    params(("id" = Uuid, Path, description = "BOM line id")),
    responses(
        (status = 204, description = "BOM line deleted"),
        (status = 404, description = "BOM line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn delete_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.bom.delete_line(id).await?;
    Ok(no_content_response())
}

/// Select a part for the line by electronic code
///
/// Copies name, unit, type, model and industry from the matching item. An
/// unknown code returns the line unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/boms/{id}/code",
    params(("id" = Uuid, Path, description = "BOM line id")),
    request_body = SelectCodeRequest,
    responses(
        (status = 200, description = "BOM line after selection", body = ApiResponse<bom_line::Model>),
        (status = 404, description = "BOM line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn select_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectCodeRequest>,
) -> ApiResult<bom_line::Model> {
    let line = state
        .services
        .bom
        .select_code(id, &body.electronic_code, body.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(line)))
}

#[utoipa::path(
    put,
    path = "/api/v1/boms/{id}/parent",
    params(("id" = Uuid, Path, description = "BOM line id")),
    request_body = SetParentRequest,
    responses(
        (status = 200, description = "BOM line with new parent", body = ApiResponse<bom_line::Model>),
        (status = 404, description = "BOM line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn set_parent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetParentRequest>,
) -> ApiResult<bom_line::Model> {
    let line = state
        .services
        .bom
        .set_parent(id, &body.parent_code, body.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(line)))
}
