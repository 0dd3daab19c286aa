use axum::{
    extract::Multipart,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{errors::ServiceError, services::spreadsheet::XLSX_CONTENT_TYPE, ApiResponse};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Body of the bulk-delete endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct IdList {
    pub ids: Vec<Uuid>,
}

/// Multipart upload of one workbook. The first field carrying data is used,
/// whatever its name.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct WorkbookUpload {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Reads the uploaded workbook from a multipart body.
pub async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if !bytes.is_empty() {
            debug!(field = %name, size = bytes.len(), "Received workbook upload");
            return Ok(bytes.to_vec());
        }
    }
    Err(ServiceError::BadRequest(
        "Multipart body contains no file".to_string(),
    ))
}

/// Wraps workbook bytes in a download response.
pub fn xlsx_attachment(bytes: Vec<u8>, file_stem: &str) -> Response {
    let filename = format!(
        "{}_{}.xlsx",
        file_stem,
        chrono::Utc::now().format("%Y%m%d")
    );
    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(XLSX_CONTENT_TYPE),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
