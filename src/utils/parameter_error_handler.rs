//! 请求参数解析失败时，统一返回 ApiResponse 结构

use actix_web::{HttpRequest, HttpResponse, error, error::JsonPayloadError, error::QueryPayloadError};
use tracing::debug;

use crate::models::{ApiResponse, ErrorCode};

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Invalid JSON body on {}: {}", req.path(), err);

    let (code, message) = match &err {
        JsonPayloadError::ContentType => (
            ErrorCode::BadRequest,
            "Content-Type must be application/json".to_string(),
        ),
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            (ErrorCode::BadRequest, "Request body is too large".to_string())
        }
        _ => (ErrorCode::ValidationFailed, format!("Invalid request body: {err}")),
    };

    let response = HttpResponse::BadRequest().json(ApiResponse::<()>::error_empty(code, message));
    error::InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Invalid query string on {}: {}", req.path(), err);

    let response = HttpResponse::BadRequest().json(ApiResponse::<()>::error_empty(
        ErrorCode::ValidationFailed,
        format!("Invalid query parameters: {err}"),
    ));
    error::InternalError::from_response(err, response).into()
}
