pub mod assessments;
pub mod evaluations;
pub mod notifications;

use actix_web::HttpResponse;

use crate::errors::EvalBookError;
use crate::models::{ApiResponse, ErrorCode};

pub use assessments::AssessmentService;
pub use evaluations::EvaluationService;

/// 将内部错误转换为统一响应
///
/// 校验错误 400，资源不存在 404，其余 500 并附带存储层信息。
pub(crate) fn error_response(
    err: &EvalBookError,
    not_found: ErrorCode,
    failure: ErrorCode,
) -> HttpResponse {
    let body = ApiResponse::error_empty(
        ErrorCode::from_error(err, not_found, failure),
        err.message(),
    );

    match err {
        EvalBookError::Validation(_) | EvalBookError::DateParse(_) => {
            HttpResponse::BadRequest().json(body)
        }
        EvalBookError::NotFound(_) => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}
