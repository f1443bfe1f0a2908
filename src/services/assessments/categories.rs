use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AssessmentService;
use crate::errors::EvalBookError;
use crate::models::assessments::responses::CategoryListResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;

pub async fn list_categories(
    service: &AssessmentService,
    request: &HttpRequest,
    assessment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let result = match storage.get_assessment_by_id(assessment_id).await {
        Ok(Some(_)) => storage.list_categories(assessment_id).await,
        Ok(None) => Err(EvalBookError::not_found(format!(
            "Assessment {assessment_id} not found"
        ))),
        Err(e) => Err(e),
    };

    match result {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            CategoryListResponse {
                assessment_id,
                items,
            },
            "Categories loaded",
        ))),
        Err(e) => Ok(error_response(
            &e,
            ErrorCode::AssessmentNotFound,
            ErrorCode::InternalServerError,
        )),
    }
}
