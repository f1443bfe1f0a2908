use std::collections::{HashMap, HashSet};

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AssessmentService;
use crate::errors::Result;
use crate::models::assessments::{
    requests::AssessmentListParams,
    responses::{AssessmentListItem, AssessmentListResponse},
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::storage::Storage;

/// 列出测评并附带教师姓名
pub async fn list(storage: &dyn Storage, teacher_id: Option<&str>) -> Result<AssessmentListResponse> {
    let assessments = storage.list_assessments(teacher_id).await?;

    let owner_ids: Vec<String> = assessments
        .iter()
        .map(|a| a.created_by.trim().to_string())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let names: HashMap<String, String> = storage
        .list_users_by_ids(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.bgnu_id, u.full_name))
        .collect();

    let items = assessments
        .into_iter()
        .map(|assessment| {
            let teacher_name = names.get(assessment.created_by.trim()).cloned();
            AssessmentListItem {
                assessment,
                teacher_name,
            }
        })
        .collect();

    Ok(AssessmentListResponse { items })
}

pub async fn list_assessments(
    service: &AssessmentService,
    request: &HttpRequest,
    query: AssessmentListParams,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match list(storage.as_ref(), query.teacher_id.as_deref()).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp, "Assessments loaded"))),
        Err(e) => Ok(error_response(
            &e,
            ErrorCode::NotFound,
            ErrorCode::InternalServerError,
        )),
    }
}
