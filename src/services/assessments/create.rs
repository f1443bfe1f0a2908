use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::AssessmentService;
use crate::errors::{EvalBookError, Result};
use crate::models::assessments::{
    entities::{NewAssessment, NewCategory},
    requests::CreateAssessmentRequest,
    responses::{AssessmentCreationStatus, CreateAssessmentResponse},
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::services::notifications::{NotificationDispatcher, NotificationEvent};
use crate::storage::Storage;
use crate::utils::validate::{
    validate_assessment_code, validate_categories, validate_identifier, validate_title,
};

/// 校验并规范化创建请求
pub fn validate_new_assessment(req: &CreateAssessmentRequest) -> Result<NewAssessment> {
    let title = req.title.trim();
    validate_title(title).map_err(EvalBookError::validation)?;

    let code = req.code.trim();
    validate_assessment_code(code).map_err(EvalBookError::validation)?;

    let created_by = req.created_by.as_deref().map(str::trim).unwrap_or_default();
    if created_by.is_empty() {
        return Err(EvalBookError::validation("created_by is required"));
    }
    validate_identifier(created_by)
        .map_err(|e| EvalBookError::validation(format!("created_by: {e}")))?;

    let checked = validate_categories(
        req.categories
            .iter()
            .map(|c| (c.name.as_str(), c.marks, c.is_comment)),
    );
    if !checked.is_valid {
        return Err(EvalBookError::validation(checked.error_message()));
    }

    Ok(NewAssessment {
        title: title.to_string(),
        description: req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        code: code.to_string(),
        created_by: created_by.to_string(),
        categories: req
            .categories
            .iter()
            .map(|c| NewCategory {
                name: c.name.trim().to_string(),
                max_marks: c.marks,
                is_comment: c.is_comment,
            })
            .collect(),
    })
}

/// 创建测评，新建成功后通知学生
pub async fn create(
    storage: &dyn Storage,
    dispatcher: &NotificationDispatcher,
    req: &CreateAssessmentRequest,
) -> Result<CreateAssessmentResponse> {
    let new = validate_new_assessment(req)?;
    let resp = storage.create_assessment(new).await?;

    match resp.status {
        AssessmentCreationStatus::Created => {
            info!(
                "Assessment {} created by {} with {} categories",
                resp.assessment.id,
                resp.assessment.created_by,
                resp.categories.len()
            );
            dispatcher.emit(NotificationEvent::AssessmentCreated {
                title: resp.assessment.title.clone(),
            });
        }
        AssessmentCreationStatus::Recovered => {
            info!(
                "Assessment {} already exists for code {}, returning it",
                resp.assessment.id, resp.assessment.code
            );
        }
    }

    Ok(resp)
}

pub async fn create_assessment(
    service: &AssessmentService,
    request: &HttpRequest,
    req: CreateAssessmentRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let dispatcher = service.get_dispatcher(request);

    match create(storage.as_ref(), &dispatcher, &req).await {
        Ok(resp) => match resp.status {
            AssessmentCreationStatus::Created => Ok(HttpResponse::Created()
                .json(ApiResponse::success(resp, "Assessment created successfully"))),
            AssessmentCreationStatus::Recovered => Ok(HttpResponse::Ok()
                .json(ApiResponse::success(resp, "Assessment already exists"))),
        },
        Err(e) => Ok(error_response(
            &e,
            ErrorCode::AssessmentNotFound,
            ErrorCode::AssessmentCreationFailed,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::requests::CreateCategoryRequest;

    fn request() -> CreateAssessmentRequest {
        CreateAssessmentRequest {
            title: " Midterm ".into(),
            description: Some("  ".into()),
            code: "MID-1".into(),
            created_by: Some(" T-7 ".into()),
            categories: vec![
                CreateCategoryRequest {
                    name: "Logic".into(),
                    marks: 10.0,
                    is_comment: false,
                },
                CreateCategoryRequest {
                    name: "Remarks".into(),
                    marks: 0.0,
                    is_comment: true,
                },
            ],
        }
    }

    #[test]
    fn test_normalizes_request() {
        let new = validate_new_assessment(&request()).unwrap();
        assert_eq!(new.title, "Midterm");
        assert_eq!(new.created_by, "T-7");
        assert_eq!(new.description, None);
        assert_eq!(new.categories.len(), 2);
        assert!(new.categories[1].is_comment);
    }

    #[test]
    fn test_requires_owner_and_code() {
        let mut req = request();
        req.created_by = None;
        assert_eq!(validate_new_assessment(&req).unwrap_err().code(), "E005");

        let mut req = request();
        req.code = String::new();
        assert!(validate_new_assessment(&req).is_err());
    }

    #[test]
    fn test_rejects_negative_marks() {
        let mut req = request();
        req.categories[0].marks = -3.0;
        assert!(validate_new_assessment(&req).is_err());
    }
}
