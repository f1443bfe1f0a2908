pub mod categories;
pub mod create;
pub mod list;
pub mod sessions;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;

use crate::models::assessments::requests::{AssessmentListParams, CreateAssessmentRequest};
use crate::services::notifications::NotificationDispatcher;
use crate::storage::Storage;

pub struct AssessmentService {
    storage: Option<Arc<dyn Storage>>,
}

impl AssessmentService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub(crate) fn get_dispatcher(&self, request: &HttpRequest) -> NotificationDispatcher {
        request
            .app_data::<web::Data<NotificationDispatcher>>()
            .map(|d| d.get_ref().clone())
            .unwrap_or_else(NotificationDispatcher::disabled)
    }

    pub async fn create_assessment(
        &self,
        request: &HttpRequest,
        req: CreateAssessmentRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_assessment(self, request, req).await
    }

    pub async fn list_assessments(
        &self,
        request: &HttpRequest,
        query: AssessmentListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_assessments(self, request, query).await
    }

    pub async fn list_categories(
        &self,
        request: &HttpRequest,
        assessment_id: i64,
    ) -> ActixResult<HttpResponse> {
        categories::list_categories(self, request, assessment_id).await
    }

    pub async fn list_sessions(
        &self,
        request: &HttpRequest,
        assessment_id: i64,
    ) -> ActixResult<HttpResponse> {
        sessions::list_sessions(self, request, assessment_id).await
    }
}
