pub mod history;
pub mod report;
pub mod session;
pub mod submit;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::evaluations::requests::{HistoryQuery, ReportQuery, SubmitEvaluationRequest};
use crate::services::notifications::NotificationDispatcher;
use crate::storage::Storage;

pub use session::SessionPolicy;

pub struct EvaluationService {
    storage: Option<Arc<dyn Storage>>,
}

impl EvaluationService {
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

    /// 未注册通知队列时不投递任何事件
    pub(crate) fn get_dispatcher(&self, request: &HttpRequest) -> NotificationDispatcher {
        request
            .app_data::<web::Data<NotificationDispatcher>>()
            .map(|d| d.get_ref().clone())
            .unwrap_or_else(NotificationDispatcher::disabled)
    }

    pub(crate) fn get_policy(&self, request: &HttpRequest) -> SessionPolicy {
        request
            .app_data::<web::Data<SessionPolicy>>()
            .map(|p| *p.get_ref())
            .unwrap_or_else(|| SessionPolicy::from(&AppConfig::get().evaluation))
    }

    pub async fn submit_evaluation(
        &self,
        request: &HttpRequest,
        req: SubmitEvaluationRequest,
    ) -> ActixResult<HttpResponse> {
        submit::submit_evaluation(self, request, req).await
    }

    pub async fn get_report(
        &self,
        request: &HttpRequest,
        query: ReportQuery,
    ) -> ActixResult<HttpResponse> {
        report::get_report(self, request, query).await
    }

    pub async fn get_history(
        &self,
        request: &HttpRequest,
        query: HistoryQuery,
    ) -> ActixResult<HttpResponse> {
        history::get_history(self, request, query).await
    }
}
