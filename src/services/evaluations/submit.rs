use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;
use tracing::{error, info};

use super::EvaluationService;
use super::session::{SessionPolicy, resolve_session};
use crate::errors::{EvalBookError, Result};
use crate::models::evaluations::{
    entities::CommitOutcome,
    requests::SubmitEvaluationRequest,
    responses::{SubmitEvaluationResponse, SubmitStatus},
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::services::notifications::{NotificationDispatcher, NotificationEvent};
use crate::storage::Storage;

/// 解析、去重并原子写入一次提交
///
/// 通知只在新会话真正写入了评价行之后投递，重放与空批次不通知。
pub async fn submit_batch(
    storage: &dyn Storage,
    dispatcher: &NotificationDispatcher,
    policy: &SessionPolicy,
    req: &SubmitEvaluationRequest,
) -> Result<SubmitEvaluationResponse> {
    let batch = resolve_session(req, policy, Utc::now())?;

    match storage.commit_evaluation_batch(&batch).await? {
        CommitOutcome::Committed(session_ref) => {
            info!(
                "Evaluation committed: assessment={} student={} timestamp={} rows={}",
                session_ref.assessment_id,
                session_ref.student_id,
                session_ref.session_timestamp.timestamp_millis(),
                session_ref.row_count
            );
            if session_ref.row_count > 0 {
                dispatcher.emit(NotificationEvent::EvaluationSubmitted {
                    assessment_id: session_ref.assessment_id,
                    student_id: session_ref.student_id.clone(),
                });
            }
            Ok(SubmitEvaluationResponse {
                status: SubmitStatus::Committed,
                session_ref,
            })
        }
        CommitOutcome::Replayed(session_ref) => {
            info!(
                "Evaluation replayed: assessment={} student={} timestamp={} existing_rows={}",
                session_ref.assessment_id,
                session_ref.student_id,
                session_ref.session_timestamp.timestamp_millis(),
                session_ref.row_count
            );
            Ok(SubmitEvaluationResponse {
                status: SubmitStatus::Replayed,
                session_ref,
            })
        }
    }
}

pub async fn submit_evaluation(
    service: &EvaluationService,
    request: &HttpRequest,
    req: SubmitEvaluationRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let dispatcher = service.get_dispatcher(request);
    let policy = service.get_policy(request);

    match submit_batch(storage.as_ref(), &dispatcher, &policy, &req).await {
        Ok(resp) => match resp.status {
            SubmitStatus::Committed => Ok(HttpResponse::Created()
                .json(ApiResponse::success(resp, "Evaluation submitted successfully"))),
            SubmitStatus::Replayed => Ok(HttpResponse::Ok()
                .json(ApiResponse::success(resp, "Evaluation already submitted"))),
        },
        Err(e) => {
            if !matches!(e, EvalBookError::Validation(_)) {
                error!(
                    "Evaluation submission failed (device={:?}): {}",
                    req.device_id, e
                );
            }
            Ok(error_response(
                &e,
                ErrorCode::AssessmentNotFound,
                ErrorCode::EvaluationSubmitFailed,
            ))
        }
    }
}
