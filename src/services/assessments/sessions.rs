use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AssessmentService;
use crate::errors::{EvalBookError, Result};
use crate::models::assessments::{
    entities::Category,
    responses::{AssessmentSession, AssessmentSessionsResponse},
};
use crate::models::evaluations::entities::{HistoryRole, ReportLine};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::services::evaluations::history::{enrich_sessions, group_sessions};
use crate::services::evaluations::report::{category_breakdown, line_for};
use crate::storage::Storage;

/// 测评下所有会话（按完整会话键分组，最新在前），附带分类明细
pub async fn build_assessment_sessions(
    storage: &dyn Storage,
    assessment_id: i64,
) -> Result<AssessmentSessionsResponse> {
    let assessment = storage
        .get_assessment_by_id(assessment_id)
        .await?
        .ok_or_else(|| EvalBookError::not_found(format!("Assessment {assessment_id} not found")))?;
    let categories = storage.list_categories(assessment_id).await?;
    let rows = storage.list_assessment_rows(assessment_id).await?;

    let by_id: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    // 与 group_sessions 使用相同的分组键
    let mut lines: HashMap<(String, String, i64), Vec<ReportLine>> = HashMap::new();
    for row in &rows {
        lines
            .entry((
                row.student_id.clone(),
                row.evaluator_id.trim().to_string(),
                row.session_timestamp.timestamp_millis(),
            ))
            .or_default()
            .push(line_for(row, by_id.get(&row.category_id).copied()));
    }

    let mut summaries = group_sessions(&rows, HistoryRole::Teacher);
    enrich_sessions(storage, &mut summaries).await?;

    let sessions = summaries
        .into_iter()
        .map(|summary| {
            let mut session_lines = lines
                .remove(&(
                    summary.student_id.clone(),
                    summary.evaluator_id.clone(),
                    summary.session_timestamp.timestamp_millis(),
                ))
                .unwrap_or_default();
            session_lines.sort_by_key(|l| l.row_id);
            let (details, _, _) = category_breakdown(&session_lines);
            AssessmentSession { summary, details }
        })
        .collect();

    Ok(AssessmentSessionsResponse {
        assessment,
        categories,
        sessions,
    })
}

pub async fn list_sessions(
    service: &AssessmentService,
    request: &HttpRequest,
    assessment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match build_assessment_sessions(storage.as_ref(), assessment_id).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(ApiResponse::success(resp, "Sessions loaded"))),
        Err(e) => Ok(error_response(
            &e,
            ErrorCode::AssessmentNotFound,
            ErrorCode::InternalServerError,
        )),
    }
}
