use std::collections::{HashMap, HashSet};

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::EvaluationService;
use crate::errors::{EvalBookError, Result};
use crate::models::evaluations::{
    entities::{EvaluationRow, HistoryRole},
    requests::HistoryQuery,
    responses::{HistoryResponse, SessionSummary},
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::storage::Storage;

/// 将评价行按完整会话键 (测评, 学生, 评价人, 时间戳) 分组，每个会话一条
///
/// 学生视角按最新行 ID 倒序；教师视角按会话时间戳、再按最新行 ID 倒序。
pub fn group_sessions(rows: &[EvaluationRow], role: HistoryRole) -> Vec<SessionSummary> {
    let mut groups: HashMap<(i64, &str, &str, i64), SessionSummary> = HashMap::new();

    for row in rows {
        let evaluator_id = row.evaluator_id.trim();
        let key = (
            row.assessment_id,
            row.student_id.as_str(),
            evaluator_id,
            row.session_timestamp.timestamp_millis(),
        );

        groups
            .entry(key)
            .and_modify(|summary| {
                summary.id = summary.id.max(row.id);
                summary.session_timestamp = summary.session_timestamp.max(row.session_timestamp);
                summary.row_count += 1;
            })
            .or_insert_with(|| SessionSummary {
                id: row.id,
                assessment_id: row.assessment_id,
                assessment_title: None,
                student_id: row.student_id.clone(),
                student_name: None,
                evaluator_id: evaluator_id.to_string(),
                evaluator_name: None,
                session_timestamp: row.session_timestamp,
                row_count: 1,
            });
    }

    let mut sessions: Vec<SessionSummary> = groups.into_values().collect();
    match role {
        HistoryRole::Student => sessions.sort_by(|a, b| b.id.cmp(&a.id)),
        HistoryRole::Teacher => sessions.sort_by(|a, b| {
            b.session_timestamp
                .cmp(&a.session_timestamp)
                .then_with(|| b.id.cmp(&a.id))
        }),
    }
    sessions
}

/// 补充测评标题与学生、教师姓名
pub async fn enrich_sessions(
    storage: &dyn Storage,
    sessions: &mut [SessionSummary],
) -> Result<()> {
    if sessions.is_empty() {
        return Ok(());
    }

    let assessment_ids: Vec<i64> = sessions
        .iter()
        .map(|s| s.assessment_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let titles: HashMap<i64, String> = storage
        .get_assessments_by_ids(&assessment_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, a.title))
        .collect();

    let user_ids: Vec<String> = sessions
        .iter()
        .flat_map(|s| [s.student_id.clone(), s.evaluator_id.clone()])
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let names: HashMap<String, String> = storage
        .list_users_by_ids(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.bgnu_id, u.full_name))
        .collect();

    for session in sessions.iter_mut() {
        session.assessment_title = titles.get(&session.assessment_id).cloned();
        session.student_name = names.get(session.student_id.trim()).cloned();
        session.evaluator_name = names.get(session.evaluator_id.trim()).cloned();
    }

    Ok(())
}

/// 列出某主体的评价历史，每个会话一条
pub async fn build_history(
    storage: &dyn Storage,
    subject_id: &str,
    role: HistoryRole,
) -> Result<Vec<SessionSummary>> {
    let subject_id = subject_id.trim();
    if subject_id.is_empty() {
        return Err(EvalBookError::validation("subject_id is required"));
    }

    let rows = storage.list_history_rows(subject_id, role).await?;
    let mut sessions = group_sessions(&rows, role);
    enrich_sessions(storage, &mut sessions).await?;
    Ok(sessions)
}

pub async fn get_history(
    service: &EvaluationService,
    request: &HttpRequest,
    query: HistoryQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let subject_id = query.subject_id.unwrap_or_default();

    match build_history(storage.as_ref(), &subject_id, query.role).await {
        Ok(sessions) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            HistoryResponse {
                subject_id: subject_id.trim().to_string(),
                role: query.role,
                sessions,
            },
            "History loaded",
        ))),
        Err(e) => Ok(error_response(
            &e,
            ErrorCode::NotFound,
            ErrorCode::InternalServerError,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn row(id: i64, evaluator: &str, millis: i64) -> EvaluationRow {
        EvaluationRow {
            id,
            assessment_id: 1,
            category_id: 10 + id,
            marks: 1.0,
            comment: None,
            evaluator_id: evaluator.into(),
            student_id: "42".into(),
            session_timestamp: ts(millis),
        }
    }

    #[test]
    fn test_one_entry_per_session() {
        let rows = vec![row(1, "9", 1_000), row(2, "9", 1_000), row(3, "9", 2_000)];
        let sessions = group_sessions(&rows, HistoryRole::Student);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, 3);
        assert_eq!(sessions[0].row_count, 1);
        assert_eq!(sessions[1].id, 2);
        assert_eq!(sessions[1].row_count, 2);
    }

    #[test]
    fn test_evaluator_whitespace_does_not_split_session() {
        let rows = vec![row(1, "9", 1_000), row(2, " 9 ", 1_000)];
        let sessions = group_sessions(&rows, HistoryRole::Teacher);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].evaluator_id, "9");
    }

    #[test]
    fn test_different_evaluators_are_different_sessions() {
        let rows = vec![row(1, "9", 1_000), row(2, "10", 1_000)];
        assert_eq!(group_sessions(&rows, HistoryRole::Student).len(), 2);
    }

    #[test]
    fn test_teacher_order_uses_timestamp_first() {
        // 行 ID 较大但会话时间较早（离线补传）
        let rows = vec![row(1, "9", 5_000), row(2, "9", 1_000)];
        let teacher = group_sessions(&rows, HistoryRole::Teacher);
        assert_eq!(teacher[0].id, 1);

        let student = group_sessions(&rows, HistoryRole::Student);
        assert_eq!(student[0].id, 2);
    }
}
