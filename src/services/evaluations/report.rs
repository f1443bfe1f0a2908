use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::EvaluationService;
use crate::errors::{EvalBookError, Result};
use crate::models::assessments::entities::Category;
use crate::models::evaluations::{
    entities::{EvaluationRow, ReportLine, ReportTarget, SessionHeader, SessionKey},
    requests::ReportQuery,
    responses::{Report, ReportCategory, ReportResponse, ReportValue},
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::storage::Storage;
use crate::utils::time::{is_blank, parse_client_timestamp};

/// 由查询参数确定报告目标，显式行 ID 优先
pub fn report_target(query: &ReportQuery) -> Result<ReportTarget> {
    if let Some(row_id) = query.evaluation_row_id.filter(|id| *id > 0) {
        return Ok(ReportTarget::Row(row_id));
    }

    let assessment_id = query.assessment_id.filter(|id| *id > 0);
    let student_id = query
        .student_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (Some(assessment_id), Some(student_id)) = (assessment_id, student_id) else {
        return Err(EvalBookError::validation(
            "evaluation_row_id or assessment_id and student_id are required",
        ));
    };

    match query.session_timestamp.as_ref().filter(|raw| !is_blank(raw)) {
        Some(raw) => {
            let ts = parse_client_timestamp(raw)
                .map_err(|e| EvalBookError::validation(e.message()))?;
            Ok(ReportTarget::Session(SessionKey::new(
                assessment_id,
                student_id,
                ts,
            )))
        }
        None => Ok(ReportTarget::Latest {
            assessment_id,
            student_id: student_id.to_string(),
        }),
    }
}

/// 由存储行和分类构造报告行（分类缺失时按是否有评语推断类型）
pub fn line_for(row: &EvaluationRow, category: Option<&Category>) -> ReportLine {
    ReportLine {
        row_id: row.id,
        category_id: row.category_id,
        category_name: category.map(|c| c.name.clone()),
        max_marks: category.map(|c| c.max_marks),
        is_comment: category.map_or(row.comment.is_some(), |c| c.is_comment),
        marks: row.marks,
        comment: row.comment.clone(),
    }
}

/// 分类明细与两项合计：(明细, 满分合计, 得分合计)
///
/// 评语项只贡献文本，不计入任何合计。
pub fn category_breakdown(lines: &[ReportLine]) -> (Vec<ReportCategory>, f64, f64) {
    let mut total_marks = 0.0;
    let mut obtained_marks = 0.0;
    let mut categories = Vec::with_capacity(lines.len());

    for line in lines {
        let max_marks = line.max_marks.unwrap_or(0.0);
        let value = if line.is_comment {
            ReportValue::Text(line.comment.clone().unwrap_or_default())
        } else {
            total_marks += max_marks;
            obtained_marks += line.marks;
            ReportValue::Marks(line.marks)
        };

        categories.push(ReportCategory {
            category_id: line.category_id,
            category: line.category_name.clone(),
            is_comment: line.is_comment,
            total_marks: if line.is_comment { 0.0 } else { max_marks },
            value,
        });
    }

    (categories, total_marks, obtained_marks)
}

pub fn aggregate_report(header: SessionHeader, lines: &[ReportLine]) -> Report {
    let (categories, total_marks, obtained_marks) = category_breakdown(lines);

    Report {
        evaluation_row_id: header.anchor_row_id,
        assessment_id: header.key.assessment_id,
        assessment_name: header.assessment_title,
        student_id: header.key.student_id,
        evaluator_id: header.evaluator_id,
        session_timestamp: header.key.session_timestamp,
        total_marks,
        obtained_marks,
        categories,
    }
}

/// 定位会话并汇总报告
pub async fn build_report(storage: &dyn Storage, target: &ReportTarget) -> Result<Report> {
    let header = storage
        .resolve_report_session(target)
        .await?
        .ok_or_else(|| EvalBookError::not_found("No report found"))?;

    let lines = storage.list_session_lines(&header.key).await?;

    Ok(aggregate_report(header, &lines))
}

pub async fn get_report(
    service: &EvaluationService,
    request: &HttpRequest,
    query: ReportQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let result = match report_target(&query) {
        Ok(target) => build_report(storage.as_ref(), &target).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            ReportResponse { report },
            "Report loaded",
        ))),
        Err(e) => Ok(error_response(
            &e,
            ErrorCode::ReportNotFound,
            ErrorCode::InternalServerError,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluations::requests::ClientTimestamp;
    use chrono::{TimeZone, Utc};

    fn line(row_id: i64, max: f64, marks: f64, comment: Option<&str>) -> ReportLine {
        ReportLine {
            row_id,
            category_id: row_id + 100,
            category_name: Some(format!("C{row_id}")),
            max_marks: Some(max),
            is_comment: comment.is_some(),
            marks,
            comment: comment.map(str::to_string),
        }
    }

    fn header() -> SessionHeader {
        SessionHeader {
            anchor_row_id: 1,
            key: SessionKey::new(1, "42", Utc.timestamp_millis_opt(1_000).unwrap()),
            evaluator_id: "9".into(),
            assessment_title: Some("Midterm".into()),
        }
    }

    #[test]
    fn test_comment_rows_excluded_from_totals() {
        let lines = vec![
            line(1, 10.0, 7.0, None),
            line(2, 5.0, 3.0, None),
            line(3, 0.0, 0.0, Some("Good")),
        ];
        let report = aggregate_report(header(), &lines);

        assert_eq!(report.total_marks, 15.0);
        assert_eq!(report.obtained_marks, 10.0);
        assert_eq!(report.categories.len(), 3);
        assert_eq!(report.categories[2].value, ReportValue::Text("Good".into()));
        assert_eq!(report.categories[0].value, ReportValue::Marks(7.0));
        assert_eq!(report.assessment_name.as_deref(), Some("Midterm"));
    }

    #[test]
    fn test_missing_category_still_reported() {
        let mut orphan = line(4, 0.0, 6.0, None);
        orphan.category_name = None;
        orphan.max_marks = None;
        let report = aggregate_report(header(), &[orphan]);
        assert_eq!(report.total_marks, 0.0);
        assert_eq!(report.obtained_marks, 6.0);
        assert_eq!(report.categories[0].category, None);
    }

    #[test]
    fn test_target_prefers_row_id() {
        let query = ReportQuery {
            evaluation_row_id: Some(7),
            assessment_id: Some(1),
            student_id: Some("42".into()),
            session_timestamp: None,
        };
        assert_eq!(report_target(&query).unwrap(), ReportTarget::Row(7));
    }

    #[test]
    fn test_target_latest_and_exact_session() {
        let mut query = ReportQuery {
            evaluation_row_id: None,
            assessment_id: Some(1),
            student_id: Some(" 42 ".into()),
            session_timestamp: None,
        };
        assert_eq!(
            report_target(&query).unwrap(),
            ReportTarget::Latest {
                assessment_id: 1,
                student_id: "42".into()
            }
        );

        query.session_timestamp = Some(ClientTimestamp::Millis(1_000));
        assert_eq!(
            report_target(&query).unwrap(),
            ReportTarget::Session(header().key)
        );
    }

    #[test]
    fn test_target_requires_identity() {
        let query = ReportQuery {
            assessment_id: Some(1),
            ..Default::default()
        };
        assert_eq!(report_target(&query).unwrap_err().code(), "E005");
    }

    #[test]
    fn test_line_for_uses_category_type() {
        let row = EvaluationRow {
            id: 5,
            assessment_id: 1,
            category_id: 12,
            marks: 0.0,
            comment: Some("Neat".into()),
            evaluator_id: "9".into(),
            student_id: "42".into(),
            session_timestamp: Utc.timestamp_millis_opt(1_000).unwrap(),
        };
        let category = Category {
            id: 12,
            assessment_id: 1,
            name: "Remarks".into(),
            max_marks: 0.0,
            is_comment: true,
        };
        let line = line_for(&row, Some(&category));
        assert!(line.is_comment);
        assert_eq!(line.category_name.as_deref(), Some("Remarks"));
        assert!(line_for(&row, None).is_comment);
    }
}
