use serde::Deserialize;

use super::entities::HistoryRole;
use crate::models::common::lenient::{
    deserialize_bool, deserialize_f64, deserialize_optional_i64, deserialize_optional_id,
};

/// 客户端会话时间戳：毫秒整数或字符串
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ClientTimestamp {
    Millis(i64),
    Text(String),
}

/// 提交评价请求
///
/// 同时兼容旧版客户端字段名：student_roll / evaluated_by / created_at / data
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitEvaluationRequest {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub assessment_id: Option<i64>,
    #[serde(
        default,
        alias = "student_roll",
        deserialize_with = "deserialize_optional_id"
    )]
    pub student_id: Option<String>,
    #[serde(
        default,
        alias = "evaluated_by",
        deserialize_with = "deserialize_optional_id"
    )]
    pub evaluator_id: Option<String>,
    #[serde(default, alias = "created_at")]
    pub session_timestamp: Option<ClientTimestamp>,
    #[serde(default, alias = "data")]
    pub rows: Vec<EvaluationRowInput>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// 单个分类的评价输入
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRowInput {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_f64")]
    pub marks: f64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_comment: bool,
}

/// 报告查询参数：evaluation_row_id 或 assessment_id + student_id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(
        default,
        alias = "evaluation_id",
        deserialize_with = "deserialize_optional_i64"
    )]
    pub evaluation_row_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub assessment_id: Option<i64>,
    #[serde(
        default,
        alias = "student_roll",
        deserialize_with = "deserialize_optional_id"
    )]
    pub student_id: Option<String>,
    #[serde(default)]
    pub session_timestamp: Option<ClientTimestamp>,
}

/// 历史查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub role: HistoryRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_accepts_legacy_field_names() {
        let req: SubmitEvaluationRequest = serde_json::from_str(
            r#"{
                "assessment_id": "3",
                "student_roll": "BGNU-42",
                "evaluated_by": 9,
                "device_id": "phone-1",
                "created_at": "2025-03-01 10:15:00",
                "data": [
                    {"category_id": "11", "category": "Logic", "marks": "7", "comment": "", "is_comment": "0"},
                    {"category_id": 12, "marks": 0, "comment": "Good", "is_comment": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(req.assessment_id, Some(3));
        assert_eq!(req.student_id.as_deref(), Some("BGNU-42"));
        assert_eq!(req.evaluator_id.as_deref(), Some("9"));
        assert_eq!(
            req.session_timestamp,
            Some(ClientTimestamp::Text("2025-03-01 10:15:00".into()))
        );
        assert_eq!(req.rows.len(), 2);
        assert_eq!(req.rows[0].category_id, Some(11));
        assert_eq!(req.rows[0].marks, 7.0);
        assert!(!req.rows[0].is_comment);
        assert!(req.rows[1].is_comment);
        assert_eq!(req.rows[1].comment.as_deref(), Some("Good"));
    }

    #[test]
    fn test_numeric_session_timestamp() {
        let req: SubmitEvaluationRequest =
            serde_json::from_str(r#"{"session_timestamp": 1740824100000}"#).unwrap();
        assert_eq!(
            req.session_timestamp,
            Some(ClientTimestamp::Millis(1_740_824_100_000))
        );
        assert!(req.rows.is_empty());
    }

    #[test]
    fn test_history_query_defaults_to_student() {
        let query: HistoryQuery = serde_json::from_str(r#"{"subject_id": "42"}"#).unwrap();
        assert_eq!(query.role, HistoryRole::Student);
        assert_eq!(query.subject_id.as_deref(), Some("42"));
    }
}
