use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entities::{HistoryRole, SessionRef};

/// 提交结果状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    /// 新会话已写入
    Committed,
    /// 重复提交，返回已有会话
    Replayed,
}

/// 提交评价响应
#[derive(Debug, Clone, Serialize)]
pub struct SubmitEvaluationResponse {
    pub status: SubmitStatus,
    pub session_ref: SessionRef,
}

/// 分类取值：评分项为数值，评语项为文本
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ReportValue {
    Marks(f64),
    Text(String),
}

/// 报告中的分类明细
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportCategory {
    pub category_id: i64,
    pub category: Option<String>,
    pub is_comment: bool,
    pub total_marks: f64,
    pub value: ReportValue,
}

/// 单次会话的评价报告
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub evaluation_row_id: i64,
    pub assessment_id: i64,
    pub assessment_name: Option<String>,
    pub student_id: String,
    pub evaluator_id: String,
    pub session_timestamp: DateTime<Utc>,
    pub total_marks: f64,
    pub obtained_marks: f64,
    pub categories: Vec<ReportCategory>,
}

/// 报告响应
#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub report: Report,
}

/// 历史中的一次会话（一条会话对应一条记录，而不是每行一条）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    /// 会话内最新的评价行 ID
    pub id: i64,
    pub assessment_id: i64,
    pub assessment_title: Option<String>,
    pub student_id: String,
    pub student_name: Option<String>,
    pub evaluator_id: String,
    pub evaluator_name: Option<String>,
    pub session_timestamp: DateTime<Utc>,
    pub row_count: u64,
}

/// 历史响应
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub subject_id: String,
    pub role: HistoryRole,
    pub sessions: Vec<SessionSummary>,
}
